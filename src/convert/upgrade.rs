//! Swagger 2.0 → OpenAPI 3.x.
use indexmap::IndexMap;

use super::{parameters, responses, schema as schemas, security, servers};
use crate::error::{Error, Result};
use crate::issue::{Issues, Severity, at};
use crate::model::{Document, v2, v3};
use crate::version::Version;

pub fn upgrade(source: &Document, target: Version, issues: &mut Issues) -> Result<v3::OpenApi> {
    let Some(doc) = source.as_v2() else {
        return Err(Error::UnexpectedDocument { expected: "Swagger 2.0", found: source.kind() });
    };
    log::debug!("upgrading {} path(s) to {}", doc.paths.len(), target.as_str());

    let servers = servers::servers_from_host(
        doc.host.as_deref(),
        doc.base_path.as_deref(),
        &doc.schemes,
        issues,
        "servers",
    );

    let mut paths = IndexMap::with_capacity(doc.paths.len());
    for (key, item) in &doc.paths {
        let converted = upgrade_path_item(doc, item, issues, &at("paths", key));
        paths.insert(key.clone(), converted);
    }

    let components = upgrade_components(doc, issues);

    let mut out = v3::OpenApi {
        openapi: target.as_str().to_string(),
        info: doc.info.clone(),
        json_schema_dialect: None,
        servers,
        paths,
        webhooks: IndexMap::new(),
        components: (components != v3::Components::default()).then_some(components),
        security: doc.security.clone(),
        tags: doc.tags.clone(),
        external_docs: doc.external_docs.clone(),
        extensions: doc.extensions.clone(),
    };
    if target.is_3_1_or_later() {
        lift_bounds(&mut out);
    }
    Ok(out)
}

/// Rewrite boolean exclusive bounds in every schema of the upgraded document.
fn lift_bounds(api: &mut v3::OpenApi) {
    if let Some(components) = api.components.as_mut() {
        components.schemas.values_mut().for_each(schemas::lift_exclusive_bounds);
        components.parameters.values_mut().for_each(lift_parameter);
        components.request_bodies.values_mut().for_each(|body| lift_content(&mut body.content));
        components.responses.values_mut().for_each(lift_response);
    }
    for item in api.paths.values_mut() {
        item.parameters.iter_mut().for_each(lift_parameter);
        for op in item.operations_mut() {
            op.parameters.iter_mut().for_each(lift_parameter);
            if let Some(body) = op.request_body.as_mut() {
                lift_content(&mut body.content);
            }
            op.responses.default.iter_mut().for_each(lift_response);
            op.responses.codes.values_mut().for_each(lift_response);
        }
    }
}

fn lift_parameter(param: &mut v3::Parameter) {
    if let Some(schema) = param.schema.as_mut() {
        schemas::lift_exclusive_bounds(schema);
    }
    lift_content(&mut param.content);
}

fn lift_response(response: &mut v3::Response) {
    lift_content(&mut response.content);
    for header in response.headers.values_mut() {
        if let Some(schema) = header.schema.as_mut() {
            schemas::lift_exclusive_bounds(schema);
        }
    }
}

fn lift_content(content: &mut IndexMap<String, v3::MediaType>) {
    for media in content.values_mut() {
        if let Some(schema) = media.schema.as_mut() {
            schemas::lift_exclusive_bounds(schema);
        }
    }
}

fn upgrade_path_item(doc: &v2::Swagger, item: &v2::PathItem, issues: &mut Issues, path: &str) -> v3::PathItem {
    // payload parameters have no path-level slot in 3.x; every operation inherits them
    let (payload, shared): (Vec<&v2::Parameter>, Vec<(usize, &v2::Parameter)>) = {
        let mut payload = Vec::new();
        let mut shared = Vec::new();
        for (i, param) in item.parameters.iter().enumerate() {
            if parameters::is_payload(param, &doc.parameters) {
                payload.push(param);
            } else {
                shared.push((i, param));
            }
        }
        (payload, shared)
    };

    let list_path = at(path, "parameters");
    let mut out = v3::PathItem {
        reference: item.reference.clone(),
        parameters: shared
            .into_iter()
            .map(|(i, p)| parameters::upgrade_parameter(p, issues, &format!("{list_path}[{i}]")))
            .collect(),
        extensions: item.extensions.clone(),
        ..v3::PathItem::default()
    };

    for (method, op) in item.operations() {
        let converted = upgrade_operation(doc, op, &payload, issues, &at(path, method));
        out.set_operation(method, converted);
    }
    out
}

fn upgrade_operation(
    doc: &v2::Swagger,
    op: &v2::Operation,
    inherited: &[&v2::Parameter],
    issues: &mut Issues,
    path: &str,
) -> v3::Operation {
    let consumes = op.consumes.as_deref().unwrap_or(&doc.consumes);
    let produces = op.produces.as_deref().unwrap_or(&doc.produces);

    let mut params = op.parameters.clone();
    for param in inherited {
        if !params.iter().any(|own| same_parameter(own, param)) {
            params.push((*param).clone());
        }
    }
    let split = parameters::upgrade_list(&params, &doc.parameters, consumes, issues, path);
    let responses = responses::upgrade_responses(&op.responses, produces, issues, &at(path, "responses"));

    let servers = if op.schemes.is_empty() {
        Vec::new()
    } else {
        servers::servers_from_host(
            doc.host.as_deref(),
            doc.base_path.as_deref(),
            &op.schemes,
            issues,
            &at(path, "servers"),
        )
    };

    v3::Operation {
        tags: op.tags.clone(),
        summary: op.summary.clone(),
        description: op.description.clone(),
        external_docs: op.external_docs.clone(),
        operation_id: op.operation_id.clone(),
        parameters: split.parameters,
        request_body: split.request_body,
        responses,
        callbacks: IndexMap::new(),
        deprecated: op.deprecated,
        security: op.security.clone(),
        servers,
        extensions: op.extensions.clone(),
    }
}

/// Operation-level parameters override path-level ones with the same name and location.
fn same_parameter(a: &v2::Parameter, b: &v2::Parameter) -> bool {
    match (&a.reference, &b.reference) {
        (Some(x), Some(y)) => x == y,
        (None, None) => a.name == b.name && a.location == b.location,
        _ => false,
    }
}

fn upgrade_components(doc: &v2::Swagger, issues: &mut Issues) -> v3::Components {
    let mut components = v3::Components::default();

    for (name, schema) in &doc.definitions {
        components.schemas.insert(name.clone(), schemas::to_modern(schema));
    }

    let mut inlined = Vec::new();
    for (name, param) in &doc.parameters {
        if param.reference.is_none() && param.is_body() {
            let body = parameters::body_to_request_body(param, &doc.consumes);
            components.request_bodies.insert(name.clone(), body);
        } else if param.reference.is_none() && param.is_form() {
            inlined.push(name.as_str());
        } else {
            let converted = parameters::upgrade_parameter(param, issues, &at("parameters", name));
            components.parameters.insert(name.clone(), converted);
        }
    }
    if !inlined.is_empty() {
        issues.add(
            Severity::Info,
            "parameters",
            "global formData parameters have no 3.x component; inlined into each referencing request body",
            Some(inlined.join(", ")),
        );
    }

    for (name, response) in &doc.responses {
        let converted = responses::upgrade_response(response, &doc.produces, issues, &at("responses", name));
        components.responses.insert(name.clone(), converted);
    }

    for (name, scheme) in &doc.security_definitions {
        if let Some(converted) = security::upgrade_scheme(scheme, issues, &at("securityDefinitions", name)) {
            components.security_schemes.insert(name.clone(), converted);
        }
    }
    components
}
