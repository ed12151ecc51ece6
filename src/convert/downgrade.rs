//! OpenAPI 3.x → Swagger 2.0.
//!
//! Issue paths point into the *source* document, since most findings concern
//! something that no longer exists in the output.
use std::collections::HashSet;

use indexmap::IndexMap;

use super::{parameters, responses, schema as schemas, security, servers};
use crate::error::{Error, Result};
use crate::issue::{Issues, Severity, at, index};
use crate::model::{Document, SecurityRequirement, v2, v3};
use crate::refs::MODERN_PREFIXES;

const PARAMETERS_PREFIX: &str = MODERN_PREFIXES[1];

/// Component names with no 2.0 counterpart. References to them are removed.
#[derive(Debug, Default)]
struct Dropped {
    parameters: HashSet<String>,
    schemes: HashSet<String>,
}

pub fn downgrade(source: &Document, issues: &mut Issues) -> Result<v2::Swagger> {
    let Some(doc) = source.as_v3() else {
        return Err(Error::UnexpectedDocument { expected: "OpenAPI 3.x", found: source.kind() });
    };
    log::debug!("downgrading {} path(s) from {}", doc.paths.len(), doc.openapi);

    let mut info = doc.info.clone();
    if info.summary.take().is_some() {
        issues.add(Severity::Warning, "info.summary", "`info.summary` is not supported in OpenAPI 2.0", None);
    }
    if let Some(license) = info.license.as_mut() {
        if license.identifier.take().is_some() {
            issues.add(
                Severity::Warning,
                "info.license.identifier",
                "`license.identifier` is not supported in OpenAPI 2.0",
                None,
            );
        }
    }
    if let Some(dialect) = &doc.json_schema_dialect {
        issues.add(
            Severity::Warning,
            "jsonSchemaDialect",
            "`jsonSchemaDialect` is not supported in OpenAPI 2.0",
            Some(dialect.clone()),
        );
    }
    if !doc.webhooks.is_empty() {
        issues.add(
            Severity::Critical,
            "webhooks",
            "webhooks are not supported in OpenAPI 2.0",
            Some(doc.webhooks.keys().cloned().collect::<Vec<_>>().join(", ")),
        );
    }

    let host = servers::host_from_servers(&doc.servers, issues, "servers");

    let empty = v3::Components::default();
    let components = doc.components().unwrap_or(&empty);
    let mut out = v2::Swagger {
        swagger: "2.0".into(),
        info,
        host: host.host,
        base_path: Some(host.base_path),
        schemes: host.schemes,
        tags: doc.tags.clone(),
        external_docs: doc.external_docs.clone(),
        extensions: doc.extensions.clone(),
        ..v2::Swagger::default()
    };

    let dropped = downgrade_components(components, &mut out, issues);
    out.security = doc.security.as_ref().map(|reqs| strip_schemes(reqs, &dropped.schemes));

    for (key, item) in &doc.paths {
        let converted = downgrade_path_item(item, components, &dropped, issues, &at("paths", key));
        out.paths.insert(key.clone(), converted);
    }
    Ok(out)
}

fn downgrade_components(components: &v3::Components, out: &mut v2::Swagger, issues: &mut Issues) -> Dropped {
    let base = "components";
    let mut dropped = Dropped::default();

    for (name, schema) in &components.schemas {
        let path = at(&at(base, "schemas"), name);
        out.definitions.insert(name.clone(), schemas::to_legacy(schema, issues, &path));
    }

    for (name, param) in &components.parameters {
        let path = at(&at(base, "parameters"), name);
        match parameters::downgrade_parameter(param, issues, &path) {
            Some(converted) => {
                out.parameters.insert(name.clone(), converted);
            }
            None => {
                dropped.parameters.insert(name.clone());
            }
        }
    }

    // component-level media types do not feed any operation's `produces`
    let mut unused_produces = Vec::new();
    for (name, response) in &components.responses {
        let path = at(&at(base, "responses"), name);
        let converted = responses::downgrade_response(response, &mut unused_produces, issues, &path);
        out.responses.insert(name.clone(), converted);
    }

    for (name, scheme) in &components.security_schemes {
        let path = at(&at(base, "securitySchemes"), name);
        match security::downgrade_scheme(scheme, issues, &path) {
            Some(converted) => {
                out.security_definitions.insert(name.clone(), converted);
            }
            None => {
                dropped.schemes.insert(name.clone());
            }
        }
    }

    if !components.request_bodies.is_empty() {
        issues.add(
            Severity::Info,
            at(base, "requestBodies"),
            "request bodies have no 2.0 component; inlined into each referencing operation",
            None,
        );
    }
    for (key, count) in [("headers", components.headers.len()), ("examples", components.examples.len())] {
        if count > 0 {
            issues.add(
                Severity::Warning,
                at(base, key),
                format!("`components.{key}` is not supported in OpenAPI 2.0; {count} entr(y/ies) dropped"),
                None,
            );
        }
    }
    for (key, names) in [
        ("links", component_names(&components.links)),
        ("callbacks", component_names(&components.callbacks)),
        ("pathItems", component_names(&components.path_items)),
    ] {
        if !names.is_empty() {
            issues.add(
                Severity::Critical,
                at(base, key),
                format!("`components.{key}` is not supported in OpenAPI 2.0"),
                Some(names),
            );
        }
    }
    dropped
}

/// Convert a parameter list, removing references to dropped component parameters.
fn downgrade_parameters(
    list: &[v3::Parameter],
    dropped: &HashSet<String>,
    issues: &mut Issues,
    list_path: &str,
) -> Vec<v2::Parameter> {
    list.iter()
        .enumerate()
        .filter_map(|(i, param)| {
            let path = index(list_path, i);
            let target = param.reference.as_deref().and_then(|r| r.strip_prefix(PARAMETERS_PREFIX));
            if let Some(name) = target.filter(|name| dropped.contains(*name)) {
                issues.add(
                    Severity::Critical,
                    path,
                    format!("referenced parameter `{name}` has no OpenAPI 2.0 equivalent; reference removed"),
                    param.reference.clone(),
                );
                return None;
            }
            parameters::downgrade_parameter(param, issues, &path)
        })
        .collect()
}

fn component_names<T>(map: &IndexMap<String, T>) -> String {
    map.keys().cloned().collect::<Vec<_>>().join(", ")
}

/// Remove dropped schemes from requirement objects. A requirement emptied this
/// way disappears; one that was empty to begin with (optional auth) stays.
fn strip_schemes(requirements: &[SecurityRequirement], dropped: &HashSet<String>) -> Vec<SecurityRequirement> {
    requirements
        .iter()
        .filter_map(|req| {
            if req.is_empty() {
                return Some(req.clone());
            }
            let kept: SecurityRequirement = req
                .iter()
                .filter(|(name, _)| !dropped.contains(*name))
                .map(|(name, scopes)| (name.clone(), scopes.clone()))
                .collect();
            (!kept.is_empty()).then_some(kept)
        })
        .collect()
}

fn downgrade_path_item(
    item: &v3::PathItem,
    components: &v3::Components,
    dropped: &Dropped,
    issues: &mut Issues,
    path: &str,
) -> v2::PathItem {
    for (key, present) in [("summary", item.summary.is_some()), ("description", item.description.is_some())] {
        if present {
            issues.add(
                Severity::Warning,
                at(path, key),
                format!("path-level `{key}` is not supported in OpenAPI 2.0"),
                None,
            );
        }
    }
    if !item.servers.is_empty() {
        issues.add(
            Severity::Warning,
            at(path, "servers"),
            "path-level servers are not supported in OpenAPI 2.0",
            None,
        );
    }

    let list_path = at(path, "parameters");
    let mut out = v2::PathItem {
        reference: item.reference.clone(),
        parameters: downgrade_parameters(&item.parameters, &dropped.parameters, issues, &list_path),
        extensions: item.extensions.clone(),
        ..v2::PathItem::default()
    };

    for (method, op) in item.operations() {
        if v2::METHODS.contains(&method) {
            let converted = downgrade_operation(op, components, dropped, issues, &at(path, method));
            out.set_operation(method, converted);
            continue;
        }
        let op_path = match method {
            "trace" | "query" => at(path, method),
            custom => at(&at(path, "additionalOperations"), custom),
        };
        issues.add(
            Severity::Critical,
            op_path,
            format!("HTTP method `{method}` is not supported in OpenAPI 2.0; operation dropped"),
            op.operation_id.clone(),
        );
    }
    out
}

fn downgrade_operation(
    op: &v3::Operation,
    components: &v3::Components,
    dropped: &Dropped,
    issues: &mut Issues,
    path: &str,
) -> v2::Operation {
    let mut params = downgrade_parameters(&op.parameters, &dropped.parameters, issues, &at(path, "parameters"));

    let mut consumes = None;
    if let Some(body) = &op.request_body {
        let legacy = parameters::downgrade_request_body(body, &components.request_bodies, issues, &at(path, "requestBody"));
        params.extend(legacy.parameters);
        if !legacy.consumes.is_empty() {
            consumes = Some(legacy.consumes);
        }
    }

    let mut produces = Vec::new();
    let responses = responses::downgrade_responses(&op.responses, &mut produces, issues, &at(path, "responses"));

    if !op.callbacks.is_empty() {
        issues.add(
            Severity::Critical,
            at(path, "callbacks"),
            "callbacks are not supported in OpenAPI 2.0",
            Some(component_names(&op.callbacks)),
        );
    }
    if !op.servers.is_empty() {
        issues.add(
            Severity::Warning,
            at(path, "servers"),
            "operation-level servers are not supported in OpenAPI 2.0",
            None,
        );
    }

    v2::Operation {
        tags: op.tags.clone(),
        summary: op.summary.clone(),
        description: op.description.clone(),
        external_docs: op.external_docs.clone(),
        operation_id: op.operation_id.clone(),
        consumes,
        produces: (!produces.is_empty()).then_some(produces),
        parameters: params,
        responses,
        schemes: Vec::new(),
        deprecated: op.deprecated,
        security: op.security.as_ref().map(|reqs| strip_schemes(reqs, &dropped.schemes)),
        extensions: op.extensions.clone(),
    }
}
