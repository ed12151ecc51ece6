//! OpenAPI 3.x → 3.y. The shape is unchanged; only the version marker moves.
use indexmap::IndexMap;

use super::schema::scan_nullable;
use crate::error::{Error, Result};
use crate::issue::{Issues, Severity, at, index};
use crate::model::{Document, v3};
use crate::version::Version;

pub fn bump(source: &Document, from: Version, target: Version, issues: &mut Issues) -> Result<v3::OpenApi> {
    let Some(doc) = source.as_v3() else {
        return Err(Error::UnexpectedDocument { expected: "OpenAPI 3.x", found: source.kind() });
    };

    let mut out = doc.clone();
    out.openapi = target.as_str().to_string();
    issues.add(
        Severity::Info,
        "openapi",
        format!("version changed from {} to {}", doc.openapi, target.as_str()),
        None,
    );

    if from.is_3_0() && target.is_3_1_or_later() {
        log::debug!("scanning for `nullable` ahead of {}", target.as_str());
        scan_document(doc, issues);
    }
    Ok(out)
}

/// Every schema reachable from components and from path operations.
fn scan_document(doc: &v3::OpenApi, issues: &mut Issues) {
    if let Some(components) = doc.components() {
        for (name, schema) in &components.schemas {
            scan_nullable(schema, &format!("components.schemas.{name}"), issues);
        }
        for (name, param) in &components.parameters {
            scan_parameter(param, &format!("components.parameters.{name}"), issues);
        }
        for (name, body) in &components.request_bodies {
            scan_content(&body.content, &format!("components.requestBodies.{name}"), issues);
        }
        for (name, response) in &components.responses {
            scan_content(&response.content, &format!("components.responses.{name}"), issues);
        }
    }

    for (key, item) in &doc.paths {
        let item_path = at("paths", key);
        for (i, param) in item.parameters.iter().enumerate() {
            scan_parameter(param, &index(&at(&item_path, "parameters"), i), issues);
        }
        for (method, op) in item.operations() {
            scan_operation(op, &at(&item_path, method), issues);
        }
    }
}

fn scan_operation(op: &v3::Operation, path: &str, issues: &mut Issues) {
    for (i, param) in op.parameters.iter().enumerate() {
        scan_parameter(param, &index(&at(path, "parameters"), i), issues);
    }
    if let Some(body) = &op.request_body {
        scan_content(&body.content, &at(path, "requestBody"), issues);
    }
    for (code, response) in op.responses.iter() {
        scan_content(&response.content, &at(&at(path, "responses"), code), issues);
    }
}

fn scan_parameter(param: &v3::Parameter, path: &str, issues: &mut Issues) {
    if let Some(schema) = &param.schema {
        scan_nullable(schema, &at(path, "schema"), issues);
    }
    scan_content(&param.content, path, issues);
}

fn scan_content(content: &IndexMap<String, v3::MediaType>, path: &str, issues: &mut Issues) {
    for (mime, media) in content {
        if let Some(schema) = &media.schema {
            scan_nullable(schema, &at(&at(&at(path, "content"), mime), "schema"), issues);
        }
    }
}
