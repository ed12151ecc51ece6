//! Response objects and their headers.
use super::parameters::{media_types_or_default, schema_to_simple, simple_to_schema};
use super::schema as schemas;
use crate::issue::{Issues, Severity, at};
use crate::model::{v2, v3};
use crate::refs;

// ————————————————————————————————————————————————————————————————————————————
// UPGRADE
// ————————————————————————————————————————————————————————————————————————————

pub fn upgrade_responses(
    responses: &v2::Responses,
    produces: &[String],
    issues: &mut Issues,
    path: &str,
) -> v3::Responses {
    let mut out = v3::Responses {
        extensions: responses.extensions.clone(),
        ..v3::Responses::default()
    };
    if let Some(default) = &responses.default {
        out.default = Some(upgrade_response(default, produces, issues, &at(path, "default")));
    }
    for (code, response) in &responses.codes {
        let converted = upgrade_response(response, produces, issues, &at(path, code));
        out.codes.insert(code.clone(), converted);
    }
    out
}

/// One content entry per effective `produces` media type; `examples` keyed by
/// a media type land on the matching entry.
pub fn upgrade_response(response: &v2::Response, produces: &[String], issues: &mut Issues, path: &str) -> v3::Response {
    if let Some(pointer) = &response.reference {
        return v3::Response { reference: Some(refs::to_modern(pointer)), ..v3::Response::default() };
    }

    let mut out = v3::Response {
        description: response.description.clone(),
        extensions: response.extensions.clone(),
        ..v3::Response::default()
    };

    if let Some(schema) = &response.schema {
        let schema = schemas::to_modern(schema);
        for mime in media_types_or_default(produces) {
            let example = response.examples.get(&mime).cloned();
            out.content.insert(
                mime,
                v3::MediaType { schema: Some(schema.clone()), example, ..v3::MediaType::default() },
            );
        }
    }
    for (mime, example) in &response.examples {
        if !out.content.contains_key(mime) {
            out.content.insert(
                mime.clone(),
                v3::MediaType {
                    schema: response.schema.as_ref().map(schemas::to_modern),
                    example: Some(example.clone()),
                    ..v3::MediaType::default()
                },
            );
        }
    }

    for (name, header) in &response.headers {
        let header_path = at(&at(path, "headers"), name);
        out.headers.insert(name.clone(), upgrade_header(header, issues, &header_path));
    }
    out
}

fn upgrade_header(header: &v2::Header, issues: &mut Issues, path: &str) -> v3::Header {
    if let Some(format) = header.simple.collection_format.as_deref().filter(|f| *f != "csv") {
        issues.add(
            Severity::Warning,
            at(path, "collectionFormat"),
            format!("header collectionFormat `{format}` has no OpenAPI 3.x equivalent"),
            None,
        );
    }
    v3::Header {
        description: header.description.clone(),
        schema: Some(simple_to_schema(&header.simple)),
        extensions: header.extensions.clone(),
        ..v3::Header::default()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DOWNGRADE
// ————————————————————————————————————————————————————————————————————————————

/// `produces` collects every response media type seen, in first-seen order.
pub fn downgrade_responses(
    responses: &v3::Responses,
    produces: &mut Vec<String>,
    issues: &mut Issues,
    path: &str,
) -> v2::Responses {
    let mut out = v2::Responses {
        extensions: responses.extensions.clone(),
        ..v2::Responses::default()
    };
    if let Some(default) = &responses.default {
        out.default = Some(downgrade_response(default, produces, issues, &at(path, "default")));
    }
    for (code, response) in &responses.codes {
        let converted = downgrade_response(response, produces, issues, &at(path, code));
        out.codes.insert(code.clone(), converted);
    }
    out
}

/// Keeps the first content entry's schema; the others only contribute their
/// media type to `produces` and their example to `examples`.
pub fn downgrade_response(
    response: &v3::Response,
    produces: &mut Vec<String>,
    issues: &mut Issues,
    path: &str,
) -> v2::Response {
    if let Some(pointer) = &response.reference {
        return v2::Response { reference: Some(refs::to_legacy(pointer)), ..v2::Response::default() };
    }

    let mut out = v2::Response {
        description: response.description.clone(),
        extensions: response.extensions.clone(),
        ..v2::Response::default()
    };
    let content_path = at(path, "content");

    for mime in response.content.keys() {
        if !produces.contains(mime) {
            produces.push(mime.clone());
        }
    }

    if let Some((mime, media)) = response.content.first() {
        let media_path = at(&content_path, mime);
        out.schema = media
            .schema
            .as_ref()
            .map(|s| schemas::to_legacy(s, issues, &at(&media_path, "schema")));
        if response.content.len() > 1 {
            issues.add(
                Severity::Warning,
                content_path.as_str(),
                format!(
                    "{} media type schema(s) dropped; only `{mime}` is kept",
                    response.content.len() - 1
                ),
                Some(response.content.keys().skip(1).cloned().collect::<Vec<_>>().join(", ")),
            );
        }
    }

    for (mime, media) in &response.content {
        if let Some(example) = &media.example {
            out.examples.insert(mime.clone(), example.clone());
        }
        if !media.examples.is_empty() {
            issues.add(
                Severity::Warning,
                at(&at(&content_path, mime), "examples"),
                "named examples are not supported in OpenAPI 2.0",
                None,
            );
        }
    }

    if !response.links.is_empty() {
        issues.add(
            Severity::Critical,
            at(path, "links"),
            "response links are not supported in OpenAPI 2.0",
            Some(response.links.keys().cloned().collect::<Vec<_>>().join(", ")),
        );
    }

    for (name, header) in &response.headers {
        let header_path = at(&at(path, "headers"), name);
        if let Some(converted) = downgrade_header(header, issues, &header_path) {
            out.headers.insert(name.clone(), converted);
        }
    }
    out
}

fn downgrade_header(header: &v3::Header, issues: &mut Issues, path: &str) -> Option<v2::Header> {
    if let Some(pointer) = &header.reference {
        issues.add(
            Severity::Warning,
            path,
            "header references are not supported in OpenAPI 2.0; header dropped",
            Some(pointer.clone()),
        );
        return None;
    }

    let simple = match (&header.schema, header.content.first()) {
        (Some(schema), _) if !schema.is_reference() => {
            schema_to_simple(&schemas::to_legacy(schema, issues, &at(path, "schema")))
        }
        (Some(schema), _) => {
            issues.add(
                Severity::Warning,
                at(path, "schema"),
                "headers cannot reference a schema in OpenAPI 2.0; using `type: string`",
                schema.reference.clone(),
            );
            string_simple()
        }
        (None, Some((mime, _))) => {
            issues.add(
                Severity::Warning,
                at(path, "content"),
                format!("header `content` is not supported in OpenAPI 2.0; `{mime}` dropped"),
                None,
            );
            string_simple()
        }
        (None, None) => string_simple(),
    };
    Some(v2::Header {
        description: header.description.clone(),
        simple,
        extensions: header.extensions.clone(),
    })
}

fn string_simple() -> v2::SimpleSchema {
    v2::SimpleSchema { item_type: Some("string".into()), ..v2::SimpleSchema::default() }
}
