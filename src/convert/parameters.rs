//! Parameter lists and request bodies.
//!
//! 2.0 folds the request payload into the parameter list (`in: body` or a set
//! of `in: formData` fields); 3.x moves it into a separate request body keyed
//! by media type. Non-body parameters describe themselves inline in 2.0 and
//! through a schema in 3.x.
use indexmap::IndexMap;
use serde_json::Value;

use super::schema as schemas;
use crate::issue::{Issues, Severity, at, index};
use crate::model::{ExclusiveBound, Schema, SchemaOrBool, SchemaType, v2, v3};
use crate::refs;

pub const DEFAULT_MEDIA_TYPE: &str = "application/json";
pub const MULTIPART: &str = "multipart/form-data";
pub const URLENCODED: &str = "application/x-www-form-urlencoded";

/// Carries the 2.0 body parameter name through a 3.x document.
pub const BODY_NAME_EXTENSION: &str = "x-codegen-request-body-name";
pub const DEFAULT_BODY_NAME: &str = "body";

pub const REQUEST_BODIES_PREFIX: &str = "#/components/requestBodies/";
const LEGACY_PARAMETERS_PREFIX: &str = "#/parameters/";

// ————————————————————————————————————————————————————————————————————————————
// UPGRADE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Default)]
pub struct ModernParameters {
    pub parameters: Vec<v3::Parameter>,
    pub request_body: Option<v3::RequestBody>,
}

/// Split a 2.0 parameter list into 3.x parameters and an optional request body.
///
/// `globals` is the document-level parameter table; references into it are
/// inspected so body references become request-body references and form
/// references are inlined. `consumes` is the operation's effective list.
pub fn upgrade_list(
    params: &[v2::Parameter],
    globals: &IndexMap<String, v2::Parameter>,
    consumes: &[String],
    issues: &mut Issues,
    path: &str,
) -> ModernParameters {
    let list_path = at(path, "parameters");
    let mut out = ModernParameters::default();
    let mut body: Option<v3::RequestBody> = None;
    let mut form: Vec<&v2::Parameter> = Vec::new();

    for (i, param) in params.iter().enumerate() {
        if let Some(pointer) = &param.reference {
            match global_target(pointer, globals) {
                Some((name, target)) if target.is_body() => {
                    body = Some(v3::RequestBody {
                        reference: Some(format!("{REQUEST_BODIES_PREFIX}{name}")),
                        ..v3::RequestBody::default()
                    });
                }
                Some((_, target)) if target.is_form() => form.push(target),
                _ => out.parameters.push(v3::Parameter {
                    reference: Some(refs::to_modern(pointer)),
                    ..v3::Parameter::default()
                }),
            }
            continue;
        }
        if param.is_body() {
            body = Some(body_to_request_body(param, consumes));
        } else if param.is_form() {
            form.push(param);
        } else {
            out.parameters.push(upgrade_parameter(param, issues, &index(&list_path, i)));
        }
    }

    match (body, form.is_empty()) {
        (Some(body), false) => {
            let names: Vec<&str> = form.iter().map(|p| p.name.as_str()).collect();
            issues.add(
                Severity::Warning,
                list_path,
                "body and formData parameters declared together; formData parameters dropped",
                Some(names.join(", ")),
            );
            out.request_body = Some(body);
        }
        (Some(body), true) => out.request_body = Some(body),
        (None, false) => out.request_body = Some(form_to_request_body(&form)),
        (None, true) => {}
    }
    out
}

/// Whether `param` carries the request payload, directly or through a global reference.
pub fn is_payload(param: &v2::Parameter, globals: &IndexMap<String, v2::Parameter>) -> bool {
    match &param.reference {
        Some(pointer) => global_target(pointer, globals).is_some_and(|(_, p)| p.is_body() || p.is_form()),
        None => param.is_body() || param.is_form(),
    }
}

fn global_target<'a>(
    pointer: &'a str,
    globals: &'a IndexMap<String, v2::Parameter>,
) -> Option<(&'a str, &'a v2::Parameter)> {
    let name = pointer.strip_prefix(LEGACY_PARAMETERS_PREFIX)?;
    globals.get(name).map(|p| (name, p))
}

/// A non-body, non-form 2.0 parameter.
pub fn upgrade_parameter(param: &v2::Parameter, issues: &mut Issues, path: &str) -> v3::Parameter {
    if let Some(pointer) = &param.reference {
        return v3::Parameter { reference: Some(refs::to_modern(pointer)), ..v3::Parameter::default() };
    }
    let schema = match &param.schema {
        Some(schema) => schemas::to_modern(schema),
        None => simple_to_schema(&param.simple),
    };
    let (style, explode) = collection_to_style(param, issues, path);
    v3::Parameter {
        name: param.name.clone(),
        location: param.location.clone(),
        description: param.description.clone(),
        required: param.required,
        allow_empty_value: param.allow_empty_value,
        style,
        explode,
        schema: Some(schema),
        extensions: param.extensions.clone(),
        ..v3::Parameter::default()
    }
}

fn collection_to_style(param: &v2::Parameter, issues: &mut Issues, path: &str) -> (Option<String>, Option<bool>) {
    let Some(format) = param.simple.collection_format.as_deref() else {
        return (None, None);
    };
    let form_like = matches!(param.location.as_str(), "query" | "formData");
    match format {
        "csv" if form_like => (Some("form".into()), Some(false)),
        "csv" => (Some("simple".into()), Some(false)),
        "multi" => (Some("form".into()), Some(true)),
        "ssv" => (Some("spaceDelimited".into()), Some(false)),
        "pipes" => (Some("pipeDelimited".into()), Some(false)),
        other => {
            issues.add(
                Severity::Warning,
                at(path, "collectionFormat"),
                format!("collectionFormat `{other}` has no OpenAPI 3.x style equivalent"),
                None,
            );
            (None, None)
        }
    }
}

/// Body parameter → request body with one content entry per media type.
pub fn body_to_request_body(param: &v2::Parameter, consumes: &[String]) -> v3::RequestBody {
    let schema = param.schema.as_ref().map(schemas::to_modern);
    let content = media_types_or_default(consumes)
        .into_iter()
        .map(|mime| (mime, v3::MediaType { schema: schema.clone(), ..v3::MediaType::default() }))
        .collect();

    let mut extensions = param.extensions.clone();
    if !param.name.is_empty() && param.name != DEFAULT_BODY_NAME {
        extensions.insert(BODY_NAME_EXTENSION.into(), Value::String(param.name.clone()));
    }
    v3::RequestBody {
        reference: None,
        description: param.description.clone(),
        content,
        required: param.required,
        extensions,
    }
}

fn form_to_request_body(form: &[&v2::Parameter]) -> v3::RequestBody {
    let multipart = form.iter().any(|p| p.simple.item_type.as_deref() == Some("file"));
    let mut object = Schema::of_type("object");
    for param in form {
        let mut property = simple_to_schema(&param.simple);
        property.description = param.description.clone();
        object.properties.insert(param.name.clone(), property);
        if param.required == Some(true) {
            object.required.push(param.name.clone());
        }
    }
    let required = (!object.required.is_empty()).then_some(true);
    let mime = if multipart { MULTIPART } else { URLENCODED };
    let mut content = IndexMap::new();
    content.insert(mime.to_string(), v3::MediaType { schema: Some(object), ..v3::MediaType::default() });
    v3::RequestBody { content, required, ..v3::RequestBody::default() }
}

pub fn media_types_or_default(list: &[String]) -> Vec<String> {
    if list.is_empty() {
        vec![DEFAULT_MEDIA_TYPE.to_string()]
    } else {
        list.to_vec()
    }
}

/// Inline 2.0 primitive description → schema node. `file` becomes binary string.
pub fn simple_to_schema(simple: &v2::SimpleSchema) -> Schema {
    let mut schema = Schema {
        format: simple.format.clone(),
        default: simple.default.clone(),
        maximum: simple.maximum.clone(),
        exclusive_maximum: simple.exclusive_maximum.map(ExclusiveBound::Flag),
        minimum: simple.minimum.clone(),
        exclusive_minimum: simple.exclusive_minimum.map(ExclusiveBound::Flag),
        max_length: simple.max_length,
        min_length: simple.min_length,
        pattern: simple.pattern.clone(),
        max_items: simple.max_items,
        min_items: simple.min_items,
        unique_items: simple.unique_items,
        enum_values: simple.enum_values.clone(),
        multiple_of: simple.multiple_of.clone(),
        items: simple.items.as_deref().map(|items| SchemaOrBool::from(schemas::to_modern(items))),
        ..Schema::default()
    };
    match simple.item_type.as_deref() {
        Some("file") => {
            schema.schema_type = Some(SchemaType::Single("string".into()));
            schema.format = Some("binary".into());
        }
        Some(name) => schema.schema_type = Some(SchemaType::Single(name.into())),
        None => {}
    }
    schema
}

// ————————————————————————————————————————————————————————————————————————————
// DOWNGRADE
// ————————————————————————————————————————————————————————————————————————————

/// `None` when the parameter has no 2.0 equivalent and was dropped.
pub fn downgrade_parameter(param: &v3::Parameter, issues: &mut Issues, path: &str) -> Option<v2::Parameter> {
    if let Some(pointer) = &param.reference {
        return Some(v2::Parameter { reference: Some(refs::to_legacy(pointer)), ..v2::Parameter::default() });
    }
    if param.location == "cookie" {
        issues.add(
            Severity::Critical,
            path,
            "cookie parameters are not supported in OpenAPI 2.0; parameter dropped",
            Some(param.name.clone()),
        );
        return None;
    }

    let source: Option<(&Schema, String)> = match (&param.schema, param.content.first()) {
        (Some(schema), _) => Some((schema, at(path, "schema"))),
        (None, Some((mime, media))) => {
            issues.add(
                Severity::Warning,
                at(path, "content"),
                format!("parameter `content` is not supported in OpenAPI 2.0; using the `{mime}` schema"),
                None,
            );
            media
                .schema
                .as_ref()
                .map(|s| (s, at(&at(&at(path, "content"), mime), "schema")))
        }
        (None, None) => None,
    };

    let mut simple = match source {
        Some((schema, schema_path)) if schema.is_reference() => {
            issues.add(
                Severity::Warning,
                schema_path,
                "non-body parameters cannot reference a schema in OpenAPI 2.0; using `type: string`",
                schema.reference.clone(),
            );
            string_simple()
        }
        Some((schema, schema_path)) => schema_to_simple(&schemas::to_legacy(schema, issues, &schema_path)),
        None => string_simple(),
    };
    if simple.item_type.as_deref() == Some("array") {
        simple.collection_format = style_to_collection(param, issues, path);
    }

    if param.deprecated == Some(true) {
        issues.add(
            Severity::Warning,
            at(path, "deprecated"),
            "parameter `deprecated` is not supported in OpenAPI 2.0",
            None,
        );
    }
    if !param.examples.is_empty() {
        issues.add(
            Severity::Warning,
            at(path, "examples"),
            "parameter `examples` are not supported in OpenAPI 2.0",
            None,
        );
    }

    let mut extensions = param.extensions.clone();
    if let Some(example) = &param.example {
        extensions.entry("x-example".into()).or_insert_with(|| example.clone());
    }
    Some(v2::Parameter {
        reference: None,
        name: param.name.clone(),
        location: param.location.clone(),
        description: param.description.clone(),
        required: param.required,
        schema: None,
        allow_empty_value: param.allow_empty_value,
        simple,
        extensions,
    })
}

fn string_simple() -> v2::SimpleSchema {
    v2::SimpleSchema { item_type: Some("string".into()), ..v2::SimpleSchema::default() }
}

fn style_to_collection(param: &v3::Parameter, issues: &mut Issues, path: &str) -> Option<String> {
    let default_style = match param.location.as_str() {
        "query" | "cookie" => "form",
        _ => "simple",
    };
    let style = param.style.as_deref().unwrap_or(default_style);
    let explode = param.explode.unwrap_or(style == "form");
    match style {
        "form" if explode => Some("multi".into()),
        "form" | "simple" => Some("csv".into()),
        "spaceDelimited" => Some("ssv".into()),
        "pipeDelimited" => Some("pipes".into()),
        other => {
            issues.add(
                Severity::Warning,
                at(path, "style"),
                format!("style `{other}` has no OpenAPI 2.0 collectionFormat equivalent"),
                None,
            );
            None
        }
    }
}

/// Schema node (already in 2.0 shape) → inline primitive description.
pub fn schema_to_simple(schema: &Schema) -> v2::SimpleSchema {
    let item_type = match &schema.schema_type {
        Some(SchemaType::Single(name)) => Some(name.clone()),
        Some(SchemaType::Multiple(names)) => names.iter().find(|n| n.as_str() != "null").cloned(),
        None => None,
    };
    let (maximum, exclusive_maximum) = legacy_bound(&schema.maximum, &schema.exclusive_maximum);
    let (minimum, exclusive_minimum) = legacy_bound(&schema.minimum, &schema.exclusive_minimum);
    v2::SimpleSchema {
        item_type,
        format: schema.format.clone(),
        items: schema
            .items
            .as_ref()
            .and_then(SchemaOrBool::as_schema)
            .map(|items| Box::new(items.clone())),
        collection_format: None,
        default: schema.default.clone(),
        maximum,
        exclusive_maximum,
        minimum,
        exclusive_minimum,
        max_length: schema.max_length,
        min_length: schema.min_length,
        pattern: schema.pattern.clone(),
        max_items: schema.max_items,
        min_items: schema.min_items,
        unique_items: schema.unique_items,
        enum_values: schema.enum_values.clone(),
        multiple_of: schema.multiple_of.clone(),
    }
}

fn legacy_bound(
    bound: &Option<serde_json::Number>,
    exclusive: &Option<ExclusiveBound>,
) -> (Option<serde_json::Number>, Option<bool>) {
    match exclusive {
        Some(ExclusiveBound::Flag(flag)) => (bound.clone(), Some(*flag)),
        Some(ExclusiveBound::Bound(n)) => (Some(n.clone()), Some(true)),
        None => (bound.clone(), None),
    }
}

#[derive(Debug, Default)]
pub struct LegacyBody {
    pub parameters: Vec<v2::Parameter>,
    /// Every declared request media type.
    pub consumes: Vec<String>,
}

/// Request body → one `in: body` parameter, or `formData` parameters when the
/// first media type is a form encoding with an inline object schema.
/// `path` points at the `requestBody` slot.
pub fn downgrade_request_body(
    body: &v3::RequestBody,
    bodies: &IndexMap<String, v3::RequestBody>,
    issues: &mut Issues,
    path: &str,
) -> LegacyBody {
    let mut current = body;
    let mut hops = 0;
    while let Some(pointer) = current.reference.as_deref() {
        let target = pointer.strip_prefix(REQUEST_BODIES_PREFIX).and_then(|name| bodies.get(name));
        match target {
            Some(target) if hops <= bodies.len() => {
                current = target;
                hops += 1;
            }
            _ => {
                issues.add(
                    Severity::Warning,
                    path,
                    "request body reference could not be resolved in the document; dropped",
                    Some(pointer.to_string()),
                );
                return LegacyBody::default();
            }
        }
    }

    let consumes: Vec<String> = current.content.keys().cloned().collect();
    let Some((mime, media)) = current.content.first() else {
        return LegacyBody { parameters: Vec::new(), consumes };
    };
    let content_path = at(path, "content");
    let media_path = at(&content_path, mime);

    if current.content.values().skip(1).any(|m| m.schema != media.schema) {
        issues.add(
            Severity::Warning,
            content_path.as_str(),
            format!("media types declare different schemas; only the `{mime}` schema is kept"),
            None,
        );
    }

    if is_form_media(mime) {
        if let Some(schema) = media.schema.as_ref().filter(|s| !s.is_reference() && !s.properties.is_empty()) {
            let parameters = form_parameters(schema, issues, &at(&media_path, "schema"));
            return LegacyBody { parameters, consumes };
        }
    }

    let name = current
        .extensions
        .get(BODY_NAME_EXTENSION)
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_BODY_NAME)
        .to_string();
    let schema = media
        .schema
        .as_ref()
        .map(|s| schemas::to_legacy(s, issues, &at(&media_path, "schema")))
        .unwrap_or_default();
    let mut extensions = current.extensions.clone();
    extensions.shift_remove(BODY_NAME_EXTENSION);

    let param = v2::Parameter {
        name,
        location: "body".into(),
        description: current.description.clone(),
        required: current.required,
        schema: Some(schema),
        extensions,
        ..v2::Parameter::default()
    };
    LegacyBody { parameters: vec![param], consumes }
}

fn is_form_media(mime: &str) -> bool {
    mime == MULTIPART || mime == URLENCODED
}

fn form_parameters(schema: &Schema, issues: &mut Issues, path: &str) -> Vec<v2::Parameter> {
    schema
        .properties
        .iter()
        .map(|(name, property)| {
            let property_path = at(path, &format!("properties.{name}"));
            let mut simple = if property.is_reference() {
                issues.add(
                    Severity::Warning,
                    property_path.as_str(),
                    "formData parameters cannot reference a schema in OpenAPI 2.0; using `type: string`",
                    property.reference.clone(),
                );
                string_simple()
            } else if is_nested(property) {
                issues.add(
                    Severity::Warning,
                    property_path.as_str(),
                    "formData parameters cannot carry nested objects in OpenAPI 2.0; using `type: string`",
                    None,
                );
                string_simple()
            } else {
                schema_to_simple(&schemas::to_legacy(property, issues, &property_path))
            };
            if simple.item_type.as_deref() == Some("string") && simple.format.as_deref() == Some("binary") {
                simple.item_type = Some("file".into());
                simple.format = None;
            }
            v2::Parameter {
                name: name.clone(),
                location: "formData".into(),
                description: property.description.clone(),
                required: schema.required.contains(name).then_some(true),
                simple,
                ..v2::Parameter::default()
            }
        })
        .collect()
}

/// Objects, and arrays of objects or references, have no formData form.
fn is_nested(schema: &Schema) -> bool {
    let is_object = |s: &Schema| {
        !s.properties.is_empty() || matches!(&s.schema_type, Some(SchemaType::Single(t)) if t == "object")
    };
    is_object(schema)
        || schema
            .items
            .as_ref()
            .and_then(SchemaOrBool::as_schema)
            .is_some_and(|items| items.is_reference() || is_object(items))
}
