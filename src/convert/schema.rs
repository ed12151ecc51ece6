//! Schema node conversion.
//!
//! Both directions return an independent copy; the caller's node is never
//! touched. The downgrade direction first scans the *source* tree for
//! keywords 2.0 cannot express.
use std::collections::HashSet;

use serde_json::Number;

use crate::issue::{Issues, Severity, at};
use crate::model::{Discriminator, DiscriminatorObject, ExclusiveBound, Schema, SchemaType};
use crate::refs::{self, RefDirection};

// ————————————————————————————————————————————————————————————————————————————
// UPGRADE
// ————————————————————————————————————————————————————————————————————————————

/// Copy `schema` into the 3.x namespace. Lossless, so no diagnostics.
pub fn to_modern(schema: &Schema) -> Schema {
    let mut out = schema.clone();
    refs::rewrite_all(&mut out, RefDirection::ToModern);
    lift_discriminators(&mut out);
    out
}

/// From 3.1 `exclusiveMinimum`/`exclusiveMaximum` are bounds of their own.
/// A boolean `true` takes over the value of its sibling `minimum`/`maximum`;
/// `false` says nothing and is removed.
pub fn lift_exclusive_bounds(node: &mut Schema) {
    lift_bound(&mut node.minimum, &mut node.exclusive_minimum);
    lift_bound(&mut node.maximum, &mut node.exclusive_maximum);
    for (_, child) in node.children_mut() {
        lift_exclusive_bounds(child);
    }
}

fn lift_bound(bound: &mut Option<Number>, exclusive: &mut Option<ExclusiveBound>) {
    if let Some(ExclusiveBound::Flag(flag)) = *exclusive {
        *exclusive = if flag { bound.take().map(ExclusiveBound::Bound) } else { None };
    }
}

fn lift_discriminators(node: &mut Schema) {
    if let Some(Discriminator::PropertyName(name)) = &node.discriminator {
        node.discriminator = Some(Discriminator::Object(DiscriminatorObject {
            property_name: name.clone(),
            ..DiscriminatorObject::default()
        }));
    }
    for (_, child) in node.children_mut() {
        lift_discriminators(child);
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DOWNGRADE
// ————————————————————————————————————————————————————————————————————————————

/// Copy `schema` into the 2.0 namespace, reporting every 3.x-only keyword
/// found at or below `path`.
pub fn to_legacy(schema: &Schema, issues: &mut Issues, path: &str) -> Schema {
    let mut visited = HashSet::new();
    scan_features(schema, path, issues, &mut visited);

    let mut out = schema.clone();
    refs::rewrite_all(&mut out, RefDirection::ToLegacy);
    flatten_shapes(&mut out, path, issues);
    out
}

/// Read-only, cycle-safe feature scan. Stops at referencing nodes: their target
/// is scanned where it is defined.
fn scan_features(node: &Schema, path: &str, issues: &mut Issues, visited: &mut HashSet<*const Schema>) {
    if !visited.insert(node as *const Schema) {
        return;
    }
    if node.is_reference() {
        return;
    }

    let unsupported = |keyword: &str| format!("`{keyword}` is not supported in OpenAPI 2.0");
    if node.nullable == Some(true) {
        issues.add(
            Severity::Warning,
            path,
            unsupported("nullable"),
            Some("consider the `x-nullable` vendor extension".into()),
        );
    }
    if node.write_only == Some(true) {
        issues.add(Severity::Warning, path, unsupported("writeOnly"), None);
    }
    if node.deprecated == Some(true) {
        issues.add(Severity::Warning, path, format!("schema-level {}", unsupported("deprecated")), None);
    }
    for (keyword, branch) in [("if", &node.if_schema), ("then", &node.then_schema), ("else", &node.else_schema)] {
        if branch.is_some() {
            issues.add(Severity::Warning, at(path, keyword), unsupported(keyword), None);
        }
    }
    if !node.prefix_items.is_empty() {
        issues.add(Severity::Warning, at(path, "prefixItems"), unsupported("prefixItems"), None);
    }
    if node.contains.is_some() {
        issues.add(Severity::Warning, at(path, "contains"), unsupported("contains"), None);
    }
    if node.property_names.is_some() {
        issues.add(Severity::Warning, at(path, "propertyNames"), unsupported("propertyNames"), None);
    }

    for (segment, child) in node.children() {
        scan_features(child, &at(path, &segment), issues, visited);
    }
}

/// Collapse keyword shapes that only exist from 3.x on into their 2.0 form.
fn flatten_shapes(node: &mut Schema, path: &str, issues: &mut Issues) {
    if let Some(SchemaType::Multiple(names)) = &node.schema_type {
        let kept = names.iter().find(|n| n.as_str() != "null").or(names.first()).cloned();
        if names.len() > 1 {
            issues.add(
                Severity::Warning,
                at(path, "type"),
                format!("type list [{}] collapsed to a single type", names.join(", ")),
                kept.clone(),
            );
        }
        node.schema_type = kept.map(SchemaType::Single);
    }

    if let Some(Discriminator::Object(obj)) = &node.discriminator {
        if !obj.mapping.is_empty() {
            issues.add(
                Severity::Warning,
                at(path, "discriminator"),
                format!("discriminator mapping with {} entr(y/ies) dropped", obj.mapping.len()),
                None,
            );
        }
        node.discriminator = Some(Discriminator::PropertyName(obj.property_name.clone()));
    }

    fold_bound(&mut node.minimum, &mut node.exclusive_minimum, "minimum", "exclusiveMinimum", path, issues);
    fold_bound(&mut node.maximum, &mut node.exclusive_maximum, "maximum", "exclusiveMaximum", path, issues);

    for (segment, child) in node.children_mut() {
        flatten_shapes(child, &at(path, &segment), issues);
    }
}

/// Numeric `exclusiveMinimum: n` → `minimum: n` plus the boolean modifier.
fn fold_bound(
    bound: &mut Option<Number>,
    exclusive: &mut Option<ExclusiveBound>,
    keyword: &str,
    exclusive_keyword: &str,
    path: &str,
    issues: &mut Issues,
) {
    let Some(ExclusiveBound::Bound(limit)) = exclusive.clone() else {
        return;
    };
    if let Some(existing) = bound.as_ref().filter(|b| **b != limit) {
        issues.add(
            Severity::Warning,
            at(path, exclusive_keyword),
            format!("`{keyword}: {existing}` replaced by the exclusive bound {limit}"),
            None,
        );
    }
    *bound = Some(limit);
    *exclusive = Some(ExclusiveBound::Flag(true));
}

// ————————————————————————————————————————————————————————————————————————————
// 3.0 → 3.1 DEPRECATIONS
// ————————————————————————————————————————————————————————————————————————————

/// Report every `nullable` reachable through items, properties,
/// additionalProperties, composition lists and `not`.
pub fn scan_nullable(node: &Schema, path: &str, issues: &mut Issues) {
    if node.nullable == Some(true) {
        issues.add(
            Severity::Warning,
            path,
            "`nullable` is deprecated from OpenAPI 3.1; use a type list containing \"null\"",
            None,
        );
    }
    if let Some(items) = node.items.as_ref().and_then(|s| s.as_schema()) {
        scan_nullable(items, &at(path, "items"), issues);
    }
    for (name, prop) in &node.properties {
        scan_nullable(prop, &at(path, &format!("properties.{name}")), issues);
    }
    if let Some(extra) = node.additional_properties.as_ref().and_then(|s| s.as_schema()) {
        scan_nullable(extra, &at(path, "additionalProperties"), issues);
    }
    for (key, list) in [("allOf", &node.all_of), ("anyOf", &node.any_of), ("oneOf", &node.one_of)] {
        for (i, s) in list.iter().enumerate() {
            scan_nullable(s, &format!("{}[{i}]", at(path, key)), issues);
        }
    }
    if let Some(not) = &node.not {
        scan_nullable(not, &at(path, "not"), issues);
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(v: serde_json::Value) -> Schema {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn to_modern_rewrites_pointers_and_leaves_input_alone() {
        let src = schema(json!({
            "type": "object",
            "discriminator": "kind",
            "properties": { "pet": { "$ref": "#/definitions/Pet" } }
        }));
        let before = src.clone();
        let out = to_modern(&src);
        assert_eq!(src, before);
        assert_eq!(out.properties["pet"].reference.as_deref(), Some("#/components/schemas/Pet"));
        assert!(matches!(out.discriminator, Some(Discriminator::Object(ref d)) if d.property_name == "kind"));
    }

    #[test]
    fn to_legacy_reports_each_feature_at_its_nested_path() {
        let src = schema(json!({
            "type": "object",
            "properties": {
                "password": { "type": "string", "writeOnly": true },
                "tags": {
                    "type": "array",
                    "prefixItems": [{ "type": "string" }],
                    "contains": { "type": "string" }
                },
                "rule": {
                    "if": { "required": ["a"] },
                    "else": { "required": ["b"] },
                    "propertyNames": { "pattern": "^[a-z]+$" }
                },
                "legacy": { "type": "string", "nullable": true, "deprecated": true }
            }
        }));
        let mut issues = Issues::new();
        let out = to_legacy(&src, &mut issues, "components.schemas.User");
        let found: Vec<(String, String)> = issues
            .as_slice()
            .iter()
            .map(|i| (i.path.clone(), i.message.clone()))
            .collect();
        let has = |path: &str, word: &str| found.iter().any(|(p, m)| p == path && m.contains(word));
        assert!(has("components.schemas.User.properties.password", "writeOnly"));
        assert!(has("components.schemas.User.properties.tags.prefixItems", "prefixItems"));
        assert!(has("components.schemas.User.properties.tags.contains", "contains"));
        assert!(has("components.schemas.User.properties.rule.if", "`if`"));
        assert!(has("components.schemas.User.properties.rule.else", "`else`"));
        assert!(!found.iter().any(|(p, _)| p.ends_with(".then")));
        assert!(has("components.schemas.User.properties.rule.propertyNames", "propertyNames"));
        assert!(has("components.schemas.User.properties.legacy", "nullable"));
        assert!(has("components.schemas.User.properties.legacy", "deprecated"));
        assert_eq!(found.len(), 8);
        assert!(issues.as_slice().iter().all(|i| i.severity == Severity::Warning));
        // the copy keeps the keywords; only pointers and shapes change
        assert_eq!(out.properties["password"].write_only, Some(true));
    }

    #[test]
    fn scan_stops_at_references() {
        let src = schema(json!({
            "properties": {
                "next": { "$ref": "#/components/schemas/Node", "nullable": true },
                "value": { "type": "string", "nullable": true }
            }
        }));
        let mut issues = Issues::new();
        let out = to_legacy(&src, &mut issues, "components.schemas.Node");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.as_slice()[0].path, "components.schemas.Node.properties.value");
        assert_eq!(out.properties["next"].reference.as_deref(), Some("#/definitions/Node"));
    }

    #[test]
    fn boolean_forms_are_never_descended() {
        let src = schema(json!({
            "additionalProperties": false,
            "items": true,
            "unevaluatedProperties": { "writeOnly": true }
        }));
        let mut issues = Issues::new();
        to_legacy(&src, &mut issues, "s");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.as_slice()[0].path, "s.unevaluatedProperties");
    }

    #[test]
    fn type_lists_and_discriminator_objects_are_flattened() {
        let src = schema(json!({
            "type": ["null", "string"],
            "discriminator": { "propertyName": "kind", "mapping": { "a": "#/components/schemas/A" } }
        }));
        let mut issues = Issues::new();
        let out = to_legacy(&src, &mut issues, "s");
        assert_eq!(out.schema_type, Some(SchemaType::Single("string".into())));
        assert_eq!(out.discriminator, Some(Discriminator::PropertyName("kind".into())));
        let paths: Vec<&str> = issues.as_slice().iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["s.type", "s.discriminator"]);
    }

    #[test]
    fn nullable_scan_follows_the_structural_keywords() {
        let src = schema(json!({
            "type": "object",
            "nullable": true,
            "properties": { "a": { "type": "string", "nullable": true } },
            "additionalProperties": { "nullable": true },
            "items": { "nullable": true },
            "allOf": [{ "nullable": true }],
            "not": { "nullable": true },
            "if": { "nullable": true }
        }));
        let mut issues = Issues::new();
        scan_nullable(&src, "components.schemas.X", &mut issues);
        let paths: Vec<&str> = issues.as_slice().iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "components.schemas.X",
                "components.schemas.X.items",
                "components.schemas.X.properties.a",
                "components.schemas.X.additionalProperties",
                "components.schemas.X.allOf[0]",
                "components.schemas.X.not",
            ]
        );
    }

    #[test]
    fn numeric_exclusive_bounds_fold_into_the_boolean_form() {
        let src = schema(json!({
            "type": "object",
            "properties": {
                "age": { "type": "integer", "exclusiveMinimum": 0 },
                "score": { "type": "number", "maximum": 10, "exclusiveMaximum": 5 }
            }
        }));
        let mut issues = Issues::new();
        let out = to_legacy(&src, &mut issues, "components.schemas.S");
        let age = &out.properties["age"];
        assert_eq!(age.minimum, Some(Number::from(0)));
        assert_eq!(age.exclusive_minimum, Some(ExclusiveBound::Flag(true)));
        let score = &out.properties["score"];
        assert_eq!(score.maximum, Some(Number::from(5)));
        assert_eq!(score.exclusive_maximum, Some(ExclusiveBound::Flag(true)));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.as_slice()[0].path, "components.schemas.S.properties.score.exclusiveMaximum");
    }

    #[test]
    fn boolean_exclusive_bounds_lift_to_numbers() {
        let mut node = schema(json!({
            "type": "object",
            "properties": {
                "age": { "type": "integer", "minimum": 0, "exclusiveMinimum": true },
                "size": { "type": "integer", "maximum": 9, "exclusiveMaximum": false }
            }
        }));
        lift_exclusive_bounds(&mut node);
        let age = &node.properties["age"];
        assert_eq!(age.minimum, None);
        assert_eq!(age.exclusive_minimum, Some(ExclusiveBound::Bound(Number::from(0))));
        let size = &node.properties["size"];
        assert_eq!(size.maximum, Some(Number::from(9)));
        assert_eq!(size.exclusive_maximum, None);
    }

    #[test]
    fn explicit_non_nullable_is_not_reported() {
        let src = schema(json!({
            "type": "object",
            "nullable": false,
            "properties": { "a": { "type": "string", "nullable": false } }
        }));
        let mut issues = Issues::new();
        scan_nullable(&src, "components.schemas.N", &mut issues);
        assert!(issues.is_empty());
    }
}
