//! `$ref` pointer remapping between the 2.0 and 3.x component namespaces, plus a
//! walker that reaches every pointer-bearing slot of a document fragment.
//!
//! The walker only descends into real schema nodes; boolean forms of
//! node-or-boolean keywords are terminal.
use crate::model::{Discriminator, Schema, v2, v3};

// ————————————————————————————————————————————————————————————————————————————
// PREFIX TABLES
// ————————————————————————————————————————————————————————————————————————————

/// In-document pointers start with this marker. Everything else is remote and passed through.
pub const ANCHOR: char = '#';

/// Paired prefixes. Index `i` of one table corresponds to index `i` of the other,
/// so a pointer mapped once becomes unrecognised by the source table.
pub const LEGACY_PREFIXES: [&str; 4] = [
    "#/definitions/",
    "#/parameters/",
    "#/responses/",
    "#/securityDefinitions/",
];

pub const MODERN_PREFIXES: [&str; 4] = [
    "#/components/schemas/",
    "#/components/parameters/",
    "#/components/responses/",
    "#/components/securitySchemes/",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefDirection {
    /// 2.0 → 3.x
    ToModern,
    /// 3.x → 2.0
    ToLegacy,
}

impl RefDirection {
    fn tables(self) -> (&'static [&'static str; 4], &'static [&'static str; 4]) {
        match self {
            RefDirection::ToModern => (&LEGACY_PREFIXES, &MODERN_PREFIXES),
            RefDirection::ToLegacy => (&MODERN_PREFIXES, &LEGACY_PREFIXES),
        }
    }
}

/// Map `pointer` into the other dialect's namespace. `None` when nothing matches,
/// which covers remote pointers and pointers that were already rewritten.
pub fn rewrite(pointer: &str, direction: RefDirection) -> Option<String> {
    if !pointer.starts_with(ANCHOR) {
        return None;
    }
    let (from, to) = direction.tables();
    from.iter()
        .zip(to.iter())
        .find_map(|(src, dst)| pointer.strip_prefix(src).map(|rest| format!("{dst}{rest}")))
}

pub fn to_modern(pointer: &str) -> String {
    rewrite(pointer, RefDirection::ToModern).unwrap_or_else(|| pointer.to_string())
}

pub fn to_legacy(pointer: &str) -> String {
    rewrite(pointer, RefDirection::ToLegacy).unwrap_or_else(|| pointer.to_string())
}

/// Rewrite every pointer reachable from `node` in place.
pub fn rewrite_all<T: WalkRefs + ?Sized>(node: &mut T, direction: RefDirection) {
    node.walk_refs(&mut |pointer: &mut String| {
        if let Some(mapped) = rewrite(pointer, direction) {
            *pointer = mapped;
        }
    });
}

// ————————————————————————————————————————————————————————————————————————————
// TREE WALK
// ————————————————————————————————————————————————————————————————————————————

/// Anything that may hold pointers, directly or through nested schemas.
pub trait WalkRefs {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F);
}

fn walk_opt<T: WalkRefs, F: FnMut(&mut String)>(slot: &mut Option<T>, f: &mut F) {
    if let Some(inner) = slot {
        inner.walk_refs(f);
    }
}

fn walk_ref<F: FnMut(&mut String)>(slot: &mut Option<String>, f: &mut F) {
    if let Some(pointer) = slot {
        f(pointer);
    }
}

impl<T: WalkRefs> WalkRefs for Vec<T> {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        for item in self.iter_mut() {
            item.walk_refs(f);
        }
    }
}

impl<T: WalkRefs> WalkRefs for indexmap::IndexMap<String, T> {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        for item in self.values_mut() {
            item.walk_refs(f);
        }
    }
}

impl<R: WalkRefs> WalkRefs for crate::model::Responses<R> {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        walk_opt(&mut self.default, f);
        self.codes.walk_refs(f);
    }
}

impl WalkRefs for Schema {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        walk_ref(&mut self.reference, f);
        if let Some(Discriminator::Object(d)) = &mut self.discriminator {
            for target in d.mapping.values_mut() {
                f(target);
            }
        }
        for (_, child) in self.children_mut() {
            child.walk_refs(f);
        }
    }
}

// ---- 2.0 ----

impl WalkRefs for v2::Parameter {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        walk_ref(&mut self.reference, f);
        walk_opt(&mut self.schema, f);
        if let Some(items) = &mut self.simple.items {
            items.walk_refs(f);
        }
    }
}

impl WalkRefs for v2::Response {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        walk_ref(&mut self.reference, f);
        walk_opt(&mut self.schema, f);
        for header in self.headers.values_mut() {
            if let Some(items) = &mut header.simple.items {
                items.walk_refs(f);
            }
        }
    }
}

impl WalkRefs for v2::Operation {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        self.parameters.walk_refs(f);
        self.responses.walk_refs(f);
    }
}

impl WalkRefs for v2::PathItem {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        walk_ref(&mut self.reference, f);
        self.parameters.walk_refs(f);
        for op in self.operations_mut() {
            op.walk_refs(f);
        }
    }
}

// ---- 3.x ----

impl WalkRefs for v3::MediaType {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        walk_opt(&mut self.schema, f);
    }
}

impl WalkRefs for v3::Parameter {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        walk_ref(&mut self.reference, f);
        walk_opt(&mut self.schema, f);
        self.content.walk_refs(f);
    }
}

impl WalkRefs for v3::RequestBody {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        walk_ref(&mut self.reference, f);
        self.content.walk_refs(f);
    }
}

impl WalkRefs for v3::Header {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        walk_ref(&mut self.reference, f);
        walk_opt(&mut self.schema, f);
        self.content.walk_refs(f);
    }
}

impl WalkRefs for v3::Link {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        walk_ref(&mut self.reference, f);
        walk_ref(&mut self.operation_ref, f);
    }
}

impl WalkRefs for v3::Response {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        walk_ref(&mut self.reference, f);
        self.headers.walk_refs(f);
        self.content.walk_refs(f);
        self.links.walk_refs(f);
    }
}

impl WalkRefs for v3::Operation {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        self.parameters.walk_refs(f);
        walk_opt(&mut self.request_body, f);
        self.responses.walk_refs(f);
        for callback in self.callbacks.values_mut() {
            callback.walk_refs(f);
        }
    }
}

impl WalkRefs for v3::PathItem {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        walk_ref(&mut self.reference, f);
        self.parameters.walk_refs(f);
        for op in self.operations_mut() {
            op.walk_refs(f);
        }
    }
}

impl WalkRefs for v3::SecurityScheme {
    fn walk_refs<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        walk_ref(&mut self.reference, f);
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tables_are_paired() {
        assert_eq!(LEGACY_PREFIXES.len(), MODERN_PREFIXES.len());
        for (legacy, modern) in LEGACY_PREFIXES.iter().zip(MODERN_PREFIXES.iter()) {
            let name = "Thing";
            assert_eq!(to_modern(&format!("{legacy}{name}")), format!("{modern}{name}"));
            assert_eq!(to_legacy(&format!("{modern}{name}")), format!("{legacy}{name}"));
        }
    }

    #[test]
    fn rewriting_is_a_fixed_point_once_in_the_target_namespace() {
        for p in [
            "#/definitions/Pet",
            "#/parameters/limit",
            "#/responses/NotFound",
            "#/securityDefinitions/key",
            "#/definitions/Pet/properties/name",
        ] {
            let modern = to_modern(p);
            assert_eq!(to_modern(&to_legacy(&modern)), modern);
            assert_eq!(to_modern(&modern), modern, "second pass must not rewrite {modern}");
        }
    }

    #[test]
    fn remote_and_unknown_pointers_pass_through() {
        for p in ["other.yaml#/definitions/Pet", "https://x/y.json", "#/x-custom/Thing", "#/components/requestBodies/Body"] {
            assert_eq!(rewrite(p, RefDirection::ToModern), None);
            assert_eq!(to_legacy(p), p);
        }
    }

    #[test]
    fn walk_reaches_nested_schema_slots_and_discriminator_mapping() {
        let mut s: Schema = serde_json::from_value(json!({
            "properties": {
                "pet": { "$ref": "#/definitions/Pet" },
                "list": { "items": { "$ref": "#/definitions/Item" } }
            },
            "additionalProperties": true,
            "oneOf": [{ "$ref": "#/definitions/A" }],
            "if": { "$ref": "#/definitions/B" },
            "$defs": { "local": { "$ref": "#/definitions/C" } },
            "discriminator": { "propertyName": "kind", "mapping": { "a": "#/definitions/A", "b": "B" } }
        }))
        .unwrap();
        rewrite_all(&mut s, RefDirection::ToModern);
        let out = serde_json::to_value(&s).unwrap();
        assert_eq!(out["properties"]["pet"]["$ref"], "#/components/schemas/Pet");
        assert_eq!(out["properties"]["list"]["items"]["$ref"], "#/components/schemas/Item");
        assert_eq!(out["oneOf"][0]["$ref"], "#/components/schemas/A");
        assert_eq!(out["if"]["$ref"], "#/components/schemas/B");
        assert_eq!(out["$defs"]["local"]["$ref"], "#/components/schemas/C");
        assert_eq!(out["discriminator"]["mapping"]["a"], "#/components/schemas/A");
        assert_eq!(out["discriminator"]["mapping"]["b"], "B");
        assert_eq!(out["additionalProperties"], true);
    }

    #[test]
    fn walk_reaches_operation_content_headers_and_links() {
        let mut item: v3::PathItem = serde_json::from_value(json!({
            "parameters": [{ "$ref": "#/components/parameters/limit" }],
            "post": {
                "requestBody": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } } } },
                "responses": {
                    "200": {
                        "description": "ok",
                        "headers": { "X-Rate": { "schema": { "$ref": "#/components/schemas/Rate" } } },
                        "links": { "next": { "$ref": "#/components/links/Next" } }
                    },
                    "default": { "$ref": "#/components/responses/Error" }
                }
            }
        }))
        .unwrap();
        let mut seen = Vec::new();
        item.walk_refs(&mut |p: &mut String| seen.push(p.clone()));
        assert_eq!(
            seen,
            vec![
                "#/components/parameters/limit",
                "#/components/schemas/Pet",
                "#/components/responses/Error",
                "#/components/schemas/Rate",
                "#/components/links/Next",
            ]
        );
        rewrite_all(&mut item, RefDirection::ToLegacy);
        let op = item.post.as_ref().unwrap();
        assert_eq!(op.responses.default.as_ref().unwrap().reference.as_deref(), Some("#/responses/Error"));
        assert_eq!(item.parameters[0].reference.as_deref(), Some("#/parameters/limit"));
    }
}
