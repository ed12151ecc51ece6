//! Direction dispatch.
//!
//! Every call takes exactly one of four routes, picked from the source and
//! target versions alone. Only the same-version route hands back the caller's
//! allocation; all others build an independent document.
pub mod bump;
pub mod downgrade;
pub mod parameters;
pub mod responses;
pub mod schema;
pub mod security;
pub mod servers;
pub mod upgrade;

use std::sync::Arc;

use crate::error::Result;
use crate::issue::{Issues, Severity};
use crate::model::Document;
use crate::version::{Family, Version};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    SameVersion,
    LegacyToModern,
    ModernToLegacy,
    ModernToModern,
}

impl Direction {
    pub fn classify(source: Version, target: Version) -> Self {
        if source == target {
            return Direction::SameVersion;
        }
        match (source.family(), target.family()) {
            (Family::Legacy, Family::Modern) => Direction::LegacyToModern,
            (Family::Modern, Family::Legacy) => Direction::ModernToLegacy,
            (Family::Modern, Family::Modern) => Direction::ModernToModern,
            // a single legacy version exists, so equal families here means equal versions
            (Family::Legacy, Family::Legacy) => Direction::SameVersion,
        }
    }
}

/// Convert `document` (declared as `source`) to `target`, appending every
/// finding to `issues`.
pub fn convert_document(
    document: &Arc<Document>,
    source: Version,
    target: Version,
    issues: &mut Issues,
) -> Result<Arc<Document>> {
    let direction = Direction::classify(source, target);
    log::debug!("{} → {}: {direction:?}", source.as_str(), target.as_str());

    match direction {
        Direction::SameVersion => {
            let marker = if source.is_legacy() { "swagger" } else { "openapi" };
            issues.add(
                Severity::Info,
                marker,
                format!("document is already at version {}; returned unchanged", source.as_str()),
                None,
            );
            Ok(Arc::clone(document))
        }
        Direction::LegacyToModern => {
            let out = upgrade::upgrade(document, target, issues)?;
            Ok(Arc::new(Document::V3(Box::new(out))))
        }
        Direction::ModernToLegacy => {
            let out = downgrade::downgrade(document, issues)?;
            Ok(Arc::new(Document::V2(Box::new(out))))
        }
        Direction::ModernToModern => {
            let out = bump::bump(document, source, target, issues)?;
            Ok(Arc::new(Document::V3(Box::new(out))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn parse(v: Value) -> (Arc<Document>, Version) {
        let (doc, version) = Document::from_value(v).unwrap();
        (Arc::new(doc), version)
    }

    fn run(v: Value, target: Version) -> (Arc<Document>, Arc<Document>, Vec<crate::issue::ConversionIssue>) {
        let (doc, version) = parse(v);
        let mut issues = Issues::new();
        let out = convert_document(&doc, version, target, &mut issues).unwrap();
        (doc, out, issues.into_vec())
    }

    fn count(issues: &[crate::issue::ConversionIssue], severity: Severity) -> usize {
        issues.iter().filter(|i| i.severity == severity).count()
    }

    #[test]
    fn classify_covers_all_routes() {
        assert_eq!(Direction::classify(Version::V2_0, Version::V2_0), Direction::SameVersion);
        assert_eq!(Direction::classify(Version::V2_0, Version::V3_1_0), Direction::LegacyToModern);
        assert_eq!(Direction::classify(Version::V3_2_0, Version::V2_0), Direction::ModernToLegacy);
        assert_eq!(Direction::classify(Version::V3_0_3, Version::V3_1_0), Direction::ModernToModern);
        assert_eq!(Direction::classify(Version::V3_1_0, Version::V3_0_3), Direction::ModernToModern);
    }

    #[test]
    fn same_version_returns_the_identical_document() {
        let (doc, version) = parse(json!({
            "openapi": "3.1.0",
            "info": { "title": "t", "version": "1" },
            "paths": { "/a": { "get": { "responses": { "200": { "description": "ok" } } } } }
        }));
        let mut issues = Issues::new();
        let out = convert_document(&doc, version, Version::V3_1_0, &mut issues).unwrap();
        assert!(Arc::ptr_eq(&doc, &out));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.as_slice()[0].severity, Severity::Info);
    }

    #[test]
    fn legacy_without_host_gets_a_relative_server() {
        let (_, out, issues) = run(
            json!({
                "swagger": "2.0",
                "info": { "title": "t", "version": "1" },
                "paths": { "/ping": { "get": { "responses": { "200": { "description": "pong" } } } } }
            }),
            Version::V3_0_3,
        );
        let doc = out.as_v3().unwrap();
        assert_eq!(doc.servers.len(), 1);
        assert_eq!(doc.servers[0].url, "/");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Info);
        assert_eq!(issues[0].path, "servers");
        assert_eq!(count(&issues, Severity::Critical), 0);
    }

    #[test]
    fn legacy_schemes_become_one_server_each() {
        let (_, out, _) = run(
            json!({
                "swagger": "2.0",
                "info": { "title": "t", "version": "1" },
                "host": "api.example.com",
                "basePath": "/v1",
                "schemes": ["http", "https"],
                "paths": {}
            }),
            Version::V3_0_0,
        );
        let urls: Vec<&str> = out.as_v3().unwrap().servers.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["http://api.example.com/v1", "https://api.example.com/v1"]);
    }

    #[test]
    fn webhooks_are_a_single_critical_issue() {
        let (_, _, issues) = run(
            json!({
                "openapi": "3.1.0",
                "info": { "title": "t", "version": "1" },
                "servers": [{ "url": "https://api.example.com" }],
                "paths": {},
                "webhooks": { "newPet": { "post": { "responses": { "200": { "description": "ok" } } } } }
            }),
            Version::V2_0,
        );
        assert_eq!(count(&issues, Severity::Critical), 1);
        let critical = issues.iter().find(|i| i.severity == Severity::Critical).unwrap();
        assert_eq!(critical.path, "webhooks");
    }

    #[test]
    fn nested_write_only_property_is_reported_once() {
        let (_, _, issues) = run(
            json!({
                "openapi": "3.0.3",
                "info": { "title": "t", "version": "1" },
                "servers": [{ "url": "https://api.example.com" }],
                "paths": {},
                "components": {
                    "schemas": {
                        "User": {
                            "type": "object",
                            "properties": {
                                "password": { "type": "string", "writeOnly": true }
                            }
                        }
                    }
                }
            }),
            Version::V2_0,
        );
        let warnings: Vec<_> = issues.iter().filter(|i| i.severity == Severity::Warning).collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].path.contains("properties.password"));
        assert!(warnings[0].message.contains("writeOnly"));
    }

    #[test]
    fn definition_pointers_move_into_components() {
        let (_, out, _) = run(
            json!({
                "swagger": "2.0",
                "info": { "title": "t", "version": "1" },
                "host": "h",
                "paths": {},
                "definitions": {
                    "Pet": { "type": "object" },
                    "Owner": { "type": "object", "properties": { "pet": { "$ref": "#/definitions/Pet" } } }
                }
            }),
            Version::V3_0_3,
        );
        let schemas = &out.as_v3().unwrap().components().unwrap().schemas;
        assert_eq!(
            schemas["Owner"].properties["pet"].reference.as_deref(),
            Some("#/components/schemas/Pet")
        );
    }

    #[test]
    fn nullable_is_only_reported_when_crossing_into_3_1() {
        let doc = |version: &str| {
            json!({
                "openapi": version,
                "info": { "title": "t", "version": "1" },
                "paths": {},
                "components": { "schemas": { "Name": { "type": "string", "nullable": true } } }
            })
        };
        let (_, _, issues) = run(doc("3.0.3"), Version::V3_1_0);
        let nullable: Vec<_> = issues
            .iter()
            .filter(|i| i.severity == Severity::Warning && i.message.contains("nullable"))
            .collect();
        assert_eq!(nullable.len(), 1);

        let (_, _, issues) = run(doc("3.0.0"), Version::V3_0_3);
        assert!(!issues.iter().any(|i| i.message.contains("nullable")));
    }

    #[test]
    fn source_documents_are_never_mutated() {
        let source = json!({
            "openapi": "3.0.3",
            "info": { "title": "t", "version": "1" },
            "servers": [{ "url": "https://{env}.example.com/v1", "variables": { "env": { "default": "prod" } } }],
            "paths": {
                "/pets": {
                    "post": {
                        "requestBody": {
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } } }
                        },
                        "responses": { "200": { "description": "ok" } }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "discriminator": { "propertyName": "kind", "mapping": { "cat": "#/components/schemas/Cat" } },
                        "properties": { "owner": { "$ref": "#/components/schemas/Owner" } }
                    }
                }
            }
        });
        let (doc, version) = parse(source);
        let before = (*doc).clone();
        for target in [Version::V2_0, Version::V3_1_0, Version::V3_0_3] {
            let mut issues = Issues::new();
            convert_document(&doc, version, target, &mut issues).unwrap();
            assert_eq!(*doc, before);
        }
    }

    #[test]
    fn self_referencing_definitions_terminate_without_duplicates() {
        let (_, out, issues) = run(
            json!({
                "openapi": "3.0.3",
                "info": { "title": "t", "version": "1" },
                "servers": [{ "url": "https://api.example.com" }],
                "paths": {},
                "components": {
                    "schemas": {
                        "Node": {
                            "type": "object",
                            "properties": {
                                "value": { "type": "string", "nullable": true },
                                "next": { "$ref": "#/components/schemas/Node" },
                                "children": { "type": "array", "items": { "$ref": "#/components/schemas/Node" } }
                            }
                        }
                    }
                }
            }),
            Version::V2_0,
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "components.schemas.Node.properties.value");
        let node = &out.as_v2().unwrap().definitions["Node"];
        assert_eq!(node.properties["next"].reference.as_deref(), Some("#/definitions/Node"));
    }

    #[test]
    fn wrong_shape_for_declared_version_is_a_hard_failure() {
        let (doc, _) = parse(json!({ "openapi": "3.0.3", "info": { "title": "t", "version": "1" }, "paths": {} }));
        let mut issues = Issues::new();
        assert!(convert_document(&doc, Version::V2_0, Version::V3_0_3, &mut issues).is_err());
    }
}
