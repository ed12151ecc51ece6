//! Turning a location into a parsed document.
//!
//! The converter only depends on the [`DocumentLoader`] trait; [`FsLoader`] is
//! the stock implementation for local JSON and YAML files.
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::issue::{DocumentStats, PositionLookup};
use crate::model::{Document, detect_version, normalize_marker, v2, v3};
use crate::path_de;
use crate::version::{SourceFormat, Version};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// A document ready for conversion, plus what the loader learned about it.
#[derive(Clone)]
pub struct ParsedDocument {
    pub document: Arc<Document>,
    pub version: Version,
    pub format: SourceFormat,
    pub positions: Option<Arc<dyn PositionLookup>>,
    pub stats: Option<DocumentStats>,
    pub load_time: Option<Duration>,
    pub size: Option<u64>,
}

/// What a loader hands back. Structural errors do not abort loading; the
/// converter refuses to continue when any are present.
#[derive(Debug, Default)]
pub struct Loaded {
    pub parsed: Option<ParsedDocument>,
    pub errors: Vec<String>,
}

pub trait DocumentLoader: Send + Sync {
    /// `user_agent` is for loaders that fetch over the network.
    fn load(&self, location: &str, user_agent: &str) -> Result<Loaded>;
}

/// Reads local files. Remote locations are refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ParsedDocument {
    pub fn new(document: Document, version: Version, format: SourceFormat) -> Self {
        Self {
            document: Arc::new(document),
            version,
            format,
            positions: None,
            stats: None,
            load_time: None,
            size: None,
        }
    }

    /// Detect and deserialize an in-memory tree.
    pub fn from_value(value: Value) -> Result<Self> {
        let stats = document_stats(&value);
        let (document, version) = Document::from_value(value)?;
        let mut parsed = Self::new(document, version, SourceFormat::Json);
        parsed.stats = Some(stats);
        Ok(parsed)
    }

    pub fn with_positions(mut self, positions: Arc<dyn PositionLookup>) -> Self {
        self.positions = Some(positions);
        self
    }
}

impl fmt::Debug for ParsedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedDocument")
            .field("version", &self.version)
            .field("format", &self.format)
            .field("positions", &self.positions.is_some())
            .field("stats", &self.stats)
            .field("load_time", &self.load_time)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl DocumentLoader for FsLoader {
    fn load(&self, location: &str, user_agent: &str) -> Result<Loaded> {
        if location.starts_with("http://") || location.starts_with("https://") {
            return Err(Error::Load {
                location: location.to_string(),
                source: anyhow!("remote documents are not supported (would fetch as `{user_agent}`)"),
            });
        }

        let started = Instant::now();
        let bytes = std::fs::read(location).map_err(|e| Error::Load {
            location: location.to_string(),
            source: e.into(),
        })?;
        let format = sniff_format(Path::new(location), &bytes);
        log::debug!("loading {location} as {format} ({} bytes)", bytes.len());

        let raw = match format {
            SourceFormat::Json => path_de::from_slice_with_path::<Value>(&bytes),
            SourceFormat::Yaml => path_de::from_yaml_slice_with_path::<serde_yaml::Value>(&bytes).and_then(yaml_to_json),
        };
        let mut value = match raw {
            Ok(value) => value,
            Err(error) => return Ok(Loaded { parsed: None, errors: vec![error] }),
        };

        let version = detect_version(&value)?;
        normalize_marker(&mut value, version);
        let stats = document_stats(&value);

        let document = if version.is_legacy() {
            path_de::from_value_with_path::<v2::Swagger>(value).map(|d| Document::V2(Box::new(d)))
        } else {
            path_de::from_value_with_path::<v3::OpenApi>(value).map(|d| Document::V3(Box::new(d)))
        };
        let document = match document {
            Ok(document) => document,
            Err(error) => return Ok(Loaded { parsed: None, errors: vec![error] }),
        };

        let mut parsed = ParsedDocument::new(document, version, format);
        parsed.stats = Some(stats);
        parsed.load_time = Some(started.elapsed());
        parsed.size = Some(bytes.len() as u64);
        Ok(Loaded { parsed: Some(parsed), errors: Vec::new() })
    }
}

/// Extension first, then the first significant byte.
pub fn sniff_format(path: &Path, bytes: &[u8]) -> SourceFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => return SourceFormat::Json,
        Some("yaml" | "yml") => return SourceFormat::Yaml,
        _ => {}
    }
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') | Some(b'[') => SourceFormat::Json,
        _ => SourceFormat::Yaml,
    }
}

/// YAML allows non-string keys (`200:` under `responses`); JSON object keys are
/// always strings.
pub fn yaml_to_json(value: serde_yaml::Value) -> std::result::Result<Value, String> {
    use serde_yaml::Value as Yaml;
    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| format!("number `{n}` has no JSON representation"))?
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect::<std::result::Result<_, _>>()?),
        Yaml::Mapping(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported mapping key: {other:?}")),
                };
                out.insert(key, yaml_to_json(value)?);
            }
            Value::Object(out)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

const OPERATION_KEYS: [&str; 9] = ["get", "put", "post", "delete", "options", "head", "patch", "trace", "query"];

/// Counts taken from the raw tree so they describe the source as written.
pub fn document_stats(value: &Value) -> DocumentStats {
    let paths = value.get("paths").and_then(Value::as_object);
    let operations = paths
        .map(|paths| {
            paths
                .values()
                .filter_map(Value::as_object)
                .map(|item| {
                    let fixed = OPERATION_KEYS.iter().filter(|m| item.contains_key(**m)).count();
                    let custom = item
                        .get("additionalOperations")
                        .and_then(Value::as_object)
                        .map_or(0, |ops| ops.len());
                    fixed + custom
                })
                .sum::<usize>()
        })
        .unwrap_or(0);
    let schemas = value
        .get("definitions")
        .or_else(|| value.pointer("/components/schemas"))
        .and_then(Value::as_object)
        .map_or(0, |s| s.len());

    DocumentStats {
        paths: paths.map_or(0, |p| p.len()),
        operations,
        schemas,
        references: count_references(value),
    }
}

fn count_references(value: &Value) -> usize {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, v)| usize::from(key == "$ref" && v.is_string()) + count_references(v))
            .sum(),
        Value::Array(items) => items.iter().map(count_references).sum(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("oas-convert-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn stats_count_paths_operations_schemas_and_refs() {
        let stats = document_stats(&json!({
            "swagger": "2.0",
            "paths": {
                "/a": { "get": {}, "post": {}, "parameters": [] },
                "/b": { "delete": { "responses": { "200": { "schema": { "$ref": "#/definitions/A" } } } } }
            },
            "definitions": { "A": { "properties": { "b": { "$ref": "#/definitions/B" } } }, "B": {} }
        }));
        assert_eq!(stats, DocumentStats { paths: 2, operations: 3, schemas: 2, references: 2 });
    }

    #[test]
    fn yaml_integer_keys_become_strings() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("responses:\n  200:\n    description: ok\n").unwrap();
        let json = yaml_to_json(yaml).unwrap();
        assert_eq!(json, json!({ "responses": { "200": { "description": "ok" } } }));
    }

    #[test]
    fn sniffs_by_extension_then_content() {
        assert_eq!(sniff_format(Path::new("a.yml"), b"{}"), SourceFormat::Yaml);
        assert_eq!(sniff_format(Path::new("a.txt"), b"  {\"a\":1}"), SourceFormat::Json);
        assert_eq!(sniff_format(Path::new("a"), b"openapi: 3.0.0"), SourceFormat::Yaml);
    }

    #[test]
    fn loads_yaml_with_unquoted_version() {
        let path = temp_file(
            "legacy.yaml",
            "swagger: 2.0\ninfo:\n  title: t\n  version: '1'\npaths:\n  /a:\n    get:\n      responses:\n        '200':\n          description: ok\n",
        );
        let loaded = FsLoader.load(path.to_str().unwrap(), "test").unwrap();
        assert!(loaded.errors.is_empty());
        let parsed = loaded.parsed.unwrap();
        assert_eq!(parsed.version, Version::V2_0);
        assert_eq!(parsed.format, SourceFormat::Yaml);
        assert_eq!(parsed.stats.unwrap().operations, 1);
        assert!(parsed.size.unwrap() > 0);
    }

    #[test]
    fn structural_errors_are_reported_not_raised() {
        let path = temp_file(
            "broken.json",
            r#"{"openapi":"3.0.3","info":{"title":"t","version":"1"},"paths":{"/a":{"get":{"tags":5}}}}"#,
        );
        let loaded = FsLoader.load(path.to_str().unwrap(), "test").unwrap();
        assert!(loaded.parsed.is_none());
        assert_eq!(loaded.errors.len(), 1);
        assert!(loaded.errors[0].contains("tags"));
    }

    #[test]
    fn remote_locations_are_refused() {
        let err = FsLoader.load("https://example.com/api.json", "ua").unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }
}
