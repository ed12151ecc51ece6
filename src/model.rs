//! Typed document trees for both dialect families.
//!
//! Maps are `IndexMap` so declaration order survives a round trip; every object
//! keeps unrecognised keys (vendor extensions included) in `extensions`.
pub mod schema;
pub mod v2;
pub mod v3;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::version::Version;

pub use schema::{Discriminator, DiscriminatorObject, ExclusiveBound, Schema, SchemaOrBool, SchemaType};

/// Vendor extensions and any other keys a type does not model explicitly.
pub type Extensions = IndexMap<String, Value>;

/// Security requirement: scheme name → required scopes.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

// ————————————————————————————————————————————————————————————————————————————
// SHARED OBJECTS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    /// 3.1+ only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct License {
    #[serde(default)]
    pub name: String,
    /// SPDX expression, 3.1+ only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalDocs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Responses keyed by status code, plus `default` and vendor extensions.
///
/// Serialized as one flat object the way both dialects write it.
#[derive(Debug, Clone, PartialEq)]
pub struct Responses<R> {
    pub default: Option<R>,
    pub codes: IndexMap<String, R>,
    pub extensions: Extensions,
}

impl<R> Default for Responses<R> {
    fn default() -> Self {
        Self { default: None, codes: IndexMap::new(), extensions: Extensions::new() }
    }
}

impl<R> Responses<R> {
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.codes.is_empty()
    }

    /// `default` first, then each status code in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.default
            .iter()
            .map(|r| ("default", r))
            .chain(self.codes.iter().map(|(k, r)| (k.as_str(), r)))
    }
}

impl<R: Serialize> Serialize for Responses<R> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let len = self.default.iter().count() + self.codes.len() + self.extensions.len();
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(default) = &self.default {
            map.serialize_entry("default", default)?;
        }
        for (code, response) in &self.codes {
            map.serialize_entry(code, response)?;
        }
        for (key, value) in &self.extensions {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, R: serde::de::DeserializeOwned> Deserialize<'de> for Responses<R> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
        let mut out = Responses::default();
        for (key, value) in raw {
            if key.starts_with("x-") {
                out.extensions.insert(key, value);
                continue;
            }
            let response: R = serde_json::from_value(value)
                .map_err(|e| serde::de::Error::custom(format!("response `{key}`: {e}")))?;
            if key == "default" {
                out.default = Some(response);
            } else {
                out.codes.insert(key, response);
            }
        }
        Ok(out)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DOCUMENT
// ————————————————————————————————————————————————————————————————————————————

/// A whole description document in exactly one of the two dialect shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    V2(Box<v2::Swagger>),
    V3(Box<v3::OpenApi>),
}

impl Document {
    /// Detect the dialect from the `swagger`/`openapi` marker and deserialize.
    pub fn from_value(mut value: Value) -> Result<(Document, Version), Error> {
        let version = detect_version(&value)?;
        normalize_marker(&mut value, version);
        let document = if version.is_legacy() {
            Document::V2(Box::new(
                serde_json::from_value(value).map_err(|e| Error::UnsupportedSource(e.to_string()))?,
            ))
        } else {
            Document::V3(Box::new(
                serde_json::from_value(value).map_err(|e| Error::UnsupportedSource(e.to_string()))?,
            ))
        };
        Ok((document, version))
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Document::V2(doc) => serde_json::to_value(doc),
            Document::V3(doc) => serde_json::to_value(doc),
        }
    }

    /// Version string as written in the document.
    pub fn version_str(&self) -> &str {
        match self {
            Document::V2(doc) => &doc.swagger,
            Document::V3(doc) => &doc.openapi,
        }
    }

    pub fn version(&self) -> Result<Version, Error> {
        self.version_str().parse()
    }

    /// Short shape name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Document::V2(_) => "Swagger 2.0",
            Document::V3(_) => "OpenAPI 3.x",
        }
    }

    pub fn as_v2(&self) -> Option<&v2::Swagger> {
        match self {
            Document::V2(doc) => Some(doc),
            Document::V3(_) => None,
        }
    }

    pub fn as_v3(&self) -> Option<&v3::OpenApi> {
        match self {
            Document::V3(doc) => Some(doc),
            Document::V2(_) => None,
        }
    }
}

impl Serialize for Document {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Document::V2(doc) => doc.serialize(serializer),
            Document::V3(doc) => doc.serialize(serializer),
        }
    }
}

/// Rewrite a numeric `swagger: 2.0` style marker to its canonical string.
pub fn normalize_marker(value: &mut Value, version: Version) {
    let Some(root) = value.as_object_mut() else {
        return;
    };
    for marker in ["swagger", "openapi"] {
        if let Some(slot) = root.get_mut(marker) {
            if slot.is_number() {
                *slot = Value::String(version.as_str().to_string());
            }
        }
    }
}

/// Read the dialect marker of a raw document.
pub fn detect_version(value: &Value) -> Result<Version, Error> {
    let Some(root) = value.as_object() else {
        return Err(Error::UnsupportedSource("document root is not an object".into()));
    };
    let marker = match (root.get("swagger"), root.get("openapi")) {
        (Some(v), None) => v,
        (None, Some(v)) => v,
        (Some(_), Some(_)) => {
            return Err(Error::UnsupportedSource(
                "document declares both `swagger` and `openapi`".into(),
            ));
        }
        (None, None) => {
            return Err(Error::UnsupportedSource(
                "missing `swagger` or `openapi` version field".into(),
            ));
        }
    };
    let raw = match marker {
        Value::String(s) => s.clone(),
        // YAML authors frequently write `swagger: 2.0` unquoted.
        Value::Number(n) => n.to_string(),
        other => return Err(Error::UnsupportedSource(format!("version field is not a string: {other}"))),
    };
    let version: Version = raw
        .parse()
        .map_err(|_| Error::UnsupportedSource(format!("unknown version `{raw}`")))?;
    if root.contains_key("swagger") != version.is_legacy() {
        return Err(Error::UnsupportedSource(format!(
            "version `{raw}` does not match its marker field"
        )));
    }
    Ok(version)
}
