//! The schema node shared by both dialects.
//!
//! One struct covers the union of keywords the two families use. Keywords that
//! change *shape* between dialects are tagged unions so every traversal has to
//! match on the variant before descending.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::{ExternalDocs, Extensions};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Pointer to a named schema. In practice exclusive with local constraints.
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // scalar / array constraints
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<ExclusiveBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<ExclusiveBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    // composition / nesting
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub pattern_properties: IndexMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<SchemaOrBool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<SchemaOrBool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefix_items: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_names: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Schema>>,
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub if_schema: Option<Box<Schema>>,
    #[serde(rename = "then", default, skip_serializing_if = "Option::is_none")]
    pub then_schema: Option<Box<Schema>>,
    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub else_schema: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependent_schemas: IndexMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unevaluated_properties: Option<SchemaOrBool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unevaluated_items: Option<SchemaOrBool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_schema: Option<Box<Schema>>,
    #[serde(rename = "$defs", default, skip_serializing_if = "IndexMap::is_empty")]
    pub defs: IndexMap<String, Schema>,

    // description-language annotations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<Value>>,

    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A keyword that holds either a nested node or a boolean flag.
/// Booleans are terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrBool {
    Bool(bool),
    Schema(Box<Schema>),
}

/// `type` is a single name everywhere except 3.1+, which also allows a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

/// `exclusiveMinimum`/`exclusiveMaximum`: boolean modifier up to 3.0, standalone bound from 3.1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExclusiveBound {
    Flag(bool),
    Bound(Number),
}

/// 2.0 names the discriminating property; 3.x wraps it in an object with a mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Discriminator {
    PropertyName(String),
    Object(DiscriminatorObject),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscriminatorObject {
    pub property_name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mapping: IndexMap<String, String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Schema {
    pub fn reference(target: impl Into<String>) -> Self {
        Self { reference: Some(target.into()), ..Self::default() }
    }

    pub fn of_type(name: &str) -> Self {
        Self { schema_type: Some(SchemaType::Single(name.to_string())), ..Self::default() }
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Every directly nested node together with the location segment that reaches it.
    /// Boolean forms of node-or-boolean keywords are skipped.
    pub fn children(&self) -> Vec<(String, &Schema)> {
        let mut out: Vec<(String, &Schema)> = Vec::new();
        for (name, s) in &self.properties {
            out.push((format!("properties.{name}"), s));
        }
        for (name, s) in &self.pattern_properties {
            out.push((format!("patternProperties.{name}"), s));
        }
        if let Some(s) = self.additional_properties.as_ref().and_then(SchemaOrBool::as_schema) {
            out.push(("additionalProperties".into(), s));
        }
        if let Some(s) = self.items.as_ref().and_then(SchemaOrBool::as_schema) {
            out.push(("items".into(), s));
        }
        for (i, s) in self.prefix_items.iter().enumerate() {
            out.push((format!("prefixItems[{i}]"), s));
        }
        if let Some(s) = &self.contains {
            out.push(("contains".into(), &**s));
        }
        if let Some(s) = &self.property_names {
            out.push(("propertyNames".into(), &**s));
        }
        for (key, list) in [("allOf", &self.all_of), ("anyOf", &self.any_of), ("oneOf", &self.one_of)] {
            for (i, s) in list.iter().enumerate() {
                out.push((format!("{key}[{i}]"), s));
            }
        }
        if let Some(s) = &self.not {
            out.push(("not".into(), &**s));
        }
        for (key, branch) in [("if", &self.if_schema), ("then", &self.then_schema), ("else", &self.else_schema)] {
            if let Some(s) = branch {
                out.push((key.into(), &**s));
            }
        }
        for (name, s) in &self.dependent_schemas {
            out.push((format!("dependentSchemas.{name}"), s));
        }
        if let Some(s) = self.unevaluated_properties.as_ref().and_then(SchemaOrBool::as_schema) {
            out.push(("unevaluatedProperties".into(), s));
        }
        if let Some(s) = self.unevaluated_items.as_ref().and_then(SchemaOrBool::as_schema) {
            out.push(("unevaluatedItems".into(), s));
        }
        if let Some(s) = &self.content_schema {
            out.push(("contentSchema".into(), &**s));
        }
        for (name, s) in &self.defs {
            out.push((format!("$defs.{name}"), s));
        }
        out
    }

    /// Mutable twin of [`Schema::children`].
    pub fn children_mut(&mut self) -> Vec<(String, &mut Schema)> {
        let Schema {
            properties,
            pattern_properties,
            additional_properties,
            items,
            prefix_items,
            contains,
            property_names,
            all_of,
            any_of,
            one_of,
            not,
            if_schema,
            then_schema,
            else_schema,
            dependent_schemas,
            unevaluated_properties,
            unevaluated_items,
            content_schema,
            defs,
            ..
        } = self;

        let mut out: Vec<(String, &mut Schema)> = Vec::new();
        for (name, s) in properties.iter_mut() {
            out.push((format!("properties.{name}"), s));
        }
        for (name, s) in pattern_properties.iter_mut() {
            out.push((format!("patternProperties.{name}"), s));
        }
        if let Some(s) = additional_properties.as_mut().and_then(SchemaOrBool::as_schema_mut) {
            out.push(("additionalProperties".into(), s));
        }
        if let Some(s) = items.as_mut().and_then(SchemaOrBool::as_schema_mut) {
            out.push(("items".into(), s));
        }
        for (i, s) in prefix_items.iter_mut().enumerate() {
            out.push((format!("prefixItems[{i}]"), s));
        }
        if let Some(s) = contains {
            out.push(("contains".into(), &mut **s));
        }
        if let Some(s) = property_names {
            out.push(("propertyNames".into(), &mut **s));
        }
        for (key, list) in [("allOf", all_of), ("anyOf", any_of), ("oneOf", one_of)] {
            for (i, s) in list.iter_mut().enumerate() {
                out.push((format!("{key}[{i}]"), s));
            }
        }
        if let Some(s) = not {
            out.push(("not".into(), &mut **s));
        }
        for (key, branch) in [("if", if_schema), ("then", then_schema), ("else", else_schema)] {
            if let Some(s) = branch {
                out.push((key.into(), &mut **s));
            }
        }
        for (name, s) in dependent_schemas.iter_mut() {
            out.push((format!("dependentSchemas.{name}"), s));
        }
        if let Some(s) = unevaluated_properties.as_mut().and_then(SchemaOrBool::as_schema_mut) {
            out.push(("unevaluatedProperties".into(), s));
        }
        if let Some(s) = unevaluated_items.as_mut().and_then(SchemaOrBool::as_schema_mut) {
            out.push(("unevaluatedItems".into(), s));
        }
        if let Some(s) = content_schema {
            out.push(("contentSchema".into(), &mut **s));
        }
        for (name, s) in defs.iter_mut() {
            out.push((format!("$defs.{name}"), s));
        }
        out
    }
}

impl SchemaOrBool {
    pub fn as_schema(&self) -> Option<&Schema> {
        match self {
            SchemaOrBool::Schema(s) => Some(&**s),
            SchemaOrBool::Bool(_) => None,
        }
    }

    pub fn as_schema_mut(&mut self) -> Option<&mut Schema> {
        match self {
            SchemaOrBool::Schema(s) => Some(&mut **s),
            SchemaOrBool::Bool(_) => None,
        }
    }
}

impl From<Schema> for SchemaOrBool {
    fn from(schema: Schema) -> Self {
        SchemaOrBool::Schema(Box::new(schema))
    }
}

impl SchemaType {
    /// Type names, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            SchemaType::Single(s) => vec![s.as_str()],
            SchemaType::Multiple(xs) => xs.iter().map(String::as_str).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().contains(&name)
    }
}

impl Discriminator {
    pub fn property_name(&self) -> &str {
        match self {
            Discriminator::PropertyName(s) => s,
            Discriminator::Object(o) => &o.property_name,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
