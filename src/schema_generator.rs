use crate::descriptor::FieldRuleSet;
use crate::type_inference;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Prefix of every component schema reference
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Reference to a component schema
pub fn schema_ref(name: &str) -> String {
    format!("{}{}", SCHEMA_REF_PREFIX, name)
}

/// OpenAPI Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "date", "email", "uuid")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Allowed values
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Properties for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Required field names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Schema {
    pub fn of_type(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Default::default()
        }
    }

    pub fn reference(reference: String) -> Self {
        Self {
            reference: Some(reference),
            ..Default::default()
        }
    }

    pub fn array(items: Schema) -> Self {
        Self {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    pub fn object(properties: IndexMap<String, Schema>) -> Self {
        Self {
            schema_type: Some("object".to_string()),
            properties: Some(properties),
            ..Default::default()
        }
    }
}

/// Name-keyed store of component schemas.
///
/// At most one schema is kept per name and the first one registered wins. The
/// rule set each schema was built from is remembered so that a later request
/// for the same name with different rules can be reported.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, Schema>,
    sources: HashMap<String, FieldRuleSet>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn schemas(&self) -> &IndexMap<String, Schema> {
        &self.schemas
    }

    pub fn into_schemas(self) -> IndexMap<String, Schema> {
        self.schemas
    }

    /// Store `schema` under `name`, replacing any schema of that name in place
    fn insert(&mut self, name: &str, schema: Schema, source: FieldRuleSet) {
        self.schemas.insert(name.to_string(), schema);
        self.sources.insert(name.to_string(), source);
    }

    /// Merge a registry built elsewhere. Names already present keep their
    /// schema; a different schema under a taken name is reported and dropped.
    pub fn merge(&mut self, other: SchemaRegistry) {
        let SchemaRegistry { schemas, mut sources } = other;
        for (name, schema) in schemas {
            match self.schemas.get(&name) {
                Some(existing) if *existing != schema => {
                    warn!("Schema name collision on {}, keeping the first definition", name);
                }
                Some(_) => {}
                None => {
                    let source = sources.remove(&name).unwrap_or_default();
                    self.insert(&name, schema, source);
                }
            }
        }
    }
}

/// Schema generator - converts field rule sets into registered component schemas
#[derive(Debug, Default)]
pub struct SchemaGenerator {
    registry: SchemaRegistry,
}

impl SchemaGenerator {
    /// Create a new SchemaGenerator with an empty registry
    pub fn new() -> Self {
        debug!("Initializing SchemaGenerator");
        Self::default()
    }

    /// Create a SchemaGenerator that continues filling an existing registry
    pub fn with_registry(registry: SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Build an object schema from `rules`, register it under `name` and
    /// return its reference.
    ///
    /// A name that is already registered is returned as is, without looking
    /// at `rules`. Dotted fields are folded into their parent:
    /// - `tags.*` makes `tags` an array of the field's own type
    /// - `items.*.name` makes `items` an array of a nested `Items` schema
    /// - `address.city` makes `address` an object referencing a nested `Address` schema
    pub fn generate_schema(&mut self, rules: &FieldRuleSet, name: &str) -> String {
        if let Some(source) = self.registry.sources.get(name) {
            if source != rules {
                warn!(
                    "Schema {} already exists with different rules, keeping the first definition",
                    name
                );
            }
            debug!("Schema for {} already exists", name);
            return schema_ref(name);
        }

        debug!("Generating schema {} from {} field rule(s)", name, rules.len());

        let mut properties: IndexMap<String, Schema> = IndexMap::new();
        let mut required = Vec::new();
        // Parents shaped by a dotted field, and parents expanded into a nested schema
        let mut derived: HashSet<String> = HashSet::new();
        let mut expanded: HashSet<String> = HashSet::new();

        for (field, tokens) in rules {
            let property = property_from_tokens(tokens);

            let Some((parent, child)) = field.split_once('.') else {
                if has_token(tokens, "required") {
                    required.push(field.clone());
                }
                if !derived.contains(field) {
                    properties.insert(field.clone(), property);
                }
                continue;
            };

            if child == "*" {
                if !expanded.contains(parent) {
                    properties.insert(parent.to_string(), Schema::array(property));
                }
                derived.insert(parent.to_string());
                continue;
            }

            if expanded.contains(parent) {
                continue;
            }

            let is_list = child.starts_with("*.");
            let prefix = if is_list {
                format!("{}.*.", parent)
            } else {
                format!("{}.", parent)
            };
            let children: FieldRuleSet = rules
                .iter()
                .filter_map(|(key, tokens)| {
                    key.strip_prefix(prefix.as_str())
                        .map(|rest| (rest.to_string(), tokens.clone()))
                })
                .collect();

            let reference = self.generate_schema(&children, &capitalize(parent));
            let nested = if is_list {
                Schema::array(Schema::reference(reference))
            } else {
                Schema {
                    schema_type: Some("object".to_string()),
                    reference: Some(reference),
                    ..Default::default()
                }
            };

            properties.insert(parent.to_string(), nested);
            derived.insert(parent.to_string());
            expanded.insert(parent.to_string());
        }

        let schema = Schema {
            schema_type: Some("object".to_string()),
            properties: (!properties.is_empty()).then_some(properties),
            required: (!required.is_empty()).then_some(required),
            ..Default::default()
        };
        // A nested parent named like this schema registered itself first;
        // the schema that was asked for takes the name.
        if self.registry.contains(name) {
            warn!(
                "Schema {} was registered by one of its nested fields, replacing it",
                name
            );
        }
        self.registry.insert(name, schema, rules.clone());

        schema_ref(name)
    }

    /// Get all generated schemas
    pub fn get_schemas(&self) -> &IndexMap<String, Schema> {
        self.registry.schemas()
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn into_registry(self) -> SchemaRegistry {
        self.registry
    }
}

/// Schema of a single field, from its tokens alone
fn property_from_tokens(tokens: &[String]) -> Schema {
    let mapping = type_inference::infer(tokens);
    let mut property = Schema {
        schema_type: mapping.schema_type,
        format: mapping.format,
        ..Default::default()
    };

    if has_token(tokens, "array") {
        property.schema_type = Some("array".to_string());
        property.format = None;
        property.items = Some(Box::default());
    }

    if let Some(values) = tokens.iter().find_map(|token| token.strip_prefix("in:")) {
        property.schema_type = Some("string".to_string());
        property.items = None;
        property.enum_values = Some(
            values
                .replace(['"', '\''], "")
                .split(',')
                .map(|value| value.trim().to_string())
                .collect(),
        );
    }

    property
}

fn has_token(tokens: &[String], wanted: &str) -> bool {
    tokens.iter().any(|token| token == wanted)
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Infer a schema purely from the shape of a sample value.
///
/// Objects become objects with one property per key, scalars map to their
/// JSON type and `null` to an unconstrained schema. Lists are always lists of
/// objects: a list of lists is a two-level array of objects, any other list
/// (scalars, objects or empty) is an array of objects. Item properties come
/// from the first element when it is an object.
pub fn value_schema(value: &Value) -> Schema {
    match value {
        Value::Null => Schema::default(),
        Value::Bool(_) => Schema::of_type("boolean"),
        Value::Number(number) if number.is_f64() => Schema::of_type("number"),
        Value::Number(_) => Schema::of_type("integer"),
        Value::String(_) => Schema::of_type("string"),
        Value::Array(values) => match values.first() {
            Some(Value::Array(inner)) => Schema::array(Schema::array(item_schema(inner.first()))),
            first => Schema::array(item_schema(first)),
        },
        Value::Object(map) => object_schema(map),
    }
}

fn object_schema(map: &serde_json::Map<String, Value>) -> Schema {
    Schema::object(
        map.iter()
            .map(|(key, value)| (key.clone(), value_schema(value)))
            .collect(),
    )
}

/// Item of a sampled list: an object, with properties when the sample has them
fn item_schema(sample: Option<&Value>) -> Schema {
    match sample {
        Some(Value::Object(map)) => object_schema(map),
        _ => Schema::of_type("object"),
    }
}
