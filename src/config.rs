//! Static document metadata: info, servers, tags and security schemes.
//!
//! Metadata comes from a YAML or JSON file, optionally wrapped in a top-level
//! `definition` key, or is derived from environment variables.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

/// Key that may wrap the whole definition in a metadata file
const DEFINITION_KEY: &str = "definition";

/// Document metadata copied into the generated definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Metadata {
    /// The OpenAPI `info` object; required to assemble a document
    pub info: Option<Value>,
    pub external_docs: Option<Value>,
    /// Server base URLs
    pub servers: Vec<String>,
    /// Tag name to description
    pub tags: IndexMap<String, TagSpec>,
    pub security_schemes: IndexMap<String, Value>,
}

/// A tag is described by a plain string or by an object with external docs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagSpec {
    Description(String),
    Detailed {
        #[serde(default)]
        description: Option<String>,
        #[serde(rename = "externalDocs", default)]
        external_docs: Option<Value>,
    },
}

impl Metadata {
    /// Load metadata from a YAML file, or a JSON file when the extension is `.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not describe metadata.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading metadata from {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let raw: Value = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse metadata: {}", path.display()))?
        } else if content.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse metadata: {}", path.display()))?
        };

        Self::from_value(raw).with_context(|| format!("Invalid metadata: {}", path.display()))
    }

    /// Build metadata from an already parsed document, unwrapping `definition`.
    pub fn from_value(raw: Value) -> Result<Self> {
        let raw = match raw {
            Value::Null => return Ok(Self::default()),
            Value::Object(mut map) if map.contains_key(DEFINITION_KEY) => {
                map.remove(DEFINITION_KEY).unwrap_or_default()
            }
            other => other,
        };
        if raw.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(raw)?)
    }

    /// Default metadata derived from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Default metadata with variables resolved through `lookup`.
    ///
    /// Unset or empty variables are left out of the `info` object.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let title = var("OPENAPI_TITLE").unwrap_or_else(|| {
            format!("{} - OpenAPI 3.0", lookup("APP_NAME").unwrap_or_default())
        });

        let mut info = Map::new();
        info.insert("version".to_string(), json!("1.0"));
        info.insert("title".to_string(), json!(title));
        info.insert(
            "description".to_string(),
            json!("Documentation of our API that follows OpenAPI 3.0 specification."),
        );
        if let Some(tos) = var("OPENAPI_TOS") {
            info.insert("termsOfService".to_string(), json!(tos));
        }

        let contact = object_of(&[
            ("name", var("OPENAPI_CONTACT_NAME")),
            ("url", var("OPENAPI_CONTACT_URL")),
            ("email", var("OPENAPI_CONTACT_EMAIL")),
        ]);
        if !contact.is_empty() {
            info.insert("contact".to_string(), Value::Object(contact));
        }

        let license = object_of(&[
            ("name", var("OPENAPI_LICENSE_NAME")),
            ("url", var("OPENAPI_LICENSE_URL")),
        ]);
        if !license.is_empty() {
            info.insert("license".to_string(), Value::Object(license));
        }

        let app_url = lookup("APP_URL").unwrap_or_default();

        Self {
            info: Some(Value::Object(info)),
            external_docs: Some(json!({
                "description": "Find out more about OpenAPI 3.0",
                "url": "https://swagger.io/specification/"
            })),
            servers: vec![format!("{}/api/v1", app_url.trim_end_matches('/'))],
            tags: IndexMap::new(),
            security_schemes: IndexMap::from([(
                "bearerToken".to_string(),
                json!({"type": "http", "scheme": "bearer", "bearerFormat": "JWT"}),
            )]),
        }
    }
}

fn object_of(entries: &[(&str, Option<String>)]) -> Map<String, Value> {
    entries
        .iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), json!(v))))
        .collect()
}
