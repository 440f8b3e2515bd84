use crate::config::{Metadata, TagSpec};
use crate::descriptor::{Catalog, RouteDescriptor};
use crate::error::{DefinitionError, Result};
use crate::operation_builder::OperationBuilder;
use crate::schema_generator::{Schema, SchemaGenerator};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenAPI version written to every document
pub const OPENAPI_VERSION: &str = "3.0.3";

/// Media type used when an annotation does not name one
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Security scheme name to required scopes
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Value,
    /// Static sections copied from the metadata
    metadata: Metadata,
    /// Paths collection (URL path -> method -> Operation)
    paths: IndexMap<String, IndexMap<String, Operation>>,
}

/// OpenAPI Operation object - represents a single API operation.
///
/// Empty facets are left out of the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "operationId", skip_serializing_if = "String::is_empty")]
    pub operation_id: String,
    /// Parameters (path, query)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub responses: IndexMap<String, Response>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter location (path, query)
    #[serde(rename = "in")]
    pub location: String,
    /// Whether the parameter is required
    pub required: bool,
    /// Parameter schema
    pub schema: Schema,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Request body description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
    /// Whether the request body is required
    pub required: bool,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type
    pub schema: Schema,
}

impl MediaType {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    #[serde(default)]
    pub description: String,
    /// Response content
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI Server object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
}

/// OpenAPI Tag object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "externalDocs", default, skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<Value>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Components {
    /// Schema definitions
    pub schemas: IndexMap<String, Schema>,
    #[serde(rename = "securitySchemes")]
    pub security_schemes: IndexMap<String, Value>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Value,
    #[serde(rename = "externalDocs", default, skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<Value>,
    #[serde(default)]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// API paths
    pub paths: IndexMap<String, IndexMap<String, Operation>>,
    /// Components (schemas, security schemes)
    #[serde(default)]
    pub components: Components,
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder from the document metadata.
    ///
    /// # Errors
    ///
    /// Fails when the metadata has no `info` section.
    pub fn new(metadata: Metadata) -> Result<Self> {
        debug!("Initializing OpenApiBuilder");
        let info = match &metadata.info {
            Some(info) if !info.is_null() => info.clone(),
            _ => return Err(DefinitionError::MissingInfo),
        };

        Ok(Self {
            info,
            metadata,
            paths: IndexMap::new(),
        })
    }

    /// Add a route to the OpenAPI document
    pub fn add_route<C: Catalog + ?Sized>(
        &mut self,
        route: &RouteDescriptor,
        catalog: &C,
        schema_gen: &mut SchemaGenerator,
    ) -> Result<()> {
        let Some(method) = route.primary_method() else {
            warn!("Route {} has no HTTP method, skipping", route.uri);
            return Ok(());
        };

        debug!("Adding route: {} {}", method.as_str(), route.uri);

        let operation = OperationBuilder::new(catalog).build_operation(route, schema_gen)?;
        let openapi_path = Self::convert_path_format(&route.uri);

        self.paths
            .entry(openapi_path)
            .or_default()
            .insert(method.key(), operation);

        Ok(())
    }

    /// Lower-case the URI, root it at `/` and turn `:param` and `{param?}`
    /// segments into `{param}`
    pub fn convert_path_format(uri: &str) -> String {
        let uri = uri.to_lowercase();
        let converted_parts: Vec<String> = uri
            .trim_start_matches('/')
            .split('/')
            .map(|part| {
                if let Some(name) = part.strip_prefix(':') {
                    format!("{{{}}}", name)
                } else if let Some(name) = part
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix("?}"))
                {
                    format!("{{{}}}", name)
                } else {
                    part.to_string()
                }
            })
            .collect();

        format!("/{}", converted_parts.join("/"))
    }

    /// Build the final OpenAPI document
    pub fn build(self, schema_gen: SchemaGenerator) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let Metadata {
            external_docs,
            servers,
            tags,
            security_schemes,
            ..
        } = self.metadata;

        OpenApiDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: self.info,
            external_docs: external_docs.filter(|docs| !docs.is_null()),
            servers: servers.into_iter().map(|url| Server { url }).collect(),
            tags: tags
                .into_iter()
                .map(|(name, spec)| match spec {
                    TagSpec::Description(description) => Tag {
                        name,
                        description: Some(description),
                        external_docs: None,
                    },
                    TagSpec::Detailed {
                        description,
                        external_docs,
                    } => Tag {
                        name,
                        description,
                        external_docs,
                    },
                })
                .collect(),
            paths: self.paths,
            components: Components {
                schemas: schema_gen.into_registry().into_schemas(),
                security_schemes,
            },
        }
    }
}

/// Assemble the document for `routes`, in order.
///
/// The metadata is checked before any route is processed; the first
/// definition error aborts the build.
pub fn assemble<C: Catalog + ?Sized>(
    routes: &[RouteDescriptor],
    catalog: &C,
    metadata: Metadata,
) -> Result<OpenApiDocument> {
    let mut builder = OpenApiBuilder::new(metadata)?;
    let mut schema_gen = SchemaGenerator::new();

    for route in routes {
        builder.add_route(route, catalog, &mut schema_gen)?;
    }

    debug!(
        "Assembled {} path(s) and {} schema(s)",
        builder.paths.len(),
        schema_gen.get_schemas().len()
    );

    Ok(builder.build(schema_gen))
}
