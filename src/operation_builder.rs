//! Builds one OpenAPI operation per route from its handler descriptor.
//!
//! Parameters, request body and responses each merge two sources: the
//! structured annotations of the handler and the tags found in its doc
//! comment (see [`crate::doc_tags`]).

use crate::descriptor::{
    short_name, Catalog, HandlerDescriptor, HandlerId, HandlerParameter, QueryParam, RequestKind,
    ResponsePayload, RouteDescriptor,
};
use crate::doc_tags::{self, DocTag};
use crate::error::{DefinitionError, Result};
use crate::openapi_builder::{
    MediaType, Operation, Parameter, RequestBody, Response, SecurityRequirement,
    DEFAULT_CONTENT_TYPE,
};
use crate::schema_generator::{value_schema, Schema, SchemaGenerator};
use indexmap::IndexMap;
use log::{debug, warn};

/// Name of the security scheme attached to authenticated routes
pub const BEARER_SCHEME: &str = "bearerToken";

/// Authentication guards that accept a bearer token
const TOKEN_GUARDS: &[&str] = &["sanctum", "passport", "jwt", "api"];

/// A parameter to document, from either the handler signature or an annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSource {
    /// Declared on the handler method
    FromDeclaration(HandlerParameter),
    /// Declared by a `Query` annotation or doc tag
    FromAnnotation(QueryParam),
}

impl ParameterSource {
    pub fn name(&self) -> &str {
        match self {
            ParameterSource::FromDeclaration(parameter) => &parameter.name,
            ParameterSource::FromAnnotation(query) => &query.name,
        }
    }

    /// Declared type; annotated query parameters are always strings
    pub fn type_name(&self) -> Option<&str> {
        match self {
            ParameterSource::FromDeclaration(parameter) => parameter.type_name.as_deref(),
            ParameterSource::FromAnnotation(_) => Some("string"),
        }
    }

    pub fn nullable(&self) -> bool {
        match self {
            ParameterSource::FromDeclaration(parameter) => parameter.nullable,
            ParameterSource::FromAnnotation(query) => !query.required,
        }
    }
}

/// Where a parameter travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Path,
    Query,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
        }
    }
}

/// Operation builder over a descriptor catalog
pub struct OperationBuilder<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
}

impl<'a, C: Catalog + ?Sized> OperationBuilder<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Build the operation documenting `route`.
    ///
    /// Schemas for request bodies and model responses are registered in
    /// `schema_gen` as a side effect.
    ///
    /// # Errors
    ///
    /// Fails when the handler is not described, when a parameter type cannot
    /// be placed in the path or the query, or when a doc tag is malformed.
    pub fn build_operation(
        &self,
        route: &RouteDescriptor,
        schema_gen: &mut SchemaGenerator,
    ) -> Result<Operation> {
        let id = route
            .handler_id()
            .ok_or_else(|| DefinitionError::UndescribedHandler {
                handler: route.action.clone(),
            })?;
        let handler = self
            .catalog
            .handler(&id)
            .ok_or_else(|| DefinitionError::UndescribedHandler {
                handler: id.to_string(),
            })?;

        debug!("Building operation for {} ({})", route.uri, id);

        let tags = handler.doc_comment().map(doc_tags::parse).unwrap_or_default();
        let path_meta = handler.path_meta().cloned().unwrap_or_default();

        Ok(Operation {
            tags: path_meta.tags,
            summary: path_meta.summary,
            description: path_meta.description,
            operation_id: path_meta.operation_id,
            parameters: self.build_parameters(&id, handler, &tags)?,
            request_body: self.build_request_body(handler, schema_gen),
            responses: self.build_responses(&id, handler, &tags, schema_gen)?,
            security: security_requirements(&route.middleware),
        })
    }

    /// Declared parameters (minus a leading request body), then doc-tag
    /// queries, then annotated queries. A name already documented at the
    /// same location is not repeated.
    fn build_parameters(
        &self,
        id: &HandlerId,
        handler: &HandlerDescriptor,
        tags: &[DocTag],
    ) -> Result<Vec<Parameter>> {
        let mut declared = handler.parameters.as_slice();
        if let Some(first) = declared.first() {
            if first
                .type_name
                .as_deref()
                .is_some_and(|type_name| self.catalog.is_request_type(type_name))
            {
                declared = &declared[1..];
            }
        }

        let sources = declared
            .iter()
            .cloned()
            .map(ParameterSource::FromDeclaration)
            .chain(
                doc_tags::query_parameters(tags, id)?
                    .into_iter()
                    .map(ParameterSource::FromAnnotation),
            )
            .chain(
                handler
                    .query_annotations()
                    .cloned()
                    .map(ParameterSource::FromAnnotation),
            );

        let mut parameters: Vec<Parameter> = Vec::new();
        for source in sources {
            let parameter = self.build_parameter(id, &source)?;
            if parameters
                .iter()
                .any(|p| p.name == parameter.name && p.location == parameter.location)
            {
                debug!("{}: parameter {} already documented", id, parameter.name);
                continue;
            }
            parameters.push(parameter);
        }

        Ok(parameters)
    }

    fn build_parameter(&self, id: &HandlerId, source: &ParameterSource) -> Result<Parameter> {
        let location = self.parameter_location(id, source)?;
        let (schema_type, required) = match location {
            ParameterLocation::Path => ("integer", true),
            ParameterLocation::Query => ("string", !source.nullable()),
        };

        Ok(Parameter {
            name: source.name().to_string(),
            location: location.as_str().to_string(),
            required,
            schema: Schema::of_type(schema_type),
        })
    }

    /// Integers and bound models travel in the path, strings in the query.
    pub fn parameter_location(
        &self,
        id: &HandlerId,
        source: &ParameterSource,
    ) -> Result<ParameterLocation> {
        let type_name = source
            .type_name()
            .map(str::trim)
            .filter(|type_name| !type_name.is_empty())
            .ok_or_else(|| DefinitionError::UntypedParameter {
                handler: id.to_string(),
                parameter: source.name().to_string(),
            })?;

        match type_name {
            "int" | "integer" => Ok(ParameterLocation::Path),
            "string" => Ok(ParameterLocation::Query),
            _ if self.catalog.model(type_name).is_some() || is_class_name(type_name) => {
                Ok(ParameterLocation::Path)
            }
            _ => Err(DefinitionError::UnsupportedParameterType {
                handler: id.to_string(),
                parameter: source.name().to_string(),
                type_name: type_name.to_string(),
            }),
        }
    }

    /// Request body of a handler whose first parameter is an annotated form request.
    pub fn build_request_body(
        &self,
        handler: &HandlerDescriptor,
        schema_gen: &mut SchemaGenerator,
    ) -> Option<RequestBody> {
        let type_name = handler.parameters.first()?.type_name.as_deref()?;
        let request_type = self.catalog.request_type(type_name)?;
        let meta = request_type.request.as_ref().filter(|meta| meta.has_arguments())?;

        if request_type.kind != RequestKind::FormRequest {
            debug!("{} is not a form request, no body documented", type_name);
            return None;
        }

        let reference = schema_gen.generate_schema(&request_type.rules, short_name(type_name));
        let content_type = meta
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        Some(RequestBody {
            description: meta.description.clone().unwrap_or_default(),
            content: IndexMap::from([(content_type, MediaType::new(Schema::reference(reference)))]),
            required: meta.required.unwrap_or(true),
        })
    }

    /// Annotated responses first, then doc-tag responses for codes not yet documented.
    fn build_responses(
        &self,
        id: &HandlerId,
        handler: &HandlerDescriptor,
        tags: &[DocTag],
        schema_gen: &mut SchemaGenerator,
    ) -> Result<IndexMap<String, Response>> {
        let mut declared: IndexMap<String, (Option<ResponsePayload>, String, String)> =
            IndexMap::new();

        for meta in handler.response_annotations() {
            declared.insert(
                meta.status_code.to_string(),
                (
                    meta.payload.clone(),
                    meta.description.clone().unwrap_or_default(),
                    meta.content_type
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                ),
            );
        }

        for (status_code, payload) in doc_tags::responses(tags, self.catalog, id)? {
            if declared.contains_key(&status_code) {
                debug!("{}: response {} already annotated", id, status_code);
                continue;
            }
            declared.insert(
                status_code,
                (Some(payload), String::new(), DEFAULT_CONTENT_TYPE.to_string()),
            );
        }

        let mut responses = IndexMap::new();
        for (status_code, (payload, description, content_type)) in declared {
            let Some(schema) = payload.and_then(|payload| self.payload_schema(id, &payload, schema_gen))
            else {
                debug!("{}: response {} has no documentable payload", id, status_code);
                continue;
            };
            responses.insert(
                status_code,
                Response {
                    description,
                    content: IndexMap::from([(content_type, MediaType::new(schema))]),
                },
            );
        }

        Ok(responses)
    }

    fn payload_schema(
        &self,
        id: &HandlerId,
        payload: &ResponsePayload,
        schema_gen: &mut SchemaGenerator,
    ) -> Option<Schema> {
        match payload {
            ResponsePayload::Model(model) => self
                .model_reference(id, model, schema_gen)
                .map(Schema::reference),
            ResponsePayload::ModelList(model) => self
                .model_reference(id, model, schema_gen)
                .map(|reference| Schema::array(Schema::reference(reference))),
            ResponsePayload::Raw(serde_json::Value::Null) => None,
            ResponsePayload::Raw(value) => Some(value_schema(value)),
        }
    }

    fn model_reference(
        &self,
        id: &HandlerId,
        model: &str,
        schema_gen: &mut SchemaGenerator,
    ) -> Option<String> {
        let Some(descriptor) = self.catalog.model(model) else {
            warn!("{}: response model {} is not described, skipping", id, model);
            return None;
        };
        Some(schema_gen.generate_schema(&descriptor.field_rules(), short_name(model)))
    }
}

/// Bearer security for routes guarded by a token based `auth` middleware.
///
/// Only the first `auth*` middleware is considered.
pub fn security_requirements(middleware: &[String]) -> Vec<SecurityRequirement> {
    let Some(auth) = middleware.iter().find(|name| name.starts_with("auth")) else {
        return Vec::new();
    };

    if TOKEN_GUARDS.iter().any(|guard| auth.contains(guard)) {
        vec![IndexMap::from([(BEARER_SCHEME.to_string(), Vec::new())])]
    } else {
        Vec::new()
    }
}

fn is_class_name(type_name: &str) -> bool {
    type_name.contains('\\') || type_name.starts_with(|c: char| c.is_ascii_uppercase())
}
