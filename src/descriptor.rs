//! Route and handler descriptors consumed by the generator.
//!
//! Descriptors are plain values produced once by a discovery pass (see
//! [`crate::manifest`]). The generator core never inspects the host
//! application itself; everything it knows about a route, its handler, the
//! request types and the data models arrives through these types and the
//! [`Catalog`] trait.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Field name (possibly dotted, e.g. `address.city` or `tags.*`) to ordered
/// validation tokens (e.g. `required`, `string`, `in:a,b`).
pub type FieldRuleSet = IndexMap<String, Vec<String>>;

/// Request types that are always treated as request-body types.
pub const BUILTIN_REQUEST_TYPES: &[&str] = &["Illuminate\\Http\\Request", "Request"];

/// Lookup facility for handler, request type and model descriptors.
///
/// Implemented by [`crate::manifest::Manifest`]; the operation builder only
/// depends on this trait.
pub trait Catalog {
    /// Descriptor of the handler method identified by `id`
    fn handler(&self, id: &HandlerId) -> Option<&HandlerDescriptor>;

    /// Descriptor of a request-body type declared by the host application
    fn request_type(&self, type_name: &str) -> Option<&RequestTypeDescriptor>;

    /// Descriptor of a data model, by fully-qualified or short name
    fn model(&self, type_name: &str) -> Option<&ModelDescriptor>;

    /// Whether `type_name` denotes a request-body type
    fn is_request_type(&self, type_name: &str) -> bool {
        BUILTIN_REQUEST_TYPES.contains(&type_name) || self.request_type(type_name).is_some()
    }
}

/// HTTP methods a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// HTTP GET method
    #[serde(alias = "get")]
    Get,
    /// HTTP POST method
    #[serde(alias = "post")]
    Post,
    /// HTTP PUT method
    #[serde(alias = "put")]
    Put,
    /// HTTP DELETE method
    #[serde(alias = "delete")]
    Delete,
    /// HTTP PATCH method
    #[serde(alias = "patch")]
    Patch,
    /// HTTP OPTIONS method
    #[serde(alias = "options")]
    Options,
    /// HTTP HEAD method
    #[serde(alias = "head")]
    Head,
}

impl HttpMethod {
    /// Upper-case method name as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Lower-case method name used as the path item key
    pub fn key(&self) -> String {
        self.as_str().to_lowercase()
    }
}

/// One registered endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteDescriptor {
    /// URI template (e.g. `api/users/{user}`)
    pub uri: String,
    /// Methods the route answers to; the first one is documented
    pub methods: Vec<HttpMethod>,
    /// Handler identity: `Class@method`, `Class` for invokable handlers,
    /// or `Closure` for inline handlers
    pub action: String,
    /// Middleware names, in the order they run
    #[serde(default)]
    pub middleware: Vec<String>,
}

impl RouteDescriptor {
    /// Action name used for inline (closure) handlers
    pub const CLOSURE_ACTION: &'static str = "Closure";

    /// Create a new RouteDescriptor with minimal required fields
    pub fn new(uri: impl Into<String>, method: HttpMethod, action: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            methods: vec![method],
            action: action.into(),
            middleware: Vec::new(),
        }
    }

    /// Attach middleware names to the route
    pub fn with_middleware<I, S>(mut self, middleware: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.middleware = middleware.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the route is served by an inline handler
    pub fn is_closure(&self) -> bool {
        let action = self.action.trim();
        action.is_empty() || action == Self::CLOSURE_ACTION
    }

    /// Handler identity, `None` for inline handlers
    pub fn handler_id(&self) -> Option<HandlerId> {
        if self.is_closure() {
            None
        } else {
            Some(HandlerId::parse(&self.action))
        }
    }

    /// The documented HTTP method
    pub fn primary_method(&self) -> Option<HttpMethod> {
        self.methods.first().copied()
    }
}

/// Identity of a handler method: owning class plus method name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerId {
    pub class: String,
    pub method: String,
}

impl HandlerId {
    /// Method name of invokable (single action) handlers
    pub const INVOKE: &'static str = "__invoke";

    /// Parse `Class@method`; a bare class name is an invokable handler
    pub fn parse(action: &str) -> Self {
        match action.trim().split_once('@') {
            Some((class, method)) => Self {
                class: class.to_string(),
                method: method.to_string(),
            },
            None => Self {
                class: action.trim().to_string(),
                method: Self::INVOKE.to_string(),
            },
        }
    }

    pub fn is_invokable(&self) -> bool {
        self.method == Self::INVOKE
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.class, self.method)
    }
}

/// Everything known about one handler method.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HandlerDescriptor {
    /// Declared parameters, in declaration order
    #[serde(default)]
    pub parameters: Vec<HandlerParameter>,
    /// Structured annotations attached to the method. Variants are written as
    /// single-key maps (`- path: {...}`, `payload: { model: ... }`) in YAML
    /// as well as in JSON.
    #[serde(
        default,
        deserialize_with = "serde_yaml::with::singleton_map_recursive::deserialize"
    )]
    pub annotations: Vec<Annotation>,
    /// Raw documentation comment
    #[serde(default)]
    pub doc: Option<String>,
}

impl HandlerDescriptor {
    /// The first `Path` annotation, if any
    pub fn path_meta(&self) -> Option<&PathMeta> {
        self.annotations.iter().find_map(|annotation| match annotation {
            Annotation::Path(meta) => Some(meta),
            _ => None,
        })
    }

    pub fn query_annotations(&self) -> impl Iterator<Item = &QueryParam> {
        self.annotations.iter().filter_map(|annotation| match annotation {
            Annotation::Query(query) => Some(query),
            _ => None,
        })
    }

    pub fn response_annotations(&self) -> impl Iterator<Item = &ResponseMeta> {
        self.annotations.iter().filter_map(|annotation| match annotation {
            Annotation::Response(response) => Some(response),
            _ => None,
        })
    }

    /// Documentation text, if present and not blank
    pub fn doc_comment(&self) -> Option<&str> {
        self.doc.as_deref().filter(|doc| !doc.trim().is_empty())
    }
}

/// A declared handler parameter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HandlerParameter {
    pub name: String,
    /// Declared type name; `None` when the parameter is untyped
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub nullable: bool,
}

impl HandlerParameter {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
            nullable,
        }
    }
}

/// Structured annotation attached to a handler method.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    Path(PathMeta),
    Query(QueryParam),
    Response(ResponseMeta),
}

/// Operation-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathMeta {
    pub tags: Vec<String>,
    pub summary: String,
    pub description: String,
    pub operation_id: String,
}

/// A query parameter declared by annotation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryParam {
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

/// The `Request` annotation of a request-body type. Every argument is
/// optional; an annotation without arguments does not document a body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestBodyMeta {
    pub description: Option<String>,
    pub content_type: Option<String>,
    pub required: Option<bool>,
}

impl RequestBodyMeta {
    pub fn has_arguments(&self) -> bool {
        self.description.is_some() || self.content_type.is_some() || self.required.is_some()
    }
}

/// A documented response for one status code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub status_code: u16,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payload: Option<ResponsePayload>,
}

/// What a response carries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePayload {
    /// A single data-model instance, by model name
    Model(String),
    /// A list of data-model instances, by model name
    ModelList(String),
    /// A sample payload
    Raw(serde_json::Value),
}

/// Kind of a request-body type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Validated request carrying field rules
    #[default]
    FormRequest,
    /// Plain request object without rules
    Plain,
}

/// A request-body type declared by the host application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestTypeDescriptor {
    #[serde(default)]
    pub kind: RequestKind,
    /// The `Request` annotation attached to the type
    #[serde(default)]
    pub request: Option<RequestBodyMeta>,
    #[serde(default, deserialize_with = "deserialize_rules")]
    pub rules: FieldRuleSet,
}

/// A data model: writable fields and their storage casts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelDescriptor {
    #[serde(default)]
    pub fillable: Vec<String>,
    #[serde(default)]
    pub casts: IndexMap<String, String>,
}

impl ModelDescriptor {
    /// One rule list per fillable field; uncast fields are strings
    pub fn field_rules(&self) -> FieldRuleSet {
        self.fillable
            .iter()
            .map(|field| {
                let token = match self.casts.get(field) {
                    Some(cast) => cast_to_rule(cast),
                    None => "string".to_string(),
                };
                (field.clone(), vec![token])
            })
            .collect()
    }
}

/// Translate a storage cast into a validation token
fn cast_to_rule(cast: &str) -> String {
    let base = cast.split(':').next().unwrap_or(cast).trim();
    let token = match base {
        "int" | "integer" => "integer",
        "real" | "float" | "double" | "decimal" => "number",
        "bool" | "boolean" => "boolean",
        "date" | "immutable_date" => "date",
        "datetime" | "immutable_datetime" | "timestamp" | "custom_datetime" => {
            "date_format:Y-m-d H:i:s"
        }
        "array" | "json" | "collection" | "object" => "array",
        "string" | "encrypted" => "string",
        _ => return cast.to_string(),
    };
    token.to_string()
}

/// Last segment of a namespaced class name
pub fn short_name(class: &str) -> &str {
    class.rsplit('\\').next().unwrap_or(class)
}

/// Rules are written either as a token list or as a pipe-delimited string
#[derive(Deserialize)]
#[serde(untagged)]
enum RuleList {
    Tokens(Vec<String>),
    Piped(String),
}

impl RuleList {
    fn into_tokens(self) -> Vec<String> {
        match self {
            RuleList::Tokens(tokens) => tokens,
            RuleList::Piped(rules) => rules
                .split('|')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

fn deserialize_rules<'de, D>(deserializer: D) -> Result<FieldRuleSet, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: IndexMap<String, RuleList> = IndexMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(field, rules)| (field, rules.into_tokens()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_id_parse() {
        let id = HandlerId::parse("App\\Http\\Controllers\\UserController@show");
        assert_eq!(id.class, "App\\Http\\Controllers\\UserController");
        assert_eq!(id.method, "show");
        assert!(!id.is_invokable());
        assert_eq!(id.to_string(), "App\\Http\\Controllers\\UserController@show");
    }

    #[test]
    fn test_handler_id_invokable() {
        let id = HandlerId::parse("App\\Http\\Controllers\\HealthController");
        assert_eq!(id.method, "__invoke");
        assert!(id.is_invokable());
    }

    #[test]
    fn test_closure_route_has_no_handler() {
        let route = RouteDescriptor::new("api/health", HttpMethod::Get, "Closure");
        assert!(route.is_closure());
        assert!(route.handler_id().is_none());

        let route = RouteDescriptor::new("api/users", HttpMethod::Get, "UserController@index");
        assert!(!route.is_closure());
        assert_eq!(route.handler_id().unwrap().method, "index");
    }

    #[test]
    fn test_http_method_keys() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Delete.key(), "delete");
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("App\\Models\\User"), "User");
        assert_eq!(short_name("User"), "User");
    }

    #[test]
    fn test_model_field_rules() {
        let model = ModelDescriptor {
            fillable: vec![
                "name".to_string(),
                "age".to_string(),
                "is_admin".to_string(),
                "born_at".to_string(),
                "settings".to_string(),
                "price".to_string(),
            ],
            casts: IndexMap::from([
                ("age".to_string(), "integer".to_string()),
                ("is_admin".to_string(), "boolean".to_string()),
                ("born_at".to_string(), "datetime".to_string()),
                ("settings".to_string(), "array".to_string()),
                ("price".to_string(), "decimal:2".to_string()),
            ]),
        };

        let rules = model.field_rules();
        let fields: Vec<&str> = rules.keys().map(String::as_str).collect();
        assert_eq!(fields, ["name", "age", "is_admin", "born_at", "settings", "price"]);
        assert_eq!(rules["name"], ["string"]);
        assert_eq!(rules["age"], ["integer"]);
        assert_eq!(rules["is_admin"], ["boolean"]);
        assert_eq!(rules["born_at"], ["date_format:Y-m-d H:i:s"]);
        assert_eq!(rules["settings"], ["array"]);
        assert_eq!(rules["price"], ["number"]);
    }

    #[test]
    fn test_unknown_cast_passes_through() {
        assert_eq!(cast_to_rule("App\\Casts\\Money"), "App\\Casts\\Money");
    }

    #[test]
    fn test_deserialize_handler_descriptor() {
        let yaml = r#"
parameters:
  - { name: user, type: App\Models\User }
  - { name: filter, type: string, nullable: true }
  - { name: raw }
annotations:
  - path: { tags: [users], summary: Show user, operationId: showUser }
  - query: { name: include, required: true }
  - response: { statusCode: 200, description: OK, payload: { model: App\Models\User } }
  - response: { statusCode: 404, payload: { raw: { message: Not found } } }
doc: |
  /**
   * @Query(name=page, required=false)
   */
"#;
        let handler: HandlerDescriptor = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(handler.parameters.len(), 3);
        assert_eq!(handler.parameters[0].type_name.as_deref(), Some("App\\Models\\User"));
        assert!(!handler.parameters[0].nullable);
        assert!(handler.parameters[1].nullable);
        assert!(handler.parameters[2].type_name.is_none());

        let path = handler.path_meta().unwrap();
        assert_eq!(path.tags, ["users"]);
        assert_eq!(path.operation_id, "showUser");
        assert!(path.description.is_empty());

        let queries: Vec<_> = handler.query_annotations().collect();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].required);

        let responses: Vec<_> = handler.response_annotations().collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(
            responses[0].payload,
            Some(ResponsePayload::Model("App\\Models\\User".to_string()))
        );
        assert_eq!(
            responses[1].payload,
            Some(ResponsePayload::Raw(serde_json::json!({"message": "Not found"})))
        );
        assert!(handler.doc_comment().unwrap().contains("@Query"));
    }

    #[test]
    fn test_deserialize_request_type_rules() {
        let yaml = r#"
request: { description: Create a user }
rules:
  name: [required, string]
  email: required|email
"#;
        let request: RequestTypeDescriptor = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(request.kind, RequestKind::FormRequest);
        assert!(request.request.as_ref().unwrap().has_arguments());
        assert_eq!(request.rules["name"], ["required", "string"]);
        assert_eq!(request.rules["email"], ["required", "email"]);
    }

    #[test]
    fn test_request_annotation_without_arguments() {
        let meta: RequestBodyMeta = serde_yaml::from_str("{}").unwrap();
        assert!(!meta.has_arguments());
    }

    #[test]
    fn test_deserialize_route_descriptor() {
        let yaml = r#"
uri: api/users/{user}
methods: [GET, head]
action: App\Http\Controllers\UserController@show
middleware: [api, "auth:sanctum"]
"#;
        let route: RouteDescriptor = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(route.methods, [HttpMethod::Get, HttpMethod::Head]);
        assert_eq!(route.primary_method(), Some(HttpMethod::Get));
        assert_eq!(route.middleware, ["api", "auth:sanctum"]);
    }
}
