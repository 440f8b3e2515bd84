use crate::descriptor::{
    short_name, Catalog, HandlerDescriptor, HandlerId, ModelDescriptor, RequestTypeDescriptor,
    RouteDescriptor,
};
use crate::scanner::FileScanner;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Route manifest: the descriptors exported by the host application.
///
/// A manifest carries the route table plus the handler, request type and model
/// descriptors those routes refer to. Several manifests can be merged into one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Registered routes, in registration order
    pub routes: Vec<RouteDescriptor>,
    /// Handler descriptors keyed by `Class@method` (or `Class` for invokable handlers)
    pub handlers: IndexMap<String, HandlerDescriptor>,
    /// Request-body types keyed by class name
    pub request_types: IndexMap<String, RequestTypeDescriptor>,
    /// Data models keyed by class name
    pub models: IndexMap<String, ModelDescriptor>,
}

/// A successfully parsed manifest with the file it came from.
#[derive(Debug)]
pub struct ParsedManifest {
    /// Path to the manifest file
    pub path: PathBuf,
    /// The parsed manifest
    pub manifest: Manifest,
}

/// Loader for route manifests.
pub struct ManifestParser;

impl ManifestParser {
    /// Parses a single manifest file.
    ///
    /// Files ending in `.json` are read as JSON, everything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file is not a valid manifest
    pub fn parse_file(path: &Path) -> Result<ParsedManifest> {
        debug!("Parsing manifest: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let manifest = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse manifest: {}", path.display()))?
        } else {
            Self::parse_yaml(&content)
                .with_context(|| format!("Failed to parse manifest: {}", path.display()))?
        };

        Ok(ParsedManifest {
            path: path.to_path_buf(),
            manifest,
        })
    }

    /// Parses manifest content in YAML form. An empty document is an empty manifest.
    pub fn parse_yaml(content: &str) -> Result<Manifest> {
        if content.trim().is_empty() {
            return Ok(Manifest::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parses every file in order, stopping at the first failure.
    ///
    /// Unlike a source scan, a broken manifest cannot be skipped: the routes it
    /// describes would silently vanish from the document.
    pub fn parse_files(paths: &[PathBuf]) -> Result<Vec<ParsedManifest>> {
        debug!("Parsing {} manifests", paths.len());
        paths.iter().map(|path| Self::parse_file(path)).collect()
    }

    /// Scans `path` (file or directory) and merges every manifest found.
    pub fn load(path: &Path) -> Result<Manifest> {
        let scan_result = FileScanner::new(path.to_path_buf()).scan()?;

        if scan_result.manifest_files.is_empty() {
            anyhow::bail!("No route manifests found in {}", path.display());
        }

        info!("Found {} manifest file(s)", scan_result.manifest_files.len());

        let mut merged = Manifest::default();
        for parsed in Self::parse_files(&scan_result.manifest_files)? {
            debug!(
                "Merging {} ({} routes)",
                parsed.path.display(),
                parsed.manifest.routes.len()
            );
            merged.merge(parsed.manifest);
        }

        Ok(merged)
    }
}

impl Manifest {
    /// Appends the routes of `other` and merges its descriptor maps.
    /// Later descriptors replace earlier ones with the same key.
    pub fn merge(&mut self, other: Manifest) {
        self.routes.extend(other.routes);
        merge_map(&mut self.handlers, other.handlers, "handler");
        merge_map(&mut self.request_types, other.request_types, "request type");
        merge_map(&mut self.models, other.models, "model");
    }
}

fn merge_map<V>(target: &mut IndexMap<String, V>, source: IndexMap<String, V>, kind: &str) {
    for (key, value) in source {
        if target.insert(key.clone(), value).is_some() {
            warn!("Duplicate {} descriptor for {}, keeping the later one", kind, key);
        }
    }
}

impl Catalog for Manifest {
    fn handler(&self, id: &HandlerId) -> Option<&HandlerDescriptor> {
        self.handlers.get(&id.to_string()).or_else(|| {
            if id.is_invokable() {
                self.handlers.get(&id.class)
            } else {
                None
            }
        })
    }

    fn request_type(&self, type_name: &str) -> Option<&RequestTypeDescriptor> {
        self.request_types.get(type_name)
    }

    fn model(&self, type_name: &str) -> Option<&ModelDescriptor> {
        if let Some(model) = self.models.get(type_name) {
            return Some(model);
        }

        // Fall back to the short name when exactly one model carries it
        let mut candidates = self
            .models
            .iter()
            .filter(|(name, _)| short_name(name) == type_name);
        match (candidates.next(), candidates.next()) {
            (Some((_, model)), None) => Some(model),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{HttpMethod, ResponsePayload};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    const USERS_MANIFEST: &str = r#"
routes:
  - uri: api/users
    methods: [GET, HEAD]
    action: App\Http\Controllers\UserController@index
    middleware: [api]
handlers:
  App\Http\Controllers\UserController@index:
    parameters: []
models:
  App\Models\User:
    fillable: [name, email]
"#;

    #[test]
    fn test_parse_valid_yaml_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = create_temp_file(&temp_dir, "users.yaml", USERS_MANIFEST);

        let parsed = ManifestParser::parse_file(&file_path).unwrap();

        assert_eq!(parsed.path, file_path);
        assert_eq!(parsed.manifest.routes.len(), 1);
        assert_eq!(parsed.manifest.routes[0].methods[0], HttpMethod::Get);
        assert!(parsed
            .manifest
            .handlers
            .contains_key("App\\Http\\Controllers\\UserController@index"));
        assert_eq!(parsed.manifest.models["App\\Models\\User"].fillable.len(), 2);
    }

    #[test]
    fn test_parse_json_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let json = r#"{
            "routes": [
                {"uri": "api/ping", "methods": ["GET"], "action": "PingController"}
            ],
            "handlers": {"PingController": {}}
        }"#;
        let file_path = create_temp_file(&temp_dir, "ping.json", json);

        let parsed = ManifestParser::parse_file(&file_path).unwrap();

        assert_eq!(parsed.manifest.routes[0].uri, "api/ping");
        let id = parsed.manifest.routes[0].handler_id().unwrap();
        assert!(parsed.manifest.handler(&id).is_some());
    }

    #[test]
    fn test_parse_invalid_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = create_temp_file(&temp_dir, "broken.yaml", "routes: {uri: [}");

        let result = ManifestParser::parse_file(&file_path);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to parse manifest"));
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = ManifestParser::parse_file(Path::new("/nonexistent/routes.yaml"));

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to read file"));
    }

    #[test]
    fn test_parse_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = create_temp_file(&temp_dir, "empty.yaml", "");

        let parsed = ManifestParser::parse_file(&file_path).unwrap();

        assert!(parsed.manifest.routes.is_empty());
        assert!(parsed.manifest.handlers.is_empty());
    }

    #[test]
    fn test_load_merges_directory() {
        let temp_dir = TempDir::new().unwrap();
        create_temp_file(&temp_dir, "a_users.yaml", USERS_MANIFEST);
        create_temp_file(
            &temp_dir,
            "b_posts.yaml",
            r#"
routes:
  - uri: api/posts
    methods: [POST]
    action: App\Http\Controllers\PostController@store
models:
  App\Models\User:
    fillable: [name]
"#,
        );

        let manifest = ManifestParser::load(temp_dir.path()).unwrap();

        let uris: Vec<&str> = manifest.routes.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(uris, ["api/users", "api/posts"]);
        // The later manifest replaces the model descriptor
        assert_eq!(manifest.models["App\\Models\\User"].fillable, ["name"]);
    }

    #[test]
    fn test_load_empty_directory_fails() {
        let temp_dir = TempDir::new().unwrap();

        let result = ManifestParser::load(temp_dir.path());

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("No route manifests found"));
    }

    #[test]
    fn test_parse_files_stops_at_first_failure() {
        let temp_dir = TempDir::new().unwrap();
        let good = create_temp_file(&temp_dir, "good.yaml", USERS_MANIFEST);
        let bad = create_temp_file(&temp_dir, "bad.json", "{ not json");

        assert!(ManifestParser::parse_files(&[good.clone()]).is_ok());
        assert!(ManifestParser::parse_files(&[good, bad]).is_err());
    }

    #[test]
    fn test_model_lookup_by_short_name() {
        let mut manifest = Manifest::default();
        manifest
            .models
            .insert("App\\Models\\User".to_string(), ModelDescriptor::default());
        manifest
            .models
            .insert("App\\Models\\Post".to_string(), ModelDescriptor::default());
        manifest
            .models
            .insert("Legacy\\Post".to_string(), ModelDescriptor::default());

        assert!(manifest.model("App\\Models\\User").is_some());
        assert!(manifest.model("User").is_some());
        // Ambiguous short name
        assert!(manifest.model("Post").is_none());
        assert!(manifest.model("Comment").is_none());
    }

    #[test]
    fn test_parse_annotated_yaml_manifest() {
        let yaml = r#"
routes:                       # Route Descriptors, in registration order
  - uri: api/users/{user}
    methods: [GET, HEAD]      # first method is the documented one
    action: App\Http\Controllers\UserController@show   # "Closure" = inline
    middleware: [api, auth:sanctum]
handlers:                     # keyed by "Class@method" (invokable: "Class")
  App\Http\Controllers\UserController@show:
    parameters:               # ordered Handler Parameters
      - { name: user, type: App\Models\User, nullable: false }
    annotations:              # Structured Annotations (externally tagged)
      - path: { tags: [users], summary: Show, description: "", operationId: showUser }
      - query: { name: include, required: false }
      - response: { statusCode: 200, description: OK, contentType: application/json,
                    payload: { model: App\Models\User } }   # | model_list | raw
    doc: |                    # raw doc-comment text
      /** @Query(name=page, required=true) */
request_types:                # request-body types, keyed by class name
  App\Http\Requests\StoreUserRequest:
    kind: form_request        # form_request | plain
    request: { description: Create a user }   # the `Request` annotation
    rules:                    # Field Rule Set; list or pipe-delimited string
      name: [required, string]
      email: required|email
models:                       # model introspection collaborator
  App\Models\User:
    fillable: [name, email, is_admin]
    casts: { is_admin: boolean }
"#;

        let manifest = ManifestParser::parse_yaml(yaml).unwrap();

        let id = manifest.routes[0].handler_id().unwrap();
        let handler = manifest.handler(&id).unwrap();
        assert_eq!(handler.annotations.len(), 3);
        assert_eq!(handler.path_meta().unwrap().operation_id, "showUser");
        assert_eq!(handler.query_annotations().next().unwrap().name, "include");

        let response = handler.response_annotations().next().unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.content_type.as_deref(), Some("application/json"));
        assert_eq!(
            response.payload,
            Some(ResponsePayload::Model("App\\Models\\User".to_string()))
        );

        let request = manifest
            .request_type("App\\Http\\Requests\\StoreUserRequest")
            .unwrap();
        assert_eq!(request.rules["email"], ["required", "email"]);
        assert!(manifest.model("User").is_some());
    }

    #[test]
    fn test_builtin_request_type() {
        let manifest = Manifest::default();
        assert!(manifest.is_request_type("Illuminate\\Http\\Request"));
        assert!(!manifest.is_request_type("App\\Http\\Requests\\StoreUserRequest"));
    }
}
