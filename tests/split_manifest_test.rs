// Routes, handlers and models described in separate manifest files
use openapi_from_routes::{
    config::Metadata, manifest::ManifestParser, openapi_builder::assemble, route_selector,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;

#[test]
fn test_descriptors_resolve_across_manifests() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/split");

    let manifest = ManifestParser::load(&dir).expect("Failed to load manifests");
    assert_eq!(manifest.routes.len(), 1);

    let routes: Vec<_> = route_selector::select(&manifest.routes, "/api/")
        .into_iter()
        .cloned()
        .collect();
    let metadata = Metadata {
        info: Some(json!({"title": "Blog", "version": "2"})),
        ..Default::default()
    };

    let document = assemble(&routes, &manifest, metadata).expect("Failed to assemble document");
    let document = serde_json::to_value(&document).unwrap();

    assert_eq!(
        document["paths"]["/api/posts/{post}"]["put"],
        json!({
            "parameters": [
                {"name": "post", "in": "path", "required": true, "schema": {"type": "integer"}}
            ],
            "requestBody": {
                "content": {
                    "multipart/form-data": {
                        "schema": {"$ref": "#/components/schemas/UpdatePostRequest"}
                    }
                },
                "required": false
            },
            "responses": {
                "200": {
                    "description": "",
                    "content": {
                        "application/json": {
                            "schema": {"$ref": "#/components/schemas/Post"}
                        }
                    }
                }
            },
            "security": [{"bearerToken": []}]
        })
    );

    assert_eq!(
        document["components"]["schemas"],
        json!({
            "Lines": {
                "type": "object",
                "properties": {
                    "body": {"type": "string"},
                    "position": {"type": "integer"}
                },
                "required": ["body"]
            },
            "UpdatePostRequest": {
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "lines": {
                        "type": "array",
                        "items": {"$ref": "#/components/schemas/Lines"}
                    }
                },
                "required": ["title"]
            },
            "Post": {
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "published_at": {"type": "string", "format": "date"}
                }
            }
        })
    );
}
