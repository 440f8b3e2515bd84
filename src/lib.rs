//! OpenAPI from routes - OpenAPI 3.0 documents from HTTP route descriptors.
//!
//! The host application exports its route table, the handlers behind each
//! route, its request-body types and its data models as route manifests.
//! This library turns those descriptors into a complete OpenAPI 3.0 document:
//! path items, operations, parameters, request bodies, responses and a
//! deduplicated set of component schemas.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Locates route manifests on disk
//! 2. [`manifest`] - Loads and merges manifests into a descriptor catalog
//! 3. [`route_selector`] - Keeps the routes under a URI prefix
//! 4. [`doc_tags`] - Parses `@Query` / `@Response` tags out of doc comments
//! 5. [`type_inference`] - Maps validation tokens to OpenAPI types and formats
//! 6. [`schema_generator`] - Builds and registers component schemas from field rules
//! 7. [`operation_builder`] - Builds one operation per route
//! 8. [`openapi_builder`] - Assembles the complete OpenAPI document
//! 9. [`serializer`] - Serializes the document to YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_routes::{
//!     config::Metadata,
//!     manifest::ManifestParser,
//!     openapi_builder::assemble,
//!     route_selector,
//!     serializer::serialize_yaml,
//! };
//! use std::path::Path;
//!
//! // Load every manifest under ./manifests
//! let manifest = ManifestParser::load(Path::new("./manifests")).unwrap();
//!
//! // Keep the API routes
//! let routes: Vec<_> = route_selector::select(&manifest.routes, "api")
//!     .into_iter()
//!     .cloned()
//!     .collect();
//!
//! // Build the document
//! let document = assemble(&routes, &manifest, Metadata::from_env()).unwrap();
//!
//! // Serialize to YAML
//! let yaml = serialize_yaml(&document).unwrap();
//! println!("{}", yaml);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod config;
pub mod descriptor;
pub mod doc_tags;
pub mod error;
pub mod manifest;
pub mod openapi_builder;
pub mod operation_builder;
pub mod route_selector;
pub mod scanner;
pub mod schema_generator;
pub mod serializer;
pub mod type_inference;
