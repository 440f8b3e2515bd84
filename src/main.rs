//! Command-line tool generating OpenAPI documentation from route manifests.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-routes [OPTIONS] --manifest <PATH> [PREFIX]
//! ```
//!
//! # Examples
//!
//! Document every route under `api` as YAML:
//! ```bash
//! openapi-from-routes -m storage/routes.yaml
//! ```
//!
//! Document the `api/v2` routes as JSON with custom metadata:
//! ```bash
//! openapi-from-routes api/v2 -m manifests/ -c openapi-meta.yaml -o public/openapi.json
//! ```

use clap::Parser;
use log::{error, info};
use openapi_from_routes::cli::{self, Outcome};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    match cli::run(&args) {
        Ok(Outcome::Generated { path, routes }) => {
            info!("Documented {} route(s) in {}", routes, path.display());
            ExitCode::SUCCESS
        }
        Ok(Outcome::Aborted) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
