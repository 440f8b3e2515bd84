use crate::config::Metadata;
use crate::manifest::ManifestParser;
use crate::openapi_builder::assemble;
use crate::route_selector::{self, DEFAULT_PREFIX};
use crate::serializer::{serialize, write_to_file, OutputFormat};
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Environment in which generation must be confirmed
const PRODUCTION: &str = "production";

/// Generate an OpenAPI 3.0 specification from an application's route manifests
#[derive(Parser, Debug)]
#[command(name = "openapi-from-routes")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Only routes under this URI prefix are documented
    #[arg(value_name = "PREFIX", default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Route manifest file, or a directory of manifests
    #[arg(short = 'm', long = "manifest", value_name = "PATH")]
    pub manifest: PathBuf,

    /// Document metadata file (info, servers, tags, security schemes)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file; the extension selects YAML (.yaml, .yml) or JSON (.json)
    #[arg(short = 'o', long = "output", value_name = "FILE", default_value = "openapi.yaml")]
    pub output: PathBuf,

    /// Application environment
    #[arg(long = "env", env = "APP_ENV", value_name = "ENV")]
    pub environment: Option<String>,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// How a run ended when no error occurred
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The document was written
    Generated { path: PathBuf, routes: usize },
    /// The user declined a confirmation
    Aborted,
}

/// Run the main workflow, asking confirmations on the terminal
pub fn run(args: &CliArgs) -> Result<Outcome> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    run_with(args, &mut input, &mut io::stderr())
}

/// Run the main workflow, reading confirmation replies from `input`
pub fn run_with<R: BufRead, W: Write>(
    args: &CliArgs,
    input: &mut R,
    prompt: &mut W,
) -> Result<Outcome> {
    debug!("Parsed arguments: {:?}", args);

    if args.environment.as_deref() == Some(PRODUCTION)
        && !confirm(
            args,
            "You are in production environment. Are you sure you want to generate OpenApi specification?",
            input,
            prompt,
        )?
    {
        info!("OpenApi specification generation aborted.");
        return Ok(Outcome::Aborted);
    }

    let format = OutputFormat::from_path(&args.output).with_context(|| {
        format!(
            "Output file must be a YAML (.yaml, .yml) or JSON (.json) file: {}",
            args.output.display()
        )
    })?;

    info!("OpenApi specification will be generated in {}", args.output.display());

    if args.output.exists()
        && !confirm(
            args,
            "OpenApi specification already exists. Do you want to overwrite it?",
            input,
            prompt,
        )?
    {
        info!("OpenApi specification generation aborted.");
        return Ok(Outcome::Aborted);
    }

    info!("Generating OpenApi specification...");

    let manifest = ManifestParser::load(&args.manifest)?;
    let metadata = match &args.config {
        Some(path) => Metadata::load(path)?,
        None => {
            debug!("No metadata file given, using environment defaults");
            Metadata::from_env()
        }
    };

    let routes: Vec<_> = route_selector::select(&manifest.routes, &args.prefix)
        .into_iter()
        .cloned()
        .collect();
    info!(
        "Selected {} of {} route(s) under prefix '{}'",
        routes.len(),
        manifest.routes.len(),
        args.prefix
    );

    let document = assemble(&routes, &manifest, metadata)
        .context("Error during OpenApi specification generation")?;

    let content = serialize(&document, format)?;
    write_to_file(&content, &args.output)?;

    info!("OpenApi specification generated successfully!");
    info!("Summary:");
    info!("  - Paths: {}", document.paths.len());
    info!("  - Schemas: {}", document.components.schemas.len());

    Ok(Outcome::Generated {
        path: args.output.clone(),
        routes: routes.len(),
    })
}

/// Ask a yes/no question; only `y` or `yes` accepts
fn confirm<R: BufRead, W: Write>(
    args: &CliArgs,
    question: &str,
    input: &mut R,
    prompt: &mut W,
) -> Result<bool> {
    if args.yes {
        debug!("Confirmed by --yes: {}", question);
        return Ok(true);
    }

    write!(prompt, "{} [y/N] ", question)?;
    prompt.flush()?;

    let mut reply = String::new();
    input.read_line(&mut reply).context("Failed to read confirmation")?;

    Ok(matches!(
        reply.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
