use anyhow::{Context, Result};
use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions recognised as route manifests
const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// File scanner for locating route manifests.
///
/// The `FileScanner` accepts either a single manifest file or a directory. Directories are
/// walked recursively to find all YAML and JSON manifests, skipping hidden directories
/// (those starting with `.`).
///
/// # Example
///
/// ```no_run
/// use openapi_from_routes::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./openapi"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} manifests", result.manifest_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a scanning operation.
///
/// Contains the discovered manifests and any warnings encountered during scanning.
pub struct ScanResult {
    /// Paths to all discovered manifests, sorted by path
    pub manifest_files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a new `FileScanner` for the specified manifest file or directory.
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Collects manifest files under the root path.
    ///
    /// A root path that is a file is returned as the only manifest, whatever its
    /// extension. Otherwise the directory tree is traversed and every `.yaml`, `.yml`
    /// and `.json` file is collected. Sorting by path keeps route order stable between
    /// runs.
    ///
    /// If any directories or files cannot be accessed, warnings are logged and added to
    /// the result, but scanning continues.
    ///
    /// # Errors
    ///
    /// Returns an error if the root path does not exist.
    pub fn scan(&self) -> Result<ScanResult> {
        let metadata = self
            .root_path
            .metadata()
            .with_context(|| format!("Failed to access manifest path: {}", self.root_path.display()))?;

        if metadata.is_file() {
            return Ok(ScanResult {
                manifest_files: vec![self.root_path.clone()],
                warnings: Vec::new(),
            });
        }

        let mut manifest_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .into_iter()
            .filter_entry(|e| {
                // Don't filter the root directory itself
                if e.path() == self.root_path {
                    return true;
                }

                !e.file_name().to_string_lossy().starts_with('.')
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && is_manifest(path) {
                        manifest_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        manifest_files.sort();

        Ok(ScanResult {
            manifest_files,
            warnings,
        })
    }
}

fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| MANIFEST_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
