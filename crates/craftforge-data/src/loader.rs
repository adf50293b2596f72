//! Loading pipeline: finds data files, parses them, and resolves them into
//! core types.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and the
//! deserialization and lookup helpers the recipe resolver builds on.

use crate::recipes::resolve_recipes;
use crate::schema::RecipeData;
use craftforge_core::config::ProductionConfig;
use craftforge_core::recipe::RecipeRevision;
use craftforge_core::registry::ProductRegistry;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// An id reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

const EXTENSIONS: [&str; 3] = ["ron", "toml", "json"];

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan `dir` for `{base_name}.ron`, `.toml`, or `.json`.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for ext in EXTENSIONS {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found.take() {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }
    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list. TOML has no top-level arrays, so for TOML files the
/// list is read from the array at `toml_key`; RON and JSON files hold the
/// list directly.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }
    let mut table: toml::Table = deserialize_file(path)?;
    let array = table
        .remove(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Lookup helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Collections of already-declared names.
pub trait NameIndex {
    fn has_name(&self, name: &str) -> bool;
}

impl NameIndex for HashSet<String> {
    fn has_name(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl<V> NameIndex for HashMap<String, V> {
    fn has_name(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

/// `DuplicateName` if `name` is already in `names`.
pub fn check_duplicate(
    names: &impl NameIndex,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if names.has_name(name) {
        return Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        });
    }
    Ok(())
}

// ===========================================================================
// Top-level loading
// ===========================================================================

/// Everything a host needs to start producing.
#[derive(Debug)]
pub struct CraftData {
    pub config: ProductionConfig,
    pub recipes: Vec<RecipeRevision>,
    /// Stored products whose type or definition could not be loaded.
    pub skipped_products: usize,
}

/// Load `production.{ron,toml,json}` from `dir`. A missing file means the
/// default configuration.
pub fn load_production_config(dir: &Path) -> Result<ProductionConfig, DataLoadError> {
    match find_data_file(dir, "production")? {
        Some(path) => deserialize_file(&path),
        None => {
            log::debug!("no production config in {}, using defaults", dir.display());
            Ok(ProductionConfig::default())
        }
    }
}

/// Load the production config and every stored recipe revision in `dir`,
/// rebuilding products through `registry`.
pub fn load_craft_data(dir: &Path, registry: &ProductRegistry) -> Result<CraftData, DataLoadError> {
    let config = load_production_config(dir)?;
    let path = require_data_file(dir, "recipes")?;
    let data: Vec<RecipeData> = deserialize_list(&path, "recipes")?;
    let resolved = resolve_recipes(data, registry, &path)?;
    log::info!(
        "loaded {} recipe revision(s) from {} ({} product(s) skipped)",
        resolved.recipes.len(),
        path.display(),
        resolved.skipped_products
    );
    Ok(CraftData {
        config,
        recipes: resolved.recipes,
        skipped_products: resolved.skipped_products,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
