use std::path::{Path, PathBuf};

use crate::ast::Program;
use crate::interpreter::error::ExceptionValue;
use crate::interpreter::parser;
use crate::interpreter::session::Session;

/// A freshly loaded import, ready to execute in the importer's environment.
#[derive(Debug)]
pub struct LoadedImport {
    pub path: PathBuf,
    pub source_name: String,
    pub base_dir: PathBuf,
    pub program: Program,
}

/// Resolves an import spec against the importing script's directory and
/// canonicalizes it, so the same file reached through different relative
/// paths or symlinks registers once.
pub fn resolve(base_dir: &Path, spec: &str) -> std::io::Result<PathBuf> {
    let raw = if Path::new(spec).is_absolute() {
        PathBuf::from(spec)
    } else {
        base_dir.join(spec)
    };
    raw.canonicalize()
}

/// Loads an import. Returns `Ok(None)` when the canonical path was already
/// registered; the registration happens BEFORE the caller executes the
/// body, so import cycles terminate instead of recursing.
pub fn load(
    session: &Session,
    base_dir: &Path,
    spec: &str,
    line: u32,
) -> Result<Option<LoadedImport>, ExceptionValue> {
    let path = resolve(base_dir, spec).map_err(|e| {
        ExceptionValue::io_error_at(format!("cannot resolve import '{}': {}", spec, e), line)
    })?;

    if !session.begin_import(&path) {
        session.trace(format!("import '{}' already loaded", path.display()));
        return Ok(None);
    }
    session.trace(format!("importing '{}'", path.display()));

    let text = std::fs::read_to_string(&path).map_err(|e| {
        ExceptionValue::io_error_at(format!("cannot read import '{}': {}", spec, e), line)
    })?;

    let program = parser::parse_source(&text).map_err(|e| {
        ExceptionValue::parse_error_at(
            format!("in import '{}' (line {}): {}", spec, e.line, e.message),
            line,
        )
    })?;

    let source_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| spec.to_string());
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(Some(LoadedImport {
        path,
        source_name,
        base_dir,
        program,
    }))
}
