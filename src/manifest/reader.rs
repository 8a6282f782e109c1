use super::literal::{self, Literal};
use crate::error::{Result, ScanError};
use crate::fs::FileSystem;
use std::path::Path;
use tracing::trace;

/// The descriptor fields the engine cares about, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub installable: bool,
    pub application: bool,
    pub depends: Vec<String>,
    pub auto_install: bool,
    pub version: Option<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            installable: true,
            application: false,
            depends: Vec::new(),
            auto_install: false,
            version: None,
        }
    }
}

/// Reads descriptor files through a [`FileSystem`].
pub struct ManifestReader<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> ManifestReader<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    pub fn read(&self, path: &Path) -> Result<Manifest> {
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| ScanError::io(path, e))?;
        parse_manifest(path, &content)
    }
}

/// Parses descriptor `content`; `path` is only used for error reporting.
///
/// Flags follow literal truthiness (`'installable': None` is not installable),
/// `depends: None` counts as no dependencies, and a non-empty sequence for
/// `auto_install` enables it.
pub fn parse_manifest(path: &Path, content: &str) -> Result<Manifest> {
    let value = literal::parse(content).map_err(|e| ScanError::malformed(path, e.to_string()))?;

    if !matches!(value, Literal::Map(_)) {
        return Err(ScanError::malformed(
            path,
            format!("expected a mapping, found {}", value.type_name()),
        ));
    }

    let defaults = Manifest::default();
    let manifest = Manifest {
        installable: flag(&value, "installable", defaults.installable),
        application: flag(&value, "application", defaults.application),
        depends: depends(path, &value)?,
        auto_install: flag(&value, "auto_install", defaults.auto_install),
        version: version(path, &value)?,
    };

    trace!(path = %path.display(), ?manifest, "Parsed descriptor");
    Ok(manifest)
}

fn flag(value: &Literal, key: &str, default: bool) -> bool {
    value.get(key).map(Literal::is_truthy).unwrap_or(default)
}

fn depends(path: &Path, value: &Literal) -> Result<Vec<String>> {
    let items = match value.get("depends") {
        None | Some(Literal::None) => return Ok(Vec::new()),
        Some(entry) => entry.as_sequence().ok_or_else(|| {
            ScanError::malformed(
                path,
                format!("'depends' must be a list of names, found {}", entry.type_name()),
            )
        })?,
    };

    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                ScanError::malformed(
                    path,
                    format!("'depends' entries must be strings, found {}", item),
                )
            })
        })
        .collect()
}

fn version(path: &Path, value: &Literal) -> Result<Option<String>> {
    match value.get("version") {
        None | Some(Literal::None) => Ok(None),
        Some(Literal::Str(s)) => Ok(Some(s.clone())),
        Some(number @ (Literal::Int(_) | Literal::BigInt(_) | Literal::Float(_))) => {
            Ok(Some(number.to_string()))
        }
        Some(other) => Err(ScanError::malformed(
            path,
            format!("'version' must be a string, found {}", other.type_name()),
        )),
    }
}
