use std::fmt;
use std::str::FromStr;

/// Descriptor file names, newest first.
pub const DEFAULT_DESCRIPTORS: &[&str] = &[
    "__manifest__.py",
    "__odoo__.py",
    "__openerp__.py",
    "__terp__.py",
];

pub const DEFAULT_ENTRY_POINTS: &[&str] = &["__init__.py"];

/// File names that make a directory a module: exactly one descriptor and
/// exactly one entry point, and no other marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSet {
    pub descriptors: Vec<String>,
    pub entry_points: Vec<String>,
}

impl MarkerSet {
    pub fn new<I, J, S, T>(descriptors: I, entry_points: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            descriptors: descriptors.into_iter().map(Into::into).collect(),
            entry_points: entry_points.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_descriptor(&self, name: &str) -> bool {
        self.descriptors.iter().any(|d| d == name)
    }

    pub fn is_entry_point(&self, name: &str) -> bool {
        self.entry_points.iter().any(|e| e == name)
    }
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self::new(
            DEFAULT_DESCRIPTORS.iter().copied(),
            DEFAULT_ENTRY_POINTS.iter().copied(),
        )
    }
}

/// What discovery does with a descriptor that fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Abort the whole discovery call.
    #[default]
    FailFast,
    /// Log a warning and leave the module out.
    Skip,
}

impl FromStr for MalformedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" | "fail-fast" => Ok(MalformedPolicy::FailFast),
            "skip" => Ok(MalformedPolicy::Skip),
            other => Err(format!(
                "unknown malformed-descriptor policy '{}' (expected fail or skip)",
                other
            )),
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedPolicy::FailFast => write!(f, "fail"),
            MalformedPolicy::Skip => write!(f, "skip"),
        }
    }
}

/// What discovery does when two directories yield the same module name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Keep the module visited last (directories are visited in name order).
    #[default]
    LastWins,
    /// Fail with `DuplicateModule`.
    Error,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "last-wins" | "last_wins" => Ok(DuplicatePolicy::LastWins),
            "error" => Ok(DuplicatePolicy::Error),
            other => Err(format!(
                "unknown duplicate-module policy '{}' (expected last-wins or error)",
                other
            )),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::LastWins => write!(f, "last-wins"),
            DuplicatePolicy::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryOptions {
    pub markers: MarkerSet,
    pub on_malformed: MalformedPolicy,
    pub on_duplicate: DuplicatePolicy,
}
