//! addonscan - addon discovery and dependency resolution for module repositories
//!
//! A module is a directory holding one descriptor file (`__manifest__.py` and
//! its historical aliases) next to an `__init__.py` entry point. The descriptor
//! is a literal mapping declaring `depends`, `application`, `auto_install`,
//! `installable` and `version`. An addon root is a directory directly holding
//! modules.
//!
//! # Example Usage
//!
//! ```no_run
//! use addonscan::{Filter, ModuleDiscoverer, RealFileSystem, Selection, SelectionEngine};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fs = RealFileSystem::new();
//! let discoverer = ModuleDiscoverer::new(&fs);
//!
//! for root in discoverer.get_addons(Path::new("."), 1)? {
//!     let registry = discoverer.discover(&root, 0)?;
//!     let engine = SelectionEngine::new(&registry);
//!     let apps = engine.select(&Selection::all().applications(Filter::Only))?;
//!     println!("{}: {:?}", root.display(), apps);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`manifest`]: safe descriptor parsing
//! - [`discovery`]: module and addon root discovery
//! - [`registry`]: module records keyed by name
//! - [`graph`]: dependency and dependents closures, auto-install fixpoint
//! - [`selection`]: application and localization selections, changed modules
//! - [`changes`]: changed path sources such as `git diff-index`

pub mod changes;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fs;
pub mod graph;
pub mod manifest;
pub mod registry;
pub mod selection;
pub mod util;

pub use changes::{top_level_dirs, ChangeSource, GitDiffIndex, StaticChanges};
pub use config::{ConfigError, ScanConfig};
pub use discovery::{DiscoveryOptions, DuplicatePolicy, MalformedPolicy, MarkerSet, ModuleDiscoverer};
pub use error::{Result, ScanError};
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use graph::DependencyGraph;
pub use manifest::{parse_manifest, Manifest, ManifestReader};
pub use registry::{Module, ModuleRegistry};
pub use selection::{changed_modules, Filter, LocalizationMatcher, Selection, SelectionEngine};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
