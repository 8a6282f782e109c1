//! Module records and the name-keyed registry built by discovery

use crate::manifest::Manifest;
use std::collections::btree_map::{self, BTreeMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub path: PathBuf,
    pub application: bool,
    pub depends: Vec<String>,
    pub auto_install: bool,
    pub version: Option<String>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: PathBuf::from(&name),
            name,
            application: false,
            depends: Vec::new(),
            auto_install: false,
            version: None,
        }
    }

    pub fn from_manifest(name: impl Into<String>, path: impl Into<PathBuf>, manifest: Manifest) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            application: manifest.application,
            depends: manifest.depends,
            auto_install: manifest.auto_install,
            version: manifest.version,
        }
    }

    pub fn with_depends<I, S>(mut self, depends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends = depends.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn application(mut self) -> Self {
        self.application = true;
        self
    }

    pub fn auto_install(mut self) -> Self {
        self.auto_install = true;
        self
    }
}

/// Installable modules keyed by name, iterated in name order.
///
/// `depends` entries may name modules that are not registered; graph queries
/// treat such names as leaves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Module>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `module`, returning the record it replaced.
    pub fn insert(&mut self, module: Module) -> Option<Module> {
        self.modules.insert(module.name.clone(), module)
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn path_of(&self, name: &str) -> Option<&Path> {
        self.modules.get(name).map(|m| m.path.as_path())
    }
}

impl FromIterator<Module> for ModuleRegistry {
    fn from_iter<T: IntoIterator<Item = Module>>(iter: T) -> Self {
        let mut registry = ModuleRegistry::new();
        for module in iter {
            registry.insert(module);
        }
        registry
    }
}

impl IntoIterator for ModuleRegistry {
    type Item = Module;
    type IntoIter = btree_map::IntoValues<String, Module>;

    fn into_iter(self) -> Self::IntoIter {
        self.modules.into_values()
    }
}
