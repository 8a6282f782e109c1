use super::markers::{DiscoveryOptions, DuplicatePolicy, MalformedPolicy};
use crate::error::{Result, ScanError};
use crate::fs::FileSystem;
use crate::manifest::ManifestReader;
use crate::registry::{Module, ModuleRegistry};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Finds modules and addon roots beneath a directory.
///
/// Children are visited in name order, so the registry produced for a given
/// tree does not depend on the order the filesystem lists entries in.
pub struct ModuleDiscoverer<'a> {
    fs: &'a dyn FileSystem,
    options: DiscoveryOptions,
}

impl<'a> ModuleDiscoverer<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self::with_options(fs, DiscoveryOptions::default())
    }

    pub fn with_options(fs: &'a dyn FileSystem, options: DiscoveryOptions) -> Self {
        Self { fs, options }
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Returns the descriptor path when `path` is a module directory.
    pub fn is_module(&self, path: &Path) -> Result<Option<PathBuf>> {
        if !self.fs.is_dir(path) {
            return Ok(None);
        }

        let markers = &self.options.markers;
        let mut descriptors = Vec::new();
        let mut entry_points = 0;
        for entry in self.list(path)? {
            if markers.is_descriptor(entry.file_name()) {
                descriptors.push(entry.path);
            } else if markers.is_entry_point(entry.file_name()) {
                entry_points += 1;
            }
        }

        if descriptors.len() == 1 && entry_points == 1 {
            Ok(descriptors.pop())
        } else {
            Ok(None)
        }
    }

    /// Installable modules under `path`.
    ///
    /// `depth` is how many levels of non-module directories may be crossed:
    /// `0` only looks at the direct children of `path`.
    pub fn discover(&self, path: &Path, depth: usize) -> Result<ModuleRegistry> {
        self.discover_all([path], depth)
    }

    /// Discovers every root into one registry; duplicate names across roots
    /// follow the duplicate policy like duplicates within a root do.
    pub fn discover_all<I, P>(&self, roots: I, depth: usize) -> Result<ModuleRegistry>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let start = Instant::now();
        let mut registry = ModuleRegistry::new();
        for root in roots {
            let root = root.as_ref();
            debug!(root = %root.display(), depth, "Discovering modules");
            self.discover_into(root, depth, None, &mut registry)?;
        }

        debug!(
            modules = registry.len(),
            depth,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Module discovery completed"
        );
        Ok(registry)
    }

    /// With `wanted` set, modules with other names are passed over before
    /// their descriptor is read.
    fn discover_into(
        &self,
        path: &Path,
        depth: usize,
        wanted: Option<&[String]>,
        registry: &mut ModuleRegistry,
    ) -> Result<()> {
        if !self.fs.is_dir(path) {
            return Ok(());
        }

        for entry in self.list(path)? {
            if !entry.is_dir() {
                continue;
            }

            match self.is_module(entry.path())? {
                Some(_) if wanted.is_some_and(|w| !w.iter().any(|n| n == entry.file_name())) => {}
                Some(descriptor) => {
                    if let Some(module) = self.load(entry.file_name(), entry.path(), &descriptor)? {
                        self.register(registry, module)?;
                    }
                }
                None if depth > 0 => {
                    self.discover_into(entry.path(), depth - 1, wanted, registry)?
                }
                None => {}
            }
        }

        Ok(())
    }

    fn load(&self, name: &str, dir: &Path, descriptor: &Path) -> Result<Option<Module>> {
        let manifest = match ManifestReader::new(self.fs).read(descriptor) {
            Ok(manifest) => manifest,
            Err(err @ ScanError::MalformedDescriptor { .. })
                if self.options.on_malformed == MalformedPolicy::Skip =>
            {
                warn!(module = name, error = %err, "Skipping module with malformed descriptor");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        if !manifest.installable {
            debug!(module = name, "Skipping non-installable module");
            return Ok(None);
        }

        debug!(
            module = name,
            path = %dir.display(),
            application = manifest.application,
            auto_install = manifest.auto_install,
            depends = manifest.depends.len(),
            "Found module"
        );
        Ok(Some(Module::from_manifest(name, dir, manifest)))
    }

    fn register(&self, registry: &mut ModuleRegistry, module: Module) -> Result<()> {
        if let Some(existing) = registry.get(&module.name) {
            match self.options.on_duplicate {
                DuplicatePolicy::Error => {
                    return Err(ScanError::DuplicateModule {
                        name: module.name.clone(),
                        first: existing.path.clone(),
                        second: module.path.clone(),
                    });
                }
                DuplicatePolicy::LastWins => {
                    warn!(
                        module = %module.name,
                        kept = %module.path.display(),
                        replaced = %existing.path.display(),
                        "Duplicate module name, keeping the last one found"
                    );
                }
            }
        }
        registry.insert(module);
        Ok(())
    }

    /// Sorted names of the installable modules under `path`.
    pub fn get_modules(&self, path: &Path, depth: usize) -> Result<Vec<String>> {
        Ok(self
            .discover(path, depth)?
            .names()
            .map(str::to_string)
            .collect())
    }

    /// Versions of the modules named in `wanted` that exist under `path`.
    ///
    /// Descriptors of other modules are never read.
    pub fn discover_versions(
        &self,
        path: &Path,
        wanted: &[String],
        depth: usize,
    ) -> Result<BTreeMap<String, Option<String>>> {
        let mut registry = ModuleRegistry::new();
        self.discover_into(path, depth, Some(wanted), &mut registry)?;
        Ok(registry
            .into_iter()
            .filter(|m| wanted.contains(&m.name))
            .map(|m| (m.name, m.version))
            .collect())
    }

    /// Whether `path` directly contains at least one installable module.
    pub fn is_addons(&self, path: &Path) -> Result<bool> {
        Ok(!self.discover(path, 0)?.is_empty())
    }

    /// Directories that are collections of modules.
    ///
    /// `path` itself is returned when it directly holds modules; otherwise its
    /// subdirectories are searched in name order with `depth - 1`. A negative
    /// depth yields nothing.
    pub fn get_addons(&self, path: &Path, depth: i64) -> Result<Vec<PathBuf>> {
        if depth < 0 || !self.fs.is_dir(path) {
            return Ok(Vec::new());
        }

        if self.is_addons(path)? {
            debug!(path = %path.display(), "Found addons root");
            return Ok(vec![path.to_path_buf()]);
        }

        let mut roots = Vec::new();
        for entry in self.list(path)? {
            if entry.is_dir() {
                roots.extend(self.get_addons(entry.path(), depth - 1)?);
            }
        }
        Ok(roots)
    }

    fn list(&self, path: &Path) -> Result<Vec<crate::fs::DirEntry>> {
        self.fs
            .read_dir_sorted(path)
            .map_err(|e| ScanError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::MarkerSet;
    use crate::fs::MockFileSystem;

    fn root() -> PathBuf {
        PathBuf::from("/mock")
    }

    #[test]
    fn test_is_module_requires_descriptor_and_entry_point() {
        let fs = MockFileSystem::new();
        fs.add_module("sale", "{}");
        fs.add_file("no_init/__manifest__.py", "{}");
        fs.add_file("no_manifest/__init__.py", "");
        fs.add_file("legacy/__init__.py", "");
        fs.add_file("legacy/__openerp__.py", "{}");
        fs.add_module("two_descriptors", "{}");
        fs.add_file("two_descriptors/__terp__.py", "{}");
        fs.add_file("plain.py", "");

        let discoverer = ModuleDiscoverer::new(&fs);
        assert_eq!(
            discoverer.is_module(Path::new("/mock/sale")).unwrap(),
            Some(PathBuf::from("/mock/sale/__manifest__.py"))
        );
        assert_eq!(
            discoverer.is_module(Path::new("/mock/legacy")).unwrap(),
            Some(PathBuf::from("/mock/legacy/__openerp__.py"))
        );
        assert_eq!(discoverer.is_module(Path::new("/mock/no_init")).unwrap(), None);
        assert_eq!(discoverer.is_module(Path::new("/mock/no_manifest")).unwrap(), None);
        assert_eq!(
            discoverer.is_module(Path::new("/mock/two_descriptors")).unwrap(),
            None
        );
        assert_eq!(discoverer.is_module(Path::new("/mock/plain.py")).unwrap(), None);
        assert_eq!(discoverer.is_module(Path::new("/mock/missing")).unwrap(), None);
    }

    #[test]
    fn test_custom_markers() {
        let fs = MockFileSystem::new();
        fs.add_file("pkg/addon.toml", "{}");
        fs.add_file("pkg/lib.rs", "");

        let options = DiscoveryOptions {
            markers: MarkerSet::new(["addon.toml"], ["lib.rs"]),
            ..Default::default()
        };
        let discoverer = ModuleDiscoverer::with_options(&fs, options);
        assert_eq!(
            discoverer.is_module(Path::new("/mock/pkg")).unwrap(),
            Some(PathBuf::from("/mock/pkg/addon.toml"))
        );
    }

    #[test]
    fn test_discover_records_manifest_fields() {
        let fs = MockFileSystem::new();
        fs.add_module("base", "{'version': '1.0'}");
        fs.add_module(
            "sale",
            "{'depends': ['base'], 'application': True, 'auto_install': False}",
        );
        fs.add_module("old", "{'installable': False}");

        let registry = ModuleDiscoverer::new(&fs).discover(&root(), 0).unwrap();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["base", "sale"]);

        let sale = registry.get("sale").unwrap();
        assert!(sale.application);
        assert_eq!(sale.depends, vec!["base"]);
        assert_eq!(sale.path, PathBuf::from("/mock/sale"));
        assert_eq!(
            registry.get("base").unwrap().version.as_deref(),
            Some("1.0")
        );
    }

    #[test]
    fn test_discover_depth_bound() {
        let fs = MockFileSystem::new();
        fs.add_module("top", "{}");
        fs.add_module("group/nested", "{}");
        fs.add_module("a/b/deep", "{}");

        let discoverer = ModuleDiscoverer::new(&fs);
        let names = |depth| discoverer.get_modules(&root(), depth).unwrap();

        assert_eq!(names(0), vec!["top"]);
        assert_eq!(names(1), vec!["nested", "top"]);
        assert_eq!(names(2), vec!["deep", "nested", "top"]);
    }

    #[test]
    fn test_modules_are_not_searched_inside() {
        let fs = MockFileSystem::new();
        fs.add_module("sale", "{}");
        fs.add_module("sale/tests/fake", "{}");

        let names = ModuleDiscoverer::new(&fs).get_modules(&root(), 5).unwrap();
        assert_eq!(names, vec!["sale"]);
    }

    #[test]
    fn test_malformed_fail_fast() {
        let fs = MockFileSystem::new();
        fs.add_module("good", "{}");
        fs.add_module("broken", "{'depends': [}");

        let err = ModuleDiscoverer::new(&fs).discover(&root(), 0).unwrap_err();
        match err {
            ScanError::MalformedDescriptor { path, .. } => {
                assert_eq!(path, PathBuf::from("/mock/broken/__manifest__.py"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_skip() {
        let fs = MockFileSystem::new();
        fs.add_module("good", "{}");
        fs.add_module("broken", "{'depends': [}");

        let options = DiscoveryOptions {
            on_malformed: MalformedPolicy::Skip,
            ..Default::default()
        };
        let registry = ModuleDiscoverer::with_options(&fs, options)
            .discover(&root(), 0)
            .unwrap();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["good"]);
    }

    #[test]
    fn test_duplicate_last_wins() {
        let fs = MockFileSystem::new();
        fs.add_module("a_group/sale", "{'version': 'first'}");
        fs.add_module("b_group/sale", "{'version': 'second'}");

        let registry = ModuleDiscoverer::new(&fs).discover(&root(), 1).unwrap();
        let sale = registry.get("sale").unwrap();
        assert_eq!(sale.path, PathBuf::from("/mock/b_group/sale"));
        assert_eq!(sale.version.as_deref(), Some("second"));
    }

    #[test]
    fn test_duplicate_error() {
        let fs = MockFileSystem::new();
        fs.add_module("a_group/sale", "{}");
        fs.add_module("b_group/sale", "{}");

        let options = DiscoveryOptions {
            on_duplicate: DuplicatePolicy::Error,
            ..Default::default()
        };
        let err = ModuleDiscoverer::with_options(&fs, options)
            .discover(&root(), 1)
            .unwrap_err();
        match err {
            ScanError::DuplicateModule { name, first, second } => {
                assert_eq!(name, "sale");
                assert_eq!(first, PathBuf::from("/mock/a_group/sale"));
                assert_eq!(second, PathBuf::from("/mock/b_group/sale"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_discover_all_merges_roots() {
        let fs = MockFileSystem::new();
        fs.add_module("repo1/sale", "{}");
        fs.add_module("repo2/stock", "{}");

        let registry = ModuleDiscoverer::new(&fs)
            .discover_all(["/mock/repo1", "/mock/repo2"], 0)
            .unwrap();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["sale", "stock"]);
    }

    #[test]
    fn test_discover_missing_root_is_empty() {
        let fs = MockFileSystem::new();
        let registry = ModuleDiscoverer::new(&fs)
            .discover(Path::new("/mock/nowhere"), 3)
            .unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_discover_versions() {
        let fs = MockFileSystem::new();
        fs.add_module("sale", "{'version': '16.0.1.0.0'}");
        fs.add_module("stock", "{'version': '16.0.2.0.0'}");
        fs.add_module("crm", "{}");

        let versions = ModuleDiscoverer::new(&fs)
            .discover_versions(&root(), &["sale".to_string(), "crm".to_string()], 0)
            .unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions["sale"].as_deref(), Some("16.0.1.0.0"));
        assert_eq!(versions["crm"], None);
    }

    #[test]
    fn test_discover_versions_ignores_other_descriptors() {
        let fs = MockFileSystem::new();
        fs.add_module("sale", "{'version': '16.0.1.0.0'}");
        fs.add_module("unrelated", "{'depends': [}");
        fs.add_module("group/stock", "{'version': '16.0.3.0.0'}");
        fs.add_module("group/broken", "{'version': __import__('os')}");

        let discoverer = ModuleDiscoverer::new(&fs);
        let wanted = ["sale".to_string(), "stock".to_string()];

        let versions = discoverer.discover_versions(&root(), &wanted, 0).unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions["sale"].as_deref(), Some("16.0.1.0.0"));

        let versions = discoverer.discover_versions(&root(), &wanted, 1).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions["stock"].as_deref(), Some("16.0.3.0.0"));

        let err = discoverer
            .discover_versions(&root(), &["unrelated".to_string()], 0)
            .unwrap_err();
        assert!(matches!(err, ScanError::MalformedDescriptor { .. }));
    }

    #[test]
    fn test_get_addons_nested_groups() {
        let fs = MockFileSystem::new();
        fs.add_module("group1/module_a", "{}");
        fs.add_module("group2/module_b", "{}");
        fs.add_file("group2/README.md", "");
        fs.add_dir("empty");

        let discoverer = ModuleDiscoverer::new(&fs);
        assert_eq!(
            discoverer.get_addons(&root(), 1).unwrap(),
            vec![PathBuf::from("/mock/group1"), PathBuf::from("/mock/group2")]
        );
        assert!(discoverer.get_addons(&root(), 0).unwrap().is_empty());
        assert!(discoverer.get_addons(&root(), -1).unwrap().is_empty());
    }

    #[test]
    fn test_get_addons_root_holds_modules() {
        let fs = MockFileSystem::new();
        fs.add_module("sale", "{}");
        fs.add_module("extra/stock", "{}");

        let discoverer = ModuleDiscoverer::new(&fs);
        assert_eq!(discoverer.get_addons(&root(), 0).unwrap(), vec![root()]);
        assert!(discoverer.is_addons(&root()).unwrap());
        assert!(!discoverer.is_addons(Path::new("/mock/sale")).unwrap());
    }

    #[test]
    fn test_get_addons_missing_path() {
        let fs = MockFileSystem::new();
        let discoverer = ModuleDiscoverer::new(&fs);
        assert!(discoverer
            .get_addons(Path::new("/mock/missing"), 2)
            .unwrap()
            .is_empty());
    }
}
