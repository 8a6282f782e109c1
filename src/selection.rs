//! Higher-level module selections built from graph queries

use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::registry::ModuleRegistry;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_LOCALIZATION_PREFIX: &str = "l10n_";

/// Decides whether a module name designates a localization module.
pub struct LocalizationMatcher {
    description: String,
    predicate: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

impl LocalizationMatcher {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            description: format!("prefix {:?}", prefix),
            predicate: Box::new(move |name| name.starts_with(&prefix)),
        }
    }

    pub fn regex(pattern: Regex) -> Self {
        Self {
            description: format!("pattern {:?}", pattern.as_str()),
            predicate: Box::new(move |name| pattern.is_match(name)),
        }
    }

    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            description: "custom predicate".to_string(),
            predicate: Box::new(predicate),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        (self.predicate)(name)
    }
}

impl Default for LocalizationMatcher {
    fn default() -> Self {
        Self::prefix(DEFAULT_LOCALIZATION_PREFIX)
    }
}

impl fmt::Debug for LocalizationMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalizationMatcher")
            .field(&self.description)
            .finish()
    }
}

/// How a base selection takes part in the final result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Only,
    Exclude,
}

/// Caller-facing selection modes.
///
/// The result starts from the union of every `Only` set (or from all
/// registered modules when there is none), then drops every `Exclude` set, then
/// drops the names in `exclude`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub applications: Option<Filter>,
    pub localization: Option<Filter>,
    pub exclude: Vec<String>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn applications(mut self, filter: Filter) -> Self {
        self.applications = Some(filter);
        self
    }

    pub fn localization(mut self, filter: Filter) -> Self {
        self.localization = Some(filter);
        self
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }
}

pub struct SelectionEngine<'a> {
    graph: DependencyGraph<'a>,
    localization: LocalizationMatcher,
}

impl<'a> SelectionEngine<'a> {
    pub fn new(registry: &'a ModuleRegistry) -> Self {
        Self::with_localization(registry, LocalizationMatcher::default())
    }

    pub fn with_localization(registry: &'a ModuleRegistry, localization: LocalizationMatcher) -> Self {
        Self {
            graph: DependencyGraph::new(registry),
            localization,
        }
    }

    pub fn graph(&self) -> &DependencyGraph<'a> {
        &self.graph
    }

    pub fn is_localization(&self, name: &str) -> bool {
        self.localization.matches(name)
    }

    /// Dependency closures of every non-localization application, grown with
    /// auto-install modules.
    pub fn applications_with_dependencies(&self) -> Result<BTreeSet<String>> {
        let mut selected = BTreeSet::new();
        for module in self.graph.registry().modules() {
            if module.application && !self.is_localization(&module.name) {
                selected.extend(self.graph.dependency_closure(&module.name)?);
            }
        }
        let selected = self.graph.auto_install_fixpoint(selected);
        debug!(count = selected.len(), "Selected applications with dependencies");
        Ok(selected)
    }

    /// Dependents closures of every localization module.
    pub fn localizations_with_dependents(&self) -> Result<BTreeSet<String>> {
        let mut selected = BTreeSet::new();
        for name in self.graph.registry().names() {
            if self.is_localization(name) {
                selected.extend(self.graph.dependents_closure(name)?);
            }
        }
        debug!(count = selected.len(), "Selected localizations with dependents");
        Ok(selected)
    }

    pub fn select(&self, selection: &Selection) -> Result<BTreeSet<String>> {
        let applications = match selection.applications {
            Some(_) => Some(self.applications_with_dependencies()?),
            None => None,
        };
        let localizations = match selection.localization {
            Some(_) => Some(self.localizations_with_dependents()?),
            None => None,
        };

        let parts = [
            (selection.applications, applications),
            (selection.localization, localizations),
        ];

        let mut result: BTreeSet<String> = if parts
            .iter()
            .any(|(filter, _)| *filter == Some(Filter::Only))
        {
            parts
                .iter()
                .filter(|(filter, _)| *filter == Some(Filter::Only))
                .filter_map(|(_, set)| set.as_ref())
                .flatten()
                .cloned()
                .collect()
        } else {
            self.graph.registry().names().map(str::to_string).collect()
        };

        for (filter, set) in &parts {
            if let (Some(Filter::Exclude), Some(set)) = (filter, set) {
                result.retain(|name| !set.contains(name));
            }
        }

        result.retain(|name| !selection.exclude.contains(name));
        Ok(result)
    }

    /// Paths of registered modules whose name is the basename of one of
    /// `changed_top_level`, in name order.
    pub fn changed_modules<S: AsRef<str>>(&self, changed_top_level: &[S]) -> Vec<PathBuf> {
        changed_modules(self.graph.registry(), changed_top_level)
    }
}

pub fn changed_modules<S: AsRef<str>>(registry: &ModuleRegistry, changed_top_level: &[S]) -> Vec<PathBuf> {
    let changed: BTreeSet<&str> = changed_top_level
        .iter()
        .filter_map(|p| Path::new(p.as_ref()).file_name())
        .filter_map(|n| n.to_str())
        .collect();

    changed
        .into_iter()
        .filter_map(|name| registry.path_of(name))
        .map(Path::to_path_buf)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Module;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn registry() -> ModuleRegistry {
        [
            Module::new("base"),
            Module::new("sale").with_depends(["base"]).application(),
            Module::new("stock").with_depends(["base"]),
            Module::new("sale_stock")
                .with_depends(["sale", "stock"])
                .auto_install(),
            Module::new("crm").with_depends(["base"]).application(),
            Module::new("l10n_us").with_depends(["base"]).application(),
            Module::new("l10n_us_reports").with_depends(["l10n_us"]),
            Module::new("tools"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_applications_skip_localizations() {
        let registry = registry();
        let engine = SelectionEngine::new(&registry);

        assert_eq!(
            engine.applications_with_dependencies().unwrap(),
            set(&["base", "crm", "sale"])
        );
    }

    #[test]
    fn test_localizations_with_dependents() {
        let registry = registry();
        let engine = SelectionEngine::new(&registry);

        assert_eq!(
            engine.localizations_with_dependents().unwrap(),
            set(&["l10n_us", "l10n_us_reports"])
        );
    }

    #[test]
    fn test_custom_localization_matcher() {
        let registry: ModuleRegistry = [
            Module::new("country_fr").application(),
            Module::new("l10n_fr").application(),
        ]
        .into_iter()
        .collect();
        let engine = SelectionEngine::with_localization(
            &registry,
            LocalizationMatcher::regex(Regex::new("^country_").unwrap()),
        );

        assert!(engine.is_localization("country_fr"));
        assert!(!engine.is_localization("l10n_fr"));
        assert_eq!(
            engine.applications_with_dependencies().unwrap(),
            set(&["l10n_fr"])
        );

        let engine = SelectionEngine::with_localization(
            &registry,
            LocalizationMatcher::from_fn(|name| name.ends_with("_fr")),
        );
        assert!(engine.applications_with_dependencies().unwrap().is_empty());
    }

    #[test]
    fn test_select_all_and_exclude_list() {
        let registry = registry();
        let engine = SelectionEngine::new(&registry);

        let all = engine.select(&Selection::all()).unwrap();
        assert_eq!(all.len(), registry.len());

        let trimmed = engine
            .select(&Selection::all().exclude(["tools", "missing"]))
            .unwrap();
        assert!(!trimmed.contains("tools"));
        assert_eq!(trimmed.len(), registry.len() - 1);
    }

    #[test]
    fn test_select_only_and_exclude_modes() {
        let registry = registry();
        let engine = SelectionEngine::new(&registry);

        assert_eq!(
            engine
                .select(&Selection::all().applications(Filter::Only))
                .unwrap(),
            set(&["base", "crm", "sale"])
        );
        assert_eq!(
            engine
                .select(&Selection::all().applications(Filter::Exclude))
                .unwrap(),
            set(&["l10n_us", "l10n_us_reports", "sale_stock", "stock", "tools"])
        );
        assert_eq!(
            engine
                .select(&Selection::all().localization(Filter::Exclude))
                .unwrap(),
            set(&["base", "crm", "sale", "sale_stock", "stock", "tools"])
        );
        assert_eq!(
            engine
                .select(
                    &Selection::all()
                        .applications(Filter::Only)
                        .localization(Filter::Only)
                )
                .unwrap(),
            set(&["base", "crm", "l10n_us", "l10n_us_reports", "sale"])
        );
        assert_eq!(
            engine
                .select(
                    &Selection::all()
                        .applications(Filter::Exclude)
                        .localization(Filter::Exclude)
                )
                .unwrap(),
            set(&["sale_stock", "stock", "tools"])
        );
    }

    #[test]
    fn test_exclude_list_applies_last() {
        let registry = registry();
        let engine = SelectionEngine::new(&registry);

        let selected = engine
            .select(&Selection::all().applications(Filter::Only).exclude(["base"]))
            .unwrap();
        assert_eq!(selected, set(&["crm", "sale"]));
    }

    #[test]
    fn test_changed_modules() {
        let registry: ModuleRegistry = [
            Module::new("sale").with_path("/repo/sale"),
            Module::new("stock").with_path("/repo/stock"),
        ]
        .into_iter()
        .collect();
        let engine = SelectionEngine::new(&registry);

        let changed = engine.changed_modules(&["stock", "docs", "sale", "stock"]);
        assert_eq!(
            changed,
            vec![PathBuf::from("/repo/sale"), PathBuf::from("/repo/stock")]
        );
        assert!(engine.changed_modules::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_matcher_debug() {
        let matcher = LocalizationMatcher::default();
        assert_eq!(
            format!("{:?}", matcher),
            r#"LocalizationMatcher("prefix \"l10n_\"")"#
        );
    }
}
