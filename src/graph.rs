//! Dependency graph queries over a [`ModuleRegistry`]
//!
//! Closures are computed with an explicit stack. A name reached again while it
//! is still on the current path is a cycle and fails the query with
//! [`ScanError::CyclicDependency`]; a name reached again after it was fully
//! explored (diamonds) is simply skipped.
//!
//! Names referenced in `depends` but missing from the registry are kept in the
//! results and treated as leaves.

use crate::error::{Result, ScanError};
use crate::registry::ModuleRegistry;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

pub struct DependencyGraph<'a> {
    registry: &'a ModuleRegistry,
    dependents: BTreeMap<&'a str, Vec<&'a str>>,
}

impl<'a> DependencyGraph<'a> {
    pub fn new(registry: &'a ModuleRegistry) -> Self {
        let mut dependents: BTreeMap<&'a str, Vec<&'a str>> = BTreeMap::new();
        for module in registry.modules() {
            for dep in &module.depends {
                let entry = dependents.entry(dep.as_str()).or_default();
                if !entry.contains(&module.name.as_str()) {
                    entry.push(module.name.as_str());
                }
            }
        }

        Self {
            registry,
            dependents,
        }
    }

    pub fn registry(&self) -> &'a ModuleRegistry {
        self.registry
    }

    /// Direct dependencies of `name`; empty for unknown names.
    pub fn direct_dependencies(&self, name: &str) -> Vec<&'a str> {
        self.registry
            .get(name)
            .map(|m| m.depends.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Registered modules listing `name` in their `depends`, in name order.
    pub fn direct_dependents(&self, name: &str) -> Vec<&'a str> {
        self.dependents.get(name).cloned().unwrap_or_default()
    }

    /// `name` plus everything it transitively depends on.
    pub fn dependency_closure(&self, name: &str) -> Result<BTreeSet<String>> {
        walk(name, |n| self.direct_dependencies(n))
    }

    /// `name` plus every module that transitively depends on it.
    pub fn dependents_closure(&self, name: &str) -> Result<BTreeSet<String>> {
        walk(name, |n| self.direct_dependents(n))
    }

    /// Grows `seed` with auto-install modules whose dependencies are all
    /// present, until a full pass adds nothing.
    pub fn auto_install_fixpoint<I, S>(&self, seed: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selected: BTreeSet<String> = seed.into_iter().map(Into::into).collect();

        loop {
            let mut added = false;
            for module in self.registry.modules() {
                if module.auto_install
                    && !selected.contains(&module.name)
                    && module.depends.iter().all(|d| selected.contains(d))
                {
                    debug!(module = %module.name, "Auto-install dependencies satisfied");
                    selected.insert(module.name.clone());
                    added = true;
                }
            }
            if !added {
                return selected;
            }
        }
    }
}

/// Depth-first reachability from `start` over `neighbors`, start included.
fn walk<'n, F>(start: &str, neighbors: F) -> Result<BTreeSet<String>>
where
    F: Fn(&str) -> Vec<&'n str>,
{
    let mut explored: BTreeSet<String> = BTreeSet::new();
    let mut path: Vec<String> = vec![start.to_string()];
    let mut on_path: HashSet<String> = HashSet::from([start.to_string()]);
    let mut stack: Vec<(Vec<&'n str>, usize)> = vec![(neighbors(start), 0)];

    loop {
        let next = match stack.last_mut() {
            None => break,
            Some((children, index)) => {
                let child = children.get(*index).copied();
                *index += 1;
                child
            }
        };

        match next {
            Some(child) => {
                if on_path.contains(child) {
                    let from = path.iter().position(|n| n == child).unwrap_or(0);
                    let mut cycle: Vec<String> = path[from..].to_vec();
                    cycle.push(child.to_string());
                    return Err(ScanError::CyclicDependency { cycle });
                }
                if explored.contains(child) {
                    continue;
                }
                on_path.insert(child.to_string());
                path.push(child.to_string());
                stack.push((neighbors(child), 0));
            }
            None => {
                stack.pop();
                if let Some(done) = path.pop() {
                    on_path.remove(&done);
                    explored.insert(done);
                }
            }
        }
    }

    Ok(explored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Module;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn diamond() -> ModuleRegistry {
        [
            Module::new("base"),
            Module::new("mail").with_depends(["base"]),
            Module::new("product").with_depends(["base"]),
            Module::new("sale").with_depends(["mail", "product"]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_dependency_closure_diamond() {
        let registry = diamond();
        let graph = DependencyGraph::new(&registry);

        assert_eq!(
            graph.dependency_closure("sale").unwrap(),
            set(&["base", "mail", "product", "sale"])
        );
        assert_eq!(graph.dependency_closure("base").unwrap(), set(&["base"]));
    }

    #[test]
    fn test_dependents_closure_diamond() {
        let registry = diamond();
        let graph = DependencyGraph::new(&registry);

        assert_eq!(
            graph.dependents_closure("base").unwrap(),
            set(&["base", "mail", "product", "sale"])
        );
        assert_eq!(
            graph.dependents_closure("mail").unwrap(),
            set(&["mail", "sale"])
        );
        assert_eq!(graph.dependents_closure("sale").unwrap(), set(&["sale"]));
    }

    #[test]
    fn test_unknown_and_dangling_names() {
        let registry: ModuleRegistry = [Module::new("sale").with_depends(["ghost"])]
            .into_iter()
            .collect();
        let graph = DependencyGraph::new(&registry);

        assert_eq!(graph.dependency_closure("nobody").unwrap(), set(&["nobody"]));
        assert_eq!(
            graph.dependency_closure("sale").unwrap(),
            set(&["ghost", "sale"])
        );
        assert_eq!(
            graph.dependents_closure("ghost").unwrap(),
            set(&["ghost", "sale"])
        );
    }

    #[test]
    fn test_cycle_is_reported() {
        let registry: ModuleRegistry = [
            Module::new("a").with_depends(["b"]),
            Module::new("b").with_depends(["c"]),
            Module::new("c").with_depends(["a"]),
        ]
        .into_iter()
        .collect();
        let graph = DependencyGraph::new(&registry);

        match graph.dependency_closure("a") {
            Err(ScanError::CyclicDependency { cycle }) => {
                assert_eq!(cycle, vec!["a", "b", "c", "a"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
        assert!(matches!(
            graph.dependents_closure("b"),
            Err(ScanError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let registry: ModuleRegistry = [Module::new("loop").with_depends(["loop"])]
            .into_iter()
            .collect();
        let graph = DependencyGraph::new(&registry);

        match graph.dependency_closure("loop") {
            Err(ScanError::CyclicDependency { cycle }) => assert_eq!(cycle, vec!["loop", "loop"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_outside_query_is_ignored() {
        let registry: ModuleRegistry = [
            Module::new("base"),
            Module::new("x").with_depends(["y"]),
            Module::new("y").with_depends(["x"]),
        ]
        .into_iter()
        .collect();
        let graph = DependencyGraph::new(&registry);

        assert_eq!(graph.dependency_closure("base").unwrap(), set(&["base"]));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let registry: ModuleRegistry = (0..10_000)
            .map(|i| {
                let module = Module::new(format!("m{i}"));
                if i == 0 {
                    module
                } else {
                    module.with_depends([format!("m{}", i - 1)])
                }
            })
            .collect();
        let graph = DependencyGraph::new(&registry);

        assert_eq!(graph.dependency_closure("m9999").unwrap().len(), 10_000);
        assert_eq!(graph.dependents_closure("m0").unwrap().len(), 10_000);
    }

    #[test]
    fn test_auto_install_chains() {
        let registry: ModuleRegistry = [
            Module::new("sale"),
            Module::new("stock"),
            Module::new("sale_stock")
                .with_depends(["sale", "stock"])
                .auto_install(),
            Module::new("sale_stock_report")
                .with_depends(["sale_stock"])
                .auto_install(),
            Module::new("purchase_stock")
                .with_depends(["purchase", "stock"])
                .auto_install(),
        ]
        .into_iter()
        .collect();
        let graph = DependencyGraph::new(&registry);

        assert_eq!(
            graph.auto_install_fixpoint(["sale", "stock"]),
            set(&["sale", "sale_stock", "sale_stock_report", "stock"])
        );
        assert_eq!(graph.auto_install_fixpoint(["sale"]), set(&["sale"]));
    }

    #[test]
    fn test_auto_install_without_depends_always_joins() {
        let registry: ModuleRegistry = [Module::new("web_glue").auto_install()]
            .into_iter()
            .collect();
        let graph = DependencyGraph::new(&registry);

        assert_eq!(
            graph.auto_install_fixpoint(Vec::<String>::new()),
            set(&["web_glue"])
        );
    }

    #[test]
    fn test_direct_dependents_are_deduplicated() {
        let registry: ModuleRegistry = [Module::new("sale").with_depends(["base", "base"])]
            .into_iter()
            .collect();
        let graph = DependencyGraph::new(&registry);

        assert_eq!(graph.direct_dependents("base"), vec!["sale"]);
        assert_eq!(graph.direct_dependencies("sale"), vec!["base", "base"]);
    }
}
