//! Command handlers; each returns the process exit code.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::commands::{AddonsArgs, ChangedArgs, DepsArgs, VersionsArgs};
use super::output::OutputFormatter;
use crate::changes::{top_level_dirs, ChangeSource, GitDiffIndex, StaticChanges};
use crate::config::ScanConfig;
use crate::discovery::ModuleDiscoverer;
use crate::fs::RealFileSystem;
use crate::graph::DependencyGraph;
use crate::selection::{changed_modules, Filter, Selection, SelectionEngine};

pub fn handle_addons(args: &AddonsArgs, config: &ScanConfig) -> i32 {
    finish("addons", run_addons(args, config))
}

pub fn handle_deps(args: &DepsArgs, config: &ScanConfig) -> i32 {
    finish("deps", run_deps(args, config))
}

pub fn handle_changed(args: &ChangedArgs, config: &ScanConfig) -> i32 {
    finish("changed", run_changed(args, config))
}

pub fn handle_versions(args: &VersionsArgs, config: &ScanConfig) -> i32 {
    finish("versions", run_versions(args, config))
}

fn finish(command: &str, result: Result<String>) -> i32 {
    match result {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!(command, error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn run_addons(args: &AddonsArgs, config: &ScanConfig) -> Result<String> {
    let start = Instant::now();
    let fs = RealFileSystem::new();
    let discoverer = ModuleDiscoverer::with_options(&fs, config.discovery_options());
    let formatter = OutputFormatter::new(args.format.into());

    if args.list_modules {
        let depth = match args.depth {
            Some(depth) => usize::try_from(depth)
                .map_err(|_| anyhow!("--depth must not be negative when listing modules"))?,
            None => config.depth,
        };
        let registry = discoverer.discover_all(&args.paths, depth)?;
        let engine = SelectionEngine::with_localization(&registry, config.localization_matcher()?);
        let selected: Vec<String> = engine.select(&selection_from(args))?.into_iter().collect();
        info!(
            modules = registry.len(),
            selected = selected.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Module listing completed"
        );
        formatter.format_names(&selected)
    } else {
        let depth = args.depth.unwrap_or(config.addons_depth);
        let mut roots = Vec::new();
        for path in &args.paths {
            roots.extend(discoverer.get_addons(path, depth)?);
        }
        roots.retain(|root| !is_excluded(root, &args.exclude));
        info!(
            roots = roots.len(),
            depth,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Addon root search completed"
        );
        formatter.format_paths(&roots)
    }
}

fn selection_from(args: &AddonsArgs) -> Selection {
    let mut selection = Selection::all().exclude(args.exclude.iter().cloned());
    if args.only_applications {
        selection = selection.applications(Filter::Only);
    } else if args.exclude_applications {
        selection = selection.applications(Filter::Exclude);
    }
    if args.only_localization {
        selection = selection.localization(Filter::Only);
    } else if args.exclude_localization {
        selection = selection.localization(Filter::Exclude);
    }
    selection
}

/// Addon roots are excluded by full path or by directory name.
fn is_excluded(root: &Path, exclude: &[String]) -> bool {
    let full = root.display().to_string();
    let name = root.file_name().and_then(|n| n.to_str());
    exclude
        .iter()
        .any(|e| *e == full || Some(e.as_str()) == name)
}

fn run_deps(args: &DepsArgs, config: &ScanConfig) -> Result<String> {
    let fs = RealFileSystem::new();
    let discoverer = ModuleDiscoverer::with_options(&fs, config.discovery_options());
    let registry = discoverer.discover(&args.path, args.depth.unwrap_or(config.depth))?;

    if !registry.contains(&args.module) {
        warn!(module = %args.module, path = %args.path.display(), "Module not found");
    }

    let graph = DependencyGraph::new(&registry);
    let closure = if args.reverse {
        graph.dependents_closure(&args.module)?
    } else {
        graph.dependency_closure(&args.module)?
    };

    let names: Vec<String> = closure.into_iter().collect();
    info!(
        module = %args.module,
        reverse = args.reverse,
        closure = names.len(),
        "Dependency closure computed"
    );
    OutputFormatter::new(args.format.into()).format_names(&names)
}

fn run_changed(args: &ChangedArgs, config: &ScanConfig) -> Result<String> {
    let fs = RealFileSystem::new();
    let discoverer = ModuleDiscoverer::with_options(&fs, config.discovery_options());
    let registry = discoverer.discover(&args.path, config.depth)?;

    let source: Box<dyn ChangeSource> = if args.files.is_empty() {
        Box::new(GitDiffIndex::new(&args.path, &args.reference))
    } else {
        Box::new(StaticChanges::new(args.files.iter().cloned()))
    };
    let items = source.changed_items()?;
    let dirs: Vec<String> = top_level_dirs(&items).into_iter().collect();
    debug!(files = items.len(), dirs = dirs.len(), "Collected changes");

    let paths: Vec<PathBuf> = changed_modules(&registry, &dirs);
    info!(
        files = items.len(),
        modules = paths.len(),
        "Changed modules collected"
    );
    OutputFormatter::new(args.format.into()).format_paths(&paths)
}

fn run_versions(args: &VersionsArgs, config: &ScanConfig) -> Result<String> {
    let fs = RealFileSystem::new();
    let discoverer = ModuleDiscoverer::with_options(&fs, config.discovery_options());
    let versions = discoverer.discover_versions(
        &args.path,
        &args.modules,
        args.depth.unwrap_or(config.depth),
    )?;

    for missing in args.modules.iter().filter(|m| !versions.contains_key(*m)) {
        warn!(module = %missing, "Module not found");
    }
    info!(
        requested = args.modules.len(),
        found = versions.len(),
        "Version lookup completed"
    );

    OutputFormatter::new(args.format.into()).format_versions(&versions)
}
