#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub fn get_addonscan_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.join("addonscan")
}

pub fn fixture_repo() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/addons-repo")
}

/// Writes `dir/__init__.py` and `dir/__manifest__.py` under `root`.
pub fn write_module(root: &Path, dir: &str, manifest: &str) -> PathBuf {
    write_module_with(root, dir, "__manifest__.py", manifest)
}

pub fn write_module_with(root: &Path, dir: &str, descriptor: &str, manifest: &str) -> PathBuf {
    let module = root.join(dir);
    fs::create_dir_all(&module).unwrap();
    fs::write(module.join("__init__.py"), "").unwrap();
    fs::write(module.join(descriptor), manifest).unwrap();
    module
}
