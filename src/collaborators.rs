//! Boundary traits for the services the engine consults but does not own:
//! function search path, file system probe and class registry.

use std::{
    cell::RefCell,
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

pub trait SearchPath {
    /// File defining `name` somewhere on the function search path.
    fn find_on_search_path(&self, name: &str) -> Option<PathBuf>;

    /// File registered for `name` through autoload.
    fn autoload_lookup(&self, name: &str) -> Option<PathBuf>;

    /// Locates `name` as a plain file relative to the search path.
    fn find_file(&self, _name: &str) -> Option<PathBuf> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

pub trait FileSystem {
    fn probe(&self, path: &Path) -> Option<FileKind>;
}

pub trait ClassRegistry {
    fn clear_exemplars(&mut self);
}

/// In-memory search path: function name to defining file.
#[derive(Debug, Default, Clone)]
pub struct LoadPath {
    functions: HashMap<String, PathBuf>,
    autoloads: HashMap<String, PathBuf>,
    files: HashMap<String, PathBuf>,
}

impl LoadPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, name: impl Into<String>, file: impl Into<PathBuf>) {
        self.functions.insert(name.into(), file.into());
    }

    pub fn add_autoload(&mut self, name: impl Into<String>, file: impl Into<PathBuf>) {
        self.autoloads.insert(name.into(), file.into());
    }

    pub fn add_file(&mut self, name: impl Into<String>, file: impl Into<PathBuf>) {
        self.files.insert(name.into(), file.into());
    }
}

impl SearchPath for LoadPath {
    fn find_on_search_path(&self, name: &str) -> Option<PathBuf> {
        self.functions.get(name).cloned()
    }

    fn autoload_lookup(&self, name: &str) -> Option<PathBuf> {
        self.autoloads.get(name).cloned()
    }

    fn find_file(&self, name: &str) -> Option<PathBuf> {
        self.files.get(name).cloned()
    }
}

/// Probes the host file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostFileSystem;

impl FileSystem for HostFileSystem {
    fn probe(&self, path: &Path) -> Option<FileKind> {
        let metadata = fs::metadata(path).ok()?;
        if metadata.is_dir() {
            Some(FileKind::Directory)
        } else {
            Some(FileKind::File)
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryFileSystem {
    entries: HashMap<PathBuf, FileKind>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>) {
        self.entries.insert(path.into(), FileKind::File);
    }

    pub fn add_dir(&mut self, path: impl Into<PathBuf>) {
        self.entries.insert(path.into(), FileKind::Directory);
    }
}

impl FileSystem for MemoryFileSystem {
    fn probe(&self, path: &Path) -> Option<FileKind> {
        self.entries.get(path).copied()
    }
}

/// Class exemplars keyed by class name.
#[derive(Debug, Default, Clone)]
pub struct ExemplarMap {
    exemplars: HashMap<String, Vec<String>>,
}

impl ExemplarMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class_name: impl Into<String>, fields: Vec<String>) {
        self.exemplars.insert(class_name.into(), fields);
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.exemplars.contains_key(class_name)
    }

    pub fn len(&self) -> usize {
        self.exemplars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exemplars.is_empty()
    }
}

impl ClassRegistry for ExemplarMap {
    fn clear_exemplars(&mut self) {
        self.exemplars.clear();
    }
}

// Shared handles let a host keep editing a collaborator after handing it to
// an interpreter.
impl<T: SearchPath> SearchPath for Rc<RefCell<T>> {
    fn find_on_search_path(&self, name: &str) -> Option<PathBuf> {
        self.borrow().find_on_search_path(name)
    }

    fn autoload_lookup(&self, name: &str) -> Option<PathBuf> {
        self.borrow().autoload_lookup(name)
    }

    fn find_file(&self, name: &str) -> Option<PathBuf> {
        self.borrow().find_file(name)
    }
}

impl<T: FileSystem> FileSystem for Rc<RefCell<T>> {
    fn probe(&self, path: &Path) -> Option<FileKind> {
        self.borrow().probe(path)
    }
}

impl<T: ClassRegistry> ClassRegistry for Rc<RefCell<T>> {
    fn clear_exemplars(&mut self) {
        self.borrow_mut().clear_exemplars();
    }
}
