use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Defined in a file found on the search path.
    User,
    /// Defined interactively, not backed by any file.
    CommandLine,
    Autoloaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub name: String,
    pub kind: FunctionKind,
    pub file: Option<PathBuf>,
    pub locked: bool,
}

impl FunctionEntry {
    pub fn new(name: impl Into<String>, kind: FunctionKind, file: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind,
            file,
            locked: false,
        }
    }
}

/// Process-wide user function namespace. Entries survive scope teardown and
/// can only be removed while unlocked.
#[derive(Debug, Default, Clone)]
pub struct FunctionTable {
    entries: IndexMap<String, FunctionEntry>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or redefines a function. Redefinition keeps the lock flag.
    pub fn define(&mut self, entry: FunctionEntry) {
        let locked = self
            .entries
            .get(&entry.name)
            .is_some_and(|existing| existing.locked);
        self.entries
            .insert(entry.name.clone(), FunctionEntry { locked, ..entry });
    }

    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn find_cmdline_function(&self, name: &str) -> Option<&FunctionEntry> {
        self.entries
            .get(name)
            .filter(|entry| entry.kind == FunctionKind::CommandLine)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_locked(&mut self, name: &str, locked: bool) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) => {
                entry.locked = locked;
                true
            }
            None => false,
        }
    }

    pub fn is_locked(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|entry| entry.locked)
    }

    /// Removes `name` unless it is locked. Returns whether it was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.entries.get(name) {
            Some(entry) if !entry.locked => {
                self.entries.shift_remove(name);
                true
            }
            _ => false,
        }
    }

    /// Removes every unlocked entry selected by `remove`.
    pub fn remove_where<F>(&mut self, mut remove: F) -> Vec<String>
    where
        F: FnMut(&FunctionEntry) -> bool,
    {
        let mut removed = Vec::new();
        self.entries.retain(|name, entry| {
            if !entry.locked && remove(entry) {
                removed.push(name.clone());
                false
            } else {
                true
            }
        });
        removed
    }
}

/// Names of functions compiled into the interpreter. Never cleared.
#[derive(Debug, Default, Clone)]
pub struct BuiltinTable {
    names: IndexSet<String>,
}

impl BuiltinTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        for name in DEFAULT_BUILTINS {
            table.insert(name);
        }
        table
    }

    pub fn insert(&mut self, name: &str) -> bool {
        self.names.insert(name.to_string())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

const DEFAULT_BUILTINS: &[&str] = &[
    "abs", "clear", "cos", "disp", "error", "exist", "exp", "feval", "isglobal", "length",
    "log", "mislocked", "mlock", "munlock", "numel", "printf", "size", "sin", "sqrt", "tan",
    "warning", "who",
];
