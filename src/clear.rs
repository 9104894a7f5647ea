//! Bulk removal of names from the symbol tables.
//!
//! Each category operation takes the raw pattern words of the request. No
//! words means "everything in the category"; otherwise entries matching any
//! pattern are removed, or with `exclusive` the entries matching none.

use crate::{
    diagnostics::{AdvisoryKind, Diagnostic, Result, TabulaError, advise},
    environment::Binding,
    pattern::{PatternMode, PatternSet},
    runtime::Interpreter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Primary {
    All,
    Functions,
    Globals,
    Variables,
    Classes,
    Regexp,
}

impl Primary {
    fn from_option(word: &str) -> Option<Self> {
        match word {
            "-all" | "-a" => Some(Primary::All),
            "-functions" | "-f" => Some(Primary::Functions),
            "-global" | "-g" => Some(Primary::Globals),
            "-variables" | "-v" => Some(Primary::Variables),
            "-classes" | "-c" => Some(Primary::Classes),
            "-regexp" | "-r" => Some(Primary::Regexp),
            _ => None,
        }
    }
}

/// Selection over one category, shared by every category operation.
enum Selection {
    Everything,
    Matching(PatternSet),
    AllBut(PatternSet),
}

impl Selection {
    fn new<S: AsRef<str>>(patterns: &[S], exclusive: bool, mode: PatternMode) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Selection::Everything);
        }
        let set = PatternSet::compile(patterns, mode)?;
        Ok(if exclusive {
            Selection::AllBut(set)
        } else {
            Selection::Matching(set)
        })
    }

    fn selects(&self, name: &str) -> bool {
        match self {
            Selection::Everything => true,
            Selection::Matching(set) => set.matches_any(name),
            Selection::AllBut(set) => !set.matches_any(name),
        }
    }
}

impl Interpreter {
    /// `clear` command entry point. `args` are the words after `clear`.
    pub fn clear<S: AsRef<str>>(&mut self, args: &[S]) -> Result<()> {
        let words: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        if words.is_empty() {
            self.remove_all_variables();
            return Ok(());
        }

        let mut primary = None;
        let mut exclusive = false;
        let mut idx = 0;
        while let Some(word) = words.get(idx) {
            if matches!(*word, "-exclusive" | "-x") {
                exclusive = true;
            } else if let Some(option) = Primary::from_option(word) {
                if primary.is_some() {
                    return Err(TabulaError::from(
                        Diagnostic::usage("clear")
                            .with_note("only one of -all, -functions, -global, -variables, -classes, -regexp may be given"),
                    ));
                }
                primary = Some(option);
            } else {
                break;
            }
            idx += 1;
        }
        let patterns = &words[idx..];

        if primary.is_none() && !exclusive {
            return self.clear_by_keyword(patterns);
        }

        match primary {
            Some(Primary::All) => {
                if exclusive {
                    self.warn_exclusive_ignored();
                }
                if !patterns.is_empty() {
                    advise(
                        &mut self.advisories,
                        AdvisoryKind::ExtraArgumentsIgnored,
                        "clear: ignoring extra arguments after -all",
                    );
                }
                self.clear_all();
            }
            Some(Primary::Regexp) => {
                self.clear_variables(patterns, exclusive, true)?;
            }
            Some(Primary::Functions) => {
                self.clear_functions(patterns, exclusive)?;
            }
            Some(Primary::Globals) => {
                self.clear_globals(patterns, exclusive)?;
            }
            Some(Primary::Variables) => {
                self.clear_variables(patterns, exclusive, false)?;
            }
            Some(Primary::Classes) => {
                self.clear_classes();
            }
            None => {
                if patterns.is_empty() {
                    self.warn_exclusive_ignored();
                    self.clear_symbols(patterns, false)?;
                } else {
                    self.clear_symbols(patterns, true)?;
                }
            }
        }
        Ok(())
    }

    // Bare keywords only act as selectors while no local variable shadows them.
    fn clear_by_keyword(&mut self, words: &[&str]) -> Result<()> {
        let mut idx = 0;
        while let Some(&word) = words.get(idx) {
            idx += 1;
            let shadowed = self.scope().is_local_variable(word);
            match word {
                "all" if !shadowed => self.clear_all(),
                "functions" if !shadowed => {
                    self.clear_functions(&words[idx..], false)?;
                    return Ok(());
                }
                "global" if !shadowed => {
                    self.clear_globals(&words[idx..], false)?;
                    return Ok(());
                }
                "variables" if !shadowed => self.remove_all_variables(),
                "classes" if !shadowed => self.clear_classes(),
                pattern => {
                    self.clear_symbols(&[pattern], false)?;
                }
            }
        }
        Ok(())
    }

    fn warn_exclusive_ignored(&mut self) {
        advise(
            &mut self.advisories,
            AdvisoryKind::ExclusiveIgnored,
            "clear: ignoring --exclusive option",
        );
    }

    /// Removes unlocked functions. Returns the removed names.
    pub fn clear_functions<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
        exclusive: bool,
    ) -> Result<Vec<String>> {
        let selection = Selection::new(patterns, exclusive, PatternMode::Glob)?;
        Ok(self.remove_functions(&selection))
    }

    /// Removes global variables together with every scope's marker for them.
    pub fn clear_globals<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
        exclusive: bool,
    ) -> Result<Vec<String>> {
        let selection = Selection::new(patterns, exclusive, PatternMode::Glob)?;
        Ok(self.remove_globals(&selection))
    }

    /// Removes bindings from the current scope, globals markers included. The
    /// global values themselves stay in the global namespace.
    pub fn clear_variables<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
        exclusive: bool,
        regexp: bool,
    ) -> Result<Vec<String>> {
        let mode = if regexp {
            PatternMode::Regex
        } else {
            PatternMode::Glob
        };
        let selection = Selection::new(patterns, exclusive, mode)?;
        let removed = self
            .scope_mut()
            .remove_where(|name, _| selection.selects(name));
        log_removed("variables", &removed);
        Ok(removed)
    }

    /// The catch-all category used for plain names: current-scope variables
    /// only.
    pub fn clear_symbols<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
        exclusive: bool,
    ) -> Result<Vec<String>> {
        self.clear_variables(patterns, exclusive, false)
    }

    /// Removes current-scope variables holding object instances.
    pub fn clear_objects(&mut self) -> Vec<String> {
        let removed = self.scope_mut().remove_where(
            |_, binding| matches!(binding, Binding::Local(value) if value.is_object()),
        );
        log_removed("objects", &removed);
        removed
    }

    /// Current-scope variables, every global and every unlocked function.
    /// Built-ins are never removed.
    pub fn clear_all(&mut self) {
        self.remove_all_variables();
        self.remove_globals(&Selection::Everything);
        self.remove_functions(&Selection::Everything);
    }

    pub fn clear_classes(&mut self) {
        self.clear_objects();
        self.classes.clear_exemplars();
        self.clear_all();
    }

    fn remove_all_variables(&mut self) {
        let removed = self.scope_mut().clear();
        log_removed("variables", &removed);
    }

    fn remove_functions(&mut self, selection: &Selection) -> Vec<String> {
        let removed = self
            .functions
            .remove_where(|entry| selection.selects(&entry.name));
        log_removed("functions", &removed);
        removed
    }

    fn remove_globals(&mut self, selection: &Selection) -> Vec<String> {
        let mut removed = Vec::new();
        for name in self.globals.names() {
            if selection.selects(&name) {
                self.globals.remove(&name);
                removed.push(name);
            }
        }
        for scope in self.all_scopes_mut() {
            scope.remove_where(|name, binding| binding.is_global() && selection.selects(name));
        }
        log_removed("globals", &removed);
        removed
    }

    pub fn clear_function(&mut self, name: &str) -> bool {
        self.functions.remove(name)
    }

    pub fn clear_variable(&mut self, name: &str) -> bool {
        self.scope_mut().remove(name).is_some()
    }

    pub fn clear_symbol(&mut self, name: &str) -> bool {
        self.clear_variable(name)
    }
}

fn log_removed(category: &str, removed: &[String]) {
    if !removed.is_empty() {
        tracing::debug!(category, count = removed.len(), names = ?removed, "cleared");
    }
}
