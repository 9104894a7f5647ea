//! Name classification across every namespace the interpreter knows about.
//!
//! The search is an ordered list of probe stages. A filter selects which
//! stages run; the first stage that matches decides the classification.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{
    collaborators::{FileKind, FileSystem, SearchPath},
    diagnostics::{DiagnosticKind, TabulaError, fail},
    environment::{GlobalNamespace, Scope},
    functions::{BuiltinTable, FunctionTable},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Any,
    Var,
    File,
    Dir,
    Builtin,
    /// Accepted but never matches.
    Class,
}

impl Filter {
    pub fn as_str(self) -> &'static str {
        match self {
            Filter::Any => "any",
            Filter::Var => "var",
            Filter::File => "file",
            Filter::Dir => "dir",
            Filter::Builtin => "builtin",
            Filter::Class => "class",
        }
    }
}

impl FromStr for Filter {
    type Err = TabulaError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "any" => Ok(Filter::Any),
            "var" => Ok(Filter::Var),
            "file" => Ok(Filter::File),
            "dir" => Ok(Filter::Dir),
            "builtin" => Ok(Filter::Builtin),
            "class" => Ok(Filter::Class),
            other => fail(
                DiagnosticKind::InvalidArgument,
                format!(r#"exist: unrecognized type argument "{other}""#),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Absent,
    Variable,
    ScriptFile,
    CompiledFile,
    Builtin,
    Directory,
    CommandLineFunction,
}

impl Classification {
    /// Numeric code reported by `exist`. These values are a fixed external
    /// contract.
    pub const fn code(self) -> i32 {
        match self {
            Classification::Absent => 0,
            Classification::Variable => 1,
            Classification::ScriptFile => 2,
            Classification::CompiledFile => 3,
            Classification::Builtin => 5,
            Classification::Directory => 7,
            Classification::CommandLineFunction => 103,
        }
    }

    pub fn is_absent(self) -> bool {
        self == Classification::Absent
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Absent => "absent",
            Classification::Variable => "variable",
            Classification::ScriptFile => "file",
            Classification::CompiledFile => "compiled file",
            Classification::Builtin => "built-in function",
            Classification::Directory => "directory",
            Classification::CommandLineFunction => "command-line function",
        };
        write!(f, "{label}")
    }
}

/// Borrowed view of everything a classification consults.
pub struct Resolver<'a> {
    pub scope: &'a Scope,
    pub globals: &'a GlobalNamespace,
    pub functions: &'a FunctionTable,
    pub builtins: &'a BuiltinTable,
    pub search_path: &'a dyn SearchPath,
    pub file_system: &'a dyn FileSystem,
}

pub struct Stage {
    pub name: &'static str,
    pub filters: &'static [Filter],
    pub probe: fn(&Resolver<'_>, &str, Filter) -> Option<Classification>,
}

pub const STAGES: &[Stage] = &[
    Stage {
        name: "variable",
        filters: &[Filter::Any, Filter::Var],
        probe: probe_variable,
    },
    Stage {
        name: "command-line function",
        filters: &[Filter::Any],
        probe: probe_cmdline_function,
    },
    Stage {
        name: "path",
        filters: &[Filter::Any, Filter::File, Filter::Dir],
        probe: probe_path,
    },
    Stage {
        name: "builtin",
        filters: &[Filter::Any, Filter::Builtin],
        probe: probe_builtin,
    },
];

impl Resolver<'_> {
    pub fn classify(&self, name: &str, filter: Filter) -> Classification {
        if is_keyword(name) {
            return Classification::Absent;
        }
        for stage in STAGES.iter().filter(|stage| stage.filters.contains(&filter)) {
            if let Some(found) = (stage.probe)(self, name, filter) {
                tracing::debug!(name, stage = stage.name, %found, "name resolved");
                return found;
            }
        }
        Classification::Absent
    }
}

pub fn probe_variable(resolver: &Resolver<'_>, name: &str, _filter: Filter) -> Option<Classification> {
    resolver
        .scope
        .visible_value(name, resolver.globals)
        .map(|_| Classification::Variable)
}

pub fn probe_cmdline_function(
    resolver: &Resolver<'_>,
    name: &str,
    _filter: Filter,
) -> Option<Classification> {
    resolver
        .functions
        .find_cmdline_function(name)
        .map(|_| Classification::CommandLineFunction)
}

pub fn probe_path(resolver: &Resolver<'_>, name: &str, filter: Filter) -> Option<Classification> {
    if filter != Filter::Dir {
        let found = resolver
            .search_path
            .autoload_lookup(name)
            .or_else(|| resolver.search_path.find_on_search_path(name));
        if let Some(file) = found {
            return Some(file_classification(&file));
        }
    }

    let candidate = resolver
        .search_path
        .find_file(name)
        .unwrap_or_else(|| PathBuf::from(name));
    match resolver.file_system.probe(&candidate)? {
        FileKind::Directory => Some(Classification::Directory),
        FileKind::File if filter != Filter::Dir => Some(file_classification(&candidate)),
        FileKind::File => None,
    }
}

pub fn probe_builtin(resolver: &Resolver<'_>, name: &str, _filter: Filter) -> Option<Classification> {
    resolver
        .builtins
        .contains(name)
        .then_some(Classification::Builtin)
}

fn file_classification(path: &Path) -> Classification {
    let text = path.to_string_lossy();
    if text.len() > 4 && (text.ends_with(".oct") || text.ends_with(".mex")) {
        Classification::CompiledFile
    } else {
        Classification::ScriptFile
    }
}

const KEYWORDS: &[&str] = &[
    "__FILE__",
    "__LINE__",
    "break",
    "case",
    "catch",
    "classdef",
    "continue",
    "do",
    "else",
    "elseif",
    "end",
    "end_try_catch",
    "end_unwind_protect",
    "endclassdef",
    "endenumeration",
    "endevents",
    "endfor",
    "endfunction",
    "endif",
    "endmethods",
    "endparfor",
    "endproperties",
    "endswitch",
    "endwhile",
    "enumeration",
    "events",
    "for",
    "function",
    "global",
    "if",
    "methods",
    "otherwise",
    "parfor",
    "persistent",
    "properties",
    "return",
    "switch",
    "try",
    "until",
    "unwind_protect",
    "unwind_protect_cleanup",
    "while",
];

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Splits a dotted reference such as `s.field.sub` into its parts. A single
/// trailing dot does not produce an empty final part.
pub fn split_struct_elts(text: &str) -> Vec<String> {
    let mut parts: Vec<String> = text.split('.').map(str::to_string).collect();
    if parts.len() > 1 && text.ends_with('.') {
        parts.pop();
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collaborators::{LoadPath, MemoryFileSystem},
        functions::{FunctionEntry, FunctionKind},
        value::Value,
    };

    struct Fixture {
        scope: Scope,
        globals: GlobalNamespace,
        functions: FunctionTable,
        builtins: BuiltinTable,
        path: LoadPath,
        fs: MemoryFileSystem,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                scope: Scope::new("base"),
                globals: GlobalNamespace::new(),
                functions: FunctionTable::new(),
                builtins: BuiltinTable::with_defaults(),
                path: LoadPath::new(),
                fs: MemoryFileSystem::new(),
            }
        }

        fn classify(&self, name: &str, filter: Filter) -> Classification {
            Resolver {
                scope: &self.scope,
                globals: &self.globals,
                functions: &self.functions,
                builtins: &self.builtins,
                search_path: &self.path,
                file_system: &self.fs,
            }
            .classify(name, filter)
        }
    }

    #[test]
    fn unknown_filter_is_rejected() {
        let err = "foobar".parse::<Filter>().unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"InvalidArgument: exist: unrecognized type argument "foobar""#
        );
    }

    #[test]
    fn codes_are_stable() {
        let codes: Vec<i32> = [
            Classification::Variable,
            Classification::ScriptFile,
            Classification::CompiledFile,
            Classification::Builtin,
            Classification::Directory,
            Classification::CommandLineFunction,
            Classification::Absent,
        ]
        .iter()
        .map(|c| c.code())
        .collect();
        assert_eq!(codes, vec![1, 2, 3, 5, 7, 103, 0]);
    }

    #[test]
    fn keywords_are_absent_even_when_bound() {
        let mut fx = Fixture::new();
        fx.scope.assign("end", Value::int(1));
        fx.builtins.insert("end");
        assert_eq!(fx.classify("end", Filter::Any), Classification::Absent);
    }

    #[test]
    fn variable_beats_every_other_namespace() {
        let mut fx = Fixture::new();
        fx.scope.assign("sin", Value::int(3));
        fx.functions
            .define(FunctionEntry::new("sin", FunctionKind::CommandLine, None));
        fx.path.add_function("sin", "sin.m");
        assert_eq!(fx.classify("sin", Filter::Any), Classification::Variable);
        assert_eq!(fx.classify("sin", Filter::Builtin), Classification::Builtin);
    }

    #[test]
    fn global_markers_resolve_through_the_namespace() {
        let mut fx = Fixture::new();
        fx.scope.mark_global("g");
        fx.globals.declare("g");
        assert_eq!(fx.classify("g", Filter::Any), Classification::Absent);
        fx.globals.set("g", Value::int(1));
        assert_eq!(fx.classify("g", Filter::Any), Classification::Variable);
        assert_eq!(fx.classify("g", Filter::Var), Classification::Variable);
    }

    #[test]
    fn undefined_locals_do_not_count() {
        let mut fx = Fixture::new();
        fx.scope.assign("x", Value::undefined());
        assert_eq!(fx.classify("x", Filter::Var), Classification::Absent);
    }

    #[test]
    fn cmdline_function_precedes_path() {
        let mut fx = Fixture::new();
        fx.functions
            .define(FunctionEntry::new("f", FunctionKind::CommandLine, None));
        fx.path.add_function("f", "f.m");
        assert_eq!(fx.classify("f", Filter::Any), Classification::CommandLineFunction);
        assert_eq!(fx.classify("f", Filter::File), Classification::ScriptFile);
    }

    #[test]
    fn compiled_extensions() {
        let mut fx = Fixture::new();
        fx.path.add_function("fast", "/lib/fast.oct");
        fx.path.add_autoload("gateway", "gateway.mex");
        fx.path.add_function("slow", "slow.m");
        assert_eq!(fx.classify("fast", Filter::Any), Classification::CompiledFile);
        assert_eq!(fx.classify("gateway", Filter::Any), Classification::CompiledFile);
        assert_eq!(fx.classify("slow", Filter::Any), Classification::ScriptFile);
    }

    #[test]
    fn autoload_wins_over_search_path() {
        let mut fx = Fixture::new();
        fx.path.add_function("g", "g.m");
        fx.path.add_autoload("g", "g.oct");
        assert_eq!(fx.classify("g", Filter::Any), Classification::CompiledFile);
    }

    #[test]
    fn file_system_probe_finds_directories_and_files() {
        let mut fx = Fixture::new();
        fx.fs.add_dir("data");
        fx.fs.add_file("notes.txt");
        assert_eq!(fx.classify("data", Filter::Any), Classification::Directory);
        assert_eq!(fx.classify("data", Filter::Dir), Classification::Directory);
        assert_eq!(fx.classify("data", Filter::File), Classification::Directory);
        assert_eq!(fx.classify("notes.txt", Filter::Any), Classification::ScriptFile);
        assert_eq!(fx.classify("notes.txt", Filter::Dir), Classification::Absent);
    }

    #[test]
    fn dir_filter_ignores_search_path_hits() {
        let mut fx = Fixture::new();
        fx.path.add_function("f", "f.m");
        assert_eq!(fx.classify("f", Filter::Dir), Classification::Absent);
    }

    #[test]
    fn find_file_redirects_the_probe() {
        let mut fx = Fixture::new();
        fx.path.add_file("startup", "/etc/octave/startup");
        fx.fs.add_dir("/etc/octave/startup");
        assert_eq!(fx.classify("startup", Filter::Any), Classification::Directory);
    }

    #[test]
    fn narrowed_filters_skip_other_stages() {
        let mut fx = Fixture::new();
        fx.scope.assign("v", Value::int(1));
        assert_eq!(fx.classify("v", Filter::Builtin), Classification::Absent);
        assert_eq!(fx.classify("sin", Filter::Var), Classification::Absent);
        assert_eq!(fx.classify("sin", Filter::File), Classification::Absent);
        assert_eq!(fx.classify("sin", Filter::Class), Classification::Absent);
    }

    #[test]
    fn struct_elements_split_on_dots() {
        assert_eq!(split_struct_elts("s.a.b"), vec!["s", "a", "b"]);
        assert_eq!(split_struct_elts("s.a."), vec!["s", "a"]);
        assert_eq!(split_struct_elts("s..b"), vec!["s", "", "b"]);
        assert_eq!(split_struct_elts("plain"), vec!["plain"]);
    }
}
