use std::{
    ops::{Deref, DerefMut},
    path::PathBuf,
};

use crate::{
    collaborators::{ClassRegistry, ExemplarMap, FileSystem, HostFileSystem, LoadPath, SearchPath},
    diagnostics::{Advisory, AdvisoryKind, DiagnosticKind, Result, advise, fail},
    environment::{GlobalNamespace, Scope},
    functions::{BuiltinTable, FunctionEntry, FunctionKind, FunctionTable},
    internal::InternalRegistry,
    resolve::{self, Classification, Filter, Resolver},
    unwind::{CallStack, Frame},
    value::Value,
};

/// Startup configuration for an [`Interpreter`].
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Seed for the name generator; `None` seeds from the host.
    pub seed: Option<u64>,
    /// Built-in names added on top of the defaults.
    pub builtins: Vec<String>,
    /// Function name to defining file, as found on the search path.
    pub search_path: Vec<(String, PathBuf)>,
    pub autoloads: Vec<(String, PathBuf)>,
}

impl ExecutionContext {
    pub fn load_path(&self) -> LoadPath {
        let mut path = LoadPath::new();
        for (name, file) in &self.search_path {
            path.add_function(name.clone(), file.clone());
        }
        for (name, file) in &self.autoloads {
            path.add_autoload(name.clone(), file.clone());
        }
        path
    }
}

/// Where a callable name was found by [`Interpreter::find_function`].
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionLookup {
    Defined(FunctionEntry),
    OnPath(PathBuf),
    Builtin,
}

/// All symbol state of one interpreter instance.
///
/// Not thread safe; one instance belongs to one thread of control.
pub struct Interpreter {
    base: Scope,
    pub(crate) stack: CallStack,
    pub(crate) globals: GlobalNamespace,
    pub(crate) functions: FunctionTable,
    builtins: BuiltinTable,
    internals: InternalRegistry,
    search_path: Box<dyn SearchPath>,
    file_system: Box<dyn FileSystem>,
    pub(crate) classes: Box<dyn ClassRegistry>,
    pub(crate) rng: fastrand::Rng,
    pub(crate) advisories: Vec<Advisory>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_context(ExecutionContext::default())
    }

    pub fn with_context(context: ExecutionContext) -> Self {
        let mut builtins = BuiltinTable::with_defaults();
        for name in &context.builtins {
            builtins.insert(name);
        }
        let rng = match context.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            base: Scope::new("base"),
            stack: CallStack::new(),
            globals: GlobalNamespace::new(),
            functions: FunctionTable::new(),
            builtins,
            internals: InternalRegistry::with_defaults(),
            search_path: Box::new(context.load_path()),
            file_system: Box::new(HostFileSystem),
            classes: Box::new(ExemplarMap::new()),
            rng,
            advisories: Vec::new(),
        }
    }

    pub fn with_search_path(mut self, search_path: impl SearchPath + 'static) -> Self {
        self.search_path = Box::new(search_path);
        self
    }

    pub fn with_file_system(mut self, file_system: impl FileSystem + 'static) -> Self {
        self.file_system = Box::new(file_system);
        self
    }

    pub fn with_class_registry(mut self, classes: impl ClassRegistry + 'static) -> Self {
        self.classes = Box::new(classes);
        self
    }

    pub fn take_advisories(&mut self) -> Vec<Advisory> {
        std::mem::take(&mut self.advisories)
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    // Scopes and invocations

    pub fn scope(&self) -> &Scope {
        self.stack.current().map(Frame::scope).unwrap_or(&self.base)
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        match self.stack.current_mut() {
            Some(frame) => frame.scope_mut(),
            None => &mut self.base,
        }
    }

    pub(crate) fn all_scopes_mut(&mut self) -> impl Iterator<Item = &mut Scope> {
        std::iter::once(&mut self.base).chain(self.stack.frames_mut().map(Frame::scope_mut))
    }

    pub fn call_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Name of the function whose invocation is currently active.
    pub fn caller(&self) -> Option<&str> {
        self.stack.caller()
    }

    /// Starts an invocation of `function`. The returned guard gives access to
    /// the interpreter; dropping it tears the frame down and applies every
    /// pending restoration, whatever path leads out of the caller.
    pub fn enter(&mut self, function: &str) -> Invocation<'_> {
        self.push_frame(function);
        let depth = self.stack.depth();
        Invocation {
            interpreter: self,
            depth,
        }
    }

    /// Runs `body` inside a fresh invocation of `function`.
    pub fn invoke<T, F>(&mut self, function: &str, body: F) -> Result<T>
    where
        F: FnOnce(&mut Interpreter) -> Result<T>,
    {
        let mut frame = self.enter(function);
        body(&mut *frame)
    }

    pub fn push_frame(&mut self, function: &str) {
        self.stack.push(function);
        tracing::debug!(function, depth = self.stack.depth(), "invocation entered");
    }

    /// Tears down the innermost frame. Returns false at top level.
    pub fn pop_frame(&mut self) -> bool {
        let Some(frame) = self.stack.pop() else {
            return false;
        };
        tracing::debug!(
            function = frame.function(),
            restores = frame.pending_restores(),
            "invocation left"
        );
        for record in frame.into_restores() {
            self.internals.restore(record);
        }
        true
    }

    fn unwind_to(&mut self, depth: usize) {
        while self.stack.depth() > depth {
            self.pop_frame();
        }
    }

    // Variables

    pub fn assign(&mut self, name: &str, value: Value) -> Result<()> {
        if resolve::is_keyword(name) {
            return fail(
                DiagnosticKind::InvalidArgument,
                format!("invalid use of keyword '{name}' as a variable"),
            );
        }
        if !self.scope_mut().assign(name, value.clone()) {
            self.globals.set(name, value);
        }
        Ok(())
    }

    /// Value visible under `name` in the current scope, following global
    /// markers.
    pub fn varval(&self, name: &str) -> Option<Value> {
        self.lookup_in(self.scope(), name)
    }

    fn lookup_in(&self, scope: &Scope, name: &str) -> Option<Value> {
        scope.visible_value(name, &self.globals).cloned()
    }

    pub fn declare_global(&mut self, name: &str) -> Result<()> {
        if resolve::is_keyword(name) {
            return fail(
                DiagnosticKind::InvalidArgument,
                format!("global: invalid use of keyword '{name}'"),
            );
        }
        if self.scope().is_local_variable(name) {
            return fail(
                DiagnosticKind::Runtime,
                format!("global: '{name}' is defined in the current scope"),
            );
        }
        self.globals.declare(name);
        self.scope_mut().mark_global(name);
        Ok(())
    }

    pub fn isglobal(&self, name: &str) -> bool {
        self.scope().is_global(name)
    }

    pub fn global_value(&self, name: &str, silent: bool) -> Result<Option<Value>> {
        let value = self
            .globals
            .get(name)
            .filter(|value| value.is_materialized())
            .cloned();
        if value.is_none() && !silent {
            return fail(
                DiagnosticKind::Runtime,
                format!("get_global_value: undefined symbol '{name}'"),
            );
        }
        Ok(value)
    }

    pub fn set_global_value(&mut self, name: &str, value: Value) {
        self.globals.set(name, value);
    }

    pub fn top_level_value(&self, name: &str, silent: bool) -> Result<Option<Value>> {
        let value = self.lookup_in(&self.base, name);
        if value.is_none() && !silent {
            return fail(
                DiagnosticKind::Runtime,
                format!("get_top_level_value: undefined symbol '{name}'"),
            );
        }
        Ok(value)
    }

    pub fn set_top_level_value(&mut self, name: &str, value: Value) {
        if !self.base.assign(name, value.clone()) {
            self.globals.set(name, value);
        }
    }

    /// The local value of `name` when it is a callable handle.
    pub fn lookup_function_handle(&self, name: &str) -> Option<Value> {
        self.varval(name).filter(Value::is_callable)
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.scope().names()
    }

    pub fn global_variable_names(&self) -> Vec<String> {
        self.globals.names()
    }

    // Functions

    pub fn define_function(&mut self, name: &str, kind: FunctionKind, file: Option<PathBuf>) {
        tracing::debug!(name, ?kind, "function defined");
        self.functions.define(FunctionEntry::new(name, kind, file));
    }

    pub fn define_builtin(&mut self, name: &str) {
        self.builtins.insert(name);
    }

    pub fn function(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name)
    }

    pub fn function_names(&self) -> Vec<String> {
        self.functions.names()
    }

    pub fn find_function(&self, name: &str) -> Option<FunctionLookup> {
        if let Some(entry) = self.functions.get(name) {
            return Some(FunctionLookup::Defined(entry.clone()));
        }
        if let Some(file) = self
            .search_path
            .autoload_lookup(name)
            .or_else(|| self.search_path.find_on_search_path(name))
        {
            return Some(FunctionLookup::OnPath(file));
        }
        self.builtins
            .contains(name)
            .then_some(FunctionLookup::Builtin)
    }

    /// Like [`find_function`](Self::find_function) but a miss is an error
    /// reported on behalf of `caller`.
    pub fn is_valid_function(&self, name: &str, caller: &str) -> Result<FunctionLookup> {
        match (!name.is_empty()).then(|| self.find_function(name)).flatten() {
            Some(found) => Ok(found),
            None => fail(
                DiagnosticKind::InvalidArgument,
                format!("{caller}: the symbol '{name}' is not valid as a function"),
            ),
        }
    }

    // Resolution

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver {
            scope: self.scope(),
            globals: &self.globals,
            functions: &self.functions,
            builtins: &self.builtins,
            search_path: self.search_path.as_ref(),
            file_system: self.file_system.as_ref(),
        }
    }

    /// Classifies `name` without producing advisories.
    pub fn resolve(&self, name: &str, filter: Filter) -> Classification {
        self.resolver().classify(name, filter)
    }

    pub fn classify(&mut self, name: &str, filter: Filter) -> Classification {
        if filter == Filter::Class {
            advise(
                &mut self.advisories,
                AdvisoryKind::ClassLookupUnimplemented,
                "exist: checking for classes is not implemented",
            );
        }
        self.resolve(name, filter)
    }

    /// `exist` entry point: parses the filter word and returns the legacy code.
    pub fn exist(&mut self, name: &str, filter: Option<&str>) -> Result<i32> {
        let filter = match filter {
            Some(text) => text.parse::<Filter>()?,
            None => Filter::Any,
        };
        Ok(self.classify(name, filter).code())
    }

    // Internal variables

    pub fn internals(&self) -> &InternalRegistry {
        &self.internals
    }

    pub fn internals_mut(&mut self) -> &mut InternalRegistry {
        &mut self.internals
    }

    /// Query or set an internal variable; see
    /// [`InternalRegistry::access`].
    pub fn internal_variable(
        &mut self,
        name: &str,
        args: &[Value],
        nargout: usize,
    ) -> Result<Option<Value>> {
        self.internals
            .access(name, args, nargout, &mut self.stack, &mut self.advisories)
    }
}

/// Guard for one active invocation. Derefs to the interpreter.
pub struct Invocation<'a> {
    interpreter: &'a mut Interpreter,
    depth: usize,
}

impl Invocation<'_> {
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Deref for Invocation<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Interpreter {
        self.interpreter
    }
}

impl DerefMut for Invocation<'_> {
    fn deref_mut(&mut self) -> &mut Interpreter {
        self.interpreter
    }
}

impl Drop for Invocation<'_> {
    fn drop(&mut self) {
        self.interpreter.unwind_to(self.depth - 1);
    }
}
