//! Typed interpreter configuration cells.
//!
//! Every cell is read and written through [`apply_setting`], which handles
//! the query, the trailing `"local"` marker and arity checks once; the kind
//! of the cell only decides how the single value argument is coerced.

use indexmap::IndexMap;

use crate::{
    diagnostics::{Advisory, AdvisoryKind, Diagnostic, DiagnosticKind, Result, TabulaError, advise, fail},
    unwind::{CallStack, OverrideRecord},
    value::{Value, ValueError},
};

#[derive(Debug, Clone, PartialEq)]
pub enum InternalValue {
    Bool(bool),
    /// `'\0'` stands for "no character".
    Char(char),
    Int(i64),
    Real(f64),
    String(String),
    /// Index into the cell's choice list.
    Choice(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellKind {
    Bool,
    Char,
    Int { min: i64, max: i64 },
    Real { min: f64, max: f64 },
    String { empty_ok: bool },
    /// String value restricted to `choices`, stored as the string.
    ChoiceString { choices: Vec<String> },
    /// String value restricted to `choices`, stored as the index.
    ChoiceIndex { choices: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct InternalVariable {
    name: String,
    kind: CellKind,
    value: InternalValue,
}

impl InternalVariable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &CellKind {
        &self.kind
    }

    pub fn raw(&self) -> &InternalValue {
        &self.value
    }

    /// The value as the interpreter sees it; choice cells report the choice
    /// string rather than its index.
    pub fn current(&self) -> Value {
        match (&self.value, &self.kind) {
            (InternalValue::Bool(b), _) => Value::bool(*b),
            (InternalValue::Char('\0'), _) => Value::string(""),
            (InternalValue::Char(ch), _) => Value::string(ch.to_string()),
            (InternalValue::Int(n), _) => Value::int(*n),
            (InternalValue::Real(x), _) => Value::real(*x),
            (InternalValue::String(s), _) => Value::string(s.clone()),
            (InternalValue::Choice(idx), CellKind::ChoiceIndex { choices }) => {
                Value::string(choices.get(*idx).cloned().unwrap_or_default())
            }
            (InternalValue::Choice(idx), _) => Value::int(*idx as i64),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct InternalRegistry {
    cells: IndexMap<String, InternalVariable>,
}

impl InternalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults = [
            (
                "missing_function_hook",
                CellKind::String { empty_ok: true },
                InternalValue::String("__unimplemented__".into()),
            ),
            (
                "missing_component_hook",
                CellKind::String { empty_ok: true },
                InternalValue::String(String::new()),
            ),
            ("confirm_recursive_rmdir", CellKind::Bool, InternalValue::Bool(true)),
            ("beep_on_error", CellKind::Bool, InternalValue::Bool(false)),
            ("string_fill_char", CellKind::Char, InternalValue::Char(' ')),
            (
                "output_precision",
                CellKind::Int { min: 0, max: 16 },
                InternalValue::Int(5),
            ),
            (
                "max_recursion_depth",
                CellKind::Int {
                    min: 0,
                    max: i64::from(i32::MAX),
                },
                InternalValue::Int(256),
            ),
            (
                "print_struct_array_tolerance",
                CellKind::Real { min: 0.0, max: 1.0 },
                InternalValue::Real(0.5),
            ),
            (
                "save_default_format",
                CellKind::ChoiceString {
                    choices: ["text", "binary", "hdf5", "mat-binary", "mat7-binary"]
                        .map(String::from)
                        .to_vec(),
                },
                InternalValue::String("text".into()),
            ),
            (
                "terminal_color_mode",
                CellKind::ChoiceIndex {
                    choices: ["auto", "always", "never"].map(String::from).to_vec(),
                },
                InternalValue::Choice(0),
            ),
        ];
        for (name, kind, value) in defaults {
            registry.cells.insert(
                name.to_string(),
                InternalVariable {
                    name: name.to_string(),
                    kind,
                    value,
                },
            );
        }
        registry
    }

    /// Adds a cell. The initial value must satisfy the cell's own rules.
    pub fn register(&mut self, name: &str, kind: CellKind, initial: InternalValue) -> Result<()> {
        if !accepts(&kind, &initial) {
            return fail(
                DiagnosticKind::InvalidArgument,
                format!("{name}: initial value {initial:?} does not fit {kind:?}"),
            );
        }
        self.cells.insert(
            name.to_string(),
            InternalVariable {
                name: name.to_string(),
                kind,
                value: initial,
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cells.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&InternalVariable> {
        self.cells.get(name)
    }

    pub fn value(&self, name: &str) -> Option<Value> {
        self.cells.get(name).map(InternalVariable::current)
    }

    pub fn bool_value(&self, name: &str) -> Option<bool> {
        match self.cells.get(name)?.value {
            InternalValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn int_value(&self, name: &str) -> Option<i64> {
        match self.cells.get(name)?.value {
            InternalValue::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn string_value(&self, name: &str) -> Option<String> {
        let cell = self.cells.get(name)?;
        cell.current().as_string().ok().map(str::to_string)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Writes a captured prior value back without validation.
    pub fn restore(&mut self, record: OverrideRecord) {
        match self.cells.get_mut(&record.cell) {
            Some(cell) => cell.value = record.prior,
            None => tracing::debug!(cell = %record.cell, "restore target no longer registered"),
        }
    }

    /// Query or set `name`. `args` holds the new value, optionally followed
    /// by the literal `"local"`.
    pub fn access(
        &mut self,
        name: &str,
        args: &[Value],
        nargout: usize,
        stack: &mut CallStack,
        advisories: &mut Vec<Advisory>,
    ) -> Result<Option<Value>> {
        let Some(cell) = self.cells.get_mut(name) else {
            return fail(
                DiagnosticKind::InvalidArgument,
                format!("'{name}' is not an internal variable"),
            );
        };
        let kind = cell.kind.clone();
        let setting = Setting {
            args,
            nargout,
            stack,
            advisories,
        };
        match kind {
            CellKind::Bool => apply_setting(cell, setting, |value| coerce_bool(name, value)),
            CellKind::Char => apply_setting(cell, setting, |value| coerce_char(name, value)),
            CellKind::Int { min, max } => {
                apply_setting(cell, setting, |value| coerce_int(name, value, min, max))
            }
            CellKind::Real { min, max } => {
                apply_setting(cell, setting, |value| coerce_real(name, value, min, max))
            }
            CellKind::String { empty_ok } => {
                apply_setting(cell, setting, |value| coerce_string(name, value, empty_ok))
            }
            CellKind::ChoiceString { choices } => apply_setting(cell, setting, |value| {
                let idx = coerce_choice(name, value, &choices)?;
                Ok(InternalValue::String(choices[idx].clone()))
            }),
            CellKind::ChoiceIndex { choices } => apply_setting(cell, setting, |value| {
                coerce_choice(name, value, &choices).map(InternalValue::Choice)
            }),
        }
    }
}

/// Everything a set-or-query call needs besides the cell itself.
pub struct Setting<'a> {
    pub args: &'a [Value],
    pub nargout: usize,
    pub stack: &'a mut CallStack,
    pub advisories: &'a mut Vec<Advisory>,
}

pub fn apply_setting<C>(
    cell: &mut InternalVariable,
    setting: Setting<'_>,
    coerce: C,
) -> Result<Option<Value>>
where
    C: FnOnce(&Value) -> Result<InternalValue>,
{
    let Setting {
        args,
        nargout,
        stack,
        advisories,
    } = setting;
    let mut nargin = args.len();

    let previous = (nargout > 0 || nargin == 0).then(|| cell.current());

    if wants_local_change(&cell.name, args, &mut nargin)? {
        let record = OverrideRecord {
            cell: cell.name.clone(),
            prior: cell.value.clone(),
        };
        if !stack.protect(record) {
            advise(
                advisories,
                AdvisoryKind::LocalOutsideFunction,
                r#""local" has no effect outside a function"#,
            );
        }
    }

    if nargin > 1 {
        return Err(TabulaError::from(Diagnostic::usage(&cell.name)));
    }

    if nargin == 1 {
        cell.value = coerce(&args[0])?;
        tracing::debug!(cell = %cell.name, value = ?cell.value, "internal variable set");
    }

    Ok(previous)
}

fn wants_local_change(name: &str, args: &[Value], nargin: &mut usize) -> Result<bool> {
    if *nargin != 2 {
        return Ok(false);
    }
    match args[1].as_string() {
        Ok("local") => {
            *nargin = 1;
            Ok(true)
        }
        _ => fail(
            DiagnosticKind::InvalidArgument,
            format!(r#"{name}: second argument must be "local""#),
        ),
    }
}

fn coerce_bool(name: &str, value: &Value) -> Result<InternalValue> {
    match value.as_bool() {
        Ok(b) => Ok(InternalValue::Bool(b)),
        Err(_) => fail(
            DiagnosticKind::Type,
            format!("{name}: argument must be a logical value"),
        ),
    }
}

fn coerce_char(name: &str, value: &Value) -> Result<InternalValue> {
    let message = format!("{name}: argument must be a single character");
    let Ok(text) = value.as_string() else {
        return fail(DiagnosticKind::Type, message);
    };
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok(InternalValue::Char('\0')),
        (Some(ch), None) => Ok(InternalValue::Char(ch)),
        _ => fail(DiagnosticKind::InvalidArgument, message),
    }
}

fn coerce_int(name: &str, value: &Value, min: i64, max: i64) -> Result<InternalValue> {
    match value.as_int_in_range(min..=max) {
        Ok(n) => Ok(InternalValue::Int(n)),
        Err(ValueError::Mismatch { .. }) => fail(
            DiagnosticKind::Type,
            format!("{name}: argument must be an integer value"),
        ),
        Err(ValueError::BelowMin { .. }) => fail(
            DiagnosticKind::Range,
            format!("{name}: arg must be greater than {min}"),
        ),
        Err(ValueError::AboveMax { .. }) => fail(
            DiagnosticKind::Range,
            format!("{name}: arg must be less than or equal to {max}"),
        ),
    }
}

fn coerce_real(name: &str, value: &Value, min: f64, max: f64) -> Result<InternalValue> {
    match value.as_real_in_range(min, max) {
        Ok(x) => Ok(InternalValue::Real(x)),
        Err(ValueError::Mismatch { .. }) => fail(
            DiagnosticKind::Type,
            format!("{name}: argument must be a scalar value"),
        ),
        Err(ValueError::BelowMin { .. }) => fail(
            DiagnosticKind::Range,
            format!("{name}: argument must be greater than {min}"),
        ),
        Err(ValueError::AboveMax { .. }) => fail(
            DiagnosticKind::Range,
            format!("{name}: argument must be less than or equal to {max}"),
        ),
    }
}

fn coerce_string(name: &str, value: &Value, empty_ok: bool) -> Result<InternalValue> {
    let Ok(text) = value.as_string() else {
        return fail(
            DiagnosticKind::Type,
            format!("{name}: first argument must be a string"),
        );
    };
    if !empty_ok && text.is_empty() {
        return fail(
            DiagnosticKind::InvalidArgument,
            format!("{name}: value must not be empty"),
        );
    }
    Ok(InternalValue::String(text.to_string()))
}

fn coerce_choice(name: &str, value: &Value, choices: &[String]) -> Result<usize> {
    let Ok(text) = value.as_string() else {
        return fail(
            DiagnosticKind::Type,
            format!("{name}: first argument must be a string"),
        );
    };
    match choices.iter().position(|choice| choice == text) {
        Some(idx) => Ok(idx),
        None => fail(
            DiagnosticKind::InvalidArgument,
            format!(r#"{name}: value not allowed ("{text}")"#),
        ),
    }
}

fn accepts(kind: &CellKind, value: &InternalValue) -> bool {
    match (kind, value) {
        (CellKind::Bool, InternalValue::Bool(_)) => true,
        (CellKind::Char, InternalValue::Char(_)) => true,
        (CellKind::Int { min, max }, InternalValue::Int(n)) => (*min..=*max).contains(n),
        (CellKind::Real { min, max }, InternalValue::Real(x)) => *x >= *min && *x <= *max,
        (CellKind::String { empty_ok }, InternalValue::String(s)) => *empty_ok || !s.is_empty(),
        (CellKind::ChoiceString { choices }, InternalValue::String(s)) => choices.contains(s),
        (CellKind::ChoiceIndex { choices }, InternalValue::Choice(idx)) => *idx < choices.len(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Harness {
        registry: InternalRegistry,
        stack: CallStack,
        advisories: Vec<Advisory>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                registry: InternalRegistry::with_defaults(),
                stack: CallStack::new(),
                advisories: Vec::new(),
            }
        }

        fn access(&mut self, name: &str, args: &[Value], nargout: usize) -> Result<Option<Value>> {
            self.registry
                .access(name, args, nargout, &mut self.stack, &mut self.advisories)
        }

        fn message(&mut self, name: &str, args: &[Value]) -> String {
            self.access(name, args, 0).unwrap_err().to_string()
        }
    }

    #[test]
    fn query_without_arguments_returns_value() {
        let mut h = Harness::new();
        let value = h.access("output_precision", &[], 0).expect("query");
        assert_eq!(value, Some(Value::int(5)));
    }

    #[test]
    fn set_returns_prior_only_when_requested() {
        let mut h = Harness::new();
        let silent = h.access("output_precision", &[Value::int(7)], 0).expect("set");
        assert_eq!(silent, None);
        let prior = h.access("output_precision", &[Value::int(9)], 1).expect("set");
        assert_eq!(prior, Some(Value::int(7)));
        assert_eq!(h.registry.int_value("output_precision"), Some(9));
    }

    #[test]
    fn integer_bounds_are_inclusive() {
        let mut h = Harness::new();
        h.access("output_precision", &[Value::int(16)], 0).expect("upper bound");
        h.access("output_precision", &[Value::int(0)], 0).expect("lower bound");
        assert_eq!(
            h.message("output_precision", &[Value::int(17)]),
            "Range: output_precision: arg must be less than or equal to 16"
        );
        assert_eq!(
            h.message("output_precision", &[Value::int(-1)]),
            "Range: output_precision: arg must be greater than 0"
        );
        assert_eq!(h.registry.int_value("output_precision"), Some(0));
    }

    #[test]
    fn real_bounds_are_checked() {
        let mut h = Harness::new();
        h.access("print_struct_array_tolerance", &[Value::real(0.25)], 0)
            .expect("in range");
        let err = h.access("print_struct_array_tolerance", &[Value::real(1.5)], 0);
        assert_eq!(err.unwrap_err().kind(), Some(DiagnosticKind::Range));
        assert_eq!(
            h.registry.value("print_struct_array_tolerance"),
            Some(Value::real(0.25))
        );
        let err = h.access("print_struct_array_tolerance", &[Value::real(f64::NAN)], 0);
        assert_eq!(err.unwrap_err().kind(), Some(DiagnosticKind::Type));
        assert_eq!(
            h.registry.value("print_struct_array_tolerance"),
            Some(Value::real(0.25))
        );
    }

    #[test]
    fn char_cells_accept_one_or_zero_characters() {
        let mut h = Harness::new();
        h.access("string_fill_char", &[Value::string("x")], 0).expect("one char");
        assert_eq!(h.registry.string_value("string_fill_char"), Some("x".into()));
        h.access("string_fill_char", &[Value::string("")], 0).expect("empty");
        assert_eq!(
            h.registry.get("string_fill_char").map(|cell| cell.raw().clone()),
            Some(InternalValue::Char('\0'))
        );
        assert_eq!(
            h.message("string_fill_char", &[Value::string("xy")]),
            "InvalidArgument: string_fill_char: argument must be a single character"
        );
    }

    #[test]
    fn choice_cells_report_strings() {
        let mut h = Harness::new();
        h.access("terminal_color_mode", &[Value::string("never")], 0)
            .expect("valid choice");
        assert_eq!(
            h.access("terminal_color_mode", &[], 0).expect("query"),
            Some(Value::string("never"))
        );
        assert_eq!(
            h.message("terminal_color_mode", &[Value::string("sometimes")]),
            r#"InvalidArgument: terminal_color_mode: value not allowed ("sometimes")"#
        );
        assert_eq!(
            h.message("save_default_format", &[Value::string("csv")]),
            r#"InvalidArgument: save_default_format: value not allowed ("csv")"#
        );
    }

    #[test]
    fn bool_cells_reject_strings() {
        let mut h = Harness::new();
        let err = h.access("beep_on_error", &[Value::string("on")], 0).unwrap_err();
        assert_eq!(err.kind(), Some(DiagnosticKind::Type));
        assert_eq!(h.registry.bool_value("beep_on_error"), Some(false));
    }

    #[test]
    fn too_many_arguments_is_usage_error() {
        let mut h = Harness::new();
        let args = [Value::int(1), Value::int(2), Value::int(3)];
        let err = h.access("output_precision", &args, 0).unwrap_err();
        assert_eq!(err.kind(), Some(DiagnosticKind::Usage));
    }

    #[test]
    fn second_argument_must_be_local() {
        let mut h = Harness::new();
        assert_eq!(
            h.message("output_precision", &[Value::int(3), Value::string("global")]),
            r#"InvalidArgument: output_precision: second argument must be "local""#
        );
    }

    #[test]
    fn local_outside_function_is_permanent_with_advisory() {
        let mut h = Harness::new();
        h.access("output_precision", &[Value::int(3), Value::string("local")], 0)
            .expect("local set");
        assert_eq!(h.registry.int_value("output_precision"), Some(3));
        assert_eq!(h.advisories.len(), 1);
        assert_eq!(h.advisories[0].kind, AdvisoryKind::LocalOutsideFunction);
    }

    #[test]
    fn local_inside_frame_records_prior_value() {
        let mut h = Harness::new();
        h.stack.push("f");
        h.access("output_precision", &[Value::int(3), Value::string("local")], 0)
            .expect("local set");
        let frame = h.stack.pop().expect("frame");
        for record in frame.into_restores() {
            h.registry.restore(record);
        }
        assert_eq!(h.registry.int_value("output_precision"), Some(5));
        assert!(h.advisories.is_empty());
    }

    #[test]
    fn empty_string_rejected_when_disallowed() {
        let mut h = Harness::new();
        h.registry
            .register(
                "prompt",
                CellKind::String { empty_ok: false },
                InternalValue::String(">> ".into()),
            )
            .expect("register");
        assert_eq!(
            h.message("prompt", &[Value::string("")]),
            "InvalidArgument: prompt: value must not be empty"
        );
    }

    #[test]
    fn register_rejects_out_of_range_initial_value() {
        let mut registry = InternalRegistry::new();
        let err = registry
            .register("depth", CellKind::Int { min: 0, max: 3 }, InternalValue::Int(9))
            .unwrap_err();
        assert_eq!(err.kind(), Some(DiagnosticKind::InvalidArgument));
    }
}
