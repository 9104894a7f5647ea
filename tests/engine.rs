use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use tabula::{
    AdvisoryKind, Classification, DiagnosticKind, ExecutionContext, Filter, FunctionKind,
    Interpreter, LoadPath, Value,
    collaborators::MemoryFileSystem,
    diagnostics::Result,
    resolve::split_struct_elts,
};

fn with_locals(names: &[&str]) -> Interpreter {
    let mut interp = Interpreter::new();
    for name in names {
        interp.assign(name, Value::int(1)).expect("assign");
    }
    interp
}

fn names(list: Vec<String>) -> BTreeSet<String> {
    list.into_iter().collect()
}

#[test]
fn variables_matching_pattern_are_removed() {
    let mut interp = with_locals(&["foo", "bar", "baz"]);
    interp.clear(&["-variables", "b*"]).expect("clear");
    assert_eq!(interp.variable_names(), vec!["foo"]);
}

#[test]
fn exclusive_clear_keeps_matches() {
    let mut interp = with_locals(&["foo", "bar", "baz"]);
    interp.clear(&["-x", "b*"]).expect("clear");
    assert_eq!(interp.variable_names(), vec!["bar", "baz"]);
}

#[test]
fn local_variable_shadows_builtin_only_for_any_filter() {
    let mut interp = Interpreter::new();
    assert_eq!(interp.resolve("sin", Filter::Builtin), Classification::Builtin);
    assert_eq!(interp.exist("sin", Some("builtin")).expect("exist"), 5);
    interp.assign("sin", Value::int(3)).expect("assign");
    assert_eq!(interp.exist("sin", None).expect("exist"), 1);
    assert_eq!(interp.exist("sin", Some("builtin")).expect("exist"), 5);
}

#[test]
fn global_aliased_names_classify_as_variables() {
    let mut interp = Interpreter::new();
    interp.declare_global("g").expect("global");
    interp.assign("g", Value::int(1)).expect("assign");
    assert_eq!(interp.varval("g"), Some(Value::int(1)));
    assert_eq!(interp.exist("g", None).expect("exist"), 1);
    assert_eq!(interp.exist("g", Some("var")).expect("exist"), 1);
}

#[test]
fn complement_law_holds_for_each_pattern_set() {
    let all = ["alpha", "beta", "bravo", "gamma", "b_1", "zeta"];
    for patterns in [vec!["b*"], vec!["*a"], vec!["?eta", "g*"], vec!["nothing"]] {
        let mut kept = with_locals(&all);
        kept.clear_variables(patterns.as_slice(), false, false).expect("clear");
        let mut excluded = with_locals(&all);
        excluded.clear_variables(patterns.as_slice(), true, false).expect("clear");

        let survivors_of_inclusive = names(kept.variable_names());
        let survivors_of_exclusive = names(excluded.variable_names());
        let everything: BTreeSet<String> = all.iter().map(|name| name.to_string()).collect();

        let removed_inclusive: BTreeSet<_> =
            everything.difference(&survivors_of_inclusive).cloned().collect();
        let removed_exclusive: BTreeSet<_> =
            everything.difference(&survivors_of_exclusive).cloned().collect();
        assert!(removed_inclusive.is_disjoint(&removed_exclusive), "{patterns:?}");
        let union: BTreeSet<_> = removed_inclusive.union(&removed_exclusive).cloned().collect();
        assert_eq!(union, everything, "{patterns:?}");
    }
}

#[test]
fn clearing_is_idempotent() {
    let mut once = with_locals(&["foo", "bar", "baz"]);
    once.clear(&["b*"]).expect("clear");
    let mut twice = with_locals(&["foo", "bar", "baz"]);
    twice.clear(&["b*"]).expect("clear");
    twice.clear(&["b*"]).expect("clear");
    assert_eq!(once.variable_names(), twice.variable_names());

    let mut untouched = with_locals(&["foo", "bar"]);
    untouched.clear(&["q*"]).expect("clear");
    assert_eq!(untouched.variable_names(), vec!["foo", "bar"]);
}

#[test]
fn locked_functions_survive_every_deletion_path() {
    let mut interp = Interpreter::new();
    interp.define_function("keep", FunctionKind::CommandLine, None);
    interp.define_function("drop", FunctionKind::CommandLine, None);
    interp.lock_function("keep");

    interp.clear(&["-f", "k*"]).expect("pattern");
    interp.clear(&["-f", "-x", "d*"]).expect("exclusive");
    interp.clear(&["-all"]).expect("all");
    interp.clear(&["functions"]).expect("keyword");
    assert!(!interp.clear_function("keep"));
    assert_eq!(interp.function_names(), vec!["keep"]);

    interp.munlock(Some("keep")).expect("unlock");
    interp.clear(&["-f"]).expect("clear");
    assert!(interp.function_names().is_empty());
}

#[test]
fn override_is_restored_when_the_invocation_fails() {
    let mut interp = Interpreter::new();
    let outcome: Result<()> = interp.invoke("worker", |frame| {
        frame.internal_variable(
            "save_default_format",
            &[Value::string("binary"), Value::string("local")],
            0,
        )?;
        frame.invoke("nested", |inner| {
            inner.internal_variable(
                "save_default_format",
                &[Value::string("hdf5"), Value::string("local")],
                0,
            )?;
            inner.internal_variable("output_precision", &[Value::int(99)], 0)?;
            Ok(())
        })
    });
    let err = outcome.unwrap_err();
    assert_eq!(err.kind(), Some(DiagnosticKind::Range));
    assert_eq!(
        interp.internals().string_value("save_default_format").as_deref(),
        Some("text")
    );
    assert_eq!(interp.call_depth(), 0);
}

#[test]
fn local_outside_function_still_sets_and_warns() {
    let mut interp = Interpreter::new();
    interp
        .internal_variable("beep_on_error", &[Value::bool(true), Value::string("local")], 0)
        .expect("set");
    assert_eq!(interp.internals().bool_value("beep_on_error"), Some(true));
    let advisories = interp.take_advisories();
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0].kind, AdvisoryKind::LocalOutsideFunction);
}

#[test]
fn fresh_names_are_absent() {
    let mut interp = Interpreter::with_context(ExecutionContext {
        seed: Some(11),
        ..ExecutionContext::default()
    });
    for letter in ('a'..='z').chain('A'..='Z') {
        interp.define_function(&format!("q{letter}"), FunctionKind::CommandLine, None);
    }
    for _ in 0..20 {
        let name = interp.fresh_name("q");
        assert_eq!(interp.resolve(&name, Filter::Any), Classification::Absent);
        interp.assign(&name, Value::int(0)).expect("assign");
    }
}

#[test]
fn search_path_and_file_system_collaborators() {
    let path = Rc::new(RefCell::new(LoadPath::new()));
    let mut files = MemoryFileSystem::new();
    files.add_dir("scripts");
    files.add_file("notes.m");
    let interp = Interpreter::new()
        .with_search_path(Rc::clone(&path))
        .with_file_system(files);

    assert_eq!(interp.resolve("scripts", Filter::Dir), Classification::Directory);
    assert_eq!(interp.resolve("notes.m", Filter::Any), Classification::ScriptFile);
    assert_eq!(interp.resolve("notes.m", Filter::Dir), Classification::Absent);
    assert_eq!(interp.resolve("solver", Filter::File), Classification::Absent);

    path.borrow_mut().add_function("solver", "solver.mex");
    assert_eq!(interp.resolve("solver", Filter::File), Classification::CompiledFile);
    assert_eq!(interp.resolve("solver", Filter::Dir), Classification::Absent);
}

#[test]
fn keywords_never_resolve() {
    let interp = Interpreter::new();
    assert_eq!(interp.resolve("while", Filter::Any), Classification::Absent);
    assert_eq!(interp.resolve("endfunction", Filter::Builtin), Classification::Absent);
}

#[test]
fn globals_cleared_everywhere() {
    let mut interp = Interpreter::new();
    interp.declare_global("shared").expect("global");
    interp.assign("shared", Value::int(9)).expect("assign");
    {
        let mut frame = interp.enter("f");
        frame.declare_global("shared").expect("global");
        frame.clear(&["-global", "shared"]).expect("clear");
        assert!(!frame.isglobal("shared"));
    }
    assert!(!interp.isglobal("shared"));
    assert!(interp.global_variable_names().is_empty());
}

#[test]
fn bad_exist_filter_is_rejected() {
    let mut interp = Interpreter::new();
    let err = interp.exist("x", Some("module")).unwrap_err();
    assert_eq!(err.to_string(), r#"InvalidArgument: exist: unrecognized type argument "module""#);
}

#[test]
fn struct_references_split_on_dots() {
    assert_eq!(split_struct_elts("config.output.width"), vec!["config", "output", "width"]);
    assert_eq!(split_struct_elts("plain"), vec!["plain"]);
}
