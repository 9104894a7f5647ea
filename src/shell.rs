//! Command-syntax front end. Each statement is a command word followed by
//! arguments, or an assignment `NAME = VALUE`.

use std::{cell::RefCell, path::PathBuf, rc::Rc};

use crate::{
    collaborators::LoadPath,
    diagnostics::{Advisory, Diagnostic, DiagnosticKind, Result, TabulaError},
    functions::FunctionKind,
    lexer::{self, Lexer, Token, TokenKind},
    runtime::{ExecutionContext, FunctionLookup, Interpreter},
    value::Value,
};

/// Something a statement produced for the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Output(String),
    Warning(Advisory),
}

pub struct Shell {
    interpreter: Interpreter,
    load_path: Rc<RefCell<LoadPath>>,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new(ExecutionContext::default())
    }
}

impl Shell {
    pub fn new(context: ExecutionContext) -> Self {
        let load_path = Rc::new(RefCell::new(context.load_path()));
        let interpreter = Interpreter::with_context(context).with_search_path(Rc::clone(&load_path));
        Self {
            interpreter,
            load_path,
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Runs every statement in `source`, reporting output and warnings as
    /// they happen. Stops at the first failing statement.
    pub fn execute<F>(&mut self, source: &str, mut emit: F) -> Result<()>
    where
        F: FnMut(Event),
    {
        let tokens = Lexer::new(source).tokenize()?;
        for statement in lexer::statements(tokens) {
            let result = self.statement(source, &statement, &mut emit);
            for advisory in self.interpreter.take_advisories() {
                emit(Event::Warning(advisory));
            }
            result?;
        }
        Ok(())
    }

    /// Runs `source` and collects its output lines. Warnings are dropped.
    pub fn eval(&mut self, source: &str) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        self.execute(source, |event| {
            if let Event::Output(line) = event {
                lines.push(line);
            }
        })?;
        Ok(lines)
    }

    fn statement<F>(&mut self, source: &str, tokens: &[Token], emit: &mut F) -> Result<()>
    where
        F: FnMut(Event),
    {
        let head = &tokens[0];
        if tokens.get(1).is_some_and(|token| token.kind == TokenKind::Assign) {
            return self.assignment(source, head, &tokens[2..]);
        }
        if head.kind != TokenKind::Word {
            return Err(command_error(head, "expected a command"));
        }
        let args: Vec<&str> = tokens[1..].iter().map(|token| token.lexeme.as_str()).collect();
        tracing::trace!(command = %head.lexeme, ?args, "statement");

        match head.lexeme.as_str() {
            "global" => {
                if args.is_empty() {
                    emit_names(emit, self.interpreter.global_variable_names());
                }
                for name in args {
                    self.interpreter.declare_global(name)?;
                }
            }
            "function" => match args.as_slice() {
                [name] => self
                    .interpreter
                    .define_function(name, FunctionKind::CommandLine, None),
                [name, file] => self.interpreter.define_function(
                    name,
                    FunctionKind::User,
                    Some(PathBuf::from(*file)),
                ),
                _ => return Err(Diagnostic::usage("function").into()),
            },
            "autoload" => match args.as_slice() {
                [name, file] => self.load_path.borrow_mut().add_autoload(*name, *file),
                _ => return Err(Diagnostic::usage("autoload").into()),
            },
            "path" => match args.as_slice() {
                [name, file] => self.load_path.borrow_mut().add_function(*name, *file),
                _ => return Err(Diagnostic::usage("path").into()),
            },
            "builtin" => {
                for name in args {
                    self.interpreter.define_builtin(name);
                }
            }
            "enter" => match args.as_slice() {
                [name] => self.interpreter.push_frame(name),
                _ => return Err(Diagnostic::usage("enter").into()),
            },
            "leave" => {
                if !self.interpreter.pop_frame() {
                    return Err(command_error(head, "leave: no active invocation"));
                }
            }
            "clear" => self.interpreter.clear(args.as_slice())?,
            "exist" => {
                let code = match args.as_slice() {
                    [name] => self.interpreter.exist(name, None)?,
                    [name, filter] => self.interpreter.exist(name, Some(*filter))?,
                    _ => return Err(Diagnostic::usage("exist").into()),
                };
                emit(Event::Output(format!("ans = {code}")));
            }
            "isglobal" => match args.as_slice() {
                [name] => emit_flag(emit, self.interpreter.isglobal(name)),
                _ => return Err(Diagnostic::usage("isglobal").into()),
            },
            "mlock" => match args.as_slice() {
                [] => self.interpreter.mlock()?,
                [name] => self.interpreter.lock_function(name),
                _ => return Err(Diagnostic::usage("mlock").into()),
            },
            "munlock" => match args.as_slice() {
                [] => self.interpreter.munlock(None)?,
                [name] => self.interpreter.munlock(Some(*name))?,
                _ => return Err(Diagnostic::usage("munlock").into()),
            },
            "mislocked" => {
                let locked = match args.as_slice() {
                    [] => self.interpreter.mislocked(None)?,
                    [name] => self.interpreter.mislocked(Some(*name))?,
                    _ => return Err(Diagnostic::usage("mislocked").into()),
                };
                emit_flag(emit, locked);
            }
            "who" => match args.as_slice() {
                [] => emit_names(emit, self.interpreter.variable_names()),
                ["global"] => emit_names(emit, self.interpreter.global_variable_names()),
                _ => return Err(Diagnostic::usage("who").into()),
            },
            "whos" => match args.as_slice() {
                ["global"] => {
                    for name in self.interpreter.global_variable_names() {
                        let shown = self
                            .interpreter
                            .global_value(&name, true)?
                            .map_or_else(|| "[](0x0)".to_string(), |value| value.to_string());
                        emit(Event::Output(format!("{name} = {shown}")));
                    }
                }
                _ => return Err(Diagnostic::usage("whos").into()),
            },
            "inmem" => emit_names(emit, self.interpreter.function_names()),
            "which" => match args.as_slice() {
                [name] => {
                    let found = self.interpreter.is_valid_function(name, "which")?;
                    emit(Event::Output(describe_lookup(name, &found)));
                }
                _ => return Err(Diagnostic::usage("which").into()),
            },
            "fresh" => match args.as_slice() {
                [base] => {
                    let name = self.interpreter.fresh_name(base);
                    emit(Event::Output(format!("ans = {name}")));
                }
                _ => return Err(Diagnostic::usage("fresh").into()),
            },
            name if self.interpreter.internals().contains(name) => {
                let values: Vec<Value> = tokens[1..].iter().map(argument_value).collect();
                let nargout = usize::from(values.is_empty());
                if let Some(value) = self.interpreter.internal_variable(name, &values, nargout)? {
                    emit(Event::Output(format!("ans = {value}")));
                }
            }
            name => match (args.is_empty(), self.interpreter.varval(name)) {
                (true, Some(value)) if value.is_materialized() => {
                    emit(Event::Output(format!("{name} = {value}")));
                }
                _ => {
                    return Err(command_error(head, format!("'{name}' undefined")));
                }
            },
        }
        Ok(())
    }

    fn assignment(&mut self, source: &str, target: &Token, rhs: &[Token]) -> Result<()> {
        if target.kind != TokenKind::Word {
            return Err(command_error(target, "invalid assignment target"));
        }
        let (Some(first), Some(last)) = (rhs.first(), rhs.last()) else {
            return Err(command_error(target, "missing value in assignment"));
        };
        let text = &source[first.span.start..last.span.end];
        let value = if text.starts_with("@(") {
            anonymous_function(first, text)?
        } else {
            match rhs {
                [token] => self.operand(token)?,
                [keyword, class] if keyword.lexeme == "new" && keyword.kind == TokenKind::Word => {
                    Value::object(class.lexeme.as_str())
                }
                _ => return Err(command_error(first, format!("cannot evaluate '{text}'"))),
            }
        };
        self.interpreter.assign(&target.lexeme, value)
    }

    fn operand(&self, token: &Token) -> Result<Value> {
        if token.kind == TokenKind::String {
            return Ok(Value::string(token.lexeme.as_str()));
        }
        if let Some(name) = token.lexeme.strip_prefix('@') {
            return Ok(Value::function_handle(name));
        }
        if let Some(value) = literal(&token.lexeme) {
            return Ok(value);
        }
        match self.interpreter.varval(&token.lexeme) {
            Some(value) if value.is_materialized() => Ok(value),
            _ => Err(command_error(token, format!("'{}' undefined", token.lexeme))),
        }
    }
}

fn literal(word: &str) -> Option<Value> {
    match word {
        "true" => Some(Value::bool(true)),
        "false" => Some(Value::bool(false)),
        _ if !word.chars().any(|ch| ch.is_ascii_digit()) => None,
        _ => word
            .parse::<i64>()
            .map(Value::int)
            .or_else(|_| word.parse::<f64>().map(Value::real))
            .ok(),
    }
}

// Command arguments that are not literals pass through as strings, so
// `output_precision 3 local` sees an int and the word "local".
fn argument_value(token: &Token) -> Value {
    match token.kind {
        TokenKind::Word => {
            literal(&token.lexeme).unwrap_or_else(|| Value::string(token.lexeme.as_str()))
        }
        _ => Value::string(token.lexeme.as_str()),
    }
}

fn anonymous_function(at: &Token, text: &str) -> Result<Value> {
    let Some(close) = text.find(')') else {
        return Err(command_error(at, "unterminated parameter list"));
    };
    let params = text[2..close]
        .split(',')
        .map(str::trim)
        .filter(|param| !param.is_empty())
        .map(String::from)
        .collect();
    Ok(Value::anonymous(params, text[close + 1..].trim()))
}

fn describe_lookup(name: &str, found: &FunctionLookup) -> String {
    match found {
        FunctionLookup::Defined(entry) => match &entry.file {
            Some(file) => format!("'{name}' is a function from the file {}", file.display()),
            None => format!("'{name}' is a command-line function"),
        },
        FunctionLookup::OnPath(file) => {
            format!("'{name}' is a function from the file {}", file.display())
        }
        FunctionLookup::Builtin => format!("'{name}' is a built-in function"),
    }
}

fn emit_names<F: FnMut(Event)>(emit: &mut F, names: Vec<String>) {
    if !names.is_empty() {
        emit(Event::Output(names.join(" ")));
    }
}

fn emit_flag<F: FnMut(Event)>(emit: &mut F, flag: bool) {
    emit(Event::Output(format!("ans = {}", u8::from(flag))));
}

fn command_error(token: &Token, message: impl Into<String>) -> TabulaError {
    Diagnostic::new(DiagnosticKind::Command, message)
        .with_span(token.span)
        .into()
}
