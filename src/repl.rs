use rustyline::{DefaultEditor, error::ReadlineError};

use crate::{
    diagnostics::{Result, TabulaError},
    runtime::ExecutionContext,
    shell::{Event, Shell},
};

pub struct Repl {
    shell: Shell,
}

impl Default for Repl {
    fn default() -> Self {
        Self::new(ExecutionContext::default())
    }
}

impl Repl {
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            shell: Shell::new(context),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(|err| TabulaError::from(std::io::Error::other(err)))?;
        loop {
            match editor.readline(">> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed == "quit" || trimmed == "exit" {
                        break;
                    }
                    if trimmed.is_empty() {
                        continue;
                    }
                    editor.add_history_entry(trimmed).ok();
                    match self.shell.execute(trimmed, print_event) {
                        Ok(()) => {}
                        Err(TabulaError::Diagnostic(diag)) => {
                            eprintln!("error: {}", diag.message);
                            for note in &diag.notes {
                                eprintln!("  note: {note}");
                            }
                        }
                        Err(other) => eprintln!("error: {other}"),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(TabulaError::from(std::io::Error::other(err))),
            }
        }
        Ok(())
    }
}

/// Output goes to stdout, warnings to stderr.
pub fn print_event(event: Event) {
    match event {
        Event::Output(line) => println!("{line}"),
        Event::Warning(advisory) => eprintln!("{advisory}"),
    }
}
