//! Function locking. A locked function is skipped by every clear path.

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, Result, TabulaError},
    runtime::Interpreter,
};

impl Interpreter {
    /// Locks the function whose invocation is active.
    pub fn mlock(&mut self) -> Result<()> {
        let caller = self.current_function("mlock")?;
        self.lock_function(&caller);
        Ok(())
    }

    /// Locks `name`. Unknown names are ignored.
    pub fn lock_function(&mut self, name: &str) {
        if self.functions.set_locked(name, true) {
            tracing::debug!(name, "function locked");
        }
    }

    pub fn munlock(&mut self, name: Option<&str>) -> Result<()> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.current_function("munlock")?,
        };
        if self.functions.set_locked(&name, false) {
            tracing::debug!(name = %name, "function unlocked");
        }
        Ok(())
    }

    pub fn mislocked(&self, name: Option<&str>) -> Result<bool> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.current_function("mislocked")?,
        };
        Ok(self.functions.is_locked(&name))
    }

    fn current_function(&self, operation: &str) -> Result<String> {
        match self.caller() {
            Some(name) => Ok(name.to_string()),
            None => Err(TabulaError::from(Diagnostic::new(
                DiagnosticKind::Context,
                format!("{operation}: invalid use outside a function"),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{functions::FunctionKind, runtime::Interpreter};

    #[test]
    fn implicit_target_needs_an_invocation() {
        let mut interp = Interpreter::new();
        assert_eq!(
            interp.mlock().unwrap_err().to_string(),
            "Context: mlock: invalid use outside a function"
        );
        assert_eq!(
            interp.munlock(None).unwrap_err().to_string(),
            "Context: munlock: invalid use outside a function"
        );
        assert!(interp.mislocked(None).is_err());
    }

    #[test]
    fn explicit_names_work_anywhere() {
        let mut interp = Interpreter::new();
        interp.define_function("f", FunctionKind::CommandLine, None);
        interp.lock_function("f");
        assert_eq!(interp.mislocked(Some("f")).ok(), Some(true));
        interp.munlock(Some("f")).expect("unlock");
        assert_eq!(interp.mislocked(Some("f")).ok(), Some(false));
        assert_eq!(interp.mislocked(Some("missing")).ok(), Some(false));
        interp.munlock(Some("missing")).expect("unknown names are ignored");
    }

    #[test]
    fn mlock_targets_the_active_function() {
        let mut interp = Interpreter::new();
        interp.define_function("worker", FunctionKind::User, None);
        {
            let mut frame = interp.enter("worker");
            frame.mlock().expect("lock");
            assert_eq!(frame.mislocked(None).ok(), Some(true));
        }
        assert!(interp.function("worker").is_some_and(|entry| entry.locked));
    }
}
