//! Invocation frames and the restoration records they own.
//!
//! A record is only ever released by tearing down the frame that owns it;
//! there is no way to discard one early.

use crate::{environment::Scope, internal::InternalValue};

/// Prior value of an internal variable, captured before a call-scoped change.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideRecord {
    pub cell: String,
    pub prior: InternalValue,
}

#[derive(Debug)]
pub struct Frame {
    function: String,
    scope: Scope,
    restores: Vec<OverrideRecord>,
}

impl Frame {
    fn new(function: &str) -> Self {
        Self {
            function: function.to_string(),
            scope: Scope::new(function),
            restores: Vec::new(),
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn pending_restores(&self) -> usize {
        self.restores.len()
    }

    /// Hands out the frame's records newest first.
    pub fn into_restores(self) -> impl Iterator<Item = OverrideRecord> {
        self.restores.into_iter().rev()
    }
}

/// Stack of active invocations. Empty means execution is at top level.
#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<Frame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_active(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn push(&mut self, function: &str) {
        self.frames.push(Frame::new(function));
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn caller(&self) -> Option<&str> {
        self.current().map(Frame::function)
    }

    pub fn frames_mut(&mut self) -> impl Iterator<Item = &mut Frame> {
        self.frames.iter_mut()
    }

    /// Snapshots `record` onto the innermost frame. Returns false when no
    /// invocation is active.
    pub fn protect(&mut self, record: OverrideRecord) -> bool {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.restores.push(record);
                true
            }
            None => false,
        }
    }
}
