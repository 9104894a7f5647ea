//! Generation of names that nothing currently resolves to.

use crate::{resolve::Filter, runtime::Interpreter};

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

impl Interpreter {
    /// Returns `base` followed by random letters such that the result
    /// classifies as absent. Names starting with `__` also get a `__` suffix.
    ///
    /// The loop adds one letter per collision and has no iteration bound. With
    /// 52 letters per position it ends quickly for any realistic namespace,
    /// but it is not a hard real-time guarantee.
    pub fn fresh_name(&mut self, base: &str) -> String {
        let mut name = String::with_capacity(base.len() + 4);
        name.push_str(base);
        name.push(self.random_letter());
        let mut insert_at = name.len();
        if name.starts_with("__") {
            name.push_str("__");
        }
        while !self.resolve(&name, Filter::Any).is_absent() {
            let letter = self.random_letter();
            name.insert(insert_at, letter);
            insert_at += 1;
        }
        tracing::debug!(base, name = %name, "fresh name generated");
        name
    }

    fn random_letter(&mut self) -> char {
        char::from(ALPHABET[self.rng.usize(..ALPHABET.len())])
    }
}
