use indexmap::{IndexMap, map::Entry};

use crate::value::Value;

/// What a scope holds for a name: either its own value, or a marker that
/// redirects reads and writes to the global namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Local(Value),
    Global,
}

impl Binding {
    pub fn is_global(&self) -> bool {
        matches!(self, Binding::Global)
    }
}

/// Variable bindings of one invocation context.
#[derive(Debug, Default, Clone)]
pub struct Scope {
    name: String,
    bindings: IndexMap<String, Binding>,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// A name with local storage holding a defined value.
    pub fn is_local_variable(&self, name: &str) -> bool {
        matches!(self.bindings.get(name), Some(Binding::Local(value)) if value.is_materialized())
    }

    pub fn is_global(&self, name: &str) -> bool {
        matches!(self.bindings.get(name), Some(Binding::Global))
    }

    pub fn local_value(&self, name: &str) -> Option<&Value> {
        match self.bindings.get(name) {
            Some(Binding::Local(value)) => Some(value),
            _ => None,
        }
    }

    /// Value a read of `name` sees: the local value, or the global one when
    /// the name is marked global. Undefined values count as absent.
    pub fn visible_value<'a>(
        &'a self,
        name: &str,
        globals: &'a GlobalNamespace,
    ) -> Option<&'a Value> {
        let value = match self.bindings.get(name)? {
            Binding::Local(value) => value,
            Binding::Global => globals.get(name)?,
        };
        value.is_materialized().then_some(value)
    }

    /// Stores `value` locally. Returns false without touching anything when
    /// the name is marked global; the caller must write the global instead.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        match self.bindings.entry(name.to_string()) {
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Binding::Global => false,
                Binding::Local(current) => {
                    *current = value;
                    true
                }
            },
            Entry::Vacant(slot) => {
                slot.insert(Binding::Local(value));
                true
            }
        }
    }

    pub fn mark_global(&mut self, name: &str) -> Option<Binding> {
        self.bindings.insert(name.to_string(), Binding::Global)
    }

    pub fn remove(&mut self, name: &str) -> Option<Binding> {
        self.bindings.shift_remove(name)
    }

    pub fn unmark_global(&mut self, name: &str) -> bool {
        if self.is_global(name) {
            self.bindings.shift_remove(name);
            true
        } else {
            false
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn global_names(&self) -> Vec<String> {
        self.bindings
            .iter()
            .filter(|(_, binding)| binding.is_global())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Binding)> {
        self.bindings.iter()
    }

    /// Removes every binding for which `remove` returns true and reports the
    /// removed names in their original order.
    pub fn remove_where<F>(&mut self, mut remove: F) -> Vec<String>
    where
        F: FnMut(&str, &Binding) -> bool,
    {
        let mut removed = Vec::new();
        self.bindings.retain(|name, binding| {
            if remove(name, binding) {
                removed.push(name.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn clear(&mut self) -> Vec<String> {
        self.remove_where(|_, _| true)
    }
}

/// Process-wide variable storage, reachable from a scope only through a
/// global marker.
#[derive(Debug, Default, Clone)]
pub struct GlobalNamespace {
    values: IndexMap<String, Value>,
}

impl GlobalNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Creates the entry with an undefined value if it does not exist yet.
    pub fn declare(&mut self, name: &str) {
        self.values
            .entry(name.to_string())
            .or_insert_with(Value::undefined);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.shift_remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_marker_blocks_local_assignment() {
        let mut scope = Scope::new("base");
        scope.mark_global("g");
        assert!(!scope.assign("g", Value::int(1)));
        assert!(scope.is_global("g"));
        assert!(scope.local_value("g").is_none());
    }

    #[test]
    fn visible_value_follows_global_marker() {
        let mut scope = Scope::new("base");
        let mut globals = GlobalNamespace::new();
        scope.mark_global("g");
        globals.declare("g");
        assert!(scope.visible_value("g", &globals).is_none());
        globals.set("g", Value::int(2));
        assert_eq!(scope.visible_value("g", &globals), Some(&Value::int(2)));
    }

    #[test]
    fn undefined_locals_are_not_local_variables() {
        let mut scope = Scope::new("base");
        scope.assign("x", Value::undefined());
        assert!(scope.contains("x"));
        assert!(!scope.is_local_variable("x"));
    }

    #[test]
    fn remove_where_preserves_order() {
        let mut scope = Scope::new("base");
        for name in ["foo", "bar", "baz"] {
            scope.assign(name, Value::int(1));
        }
        let removed = scope.remove_where(|name, _| name.starts_with('b'));
        assert_eq!(removed, vec!["bar".to_string(), "baz".to_string()]);
        assert_eq!(scope.names(), vec!["foo".to_string()]);
    }
}
