use crate::{
    access::Binding,
    engine::Engine,
    log::{error_recursion_limit, error_step_limit, Error},
    options::Options,
    render::scope::Scope,
    store::Store,
};
use serde_json::Value;
use std::collections::HashMap;

/// The state of a single render.
///
/// A `Context` holds the variables of the render, along with the counters
/// that `increment`, `decrement` and `cycle` advance. Two renders of the
/// same template with different contexts never see each other's variables.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use sluice::{Context, Engine, Verbatim};
///
/// let engine = Engine::default();
/// let template = engine.compile("{% assign b = a %}{{ b }}").unwrap();
///
/// let mut context = Context::new(&engine);
/// context.set("a", json!(5));
///
/// let mut output = String::new();
/// engine.render_to(&template, &mut context, &mut output, &Verbatim).unwrap();
///
/// assert_eq!(output, "5");
/// assert_eq!(context.get("b").into_value(), json!(5));
/// ```
pub struct Context<'engine> {
    engine: &'engine Engine,
    scope: Scope,
    /// Fallback for names the scope does not define.
    model: Option<Value>,
    steps: usize,
    depth: usize,
    counters: HashMap<String, i64>,
    cycles: HashMap<String, usize>,
}

impl<'engine> Context<'engine> {
    /// Create a new, empty [`Context`].
    pub fn new(engine: &'engine Engine) -> Self {
        Self {
            engine,
            scope: Scope::new(),
            model: None,
            steps: 0,
            depth: 0,
            counters: HashMap::new(),
            cycles: HashMap::new(),
        }
    }

    /// Create a new [`Context`] holding the variables of the [`Store`].
    pub fn with_store(engine: &'engine Engine, store: &Store) -> Self {
        let mut context = Self::new(engine);
        for (key, value) in store.iter() {
            context.scope.set(key.as_str(), value.clone());
        }

        context
    }

    /// Use the value as a fallback for names that no variable defines.
    ///
    /// Members of the model are read through the engine's
    /// [`Accessor`][`crate::Accessor`].
    #[inline]
    pub fn with_model(mut self, model: Value) -> Self {
        self.model = Some(model);
        self
    }

    /// Return the [`Engine`] this render uses.
    #[inline]
    pub fn engine(&self) -> &'engine Engine {
        self.engine
    }

    /// Return the [`Options`] of the engine.
    #[inline]
    pub fn options(&self) -> &'engine Options {
        self.engine.options()
    }

    /// Return the variable with the given name.
    ///
    /// The model is not consulted.
    #[inline]
    pub fn get(&self, name: &str) -> Binding {
        self.scope.get(name).cloned().into()
    }

    /// Set a variable in the innermost frame that accepts writes.
    #[inline]
    pub fn set<T>(&mut self, name: T, value: Value)
    where
        T: Into<String>,
    {
        self.scope.set(name, value);
    }

    /// Return the number of statements executed so far.
    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Return the current nesting depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub(crate) fn model(&self) -> Option<&Value> {
        self.model.as_ref()
    }

    #[inline]
    pub(crate) fn scope(&self) -> &Scope {
        &self.scope
    }

    #[inline]
    pub(crate) fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    /// Replace the scope, returning the previous one.
    #[inline]
    pub(crate) fn replace_scope(&mut self, scope: Scope) -> Scope {
        std::mem::replace(&mut self.scope, scope)
    }

    /// Count one executed statement.
    pub(crate) fn step(&mut self) -> Result<(), Error> {
        self.steps += 1;
        let limit = self.options().max_steps;
        if limit != 0 && self.steps > limit {
            return Err(error_step_limit(limit));
        }

        Ok(())
    }

    /// Enter a nested block or template.
    ///
    /// Every successful call must be paired with [`Context::leave`].
    pub(crate) fn enter(&mut self) -> Result<(), Error> {
        let limit = self.options().max_recursion;
        if self.depth >= limit {
            return Err(error_recursion_limit(limit));
        }
        self.depth += 1;

        Ok(())
    }

    #[inline]
    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Return the counter, then add one.
    pub(crate) fn increment(&mut self, name: &str) -> i64 {
        let counter = self.counters.entry(name.to_owned()).or_insert(0);
        let value = *counter;
        *counter += 1;

        value
    }

    /// Subtract one from the counter, then return it.
    pub(crate) fn decrement(&mut self, name: &str) -> i64 {
        let counter = self.counters.entry(name.to_owned()).or_insert(0);
        *counter -= 1;

        *counter
    }

    /// Return the position of the next value of a cycle group with `length`
    /// values.
    pub(crate) fn cycle(&mut self, group: String, length: usize) -> usize {
        let position = self.cycles.entry(group).or_insert(0);
        let index = *position % length.max(1);
        *position = index + 1;

        index
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("scope", &self.scope)
            .field("model", &self.model)
            .field("steps", &self.steps)
            .field("depth", &self.depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Context;
    use crate::{access::Binding, Engine, Options, Store};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_context_store_variables() {
        let engine = Engine::default();
        let context = Context::with_store(&engine, &Store::new().with_must("name", "taylor"));

        assert_eq!(context.get("name"), Binding::Defined(json!("taylor")));
        assert_eq!(context.get("age"), Binding::Undefined);
    }

    #[test]
    fn test_context_counters() {
        let engine = Engine::default();
        let mut context = Context::new(&engine);

        assert_eq!(context.increment("a"), 0);
        assert_eq!(context.increment("a"), 1);
        assert_eq!(context.decrement("b"), -1);
        assert_eq!(context.decrement("a"), 1);
        assert_eq!(context.get("a"), Binding::Undefined);
    }

    #[test]
    fn test_context_cycle() {
        let engine = Engine::default();
        let mut context = Context::new(&engine);
        let positions = (0..4)
            .map(|_| context.cycle("group".into(), 3))
            .collect::<Vec<_>>();

        assert_eq!(positions, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_context_limits() {
        let engine = Engine::new(Options::default().with_max_steps(2).with_max_recursion(1));
        let mut context = Context::new(&engine);

        assert!(context.step().is_ok());
        assert!(context.step().is_ok());
        assert!(context.step().is_err());
        assert!(context.enter().is_ok());
        assert!(context.enter().is_err());
        context.leave();
        assert_eq!(context.depth(), 0);
    }
}
