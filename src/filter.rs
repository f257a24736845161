//! Contains the `Filter` trait and the `Arguments` a filter receives.
//!
//! A filter is any type which implements the [`Filter`] trait. You can
//! assign a filter to an [`Engine`][`crate::Engine`] with the
//! [`add_filter`][`crate::Engine::add_filter()`] method, and it will be
//! available in any [`Template`][`crate::Template`] rendered by that engine.
//!
//! Given this expression:
//!
//! ```text
//! {{ name | prepend: "hello, " | truncate: 10, ellipsis: "..." }}
//! ```
//!
//! The `name` value is not quoted, so it is perceived to be a variable and
//! not a literal string. Upon rendering this expression, the variable is
//! looked up and its value becomes the input for the first filter in the
//! chain.
//!
//! The pipe `|` denotes that the following identifier is the name of a
//! filter. Each filter receives the output of the previous one.
//!
//! Arguments follow a colon and are separated by commas. An argument written
//! as `name: value` is a named argument, every other argument is positional.
//! Positional arguments keep their order, so `truncate` above receives `10`
//! at position `0` and `"..."` under the name `ellipsis`.
//!
//! # Examples
//!
//! You can either create a struct and implement the trait on that, or use a
//! function matching the signature of [`Filter::apply`] that returns a
//! `Result` instead of an [`Outcome`].
//!
//! ```rust
//! use serde_json::{json, Value};
//! use sluice::{Arguments, Context, Engine, Error, Store};
//!
//! fn to_lowercase(value: &Value, _: &Arguments, _: &Context) -> Result<Value, Error> {
//!     match value {
//!         Value::String(string) => Ok(json!(string.to_lowercase())),
//!         _ => Err(Error::build("filter `to_lowercase` requires string input")
//!             .with_help("use quotes to coerce data to string")),
//!     }
//! }
//!
//! let engine = Engine::default().with_filter_must("to_lowercase", to_lowercase);
//! let template = engine.compile("{{ name | to_lowercase }}").unwrap();
//! let result = engine.render(&template, &Store::new().with_must("name", "TAYLOR"));
//!
//! assert_eq!(result.unwrap(), "taylor");
//! ```
//!
//! If a filter returns an [`Error`] without a visualization, the renderer
//! adds one that points to the filter call. Printing the error above with
//! `{:#}` shows:
//!
//! ```text
//! error: filter `to_lowercase` requires string input
//!   --> 1:4
//!    |
//!  1 | {{ name | to_lowercase }}
//!    |    ^^^^^^^^^^^^^^^^^^^
//!    |
//!   = help: use quotes to coerce data to string
//! ```
//!
//! A filter that needs to wait on something returns [`Outcome::pending`],
//! and the render resumes once the future resolves:
//!
//! ```rust
//! use serde_json::Value;
//! use sluice::{Arguments, Context, Filter, Outcome};
//!
//! struct Lookup;
//!
//! impl Filter for Lookup {
//!     fn apply(&self, input: &Value, _: &Arguments, _: &Context) -> Outcome<Value> {
//!         let key = input.clone();
//!         Outcome::pending(async move { Ok(key) })
//!     }
//! }
//! ```
use crate::{log::Error, outcome::Outcome, render::Context};
use serde_json::Value;

/// Describes a type which can be used to transform input in an expression.
pub trait Filter: Send + Sync {
    /// Execute the filter with the given input and return a new [`Value`].
    fn apply(&self, input: &Value, arguments: &Arguments, context: &Context) -> Outcome<Value>;
}

/// Allows assignment of any function matching the signature of `apply` as a
/// `Filter`, instead of requiring a struct be created.
impl<F> Filter for F
where
    F: Fn(&Value, &Arguments, &Context) -> Result<Value, Error> + Send + Sync,
{
    #[inline]
    fn apply(&self, input: &Value, arguments: &Arguments, context: &Context) -> Outcome<Value> {
        Outcome::Ready(self(input, arguments, context))
    }
}

/// The evaluated arguments of a filter call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    /// Arguments without a name, in source order.
    positional: Vec<Value>,
    /// `name: value` arguments, in source order.
    named: Vec<(String, Value)>,
}

impl Arguments {
    /// Create an empty [`Arguments`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    #[inline]
    pub fn push(&mut self, value: Value) {
        self.positional.push(value);
    }

    /// Append a named argument.
    ///
    /// A later argument with the same name hides an earlier one.
    #[inline]
    pub fn push_named<T>(&mut self, name: T, value: Value)
    where
        T: Into<String>,
    {
        self.named.push((name.into(), value));
    }

    /// Return the positional argument at the given index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Return the named argument with the given name.
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.named
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Return every positional argument.
    #[inline]
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Return every named argument.
    #[inline]
    pub fn named(&self) -> &[(String, Value)] {
        &self.named
    }

    /// Return the number of arguments, positional and named.
    #[inline]
    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    /// Return true if there are no arguments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::Arguments;
    use crate::{log::ErrorKind, Context, Engine, Error, Outcome, Store};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::time::Duration;

    #[test]
    fn test_arguments_lookup() {
        let mut arguments = Arguments::new();
        arguments.push(json!(1));
        arguments.push_named("size", json!(2));
        arguments.push_named("size", json!(3));

        assert_eq!(arguments.get(0), Some(&json!(1)));
        assert_eq!(arguments.get(1), None);
        assert_eq!(arguments.get_named("size"), Some(&json!(3)));
        assert_eq!(arguments.len(), 3);
    }

    #[test]
    fn test_call_chain() {
        let engine = get_test_engine();
        let template = engine.compile("{{ 1 | plus: 2 | times: 3 }}").unwrap();

        assert_eq!(engine.render(&template, &Store::new()).unwrap(), "9");
    }

    #[test]
    fn test_call_named_arguments() {
        let engine = get_test_engine();
        let template = engine
            .compile(r#"{{ name | left: 3, suffix: "..." }}"#)
            .unwrap();
        let result = engine.render(&template, &Store::new().with_must("name", "TAYLOR"));

        assert_eq!(result.unwrap(), "TAY...");
    }

    #[test]
    fn test_call_chain_error() {
        let engine = get_test_engine();
        let template = engine.compile(r#"{{ name | left: "10" }}"#).unwrap();
        let error = engine
            .render(&template, &Store::new().with_must("name", "TAYLOR"))
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Filter);
        assert_eq!(error.location(), Some((1, 4)));
    }

    #[test]
    fn test_unknown_filter_passes_through() {
        let engine = Engine::default();
        let template = engine.compile("{{ 'a' | ghost }}").unwrap();

        assert_eq!(engine.render(&template, &Store::new()).unwrap(), "a");
    }

    #[test]
    fn test_unknown_filter_strict() {
        let engine = Engine::new(crate::Options::default().with_strict_filters(true));
        let template = engine.compile("{{ 'a' | ghost }}").unwrap();
        let error = engine.render(&template, &Store::new()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::UnknownFilter);
    }

    #[tokio::test]
    async fn test_pending_filters_resume_in_order() {
        let engine = get_test_engine().with_filter_must("later", Later);
        let template = engine
            .compile("{{ 'a' | later: 20 }}{{ 'b' }}{{ 'c' | later: 1 }}")
            .unwrap();
        let result = engine.render_async(&template, &Store::new()).await;

        assert_eq!(result.unwrap(), "abc");
    }

    #[test]
    fn test_pending_filter_sync_render() {
        let engine = get_test_engine().with_filter_must("later", Later);
        let template = engine.compile("{{ 'x' | later: 1 }}!").unwrap();

        assert_eq!(engine.render(&template, &Store::new()).unwrap(), "x!");
    }

    /// Return a new Engine equipped with test filters.
    fn get_test_engine() -> Engine {
        Engine::default()
            .with_filter_must("plus", plus)
            .with_filter_must("times", times)
            .with_filter_must("left", left)
    }

    fn plus(value: &Value, arguments: &Arguments, _: &Context) -> Result<Value, Error> {
        match (value.as_i64(), arguments.get(0).and_then(Value::as_i64)) {
            (Some(left), Some(right)) => Ok(json!(left + right)),
            _ => Err(Error::build("filter `plus` expects integers")),
        }
    }

    fn times(value: &Value, arguments: &Arguments, _: &Context) -> Result<Value, Error> {
        match (value.as_i64(), arguments.get(0).and_then(Value::as_i64)) {
            (Some(left), Some(right)) => Ok(json!(left * right)),
            _ => Err(Error::build("filter `times` expects integers")),
        }
    }

    /// Return the first n characters of the input, followed by the `suffix`
    /// argument if present.
    fn left(value: &Value, arguments: &Arguments, _: &Context) -> Result<Value, Error> {
        let Some(string) = value.as_str() else {
            return Err(Error::build("filter `left` expects string input"));
        };
        let Some(count) = arguments.get(0).and_then(Value::as_u64) else {
            return Err(Error::build("filter `left` expects a number argument"));
        };
        let mut result = string.chars().take(count as usize).collect::<String>();
        if let Some(suffix) = arguments.get_named("suffix").and_then(Value::as_str) {
            result.push_str(suffix);
        }

        Ok(json!(result))
    }

    /// Resolve to the input after the given number of milliseconds.
    struct Later;

    impl super::Filter for Later {
        fn apply(&self, input: &Value, arguments: &Arguments, _: &Context) -> Outcome<Value> {
            let input = input.clone();
            let delay = arguments.get(0).and_then(Value::as_u64).unwrap_or_default();

            Outcome::pending(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(input)
            })
        }
    }
}
