//! Member access on values.
//!
//! The renderer resolves every `.name` and `[index]` segment of a path
//! through an [`Accessor`], so a host can expose lazily computed members or
//! fetch them asynchronously.
use crate::{outcome::Outcome, render::Context};
use serde_json::Value;

/// The result of looking up a name or member.
///
/// Undefined is distinct from a defined `nil`, so strict rendering can tell
/// a missing variable apart from one holding `nil`.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// The lookup found a value.
    Defined(Value),
    /// Nothing is bound to the name.
    Undefined,
}

impl Binding {
    /// Return true if the [`Binding`] holds a value.
    #[inline]
    pub fn is_defined(&self) -> bool {
        matches!(self, Binding::Defined(_))
    }

    /// Return the [`Value`], treating undefined as nil.
    #[inline]
    pub fn into_value(self) -> Value {
        match self {
            Binding::Defined(value) => value,
            Binding::Undefined => Value::Null,
        }
    }
}

impl From<Option<Value>> for Binding {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(value) => Binding::Defined(value),
            None => Binding::Undefined,
        }
    }
}

/// Looks up a member of a host value.
///
/// `member` is a string for `.name` segments, and the evaluated index for
/// `[index]` segments.
///
/// # Examples
///
/// ```
/// use serde_json::{json, Value};
/// use sluice::{Accessor, Binding, Context, Outcome};
///
/// /// Resolve every member to its own name in upper case.
/// struct Shout;
///
/// impl Accessor for Shout {
///     fn get(&self, _: &Value, member: &Value, _: &Context) -> Outcome<Binding> {
///         let text = member.as_str().unwrap_or_default().to_uppercase();
///         Outcome::ready(Binding::Defined(json!(text)))
///     }
/// }
/// ```
pub trait Accessor: Send + Sync {
    /// Return the member of `host` named by `member`.
    fn get(&self, host: &Value, member: &Value, context: &Context) -> Outcome<Binding>;
}

/// The default [`Accessor`], which reads JSON objects and arrays.
///
/// Besides object keys and array indexes it understands `size`, `first`
/// and `last` on arrays and strings, unless an object key of the same
/// name exists. Negative indexes count from the end of an array.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAccessor;

impl JsonAccessor {
    /// Look up the member without suspending.
    pub fn lookup(host: &Value, member: &Value) -> Binding {
        match (host, member) {
            (Value::Object(object), Value::String(key)) => match object.get(key) {
                Some(value) => Binding::Defined(value.clone()),
                None if key == "size" => Binding::Defined(object.len().into()),
                None => Binding::Undefined,
            },
            (Value::Array(array), Value::Number(number)) => match number.as_i64() {
                Some(index) => {
                    let index = if index < 0 {
                        array.len().checked_sub(index.unsigned_abs() as usize)
                    } else {
                        Some(index as usize)
                    };

                    index.and_then(|index| array.get(index)).cloned().into()
                }
                None => Binding::Undefined,
            },
            (Value::Array(array), Value::String(key)) => match key.as_str() {
                "size" => Binding::Defined(array.len().into()),
                "first" => array.first().cloned().into(),
                "last" => array.last().cloned().into(),
                _ => Binding::Undefined,
            },
            (Value::String(string), Value::String(key)) => match key.as_str() {
                "size" => Binding::Defined(string.chars().count().into()),
                "first" => string
                    .chars()
                    .next()
                    .map(|first| Value::String(first.to_string()))
                    .into(),
                "last" => string
                    .chars()
                    .next_back()
                    .map(|last| Value::String(last.to_string()))
                    .into(),
                _ => Binding::Undefined,
            },
            _ => Binding::Undefined,
        }
    }
}

impl Accessor for JsonAccessor {
    #[inline]
    fn get(&self, host: &Value, member: &Value, _: &Context) -> Outcome<Binding> {
        Outcome::ready(Self::lookup(host, member))
    }
}

#[cfg(test)]
mod tests {
    use super::{Binding, JsonAccessor};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_lookup_object() {
        let host = json!({"name": "taylor", "size": "large"});

        assert_eq!(
            JsonAccessor::lookup(&host, &json!("name")),
            Binding::Defined(json!("taylor"))
        );
        assert_eq!(
            JsonAccessor::lookup(&host, &json!("size")),
            Binding::Defined(json!("large"))
        );
        assert_eq!(JsonAccessor::lookup(&host, &json!("age")), Binding::Undefined);
    }

    #[test]
    fn test_lookup_array_index() {
        let host = json!([1, 2, 3]);

        assert_eq!(JsonAccessor::lookup(&host, &json!(0)), Binding::Defined(json!(1)));
        assert_eq!(JsonAccessor::lookup(&host, &json!(-1)), Binding::Defined(json!(3)));
        assert_eq!(JsonAccessor::lookup(&host, &json!(-4)), Binding::Undefined);
        assert_eq!(JsonAccessor::lookup(&host, &json!(3)), Binding::Undefined);
    }

    #[test]
    fn test_lookup_helpers() {
        let array = json!(["a", "b"]);
        let string = json!("héllo");

        assert_eq!(JsonAccessor::lookup(&array, &json!("size")), Binding::Defined(json!(2)));
        assert_eq!(JsonAccessor::lookup(&array, &json!("first")), Binding::Defined(json!("a")));
        assert_eq!(JsonAccessor::lookup(&array, &json!("last")), Binding::Defined(json!("b")));
        assert_eq!(JsonAccessor::lookup(&string, &json!("size")), Binding::Defined(json!(5)));
        assert_eq!(JsonAccessor::lookup(&string, &json!("last")), Binding::Defined(json!("o")));
        assert_eq!(JsonAccessor::lookup(&json!(10), &json!("size")), Binding::Undefined);
    }
}
