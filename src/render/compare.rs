use crate::{
    compile::Operator,
    log::{Error, INCOMPATIBLE_TYPES},
    render::display::to_text,
};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Return true if the given [`Value`] is truthy.
///
/// Only `false` and nil are falsy.
#[inline]
pub fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Bool(false) | Value::Null)
}

/// Return true if the given [`Value`] matches the `empty` operand.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(string) => string.is_empty(),
        Value::Array(array) => array.is_empty(),
        Value::Object(object) => object.is_empty(),
        _ => false,
    }
}

/// Return true if the given [`Value`] matches the `blank` operand.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(string) => string.trim().is_empty(),
        other => is_empty(other),
    }
}

/// Return true if the two [`Value`] instances are equal.
///
/// Numbers compare by value, so `1` equals `1.0`.
pub fn is_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            compare_numbers(left, right) == Some(Ordering::Equal)
        }
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right)
                    .all(|(left, right)| is_equal(left, right))
        }
        (left, right) => left == right,
    }
}

/// Compare the two [`Value`] instances with an ordering [`Operator`].
///
/// Pairs that cannot be ordered, such as nil against a number or a string
/// against a boolean, compare false.
///
/// # Errors
///
/// Returns an [`Error`] if the operator does not order values.
pub fn compare_values(left: &Value, operator: Operator, right: &Value) -> Result<bool, Error> {
    let ordering = match (left, right) {
        (Value::Number(left), Value::Number(right)) => compare_numbers(left, right),
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        (Value::Bool(left), Value::Bool(right)) => Some(left.cmp(right)),
        _ => None,
    };

    let Some(ordering) = ordering else {
        return match operator {
            Operator::Greater
            | Operator::Lesser
            | Operator::GreaterOrEqual
            | Operator::LesserOrEqual
            | Operator::Equal => Ok(false),
            Operator::NotEqual => Ok(true),
            unsupported => Err(error_not_ordering(unsupported)),
        };
    };

    let result = match operator {
        Operator::Greater => ordering == Ordering::Greater,
        Operator::Lesser => ordering == Ordering::Less,
        Operator::GreaterOrEqual => ordering != Ordering::Less,
        Operator::LesserOrEqual => ordering != Ordering::Greater,
        Operator::Equal => ordering == Ordering::Equal,
        Operator::NotEqual => ordering != Ordering::Equal,
        unsupported => return Err(error_not_ordering(unsupported)),
    };

    Ok(result)
}

/// Return true if `left` contains `right`.
///
/// Strings contain substrings, arrays contain elements and objects contain
/// keys. Any other combination is false.
pub fn contains(left: &Value, right: &Value) -> bool {
    match left {
        Value::String(string) => string.contains(to_text(right).as_ref()),
        Value::Array(array) => array.iter().any(|item| is_equal(item, right)),
        Value::Object(object) => right.as_str().is_some_and(|key| object.contains_key(key)),
        _ => false,
    }
}

/// Return true if `left` starts with `right`.
///
/// Arrays start with their first element.
pub fn starts_with(left: &Value, right: &Value) -> bool {
    match left {
        Value::String(string) => string.starts_with(to_text(right).as_ref()),
        Value::Array(array) => array.first().is_some_and(|first| is_equal(first, right)),
        _ => false,
    }
}

/// Return true if `left` ends with `right`.
///
/// Arrays end with their last element.
pub fn ends_with(left: &Value, right: &Value) -> bool {
    match left {
        Value::String(string) => string.ends_with(to_text(right).as_ref()),
        Value::Array(array) => array.last().is_some_and(|last| is_equal(last, right)),
        _ => false,
    }
}

/// Apply an arithmetic [`Operator`] to the two [`Value`] instances.
///
/// Two integers produce an integer, any other pair of numbers produces a
/// float. `+` concatenates when either side is a string. Nil is treated
/// as `0` next to a number, and two nil operands produce nil.
///
/// # Errors
///
/// Returns an [`Error`] on mismatched types, division by zero or overflow.
pub fn arithmetic(left: &Value, operator: Operator, right: &Value) -> Result<Value, Error> {
    let zero = Value::from(0);
    match (left, right) {
        (Value::String(_), _) | (_, Value::String(_)) if operator == Operator::Add => {
            Ok(Value::String(format!("{}{}", to_text(left), to_text(right))))
        }
        (Value::Null, Value::Null) => Ok(Value::Null),
        (Value::Null, Value::Number(_)) => arithmetic(&zero, operator, right),
        (Value::Number(_), Value::Null) => arithmetic(left, operator, &zero),
        (Value::Number(left), Value::Number(right)) => match (left.as_i64(), right.as_i64()) {
            (Some(left), Some(right)) => integer_arithmetic(left, operator, right),
            _ => float_arithmetic(
                left.as_f64().unwrap_or_default(),
                operator,
                right.as_f64().unwrap_or_default(),
            ),
        },
        (left, right) => Err(Error::build(INCOMPATIBLE_TYPES).with_help(format!(
            "operator `{operator}` is invalid on types `{}` and `{}`",
            type_name(left),
            type_name(right)
        ))),
    }
}

fn integer_arithmetic(left: i64, operator: Operator, right: i64) -> Result<Value, Error> {
    if right == 0 && matches!(operator, Operator::Divide | Operator::Modulo) {
        return Err(error_division_by_zero());
    }

    let result = match operator {
        Operator::Add => left.checked_add(right),
        Operator::Subtract => left.checked_sub(right),
        Operator::Multiply => left.checked_mul(right),
        // Rounds toward negative infinity.
        Operator::Divide => left.checked_div(right).map(|quotient| {
            if left % right != 0 && (left < 0) != (right < 0) {
                quotient - 1
            } else {
                quotient
            }
        }),
        // Takes the sign of the divisor.
        Operator::Modulo => left
            .checked_rem(right)
            .map(|rem| if rem != 0 && (rem < 0) != (right < 0) { rem + right } else { rem }),
        unsupported => return Err(error_not_arithmetic(unsupported)),
    };

    result.map(Value::from).ok_or_else(|| {
        Error::build("arithmetic overflow")
            .with_help(format!("`{left} {operator} {right}` does not fit in a 64-bit integer"))
    })
}

fn float_arithmetic(left: f64, operator: Operator, right: f64) -> Result<Value, Error> {
    if right == 0.0 && matches!(operator, Operator::Divide | Operator::Modulo) {
        return Err(error_division_by_zero());
    }

    let result = match operator {
        Operator::Add => left + right,
        Operator::Subtract => left - right,
        Operator::Multiply => left * right,
        Operator::Divide => left / right,
        Operator::Modulo => left.rem_euclid(right),
        unsupported => return Err(error_not_arithmetic(unsupported)),
    };

    Number::from_f64(result)
        .map(Value::Number)
        .ok_or_else(|| Error::build(format!("arithmetic produced `{result}`")))
}

fn compare_numbers(left: &Number, right: &Number) -> Option<Ordering> {
    match (left.as_i64(), right.as_i64()) {
        (Some(left), Some(right)) => Some(left.cmp(&right)),
        _ => left.as_f64()?.partial_cmp(&right.as_f64()?),
    }
}

fn error_division_by_zero() -> Error {
    Error::build("division by zero")
}

fn error_not_ordering(operator: Operator) -> Error {
    Error::build(INCOMPATIBLE_TYPES)
        .with_help(format!("operator `{operator}` does not order values"))
}

fn error_not_arithmetic(operator: Operator) -> Error {
    Error::build(INCOMPATIBLE_TYPES)
        .with_help(format!("operator `{operator}` is not an arithmetic operator"))
}

/// Return the name of the type of a [`Value`], for error messages.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{arithmetic, compare_values, contains, is_blank, is_empty, is_equal, is_truthy};
    use crate::{compile, compile::Operator, render, Store};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    #[test]
    fn test_truthy_values() {
        let template = compile("{% if value %}a{% else %}b{% endif %}").unwrap();
        let true_values = vec![
            json!("lorem"),
            json!(""),
            json!(0),
            json!(-12),
            json!(true),
            json!([]),
            json!({}),
        ];

        let mut store = Store::new();
        for value in true_values {
            assert!(is_truthy(&value));
            store.insert_must("value", value);
            assert_eq!(render(&template, &store).unwrap(), "a");
        }

        for value in [json!(false), Value::Null] {
            store.insert_must("value", value);
            assert_eq!(render(&template, &store).unwrap(), "b");
        }
        assert_eq!(render(&template, &Store::new()).unwrap(), "b");
    }

    #[test]
    fn test_empty_and_blank() {
        assert!(is_empty(&json!("")));
        assert!(is_empty(&json!([])));
        assert!(!is_empty(&Value::Null));
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!(false)));
        assert!(is_blank(&json!(" \n")));
        assert!(!is_blank(&json!(0)));
    }

    #[test]
    fn test_equal_numbers() {
        assert!(is_equal(&json!(1), &json!(1.0)));
        assert!(is_equal(&json!([1, 2]), &json!([1.0, 2])));
        assert!(!is_equal(&json!(1), &json!("1")));
    }

    #[test]
    fn test_compare_unordered_is_false() {
        assert_eq!(compare_values(&json!("hello"), Operator::Greater, &json!(true)), Ok(false));
        assert_eq!(compare_values(&Value::Null, Operator::Lesser, &json!(1)), Ok(false));
        assert_eq!(compare_values(&json!("x"), Operator::GreaterOrEqual, &json!(1)), Ok(false));
        assert_eq!(compare_values(&json!(2), Operator::Greater, &json!(1.5)), Ok(true));
        assert_eq!(compare_values(&json!("a"), Operator::LesserOrEqual, &json!("b")), Ok(true));
        assert!(compare_values(&json!(1), Operator::Add, &json!(2)).is_err());
    }

    #[test]
    fn test_compare_undefined_in_template() {
        let template = compile(
            "{% if missing > 1 %}a{% else %}b{% endif %}\
            {% if 'x' < 1 %}c{% else %}d{% endif %}\
            {% if missing <= 1 %}e{% else %}f{% endif %}",
        )
        .unwrap();

        assert_eq!(render(&template, &Store::new()).unwrap(), "bdf");
    }

    #[test]
    fn test_contains() {
        assert!(contains(&json!("lorem ipsum"), &json!("ipsum")));
        assert!(contains(&json!([1, 2, 3]), &json!(2)));
        assert!(contains(&json!({"a": 1}), &json!("a")));
        assert!(!contains(&json!(12), &json!(1)));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(arithmetic(&json!(7), Operator::Divide, &json!(2)), Ok(json!(3)));
        assert_eq!(arithmetic(&json!(-7), Operator::Divide, &json!(2)), Ok(json!(-4)));
        assert_eq!(arithmetic(&json!(-7), Operator::Modulo, &json!(3)), Ok(json!(2)));
        assert_eq!(arithmetic(&json!(1.5), Operator::Multiply, &json!(2)), Ok(json!(3.0)));
        assert_eq!(arithmetic(&json!("a"), Operator::Add, &json!(1)), Ok(json!("a1")));
        assert!(arithmetic(&json!(1), Operator::Divide, &json!(0)).is_err());
        assert!(arithmetic(&json!(true), Operator::Add, &json!(false)).is_err());
        assert_eq!(arithmetic(&Value::Null, Operator::Add, &json!(1)), Ok(json!(1)));
        assert_eq!(arithmetic(&json!(3), Operator::Subtract, &Value::Null), Ok(json!(3)));
        assert_eq!(arithmetic(&Value::Null, Operator::Multiply, &Value::Null), Ok(Value::Null));
        assert!(arithmetic(&json!(1), Operator::Divide, &Value::Null).is_err());
        assert!(arithmetic(&json!(i64::MAX), Operator::Add, &json!(1)).is_err());
    }

    #[test]
    fn test_arithmetic_in_template() {
        let template =
            compile("{{ 2 + 3 * 4 }} {{ (2 + 3) * 4 }} {{ 10 / 4.0 }} {{ missing + 1 }}").unwrap();

        assert_eq!(render(&template, &Store::new()).unwrap(), "14 20 2.5 1");
    }
}
