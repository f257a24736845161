use serde_json::Value;
use std::borrow::Cow;

/// Transforms display text before it is written to the output.
///
/// The encoder is applied to the result of every `{{ }}` output, `echo` and
/// `cycle`. Literal text, `raw` blocks and the output of custom tags are
/// written as they are.
pub trait Encoder: Send + Sync {
    /// Return the encoded form of the text.
    fn encode<'a>(&self, text: &'a str) -> Cow<'a, str>;
}

/// An [`Encoder`] that returns text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl Encoder for Verbatim {
    #[inline]
    fn encode<'a>(&self, text: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(text)
    }
}

/// An [`Encoder`] that escapes the characters HTML gives meaning to.
///
/// # Examples
///
/// ```
/// use sluice::{Encoder, Html};
///
/// assert_eq!(
///     Html.encode("<b>\"Tom\" & 'Jerry'</b>"),
///     "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Html;

impl Encoder for Html {
    fn encode<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !text.contains(&['&', '<', '>', '"', '\''][..]) {
            return Cow::Borrowed(text);
        }

        let mut buffer = String::with_capacity(text.len() + text.len() / 8);
        for char in text.chars() {
            match char {
                '&' => buffer.push_str("&amp;"),
                '<' => buffer.push_str("&lt;"),
                '>' => buffer.push_str("&gt;"),
                '"' => buffer.push_str("&quot;"),
                '\'' => buffer.push_str("&#39;"),
                other => buffer.push(other),
            }
        }

        Cow::Owned(buffer)
    }
}

/// Return the display text of a [`Value`].
///
/// Nil is empty, arrays concatenate the text of their elements and objects
/// are written as JSON. The text is the same for every locale.
pub fn to_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(string) => Cow::Borrowed(string),
        Value::Null => Cow::Borrowed(""),
        other => {
            let mut buffer = String::new();
            write_value(&mut buffer, other);

            Cow::Owned(buffer)
        }
    }
}

/// Write the display text of a [`Value`] to the buffer.
fn write_value(buffer: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(bool) => buffer.push_str(if *bool { "true" } else { "false" }),
        Value::Number(number) => buffer.push_str(&number.to_string()),
        Value::String(string) => buffer.push_str(string),
        Value::Array(array) => {
            for item in array {
                write_value(buffer, item);
            }
        }
        Value::Object(_) => buffer.push_str(&value.to_string()),
    }
}
