use crate::log::Error;
use serde::Deserialize;

/// Requests whitespace trimming next to regions that do not carry the trim marker.
///
/// A region whose delimiter carries the trim marker, such as `{%-`, is always
/// trimmed on that side regardless of these flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Trimming {
    /// Trim the text before every tag.
    pub tag_left: bool,
    /// Trim the text after every tag.
    pub tag_right: bool,
    /// Trim the text before every output.
    pub output_left: bool,
    /// Trim the text after every output.
    pub output_right: bool,
}

impl Trimming {
    /// Return the left and right trim flags for a tag or an output.
    pub(crate) fn sides(&self, output: bool) -> (bool, bool) {
        if output {
            (self.output_left, self.output_right)
        } else {
            (self.tag_left, self.tag_right)
        }
    }
}

/// Settings shared by every compile and render of an [`Engine`][`crate::Engine`].
///
/// Every field has a default, so a partial JSON document is enough to
/// load an `Options`.
///
/// # Examples
///
/// ```
/// use sluice::Options;
///
/// let options = Options::from_json(r#"{ "strict_variables": true, "max_steps": 500 }"#).unwrap();
///
/// assert!(options.strict_variables);
/// assert_eq!(options.max_steps, 500);
/// assert_eq!(options.max_recursion, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Global whitespace trimming.
    pub trimming: Trimming,
    /// When true, trimming removes every whitespace character up to the region.
    ///
    /// When false, trimming removes spaces and tabs on the same line and
    /// at most one line break.
    pub greedy: bool,
    /// Fail the render when a variable cannot be resolved.
    pub strict_variables: bool,
    /// Fail the render when a filter is not registered.
    pub strict_filters: bool,
    /// Number of statements a single render may execute, zero disables the limit.
    pub max_steps: usize,
    /// Depth of nested loops, captures, custom blocks and inclusions.
    pub max_recursion: usize,
    /// Locale made available to filters through [`Context::options`][`crate::Context::options`].
    ///
    /// Output of `{{ }}` does not depend on it, numbers are always written
    /// with a `.` separator and no grouping.
    pub locale: String,
    /// Time zone made available to filters, output does not depend on it.
    pub time_zone: String,
    /// Capacity in bytes of the output buffer used by [`Engine::render`][`crate::Engine::render`].
    pub buffer_capacity: usize,
}

impl Options {
    /// Create a new [`Options`] with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an [`Options`] from JSON text.
    ///
    /// Missing fields keep their default values.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the text is not valid JSON, or a field has
    /// the wrong type.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|error| {
            Error::build("invalid options")
                .with_help(format!("options could not be read from json: {error}"))
        })
    }

    /// Set the global whitespace trimming.
    ///
    /// Returns the [`Options`], so additional methods may be chained.
    #[inline]
    pub fn with_trimming(mut self, trimming: Trimming) -> Self {
        self.trimming = trimming;

        self
    }

    /// Set greedy trimming.
    #[inline]
    pub fn with_greedy(mut self, greedy: bool) -> Self {
        self.greedy = greedy;

        self
    }

    /// Set strict variables.
    #[inline]
    pub fn with_strict_variables(mut self, strict: bool) -> Self {
        self.strict_variables = strict;

        self
    }

    /// Set strict filters.
    #[inline]
    pub fn with_strict_filters(mut self, strict: bool) -> Self {
        self.strict_filters = strict;

        self
    }

    /// Set the step limit, zero disables it.
    #[inline]
    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps;

        self
    }

    /// Set the recursion limit.
    #[inline]
    pub fn with_max_recursion(mut self, depth: usize) -> Self {
        self.max_recursion = depth;

        self
    }

    /// Set the locale.
    #[inline]
    pub fn with_locale<T>(mut self, locale: T) -> Self
    where
        T: Into<String>,
    {
        self.locale = locale.into();

        self
    }

    /// Set the time zone.
    #[inline]
    pub fn with_time_zone<T>(mut self, time_zone: T) -> Self
    where
        T: Into<String>,
    {
        self.time_zone = time_zone.into();

        self
    }

    /// Set the output buffer capacity.
    #[inline]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;

        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            trimming: Trimming::default(),
            greedy: true,
            strict_variables: false,
            strict_filters: false,
            max_steps: 0,
            max_recursion: 100,
            locale: "en-US".into(),
            time_zone: "UTC".into(),
            buffer_capacity: 8192,
        }
    }
}
