//! Delimiters that identify outputs and tags within template text.
//!
//! A [`Builder`] describes the delimiters, and produces the `morel` syntaxes
//! used by the region scanner to find them.
use morel::Syntax;

/// Markers that identify tags and outputs within text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Beginning of an Output, which renders the value of an expression.
    BeginOutput = 0,
    /// End of an Output.
    EndOutput = 1,
    /// Same as BeginOutput, but causes the trailing whitespace of the
    /// preceding text to be removed.
    BeginOutputTrim = 2,
    /// Same as EndOutput, but causes the leading whitespace of the
    /// following text to be removed.
    EndOutputTrim = 3,
    /// Beginning of a Tag, which allows for logical constructs such
    /// as "if", "assign" and "for".
    BeginTag = 4,
    /// End of a Tag.
    EndTag = 5,
    /// Same as BeginTag, but causes the trailing whitespace of the
    /// preceding text to be removed.
    BeginTagTrim = 6,
    /// Same as EndTag, but causes the leading whitespace of the
    /// following text to be removed.
    EndTagTrim = 7,
}

impl Marker {
    /// Return true if the Marker opens a region.
    pub fn is_opening(self) -> bool {
        matches!(
            self,
            Marker::BeginOutput | Marker::BeginOutputTrim | Marker::BeginTag | Marker::BeginTagTrim
        )
    }

    /// Return true if the Marker carries the trim character.
    pub fn is_trim(self) -> bool {
        matches!(
            self,
            Marker::BeginOutputTrim | Marker::EndOutputTrim | Marker::BeginTagTrim | Marker::EndTagTrim
        )
    }

    /// Return true if the Marker belongs to an output, as opposed to a tag.
    pub fn is_output(self) -> bool {
        matches!(
            self,
            Marker::BeginOutput | Marker::EndOutput | Marker::BeginOutputTrim | Marker::EndOutputTrim
        )
    }
}

impl From<usize> for Marker {
    fn from(value: usize) -> Self {
        match value {
            0 => Self::BeginOutput,
            1 => Self::EndOutput,
            2 => Self::BeginOutputTrim,
            3 => Self::EndOutputTrim,
            4 => Self::BeginTag,
            5 => Self::EndTag,
            6 => Self::BeginTagTrim,
            7 => Self::EndTagTrim,
            _ => unreachable!(),
        }
    }
}

impl From<Marker> for usize {
    fn from(k: Marker) -> Self {
        k as usize
    }
}

/// Provides methods to build the delimiters used by an [`Engine`][`crate::Engine`].
///
/// # Example
///
/// ```
/// use sluice::Builder;
///
/// let builder = Builder::new()
///     .with_output("[[", "]]")
///     .with_tag("[%", "%]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Builder {
    output: (String, String),
    tag: (String, String),
    trim: char,
}

impl Builder {
    /// Create a new [`Builder`].
    ///
    /// The `Builder` has default markers:
    ///
    /// ```text
    /// Outputs: {{ name }}
    /// Tags: {% if ... %}
    /// Whitespace:
    ///     Output: {{- name -}}
    ///     Tag:  {%- if ... -%}
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self {
            output: ("{{".into(), "}}".into()),
            tag: ("{%".into(), "%}".into()),
            trim: '-',
        }
    }

    /// Set the output markers.
    #[inline]
    pub fn set_output(&mut self, begin: &str, end: &str) {
        self.output = (begin.into(), end.into());
    }

    /// Set the output markers.
    ///
    /// Returns the [`Builder`], so additional methods may be chained.
    #[inline]
    pub fn with_output(mut self, begin: &str, end: &str) -> Self {
        self.set_output(begin, end);

        self
    }

    /// Set the tag markers.
    #[inline]
    pub fn set_tag(&mut self, begin: &str, end: &str) {
        self.tag = (begin.into(), end.into());
    }

    /// Set the tag markers.
    ///
    /// Returns the [`Builder`], so additional methods may be chained.
    #[inline]
    pub fn with_tag(mut self, begin: &str, end: &str) -> Self {
        self.set_tag(begin, end);

        self
    }

    /// Set the whitespace trim character.
    #[inline]
    pub fn set_trim(&mut self, character: char) {
        self.trim = character;
    }

    /// Set the whitespace trim character.
    ///
    /// Returns the [`Builder`], so additional methods may be chained.
    #[inline]
    pub fn with_trim(mut self, character: char) -> Self {
        self.set_trim(character);

        self
    }

    /// Return a Syntax containing only the markers that open a region.
    pub fn to_opening_syntax(&self) -> Syntax {
        Syntax::new(
            self.markers()
                .into_iter()
                .filter(|(id, _)| Marker::from(*id).is_opening())
                .collect(),
        )
    }

    /// Return a Syntax instance from every marker in this [`Builder`].
    pub fn to_syntax(&self) -> Syntax {
        Syntax::new(self.markers())
    }

    fn markers(&self) -> Vec<(usize, String)> {
        let mut markers = Vec::new();
        let (left_output, right_output) = &self.output;
        let (left_tag, right_tag) = &self.tag;
        let trim = self.trim;

        markers.push((Marker::BeginOutput.into(), left_output.clone()));
        markers.push((Marker::EndOutput.into(), right_output.clone()));
        markers.push((
            Marker::BeginOutputTrim.into(),
            format!("{left_output}{trim}"),
        ));
        markers.push((
            Marker::EndOutputTrim.into(),
            format!("{trim}{right_output}"),
        ));
        markers.push((Marker::BeginTag.into(), left_tag.clone()));
        markers.push((Marker::EndTag.into(), right_tag.clone()));
        markers.push((Marker::BeginTagTrim.into(), format!("{left_tag}{trim}")));
        markers.push((Marker::EndTagTrim.into(), format!("{trim}{right_tag}")));

        markers
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{Builder, Marker};

    #[test]
    fn test_marker_round_trip() {
        for id in 0..8 {
            let marker = Marker::from(id);
            assert_eq!(usize::from(marker), id);
        }
    }

    #[test]
    fn test_marker_classes() {
        assert!(Marker::BeginTagTrim.is_opening());
        assert!(Marker::BeginTagTrim.is_trim());
        assert!(!Marker::EndTag.is_opening());
        assert!(Marker::EndOutputTrim.is_output());
    }

    #[test]
    fn test_custom_markers() {
        let builder = Builder::new().with_tag("[%", "%]").with_trim('~');
        let markers = builder.markers();

        assert!(markers.contains(&(Marker::BeginTagTrim.into(), "[%~".to_string())));
        assert!(markers.contains(&(Marker::EndOutputTrim.into(), "~}}".to_string())));
    }
}
