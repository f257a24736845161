use super::{Pointer, RED, RESET};
use crate::{log::Visual, region::Region};
use std::fmt::{Debug, Display, Formatter, Result};

/// Broad category of an [`Error`].
///
/// Every `Error` carries exactly one kind, so callers can react to a step
/// ceiling differently from a typo in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The template source could not be compiled.
    Compile,
    /// Rendering failed for a reason not covered by a more specific kind.
    Render,
    /// The render executed more statements than `max_steps` allows.
    StepLimit,
    /// Nested blocks or inclusions exceeded `max_recursion`.
    RecursionLimit,
    /// A variable was not found while `strict_variables` is enabled.
    UndefinedVariable,
    /// A filter was not found while `strict_filters` is enabled.
    UnknownFilter,
    /// The assignment hook refused a value.
    Rejected,
    /// A filter returned an error.
    Filter,
    /// An included template could not be resolved.
    Include,
    /// Writing to the output destination failed.
    Io,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            ErrorKind::Compile => write!(f, "compile"),
            ErrorKind::Render => write!(f, "render"),
            ErrorKind::StepLimit => write!(f, "step limit"),
            ErrorKind::RecursionLimit => write!(f, "recursion limit"),
            ErrorKind::UndefinedVariable => write!(f, "undefined variable"),
            ErrorKind::UnknownFilter => write!(f, "unknown filter"),
            ErrorKind::Rejected => write!(f, "rejected"),
            ErrorKind::Filter => write!(f, "filter"),
            ErrorKind::Include => write!(f, "include"),
            ErrorKind::Io => write!(f, "io"),
        }
    }
}

/// Describes an error, and allows adding a contextual help text and visualization.
///
/// # Examples
///
/// Creating an [`Error`] that includes a [`Visual`] of type [`Pointer`]:
///
/// ```
/// use sluice::{Error, Region};
///
/// let error = Error::build("unexpected keyword")
///     .with_pointer("{% update name %}", Region::new(3..9))
///     .with_name("template.liquid")
///     .with_help("expected one of `if`, `for`, `assign`");
///
/// assert_eq!(error.to_string(), "\u{1b}[31merror\u{1b}[0m: unexpected keyword");
/// ```
///
/// When printed with `println!("{:#}", error)` the [`Error`] produces this output:
///
/// ```text
/// error: unexpected keyword
///   --> template.liquid:1:4
///    |
///  1 | {% update name %}
///    |    ^^^^^^
///    |
///   = help: expected one of `if`, `for`, `assign`
/// ```
pub struct Error {
    /// Category of the [`Error`].
    kind: ErrorKind,
    /// Describes the cause of the [`Error`].
    reason: String,
    /// A visualization to help illustrate the [`Error`].
    visual: Option<Box<dyn Visual>>,
    /// Additional information to display with the [`Error`].
    help: Option<String>,
    /// The name of the Template that the [`Error`] comes from.
    name: Option<String>,
}

impl Error {
    /// Create a new [`Error`] of kind [`ErrorKind::Render`] with the given
    /// reason text.
    ///
    /// The additional fields may be populated using the various methods
    /// defined on `Error`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::Error;
    ///
    /// Error::build("unexpected keyword")
    ///     .with_help("expected `if`, `for` or `assign`, found `...`");
    /// ```
    pub fn build<T>(reason: T) -> Self
    where
        T: Into<String>,
    {
        Error {
            kind: ErrorKind::Render,
            reason: reason.into(),
            name: None,
            visual: None,
            help: None,
        }
    }

    /// Create a new [`Error`] of kind [`ErrorKind::Compile`].
    pub fn compile<T>(reason: T) -> Self
    where
        T: Into<String>,
    {
        Self::build(reason).with_kind(ErrorKind::Compile)
    }

    /// Set the [`ErrorKind`].
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;

        self
    }

    /// Set the reason text, which is a short summary of the [`Error`].
    pub fn with_reason<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.reason = text.into();

        self
    }

    /// Set the name text, which is the name of the [`Template`][`crate::Template`]
    /// that the [`Error`] is related to.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::Error;
    ///
    /// let error = Error::build("unexpected keyword").with_name("header.liquid");
    /// assert_eq!(error.get_name(), Some("header.liquid"));
    /// ```
    pub fn with_name<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.name = Some(text.into());

        self
    }

    /// Set the name text only when no name was set before.
    ///
    /// Errors raised inside an included template keep the name of the
    /// template they come from.
    pub fn or_name(mut self, name: Option<&str>) -> Self {
        if self.name.is_none() {
            self.name = name.map(str::to_owned);
        }

        self
    }

    /// Set the [`Visual`], which is a visualization that helps illustrate the
    /// cause of the error.
    pub fn with_visual(mut self, visual: impl Visual + 'static) -> Self {
        self.visual = Some(Box::new(visual));

        self
    }

    /// Set the visualization to a new [`Pointer`] with the given source text and
    /// [`Region`].
    ///
    /// This is a shortcut method for creating a `Pointer` yourself and then
    /// setting it to the `with_visual` method.
    pub fn with_pointer<T>(mut self, source: &str, region: T) -> Self
    where
        T: Into<Region>,
    {
        self.visual = Some(Box::new(Pointer::new(source, region.into())));

        self
    }

    /// Set a [`Pointer`] only when the [`Error`] has no visualization yet.
    ///
    /// Used to attach a location to errors returned by host code, such as a
    /// filter, without overwriting one the host chose itself.
    pub fn or_pointer<T>(self, source: &str, region: T) -> Self
    where
        T: Into<Region>,
    {
        if self.visual.is_some() {
            return self;
        }

        self.with_pointer(source, region)
    }

    /// Set the help text, which is contextual information to accompany the
    /// reason text.
    pub fn with_help<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.help = Some(text.into());

        self
    }

    /// Return the [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return the reason text.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Return the help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Return the one-indexed line and column the error points to, if known.
    pub fn location(&self) -> Option<(usize, usize)> {
        self.visual.as_ref().and_then(|visual| visual.location())
    }

    /// Return the name of the `Template` that the error is related to.
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if !f.alternate() {
            writeln!(f, "{self:#}")?;
        }
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("reason", &self.reason)
            .field("name", &self.name)
            .field("visual", &self.visual)
            .field("help", &self.help)
            .finish()?;

        Ok(())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let header = format!("{RED}error{RESET}");
        write!(f, "{header}: {}", self.reason)?;

        if f.alternate() {
            if let Some(visual) = &self.visual {
                return visual.display(f, self.name.as_deref(), self.help.as_deref());
            }
            if let Some(help) = &self.help {
                write!(f, "\n = help: {help}")?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.reason == other.reason
            && self.help == other.help
            && self.name == other.name
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::build("write failure")
            .with_kind(ErrorKind::Io)
            .with_help(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};

    #[test]
    fn test_alternate_display_includes_pointer() {
        let error = Error::compile("unexpected token")
            .with_pointer("hello {{ name | }}", 15..16)
            .with_name("greeting")
            .with_help("expected a filter name");
        let shown = format!("{error:#}");

        assert!(shown.contains("unexpected token"));
        assert!(shown.contains("greeting:1:16"));
        assert!(shown.contains("help: expected a filter name"));
        assert_eq!(error.kind(), ErrorKind::Compile);
    }

    #[test]
    fn test_or_name_keeps_existing() {
        let error = Error::build("boom").with_name("inner").or_name(Some("outer"));
        assert_eq!(error.get_name(), Some("inner"));

        let error = Error::build("boom").or_name(Some("outer"));
        assert_eq!(error.get_name(), Some("outer"));
    }

    #[test]
    fn test_io_conversion() {
        let error: Error = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();

        assert_eq!(error.kind(), ErrorKind::Io);
        assert_eq!(error.help(), Some("disk full"));
    }
}
