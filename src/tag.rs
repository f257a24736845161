//! Tags registered by the host.
//!
//! A custom tag is written like any built-in tag, `{% name argument %}`.
//! The argument is an optional expression, evaluated before the tag is
//! called. A [`TagKind::Block`] tag also has a body closed by `end<name>`,
//! which is rendered to a string and passed to the tag.
use crate::{outcome::Outcome, render::Context};
use serde_json::Value;

/// Describes whether a [`Tag`] has a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagKind {
    /// `{% name %}`, without a body.
    #[default]
    Inline,
    /// `{% name %}...{% endname %}`.
    Block,
}

/// A tag implemented by the host.
///
/// The returned string is written to the output without encoding.
///
/// # Examples
///
/// ```
/// use serde_json::Value;
/// use sluice::{Context, Engine, Outcome, Store, Tag, TagKind};
///
/// struct Shout;
///
/// impl Tag for Shout {
///     fn kind(&self) -> TagKind {
///         TagKind::Block
///     }
///
///     fn render(&self, _: Option<&Value>, body: Option<&str>, _: &Context) -> Outcome<String> {
///         Outcome::ready(body.unwrap_or_default().to_uppercase())
///     }
/// }
///
/// let engine = Engine::default().with_tag("shout", Shout);
/// let template = engine.compile("{% shout %}hello, {{ name }}{% endshout %}").unwrap();
/// let result = engine.render(&template, &Store::new().with_must("name", "taylor"));
///
/// assert_eq!(result.unwrap(), "HELLO, TAYLOR");
/// ```
pub trait Tag: Send + Sync {
    /// Return whether the tag has a body.
    fn kind(&self) -> TagKind {
        TagKind::Inline
    }

    /// Return the text written in place of the tag.
    ///
    /// `argument` is the evaluated argument, if the tag was given one.
    /// `body` is the rendered body of a [`TagKind::Block`] tag.
    fn render(
        &self,
        argument: Option<&Value>,
        body: Option<&str>,
        context: &Context,
    ) -> Outcome<String>;
}
