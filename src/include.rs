//! Resolution of templates named by `include` and `render`.
use crate::{compile::Template, engine::Engine, outcome::Outcome};
use std::sync::Arc;

/// Finds the [`Template`] for a name used by `include` or `render`.
///
/// An [`Engine`] first checks the templates added with
/// [`add_template`][`Engine::add_template`], and only asks its resolver
/// when no template of that name exists. Returning `None` fails the render
/// with [`ErrorKind::Include`][`crate::ErrorKind::Include`].
///
/// # Examples
///
/// ```
/// use sluice::{Engine, Outcome, Resolver, Store, Template};
/// use std::sync::Arc;
///
/// struct Greeting;
///
/// impl Resolver for Greeting {
///     fn resolve(&self, path: &str, engine: &Engine) -> Outcome<Option<Arc<Template>>> {
///         match path {
///             "greeting" => engine
///                 .compile_named(path, "hello, {{ name }}")
///                 .map(|template| Some(Arc::new(template)))
///                 .into(),
///             _ => Outcome::ready(None),
///         }
///     }
/// }
///
/// let engine = Engine::default().with_resolver(Greeting);
/// let template = engine.compile("{% include 'greeting' %}!").unwrap();
/// let result = engine.render(&template, &Store::new().with_must("name", "taylor"));
///
/// assert_eq!(result.unwrap(), "hello, taylor!");
/// ```
pub trait Resolver: Send + Sync {
    /// Return the template named by `path`, or `None` if it does not exist.
    fn resolve(&self, path: &str, engine: &Engine) -> Outcome<Option<Arc<Template>>>;
}

/// Allows any function matching the signature of `resolve` to be used as a
/// [`Resolver`].
impl<F> Resolver for F
where
    F: Fn(&str, &Engine) -> Outcome<Option<Arc<Template>>> + Send + Sync,
{
    #[inline]
    fn resolve(&self, path: &str, engine: &Engine) -> Outcome<Option<Arc<Template>>> {
        self(path, engine)
    }
}
