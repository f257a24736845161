use crate::{
    access::{Accessor, JsonAccessor},
    compile::{compile_with, Template},
    filter::Filter,
    include::Resolver,
    log::{Error, ErrorKind, INVALID_FILTER},
    options::Options,
    render::{
        drive, render_template,
        sink::{BufferedSink, Sink},
        Completion, Context, Encoder, Verbatim,
    },
    syntax::Builder,
    tag::Tag,
    Store,
};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

/// A hook called with every value a template assigns.
type AssignHook = Box<dyn Fn(&str, Value) -> Result<Value, Error> + Send + Sync>;

/// Facilitates compiling and rendering templates, and provides storage
/// for filters, tags and named templates.
///
/// An `Engine` is shared by every render that uses it, and is never
/// modified by a render.
pub struct Engine {
    options: Options,
    syntax: Builder,
    /// Filters that this engine is aware of.
    filters: HashMap<String, Arc<dyn Filter>>,
    /// Custom tags that this engine is aware of.
    tags: HashMap<String, Arc<dyn Tag>>,
    /// Templates that this engine is aware of.
    templates: HashMap<String, Arc<Template>>,
    /// Consulted for templates that are not registered.
    resolver: Option<Box<dyn Resolver>>,
    accessor: Box<dyn Accessor>,
    assign: Option<AssignHook>,
}

impl Engine {
    /// Create a new [`Engine`] with the given [`Options`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::{Engine, Options};
    ///
    /// let engine = Engine::new(Options::default().with_strict_variables(true));
    /// assert!(engine.options().strict_variables);
    /// ```
    pub fn new(options: Options) -> Self {
        Self {
            options,
            syntax: Builder::new(),
            filters: HashMap::new(),
            tags: HashMap::new(),
            templates: HashMap::new(),
            resolver: None,
            accessor: Box::new(JsonAccessor),
            assign: None,
        }
    }

    /// Use the delimiters of the given [`Builder`].
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::{Builder, Engine, Store};
    ///
    /// let engine = Engine::default().with_syntax(Builder::new().with_output("[[", "]]"));
    /// let template = engine.compile("hello, [[ name ]]!").unwrap();
    /// let result = engine.render(&template, &Store::new().with_must("name", "taylor"));
    ///
    /// assert_eq!(result.unwrap(), "hello, taylor!");
    /// ```
    #[inline]
    pub fn with_syntax(mut self, syntax: Builder) -> Self {
        self.syntax = syntax;
        self
    }

    /// Return the [`Options`] of this engine.
    #[inline]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Return the delimiters of this engine.
    #[inline]
    pub fn syntax(&self) -> &Builder {
        &self.syntax
    }

    /// Compile a new [`Template`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when compilation fails, which most likely means the source
    /// contains invalid syntax.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::Engine;
    ///
    /// let engine = Engine::default();
    /// let template = engine.compile("hello, {{ name }}!");
    /// assert!(template.is_ok());
    /// ```
    #[inline]
    pub fn compile<T>(&self, text: T) -> Result<Template, Error>
    where
        T: Into<String>,
    {
        self.compile_template(text.into(), None)
    }

    /// Compile a new [`Template`] with a name, which errors will refer to.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when compilation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::Engine;
    ///
    /// let engine = Engine::default();
    /// let error = engine.compile_named("page.liquid", "{% if a %}").unwrap_err();
    ///
    /// assert_eq!(error.get_name(), Some("page.liquid"));
    /// ```
    #[inline]
    pub fn compile_named<T>(&self, name: &str, text: T) -> Result<Template, Error>
    where
        T: Into<String>,
    {
        self.compile_template(text.into(), Some(name))
    }

    /// Compile a new [`Template`].
    ///
    /// # Panics
    ///
    /// Panics when compilation fails, which most likely means the source
    /// contains invalid syntax.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::Engine;
    ///
    /// let engine = Engine::default();
    /// let template = engine.compile_must("hello, {{ name }}!");
    /// ```
    #[inline]
    pub fn compile_must<T>(&self, text: T) -> Template
    where
        T: Into<String>,
    {
        match self.compile(text) {
            Ok(template) => template,
            Err(error) => panic!("{error:#}"),
        }
    }

    /// Render a [`Template`] with the given [`Store`].
    ///
    /// If a collaborator suspends the render, it is finished on a current
    /// thread runtime. Use [`Engine::render_async`] from asynchronous code.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if rendering fails, which may happen when a [`Filter`] returns
    /// an `Error` itself, or the template cannot be rendered for a reason that will
    /// be described by the `Error`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::{Store, Engine};
    ///
    /// let engine = Engine::default();
    /// let template = engine.compile_must("hello, {{ name }}!");
    /// let result = engine.render(&template, &Store::new().with_must("name", "taylor"));
    ///
    /// assert_eq!(result.unwrap(), "hello, taylor!")
    /// ```
    pub fn render(&self, template: &Template, store: &Store) -> Result<String, Error> {
        let mut context = Context::with_store(self, store);
        let mut output: Vec<u8> = Vec::new();
        let mut sink = BufferedSink::with_capacity(&mut output, self.options.buffer_capacity);
        drive(render_template(
            template,
            &mut context,
            &mut sink,
            &Verbatim,
            false,
        ))?;
        sink.close()?;
        drop(sink);

        into_string(output)
    }

    /// Render a [`Template`] with the given [`Store`], awaiting any
    /// collaborator that suspends.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if rendering fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::{Store, Engine};
    ///
    /// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
    /// let engine = Engine::default();
    /// let template = engine.compile_must("hello, {{ name }}!");
    /// let result = engine
    ///     .render_async(&template, &Store::new().with_must("name", "taylor"))
    ///     .await;
    ///
    /// assert_eq!(result.unwrap(), "hello, taylor!")
    /// # });
    /// ```
    pub async fn render_async(&self, template: &Template, store: &Store) -> Result<String, Error> {
        let mut context = Context::with_store(self, store);
        let mut output: Vec<u8> = Vec::new();
        let mut sink = BufferedSink::with_capacity(&mut output, self.options.buffer_capacity);
        render_template(template, &mut context, &mut sink, &Verbatim, true).await?;
        sink.close_async().await?;
        drop(sink);

        into_string(output)
    }

    /// Render a [`Template`] to a [`Sink`], using and updating the given
    /// [`Context`].
    ///
    /// Every display value is passed through the [`Encoder`]. The returned
    /// [`Completion`] is `Break` or `Continue` when one of those tags ran
    /// outside of a loop.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if rendering fails. Text written before the
    /// failure stays in the sink.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::{Completion, Context, Engine, Html};
    /// use serde_json::json;
    ///
    /// let engine = Engine::default();
    /// let template = engine.compile_must("<p>{{ text }}</p>");
    ///
    /// let mut context = Context::new(&engine);
    /// context.set("text", json!("a < b"));
    ///
    /// let mut output = String::new();
    /// let completion = engine.render_to(&template, &mut context, &mut output, &Html);
    ///
    /// assert_eq!(completion.unwrap(), Completion::Normal);
    /// assert_eq!(output, "<p>a &lt; b</p>");
    /// ```
    pub fn render_to(
        &self,
        template: &Template,
        context: &mut Context<'_>,
        sink: &mut dyn Sink,
        encoder: &dyn Encoder,
    ) -> Result<Completion, Error> {
        drive(render_template(template, context, sink, encoder, false))
    }

    /// Render a [`Template`] to a [`Sink`], awaiting any collaborator that
    /// suspends and writing with [`Sink::write_async`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if rendering fails.
    pub async fn render_to_async(
        &self,
        template: &Template,
        context: &mut Context<'_>,
        sink: &mut dyn Sink,
        encoder: &dyn Encoder,
    ) -> Result<Completion, Error> {
        render_template(template, context, sink, encoder, true).await
    }

    /// Compile and store a new [`Template`] with the given name.
    ///
    /// A `Template` with the same name is replaced.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when compilation fails, which most likely means the source
    /// contains invalid syntax.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::Engine;
    ///
    /// let mut engine = Engine::default();
    /// let result = engine.add_template("template_name", "hello, {{ name }}!");
    /// assert!(result.is_ok());
    ///
    /// let second = engine.add_template("broken", "{% if %}");
    /// assert!(second.is_err());
    /// ```
    pub fn add_template<T>(&mut self, name: &str, text: T) -> Result<(), Error>
    where
        T: Into<String>,
    {
        let template = self.compile_named(name, text)?;
        self.templates.insert(name.to_owned(), Arc::new(template));

        Ok(())
    }

    /// Return the named [`Template`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::Engine;
    ///
    /// let mut engine = Engine::default();
    /// engine.add_template("template_name", "hello, {{ name }}!").unwrap();
    ///
    /// let template = engine.get_template("template_name");
    /// assert!(template.is_some());
    /// ```
    #[inline]
    pub fn get_template(&self, name: &str) -> Option<&Arc<Template>> {
        self.templates.get(name)
    }

    /// Add a [`Filter`].
    ///
    /// # Errors
    ///
    /// If a `Filter` with the given name already exists in the engine, an [`Error`] is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::{json, Value};
    /// use sluice::{Arguments, Context, Engine, Error};
    ///
    /// fn to_lowercase(value: &Value, _: &Arguments, _: &Context) -> Result<Value, Error> {
    ///     match value {
    ///         Value::String(string) => Ok(json!(string.to_lowercase())),
    ///         _ => Err(Error::build("filter `to_lowercase` requires string input")
    ///            .with_help("use quotes to coerce data to string")
    ///         ),
    ///     }
    /// }
    ///
    /// let mut engine = Engine::default();
    /// let result = engine.add_filter("to_lowercase", to_lowercase);
    ///
    /// assert!(result.is_ok());
    /// ```
    pub fn add_filter<T>(&mut self, name: &str, filter: T) -> Result<(), Error>
    where
        T: Filter + 'static,
    {
        if self.filters.contains_key(name) {
            return Err(Error::build(INVALID_FILTER).with_help(format!(
                "filter with name `{name}` already exists in engine, \
                overwrite it with `.add_filter_must`"
            )));
        }
        self.filters.insert(name.to_owned(), Arc::new(filter));

        Ok(())
    }

    /// Add a [`Filter`].
    ///
    /// If a `Filter` with the given name already exists in the [`Engine`], it is overwritten.
    #[inline]
    pub fn add_filter_must<T>(&mut self, name: &str, filter: T)
    where
        T: Filter + 'static,
    {
        self.filters.insert(name.to_owned(), Arc::new(filter));
    }

    /// Add a [`Filter`].
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    ///
    /// # Errors
    ///
    /// If a `Filter` with the given name already exists in the engine, an [`Error`] is returned.
    #[inline]
    pub fn with_filter<T>(mut self, name: &str, filter: T) -> Result<Self, Error>
    where
        T: Filter + 'static,
    {
        self.add_filter(name, filter)?;
        Ok(self)
    }

    /// Add a [`Filter`].
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    ///
    /// If a `Filter` with the given name already exists in the engine, it is overwritten.
    #[inline]
    pub fn with_filter_must<T>(mut self, name: &str, filter: T) -> Self
    where
        T: Filter + 'static,
    {
        self.add_filter_must(name, filter);
        self
    }

    /// Return the filter with the given name, if it exists in Engine.
    #[inline]
    pub fn get_filter(&self, name: &str) -> Option<&dyn Filter> {
        self.filters.get(name).map(|filter| filter.as_ref())
    }

    /// Add a custom [`Tag`].
    ///
    /// Templates compiled afterwards recognize `{% name %}`. A tag with the
    /// same name is replaced.
    #[inline]
    pub fn add_tag<T>(&mut self, name: &str, tag: T)
    where
        T: Tag + 'static,
    {
        self.tags.insert(name.to_owned(), Arc::new(tag));
    }

    /// Add a custom [`Tag`].
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    #[inline]
    pub fn with_tag<T>(mut self, name: &str, tag: T) -> Self
    where
        T: Tag + 'static,
    {
        self.add_tag(name, tag);
        self
    }

    #[inline]
    pub(crate) fn tags(&self) -> &HashMap<String, Arc<dyn Tag>> {
        &self.tags
    }

    /// Set the [`Resolver`] consulted for templates that were not added
    /// with [`Engine::add_template`].
    #[inline]
    pub fn set_resolver<T>(&mut self, resolver: T)
    where
        T: Resolver + 'static,
    {
        self.resolver = Some(Box::new(resolver));
    }

    /// Set the [`Resolver`].
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    #[inline]
    pub fn with_resolver<T>(mut self, resolver: T) -> Self
    where
        T: Resolver + 'static,
    {
        self.set_resolver(resolver);
        self
    }

    #[inline]
    pub(crate) fn resolver(&self) -> Option<&dyn Resolver> {
        self.resolver.as_deref()
    }

    /// Replace the default [`JsonAccessor`] with another [`Accessor`].
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    #[inline]
    pub fn with_accessor<T>(mut self, accessor: T) -> Self
    where
        T: Accessor + 'static,
    {
        self.accessor = Box::new(accessor);
        self
    }

    #[inline]
    pub(crate) fn accessor(&self) -> &dyn Accessor {
        self.accessor.as_ref()
    }

    /// Set a hook that is called with the name and value of every `assign`
    /// and `capture`.
    ///
    /// The hook returns the value to store, or an [`Error`] to reject the
    /// assignment and fail the render.
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::{json, Value};
    /// use sluice::{Engine, Store};
    ///
    /// let engine = Engine::default().with_assign_hook(|_: &str, value: Value| match value {
    ///     Value::String(string) => Ok(json!(string.trim())),
    ///     other => Ok(other),
    /// });
    /// let template = engine.compile_must("{% capture a %}  x  {% endcapture %}[{{ a }}]");
    ///
    /// assert_eq!(engine.render(&template, &Store::new()).unwrap(), "[x]");
    /// ```
    #[inline]
    pub fn with_assign_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, Value) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.assign = Some(Box::new(hook));
        self
    }

    /// Pass an assigned value through the assignment hook.
    pub(crate) fn assign(&self, name: &str, value: Value) -> Result<Value, Error> {
        let Some(hook) = &self.assign else {
            return Ok(value);
        };

        hook(name, value).map_err(|error| match error.kind() {
            ErrorKind::Render => error.with_kind(ErrorKind::Rejected),
            _ => error,
        })
    }

    fn compile_template(&self, source: String, name: Option<&str>) -> Result<Template, Error> {
        let template = compile_with(self, source, name)?;
        debug!(
            template = name.unwrap_or("?"),
            statements = template.block().len(),
            "compiled template"
        );

        Ok(template)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut filters = self.filters.keys().collect::<Vec<_>>();
        filters.sort();
        let mut templates = self.templates.keys().collect::<Vec<_>>();
        templates.sort();

        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("syntax", &self.syntax)
            .field("filters", &filters)
            .field("templates", &templates)
            .finish_non_exhaustive()
    }
}

/// Convert rendered bytes to a `String`.
fn into_string(output: Vec<u8>) -> Result<String, Error> {
    String::from_utf8(output).map_err(|error| {
        Error::build("render produced invalid utf-8")
            .with_kind(ErrorKind::Io)
            .with_help(error.to_string())
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        engine::Engine, log::Error, Arguments, Context, ErrorKind, Options, Store, Template,
    };
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::future::Future;

    #[test]
    fn test_add() {
        let mut engine = Engine::default();
        engine.add_filter_must("faux", faux_filter_a);

        assert!(engine.get_filter("faux").is_some());
        assert!(engine.get_filter("ghost").is_none())
    }

    #[test]
    fn test_add_fluent() {
        assert!(Engine::default()
            .with_filter("faux", faux_filter_a)
            .unwrap()
            .get_filter("faux")
            .is_some());
        assert!(Engine::default().get_filter("ghost").is_none());
    }

    #[test]
    fn test_add_duplicate() {
        assert!(Engine::default()
            .with_filter_must("faux", faux_filter_a)
            .with_filter("faux", faux_filter_a)
            .is_err())
    }

    #[test]
    fn test_add_overwrite() {
        let template_a = Engine::default().compile_must("{{ 1 | faux }}");

        let mut engine = Engine::default().with_filter_must("faux", faux_filter_a);
        assert_eq!(engine.render(&template_a, &Store::new()).unwrap(), "a");

        engine.add_filter_must("faux", faux_filter_b);
        assert_eq!(engine.render(&template_a, &Store::new()).unwrap(), "b");
    }

    #[test]
    fn test_add_template_replaces() {
        let mut engine = Engine::default();
        engine.add_template("part", "one").unwrap();
        engine.add_template("part", "two").unwrap();
        let template = engine.compile_must("{% include 'part' %}");

        assert_eq!(engine.render(&template, &Store::new()).unwrap(), "two");
        assert_eq!(
            engine.get_template("part").and_then(|part| part.name()),
            Some("part")
        );
    }

    #[test]
    fn test_add_template_invalid() {
        let mut engine = Engine::default();
        let error = engine.add_template("broken", "{% for %}").unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Compile);
        assert_eq!(error.get_name(), Some("broken"));
        assert!(engine.get_template("broken").is_none());
    }

    #[test]
    fn test_options_apply() {
        let engine = Engine::new(Options::default().with_strict_filters(true));
        let template = engine.compile_must("{{ 1 | ghost }}");
        let error = engine.render(&template, &Store::new()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::UnknownFilter);
    }

    #[test]
    fn test_render_async_is_send() {
        fn assert_send<T: Future + Send>(_: T) {}

        let engine = Engine::default();
        let template = engine.compile_must("{{ a }}");
        let store = Store::new();
        assert_send(engine.render_async(&template, &store));
    }

    #[test]
    fn test_template_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<Template>();
        assert_send_sync::<Engine>();
    }

    /// A Filter used to test Engine.
    fn faux_filter_a(_: &Value, _: &Arguments, _: &Context) -> Result<Value, Error> {
        Ok(Value::String("a".into()))
    }

    /// A Filter used to test Engine.
    fn faux_filter_b(_: &Value, _: &Arguments, _: &Context) -> Result<Value, Error> {
        Ok(Value::String("b".into()))
    }
}
