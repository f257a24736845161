pub mod sink;

mod compare;
mod context;
mod display;
mod scope;

pub use context::Context;
pub use display::{Encoder, Html, Verbatim};

use crate::{
    access::Binding,
    compile::{
        tree::{
            Binary, Call, Constant, Expression, For, Include, Literal, Mode, Pass, Path, Range,
            Segment, Statement,
        },
        Operator, Template,
    },
    filter::Arguments,
    log::{error_missing_template, Error, ErrorKind, INVALID_FILTER, UNDEFINED_VARIABLE},
    outcome::Outcome,
    render::{
        compare::{
            arithmetic, compare_values, contains, ends_with, is_blank, is_empty, is_equal,
            is_truthy, starts_with,
        },
        display::to_text,
        scope::Scope,
        sink::Sink,
    },
    Engine, Store,
};
use serde_json::{json, Value};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{self, Poll, Wake, Waker},
};
use tokio::runtime::Handle;
use tracing::{debug, trace};

/// Name of the variable that describes the current loop.
const FORLOOP: &str = "forloop";

/// Largest range that may be turned into an array value.
const RANGE_LIMIT: u128 = 1_000_000;

/// Render a [`Template`].
///
/// Provides a shortcut to quickly render a `Template` when no advanced
/// features are needed.
///
/// You may prefer to create an [`Engine`] if you intend to use filters,
/// custom tags or inclusion in your templates.
///
/// # Examples
///
/// ```
/// use sluice::{compile, render, Store};
///
/// let template = compile("hello, {{ name }}!");
/// assert!(template.is_ok());
///
/// let output = render(&template.unwrap(), &Store::new().with_must("name", "taylor"));
/// assert_eq!(output.unwrap(), "hello, taylor!");
/// ```
pub fn render(template: &Template, store: &Store) -> Result<String, Error> {
    Engine::default().render(template, store)
}

/// Describes how a block finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every statement was executed.
    Normal,
    /// A `break` stopped the block.
    Break,
    /// A `continue` stopped the block.
    Continue,
}

/// Render the statements of a [`Template`] to the sink.
pub(crate) async fn render_template(
    template: &Template,
    context: &mut Context<'_>,
    sink: &mut dyn Sink,
    encoder: &dyn Encoder,
    asynchronous: bool,
) -> Result<Completion, Error> {
    let name = template.name().unwrap_or("?");
    debug!(template = name, "render started");

    let renderer = Renderer {
        source: template.source(),
        encoder,
        asynchronous,
    };
    let result = renderer
        .render_block(template.block(), context, sink)
        .await
        .map_err(|error| error.or_name(template.name()));

    match &result {
        Ok(completion) => debug!(
            template = name,
            ?completion,
            steps = context.steps(),
            "render finished"
        ),
        Err(error) => debug!(
            template = name,
            error = error.reason(),
            steps = context.steps(),
            "render failed"
        ),
    }

    result
}

/// Run a render future to completion from synchronous code.
///
/// The future is polled once. If a collaborator suspended it, the render
/// finishes on a current thread runtime.
///
/// # Errors
///
/// Returns an [`Error`] if the render fails, or it suspends while the
/// caller is already inside of a runtime.
pub(crate) fn drive<F, T>(future: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    let mut future = std::pin::pin!(future);
    let waker = Waker::from(Arc::new(Idle));
    let mut cx = task::Context::from_waker(&waker);
    if let Poll::Ready(result) = future.as_mut().poll(&mut cx) {
        return result;
    }

    if Handle::try_current().is_ok() {
        return Err(Error::build("render suspended inside of an asynchronous runtime")
            .with_help("use `render_async` or `render_to_async` when rendering from asynchronous code"));
    }

    trace!("finishing suspended render on a current thread runtime");
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(future)
}

/// A waker that does nothing, used for the first poll of [`drive`].
struct Idle;

impl Wake for Idle {
    fn wake(self: Arc<Self>) {}
}

/// Yields to the executor exactly once.
///
/// A pending collaborator is first polled after this yield, so in a
/// synchronous render it always starts inside of the runtime.
#[derive(Default)]
struct Suspend {
    yielded: bool,
}

impl Future for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Wait for the result of a collaborator.
async fn settle<T>(outcome: Outcome<T>) -> Result<T, Error> {
    match outcome {
        Outcome::Ready(result) => result,
        Outcome::Pending(future) => {
            Suspend::default().await;
            future.await
        }
    }
}

/// What an `include` or `render` passes to the included template.
enum Passed {
    Nothing,
    With(Value),
    For(Vec<Value>),
}

/// Walks the statements of one template.
#[derive(Clone, Copy)]
struct Renderer<'a> {
    /// Source text of the template being walked.
    source: &'a str,
    encoder: &'a dyn Encoder,
    /// Write through [`Sink::write_async`] instead of [`Sink::write`].
    asynchronous: bool,
}

impl<'a> Renderer<'a> {
    /// Render each statement in order, stopping at the first one that does
    /// not complete normally.
    fn render_block<'b>(
        self,
        block: &'b [Statement],
        context: &'b mut Context<'_>,
        sink: &'b mut dyn Sink,
    ) -> BoxedRender<'b>
    where
        'a: 'b,
    {
        Box::pin(async move {
            for statement in block {
                let completion = self.render_statement(statement, context, sink).await?;
                if completion != Completion::Normal {
                    return Ok(completion);
                }
            }

            Ok(Completion::Normal)
        })
    }

    async fn render_statement(
        self,
        statement: &Statement,
        context: &mut Context<'_>,
        sink: &mut dyn Sink,
    ) -> Result<Completion, Error> {
        context.step()?;

        match statement {
            Statement::Text(region) | Statement::Raw(region) => {
                self.write(sink, &self.source[*region]).await?
            }
            Statement::Comment(_) => {}
            Statement::Output(output) => {
                let value = self.evaluate(&output.expression, context).await?;
                self.write_value(sink, &value).await?;
            }
            Statement::If(statement) => {
                for branch in &statement.branches {
                    if is_truthy(&self.evaluate(&branch.condition, context).await?) {
                        return self.render_block(&branch.block, context, sink).await;
                    }
                }
                if let Some(block) = &statement.otherwise {
                    return self.render_block(block, context, sink).await;
                }
            }
            Statement::Unless(statement) => {
                if !is_truthy(&self.evaluate(&statement.condition, context).await?) {
                    return self.render_block(&statement.block, context, sink).await;
                }
                if let Some(block) = &statement.otherwise {
                    return self.render_block(block, context, sink).await;
                }
            }
            Statement::Case(statement) => {
                let subject = self.evaluate(&statement.subject, context).await?;
                for when in &statement.whens {
                    for option in &when.options {
                        if self.matches(&subject, option, context).await? {
                            return self.render_block(&when.block, context, sink).await;
                        }
                    }
                }
                if let Some(block) = &statement.otherwise {
                    return self.render_block(block, context, sink).await;
                }
            }
            Statement::For(statement) => return self.render_for(statement, context, sink).await,
            Statement::Capture(capture) => {
                context.enter()?;
                context.scope_mut().push(true);
                let mut buffer = String::new();
                let result = self.render_block(&capture.block, context, &mut buffer).await;
                context.scope_mut().pop();
                context.leave();

                let completion = result?;
                let value = context
                    .engine()
                    .assign(&capture.name.name, Value::String(buffer))
                    .map_err(|error| error.or_pointer(self.source, capture.region))?;
                context.scope_mut().set(capture.name.name.as_str(), value);

                return Ok(completion);
            }
            Statement::Assign(assign) => {
                let value = self.evaluate(&assign.value, context).await?;
                let value = context
                    .engine()
                    .assign(&assign.name.name, value)
                    .map_err(|error| error.or_pointer(self.source, assign.region))?;
                context.scope_mut().set(assign.name.name.as_str(), value);
            }
            Statement::Increment(counter) => {
                let value = context.increment(&counter.name.name);
                self.write(sink, &value.to_string()).await?;
            }
            Statement::Decrement(counter) => {
                let value = context.decrement(&counter.name.name);
                self.write(sink, &value.to_string()).await?;
            }
            Statement::Break(_) => return Ok(Completion::Break),
            Statement::Continue(_) => return Ok(Completion::Continue),
            Statement::Cycle(cycle) => {
                let group = match &cycle.group {
                    Some(group) => to_text(&self.evaluate(group, context).await?).into_owned(),
                    None => cycle
                        .values
                        .iter()
                        .map(|value| &self.source[value.get_region()])
                        .collect::<Vec<_>>()
                        .join(","),
                };
                let index = context.cycle(group, cycle.values.len());
                if let Some(expression) = cycle.values.get(index) {
                    let value = self.evaluate(expression, context).await?;
                    self.write_value(sink, &value).await?;
                }
            }
            Statement::Include(include) => {
                return self.render_include(include, context, sink).await;
            }
            Statement::Custom(custom) => {
                let argument = match &custom.argument {
                    Some(argument) => Some(self.evaluate(argument, context).await?),
                    None => None,
                };
                let (body, completion) = match &custom.block {
                    Some(block) => {
                        context.enter()?;
                        context.scope_mut().push(true);
                        let mut buffer = String::new();
                        let result = self.render_block(block, context, &mut buffer).await;
                        context.scope_mut().pop();
                        context.leave();

                        (Some(buffer), result?)
                    }
                    None => (None, Completion::Normal),
                };

                let text = settle(custom.tag.render(argument.as_ref(), body.as_deref(), context))
                    .await
                    .map_err(|error| error.or_pointer(self.source, custom.region))?;
                self.write(sink, &text).await?;

                return Ok(completion);
            }
        }

        Ok(Completion::Normal)
    }

    async fn render_for(
        self,
        statement: &For,
        context: &mut Context<'_>,
        sink: &mut dyn Sink,
    ) -> Result<Completion, Error> {
        let sequence = match &statement.source {
            Expression::Range(range) => {
                let (from, to) = self.evaluate_range(range, context).await?;
                Sequence::Range(from, to)
            }
            source => Sequence::Items(to_sequence(self.evaluate(source, context).await?)),
        };
        let offset = match &statement.offset {
            Some(offset) => self.evaluate_count(offset, context).await?,
            None => 0,
        };
        let limit = match &statement.limit {
            Some(limit) => Some(self.evaluate_count(limit, context).await?),
            None => None,
        };
        let (items, length) = sequence.slice(offset, limit, statement.reversed);

        if length == 0 {
            return match &statement.otherwise {
                Some(block) => self.render_block(block, context, sink).await,
                None => Ok(Completion::Normal),
            };
        }

        let parent = context.scope().get(FORLOOP).cloned();
        context.enter()?;
        context.scope_mut().push(true);
        let result = self
            .render_items(
                &statement.variable.name,
                items,
                length,
                parent,
                &statement.block,
                context,
                sink,
            )
            .await;
        context.scope_mut().pop();
        context.leave();

        result
    }

    /// Render the block once per item, binding the item and `forloop` in
    /// the innermost frame.
    #[allow(clippy::too_many_arguments)]
    async fn render_items(
        self,
        variable: &str,
        items: Items,
        length: usize,
        parent: Option<Value>,
        block: &[Statement],
        context: &mut Context<'_>,
        sink: &mut dyn Sink,
    ) -> Result<Completion, Error> {
        for (index, item) in items.enumerate() {
            context.scope_mut().declare(variable, item);
            context
                .scope_mut()
                .declare(FORLOOP, forloop(index, length, parent.as_ref()));

            if self.render_block(block, context, sink).await? == Completion::Break {
                break;
            }
        }

        Ok(Completion::Normal)
    }

    async fn render_include(
        self,
        include: &Include,
        context: &mut Context<'_>,
        sink: &mut dyn Sink,
    ) -> Result<Completion, Error> {
        let path = to_text(&self.evaluate(&include.path, context).await?).into_owned();
        let template = self
            .resolve(&path, context)
            .await
            .map_err(|error| error.or_pointer(self.source, include.path.get_region()))?;

        let mut arguments = Vec::with_capacity(include.arguments.len());
        for (name, expression) in &include.arguments {
            arguments.push((name.name.clone(), self.evaluate(expression, context).await?));
        }
        let alias = match &include.alias {
            Some(alias) => alias.name.clone(),
            None => stem(&path).to_owned(),
        };
        let passed = match &include.pass {
            Some(Pass::With(expression)) => Passed::With(self.evaluate(expression, context).await?),
            Some(Pass::For(expression)) => {
                Passed::For(to_sequence(self.evaluate(expression, context).await?))
            }
            None => Passed::Nothing,
        };

        trace!(path, mode = ?include.mode, "including template");
        context.enter()?;
        let saved = match include.mode {
            Mode::Render => Some(context.replace_scope(Scope::new())),
            Mode::Include => {
                context.scope_mut().push(true);
                None
            }
        };

        let renderer = Renderer {
            source: template.source(),
            encoder: self.encoder,
            asynchronous: self.asynchronous,
        };
        let result = renderer
            .render_included(&template, alias, arguments, passed, context, sink)
            .await;

        match saved {
            Some(scope) => {
                context.replace_scope(scope);
            }
            None => context.scope_mut().pop(),
        }
        context.leave();

        let completion = result.map_err(|error| error.or_name(template.name()))?;
        match include.mode {
            Mode::Include => Ok(completion),
            Mode::Render => Ok(Completion::Normal),
        }
    }

    async fn render_included(
        self,
        template: &Template,
        alias: String,
        arguments: Vec<(String, Value)>,
        passed: Passed,
        context: &mut Context<'_>,
        sink: &mut dyn Sink,
    ) -> Result<Completion, Error> {
        for (name, value) in arguments {
            context.scope_mut().declare(name, value);
        }

        match passed {
            Passed::Nothing => self.render_block(template.block(), context, sink).await,
            Passed::With(value) => {
                context.scope_mut().declare(alias, value);
                self.render_block(template.block(), context, sink).await
            }
            Passed::For(items) => {
                let length = items.len();
                let items: Items = Box::new(items.into_iter());
                self.render_items(&alias, items, length, None, template.block(), context, sink)
                    .await
            }
        }
    }

    /// Find a template by name, in the engine first and then with its resolver.
    async fn resolve(self, path: &str, context: &Context<'_>) -> Result<Arc<Template>, Error> {
        let engine = context.engine();
        if let Some(template) = engine.get_template(path) {
            trace!(path, "resolved template from registry");
            return Ok(Arc::clone(template));
        }

        if let Some(resolver) = engine.resolver() {
            if let Some(template) = settle(resolver.resolve(path, engine)).await? {
                trace!(path, "resolved template with resolver");
                return Ok(template);
            }
        }

        Err(error_missing_template(path))
    }

    /// Evaluate an expression to a [`Value`].
    fn evaluate<'b>(
        self,
        expression: &'b Expression,
        context: &'b Context<'_>,
    ) -> BoxedEvaluation<'b>
    where
        'a: 'b,
    {
        Box::pin(async move {
            match expression {
                Expression::Literal(literal) => Ok(match &literal.constant {
                    Constant::Value(value) => value.clone(),
                    Constant::Empty | Constant::Blank => Value::String(String::new()),
                }),
                Expression::Path(path) => self.evaluate_path(path, context).await,
                Expression::Binary(binary) => self.evaluate_binary(binary, context).await,
                Expression::Call(call) => self.evaluate_call(call, context).await,
                Expression::Range(range) => {
                    let (from, to) = self.evaluate_range(range, context).await?;
                    if range_length(from, to) > RANGE_LIMIT {
                        return Err(Error::build("range is too large")
                            .with_pointer(self.source, range.region)
                            .with_help(format!(
                                "ranges used as values hold at most {RANGE_LIMIT} items, \
                                iterate it with `for` instead"
                            )));
                    }

                    Ok(Value::Array((from..=to).map(Value::from).collect()))
                }
            }
        })
    }

    async fn evaluate_path(self, path: &Path, context: &Context<'_>) -> Result<Value, Error> {
        let accessor = context.engine().accessor();
        let root = path.root();
        let mut binding = match context.scope().get(root) {
            Some(value) => Binding::Defined(value.clone()),
            None => match context.model() {
                Some(model) => {
                    let member = Value::String(root.to_owned());
                    settle(accessor.get(model, &member, context)).await?
                }
                None => Binding::Undefined,
            },
        };

        for segment in path.segments.iter().skip(1) {
            let host = match &binding {
                Binding::Defined(host) => host,
                Binding::Undefined => break,
            };
            let member = match segment {
                Segment::Identifier(identifier) => Value::String(identifier.name.clone()),
                Segment::Indexer(expression) => self.evaluate(expression, context).await?,
            };
            binding = settle(accessor.get(host, &member, context)).await?;
        }

        match binding {
            Binding::Defined(value) => Ok(value),
            Binding::Undefined if context.options().strict_variables => {
                Err(Error::build(UNDEFINED_VARIABLE)
                    .with_kind(ErrorKind::UndefinedVariable)
                    .with_pointer(self.source, path.region)
                    .with_help(format!("`{}` is not defined", &self.source[path.region])))
            }
            Binding::Undefined => Ok(Value::Null),
        }
    }

    async fn evaluate_binary(self, binary: &Binary, context: &Context<'_>) -> Result<Value, Error> {
        let operator = binary.operator;
        let result = match operator {
            Operator::And => {
                let left = self.evaluate(&binary.left, context).await?;
                let truthy =
                    is_truthy(&left) && is_truthy(&self.evaluate(&binary.right, context).await?);

                Ok(Value::Bool(truthy))
            }
            Operator::Or => {
                let left = self.evaluate(&binary.left, context).await?;
                let truthy =
                    is_truthy(&left) || is_truthy(&self.evaluate(&binary.right, context).await?);

                Ok(Value::Bool(truthy))
            }
            Operator::Equal | Operator::NotEqual => {
                let equal = match special(&binary.left) {
                    Some(constant) => {
                        let right = self.evaluate(&binary.right, context).await?;
                        matches_constant(constant, &right)
                    }
                    None => {
                        let left = self.evaluate(&binary.left, context).await?;
                        self.matches(&left, &binary.right, context).await?
                    }
                };

                Ok(Value::Bool(equal == (operator == Operator::Equal)))
            }
            _ => {
                let left = self.evaluate(&binary.left, context).await?;
                let right = self.evaluate(&binary.right, context).await?;

                match operator {
                    Operator::Contains => Ok(Value::Bool(contains(&left, &right))),
                    Operator::StartsWith => Ok(Value::Bool(starts_with(&left, &right))),
                    Operator::EndsWith => Ok(Value::Bool(ends_with(&left, &right))),
                    Operator::Greater
                    | Operator::Lesser
                    | Operator::GreaterOrEqual
                    | Operator::LesserOrEqual => {
                        compare_values(&left, operator, &right).map(Value::Bool)
                    }
                    _ => arithmetic(&left, operator, &right),
                }
            }
        };

        result.map_err(|error| error.or_pointer(self.source, binary.region))
    }

    async fn evaluate_call(self, call: &Call, context: &Context<'_>) -> Result<Value, Error> {
        let input = self.evaluate(&call.receiver, context).await?;
        let mut arguments = Arguments::new();
        for argument in &call.arguments {
            let value = self.evaluate(&argument.value, context).await?;
            match &argument.name {
                Some(name) => arguments.push_named(name.name.as_str(), value),
                None => arguments.push(value),
            }
        }

        let Some(filter) = context.engine().get_filter(&call.name.name) else {
            if context.options().strict_filters {
                return Err(Error::build(INVALID_FILTER)
                    .with_kind(ErrorKind::UnknownFilter)
                    .with_pointer(self.source, call.name.region)
                    .with_help(format!(
                        "filter `{}` is not registered, add it with `.add_filter`",
                        call.name.name
                    )));
            }

            return Ok(input);
        };

        settle(filter.apply(&input, &arguments, context))
            .await
            .map_err(|error| {
                let error = match error.kind() {
                    ErrorKind::Render => error.with_kind(ErrorKind::Filter),
                    _ => error,
                };

                error.or_pointer(self.source, call.region)
            })
    }

    async fn evaluate_range(
        self,
        range: &Range,
        context: &Context<'_>,
    ) -> Result<(i64, i64), Error> {
        let from = self.evaluate(&range.from, context).await?;
        let from = to_integer(&from).ok_or_else(|| self.error_integer(&range.from, &from))?;
        let to = self.evaluate(&range.to, context).await?;
        let to = to_integer(&to).ok_or_else(|| self.error_integer(&range.to, &to))?;

        Ok((from, to))
    }

    /// Evaluate a `limit` or `offset` expression, negative counts become zero.
    async fn evaluate_count(
        self,
        expression: &Expression,
        context: &Context<'_>,
    ) -> Result<usize, Error> {
        let value = self.evaluate(expression, context).await?;
        let count = to_integer(&value).ok_or_else(|| self.error_integer(expression, &value))?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Return true if the value equals the operand, which may be `empty`
    /// or `blank`.
    async fn matches(
        self,
        value: &Value,
        operand: &Expression,
        context: &Context<'_>,
    ) -> Result<bool, Error> {
        match special(operand) {
            Some(constant) => Ok(matches_constant(constant, value)),
            None => Ok(is_equal(value, &self.evaluate(operand, context).await?)),
        }
    }

    async fn write(self, sink: &mut dyn Sink, text: &str) -> Result<(), Error> {
        if self.asynchronous {
            sink.write_async(text).await
        } else {
            sink.write(text)
        }
    }

    /// Write the encoded display text of the value.
    async fn write_value(self, sink: &mut dyn Sink, value: &Value) -> Result<(), Error> {
        let text = to_text(value);
        let encoded = self.encoder.encode(&text);

        self.write(sink, &encoded).await
    }

    fn error_integer(self, expression: &Expression, value: &Value) -> Error {
        Error::build("expected an integer")
            .with_pointer(self.source, expression.get_region())
            .with_help(format!("`{value}` cannot be used as an integer"))
    }
}

type BoxedRender<'b> = crate::outcome::BoxFuture<'b, Result<Completion, Error>>;
type BoxedEvaluation<'b> = crate::outcome::BoxFuture<'b, Result<Value, Error>>;

/// Return the constant of an `empty` or `blank` literal.
fn special(expression: &Expression) -> Option<&Constant> {
    match expression {
        Expression::Literal(Literal {
            constant: constant @ (Constant::Empty | Constant::Blank),
            ..
        }) => Some(constant),
        _ => None,
    }
}

fn matches_constant(constant: &Constant, value: &Value) -> bool {
    match constant {
        Constant::Empty => is_empty(value),
        Constant::Blank => is_blank(value),
        Constant::Value(other) => is_equal(value, other),
    }
}

/// Items of a loop, produced one at a time.
type Items = Box<dyn Iterator<Item = Value> + Send>;

/// Source of a `for` loop before `offset`, `limit` and `reversed` apply.
enum Sequence {
    Items(Vec<Value>),
    /// Inclusive integer bounds, never materialized.
    Range(i64, i64),
}

impl Sequence {
    /// Apply `offset`, `limit` and `reversed`, returning the items and
    /// how many there are.
    fn slice(self, offset: usize, limit: Option<usize>, reversed: bool) -> (Items, usize) {
        match self {
            Sequence::Items(mut items) => {
                items.drain(..offset.min(items.len()));
                if let Some(limit) = limit {
                    items.truncate(limit);
                }
                if reversed {
                    items.reverse();
                }
                let length = items.len();

                (Box::new(items.into_iter()), length)
            }
            Sequence::Range(from, to) => {
                let total = range_length(from, to);
                let skipped = (offset as u128).min(total);
                let mut remaining = total - skipped;
                if let Some(limit) = limit {
                    remaining = remaining.min(limit as u128);
                }
                let length = usize::try_from(remaining).unwrap_or(usize::MAX);
                let start = i128::from(from) + skipped as i128;
                // start + length - 1 never exceeds `to`, so every item fits in an i64.
                let values = (0..length as i128).map(move |step| Value::from((start + step) as i64));

                if reversed {
                    (Box::new(values.rev()), length)
                } else {
                    (Box::new(values), length)
                }
            }
        }
    }
}

/// Number of integers in the inclusive range, zero when `to < from`.
fn range_length(from: i64, to: i64) -> u128 {
    u128::try_from(i128::from(to) - i128::from(from) + 1).unwrap_or_default()
}

/// Convert a value to the items a loop visits.
///
/// Objects become `[key, value]` pairs, nil is empty and any other scalar is
/// a single item.
fn to_sequence(value: Value) -> Vec<Value> {
    match value {
        Value::Array(array) => array,
        Value::Object(object) => object
            .into_iter()
            .map(|(key, value)| Value::Array(vec![Value::String(key), value]))
            .collect(),
        Value::Null => vec![],
        other => vec![other],
    }
}

fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float as i64)),
        Value::String(string) => string.trim().parse().ok(),
        _ => None,
    }
}

fn forloop(index: usize, length: usize, parent: Option<&Value>) -> Value {
    json!({
        "index": index + 1,
        "index0": index,
        "rindex": length - index,
        "rindex0": length - index - 1,
        "first": index == 0,
        "last": index + 1 == length,
        "length": length,
        "parentloop": parent.cloned().unwrap_or(Value::Null),
    })
}

/// Return the file name of a template path without its extension.
fn stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.find('.') {
        Some(index) if index > 0 => &name[..index],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::{stem, Completion};
    use crate::{
        compile, render, Accessor, Arguments, Binding, BufferedSink, Context, Engine, Error,
        ErrorKind, Html, JsonAccessor, Options, Outcome, Store, Tag, TagKind, Template, Trimming,
        Verbatim,
    };
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::{sync::Arc, time::Duration};

    #[test]
    fn test_render_literal() {
        let source = "plain text {not a tag} % } }}\n";

        assert_eq!(helper_render(source, Store::new()), source);
    }

    #[test]
    fn test_render_trim_symmetry() {
        for bits in 0..16u8 {
            for greedy in [true, false] {
                let engine = Engine::new(
                    Options::default()
                        .with_greedy(greedy)
                        .with_trimming(Trimming {
                            tag_left: bits & 1 != 0,
                            tag_right: bits & 2 != 0,
                            output_left: bits & 4 != 0,
                            output_right: bits & 8 != 0,
                        }),
                );
                let template = engine.compile("X {%- assign a = 1 -%} Y").unwrap();

                assert_eq!(engine.render(&template, &Store::new()).unwrap(), "XY");
            }
        }
    }

    #[test]
    fn test_render_forloop_helpers() {
        let source = "{% for i in (1..3) %}{{ forloop.index }}{{ forloop.last }}{% endfor %}";

        assert_eq!(helper_render(source, Store::new()), "1false2false3true");
    }

    #[test]
    fn test_render_parentloop() {
        let source = "{% for a in (1..2) %}{% for b in (1..2) %}\
            {{ forloop.parentloop.index }}{{ forloop.index }} {% endfor %}{% endfor %}";

        assert_eq!(helper_render(source, Store::new()), "11 12 21 22 ");
    }

    #[test]
    fn test_render_break_continue() {
        let source = "{% for i in (1..5) %}{% if i == 3 %}{% break %}{% endif %}{{ i }}{% endfor %}";
        assert_eq!(helper_render(source, Store::new()), "12");

        let source =
            "{% for i in (1..5) %}{% if i == 3 %}{% continue %}{% endif %}{{ i }}{% endfor %}";
        assert_eq!(helper_render(source, Store::new()), "1245");
    }

    #[test]
    fn test_render_loop_slicing() {
        let source = "{% for i in (1..6) offset: 1 limit: 3 reversed %}{{ i }}{% endfor %}";

        assert_eq!(helper_render(source, Store::new()), "432");
    }

    #[test]
    fn test_render_loop_else() {
        let source = "{% for i in items %}x{% else %}none{% endfor %}";

        assert_eq!(
            helper_render(source, Store::new().with_must("items", json!([]))),
            "none"
        );
        assert_eq!(helper_render(source, Store::new()), "none");
    }

    #[test]
    fn test_render_loop_object() {
        let source = "{% for pair in object %}{{ pair[0] }}={{ pair[1] }};{% endfor %}";
        let store = Store::new().with_must("object", json!({"a": 1, "b": 2}));

        assert_eq!(helper_render(source, store), "a=1;b=2;");
    }

    #[test]
    fn test_render_scope_isolation() {
        let engine = Engine::default();
        let template = engine
            .compile("{% for i in (1..3) %}{% assign z = i %}{% endfor %}{{ z }}|{{ i }}")
            .unwrap();
        let mut context = Context::new(&engine);
        let mut output = String::new();
        engine
            .render_to(&template, &mut context, &mut output, &Verbatim)
            .unwrap();

        assert_eq!(output, "3|");
        assert_eq!(context.get("z").into_value(), json!(3));
        assert!(!context.get("i").is_defined());
    }

    #[test]
    fn test_render_undefined() {
        let source = "[{{ missing }}][{{ user.missing.deeper }}]";
        let store = Store::new().with_must("user", json!({}));
        assert_eq!(helper_render(source, store), "[][]");

        let engine = Engine::new(Options::default().with_strict_variables(true));
        let template = engine.compile("a {{ missing }}").unwrap();
        let error = engine.render(&template, &Store::new()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::UndefinedVariable);
        assert!(error.help().unwrap_or_default().contains("missing"));
        assert_eq!(error.location(), Some((1, 6)));
    }

    #[test]
    fn test_render_conditions() {
        let source = "{% if a and b %}1{% elsif a or b %}2{% else %}3{% endif %}\
            {% unless a %}4{% else %}5{% endunless %}";

        let store = Store::new().with_must("a", true).with_must("b", false);
        assert_eq!(helper_render(source, store), "25");

        let store = Store::new().with_must("a", false).with_must("b", json!(null));
        assert_eq!(helper_render(source, store), "34");
    }

    #[test]
    fn test_render_empty_and_blank() {
        let source = "{% if a == empty %}e{% endif %}{% if b == blank %}b{% endif %}\
            {% if c != empty %}n{% endif %}";
        let store = Store::new()
            .with_must("a", json!([]))
            .with_must("b", "  ")
            .with_must("c", "text");

        assert_eq!(helper_render(source, store), "ebn");
    }

    #[test]
    fn test_render_case() {
        let source = "{% case x %}\n{% when 1, 2 %}low{% when 3 or 4 %}mid{% else %}high{% endcase %}";

        assert_eq!(helper_render(source, Store::new().with_must("x", 4)), "mid");
        assert_eq!(helper_render(source, Store::new().with_must("x", 2)), "low");
        assert_eq!(helper_render(source, Store::new().with_must("x", 9)), "high");
    }

    #[test]
    fn test_render_capture_and_assign() {
        let source = "{% assign n = 2 %}{% capture c %}a{{ n }}{% endcapture %}[{{ c }}]";

        assert_eq!(helper_render(source, Store::new()), "[a2]");
    }

    #[test]
    fn test_render_assign_hook_rejects() {
        let engine = Engine::default().with_assign_hook(|name: &str, value| match name {
            "secret" => Err(Error::build("assignment refused")),
            _ => Ok(value),
        });
        let template = engine
            .compile("{% assign open = 1 %}{% assign secret = 2 %}")
            .unwrap();
        let error = engine.render(&template, &Store::new()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Rejected);
        assert_eq!(error.location(), Some((1, 22)));
    }

    #[test]
    fn test_render_counters() {
        let source = "{% increment x %}{% increment x %}{% decrement y %}{% decrement y %}[{{ x }}]";

        assert_eq!(helper_render(source, Store::new()), "01-1-2[]");
    }

    #[test]
    fn test_render_cycle() {
        let source = "{% for i in (1..4) %}{% cycle 'a', 'b', 'c' %}{% cycle 'g': 1, 2 %}{% endfor %}";

        assert_eq!(helper_render(source, Store::new()), "a1b2c1a2");
    }

    #[test]
    fn test_render_members() {
        let source = "{{ list[-1] }} {{ list.size }} {{ list.first }} {{ name.size }} {{ map['k'] }}";
        let store = Store::new()
            .with_must("list", json!([1, 2, 3]))
            .with_must("name", "abc")
            .with_must("map", json!({"k": "v"}));

        assert_eq!(helper_render(source, store), "3 3 1 3 v");
    }

    #[test]
    fn test_render_model_fallback() {
        let engine = Engine::default();
        let template = engine.compile("{{ user.name }}{{ local }}").unwrap();
        let mut context = Context::new(&engine).with_model(json!({"user": {"name": "taylor"}}));
        context.set("local", json!("!"));
        let mut output = String::new();
        engine
            .render_to(&template, &mut context, &mut output, &Verbatim)
            .unwrap();

        assert_eq!(output, "taylor!");
    }

    #[test]
    fn test_render_encoder() {
        let engine = Engine::default();
        let template = engine.compile("{{ '<b>' }}<i>{% raw %}<u>{% endraw %}").unwrap();
        let mut context = Context::new(&engine);
        let mut output = String::new();
        engine
            .render_to(&template, &mut context, &mut output, &Html)
            .unwrap();

        assert_eq!(output, "&lt;b&gt;<i><u>");
    }

    #[test]
    fn test_render_completion_outside_loop() {
        let engine = Engine::default();
        let template = engine.compile("a{% if true %}{% break %}b{% endif %}c").unwrap();
        let mut context = Context::new(&engine);
        let mut output = String::new();
        let completion = engine
            .render_to(&template, &mut context, &mut output, &Verbatim)
            .unwrap();

        assert_eq!(completion, Completion::Break);
        assert_eq!(output, "a");
    }

    #[test]
    fn test_render_include_and_render() {
        let mut engine = Engine::default();
        engine
            .add_template("inner", "{{ outer }}{{ arg }}{% assign leaked = 1 %}")
            .unwrap();
        let template = engine
            .compile(
                "{% assign outer = 'o' %}{% render 'inner', arg: 'a' %}|{{ leaked }}|\
                {% include 'inner', arg: 'a' %}|{{ leaked }}",
            )
            .unwrap();

        assert_eq!(engine.render(&template, &Store::new()).unwrap(), "a||oa|1");
    }

    #[test]
    fn test_render_include_with_and_for() {
        let mut engine = Engine::default();
        engine.add_template("item.liquid", "{{ item }}{{ forloop.index }},").unwrap();
        let template = engine
            .compile("{% include 'item.liquid' for list %}{% render 'item.liquid' with 'x' as item %}")
            .unwrap();
        let store = Store::new().with_must("list", vec!["a", "b"]);

        assert_eq!(engine.render(&template, &store).unwrap(), "a1,b2,x,");
    }

    #[test]
    fn test_render_missing_template() {
        let template = compile("{% include 'ghost' %}").unwrap();
        let error = render(&template, &Store::new()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Include);
        assert_eq!(error.location(), Some((1, 12)));
    }

    #[test]
    fn test_render_error_names_included_template() {
        let mut engine = Engine::new(Options::default().with_strict_variables(true));
        engine.add_template("part", "\n{{ nope }}").unwrap();
        let template = engine.compile_named("page", "{% include 'part' %}").unwrap();
        let error = engine.render(&template, &Store::new()).unwrap_err();

        assert_eq!(error.get_name(), Some("part"));
        assert_eq!(error.location(), Some((2, 4)));
    }

    #[test]
    fn test_render_step_limit() {
        let engine = Engine::new(Options::default().with_max_steps(10));
        let template = engine.compile("{% for i in (1..100) %}{{ i }}{% endfor %}").unwrap();
        let error = engine.render(&template, &Store::new()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::StepLimit);
    }

    #[test]
    fn test_render_recursion_limit() {
        let mut engine = Engine::new(Options::default().with_max_recursion(20));
        engine.add_template("loop", "{% include 'loop' %}").unwrap();
        let template = engine.compile("{% include 'loop' %}").unwrap();
        let error = engine.render(&template, &Store::new()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::RecursionLimit);
    }

    #[test]
    fn test_render_isolation() {
        let engine = Engine::default();
        let template = Arc::new(
            engine
                .compile("{{ x }}{% assign x = 'set' %}{{ x }}{% increment c %}")
                .unwrap(),
        );

        let outputs = std::thread::scope(|scope| {
            let handles = (0..4)
                .map(|_| {
                    let template = Arc::clone(&template);
                    let engine = &engine;
                    scope.spawn(move || engine.render(&template, &Store::new()))
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| handle.join().map_err(|_| ()).and_then(|r| r.map_err(|_| ())))
                .collect::<Vec<_>>()
        });

        for output in outputs {
            assert_eq!(output, Ok(String::from("set0")));
        }
    }

    #[test]
    fn test_render_buffered_sink() {
        let engine = Engine::default();
        let template = engine.compile("{% for i in (1..3) %}{{ i }}{% endfor %}").unwrap();
        let mut context = Context::new(&engine);
        let mut output: Vec<u8> = Vec::new();
        let mut sink = BufferedSink::with_capacity(&mut output, 2);
        engine
            .render_to(&template, &mut context, &mut sink, &Verbatim)
            .unwrap();
        sink.close().unwrap();
        drop(sink);

        assert_eq!(output, b"123");
    }

    #[tokio::test]
    async fn test_render_async_includes_in_order() {
        let engine = Engine::default().with_resolver(slow_resolver);
        let template = engine
            .compile("{% include 'slow' %}-{% include 'fast' %}-{{ 'done' }}")
            .unwrap();
        let result = engine.render_async(&template, &Store::new()).await;

        assert_eq!(result.unwrap(), "slow-fast-done");
    }

    #[tokio::test]
    async fn test_render_sync_inside_runtime() {
        let engine = Engine::default().with_resolver(slow_resolver);
        let template = engine.compile("{% include 'fast' %}").unwrap();
        let error = engine.render(&template, &Store::new()).unwrap_err();

        assert!(error.help().unwrap_or_default().contains("render_async"));
    }

    #[test]
    fn test_render_sync_finishes_pending() {
        let engine = Engine::default().with_resolver(slow_resolver);
        let template = engine.compile("{% include 'slow' %}!").unwrap();

        assert_eq!(engine.render(&template, &Store::new()).unwrap(), "slow!");
    }

    #[test]
    fn test_render_huge_range_is_lazy() {
        let source = "{% for i in (1..9223372036854775807) limit: 2 %}{{ i }}{% endfor %}";
        assert_eq!(helper_render(source, Store::new()), "12");

        let source = "{% for i in (1..9223372036854775807) offset: 9223372036854775805 %}\
            {{ i }};{% endfor %}";
        assert_eq!(
            helper_render(source, Store::new()),
            "9223372036854775806;9223372036854775807;"
        );

        let source = "{% for i in (0..9223372036854775807) limit: 2 reversed %}\
            {{ forloop.length }}:{{ i }};{% endfor %}";
        assert_eq!(helper_render(source, Store::new()), "2:1;2:0;");
    }

    #[test]
    fn test_render_huge_range_step_limit() {
        let engine = Engine::new(Options::default().with_max_steps(10));
        let template = engine
            .compile("{% for i in (1..9223372036854775807) %}{{ i }}{% endfor %}")
            .unwrap();
        let error = engine.render(&template, &Store::new()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::StepLimit);
    }

    #[test]
    fn test_render_range_value_too_large() {
        let template = compile("{% assign r = (1..9223372036854775807) %}").unwrap();
        let error = render(&template, &Store::new()).unwrap_err();

        assert_eq!(error.location(), Some((1, 15)));

        let template = compile("{{ (3..1) }}|{{ (1..3) }}").unwrap();
        assert_eq!(render(&template, &Store::new()).unwrap(), "|123");
    }

    #[test]
    fn test_render_custom_block_forwards_break() {
        let engine = Engine::default().with_tag("wrap", Wrap);
        let template = engine
            .compile(
                "{% for i in (1..3) %}{% wrap %}{{ i }}\
                {% if i == 1 %}{% break %}{% endif %}{% endwrap %}{% endfor %}",
            )
            .unwrap();
        assert_eq!(engine.render(&template, &Store::new()).unwrap(), "[1]");

        let template = engine
            .compile(
                "{% for i in (1..3) %}{% wrap %}{% if i == 2 %}{% continue %}{% endif %}\
                {{ i }}{% endwrap %}{% endfor %}",
            )
            .unwrap();
        assert_eq!(engine.render(&template, &Store::new()).unwrap(), "[1][][3]");
    }

    #[tokio::test]
    async fn test_render_async_pending_accessor() {
        let engine = Engine::default().with_accessor(SlowAccessor);
        let template = engine.compile("{{ a.slow }}-{{ a.fast }}-{{ a.list[1] }}").unwrap();
        let store = Store::new().with_must("a", json!({"slow": "s", "fast": "f", "list": [1, 2]}));

        assert_eq!(engine.render_async(&template, &store).await.unwrap(), "s-f-2");
    }

    #[test]
    fn test_render_sync_pending_accessor() {
        let engine = Engine::default().with_accessor(SlowAccessor);
        let template = engine.compile("{{ a.slow }}-{{ a.fast }}").unwrap();
        let store = Store::new().with_must("a", json!({"slow": "s", "fast": "f"}));

        assert_eq!(engine.render(&template, &store).unwrap(), "s-f");
    }

    #[tokio::test]
    async fn test_render_async_pending_tag() {
        let engine = Engine::default().with_tag("later", Later);
        let template = engine.compile("{% later 'x' %}y{% later 'slow' %}").unwrap();

        assert_eq!(
            engine.render_async(&template, &Store::new()).await.unwrap(),
            "xyslow"
        );
    }

    #[test]
    fn test_render_sync_pending_tag() {
        let engine = Engine::default().with_tag("later", Later);
        let template = engine.compile("{% later 'slow' %}y{% later 'z' %}").unwrap();

        assert_eq!(engine.render(&template, &Store::new()).unwrap(), "slowyz");
    }

    #[test]
    fn test_render_display_ignores_locale() {
        let engine = Engine::new(Options::default().with_locale("de-DE"))
            .with_filter_must("locale", locale_filter);
        let template = engine.compile("{{ 2.5 }} {{ 1000 }} {{ '' | locale }}").unwrap();

        assert_eq!(engine.render(&template, &Store::new()).unwrap(), "2.5 1000 de-DE");
    }

    #[test]
    fn test_stem() {
        assert_eq!(stem("item"), "item");
        assert_eq!(stem("parts/item.liquid"), "item");
        assert_eq!(stem(".hidden"), ".hidden");
    }

    /// Resolve every name to a template that writes the name, after a delay
    /// that is longer for `slow`.
    fn slow_resolver(path: &str, _: &Engine) -> Outcome<Option<Arc<Template>>> {
        let path = path.to_owned();
        let delay = if path == "slow" { 30 } else { 1 };

        Outcome::pending(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            let template = compile(path.as_str())?;

            Ok(Some(Arc::new(template)))
        })
    }

    /// Wraps the body of a block in brackets.
    struct Wrap;

    impl Tag for Wrap {
        fn kind(&self) -> TagKind {
            TagKind::Block
        }

        fn render(&self, _: Option<&Value>, body: Option<&str>, _: &Context) -> Outcome<String> {
            Outcome::ready(format!("[{}]", body.unwrap_or_default()))
        }
    }

    /// Reads JSON members after a delay that is longer for `slow`.
    struct SlowAccessor;

    impl Accessor for SlowAccessor {
        fn get(&self, host: &Value, member: &Value, _: &Context) -> Outcome<Binding> {
            let host = host.clone();
            let member = member.clone();
            let delay = if member == "slow" { 30 } else { 1 };

            Outcome::pending(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;

                Ok(JsonAccessor::lookup(&host, &member))
            })
        }
    }

    /// Writes its argument after a delay that is longer for `slow`.
    struct Later;

    impl Tag for Later {
        fn render(&self, argument: Option<&Value>, _: Option<&str>, _: &Context) -> Outcome<String> {
            let text = argument.and_then(Value::as_str).unwrap_or_default().to_owned();
            let delay = if text == "slow" { 30 } else { 1 };

            Outcome::pending(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;

                Ok(text)
            })
        }
    }

    fn locale_filter(_: &Value, _: &Arguments, context: &Context) -> Result<Value, Error> {
        Ok(Value::String(context.options().locale.clone()))
    }

    fn helper_render(source: &str, store: Store) -> String {
        let template = compile(source).unwrap();

        render(&template, &store).unwrap()
    }
}
