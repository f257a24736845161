mod build;
mod lex;
mod parse;
mod scan;
mod template;

pub mod tree;

pub use crate::compile::template::Template;

use crate::{
    compile::{
        build::TreeBuilder,
        parse::Parser,
        scan::{Item, Scanner},
        tree::{Block, Output, Statement},
    },
    log::Error,
    Engine,
};
use morel::Finder;
use std::fmt::Display;

/// Compile a [`Template`] from the given text.
///
/// Provides a shortcut to quickly compile a `Template` without creating
/// an `Engine`.
///
/// # Examples
///
/// ```
/// use sluice::compile;
///
/// let template = compile("{{ name }}");
/// assert!(template.is_ok())
/// ```
pub fn compile<T>(text: T) -> Result<Template, Error>
where
    T: Into<String>,
{
    Engine::default().compile(text)
}

/// Compile the source text with the delimiters, options and custom tags of
/// the given [`Engine`].
pub(crate) fn compile_with(
    engine: &Engine,
    source: String,
    name: Option<&str>,
) -> Result<Template, Error> {
    let block = build_tree(engine, &source).map_err(|error| error.or_name(name))?;

    Ok(Template::new(name.map(str::to_owned), source, block))
}

/// Scan, parse and assemble the source text into a [`Block`].
fn build_tree(engine: &Engine, source: &str) -> Result<Block, Error> {
    let opening = Finder::new(engine.syntax().to_opening_syntax());
    let markers = Finder::new(engine.syntax().to_syntax());
    let mut scanner = Scanner::new(source, &opening, &markers, engine.options());
    let mut builder = TreeBuilder::new(source);

    while let Some(item) = scanner.next()? {
        match item {
            Item::Text(region) => builder.push_text(region)?,
            Item::Output(span) => {
                let expression = Parser::new(source, span.inner, engine.tags()).parse_output()?;
                builder.push(Statement::Output(Output {
                    expression,
                    region: span.region,
                }))?;
            }
            Item::Tag(span) => {
                let markup = Parser::new(source, span.inner, engine.tags()).parse_tag()?;
                builder.apply(markup, span.region)?;
            }
            Item::Verbatim(verbatim) => builder.push_verbatim(verbatim)?,
        }
    }

    builder.finish()
}

/// Keywords recognized by the Lexer and Parser.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Keyword {
    /// Logical conjunction.
    And,
    /// Logical disjunction.
    Or,
    /// Substring or membership test.
    Contains,
    /// Prefix test.
    StartsWith,
    /// Suffix test.
    EndsWith,
    /// A boolean true.
    True,
    /// A boolean false.
    False,
    /// The nil value, also spelled `null`.
    Nil,
    /// Matches empty strings, arrays and objects.
    Empty,
    /// Matches what `empty` matches, plus nil, false and whitespace.
    Blank,
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Keyword::And => write!(f, "and"),
            Keyword::Or => write!(f, "or"),
            Keyword::Contains => write!(f, "contains"),
            Keyword::StartsWith => write!(f, "startswith"),
            Keyword::EndsWith => write!(f, "endswith"),
            Keyword::True => write!(f, "true"),
            Keyword::False => write!(f, "false"),
            Keyword::Nil => write!(f, "nil"),
            Keyword::Empty => write!(f, "empty"),
            Keyword::Blank => write!(f, "blank"),
        }
    }
}

/// Operators recognized by the Parser.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Operator {
    /// +
    Add,
    /// -
    Subtract,
    /// *
    Multiply,
    /// /
    Divide,
    /// %
    Modulo,
    /// >
    Greater,
    /// <
    Lesser,
    /// ==
    Equal,
    /// != or <>
    NotEqual,
    /// >=
    GreaterOrEqual,
    /// <=
    LesserOrEqual,
    /// contains
    Contains,
    /// startswith
    StartsWith,
    /// endswith
    EndsWith,
    /// and
    And,
    /// or
    Or,
}

impl Operator {
    /// Return the binding strength of the [`Operator`].
    ///
    /// Higher numbers bind tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Or => 1,
            Operator::And => 2,
            Operator::Equal
            | Operator::NotEqual
            | Operator::Greater
            | Operator::Lesser
            | Operator::GreaterOrEqual
            | Operator::LesserOrEqual
            | Operator::Contains
            | Operator::StartsWith
            | Operator::EndsWith => 3,
            Operator::Add | Operator::Subtract => 4,
            Operator::Multiply | Operator::Divide | Operator::Modulo => 5,
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Add => write!(f, "+"),
            Operator::Subtract => write!(f, "-"),
            Operator::Multiply => write!(f, "*"),
            Operator::Divide => write!(f, "/"),
            Operator::Modulo => write!(f, "%"),
            Operator::Greater => write!(f, ">"),
            Operator::Lesser => write!(f, "<"),
            Operator::Equal => write!(f, "=="),
            Operator::NotEqual => write!(f, "!="),
            Operator::GreaterOrEqual => write!(f, ">="),
            Operator::LesserOrEqual => write!(f, "<="),
            Operator::Contains => write!(f, "contains"),
            Operator::StartsWith => write!(f, "startswith"),
            Operator::EndsWith => write!(f, "endswith"),
            Operator::And => write!(f, "and"),
            Operator::Or => write!(f, "or"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::compile;
    use crate::{log::ErrorKind, Engine, Options, Trimming};

    #[test]
    fn test_compile_named_error_carries_name() {
        let error = Engine::default()
            .compile_named("page.liquid", "{% if a %}x")
            .unwrap_err();

        assert_eq!(error.get_name(), Some("page.liquid"));
        assert_eq!(error.kind(), ErrorKind::Compile);
    }

    #[test]
    fn test_compile_mismatched_close() {
        let error = compile("{% if a %}{% for x in y %}{% endif %}{% endfor %}").unwrap_err();

        assert!(error.help().unwrap_or_default().contains("`for`"));
        assert!(error.help().unwrap_or_default().contains("`endif`"));
        assert_eq!(error.location(), Some((1, 27)));
    }

    #[test]
    fn test_compile_unclosed_points_at_opening() {
        let error = compile("abc\n  {% for x in y %}z").unwrap_err();

        assert_eq!(error.location(), Some((2, 3)));
    }

    #[test]
    fn test_compile_with_global_trimming() {
        let engine = Engine::new(Options::default().with_trimming(Trimming {
            tag_left: true,
            tag_right: true,
            ..Trimming::default()
        }));
        let template = engine.compile("a  {% if true %}  b  {% endif %}  c").unwrap();

        assert_eq!(engine.render(&template, &Default::default()).unwrap(), "abc");
    }
}
