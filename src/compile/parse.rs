//! Parses the inner text of one output or tag.
//!
//! Utilizes a Lexer to receive instances of Token, which it uses to construct
//! an [`Expression`] for outputs, or a [`Markup`] for tags.
use crate::{
    compile::{
        lex::{token::Token, LexResult, Lexer},
        tree::{
            Argument, Binary, Call, Constant, Expression, Identifier, Include, Literal, Mode,
            Pass, Path, Range, Segment,
        },
        Keyword, Operator,
    },
    log::{Error, INVALID_SYNTAX, UNEXPECTED_EOF, UNEXPECTED_TOKEN, UNKNOWN_TAG},
    region::Region,
    tag::Tag,
};
use serde_json::{Number, Value};
use std::{collections::HashMap, sync::Arc};

/// The head of a `for` tag.
#[derive(Debug, Clone)]
pub struct Loop {
    pub variable: Identifier,
    pub source: Expression,
    pub reversed: bool,
    pub limit: Option<Expression>,
    pub offset: Option<Expression>,
}

/// A parsed tag.
#[derive(Clone)]
pub enum Markup {
    If(Expression),
    Elsif(Expression),
    Else,
    Unless(Expression),
    Case(Expression),
    When(Vec<Expression>),
    For(Box<Loop>),
    Break,
    Continue,
    Capture(Identifier),
    Assign(Identifier, Expression),
    Increment(Identifier),
    Decrement(Identifier),
    Cycle(Option<Expression>, Vec<Expression>),
    Echo(Expression),
    Include(Box<Include>),
    Custom {
        name: String,
        tag: Arc<dyn Tag>,
        argument: Option<Expression>,
    },
    /// `end<name>`, holding the name without the prefix.
    End(String),
}

impl std::fmt::Debug for Markup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Markup::Custom { name, argument, .. } => f
                .debug_struct("Custom")
                .field("name", name)
                .field("argument", argument)
                .finish(),
            Markup::End(name) => f.debug_tuple("End").field(name).finish(),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl Markup {
    /// Return the tag name that produced this [`Markup`].
    pub fn name(&self) -> &str {
        match self {
            Markup::If(_) => "if",
            Markup::Elsif(_) => "elsif",
            Markup::Else => "else",
            Markup::Unless(_) => "unless",
            Markup::Case(_) => "case",
            Markup::When(_) => "when",
            Markup::For(_) => "for",
            Markup::Break => "break",
            Markup::Continue => "continue",
            Markup::Capture(_) => "capture",
            Markup::Assign(..) => "assign",
            Markup::Increment(_) => "increment",
            Markup::Decrement(_) => "decrement",
            Markup::Cycle(..) => "cycle",
            Markup::Echo(_) => "echo",
            Markup::Include(include) => match include.mode {
                Mode::Include => "include",
                Mode::Render => "render",
            },
            Markup::Custom { name, .. } => name.as_str(),
            Markup::End(name) => name.as_str(),
        }
    }
}

pub struct Parser<'source> {
    /// Lexer used to pull from source as tokens instead of raw text.
    lexer: Lexer<'source>,
    /// Reference to the full source text.
    source: &'source str,
    /// The inner region being parsed.
    region: Region,
    /// Tags registered by the host.
    tags: &'source HashMap<String, Arc<dyn Tag>>,
    /// Store peeked tokens.
    ///
    /// Double option is used to remember when the next token is None.
    buffer: Option<Option<(Token, Region)>>,
}

impl<'source> Parser<'source> {
    /// Create a new Parser over the given inner region of the source.
    #[inline]
    pub fn new(
        source: &'source str,
        region: Region,
        tags: &'source HashMap<String, Arc<dyn Tag>>,
    ) -> Self {
        Self {
            lexer: Lexer::new(source, region),
            source,
            region,
            tags,
            buffer: None,
        }
    }

    /// Parse the inner text of an output.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the text is not a filtered expression.
    pub fn parse_output(mut self) -> Result<Expression, Error> {
        let expression = self.parse_filtered()?;
        self.expect_end()?;

        Ok(expression)
    }

    /// Parse the inner text of a tag.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the tag is unknown or its markup is invalid.
    pub fn parse_tag(mut self) -> Result<Markup, Error> {
        let name = self.parse_identifier()?;
        let tags = self.tags;

        let markup = match name.name.as_str() {
            "if" => Markup::If(self.parse_expression(1)?),
            "elsif" => Markup::Elsif(self.parse_expression(1)?),
            "else" => Markup::Else,
            "unless" => Markup::Unless(self.parse_expression(1)?),
            "case" => Markup::Case(self.parse_expression(1)?),
            "when" => Markup::When(self.parse_when()?),
            "for" => Markup::For(Box::new(self.parse_for()?)),
            "break" => Markup::Break,
            "continue" => Markup::Continue,
            "capture" => Markup::Capture(self.parse_identifier()?),
            "assign" => {
                let variable = self.parse_identifier()?;
                self.next_must(Token::Assign)?;
                Markup::Assign(variable, self.parse_filtered()?)
            }
            "increment" => Markup::Increment(self.parse_identifier()?),
            "decrement" => Markup::Decrement(self.parse_identifier()?),
            "cycle" => self.parse_cycle()?,
            "echo" => Markup::Echo(self.parse_filtered()?),
            "include" => Markup::Include(Box::new(self.parse_include(Mode::Include)?)),
            "render" => Markup::Include(Box::new(self.parse_include(Mode::Render)?)),
            other => match tags.get(other) {
                Some(tag) => {
                    let argument = if self.peek()?.is_some() {
                        Some(self.parse_filtered()?)
                    } else {
                        None
                    };
                    Markup::Custom {
                        name: other.to_owned(),
                        tag: tag.clone(),
                        argument,
                    }
                }
                None if other.len() > 3 && other.starts_with("end") => {
                    Markup::End(other[3..].to_owned())
                }
                None => {
                    return Err(Error::compile(UNKNOWN_TAG)
                        .with_pointer(self.source, name.region)
                        .with_help(format!(
                            "tag `{other}` is not recognized, custom tags must be \
                            registered with `.add_tag`"
                        )))
                }
            },
        };
        self.expect_end()?;

        Ok(markup)
    }

    /// Parse a `when` list, options are separated by `,` or `or`.
    fn parse_when(&mut self) -> Result<Vec<Expression>, Error> {
        let mut options = vec![self.parse_expression(2)?];
        while self.next_is(Token::Comma)? || self.next_is(Token::Keyword(Keyword::Or))? {
            self.next()?;
            options.push(self.parse_expression(2)?);
        }

        Ok(options)
    }

    /// Parse the head of a `for` tag.
    ///
    /// ```text
    /// for item in items reversed limit: 2 offset: 1
    /// ```
    fn parse_for(&mut self) -> Result<Loop, Error> {
        let variable = self.parse_identifier()?;
        let keyword = self.parse_identifier()?;
        if keyword.name != "in" {
            return Err(Error::compile(UNEXPECTED_TOKEN)
                .with_pointer(self.source, keyword.region)
                .with_help("expected `in`, as in `for item in items`"));
        }

        let mut head = Loop {
            variable,
            source: self.parse_primary()?,
            reversed: false,
            limit: None,
            offset: None,
        };
        while let Some((token, region)) = self.peek()? {
            if token == Token::Comma {
                self.next()?;
                continue;
            }
            let modifier = self.parse_identifier()?;
            match modifier.name.as_str() {
                "reversed" => head.reversed = true,
                "limit" => {
                    self.next_must(Token::Colon)?;
                    head.limit = Some(self.parse_primary()?);
                }
                "offset" => {
                    self.next_must(Token::Colon)?;
                    head.offset = Some(self.parse_primary()?);
                }
                _ => {
                    return Err(Error::compile(UNEXPECTED_TOKEN)
                        .with_pointer(self.source, region)
                        .with_help("expected `reversed`, `limit` or `offset`"))
                }
            }
        }

        Ok(head)
    }

    /// Parse a `cycle` tag, with an optional group name.
    ///
    /// ```text
    /// cycle 'odd', 'even'
    /// cycle 'rows': 'odd', 'even'
    /// ```
    fn parse_cycle(&mut self) -> Result<Markup, Error> {
        let first = self.parse_primary()?;
        let (group, mut values) = if self.next_is(Token::Colon)? {
            self.next()?;
            (Some(first), vec![self.parse_primary()?])
        } else {
            (None, vec![first])
        };
        while self.next_is(Token::Comma)? {
            self.next()?;
            values.push(self.parse_primary()?);
        }

        Ok(Markup::Cycle(group, values))
    }

    /// Parse an `include` or `render` tag.
    ///
    /// ```text
    /// include 'card' with product as item, size: 'small'
    /// render 'row' for rows
    /// ```
    fn parse_include(&mut self, mode: Mode) -> Result<Include, Error> {
        let mut include = Include {
            mode,
            path: self.parse_primary()?,
            pass: None,
            alias: None,
            arguments: vec![],
            region: self.region,
        };

        loop {
            let Some((token, region)) = self.peek()? else {
                break;
            };
            if token == Token::Comma {
                self.next()?;
                continue;
            }

            let word = self.parse_identifier()?;
            if self.next_is(Token::Colon)? {
                self.next()?;
                let value = self.parse_expression(1)?;
                include.arguments.push((word, value));
                continue;
            }

            match word.name.as_str() {
                "with" if include.pass.is_none() => {
                    include.pass = Some(Pass::With(self.parse_primary()?))
                }
                "for" if include.pass.is_none() => {
                    include.pass = Some(Pass::For(self.parse_primary()?))
                }
                "as" if include.alias.is_none() => include.alias = Some(self.parse_identifier()?),
                _ => {
                    return Err(Error::compile(UNEXPECTED_TOKEN)
                        .with_pointer(self.source, region)
                        .with_help("expected `with`, `for`, `as` or a `key: value` argument"))
                }
            }
        }

        Ok(include)
    }

    /// Parse an expression followed by any number of filters.
    ///
    /// ```text
    /// name | prepend: "hello, " | truncate: 10, ellipsis: "..."
    /// ```
    fn parse_filtered(&mut self) -> Result<Expression, Error> {
        let mut expression = self.parse_expression(1)?;

        while self.next_is(Token::Pipe)? {
            self.next_must(Token::Pipe)?;
            let name = self.parse_identifier()?;
            let arguments = if self.next_is(Token::Colon)? {
                self.next()?;
                self.parse_arguments()?
            } else {
                vec![]
            };

            let end_as = arguments
                .last()
                .map(|argument| argument.value.get_region())
                .unwrap_or(name.region);
            let region = expression.get_region().combine(end_as);

            expression = Expression::Call(Call {
                name,
                receiver: Box::new(expression),
                arguments,
                region,
            })
        }

        Ok(expression)
    }

    /// Parse filter arguments separated by commas.
    ///
    /// An argument is named when an identifier is followed by a colon.
    fn parse_arguments(&mut self) -> Result<Vec<Argument>, Error> {
        let mut arguments = vec![];
        loop {
            let value = self.parse_primary()?;
            let argument = match value {
                Expression::Path(path) if path.segments.len() == 1 && self.next_is(Token::Colon)? => {
                    self.next()?;
                    let name = match path.segments.into_iter().next() {
                        Some(Segment::Identifier(identifier)) => identifier,
                        _ => unreachable!("a path always begins with an identifier"),
                    };
                    Argument {
                        name: Some(name),
                        value: self.parse_primary()?,
                    }
                }
                value => Argument { name: None, value },
            };
            arguments.push(argument);

            if !self.next_is(Token::Comma)? {
                break;
            }
            self.next()?;
        }

        Ok(arguments)
    }

    /// Parse a binary expression whose operators bind at least as tightly
    /// as `minimum`.
    ///
    /// Operators of equal precedence associate to the left.
    fn parse_expression(&mut self, minimum: u8) -> Result<Expression, Error> {
        let mut left = self.parse_primary()?;

        while let Some(operator) = self.peek_operator()? {
            let precedence = operator.precedence();
            if precedence < minimum {
                break;
            }
            self.next()?;

            let right = self.parse_expression(precedence + 1)?;
            let region = left.get_region().combine(right.get_region());
            left = Expression::Binary(Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                region,
            });
        }

        Ok(left)
    }

    /// Return the upcoming binary [`Operator`], if any.
    fn peek_operator(&mut self) -> Result<Option<Operator>, Error> {
        let operator = match self.peek()? {
            Some((Token::Operator(operator), _)) => Some(operator),
            Some((Token::Keyword(Keyword::And), _)) => Some(Operator::And),
            Some((Token::Keyword(Keyword::Or), _)) => Some(Operator::Or),
            Some((Token::Keyword(Keyword::Contains), _)) => Some(Operator::Contains),
            Some((Token::Keyword(Keyword::StartsWith), _)) => Some(Operator::StartsWith),
            Some((Token::Keyword(Keyword::EndsWith), _)) => Some(Operator::EndsWith),
            _ => None,
        };

        Ok(operator)
    }

    /// Parse a primary expression.
    ///
    /// ```text
    /// "hello"  -10  2.5  true  nil  empty
    /// person.name  items[0]  (1..5)  (a + b)
    /// ```
    fn parse_primary(&mut self) -> Result<Expression, Error> {
        let (token, region) = self.next_any_must()?;

        let expression = match token {
            Token::Keyword(keyword) => {
                let constant = match keyword {
                    Keyword::True => Constant::Value(Value::Bool(true)),
                    Keyword::False => Constant::Value(Value::Bool(false)),
                    Keyword::Nil => Constant::Value(Value::Null),
                    Keyword::Empty => Constant::Empty,
                    Keyword::Blank => Constant::Blank,
                    _ => {
                        return Err(Error::compile(UNEXPECTED_TOKEN)
                            .with_pointer(self.source, region)
                            .with_help(format!("expected a value, found `{keyword}`")))
                    }
                };
                Expression::Literal(Literal { constant, region })
            }
            Token::Operator(Operator::Subtract) => {
                let (_, next_region) = self.next_must(Token::Number)?;

                // -1000 <- valid, negative number
                // - 1000 <- invalid
                if !region.is_neighbor(next_region) {
                    return Err(Error::compile(UNEXPECTED_TOKEN)
                        .with_pointer(self.source, region)
                        .with_help(format!(
                            "if you want to indicate that {} is a negative number \
                            try removing the separating whitespace",
                            &self.source[next_region]
                        )));
                }

                self.parse_number_literal(region.combine(next_region))?
            }
            Token::Number => self.parse_number_literal(region)?,
            Token::String => Expression::Literal(Literal {
                constant: Constant::Value(Value::String(self.parse_string(region)?)),
                region,
            }),
            Token::Identifier => self.parse_path(region)?,
            Token::LeftParen => {
                let from = self.parse_expression(1)?;
                if self.next_is(Token::Range)? {
                    self.next()?;
                    let to = self.parse_expression(1)?;
                    let (_, end) = self.next_must(Token::RightParen)?;

                    Expression::Range(Range {
                        from: Box::new(from),
                        to: Box::new(to),
                        region: region.combine(end),
                    })
                } else {
                    self.next_must(Token::RightParen)?;
                    from
                }
            }
            token => {
                return Err(Error::compile(UNEXPECTED_TOKEN)
                    .with_pointer(self.source, region)
                    .with_help(format!("expected a value, found {token}")))
            }
        };

        Ok(expression)
    }

    /// Parse a path that begins with the identifier at the given region.
    fn parse_path(&mut self, region: Region) -> Result<Expression, Error> {
        let mut segments = vec![Segment::Identifier(self.identifier(region))];
        let mut end = region;

        loop {
            if self.next_is(Token::Dot)? {
                self.next()?;
                match self.next_any_must()? {
                    (Token::Identifier | Token::Keyword(_), region) => {
                        segments.push(Segment::Identifier(self.identifier(region)));
                        end = region;
                    }
                    (_, region) => {
                        return Err(Error::compile(UNEXPECTED_TOKEN)
                            .with_pointer(self.source, region)
                            .with_help("expected an unquoted identifier such as `one.two`"))
                    }
                }
            } else if self.next_is(Token::LeftBracket)? {
                self.next()?;
                let index = self.parse_expression(1)?;
                let (_, close) = self.next_must(Token::RightBracket)?;
                segments.push(Segment::Indexer(index));
                end = close;
            } else {
                break;
            }
        }

        Ok(Expression::Path(Path {
            segments,
            region: region.combine(end),
        }))
    }

    /// Parse an [`Identifier`].
    ///
    /// # Errors
    ///
    /// Propagates an error from next_must if the next token is not an
    /// Identifier.
    fn parse_identifier(&mut self) -> Result<Identifier, Error> {
        let (_, region) = self.next_must(Token::Identifier)?;

        Ok(self.identifier(region))
    }

    /// Create an [`Identifier`] from the text at the given region.
    ///
    /// A trailing `?` is dropped from the name.
    fn identifier(&self, region: Region) -> Identifier {
        Identifier {
            name: self.source[region].trim_end_matches('?').to_owned(),
            region,
        }
    }

    /// Parse a String from the literal value of the given Region.
    ///
    /// # Errors
    ///
    /// Returns an error if an unrecognized escape character is found.
    fn parse_string(&self, region: Region) -> Result<String, Error> {
        let window = &self.source[region];
        let inner = &window[1..window.len() - 1];
        if !inner.contains('\\') {
            return Ok(inner.to_owned());
        }

        let mut string = String::with_capacity(inner.len());
        let mut iter = inner.chars();
        while let Some(c) = iter.next() {
            if c != '\\' {
                string.push(c);
                continue;
            }
            let c = match iter.next() {
                Some('n') => '\n',
                Some('r') => '\r',
                Some('t') => '\t',
                Some('\\') => '\\',
                Some('"') => '"',
                Some('\'') => '\'',
                _ => {
                    return Err(Error::compile("unexpected escape character")
                        .with_pointer(self.source, region)
                        .with_help("recognized escapes are `\\n`, `\\r`, `\\t`, `\\\\`, `\\'` and `\\\"`"))
                }
            };
            string.push(c);
        }

        Ok(string)
    }

    /// Parse a Literal containing a Value::Number from the given Region.
    ///
    /// # Errors
    ///
    /// Returns an error if the literal value of the Region cannot be converted
    /// to a Value::Number.
    fn parse_number_literal(&self, region: Region) -> Result<Expression, Error> {
        let window = &self.source[region];
        let number: Number = window.parse().map_err(|_| {
            Error::compile("unrecognizable number")
                .with_pointer(self.source, region)
                .with_help(format!(
                    "numbers may begin with `{}` to indicate a negative \
                    number and must not end with a decimal",
                    Operator::Subtract
                ))
        })?;

        Ok(Expression::Literal(Literal {
            constant: Constant::Value(Value::Number(number)),
            region,
        }))
    }

    /// Return an [`Error`] if any token remains.
    fn expect_end(&mut self) -> Result<(), Error> {
        match self.next()? {
            None => Ok(()),
            Some((token, region)) => Err(Error::compile(UNEXPECTED_TOKEN)
                .with_pointer(self.source, region)
                .with_help(format!("expected end of markup, found {token}"))),
        }
    }

    /// Peek the next token.
    ///
    /// # Errors
    ///
    /// Propagates any error reported by the underlying Lexer.
    fn peek(&mut self) -> LexResult {
        if let o @ None = &mut self.buffer {
            *o = Some(self.lexer.next()?);
        }

        Ok(self.buffer.unwrap_or(None))
    }

    /// Get the next token.
    ///
    /// Prefers to pull a token from the internal buffer first, but will pull from
    /// the lexer when the buffer is empty.
    fn next(&mut self) -> LexResult {
        match self.buffer.take() {
            Some(t) => Ok(t),
            None => self.lexer.next(),
        }
    }

    /// Returns true if the given token matches the upcoming token.
    ///
    /// # Errors
    ///
    /// Propagates any errors reported by the underlying lexer.
    fn next_is(&mut self, expect: Token) -> Result<bool, Error> {
        Ok(self
            .peek()?
            .map(|(token, _)| token == expect)
            .unwrap_or(false))
    }

    /// Get the next token, and compare it to the given token.
    ///
    /// # Errors
    ///
    /// An error is returned if the next token does not match the given token,
    /// or when [next()] returns None.
    fn next_must(&mut self, expect: Token) -> Result<(Token, Region), Error> {
        match self.next()? {
            Some((token, region)) if token == expect => Ok((token, region)),
            Some((_, region)) => Err(Error::compile(UNEXPECTED_TOKEN)
                .with_pointer(self.source, region)
                .with_help(format!("expected {expect}"))),
            None => Err(self.error_end().with_help(format!("expected {expect}"))),
        }
    }

    /// Get the next token.
    ///
    /// Similar to "next()" but requires that a token is returned.
    ///
    /// # Errors
    ///
    /// An error is returned if no more tokens are left.
    fn next_any_must(&mut self) -> Result<(Token, Region), Error> {
        match self.next()? {
            Some(next) => Ok(next),
            None => Err(self.error_end()),
        }
    }

    /// Return an [`Error`] pointing at the end of the markup.
    fn error_end(&self) -> Error {
        let end = self.region.end;
        let reason = if end == self.source.len() {
            UNEXPECTED_EOF
        } else {
            INVALID_SYNTAX
        };

        Error::compile(reason)
            .with_pointer(self.source, end..end)
            .with_help("expected additional tokens, is the markup complete?")
    }
}

#[cfg(test)]
mod tests {
    use super::{Markup, Parser};
    use crate::{
        compile::{
            tree::{Constant, Expression, Mode, Pass, Segment},
            Operator,
        },
        log::Error,
        tag::Tag,
    };
    use serde_json::json;
    use std::{collections::HashMap, sync::Arc};

    fn output(source: &str) -> Result<Expression, Error> {
        let tags = HashMap::new();
        Parser::new(source, (0..source.len()).into(), &tags).parse_output()
    }

    fn tag(source: &str) -> Result<Markup, Error> {
        let tags: HashMap<String, Arc<dyn Tag>> = HashMap::new();
        Parser::new(source, (0..source.len()).into(), &tags).parse_tag()
    }

    #[test]
    fn test_parse_precedence() {
        let expression = output("1 + 2 * 3 == 7 or false").unwrap();

        let Expression::Binary(or) = expression else {
            panic!("expected binary expression");
        };
        assert_eq!(or.operator, Operator::Or);
        let Expression::Binary(equal) = *or.left else {
            panic!("expected binary expression");
        };
        assert_eq!(equal.operator, Operator::Equal);
        let Expression::Binary(add) = *equal.left else {
            panic!("expected binary expression");
        };
        assert_eq!(add.operator, Operator::Add);
        assert!(matches!(*add.right, Expression::Binary(ref b) if b.operator == Operator::Multiply));
    }

    #[test]
    fn test_parse_left_associative() {
        let Expression::Binary(outer) = output("10 - 4 - 3").unwrap() else {
            panic!("expected binary expression");
        };

        assert!(matches!(*outer.left, Expression::Binary(_)));
        assert!(matches!(*outer.right, Expression::Literal(_)));
    }

    #[test]
    fn test_parse_filter_chain() {
        let Expression::Call(outer) = output("x | f1: a, key: 'v' | f2").unwrap() else {
            panic!("expected call");
        };
        assert_eq!(outer.name.name, "f2");
        assert!(outer.arguments.is_empty());

        let Expression::Call(inner) = *outer.receiver else {
            panic!("expected call");
        };
        assert_eq!(inner.name.name, "f1");
        assert_eq!(inner.arguments.len(), 2);
        assert!(inner.arguments[0].name.is_none());
        assert_eq!(inner.arguments[1].name.as_ref().unwrap().name, "key");
    }

    #[test]
    fn test_parse_path_segments() {
        let Expression::Path(path) = output("user.tags[0].size?").unwrap() else {
            panic!("expected path");
        };

        assert_eq!(path.segments.len(), 4);
        assert!(matches!(&path.segments[2], Segment::Indexer(_)));
        assert!(matches!(&path.segments[3], Segment::Identifier(i) if i.name == "size"));
    }

    #[test]
    fn test_parse_negative_number() {
        let Expression::Literal(literal) = output("-12").unwrap() else {
            panic!("expected literal");
        };

        assert_eq!(literal.constant, Constant::Value(json!(-12)));
        assert!(output("- 12").is_err());
    }

    #[test]
    fn test_parse_range() {
        assert!(matches!(output("(1..n)").unwrap(), Expression::Range(_)));
    }

    #[test]
    fn test_parse_string_escapes() {
        let Expression::Literal(literal) = output(r#"'it\'s\n'"#).unwrap() else {
            panic!("expected literal");
        };

        assert_eq!(literal.constant, Constant::Value(json!("it's\n")));
    }

    #[test]
    fn test_parse_for_head() {
        let Markup::For(head) = tag("for item in items reversed limit: 2 offset: n").unwrap() else {
            panic!("expected for");
        };

        assert_eq!(head.variable.name, "item");
        assert!(head.reversed);
        assert!(head.limit.is_some() && head.offset.is_some());
    }

    #[test]
    fn test_parse_when_options() {
        let Markup::When(options) = tag("when 1, 2 or 3").unwrap() else {
            panic!("expected when");
        };

        assert_eq!(options.len(), 3);
    }

    #[test]
    fn test_parse_cycle_group() {
        let Markup::Cycle(group, values) = tag("cycle 'rows': 'odd', 'even'").unwrap() else {
            panic!("expected cycle");
        };

        assert!(group.is_some());
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_parse_include() {
        let Markup::Include(include) = tag("render 'card' for products as product, size: 2").unwrap()
        else {
            panic!("expected include");
        };

        assert_eq!(include.mode, Mode::Render);
        assert!(matches!(include.pass, Some(Pass::For(_))));
        assert_eq!(include.alias.as_ref().unwrap().name, "product");
        assert_eq!(include.arguments[0].0.name, "size");
    }

    #[test]
    fn test_parse_end_and_unknown() {
        assert!(matches!(tag("endif").unwrap(), Markup::End(name) if name == "if"));
        assert!(tag("frobnicate x").is_err());
        assert!(tag("assign = 1").is_err());
        assert!(tag("else x").is_err());
    }
}
