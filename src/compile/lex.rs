pub mod token;

use crate::{
    compile::{lex::token::Token, Keyword, Operator},
    log::{expected_operator, Error, INVALID_SYNTAX, UNEXPECTED_TOKEN},
    region::Region,
};

pub type LexResult = Result<Option<(Token, Region)>, Error>;

/// Provides methods to read the inner text of a tag or output as [`Token`]
/// instances.
///
/// Regions are absolute offsets into the full template source.
pub struct Lexer<'source> {
    /// Reference to the full source text.
    pub source: &'source str,
    /// Position within source.
    cursor: usize,
    /// End of the text being read.
    end: usize,
}

impl<'source> Lexer<'source> {
    /// Create a new [`Lexer`] over the given region of the source.
    #[inline]
    pub fn new(source: &'source str, region: Region) -> Self {
        Self {
            source,
            cursor: region.begin,
            end: region.end,
        }
    }

    /// Return the next [`Token`] and [`Region`].
    ///
    /// Whitespace is skipped.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when an unexpected character is found.
    pub fn next(&mut self) -> LexResult {
        let source = self.source;
        let from = self.cursor;
        let mut iterator = source[from..self.end]
            .char_indices()
            .map(|(d, c)| (from + d, c))
            .skip_while(|(_, c)| c.is_whitespace());

        let Some((index, char)) = iterator.next() else {
            self.cursor = self.end;
            return Ok(None);
        };

        let following = source[index + char.len_utf8()..self.end].chars().next();
        let mut advance = |length: usize, data: Token| {
            self.cursor = index + length;

            Ok(Some((data, (index..index + length).into())))
        };

        match char {
            '*' => advance(1, Token::Operator(Operator::Multiply)),
            '+' => advance(1, Token::Operator(Operator::Add)),
            '/' => advance(1, Token::Operator(Operator::Divide)),
            '%' => advance(1, Token::Operator(Operator::Modulo)),
            '-' => advance(1, Token::Operator(Operator::Subtract)),
            '.' if following == Some('.') => advance(2, Token::Range),
            '.' => advance(1, Token::Dot),
            ',' => advance(1, Token::Comma),
            ':' => advance(1, Token::Colon),
            '|' => advance(1, Token::Pipe),
            '(' => advance(1, Token::LeftParen),
            ')' => advance(1, Token::RightParen),
            '[' => advance(1, Token::LeftBracket),
            ']' => advance(1, Token::RightBracket),
            '"' | '\'' => self.lex_string(iterator, index, char),
            '=' | '!' | '>' | '<' => self.lex_operator(index, char, following),
            c if c.is_ascii_digit() => Ok(Some(self.lex_digit(index))),
            c if is_ident_start(c) => Ok(Some(self.lex_ident_or_keyword(iterator, index))),
            _ => Err(Error::compile(UNEXPECTED_TOKEN)
                .with_pointer(self.source, index..index + char.len_utf8())
                .with_help(
                    "expected an identifier, a number, an operator, or the beginning \
                    of a string literal marked with `\"` or `'`",
                )),
        }
    }

    /// Return a [`Token`] and [`Region`] based on the current and following
    /// character. All of these are recognized:
    ///
    /// `==`, `!=`, `<>`, `>=`, `<=`, `=`, `>`, `<`
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when a lone `!` is found.
    fn lex_operator(&mut self, from: usize, current: char, following: Option<char>) -> LexResult {
        let (length, token) = match (current, following) {
            ('=', Some('=')) => (2, Token::Operator(Operator::Equal)),
            ('!', Some('=')) => (2, Token::Operator(Operator::NotEqual)),
            ('<', Some('>')) => (2, Token::Operator(Operator::NotEqual)),
            ('>', Some('=')) => (2, Token::Operator(Operator::GreaterOrEqual)),
            ('<', Some('=')) => (2, Token::Operator(Operator::LesserOrEqual)),
            ('=', _) => (1, Token::Assign),
            ('>', _) => (1, Token::Operator(Operator::Greater)),
            ('<', _) => (1, Token::Operator(Operator::Lesser)),
            _ => {
                return Err(Error::compile(UNEXPECTED_TOKEN)
                    .with_pointer(self.source, from..from + 1)
                    .with_help(expected_operator(current)));
            }
        };
        self.cursor = from + length;

        Ok(Some((token, (from..self.cursor).into())))
    }

    /// Return a [`Token`] and [`Region`] containing [`Token::Number`].
    ///
    /// A period is part of the number only when a digit follows it, so
    /// `1..5` reads as a number, a range and a number.
    fn lex_digit(&mut self, from: usize) -> (Token, Region) {
        let text = &self.source[from..self.end];
        let bytes = text.as_bytes();
        let mut length = bytes.iter().take_while(|b| b.is_ascii_digit()).count();

        if bytes.get(length) == Some(&b'.')
            && bytes.get(length + 1).is_some_and(|b| b.is_ascii_digit())
        {
            length += 1;
            length += bytes[length..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .count();
        }
        self.cursor = from + length;

        (Token::Number, (from..self.cursor).into())
    }

    /// Return a [`Token`] and [`Region`] containing [`Token::String`] using
    /// the given iterator.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the string is never closed.
    fn lex_string<T>(&mut self, mut iter: T, from: usize, quote: char) -> LexResult
    where
        T: Iterator<Item = (usize, char)>,
    {
        loop {
            match iter.next() {
                Some((_, '\\')) => {
                    iter.next();
                }
                Some((index, c)) if c == quote => {
                    let to = index + 1;
                    self.cursor = to;

                    return Ok(Some((Token::String, (from..to).into())));
                }
                Some(_) => continue,
                None => {
                    return Err(Error::compile(INVALID_SYNTAX)
                        .with_pointer(self.source, from..self.end)
                        .with_help(format!(
                            "this might be an undelimited string, try closing it with `{quote}`"
                        )));
                }
            }
        }
    }

    /// Return a [`Token`] and [`Region`] from the given iterator.
    ///
    /// The `Token` will be [`Token::Identifier`] or [`Token::Keyword`].
    fn lex_ident_or_keyword<T>(&mut self, iter: T, from: usize) -> (Token, Region)
    where
        T: Iterator<Item = (usize, char)>,
    {
        let mut to = self.end;
        for (index, char) in iter {
            if char == '?' {
                to = index + 1;
                break;
            }
            if !is_ident_continue(char) {
                to = index;
                break;
            }
        }
        self.cursor = to;

        let source = self.source;
        let token = match &source[from..to] {
            "and" => Token::Keyword(Keyword::And),
            "or" => Token::Keyword(Keyword::Or),
            "contains" => Token::Keyword(Keyword::Contains),
            "startswith" => Token::Keyword(Keyword::StartsWith),
            "endswith" => Token::Keyword(Keyword::EndsWith),
            "true" => Token::Keyword(Keyword::True),
            "false" => Token::Keyword(Keyword::False),
            "nil" | "null" => Token::Keyword(Keyword::Nil),
            "empty" => Token::Keyword(Keyword::Empty),
            "blank" => Token::Keyword(Keyword::Blank),
            _ => Token::Identifier,
        };

        (token, (from..to).into())
    }
}

/// Return true if the given character is a recognized beginning identifier,
/// meaning '_' or an `xid_start`.
fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

/// Return true if the given character is a recognized continue identifier,
/// meaning an `xid_continue`.
fn is_ident_continue(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

#[cfg(test)]
mod tests {
    use super::Lexer;
    use crate::{
        compile::{lex::token::Token, Keyword, Operator},
        region::Region,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lex_path_and_filter() {
        let expect = vec![
            (Token::Identifier, 1..5),
            (Token::Dot, 5..6),
            (Token::Identifier, 6..10),
            (Token::Pipe, 11..12),
            (Token::Identifier, 13..17),
            (Token::Colon, 17..18),
            (Token::Number, 19..20),
        ];

        helper_lex_next_auto(" user.name | plus: 1 ", expect);
    }

    #[test]
    fn test_lex_range() {
        let expect = vec![
            (Token::LeftParen, 0..1),
            (Token::Number, 1..2),
            (Token::Range, 2..4),
            (Token::Identifier, 4..5),
            (Token::RightParen, 5..6),
        ];

        helper_lex_next_auto("(1..n)", expect);
    }

    #[test]
    fn test_lex_decimal() {
        helper_lex_next_auto("10.25", vec![(Token::Number, 0..5)]);
    }

    #[test]
    fn test_lex_keywords_and_operators() {
        let expect = vec![
            (Token::Identifier, 0..1),
            (Token::Operator(Operator::NotEqual), 2..4),
            (Token::Keyword(Keyword::Nil), 5..9),
            (Token::Keyword(Keyword::And), 10..13),
            (Token::Identifier, 14..15),
            (Token::Keyword(Keyword::Contains), 16..24),
            (Token::String, 25..28),
        ];

        helper_lex_next_auto("a <> null and b contains 'x'", expect);
    }

    #[test]
    fn test_lex_question_identifier() {
        helper_lex_next_auto("empty? ", vec![(Token::Identifier, 0..6)]);
    }

    #[test]
    fn test_lex_string_escape() {
        helper_lex_next_auto(r#""\"name\"""#, vec![(Token::String, 0..10)]);
    }

    #[test]
    fn test_lex_unclosed_string() {
        let mut lexer = Lexer::new("'abc", (0..4).into());
        assert!(lexer.next().is_err());
    }

    #[test]
    fn test_lex_lone_exclamation() {
        let mut lexer = Lexer::new("!a", (0..2).into());
        assert!(lexer.next().is_err());
    }

    /// Lex the whole source and compare every token against `expect`.
    fn helper_lex_next_auto<T>(source: &str, expect: Vec<(Token, T)>)
    where
        T: Into<Region>,
    {
        let mut lexer = Lexer::new(source, (0..source.len()).into());
        for (token, region) in expect {
            assert_eq!(lexer.next(), Ok(Some((token, region.into()))))
        }

        assert_eq!(lexer.next(), Ok(None));
        assert_eq!(lexer.next(), Ok(None));
    }
}
