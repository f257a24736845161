use crate::compile::{Keyword, Operator};
use std::fmt::Display;

/// Types emitted by the Lexer.
///
/// An abstraction over the text inside of a tag or output.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Token {
    /// String literal, single or double quoted.
    String,
    /// Integer or decimal number.
    Number,
    /// Identifier (unquoted string), may end with `?`.
    Identifier,
    /// .
    Dot,
    /// ..
    Range,
    /// ,
    Comma,
    /// :
    Colon,
    /// |
    Pipe,
    /// =
    Assign,
    /// (
    LeftParen,
    /// )
    RightParen,
    /// [
    LeftBracket,
    /// ]
    RightBracket,
    /// A recognized word such as `and` or `empty`.
    Keyword(Keyword),
    /// Describes an action taken on two values.
    Operator(Operator),
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::String => write!(f, "string"),
            Token::Number => write!(f, "number"),
            Token::Identifier => write!(f, "identifier"),
            Token::Dot => write!(f, "dot (.)"),
            Token::Range => write!(f, "range (..)"),
            Token::Comma => write!(f, "comma (,)"),
            Token::Colon => write!(f, "colon (:)"),
            Token::Pipe => write!(f, "pipe (|)"),
            Token::Assign => write!(f, "assign (=)"),
            Token::LeftParen => write!(f, "left parenthesis"),
            Token::RightParen => write!(f, "right parenthesis"),
            Token::LeftBracket => write!(f, "left bracket"),
            Token::RightBracket => write!(f, "right bracket"),
            Token::Keyword(keyword) => write!(f, "keyword {keyword}"),
            Token::Operator(operator) => write!(f, "operator {operator}"),
        }
    }
}
