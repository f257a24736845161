use super::{Error, ErrorKind};
use std::fmt::Display;

pub const UNEXPECTED_TOKEN: &str = "unexpected token";
pub const UNEXPECTED_TAG: &str = "unexpected tag";
pub const UNEXPECTED_EOF: &str = "unexpected eof";
pub const UNKNOWN_TAG: &str = "unknown tag";
pub const INVALID_SYNTAX: &str = "invalid syntax";
pub const INVALID_FILTER: &str = "invalid filter";
pub const INCOMPATIBLE_TYPES: &str = "incompatible types";
pub const UNDEFINED_VARIABLE: &str = "undefined variable";
pub const MISSING_TEMPLATE: &str = "missing template";

/// Return an [`Error`] explaining that the end of source was not expected.
pub fn error_eof(source: &str) -> Error {
    let source_len = source.len();
    Error::compile(UNEXPECTED_EOF)
        .with_pointer(source, source_len..source_len)
        .with_help("expected additional tokens, did you close all tags and outputs?")
}

/// Return an [`Error`] describing a template that no registry or resolver knows.
pub fn error_missing_template(name: &str) -> Error {
    Error::build(MISSING_TEMPLATE)
        .with_kind(ErrorKind::Include)
        .with_help(format!(
            "template `{name}` not found, add it with `.add_template` or register a resolver"
        ))
}

/// Return an [`Error`] describing a step ceiling that was exceeded.
pub fn error_step_limit(limit: usize) -> Error {
    Error::build("step limit exceeded")
        .with_kind(ErrorKind::StepLimit)
        .with_help(format!(
            "the render executed more than `{limit}` statements, raise `max_steps` \
            if this template is expected to do that much work"
        ))
}

/// Return an [`Error`] describing a recursion ceiling that was exceeded.
pub fn error_recursion_limit(limit: usize) -> Error {
    Error::build("recursion limit exceeded")
        .with_kind(ErrorKind::RecursionLimit)
        .with_help(format!(
            "blocks and inclusions are nested deeper than `{limit}`, \
            is a template including itself?"
        ))
}

/// Return a string describing an unexpected operator.
pub fn expected_operator<T>(received: T) -> String
where
    T: Display,
{
    format!(
        "expected operator like `+`, `-`, `*`, `/`, `%`, `==`, `!=`, `>=`, `<=`, found `{}`",
        received
    )
}
