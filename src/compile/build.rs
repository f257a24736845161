use crate::{
    compile::{
        parse::{Loop, Markup},
        scan::{Opaque, Verbatim},
        tree::{
            Assign, Block, Branch, Capture, Case, Counter, Custom, Cycle, Expression, For,
            Identifier, If, Output, Statement, Unless, When,
        },
    },
    log::{Error, UNEXPECTED_TAG},
    region::Region,
    tag::{Tag, TagKind},
};
use std::sync::Arc;

/// The parsed opening tag of a block.
enum Head {
    If(Expression),
    Unless(Expression),
    Case(Expression),
    For(Box<Loop>),
    Capture(Identifier),
    Custom {
        name: String,
        tag: Arc<dyn Tag>,
        argument: Option<Expression>,
    },
}

impl Head {
    fn name(&self) -> &str {
        match self {
            Head::If(_) => "if",
            Head::Unless(_) => "unless",
            Head::Case(_) => "case",
            Head::For(_) => "for",
            Head::Capture(_) => "capture",
            Head::Custom { name, .. } => name,
        }
    }
}

/// A section of a block, introduced by the opening tag or a sub-section tag.
enum Section {
    Body,
    Elsif(Expression),
    When(Vec<Expression>),
    Else,
}

/// A block whose close tag has not been seen yet.
struct Frame {
    head: Head,
    /// Region of the opening tag.
    region: Region,
    /// Sections in source order, the last one receives new statements.
    sections: Vec<(Section, Block)>,
}

impl Frame {
    fn new(head: Head, region: Region) -> Self {
        Self {
            head,
            region,
            sections: vec![(Section::Body, vec![])],
        }
    }

    fn has_else(&self) -> bool {
        self.sections
            .iter()
            .any(|(section, _)| matches!(section, Section::Else))
    }

    /// Return true if this is a `case` that has not seen a `when` yet.
    fn is_case_prelude(&self) -> bool {
        matches!(self.head, Head::Case(_)) && self.sections.len() == 1
    }
}

/// Converts parsed regions into a tree of statements, using a stack of open
/// blocks.
pub struct TreeBuilder<'source> {
    source: &'source str,
    root: Block,
    stack: Vec<Frame>,
}

impl<'source> TreeBuilder<'source> {
    /// Create a new [`TreeBuilder`].
    #[inline]
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            root: vec![],
            stack: vec![],
        }
    }

    /// Append literal text.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when non-whitespace text appears between `case`
    /// and the first `when`.
    pub fn push_text(&mut self, region: Region) -> Result<(), Error> {
        if self.in_case_prelude() {
            if self.source[region].trim().is_empty() {
                return Ok(());
            }

            return Err(self.error_case_prelude(region));
        }

        self.push(Statement::Text(region))
    }

    /// Append the body of a `raw` or `comment` block.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when a `raw` block appears between `case` and
    /// the first `when`.
    pub fn push_verbatim(&mut self, verbatim: Verbatim) -> Result<(), Error> {
        match verbatim.kind {
            Opaque::Comment if self.in_case_prelude() => Ok(()),
            Opaque::Comment => self.push(Statement::Comment(verbatim.body)),
            Opaque::Raw => self.push(Statement::Raw(verbatim.body)),
        }
    }

    /// Append a statement to the innermost open section.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the statement appears between `case` and
    /// the first `when`.
    pub fn push(&mut self, statement: Statement) -> Result<(), Error> {
        if self.in_case_prelude() {
            let region = match &statement {
                Statement::Output(output) => output.region,
                Statement::Text(region) | Statement::Raw(region) => *region,
                _ => self.stack.last().map(|frame| frame.region).unwrap_or_default(),
            };

            return Err(self.error_case_prelude(region));
        }

        match self.stack.last_mut() {
            Some(frame) => match frame.sections.last_mut() {
                Some((_, block)) => block.push(statement),
                None => unreachable!("a frame always has a body section"),
            },
            None => self.root.push(statement),
        }

        Ok(())
    }

    /// Apply a parsed tag found at the given region.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the tag is not valid at this position.
    pub fn apply(&mut self, markup: Markup, region: Region) -> Result<(), Error> {
        if self.in_case_prelude()
            && !matches!(markup, Markup::When(_) | Markup::Else | Markup::End(_))
        {
            return Err(self.error_case_prelude(region));
        }

        match markup {
            Markup::If(condition) => self.open(Head::If(condition), region),
            Markup::Unless(condition) => self.open(Head::Unless(condition), region),
            Markup::Case(subject) => self.open(Head::Case(subject), region),
            Markup::For(head) => self.open(Head::For(head), region),
            Markup::Capture(name) => self.open(Head::Capture(name), region),
            Markup::Elsif(condition) => {
                self.section("elsif", region, |frame| {
                    matches!(frame.head, Head::If(_)) && !frame.has_else()
                })?
                .push((Section::Elsif(condition), vec![]));
            }
            Markup::When(options) => {
                self.section("when", region, |frame| {
                    matches!(frame.head, Head::Case(_)) && !frame.has_else()
                })?
                .push((Section::When(options), vec![]));
            }
            Markup::Else => {
                self.section("else", region, |frame| {
                    matches!(
                        frame.head,
                        Head::If(_) | Head::Unless(_) | Head::Case(_) | Head::For(_)
                    ) && !frame.has_else()
                })?
                .push((Section::Else, vec![]));
            }
            Markup::End(name) => return self.close(&name, region),
            Markup::Custom {
                name,
                tag,
                argument,
            } => match tag.kind() {
                TagKind::Block => self.open(
                    Head::Custom {
                        name,
                        tag,
                        argument,
                    },
                    region,
                ),
                TagKind::Inline => {
                    return self.push(Statement::Custom(Custom {
                        name,
                        tag,
                        argument,
                        block: None,
                        region,
                    }))
                }
            },
            Markup::Break => return self.push(Statement::Break(region)),
            Markup::Continue => return self.push(Statement::Continue(region)),
            Markup::Assign(name, value) => {
                return self.push(Statement::Assign(Assign {
                    name,
                    value,
                    region,
                }))
            }
            Markup::Increment(name) => {
                return self.push(Statement::Increment(Counter { name, region }))
            }
            Markup::Decrement(name) => {
                return self.push(Statement::Decrement(Counter { name, region }))
            }
            Markup::Cycle(group, values) => {
                return self.push(Statement::Cycle(Cycle {
                    group,
                    values,
                    region,
                }))
            }
            Markup::Echo(expression) => {
                return self.push(Statement::Output(Output { expression, region }))
            }
            Markup::Include(mut include) => {
                include.region = region;
                return self.push(Statement::Include(*include));
            }
        }

        Ok(())
    }

    /// Return the root [`Block`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] pointing at the innermost block that was never closed.
    pub fn finish(mut self) -> Result<Block, Error> {
        if let Some(frame) = self.stack.pop() {
            let name = frame.head.name();

            return Err(Error::compile(UNEXPECTED_TAG)
                .with_pointer(self.source, frame.region)
                .with_help(format!(
                    "did you close the `{name}` block with an `end{name}` tag?"
                )));
        }

        Ok(self.root)
    }

    fn in_case_prelude(&self) -> bool {
        self.stack.last().is_some_and(Frame::is_case_prelude)
    }

    fn open(&mut self, head: Head, region: Region) {
        self.stack.push(Frame::new(head, region));
    }

    /// Return the sections of the innermost block, when `accepts` allows a
    /// new sub-section of the given name.
    fn section<F>(
        &mut self,
        name: &str,
        region: Region,
        accepts: F,
    ) -> Result<&mut Vec<(Section, Block)>, Error>
    where
        F: Fn(&Frame) -> bool,
    {
        match self.stack.last_mut() {
            Some(frame) if accepts(frame) => Ok(&mut frame.sections),
            Some(frame) => {
                let open = frame.head.name().to_owned();

                Err(Error::compile(UNEXPECTED_TAG)
                    .with_pointer(self.source, region)
                    .with_help(format!("`{name}` is not valid here, inside of `{open}`")))
            }
            None => Err(Error::compile(UNEXPECTED_TAG)
                .with_pointer(self.source, region)
                .with_help(format!("`{name}` is not valid outside of a block"))),
        }
    }

    /// Close the innermost block and append the assembled statement.
    fn close(&mut self, name: &str, region: Region) -> Result<(), Error> {
        let frame = match self.stack.pop() {
            Some(frame) if frame.head.name() == name => frame,
            Some(frame) => {
                let open = frame.head.name();

                return Err(Error::compile(UNEXPECTED_TAG)
                    .with_pointer(self.source, region)
                    .with_help(format!(
                        "found `end{name}`, but the innermost open block is `{open}`, \
                        close it with `end{open}` first"
                    )));
            }
            None => {
                return Err(Error::compile(UNEXPECTED_TAG)
                    .with_pointer(self.source, region)
                    .with_help(format!("`end{name}` does not close any open block")))
            }
        };

        let region = frame.region.combine(region);
        let mut sections = frame.sections.into_iter();
        let (_, body) = sections
            .next()
            .unwrap_or_else(|| unreachable!("a frame always has a body section"));

        let statement = match frame.head {
            Head::If(condition) => {
                let mut branches = vec![Branch {
                    condition,
                    block: body,
                }];
                let mut otherwise = None;
                for (section, block) in sections {
                    match section {
                        Section::Elsif(condition) => branches.push(Branch { condition, block }),
                        _ => otherwise = Some(block),
                    }
                }

                Statement::If(If {
                    branches,
                    otherwise,
                    region,
                })
            }
            Head::Unless(condition) => Statement::Unless(Unless {
                condition,
                block: body,
                otherwise: sections.next().map(|(_, block)| block),
                region,
            }),
            Head::Case(subject) => {
                let mut whens = vec![];
                let mut otherwise = None;
                for (section, block) in sections {
                    match section {
                        Section::When(options) => whens.push(When { options, block }),
                        _ => otherwise = Some(block),
                    }
                }

                Statement::Case(Case {
                    subject,
                    whens,
                    otherwise,
                    region,
                })
            }
            Head::For(head) => {
                let Loop {
                    variable,
                    source,
                    reversed,
                    limit,
                    offset,
                } = *head;

                Statement::For(For {
                    variable,
                    source,
                    reversed,
                    limit,
                    offset,
                    block: body,
                    otherwise: sections.next().map(|(_, block)| block),
                    region,
                })
            }
            Head::Capture(name) => Statement::Capture(Capture {
                name,
                block: body,
                region,
            }),
            Head::Custom {
                name,
                tag,
                argument,
            } => Statement::Custom(Custom {
                name,
                tag,
                argument,
                block: Some(body),
                region,
            }),
        };

        self.push(statement)
    }

    fn error_case_prelude(&self, region: Region) -> Error {
        Error::compile(UNEXPECTED_TAG)
            .with_pointer(self.source, region)
            .with_help(
                "only whitespace and comments may appear between `case` and the first `when`",
            )
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        compile::{compile, tree::Statement},
        log::ErrorKind,
    };

    #[test]
    fn test_build_if_sections() {
        let template =
            compile("{% if a %}1{% elsif b %}2{% elsif c %}3{% else %}4{% endif %}").unwrap();

        match &template.block()[..] {
            [Statement::If(statement)] => {
                assert_eq!(statement.branches.len(), 3);
                assert!(statement.otherwise.is_some());
            }
            other => panic!("expected if, found {other:?}"),
        }
    }

    #[test]
    fn test_build_case_prelude() {
        let template = compile(
            "{% case x %}\n  {% comment %}ignored{% endcomment %}\n{% when 1 %}a{% else %}b{% endcase %}",
        )
        .unwrap();

        match &template.block()[..] {
            [Statement::Case(statement)] => {
                assert_eq!(statement.whens.len(), 1);
                assert!(statement.otherwise.is_some());
            }
            other => panic!("expected case, found {other:?}"),
        }

        assert!(compile("{% case x %}text{% when 1 %}{% endcase %}").is_err());
        assert!(compile("{% case x %}{{ y }}{% when 1 %}{% endcase %}").is_err());
    }

    #[test]
    fn test_build_section_rules() {
        assert!(compile("{% if a %}{% else %}{% elsif b %}{% endif %}").is_err());
        assert!(compile("{% if a %}{% else %}{% else %}{% endif %}").is_err());
        assert!(compile("{% for x in y %}{% elsif b %}{% endfor %}").is_err());
        assert!(compile("{% capture x %}{% else %}{% endcapture %}").is_err());
        assert!(compile("{% case x %}{% else %}{% when 1 %}{% endcase %}").is_err());
        assert!(compile("{% else %}").is_err());
    }

    #[test]
    fn test_build_stray_close() {
        let error = compile("a{% endfor %}").unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Compile);
        assert_eq!(error.location(), Some((1, 2)));
    }

    #[test]
    fn test_build_for_else() {
        let template = compile("{% for x in y %}a{% else %}b{% endfor %}").unwrap();

        match &template.block()[..] {
            [Statement::For(statement)] => {
                assert_eq!(statement.block.len(), 1);
                assert!(statement.otherwise.is_some());
            }
            other => panic!("expected for, found {other:?}"),
        }
    }
}
