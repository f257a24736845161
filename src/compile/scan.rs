use crate::{
    log::{error_eof, Error, UNEXPECTED_TOKEN},
    options::Options,
    region::Region,
    syntax::Marker,
};
use morel::Finder;

/// An output or tag region found in the source text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    /// The region including both delimiters.
    pub region: Region,
    /// The region between the delimiters, excluding trim markers.
    pub inner: Region,
    /// True when the region is an output, false when it is a tag.
    pub output: bool,
    /// True when the text before the region is trimmed.
    pub trim_left: bool,
    /// True when the text after the region is trimmed.
    pub trim_right: bool,
}

/// Kind of a tag whose body is not scanned for regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opaque {
    /// `raw`, the body is written verbatim.
    Raw,
    /// `comment`, the body is discarded.
    Comment,
}

impl Opaque {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "raw" => Some(Opaque::Raw),
            "comment" => Some(Opaque::Comment),
            _ => None,
        }
    }

    fn close(self) -> &'static str {
        match self {
            Opaque::Raw => "endraw",
            Opaque::Comment => "endcomment",
        }
    }
}

/// A `raw` or `comment` tag together with its body and close tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verbatim {
    pub kind: Opaque,
    pub open: Span,
    /// The body, already trimmed by the surrounding markers.
    pub body: Region,
    pub close: Span,
}

/// Items produced by the [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item {
    /// Literal text, already trimmed.
    Text(Region),
    /// An output region.
    Output(Span),
    /// A tag region.
    Tag(Span),
    /// A `raw` or `comment` block.
    Verbatim(Verbatim),
}

/// Finds output and tag regions within source text, and trims the literal
/// text between them.
pub struct Scanner<'source> {
    source: &'source str,
    /// Position within source.
    cursor: usize,
    /// Finds only the markers that open a region.
    opening: &'source Finder,
    /// Finds every marker.
    markers: &'source Finder,
    options: &'source Options,
    /// When true, the next text is left trimmed.
    left_trim: bool,
    /// Region found while producing the text before it.
    buffer: Option<Item>,
}

impl<'source> Scanner<'source> {
    /// Create a new [`Scanner`] over the given source.
    #[inline]
    pub fn new(
        source: &'source str,
        opening: &'source Finder,
        markers: &'source Finder,
        options: &'source Options,
    ) -> Self {
        Self {
            source,
            cursor: 0,
            opening,
            markers,
            options,
            left_trim: false,
            buffer: None,
        }
    }

    /// Return the next [`Item`].
    ///
    /// Text emptied by trimming is skipped.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when a region is not closed, or a region opens
    /// inside of another region.
    pub fn next(&mut self) -> Result<Option<Item>, Error> {
        loop {
            if let Some(next) = self.buffer.take() {
                return Ok(Some(next));
            }
            if self.cursor >= self.source.len() {
                return Ok(None);
            }

            let from = self.cursor;
            let (end, right_trim) = match self.opening.next(self.source, from) {
                Some((id, begin, marker_end)) => {
                    let span = self.read_span(Marker::from(id), begin, marker_end)?;
                    let item = self.classify(span)?;
                    self.buffer = Some(item);

                    (begin, span.trim_left)
                }
                None => (self.source.len(), false),
            };
            let left_trim = std::mem::replace(&mut self.left_trim, false);
            if let Some(Item::Tag(span) | Item::Output(span)) = self.buffer {
                self.left_trim = span.trim_right;
            }
            if let Some(Item::Verbatim(verbatim)) = self.buffer {
                self.left_trim = verbatim.close.trim_right;
            }
            if self.buffer.is_none() {
                self.cursor = end;
            }

            let text = self.trim(from, end, left_trim, right_trim);
            if !text.is_empty() {
                return Ok(Some(Item::Text(text)));
            }
        }
    }

    /// Read a region that begins with the given opening [`Marker`].
    ///
    /// Moves the cursor past the region.
    fn read_span(&mut self, marker: Marker, begin: usize, from: usize) -> Result<Span, Error> {
        let output = marker.is_output();
        let mut iterator = self.source[from..]
            .char_indices()
            .map(|(d, c)| (from + d, c));

        while let Some((index, char)) = iterator.next() {
            if char == '"' || char == '\'' {
                loop {
                    match iterator.next() {
                        Some((_, '\\')) => {
                            iterator.next();
                        }
                        Some((_, c)) if c == char => break,
                        Some(_) => continue,
                        None => return Err(error_eof(self.source)),
                    }
                }
                continue;
            }

            let Some((id, end)) = self.markers.starts(self.source, index) else {
                continue;
            };
            let found = Marker::from(id);
            if found.is_opening() || found.is_output() != output {
                let which = if output { "output" } else { "tag" };

                return Err(Error::compile(UNEXPECTED_TOKEN)
                    .with_pointer(self.source, index..end)
                    .with_help(format!("did you close the previous {which}?")));
            }

            let (global_left, global_right) = self.options.trimming.sides(output);
            self.cursor = end;

            return Ok(Span {
                region: (begin..end).into(),
                inner: (from..index).into(),
                output,
                trim_left: marker.is_trim() || global_left,
                trim_right: found.is_trim() || global_right,
            });
        }

        Err(error_eof(self.source))
    }

    /// Turn a [`Span`] into an [`Item`], reading the body of `raw` and
    /// `comment` tags.
    fn classify(&mut self, span: Span) -> Result<Item, Error> {
        if span.output {
            return Ok(Item::Output(span));
        }
        let Some(kind) = self.opaque_name(span.inner).and_then(Opaque::from_name) else {
            return Ok(Item::Tag(span));
        };

        let mut from = self.cursor;
        loop {
            let Some((id, begin, marker_end)) = self.opening.next(self.source, from) else {
                return Err(Error::compile(UNEXPECTED_TOKEN)
                    .with_pointer(self.source, span.region)
                    .with_help(format!(
                        "did you close the `{}` block with a `{}` tag?",
                        kind.close().trim_start_matches("end"),
                        kind.close()
                    )));
            };
            let marker = Marker::from(id);
            if marker.is_output() {
                from = marker_end;
                continue;
            }

            let body_begin = self.cursor;
            let saved = self.cursor;
            let close = match self.read_span(marker, begin, marker_end) {
                Ok(close) if self.opaque_name(close.inner) == Some(kind.close()) => close,
                _ => {
                    self.cursor = saved;
                    from = marker_end;
                    continue;
                }
            };
            let body = self.trim(body_begin, begin, span.trim_right, close.trim_left);

            return Ok(Item::Verbatim(Verbatim {
                kind,
                open: span,
                body,
                close,
            }));
        }
    }

    /// Return the tag name when the inner text of a tag is a single word.
    fn opaque_name(&self, inner: Region) -> Option<&'source str> {
        let source: &'source str = self.source;
        let text = source[inner].trim();
        let valid = !text.is_empty()
            && text
                .chars()
                .all(|c| c == '_' || unicode_ident::is_xid_continue(c));

        valid.then_some(text)
    }

    /// Return the region between `begin` and `end` after trimming.
    fn trim(&self, begin: usize, end: usize, left: bool, right: bool) -> Region {
        let text = &self.source[begin..end];
        let greedy = self.options.greedy;

        let end = match (right, greedy) {
            (false, _) => end,
            (true, true) => begin + text.trim_end().len(),
            (true, false) => begin + trim_line_end(text).len(),
        };
        let text = &self.source[begin..end];
        let begin = match (left, greedy) {
            (false, _) => begin,
            (true, true) => end - text.trim_start().len(),
            (true, false) => end - trim_line_start(text).len(),
        };

        (begin..end).into()
    }
}

/// Remove spaces and tabs from the end of the text, then at most one line break.
fn trim_line_end(text: &str) -> &str {
    let text = text.trim_end_matches(&[' ', '\t'][..]);
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

/// Remove spaces and tabs from the start of the text, then at most one line break.
fn trim_line_start(text: &str) -> &str {
    let text = text.trim_start_matches(&[' ', '\t'][..]);
    text.strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .unwrap_or(text)
}
