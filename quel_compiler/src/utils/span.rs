//! Source location tracking
//!
//! The lexer walks its input byte by byte, so positions advance per byte for
//! ASCII structure and per character inside string literals. Columns are
//! 1-based character counts; offsets are byte offsets into the source.
use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in source text with line, column, and byte offset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// Byte offset from start of input (0-based)
    pub offset: usize,
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
}

impl Position {
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Offset 0, line 1, column 1
    pub fn start() -> Self {
        Self::new(0, 1, 1)
    }

    /// Advance past one character
    pub fn advance(self, ch: char) -> Self {
        if ch == '\n' {
            Self::new(self.offset + 1, self.line + 1, 1)
        } else {
            Self::new(self.offset + ch.len_utf8(), self.line, self.column + 1)
        }
    }

    pub fn advance_str(self, s: &str) -> Self {
        s.chars().fold(self, |pos, ch| pos.advance(ch))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A span of source text from start (inclusive) to end (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(
            start.offset <= end.offset,
            "Span start must not be after end"
        );
        Self { start, end }
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    /// Zero-width span at a position
    pub fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Smallest span covering both
    pub fn merge(self, other: Self) -> Self {
        let start = if self.start.offset <= other.start.offset {
            self.start
        } else {
            other.start
        };
        let end = if self.end.offset >= other.end.offset {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Source text covered by this span; empty if the span does not fit `input`
    pub fn slice<'a>(&self, input: &'a str) -> &'a str {
        input.get(self.start.offset..self.end.offset).unwrap_or("")
    }

    /// Placeholder for generated nodes
    pub fn dummy() -> Self {
        Self::point(Position::start())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "{}:{}-{}",
                self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A value with its source location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }

    pub fn map<U, F>(self, f: F) -> Spanned<U>
    where
        F: FnOnce(T) -> U,
    {
        Spanned {
            value: f(self.value),
            span: self.span,
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Line index over a source text, used to render diagnostics
#[derive(Debug, Clone)]
pub struct SourceMap {
    pub source: String,
    /// File name shown in the `-->` line, if any
    pub name: Option<String>,
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(offset, _)| offset + 1),
        );
        Self {
            source,
            name: None,
            line_starts,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Line and column for a byte offset
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|i| i - 1);

        let line_start = self.line_starts[line];
        let column = self
            .source
            .get(line_start..offset)
            .map(|text| text.chars().count())
            .unwrap_or(offset - line_start);

        Position::new(offset, (line + 1) as u32, (column + 1) as u32)
    }

    /// A line of text by 1-based line number, without its newline
    pub fn get_line(&self, line_num: u32) -> Option<&str> {
        let line_idx = (line_num as usize).checked_sub(1)?;
        let start = *self.line_starts.get(line_idx)?;
        let end = self
            .line_starts
            .get(line_idx + 1)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());

        self.source
            .get(start..end)
            .map(|line| line.trim_end_matches('\r'))
    }

    /// Render a message with the offending line and a caret underline
    pub fn format_error(&self, code: Option<&str>, span: &Span, message: &str) -> String {
        let mut result = String::new();

        match code {
            Some(code) => result.push_str(&format!("error[{}]: {}\n", code, message)),
            None => result.push_str(&format!("error: {}\n", message)),
        }
        match &self.name {
            Some(name) => result.push_str(&format!(
                "  --> {}:{}:{}\n",
                name, span.start.line, span.start.column
            )),
            None => result.push_str(&format!(
                "  --> {}:{}\n",
                span.start.line, span.start.column
            )),
        }

        if let Some(line) = self.get_line(span.start.line) {
            let line_num_str = span.start.line.to_string();
            let padding = " ".repeat(line_num_str.len());

            result.push_str(&format!("{} |\n", padding));
            result.push_str(&format!("{} | {}\n", line_num_str, line));

            let span_len = if span.start.line == span.end.line {
                span.end.column.saturating_sub(span.start.column) as usize
            } else {
                line.chars().count().saturating_sub(span.start.column as usize - 1)
            };

            result.push_str(&format!(
                "{} | {}{}\n",
                padding,
                " ".repeat(span.start.column.saturating_sub(1) as usize),
                "^".repeat(span_len.max(1))
            ));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_advance_tracks_lines() {
        let pos = Position::start().advance_str("ab\ncd");
        assert_eq!(pos, Position::new(5, 2, 3));

        let wide = Position::start().advance('é');
        assert_eq!(wide.offset, 2);
        assert_eq!(wide.column, 2);
    }

    #[test]
    fn test_span_merge_and_slice() {
        let source = "retrieve (c)";
        let a = Span::new(Position::new(0, 1, 1), Position::new(8, 1, 9));
        let b = Span::new(Position::new(10, 1, 11), Position::new(11, 1, 12));

        let merged = b.merge(a);
        assert_eq!(merged.len(), 11);
        assert_eq!(merged.slice(source), "retrieve (c");
        assert!(Span::dummy().is_empty());
    }

    #[test]
    fn test_source_map_positions() {
        let map = SourceMap::new("range of c\nretrieve (c)\n");
        assert_eq!(map.position_at(0), Position::new(0, 1, 1));
        assert_eq!(map.position_at(11), Position::new(11, 2, 1));
        assert_eq!(map.get_line(2), Some("retrieve (c)"));
        assert_eq!(map.get_line(0), None);
        assert_eq!(map.get_line(9), None);
    }

    #[test]
    fn test_format_error_underlines_span() {
        let map = SourceMap::new("x = 1.2.3");
        let span = Span::new(Position::new(4, 1, 5), Position::new(9, 1, 10));
        let rendered = map.format_error(None, &span, "malformed number");

        assert!(rendered.contains("error: malformed number"));
        assert!(rendered.contains("--> 1:5"));
        assert!(rendered.contains("1 | x = 1.2.3"));
        assert!(rendered.contains("    ^^^^^"));
    }

    #[test]
    fn test_format_error_with_code_and_name() {
        let map = SourceMap::new("range of o is Order\nretrieve (o.)").with_name("orders.quel");
        let span = Span::new(Position::new(32, 2, 13), Position::new(33, 2, 14));
        let rendered = map.format_error(Some("E050"), &span, "Expected name, found ')'");

        assert!(rendered.starts_with("error[E050]: Expected name, found ')'\n"));
        assert!(rendered.contains("--> orders.quel:2:13"));
        assert!(rendered.contains("2 | retrieve (o.)"));
        assert!(rendered.contains(&format!("\n |{}^\n", " ".repeat(13))));
    }
}
