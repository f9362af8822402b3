//! Syntax nodes for stencil templates
//!
//! The structural scanner produces a shallow tree: one level of text runs
//! and loop blocks, all spans relative to the scanned text. A block's body
//! is scanned again when the block is expanded, after the enclosing loop
//! has rewritten it.

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Root node - one level of scanned template text
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    /// Segments in order; together they tile the scanned text
    pub segments: Vec<Segment>,
}

impl Template {
    /// Iterate over the top-level loop blocks
    pub fn blocks(&self) -> impl Iterator<Item = &LoopBlock> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Block(block) => Some(block),
            _ => None,
        })
    }
}

/// One piece of scanned text
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Text outside any block, placeholders included
    Text(Span),
    /// A `LOOP@input@name` ... `LOOP@END@name` block
    Block(LoopBlock),
}

/// Date arithmetic applied by a date placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOp {
    /// Offset counts whole days
    Now,
    /// Offset counts calendar months, day clamped to the target month
    MonthDelta,
}

impl DateOp {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "NOW" => Some(DateOp::Now),
            "MONTHDELTA" => Some(DateOp::MonthDelta),
            _ => None,
        }
    }
}

/// Placeholder kinds
///
/// Numeric fields keep their literal text: offsets and counter literals are
/// only parsed when the placeholder is resolved, so a malformed literal
/// fails at the point it is reached.
#[derive(Debug, Clone, PartialEq)]
pub enum Placeholder {
    /// `NOW@offset@format` / `MONTHDELTA@offset@format`
    Date {
        operation: String,
        offset: String,
        format: String,
    },
    /// `CONSTANT@id`
    Constant(String),
    /// `INC@base@step`, counted across the whole run
    Counter { base: String, step: String },
    /// `INDEX`, bound to the innermost loop
    Index,
    /// `LOOPINC@base@step`, counted per loop block
    LoopCounter { base: String, step: String },
    /// `LOOPLIST@id`, i-th element of a list parameter
    LoopList(String),
}

impl Placeholder {
    /// Marker text without the `%%%` delimiters
    pub fn marker(&self) -> String {
        match self {
            Placeholder::Date {
                operation,
                offset,
                format,
            } => format!("{}@{}@{}", operation, offset, format),
            Placeholder::Constant(id) => format!("CONSTANT@{}", id),
            Placeholder::Counter { base, step } => format!("INC@{}@{}", base, step),
            Placeholder::Index => "INDEX".to_string(),
            Placeholder::LoopCounter { base, step } => format!("LOOPINC@{}@{}", base, step),
            Placeholder::LoopList(id) => format!("LOOPLIST@{}", id),
        }
    }

    /// Full placeholder text as it appears in a template
    pub fn source_text(&self) -> String {
        format!("%%%{}%%%", self.marker())
    }
}

/// How a block's markers sit on their lines
///
/// A standalone marker is alone on its line (ignoring whitespace); its whole
/// line is excised from the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockLayout {
    pub start_standalone: bool,
    pub end_standalone: bool,
    /// The end marker's line is terminated by a newline rather than end of text
    pub newline_after_end: bool,
}

/// A located loop block
#[derive(Debug, Clone, PartialEq)]
pub struct LoopBlock {
    /// Parameter that drives the iterations
    pub input: Spanned<String>,
    /// Loop name used by `name.INDEX`, `name.VALUE` and the end marker
    pub name: Spanned<String>,
    pub layout: BlockLayout,
    /// Body between the markers, standalone marker lines stripped
    pub body: Span,
    /// Start marker through end marker
    pub span: Span,
    /// Text the expansion replaces, marker lines included when standalone
    pub excise: Span,
}

impl LoopBlock {
    /// `%%%name.INDEX%%%` for this block's loop name
    pub fn index_marker(&self) -> String {
        format!("%%%{}.INDEX%%%", self.name.node)
    }

    /// `%%%name.VALUE%%%` for this block's loop name
    pub fn value_marker(&self) -> String {
        format!("%%%{}.VALUE%%%", self.name.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_text() {
        let date = Placeholder::Date {
            operation: "MONTHDELTA".to_string(),
            offset: "-1".to_string(),
            format: "%Y-%m".to_string(),
        };
        assert_eq!(date.source_text(), "%%%MONTHDELTA@-1@%Y-%m%%%");
        assert_eq!(
            Placeholder::LoopList("PORTS".to_string()).source_text(),
            "%%%LOOPLIST@PORTS%%%"
        );
    }

    #[test]
    fn test_qualified_markers() {
        let block = LoopBlock {
            input: Spanned::new("ROWS".to_string(), 8..12),
            name: Spanned::new("row".to_string(), 13..16),
            layout: BlockLayout::default(),
            body: 19..19,
            span: 0..35,
            excise: 0..35,
        };
        assert_eq!(block.index_marker(), "%%%row.INDEX%%%");
        assert_eq!(block.value_marker(), "%%%row.VALUE%%%");
    }
}
