//! Structural scanner for loop blocks
//!
//! Blocks are located outermost-first. The body of a block runs to the first
//! `LOOP@END@name` marker carrying the same name, so sibling blocks that
//! reuse a name are matched one at a time. Marker layout is decided against
//! the text the block was found in.

use std::sync::LazyLock;

use regex::Regex;

use crate::parser::ast::*;

static LOOP_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%%%LOOP@(?P<input>.+?)@(?P<name>.+?)%%%").unwrap());

/// Input name reserved for end markers
const END_INPUT: &str = "END";

/// Scan one level of template text into text runs and loop blocks
///
/// Parsing never fails: text that does not form a complete block is kept
/// as text. Nested blocks stay inside their parent's body.
pub fn parse(input: &str) -> Template {
    let mut segments = Vec::new();
    let mut cursor = 0;

    while let Some(located) = locate_block(input, cursor) {
        if located.start_marker.start > cursor {
            segments.push(Segment::Text(cursor..located.start_marker.start));
        }
        cursor = located.end_marker.end;
        segments.push(Segment::Block(classify(input, &located)));
    }

    if cursor < input.len() {
        segments.push(Segment::Text(cursor..input.len()));
    }
    Template { segments }
}

/// The first complete block of the text, classified against it
pub fn first_block(input: &str) -> Option<LoopBlock> {
    locate_block(input, 0).map(|located| classify(input, &located))
}

/// A start marker together with its matching end marker
#[derive(Debug)]
struct LocatedBlock {
    input: Span,
    name: Span,
    start_marker: Span,
    end_marker: Span,
}

/// Find the first complete block starting at or after `from`
fn locate_block(source: &str, from: usize) -> Option<LocatedBlock> {
    let mut pos = from;

    while let Some(caps) = LOOP_START_RE.captures_at(source, pos) {
        let start_marker = caps.get(0)?;
        let input = caps.name("input")?;
        let name = caps.name("name")?;
        // Retry one byte further on; markers start with an ASCII '%'
        pos = start_marker.start() + 1;

        if input.as_str() == END_INPUT {
            continue;
        }

        let end_text = format!("%%%LOOP@END@{}%%%", name.as_str());
        if let Some(rel) = source[start_marker.end()..].find(&end_text) {
            let end_start = start_marker.end() + rel;
            return Some(LocatedBlock {
                input: input.range(),
                name: name.range(),
                start_marker: start_marker.range(),
                end_marker: end_start..end_start + end_text.len(),
            });
        }
    }

    None
}

fn classify(source: &str, block: &LocatedBlock) -> LoopBlock {
    let start = block.start_marker.start;
    let line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);
    let prefix_blank = is_blank(&source[line_start..start]);

    let raw_body = block.start_marker.end..block.end_marker.start;
    let body_text = &source[raw_body.clone()];

    // Rest of the start marker's line, up to and including its newline
    let start_rest = body_text
        .find('\n')
        .filter(|&i| is_blank(&body_text[..i]))
        .map(|i| i + 1);
    let start_standalone = prefix_blank && start_rest.is_some();

    // The end marker's line prefix lies inside the body; a body without a
    // newline puts both markers on one line.
    let end_prefix_blank = body_text
        .rfind('\n')
        .is_some_and(|i| is_blank(&body_text[i + 1..]));

    let after = &source[block.end_marker.end..];
    let after_line_end = after.find('\n');
    let end_rest_blank = is_blank(&after[..after_line_end.unwrap_or(after.len())]);
    let end_standalone = end_prefix_blank && end_rest_blank;
    let newline_after_end = end_rest_blank && after_line_end.is_some();

    let mut body = raw_body;
    if start_standalone {
        body.start += start_rest.unwrap_or(0);
    }
    if end_standalone {
        body.end = body.start + source[body.clone()].trim_end().len();
    }

    let excise_start = if start_standalone { line_start } else { start };
    let excise_end = match (end_standalone, after_line_end) {
        (true, Some(i)) => block.end_marker.end + i + 1,
        (true, None) => source.len(),
        (false, _) => block.end_marker.end,
    };

    LoopBlock {
        input: Spanned::new(source[block.input.clone()].to_string(), block.input.clone()),
        name: Spanned::new(source[block.name.clone()].to_string(), block.name.clone()),
        layout: BlockLayout {
            start_standalone,
            end_standalone,
            newline_after_end,
        },
        body,
        span: block.start_marker.start..block.end_marker.end,
        excise: excise_start..excise_end,
    }
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_block(template: &Template) -> &LoopBlock {
        let blocks: Vec<_> = template.blocks().collect();
        assert_eq!(blocks.len(), 1, "expected exactly one block");
        blocks[0]
    }

    fn body<'a>(source: &'a str, block: &LoopBlock) -> &'a str {
        &source[block.body.clone()]
    }

    #[test]
    fn test_parse_plain_text() {
        let doc = parse("Hello World");
        assert_eq!(doc.segments, vec![Segment::Text(0..11)]);
        assert!(parse("").segments.is_empty());
    }

    #[test]
    fn test_parse_standalone_block() {
        let source = "%%%LOOP@N@item%%%\nItem %%%INDEX%%%\n%%%LOOP@END@item%%%";
        let doc = parse(source);
        let block = only_block(&doc);
        assert_eq!(block.input.node, "N");
        assert_eq!(block.name.node, "item");
        assert_eq!(
            block.layout,
            BlockLayout {
                start_standalone: true,
                end_standalone: true,
                newline_after_end: false,
            }
        );
        assert_eq!(body(source, block), "Item %%%INDEX%%%");
        assert_eq!(block.excise, 0..source.len());
        assert_eq!(doc.segments.len(), 1);
    }

    #[test]
    fn test_parse_inline_block() {
        let source = "a %%%LOOP@N@x%%%[%%%INDEX%%%]%%%LOOP@END@x%%% b";
        let doc = parse(source);
        let block = only_block(&doc);
        assert_eq!(block.layout, BlockLayout::default());
        assert_eq!(body(source, block), "[%%%INDEX%%%]");
        assert_eq!(block.excise, block.span);
        assert_eq!(doc.segments.first(), Some(&Segment::Text(0..2)));
        assert_eq!(
            doc.segments.last(),
            Some(&Segment::Text(source.len() - 2..source.len()))
        );
    }

    #[test]
    fn test_standalone_lines_are_excised() {
        let source = "head\n   %%%LOOP@N@x%%%  \nbody\n  %%%LOOP@END@x%%% \ntail";
        let block = first_block(source).expect("block");
        assert!(block.layout.start_standalone);
        assert!(block.layout.end_standalone);
        assert!(block.layout.newline_after_end);
        assert_eq!(body(source, &block), "body");
        assert_eq!(&source[..block.excise.start], "head\n");
        assert_eq!(&source[block.excise.end..], "tail");
    }

    #[test]
    fn test_inline_start_standalone_end() {
        let source = "list: %%%LOOP@N@x%%%%%%INDEX%%%,\n%%%LOOP@END@x%%%\ndone";
        let block = first_block(source).expect("block");
        assert!(!block.layout.start_standalone);
        assert!(block.layout.end_standalone);
        assert!(block.layout.newline_after_end);
        assert_eq!(body(source, &block), "%%%INDEX%%%,");
    }

    #[test]
    fn test_end_marker_followed_by_text_is_not_standalone() {
        let source = "%%%LOOP@N@x%%%\nrow\n%%%LOOP@END@x%%% trailing";
        let block = first_block(source).expect("block");
        assert!(block.layout.start_standalone);
        assert!(!block.layout.end_standalone);
        assert!(!block.layout.newline_after_end);
        assert_eq!(body(source, &block), "row\n");
    }

    #[test]
    fn test_crlf_marker_lines() {
        let source = "%%%LOOP@N@x%%%\r\nrow\r\n%%%LOOP@END@x%%%\r\nnext";
        let block = first_block(source).expect("block");
        assert!(block.layout.start_standalone);
        assert!(block.layout.end_standalone);
        assert_eq!(body(source, &block), "row");
        assert_eq!(&source[block.excise.end..], "next");
    }

    #[test]
    fn test_sibling_blocks_with_same_name() {
        let doc = parse("%%%LOOP@A@x%%%a%%%LOOP@END@x%%%|%%%LOOP@B@x%%%b%%%LOOP@END@x%%%");
        let inputs: Vec<_> = doc.blocks().map(|b| b.input.node.as_str()).collect();
        assert_eq!(inputs, vec!["A", "B"]);
    }

    #[test]
    fn test_start_line_prefix_is_read_from_the_scanned_text() {
        // Once the first block is gone, the second one starts its line
        let source = "%%%LOOP@E@x%%%a%%%LOOP@END@x%%%%%%LOOP@N@y%%%\nrow\n%%%LOOP@END@y%%%\n";
        let doc = parse(source);
        let blocks: Vec<_> = doc.blocks().collect();
        assert!(!blocks[1].layout.start_standalone);

        let rest = &source[blocks[0].span.end..];
        let block = first_block(rest).expect("block");
        assert!(block.layout.start_standalone);
    }

    #[test]
    fn test_nested_blocks_stay_in_the_body() {
        let source = concat!(
            "%%%LOOP@OUT@outer%%%\n",
            "head %%%INDEX%%%\n",
            "%%%LOOP@IN@inner%%%\n",
            "  %%%INDEX%%%\n",
            "%%%LOOP@END@inner%%%\n",
            "%%%LOOP@END@outer%%%\n",
        );
        let doc = parse(source);
        let outer = only_block(&doc);
        assert_eq!(outer.name.node, "outer");
        assert!(outer.layout.newline_after_end);

        let outer_body = body(source, outer);
        let inner_doc = parse(outer_body);
        let inner = only_block(&inner_doc);
        assert_eq!(inner.name.node, "inner");
        // The enclosing body was stripped, so the nested end marker sits at its end
        assert!(inner.layout.end_standalone);
        assert!(!inner.layout.newline_after_end);
        assert_eq!(body(outer_body, inner), "  %%%INDEX%%%");
        assert_eq!(inner_doc.segments.first(), Some(&Segment::Text(0..17)));
    }

    #[test]
    fn test_unterminated_block_is_text() {
        let doc = parse("%%%LOOP@N@x%%%\nbody\n%%%LOOP@END@y%%%");
        assert_eq!(doc.blocks().count(), 0);
        assert_eq!(doc.segments.len(), 1);
    }

    #[test]
    fn test_end_marker_is_never_a_start() {
        let doc = parse("%%%LOOP@END@x%%% %%%LOOP@N@x%%%a%%%LOOP@END@x%%%");
        let block = only_block(&doc);
        assert_eq!(block.input.node, "N");
    }

    #[test]
    fn test_spans_point_into_source() {
        let source = "ab\n%%%LOOP@N@x%%%\n %%%LOOPLIST@L%%%\n%%%LOOP@END@x%%%";
        let block = first_block(source).expect("block");
        assert_eq!(&source[block.input.span.clone()], "N");
        assert_eq!(&source[block.name.span.clone()], "x");
        assert_eq!(&source[block.span.clone()], &source[3..]);
        assert_eq!(body(source, &block), " %%%LOOPLIST@L%%%");
    }
}
