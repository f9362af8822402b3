//! Loop expansion and placeholder resolution
//!
//! Text is expanded level by level:
//! 1. `${NAME}` references to scalar parameters are substituted,
//! 2. the first loop block of the current text is expanded and spliced in,
//!    then the text is scanned again until no block is left,
//! 3. dates, then constants, then global counters are resolved, each pass
//!    over the output of the previous one.
//!
//! An iteration first binds `name.INDEX` and `name.VALUE` of its own loop
//! everywhere in the body, nested blocks included. `INDEX`, `LOOPLIST` and
//! `LOOPINC` are then bound in the body's own text only; nested blocks are
//! left for their own iterations. The bound text is expanded recursively, so
//! whatever a loop inserts feeds the placeholders around it.

use tracing::{debug, trace};

use crate::error::TemplateError;
use crate::params::{Parameters, Value};
use crate::parser::ast::{BlockLayout, LoopBlock, Placeholder, Segment, Span};
use crate::parser::lexer::{scan, PlaceholderKind};
use crate::parser::{first_block, parse};

use super::context::ExpansionContext;
use super::counter::CounterRegistry;
use super::mapped::MappedText;
use super::resolver::{resolve_constant, resolve_counter, resolve_date};

/// Parameter that shifts every loop index
pub const INDEX_SHIFT: &str = "INDEXSHIFT";

/// Placeholder passes run on every level, in order
const SCALAR_PASSES: [PlaceholderKind; 3] = [
    PlaceholderKind::Date,
    PlaceholderKind::Constant,
    PlaceholderKind::Counter,
];

/// Fully expand one level of text
pub fn expand_text(
    ctx: &mut ExpansionContext<'_>,
    text: MappedText,
) -> Result<MappedText, TemplateError> {
    let text = substitute_variables(&text, ctx.params);
    let mut text = expand_blocks(ctx, text)?;
    for kind in SCALAR_PASSES {
        text = rewrite(&text, kind, |placeholder, span| {
            resolve_scalar(ctx, placeholder, span)
        })?;
    }
    Ok(text)
}

/// Replace `${NAME}` references with the string form of scalar parameters
///
/// References to lists, mappings or unknown names are left in place.
pub fn substitute_variables(text: &MappedText, params: &Parameters) -> MappedText {
    let mut text = text.clone();
    if !text.as_str().contains("${") {
        return text;
    }
    for (name, value) in params.iter().filter(|(_, value)| value.is_scalar()) {
        let reference = format!("${{{}}}", name);
        if text.as_str().contains(&reference) {
            text = text.replace_all(&reference, &value.to_string());
        }
    }
    text
}

/// Expand blocks one at a time, always the first one left in the text
///
/// Each block is located and classified in the text as rewritten so far,
/// so a marker line emptied by an earlier sibling counts as standalone.
fn expand_blocks(
    ctx: &mut ExpansionContext<'_>,
    mut text: MappedText,
) -> Result<MappedText, TemplateError> {
    while let Some(block) = first_block(text.as_str()) {
        let expansion = expand_block(ctx, &text, &block)?;
        text = text.splice(block.excise.clone(), &expansion);
    }
    Ok(text)
}

/// Substitute every placeholder of one kind found in the text
fn rewrite<F>(
    text: &MappedText,
    kind: PlaceholderKind,
    mut resolve: F,
) -> Result<MappedText, TemplateError>
where
    F: FnMut(&Placeholder, &Span) -> Result<String, TemplateError>,
{
    let found = scan(text.as_str(), kind);
    if found.is_empty() {
        return Ok(text.clone());
    }

    let mut edits = Vec::with_capacity(found.len());
    for p in found {
        let value = resolve(&p.node, &text.origin(p.span.clone()))?;
        trace!(placeholder = %p.node.marker(), value = %value, "resolved placeholder");
        edits.push((p.span, value));
    }
    Ok(text.replace_ranges(edits))
}

fn resolve_scalar(
    ctx: &mut ExpansionContext<'_>,
    placeholder: &Placeholder,
    span: &Span,
) -> Result<String, TemplateError> {
    match placeholder {
        Placeholder::Date {
            operation,
            offset,
            format,
        } => resolve_date(operation, offset, format, ctx.reference, span),
        Placeholder::Constant(id) => resolve_constant(id, ctx.params, span),
        Placeholder::Counter { base, step } => {
            resolve_counter(&mut ctx.counters, "INC", base, step, span)
        }
        other => Ok(other.source_text()),
    }
}

/// One iteration's bindings
struct Iteration<'a> {
    index: i64,
    value: &'a Value,
    lists: Vec<(String, &'a Value)>,
}

/// Expand every iteration of a block and join them per its layout
fn expand_block(
    ctx: &mut ExpansionContext<'_>,
    text: &MappedText,
    block: &LoopBlock,
) -> Result<MappedText, TemplateError> {
    let params = ctx.params;
    let shift = index_shift(params, text.origin(block.input.span.start..block.name.span.end))?;
    let values = loop_values(params, block, text.origin(block.input.span.clone()))?;
    let body = text.slice(block.body.clone());
    let lists = synchronized_lists(params, &body, values.len())?;

    debug!(
        loop_name = %block.name.node,
        input = %block.input.node,
        iterations = values.len(),
        index_shift = shift,
        depth = ctx.depth(),
        start_standalone = block.layout.start_standalone,
        end_standalone = block.layout.end_standalone,
        "expanding loop block"
    );

    // Shared by this block's iterations only
    let mut counters = CounterRegistry::new();
    let mut outputs = Vec::with_capacity(values.len());

    for (i, value) in values.iter().enumerate() {
        let iteration = Iteration {
            index: shift.saturating_add(i as i64),
            value,
            lists: lists
                .iter()
                .map(|(id, items)| (id.clone(), &items[i]))
                .collect(),
        };
        let bound = bind_iteration(&body, block, &iteration, &mut counters)?;

        ctx.enter_iteration();
        let output = expand_text(ctx, bound);
        ctx.leave_iteration();
        outputs.push(output?);
    }

    Ok(join_iterations(outputs, block.layout, text.origin(block.span.clone())))
}

/// Bind one iteration's placeholders in a copy of the body
fn bind_iteration(
    body: &MappedText,
    block: &LoopBlock,
    iteration: &Iteration<'_>,
    counters: &mut CounterRegistry,
) -> Result<MappedText, TemplateError> {
    let index = iteration.index.to_string();
    let body = body
        .replace_all(&block.index_marker(), &index)
        .replace_all(&block.value_marker(), &iteration.value.to_string());

    let mut bound = MappedText::default();
    for segment in parse(body.as_str()).segments {
        match segment {
            Segment::Block(nested) => bound.push_slice(&body, nested.span),
            Segment::Text(range) => {
                let mut own = body.slice(range).replace_all("%%%INDEX%%%", &index);
                for (id, item) in &iteration.lists {
                    own = own.replace_all(&format!("%%%LOOPLIST@{}%%%", id), &item.to_string());
                }
                let own = rewrite(&own, PlaceholderKind::LoopCounter, |placeholder, span| {
                    match placeholder {
                        Placeholder::LoopCounter { base, step } => {
                            resolve_counter(counters, "LOOPINC", base, step, span)
                        }
                        other => Ok(other.source_text()),
                    }
                })?;
                bound.append(&own);
            }
        }
    }
    Ok(bound)
}

/// Integer inputs count from zero; list inputs yield their elements
fn loop_values(
    params: &Parameters,
    block: &LoopBlock,
    span: Span,
) -> Result<Vec<Value>, TemplateError> {
    let input = &block.input.node;
    match params.get(input) {
        None => Err(TemplateError::MissingParameter {
            name: input.clone(),
            placeholder: format!("LOOP@{}@{}", input, block.name.node),
            span,
        }),
        Some(Value::Integer(n)) => Ok((0..*n).map(Value::Integer).collect()),
        Some(Value::List(items)) => Ok(items.clone()),
        Some(other) => Err(TemplateError::InvalidLoopInput {
            name: input.clone(),
            found: other.type_name(),
            span,
        }),
    }
}

fn index_shift(params: &Parameters, span: Span) -> Result<i64, TemplateError> {
    let Some(value) = params.get(INDEX_SHIFT) else {
        return Ok(0);
    };
    let shift = match value {
        Value::Integer(n) => Some(*n),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    shift.ok_or_else(|| TemplateError::InvalidConfig {
        name: INDEX_SHIFT.to_string(),
        value: value.to_string(),
        span,
    })
}

/// Lists read by `LOOPLIST` in the body's own text, checked against the loop size
///
/// Lists referenced inside a nested block belong to that block.
fn synchronized_lists<'p>(
    params: &'p Parameters,
    body: &MappedText,
    loop_len: usize,
) -> Result<Vec<(String, &'p [Value])>, TemplateError> {
    let mut lists: Vec<(String, &'p [Value])> = Vec::new();

    for segment in parse(body.as_str()).segments {
        let Segment::Text(range) = segment else {
            continue;
        };
        for found in scan(&body.as_str()[range.clone()], PlaceholderKind::LoopList) {
            let Placeholder::LoopList(id) = found.node else {
                continue;
            };
            if lists.iter().any(|(seen, _)| *seen == id) {
                continue;
            }

            let span = body.origin(range.start + found.span.start..range.start + found.span.end);
            let placeholder = format!("LOOPLIST@{}", id);
            let value = params
                .get(&id)
                .ok_or_else(|| TemplateError::MissingParameter {
                    name: id.clone(),
                    placeholder: placeholder.clone(),
                    span: span.clone(),
                })?;
            let items = value.as_list().ok_or_else(|| TemplateError::TypeMismatch {
                name: id.clone(),
                placeholder,
                expected: "list",
                found: value.type_name(),
                span: span.clone(),
            })?;
            if items.len() != loop_len {
                return Err(TemplateError::LengthMismatch {
                    name: id,
                    list_len: items.len(),
                    loop_len,
                    span,
                });
            }
            lists.push((id, items));
        }
    }
    Ok(lists)
}

/// Join iteration outputs so the block's marker lines leave no trace
///
/// A standalone start marker puts each iteration on its own line. The
/// newline that ended the end marker's line is given back only when one
/// of the markers was standalone, since the block consumed it then.
fn join_iterations(outputs: Vec<MappedText>, layout: BlockLayout, origin: Span) -> MappedText {
    let mut text = MappedText::default();
    for (i, output) in outputs.iter().enumerate() {
        if i > 0 && layout.start_standalone {
            text.push_generated("\n", origin.clone());
        }
        text.append(output);
    }
    if (layout.start_standalone || layout.end_standalone) && layout.newline_after_end {
        text.push_generated("\n", origin);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn expand(template: &str, params: &Parameters) -> Result<String, TemplateError> {
        let mut ctx = ExpansionContext::new(reference(), params);
        expand_text(&mut ctx, MappedText::new(template)).map(MappedText::into_string)
    }

    fn layout(start: bool, end: bool, newline: bool) -> BlockLayout {
        BlockLayout {
            start_standalone: start,
            end_standalone: end,
            newline_after_end: newline,
        }
    }

    #[test]
    fn test_join_rules() {
        let outputs = || vec![MappedText::new("a"), MappedText::new("b")];
        let join = |layout| join_iterations(outputs(), layout, 0..1).into_string();
        assert_eq!(join(layout(true, true, true)), "a\nb\n");
        assert_eq!(join(layout(true, true, false)), "a\nb");
        assert_eq!(join(layout(false, true, true)), "ab\n");
        assert_eq!(join(layout(false, false, true)), "ab");
        assert_eq!(
            join_iterations(Vec::new(), layout(true, true, true), 0..1).into_string(),
            "\n"
        );
    }

    #[test]
    fn test_substitute_scalar_variables() {
        let params = Parameters::new()
            .with("HOST", "db01")
            .with("PORT", 5432)
            .with("TAGS", vec!["a", "b"]);
        let out = substitute_variables(&MappedText::new("${HOST}:${PORT} ${TAGS} ${OTHER}"), &params);
        assert_eq!(out.as_str(), "db01:5432 ${TAGS} ${OTHER}");
        assert_eq!(out.origin(0..4), 0..7);
    }

    #[test]
    fn test_unbound_loop_placeholders_stay_verbatim() {
        let out = expand(
            "%%%INDEX%%% %%%x.VALUE%%% %%%LOOPINC@1@1%%% %%%LOOPLIST@L%%%",
            &Parameters::new(),
        )
        .unwrap();
        assert_eq!(out, "%%%INDEX%%% %%%x.VALUE%%% %%%LOOPINC@1@1%%% %%%LOOPLIST@L%%%");
    }

    #[test]
    fn test_loop_counter_is_per_block() {
        let params = Parameters::new().with("N", 2);
        let out = expand(
            "%%%LOOP@N@a%%%%%%LOOPINC@1@1%%%,%%%LOOP@END@a%%%|%%%LOOP@N@b%%%%%%LOOPINC@1@1%%%,%%%LOOP@END@b%%%",
            &params,
        )
        .unwrap();
        assert_eq!(out, "1.0,2.0,|1.0,2.0,");
    }

    #[test]
    fn test_global_counter_spans_iterations_and_runs_after_loops() {
        let params = Parameters::new().with("N", 2);
        let out = expand(
            "%%%INC@1@1%%% %%%LOOP@N@a%%%[%%%INC@1@1%%%]%%%LOOP@END@a%%%",
            &params,
        )
        .unwrap();
        assert_eq!(out, "3.0 [1.0][2.0]");
    }

    #[test]
    fn test_index_feeds_date_offset() {
        let params = Parameters::new().with("N", 3);
        let out = expand("%%%LOOP@N@d%%%%%%NOW@-%%%INDEX%%%@%d%%% %%%LOOP@END@d%%%", &params).unwrap();
        assert_eq!(out, "15 14 13 ");
    }

    #[test]
    fn test_loop_list_value_feeds_loop_counter() {
        // LOOPLIST is bound before LOOPINC, so an inserted counter still counts
        let params = Parameters::new()
            .with("N", 2)
            .with("STEPS", vec!["%%%LOOPINC@0@5%%%", "%%%LOOPINC@0@5%%%"]);
        let out = expand("%%%LOOP@N@x%%%%%%LOOPLIST@STEPS%%% %%%LOOP@END@x%%%", &params).unwrap();
        assert_eq!(out, "0.0 5.0 ");
    }

    #[test]
    fn test_qualified_reference_reaches_nested_block_input() {
        let params = Parameters::new()
            .with("GROUPS", vec!["A", "B"])
            .with("A", 1)
            .with("B", 2);
        let out = expand(
            "%%%LOOP@GROUPS@g%%%%%%LOOP@%%%g.VALUE%%%@i%%%%%%g.VALUE%%%%%%LOOP@END@i%%%;%%%LOOP@END@g%%%",
            &params,
        )
        .unwrap();
        assert_eq!(out, "A;BB;");
    }

    #[test]
    fn test_index_shift_from_string() {
        let params = Parameters::new().with("N", 2).with(INDEX_SHIFT, "10");
        let out = expand("%%%LOOP@N@a%%%%%%INDEX%%% %%%LOOP@END@a%%%", &params).unwrap();
        assert_eq!(out, "10 11 ");
    }

    #[test]
    fn test_index_shift_must_be_integer() {
        let params = Parameters::new().with("N", 2).with(INDEX_SHIFT, 1.5);
        let err = expand("%%%LOOP@N@a%%%x%%%LOOP@END@a%%%", &params).unwrap_err();
        assert_eq!(err.to_string(), "INDEXSHIFT must be an integer, but got: 1.5");
    }

    #[test]
    fn test_negative_count_yields_no_iterations() {
        let params = Parameters::new().with("N", -3);
        assert_eq!(expand("<%%%LOOP@N@a%%%x%%%LOOP@END@a%%%>", &params).unwrap(), "<>");
    }

    #[test]
    fn test_nested_list_references_are_checked_by_the_inner_loop() {
        // INNER has the inner loop's length, not the outer's
        let params = Parameters::new()
            .with("OUT", 2)
            .with("IN", 3)
            .with("INNER", vec!["a", "b", "c"]);
        let out = expand(
            "%%%LOOP@OUT@o%%%(%%%LOOP@IN@i%%%%%%LOOPLIST@INNER%%%%%%LOOP@END@i%%%)%%%LOOP@END@o%%%",
            &params,
        )
        .unwrap();
        assert_eq!(out, "(abc)(abc)");
    }

    #[test]
    fn test_loop_input_error_points_at_source() {
        let source = "x\n%%%LOOP@N@o%%%%%%LOOP@MISSING@i%%%-%%%LOOP@END@i%%%%%%LOOP@END@o%%%";
        let params = Parameters::new().with("N", 1);
        let err = expand(source, &params).unwrap_err();
        assert_eq!(&source[err.span().clone()], "MISSING");
    }
}
