//! Scalar placeholder resolvers: dates, constants and counters

use std::fmt::Write;

use chrono::{Months, NaiveDateTime, TimeDelta};

use crate::error::{Span, TemplateError};
use crate::params::{format_float, Parameters};
use crate::parser::ast::DateOp;

use super::counter::{decimal_places, CounterRegistry};

/// Resolve `NOW@offset@format` / `MONTHDELTA@offset@format`
pub fn resolve_date(
    operation: &str,
    offset: &str,
    format: &str,
    reference: NaiveDateTime,
    span: &Span,
) -> Result<String, TemplateError> {
    let placeholder = || format!("{}@{}@{}", operation, offset, format);

    let offset = parse_offset(offset).ok_or_else(|| TemplateError::InvalidNumber {
        literal: offset.to_string(),
        placeholder: placeholder(),
        span: span.clone(),
    })?;

    let target = match DateOp::from_keyword(operation) {
        Some(DateOp::Now) => {
            TimeDelta::try_days(offset).and_then(|delta| reference.checked_add_signed(delta))
        }
        Some(DateOp::MonthDelta) => month_delta(reference, offset),
        None => {
            return Err(TemplateError::UnknownOperation {
                operation: operation.to_string(),
                span: span.clone(),
            })
        }
    }
    .ok_or_else(|| TemplateError::DateOutOfRange {
        placeholder: placeholder(),
        span: span.clone(),
    })?;

    let mut out = String::new();
    write!(out, "{}", target.format(format)).map_err(|_| TemplateError::InvalidDateFormat {
        format: format.to_string(),
        span: span.clone(),
    })?;
    Ok(out)
}

/// Empty offsets count as zero
fn parse_offset(literal: &str) -> Option<i64> {
    if literal.is_empty() {
        Some(0)
    } else {
        literal.parse().ok()
    }
}

/// Shift a timestamp by whole calendar months
///
/// The day of month is clamped to the last day of the target month; the
/// time of day is kept.
pub fn month_delta(date: NaiveDateTime, delta: i64) -> Option<NaiveDateTime> {
    let months = Months::new(u32::try_from(delta.unsigned_abs()).ok()?);
    if delta < 0 {
        date.checked_sub_months(months)
    } else {
        date.checked_add_months(months)
    }
}

/// Resolve `CONSTANT@id` to the string form of a scalar parameter
pub fn resolve_constant(
    id: &str,
    params: &Parameters,
    span: &Span,
) -> Result<String, TemplateError> {
    let placeholder = format!("CONSTANT@{}", id);
    let value = params
        .get(id)
        .ok_or_else(|| TemplateError::MissingParameter {
            name: id.to_string(),
            placeholder: placeholder.clone(),
            span: span.clone(),
        })?;

    if !value.is_scalar() {
        return Err(TemplateError::TypeMismatch {
            name: id.to_string(),
            placeholder,
            expected: "string/number",
            found: value.type_name(),
            span: span.clone(),
        });
    }
    Ok(value.to_string())
}

/// Resolve `INC@base@step` or `LOOPINC@base@step` against a registry
pub fn resolve_counter(
    counters: &mut CounterRegistry,
    keyword: &str,
    base: &str,
    step: &str,
    span: &Span,
) -> Result<String, TemplateError> {
    let parse = |literal: &str| {
        literal
            .parse::<f64>()
            .map_err(|_| TemplateError::InvalidNumber {
                literal: literal.to_string(),
                placeholder: format!("{}@{}@{}", keyword, base, step),
                span: span.clone(),
            })
    };
    let base_value = parse(base)?;
    let step_value = parse(step)?;

    let value = counters.advance(base_value, step_value, decimal_places(step));
    Ok(format_float(value))
}
