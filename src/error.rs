//! Error types for template expansion

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Errors raised while expanding a template
///
/// Every error aborts the whole expansion; no partial output is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// A placeholder names a parameter that is not in the mapping
    #[error("missing parameter '{name}' referenced by {placeholder}")]
    MissingParameter {
        name: String,
        placeholder: String,
        span: Span,
    },

    /// A placeholder got a parameter of the wrong shape
    #[error("{placeholder} refers to a {found}, but it can only be used with {expected} values")]
    TypeMismatch {
        name: String,
        placeholder: String,
        expected: &'static str,
        found: &'static str,
        span: Span,
    },

    /// A loop input is neither an integer count nor a list
    #[error("loop input '{name}' should be a list or integer, but got {found}")]
    InvalidLoopInput {
        name: String,
        found: &'static str,
        span: Span,
    },

    /// A synchronized list does not have one element per iteration
    #[error("LOOPLIST '{name}' length ({list_len}) does not match loop size ({loop_len})")]
    LengthMismatch {
        name: String,
        list_len: usize,
        loop_len: usize,
        span: Span,
    },

    /// An engine setting passed through the parameters is unusable
    #[error("{name} must be an integer, but got: {value}")]
    InvalidConfig {
        name: String,
        value: String,
        span: Span,
    },

    /// Date placeholder with an operation the resolver does not know
    #[error("unknown date operation: {operation}")]
    UnknownOperation { operation: String, span: Span },

    /// Offset or counter literal that does not parse as a number
    #[error("invalid number '{literal}' in {placeholder}")]
    InvalidNumber {
        literal: String,
        placeholder: String,
        span: Span,
    },

    /// Date format string that cannot be rendered
    #[error("invalid date format '{format}'")]
    InvalidDateFormat { format: String, span: Span },

    /// Date arithmetic outside the representable range
    #[error("date out of range in {placeholder}")]
    DateOutOfRange { placeholder: String, span: Span },
}

impl TemplateError {
    /// Source range of the construct that failed
    pub fn span(&self) -> &Span {
        match self {
            TemplateError::MissingParameter { span, .. }
            | TemplateError::TypeMismatch { span, .. }
            | TemplateError::InvalidLoopInput { span, .. }
            | TemplateError::LengthMismatch { span, .. }
            | TemplateError::InvalidConfig { span, .. }
            | TemplateError::UnknownOperation { span, .. }
            | TemplateError::InvalidNumber { span, .. }
            | TemplateError::InvalidDateFormat { span, .. }
            | TemplateError::DateOutOfRange { span, .. } => span,
        }
    }

    /// Short label shown under the offending source range
    fn label(&self) -> &'static str {
        match self {
            TemplateError::MissingParameter { .. } => "parameter not provided",
            TemplateError::TypeMismatch { .. } => "wrong parameter type",
            TemplateError::InvalidLoopInput { .. } => "loop input must be a list or integer",
            TemplateError::LengthMismatch { .. } => "list length differs from loop size",
            TemplateError::InvalidConfig { .. } => "while expanding this loop",
            TemplateError::UnknownOperation { .. } => "unknown operation",
            TemplateError::InvalidNumber { .. } => "not a number",
            TemplateError::InvalidDateFormat { .. } => "bad format string",
            TemplateError::DateOutOfRange { .. } => "date overflow",
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        let span = self.span().clone();
        let message = self.to_string();

        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(&message)
            .with_label(
                Label::new((filename, span))
                    .with_message(self.label())
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_parameter() {
        let err = TemplateError::TypeMismatch {
            name: "NETWORK001".to_string(),
            placeholder: "CONSTANT@NETWORK001".to_string(),
            expected: "string/number",
            found: "list",
            span: 0..10,
        };
        assert_eq!(
            err.to_string(),
            "CONSTANT@NETWORK001 refers to a list, but it can only be used with string/number values"
        );

        let err = TemplateError::LengthMismatch {
            name: "MYLIST1".to_string(),
            list_len: 2,
            loop_len: 3,
            span: 0..1,
        };
        assert_eq!(
            err.to_string(),
            "LOOPLIST 'MYLIST1' length (2) does not match loop size (3)"
        );
    }

    #[test]
    fn test_format_points_at_source() {
        let source = "Network: %%%CONSTANT@NET%%%";
        let err = TemplateError::MissingParameter {
            name: "NET".to_string(),
            placeholder: "CONSTANT@NET".to_string(),
            span: 9..source.len(),
        };
        let report = err.format(source, "template.txt");
        assert!(report.contains("missing parameter 'NET'"));
        assert!(report.contains("template.txt"));
        assert!(report.contains("parameter not provided"));
    }
}
