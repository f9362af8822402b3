//! Expansion driver
//!
//! An [`Engine`] owns the reference timestamp for date placeholders. Each
//! [`Engine::process`] call expands the template with fresh counters; error
//! spans always point into the template as given.

use chrono::{Local, NaiveDateTime};
use tracing::debug;

use crate::error::TemplateError;
use crate::params::Parameters;
use crate::parser::parse;
use crate::template::{expand_text, ExpansionContext, MappedText};

/// Template expansion engine
#[derive(Debug, Clone)]
pub struct Engine {
    reference: NaiveDateTime,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine pinned to the current local time
    pub fn new() -> Self {
        Self {
            reference: Local::now().naive_local(),
        }
    }

    /// Pin the timestamp date placeholders are computed from
    pub fn with_reference_time(mut self, reference: NaiveDateTime) -> Self {
        self.reference = reference;
        self
    }

    pub fn reference_time(&self) -> NaiveDateTime {
        self.reference
    }

    /// Expand a template against a parameter mapping
    ///
    /// # Example
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use stencil::{Engine, Parameters};
    ///
    /// let reference = NaiveDate::from_ymd_opt(2023, 6, 15)
    ///     .unwrap()
    ///     .and_hms_opt(12, 0, 0)
    ///     .unwrap();
    /// let engine = Engine::new().with_reference_time(reference);
    /// let params = Parameters::new().with("NET", "TestNet");
    ///
    /// let out = engine
    ///     .process("%%%NOW@1@%Y-%m-%d%%% on %%%CONSTANT@NET%%%", &params)
    ///     .unwrap();
    /// assert_eq!(out, "2023-06-16 on TestNet");
    /// ```
    pub fn process(&self, template: &str, params: &Parameters) -> Result<String, TemplateError> {
        debug!(
            blocks = parse(template).blocks().count(),
            parameters = params.len(),
            reference = %self.reference,
            "processing template"
        );

        let mut ctx = ExpansionContext::new(self.reference, params);
        let output = expand_text(&mut ctx, MappedText::new(template))?;
        Ok(output.into_string())
    }
}
