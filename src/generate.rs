//! Template files in, generated files out

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::info;

use crate::engine::Engine;
use crate::error::TemplateError;
use crate::params::Parameters;

/// Errors that can occur while generating a file from a template
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Template file not found: {}", path.display())]
    TemplateNotFound { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),
}

/// Generate `output` from the template at `template_path`
///
/// Returns the timestamp date placeholders were computed from.
pub fn generate_file(
    output: impl AsRef<Path>,
    template_path: impl AsRef<Path>,
    params: &Parameters,
) -> Result<NaiveDateTime, GenerateError> {
    let (_, reference) = generate_file_with(&Engine::new(), output, template_path, params)?;
    Ok(reference)
}

/// Like [`generate_file`], also returning the generated text
pub fn generate_file_and_return_content(
    output: impl AsRef<Path>,
    template_path: impl AsRef<Path>,
    params: &Parameters,
) -> Result<(String, NaiveDateTime), GenerateError> {
    generate_file_with(&Engine::new(), output, template_path, params)
}

/// Generate a file with a caller-configured engine
///
/// Parent directories of `output` are created as needed.
pub fn generate_file_with(
    engine: &Engine,
    output: impl AsRef<Path>,
    template_path: impl AsRef<Path>,
    params: &Parameters,
) -> Result<(String, NaiveDateTime), GenerateError> {
    let output = output.as_ref();
    let template_path = template_path.as_ref();

    if !template_path.exists() {
        return Err(GenerateError::TemplateNotFound {
            path: template_path.to_path_buf(),
        });
    }
    let template = fs::read_to_string(template_path)?;
    let content = engine.process(&template, params)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, &content)?;

    info!(
        template = %template_path.display(),
        output = %output.display(),
        bytes = content.len(),
        "generated file"
    );
    Ok((content, engine.reference_time()))
}
