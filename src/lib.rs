//! Stencil - A placeholder and loop templating engine
//!
//! This library expands text templates containing `%%%`-delimited
//! placeholders: dates relative to a reference time, named constants,
//! auto-increment counters and nestable `LOOP` blocks.
//!
//! # Example
//!
//! ```rust
//! use stencil::{process, Parameters};
//!
//! let params = Parameters::new()
//!     .with("HOSTS", vec!["alpha", "beta"]);
//!
//! let out = process(
//!     "%%%LOOP@HOSTS@h%%%\n%%%INDEX%%%=%%%h.VALUE%%%\n%%%LOOP@END@h%%%\n",
//!     &params,
//! )
//! .unwrap();
//! assert_eq!(out, "0=alpha\n1=beta\n");
//! ```

pub mod engine;
pub mod error;
pub mod generate;
pub mod params;
pub mod parser;
pub mod template;

pub use engine::Engine;
pub use error::TemplateError;
pub use generate::{
    generate_file, generate_file_and_return_content, generate_file_with, GenerateError,
};
pub use params::{Parameters, ParamsError, Value};
pub use parser::{parse, Template};

/// Expand a template with the current local time as reference
///
/// This is the main entry point for the library. Use [`Engine`] to pin
/// the reference time.
///
/// # Example
///
/// ```rust
/// use stencil::{process, Parameters};
///
/// let params = Parameters::new().with("NET", "TestNet").with("N", 2);
/// let out = process(
///     "Network: %%%CONSTANT@NET%%%\nValues: %%%INC@10@1%%%,%%%INC@10@1%%%\n%%%LOOP@N@i%%%\n- %%%INDEX%%%\n%%%LOOP@END@i%%%",
///     &params,
/// )
/// .unwrap();
///
/// assert_eq!(out, "Network: TestNet\nValues: 10.0,11.0\n- 0\n- 1");
/// ```
pub fn process(template: &str, params: &Parameters) -> Result<String, TemplateError> {
    Engine::new().process(template, params)
}
