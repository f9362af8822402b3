//! Template expansion
//!
//! Turns template text plus a parameter map into output text. Expansion is
//! driven by an [`ExpansionContext`] which owns the reference timestamp and
//! the global `INC` counters. Text is carried as [`MappedText`] so errors
//! found in rewritten text still point into the template.
//!
//! # Example
//!
//! ```text
//! Servers:
//! %%%LOOP@HOSTS@host%%%
//!   %%%INDEX%%%: %%%host.VALUE%%% (%%%LOOPLIST@PORTS%%%)
//! %%%LOOP@END@host%%%
//! Generated %%%NOW@0@%Y-%m-%d%%%
//! ```

mod context;
mod counter;
mod expander;
mod mapped;
mod resolver;

pub use context::ExpansionContext;
pub use counter::CounterRegistry;
pub use expander::{expand_text, substitute_variables, INDEX_SHIFT};
pub use mapped::MappedText;
pub use resolver::month_delta;
