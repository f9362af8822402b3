//! Parser for stencil templates

pub mod ast;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use grammar::{first_block, parse};
