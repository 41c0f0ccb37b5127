//! # Vellum HTML Compiler
//!
//! Turns an edited document back into a standalone template: the current
//! body markup, the template's styles with the session's color values
//! substituted, its stylesheet links, scripts and body class.
//!
//! The output parses back through `vellum_parser::parse_template` to the
//! same body markup and colors.

mod compiler;

pub use compiler::{compile_template, suggested_file_name, CompileError, CompileOptions};

#[cfg(test)]
mod tests;
