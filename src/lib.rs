//! sush, a small interactive shell.
//!
//! A line is split on unquoted `|` into stages, each stage is tokenized into
//! words and `<`, `>`, `>>` redirects, and the result is either run in-process
//! by one of the built-ins or as a pipeline of child processes joined by
//! pipes.
//!
//! The main entry point is [`Interpreter`]. The [`parser`] and [`executor`]
//! modules can also be used on their own: [`parser::parse_line`] produces a
//! [`pipeline::CommandLine`] and [`executor::run_pipeline`] runs the
//! [`pipeline::Pipeline`] inside it.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod executor;
pub mod external;
mod interpreter;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod source;

/// Just a convenient re-export of the command interpreter.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Interpreter, SYNTAX_ERROR};
