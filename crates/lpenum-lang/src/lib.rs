//! Text front end for the enumerating simplex solver.
//!
//! ```text
//! # comments start with `#` or `//`
//! max: 3x + 2y
//! cap: x + y <= 4
//! x + 3y <= 6; y >= 0.5
//! ```
//!
//! One statement per line (or separated by `;`). Exactly one objective is
//! required; constraints may be labelled.

pub mod ast;
pub mod compiler;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use compiler::{CompileError, CompiledProblem, Compiler};
pub use lexer::{Lexer, Span, Token, TokenKind};
pub use parser::{ParseError, Parser};
