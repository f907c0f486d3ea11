pub mod ast;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;

pub use ast::{Command, RedirectOp, Redirects, StageRole};
pub use parser::{parse, Parser, DEFAULT_MAX_LINE_LEN};
