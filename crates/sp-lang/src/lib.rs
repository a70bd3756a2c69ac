//! Template source frontend: lexer, parser and name binder.

pub mod binder;
pub mod lexer;
pub mod parser;

pub use binder::{BoundTemplate, NameBinder};
pub use parser::{parse_block, parse_expr, parse_template, TemplateParser};
