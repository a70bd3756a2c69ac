//! Staged template expansion.
//!
//! A classified template is rewritten into a [`Generator`]: compile-time code
//! plus descriptions of the code to emit. Running the generator for one
//! weave site yields a [`ResidualAst`] built through the [`FactoryAdapter`].

pub mod compiler;
pub mod context;
pub mod error;
pub mod factory;
pub mod generator;
pub mod rewrite;
pub mod runtime;
pub mod value;

pub use compiler::TemplateCompiler;
pub use context::{MetaFunction, ProceedBody, TargetDeclaration, TargetParameter, WeaveSiteContext};
pub use factory::FactoryAdapter;
pub use generator::Generator;
pub use rewrite::rewrite;
pub use runtime::{IdGen, Provenance, ResidualAst};
pub use value::Value;
