//! StagePhase core
//!
//! Shared vocabulary for the binding-time classifier and the staged template
//! expander: the template AST, the binding-time lattice, the symbol
//! binding-time table, intrinsic descriptors, diagnostics and configuration.

#[macro_use]
pub mod macros;

pub mod ast;
pub mod binding;
pub mod collections;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod intrinsics;
pub mod model;
pub mod pretty;
pub mod span;
pub mod symbols;

// Re-export commonly used items for convenience
pub use tracing;

pub use binding::{BindingTime, Stage};
pub use symbols::{Building, Frozen, SymbolTable};

// Alias for error types
pub type Error = crate::error::Error;
pub type Result<T> = crate::error::Result<T>;
