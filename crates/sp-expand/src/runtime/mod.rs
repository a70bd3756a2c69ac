//! Generator runtime.
//!
//! Runs a [`Generator`] for one weave site: compile-time statements execute
//! directly, residual descriptions are constructed through the factory
//! adapter and appended to the output.

use std::collections::HashMap;

use sp_core::ast::print::{print_stmts, Formatting};
use sp_core::ast::{LocalId, NodeId, Stmt};
use sp_core::Result;

use crate::context::WeaveSiteContext;
use crate::factory::FactoryAdapter;
use crate::generator::Generator;
use crate::value::Value;

mod emit;
mod eval;

/// Allocates node ids for constructed code.
#[derive(Debug, Default)]
pub struct IdGen {
    next: NodeId,
}

impl IdGen {
    pub fn starting_at(next: NodeId) -> Self {
        Self { next }
    }

    pub fn next(&mut self) -> NodeId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Where a residual tree came from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Provenance {
    pub template: String,
    pub target: String,
    #[serde(default)]
    pub aspect: Option<String>,
}

/// Generated code for one weave site: plain statements, no binding times.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResidualAst {
    pub stmts: Vec<Stmt>,
    /// Comments inserted after the last generated statement.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trailing_comments: Vec<String>,
    pub provenance: Provenance,
    pub formatting: Formatting,
}

impl ResidualAst {
    pub fn to_source(&self) -> String {
        let mut source = print_stmts(&self.stmts, &self.formatting);
        let indent = " ".repeat(self.formatting.base_indent);
        let line_break = self.formatting.line_break.as_str();
        for comment in &self.trailing_comments {
            if !source.is_empty() {
                source.push_str(line_break);
            }
            source.push_str(&indent);
            source.push_str("//");
            if !comment.is_empty() {
                source.push(' ');
                source.push_str(comment);
            }
        }
        source
    }
}

/// Control transfer out of a compile-time loop body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Normal,
    Break,
    Continue,
}

pub(crate) struct Machine<'g, 'c> {
    generator: &'g Generator,
    site: &'c WeaveSiteContext,
    factory: &'static FactoryAdapter,
    ids: IdGen,
    locals: HashMap<LocalId, Value>,
    /// One buffer per residual block under construction.
    output: Vec<Vec<Stmt>>,
    /// Comments waiting for the next emitted statement.
    pending: Vec<String>,
    /// Jump of a compile-time loop that left a residual block early.
    escaped: Option<Flow>,
}

impl<'g, 'c> Machine<'g, 'c> {
    fn new(generator: &'g Generator, site: &'c WeaveSiteContext) -> Self {
        Self {
            generator,
            site,
            factory: FactoryAdapter::shared(),
            ids: IdGen::default(),
            locals: HashMap::new(),
            output: vec![Vec::new()],
            pending: Vec::new(),
            escaped: None,
        }
    }

    fn run(mut self) -> Result<ResidualAst> {
        let generator = self.generator;
        for param in &generator.params {
            let value = self.site.arguments.get(&param.name).cloned().ok_or_else(|| {
                crate::error::expansion_error(format!(
                    "missing compile-time argument `{}` for template `{}`",
                    param.name, generator.template
                ))
            })?;
            self.locals.insert(param.slot, value);
        }
        match self.exec_block(&generator.body)? {
            Flow::Normal => {}
            flow => crate::expand_bail!(format!("{:?} outside of a compile-time loop", flow)),
        }
        let stmts = self.output.pop().unwrap_or_default();
        Ok(ResidualAst {
            stmts,
            trailing_comments: self.pending,
            provenance: Provenance {
                template: generator.template.clone(),
                target: self.site.target.name.clone(),
                aspect: self.site.aspect.clone(),
            },
            formatting: self.site.formatting.clone(),
        })
    }
}

impl Generator {
    /// Generates the residual code for one weave site.
    pub fn expand(&self, site: &WeaveSiteContext) -> Result<ResidualAst> {
        tracing::debug!(
            "expanding `{}` for `{}`",
            self.template,
            site.target.name
        );
        let residual = Machine::new(self, site).run()?;
        tracing::trace!(
            "`{}` produced {} statements",
            self.template,
            residual.stmts.len()
        );
        Ok(residual)
    }
}
