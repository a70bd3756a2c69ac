//! Name resolution against a declaration catalog.

use std::collections::HashMap;

use sp_core::ast::{Block, Expr, ExprKind, LocalId, NodeId, Stmt, StmtKind, Template};
use sp_core::model::{
    shape_of, DeclId, Declaration, DeclarationCatalog, SemanticModel, SymbolRef, TypeShape,
};

/// Semantic model produced by [`NameBinder`] for one template.
#[derive(Debug, Clone)]
pub struct BoundTemplate<'c> {
    catalog: &'c DeclarationCatalog,
    resolutions: HashMap<NodeId, SymbolRef>,
}

impl<'c> BoundTemplate<'c> {
    pub fn catalog(&self) -> &'c DeclarationCatalog {
        self.catalog
    }

    pub fn resolutions(&self) -> &HashMap<NodeId, SymbolRef> {
        &self.resolutions
    }
}

impl SemanticModel for BoundTemplate<'_> {
    fn resolve(&self, node: NodeId) -> SymbolRef {
        self.resolutions
            .get(&node)
            .copied()
            .unwrap_or(SymbolRef::Unresolved)
    }

    fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        self.catalog.get(id)
    }
}

/// Resolves identifiers to lexical locals first, then to top-level catalog
/// declarations. Members are looked up in the container named by the base,
/// or in the declared type of the base's value.
pub struct NameBinder<'c> {
    catalog: &'c DeclarationCatalog,
    scopes: Vec<HashMap<String, LocalId>>,
    local_shapes: HashMap<LocalId, TypeShape>,
    resolutions: HashMap<NodeId, SymbolRef>,
}

impl SemanticModel for NameBinder<'_> {
    fn resolve(&self, node: NodeId) -> SymbolRef {
        self.resolutions
            .get(&node)
            .copied()
            .unwrap_or(SymbolRef::Unresolved)
    }

    fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        self.catalog.get(id)
    }
}

impl<'c> NameBinder<'c> {
    pub fn new(catalog: &'c DeclarationCatalog) -> Self {
        Self {
            catalog,
            scopes: Vec::new(),
            local_shapes: HashMap::new(),
            resolutions: HashMap::new(),
        }
    }

    pub fn bind(mut self, template: &Template) -> BoundTemplate<'c> {
        self.scopes.push(HashMap::new());
        for param in &template.params {
            self.declare(&param.name, param.id, TypeShape::Unknown);
        }
        self.bind_block(&template.body);
        self.scopes.pop();

        let unresolved = self
            .resolutions
            .values()
            .filter(|symbol| **symbol == SymbolRef::Unresolved)
            .count();
        tracing::debug!(
            "bound template `{}`: {} references, {} unresolved",
            template.name,
            self.resolutions.len(),
            unresolved
        );
        BoundTemplate {
            catalog: self.catalog,
            resolutions: self.resolutions,
        }
    }

    fn declare(&mut self, name: &str, id: LocalId, shape: TypeShape) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), id);
        }
        self.local_shapes.insert(id, shape);
    }

    fn lookup_local(&self, name: &str) -> Option<LocalId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn shape(&self, expr: &Expr) -> TypeShape {
        shape_of(expr, self, &|id| {
            self.local_shapes.get(&id).cloned().unwrap_or_default()
        })
    }

    fn bind_block(&mut self, block: &Block) {
        self.scopes.push(HashMap::new());
        for stmt in &block.stmts {
            self.bind_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn bind_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Local(local) => {
                let shape = match &local.init {
                    Some(init) => {
                        self.bind_expr(init);
                        self.shape(init)
                    }
                    None => TypeShape::Unknown,
                };
                self.declare(&local.name, stmt.id, shape);
            }
            StmtKind::Expr(expr) => self.bind_expr(&expr.expr),
            StmtKind::Block(block) => self.bind_block(block),
            StmtKind::If(stmt_if) => {
                self.bind_expr(&stmt_if.cond);
                self.bind_block(&stmt_if.then);
                if let Some(elze) = &stmt_if.elze {
                    self.bind_stmt(elze);
                }
            }
            StmtKind::While(stmt_while) => {
                self.bind_expr(&stmt_while.cond);
                self.bind_block(&stmt_while.body);
            }
            StmtKind::ForEach(each) => {
                self.bind_expr(&each.iter);
                let element = self.shape(&each.iter).element();
                self.scopes.push(HashMap::new());
                self.declare(&each.binding, stmt.id, element);
                self.bind_block(&each.body);
                self.scopes.pop();
            }
            StmtKind::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.bind_expr(value);
                }
            }
            StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Try(stmt_try) => {
                self.bind_block(&stmt_try.body);
                for catch in &stmt_try.catches {
                    self.scopes.push(HashMap::new());
                    if let Some(binding) = &catch.binding {
                        self.declare(binding, catch.id, TypeShape::Unknown);
                    }
                    if let Some(filter) = &catch.filter {
                        self.bind_expr(filter);
                    }
                    self.bind_block(&catch.body);
                    self.scopes.pop();
                }
                if let Some(finally) = &stmt_try.finally {
                    self.bind_block(finally);
                }
            }
        }
    }

    fn bind_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(ident) => {
                let symbol = match self.lookup_local(&ident.name) {
                    Some(local) => SymbolRef::Local(local),
                    None => self
                        .catalog
                        .member(None, &ident.name)
                        .map(SymbolRef::Declaration)
                        .unwrap_or(SymbolRef::Unresolved),
                };
                self.resolutions.insert(expr.id, symbol);
            }
            ExprKind::Member(member) => {
                self.bind_expr(&member.base);
                let symbol = self
                    .member_container(&member.base)
                    .and_then(|container| self.catalog.member(Some(container), &member.member))
                    .map(SymbolRef::Declaration)
                    .unwrap_or(SymbolRef::Unresolved);
                self.resolutions.insert(expr.id, symbol);
            }
            _ => expr.for_each_child(|child| self.bind_expr(child)),
        }
    }

    /// Declaration whose members `base.<name>` refers to.
    fn member_container(&self, base: &Expr) -> Option<DeclId> {
        let base = base.peel_parens();
        if let SymbolRef::Declaration(id) = self.resolve(base.id) {
            if self.catalog.get(id).is_some_and(|decl| decl.kind.is_container()) {
                return Some(id);
            }
        }
        match self.shape(base) {
            TypeShape::Declared(id) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_template;

    fn find_member<'e>(expr: &'e Expr, name: &str, out: &mut Vec<&'e Expr>) {
        if let ExprKind::Member(member) = &expr.kind {
            if member.member == name {
                out.push(expr);
            }
        }
        expr.for_each_child(|child| find_member(child, name, out));
    }

    #[test]
    fn members_resolve_through_declared_shapes() {
        let template = parse_template(
            "template method t() { var decl = meta.target; var n = decl.parameter_count; }",
        )
        .expect("parse");
        let catalog = DeclarationCatalog::with_meta_api();
        let bound = NameBinder::new(&catalog).bind(&template);

        let StmtKind::Local(local) = &template.body.stmts[1].kind else {
            panic!("expected local");
        };
        let init = local.init.as_ref().expect("init");
        let mut members = Vec::new();
        find_member(init, "parameter_count", &mut members);
        let symbol = bound.resolve(members[0].id);
        let SymbolRef::Declaration(id) = symbol else {
            panic!("unresolved member: {symbol:?}");
        };
        assert_eq!(
            catalog.qualified_name(id).as_deref(),
            Some("meta.IDeclaration.parameter_count")
        );
    }

    #[test]
    fn locals_shadow_declarations() {
        let template =
            parse_template("template method t(meta) { meta.target; }").expect("parse");
        let catalog = DeclarationCatalog::with_meta_api();
        let bound = NameBinder::new(&catalog).bind(&template);
        let param = template.params[0].id;
        assert!(bound
            .resolutions()
            .values()
            .any(|symbol| *symbol == SymbolRef::Local(param)));
        assert!(bound
            .resolutions()
            .values()
            .any(|symbol| *symbol == SymbolRef::Unresolved));
    }
}
