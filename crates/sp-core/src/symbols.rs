//! Symbol binding-time table.
//!
//! The table is filled while `Building`, then frozen. Freezing resolves the
//! configured intrinsic symbols against the declarations; afterwards the
//! declaration maps never change and classifications are memoized in a
//! concurrent cache, so a `SymbolTable<Frozen>` can be shared by templates
//! analyzed on several threads.

use std::collections::HashMap;
use std::marker::PhantomData;

use crate::binding::BindingTime;
use crate::collections::ConcurrentMap;
use crate::config::EngineConfig;
use crate::intrinsics::{IntrinsicCatalog, IntrinsicKind, IntrinsicSpec};
use crate::model::{qualified_name, DeclId, DeclOrigin, Declaration, StageMarker, SymbolRef};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Building;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frozen;

/// Why a declaration received its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingProvenance {
    Intrinsic(IntrinsicKind),
    Explicit(StageMarker),
    Inherited { container: DeclId },
    Default,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolBinding {
    pub binding: BindingTime,
    pub provenance: BindingProvenance,
}

pub struct SymbolTable<S = Frozen> {
    declarations: HashMap<DeclId, Declaration>,
    catalog: IntrinsicCatalog,
    external_default: BindingTime,
    intrinsics: HashMap<DeclId, IntrinsicSpec>,
    cache: ConcurrentMap<DeclId, SymbolBinding>,
    _state: PhantomData<S>,
}

impl<S> std::fmt::Debug for SymbolTable<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable")
            .field("declarations", &self.declarations.len())
            .field("intrinsics", &self.intrinsics.len())
            .field("external_default", &self.external_default)
            .finish()
    }
}

impl<S> SymbolTable<S> {
    pub fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        self.declarations.get(&id)
    }

    pub fn qualified_name(&self, id: DeclId) -> Option<String> {
        qualified_name(id, |id| self.declarations.get(&id))
    }

    pub fn external_default(&self) -> BindingTime {
        self.external_default
    }
}

impl SymbolTable<Building> {
    pub fn new(external_default: BindingTime) -> Self {
        Self {
            declarations: HashMap::new(),
            catalog: IntrinsicCatalog::standard(),
            external_default,
            intrinsics: HashMap::new(),
            cache: ConcurrentMap::new(),
            _state: PhantomData,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.external_default).with_intrinsics(config.intrinsic_catalog())
    }

    pub fn with_intrinsics(mut self, catalog: IntrinsicCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn declare(&mut self, declaration: Declaration) {
        self.declarations.insert(declaration.id, declaration);
    }

    pub fn declare_all<'a>(mut self, declarations: impl IntoIterator<Item = &'a Declaration>) -> Self {
        for declaration in declarations {
            self.declare(declaration.clone());
        }
        self
    }

    /// Binds every configured intrinsic symbol to its declaration.
    ///
    /// Fails with one entry per intrinsic symbol that no declaration provides.
    pub fn freeze(self) -> Result<SymbolTable<Frozen>> {
        let by_name: HashMap<String, DeclId> = self
            .declarations
            .keys()
            .filter_map(|&id| self.qualified_name(id).map(|name| (name, id)))
            .collect();

        let mut intrinsics = HashMap::new();
        let mut missing = Vec::new();
        for spec in self.catalog.iter() {
            match by_name.get(&spec.symbol) {
                Some(&id) => {
                    intrinsics.insert(id, spec.clone());
                }
                None => missing.push(spec.symbol.clone()),
            }
        }
        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            for symbol in &missing {
                tracing::error!("intrinsic symbol `{}` has no declaration", symbol);
            }
            return Err(Error::configuration(format!(
                "intrinsic symbols without declaration: {}",
                missing.join(", ")
            )));
        }
        tracing::debug!(
            "froze symbol table with {} declarations and {} intrinsics",
            self.declarations.len(),
            intrinsics.len()
        );

        Ok(SymbolTable {
            declarations: self.declarations,
            catalog: self.catalog,
            external_default: self.external_default,
            intrinsics,
            cache: ConcurrentMap::new(),
            _state: PhantomData,
        })
    }
}

impl SymbolTable<Frozen> {
    pub fn classify(&self, id: DeclId) -> BindingTime {
        self.binding(id).binding
    }

    pub fn binding(&self, id: DeclId) -> SymbolBinding {
        self.cache.get_or_insert_with(id, || self.compute(id))
    }

    /// Classification of a resolved reference; `None` for locals, whose
    /// binding time lives in the analyzer's scopes.
    pub fn classify_ref(&self, symbol: SymbolRef) -> Option<BindingTime> {
        match symbol {
            SymbolRef::Declaration(id) => Some(self.classify(id)),
            SymbolRef::Unresolved => Some(self.external_default),
            SymbolRef::Local(_) => None,
        }
    }

    pub fn intrinsic(&self, id: DeclId) -> Option<&IntrinsicSpec> {
        self.intrinsics.get(&id)
    }

    pub fn intrinsic_catalog(&self) -> &IntrinsicCatalog {
        &self.catalog
    }

    fn compute(&self, id: DeclId) -> SymbolBinding {
        if let Some(spec) = self.intrinsics.get(&id) {
            return SymbolBinding {
                binding: spec.binding,
                provenance: BindingProvenance::Intrinsic(spec.kind.clone()),
            };
        }
        let Some(declaration) = self.declarations.get(&id) else {
            return SymbolBinding {
                binding: self.external_default,
                provenance: BindingProvenance::External,
            };
        };
        if let Some(marker) = declaration.marker {
            return SymbolBinding {
                binding: marker.binding_time(),
                provenance: BindingProvenance::Explicit(marker),
            };
        }
        if let Some(container) = self.meta_container(declaration) {
            return SymbolBinding {
                binding: BindingTime::MetaOnly,
                provenance: BindingProvenance::Inherited { container },
            };
        }
        match declaration.origin {
            DeclOrigin::Source => SymbolBinding {
                binding: BindingTime::ObjectOnly,
                provenance: BindingProvenance::Default,
            },
            DeclOrigin::External => SymbolBinding {
                binding: self.external_default,
                provenance: BindingProvenance::External,
            },
        }
    }

    /// Nearest marked container, if it is marked meta-only.
    fn meta_container(&self, declaration: &Declaration) -> Option<DeclId> {
        let mut current = declaration.container;
        let mut depth = 0;
        while let Some(id) = current {
            let container = self.declarations.get(&id)?;
            match container.marker {
                Some(StageMarker::MetaOnly) => return Some(id),
                Some(_) => return None,
                None => current = container.container,
            }
            depth += 1;
            if depth > self.declarations.len() {
                return None;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeclKind, DeclarationCatalog};

    fn frozen(catalog: &DeclarationCatalog) -> SymbolTable<Frozen> {
        SymbolTable::new(BindingTime::Both)
            .declare_all(catalog.iter())
            .freeze()
            .expect("freeze")
    }

    #[test]
    fn intrinsics_have_fixed_classification() {
        let catalog = DeclarationCatalog::with_meta_api();
        let table = frozen(&catalog);
        let proceed = catalog.lookup("meta.proceed").expect("proceed");
        let run_time = catalog.lookup("meta.run_time").expect("run_time");
        let target = catalog.lookup("meta.target").expect("target");
        assert_eq!(table.classify(proceed), BindingTime::MetaOnlyProducingBoth);
        assert_eq!(table.classify(run_time), BindingTime::ObjectOnly);
        assert_eq!(table.classify(target), BindingTime::MetaOnly);
        assert!(matches!(
            table.binding(proceed).provenance,
            BindingProvenance::Intrinsic(IntrinsicKind::Proceed)
        ));
    }

    #[test]
    fn marker_beats_container_and_container_is_transitive() {
        let mut catalog = DeclarationCatalog::with_meta_api();
        let helpers = catalog.add(
            Declaration::new(0, "helpers", DeclKind::Type).with_marker(StageMarker::MetaOnly),
        );
        let inner = catalog.add(Declaration::new(0, "inner", DeclKind::Type).in_container(helpers));
        let nested = catalog.add(Declaration::new(0, "count", DeclKind::Method).in_container(inner));
        let marked = catalog.add(
            Declaration::new(0, "emit", DeclKind::Method)
                .in_container(helpers)
                .with_marker(StageMarker::ObjectOnly),
        );
        let plain = catalog.add(Declaration::new(0, "log", DeclKind::Method));
        let external = catalog.add(Declaration::new(0, "print", DeclKind::Method).external());

        let table = frozen(&catalog);
        assert_eq!(table.classify(nested), BindingTime::MetaOnly);
        assert_eq!(
            table.binding(nested).provenance,
            BindingProvenance::Inherited { container: helpers }
        );
        assert_eq!(table.classify(marked), BindingTime::ObjectOnly);
        assert_eq!(table.classify(plain), BindingTime::ObjectOnly);
        assert_eq!(table.classify(external), BindingTime::Both);
        assert_eq!(table.classify_ref(SymbolRef::Unresolved), Some(BindingTime::Both));
        assert_eq!(table.classify_ref(SymbolRef::Local(7)), None);
    }

    #[test]
    fn classification_is_idempotent() {
        let catalog = DeclarationCatalog::with_meta_api();
        let table = frozen(&catalog);
        for decl in catalog.iter() {
            let first = table.binding(decl.id);
            assert_eq!(table.binding(decl.id), first);
        }
    }

    #[test]
    fn missing_intrinsic_declaration_fails_freeze() {
        let err = SymbolTable::new(BindingTime::Both)
            .declare_all(DeclarationCatalog::new().iter())
            .freeze()
            .unwrap_err();
        match err {
            Error::Configuration(message) => {
                assert_eq!(message.matches("meta.proceed").count(), 1);
                assert!(message.contains("meta.insert_comment"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn frozen_table_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SymbolTable<Frozen>>();
    }
}
