use std::collections::HashMap;

use sp_core::ast::{LocalId, NodeId};
use sp_core::model::TypeShape;
use sp_core::span::Span;
use sp_core::{BindingTime, Stage};

#[derive(Debug, Clone)]
pub(crate) struct LocalState {
    pub name: String,
    pub shape: TypeShape,
    pub binding: Option<Stage>,
    /// Node whose value fixed the binding; `None` for parameters and
    /// defaulted locals
    pub determined_at: Option<(NodeId, Span)>,
}

/// Outcome of a binding-determining use of a local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Determination {
    /// Still undetermined; the use sees `Both`.
    Open,
    Bound(Stage),
    Conflict {
        fixed: Stage,
        at: Option<Span>,
    },
}

/// Binding times of locals, kept across fixpoint passes, plus the lexical
/// frames of the current pass.
#[derive(Debug, Default)]
pub(crate) struct ScopeRecord {
    locals: HashMap<LocalId, LocalState>,
    frames: Vec<(NodeId, Vec<LocalId>)>,
    changed: bool,
}

impl ScopeRecord {
    pub fn enter(&mut self, block: NodeId) {
        self.frames.push((block, Vec::new()));
    }

    pub fn exit(&mut self) -> Option<(NodeId, Vec<LocalId>)> {
        self.frames.pop()
    }

    pub fn declare(&mut self, id: LocalId, name: &str, shape: TypeShape) {
        if let Some((_, declared)) = self.frames.last_mut() {
            declared.push(id);
        }
        self.locals
            .entry(id)
            .and_modify(|state| state.shape = shape.clone())
            .or_insert_with(|| LocalState {
                name: name.to_string(),
                shape,
                binding: None,
                determined_at: None,
            });
    }

    /// Declares a local whose stage is fixed by its declaration.
    pub fn declare_fixed(&mut self, id: LocalId, name: &str, shape: TypeShape, stage: Stage) {
        self.declare(id, name, shape);
        if let Some(state) = self.locals.get_mut(&id) {
            if state.binding.is_none() {
                state.binding = Some(stage);
                self.changed = true;
            }
        }
    }

    pub fn state(&self, id: LocalId) -> Option<&LocalState> {
        self.locals.get(&id)
    }

    /// Current classification of a local; undetermined locals are `Both`
    /// until the fixpoint settles them.
    pub fn binding(&self, id: LocalId) -> BindingTime {
        match self.locals.get(&id) {
            Some(LocalState {
                binding: Some(stage),
                ..
            }) => (*stage).into(),
            Some(_) => BindingTime::Both,
            None => BindingTime::ObjectOnly,
        }
    }

    pub fn shape(&self, id: LocalId) -> TypeShape {
        self.locals
            .get(&id)
            .map(|state| state.shape.clone())
            .unwrap_or_default()
    }

    pub fn name(&self, id: LocalId) -> String {
        self.locals
            .get(&id)
            .map(|state| state.name.clone())
            .unwrap_or_else(|| format!("#{}", id))
    }

    /// Applies a determining use at `node`. The first concrete use fixes the
    /// stage; re-visiting the same node in a later pass is not a conflict.
    ///
    /// Nodes whose value is still `Both` pass `None`.
    pub fn determine(
        &mut self,
        id: LocalId,
        node: NodeId,
        span: Span,
        attempted: Option<Stage>,
    ) -> Determination {
        self.determine_use(id, node, span, attempted, false)
    }

    /// Like [`ScopeRecord::determine`] for a value pinned to `stage` by
    /// `meta.compile_time`/`meta.run_time`. A pinned compile-time value is
    /// never lifted into a run-time local.
    pub fn determine_forced(
        &mut self,
        id: LocalId,
        node: NodeId,
        span: Span,
        stage: Stage,
    ) -> Determination {
        self.determine_use(id, node, span, Some(stage), true)
    }

    fn determine_use(
        &mut self,
        id: LocalId,
        node: NodeId,
        span: Span,
        attempted: Option<Stage>,
        forced: bool,
    ) -> Determination {
        let Some(state) = self.locals.get_mut(&id) else {
            return Determination::Bound(Stage::Object);
        };
        match (state.binding, attempted) {
            (None, None) => Determination::Open,
            (None, Some(stage)) => {
                state.binding = Some(stage);
                state.determined_at = Some((node, span));
                self.changed = true;
                Determination::Bound(stage)
            }
            // the determining node itself may see a different value once
            // other locals settle
            (Some(fixed), attempted) if state.determined_at.map(|(at, _)| at) == Some(node) => {
                match attempted {
                    Some(stage) if stage != fixed => {
                        state.binding = Some(stage);
                        self.changed = true;
                        Determination::Bound(stage)
                    }
                    _ => Determination::Bound(fixed),
                }
            }
            (Some(fixed), None) => Determination::Bound(fixed),
            (Some(fixed), Some(stage)) if fixed == stage => Determination::Bound(fixed),
            // a compile-time value assigned to a run-time local is lifted
            (Some(Stage::Object), Some(Stage::Meta)) if !forced => {
                Determination::Bound(Stage::Object)
            }
            (Some(fixed), Some(_)) => Determination::Conflict {
                fixed,
                at: state.determined_at.map(|(_, span)| span),
            },
        }
    }

    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Settles every undetermined local to run-time; returns how many changed.
    pub fn default_undetermined(&mut self) -> usize {
        let mut count = 0;
        for state in self.locals.values_mut() {
            if state.binding.is_none() {
                state.binding = Some(Stage::Object);
                count += 1;
            }
        }
        count
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }

    pub fn bindings(&self) -> HashMap<LocalId, BindingTime> {
        self.locals
            .keys()
            .map(|&id| (id, self.binding(id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_concrete_use_fixes_the_stage() {
        let mut scopes = ScopeRecord::default();
        scopes.enter(1);
        scopes.declare(10, "n", TypeShape::Scalar);
        assert_eq!(scopes.binding(10), BindingTime::Both);
        assert_eq!(scopes.determine(10, 11, Span::null(), None), Determination::Open);
        assert_eq!(
            scopes.determine(10, 12, Span::new(0, 3, 4), Some(Stage::Meta)),
            Determination::Bound(Stage::Meta)
        );
        assert!(scopes.take_changed());
        assert_eq!(
            scopes.determine(10, 12, Span::null(), Some(Stage::Meta)),
            Determination::Bound(Stage::Meta)
        );
        assert_eq!(
            scopes.determine(10, 13, Span::null(), Some(Stage::Object)),
            Determination::Conflict {
                fixed: Stage::Meta,
                at: Some(Span::new(0, 3, 4))
            }
        );
        assert!(!scopes.take_changed());
        assert_eq!(scopes.exit(), Some((1, vec![10])));
    }

    #[test]
    fn run_time_locals_accept_compile_time_values() {
        let mut scopes = ScopeRecord::default();
        scopes.declare_fixed(4, "x", TypeShape::Unknown, Stage::Object);
        assert_eq!(
            scopes.determine(4, 5, Span::null(), Some(Stage::Meta)),
            Determination::Bound(Stage::Object)
        );
    }

    #[test]
    fn forced_compile_time_values_are_not_lifted() {
        let mut scopes = ScopeRecord::default();
        scopes.declare(4, "x", TypeShape::Unknown);
        assert_eq!(
            scopes.determine(4, 5, Span::new(0, 10, 16), Some(Stage::Object)),
            Determination::Bound(Stage::Object)
        );
        assert_eq!(
            scopes.determine_forced(4, 6, Span::null(), Stage::Meta),
            Determination::Conflict {
                fixed: Stage::Object,
                at: Some(Span::new(0, 10, 16))
            }
        );
        // a re-visit of the determining node is not a conflict
        assert_eq!(
            scopes.determine_forced(4, 5, Span::null(), Stage::Object),
            Determination::Bound(Stage::Object)
        );
    }

    #[test]
    fn undetermined_locals_default_to_run_time() {
        let mut scopes = ScopeRecord::default();
        scopes.declare(1, "a", TypeShape::Unknown);
        scopes.declare_fixed(2, "b", TypeShape::Unknown, Stage::Meta);
        assert_eq!(scopes.default_undetermined(), 1);
        assert_eq!(scopes.binding(1), BindingTime::ObjectOnly);
        assert_eq!(scopes.binding(2), BindingTime::MetaOnly);
    }
}
