//! Binding-time lattice.
//!
//! ```text
//!              Both
//!               |
//!     MetaOnlyProducingBoth
//!         /           \
//!    ObjectOnly     MetaOnly
//!         \           /
//!           Ambiguous
//! ```
//!
//! `join` is the greatest lower bound of this order; `meet` specializes a
//! value to a forced stage.

use std::fmt::{Display, Formatter};

common_enum! {
    /// Stage at which a value or statement is evaluated.
    #[derive(Copy, Eq, Hash)]
    pub enum Stage {
        /// While generating the program.
        Meta,
        /// Inside the generated program.
        Object,
    }
}

impl Stage {
    pub fn opposite(self) -> Stage {
        match self {
            Stage::Meta => Stage::Object,
            Stage::Object => Stage::Meta,
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Meta => f.write_str("compile-time"),
            Stage::Object => f.write_str("run-time"),
        }
    }
}

common_enum! {
    #[derive(Copy, Eq, Hash)]
    pub enum BindingTime {
        /// Exists only in the generated program.
        ObjectOnly,
        /// Exists only while generating.
        MetaOnly,
        /// Usable at either stage; specialized by context.
        Both,
        /// Evaluated while generating, its result spliced into the generated
        /// program.
        MetaOnlyProducingBoth,
        /// Irreconcilable.
        Ambiguous,
    }
}

/// Raised by [`BindingTime::meet`] when a value cannot be specialized to the
/// stage its context forces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a {value} value cannot be used in a {stage} context")]
pub struct StageMismatch {
    pub value: BindingTime,
    pub stage: Stage,
}

impl BindingTime {
    pub const ALL: [BindingTime; 5] = [
        BindingTime::ObjectOnly,
        BindingTime::MetaOnly,
        BindingTime::Both,
        BindingTime::MetaOnlyProducingBoth,
        BindingTime::Ambiguous,
    ];

    fn rank(self) -> u8 {
        match self {
            BindingTime::Ambiguous => 0,
            BindingTime::ObjectOnly | BindingTime::MetaOnly => 1,
            BindingTime::MetaOnlyProducingBoth => 2,
            BindingTime::Both => 3,
        }
    }

    /// Partial order of the lattice: `a.leq(b)` when `a` is at most as general
    /// as `b`.
    pub fn leq(self, other: BindingTime) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (BindingTime::ObjectOnly, BindingTime::MetaOnly)
            | (BindingTime::MetaOnly, BindingTime::ObjectOnly) => false,
            _ => self.rank() < other.rank(),
        }
    }

    /// Greatest lower bound.
    pub fn join(self, other: BindingTime) -> BindingTime {
        if self.leq(other) {
            self
        } else if other.leq(self) {
            other
        } else {
            BindingTime::Ambiguous
        }
    }

    /// Folds [`join`](Self::join) over `values`, starting from `Both`.
    pub fn join_all(values: impl IntoIterator<Item = BindingTime>) -> BindingTime {
        values
            .into_iter()
            .fold(BindingTime::Both, BindingTime::join)
    }

    /// Specializes `self` to a stage forced by its context.
    pub fn meet(self, stage: Stage) -> Result<BindingTime, StageMismatch> {
        match (self, stage) {
            (BindingTime::Both, Stage::Meta) => Ok(BindingTime::MetaOnly),
            (BindingTime::Both, Stage::Object) => Ok(BindingTime::ObjectOnly),
            (BindingTime::MetaOnly, Stage::Meta) => Ok(BindingTime::MetaOnly),
            (BindingTime::ObjectOnly, Stage::Object) => Ok(BindingTime::ObjectOnly),
            (BindingTime::MetaOnlyProducingBoth, Stage::Object) => {
                Ok(BindingTime::MetaOnlyProducingBoth)
            }
            (BindingTime::MetaOnlyProducingBoth, Stage::Meta) => Ok(BindingTime::MetaOnly),
            (value, stage) => Err(StageMismatch { value, stage }),
        }
    }

    pub fn is_ambiguous(self) -> bool {
        self == BindingTime::Ambiguous
    }

    /// `MetaOnly` or `ObjectOnly`.
    pub fn is_concrete(self) -> bool {
        matches!(self, BindingTime::MetaOnly | BindingTime::ObjectOnly)
    }

    /// Evaluated by the generator: `MetaOnly` and `MetaOnlyProducingBoth`.
    pub fn is_meta(self) -> bool {
        matches!(
            self,
            BindingTime::MetaOnly | BindingTime::MetaOnlyProducingBoth
        )
    }

    /// The stage a concrete value is bound to.
    pub fn stage(self) -> Option<Stage> {
        match self {
            BindingTime::MetaOnly => Some(Stage::Meta),
            BindingTime::ObjectOnly => Some(Stage::Object),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BindingTime::ObjectOnly => "run-time",
            BindingTime::MetaOnly => "compile-time",
            BindingTime::Both => "run-time-or-compile-time",
            BindingTime::MetaOnlyProducingBoth => "compile-time producing run-time",
            BindingTime::Ambiguous => "ambiguous",
        }
    }
}

impl From<Stage> for BindingTime {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Meta => BindingTime::MetaOnly,
            Stage::Object => BindingTime::ObjectOnly,
        }
    }
}

impl Display for BindingTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use BindingTime::*;

    fn any_binding_time() -> impl Strategy<Value = BindingTime> {
        prop::sample::select(BindingTime::ALL.to_vec())
    }

    #[test]
    fn join_table() {
        assert_eq!(ObjectOnly.join(MetaOnly), Ambiguous);
        assert_eq!(MetaOnlyProducingBoth.join(ObjectOnly), ObjectOnly);
        assert_eq!(MetaOnlyProducingBoth.join(MetaOnly), MetaOnly);
        assert_eq!(Both.join(MetaOnlyProducingBoth), MetaOnlyProducingBoth);
        assert_eq!(Ambiguous.join(Both), Ambiguous);
        for value in BindingTime::ALL {
            assert_eq!(value.join(value), value);
        }
    }

    #[test]
    fn meet_table() {
        assert_eq!(Both.meet(Stage::Meta), Ok(MetaOnly));
        assert_eq!(Both.meet(Stage::Object), Ok(ObjectOnly));
        assert_eq!(
            MetaOnlyProducingBoth.meet(Stage::Object),
            Ok(MetaOnlyProducingBoth)
        );
        assert_eq!(MetaOnlyProducingBoth.meet(Stage::Meta), Ok(MetaOnly));
        assert_eq!(
            MetaOnly.meet(Stage::Object),
            Err(StageMismatch {
                value: MetaOnly,
                stage: Stage::Object
            })
        );
        assert!(ObjectOnly.meet(Stage::Meta).is_err());
        assert!(Ambiguous.meet(Stage::Meta).is_err());
        assert!(Ambiguous.meet(Stage::Object).is_err());
    }

    #[test]
    fn order_has_both_on_top() {
        for value in BindingTime::ALL {
            assert!(value.leq(Both));
            assert!(Ambiguous.leq(value));
        }
        assert!(!ObjectOnly.leq(MetaOnly));
        assert!(MetaOnly.leq(MetaOnlyProducingBoth));
    }

    proptest! {
        #[test]
        fn join_is_commutative(a in any_binding_time(), b in any_binding_time()) {
            prop_assert_eq!(a.join(b), b.join(a));
        }

        #[test]
        fn join_is_associative(
            a in any_binding_time(),
            b in any_binding_time(),
            c in any_binding_time(),
        ) {
            prop_assert_eq!(a.join(b).join(c), a.join(b.join(c)));
        }

        #[test]
        fn ambiguous_absorbs_and_both_is_identity(a in any_binding_time()) {
            prop_assert_eq!(a.join(Ambiguous), Ambiguous);
            prop_assert_eq!(a.join(Both), a);
        }

        #[test]
        fn join_is_a_lower_bound(a in any_binding_time(), b in any_binding_time()) {
            let joined = a.join(b);
            prop_assert!(joined.leq(a));
            prop_assert!(joined.leq(b));
        }
    }
}
