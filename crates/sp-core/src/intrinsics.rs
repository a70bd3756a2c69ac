//! Intrinsic descriptors.
//!
//! Intrinsics are ordinary declarations of the `meta` API whose binding time
//! is fixed regardless of markers or containment. The catalog maps their
//! qualified symbols to an [`IntrinsicKind`] and can be extended with
//! configured symbols.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::binding::BindingTime;

pub const META_NAMESPACE: &str = "meta";

common_enum! {
    #[derive(Eq, Hash)]
    pub enum IntrinsicKind {
        /// Splice of the next layer's body.
        Proceed,
        /// Handle to the declaration being woven.
        Target,
        /// String-keyed weave-site tags.
        Tags,
        /// Forces its argument to the compile-time stage.
        CompileTime,
        /// Embeds a compile-time value into the generated code.
        RunTime,
        /// Emits a comment before the next generated statement.
        InsertComment,
        /// Configured symbol with a fixed classification.
        Extension(String),
    }
}

common_enum! {
    /// Syntactic position where an intrinsic may appear.
    #[derive(Copy, Eq, Hash, Default)]
    pub enum IntrinsicUsage {
        /// Read as a value, e.g. `meta.target`.
        Value,
        /// Invoked, e.g. `meta.run_time(x)`.
        #[default]
        Call,
        /// Invoked as an expression statement only.
        Statement,
    }
}

common_struct! {
    pub struct IntrinsicSpec {
        pub kind: IntrinsicKind,
        pub symbol: String,
        pub binding: BindingTime,
        pub usage: IntrinsicUsage,
        /// Exact argument count, `None` when unchecked
        #[serde(default)]
        pub arity: Option<usize>,
    }
}

common_struct! {
    /// Extra intrinsic as written in the engine configuration.
    pub struct ExtensionIntrinsic {
        pub symbol: String,
        pub binding: BindingTime,
        #[serde(default)]
        pub usage: IntrinsicUsage,
        #[serde(default)]
        pub arity: Option<usize>,
    }
}

impl From<ExtensionIntrinsic> for IntrinsicSpec {
    fn from(ext: ExtensionIntrinsic) -> Self {
        IntrinsicSpec {
            kind: IntrinsicKind::Extension(ext.symbol.clone()),
            symbol: ext.symbol,
            binding: ext.binding,
            usage: ext.usage,
            arity: ext.arity,
        }
    }
}

fn standard(
    kind: IntrinsicKind,
    member: &str,
    binding: BindingTime,
    usage: IntrinsicUsage,
    arity: Option<usize>,
) -> IntrinsicSpec {
    IntrinsicSpec {
        kind,
        symbol: format!("{}.{}", META_NAMESPACE, member),
        binding,
        usage,
        arity,
    }
}

static STANDARD_SPECS: LazyLock<Vec<IntrinsicSpec>> = LazyLock::new(|| {
    vec![
        standard(
            IntrinsicKind::Proceed,
            "proceed",
            BindingTime::MetaOnlyProducingBoth,
            IntrinsicUsage::Call,
            Some(0),
        ),
        standard(
            IntrinsicKind::Target,
            "target",
            BindingTime::MetaOnly,
            IntrinsicUsage::Value,
            None,
        ),
        standard(
            IntrinsicKind::Tags,
            "tags",
            BindingTime::MetaOnly,
            IntrinsicUsage::Value,
            None,
        ),
        standard(
            IntrinsicKind::CompileTime,
            "compile_time",
            BindingTime::MetaOnly,
            IntrinsicUsage::Call,
            Some(1),
        ),
        standard(
            IntrinsicKind::RunTime,
            "run_time",
            BindingTime::ObjectOnly,
            IntrinsicUsage::Call,
            Some(1),
        ),
        standard(
            IntrinsicKind::InsertComment,
            "insert_comment",
            BindingTime::MetaOnly,
            IntrinsicUsage::Statement,
            Some(1),
        ),
    ]
});

pub fn standard_specs() -> &'static [IntrinsicSpec] {
    &STANDARD_SPECS
}

/// Configured set of intrinsic symbols, keyed by qualified name.
#[derive(Debug, Clone, PartialEq)]
pub struct IntrinsicCatalog {
    specs: Vec<IntrinsicSpec>,
    by_symbol: HashMap<String, usize>,
}

impl Default for IntrinsicCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl IntrinsicCatalog {
    pub fn empty() -> Self {
        Self {
            specs: Vec::new(),
            by_symbol: HashMap::new(),
        }
    }

    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        for spec in standard_specs() {
            catalog.register(spec.clone());
        }
        catalog
    }

    /// Adds or replaces the spec for `spec.symbol`.
    pub fn register(&mut self, spec: IntrinsicSpec) {
        match self.by_symbol.get(&spec.symbol) {
            Some(&index) => self.specs[index] = spec,
            None => {
                self.by_symbol.insert(spec.symbol.clone(), self.specs.len());
                self.specs.push(spec);
            }
        }
    }

    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = ExtensionIntrinsic>) -> Self {
        for ext in extensions {
            self.register(ext.into());
        }
        self
    }

    pub fn lookup(&self, symbol: &str) -> Option<&IntrinsicSpec> {
        self.by_symbol.get(symbol).map(|&index| &self.specs[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &IntrinsicSpec> {
        self.specs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_classifications() {
        let catalog = IntrinsicCatalog::standard();
        let proceed = catalog.lookup("meta.proceed").expect("proceed");
        assert_eq!(proceed.binding, BindingTime::MetaOnlyProducingBoth);
        assert_eq!(
            catalog.lookup("meta.run_time").map(|spec| spec.binding),
            Some(BindingTime::ObjectOnly)
        );
        assert_eq!(catalog.iter().count(), 6);
    }

    #[test]
    fn extensions_replace_by_symbol() {
        let catalog = IntrinsicCatalog::standard().with_extensions([
            ExtensionIntrinsic {
                symbol: "meta.now".to_string(),
                binding: BindingTime::MetaOnly,
                usage: IntrinsicUsage::Call,
                arity: Some(0),
            },
            ExtensionIntrinsic {
                symbol: "meta.now".to_string(),
                binding: BindingTime::ObjectOnly,
                usage: IntrinsicUsage::Call,
                arity: Some(0),
            },
        ]);
        let now = catalog.lookup("meta.now").expect("now");
        assert_eq!(now.binding, BindingTime::ObjectOnly);
        assert_eq!(now.kind, IntrinsicKind::Extension("meta.now".to_string()));
        assert_eq!(catalog.iter().count(), 7);
    }
}
