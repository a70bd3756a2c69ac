//! Semantic oracle consumed by the classifier.
//!
//! The classifier never computes symbol or type information on its own; a
//! front end supplies it through [`SemanticModel`].

use crate::ast::{LocalId, NodeId};
use crate::binding::BindingTime;

mod catalog;
mod shape;

pub use catalog::*;
pub use shape::shape_of;

pub type DeclId = u32;

common_enum! {
    #[derive(Copy, Eq, Hash)]
    pub enum DeclKind {
        Namespace,
        Type,
        Method,
        Property,
        Field,
    }
}

impl DeclKind {
    /// Namespaces and types may contain other declarations.
    pub fn is_container(&self) -> bool {
        matches!(self, DeclKind::Namespace | DeclKind::Type)
    }
}

common_enum! {
    /// Explicit binding-time attribute written on a declaration.
    #[derive(Copy, Eq, Hash)]
    pub enum StageMarker {
        MetaOnly,
        ObjectOnly,
        Both,
    }
}

impl StageMarker {
    pub fn binding_time(&self) -> BindingTime {
        match self {
            StageMarker::MetaOnly => BindingTime::MetaOnly,
            StageMarker::ObjectOnly => BindingTime::ObjectOnly,
            StageMarker::Both => BindingTime::Both,
        }
    }
}

common_enum! {
    #[derive(Copy, Eq, Hash, Default)]
    pub enum DeclOrigin {
        /// Declared in analyzable source.
        #[default]
        Source,
        /// Imported from a compiled dependency.
        External,
    }
}

common_enum! {
    /// Static shape of a value, as far as liftability is concerned.
    #[derive(Eq, Hash, Default)]
    pub enum TypeShape {
        /// Numbers, booleans, strings and null.
        Scalar,
        /// An instance of a declared type, e.g. the meta API's declaration handle.
        Declared(DeclId),
        Sequence(Box<TypeShape>),
        /// String-keyed mapping.
        Mapping(Box<TypeShape>),
        Void,
        #[default]
        Unknown,
    }
}

impl TypeShape {
    pub fn sequence(element: TypeShape) -> Self {
        TypeShape::Sequence(Box::new(element))
    }

    pub fn mapping(value: TypeShape) -> Self {
        TypeShape::Mapping(Box::new(value))
    }

    /// Whether a compile-time value of this shape can be embedded in the
    /// generated program as a literal.
    pub fn is_liftable(&self) -> bool {
        match self {
            TypeShape::Scalar | TypeShape::Unknown => true,
            TypeShape::Sequence(element) => element.is_liftable(),
            TypeShape::Declared(_) | TypeShape::Mapping(_) | TypeShape::Void => false,
        }
    }

    /// Element shape produced by indexing or iterating.
    pub fn element(&self) -> TypeShape {
        match self {
            TypeShape::Sequence(element) | TypeShape::Mapping(element) => (**element).clone(),
            // indexing a string yields a string
            TypeShape::Scalar => TypeShape::Scalar,
            _ => TypeShape::Unknown,
        }
    }
}

common_struct! {
    pub struct ParamShape {
        pub name: String,
        #[serde(default)]
        pub shape: TypeShape,
    }
}

common_struct! {
    pub struct Declaration {
        pub id: DeclId,
        pub name: String,
        pub kind: DeclKind,
        #[serde(default)]
        pub container: Option<DeclId>,
        #[serde(default)]
        pub marker: Option<StageMarker>,
        /// Value shape of a property/field, or the return shape of a method
        #[serde(default)]
        pub returns: TypeShape,
        #[serde(default)]
        pub parameters: Vec<ParamShape>,
        #[serde(default)]
        pub origin: DeclOrigin,
    }
}

impl Declaration {
    pub fn new(id: DeclId, name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            container: None,
            marker: None,
            returns: TypeShape::Unknown,
            parameters: Vec::new(),
            origin: DeclOrigin::Source,
        }
    }

    pub fn in_container(mut self, container: DeclId) -> Self {
        self.container = Some(container);
        self
    }

    pub fn with_marker(mut self, marker: StageMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn returning(mut self, shape: TypeShape) -> Self {
        self.returns = shape;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, shape: TypeShape) -> Self {
        self.parameters.push(ParamShape {
            name: name.into(),
            shape,
        });
        self
    }

    pub fn external(mut self) -> Self {
        self.origin = DeclOrigin::External;
        self
    }
}

common_enum! {
    /// What a name in the template refers to.
    #[derive(Copy, Eq, Hash)]
    pub enum SymbolRef {
        Local(LocalId),
        Declaration(DeclId),
        Unresolved,
    }
}

/// Symbol and type oracle for one template.
pub trait SemanticModel {
    /// Resolves an identifier or member node.
    fn resolve(&self, node: NodeId) -> SymbolRef;

    fn declaration(&self, id: DeclId) -> Option<&Declaration>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liftable_shapes() {
        assert!(TypeShape::Scalar.is_liftable());
        assert!(TypeShape::Unknown.is_liftable());
        assert!(TypeShape::sequence(TypeShape::sequence(TypeShape::Scalar)).is_liftable());
        assert!(!TypeShape::sequence(TypeShape::Declared(3)).is_liftable());
        assert!(!TypeShape::Declared(3).is_liftable());
        assert!(!TypeShape::mapping(TypeShape::Scalar).is_liftable());
        assert!(!TypeShape::Void.is_liftable());
    }
}
