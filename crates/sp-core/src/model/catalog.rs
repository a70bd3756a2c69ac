use itertools::Itertools;

use crate::intrinsics::META_NAMESPACE;
use crate::model::{DeclId, DeclKind, DeclOrigin, Declaration, ParamShape, StageMarker, TypeShape};

/// Declaration entry as written in a JSON declaration file.
///
/// Containers on the dotted `path` that do not exist yet are created as
/// namespaces.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DeclarationSpec {
    pub path: String,
    pub kind: DeclKind,
    #[serde(default)]
    pub marker: Option<StageMarker>,
    #[serde(default)]
    pub returns: TypeShape,
    #[serde(default)]
    pub parameters: Vec<ParamShape>,
    #[serde(default)]
    pub origin: DeclOrigin,
}

/// Flat store of declarations; a declaration's id is its index.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DeclarationCatalog {
    declarations: Vec<Declaration>,
}

impl DeclarationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-populated with the `meta` API: the intrinsics plus the
    /// `IDeclaration`/`IParameter` handle types.
    pub fn with_meta_api() -> Self {
        let mut catalog = Self::new();
        let meta = catalog.add(Declaration::new(0, META_NAMESPACE, DeclKind::Namespace));

        let parameter = catalog.add(
            Declaration::new(0, "IParameter", DeclKind::Type)
                .in_container(meta)
                .with_marker(StageMarker::MetaOnly),
        );
        for member in ["name", "type_name", "index"] {
            catalog.add(
                Declaration::new(0, member, DeclKind::Property)
                    .in_container(parameter)
                    .returning(TypeShape::Scalar),
            );
        }

        let declaration = catalog.add(
            Declaration::new(0, "IDeclaration", DeclKind::Type)
                .in_container(meta)
                .with_marker(StageMarker::MetaOnly),
        );
        for member in ["name", "kind", "parameter_count", "return_type"] {
            catalog.add(
                Declaration::new(0, member, DeclKind::Property)
                    .in_container(declaration)
                    .returning(TypeShape::Scalar),
            );
        }
        catalog.add(
            Declaration::new(0, "parameters", DeclKind::Property)
                .in_container(declaration)
                .returning(TypeShape::sequence(TypeShape::Declared(parameter))),
        );

        catalog.add(Declaration::new(0, "proceed", DeclKind::Method).in_container(meta));
        catalog.add(
            Declaration::new(0, "target", DeclKind::Property)
                .in_container(meta)
                .returning(TypeShape::Declared(declaration)),
        );
        catalog.add(
            Declaration::new(0, "tags", DeclKind::Property)
                .in_container(meta)
                .returning(TypeShape::mapping(TypeShape::Scalar)),
        );
        catalog.add(
            Declaration::new(0, "compile_time", DeclKind::Method)
                .in_container(meta)
                .with_parameter("value", TypeShape::Unknown),
        );
        catalog.add(
            Declaration::new(0, "run_time", DeclKind::Method)
                .in_container(meta)
                .with_parameter("value", TypeShape::Unknown),
        );
        catalog.add(
            Declaration::new(0, "insert_comment", DeclKind::Method)
                .in_container(meta)
                .with_parameter("text", TypeShape::Scalar)
                .returning(TypeShape::Void),
        );
        catalog
    }

    /// Adds a declaration, assigning its id.
    pub fn add(&mut self, mut declaration: Declaration) -> DeclId {
        let id = self.declarations.len() as DeclId;
        declaration.id = id;
        self.declarations.push(declaration);
        id
    }

    pub fn add_spec(&mut self, spec: DeclarationSpec) -> DeclId {
        let mut segments = spec.path.split('.').collect_vec();
        let name = segments.pop().unwrap_or_default().to_string();
        let mut container = None;
        for segment in segments {
            container = Some(match self.member(container, segment) {
                Some(existing) => existing,
                None => {
                    let mut namespace = Declaration::new(0, segment, DeclKind::Namespace);
                    namespace.container = container;
                    namespace.origin = spec.origin;
                    self.add(namespace)
                }
            });
        }
        self.add(Declaration {
            id: 0,
            name,
            kind: spec.kind,
            container,
            marker: spec.marker,
            returns: spec.returns,
            parameters: spec.parameters,
            origin: spec.origin,
        })
    }

    pub fn extend_specs(&mut self, specs: impl IntoIterator<Item = DeclarationSpec>) {
        for spec in specs {
            self.add_spec(spec);
        }
    }

    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        self.declarations.get(id as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Direct member `name` of `container`; `None` looks at the top level.
    pub fn member(&self, container: Option<DeclId>, name: &str) -> Option<DeclId> {
        self.declarations
            .iter()
            .find(|decl| decl.container == container && decl.name == name)
            .map(|decl| decl.id)
    }

    pub fn members(&self, container: DeclId) -> impl Iterator<Item = &Declaration> {
        self.declarations
            .iter()
            .filter(move |decl| decl.container == Some(container))
    }

    /// Looks up a dotted path such as `meta.target`.
    pub fn lookup(&self, path: &str) -> Option<DeclId> {
        path.split('.')
            .try_fold(None, |container, segment| {
                self.member(container, segment).map(Some)
            })
            .flatten()
    }

    /// Container chain joined with `.`.
    pub fn qualified_name(&self, id: DeclId) -> Option<String> {
        qualified_name(id, |id| self.get(id))
    }
}

/// Qualified name of `id` through any declaration lookup.
pub fn qualified_name<'a>(
    id: DeclId,
    lookup: impl Fn(DeclId) -> Option<&'a Declaration>,
) -> Option<String> {
    let mut segments = Vec::new();
    let mut current = Some(id);
    while let Some(id) = current {
        let decl = lookup(id)?;
        segments.push(decl.name.as_str());
        current = decl.container;
        if segments.len() > 64 {
            // cyclic containment
            return None;
        }
    }
    Some(segments.iter().rev().join("."))
}
