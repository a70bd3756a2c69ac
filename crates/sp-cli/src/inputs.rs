//! Input files: template sources, declaration catalogs and weave sites.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sp_core::ast::print::Formatting;
use sp_core::ast::Template;
use sp_core::model::{DeclarationCatalog, DeclarationSpec};
use sp_expand::{ProceedBody, TargetDeclaration, Value, WeaveSiteContext};

use crate::{CliError, Result};

pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn invalid(path: &Path, message: impl ToString) -> CliError {
    CliError::InvalidInput {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

pub fn load_template(path: &Path) -> Result<Template> {
    sp_lang::parse_template(&read_text(path)?).map_err(|err| invalid(path, err))
}

/// The `meta` API plus the declarations listed in `path`, if any.
pub fn load_catalog(path: Option<&Path>) -> Result<DeclarationCatalog> {
    let mut catalog = DeclarationCatalog::with_meta_api();
    if let Some(path) = path {
        let specs: Vec<DeclarationSpec> =
            serde_json::from_str(&read_text(path)?).map_err(|err| invalid(path, err))?;
        tracing::debug!("{} declarations from {}", specs.len(), path.display());
        catalog.extend_specs(specs);
    }
    Ok(catalog)
}

/// Weave site as written in a JSON site file.
///
/// `proceed` is template source: a `{ ... }` block, or an expression for
/// expression-bodied members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteFile {
    pub target: TargetDeclaration,
    #[serde(default)]
    pub tags: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub arguments: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub proceed: Option<String>,
    #[serde(default)]
    pub formatting: Option<Formatting>,
    #[serde(default)]
    pub globals: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub aspect: Option<String>,
}

impl SiteFile {
    pub fn load(path: &Path) -> Result<Self> {
        serde_json::from_str(&read_text(path)?).map_err(|err| invalid(path, err))
    }

    /// Builds the context; `formatting` applies when the site has none.
    pub fn into_context(self, origin: &Path, formatting: Formatting) -> Result<WeaveSiteContext> {
        let mut site = WeaveSiteContext::new(self.target)
            .with_formatting(self.formatting.unwrap_or(formatting));
        site.tags = convert(self.tags);
        site.arguments = convert(self.arguments);
        site.globals = convert(self.globals);
        site.aspect = self.aspect;
        if let Some(source) = self.proceed {
            site = site.with_proceed(parse_proceed(&source).map_err(|err| invalid(origin, err))?);
        }
        Ok(site)
    }
}

fn convert(values: BTreeMap<String, serde_json::Value>) -> BTreeMap<String, Value> {
    values
        .into_iter()
        .map(|(key, value)| (key, Value::from_json(value)))
        .collect()
}

fn parse_proceed(source: &str) -> sp_core::Result<ProceedBody> {
    if source.trim_start().starts_with('{') {
        sp_lang::parse_block(source).map(ProceedBody::Block)
    } else {
        sp_lang::parse_expr(source).map(ProceedBody::Expr)
    }
}

/// Display name of an input file for diagnostics.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_file_converts_values_and_proceed() {
        let site: SiteFile = serde_json::from_str(
            r#"{
                "target": {"name": "transfer", "parameters": [{"name": "from"}]},
                "tags": {"audit": "ledger", "level": 2},
                "arguments": {"strict": true},
                "proceed": "a + 1"
            }"#,
        )
        .unwrap();
        let context = site
            .into_context(Path::new("site.json"), Formatting::default())
            .unwrap();
        assert_eq!(context.target.kind, "method");
        assert_eq!(context.tags["level"], Value::Int(2));
        assert_eq!(context.arguments["strict"], Value::Bool(true));
        assert!(matches!(context.proceed, Some(ProceedBody::Expr(_))));
    }

    #[test]
    fn malformed_proceed_names_the_site_file() {
        let site: SiteFile =
            serde_json::from_str(r#"{"target": {"name": "m"}, "proceed": "{ return"}"#).unwrap();
        let err = site
            .into_context(Path::new("broken.json"), Formatting::default())
            .unwrap_err();
        assert!(err.to_string().contains("broken.json"), "{err}");
    }
}
