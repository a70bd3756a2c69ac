use crate::binding::BindingTime;
use crate::intrinsics::{ExtensionIntrinsic, IntrinsicCatalog};
use crate::pretty::PrettyOptions;

pub const STRICT_EXTERNAL_ENV: &str = "STAGEPHASE_STRICT_EXTERNAL";
pub const MAX_META_ITERATIONS_ENV: &str = "STAGEPHASE_MAX_META_ITERATIONS";
pub const REPORT_HIDDEN_ENV: &str = "STAGEPHASE_REPORT_HIDDEN";

fn env_true(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|val| {
        let trimmed = val.trim();
        !trimmed.is_empty() && !matches!(trimmed, "0" | "false" | "FALSE" | "False")
    })
}

/// Engine-wide settings shared by analysis and expansion.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Classification of external declarations without analyzable origin and
    /// of unresolved references.
    pub external_default: BindingTime,
    /// Upper bound on iterations of any single compile-time loop.
    pub max_meta_iterations: usize,
    /// Keep hidden diagnostics in compilation reports.
    pub report_hidden: bool,
    pub intrinsics: Vec<ExtensionIntrinsic>,
    pub pretty: PrettyOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            external_default: BindingTime::Both,
            max_meta_iterations: 10_000,
            report_hidden: false,
            intrinsics: Vec::new(),
            pretty: PrettyOptions::default(),
        }
    }
}

impl EngineConfig {
    /// External declarations classify as run-time only.
    pub fn strict() -> Self {
        Self {
            external_default: BindingTime::ObjectOnly,
            ..Self::default()
        }
    }

    /// Overlays `STAGEPHASE_*` environment variables on `self`.
    pub fn with_env(mut self) -> crate::Result<Self> {
        if let Some(strict) = env_true(STRICT_EXTERNAL_ENV) {
            self.external_default = if strict {
                BindingTime::ObjectOnly
            } else {
                BindingTime::Both
            };
        }
        if let Ok(raw) = std::env::var(MAX_META_ITERATIONS_ENV) {
            self.max_meta_iterations = raw.trim().parse().map_err(|_| {
                crate::Error::configuration(format!(
                    "{} must be a non-negative integer, got {:?}",
                    MAX_META_ITERATIONS_ENV, raw
                ))
            })?;
        }
        if let Some(report) = env_true(REPORT_HIDDEN_ENV) {
            self.report_hidden = report;
        }
        Ok(self)
    }

    pub fn from_env() -> crate::Result<Self> {
        Self::default().with_env()
    }

    pub fn from_json(text: &str) -> crate::Result<Self> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.external_default.is_ambiguous() {
            return Err(crate::Error::configuration(
                "external_default cannot be ambiguous",
            ));
        }
        if self.max_meta_iterations == 0 {
            return Err(crate::Error::configuration(
                "max_meta_iterations must be positive",
            ));
        }
        Ok(())
    }

    pub fn intrinsic_catalog(&self) -> IntrinsicCatalog {
        IntrinsicCatalog::standard().with_extensions(self.intrinsics.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fields_default() {
        let config = EngineConfig::from_json(r#"{"external_default": "ObjectOnly"}"#)
            .expect("config");
        assert_eq!(config.external_default, BindingTime::ObjectOnly);
        assert_eq!(config.max_meta_iterations, 10_000);
        assert_eq!(config.pretty.indent_size, 4);
    }

    #[test]
    fn rejects_ambiguous_default() {
        let err = EngineConfig::from_json(r#"{"external_default": "Ambiguous"}"#).unwrap_err();
        assert!(matches!(err, crate::Error::Configuration(_)));
    }
}
