use std::path::Path;

use sp_core::config::EngineConfig;

use crate::inputs::read_text;
use crate::{CliError, Result};

/// Engine configuration for one invocation: the JSON file given with
/// `--config` (or the defaults), then `STAGEPHASE_*` variables, then flags.
pub fn load_engine_config(path: Option<&Path>, strict: bool) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            let text = read_text(path)?;
            let config = EngineConfig::from_json(&text).map_err(|err| {
                CliError::Config(format!("{}: {}", path.display(), err))
            })?;
            tracing::debug!("loaded engine configuration from {}", path.display());
            config
        }
        None => EngineConfig::default(),
    };
    let mut config = config
        .with_env()
        .map_err(|err| CliError::Config(err.to_string()))?;
    if strict {
        config.external_default = EngineConfig::strict().external_default;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_core::BindingTime;
    use std::io::Write;

    #[test]
    fn strict_flag_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_meta_iterations": 5}}"#).unwrap();
        let config = load_engine_config(Some(file.path()), true).unwrap();
        assert_eq!(config.max_meta_iterations, 5);
        assert_eq!(config.external_default, BindingTime::ObjectOnly);
    }

    #[test]
    fn invalid_file_is_a_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_meta_iterations": 0}}"#).unwrap();
        let err = load_engine_config(Some(file.path()), false).unwrap_err();
        assert!(matches!(err, CliError::Config(_)), "{err:?}");
    }
}
