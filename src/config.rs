//! Server configuration taken from the client's initialization options

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::Url;

use crate::error::ConfigError;

/// Environment variable consulted when the client does not name a metadata file
pub const METADATA_ENV: &str = "MAGIC_METADATA";

/// File looked up in the workspace root as a last resort
pub const DEFAULT_METADATA_FILE: &str = "metadata.json";

const DEFAULT_TAB_SIZE: usize = 4;

/// Options understood by the server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Location of the metadata JSON, absolute or relative to the workspace root
    pub metadata_path: Option<PathBuf>,
    /// Width of a tab character when comparing indentation
    pub tab_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            metadata_path: None,
            tab_size: DEFAULT_TAB_SIZE,
        }
    }
}

impl ServerConfig {
    /// Parse `initializationOptions`; a missing value means defaults
    pub fn from_initialization_options(options: Option<JsonValue>) -> Result<Self, ConfigError> {
        match options {
            None | Some(JsonValue::Null) => Ok(Self::default()),
            Some(value) => serde_json::from_value(value).map_err(ConfigError::InvalidOptions),
        }
    }

    /// Work out which metadata file to load.
    ///
    /// Order: explicit option, then the `MAGIC_METADATA` environment variable,
    /// then `metadata.json` in the workspace root. Relative paths are joined
    /// onto the workspace root when one is known.
    pub fn resolve_metadata_path(&self, root: Option<&Url>) -> Option<PathBuf> {
        let root_dir = root.and_then(|url| url.to_file_path().ok());

        let configured = self
            .metadata_path
            .clone()
            .or_else(|| std::env::var_os(METADATA_ENV).map(PathBuf::from));

        match (configured, root_dir) {
            (Some(path), Some(dir)) if path.is_relative() => Some(dir.join(path)),
            (Some(path), _) => Some(path),
            (None, Some(dir)) => Some(dir.join(DEFAULT_METADATA_FILE)),
            (None, None) => None,
        }
    }

    /// Tab width, never zero
    pub fn tab_size(&self) -> usize {
        self.tab_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_without_options() {
        let config = ServerConfig::from_initialization_options(None).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.tab_size(), 4);
    }

    #[test]
    fn test_camel_case_options() {
        let config = ServerConfig::from_initialization_options(Some(json!({
            "metadataPath": "meta/spells.json",
            "tabSize": 2
        })))
        .unwrap();
        assert_eq!(config.metadata_path, Some(PathBuf::from("meta/spells.json")));
        assert_eq!(config.tab_size(), 2);
    }

    #[test]
    fn test_invalid_options() {
        let result = ServerConfig::from_initialization_options(Some(json!({ "tabSize": "wide" })));
        assert!(matches!(result, Err(ConfigError::InvalidOptions(_))));
    }

    #[test]
    fn test_relative_path_joins_workspace_root() {
        let config = ServerConfig {
            metadata_path: Some(PathBuf::from("meta.json")),
            tab_size: 4,
        };
        let root = Url::parse("file:///workspace/spells").unwrap();
        assert_eq!(
            config.resolve_metadata_path(Some(&root)),
            Some(PathBuf::from("/workspace/spells/meta.json"))
        );
    }

    #[test]
    fn test_absolute_path_is_kept() {
        let config = ServerConfig {
            metadata_path: Some(PathBuf::from("/opt/magic/meta.json")),
            tab_size: 4,
        };
        let root = Url::parse("file:///workspace").unwrap();
        assert_eq!(
            config.resolve_metadata_path(Some(&root)),
            Some(PathBuf::from("/opt/magic/meta.json"))
        );
    }
}
