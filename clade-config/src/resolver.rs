//! Layered configuration loading.
//!
//! A resolver holds an optional base document path; each call may supply
//! an overlay document. The overlay wins at every conflicting leaf. A
//! missing or corrupt base degrades to an empty tree with a warning;
//! overlay problems are always fatal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use clade_core::{ConfigError, ValidationError};

use crate::expand::expand_tree;
use crate::merge::deep_merge;
use crate::server::{RawServerConfig, ServerConfig};

/// Loads and resolves layered JSON configuration documents.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    base_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(base_path: Option<PathBuf>) -> Self {
        Self { base_path }
    }

    /// Load the base document (if any), merge the overlay on top, and
    /// substitute environment variables through the merged tree.
    ///
    /// No per-server validation happens here; the returned tree is raw
    /// merged configuration data.
    pub fn load(&self, overlay_path: Option<&Path>) -> Result<Value, ConfigError> {
        let mut result = Value::Object(Map::new());

        if let Some(base) = &self.base_path {
            if base.exists() {
                match load_json_file(base) {
                    Ok(value) => {
                        tracing::debug!(path = %base.display(), "loaded base config");
                        result = value;
                    }
                    Err(err) => {
                        // Overlay alone is a complete input, so a broken base
                        // degrades to an empty tree instead of aborting.
                        tracing::warn!(path = %base.display(), error = %err, "failed to load base config");
                    }
                }
            } else {
                tracing::debug!(path = %base.display(), "base config not present");
            }
        }

        if let Some(overlay) = overlay_path {
            let overlay_value = load_json_file(overlay)?;
            tracing::debug!(path = %overlay.display(), "merged overlay config");
            result = deep_merge(&result, &overlay_value);
        }

        Ok(expand_tree(&result))
    }

    /// Resolve the `"servers"` section into validated records.
    ///
    /// Entries without a `host` field default it to their map key. The
    /// first invalid entry aborts the whole call; a partial mapping is
    /// never returned.
    pub fn load_server_configs(
        &self,
        overlay_path: Option<&Path>,
    ) -> Result<BTreeMap<String, ServerConfig>, ConfigError> {
        let config = self.load(overlay_path)?;

        let servers = match config.get("servers") {
            None => return Err(ConfigError::MissingServers),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(ConfigError::ServersNotObject),
        };

        let mut out = BTreeMap::new();
        for (name, entry) in servers {
            let mut raw: RawServerConfig =
                serde_json::from_value(entry.clone()).map_err(|err| {
                    ConfigError::InvalidServer {
                        server: name.clone(),
                        source: ValidationError::InvalidValue {
                            field: format!("servers.{}", name),
                            reason: err.to_string(),
                        },
                    }
                })?;

            if raw.host.is_none() {
                raw.host = Some(name.clone());
            }

            let server =
                ServerConfig::from_raw(raw).map_err(|source| ConfigError::InvalidServer {
                    server: name.clone(),
                    source,
                })?;
            tracing::debug!(server = %name, "loaded server config");
            out.insert(name.clone(), server);
        }

        Ok(out)
    }
}

fn load_json_file(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}
