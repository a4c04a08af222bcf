//! Validated per-server configuration records.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use clade_core::ValidationError;

use crate::expand::expand_str;

/// Default port when a server entry omits one.
pub const DEFAULT_PORT: u16 = 8080;

/// Unvalidated server entry as it appears in a configuration document.
///
/// Use [`ServerConfig::from_raw`] (or serde, which routes through it) to
/// obtain a validated record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawServerConfig {
    pub host: Option<String>,
    pub port: Option<i64>,
    pub server_path: Option<String>,
    pub config_path: Option<String>,
    pub working_dir: Option<String>,
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
}

impl RawServerConfig {
    pub fn new(host: impl Into<String>, server_path: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            server_path: Some(server_path.into()),
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: i64) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }
}

/// Validated configuration for one named server process.
///
/// Fully validated at construction: paths are expanded, absolute,
/// symlink-resolved and checked against the filesystem, and the port is
/// range-checked. Immutable afterwards; no partially-valid instance is
/// ever observable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawServerConfig")]
pub struct ServerConfig {
    host: String,
    port: u16,
    server_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    working_dir: Option<PathBuf>,
    env_vars: BTreeMap<String, String>,
}

impl ServerConfig {
    /// Validate a raw entry into a server record.
    pub fn from_raw(raw: RawServerConfig) -> Result<Self, ValidationError> {
        let host = raw
            .host
            .ok_or_else(|| ValidationError::RequiredFieldMissing {
                field: "host".to_string(),
            })?;
        if host.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "host".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        let port = match raw.port {
            None => DEFAULT_PORT,
            Some(p) if (1..=i64::from(u16::MAX)).contains(&p) => p as u16,
            Some(p) => {
                return Err(ValidationError::InvalidValue {
                    field: "port".to_string(),
                    reason: format!("{} is outside 1-65535", p),
                })
            }
        };

        let server_path_raw =
            raw.server_path
                .ok_or_else(|| ValidationError::RequiredFieldMissing {
                    field: "server_path".to_string(),
                })?;
        let server_path = validate_server_path(&server_path_raw)?;

        let config_path = raw
            .config_path
            .as_deref()
            .map(validate_config_path)
            .transpose()?;
        let working_dir = raw
            .working_dir
            .as_deref()
            .map(validate_working_dir)
            .transpose()?;

        Ok(Self {
            host,
            port,
            server_path,
            config_path,
            working_dir,
            env_vars: raw.env_vars,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn server_path(&self) -> &Path {
        &self.server_path
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn env_vars(&self) -> &BTreeMap<String, String> {
        &self.env_vars
    }
}

impl TryFrom<RawServerConfig> for ServerConfig {
    type Error = ValidationError;

    fn try_from(raw: RawServerConfig) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

/// Expand env vars and require an absolute path.
fn resolve_absolute(field: &str, raw: &str) -> Result<PathBuf, ValidationError> {
    let path = PathBuf::from(expand_str(raw));
    if !path.is_absolute() {
        return Err(ValidationError::NotAbsolute {
            field: field.to_string(),
            path,
        });
    }
    Ok(path)
}

/// `server_path` must point at an existing executable. Symlinks are
/// resolved first, so a link to a valid executable passes.
fn validate_server_path(raw: &str) -> Result<PathBuf, ValidationError> {
    let path = resolve_absolute("server_path", raw)?;
    let resolved = path
        .canonicalize()
        .map_err(|_| ValidationError::ServerNotFound { path: path.clone() })?;
    if !resolved.is_file() {
        return Err(ValidationError::ServerNotFound { path: resolved });
    }
    if !is_executable(&resolved) {
        return Err(ValidationError::NotExecutable { path: resolved });
    }
    Ok(resolved)
}

/// `config_path` must exist; no executability requirement.
fn validate_config_path(raw: &str) -> Result<PathBuf, ValidationError> {
    let path = resolve_absolute("config_path", raw)?;
    let resolved = path
        .canonicalize()
        .map_err(|_| ValidationError::ConfigFileNotFound { path: path.clone() })?;
    if !resolved.is_file() {
        return Err(ValidationError::ConfigFileNotFound { path: resolved });
    }
    Ok(resolved)
}

/// `working_dir` must exist and be a directory.
fn validate_working_dir(raw: &str) -> Result<PathBuf, ValidationError> {
    let path = resolve_absolute("working_dir", raw)?;
    let resolved = path
        .canonicalize()
        .map_err(|_| ValidationError::WorkingDirNotFound { path: path.clone() })?;
    if !resolved.is_dir() {
        return Err(ValidationError::WorkingDirNotFound { path: resolved });
    }
    Ok(resolved)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn temp_server(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("server");
        fs::write(&path, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        make_executable(&path);
        path
    }

    #[test]
    fn test_valid_server_config() {
        let dir = TempDir::new().unwrap();
        let server = temp_server(&dir);
        let config_file = dir.path().join("config.json");
        fs::write(&config_file, "{}").unwrap();

        let config = ServerConfig::from_raw(
            RawServerConfig::new("localhost", server.to_str().unwrap())
                .with_port(8080)
                .with_config_path(config_file.to_str().unwrap())
                .with_working_dir(dir.path().to_str().unwrap())
                .with_env_var("DEBUG", "1"),
        )
        .unwrap();

        assert_eq!(config.host(), "localhost");
        assert_eq!(config.port(), 8080);
        assert_eq!(config.server_path(), server.canonicalize().unwrap());
        assert_eq!(
            config.config_path().unwrap(),
            config_file.canonicalize().unwrap()
        );
        assert_eq!(
            config.working_dir().unwrap(),
            dir.path().canonicalize().unwrap()
        );
        assert_eq!(config.env_vars().get("DEBUG").unwrap(), "1");
    }

    #[test]
    fn test_default_values() {
        let dir = TempDir::new().unwrap();
        let server = temp_server(&dir);

        let config =
            ServerConfig::from_raw(RawServerConfig::new("localhost", server.to_str().unwrap()))
                .unwrap();

        assert_eq!(config.port(), DEFAULT_PORT);
        assert!(config.config_path().is_none());
        assert!(config.working_dir().is_none());
        assert!(config.env_vars().is_empty());
    }

    #[test]
    fn test_nonexistent_server_path() {
        let err = ServerConfig::from_raw(RawServerConfig::new(
            "localhost",
            "/nonexistent/path/to/server",
        ))
        .unwrap_err();
        assert!(format!("{}", err).contains("not found"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_server_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no_exec");
        fs::write(&path, "data").unwrap();
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let err =
            ServerConfig::from_raw(RawServerConfig::new("localhost", path.to_str().unwrap()))
                .unwrap_err();
        assert!(format!("{}", err).contains("not executable"));
    }

    #[test]
    fn test_relative_server_path_rejected() {
        let err = ServerConfig::from_raw(RawServerConfig::new("localhost", "relative/server"))
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotAbsolute { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_resolution() {
        let dir = TempDir::new().unwrap();
        let server = temp_server(&dir);
        let link = dir.path().join("server_link");
        std::os::unix::fs::symlink(&server, &link).unwrap();

        let config =
            ServerConfig::from_raw(RawServerConfig::new("localhost", link.to_str().unwrap()))
                .unwrap();
        assert_eq!(config.server_path(), server.canonicalize().unwrap());
    }

    #[test]
    fn test_nonexistent_config_path() {
        let dir = TempDir::new().unwrap();
        let server = temp_server(&dir);

        let err = ServerConfig::from_raw(
            RawServerConfig::new("localhost", server.to_str().unwrap())
                .with_config_path("/nonexistent/config.json"),
        )
        .unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("Config file not found"));
    }

    #[test]
    fn test_nonexistent_working_dir() {
        let dir = TempDir::new().unwrap();
        let server = temp_server(&dir);

        let err = ServerConfig::from_raw(
            RawServerConfig::new("localhost", server.to_str().unwrap())
                .with_working_dir("/nonexistent/dir"),
        )
        .unwrap_err();
        assert!(format!("{}", err).contains("does not exist"));
    }

    #[test]
    fn test_working_dir_pointing_at_file() {
        let dir = TempDir::new().unwrap();
        let server = temp_server(&dir);

        let err = ServerConfig::from_raw(
            RawServerConfig::new("localhost", server.to_str().unwrap())
                .with_working_dir(server.to_str().unwrap()),
        )
        .unwrap_err();
        assert!(format!("{}", err).contains("does not exist"));
    }

    #[test]
    fn test_port_out_of_range() {
        let dir = TempDir::new().unwrap();
        let server = temp_server(&dir);

        for port in [0, -1, 65536, 1_000_000] {
            let err = ServerConfig::from_raw(
                RawServerConfig::new("localhost", server.to_str().unwrap()).with_port(port),
            )
            .unwrap_err();
            assert!(
                matches!(&err, ValidationError::InvalidValue { field, .. } if field == "port"),
                "port {} should be rejected, got {:?}",
                port,
                err
            );
        }
    }

    #[test]
    fn test_missing_host() {
        let raw = RawServerConfig {
            server_path: Some("/bin/sh".to_string()),
            ..Default::default()
        };
        let err = ServerConfig::from_raw(raw).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::RequiredFieldMissing { field } if field == "host"
        ));
    }

    #[test]
    fn test_missing_server_path() {
        let raw = RawServerConfig {
            host: Some("localhost".to_string()),
            ..Default::default()
        };
        let err = ServerConfig::from_raw(raw).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::RequiredFieldMissing { field } if field == "server_path"
        ));
    }

    #[test]
    fn test_env_var_expansion_in_path() {
        let dir = TempDir::new().unwrap();
        let server = temp_server(&dir);
        std::env::set_var("CLADE_TEST_SERVER_PATH", server.to_str().unwrap());

        let config = ServerConfig::from_raw(RawServerConfig::new(
            "localhost",
            "${CLADE_TEST_SERVER_PATH}",
        ))
        .unwrap();
        assert_eq!(config.server_path(), server.canonicalize().unwrap());
    }

    #[test]
    fn test_serialization_round_trip() {
        let dir = TempDir::new().unwrap();
        let server = temp_server(&dir);

        let config = ServerConfig::from_raw(
            RawServerConfig::new("localhost", server.to_str().unwrap())
                .with_port(9090)
                .with_working_dir(dir.path().to_str().unwrap())
                .with_env_var("PATH", "/usr/local/bin:/usr/bin")
                .with_env_var("SPECIAL", "value with spaces"),
        )
        .unwrap();

        let encoded = serde_json::to_string(&config).unwrap();
        // paths serialize as plain text
        assert!(encoded.contains(server.canonicalize().unwrap().to_str().unwrap()));
        assert!(encoded.contains("localhost"));
        assert!(encoded.contains("9090"));

        let decoded: ServerConfig = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, config);
    }
}
