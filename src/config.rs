use crate::error::DriverError;
use crate::masking::{format_optional_secret, mask_server};
use crate::stream::{StreamMode, StreamOptions};
use directories::ProjectDirs;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_DATA_SOURCE: &str = "default";
pub const DEFAULT_MAX_CONCURRENCY: usize = 2;

/// Connection and execution settings, resolved once when the driver is built.
#[derive(Debug)]
pub struct DriverConfig {
    pub data_source: String,
    pub server: Option<String>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub max_concurrency: usize,
    pub stream: StreamOptions,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            server: None,
            catalog: None,
            schema: None,
            user: None,
            password: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            stream: StreamOptions::default(),
        }
    }
}

impl DriverConfig {
    /// One-line description that is safe to log unless `show_secrets` is set.
    pub fn summary(&self, show_secrets: bool) -> String {
        let or_unset = |v: &Option<String>| v.clone().unwrap_or_else(|| "(not set)".to_string());
        format!(
            "data_source={} server={} catalog={} schema={} user={} password={} max_concurrency={} stream_mode={:?}",
            self.data_source,
            self.server
                .as_deref()
                .map_or_else(|| "(not set)".to_string(), |s| mask_server(s, show_secrets)),
            or_unset(&self.catalog),
            or_unset(&self.schema),
            or_unset(&self.user),
            format_optional_secret(self.password.as_ref(), show_secrets),
            self.max_concurrency,
            self.stream.mode,
        )
    }
}

/// Explicit settings that win over the environment and the config file.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub data_source: Option<String>,
    pub server: Option<String>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub max_concurrency: Option<usize>,
    pub stream_mode: Option<StreamMode>,
    pub stream_buffer_rows: Option<usize>,
    /// Config file profile; defaults to the data source name.
    pub profile: Option<String>,
    /// Config file path; defaults to `TRINODRIVER_CONFIG`, then the platform config dir.
    pub config_path: Option<PathBuf>,
}

// --- TOML config file structs ---

#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    #[serde(default)]
    defaults: TomlDefaults,
    #[serde(default)]
    profiles: HashMap<String, TomlProfile>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlDefaults {
    max_concurrency: Option<usize>,
    stream_mode: Option<StreamMode>,
    stream_buffer_rows: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
struct TomlProfile {
    server: Option<String>,
    catalog: Option<String>,
    schema: Option<String>,
    user: Option<String>,
    password: Option<String>,
    password_env: Option<String>,
}

/// Config path resolution result: distinguishes explicit vs auto-resolved paths.
struct ResolvedConfigPath {
    path: PathBuf,
    /// true if the caller named the file or TRINODRIVER_CONFIG is set
    explicit: bool,
}

fn resolve_config_path(explicit: Option<&PathBuf>) -> Option<ResolvedConfigPath> {
    if let Some(path) = explicit {
        return Some(ResolvedConfigPath { path: path.clone(), explicit: true });
    }
    if let Some(path) = env_non_empty("TRINODRIVER_CONFIG") {
        return Some(ResolvedConfigPath { path: PathBuf::from(path), explicit: true });
    }
    ProjectDirs::from("", "", "trinodriver").map(|dirs| ResolvedConfigPath {
        path: dirs.config_dir().join("config.toml"),
        explicit: false,
    })
}

fn load_toml_config(resolved: Option<&ResolvedConfigPath>) -> Result<TomlConfig, DriverError> {
    let Some(resolved) = resolved else {
        return Ok(TomlConfig::default());
    };

    if !resolved.path.exists() {
        if resolved.explicit {
            return Err(DriverError::Config {
                message: format!("config file not found: {}", resolved.path.display()),
            });
        }
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&resolved.path).map_err(|e| DriverError::Config {
        message: format!("cannot read config file {}: {}", resolved.path.display(), e),
    })?;

    toml::from_str(&content).map_err(|e| DriverError::Config {
        message: format!("invalid config file {}: {}", resolved.path.display(), e),
    })
}

/// `Some(value)` unless the value is missing or empty.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Read an env var, treating an empty value as unset.
pub fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Name of a connection env var for a data source.
///
/// `default` reads `CUBEJS_<VAR>`; any other data source reads `CUBEJS_DS_<NAME>_<VAR>`.
pub fn env_var_name(data_source: &str, var: &str) -> String {
    if data_source == DEFAULT_DATA_SOURCE {
        format!("CUBEJS_{}", var)
    } else {
        format!("CUBEJS_DS_{}_{}", data_source.to_uppercase(), var)
    }
}

/// First non-empty value among the data source's env vars, in the given order.
fn source_env(data_source: &str, vars: &[&str]) -> Option<String> {
    vars.iter()
        .find_map(|var| env_non_empty(&env_var_name(data_source, var)))
}

/// Resolve the password: explicit value, then env, then the profile's env indirection or value.
fn resolve_password(
    explicit: Option<&str>,
    data_source: &str,
    profile: &TomlProfile,
) -> Option<SecretString> {
    non_empty(explicit)
        .or_else(|| source_env(data_source, &["DB_PASS"]))
        .or_else(|| profile.password_env.as_deref().and_then(env_non_empty))
        .or_else(|| non_empty(profile.password.as_deref()))
        .map(SecretString::from)
}

/// Build a `DriverConfig` from explicit overrides, the environment and the config file.
///
/// Each field takes the first value found in: overrides, environment, config file profile.
pub fn resolve(overrides: &ConfigOverrides) -> Result<DriverConfig, DriverError> {
    let resolved_path = resolve_config_path(overrides.config_path.as_ref());
    let toml_config = load_toml_config(resolved_path.as_ref())?;

    let data_source = non_empty(overrides.data_source.as_deref())
        .unwrap_or_else(|| DEFAULT_DATA_SOURCE.to_string());

    let profile = match &overrides.profile {
        Some(name) => toml_config.profiles.get(name).cloned().ok_or_else(|| DriverError::Config {
            message: format!("profile '{}' not found in config file", name),
        })?,
        None => toml_config.profiles.get(&data_source).cloned().unwrap_or_default(),
    };

    let field = |explicit: &Option<String>, vars: &[&str], from_profile: &Option<String>| {
        non_empty(explicit.as_deref())
            .or_else(|| source_env(&data_source, vars))
            .or_else(|| non_empty(from_profile.as_deref()))
    };

    let server = field(&overrides.server, &["DB_HOST"], &profile.server);
    let catalog = field(
        &overrides.catalog,
        &["DB_TRINO_CATALOG", "DB_CATALOG"],
        &profile.catalog,
    );
    let schema = field(&overrides.schema, &["DB_NAME", "DB_SCHEMA"], &profile.schema);
    let user = field(&overrides.user, &["DB_USER"], &profile.user);
    let password = resolve_password(overrides.password.as_deref(), &data_source, &profile);

    let max_concurrency = overrides
        .max_concurrency
        .or(toml_config.defaults.max_concurrency)
        .unwrap_or(DEFAULT_MAX_CONCURRENCY);
    if max_concurrency == 0 {
        return Err(DriverError::Config {
            message: "max_concurrency must be at least 1".to_string(),
        });
    }

    let defaults = StreamOptions::default();
    let stream = StreamOptions {
        mode: overrides
            .stream_mode
            .or(toml_config.defaults.stream_mode)
            .unwrap_or(defaults.mode),
        buffer_rows: overrides
            .stream_buffer_rows
            .or(toml_config.defaults.stream_buffer_rows)
            .unwrap_or(defaults.buffer_rows),
    };
    if stream.buffer_rows == 0 {
        return Err(DriverError::Config {
            message: "stream_buffer_rows must be at least 1".to_string(),
        });
    }

    Ok(DriverConfig {
        data_source,
        server,
        catalog,
        schema,
        user,
        password,
        max_concurrency,
        stream,
    })
}
