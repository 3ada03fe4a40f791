use serde::Deserialize;
use serde_json::Value;
use std::{env, fs, path::Path, path::PathBuf, sync::Arc};

use crate::error::{WorkflowError, WorkflowResult};
use crate::hosterrors::{DEFAULT_MAX_HOST_ERRORS, HostErrorsCache};
use crate::workflow::WorkflowOptions;

/// Template threads used when nothing is configured.
pub const DEFAULT_TEMPLATE_THREADS: usize = 25;

/// Default `tracing` filter directive.
pub const DEFAULT_LOG_FILTER: &str = "scanflow=info";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Concurrent template nodes per workflow run.
    pub template_threads: usize,
    /// Errors after which a host is skipped.
    pub host_max_errors: u32,
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_threads: DEFAULT_TEMPLATE_THREADS,
            host_max_errors: DEFAULT_MAX_HOST_ERRORS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config, expanding `${VAR}` in every string value first.
    pub fn from_json_str(raw: &str) -> WorkflowResult<Self> {
        let mut value: Value = serde_json::from_str(raw)?;
        expand_env_in_strings(&mut value);
        Ok(serde_json::from_value(value)?)
    }

    pub fn load_from(path: &Path) -> WorkflowResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            WorkflowError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    /// Load from the resolved config path, or defaults when there is none.
    pub fn load() -> WorkflowResult<Self> {
        match resolve_config_path() {
            Some(path) => {
                tracing::debug!("Loading engine config from {}", path.display());
                Self::load_from(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Run-wide workflow options backed by a fresh host error cache.
    pub fn workflow_options(&self) -> WorkflowOptions {
        WorkflowOptions::default()
            .with_template_threads(self.template_threads)
            .with_failure_cache(Arc::new(HostErrorsCache::new(self.host_max_errors)))
    }
}

/// `SCANFLOW_CONFIG`, then `$XDG_CONFIG_HOME/scanflow/config.json`, then
/// `./scanflow.json`.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var("SCANFLOW_CONFIG") {
        return Some(PathBuf::from(p));
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let candidate = PathBuf::from(xdg).join("scanflow").join("config.json");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let candidate = PathBuf::from("scanflow.json");
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

fn expand_env_in_strings(value: &mut Value) {
    match value {
        Value::String(text) => {
            if text.contains("${") {
                *text = expand_env_vars(text);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(expand_env_in_strings),
        Value::Object(fields) => fields.values_mut().for_each(expand_env_in_strings),
        _ => {}
    }
}

/// Replace each `${NAME}` with the value of `NAME`. Unset variables and an
/// unterminated `${` are kept as written.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        rest = &rest[open..];
        let Some(close) = rest.find('}') else {
            break;
        };
        match env::var(&rest[2..close]) {
            Ok(val) => out.push_str(&val),
            Err(_) => out.push_str(&rest[..=close]),
        }
        rest = &rest[close + 1..];
    }

    out.push_str(rest);
    out
}
