use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::ActionSpec;
use crate::error::{HrflowError, Result};
use crate::types::default_workflow_name;

/// Top-level hrflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Name given to newly created workflow documents.
    #[serde(default = "default_workflow_name")]
    pub name: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            name: default_workflow_name(),
        }
    }
}

/// Pacing of the simulation runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Pause before the first step, in milliseconds.
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
    /// Pause after each step, in milliseconds.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: default_start_delay_ms(),
            step_delay_ms: default_step_delay_ms(),
        }
    }
}

impl SimulatorConfig {
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

fn default_start_delay_ms() -> u64 {
    1000
}

fn default_step_delay_ms() -> u64 {
    200
}

/// Extra or overriding action catalog entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Start from the stock HR actions (default: true).
    #[serde(default = "default_include_builtins")]
    pub include_builtins: bool,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            include_builtins: default_include_builtins(),
            actions: vec![],
        }
    }
}

fn default_include_builtins() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
}

impl AppConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| HrflowError::ConfigNotFound(path.display().to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse config text, expanding `${ENV_VAR}` references first.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| HrflowError::Config(e.to_string()))
    }

    /// Default per-user config location (`~/.hrflow/config.toml`).
    pub fn user_config_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".hrflow").join("config.toml"))
    }
}

/// Replace each `${NAME}` with the value of environment variable `NAME`.
/// Unset variables and an unterminated `${` are left as written.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        rest = &rest[open..];
        let Some(close) = rest.find('}') else {
            break;
        };
        match std::env::var(&rest[2..close]) {
            Ok(value) => out.push_str(&value),
            Err(_) => out.push_str(&rest[..=close]),
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.workflow.name, "HR Workflow");
        assert_eq!(config.simulator.start_delay(), Duration::from_millis(1000));
        assert_eq!(config.simulator.step_delay(), Duration::from_millis(200));
        assert!(config.catalog.include_builtins);
        assert!(config.log.filter.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_toml_str(
            r#"
[simulator]
step_delay_ms = 0

[[catalog.actions]]
id = "order_badge"
label = "Order Badge"
params = ["employee_id", "site"]
"#,
        )
        .unwrap();
        assert_eq!(config.simulator.start_delay_ms, 1000);
        assert_eq!(config.simulator.step_delay_ms, 0);
        assert_eq!(config.catalog.actions.len(), 1);
        assert_eq!(config.catalog.actions[0].params, vec!["employee_id", "site"]);
        assert_eq!(config.catalog.actions[0].description, "");
    }

    #[test]
    fn test_invalid_toml() {
        let err = AppConfig::from_toml_str("[simulator\nstep_delay_ms = 1").unwrap_err();
        assert!(matches!(err, HrflowError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load(Path::new("/definitely/not/here/hrflow.toml")).unwrap_err();
        assert!(matches!(err, HrflowError::ConfigNotFound(_)));
    }

    #[test]
    fn test_expand_env_vars_substitutes() {
        std::env::set_var("HRFLOW_CONFIG_TEST_ROLE", "people-ops");
        assert_eq!(
            expand_env_vars("role = \"${HRFLOW_CONFIG_TEST_ROLE}\" # ${HRFLOW_CONFIG_TEST_ROLE}"),
            "role = \"people-ops\" # people-ops"
        );
        std::env::remove_var("HRFLOW_CONFIG_TEST_ROLE");
    }

    #[test]
    fn test_expand_env_vars_unterminated() {
        assert_eq!(expand_env_vars("cost = \"$5\" ${OPEN"), "cost = \"$5\" ${OPEN");
    }

    #[test]
    fn test_expand_env_vars_keeps_unset() {
        assert_eq!(
            expand_env_vars("name = \"${HRFLOW_SURELY_UNSET_VAR}\""),
            "name = \"${HRFLOW_SURELY_UNSET_VAR}\""
        );
    }
}
