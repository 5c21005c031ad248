use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Values starting with this character name an environment variable to substitute
pub const ENV_MARKER: char = '$';

/// How to launch one stdio system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: IndexMap<String, String>,
}

impl SystemConfig {
    pub fn new<S: Into<String>>(command: S) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: IndexMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Substitute `$NAME` args and env values from the process environment
    pub fn resolve(&self) -> SystemConfig {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Substitute `$NAME` args and env values using `lookup`
    pub fn resolve_with<F>(&self, lookup: F) -> SystemConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        SystemConfig {
            command: self.command.clone(),
            args: self
                .args
                .iter()
                .map(|arg| substitute_env(arg, &lookup))
                .collect(),
            env: self
                .env
                .iter()
                .map(|(key, value)| (key.clone(), substitute_env(value, &lookup)))
                .collect(),
        }
    }
}

/// Replace a `$NAME` value with the variable's value; anything unresolved passes through verbatim
pub fn substitute_env<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match value.strip_prefix(ENV_MARKER) {
        Some(name) if !name.is_empty() => lookup(name).unwrap_or_else(|| value.to_string()),
        _ => value.to_string(),
    }
}

/// The systems file: `{ "mcpServers": { "<name>": { "command": .., "args": [..], "env": {..} } } }`
///
/// Entry order is kept, and is the order the systems are registered in. An entry
/// that does not describe a launchable system lands in `invalid` with the reason,
/// leaving the rest of the file usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSystemsConfig")]
pub struct SystemsConfig {
    #[serde(rename = "mcpServers")]
    pub systems: IndexMap<String, SystemConfig>,
    #[serde(skip_serializing)]
    pub invalid: IndexMap<String, String>,
}

#[derive(Deserialize)]
struct RawSystemsConfig {
    #[serde(rename = "mcpServers", alias = "systems", default)]
    systems: IndexMap<String, Value>,
}

impl From<RawSystemsConfig> for SystemsConfig {
    fn from(raw: RawSystemsConfig) -> Self {
        let mut config = SystemsConfig::default();
        for (name, entry) in raw.systems {
            match serde_json::from_value::<SystemConfig>(entry) {
                Ok(system) => {
                    config.systems.insert(name, system);
                }
                Err(err) => {
                    tracing::warn!(system = %name, error = %err, "invalid system entry");
                    config.invalid.insert(name, err.to_string());
                }
            }
        }
        config
    }
}

impl SystemsConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parsing systems configuration")
    }

    /// Load the systems file; a missing file means no systems
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "no systems file, starting without tools");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading systems file {}", path.display()))?;
        Self::from_json(&contents)
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty() && self.invalid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::env;
    use std::io::Write;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_substitutes_env_values() {
        let config = SystemConfig::new("search-server").with_env("API_KEY", "$SECRET");
        let resolved = config.resolve_with(lookup_from(&[("SECRET", "abc")]));

        assert_eq!(resolved.env["API_KEY"], "abc");
    }

    #[test]
    fn test_unset_variable_stays_literal() {
        let config = SystemConfig::new("search-server").with_env("API_KEY", "$SECRET");
        let resolved = config.resolve_with(lookup_from(&[]));

        assert_eq!(resolved.env["API_KEY"], "$SECRET");
    }

    #[test]
    fn test_substitutes_args_but_not_command() {
        let config = SystemConfig::new("$TOOL_BIN").with_args(["--root", "$ROOT", "plain", "$"]);
        let resolved =
            config.resolve_with(lookup_from(&[("ROOT", "/srv/data"), ("TOOL_BIN", "/bin/x")]));

        assert_eq!(resolved.command, "$TOOL_BIN");
        assert_eq!(resolved.args, vec!["--root", "/srv/data", "plain", "$"]);
    }

    #[test]
    #[serial]
    fn test_resolve_reads_process_environment() {
        env::set_var("QUILL_TEST_SECRET", "abc");
        env::remove_var("QUILL_TEST_MISSING");

        let config = SystemConfig::new("server")
            .with_env("API_KEY", "$QUILL_TEST_SECRET")
            .with_env("OTHER", "$QUILL_TEST_MISSING");
        let resolved = config.resolve();

        assert_eq!(resolved.env["API_KEY"], "abc");
        assert_eq!(resolved.env["OTHER"], "$QUILL_TEST_MISSING");

        env::remove_var("QUILL_TEST_SECRET");
    }

    #[test]
    fn test_parse_keeps_entry_order() -> Result<()> {
        let config = SystemsConfig::from_json(
            r#"{
                "mcpServers": {
                    "zeta": { "command": "zeta-server" },
                    "alpha": { "command": "npx", "args": ["-y", "alpha"], "env": { "TOKEN": "$ALPHA_TOKEN" } }
                }
            }"#,
        )?;

        let names: Vec<&str> = config.systems.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(config.systems["alpha"].args, vec!["-y", "alpha"]);
        assert!(config.systems["zeta"].env.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_missing_file_is_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = SystemsConfig::load(dir.path().join("systems.json"))?;
        assert!(config.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{"systems": {{"echo": {{"command": "echo-server"}}}}}}"#)?;

        let config = SystemsConfig::load(file.path())?;
        assert_eq!(config.systems["echo"].command, "echo-server");
        Ok(())
    }

    #[test]
    fn test_bad_entry_does_not_spoil_the_file() -> Result<()> {
        let config = SystemsConfig::from_json(
            r#"{
                "mcpServers": {
                    "good": { "command": "echo-server" },
                    "no_command": { "args": ["x"] },
                    "bad_args": { "command": "search-server", "args": "--verbose" },
                    "after": { "command": "after-server" }
                }
            }"#,
        )?;

        let names: Vec<&str> = config.systems.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["good", "after"]);
        let invalid: Vec<&str> = config.invalid.keys().map(String::as_str).collect();
        assert_eq!(invalid, vec!["no_command", "bad_args"]);
        assert!(config.invalid["no_command"].contains("command"));
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_still_an_error() {
        assert!(SystemsConfig::from_json(r#"{"mcpServers": ["not", "a", "map"]}"#).is_err());
        assert!(SystemsConfig::from_json("{").is_err());
    }
}
