use thiserror::Error;

pub const ENV_PREFIX: &str = "QUILL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration, set the environment variable {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// The environment variable that sets a dotted settings path, e.g. `provider.api_key`
pub fn to_env_var(field_path: &str) -> String {
    let path = field_path
        .split('.')
        .filter(|part| !part.is_empty())
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("__");
    format!("{}_{}", ENV_PREFIX, path)
}
