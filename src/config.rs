use std::path::PathBuf;

use serde::Deserialize;

/// Settings loaded from `~/.config/starboard/config.toml`. Everything has a
/// working default; the file is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Environment variable consulted first for the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Shell command run as a last resort to produce a token.
    #[serde(default = "default_token_command")]
    pub token_command: Option<String>,
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_token_command() -> Option<String> {
    Some("gh auth token".to_string())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            token_command: default_token_command(),
        }
    }
}

pub fn config_dir() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("starboard"))
}

fn config_path() -> Option<PathBuf> {
    Some(config_dir()?.join("config.toml"))
}

impl Config {
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Config::default();
        };

        let Ok(content) = std::fs::read_to_string(&path) else {
            return Config::default();
        };

        match toml::from_str::<Config>(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed config file");
                Config::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
token_env = "GH_TOKEN"
token_command = "pass show github/token"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.token_env, "GH_TOKEN");
        assert_eq!(
            config.token_command.as_deref(),
            Some("pass show github/token")
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.token_env, "GITHUB_TOKEN");
        assert_eq!(config.token_command.as_deref(), Some("gh auth token"));
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: Config = toml::from_str(r#"token_env = "MY_TOKEN""#).unwrap();
        assert_eq!(config.token_env, "MY_TOKEN");
        assert_eq!(config.token_command.as_deref(), Some("gh auth token"));
    }
}
