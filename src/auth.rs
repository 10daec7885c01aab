use std::path::PathBuf;

use crate::config::{config_dir, Config};
use crate::error::{Result, StarboardError};

/// Resolve an API token, trying in order:
/// 1. The configured environment variable
/// 2. A token stored under `~/.config/starboard/token`
/// 3. The configured CLI command (persisting its output for next time)
pub fn resolve_token(config: &Config) -> Result<String> {
    if let Ok(token) = std::env::var(&config.token_env) {
        if !token.is_empty() {
            return Ok(token);
        }
    }

    if let Some(token) = load_stored_token() {
        return Ok(token);
    }

    if let Some(cmd) = &config.token_command {
        if let Some(token) = try_cli_token(cmd) {
            if let Err(e) = save_token(&token) {
                tracing::warn!(error = %e, "could not persist token");
            }
            return Ok(token);
        }
    }

    Err(StarboardError::Auth(format!(
        "no token found; set {} or configure token_command",
        config.token_env
    )))
}

/// Run a CLI command and capture stdout as a token
fn try_cli_token(command: &str) -> Option<String> {
    let output = std::process::Command::new("sh")
        .args(["-c", command])
        .output()
        .ok()?;

    if output.status.success() {
        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !token.is_empty() {
            return Some(token);
        }
    }
    None
}

fn token_path() -> Option<PathBuf> {
    Some(config_dir()?.join("token"))
}

fn load_stored_token() -> Option<String> {
    let path = token_path()?;
    let token = std::fs::read_to_string(path).ok()?;
    let token = token.trim().to_string();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn save_token(token: &str) -> std::io::Result<()> {
    if let Some(path) = token_path() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, token)?;
    }
    Ok(())
}
