//! Resolution of the GitHub token reference from `config.toml`.
//!
//! - `pass::path/in/store` reads the first line of `pass show path/in/store`
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - anything else is the token itself

use std::process::Command;

/// Resolves a token value that may be a secret reference.
///
/// Surrounding whitespace is trimmed; an empty result is an error.
pub fn resolve(value: &str) -> Result<String, String> {
    let token = if let Some(entry) = value.strip_prefix("pass::") {
        from_pass(entry)?
    } else if let Some(var) = value.strip_prefix("env::") {
        std::env::var(var).map_err(|_| format!("environment variable `{}` is not set", var))?
    } else {
        value.to_string()
    };

    let token = token.trim();
    if token.is_empty() {
        return Err("token is empty".to_string());
    }
    Ok(token.to_string())
}

fn from_pass(entry: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .args(["show", entry])
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", entry, e))?;

    if !output.status.success() {
        return Err(format!(
            "`pass show {}` exited with {}: {}",
            entry,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {}` printed nothing", entry))
}
