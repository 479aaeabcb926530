use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::CliError;

const MASK: &str = "********";

/// Process environment overlaid with the contents of a `.env` file.
#[derive(Debug, Clone)]
pub struct EnvManager {
    vars: HashMap<String, String>,
    sensitive_patterns: Vec<String>,
}

impl EnvManager {
    pub fn new() -> Self {
        Self {
            vars: std::env::vars().collect(),
            sensitive_patterns: Self::default_sensitive_patterns(),
        }
    }

    /// Load variables from a .env file. Values from the file win over the
    /// process environment.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::EnvFile(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        self.parse_env_content(&content)?;
        Ok(())
    }

    pub fn all(&self) -> &HashMap<String, String> {
        &self.vars
    }

    pub fn is_sensitive(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.sensitive_patterns
            .iter()
            .any(|pattern| key.contains(pattern.as_str()))
    }

    /// The value of `key` safe for printing, `None` when unset.
    pub fn masked(&self, key: &str) -> Option<String> {
        let value = self.vars.get(key)?;
        if self.is_sensitive(key) && !value.is_empty() {
            Some(MASK.to_string())
        } else {
            Some(value.clone())
        }
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), CliError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Shell-style `export KEY=VALUE` is accepted too.
            let line = line.strip_prefix("export ").unwrap_or(line);

            if let Some(eq_pos) = line.find('=') {
                let key = line[..eq_pos].trim();
                let value = line[eq_pos + 1..].trim();

                if key.is_empty() {
                    return Err(CliError::EnvFile(format!(
                        "empty key at line {}",
                        line_num + 1
                    )));
                }

                self.vars.insert(key.to_string(), Self::unquote_value(value));
            } else {
                return Err(CliError::EnvFile(format!(
                    "malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            }
        }

        Ok(())
    }

    fn unquote_value(value: &str) -> String {
        let value = value.trim();

        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            return value[1..value.len() - 1].to_string();
        }

        value.to_string()
    }

    fn default_sensitive_patterns() -> Vec<String> {
        ["pass", "secret", "token", "key", "auth", "credential", "private"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

impl Default for EnvManager {
    fn default() -> Self {
        Self::new()
    }
}
