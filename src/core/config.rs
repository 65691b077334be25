/// Stack configuration
///
/// `StackConfig` is the explicit configuration object handed to every
/// coordinator. It names all the paths a run touches, so nothing depends on
/// the process working directory. `EnvFile` handles reading and writing the
/// deployment's .env file.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::constants::{
    DEFAULT_BACKUP_DIR, DEFAULT_CERTS_DIR, DEFAULT_COMPOSE_FILE, DEFAULT_DATA_DIR,
    DEFAULT_ENV_FILE, DEFAULT_ENV_TEMPLATE, DEFAULT_KEEP_COUNT, KEEP_COUNT_KEY,
    REQUIRED_ENV_KEYS,
};
use crate::utils::{get_project_root, is_valid_domain, is_valid_email};

#[derive(Debug, Clone)]
pub struct StackConfig {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub certs_dir: PathBuf,
    pub env_file: PathBuf,
    pub env_template: PathBuf,
    pub compose_file: PathBuf,
    pub keep_count: usize,
}

impl StackConfig {
    /// Resolve the project root and build the configuration from it
    pub fn discover() -> Result<Self> {
        Ok(Self::at(get_project_root()?))
    }

    /// Build the configuration for a known project root. Directory locations
    /// can be overridden through FLOWSTACK_* environment variables.
    pub fn at(root: PathBuf) -> Self {
        let override_or = |var: &str, default: PathBuf| -> PathBuf {
            std::env::var(var).map(PathBuf::from).unwrap_or(default)
        };

        let data_dir = override_or("FLOWSTACK_DATA_DIR", root.join(DEFAULT_DATA_DIR));
        let backup_dir = override_or("FLOWSTACK_BACKUP_DIR", root.join(DEFAULT_BACKUP_DIR));
        let certs_dir = override_or("FLOWSTACK_CERTS_DIR", root.join(DEFAULT_CERTS_DIR));
        let env_file = root.join(DEFAULT_ENV_FILE);
        let env_template = root.join(DEFAULT_ENV_TEMPLATE);
        let compose_file = root.join(DEFAULT_COMPOSE_FILE);
        let keep_count = keep_count_for(&env_file);

        Self {
            root,
            data_dir,
            backup_dir,
            certs_dir,
            env_file,
            env_template,
            compose_file,
            keep_count,
        }
    }

    /// Compose project name, derived from the root directory name the same
    /// way docker compose derives it
    pub fn project_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "flowstack".to_string())
    }
}

/// Retention keep-count: environment variable wins, then the .env file,
/// then the default.
fn keep_count_for(env_file: &Path) -> usize {
    if let Ok(value) = std::env::var(KEEP_COUNT_KEY) {
        if let Ok(n) = value.parse() {
            return n;
        }
    }

    if env_file.exists() {
        if let Ok(env) = EnvFile::load(env_file) {
            if let Some(value) = env.get(KEEP_COUNT_KEY) {
                if let Ok(n) = value.parse() {
                    return n;
                }
            }
        }
    }

    DEFAULT_KEEP_COUNT
}

#[derive(Debug, Clone)]
pub struct EnvValue {
    pub key: String,
    pub value: String,
    pub comment: Option<String>,
}

/// Reader/writer for the deployment's .env file. Comments and line order are
/// preserved on save.
pub struct EnvFile {
    path: PathBuf,
    values: HashMap<String, EnvValue>,
}

impl EnvFile {
    /// Load configuration from a .env file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(anyhow!("environment file not found at {}", path.display()));
        }

        let content = fs::read_to_string(&path).context("Failed to read environment file")?;

        let mut values = HashMap::new();
        let mut current_comment = None;

        for line in content.lines() {
            let line = line.trim();

            if line.starts_with('#') {
                current_comment = Some(line.trim_start_matches('#').trim().to_string());
                continue;
            }

            if line.is_empty() {
                current_comment = None;
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim().to_string();
                let value = value.trim().to_string();

                values.insert(
                    key.clone(),
                    EnvValue {
                        key,
                        value,
                        comment: current_comment.take(),
                    },
                );
            }
        }

        Ok(Self { path, values })
    }

    /// Save configuration back, preserving comments and ordering of the
    /// original file
    pub fn save(&self) -> Result<()> {
        let mut lines = Vec::new();

        let original = fs::read_to_string(&self.path)?;
        for line in original.lines() {
            let trimmed = line.trim();

            if trimmed.starts_with('#') || trimmed.is_empty() {
                lines.push(line.to_string());
            } else if let Some((key, _)) = trimmed.split_once('=') {
                let key = key.trim();
                if let Some(value) = self.values.get(key) {
                    lines.push(format!("{}={}", key, value.value));
                } else {
                    lines.push(line.to_string());
                }
            }
        }

        fs::write(&self.path, lines.join("\n")).context("Failed to write environment file")?;

        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.value.as_str())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        if let Some(existing) = self.values.get_mut(&key) {
            existing.value = value;
        } else {
            self.values.insert(
                key.clone(),
                EnvValue {
                    key,
                    value,
                    comment: None,
                },
            );
        }
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Validate the active configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for key in REQUIRED_ENV_KEYS {
            if self.get(key).is_none() {
                errors.push(format!("{} is not set", key));
            }
        }

        if let Some(domain) = self.get("DOMAIN") {
            if !is_valid_domain(domain) {
                errors.push(format!("Invalid domain: {}", domain));
            }
        }

        if let Some(email) = self.get("ACME_EMAIL") {
            if !is_valid_email(email) {
                errors.push(format!("Invalid email: {}", email));
            }
        }

        errors
    }

    /// Keys present in the template but absent here. Used by the update
    /// drift check, advisory only.
    pub fn missing_from(&self, template: &EnvFile) -> Vec<String> {
        let mut missing: Vec<String> = template
            .values
            .keys()
            .filter(|k| !self.values.contains_key(*k))
            .cloned()
            .collect();
        missing.sort();
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_env_file_round_trip() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# FlowStack deployment").unwrap();
        writeln!(file, "DOMAIN=flows.example.com").unwrap();
        writeln!(file, "ACME_EMAIL=ops@example.com").unwrap();

        let mut env = EnvFile::load(file.path()).unwrap();
        assert_eq!(env.get("DOMAIN"), Some("flows.example.com"));
        assert!(env.validate().is_empty());

        env.set("DOMAIN", "other.example.com");
        env.save().unwrap();

        let reloaded = EnvFile::load(file.path()).unwrap();
        assert_eq!(reloaded.get("DOMAIN"), Some("other.example.com"));
        assert_eq!(reloaded.get("ACME_EMAIL"), Some("ops@example.com"));
    }

    #[test]
    fn test_validate_reports_missing_and_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "DOMAIN=notadomain").unwrap();

        let env = EnvFile::load(file.path()).unwrap();
        let errors = env.validate();
        assert!(errors.iter().any(|e| e.contains("ACME_EMAIL")));
        assert!(errors.iter().any(|e| e.contains("Invalid domain")));
    }

    #[test]
    fn test_missing_from_template() {
        let mut active = NamedTempFile::new().unwrap();
        writeln!(active, "DOMAIN=flows.example.com").unwrap();

        let mut template = NamedTempFile::new().unwrap();
        writeln!(template, "DOMAIN=example.com").unwrap();
        writeln!(template, "ACME_EMAIL=me@example.com").unwrap();
        writeln!(template, "TZ=UTC").unwrap();

        let active = EnvFile::load(active.path()).unwrap();
        let template = EnvFile::load(template.path()).unwrap();
        assert_eq!(active.missing_from(&template), vec!["ACME_EMAIL", "TZ"]);
    }

    #[test]
    fn test_stack_config_defaults() {
        let root = PathBuf::from("/opt/flowstack");
        let config = StackConfig::at(root.clone());
        assert_eq!(config.compose_file, root.join("docker-compose.yml"));
        assert_eq!(config.env_file, root.join(".env"));
        assert_eq!(config.keep_count, DEFAULT_KEEP_COUNT);
        assert_eq!(config.project_name(), "flowstack");
    }
}
