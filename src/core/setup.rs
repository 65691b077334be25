/// One-time host bootstrap
///
/// Verifies the container engine, prepares the directory layout and the
/// shared docker network, and seeds the environment file from its template.
/// Everything after the engine check is best-effort provisioning.

use anyhow::{Context, Result};
use std::fs;
use std::process::{Command, Stdio};

use crate::core::config::StackConfig;
use crate::core::docker::ComposeManager;
use crate::core::error::StackError;
use crate::utils::constants::DOCKER_NETWORK;
use crate::utils::{self, advisory};

pub struct SetupCoordinator<'a> {
    config: &'a StackConfig,
}

impl<'a> SetupCoordinator<'a> {
    pub fn new(config: &'a StackConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        self.check_engine()?;
        self.ensure_directories()?;

        match self.seed_env_file() {
            Ok(true) => utils::ok(format!(
                "Created {} from template, review it before starting services",
                self.config.env_file.display()
            )),
            Ok(false) => utils::info(format!("{} already present", self.config.env_file.display())),
            Err(e) => advisory(&mut warnings, format!("Could not seed .env: {:#}", e)),
        }

        self.ensure_network(&mut warnings);
        self.configure_firewall(&mut warnings);

        utils::info("");
        utils::info("Next steps:");
        utils::info(format!("  1. Review {}", self.config.env_file.display()));
        utils::info("  2. Start the stack: docker compose up -d");
        utils::info("  3. Check it: flowstack-cli status");

        Ok(warnings)
    }

    fn check_engine(&self) -> Result<()> {
        let docker_ok = Command::new("docker")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);

        if !docker_ok {
            return Err(StackError::Environment(
                "docker (see https://docs.docker.com/engine/install/)".to_string(),
            )
            .into());
        }

        ComposeManager::cli_available()?;
        utils::ok("Container engine available");
        Ok(())
    }

    pub(crate) fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config.data_dir,
            &self.config.backup_dir,
            &self.config.certs_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        utils::ok("Directory layout ready");
        Ok(())
    }

    /// Copy .env.example to .env when no .env exists yet. Returns whether a
    /// file was created.
    pub(crate) fn seed_env_file(&self) -> Result<bool> {
        if self.config.env_file.exists() {
            return Ok(false);
        }

        if !self.config.env_template.exists() {
            anyhow::bail!(
                "neither {} nor {} exists",
                self.config.env_file.display(),
                self.config.env_template.display()
            );
        }

        fs::copy(&self.config.env_template, &self.config.env_file)
            .context("Failed to copy environment template")?;
        Ok(true)
    }

    fn ensure_network(&self, warnings: &mut Vec<String>) {
        let exists = Command::new("docker")
            .args(["network", "inspect", DOCKER_NETWORK])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);

        if exists {
            utils::info(format!("Docker network '{}' already exists", DOCKER_NETWORK));
            return;
        }

        match Command::new("docker")
            .args(["network", "create", DOCKER_NETWORK])
            .output()
        {
            Ok(output) if output.status.success() => {
                utils::ok(format!("Created docker network '{}'", DOCKER_NETWORK))
            }
            Ok(output) => advisory(
                warnings,
                format!(
                    "Could not create docker network '{}': {}",
                    DOCKER_NETWORK,
                    String::from_utf8_lossy(&output.stderr)
                ),
            ),
            Err(e) => advisory(
                warnings,
                format!("Could not create docker network '{}': {}", DOCKER_NETWORK, e),
            ),
        }
    }

    /// Open HTTP/HTTPS when ufw is present. Purely best-effort; hosts
    /// without ufw are skipped silently.
    fn configure_firewall(&self, warnings: &mut Vec<String>) {
        let ufw_present = Command::new("ufw")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);

        if !ufw_present {
            return;
        }

        for rule in ["80/tcp", "443/tcp"] {
            match Command::new("ufw").args(["allow", rule]).output() {
                Ok(output) if output.status.success() => {
                    utils::ok(format!("Firewall rule added: allow {}", rule))
                }
                _ => advisory(warnings, format!("Could not add firewall rule: allow {}", rule)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn test_config(root: &Path) -> StackConfig {
        StackConfig {
            root: root.to_path_buf(),
            data_dir: root.join("data"),
            backup_dir: root.join("backups"),
            certs_dir: root.join("certs"),
            env_file: root.join(".env"),
            env_template: root.join(".env.example"),
            compose_file: root.join("docker-compose.yml"),
            keep_count: 7,
        }
    }

    #[test]
    fn test_ensure_directories() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());

        SetupCoordinator::new(&config).ensure_directories().unwrap();
        assert!(config.data_dir.is_dir());
        assert!(config.backup_dir.is_dir());
        assert!(config.certs_dir.is_dir());
    }

    #[test]
    fn test_seed_env_file() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        fs::write(&config.env_template, "DOMAIN=example.com\n").unwrap();

        let setup = SetupCoordinator::new(&config);
        assert!(setup.seed_env_file().unwrap());
        assert_eq!(
            fs::read_to_string(&config.env_file).unwrap(),
            "DOMAIN=example.com\n"
        );

        // A second run must not overwrite the active file
        fs::write(&config.env_file, "DOMAIN=changed.example.com\n").unwrap();
        assert!(!setup.seed_env_file().unwrap());
        assert_eq!(
            fs::read_to_string(&config.env_file).unwrap(),
            "DOMAIN=changed.example.com\n"
        );
    }

    #[test]
    fn test_seed_env_file_without_template_fails() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        assert!(SetupCoordinator::new(&config).seed_env_file().is_err());
    }
}
