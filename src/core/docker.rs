/// Docker and Docker Compose integration
///
/// Manages the FlowStack containers and docker-compose operations

use anyhow::{anyhow, Context, Result};
use bollard::container::ListContainersOptions;
use bollard::models::ContainerSummary;
use bollard::Docker;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::core::config::StackConfig;
use crate::core::error::StackError;
use crate::utils::ContainerState;

/// The compose operations the coordinators depend on.
///
/// Behind a trait so coordinator runs can be exercised in tests without a
/// Docker daemon.
#[cfg_attr(test, mockall::automock)]
pub trait Orchestrator {
    /// Verify the compose CLI is installed and functional
    fn ensure_available(&self) -> Result<()>;

    /// Plain-text service status snapshot (docker compose ps)
    fn ps(&self) -> Result<String>;

    fn is_service_running(&self, service: &str) -> Result<bool>;

    fn up(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;

    fn pull(&self) -> Result<()>;

    /// Run a fixed command inside a service container, capturing stdout
    fn exec(&self, service: &str, cmd: &'static [&'static str]) -> Result<String>;

    /// Run a fixed command inside a service container, feeding `input` on stdin
    fn exec_with_input(
        &self,
        service: &str,
        cmd: &'static [&'static str],
        input: &str,
    ) -> Result<String>;

    fn prune_dangling_images(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    pub state: ContainerState,
    pub health: Option<String>,
}

pub struct ComposeManager {
    docker: Docker,
    project_root: PathBuf,
    compose_file: PathBuf,
    project: String,
}

impl ComposeManager {
    pub fn new(config: &StackConfig) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .context("Failed to connect to Docker daemon. Is Docker running?")?;

        if !config.compose_file.exists() {
            return Err(StackError::NotFound(config.compose_file.clone()).into());
        }

        Ok(Self {
            docker,
            project_root: config.root.clone(),
            compose_file: config.compose_file.clone(),
            project: config.project_name(),
        })
    }

    /// Check that `docker compose version` works
    pub fn cli_available() -> Result<()> {
        let output = Command::new("docker")
            .args(["compose", "version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(StackError::Environment("docker compose".to_string()).into()),
        }
    }

    /// List the deployment's containers through the Docker API
    pub async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        let mut filters = HashMap::new();
        filters.insert(
            "label".to_string(),
            vec![format!("com.docker.compose.project={}", self.project)],
        );

        let options = Some(ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        });

        let containers = self.docker.list_containers(options).await?;

        Ok(containers
            .into_iter()
            .map(Self::container_summary_to_info)
            .collect())
    }

    /// Get logs for a service
    pub fn get_logs(&self, service: &str, tail: Option<usize>) -> Result<String> {
        let mut args = vec!["logs".to_string()];
        if let Some(n) = tail {
            args.push("--tail".to_string());
            args.push(n.to_string());
        }
        args.push(service.to_string());

        let args: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        self.compose_command(&args)
    }

    /// Execute a docker compose command in the project root
    fn compose_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("docker");
        cmd.arg("compose")
            .args(args)
            .current_dir(&self.project_root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = cmd
            .output()
            .context("Failed to execute docker compose command")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Docker compose command failed: {}", stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Service image references from docker-compose.yml
    pub fn compose_images(&self) -> Result<HashMap<String, String>> {
        let content = std::fs::read_to_string(&self.compose_file)
            .context("Failed to read docker-compose.yml")?;
        parse_compose_images(&content)
    }

    /// Convert ContainerSummary to ContainerInfo
    fn container_summary_to_info(summary: ContainerSummary) -> ContainerInfo {
        let name = summary
            .names
            .as_ref()
            .and_then(|names| names.first())
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let status = summary.status.clone().unwrap_or_else(|| "unknown".to_string());
        let state = summary
            .state
            .as_ref()
            .map(|s| s.as_str())
            .unwrap_or("unknown")
            .into();

        // Check unhealthy BEFORE healthy (unhealthy contains "healthy" as substring)
        let health = summary.status.as_ref().and_then(|s| {
            if s.contains("unhealthy") {
                Some("unhealthy".to_string())
            } else if s.contains("starting") {
                Some("starting".to_string())
            } else if s.contains("healthy") {
                Some("healthy".to_string())
            } else {
                None
            }
        });

        ContainerInfo {
            id: summary.id.unwrap_or_default(),
            name,
            image: summary.image.unwrap_or_else(|| "unknown".to_string()),
            status,
            state,
            health,
        }
    }
}

impl Orchestrator for ComposeManager {
    fn ensure_available(&self) -> Result<()> {
        Self::cli_available()
    }

    fn ps(&self) -> Result<String> {
        self.compose_command(&["ps"])
    }

    fn is_service_running(&self, service: &str) -> Result<bool> {
        let running = self.compose_command(&["ps", "--services", "--filter", "status=running"])?;
        Ok(running.lines().any(|line| line.trim() == service))
    }

    fn up(&self) -> Result<()> {
        self.compose_command(&["up", "-d"])?;
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.compose_command(&["stop"])?;
        Ok(())
    }

    fn pull(&self) -> Result<()> {
        self.compose_command(&["pull"])?;
        Ok(())
    }

    fn exec(&self, service: &str, cmd: &'static [&'static str]) -> Result<String> {
        let mut args = vec!["exec", "-T", service];
        args.extend_from_slice(cmd);
        self.compose_command(&args)
    }

    fn exec_with_input(
        &self,
        service: &str,
        cmd: &'static [&'static str],
        input: &str,
    ) -> Result<String> {
        let mut child = Command::new("docker")
            .arg("compose")
            .arg("exec")
            .arg("-T")
            .arg(service)
            .args(cmd)
            .current_dir(&self.project_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn docker compose exec")?;

        child
            .stdin
            .as_mut()
            .context("Failed to open stdin of docker compose exec")?
            .write_all(input.as_bytes())?;

        let output = child.wait_with_output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Docker compose exec failed: {}", stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn prune_dangling_images(&self) -> Result<()> {
        let output = Command::new("docker")
            .args(["image", "prune", "-f"])
            .output()
            .context("Failed to execute docker image prune")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Docker image prune failed: {}", stderr));
        }

        Ok(())
    }
}

/// Extract service name to image reference from compose YAML
pub fn parse_compose_images(content: &str) -> Result<HashMap<String, String>> {
    use serde_yaml::Value;

    let yaml: Value = serde_yaml::from_str(content).context("Failed to parse docker-compose.yml")?;

    let mut images = HashMap::new();

    if let Some(services) = yaml.get("services").and_then(|s| s.as_mapping()) {
        for (name, service) in services {
            let name = name.as_str().unwrap_or("unknown").to_string();
            if let Some(image) = service.get("image").and_then(|i| i.as_str()) {
                images.insert(name, image.to_string());
            }
        }
    }

    Ok(images)
}
