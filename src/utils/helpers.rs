/// Helper utilities for the FlowStack CLI

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::utils::constants::DEFAULT_COMPOSE_FILE;

/// Print a plain progress line
pub fn info(msg: impl AsRef<str>) {
    println!("{}", msg.as_ref());
}

/// Print a success line
pub fn ok(msg: impl AsRef<str>) {
    println!("{} {}", "✓".green(), msg.as_ref());
}

/// Print a warning line; warnings never change the exit code
pub fn warn(msg: impl AsRef<str>) {
    eprintln!("{} {}", "⚠".yellow().bold(), msg.as_ref().yellow());
}

/// Print a failure line for a non-fatal check
pub fn fail(msg: impl AsRef<str>) {
    eprintln!("{} {}", "✗".red().bold(), msg.as_ref().red());
}

/// Log a warning and record it in a run report
pub fn advisory(warnings: &mut Vec<String>, msg: impl Into<String>) {
    let msg = msg.into();
    warn(&msg);
    warnings.push(msg);
}

/// Get the project root directory (where docker-compose.yml is located)
pub fn get_project_root() -> Result<PathBuf> {
    use crate::utils::AppConfig;

    // 1. Check saved configuration
    if let Ok(config) = AppConfig::load() {
        if let Some(root) = config.project_root {
            let path = PathBuf::from(&root);
            if path.join(DEFAULT_COMPOSE_FILE).exists() {
                return Ok(path);
            }
        }
    }

    // 2. Check environment variable
    if let Ok(root) = std::env::var("FLOWSTACK_ROOT") {
        let path = PathBuf::from(root);
        if path.join(DEFAULT_COMPOSE_FILE).exists() {
            if let Ok(mut config) = AppConfig::load() {
                let _ = config.set_project_root(path.clone());
            }
            return Ok(path);
        }
    }

    // 3. Search for docker-compose.yml in current and parent directories
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;

    let mut dir = current_dir.as_path();
    loop {
        if dir.join(DEFAULT_COMPOSE_FILE).exists() {
            if let Ok(mut config) = AppConfig::load() {
                let _ = config.set_project_root(dir.to_path_buf());
            }
            return Ok(dir.to_path_buf());
        }

        match dir.parent() {
            Some(parent) => dir = parent,
            None => break,
        }
    }

    anyhow::bail!(
        "Could not find a FlowStack installation\n\n\
        Option 1 - Set environment variable:\n\
          export FLOWSTACK_ROOT=/path/to/flowstack\n\
          flowstack-cli status\n\n\
        Option 2 - Run from the deployment directory:\n\
          cd /path/to/flowstack\n\
          flowstack-cli status\n\n\
        Option 3 - Manually configure:\n\
          mkdir -p ~/.config/flowstack-cli\n\
          echo 'project_root = \"/path/to/flowstack\"' > ~/.config/flowstack-cli/config.toml"
    )
}

/// Create a gzip-compressed tar archive of `item` (a file or directory name
/// resolved relative to `workdir`)
pub fn tar_czf(archive: &Path, workdir: &Path, item: &str) -> Result<()> {
    let output = Command::new("tar")
        .arg("czf")
        .arg(archive)
        .arg("-C")
        .arg(workdir)
        .arg(item)
        .output()
        .context("Failed to execute tar")?;

    if !output.status.success() {
        return Err(anyhow!(
            "tar czf failed: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    Ok(())
}

/// Extract a gzip-compressed tar archive into `dest`
pub fn tar_xzf(archive: &Path, dest: &Path) -> Result<()> {
    let output = Command::new("tar")
        .arg("xzf")
        .arg(archive)
        .arg("-C")
        .arg(dest)
        .output()
        .context("Failed to execute tar")?;

    if !output.status.success() {
        return Err(anyhow!(
            "tar xzf failed: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    Ok(())
}

/// Pick a backup name that collides with neither an existing staging
/// directory nor a finished archive. Timestamps have second resolution, so
/// runs triggered within the same second get a numeric suffix.
pub fn unique_backup_name(backup_dir: &Path, base: &str) -> String {
    let taken = |name: &str| {
        backup_dir.join(name).exists() || backup_dir.join(format!("{}.tar.gz", name)).exists()
    };

    if !taken(base) {
        return base.to_string();
    }

    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Format bytes to human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Mask sensitive data (show only first and last N characters)
pub fn mask_sensitive(value: &str, visible_chars: usize) -> String {
    if value.len() <= visible_chars * 2 {
        "*".repeat(value.len())
    } else {
        let start = &value[..visible_chars];
        let end = &value[value.len() - visible_chars..];
        format!("{}...{}", start, end)
    }
}

/// Validate domain name (basic check)
pub fn is_valid_domain(domain: &str) -> bool {
    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() < 2 {
        return false;
    }

    parts.iter().all(|part| {
        !part.is_empty()
            && part.chars().all(|c| c.is_alphanumeric() || c == '-')
            && !part.starts_with('-')
            && !part.ends_with('-')
    })
}

/// Validate email address (basic check)
pub fn is_valid_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    !parts[0].is_empty() && is_valid_domain(parts[1])
}

/// Parse Docker container status to simplified state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Stopped,
    Paused,
    Restarting,
    Dead,
    Unknown,
}

impl From<&str> for ContainerState {
    fn from(status: &str) -> Self {
        let status_lower = status.to_lowercase();
        if status_lower.contains("up") || status_lower.contains("running") {
            ContainerState::Running
        } else if status_lower.contains("paused") {
            ContainerState::Paused
        } else if status_lower.contains("restarting") {
            ContainerState::Restarting
        } else if status_lower.contains("dead") || status_lower.contains("removing") {
            ContainerState::Dead
        } else if status_lower.contains("exited") || status_lower.contains("stopped") {
            ContainerState::Stopped
        } else {
            ContainerState::Unknown
        }
    }
}

impl ContainerState {
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::Running => "Running",
            ContainerState::Stopped => "Stopped",
            ContainerState::Paused => "Paused",
            ContainerState::Restarting => "Restarting",
            ContainerState::Dead => "Dead",
            ContainerState::Unknown => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(512), "512 B");
    }

    #[test]
    fn test_mask_sensitive() {
        let token = "5e7f294e4c92a9aa661fae8d347d832d";
        assert_eq!(mask_sensitive(token, 4), "5e7f...832d");
        assert_eq!(mask_sensitive("short", 4), "*****");
    }

    #[test]
    fn test_is_valid_domain() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("flows.example.com"));
        assert!(!is_valid_domain("invalid"));
        assert!(!is_valid_domain(".com"));
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("ops@example.com"));
        assert!(!is_valid_email("invalid.email"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn test_container_state() {
        assert_eq!(ContainerState::from("Up 2 hours"), ContainerState::Running);
        assert_eq!(ContainerState::from("Exited (0)"), ContainerState::Stopped);
        assert!(ContainerState::Running.is_running());
        assert!(!ContainerState::Stopped.is_running());
    }

    #[test]
    fn test_unique_backup_name() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_backup_name(dir.path(), "b_20240101_000000"), "b_20240101_000000");

        fs::create_dir(dir.path().join("b_20240101_000000")).unwrap();
        assert_eq!(unique_backup_name(dir.path(), "b_20240101_000000"), "b_20240101_000000_2");

        fs::write(dir.path().join("b_20240101_000000_2.tar.gz"), b"x").unwrap();
        assert_eq!(unique_backup_name(dir.path(), "b_20240101_000000"), "b_20240101_000000_3");
    }

    #[test]
    fn test_tar_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let src = root.path().join("payload");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.txt"), b"hello").unwrap();
        fs::write(src.join("nested/b.bin"), [0u8, 1, 2, 3]).unwrap();

        let archive = root.path().join("payload.tar.gz");
        tar_czf(&archive, root.path(), "payload").unwrap();
        assert!(archive.exists());

        let out = tempfile::tempdir().unwrap();
        tar_xzf(&archive, out.path()).unwrap();
        assert_eq!(fs::read(out.path().join("payload/a.txt")).unwrap(), b"hello");
        assert_eq!(
            fs::read(out.path().join("payload/nested/b.bin")).unwrap(),
            [0u8, 1, 2, 3]
        );
    }
}
