/// Backup coordination
///
/// Bundles the data directory, configuration files, certificate store and
/// the engine's workflow/credential exports into one timestamped tar.gz
/// archive in the backup root, then prunes archives beyond the keep-count.

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::core::config::StackConfig;
use crate::core::docker::Orchestrator;
use crate::utils::constants::{
    BACKUP_PREFIX, BACKUP_TIMESTAMP_FORMAT, CERTS_ARCHIVE_NAME, CREDENTIALS_EXPORT_DIR,
    CREDENTIALS_EXPORT_FILE, DATA_ARCHIVE_NAME, ENGINE_SERVICE, EXPORT_CREDENTIALS_ARGS,
    EXPORT_WORKFLOWS_ARGS, MANIFEST_NAME, WORKFLOWS_EXPORT_DIR, WORKFLOWS_EXPORT_FILE,
};
use crate::utils::{self, advisory, format_bytes};

#[derive(Debug)]
pub struct BackupReport {
    pub archive: PathBuf,
    pub size_bytes: u64,
    pub warnings: Vec<String>,
}

pub struct BackupCoordinator<'a> {
    config: &'a StackConfig,
    orchestrator: &'a dyn Orchestrator,
}

impl<'a> BackupCoordinator<'a> {
    pub fn new(config: &'a StackConfig, orchestrator: &'a dyn Orchestrator) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    /// Run a full backup. Missing optional artifacts degrade to warnings;
    /// only an unusable compose CLI, an unusable backup root, or a failed
    /// final compression abort the run.
    pub fn run(&self) -> Result<BackupReport> {
        let mut warnings = Vec::new();

        self.orchestrator.ensure_available()?;

        fs::create_dir_all(&self.config.backup_dir).with_context(|| {
            format!(
                "Failed to create backup directory {}",
                self.config.backup_dir.display()
            )
        })?;

        let base = format!(
            "{}_{}",
            BACKUP_PREFIX,
            Local::now().format(BACKUP_TIMESTAMP_FORMAT)
        );
        let name = utils::unique_backup_name(&self.config.backup_dir, &base);
        let staging = self.config.backup_dir.join(&name);
        fs::create_dir_all(&staging)
            .with_context(|| format!("Failed to create staging directory {}", staging.display()))?;

        utils::info(format!("Creating backup {}", name));

        self.snapshot_data(&staging, &mut warnings);
        self.copy_config_files(&staging, &mut warnings);
        self.snapshot_certs(&staging, &mut warnings);
        self.export_from_engine(&staging, &mut warnings);
        self.write_manifest(&staging, &mut warnings);

        let archive = self.config.backup_dir.join(format!("{}.tar.gz", name));
        utils::tar_czf(&archive, &self.config.backup_dir, &name)
            .context("Failed to compress backup staging directory")?;

        if let Err(e) = fs::remove_dir_all(&staging) {
            advisory(
                &mut warnings,
                format!("Could not remove staging directory {}: {}", staging.display(), e),
            );
        }

        match prune_backups(&self.config.backup_dir, self.config.keep_count) {
            Ok(removed) if !removed.is_empty() => {
                utils::info(format!(
                    "Pruned {} old backup(s), keeping the {} most recent",
                    removed.len(),
                    self.config.keep_count
                ));
            }
            Ok(_) => {}
            Err(e) => advisory(&mut warnings, format!("Retention pruning failed: {:#}", e)),
        }

        let size_bytes = fs::metadata(&archive).map(|m| m.len()).unwrap_or(0);
        utils::ok(format!(
            "Backup complete: {} ({})",
            archive.display(),
            format_bytes(size_bytes)
        ));

        Ok(BackupReport {
            archive,
            size_bytes,
            warnings,
        })
    }

    fn snapshot_data(&self, staging: &Path, warnings: &mut Vec<String>) {
        let data_dir = &self.config.data_dir;
        if !data_dir.exists() {
            advisory(
                warnings,
                format!(
                    "Data directory {} not found, backing up configuration only",
                    data_dir.display()
                ),
            );
            return;
        }

        match archive_directory(data_dir, &staging.join(DATA_ARCHIVE_NAME)) {
            Ok(()) => utils::ok("Data directory archived"),
            Err(e) => advisory(warnings, format!("Data snapshot failed: {:#}", e)),
        }
    }

    fn copy_config_files(&self, staging: &Path, warnings: &mut Vec<String>) {
        for file in [&self.config.env_file, &self.config.compose_file] {
            let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if !file.exists() {
                advisory(warnings, format!("{} not found, skipping", name));
                continue;
            }

            match fs::copy(file, staging.join(name)) {
                Ok(_) => utils::ok(format!("Copied {}", name)),
                Err(e) => advisory(warnings, format!("Could not copy {}: {}", name, e)),
            }
        }
    }

    fn snapshot_certs(&self, staging: &Path, warnings: &mut Vec<String>) {
        let certs_dir = &self.config.certs_dir;
        if !certs_dir.exists() {
            advisory(
                warnings,
                format!("Certificate store {} not found, skipping", certs_dir.display()),
            );
            return;
        }

        match archive_directory(certs_dir, &staging.join(CERTS_ARCHIVE_NAME)) {
            Ok(()) => utils::ok("Certificate store archived"),
            Err(e) => advisory(warnings, format!("Certificate snapshot failed: {:#}", e)),
        }
    }

    /// Export workflows and credentials through the engine's admin CLI. The
    /// data snapshot already contains this information, so any failure here
    /// is a warning only.
    fn export_from_engine(&self, staging: &Path, warnings: &mut Vec<String>) {
        let running = match self.orchestrator.is_service_running(ENGINE_SERVICE) {
            Ok(running) => running,
            Err(e) => {
                advisory(warnings, format!("Could not query engine state: {:#}", e));
                return;
            }
        };

        if !running {
            advisory(
                warnings,
                "Engine is not running, skipping workflow and credential exports",
            );
            return;
        }

        let exports = [
            (WORKFLOWS_EXPORT_DIR, WORKFLOWS_EXPORT_FILE, EXPORT_WORKFLOWS_ARGS, "workflows"),
            (
                CREDENTIALS_EXPORT_DIR,
                CREDENTIALS_EXPORT_FILE,
                EXPORT_CREDENTIALS_ARGS,
                "credentials",
            ),
        ];

        for (dir, file, args, label) in exports {
            match self.orchestrator.exec(ENGINE_SERVICE, args) {
                Ok(json) => {
                    if serde_json::from_str::<serde_json::Value>(&json).is_err() {
                        advisory(
                            warnings,
                            format!("{} export did not return valid JSON, skipping", label),
                        );
                        continue;
                    }

                    let dest_dir = staging.join(dir);
                    let result = fs::create_dir_all(&dest_dir)
                        .and_then(|_| fs::write(dest_dir.join(file), &json));
                    match result {
                        Ok(()) => utils::ok(format!("Exported {}", label)),
                        Err(e) => {
                            advisory(warnings, format!("Could not write {} export: {}", label, e))
                        }
                    }
                }
                Err(e) => advisory(
                    warnings,
                    format!(
                        "{} export failed ({:#}), the data snapshot already contains this information",
                        label, e
                    ),
                ),
            }
        }
    }

    fn write_manifest(&self, staging: &Path, warnings: &mut Vec<String>) {
        let status = self
            .orchestrator
            .ps()
            .unwrap_or_else(|_| "unavailable\n".to_string());
        let hostname = sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string());
        let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());

        let manifest = format!(
            "FlowStack backup manifest\n\
             =========================\n\
             Created: {}\n\
             Host:    {}\n\
             User:    {}\n\
             \n\
             Service status at backup time:\n\
             {}\n\
             Contents:\n\
             \x20 {:<30} data directory snapshot\n\
             \x20 {:<30} environment file copy\n\
             \x20 {:<30} compose file copy\n\
             \x20 {:<30} certificate store snapshot\n\
             \x20 {:<30} workflows export\n\
             \x20 {:<30} credentials export (encrypted)\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            hostname,
            user,
            status,
            DATA_ARCHIVE_NAME,
            ".env",
            "docker-compose.yml",
            CERTS_ARCHIVE_NAME,
            format!("{}/{}", WORKFLOWS_EXPORT_DIR, WORKFLOWS_EXPORT_FILE),
            format!("{}/{}", CREDENTIALS_EXPORT_DIR, CREDENTIALS_EXPORT_FILE),
        );

        if let Err(e) = fs::write(staging.join(MANIFEST_NAME), manifest) {
            advisory(warnings, format!("Could not write manifest: {}", e));
        }
    }
}

/// Tar a directory into `dest`, rooted at the directory's parent so the
/// archive extracts back to a single directory of the same name
fn archive_directory(dir: &Path, dest: &Path) -> Result<()> {
    let parent = dir.parent().unwrap_or_else(|| Path::new("/"));
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("invalid directory name: {}", dir.display()))?;
    utils::tar_czf(dest, parent, name)
}

/// Delete archives beyond `keep`, newest first by modification time.
/// Returns the deleted paths.
pub fn prune_backups(backup_dir: &Path, keep: usize) -> Result<Vec<PathBuf>> {
    let pattern = Regex::new(&format!(
        r"^{}_\d{{8}}_\d{{6}}(_\d+)?\.tar\.gz$",
        BACKUP_PREFIX
    ))
    .context("invalid retention pattern")?;

    let mut archives: Vec<(SystemTime, String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(backup_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !entry.path().is_file() || !pattern.is_match(&name) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        archives.push((modified, name, entry.path()));
    }

    // Newest first; the timestamped name breaks ties within one second
    archives.sort_by(|a, b| (&b.0, &b.1).cmp(&(&a.0, &a.1)));

    let mut removed = Vec::new();
    for (_, _, path) in archives.into_iter().skip(keep) {
        fs::remove_file(&path)?;
        removed.push(path);
    }

    Ok(removed)
}
