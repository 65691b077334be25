/// Restore coordination
///
/// Unpacks a backup archive and puts its contents back into the live
/// deployment, stopping and starting the managed services around the
/// restore. Existing data and certificate directories are renamed aside
/// with a timestamp suffix rather than deleted, keeping a bounded history
/// of rollback points.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::config::StackConfig;
use crate::core::docker::Orchestrator;
use crate::core::error::StackError;
use crate::utils::confirm::Confirmer;
use crate::utils::constants::{
    ASIDE_KEEP_COUNT, ASIDE_SUFFIX, BACKUP_PREFIX, BACKUP_TIMESTAMP_FORMAT, CERTS_ARCHIVE_NAME,
    CREDENTIALS_EXPORT_DIR, CREDENTIALS_EXPORT_FILE, DATA_ARCHIVE_NAME, ENGINE_SERVICE,
    IMPORT_WORKFLOWS_ARGS, MANIFEST_NAME, RESTORE_GRACE_SECS, WORKFLOWS_EXPORT_DIR,
    WORKFLOWS_EXPORT_FILE,
};
use crate::utils::{self, advisory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreMode {
    Full,
    ConfigOnly,
    DataOnly,
}

impl RestoreMode {
    /// The scope flags are not mutually exclusive on the CLI; when both are
    /// set, config-only wins.
    pub fn from_flags(config_only: bool, data_only: bool) -> Self {
        if config_only {
            RestoreMode::ConfigOnly
        } else if data_only {
            RestoreMode::DataOnly
        } else {
            RestoreMode::Full
        }
    }

    pub fn includes_config(&self) -> bool {
        matches!(self, RestoreMode::Full | RestoreMode::ConfigOnly)
    }

    pub fn includes_data(&self) -> bool {
        matches!(self, RestoreMode::Full | RestoreMode::DataOnly)
    }

    pub fn includes_certs(&self) -> bool {
        matches!(self, RestoreMode::Full | RestoreMode::DataOnly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug)]
pub struct RestoreReport {
    pub outcome: RestoreOutcome,
    pub warnings: Vec<String>,
}

pub struct RestoreCoordinator<'a> {
    config: &'a StackConfig,
    orchestrator: &'a dyn Orchestrator,
    confirmer: &'a dyn Confirmer,
    grace: Duration,
}

impl<'a> RestoreCoordinator<'a> {
    pub fn new(
        config: &'a StackConfig,
        orchestrator: &'a dyn Orchestrator,
        confirmer: &'a dyn Confirmer,
    ) -> Self {
        Self {
            config,
            orchestrator,
            confirmer,
            grace: Duration::from_secs(RESTORE_GRACE_SECS),
        }
    }

    /// Override the post-start grace period
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn run(
        &self,
        archive: &Path,
        mode: RestoreMode,
        force: bool,
        dry_run: bool,
    ) -> Result<RestoreReport> {
        let mut warnings = Vec::new();

        if !archive.exists() {
            return Err(StackError::NotFound(archive.to_path_buf()).into());
        }

        // The extraction directory is removed on every exit path, including
        // errors, when `tmp` drops.
        let tmp = tempfile::tempdir().context("Failed to create temporary extraction directory")?;
        utils::tar_xzf(archive, tmp.path()).context("Failed to extract backup archive")?;
        let bundle = locate_bundle(tmp.path())?;

        match fs::read_to_string(bundle.join(MANIFEST_NAME)) {
            Ok(manifest) => {
                println!("{}", manifest);
            }
            Err(_) => utils::warn("Archive has no manifest"),
        }

        if dry_run {
            self.narrate(&bundle, mode);
            return Ok(RestoreReport {
                outcome: RestoreOutcome::Completed,
                warnings,
            });
        }

        if !force {
            let approved = self.confirmer.confirm(&format!(
                "Restoring {} will overwrite the current deployment.",
                archive.display()
            ))?;
            if !approved {
                utils::info("Restore cancelled");
                return Ok(RestoreReport {
                    outcome: RestoreOutcome::Cancelled,
                    warnings,
                });
            }
        }

        utils::info("Stopping services");
        if let Err(e) = self.orchestrator.stop() {
            advisory(&mut warnings, format!("Failed to stop services: {:#}", e));
        }

        if mode.includes_config() {
            self.restore_config_files(&bundle, &mut warnings);
        }
        if mode.includes_data() {
            self.restore_directory(
                &bundle,
                DATA_ARCHIVE_NAME,
                &self.config.data_dir,
                "data directory",
                &mut warnings,
            );
        }
        if mode.includes_certs() {
            self.restore_directory(
                &bundle,
                CERTS_ARCHIVE_NAME,
                &self.config.certs_dir,
                "certificate store",
                &mut warnings,
            );
        }

        if !bundle
            .join(CREDENTIALS_EXPORT_DIR)
            .join(CREDENTIALS_EXPORT_FILE)
            .exists()
        {
            advisory(
                &mut warnings,
                "No credentials export in archive, credentials come from the data snapshot alone",
            );
        }

        utils::info("Starting services");
        if let Err(e) = self.orchestrator.up() {
            advisory(&mut warnings, format!("Failed to start services: {:#}", e));
        }

        std::thread::sleep(self.grace);
        match self.orchestrator.is_service_running(ENGINE_SERVICE) {
            Ok(true) => utils::ok("Services are running"),
            Ok(false) => advisory(
                &mut warnings,
                "Services are not reporting as running yet, check the logs",
            ),
            Err(e) => advisory(&mut warnings, format!("Could not query service state: {:#}", e)),
        }

        self.import_workflows(&bundle, &mut warnings);

        Ok(RestoreReport {
            outcome: RestoreOutcome::Completed,
            warnings,
        })
    }

    fn narrate(&self, bundle: &Path, mode: RestoreMode) {
        utils::info("Dry run, nothing will be changed");
        utils::info("Would stop services");

        if mode.includes_config() {
            for dest in [&self.config.env_file, &self.config.compose_file] {
                if let Some(name) = dest.file_name().and_then(|n| n.to_str()) {
                    if bundle.join(name).exists() {
                        utils::info(format!("Would restore {}", name));
                    }
                }
            }
        }
        if mode.includes_data() && bundle.join(DATA_ARCHIVE_NAME).exists() {
            utils::info(format!(
                "Would move {} aside and extract the data snapshot",
                self.config.data_dir.display()
            ));
        }
        if mode.includes_certs() && bundle.join(CERTS_ARCHIVE_NAME).exists() {
            utils::info(format!(
                "Would move {} aside and extract the certificate store",
                self.config.certs_dir.display()
            ));
        }

        utils::info(format!(
            "Would start services and wait {}s before checking them",
            self.grace.as_secs()
        ));
        if bundle
            .join(WORKFLOWS_EXPORT_DIR)
            .join(WORKFLOWS_EXPORT_FILE)
            .exists()
        {
            utils::info("Would re-import the workflows export");
        }
    }

    fn restore_config_files(&self, bundle: &Path, warnings: &mut Vec<String>) {
        for dest in [&self.config.env_file, &self.config.compose_file] {
            let Some(name) = dest.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let src = bundle.join(name);
            if !src.exists() {
                advisory(warnings, format!("{} not present in archive, skipping", name));
                continue;
            }

            match fs::copy(&src, dest) {
                Ok(_) => utils::ok(format!("Restored {}", name)),
                Err(e) => advisory(warnings, format!("Could not restore {}: {}", name, e)),
            }
        }
    }

    fn restore_directory(
        &self,
        bundle: &Path,
        archive_name: &str,
        target: &Path,
        label: &str,
        warnings: &mut Vec<String>,
    ) {
        let sub_archive = bundle.join(archive_name);
        if !sub_archive.exists() {
            advisory(
                warnings,
                format!("{} not present in archive, skipping {} restore", archive_name, label),
            );
            return;
        }

        let parent = target.parent().unwrap_or_else(|| Path::new("/")).to_path_buf();
        if let Err(e) = fs::create_dir_all(&parent) {
            advisory(warnings, format!("Could not prepare {}: {}", parent.display(), e));
            return;
        }

        if target.exists() {
            let aside = aside_path(target);
            match fs::rename(target, &aside) {
                Ok(()) => utils::info(format!("Existing {} moved to {}", label, aside.display())),
                Err(e) => {
                    advisory(
                        warnings,
                        format!("Could not move existing {} aside ({}), skipping restore", label, e),
                    );
                    return;
                }
            }
        }

        match utils::tar_xzf(&sub_archive, &parent) {
            Ok(()) => {
                utils::ok(format!("Restored {}", label));
                prune_aside_copies(target, ASIDE_KEEP_COUNT, warnings);
            }
            Err(e) => advisory(warnings, format!("Failed to extract {}: {:#}", archive_name, e)),
        }
    }

    fn import_workflows(&self, bundle: &Path, warnings: &mut Vec<String>) {
        let src = bundle.join(WORKFLOWS_EXPORT_DIR).join(WORKFLOWS_EXPORT_FILE);
        if !src.exists() {
            advisory(warnings, "No workflows export in archive, skipping import");
            return;
        }

        let payload = match fs::read_to_string(&src) {
            Ok(payload) => payload,
            Err(e) => {
                advisory(warnings, format!("Could not read workflows export: {}", e));
                return;
            }
        };

        match self
            .orchestrator
            .exec_with_input(ENGINE_SERVICE, IMPORT_WORKFLOWS_ARGS, &payload)
        {
            Ok(_) => utils::ok("Workflows re-imported"),
            Err(e) => advisory(
                warnings,
                format!(
                    "Workflow import failed ({:#}), the restored data directory already contains the workflows",
                    e
                ),
            ),
        }
    }
}

/// An extracted archive must hold exactly one top-level backup directory
fn locate_bundle(extracted: &Path) -> Result<PathBuf> {
    let mut bundles: Vec<PathBuf> = fs::read_dir(extracted)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .map(|n| n.to_string_lossy().starts_with(BACKUP_PREFIX))
                    .unwrap_or(false)
        })
        .collect();

    if bundles.len() != 1 {
        return Err(StackError::InvalidFormat(format!(
            "expected a single {}_* directory, found {}",
            BACKUP_PREFIX,
            bundles.len()
        ))
        .into());
    }

    Ok(bundles.remove(0))
}

/// Sibling path for the rename-aside rollback copy, uniquified within the
/// same second
fn aside_path(target: &Path) -> PathBuf {
    let parent = target.parent().unwrap_or_else(|| Path::new("/"));
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "dir".to_string());
    let base = format!(
        "{}.{}-{}",
        name,
        ASIDE_SUFFIX,
        Local::now().format(BACKUP_TIMESTAMP_FORMAT)
    );

    let mut candidate = parent.join(&base);
    let mut n = 2;
    while candidate.exists() {
        candidate = parent.join(format!("{}_{}", base, n));
        n += 1;
    }
    candidate
}

/// Keep only the newest `keep` aside copies of `target`
fn prune_aside_copies(target: &Path, keep: usize, warnings: &mut Vec<String>) {
    let parent = match target.parent() {
        Some(parent) => parent,
        None => return,
    };
    let name = match target.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return,
    };
    let prefix = format!("{}.{}-", name, ASIDE_SUFFIX);

    let entries = match fs::read_dir(parent) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    let mut asides: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .map(|n| n.to_string_lossy().starts_with(&prefix))
                    .unwrap_or(false)
        })
        .collect();

    // Timestamped names sort chronologically
    asides.sort();
    asides.reverse();

    for old in asides.into_iter().skip(keep) {
        match fs::remove_dir_all(&old) {
            Ok(()) => utils::info(format!("Pruned old rollback copy {}", old.display())),
            Err(e) => advisory(
                warnings,
                format!("Could not prune rollback copy {}: {}", old.display(), e),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::docker::MockOrchestrator;
    use crate::utils::confirm::MockConfirmer;
    use std::collections::BTreeMap;

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

    struct ArchiveOptions {
        with_credentials: bool,
        with_workflows: bool,
    }

    impl Default for ArchiveOptions {
        fn default() -> Self {
            Self {
                with_credentials: true,
                with_workflows: true,
            }
        }
    }

    /// Build a real backup archive the way the backup coordinator lays it out
    fn make_archive(scratch: &Path, opts: ArchiveOptions) -> PathBuf {
        let bundle_name = format!("{}_20240115_103000", BACKUP_PREFIX);
        let bundle = scratch.join(&bundle_name);
        fs::create_dir_all(&bundle).unwrap();

        // Data directory snapshot
        let data_src = scratch.join("data");
        fs::create_dir_all(data_src.join("db")).unwrap();
        fs::write(data_src.join("db/state.sqlite"), b"backed-up state").unwrap();
        fs::write(data_src.join("settings.json"), b"{\"from\":\"backup\"}").unwrap();
        utils::tar_czf(&bundle.join(DATA_ARCHIVE_NAME), scratch, "data").unwrap();
        fs::remove_dir_all(&data_src).unwrap();

        // Certificate store snapshot
        let certs_src = scratch.join("certs");
        fs::create_dir_all(&certs_src).unwrap();
        fs::write(certs_src.join("acme.json"), b"backed-up certs").unwrap();
        utils::tar_czf(&bundle.join(CERTS_ARCHIVE_NAME), scratch, "certs").unwrap();
        fs::remove_dir_all(&certs_src).unwrap();

        fs::write(bundle.join(".env"), "DOMAIN=backup.example.com\n").unwrap();
        fs::write(bundle.join("docker-compose.yml"), "services: {}\n").unwrap();
        fs::write(bundle.join(MANIFEST_NAME), "test manifest\n").unwrap();

        if opts.with_workflows {
            let dir = bundle.join(WORKFLOWS_EXPORT_DIR);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(WORKFLOWS_EXPORT_FILE), "[{\"id\":\"wf-1\"}]").unwrap();
        }
        if opts.with_credentials {
            let dir = bundle.join(CREDENTIALS_EXPORT_DIR);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(CREDENTIALS_EXPORT_FILE), "[{\"id\":\"cred-1\"}]").unwrap();
        }

        let archive = scratch.join(format!("{}.tar.gz", bundle_name));
        utils::tar_czf(&archive, scratch, &bundle_name).unwrap();
        fs::remove_dir_all(&bundle).unwrap();
        archive
    }

    fn live_deployment(config: &StackConfig) {
        fs::create_dir_all(config.data_dir.join("db")).unwrap();
        fs::write(config.data_dir.join("db/state.sqlite"), b"live state").unwrap();
        fs::create_dir_all(&config.certs_dir).unwrap();
        fs::write(config.certs_dir.join("acme.json"), b"live certs").unwrap();
        fs::write(&config.env_file, "DOMAIN=live.example.com\n").unwrap();
        fs::write(&config.compose_file, "services: { engine: {} }\n").unwrap();
    }

    fn quiet_orchestrator() -> MockOrchestrator {
        let mut mock = MockOrchestrator::new();
        mock.expect_stop().returning(|| Ok(()));
        mock.expect_up().returning(|| Ok(()));
        mock.expect_is_service_running().returning(|_| Ok(true));
        mock.expect_exec_with_input()
            .returning(|_, _, _| Ok(String::new()));
        mock
    }

    fn tree_contents(root: &Path) -> BTreeMap<String, Vec<u8>> {
        fn walk(base: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
            for entry in fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    walk(base, &path, out);
                } else {
                    let rel = path.strip_prefix(base).unwrap().to_string_lossy().to_string();
                    out.insert(rel, fs::read(&path).unwrap());
                }
            }
        }
        let mut out = BTreeMap::new();
        walk(root, root, &mut out);
        out
    }

    fn aside_count(config: &StackConfig, name: &str) -> usize {
        fs::read_dir(&config.root)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with(&format!("{}.{}-", name, ASIDE_SUFFIX))
            })
            .count()
    }

    #[test]
    fn test_missing_archive_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        let mock = MockOrchestrator::new();
        let confirmer = MockConfirmer::new();

        let result = RestoreCoordinator::new(&config, &mock, &confirmer).run(
            Path::new("/nonexistent/backup.tar.gz"),
            RestoreMode::Full,
            true,
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_archive_without_bundle_directory_is_invalid() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());

        // A tar.gz holding a plain file, no backup directory inside
        fs::write(root.path().join("loose.txt"), b"nope").unwrap();
        let archive = root.path().join("bad.tar.gz");
        utils::tar_czf(&archive, root.path(), "loose.txt").unwrap();

        let mock = MockOrchestrator::new();
        let confirmer = MockConfirmer::new();
        let result = RestoreCoordinator::new(&config, &mock, &confirmer).run(
            &archive,
            RestoreMode::Full,
            true,
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_dry_run_mutates_nothing() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        live_deployment(&config);
        let archive = make_archive(&root.path().join("scratch-setup"), ArchiveOptions::default());

        let before = tree_contents(root.path());

        // No orchestrator or confirmer call is expected during a dry run
        let mock = MockOrchestrator::new();
        let confirmer = MockConfirmer::new();
        let report = RestoreCoordinator::new(&config, &mock, &confirmer)
            .run(&archive, RestoreMode::Full, false, true)
            .unwrap();

        assert_eq!(report.outcome, RestoreOutcome::Completed);
        assert_eq!(before, tree_contents(root.path()));
    }

    #[test]
    fn test_declined_confirmation_cancels_cleanly() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        live_deployment(&config);
        let archive = make_archive(&root.path().join("scratch-setup"), ArchiveOptions::default());

        let before = tree_contents(root.path());

        let mock = MockOrchestrator::new();
        let mut confirmer = MockConfirmer::new();
        confirmer.expect_confirm().returning(|_| Ok(false));

        let report = RestoreCoordinator::new(&config, &mock, &confirmer)
            .run(&archive, RestoreMode::Full, false, false)
            .unwrap();

        assert_eq!(report.outcome, RestoreOutcome::Cancelled);
        assert_eq!(before, tree_contents(root.path()));
    }

    #[test]
    fn test_config_only_leaves_data_and_certs_untouched() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        live_deployment(&config);
        let archive = make_archive(&root.path().join("scratch-setup"), ArchiveOptions::default());

        let mock = quiet_orchestrator();
        let confirmer = MockConfirmer::new();
        RestoreCoordinator::new(&config, &mock, &confirmer)
            .with_grace(Duration::ZERO)
            .run(&archive, RestoreMode::ConfigOnly, true, false)
            .unwrap();

        assert_eq!(
            fs::read_to_string(&config.env_file).unwrap(),
            "DOMAIN=backup.example.com\n"
        );
        assert_eq!(
            fs::read(config.data_dir.join("db/state.sqlite")).unwrap(),
            b"live state"
        );
        assert_eq!(fs::read(config.certs_dir.join("acme.json")).unwrap(), b"live certs");
        assert_eq!(aside_count(&config, "data"), 0);
    }

    #[test]
    fn test_data_only_leaves_config_untouched() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        live_deployment(&config);
        let archive = make_archive(&root.path().join("scratch-setup"), ArchiveOptions::default());

        let mock = quiet_orchestrator();
        let confirmer = MockConfirmer::new();
        RestoreCoordinator::new(&config, &mock, &confirmer)
            .with_grace(Duration::ZERO)
            .run(&archive, RestoreMode::DataOnly, true, false)
            .unwrap();

        assert_eq!(
            fs::read_to_string(&config.env_file).unwrap(),
            "DOMAIN=live.example.com\n"
        );
        assert_eq!(
            fs::read(config.data_dir.join("db/state.sqlite")).unwrap(),
            b"backed-up state"
        );
        assert_eq!(aside_count(&config, "data"), 1);
    }

    #[test]
    fn test_forced_restore_twice_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        live_deployment(&config);
        let archive = make_archive(&root.path().join("scratch-setup"), ArchiveOptions::default());

        let mock = quiet_orchestrator();
        let confirmer = MockConfirmer::new();
        let coordinator =
            RestoreCoordinator::new(&config, &mock, &confirmer).with_grace(Duration::ZERO);

        coordinator
            .run(&archive, RestoreMode::Full, true, false)
            .unwrap();
        let after_first = tree_contents(&config.data_dir);
        assert_eq!(aside_count(&config, "data"), 1);
        assert_eq!(aside_count(&config, "certs"), 1);

        coordinator
            .run(&archive, RestoreMode::Full, true, false)
            .unwrap();
        assert_eq!(after_first, tree_contents(&config.data_dir));
        assert_eq!(aside_count(&config, "data"), 2);
        assert_eq!(aside_count(&config, "certs"), 2);
    }

    #[test]
    fn test_missing_credentials_export_is_advisory() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        live_deployment(&config);
        let archive = make_archive(
            &root.path().join("scratch-setup"),
            ArchiveOptions {
                with_credentials: false,
                ..Default::default()
            },
        );

        let mock = quiet_orchestrator();
        let confirmer = MockConfirmer::new();
        let report = RestoreCoordinator::new(&config, &mock, &confirmer)
            .with_grace(Duration::ZERO)
            .run(&archive, RestoreMode::Full, true, false)
            .unwrap();

        assert_eq!(report.outcome, RestoreOutcome::Completed);
        assert!(report.warnings.iter().any(|w| w.contains("credentials")));
        assert_eq!(
            fs::read(config.data_dir.join("db/state.sqlite")).unwrap(),
            b"backed-up state"
        );
    }

    #[test]
    fn test_aside_history_is_bounded() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        live_deployment(&config);

        // Pre-existing rollback copies beyond the bound
        for n in 1..=4 {
            let aside = root
                .path()
                .join(format!("data.{}-2023010{}_000000", ASIDE_SUFFIX, n));
            fs::create_dir_all(&aside).unwrap();
        }

        let archive = make_archive(&root.path().join("scratch-setup"), ArchiveOptions::default());
        let mock = quiet_orchestrator();
        let confirmer = MockConfirmer::new();
        RestoreCoordinator::new(&config, &mock, &confirmer)
            .with_grace(Duration::ZERO)
            .run(&archive, RestoreMode::DataOnly, true, false)
            .unwrap();

        assert_eq!(aside_count(&config, "data"), ASIDE_KEEP_COUNT);
    }
}
