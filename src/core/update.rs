/// Update coordination
///
/// Pulls newer images and recreates the managed services, with an optional
/// safety backup first. The run is an ordered list of named steps, each
/// tagged fatal or advisory; the runner stops at the first fatal failure
/// and collects advisory failures into the report.

use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use indicatif::ProgressBar;
use std::fs;
use std::time::Duration;

use crate::core::backup::BackupCoordinator;
use crate::core::config::{EnvFile, StackConfig};
use crate::core::docker::{parse_compose_images, Orchestrator};
use crate::utils::confirm::Confirmer;
use crate::utils::constants::{
    get_services, ENGINE_SERVICE, ENGINE_VERSION_ARGS, HEALTH_POLL_ATTEMPTS,
    HEALTH_POLL_INTERVAL_SECS, PROXY_SERVICE, PROXY_VERSION_ARGS, VERSION_UNAVAILABLE,
};
use crate::utils::{self, advisory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Fatal,
    Advisory,
}

#[derive(Debug, Clone, Copy)]
pub struct StepDef {
    pub name: &'static str,
    pub kind: StepKind,
}

/// The update state machine. Terminal failures are exactly the fatal steps:
/// an unusable compose CLI, or a requested safety backup that failed.
pub const UPDATE_STEPS: &[StepDef] = &[
    StepDef { name: "check-cli", kind: StepKind::Fatal },
    StepDef { name: "record-versions", kind: StepKind::Advisory },
    StepDef { name: "ensure-backup", kind: StepKind::Fatal },
    StepDef { name: "drift-check", kind: StepKind::Advisory },
    StepDef { name: "pull-images", kind: StepKind::Advisory },
    StepDef { name: "stop-services", kind: StepKind::Advisory },
    StepDef { name: "start-services", kind: StepKind::Advisory },
    StepDef { name: "wait-healthy", kind: StepKind::Advisory },
    StepDef { name: "report", kind: StepKind::Advisory },
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceVersions {
    pub engine: String,
    pub proxy: String,
}

#[derive(Debug, Default)]
pub struct UpdateReport {
    pub versions_before: ServiceVersions,
    pub versions_after: Option<ServiceVersions>,
    pub advisories: Vec<String>,
    pub healthy: Option<bool>,
    pub cancelled: bool,
}

enum StepFlow {
    Continue,
    Cancel,
}

pub struct UpdateCoordinator<'a> {
    config: &'a StackConfig,
    orchestrator: &'a dyn Orchestrator,
    confirmer: &'a dyn Confirmer,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl<'a> UpdateCoordinator<'a> {
    pub fn new(
        config: &'a StackConfig,
        orchestrator: &'a dyn Orchestrator,
        confirmer: &'a dyn Confirmer,
    ) -> Self {
        Self {
            config,
            orchestrator,
            confirmer,
            poll_attempts: HEALTH_POLL_ATTEMPTS,
            poll_interval: Duration::from_secs(HEALTH_POLL_INTERVAL_SECS),
        }
    }

    /// Override the health polling schedule
    pub fn with_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.poll_attempts = attempts;
        self.poll_interval = interval;
        self
    }

    pub async fn run(&self, auto_backup: bool) -> Result<UpdateReport> {
        let mut report = UpdateReport::default();

        for step in UPDATE_STEPS {
            match self.run_step(step.name, auto_backup, &mut report).await {
                Ok(StepFlow::Continue) => {}
                Ok(StepFlow::Cancel) => {
                    utils::info("Update cancelled");
                    report.cancelled = true;
                    return Ok(report);
                }
                Err(e) => match step.kind {
                    StepKind::Fatal => {
                        return Err(e.context(format!("update step '{}' failed", step.name)))
                    }
                    StepKind::Advisory => {
                        advisory(&mut report.advisories, format!("{}: {:#}", step.name, e))
                    }
                },
            }
        }

        Ok(report)
    }

    async fn run_step(
        &self,
        name: &str,
        auto_backup: bool,
        report: &mut UpdateReport,
    ) -> Result<StepFlow> {
        match name {
            "check-cli" => {
                self.orchestrator.ensure_available()?;
                Ok(StepFlow::Continue)
            }
            "record-versions" => {
                report.versions_before = self.query_versions();
                utils::info(format!(
                    "Current versions: engine {}, traefik {}",
                    report.versions_before.engine, report.versions_before.proxy
                ));
                Ok(StepFlow::Continue)
            }
            "ensure-backup" => self.ensure_backup(auto_backup),
            "drift-check" => {
                self.drift_check(&mut report.advisories);
                Ok(StepFlow::Continue)
            }
            "pull-images" => {
                utils::info("Pulling newer images");
                self.orchestrator.pull()?;
                Ok(StepFlow::Continue)
            }
            "stop-services" => {
                utils::info("Stopping services");
                self.orchestrator.stop()?;
                Ok(StepFlow::Continue)
            }
            "start-services" => {
                utils::info("Starting services");
                self.orchestrator.up()?;
                Ok(StepFlow::Continue)
            }
            "wait-healthy" => {
                self.wait_healthy(report).await?;
                Ok(StepFlow::Continue)
            }
            "report" => {
                self.final_report(report).await;
                Ok(StepFlow::Continue)
            }
            other => Err(anyhow!("unknown update step '{}'", other)),
        }
    }

    fn ensure_backup(&self, auto_backup: bool) -> Result<StepFlow> {
        if auto_backup {
            utils::info("Creating safety backup before update");
            BackupCoordinator::new(self.config, self.orchestrator)
                .run()
                .context("safety backup failed, no images were pulled and no service was touched")?;
            return Ok(StepFlow::Continue);
        }

        let approved = self
            .confirmer
            .confirm("Proceed with the update without a safety backup?")?;
        if approved {
            Ok(StepFlow::Continue)
        } else {
            Ok(StepFlow::Cancel)
        }
    }

    /// Warn about local compose-file modifications and .env divergence from
    /// the template. Never blocking.
    fn drift_check(&self, advisories: &mut Vec<String>) {
        match fs::read_to_string(&self.config.compose_file) {
            Ok(content) => {
                if let Err(e) = parse_compose_images(&content) {
                    advisory(advisories, format!("Compose file does not parse: {:#}", e));
                }

                let pristine = self.config.compose_file.with_extension("yml.orig");
                if let Ok(original) = fs::read_to_string(&pristine) {
                    if original != content {
                        advisory(
                            advisories,
                            format!(
                                "{} differs from {}, local modifications will survive the update",
                                self.config.compose_file.display(),
                                pristine.display()
                            ),
                        );
                    }
                }
            }
            Err(e) => advisory(advisories, format!("Could not read compose file: {}", e)),
        }

        if self.config.env_file.exists() && self.config.env_template.exists() {
            match (
                EnvFile::load(&self.config.env_file),
                EnvFile::load(&self.config.env_template),
            ) {
                (Ok(active), Ok(template)) => {
                    let missing = active.missing_from(&template);
                    if !missing.is_empty() {
                        advisory(
                            advisories,
                            format!(
                                "Keys in {} missing from .env: {}",
                                self.config.env_template.display(),
                                missing.join(", ")
                            ),
                        );
                    }
                }
                _ => advisory(advisories, "Could not compare .env against its template"),
            }
        }
    }

    async fn wait_healthy(&self, report: &mut UpdateReport) -> Result<()> {
        let spinner = ProgressBar::new_spinner();

        for attempt in 1..=self.poll_attempts {
            spinner.set_message(format!(
                "Waiting for services ({}/{})",
                attempt, self.poll_attempts
            ));
            spinner.tick();

            let engine = self
                .orchestrator
                .is_service_running(ENGINE_SERVICE)
                .unwrap_or(false);
            let proxy = self
                .orchestrator
                .is_service_running(PROXY_SERVICE)
                .unwrap_or(false);

            if engine && proxy {
                spinner.finish_and_clear();
                report.healthy = Some(true);
                utils::ok("Services are running");
                return Ok(());
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        spinner.finish_and_clear();
        report.healthy = Some(false);
        Err(anyhow!(
            "services did not report healthy within {}, inspect the logs",
            humantime::format_duration(self.poll_interval * self.poll_attempts)
        ))
    }

    /// Re-query versions, show status, probe health endpoints, prune
    /// dangling images. Every failure here is advisory.
    async fn final_report(&self, report: &mut UpdateReport) {
        let after = self.query_versions();
        self.print_version_change(&report.versions_before, &after);
        report.versions_after = Some(after);

        if let Ok(ps) = self.orchestrator.ps() {
            println!("{}", ps);
        }

        self.check_endpoints(&mut report.advisories).await;

        if let Err(e) = self.orchestrator.prune_dangling_images() {
            advisory(
                &mut report.advisories,
                format!("Could not prune dangling images: {:#}", e),
            );
        }
    }

    fn query_versions(&self) -> ServiceVersions {
        ServiceVersions {
            engine: self.service_version(ENGINE_SERVICE, ENGINE_VERSION_ARGS),
            proxy: self.service_version(PROXY_SERVICE, PROXY_VERSION_ARGS),
        }
    }

    fn service_version(&self, service: &str, args: &'static [&'static str]) -> String {
        match self.orchestrator.is_service_running(service) {
            Ok(true) => match self.orchestrator.exec(service, args) {
                Ok(output) => {
                    let line = output.lines().next().unwrap_or("").trim();
                    if line.is_empty() {
                        VERSION_UNAVAILABLE.to_string()
                    } else {
                        line.to_string()
                    }
                }
                Err(_) => VERSION_UNAVAILABLE.to_string(),
            },
            _ => VERSION_UNAVAILABLE.to_string(),
        }
    }

    fn print_version_change(&self, before: &ServiceVersions, after: &ServiceVersions) {
        let pairs = [
            ("engine", before.engine.as_str(), after.engine.as_str()),
            ("traefik", before.proxy.as_str(), after.proxy.as_str()),
        ];

        for (name, old, new) in pairs {
            if old == VERSION_UNAVAILABLE || new == VERSION_UNAVAILABLE {
                utils::info(format!("{}: {}", name, new));
                continue;
            }

            match (parse_version(old), parse_version(new)) {
                (Some(b), Some(a)) if a > b => {
                    utils::ok(format!("{} upgraded: {} -> {}", name, old, new))
                }
                _ if old != new => {
                    utils::info(format!("{} version changed: {} -> {}", name, old, new))
                }
                _ => utils::info(format!("{} unchanged at {}", name, new)),
            }
        }
    }

    async fn check_endpoints(&self, advisories: &mut Vec<String>) {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                advisory(advisories, format!("Could not build HTTP client: {}", e));
                return;
            }
        };

        let targets: Vec<(&str, &str)> = get_services()
            .iter()
            .filter_map(|s| s.health_endpoint.map(|url| (s.name, url)))
            .collect();

        let probes = targets.iter().map(|(name, url)| {
            let client = client.clone();
            async move {
                let reachable = matches!(
                    client.get(*url).send().await,
                    Ok(response) if response.status().is_success()
                );
                (*name, *url, reachable)
            }
        });

        for (name, url, reachable) in join_all(probes).await {
            if reachable {
                utils::ok(format!("{} endpoint reachable at {}", name, url));
            } else {
                advisory(
                    advisories,
                    format!("{} endpoint not reachable at {}", name, url),
                );
            }
        }
    }
}

/// Tolerates outputs like "flowd 1.44.2" or "v2.11.0"
fn parse_version(s: &str) -> Option<semver::Version> {
    s.split_whitespace()
        .last()
        .map(|t| t.trim_start_matches('v'))
        .and_then(|t| semver::Version::parse(t).ok())
}
