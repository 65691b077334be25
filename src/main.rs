use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use flowstack_cli::cli::{Cli, Commands, ConfigCommands};
use flowstack_cli::core::backup::BackupCoordinator;
use flowstack_cli::core::restore::{RestoreCoordinator, RestoreMode, RestoreOutcome};
use flowstack_cli::core::setup::SetupCoordinator;
use flowstack_cli::core::update::UpdateCoordinator;
use flowstack_cli::core::{ComposeManager, EnvFile, StackConfig};
use flowstack_cli::utils::{self, StdinConfirmer};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Status => handle_status().await?,
        Commands::Backup => handle_backup()?,
        Commands::Restore {
            backup_file,
            dry_run,
            config_only,
            data_only,
            force,
        } => handle_restore(backup_file, dry_run, config_only, data_only, force)?,
        Commands::Update { backup } => handle_update(backup).await?,
        Commands::Setup => handle_setup()?,
        Commands::Logs { service, tail } => handle_logs(service, tail)?,
        Commands::Config { command } => handle_config(command)?,
    }

    Ok(())
}

async fn handle_status() -> Result<()> {
    let config = StackConfig::discover()?;
    let compose = ComposeManager::new(&config)?;
    let containers = compose.list_containers().await?;

    println!("FlowStack Status\n");
    println!("{:<25} {:<30} {:<15}", "Container", "Status", "Health");
    println!("{}", "-".repeat(70));

    for container in containers {
        let health = container.health.as_deref().unwrap_or("N/A");
        println!(
            "{:<25} {:<30} {:<15}",
            container.name, container.status, health
        );
    }

    Ok(())
}

fn handle_backup() -> Result<()> {
    let config = StackConfig::discover()?;
    let compose = ComposeManager::new(&config)?;

    let report = BackupCoordinator::new(&config, &compose).run()?;

    if !report.warnings.is_empty() {
        println!("\nCompleted with {} warning(s)", report.warnings.len());
    }

    Ok(())
}

fn handle_restore(
    backup_file: PathBuf,
    dry_run: bool,
    config_only: bool,
    data_only: bool,
    force: bool,
) -> Result<()> {
    let config = StackConfig::discover()?;
    let compose = ComposeManager::new(&config)?;
    let confirmer = StdinConfirmer;

    let mode = RestoreMode::from_flags(config_only, data_only);
    let report = RestoreCoordinator::new(&config, &compose, &confirmer).run(
        &backup_file,
        mode,
        force,
        dry_run,
    )?;

    match report.outcome {
        RestoreOutcome::Completed if !report.warnings.is_empty() => {
            println!("\nRestore finished with {} warning(s)", report.warnings.len());
        }
        RestoreOutcome::Completed => utils::ok("Restore finished"),
        RestoreOutcome::Cancelled => {}
    }

    Ok(())
}

async fn handle_update(backup: bool) -> Result<()> {
    let config = StackConfig::discover()?;
    let compose = ComposeManager::new(&config)?;
    let confirmer = StdinConfirmer;

    let report = UpdateCoordinator::new(&config, &compose, &confirmer)
        .run(backup)
        .await?;

    if report.cancelled {
        return Ok(());
    }

    if report.advisories.is_empty() {
        utils::ok("Update finished");
    } else {
        println!(
            "\nUpdate finished with {} advisory issue(s):",
            report.advisories.len()
        );
        for advisory in &report.advisories {
            println!("  - {}", advisory);
        }
    }

    Ok(())
}

fn handle_setup() -> Result<()> {
    // Setup runs before any compose file discovery can succeed, so it
    // bootstraps the current directory.
    let root = std::env::current_dir()?;
    let config = StackConfig::at(root);

    let warnings = SetupCoordinator::new(&config).run()?;
    if !warnings.is_empty() {
        println!("\nSetup finished with {} warning(s)", warnings.len());
    }

    Ok(())
}

fn handle_logs(service: String, tail: usize) -> Result<()> {
    let config = StackConfig::discover()?;
    let compose = ComposeManager::new(&config)?;

    let logs = compose.get_logs(&service, Some(tail))?;
    print!("{}", logs);

    Ok(())
}

fn handle_config(command: ConfigCommands) -> Result<()> {
    let config = StackConfig::discover()?;

    match command {
        ConfigCommands::View => {
            let env = EnvFile::load(&config.env_file)?;
            println!("Configuration ({}):\n", config.env_file.display());
            for key in env.keys() {
                if let Some(value) = env.get(&key) {
                    // Mask sensitive values
                    let display_value = if key.contains("PASSWORD")
                        || key.contains("SECRET")
                        || key.contains("KEY")
                        || key.contains("TOKEN")
                    {
                        utils::mask_sensitive(value, 2)
                    } else {
                        value.to_string()
                    };
                    println!("{}: {}", key, display_value);
                }
            }
        }
        ConfigCommands::Validate => {
            let env = EnvFile::load(&config.env_file)?;
            let mut errors = env.validate();

            if config.env_template.exists() {
                if let Ok(template) = EnvFile::load(&config.env_template) {
                    for key in env.missing_from(&template) {
                        errors.push(format!("{} is in the template but not set", key));
                    }
                }
            }

            if errors.is_empty() {
                utils::ok("Configuration is valid");
            } else {
                utils::fail("Configuration errors:");
                for error in errors {
                    println!("  - {}", error);
                }
            }
        }
    }

    Ok(())
}
