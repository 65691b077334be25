/// FlowStack service definitions and constants
///
/// Mirrors the service topology declared in the deployment's
/// docker-compose.yml: the workflow engine and the Traefik reverse proxy.

/// Service definition
#[derive(Debug, Clone)]
pub struct Service {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub health_endpoint: Option<&'static str>,
    pub critical: bool,
}

/// Compose service name of the workflow engine
pub const ENGINE_SERVICE: &str = "engine";

/// Compose service name of the reverse proxy
pub const PROXY_SERVICE: &str = "traefik";

/// All managed services
pub fn get_services() -> Vec<Service> {
    vec![
        Service {
            name: ENGINE_SERVICE,
            display_name: "Workflow Engine",
            description: "FlowStack workflow automation server",
            health_endpoint: Some("http://localhost:5678/healthz"),
            critical: true,
        },
        Service {
            name: PROXY_SERVICE,
            display_name: "Traefik (Reverse Proxy)",
            description: "TLS termination and routing for the engine",
            health_endpoint: Some("http://localhost:8080/ping"),
            critical: false,
        },
    ]
}

/// Admin CLI shipped inside the engine image
pub const ENGINE_BIN: &str = "flowd";

/// Export/import commands of the in-container admin CLI. Exports print JSON
/// on stdout; the import reads JSON from stdin.
pub const EXPORT_WORKFLOWS_ARGS: &[&str] = &[ENGINE_BIN, "export", "workflows", "--all"];
pub const EXPORT_CREDENTIALS_ARGS: &[&str] = &[ENGINE_BIN, "export", "credentials", "--all"];
pub const IMPORT_WORKFLOWS_ARGS: &[&str] = &[ENGINE_BIN, "import", "workflows"];
pub const ENGINE_VERSION_ARGS: &[&str] = &[ENGINE_BIN, "--version"];
pub const PROXY_VERSION_ARGS: &[&str] = &["traefik", "version"];

/// Backup archive naming
pub const BACKUP_PREFIX: &str = "flowstack_backup";
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Names inside a backup bundle
pub const DATA_ARCHIVE_NAME: &str = "flowstack_data.tar.gz";
pub const CERTS_ARCHIVE_NAME: &str = "flowstack_certs.tar.gz";
pub const MANIFEST_NAME: &str = "MANIFEST.txt";
pub const WORKFLOWS_EXPORT_DIR: &str = "workflows";
pub const WORKFLOWS_EXPORT_FILE: &str = "workflows.json";
pub const CREDENTIALS_EXPORT_DIR: &str = "credentials";
pub const CREDENTIALS_EXPORT_FILE: &str = "credentials.json";

/// Retention
pub const DEFAULT_KEEP_COUNT: usize = 7;
pub const KEEP_COUNT_KEY: &str = "BACKUP_KEEP_COUNT";

/// Rename-aside history kept per restored directory
pub const ASIDE_KEEP_COUNT: usize = 3;
pub const ASIDE_SUFFIX: &str = "pre-restore";

/// Default paths, relative to the project root
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";
pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_ENV_TEMPLATE: &str = ".env.example";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_BACKUP_DIR: &str = "backups";
pub const DEFAULT_CERTS_DIR: &str = "certs";

/// Shared docker network created at setup time
pub const DOCKER_NETWORK: &str = "flowstack";

/// Health polling after an update: 30 attempts x 10s, about 5 minutes
pub const HEALTH_POLL_ATTEMPTS: u32 = 30;
pub const HEALTH_POLL_INTERVAL_SECS: u64 = 10;

/// Grace period between starting services and checking them after a restore
pub const RESTORE_GRACE_SECS: u64 = 10;

/// Placeholder version string for services that are not running
pub const VERSION_UNAVAILABLE: &str = "unavailable";

/// Keys that must be present in a usable .env
pub const REQUIRED_ENV_KEYS: &[&str] = &["DOMAIN", "ACME_EMAIL"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_definitions() {
        let services = get_services();
        assert!(services.iter().any(|s| s.name == ENGINE_SERVICE));
        assert!(services.iter().any(|s| s.name == PROXY_SERVICE));
        assert!(services.iter().find(|s| s.name == ENGINE_SERVICE).unwrap().critical);
    }

    #[test]
    fn test_export_commands_use_engine_binary() {
        assert_eq!(EXPORT_WORKFLOWS_ARGS[0], ENGINE_BIN);
        assert_eq!(EXPORT_CREDENTIALS_ARGS[0], ENGINE_BIN);
        assert_eq!(IMPORT_WORKFLOWS_ARGS[0], ENGINE_BIN);
    }
}
