pub mod app_config;
pub mod confirm;
pub mod constants;
pub mod helpers;

pub use app_config::AppConfig;
pub use confirm::{Confirmer, StdinConfirmer};
pub use constants::*;
pub use helpers::*;
