/// Fatal error taxonomy for coordinator runs
///
/// Advisory failures are not errors: they are logged as warnings and
/// collected into the run reports without changing the exit code.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StackError {
    #[error("required tool missing or not functional: {0}")]
    Environment(String),

    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unexpected archive layout: {0}")]
    InvalidFormat(String),
}
