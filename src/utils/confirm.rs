/// Interactive confirmation for destructive operations
///
/// Injected into the coordinators so non-interactive callers and tests can
/// substitute their own policy.

use anyhow::Result;
use std::io::{self, Write};

#[cfg_attr(test, mockall::automock)]
pub trait Confirmer {
    /// Ask the operator to approve a destructive action.
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Reads from stdin and approves only on the literal answer "yes".
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        print!("{} Type 'yes' to continue: ", prompt);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().eq_ignore_ascii_case("yes"))
    }
}
