//! Command trait definition for CLI commands.
//!
//! Subcommands are dispatched through [`Command`] with `enum_dispatch`.

use anyhow::Result;
use enum_dispatch::enum_dispatch;

/// Trait implemented by all fraguniq CLI commands.
///
/// `command_line` is the full invocation, recorded in the output `@PG` line.
#[enum_dispatch]
pub trait Command {
    #[allow(clippy::missing_errors_doc)]
    fn execute(&self, command_line: &str) -> Result<()>;
}
