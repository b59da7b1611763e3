//! Command-line interface.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`transform`] - The transform command

pub mod args;
pub mod transform;

pub use args::Cli;
pub use transform::TransformCommand;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }
}
