// Command-line surface of the settlement-engine binary

mod args;

pub use args::{CliArgs, ProcessingMode};

use clap::Parser;

/// Parse command-line arguments using clap
///
/// On invalid arguments or `--help`, clap prints the message and exits.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
