pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sigvault")]
#[command(about = "An encrypted file vault you can recover from a signature")]
pub struct Args {
    /// Path to the sigvault state directory (defaults to ~/.sigvault)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Signature the vault keys are derived from
    #[arg(long, global = true, env = "SIGVAULT_SIGNATURE", hide_env_values = true)]
    pub signature: Option<String>,

    #[command(subcommand)]
    pub command: crate::Command,
}
