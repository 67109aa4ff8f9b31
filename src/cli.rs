use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "gaffer")]
#[command(version)]
#[command(about = "Declarative host provisioning", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest to apply when no subcommand is given
    #[arg(value_name = "MANIFEST")]
    pub manifest: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply a manifest once (this is the default action)
    #[command(alias = "install")]
    Apply(ApplyArgs),

    /// Run cadence and remote-triggered targets until shut down
    Serve(ServeArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
pub struct ApplyArgs {
    /// Manifest location: local path, HTTP(S) URL, or s3:// URI
    #[arg(default_value = "/etc/gaffer/manifest.yml", env = "GAFFER_MANIFEST")]
    pub manifest: String,
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Server configuration file
    #[arg(
        short,
        long,
        default_value = "/etc/gaffer/server.yml",
        env = "GAFFER_SERVER_CONFIG"
    )]
    pub config: String,
}
