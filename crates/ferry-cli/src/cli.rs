use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ferryd",
    about = "Ferry — concurrent file-transfer server",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the transfer server
    Serve(ServeArgs),
    /// Print the resolved configuration and exit
    CheckConfig(ServeArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Listen address; overrides the config file
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Storage directory; overrides the config file
    #[arg(long)]
    pub root: Option<PathBuf>,
}
