use anyhow::Context;

use ferry_server::{Server, ServerConfig};

use crate::cli::{Cli, Command, ServeArgs};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => serve(&args),
        Command::CheckConfig(args) => check_config(&args),
    }
}

/// Config file first, then flag overrides on top.
fn resolve_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(root) = &args.root {
        config.storage_root = root.clone();
    }
    Ok(config)
}

fn serve(args: &ServeArgs) -> anyhow::Result<()> {
    let config = resolve_config(args)?;
    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
    runtime
        .block_on(Server::new(config).serve())
        .context("server exited with an error")
}

fn check_config(args: &ServeArgs) -> anyhow::Result<()> {
    let config = resolve_config(args)?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
