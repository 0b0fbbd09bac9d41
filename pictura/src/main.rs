#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;
mod commands;
mod store;

use std::io::IsTerminal;

use args::{Args, Command, ConfigCommand};
use clap::Parser;
use store::ConfigStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    pictura_telemetry::init(&args.log_level, std::io::stderr().is_terminal())?;

    tracing::debug!(
        project = %args.project.display(),
        config = ?args.config,
        "starting pictura"
    );

    let mut store = ConfigStore::open(&args)?;
    let project = args.project.as_path();

    match args.command {
        Command::Generate(generate) => commands::generate(&mut store, project, generate).await,
        Command::Edit(edit) => commands::edit(&mut store, project, edit).await,
        Command::Upscale(upscale) => commands::upscale(&mut store, project, upscale).await,
        Command::List { limit, filter } => commands::list(&mut store, project, limit, filter.as_deref()).await,
        Command::Delete { timestamp, slug } => commands::delete(&mut store, project, &timestamp, &slug).await,
        Command::Config(ConfigCommand::Show) => commands::config_show(&mut store).await,
        Command::Config(ConfigCommand::Set { key, value, scope }) => {
            commands::config_set(&mut store, scope.into(), &key, &value).await
        }
    }
}
