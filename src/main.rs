use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, TrackerCmd};
use colored::Colorize;
use ironlog::{
    config::{Config, Settings},
    logging::{self, LogFormat},
    types::OutputFmt,
};

mod cli;
mod commands;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let fmt = OutputFmt::from_flag(cli.json);

    let config_path = Config::default_path()?;
    let cfg = Config::load(&config_path)?;

    // Config editing must work even when the stored values don't parse.
    let cmd = match cli.cmd {
        Commands::Config(cmd) => {
            logging::init(None, LogFormat::from_env());
            return commands::config::handle(cmd, &config_path, cfg);
        }
        Commands::Tracker(cmd) => cmd,
    };

    let settings = Settings::from_env(&cfg)?;
    logging::init(settings.log_level.as_deref(), LogFormat::from_env());

    let app = commands::App::open(settings, fmt).await?;

    match cmd {
        TrackerCmd::Session(cmd) => commands::session::handle(cmd, &app).await?,
        TrackerCmd::Exercise(cmd) => commands::exercise::handle(cmd, &app).await?,
        TrackerCmd::Routine(cmd) => commands::routine::handle(cmd, &app).await?,
        TrackerCmd::History(cmd) => commands::history::handle(cmd, &app).await?,
        TrackerCmd::Weight(cmd) => commands::weight::handle(cmd, &app).await?,
        TrackerCmd::Status => commands::status::handle(&app).await?,
        TrackerCmd::Onboard => commands::onboard::handle(&app).await?,
        TrackerCmd::Ai(cmd) => commands::ai::handle(cmd, &app).await?,
        TrackerCmd::Serve { addr } => commands::ai::serve(addr, &app).await?,
    }

    Ok(())
}
