//! `callscope` command line.

mod cli_logger;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use callscope::{
    ArchiveCommand, Config, DEFAULT_CONFIG_FILE, GraphArgs, RenderArgs, RewriteArgs, SAMPLE_PROFILE_JSON,
    archive_command, graph_command, render_command, rewrite_command, schema_doc,
};
use cli_logger::CliLogger;

#[derive(Debug, Parser)]
#[command(name = "callscope", version, about = "Render speedscope profiles as Mermaid call graphs")]
struct Cli {
    /// Config file; `callscope.toml` is read when present if unset.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Machine-readable output.
    #[arg(long, global = true)]
    json: bool,
    #[arg(long, global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a profile as a Mermaid flowchart.
    Render(RenderArgs),
    /// Print the compiled callgraph model.
    Graph(GraphArgs),
    /// Apply redaction rules and an optional name to raw profile JSON.
    Rewrite(RewriteArgs),
    /// Record or list archived sessions.
    #[command(subcommand)]
    Archive(ArchiveCommand),
    /// Print the built-in sample profile.
    Sample,
    /// Describe the variables available to templates.
    Schema,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let logger = CliLogger::new(cli.json, cli.no_color);
    match run(&cli, &logger) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logger.print_error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli, logger: &CliLogger) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;
    tracing::debug!(
        "loaded config from {}",
        cli.config.as_deref().unwrap_or(Path::new(DEFAULT_CONFIG_FILE)).display()
    );

    match &cli.command {
        Command::Render(args) => logger.print_render(&render_command(&config, args)?),
        Command::Graph(args) => logger.print_serialized(&graph_command(&config, args)?),
        Command::Rewrite(args) => {
            let rewritten = rewrite_command(&config, args)?;
            if args.out.is_some() {
                return Ok(());
            }
            logger.print_text(&rewritten)
        }
        Command::Archive(command) => logger.print_serialized(&archive_command(&config, command)?),
        Command::Sample => logger.print_text(SAMPLE_PROFILE_JSON),
        Command::Schema => logger.print_schema(&schema_doc()),
    }
}
