mod context;
mod install;
mod prompt;
mod publish;
mod sign;
mod uninstall;
mod verify;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;

use context::GlobalArgs;
use prompt::Interrupted;

#[derive(Parser, Debug)]
#[command(name = "qpx")]
#[command(about = "Install, sign and verify qpm packages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Working directory
    #[arg(short = 'd', long, default_value = ".", global = true)]
    working_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install packages, or every dependency listed in qpm.json
    Install(install::InstallArgs),

    /// Remove a package from the vendor directory and qpm.json
    Uninstall(uninstall::UninstallArgs),

    /// Create a detached signature for the package in the working directory
    Sign(sign::SignArgs),

    /// Check the signature of the working directory or an installed package
    Verify(verify::VerifyArgs),

    /// Publish the package in the working directory to the registry
    Publish(publish::PublishArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let global = GlobalArgs {
        verbose: cli.verbose,
        quiet: cli.quiet,
        working_dir: cli.working_dir,
    };

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| anyhow::anyhow!("Failed to create async runtime: {}", e))?;

    match cli.command {
        Commands::Install(args) => rt.block_on(install::execute(args, &global)),
        Commands::Uninstall(args) => uninstall::execute(args, &global),
        Commands::Sign(args) => rt.block_on(sign::execute(args, &global)),
        Commands::Verify(args) => verify::execute(args, &global),
        Commands::Publish(args) => rt.block_on(publish::execute(args, &global)),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) if e.is::<Interrupted>() => ExitCode::from(130),
        Err(e) => {
            eprintln!("{} {}", style("ERROR:").red().bold(), e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
