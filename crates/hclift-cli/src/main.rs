//! hclift CLI - upgrade legacy JSON build templates to HCL2

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "hclift")]
#[command(author = "hclift Contributors")]
#[command(version)]
#[command(about = "Upgrade legacy JSON build templates to HCL2", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a JSON template to an HCL2 configuration file
    Upgrade {
        /// JSON template path
        template: PathBuf,

        /// Output file (default: <TEMPLATE>.pkr.hcl)
        #[arg(short = 'o', long = "output-file")]
        output_file: Option<PathBuf>,

        /// Accept an additional builder type, e.g. from a plugin
        #[arg(long = "allow-builder", value_name = "TYPE")]
        allow_builder: Vec<String>,

        /// Print the generated configuration instead of writing it
        #[arg(long)]
        dry_run: bool,

        /// Overwrite the output file if it exists
        #[arg(long)]
        force: bool,
    },

    /// List the legacy template calls and how they are upgraded
    Calls,
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(exit_codes::USAGE_ERROR);
        }
    };

    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Upgrade {
            template,
            output_file,
            allow_builder,
            dry_run,
            force,
        } => commands::upgrade::run(
            &template,
            output_file.as_deref(),
            allow_builder,
            dry_run,
            force,
        ),
        Commands::Calls => commands::calls::run(),
    };

    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{:?}", miette::Report::new(e));
            std::process::exit(code);
        }
    }
}

/// Log to stderr; `RUST_LOG` wins over `--debug`
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
