//! Command-line interface for lalrbt-java.
//!
//! Parses a Java source file, or a fragment of one with `--entry`, and
//! prints the syntax tree or the diagnostic. The exit status is 1 when the
//! input is rejected.

use clap::{Parser as ClapParser, Subcommand};
use lalrbt::{Deadline, Monitor};
use lalrbt_java::{JavaEntry, JavaParser, ParseOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Command
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parses a Java source file
    Parse {
        /// Input file
        input: PathBuf,

        /// Nonterminal to parse the input as (compilation-unit,
        /// method-declaration, class-body-declarations, block-statements,
        /// expression)
        #[arg(short, long, default_value = "compilation-unit")]
        entry: JavaEntry,

        /// Tokens the parser may substitute to get past errors
        #[arg(short, long, default_value_t = 0)]
        budget: usize,

        /// Gives up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Prints the syntax tree of an accepted parse
        #[arg(short, long)]
        tree: bool,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Parse {
            input,
            entry,
            budget,
            timeout_ms,
            tree,
        } => {
            let source = std::fs::read_to_string(&input)?;
            let parser = JavaParser::try_new()?;
            let options = ParseOptions {
                error_repair_budget: budget,
                entry,
            };
            let deadline = timeout_ms.map(|ms| Deadline::after(Duration::from_millis(ms)));
            let parse = parser.parse_with_monitor(&source, &options, deadline.as_ref().map(|d| d as &dyn Monitor))?;
            if let Some(report) = parse.report(&parser) {
                eprintln!("{}:{report}", input.display());
                return Ok(ExitCode::from(1));
            }
            for (&index, &terminal) in parse.repairs().into_iter().flatten() {
                let span = parse.stream().token_span(index);
                eprintln!(
                    "{}:{}: read `{}` as `{}`",
                    input.display(),
                    span.start,
                    parse.stream().text(index),
                    parser.table().spelling(terminal)
                );
            }
            if tree {
                print!("{}", parse.dump().unwrap_or_default());
            }
            let stats = parse.stats();
            log::info!(
                "{} tokens, {} shifts, {} reductions, {} ambiguities, {} backtracks",
                stats.tokens,
                stats.shifts,
                stats.reductions,
                stats.ambigs,
                stats.backtracks
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
