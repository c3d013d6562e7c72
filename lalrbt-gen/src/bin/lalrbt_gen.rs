//! Command-line interface for the `lalrbt-gen` table generator.
//!
//! Reads a `.g` grammar and writes `<name>.rs` with the generated tables.

#[cfg(feature = "cli")]
mod real {
    use clap::Parser;
    use lalrbt_gen::GenOptions;
    use std::path::PathBuf;

    #[derive(Parser)]
    #[command(about = "Generate LALR(1) parse tables from a grammar")]
    struct Args {
        /// Path to the input grammar file
        #[arg(short = 'g', long)]
        grammar: PathBuf,

        /// Path to the output directory.
        #[arg(short = 'o', long)]
        output_dir: PathBuf,

        /// Output file name, without the `.rs` extension
        #[arg(short = 'n', long)]
        name: String,

        /// Resolve conflicts to their first alternative instead of keeping
        /// them for a backtracking parser.
        #[arg(long)]
        no_backtrack: bool,

        /// Include item sets with lookaheads in the output.
        #[arg(short = 'd', long)]
        debug: bool,
    }

    pub fn main() -> anyhow::Result<()> {
        env_logger::init();
        let args = Args::parse();
        let options = GenOptions {
            backtrack: !args.no_backtrack,
            debug: args.debug,
        };
        lalrbt_gen::generate(args.grammar, args.output_dir, args.name, &options)
    }
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    real::main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("lalrbt-gen disabled (compiled without `cli` feature)");
}
