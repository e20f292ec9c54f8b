#[cfg(feature = "cli")]
mod cli {
    use clap::{Parser, ValueEnum};
    use nj::{nj, phylip, EngineOptions, NJConfig, NegativeLengths, Precision, Strategy};
    use std::fs;
    use std::path::PathBuf;
    use tracing_subscriber::EnvFilter;

    #[derive(Clone, Copy, Debug, ValueEnum)]
    pub enum SearchArg {
        Naive,
        Indexed,
    }

    impl From<SearchArg> for Strategy {
        fn from(s: SearchArg) -> Self {
            match s {
                SearchArg::Naive => Strategy::Naive,
                SearchArg::Indexed => Strategy::Indexed,
            }
        }
    }

    #[derive(Parser, Debug)]
    #[command(author, version, about)]
    pub struct Args {
        /// Square PHYLIP distance matrix to process
        #[arg(value_name = "PHYLIP")]
        pub input: PathBuf,

        /// Write Newick output to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        pub output: Option<PathBuf>,

        /// TOML file with engine options; flags below override it
        #[arg(short, long, value_name = "FILE")]
        pub config: Option<PathBuf>,

        /// Round branch lengths half-up to this many fractional digits (1-9)
        #[arg(short, long, value_name = "DIGITS")]
        pub precision: Option<u8>,

        /// Pair search strategy
        #[arg(short, long, value_enum)]
        pub strategy: Option<SearchArg>,

        /// Keep negative branch lengths instead of clamping them to zero
        #[arg(long)]
        pub keep_negative: bool,

        /// Log every join
        #[arg(short, long)]
        pub verbose: bool,

        /// Include internal node names in the Newick output
        #[arg(long)]
        pub show_internal: bool,
    }

    /// Options from the config file, if any, with command-line flags applied on top.
    pub fn resolve_options(args: &Args) -> Result<EngineOptions, String> {
        let mut options = match &args.config {
            Some(path) => EngineOptions::from_toml_file(path)
                .map_err(|e| format!("failed to load {}: {e}", path.display()))?,
            None => EngineOptions::default(),
        };
        if let Some(digits) = args.precision {
            options.precision = Some(Precision::new(digits).map_err(|e| e.to_string())?);
        }
        if let Some(s) = args.strategy {
            options.strategy = s.into();
        }
        if args.keep_negative {
            options.negative_lengths = NegativeLengths::Keep;
        }
        options.verbose |= args.verbose;
        Ok(options)
    }

    fn init_tracing(verbose: bool) {
        let default = if verbose { "info" } else { "warn" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    pub fn run() -> Result<(), String> {
        let args = Args::parse();
        let options = resolve_options(&args)?;
        init_tracing(options.verbose);

        let text = fs::read_to_string(&args.input)
            .map_err(|e| format!("failed to read {}: {e}", args.input.display()))?;
        let matrix = phylip::parse(&text).map_err(|e| e.to_string())?;
        tracing::debug!(taxa = matrix.labels.len(), "read {}", args.input.display());

        let newick_tree = nj(NJConfig {
            labels: matrix.labels,
            distances: matrix.rows,
            options,
            hide_internal: !args.show_internal,
        })
        .map_err(|e| format!("neighbor-joining failed: {e}"))?;

        if let Some(path) = args.output {
            fs::write(&path, format!("{newick_tree}\n"))
                .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        } else {
            println!("{newick_tree}");
        }
        Ok(())
    }
}

fn main() -> Result<(), String> {
    #[cfg(feature = "cli")]
    {
        cli::run()
    }
    #[cfg(not(feature = "cli"))]
    {
        println!("CLI not enabled. Rebuild with --features cli");
        Ok(())
    }
}
