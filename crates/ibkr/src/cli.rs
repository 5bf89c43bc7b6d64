use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets the level of tracing.
    ///
    /// Without it, progress bars are shown instead of logs.
    #[arg(short, long, global = true)]
    pub trace: Option<TraceLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scrape every ticker in the catalog and insert the results into PostgreSQL.
    Spider {
        /// Ticker catalog (JSON); overrides TICKERS_PATH.
        #[arg(long)]
        tickers: Option<PathBuf>,

        /// Workers per unit; overrides THREAD_COUNT.
        #[arg(long)]
        threads: Option<usize>,

        /// Parallel units; overrides PROCESS_COUNT (defaults to the number of CPUs).
        #[arg(long)]
        workers: Option<usize>,

        /// Destination table; overrides OUTPUT_TABLE.
        #[arg(long)]
        table: Option<String>,

        /// Print the transformed table instead of inserting it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Extract the fields of a saved contract page.
    Extract {
        /// Path to an HTML file.
        path: PathBuf,
    },
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
#[clap(rename_all = "UPPERCASE")]
pub enum TraceLevel {
    DEBUG,
    ERROR,
    INFO,
    TRACE,
    WARN,
}
