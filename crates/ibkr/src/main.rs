mod cli;
mod spider;

// remote imports
use clap::Parser;
use cli::{Cli, TraceLevel};
use ibkr_spider::config::Config;
use ibkr_spider::extract::{ContractPage, Extract as _};
use tracing::{subscriber, trace, Level};
use tracing_subscriber::FmtSubscriber;

////////////////////////////////////////////////////////////////////////////

// preproccess the trace level, and open the .env file
fn preprocess(trace_level: Level) -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let my_subscriber = FmtSubscriber::builder()
        .with_max_level(trace_level)
        .finish();
    subscriber::set_global_default(my_subscriber)?;
    Ok(())
}

////////////////////////////////////////////////////////////////////////////

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // set the trace level
    if let Some(trace_level) = cli.trace {
        preprocess(match trace_level {
            TraceLevel::DEBUG => Level::DEBUG,
            TraceLevel::ERROR => Level::ERROR,
            TraceLevel::INFO => Level::INFO,
            TraceLevel::TRACE => Level::TRACE,
            TraceLevel::WARN => Level::WARN,
        })?;
    }
    trace!("command line input recorded: {cli:?}");

    // if no trace level provided, use tui
    let tui = cli.trace.is_none();

    // read cli inputs
    use cli::Commands::*;
    match cli.command {
        // `ibkr spider`: scrape the catalog
        Spider {
            tickers,
            threads,
            workers,
            table,
            dry_run,
        } => {
            let mut config = Config::from_env()?;
            if let Some(tickers) = tickers {
                config.tickers_path = tickers;
            }
            if let Some(table) = table {
                config.output_table = table;
            }
            config.pool = ibkr_spider::PoolConfig::new(
                workers.unwrap_or(config.pool.outer),
                threads.unwrap_or(config.pool.inner),
            );

            spider::run(config, dry_run, tui).await?;
        }

        // `ibkr extract <path>`: check a saved page
        Extract { path } => {
            let content = tokio::fs::read_to_string(&path).await?;
            let fields = ContractPage.extract(&content)?;
            for (name, value) in fields {
                println!("{name:>16}: {value}");
            }
        }
    }

    Ok(())
}
