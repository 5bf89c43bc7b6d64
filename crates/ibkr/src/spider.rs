use ibkr_spider::config::Config;
use ibkr_spider::transform::Transformer;
use ibkr_spider::{catalog, persist, ContractPage, HttpFetcher, Pool};
use tracing::{debug, error, info};

/// Scrape the catalog, transform the results, and insert them into the output table.
pub(crate) async fn run(config: Config, dry_run: bool, tui: bool) -> anyhow::Result<()> {
    let time = std::time::Instant::now();

    // 1. load the tickers
    info!("initializing scraper engine");
    let tickers = catalog::load(&config.tickers_path).await?;

    // 2. scrape
    let fetcher = HttpFetcher::new(config.user_agent.as_deref(), config.request_timeout)
        .map_err(|err| {
            error!("failed to build http client, error({err})");
            err
        })?;
    let scraped = Pool::new(fetcher, ContractPage, config.pool)
        .with_tui(tui)
        .run(tickers)
        .await?;
    for failure in &scraped.failures {
        debug!("dropped: {failure}");
    }
    if tui {
        println!(
            "{} tickers scraped, {} failed",
            scraped.records.len(),
            scraped.failures.len()
        );
    }

    // 3. transform
    info!("transforming data");
    let table = Transformer::default().transform(&scraped.records);
    info!("\n{table}");

    if dry_run {
        println!("{table}");
        return Ok(());
    }

    // 4. persist
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("environment variable DATABASE_URL is not set"))?;
    let pool = persist::connect(url)?;
    let pg_client = &mut pool.get().await.map_err(|err| {
        error!("failed to connect to the database, error({err})");
        err
    })?;

    info!("inserting data into {}", config.output_table);
    let inserted = persist::insert_table(pg_client, &config.output_table, &table).await?;

    info!(
        "application completed successfully, {inserted} rows inserted, time elapsed: {:?}",
        time.elapsed()
    );

    Ok(())
}
