use crate::descriptor::TickerDescriptor;
use crate::error::{PoolError, TaskError};
use crate::extract::Extract;
use crate::fetch::Fetch;
use crate::store::{Claim, ResultStore, Shared};
use crate::tui::Progress;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

/// Inner tier fan-out when nothing is configured.
pub const DEFAULT_THREADS: usize = 8;

/// Shape of the worker pool: `outer` parallel units, each running `inner` concurrent workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub outer: usize,
    pub inner: usize,
}

impl PoolConfig {
    /// Both tiers are clamped to at least one worker.
    pub fn new(outer: usize, inner: usize) -> Self {
        Self {
            outer: outer.max(1),
            inner: inner.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.outer * self.inner
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(num_cpus::get(), DEFAULT_THREADS)
    }
}

/// Everything a run produced.
#[derive(Debug, Default)]
pub struct Scraped {
    /// One merged record per ticker that was fetched and parsed.
    pub records: ResultStore,
    /// Tickers that were dropped, and why.
    pub failures: Vec<TaskError>,
    /// Tasks taken off the queue; always the number of tickers seeded.
    pub claimed: usize,
    /// Tasks discarded because their key was already merged.
    pub duplicates: usize,
}

/// The two-tier scrape engine.
///
/// Every worker shares one queue and one result store behind one lock. A worker loops
/// claim → fetch → parse → merge until the queue is empty; the lock is only held to pop a task
/// or to merge a result, never across a fetch.
pub struct Pool<F, E> {
    fetcher: Arc<F>,
    extractor: Arc<E>,
    config: PoolConfig,
    tui: bool,
}

// state handed to every worker of a run
struct Context<F, E> {
    shared: Mutex<Shared>,
    fetcher: Arc<F>,
    extractor: Arc<E>,
    progress: Progress,
}

impl<F: Fetch, E: Extract> Pool<F, E> {
    pub fn new(fetcher: F, extractor: E, config: PoolConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            config,
            tui: false,
        }
    }

    /// Show progress bars while running.
    pub fn with_tui(mut self, tui: bool) -> Self {
        self.tui = tui;
        self
    }

    /// Scrape every ticker once, best effort.
    ///
    /// A ticker that fails to fetch or parse is logged and left out of the records; only a
    /// worker that fails to run to completion aborts the run.
    pub async fn run(&self, tickers: Vec<TickerDescriptor>) -> Result<Scraped, PoolError> {
        let time = std::time::Instant::now();
        info!("scrape started, {} tickers", tickers.len());

        let context = Arc::new(Context {
            progress: Progress::new(tickers.len(), self.tui)?,
            shared: Mutex::new(Shared::seed(tickers)),
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
        });

        info!(
            "starting {} workers ({} units x {} workers each)",
            self.config.workers(),
            self.config.outer,
            self.config.inner
        );
        let mut units = JoinSet::new();
        for i in 0..self.config.outer {
            let name = format!("unit-{i}");
            units.spawn(unit(name, self.config.inner, context.clone()));
        }

        // dropping `units` on error aborts every other worker
        let mut duplicates = 0;
        while let Some(joined) = units.join_next().await {
            duplicates += joined.map_err(|source| PoolError::Join {
                worker: "unit".to_string(),
                source,
            })??;
        }
        context.progress.finish();

        let Shared {
            queue,
            store,
            failures,
        } = std::mem::take(&mut *context.shared.lock().await);

        info!(
            "scrape finished: {} merged, {} failed, {} duplicates. {}",
            store.len(),
            failures.len(),
            duplicates,
            crate::time_elapsed(time)
        );

        Ok(Scraped {
            records: store,
            failures,
            claimed: queue.served(),
            duplicates,
        })
    }
}

// one outer unit: spawn the inner workers and wait for all of them
async fn unit<F: Fetch, E: Extract>(
    name: String,
    inner: usize,
    context: Arc<Context<F, E>>,
) -> Result<usize, PoolError> {
    let mut workers = JoinSet::new();
    for t in 0..inner {
        let worker_name = format!("{name}-T{t}");
        workers.spawn(worker(worker_name, context.clone()));
        trace!("{name}: started worker {t}");
    }

    let mut duplicates = 0;
    while let Some(joined) = workers.join_next().await {
        duplicates += joined.map_err(|source| PoolError::Join {
            worker: format!("{name} worker"),
            source,
        })?;
    }

    debug!("{name} has finished");
    Ok(duplicates)
}

// claim → fetch → parse → merge, until the queue is empty; returns the duplicates discarded
async fn worker<F: Fetch, E: Extract>(name: String, context: Arc<Context<F, E>>) -> usize {
    debug!("{name}: started");
    let mut duplicates = 0;

    loop {
        let claim = context.shared.lock().await.claim();
        let ticker = match claim {
            Claim::Task(ticker) => ticker,
            Claim::Duplicate(ticker) => {
                debug!("{name}: skipping duplicate ticker {}", ticker.key());
                duplicates += 1;
                context.progress.skip();
                continue;
            }
            Claim::Done => {
                debug!("{name}: no more tasks");
                break;
            }
        };
        let key = ticker.key();

        // network I/O and parsing happen outside the lock
        debug!("{name}: fetching contract for {key}");
        let result = match context.fetcher.fetch(&ticker.url).await {
            Ok(content) => context
                .extractor
                .extract(&content)
                .map_err(|source| TaskError::Parse {
                    key: key.clone(),
                    source,
                }),
            Err(source) => Err(TaskError::Fetch {
                key: key.clone(),
                source,
            }),
        };

        let fields = match result {
            Ok(fields) => fields,
            Err(err) => {
                warn!("{name}: {err}");
                context.shared.lock().await.fail(err);
                context.progress.fail();
                continue;
            }
        };

        let merged = context.shared.lock().await.merge(&ticker, &fields);
        if merged {
            debug!("{name}: fetched data for {key}");
            context.progress.success();
        } else {
            debug!("{name}: discarding duplicate result for {key}");
            duplicates += 1;
            context.progress.skip();
        }
    }

    duplicates
}
