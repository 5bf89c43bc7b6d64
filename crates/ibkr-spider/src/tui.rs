use indicatif::style::TemplateError;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Total / successes / failures bars for a scrape; every bar is hidden when `tui` is off.
#[derive(Clone, Debug)]
pub(crate) struct Progress {
    total: ProgressBar,
    success: ProgressBar,
    fail: ProgressBar,
}

impl Progress {
    pub(crate) fn new(len: usize, tui: bool) -> Result<Self, TemplateError> {
        if !tui {
            return Ok(Self {
                total: ProgressBar::hidden(),
                success: ProgressBar::hidden(),
                fail: ProgressBar::hidden(),
            });
        }

        // overall multi progress bar
        let multi = MultiProgress::new();

        // total number of tickers to collect
        let total = multi.add(
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.magenta}\n \
                        {msg:>9.white} |{bar:57.white/grey}| {pos:<2} / {human_len} \
                        ({percent_precise}%) [Time: {elapsed}, Rate: {per_sec}, ETA: {eta}]",
                    )?
                    .progress_chars("## "),
            ),
        );
        total.set_message("total");
        total.enable_steady_tick(Duration::from_millis(100));

        // successful merges
        let success = multi.insert_after(
            &total,
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(" {msg:>9.green} |{bar:57.green}| {pos:<2.green}")?
                    .progress_chars("## "),
            ),
        );
        success.set_message("successes");

        // dropped tickers
        let fail = multi.insert_after(
            &success,
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(" {msg:>9.red} |{bar:57.red}| {pos:<2.red}")?
                    .progress_chars("## "),
            ),
        );
        fail.set_message("failures");

        Ok(Self {
            total,
            success,
            fail,
        })
    }

    pub(crate) fn success(&self) {
        self.success.inc(1);
        self.total.inc(1);
    }

    pub(crate) fn fail(&self) {
        self.fail.inc(1);
        self.total.inc(1);
    }

    /// A duplicate: counted towards the total only.
    pub(crate) fn skip(&self) {
        self.total.inc(1);
    }

    pub(crate) fn finish(&self) {
        self.total.finish_and_clear();
        self.success.finish_and_clear();
        self.fail.finish_and_clear();
    }
}
