use crate::config::OnError;
use crate::error::FetchError;

/// Per-page scraping logic driven by [`crawl_pages`](crate::crawl_pages).
pub trait Scrapable {
    type Output;

    fn scrap(&mut self, page: Page) -> anyhow::Result<Self::Output>;
}

/// A downloaded HTML page.
#[derive(Debug, Clone)]
pub struct Page {
    /// The URL that was requested
    pub url: String,
    /// The URL the page was served from, after redirects
    pub final_url: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub url: String,
    pub reason: String,
}

/// What a run produced, in input order, and what it had to skip.
#[derive(Debug, Clone)]
pub struct CrawlReport<T> {
    pub outputs: Vec<T>,
    pub failures: Vec<Failure>,
}

impl<T> Default for CrawlReport<T> {
    fn default() -> Self {
        Self {
            outputs: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> CrawlReport<T> {
    pub fn attempted(&self) -> usize {
        self.outputs.len() + self.failures.len()
    }

    /// True when there was work to do and none of it succeeded.
    pub fn all_failed(&self) -> bool {
        self.outputs.is_empty() && !self.failures.is_empty()
    }

    /// Records a failed download, or aborts the run under [`OnError::Fail`].
    pub fn skip_download(
        &mut self,
        policy: OnError,
        url: String,
        error: FetchError,
    ) -> anyhow::Result<()> {
        match policy {
            OnError::SkipAndLog => {
                log::warn!("Skipping URL: {error}");
                self.failures.push(Failure {
                    url,
                    reason: error.to_string(),
                });
                Ok(())
            }
            OnError::Fail => Err(error.into()),
        }
    }

    /// Records a page that couldn't be processed, or aborts the run under [`OnError::Fail`].
    pub fn skip_scrap(
        &mut self,
        policy: OnError,
        url: String,
        error: anyhow::Error,
    ) -> anyhow::Result<()> {
        match policy {
            OnError::SkipAndLog => {
                log::error!("Skipping scrap for page {url} got: {error:#}");
                self.failures.push(Failure {
                    url,
                    reason: format!("{error:#}"),
                });
                Ok(())
            }
            OnError::Fail => Err(error.context(format!("Couldn't scrap {url}"))),
        }
    }
}
