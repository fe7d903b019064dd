use std::collections::HashSet;
use std::future::Future;
use std::io::prelude::*;

use anyhow::Result;
use flate2::read::GzDecoder;
use futures::{pin_mut, stream, Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;

use crate::config::CrawlerConfig;
use crate::error::FetchError;
use crate::scrapable::{CrawlReport, Page, Scrapable};

/// HTTP client scoped to one run, built from a [`CrawlerConfig`].
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: CrawlerConfig,
}

impl Fetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self, FetchError> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .gzip(true)
            .deflate(true)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Downloads a page, retrying transient failures with exponential backoff.
    pub async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        self.with_retries(url, || self.fetch_once(url)).await
    }

    /// Downloads a binary resource such as an image, retrying like [`Fetcher::fetch`].
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.with_retries(url, || async move {
            let resp = self.send(url).await?;
            let bytes = resp.bytes().await.map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;
            log::debug!("Downloaded {url} ({} bytes)", bytes.len());
            Ok(bytes.to_vec())
        })
        .await
    }

    async fn with_retries<T, F, Fut>(&self, url: &str, mut attempt_once: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;
        loop {
            match attempt_once().await {
                Err(e) if e.is_transient() && attempt < self.config.retries => {
                    attempt += 1;
                    let delay = self.config.backoff(attempt);
                    log::warn!(
                        "Retrying {url} in {delay:?} ({attempt}/{}) got: {e}",
                        self.config.retries
                    );
                    tokio::time::sleep(delay).await;
                }
                res => return res,
            }
        }
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(resp)
    }

    async fn fetch_once(&self, url: &str) -> Result<Page, FetchError> {
        let network = |source| FetchError::Network {
            url: url.to_string(),
            source,
        };

        let resp = self.send(url).await?;

        let final_url = resp.url().to_string();
        let body = match resp.headers().get(CONTENT_TYPE) {
            Some(c) if c == "application/x-gzip" || c == "application/gzip" => {
                let compressed = resp.bytes().await.map_err(network)?;
                let mut gz = GzDecoder::new(&compressed[..]);
                let mut body = String::new();
                gz.read_to_string(&mut body)
                    .map_err(|source| FetchError::Decode {
                        url: url.to_string(),
                        source,
                    })?;
                body
            }
            _ => resp.text().await.map_err(network)?,
        };

        log::debug!("Downloaded {url} ({} bytes)", body.len());

        Ok(Page {
            url: url.to_string(),
            final_url,
            body,
        })
    }
}

/// Streams `(url, download result)` pairs, each URL once, in input order.
///
/// Up to `concurrent_downloads` pages are fetched ahead of the consumer.
pub fn fetch_pages<'a, I>(
    fetcher: &'a Fetcher,
    urls: I,
) -> impl Stream<Item = (String, Result<Page, FetchError>)> + 'a
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let urls = urls
        .into_iter()
        .filter(|url| {
            let fresh = seen.insert(url.clone());
            if !fresh {
                log::debug!("Skipping duplicate URL: {url}");
            }
            fresh
        })
        .collect::<Vec<_>>();

    stream::iter(urls)
        .map(move |url| async move {
            let page = fetcher.fetch(&url).await;
            (url, page)
        })
        .buffered(fetcher.config().concurrent_downloads.max(1))
}

/// Downloads every URL once, in order, and hands each page to `scraper`.
///
/// Failures are handled according to the fetcher's `on_dl_error` and
/// `on_scrap_error` policies: skipped ones end up in the report.
pub async fn crawl_pages<T, I>(
    fetcher: &Fetcher,
    urls: I,
    scraper: &mut T,
) -> Result<CrawlReport<T::Output>>
where
    T: Scrapable,
    I: IntoIterator<Item = String>,
{
    let config = fetcher.config();

    let pages = fetch_pages(fetcher, urls);
    pin_mut!(pages);

    let mut report = CrawlReport::default();

    while let Some((url, page)) = pages.next().await {
        let page = match page {
            Ok(page) => page,
            Err(e) => {
                report.skip_download(config.on_dl_error, url, e)?;
                continue;
            }
        };

        match scraper.scrap(page) {
            Ok(output) => report.outputs.push(output),
            Err(e) => report.skip_scrap(config.on_scrap_error, url, e)?,
        }
    }

    Ok(report)
}
