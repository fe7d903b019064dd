use std::path::PathBuf;

use anyhow::Context;
use evodex_crawler::{crawl_pages, Failure, Fetcher, Page, Scrapable};
use scraper::Html;
use url::Url;

use crate::error::ParseError;
use crate::evolution::{self, EvoChain};
use crate::site;
use crate::url_list::write_url_list;

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub listing_url: String,
    pub output_file: PathBuf,
    /// Decide from the listing's chains alone instead of visiting every detail page
    pub from_listing: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            listing_url: site::EVOLUTION_URL.to_string(),
            output_file: PathBuf::from(site::DEFAULT_URL_LIST),
            from_listing: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectReport {
    /// Species found on the listing
    pub candidates: usize,
    /// Fully evolved species URLs, as written to the list file
    pub fully_evolved: Vec<String>,
    pub failures: Vec<Failure>,
}

/// Link Collector: writes the URL of every fully evolved species to
/// `config.output_file`.
///
/// Failing to download the listing, or finding no evolution chain on it,
/// aborts the run before the list is written. A failing detail page is
/// skipped.
pub async fn collect(fetcher: &Fetcher, config: &CollectorConfig) -> anyhow::Result<CollectReport> {
    let listing = fetcher
        .fetch(&config.listing_url)
        .await
        .with_context(|| format!("Couldn't reach listing {}", config.listing_url))?;

    let base = Url::parse(&listing.final_url)
        .with_context(|| format!("Invalid listing URL {}", listing.final_url))?;
    let chains = listing_chains(&listing.body, &base);
    if chains.is_empty() {
        return Err(ParseError::EmptyListing(config.listing_url.clone()).into());
    }
    log::info!(
        "Found {} evolution chains on {}",
        chains.len(),
        config.listing_url
    );

    let candidates = evolution::candidates(&chains);
    let mut report = CollectReport {
        candidates: candidates.len(),
        ..Default::default()
    };

    if config.from_listing {
        report.fully_evolved = evolution::terminal_candidates(&chains)
            .into_iter()
            .map(String::from)
            .collect();
    } else {
        let urls = candidates.into_iter().map(String::from);
        let crawled = crawl_pages(fetcher, urls, &mut DetailPageScraper).await?;
        report.fully_evolved = crawled.outputs.into_iter().flatten().collect();
        report.failures = crawled.failures;
    }

    if report.fully_evolved.is_empty() {
        log::warn!(
            "No fully evolved species collected out of {} candidates, the site markup may have changed",
            report.candidates
        );
    }

    write_url_list(&config.output_file, &report.fully_evolved).with_context(|| {
        format!("Couldn't write URL list {}", config.output_file.display())
    })?;
    log::info!(
        "Saved {} URLs to {}",
        report.fully_evolved.len(),
        config.output_file.display()
    );

    Ok(report)
}

/// Chains of the listing page, skipping the malformed ones.
fn listing_chains(body: &str, base: &Url) -> Vec<EvoChain> {
    let doc = Html::parse_document(body);
    evolution::parse_chains(&doc, base)
        .into_iter()
        .enumerate()
        .filter_map(|(i, chain)| {
            chain
                .map_err(|e| log::warn!("Skipping evolution chain #{} of {base}: {e}", i + 1))
                .ok()
        })
        .collect()
}

/// Keeps a detail page's URL when its chains show no later stage for it.
struct DetailPageScraper;

impl Scrapable for DetailPageScraper {
    type Output = Option<String>;

    fn scrap(&mut self, page: Page) -> anyhow::Result<Option<String>> {
        let base = Url::parse(&page.final_url)?;
        let path = base.path();

        let doc = Html::parse_document(&page.body);
        let parsed = evolution::parse_chains(&doc, &base);

        // Candidates come from listing chains, so their page must show one.
        if parsed.is_empty() {
            return Err(ParseError::MissingChain(page.url).into());
        }

        let mut chains = Vec::with_capacity(parsed.len());
        let mut first_err = None;
        for chain in parsed {
            match chain {
                Ok(chain) => chains.push(chain),
                Err(e) => {
                    log::debug!("Ignoring malformed chain on {}: {e}", page.url);
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }

        match evolution::is_fully_evolved(&chains, path) {
            Some(true) => {
                log::debug!("Fully evolved: {}", page.url);
                Ok(Some(page.url))
            }
            Some(false) => Ok(None),
            None => Err(first_err
                .unwrap_or_else(|| ParseError::SpeciesNotInChain(path.to_string()))
                .into()),
        }
    }
}
