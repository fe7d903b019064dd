mod config;
mod crawler;
mod error;
mod scrapable;

pub use config::{CrawlerConfig, OnError};
pub use crawler::{crawl_pages, fetch_pages, Fetcher};
pub use error::FetchError;
pub use scrapable::{CrawlReport, Failure, Page, Scrapable};

pub use anyhow;
