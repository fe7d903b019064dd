use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use evodex_crawler::{fetch_pages, CrawlReport, Fetcher, Page};
use futures::{pin_mut, StreamExt};

use crate::document::{Images, PdfRenderer, SpeciesDocument};
use crate::error::ExtractionError;
use crate::sanitize::file_stem;
use crate::site;
use crate::url_list::read_url_list;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub url_list: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            url_list: PathBuf::from(site::DEFAULT_URL_LIST),
            output_dir: PathBuf::from(site::DEFAULT_OUTPUT_DIR),
        }
    }
}

/// Written PDF files, in list order, and the species that were skipped.
pub type GenerateReport = CrawlReport<PathBuf>;

/// Document Generator: renders one PDF per URL of `config.url_list` into
/// `config.output_dir`.
///
/// A missing list aborts the run, a species that can't be downloaded,
/// extracted or rendered is skipped. Images that can't be downloaded are
/// left out of their document.
pub async fn generate<R>(
    fetcher: &Fetcher,
    config: &GeneratorConfig,
    renderer: &R,
) -> anyhow::Result<GenerateReport>
where
    R: PdfRenderer,
{
    let urls = read_url_list(&config.url_list)?;
    log::info!(
        "Generating {} documents from {}",
        urls.len(),
        config.url_list.display()
    );

    fs_err::create_dir_all(&config.output_dir)?;

    let policy = fetcher.config();
    let mut writer = PdfWriter::new(&config.output_dir, renderer);
    let mut report = GenerateReport::default();

    let pages = fetch_pages(fetcher, urls);
    pin_mut!(pages);

    while let Some((url, page)) = pages.next().await {
        let page = match page {
            Ok(page) => page,
            Err(e) => {
                report.skip_download(policy.on_dl_error, url, e)?;
                continue;
            }
        };

        match writer.write(fetcher, page).await {
            Ok(path) => report.outputs.push(path),
            Err(e) => report.skip_scrap(policy.on_scrap_error, url, e)?,
        }
    }

    if report.all_failed() {
        log::warn!(
            "No document generated, all {} species failed",
            report.failures.len()
        );
    }
    log::info!(
        "Generated {} documents in {} ({} skipped)",
        report.outputs.len(),
        config.output_dir.display(),
        report.failures.len()
    );

    Ok(report)
}

struct PdfWriter<'a, R> {
    output_dir: &'a Path,
    renderer: &'a R,
    stems: FileStems,
}

impl<'a, R: PdfRenderer> PdfWriter<'a, R> {
    fn new(output_dir: &'a Path, renderer: &'a R) -> Self {
        Self {
            output_dir,
            renderer,
            stems: FileStems::default(),
        }
    }

    async fn write(&mut self, fetcher: &Fetcher, page: Page) -> anyhow::Result<PathBuf> {
        let doc = SpeciesDocument::extract(&page.final_url, &page.body)?;

        let stem = file_stem(&doc.name)
            .or_else(|| site::slug(&page.url).as_deref().and_then(file_stem))
            .ok_or_else(|| ExtractionError::UnnamedFile(page.url.clone()))?;

        let images = fetch_images(fetcher, &doc).await;

        let pdf = self
            .renderer
            .render(&doc.to_html(), &images)
            .with_context(|| format!("Couldn't render {}", doc.name))?;

        let path = self
            .output_dir
            .join(format!("{}.pdf", self.stems.assign(stem)));
        fs_err::write(&path, pdf)?;

        log::info!("Wrote {} to {}", doc.name, path.display());
        Ok(path)
    }
}

async fn fetch_images(fetcher: &Fetcher, doc: &SpeciesDocument) -> Images {
    let mut images = Images::new();
    for src in &doc.images {
        match fetcher.fetch_bytes(src).await {
            Ok(bytes) => {
                images.insert(src.clone(), bytes);
            }
            Err(e) => log::warn!("Skipping image of {}: {e}", doc.name),
        }
    }
    images
}

/// Hands out file stems, suffixing repeats with `-2`, `-3`... in call order.
#[derive(Debug, Default)]
struct FileStems {
    used: HashMap<String, usize>,
}

impl FileStems {
    fn assign(&mut self, stem: String) -> String {
        let count = self.used.entry(stem.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            stem
        } else {
            format!("{stem}-{count}")
        }
    }
}
