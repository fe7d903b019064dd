use std::collections::BTreeMap;

use lazy_static::lazy_static;
use printpdf::{Base64OrRaw, GeneratePdfOptions, PdfDocument, PdfSaveOptions};
use scraper::{Html, Selector};
use url::Url;

use crate::cleaner::clean_content;
use crate::error::{ExtractionError, RenderError};

lazy_static! {
    static ref MAIN: Selector = Selector::parse("main").unwrap();
    static ref NAME: Selector = Selector::parse("h1").unwrap();
    static ref IMG_SRC: Selector = Selector::parse("img[src]").unwrap();
}

/// Image bytes keyed by the absolute URL used as `src` in the document body.
pub type Images = BTreeMap<String, Vec<u8>>;

const STYLE: &str = r#"<style>
    body { font-family: Helvetica, Arial, sans-serif; font-size: 10pt; margin: 12mm; }
    h1 { font-size: 20pt; margin: 0 0 8pt 0; border-bottom: 1px solid #444444; }
    h3 { font-size: 13pt; margin: 10pt 0 4pt 0; }
    h4 { font-size: 11pt; margin: 8pt 0 3pt 0; }
    img { max-width: 180px; height: auto; }
    table { border-collapse: collapse; }
    th, td { padding: 2px 4px; text-align: left; vertical-align: top; }
    .tabset-moves-game { font-size: x-small; }
    .two-column { column-count: 2; }
    .two-column table { width: 100%; }
    .grid-col { height: fit-content; }
</style>"#;

/// The printable content of one species detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesDocument {
    pub name: String,
    /// Cleaned markup of the page's main content
    pub body: String,
    /// Absolute http(s) URLs of the images left in `body`, without repeats
    pub images: Vec<String>,
}

impl SpeciesDocument {
    /// Extracts the printable parts of the detail page served from `url`.
    pub fn extract(url: &str, page: &str) -> Result<Self, ExtractionError> {
        let base = Url::parse(url).map_err(|e| ExtractionError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let doc = Html::parse_document(page);

        let main = doc
            .select(&MAIN)
            .next()
            .ok_or_else(|| ExtractionError::MissingContent(url.to_string()))?;

        let name = main
            .select(&NAME)
            .next()
            .or_else(|| doc.select(&NAME).next())
            .map(|h1| h1.text().collect::<String>().trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ExtractionError::MissingName(url.to_string()))?;

        let body = clean_content(main, &base);
        let images = image_sources(&body);

        Ok(Self { name, body, images })
    }

    /// A standalone HTML document with the fixed sheet style.
    pub fn to_html(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n{STYLE}\n</head>\n<body>\n{body}\n</body>\n</html>\n",
            title = html_escape::encode_text(&self.name),
            body = self.body,
        )
    }
}

fn image_sources(body: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(body);
    let mut sources = Vec::new();
    for src in fragment
        .select(&IMG_SRC)
        .filter_map(|img| img.value().attr("src"))
    {
        let fetchable = Url::parse(src).is_ok_and(|u| matches!(u.scheme(), "http" | "https"));
        if fetchable && !sources.iter().any(|s| s == src) {
            sources.push(src.to_string());
        }
    }
    sources
}

pub trait PdfRenderer {
    /// Renders a full HTML document. `images` holds the bytes of the images
    /// it references, missing ones are left out of the layout.
    fn render(&self, html: &str, images: &Images) -> Result<Vec<u8>, RenderError>;
}

/// Lays out HTML with `printpdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPdfRenderer;

impl PdfRenderer for HtmlPdfRenderer {
    fn render(&self, html: &str, images: &Images) -> Result<Vec<u8>, RenderError> {
        // printpdf matches images on the `src` attribute text as serialized.
        let images = images
            .iter()
            .map(|(src, bytes)| {
                (
                    html_escape::encode_double_quoted_attribute(src).into_owned(),
                    Base64OrRaw::Raw(bytes.clone()),
                )
            })
            .collect::<BTreeMap<_, _>>();
        let fonts = BTreeMap::new();
        let mut warnings = Vec::new();

        let options = GeneratePdfOptions::default();

        let doc = PdfDocument::from_html(html, &images, &fonts, &options, &mut warnings)
            .map_err(|e| RenderError(e.to_string()))?;
        if !warnings.is_empty() {
            log::debug!("Layout produced {} warnings", warnings.len());
        }

        let mut save_warnings = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut save_warnings);
        if bytes.is_empty() {
            return Err(RenderError("empty PDF output".into()));
        }

        Ok(bytes)
    }
}
