use std::cell::RefCell;
use std::fs;
use std::path::Path;

use evodex_crawler::{CrawlerConfig, Fetcher};
use evodex_pokedb::url_list::{read_url_list, write_url_list};
use evodex_pokedb::{
    collect, generate, CollectorConfig, GeneratorConfig, Images, MissingInputError, ParseError,
    PdfRenderer, RenderError,
};
use mockito::{Server, ServerGuard};

#[derive(Default)]
struct CaptureRenderer {
    pages: RefCell<Vec<(String, Images)>>,
}

impl PdfRenderer for CaptureRenderer {
    fn render(&self, html: &str, images: &Images) -> Result<Vec<u8>, RenderError> {
        self.pages
            .borrow_mut()
            .push((html.to_string(), images.clone()));
        Ok(b"%PDF-1.7\n".to_vec())
    }
}

struct FailingRenderer;

impl PdfRenderer for FailingRenderer {
    fn render(&self, _html: &str, _images: &Images) -> Result<Vec<u8>, RenderError> {
        Err(RenderError("boom".into()))
    }
}

fn card(slug: &str, name: &str) -> String {
    format!(
        r#"<div class="infocard"><span class="infocard-lg-data text-muted">
           <a class="ent-name" href="/pokedex/{slug}">{name}</a></span></div>"#
    )
}

fn chain(cards: &[(&str, &str)]) -> String {
    let arrow = r#"<span class="infocard infocard-arrow"><i class="icon-arrow"></i></span>"#;
    let cards = cards
        .iter()
        .map(|(slug, name)| card(slug, name))
        .collect::<Vec<_>>()
        .join(arrow);
    format!(r#"<div class="infocard-list-evo">{cards}</div>"#)
}

fn chain_a() -> String {
    chain(&[("a", "Aa"), ("a1", "Ab"), ("a2", "Ac")])
}

fn chain_b() -> String {
    chain(&[("b0", "Bee Larva"), ("b", "Mr. Bee")])
}

fn listing() -> String {
    format!(
        "<html><body><main><h1>Evolution chart</h1>{}{}</main></body></html>",
        chain_a(),
        chain_b()
    )
}

const ARTWORK: &[u8] = b"\x89PNG\r\n\x1a\nartwork";

fn detail(slug: &str, name: &str, chain: &str, info: &str) -> String {
    format!(
        r#"<html><body><header class="main-header">menu</header><main>
           <h1>{name}</h1>
           <div class="grid-row"><p><img src="/art/{slug}.png" alt="{name}"></p>
           <table class="vitals-table"><tbody>
           <tr><th>National №</th><td>0999</td></tr>
           <tr><th>Type</th><td>{info}</td></tr>
           </tbody></table></div>
           <h2>Evolution chart</h2>{chain}
           </main><footer>footer</footer></body></html>"#
    )
}

async fn site() -> ServerGuard {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/evolution")
        .with_body(listing())
        .create_async()
        .await;
    server
        .mock("GET", "/pokedex/a")
        .with_body(detail("a", "Aa", &chain_a(), "Bug"))
        .create_async()
        .await;
    server
        .mock("GET", "/pokedex/b")
        .with_body(detail("b", "Mr. Bee", &chain_b(), "Bug Flying"))
        .create_async()
        .await;
    server
        .mock("GET", "/art/b.png")
        .with_header("content-type", "image/png")
        .with_body(ARTWORK)
        .create_async()
        .await;
    for missing in ["/pokedex/a1", "/pokedex/a2", "/pokedex/b0"] {
        server
            .mock("GET", missing)
            .with_status(404)
            .create_async()
            .await;
    }
    server
}

fn fetcher() -> Fetcher {
    Fetcher::new(&CrawlerConfig {
        retries: 0,
        ..Default::default()
    })
    .unwrap()
}

fn pdf_names(dir: &Path) -> Vec<String> {
    let mut names = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[tokio::test]
async fn collect_then_generate() {
    let server = site().await;
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("fully_evolved_urls.txt");
    let out = dir.path().join("pdfs");
    let fetcher = fetcher();

    let collected = collect(
        &fetcher,
        &CollectorConfig {
            listing_url: format!("{}/evolution", server.url()),
            output_file: list.clone(),
            from_listing: false,
        },
    )
    .await
    .unwrap();

    let b = format!("{}/pokedex/b", server.url());
    assert_eq!(collected.candidates, 5);
    assert_eq!(collected.fully_evolved, vec![b.clone()]);
    assert_eq!(collected.failures.len(), 3);
    assert_eq!(read_url_list(&list).unwrap(), vec![b]);

    let renderer = CaptureRenderer::default();
    let generated = generate(
        &fetcher,
        &GeneratorConfig {
            url_list: list,
            output_dir: out.clone(),
        },
        &renderer,
    )
    .await
    .unwrap();

    assert_eq!(generated.outputs, vec![out.join("mr-bee.pdf")]);
    assert_eq!(pdf_names(&out), vec!["mr-bee.pdf"]);
    assert!(fs::read(out.join("mr-bee.pdf")).unwrap().starts_with(b"%PDF"));

    let art = format!("{}/art/b.png", server.url());
    let pages = renderer.pages.borrow();
    assert_eq!(pages.len(), 1);
    let (html, images) = &pages[0];
    assert!(html.contains("<title>Mr. Bee</title>"));
    assert!(html.contains("Bug Flying"));
    assert!(html.contains(&format!(r#"src="{art}""#)));
    assert!(!html.contains("0999"));
    assert!(!html.contains("Bee Larva"));
    assert!(!html.contains("menu"));
    assert_eq!(images.get(&art).map(Vec::as_slice), Some(ARTWORK));
}

#[tokio::test]
async fn unreachable_images_are_left_out() {
    let server = site().await;
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("urls.txt");
    let out = dir.path().join("pdfs");
    write_url_list(&list, [format!("{}/pokedex/a", server.url())]).unwrap();

    let renderer = CaptureRenderer::default();
    let report = generate(
        &fetcher(),
        &GeneratorConfig {
            url_list: list,
            output_dir: out.clone(),
        },
        &renderer,
    )
    .await
    .unwrap();

    assert_eq!(pdf_names(&out), vec!["aa.pdf"]);
    assert!(report.failures.is_empty());
    assert!(renderer.pages.borrow()[0].1.is_empty());
}

#[tokio::test]
async fn listing_only_collection_keeps_every_chain_end() {
    let server = site().await;
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("urls.txt");

    let collected = collect(
        &fetcher(),
        &CollectorConfig {
            listing_url: format!("{}/evolution", server.url()),
            output_file: list.clone(),
            from_listing: true,
        },
    )
    .await
    .unwrap();

    let expected = vec![
        format!("{}/pokedex/a2", server.url()),
        format!("{}/pokedex/b", server.url()),
    ];
    assert_eq!(collected.fully_evolved, expected);
    assert!(collected.failures.is_empty());
    assert_eq!(read_url_list(&list).unwrap(), expected);
}

#[tokio::test]
async fn unreachable_listing_is_fatal() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/evolution")
        .with_status(500)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("urls.txt");

    let res = collect(
        &fetcher(),
        &CollectorConfig {
            listing_url: format!("{}/evolution", server.url()),
            output_file: list.clone(),
            from_listing: false,
        },
    )
    .await;

    assert!(res.is_err());
    assert!(!list.exists());
}

#[tokio::test]
async fn listing_without_chains_is_fatal() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/evolution")
        .with_body(r#"<html><body><main><div class="evo-chain-v2">Bulbasaur</div></main></body></html>"#)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("urls.txt");
    let listing_url = format!("{}/evolution", server.url());

    let err = collect(
        &fetcher(),
        &CollectorConfig {
            listing_url: listing_url.clone(),
            output_file: list.clone(),
            from_listing: false,
        },
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.downcast_ref::<ParseError>(),
        Some(&ParseError::EmptyListing(listing_url))
    );
    assert!(!list.exists());
}

#[tokio::test]
async fn unreachable_species_is_skipped() {
    let server = site().await;
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("urls.txt");
    let out = dir.path().join("pdfs");
    write_url_list(
        &list,
        [
            format!("{}/pokedex/a2", server.url()),
            format!("{}/pokedex/b", server.url()),
        ],
    )
    .unwrap();

    let report = generate(
        &fetcher(),
        &GeneratorConfig {
            url_list: list,
            output_dir: out.clone(),
        },
        &CaptureRenderer::default(),
    )
    .await
    .unwrap();

    assert_eq!(pdf_names(&out), vec!["mr-bee.pdf"]);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].url.ends_with("/pokedex/a2"));
    assert!(report.failures[0].reason.contains("404"));
}

#[tokio::test]
async fn only_a_missing_page_yields_no_pdf_but_succeeds() {
    let server = site().await;
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("urls.txt");
    let out = dir.path().join("pdfs");
    write_url_list(&list, [format!("{}/pokedex/b0", server.url())]).unwrap();

    let report = generate(
        &fetcher(),
        &GeneratorConfig {
            url_list: list,
            output_dir: out.clone(),
        },
        &CaptureRenderer::default(),
    )
    .await
    .unwrap();

    assert!(report.outputs.is_empty());
    assert!(report.all_failed());
    assert!(pdf_names(&out).is_empty());
}

#[tokio::test]
async fn render_failures_are_isolated() {
    let server = site().await;
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("urls.txt");
    let out = dir.path().join("pdfs");
    write_url_list(&list, [format!("{}/pokedex/b", server.url())]).unwrap();

    let report = generate(
        &fetcher(),
        &GeneratorConfig {
            url_list: list,
            output_dir: out.clone(),
        },
        &FailingRenderer,
    )
    .await
    .unwrap();

    assert!(report.outputs.is_empty());
    assert!(report.failures[0].reason.contains("Mr. Bee"));
    assert!(report.failures[0].reason.contains("boom"));
}

#[tokio::test]
async fn generating_twice_overwrites_same_files() {
    let server = site().await;
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("urls.txt");
    let out = dir.path().join("pdfs");
    write_url_list(
        &list,
        [
            format!("{}/pokedex/a", server.url()),
            format!("{}/pokedex/b", server.url()),
        ],
    )
    .unwrap();
    let config = GeneratorConfig {
        url_list: list,
        output_dir: out.clone(),
    };

    let first = generate(&fetcher(), &config, &CaptureRenderer::default())
        .await
        .unwrap();
    let second = generate(&fetcher(), &config, &CaptureRenderer::default())
        .await
        .unwrap();

    assert_eq!(first.outputs, second.outputs);
    assert_eq!(pdf_names(&out), vec!["aa.pdf", "mr-bee.pdf"]);
}

#[tokio::test]
async fn missing_list_is_fatal() {
    let dir = tempfile::tempdir().unwrap();

    let err = generate(
        &fetcher(),
        &GeneratorConfig {
            url_list: dir.path().join("fully_evolved_urls.txt"),
            output_dir: dir.path().join("pdfs"),
        },
        &CaptureRenderer::default(),
    )
    .await
    .unwrap_err();

    assert!(err.downcast_ref::<MissingInputError>().is_some());
}
