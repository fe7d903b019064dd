//! Strips a species page down to what belongs on a printed sheet.
//!
//! Rules only read the parsed tree and record edits keyed by node. The
//! cleaned markup is produced by serializing the tree once with those edits
//! applied.

use std::collections::{HashMap, HashSet};

use ego_tree::iter::Edge;
use ego_tree::NodeId;
use lazy_static::lazy_static;
use scraper::node::Element;
use scraper::{ElementRef, Node, Selector};
use url::Url;

use crate::site::has_class;

lazy_static! {
    static ref UNWANTED: Selector = Selector::parse(
        "script, style, noscript, iframe, .sr-only, .main-header, .main-menu, .entity-nav, \
         .list-nav, .infocard-list-evo, footer, .tabset-moves-game ~ *, .sv-tabs-tab-list"
    )
    .unwrap();
    static ref SIDE_COLUMN: Selector = Selector::parse(".grid-col.span-md-12.span-lg-4").unwrap();
    static ref INACTIVE_MOVE_PANEL: Selector =
        Selector::parse(".tabset-moves-game .sv-tabs-panel:not(.active)").unwrap();
    static ref H2: Selector = Selector::parse("h2").unwrap();
    static ref H3: Selector = Selector::parse("h3").unwrap();
    static ref TH: Selector = Selector::parse("th").unwrap();
    static ref P: Selector = Selector::parse("p").unwrap();
    static ref IMG: Selector = Selector::parse("img").unwrap();
    static ref A: Selector = Selector::parse("a").unwrap();
    static ref DEX_FLAVOR: Selector = Selector::parse("div#dex-flavor").unwrap();
}

const UNWANTED_COLUMNS: [&str; 2] = ["Training", "Type defenses"];
const UNWANTED_HEADINGS: [&str; 2] = ["Evolution chart", "Pokédex entries"];
const UNWANTED_ROWS: [&str; 4] = ["National №", "Height", "Species", "Local №"];
const MOVE_CATEGORIES: [&str; 3] = ["Physical", "Status", "Special"];
const PLAIN_LINK_CLASSES: [&str; 2] = ["ent-name", "type-icon"];
const PLAIN_LINK_TARGETS: [&str; 2] = ["tm", "ability"];
const TWO_COLUMN_CLASS: &str = "two-column";

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Returns the cleaned inner HTML of `content`, image sources resolved
/// against `base`.
pub fn clean_content(content: ElementRef, base: &Url) -> String {
    let mut edits = Edits::default();

    remove_unwanted(&mut edits, content);
    remove_data_rows(&mut edits, content);
    remove_text_paragraphs(&mut edits, content);
    replace_move_category_icons(&mut edits, content);
    unwrap_links(&mut edits, content);
    remove_changes(&mut edits, content);
    remove_dex_entries(&mut edits, content);
    demote_headings(&mut edits, content);
    split_move_lists(&mut edits, content);
    resolve_image_sources(&mut edits, content, base);

    edits.serialize(content)
}

#[derive(Debug, Default)]
struct Edits {
    removed: HashSet<NodeId>,
    replaced: HashMap<NodeId, String>,
    renamed: HashMap<NodeId, &'static str>,
    classes: HashMap<NodeId, Vec<&'static str>>,
    sources: HashMap<NodeId, String>,
}

impl Edits {
    fn remove(&mut self, element: ElementRef) {
        self.removed.insert(element.id());
    }

    fn replace_with_text(&mut self, element: ElementRef, text: String) {
        self.replaced.insert(element.id(), text);
    }

    fn serialize(&self, root: ElementRef) -> String {
        let mut out = String::new();
        let mut skipped: Option<NodeId> = None;

        for edge in root.traverse() {
            match edge {
                Edge::Open(node) => {
                    let id = node.id();
                    if skipped.is_some() || id == root.id() {
                        continue;
                    }
                    if self.removed.contains(&id) {
                        skipped = Some(id);
                        continue;
                    }
                    if let Some(text) = self.replaced.get(&id) {
                        out.push_str(&html_escape::encode_text(text));
                        skipped = Some(id);
                        continue;
                    }
                    match node.value() {
                        Node::Text(text) => out.push_str(&html_escape::encode_text(&**text)),
                        Node::Element(elem) => self.open_tag(&mut out, id, elem),
                        _ => (),
                    }
                }
                Edge::Close(node) => {
                    let id = node.id();
                    if skipped == Some(id) {
                        skipped = None;
                        continue;
                    }
                    if skipped.is_some() || id == root.id() {
                        continue;
                    }
                    if let Node::Element(elem) = node.value() {
                        if !VOID_ELEMENTS.contains(&elem.name()) {
                            out.push_str("</");
                            out.push_str(self.tag_name(id, elem));
                            out.push('>');
                        }
                    }
                }
            }
        }

        out
    }

    fn tag_name<'a>(&self, id: NodeId, elem: &'a Element) -> &'a str {
        match self.renamed.get(&id) {
            Some(&name) => name,
            None => elem.name(),
        }
    }

    fn open_tag(&self, out: &mut String, id: NodeId, elem: &Element) {
        let extra = self.classes.get(&id).map(Vec::as_slice).unwrap_or_default();

        out.push('<');
        out.push_str(self.tag_name(id, elem));

        let mut has_class_attr = false;
        for (name, value) in elem.attrs() {
            has_class_attr |= name == "class";
            let value = match (name, self.sources.get(&id)) {
                ("src", Some(src)) => src.clone(),
                ("class", _) if !extra.is_empty() => {
                    let mut classes = vec![value];
                    classes.extend(extra);
                    classes.join(" ")
                }
                _ => value.to_string(),
            };
            push_attr(out, name, &value);
        }
        if !has_class_attr && !extra.is_empty() {
            push_attr(out, "class", &extra.join(" "));
        }

        out.push('>');
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&html_escape::encode_double_quoted_attribute(value));
    out.push('"');
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn trimmed_text_of(element: ElementRef) -> String {
    text_of(element).trim().to_string()
}

fn next_element_siblings(element: ElementRef) -> impl Iterator<Item = ElementRef> {
    element.next_siblings().filter_map(ElementRef::wrap)
}

fn remove_unwanted(edits: &mut Edits, content: ElementRef) {
    content.select(&UNWANTED).for_each(|e| edits.remove(e));

    for column in content.select(&SIDE_COLUMN) {
        let unwanted = column.select(&H2).any(|h2| {
            let text = text_of(h2);
            UNWANTED_COLUMNS.iter().any(|t| text.contains(t))
        });
        if unwanted {
            edits.remove(column);
        }
    }

    for h2 in content.select(&H2) {
        let text = text_of(h2);
        if UNWANTED_HEADINGS.iter().any(|t| text.contains(t)) {
            edits.remove(h2);
        }
    }

    // Per-form tabsets live inside game panels and keep all their tabs.
    for panel in content.select(&INACTIVE_MOVE_PANEL) {
        let in_form_tabset = panel
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take_while(|a| !has_class(a, "tabset-moves-game"))
            .any(|a| has_class(&a, "tabset-moves-game-form"));
        if !in_form_tabset {
            edits.remove(panel);
        }
    }
}

fn remove_data_rows(edits: &mut Edits, content: ElementRef) {
    for th in content.select(&TH) {
        if UNWANTED_ROWS.contains(&trimmed_text_of(th).as_str()) {
            let row = th
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|a| a.value().name() == "tr");
            if let Some(row) = row {
                edits.remove(row);
            }
        }
    }
}

fn remove_text_paragraphs(edits: &mut Edits, content: ElementRef) {
    for p in content.select(&P) {
        if p.select(&IMG).next().is_none() {
            edits.remove(p);
        }
    }
}

fn replace_move_category_icons(edits: &mut Edits, content: ElementRef) {
    for img in content.select(&IMG) {
        if let Some(title) = img.value().attr("title") {
            if MOVE_CATEGORIES.contains(&title) {
                edits.replace_with_text(img, title.to_string());
            }
        }
    }
}

fn unwrap_links(edits: &mut Edits, content: ElementRef) {
    for a in content.select(&A) {
        let plain_class = PLAIN_LINK_CLASSES.iter().any(|c| has_class(&a, c));
        let plain_target = a.value().attr("href").is_some_and(|href| {
            let href = href.to_lowercase();
            PLAIN_LINK_TARGETS.iter().any(|t| href.contains(t))
        });
        if plain_class || plain_target {
            edits.replace_with_text(a, text_of(a));
        }
    }
}

fn remove_changes(edits: &mut Edits, content: ElementRef) {
    for h2 in content.select(&H2) {
        if trimmed_text_of(h2).to_lowercase().contains("changes") {
            edits.remove(h2);
            next_element_siblings(h2)
                .take_while(|s| s.value().name() == "ul")
                .for_each(|ul| edits.remove(ul));
        }
    }
}

fn remove_dex_entries(edits: &mut Edits, content: ElementRef) {
    if let Some(flavor) = content.select(&DEX_FLAVOR).next() {
        next_element_siblings(flavor)
            .take_while(|s| matches!(s.value().name(), "div" | "h3"))
            .for_each(|s| edits.remove(s));
    }
}

fn demote_headings(edits: &mut Edits, content: ElementRef) {
    for h3 in content.select(&H3) {
        edits.renamed.insert(h3.id(), "h4");
    }
    for h2 in content.select(&H2) {
        edits.renamed.insert(h2.id(), "h3");
    }
}

fn split_move_lists(edits: &mut Edits, content: ElementRef) {
    for h3 in content.select(&H3) {
        if !trimmed_text_of(h3)
            .to_lowercase()
            .starts_with("moves learnt by")
        {
            continue;
        }
        let section = h3
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take_while(|a| a.id() != content.id())
            .find(|a| matches!(a.value().name(), "div" | "section"));
        if let Some(section) = section {
            let classes = edits.classes.entry(section.id()).or_default();
            if !classes.contains(&TWO_COLUMN_CLASS) {
                classes.push(TWO_COLUMN_CLASS);
            }
        }
    }
}

fn resolve_image_sources(edits: &mut Edits, content: ElementRef, base: &Url) {
    for img in content.select(&IMG) {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        match base.join(src) {
            Ok(url) if url.as_str() != src => {
                edits.sources.insert(img.id(), url.into());
            }
            Ok(_) => (),
            Err(e) => log::debug!("Keeping unresolvable image source {src:?}: {e}"),
        }
    }
}
