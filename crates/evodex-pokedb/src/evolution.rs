//! Evolution chains as shown by `.infocard-list-evo` blocks.
//!
//! A chain is a sequence of stages. A stage is either a species card or a
//! split, whose branches are chains of their own:
//!
//! ```text
//! <div class="infocard-list-evo">
//!   <div class="infocard">..<a class="ent-name" href="/pokedex/eevee">Eevee</a>..</div>
//!   <span class="infocard infocard-arrow">..</span>
//!   <span class="infocard-evo-split">
//!     <div class="infocard-list-evo">
//!       <span class="infocard infocard-arrow">..</span>
//!       <div class="infocard">..<a class="ent-name" href="/pokedex/vaporeon">Vaporeon</a>..</div>
//!     </div>
//!     ..
//!   </span>
//! </div>
//! ```

use std::collections::HashSet;

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ParseError;
use crate::site::{has_class, SPECIES_PATH_PREFIX};

lazy_static! {
    static ref EVO_LIST: Selector = Selector::parse(".infocard-list-evo").unwrap();
    static ref ENT_NAME: Selector = Selector::parse("a.ent-name").unwrap();
}

const EVO_LIST_CLASS: &str = "infocard-list-evo";
const SPLIT_CLASS: &str = "infocard-evo-split";
const CARD_CLASS: &str = "infocard";
const ARROW_CLASS: &str = "infocard-arrow";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Species {
    pub name: String,
    pub url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Species(Species),
    Split(Vec<EvoChain>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvoChain {
    pub stages: Vec<Stage>,
}

impl EvoChain {
    /// Every species of the chain, branches included, in document order.
    pub fn species(&self) -> Vec<&Species> {
        let mut all = Vec::new();
        self.visit(&mut |s, _| all.push(s));
        all
    }

    /// Species with no stage after them: the end of the chain and the end of every branch.
    pub fn terminal_species(&self) -> Vec<&Species> {
        let mut terminal = Vec::new();
        self.visit(&mut |s, is_last| {
            if is_last {
                terminal.push(s)
            }
        });
        terminal
    }

    /// Whether the species at `path` ends the chain wherever it appears,
    /// `None` when it is not part of it.
    pub fn is_terminal(&self, path: &str) -> Option<bool> {
        let mut seen = Vec::new();
        self.occurrences(path, &mut seen);
        if seen.is_empty() {
            None
        } else {
            Some(seen.into_iter().all(|is_last| is_last))
        }
    }

    fn occurrences(&self, path: &str, seen: &mut Vec<bool>) {
        self.visit(&mut |s, is_last| {
            if same_path(s.url.path(), path) {
                seen.push(is_last)
            }
        });
    }

    fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a Species, bool)) {
        let last = self.stages.len().saturating_sub(1);
        for (i, stage) in self.stages.iter().enumerate() {
            match stage {
                Stage::Species(s) => f(s, i == last),
                Stage::Split(branches) => {
                    for branch in branches {
                        branch.visit(f);
                    }
                }
            }
        }
    }
}

/// Combines every chain a species appears in: it is fully evolved when no
/// occurrence has a later stage. `None` when no chain mentions it.
pub fn is_fully_evolved(chains: &[EvoChain], path: &str) -> Option<bool> {
    let mut seen = Vec::new();
    chains.iter().for_each(|c| c.occurrences(path, &mut seen));
    if seen.is_empty() {
        None
    } else {
        Some(seen.into_iter().all(|is_last| is_last))
    }
}

/// Parses the outermost evolution chains of a page, one result per chain so
/// that a malformed chain can be skipped alone.
pub fn parse_chains(doc: &Html, base: &Url) -> Vec<Result<EvoChain, ParseError>> {
    doc.select(&EVO_LIST)
        .filter(|list| {
            !list
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| has_class(&a, EVO_LIST_CLASS))
        })
        .map(|list| parse_chain(list, base))
        .collect()
}

fn parse_chain(list: ElementRef, base: &Url) -> Result<EvoChain, ParseError> {
    let mut stages = Vec::new();
    for child in list.children().filter_map(ElementRef::wrap) {
        if has_class(&child, SPLIT_CLASS) {
            let branches = child
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|branch| has_class(branch, EVO_LIST_CLASS))
                .map(|branch| parse_chain(branch, base))
                .collect::<Result<Vec<_>, _>>()?;
            stages.push(Stage::Split(branches));
        } else if has_class(&child, CARD_CLASS) && !has_class(&child, ARROW_CLASS) {
            stages.push(Stage::Species(parse_card(child, base)?));
        }
    }
    Ok(EvoChain { stages })
}

fn parse_card(card: ElementRef, base: &Url) -> Result<Species, ParseError> {
    let link = card.select(&ENT_NAME).next().ok_or(ParseError::MissingLink)?;
    let href = link.value().attr("href").ok_or(ParseError::MissingLink)?;

    let url = base.join(href).map_err(|e| ParseError::InvalidLink {
        href: href.to_string(),
        reason: e.to_string(),
    })?;
    if !url.path().starts_with(SPECIES_PATH_PREFIX) {
        return Err(ParseError::InvalidLink {
            href: href.to_string(),
            reason: format!("not under {SPECIES_PATH_PREFIX}"),
        });
    }

    Ok(Species {
        name: link.text().collect::<String>().trim().to_string(),
        url,
    })
}

/// Unique species URLs across chains, in order of first appearance.
pub fn candidates(chains: &[EvoChain]) -> Vec<Url> {
    dedup(chains.iter().flat_map(|c| c.species()))
}

/// Unique species URLs that are fully evolved across all `chains`, in order
/// of first appearance.
///
/// Ending one chain is not enough: a species that has a later stage in any
/// other chain is left out.
pub fn terminal_candidates(chains: &[EvoChain]) -> Vec<Url> {
    dedup(chains.iter().flat_map(|c| c.terminal_species()))
        .into_iter()
        .filter(|url| is_fully_evolved(chains, url.path()) == Some(true))
        .collect()
}

fn dedup<'a>(species: impl Iterator<Item = &'a Species>) -> Vec<Url> {
    let mut seen = HashSet::new();
    species
        .filter(|s| seen.insert(s.url.as_str().to_string()))
        .map(|s| s.url.clone())
        .collect()
}

fn same_path(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}
