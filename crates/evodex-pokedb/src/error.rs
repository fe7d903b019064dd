use std::path::PathBuf;

use thiserror::Error;

/// Evolution chain markup is not shaped as expected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Evolution card without a species link")]
    MissingLink,

    #[error("Invalid species link {href:?}: {reason}")]
    InvalidLink { href: String, reason: String },

    #[error("Species {0} not found in any evolution chain of its page")]
    SpeciesNotInChain(String),

    #[error("No evolution chain on {0}")]
    MissingChain(String),

    #[error("No evolution chain found on listing {0}, the site markup may have changed")]
    EmptyListing(String),
}

/// A detail page lacks the fragments a species sheet is built from.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("No species name heading in {0}")]
    MissingName(String),

    #[error("No main content in {0}")]
    MissingContent(String),

    #[error("Couldn't derive a file name for {0}")]
    UnnamedFile(String),

    #[error("Invalid page URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Error)]
#[error("Couldn't render PDF: {0}")]
pub struct RenderError(pub String);

#[derive(Debug, Error)]
#[error("URL list {} not found, run `evodex collect` first", path.display())]
pub struct MissingInputError {
    pub path: PathBuf,
}
