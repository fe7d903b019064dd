pub mod cleaner;
pub mod collector;
pub mod document;
mod error;
pub mod evolution;
pub mod generator;
pub mod sanitize;
pub mod site;
pub mod url_list;

pub use collector::{collect, CollectReport, CollectorConfig};
pub use document::{HtmlPdfRenderer, Images, PdfRenderer, SpeciesDocument};
pub use error::{ExtractionError, MissingInputError, ParseError, RenderError};
pub use generator::{generate, GenerateReport, GeneratorConfig};

pub use anyhow;
