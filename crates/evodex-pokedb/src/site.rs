use scraper::ElementRef;
use url::Url;

pub const EVOLUTION_URL: &str = "https://pokemondb.net/evolution";
pub const SPECIES_PATH_PREFIX: &str = "/pokedex/";

pub const DEFAULT_URL_LIST: &str = "fully_evolved_urls.txt";
pub const DEFAULT_OUTPUT_DIR: &str = "pokemon_pdfs";

pub fn has_class(element: &ElementRef, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Last non-empty path segment of a URL, e.g. `venusaur` for `/pokedex/venusaur`.
pub fn slug(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_of_species_url() {
        assert_eq!(
            slug("https://pokemondb.net/pokedex/mr-mime").as_deref(),
            Some("mr-mime")
        );
        assert_eq!(
            slug("https://pokemondb.net/pokedex/mr-mime/").as_deref(),
            Some("mr-mime")
        );
        assert_eq!(slug("https://pokemondb.net/"), None);
        assert_eq!(slug("not a url"), None);
    }
}
