use std::io::{self, Write};
use std::path::Path;

use crate::error::MissingInputError;

/// Writes one URL per line, replacing any previous list.
pub fn write_url_list<P, I, S>(path: P, urls: I) -> io::Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut wtr = io::BufWriter::new(fs_err::File::create(path.as_ref())?);
    for url in urls {
        writeln!(wtr, "{}", url.as_ref())?;
    }
    wtr.flush()
}

/// Reads back a list written by [`write_url_list`], ignoring blank lines.
///
/// A missing file is reported as [`MissingInputError`].
pub fn read_url_list<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<String>> {
    let path = path.as_ref();
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(MissingInputError {
                path: path.to_path_buf(),
            }
            .into())
        }
        Err(e) => return Err(e.into()),
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_round_trips_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        let urls = ["https://pokemondb.net/pokedex/b", "https://pokemondb.net/pokedex/a"];

        write_url_list(&path, urls).unwrap();

        assert_eq!(
            fs_err::read_to_string(&path).unwrap(),
            "https://pokemondb.net/pokedex/b\nhttps://pokemondb.net/pokedex/a\n"
        );
        assert_eq!(read_url_list(&path).unwrap(), urls);
    }

    #[test]
    fn writing_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");

        write_url_list(&path, ["x", "y", "z"]).unwrap();
        write_url_list(&path, ["w"]).unwrap();

        assert_eq!(read_url_list(&path).unwrap(), vec!["w"]);
    }

    #[test]
    fn blank_lines_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        fs_err::write(&path, "  https://a/x \r\n\nhttps://a/y\n\n\n").unwrap();

        assert_eq!(
            read_url_list(&path).unwrap(),
            vec!["https://a/x", "https://a/y"]
        );
    }

    #[test]
    fn missing_list_is_a_dedicated_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_url_list(dir.path().join("nope.txt")).unwrap_err();

        let missing = err.downcast_ref::<MissingInputError>().unwrap();
        assert!(missing.path.ends_with("nope.txt"));
        assert!(err.to_string().contains("evodex collect"));
    }
}
