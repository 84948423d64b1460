use crate::InputError;
use std::path::Path;
use tracing::info;

/// Reads one descriptor per non-empty line of `path`.
pub fn read_descriptors(path: &Path) -> Result<Vec<String>, InputError> {
    let text = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let descriptors = parse_descriptors(&text);
    if descriptors.is_empty() {
        return Err(InputError::Empty(path.to_path_buf()));
    }
    info!(count = descriptors.len(), path = %path.display(), "loaded descriptors");
    Ok(descriptors)
}

/// The first whitespace separated field of every line that has one.
pub fn parse_descriptors(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn first_token_of_each_line() {
        let text = "CCO 123 extra\n\n   \nc1ccccc1\tbenzene\n  C(=O)O\n";
        assert_eq!(parse_descriptors(text), vec!["CCO", "c1ccccc1", "C(=O)O"]);
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "CCO ethanol").unwrap();
        writeln!(file, "CC(=O)O").unwrap();
        writeln!(file, "not-a-smiles").unwrap();
        let descriptors = read_descriptors(file.path()).unwrap();
        assert_eq!(descriptors, vec!["CCO", "CC(=O)O", "not-a-smiles"]);
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_descriptors(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, InputError::Read { .. }));
    }

    #[test]
    fn blank_file_is_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "   ").unwrap();
        writeln!(file).unwrap();
        assert!(matches!(read_descriptors(file.path()), Err(InputError::Empty(_))));
    }
}
