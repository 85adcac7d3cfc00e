//! CSV loading shared by the classifiers.

use std::path::Path;

use wbutil_core::{Error, Result};

/// Default CSV cell separator.
pub const DEFAULT_DELIMITER: u8 = b',';

/// Read every row of a CSV file as strings, header row included.
///
/// Rows may not differ in width.
pub fn read_rows(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    tracing::debug!(path = %path.display(), rows = rows.len(), "Read CSV rows");
    Ok(rows)
}

/// Split off the first row as a header.
pub fn split_header(mut rows: Vec<Vec<String>>) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    if rows.is_empty() {
        return Err(Error::validation("CSV file has no header row"));
    }
    let header = rows.remove(0);
    Ok((header, rows))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_rows_with_delimiter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.tsv");
        std::fs::write(&path, "a\tb\n1\t2\n3\t4\n").unwrap();

        let rows = read_rows(&path, b'\t').unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], vec!["3", "4"]);
    }

    #[test]
    fn test_read_rows_ragged_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "a,b\n1\n").unwrap();

        assert!(matches!(
            read_rows(&path, DEFAULT_DELIMITER),
            Err(Error::Csv(_))
        ));
    }

    #[test]
    fn test_split_header() {
        let rows = vec![vec!["x".to_string()], vec!["1".to_string()]];
        let (header, body) = split_header(rows).unwrap();
        assert_eq!(header, vec!["x"]);
        assert_eq!(body.len(), 1);
        assert!(split_header(Vec::new()).is_err());
    }
}
