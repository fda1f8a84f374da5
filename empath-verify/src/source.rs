//! Input file to candidate addresses.
//!
//! Records are newline separated. A trailing `\r` is dropped, and blank or
//! whitespace-only records (including a quoted empty field `""`) are skipped
//! before counting, so a trailing newline
//! or a Windows line ending never produces a phantom candidate. Every other
//! record is yielded as written, which lets malformed lines reach the syntax
//! check and be counted as rejected.
//!
//! A record fully wrapped in double quotes, with every inner quote doubled, is
//! unquoted the way CSV readers do. This keeps files written by
//! [`crate::report`] readable as input.

use std::{
    borrow::Cow,
    iter::Enumerate,
    path::{Path, PathBuf},
    str::Split,
};

use crate::error::SourceError;

const BOM: char = '\u{feff}';

/// One raw record pulled from the input, not yet judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    /// 1-based line number in the input file
    pub line: usize,
    pub address: Cow<'a, str>,
}

/// The parsed contents of one input file.
///
/// The source keeps the whole file in memory, so [`LineSource::candidates`]
/// can be called any number of times and always yields the same sequence.
#[derive(Debug, Clone)]
pub struct LineSource {
    path: Option<PathBuf>,
    content: String,
}

impl LineSource {
    /// Read and validate an input file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Input`] if the file is missing or unreadable, and
    /// [`SourceError::Format`] if it is not UTF-8 text.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| SourceError::Input {
            path: path.to_path_buf(),
            source,
        })?;

        let mut source = Self::from_bytes(bytes)?;
        source.path = Some(path.to_path_buf());
        Ok(source)
    }

    /// Validate in-memory input.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Format`] for invalid UTF-8 or NUL bytes, naming
    /// the first offending line.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SourceError> {
        if let Some(pos) = bytes.iter().position(|&b| b == 0) {
            return Err(SourceError::Format {
                line: line_of(&bytes, pos),
                reason: "contains NUL byte".to_string(),
            });
        }

        let content = String::from_utf8(bytes).map_err(|err| {
            let pos = err.utf8_error().valid_up_to();
            SourceError::Format {
                line: line_of(err.as_bytes(), pos),
                reason: "invalid UTF-8".to_string(),
            }
        })?;

        let content = match content.strip_prefix(BOM) {
            Some(stripped) => stripped.to_string(),
            None => content,
        };

        Ok(Self {
            path: None,
            content,
        })
    }

    /// Where the input was read from, if it came from a file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Iterate over the candidates in input order.
    #[must_use]
    pub fn candidates(&self) -> Candidates<'_> {
        Candidates {
            records: self.content.split('\n').enumerate(),
        }
    }

    /// Number of candidates the source will yield.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates().next().is_none()
    }
}

/// Lazy iterator over the candidates of a [`LineSource`].
#[derive(Debug, Clone)]
pub struct Candidates<'a> {
    records: Enumerate<Split<'a, char>>,
}

impl<'a> Iterator for Candidates<'a> {
    type Item = Candidate<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for (index, record) in self.records.by_ref() {
            let record = record.strip_suffix('\r').unwrap_or(record);
            let address = unquote(record);
            if address.trim().is_empty() {
                continue;
            }

            return Some(Candidate {
                line: index + 1,
                address,
            });
        }

        None
    }
}

/// Undo CSV-style quoting of a whole record.
fn unquote(record: &str) -> Cow<'_, str> {
    let Some(inner) = record
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return Cow::Borrowed(record);
    };

    if inner.replace("\"\"", "").contains('"') {
        return Cow::Borrowed(record);
    }

    Cow::Owned(inner.replace("\"\"", "\""))
}

fn line_of(bytes: &[u8], pos: usize) -> usize {
    bytes[..pos].iter().filter(|&&b| b == b'\n').count() + 1
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn addresses(input: &str) -> Vec<String> {
        LineSource::from_bytes(input.as_bytes().to_vec())
            .unwrap()
            .candidates()
            .map(|candidate| candidate.address.into_owned())
            .collect()
    }

    #[test]
    fn test_splits_on_newline() {
        assert_eq!(
            addresses("a@example.com\nb@example.com"),
            vec!["a@example.com", "b@example.com"]
        );
    }

    #[test]
    fn test_trailing_newline_and_crlf() {
        assert_eq!(
            addresses("a@example.com\r\nb@example.com\r\n"),
            vec!["a@example.com", "b@example.com"]
        );
    }

    #[test]
    fn test_blank_lines_are_dropped_with_line_numbers_kept() {
        let source = LineSource::from_bytes(b"\n  \na@example.com\n\t\nnot-an-email\n".to_vec())
            .unwrap();
        let lines: Vec<_> = source.candidates().map(|c| c.line).collect();

        assert_eq!(lines, vec![3, 5]);
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn test_malformed_records_are_kept_verbatim() {
        assert_eq!(
            addresses(" spaced@example.com \nnot-an-email"),
            vec![" spaced@example.com ", "not-an-email"]
        );
    }

    #[test]
    fn test_empty_input() {
        let source = LineSource::from_bytes(Vec::new()).unwrap();
        assert!(source.is_empty());
        assert_eq!(source.len(), 0);
    }

    #[test]
    fn test_csv_quoted_record_is_unquoted() {
        assert_eq!(
            addresses("\"\"\"john doe\"\"@example.com\"\n\"plain@example.com\""),
            vec!["\"john doe\"@example.com", "plain@example.com"]
        );
    }

    #[test]
    fn test_quoted_empty_record_is_blank() {
        let source = LineSource::from_bytes(b"\"\"\na@example.com\n\" \"\n".to_vec()).unwrap();
        let lines: Vec<_> = source.candidates().map(|c| c.line).collect();

        assert_eq!(lines, vec![2]);
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn test_quoted_local_part_is_not_unquoted() {
        assert_eq!(
            addresses("\"john doe\"@example.com"),
            vec!["\"john doe\"@example.com"]
        );
    }

    #[test]
    fn test_bom_is_stripped() {
        assert_eq!(addresses("\u{feff}a@example.com"), vec!["a@example.com"]);
    }

    #[test]
    fn test_candidates_restart() {
        let source = LineSource::from_bytes(b"a@example.com\nb@example.com".to_vec()).unwrap();
        let first: Vec<_> = source.candidates().collect();
        let second: Vec<_> = source.candidates().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_utf8_is_format_error() {
        let err = LineSource::from_bytes(b"a@example.com\n\xff\xfe@example.com".to_vec())
            .unwrap_err();
        assert!(matches!(err, SourceError::Format { line: 2, .. }));
    }

    #[test]
    fn test_nul_byte_is_format_error() {
        let err = LineSource::from_bytes(b"a@example.com\x00".to_vec()).unwrap_err();
        assert!(matches!(err, SourceError::Format { line: 1, .. }));
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let err = LineSource::from_path("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, SourceError::Input { .. }));
    }
}
