use std::{
    fs::File,
    io::{self, Read},
    path::Path,
};

use crate::error::{Error, IoOp, Result};

const QUOTE: u8 = b'"';
const DELIMITER: u8 = b',';
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    StartField,
    Unquoted,
    Quoted,
    // A quote seen inside a quoted field: either the closing quote or the
    // first half of a doubled one.
    QuoteInQuoted,
}

// `csv` drops a UTF-8 BOM at the very start of the input before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bom {
    Pending(usize),
    Skipped,
    Absent,
}

/// Reader adapter that follows the CSV quoting state of every byte the
/// parser pulls through it.
///
/// `csv` ends an unterminated quoted field at end of input without
/// complaint. Once the inner reader reports EOF, `is_inside_quotes` tells
/// whether the input stopped in the middle of a quoted field.
#[derive(Debug)]
pub struct QuoteGuard<R> {
    inner: R,
    state: QuoteState,
    line: u64,
    quote_opened_line: u64,
    bytes_seen: u64,
    at_eof: bool,
    bom: Bom,
}

impl<R: Read> QuoteGuard<R> {
    pub fn new(inner: R) -> Self {
        QuoteGuard {
            inner,
            state: QuoteState::StartField,
            line: 1,
            quote_opened_line: 0,
            bytes_seen: 0,
            at_eof: false,
            bom: Bom::Pending(0),
        }
    }

    pub fn is_inside_quotes(&self) -> bool {
        self.state == QuoteState::Quoted
    }

    pub fn at_eof(&self) -> bool {
        self.at_eof
    }

    pub fn bytes_seen(&self) -> u64 {
        self.bytes_seen
    }

    /// Line on which the most recent quoted field opened.
    pub fn quote_opened_line(&self) -> u64 {
        self.quote_opened_line
    }

    /// Number of leading BOM bytes the parser never sees.
    pub fn bom_len(&self) -> u64 {
        match self.bom {
            Bom::Skipped => UTF8_BOM.len() as u64,
            Bom::Pending(_) | Bom::Absent => 0,
        }
    }

    /// Returns true while `byte` belongs to a leading UTF-8 BOM.
    fn skip_bom(&mut self, byte: u8) -> bool {
        let Bom::Pending(matched) = self.bom else {
            return false;
        };
        if byte == UTF8_BOM[matched] {
            self.bom = if matched + 1 == UTF8_BOM.len() {
                Bom::Skipped
            } else {
                Bom::Pending(matched + 1)
            };
            return true;
        }
        self.bom = Bom::Absent;
        // The held-back prefix was ordinary field content.
        if matched > 0 {
            self.state = QuoteState::Unquoted;
        }
        false
    }

    fn observe(&mut self, byte: u8) {
        self.state = match (self.state, byte) {
            (QuoteState::StartField, QUOTE) => {
                self.quote_opened_line = self.line;
                QuoteState::Quoted
            }
            (QuoteState::Quoted, QUOTE) => QuoteState::QuoteInQuoted,
            (QuoteState::Quoted, _) => QuoteState::Quoted,
            (QuoteState::QuoteInQuoted, QUOTE) => QuoteState::Quoted,
            (_, DELIMITER | b'\n' | b'\r') => QuoteState::StartField,
            _ => QuoteState::Unquoted,
        };
        if byte == b'\n' {
            self.line += 1;
        }
    }
}

impl<R: Read> Read for QuoteGuard<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.at_eof = true;
        }
        for &byte in &buf[..n] {
            if !self.skip_bom(byte) {
                self.observe(byte);
            }
        }
        self.bytes_seen += n as u64;
        Ok(n)
    }
}

pub type SourceReader = csv::Reader<QuoteGuard<File>>;
pub type DestinationWriter = csv::Writer<File>;

/// Opens `path` as a headerless CSV source.
///
/// Every row is data and rows may differ in length.
pub fn open_source<P: AsRef<Path>>(path: P) -> Result<SourceReader> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(IoOp::OpenSource, path, e))?;
    // The CSV reader is buffered automatically, so the guard sees input in
    // buffer-sized chunks rather than byte by byte.
    Ok(csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(QuoteGuard::new(file)))
}

/// Creates (or truncates) `path` as a CSV destination.
pub fn open_destination<P: AsRef<Path>>(path: P) -> Result<DestinationWriter> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::io(IoOp::CreateDestination, path, e))?;
    Ok(csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(file))
}

/// Fails if the source stopped inside a quoted field.
///
/// Only meaningful once the last record handed out ended at the end of the
/// input; rows the caller never asked for are not inspected.
pub fn check_terminated<P: AsRef<Path>>(rdr: &SourceReader, path: P) -> Result<()> {
    let guard = rdr.get_ref();
    let consumed = rdr.position().byte() + guard.bom_len();
    let consumed_all = guard.at_eof() && consumed >= guard.bytes_seen();
    if (rdr.is_done() || consumed_all) && guard.is_inside_quotes() {
        return Err(Error::Parse {
            path: path.as_ref().to_path_buf(),
            line: guard.quote_opened_line(),
            reason: "unterminated quoted field at end of input".to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn guard_over(data: &[u8]) -> QuoteGuard<&[u8]> {
        let mut guard = QuoteGuard::new(data);
        io::copy(&mut guard, &mut io::sink()).unwrap();
        guard
    }

    #[test]
    fn balanced_quotes_end_outside() {
        let guard = guard_over(b"a,\"b,c\"\n\"say \"\"hi\"\"\",d\n");

        assert!(guard.at_eof());
        assert!(!guard.is_inside_quotes());
        assert_eq!(guard.bytes_seen(), 23);
    }

    #[test]
    fn unterminated_quote_ends_inside() {
        let guard = guard_over(b"a,b\nc,\"d\ne\n");

        assert!(guard.is_inside_quotes());
        assert_eq!(guard.quote_opened_line(), 2);
    }

    #[test]
    fn quote_inside_unquoted_field_is_literal() {
        let guard = guard_over(b"a\"b,c\n");

        assert!(!guard.is_inside_quotes());
    }

    #[test]
    fn text_after_closing_quote_is_not_quoted() {
        let guard = guard_over(b"\"ab\"c,d");

        assert!(!guard.is_inside_quotes());
    }

    #[test]
    fn leading_bom_is_not_field_content() {
        let guard = guard_over(b"\xEF\xBB\xBF\"a,\"\n");

        assert!(!guard.is_inside_quotes());
        assert_eq!(guard.bom_len(), 3);
    }

    #[test]
    fn unterminated_quote_after_bom_is_detected() {
        let guard = guard_over(b"\xEF\xBB\xBF\"a,b\n");

        assert!(guard.is_inside_quotes());
        assert_eq!(guard.quote_opened_line(), 1);
    }

    #[test]
    fn partial_bom_prefix_is_field_content() {
        let guard = guard_over(b"\xEF\"a\n");

        assert!(!guard.is_inside_quotes());
        assert_eq!(guard.bom_len(), 0);
    }

    #[test]
    fn open_source_reads_first_row_as_data() {
        let mut rdr = open_source("test-inputs/letters.csv").unwrap();
        let rows: Vec<csv::StringRecord> = rdr
            .records()
            .collect::<std::result::Result<_, _>>()
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].iter().collect::<Vec<_>>(), vec!["a", "b"]);
        check_terminated(&rdr, "test-inputs/letters.csv").unwrap();
    }

    #[test]
    fn open_source_accepts_ragged_rows() {
        let mut rdr = open_source("test-inputs/ragged.csv").unwrap();
        let lens: Vec<usize> = rdr.records().map(|r| r.unwrap().len()).collect();

        assert_eq!(lens, vec![1, 3, 2]);
    }

    #[test]
    fn open_source_missing_file_is_io_error() {
        let err = open_source("test-inputs/does-not-exist.csv").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn check_terminated_reports_unterminated_field() {
        let mut rdr = open_source("test-inputs/unterminated.csv").unwrap();
        for row in rdr.records() {
            row.unwrap();
        }

        let err = check_terminated(&rdr, "test-inputs/unterminated.csv").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Parse);
        match err {
            Error::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn destination_quotes_only_when_necessary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut wtr = open_destination(&path).unwrap();
        wtr.write_record(["plain", "with,comma", "with \"quote\"", "two\nlines", ""])
            .unwrap();
        wtr.flush().unwrap();
        drop(wtr);

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "plain,\"with,comma\",\"with \"\"quote\"\"\",\"two\nlines\",\n"
        );
    }
}
