use std::fs::{self, File, OpenOptions};
use std::io::{Cursor, ErrorKind, Read, Seek as _, SeekFrom, Write as _};
use std::path::{Path, PathBuf};

use csv::{Reader, ReaderBuilder, StringRecord, Terminator, Trim, WriterBuilder};
use ecosnap_core::{Error, Result, SNAPSHOT_COLUMNS, SnapshotRecord};

/// CSV file holding one row per successful snapshot run.
///
/// The store only ever appends. Rows keep insertion order, and nothing is
/// deduplicated or sorted: two runs in the same period produce two rows.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    /// Location of the CSV file
    path: PathBuf,
}

impl SnapshotStore {
    /// Creates a store backed by `path`. Nothing is touched on disk yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every stored record in file order.
    ///
    /// A missing file, or one with no header row, is an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptStore`] if the header differs from
    /// [`SNAPSHOT_COLUMNS`] or a row cannot be decoded, and [`Error::Io`] if
    /// the file cannot be opened.
    pub fn load_existing(&self) -> Result<Vec<SnapshotRecord>> {
        let Some((mut reader, headers)) = self.open_rows()? else {
            return Ok(Vec::new());
        };

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        while self.next_record(&mut reader, &mut record)? {
            let row = record
                .deserialize(Some(&headers))
                .map_err(|error| self.row_error(&reader, &error))?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Checks the header row without reading any data rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptStore`] if the file exists with a different
    /// header.
    pub fn verify_header(&self) -> Result<()> {
        if let Some(headers) = self.read_header()? {
            self.check_header(&headers)?;
        }
        Ok(())
    }

    /// Appends `record` as the last row.
    ///
    /// Writes a header row first when the file is absent or has no header
    /// (zero-length or blank lines only), creating parent directories as
    /// needed. Existing rows are never read or rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Csv`] if the row cannot be written.
    pub fn append(&self, record: &SnapshotRecord) -> Result<()> {
        let needs_header = self.read_header()?.is_none();
        if needs_header {
            if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;
        if !ends_with_newline(&mut file)? {
            file.write_all(b"\n")?;
        }

        let mut writer = WriterBuilder::new()
            .has_headers(needs_header)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;

        tracing::debug!(path = %self.path.display(), created = needs_header, "appended snapshot row");
        Ok(())
    }

    /// Number of stored data rows.
    ///
    /// Checks the header and counts records without decoding them, so a row
    /// with a malformed value is still counted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptStore`] for a wrong header or a row that is
    /// not valid CSV, and [`Error::Io`] if the file cannot be opened.
    pub fn row_count(&self) -> Result<usize> {
        let Some((mut reader, _)) = self.open_rows()? else {
            return Ok(0);
        };
        let mut record = StringRecord::new();
        let mut count = 0;
        while self.next_record(&mut reader, &mut record)? {
            count += 1;
        }
        Ok(count)
    }

    /// Opens the file, mapping "not found" to `None`.
    fn open_existing(&self) -> Result<Option<File>> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(file)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// The header row, unvalidated. `None` when the file is missing or holds
    /// no header (zero-length or blank lines only). Only the start of the
    /// file is read.
    fn read_header(&self) -> Result<Option<StringRecord>> {
        let Some(file) = self.open_existing()? else {
            return Ok(None);
        };
        Ok(self.start_reader(file)?.map(|(_, headers)| headers))
    }

    /// Loads the whole file and returns a reader positioned after a valid
    /// header. Keeping the bytes lets errors report real line numbers.
    fn open_rows(&self) -> Result<Option<(Reader<Cursor<Vec<u8>>>, StringRecord)>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let opened = self.start_reader(Cursor::new(bytes))?;
        if let Some((_, headers)) = &opened {
            self.check_header(headers)?;
        }
        Ok(opened)
    }

    fn start_reader<R: Read>(&self, source: R) -> Result<Option<(Reader<R>, StringRecord)>> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(source);
        let headers = reader
            .headers()
            .map_err(|error| self.corrupt(format!("unreadable header: {error}")))?
            .clone();
        if headers.is_empty() {
            return Ok(None);
        }
        Ok(Some((reader, headers)))
    }

    fn next_record(
        &self,
        reader: &mut Reader<Cursor<Vec<u8>>>,
        record: &mut StringRecord,
    ) -> Result<bool> {
        reader
            .read_record(record)
            .map_err(|error| self.row_error(reader, &error))
    }

    /// Corrupt-store error naming the line of the record just read.
    fn row_error(&self, reader: &Reader<Cursor<Vec<u8>>>, error: &csv::Error) -> Error {
        let detail = match error.kind() {
            csv::ErrorKind::Deserialize { err, .. } => err.to_string(),
            csv::ErrorKind::UnequalLengths {
                expected_len, len, ..
            } => format!("expected {expected_len} fields, found {len}"),
            _ => error.to_string(),
        };
        self.corrupt(format!("row {}: {detail}", last_record_line(reader)))
    }

    fn check_header(&self, headers: &StringRecord) -> Result<()> {
        if headers.iter().eq(SNAPSHOT_COLUMNS) {
            return Ok(());
        }
        let missing: Vec<&str> = SNAPSHOT_COLUMNS
            .into_iter()
            .filter(|column| !headers.iter().any(|header| header == *column))
            .collect();
        let found = headers.iter().collect::<Vec<_>>().join(",");
        let detail = if missing.is_empty() {
            format!(
                "columns out of order or unexpected: expected `{}`, found `{found}`",
                SNAPSHOT_COLUMNS.join(",")
            )
        } else {
            format!("missing column(s) {} in header `{found}`", missing.join(", "))
        };
        Err(self.corrupt(detail))
    }

    fn corrupt(&self, detail: String) -> Error {
        Error::CorruptStore {
            path: self.path.clone(),
            detail,
        }
    }
}

/// Line of the record the reader just returned. The csv position is the line
/// after the consumed terminator, and blank lines before the record are
/// already counted in it.
fn last_record_line(reader: &Reader<Cursor<Vec<u8>>>) -> u64 {
    let position = reader.position();
    let consumed = usize::try_from(position.byte()).unwrap_or(usize::MAX);
    let ended_with_newline = consumed
        .checked_sub(1)
        .and_then(|last| reader.get_ref().get_ref().get(last))
        == Some(&b'\n');
    position.line() - u64::from(ended_with_newline)
}

/// Whether the last byte of a non-empty file is `\n`.
fn ends_with_newline(file: &mut File) -> Result<bool> {
    if file.seek(SeekFrom::End(0))? == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0_u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
