//! Flat-file table backed by a quoted CSV file.
//!
//! Layout: one header row naming [`Record::COLUMNS`], then one row per
//! record with every field quoted. Every write goes to a temp sibling that is
//! fsynced and renamed over the table, so a crash leaves either the old or
//! the new file, never a truncated one.
//!
//! Rows that fail to decode are never discarded. A row whose quoting runs
//! past its own line is cut back to that line and decoding resumes on the
//! next one, and a rewrite carries every undecodable line forward verbatim.

use super::lock::TableLock;
use super::{Mutation, Record, RecordStore, Scan, SkippedRow};
use crate::error::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Decoded rows plus the raw lines of every row that failed.
struct Snapshot<T> {
    scan: Scan<T>,
    damaged: Vec<DamagedRow>,
}

/// Undecodable line kept byte for byte so rewrites leave it in place.
#[derive(Debug)]
struct DamagedRow {
    /// Number of decoded records preceding it
    after: usize,
    raw: Vec<u8>,
}

/// Durable [`RecordStore`] over a single CSV file.
#[derive(Debug)]
pub struct CsvStore<T> {
    path: PathBuf,
    lock: TableLock,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> CsvStore<T> {
    /// Open or create the table at `path`.
    ///
    /// A missing or empty file is initialized with the header row. An existing
    /// file with a different header is rejected.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = canonical_table_path(path.as_ref())?;
        let store = Self {
            lock: TableLock::for_table(&path),
            path,
            _record: PhantomData,
        };

        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        let _guard = self.lock.write()?;
        let is_empty = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };

        if is_empty {
            self.replace_with(&[], &[])?;
            tracing::info!(
                table = T::TABLE,
                path = %self.path.display(),
                schema_version = T::SCHEMA_VERSION,
                "Created table"
            );
        } else {
            self.check_header()?;
            tracing::debug!(table = T::TABLE, path = %self.path.display(), "Opened table");
        }
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    fn check_header(&self) -> Result<()> {
        let file = File::open(&self.path)?;
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(BufReader::new(file));
        verify_header::<T>(reader.headers()?)
    }

    /// Decodes the whole file. Caller holds a read or write guard.
    fn read_rows(&self) -> Result<Snapshot<T>> {
        let bytes = fs::read(&self.path)?;
        let mut reader = table_reader(&bytes);
        let mut headers = ::csv::StringRecord::new();
        reader.read_record(&mut headers)?;
        verify_header::<T>(&headers)?;

        let mut snapshot = Snapshot {
            scan: Scan::default(),
            damaged: Vec::new(),
        };
        // Byte offset and line number the current reader started at.
        let mut base = 0;
        let mut base_line = 1;

        let mut row = ::csv::ByteRecord::new();
        while reader.read_byte_record(&mut row)? {
            let (start, line) = match row.position() {
                Some(pos) => (base + pos.byte() as usize, base_line + pos.line() - 1),
                None => (base, base_line),
            };
            let end = base + reader.position().byte() as usize;
            let raw = &bytes[start..end];

            let record = std::mem::replace(&mut row, ::csv::ByteRecord::new());
            let reason = match decode_row::<T>(record, &headers, line) {
                Ok(decoded) => {
                    snapshot.scan.records.push(decoded);
                    continue;
                }
                Err(Error::MalformedRecord { reason, .. }) => reason,
                Err(e) => return Err(e),
            };

            tracing::warn!(
                table = T::TABLE,
                line,
                reason = %reason,
                "Skipping malformed record"
            );
            snapshot.scan.skipped.push(SkippedRow { line, reason });

            match first_line_break(raw) {
                Some(cut) => {
                    // An open quote swallowed the following lines; resume after
                    // the first one.
                    snapshot.damaged.push(DamagedRow {
                        after: snapshot.scan.records.len(),
                        raw: raw[..=cut].to_vec(),
                    });
                    base = start + cut + 1;
                    base_line = line + 1;
                    reader = table_reader(&bytes[base..]);
                }
                None => snapshot.damaged.push(DamagedRow {
                    after: snapshot.scan.records.len(),
                    raw: raw.to_vec(),
                }),
            }
        }

        Ok(snapshot)
    }

    /// Writes header plus `records` to the temp file and renames it into place.
    ///
    /// Each damaged line is written back ahead of the record that followed it
    /// when it was read.
    fn replace_with(&self, records: &[T], damaged: &[DamagedRow]) -> Result<()> {
        let tmp = self.temp_path();
        let result = self.write_temp(&tmp, records, damaged);
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn write_temp(&self, tmp: &Path, records: &[T], damaged: &[DamagedRow]) -> Result<()> {
        let mut file = File::create(tmp)?;
        {
            let mut writer = row_writer(&mut file);
            writer.write_record(T::COLUMNS)?;
            let mut pending = damaged.iter().peekable();
            for (index, record) in records.iter().enumerate() {
                while let Some(row) = pending.next_if(|row| row.after <= index) {
                    write_raw(&mut writer, &row.raw)?;
                }
                writer.serialize(record)?;
            }
            for row in pending {
                write_raw(&mut writer, &row.raw)?;
            }
            writer.flush()?;
        }
        file.sync_all()?;
        commit(tmp, &self.path)
    }

    /// Copies the table to the temp file, appends `records`, renames it into place.
    fn append_rows(&self, records: &[T]) -> Result<()> {
        let tmp = self.temp_path();
        let result = self.append_temp(&tmp, records);
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn append_temp(&self, tmp: &Path, records: &[T]) -> Result<()> {
        fs::copy(&self.path, tmp)?;
        let mut file = OpenOptions::new().read(true).append(true).open(tmp)?;
        if !ends_with_newline(&mut file)? {
            file.write_all(b"\n")?;
        }
        {
            let mut writer = row_writer(&mut file);
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        file.sync_all()?;
        commit(tmp, &self.path)
    }

    fn apply(&self, mutation: Mutation<T>, damaged: &[DamagedRow]) -> Result<()> {
        match mutation {
            Mutation::None => Ok(()),
            Mutation::Append(record) => {
                self.append_rows(std::slice::from_ref(&record))?;
                tracing::debug!(table = T::TABLE, "Appended 1 row");
                Ok(())
            }
            Mutation::AppendAll(records) => {
                if records.is_empty() {
                    return Ok(());
                }
                self.append_rows(&records)?;
                tracing::debug!(table = T::TABLE, rows = records.len(), "Appended rows");
                Ok(())
            }
            Mutation::Rewrite(records) => {
                self.replace_with(&records, damaged)?;
                tracing::debug!(
                    table = T::TABLE,
                    rows = records.len(),
                    kept_malformed = damaged.len(),
                    "Rewrote table"
                );
                Ok(())
            }
        }
    }
}

impl<T: Record> RecordStore<T> for CsvStore<T> {
    fn scan(&self) -> Result<Scan<T>> {
        let _guard = self.lock.read()?;
        self.read_rows().map(|snapshot| snapshot.scan)
    }

    fn transact<R, F>(&self, plan: F) -> Result<R>
    where
        F: FnOnce(&[T]) -> Result<(Mutation<T>, R)>,
    {
        let _guard = self.lock.write()?;
        let snapshot = self.read_rows()?;
        let (mutation, value) = plan(&snapshot.scan.records)?;
        self.apply(mutation, &snapshot.damaged)?;
        Ok(value)
    }

    // A blind append needs no snapshot.
    fn append(&self, record: &T) -> Result<()> {
        let _guard = self.lock.write()?;
        self.apply(Mutation::Append(record.clone()), &[])
    }

    // Replaces everything, undecodable lines included.
    fn rewrite_all(&self, records: &[T]) -> Result<()> {
        let _guard = self.lock.write()?;
        self.replace_with(records, &[])
    }
}

/// Resolves `path` to an absolute path with a canonical parent, creating the
/// parent directory if needed. The table file itself may not exist yet.
fn canonical_table_path(path: &Path) -> Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        Error::InvalidInput(format!("table path has no file name: {}", path.display()))
    })?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    Ok(fs::canonicalize(&parent)?.join(file_name))
}

fn table_reader(bytes: &[u8]) -> ::csv::Reader<&[u8]> {
    ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes)
}

fn row_writer<W: Write>(inner: W) -> ::csv::Writer<W> {
    ::csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(::csv::QuoteStyle::Always)
        .from_writer(inner)
}

fn verify_header<T: Record>(headers: &::csv::StringRecord) -> Result<()> {
    if headers.iter().eq(T::COLUMNS.iter().copied()) {
        return Ok(());
    }
    Err(Error::Schema {
        table: T::TABLE,
        version: T::SCHEMA_VERSION,
        expected: T::COLUMNS.join(","),
        found: headers.iter().collect::<Vec<_>>().join(","),
    })
}

fn decode_row<T: Record>(
    row: ::csv::ByteRecord,
    headers: &::csv::StringRecord,
    line: u64,
) -> Result<T> {
    let malformed = |reason: String| Error::MalformedRecord { line, reason };
    let row = ::csv::StringRecord::from_byte_record(row).map_err(|e| malformed(e.to_string()))?;
    if row.len() != T::COLUMNS.len() {
        return Err(malformed(format!(
            "expected {} fields, found {}",
            T::COLUMNS.len(),
            row.len()
        )));
    }
    row.deserialize(Some(headers))
        .map_err(|e| malformed(e.to_string()))
}

/// Offset of the first line break inside `raw`, ignoring its own terminator.
fn first_line_break(raw: &[u8]) -> Option<usize> {
    let body = match raw {
        [body @ .., b'\r', b'\n'] | [body @ .., b'\n'] => body,
        _ => raw,
    };
    body.iter().position(|&b| b == b'\n')
}

/// Writes an undecodable line back unchanged, newline-terminated.
fn write_raw(writer: &mut ::csv::Writer<&mut File>, raw: &[u8]) -> Result<()> {
    writer.flush()?;
    let mut out: &File = writer.get_ref();
    out.write_all(raw)?;
    if !raw.ends_with(b"\n") {
        out.write_all(b"\n")?;
    }
    Ok(())
}

fn ends_with_newline(file: &mut File) -> Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Atomically moves `tmp` over `target` and flushes the directory entry.
fn commit(tmp: &Path, target: &Path) -> Result<()> {
    fs::rename(tmp, target)?;
    #[cfg(unix)]
    {
        if let Some(parent) = target.parent() {
            File::open(parent)?.sync_all()?;
        }
    }
    Ok(())
}
