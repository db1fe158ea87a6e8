//! Model catalog: a directory of channel model records.
//!
//! The catalog directory is always passed in explicitly. Every regular file
//! in it is parsed as a model record, in lexicographic file-name order, so
//! the catalog order is stable across platforms.
//!
//! A malformed or unreadable file fails the whole load. Files are never
//! skipped silently.
//!
//! # CSV Export
//!
//! ```text
//! Title,Description,TX Time (ms),P00,P01,P10,P11
//! Urban LoS,Line of sight,100,0.9,0.1,0.2,0.8
//! ```
//!
//! After the rows are built, negative P00/P01 cells are replaced with
//! `0.001`. Models are already repaired on load, so this post-pass only
//! matters for models built some other way; it is kept independent from the
//! model repair so the exported file never carries a negative value.

use crate::error::{Error, Result};
use crate::model::{ChannelModel, PROBABILITY_EPSILON};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// CSV header row, in column order.
pub const CSV_HEADER: [&str; 7] = [
    "Title",
    "Description",
    "TX Time (ms)",
    "P00",
    "P01",
    "P10",
    "P11",
];

/// Columns clamped by the export post-pass (P00, P01).
const CLAMPED_COLUMNS: [usize; 2] = [3, 4];

/// A model together with the file it was loaded from.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub path: PathBuf,
    pub model: Arc<ChannelModel>,
}

/// Ordered collection of channel models.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    entries: Vec<CatalogEntry>,
}

impl ModelCatalog {
    /// Load every file in `dir`, sorted by file name.
    ///
    /// # Errors
    /// - `Io` if the directory cannot be listed
    /// - `CatalogIo` naming a file that cannot be inspected or read
    /// - `Catalog` naming the first file that fails to parse
    ///
    /// Symlinks are followed. Entries that are not regular files, such as
    /// subdirectories, are skipped with a debug log line.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let metadata = std::fs::metadata(&path).map_err(|source| Error::CatalogIo {
                path: path.clone(),
                source,
            })?;
            if metadata.is_file() {
                paths.push(path);
            } else {
                debug!(path = %path.display(), "Skipping catalog entry that is not a file");
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let text = std::fs::read_to_string(&path).map_err(|source| Error::CatalogIo {
                path: path.clone(),
                source,
            })?;
            let model = ChannelModel::parse(&text).map_err(|source| Error::Catalog {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), model = model.title(), "Loaded channel model");
            entries.push(CatalogEntry {
                path,
                model: Arc::new(model),
            });
        }

        info!(dir = %dir.display(), models = entries.len(), "Model catalog loaded");
        Ok(Self { entries })
    }

    /// Build a catalog from models already in memory, keeping their order.
    pub fn from_models(models: impl IntoIterator<Item = ChannelModel>) -> Self {
        let entries = models
            .into_iter()
            .map(|model| CatalogEntry {
                path: PathBuf::new(),
                model: Arc::new(model),
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<ChannelModel>> + '_ {
        self.entries.iter().map(|e| &e.model)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First model whose title matches exactly.
    pub fn find(&self, title: &str) -> Option<Arc<ChannelModel>> {
        self.entries
            .iter()
            .find(|e| e.model.title() == title)
            .map(|e| Arc::clone(&e.model))
    }

    /// Write the catalog as CSV.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        export_csv(self.models().map(|m| &**m), writer)
    }

    /// Write the catalog as CSV to `path`, replacing any existing file.
    pub fn export_csv_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_csv(&mut writer)?;
        writer.flush()?;
        info!(path = %path.display(), models = self.len(), "Exported model catalog");
        Ok(())
    }
}

/// Write `models` as CSV rows under [`CSV_HEADER`].
pub fn export_csv<'a, W: Write>(
    models: impl IntoIterator<Item = &'a ChannelModel>,
    mut writer: W,
) -> Result<()> {
    write_row(&mut writer, &CSV_HEADER)?;

    for model in models {
        let mut row = [
            model.title().to_string(),
            model.description().to_string(),
            model.tx_time_ms().to_string(),
            model.p00().to_string(),
            model.p01().to_string(),
            model.p10().to_string(),
            model.p11().to_string(),
        ];
        clamp_negative_cells(&mut row);
        write_row(&mut writer, &row)?;
    }

    Ok(())
}

/// Read models back from CSV written by [`export_csv`].
///
/// The header row is required and skipped. Empty lines between records are
/// ignored. A quoted field may span several lines; errors report the line
/// the record starts on.
pub fn read_csv<R: BufRead>(reader: R) -> Result<Vec<ChannelModel>> {
    let mut models = Vec::new();
    let mut seen_header = false;
    let mut record = String::new();
    let mut line_no = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if record.is_empty() {
            if line.trim().is_empty() {
                continue;
            }
            line_no = idx + 1;
        } else {
            record.push('\n');
        }
        record.push_str(&line);

        // Inside a quoted field: keep reading
        let Some(fields) = split_record(&record) else {
            continue;
        };
        record.clear();

        if fields.len() != CSV_HEADER.len() {
            return Err(Error::Csv {
                line: line_no,
                reason: format!("expected {} columns, got {}", CSV_HEADER.len(), fields.len()),
            });
        }

        if !seen_header {
            seen_header = true;
            continue;
        }

        let mut numbers = [0.0; 5];
        for (slot, (field, name)) in numbers
            .iter_mut()
            .zip(fields[2..].iter().zip(&CSV_HEADER[2..]))
        {
            *slot = field.trim().parse::<f64>().map_err(|_| Error::Csv {
                line: line_no,
                reason: format!("invalid number for {name}: {field:?}"),
            })?;
        }

        let [tx_time_ms, p00, p01, p10, p11] = numbers;
        models.push(ChannelModel::new(
            fields[0].as_str(),
            fields[1].as_str(),
            tx_time_ms,
            [p00, p01, p10, p11],
        ));
    }

    if !record.is_empty() {
        return Err(Error::Csv {
            line: line_no,
            reason: "unterminated quoted field".to_string(),
        });
    }

    Ok(models)
}

fn clamp_negative_cells(row: &mut [String; 7]) {
    for col in CLAMPED_COLUMNS {
        if row[col].parse::<f64>().is_ok_and(|v| v < 0.0) {
            row[col] = PROBABILITY_EPSILON.to_string();
        }
    }
}

fn write_row<W: Write, S: AsRef<str>>(writer: &mut W, fields: &[S]) -> std::io::Result<()> {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            writer.write_all(b",")?;
        }
        let field = field.as_ref();
        if field.contains([',', '"', '\n', '\r']) {
            write!(writer, "\"{}\"", field.replace('"', "\"\""))?;
        } else {
            writer.write_all(field.as_bytes())?;
        }
    }
    writer.write_all(b"\n")
}

/// Split one CSV record, honoring double-quoted fields.
///
/// Returns `None` while the record ends inside a quoted field.
fn split_record(record: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = record.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if in_quotes {
        return None;
    }
    fields.push(current);
    Some(fields)
}
