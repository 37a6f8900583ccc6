//! Merge stage
//!
//! Pairs the obfuscated and preserved streams of a table row by row,
//! applies fake-data substitution and writes the final dataset.

use csv::StringRecord;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use crate::core::pipeline::export::remove_if_exists;
use crate::core::pipeline::layout::{Stream, TablesLayout};
use crate::core::pipeline::manifest::TableHeaders;
use crate::domain::{ObfuscatorError, Result};
use crate::obfuscation::fake::{FakeGenerators, ResolvedFake};
use crate::obfuscation::model::TableConfig;
use crate::{log_table_complete, log_table_start};

/// Fake-data overrides of a table, in column order
pub fn resolve_fakes(table: &TableConfig) -> Result<Vec<(String, ResolvedFake)>> {
    table
        .columns
        .iter()
        .filter_map(|(name, column)| column.fake_data.as_ref().map(|fake| (name, fake)))
        .map(|(name, fake)| Ok((name.clone(), ResolvedFake::resolve(fake)?)))
        .collect()
}

/// Merge one table into `result/<table>.csv`
///
/// Returns the number of data rows written. On any failure no result file
/// is left behind.
pub fn merge_table(
    layout: &TablesLayout,
    table_name: &str,
    headers: &TableHeaders,
    fakes: &[(String, ResolvedFake)],
    generators: &Mutex<FakeGenerators>,
) -> Result<u64> {
    log_table_start!(table_name, "merge");
    let started = Instant::now();

    let output = layout.file(Stream::Result, table_name);
    let partial = partial_path(&output);
    remove_if_exists(&output)?;

    let rows = match write_merged(layout, table_name, headers, fakes, generators, &partial) {
        Ok(rows) => rows,
        Err(e) => {
            remove_if_exists(&partial)?;
            return Err(e);
        }
    };
    std::fs::rename(&partial, &output)?;

    log_table_complete!(table_name, "merge", rows, started.elapsed());
    Ok(rows)
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

fn write_merged(
    layout: &TablesLayout,
    table_name: &str,
    headers: &TableHeaders,
    fakes: &[(String, ResolvedFake)],
    generators: &Mutex<FakeGenerators>,
    partial: &Path,
) -> Result<u64> {
    let merged_headers = headers.merged();
    let fake_slots = fakes
        .iter()
        .map(|(column, fake)| {
            merged_headers
                .iter()
                .position(|h| h == column)
                .map(|index| (index, fake))
                .ok_or_else(|| {
                    ObfuscatorError::Configuration(format!(
                        "Fake-data column '{table_name}.{column}' is not part of the exported streams"
                    ))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut obfuscated = open_stream(
        &layout.file(Stream::Obfuscated, table_name),
        &headers.obfuscate_headers,
    )?;
    let mut preserved = open_stream(
        &layout.file(Stream::Excluded, table_name),
        &headers.preserve_headers,
    )?;

    let mut writer = csv::Writer::from_path(partial)?;
    writer.write_record(&merged_headers)?;

    let mut obfuscated_record = StringRecord::new();
    let mut preserved_record = StringRecord::new();
    let mut obfuscated_rows = 0usize;
    let mut preserved_rows = 0usize;
    let mut misaligned = false;

    loop {
        let has_obfuscated = match obfuscated.as_mut() {
            Some(reader) => reader.read_record(&mut obfuscated_record)?,
            None => false,
        };
        let has_preserved = match preserved.as_mut() {
            Some(reader) => reader.read_record(&mut preserved_record)?,
            None => false,
        };
        if !has_obfuscated && !has_preserved {
            break;
        }
        obfuscated_rows += usize::from(has_obfuscated);
        preserved_rows += usize::from(has_preserved);

        let aligned = (obfuscated.is_none() || has_obfuscated) && (preserved.is_none() || has_preserved);
        if !aligned {
            // Keep reading so the error reports both full counts
            misaligned = true;
        }
        if misaligned {
            continue;
        }

        let mut cells: Vec<String> = Vec::with_capacity(merged_headers.len());
        if has_obfuscated {
            cells.extend(obfuscated_record.iter().map(str::to_string));
        }
        if has_preserved {
            cells.extend(preserved_record.iter().map(str::to_string));
        }

        apply_fakes(&merged_headers, &mut cells, &fake_slots, generators)?;
        writer.write_record(&cells)?;
    }

    if misaligned {
        return Err(ObfuscatorError::StreamAlignment {
            table: table_name.to_string(),
            obfuscated_rows,
            preserved_rows,
        });
    }

    writer.flush()?;
    Ok(obfuscated_rows.max(preserved_rows) as u64)
}

/// Open a stream and check its header row; `None` when no columns are expected
fn open_stream(path: &Path, expected: &[String]) -> Result<Option<csv::Reader<File>>> {
    if expected.is_empty() {
        return Ok(None);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| {
            ObfuscatorError::Configuration(format!("Cannot open stream {}: {e}", path.display()))
        })?;

    let mut header = StringRecord::new();
    if !reader.read_record(&mut header)? {
        return Err(ObfuscatorError::Configuration(format!(
            "Stream {} has no header row",
            path.display()
        )));
    }
    if header.iter().ne(expected.iter().map(String::as_str)) {
        return Err(ObfuscatorError::Configuration(format!(
            "Stream {} has header {:?}, manifest expects {:?}",
            path.display(),
            header.iter().collect::<Vec<_>>(),
            expected
        )));
    }

    Ok(Some(reader))
}

/// Substitute fake values one column at a time, each seeing earlier results
fn apply_fakes(
    headers: &[String],
    cells: &mut [String],
    slots: &[(usize, &ResolvedFake)],
    generators: &Mutex<FakeGenerators>,
) -> Result<()> {
    for (index, fake) in slots {
        let value = {
            let row: HashMap<&str, &str> = headers
                .iter()
                .map(String::as_str)
                .zip(cells.iter().map(String::as_str))
                .collect();
            let mut generators = generators
                .lock()
                .map_err(|_| ObfuscatorError::Other("Fake generator state poisoned".to_string()))?;
            fake.render(&row, &mut generators)?
        };
        cells[*index] = value;
    }
    Ok(())
}
