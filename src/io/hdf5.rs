//! Read event tables from HDF5 ntuples.
//!
//! Each branch is a 1-D dataset, either a flat scalar column (one row per
//! candidate) or a variable-length array column (one entry per event, many
//! candidates). Var-len columns are flattened depth-first, per event then
//! per candidate, so co-flattened branches stay row-aligned. All numeric
//! types are widened to `f64`.
//!
//! Branches are a best-effort projection: a requested branch missing from a
//! file is skipped for that file with a warning, and branches that do not
//! survive every file of a sample are dropped from the merged table.

use std::path::{Path, PathBuf};

use hdf5::types::{FloatSize, IntSize, TypeDescriptor as TD, VarLenArray};
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{s, Array1};

use super::Bounds;
use crate::error::{Error, Result};
use crate::table::EventTable;

/// Read one branch of one file as a 1-D array, restricted to `bounds`.
fn read_slice<T: hdf5::H5Type>(dataset: &hdf5::Dataset, bounds: Bounds) -> hdf5::Result<Array1<T>> {
    let Bounds { start, stop } = bounds;
    let n = dataset.shape().first().copied().unwrap_or(0);
    let lo = start.unwrap_or(0).min(n);
    let hi = stop.unwrap_or(n).min(n).max(lo);
    dataset.read_slice_1d::<T, _>(s![lo..hi])
}

fn widen<T: Copy>(data: Array1<T>, f: impl Fn(T) -> f64) -> Vec<f64> {
    data.iter().map(|&v| f(v)).collect()
}

fn read_jagged<T: hdf5::H5Type + Copy>(
    dataset: &hdf5::Dataset,
    bounds: Bounds,
    f: impl Fn(T) -> f64,
) -> hdf5::Result<Vec<f64>> {
    let events = read_slice::<VarLenArray<T>>(dataset, bounds)?;
    Ok(events
        .iter()
        .flat_map(|candidates| candidates.iter().map(|&v| f(v)))
        .collect())
}

/// Read a branch as a flat `f64` column, flattening var-len structure.
fn read_column(dataset: &hdf5::Dataset, bounds: Bounds) -> Result<Vec<f64>> {
    let descriptor = dataset.dtype()?.to_descriptor()?;
    let data = match descriptor {
        TD::Float(FloatSize::U8) => read_slice::<f64>(dataset, bounds)?.to_vec(),
        TD::Float(FloatSize::U4) => widen(read_slice::<f32>(dataset, bounds)?, f64::from),
        TD::Integer(IntSize::U1) => widen(read_slice::<i8>(dataset, bounds)?, f64::from),
        TD::Integer(IntSize::U2) => widen(read_slice::<i16>(dataset, bounds)?, f64::from),
        TD::Integer(IntSize::U4) => widen(read_slice::<i32>(dataset, bounds)?, f64::from),
        TD::Integer(IntSize::U8) => widen(read_slice::<i64>(dataset, bounds)?, |v| v as f64),
        TD::Unsigned(IntSize::U1) => widen(read_slice::<u8>(dataset, bounds)?, f64::from),
        TD::Unsigned(IntSize::U2) => widen(read_slice::<u16>(dataset, bounds)?, f64::from),
        TD::Unsigned(IntSize::U4) => widen(read_slice::<u32>(dataset, bounds)?, f64::from),
        TD::Unsigned(IntSize::U8) => widen(read_slice::<u64>(dataset, bounds)?, |v| v as f64),
        TD::Boolean => widen(read_slice::<bool>(dataset, bounds)?, |v| v as u8 as f64),
        TD::VarLenArray(inner) => match *inner {
            TD::Float(FloatSize::U8) => read_jagged::<f64>(dataset, bounds, |v| v)?,
            TD::Float(FloatSize::U4) => read_jagged::<f32>(dataset, bounds, f64::from)?,
            TD::Integer(IntSize::U4) => read_jagged::<i32>(dataset, bounds, f64::from)?,
            TD::Integer(IntSize::U8) => read_jagged::<i64>(dataset, bounds, |v| v as f64)?,
            TD::Boolean => read_jagged::<bool>(dataset, bounds, |v| v as u8 as f64)?,
            other => {
                return Err(Error::Schema(format!(
                    "unsupported var-len element type {other:?}"
                )))
            }
        },
        other => return Err(Error::Schema(format!("unsupported branch type {other:?}"))),
    };
    Ok(data)
}

/// Read the requested branches of one file into a table.
///
/// Branches missing from the file are skipped with a warning. Flattened
/// branches that disagree on row count are a schema error.
fn read_file_table(path: &Path, fields: &[String], bounds: Bounds) -> Result<EventTable> {
    let file = hdf5::File::open(path)?;
    let mut table = EventTable::new();
    for field in fields {
        let dataset = match file.dataset(field) {
            Ok(dataset) => dataset,
            Err(_) => {
                eprintln!(
                    "WARNING: branch `{field}` not found in {}, skipping it for this file",
                    path.display()
                );
                continue;
            }
        };
        let column = read_column(&dataset, bounds)?;
        if table.n_fields() > 0 && column.len() != table.n_rows() {
            return Err(Error::Schema(format!(
                "branch `{field}` in {} flattens to {} rows, expected {}",
                path.display(),
                column.len(),
                table.n_rows()
            )));
        }
        table.insert(field.clone(), column)?;
    }
    Ok(table)
}

/// Read one merged table for a sample.
///
/// Files are read in the order given and concatenated preserving row order;
/// no reordering or deduplication. `bounds` applies to each file's stored
/// rows, half-open.
pub fn read_sample(
    tag: &str,
    files: &[PathBuf],
    fields: &[String],
    bounds: Bounds,
) -> Result<EventTable> {
    if files.is_empty() {
        return Err(Error::NotFound(format!("sample `{tag}`: no files to read")));
    }
    let bar = ProgressBar::new(files.len() as u64).with_message(tag.to_string());
    let style = ProgressStyle::default_bar()
        .template("Reading {msg}: [{elapsed_precise}] {wide_bar} {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    let mut parts = Vec::with_capacity(files.len());
    for path in files {
        parts.push(read_file_table(path, fields, bounds)?);
        bar.inc(1);
    }
    bar.finish_and_clear();
    let (table, dropped) = EventTable::concat(&parts)?;
    for field in dropped {
        eprintln!("WARNING: branch `{field}` missing from some files of sample `{tag}`, dropped");
    }
    Ok(table)
}
