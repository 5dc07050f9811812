//! Sample list resolution: map logical sample tags to concrete files.
//!
//! A sample list is one of:
//! - a JSON file holding a dict `{tag: [paths...]}`,
//! - a JSON file holding a bare list of paths (each path becomes its own
//!   sample, tagged by file stem),
//! - a directory (every `.h5` file in it becomes its own sample).
//!
//! Paths may contain unix-style wildcards. A pattern matching nothing is
//! only a warning, but a sample whose final file list is empty is an error:
//! there is nothing meaningful to plot for it.

use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::table::EventTable;

/// Ordered `tag -> files` mapping.
pub type SampleFiles = Vec<(String, Vec<PathBuf>)>;

/// Resolve a sample list to files, in a deterministic order.
///
/// Dict keys are visited in the order serde_json yields them (sorted);
/// bare lists and directory listings keep their natural order. Glob
/// expansion is sorted by the `glob` crate.
pub fn find_files(samplelist: &Path) -> Result<SampleFiles> {
    let mut samples: SampleFiles = if samplelist.is_dir() {
        find_files_in_dir(samplelist)?
    } else {
        find_files_in_json(samplelist)?
    };
    for (tag, files) in &mut samples {
        if files.is_empty() {
            return Err(Error::NotFound(format!(
                "sample `{tag}` in {}: no files resolved",
                samplelist.display()
            )));
        }
        files.dedup();
    }
    Ok(samples)
}

fn find_files_in_dir(dir: &Path) -> Result<SampleFiles> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|entry| Ok(entry?.path()))
        .filter_ok(|path| path.extension().is_some_and(|ext| ext == "h5"))
        .collect::<Result<_>>()?;
    files.sort();
    if files.is_empty() {
        return Err(Error::NotFound(format!(
            "directory {} contains no .h5 files",
            dir.display()
        )));
    }
    Ok(files.into_iter().map(|f| (stem_of(&f), vec![f])).collect())
}

fn find_files_in_json(path: &Path) -> Result<SampleFiles> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::NotFound(format!("sample list {}: {e}", path.display())))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| Error::Config(format!("sample list {}: {e}", path.display())))?;
    let mut samples: SampleFiles = vec![];
    match value {
        serde_json::Value::Array(patterns) => {
            for pattern in patterns {
                let pattern = as_str(&pattern, path)?;
                let tag = stem_of(Path::new(&pattern));
                push_files(&mut samples, &tag, &pattern)?;
            }
        }
        serde_json::Value::Object(map) => {
            for (tag, patterns) in map {
                let patterns = patterns.as_array().ok_or_else(|| {
                    Error::Config(format!(
                        "sample list {}: value for `{tag}` is not a list",
                        path.display()
                    ))
                })?;
                for pattern in patterns {
                    let pattern = as_str(pattern, path)?;
                    push_files(&mut samples, &tag, &pattern)?;
                }
                if !samples.iter().any(|(t, _)| t == &tag) {
                    samples.push((tag, vec![]));
                }
            }
        }
        _ => {
            return Err(Error::Config(format!(
                "sample list {}: expected a JSON list or dict",
                path.display()
            )))
        }
    }
    Ok(samples)
}

fn as_str(value: &serde_json::Value, path: &Path) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Config(format!("sample list {}: non-string path entry", path.display())))
}

fn push_files(samples: &mut SampleFiles, tag: &str, pattern: &str) -> Result<()> {
    let matched: Vec<PathBuf> = glob::glob(pattern)
        .map_err(|e| Error::Config(format!("bad pattern `{pattern}`: {e}")))?
        .filter_map(|entry| entry.ok())
        .collect();
    if matched.is_empty() {
        eprintln!("WARNING: pattern `{pattern}` did not match any files");
    }
    match samples.iter_mut().find(|(t, _)| t == tag) {
        Some((_, files)) => files.extend(matched),
        None => samples.push((tag.to_string(), matched)),
    }
    Ok(())
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Merge samples into coarser ones.
///
/// `merge_map` maps a merged tag to a list of glob-style patterns over
/// sample tags. Matched samples are concatenated in their original order;
/// samples matched by no pattern pass through unchanged.
pub fn merge_samples(
    samples: Vec<(String, EventTable)>,
    merge_map: &[(String, Vec<String>)],
) -> Result<Vec<(String, EventTable)>> {
    let mut merged: Vec<(String, EventTable)> = vec![];
    let mut consumed: Vec<&str> = vec![];
    for (merged_tag, patterns) in merge_map {
        let matchers = patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| Error::Config(format!("bad merge pattern `{p}`: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        let parts: Vec<&(String, EventTable)> = samples
            .iter()
            .filter(|(tag, _)| matchers.iter().any(|m| m.matches(tag)))
            .collect();
        if parts.is_empty() {
            continue;
        }
        let tables: Vec<EventTable> = parts.iter().map(|(_, t)| t.clone()).collect();
        let (table, dropped) = EventTable::concat(&tables)?;
        for field in dropped {
            eprintln!("WARNING: field `{field}` dropped while merging sample `{merged_tag}`");
        }
        for (tag, _) in &parts {
            consumed.push(tag.as_str());
        }
        merged.push((merged_tag.clone(), table));
    }
    for (tag, table) in samples.iter() {
        if !consumed.contains(&tag.as_str()) {
            merged.push((tag.clone(), table.clone()));
        }
    }
    Ok(merged)
}

/// Read a merge map from a JSON file of the form `{merged_tag: [patterns]}`.
pub fn read_merge_map(path: &Path) -> Result<Vec<(String, Vec<String>)>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::NotFound(format!("merge map {}: {e}", path.display())))?;
    let map: std::collections::BTreeMap<String, Vec<String>> = serde_json::from_str(&text)
        .map_err(|e| Error::Config(format!("merge map {}: {e}", path.display())))?;
    Ok(map.into_iter().collect())
}
