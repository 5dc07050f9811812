//! Variable descriptors: named scalar projections of ntuple branches.
//!
//! A variable couples a branch name to its binning and display metadata, and
//! is used uniformly by the reader (which branches to load), the histogram
//! builder (bin edges) and the renderer (axis titles). Loaded once from a
//! TOML file at program start, read-only afterwards.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Variable {
    /// Short name, used in output file names.
    pub name: String,

    /// Branch holding the values of this variable.
    pub field: String,

    /// Bin edges, strictly increasing, at least two.
    pub bins: Vec<f64>,

    /// X-axis title. Falls back to the branch name when absent.
    #[serde(default)]
    pub axis_title: Option<String>,

    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VariableFile {
    variables: Vec<Variable>,
}

impl Variable {
    pub fn validate(&self) -> Result<()> {
        validate_bins(&self.bins)
            .map_err(|msg| Error::Config(format!("variable `{}`: {msg}", self.name)))
    }

    pub fn n_bins(&self) -> usize { self.bins.len() - 1 }

    pub fn bin_widths(&self) -> Vec<f64> {
        self.bins.windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn bin_centres(&self) -> Vec<f64> {
        self.bins.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
    }

    /// Axis title with the unit appended in brackets, if there is one.
    pub fn axis_label(&self) -> String {
        let title = self.axis_title.as_deref().unwrap_or(&self.field);
        match self.unit.as_deref() {
            Some(unit) if !unit.is_empty() => format!("{title} [{unit}]"),
            _ => title.to_string(),
        }
    }
}

/// Bin edges must be strictly increasing and define at least one bin.
pub fn validate_bins(bins: &[f64]) -> std::result::Result<(), String> {
    if bins.len() < 2 {
        return Err(format!("needs at least 2 bin edges, got {}", bins.len()));
    }
    if bins.windows(2).any(|w| w[1] <= w[0]) {
        return Err("bin edges must be strictly increasing".into());
    }
    Ok(())
}

/// Read an ordered list of variable definitions from a TOML file.
pub fn read_variables(path: &Path) -> Result<Vec<Variable>> {
    let text = fs::read_to_string(path)?;
    let parsed: VariableFile = toml::from_str(&text)
        .map_err(|e| Error::Config(format!("variables file {}: {e}", path.display())))?;
    for variable in &parsed.variables {
        variable.validate()?;
    }
    Ok(parsed.variables)
}
