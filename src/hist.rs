//! Binned counts with per-bin statistical uncertainties.
//!
//! Built on `ndhistogram` with a no-flow variable-width axis: values outside
//! `[bins[0], bins[-1])` fall into no bin. The weighted-sum accumulator
//! tracks the sum of squared weights per bin, so the statistical error is
//! `sqrt(sum w^2)`, which reduces to `sqrt(N)` for unweighted fills.

use ndhistogram::axis::VariableNoFlow;
use ndhistogram::value::WeightedSum;
use ndhistogram::{ndhistogram, Histogram as _};

use crate::error::{Error, Result};
use crate::table::EventTable;
use crate::variable::{validate_bins, Variable};

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Bin contents, length `len(bins) - 1`.
    pub counts: Vec<f64>,
    /// Per-bin statistical uncertainty, same length.
    pub stat_errors: Vec<f64>,
}

impl Histogram {
    pub fn n_bins(&self) -> usize { self.counts.len() }

    /// `sum(counts[i] * widths[i])`, or the plain sum when no widths given.
    pub fn integral(&self, widths: Option<&[f64]>) -> f64 {
        match widths {
            Some(widths) => self.counts.iter().zip(widths).map(|(c, w)| c * w).sum(),
            None => self.counts.iter().sum(),
        }
    }

    /// Divide counts and errors by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for c in &mut self.counts { *c /= factor; }
        for e in &mut self.stat_errors { *e /= factor; }
    }

    /// Floor the counts at `min`. Errors are left untouched.
    pub fn clip_min(&mut self, min: f64) {
        for c in &mut self.counts {
            if *c < min { *c = min; }
        }
    }
}

/// Bin `values` (optionally weighted) into `bins`.
///
/// Omitted weights behave as all-1.0. Identical inputs always produce
/// bit-identical outputs.
pub fn build_histogram(values: &[f64], bins: &[f64], weights: Option<&[f64]>) -> Result<Histogram> {
    validate_bins(bins).map_err(Error::Config)?;
    if let Some(weights) = weights {
        if weights.len() != values.len() {
            return Err(Error::Schema(format!(
                "{} weights for {} values",
                weights.len(),
                values.len()
            )));
        }
    }
    let mut hist = ndhistogram!(VariableNoFlow::new(bins.to_vec()); WeightedSum);
    match weights {
        Some(weights) => {
            for (value, weight) in values.iter().zip(weights) {
                hist.fill_with(value, *weight);
            }
        }
        None => {
            for value in values {
                hist.fill_with(value, 1.0);
            }
        }
    }
    let n = bins.len() - 1;
    let mut counts = Vec::with_capacity(n);
    let mut stat_errors = Vec::with_capacity(n);
    for i in 0..n {
        let bin = hist.value_at_index(i).cloned().unwrap_or_default();
        counts.push(bin.get());
        stat_errors.push(bin.variance().sqrt());
    }
    Ok(Histogram { counts, stat_errors })
}

/// Histogram one variable of a table, weighted by an optional weight branch.
pub fn build_histogram_from_table(
    table: &EventTable,
    variable: &Variable,
    weight_field: Option<&str>,
) -> Result<Histogram> {
    let values = table.column(&variable.field).ok_or_else(|| {
        Error::NotFound(format!(
            "variable `{}`: column `{}` not in table",
            variable.name, variable.field
        ))
    })?;
    let weights: Option<Vec<f64>> = match weight_field {
        Some(field) => Some(
            table
                .column(field)
                .ok_or_else(|| Error::NotFound(format!("weight column `{field}` not in table")))?
                .to_vec(),
        ),
        None => None,
    };
    build_histogram(&values.to_vec(), &variable.bins, weights.as_deref())
}
