//! The parametrized plotting pipeline.
//!
//! One configurable path from a sample list to a directory of figures:
//! resolve samples, read and merge tables, categorize, histogram each
//! variable, and render every requested (normalize, log) combination.
//! Category colours, legend texts and styles are explicit configuration
//! with analysis defaults, not scattered constants.

use std::collections::BTreeMap;
use std::path::PathBuf;

use itertools::Itertools;

use crate::categorize::{self, Categories};
use crate::error::{Error, Result};
use crate::hist::build_histogram_from_table;
use crate::io::{hdf5, samples, Bounds};
use crate::plot::render::{render_figure, DEFAULT_SIZE};
use crate::plot::{layout, palette, Annotations, HistStyle, PlotRequest, SeriesStyle};
use crate::table::EventTable;
use crate::variable::read_variables;

/// How to turn the input samples into plotted series.
#[derive(Debug, Clone)]
pub enum CategoryMode {
    /// One series per sample, no categorization.
    All,
    /// Split by a boolean gen-matching branch.
    GenMatch { branch: String },
    /// Charge-sign background categories from a gen-match flag and two
    /// charge branches.
    SignBkg {
        genmatch_branch: String,
        charge_branch1: String,
        charge_branch2: String,
    },
}

impl CategoryMode {
    fn extra_branches(&self) -> Vec<String> {
        match self {
            CategoryMode::All => vec![],
            CategoryMode::GenMatch { branch } => vec![branch.clone()],
            CategoryMode::SignBkg { genmatch_branch, charge_branch1, charge_branch2 } => {
                vec![genmatch_branch.clone(), charge_branch1.clone(), charge_branch2.clone()]
            }
        }
    }

    fn categories(&self) -> Option<Categories> {
        match self {
            CategoryMode::All => None,
            CategoryMode::GenMatch { branch } => Some(categorize::genmatch_split(branch)),
            CategoryMode::SignBkg { genmatch_branch, charge_branch1, charge_branch2 } => Some(
                categorize::signbkg_split(genmatch_branch, charge_branch1, charge_branch2),
            ),
        }
    }

    /// Labels stacked in the non-normalized variants.
    fn stack_labels(&self, series_labels: &[String]) -> Vec<String> {
        match self {
            // Samples stack on top of each other.
            CategoryMode::All => series_labels.to_vec(),
            CategoryMode::GenMatch { .. } => series_labels.to_vec(),
            CategoryMode::SignBkg { .. } => {
                vec!["OS-notmatched".to_string(), "OS-matched".to_string()]
            }
        }
    }

    /// Default palette, legend texts and fill styles for this mode's
    /// categories. Series without an entry fall back to a grey step.
    pub fn default_styles(&self) -> BTreeMap<String, SeriesStyle> {
        let mut styles = BTreeMap::new();
        match self {
            CategoryMode::All => {}
            CategoryMode::GenMatch { .. } => {
                styles.insert("matched".to_string(), SeriesStyle {
                    color: palette::DARK_ORCHID,
                    style: HistStyle::Step,
                    label: "Gen-matched".to_string(),
                });
                styles.insert("notmatched".to_string(), SeriesStyle {
                    color: palette::DODGER_BLUE,
                    style: HistStyle::Fill,
                    label: "Not gen-matched".to_string(),
                });
            }
            CategoryMode::SignBkg { .. } => {
                styles.insert("OS-matched".to_string(), SeriesStyle {
                    color: palette::DARK_ORCHID,
                    style: HistStyle::Fill,
                    label: "OS, gen-matched".to_string(),
                });
                styles.insert("OS-notmatched".to_string(), SeriesStyle {
                    color: palette::DODGER_BLUE,
                    style: HistStyle::Fill,
                    label: "OS, not gen-matched".to_string(),
                });
                styles.insert("SS".to_string(), SeriesStyle {
                    color: palette::RED,
                    style: HistStyle::Step,
                    label: "SS".to_string(),
                });
                styles.insert("pp".to_string(), SeriesStyle {
                    color: palette::GOLD,
                    style: HistStyle::Step,
                    label: "SS ($++$)".to_string(),
                });
                styles.insert("nn".to_string(), SeriesStyle {
                    color: palette::FOREST_GREEN,
                    style: HistStyle::Step,
                    label: "SS ($--$)".to_string(),
                });
            }
        }
        styles
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Sample list: JSON file or a directory of `.h5` files.
    pub samplelist: PathBuf,
    /// TOML file with variable definitions.
    pub variables: PathBuf,
    pub outputdir: PathBuf,
    pub mode: CategoryMode,
    /// Optional JSON merge map `{merged_tag: [tag patterns]}`.
    pub merge: Option<PathBuf>,
    pub weight_branch: Option<String>,
    pub bounds: Bounds,
    /// Also produce unit-normalized variants.
    pub do_normalized: bool,
    /// Also produce log-scale variants.
    pub do_log: bool,
    pub annotations: Annotations,
    /// Figure file extension, `png` or `svg`.
    pub image_format: String,
    /// Extra per-series style overrides, merged over the mode defaults.
    pub style_overrides: BTreeMap<String, SeriesStyle>,
}

pub fn run(config: &PipelineConfig) -> Result<()> {
    let variables = read_variables(&config.variables)?;

    let mut branches: Vec<String> = variables.iter().map(|v| v.field.clone()).collect();
    branches.extend(config.mode.extra_branches());
    if let Some(weight) = &config.weight_branch {
        branches.push(weight.clone());
    }
    let branches: Vec<String> = branches.into_iter().unique().collect();

    // Read one merged table per sample, in sample-list order.
    let files = samples::find_files(&config.samplelist)?;
    let mut tables: Vec<(String, EventTable)> = vec![];
    for (tag, sample_files) in &files {
        let table = hdf5::read_sample(tag, sample_files, &branches, config.bounds)?;
        tables.push((tag.clone(), table));
    }
    if let Some(merge_path) = &config.merge {
        let merge_map = samples::read_merge_map(merge_path)?;
        tables = samples::merge_samples(tables, &merge_map)?;
    }

    // Categorize once; the same partition is reused for every variable.
    let series_tables: Vec<(String, EventTable)> = match config.mode.categories() {
        None => tables,
        Some(categories) => {
            let parts: Vec<EventTable> = tables.into_iter().map(|(_, t)| t).collect();
            let (combined, dropped) = EventTable::concat(&parts)?;
            for field in dropped {
                eprintln!("WARNING: branch `{field}` dropped when combining samples");
            }
            categorize::split(&combined, &categories)?
        }
    };

    let mut styles = config.mode.default_styles();
    for (label, style) in &config.style_overrides {
        styles.insert(label.clone(), style.clone());
    }

    std::fs::create_dir_all(&config.outputdir)?;

    let series_labels: Vec<String> = series_tables.iter().map(|(l, _)| l.clone()).collect();
    let stack_labels = config.mode.stack_labels(&series_labels);

    let mut normalization = vec![false];
    if config.do_normalized {
        normalization.push(true);
    }
    let mut log_scales = vec![false];
    if config.do_log {
        log_scales.push(true);
    }

    for variable in &variables {
        println!("Plotting variable {}", variable.name);
        let series: Vec<(String, crate::hist::Histogram)> = series_tables
            .iter()
            .map(|(label, table)| {
                let hist =
                    build_histogram_from_table(table, variable, config.weight_branch.as_deref())
                        .map_err(|e| match e {
                            Error::NotFound(msg) => {
                                Error::NotFound(format!("series `{label}`: {msg}"))
                            }
                            other => other,
                        })?;
                Ok((label.clone(), hist))
            })
            .collect::<Result<_>>()?;

        for &normalize in &normalization {
            for &log_scale in &log_scales {
                let mut y_label = "Events".to_string();
                if normalize {
                    y_label.push_str(" (normalized)");
                }
                let request = PlotRequest {
                    bins: variable.bins.clone(),
                    series: series.clone(),
                    points: None,
                    // Normalized variants compare shapes, so nothing stacks.
                    stack: if normalize { vec![] } else { stack_labels.clone() },
                    styles: styles.clone(),
                    normalize,
                    log_scale,
                    x_label: Some(variable.axis_label()),
                    y_label: Some(y_label),
                    annotations: config.annotations.clone(),
                };
                let figure = layout(&request)?;

                let mut name = variable.name.clone();
                if normalize {
                    name.push_str("_norm");
                }
                if log_scale {
                    name.push_str("_log");
                }
                let path = config
                    .outputdir
                    .join(format!("{name}.{}", config.image_format));
                render_figure(&figure, &path, DEFAULT_SIZE)?;
            }
        }
    }
    Ok(())
}
