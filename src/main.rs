use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;

use hcplot::io::Bounds;
use hcplot::pipeline::{run, CategoryMode, PipelineConfig};
use hcplot::plot::Annotations;

/// Command line interface for the plotting pipeline.
#[derive(clap::Parser, Debug, Clone)]
#[clap(
    name = "hcplot",
    about = "Categorized histogram comparison plots from flat ntuples",
)]
struct Cli {
    /// Sample list: JSON file ({tag: [paths]} or [paths]) or a directory of .h5 files
    #[clap(short = 'i', long)]
    samplelist: PathBuf,

    /// TOML file with variable definitions
    #[clap(short = 'v', long)]
    variables: PathBuf,

    /// Output directory for figures (created if missing)
    #[clap(short = 'o', long)]
    outputdir: PathBuf,

    /// Optional JSON merge map {merged_tag: [tag patterns]}
    #[clap(long)]
    merge: Option<PathBuf>,

    /// Branch with per-candidate weights
    #[clap(long)]
    weight_branch: Option<String>,

    /// First event to read from each file (inclusive)
    #[clap(long)]
    entry_start: Option<usize>,

    /// Last event to read from each file (exclusive)
    #[clap(long)]
    entry_stop: Option<usize>,

    /// Also produce unit-normalized variants
    #[clap(long)]
    do_normalized: bool,

    /// Also produce log-scale variants
    #[clap(long)]
    do_log: bool,

    /// Bold header inside the axes, e.g. "CMS Simulation"
    #[clap(long)]
    header: Option<String>,

    /// Header above the axes, flush right, e.g. the luminosity
    #[clap(long)]
    lumi_header: Option<String>,

    /// Extra note under the header
    #[clap(long)]
    extra_info: Option<String>,

    /// Figure format: png or svg
    #[clap(long, default_value = "png")]
    format: String,

    #[clap(subcommand)]
    mode: Mode,
}

#[derive(clap::Parser, Debug, Clone)]
enum Mode {
    /// One series per sample, no categorization
    All,

    /// Split candidates by a boolean gen-matching branch
    Genmatch {
        /// Boolean branch flagging gen-matched candidates
        #[clap(long)]
        branch: String,
    },

    /// Charge-sign background categories (OS/SS/++/--)
    Signbkg {
        /// Boolean branch flagging gen-matched candidates
        #[clap(long)]
        genmatch_branch: String,

        /// Charge of the first track
        #[clap(long)]
        charge_branch1: String,

        /// Charge of the second track
        #[clap(long)]
        charge_branch2: String,
    },
}

fn main() -> hcplot::Result<()> {
    let args = Cli::parse();

    let mode = match args.mode {
        Mode::All => CategoryMode::All,
        Mode::Genmatch { branch } => CategoryMode::GenMatch { branch },
        Mode::Signbkg { genmatch_branch, charge_branch1, charge_branch2 } => {
            CategoryMode::SignBkg { genmatch_branch, charge_branch1, charge_branch2 }
        }
    };

    let config = PipelineConfig {
        samplelist: args.samplelist,
        variables: args.variables,
        outputdir: args.outputdir,
        mode,
        merge: args.merge,
        weight_branch: args.weight_branch,
        bounds: Bounds::new(args.entry_start, args.entry_stop),
        do_normalized: args.do_normalized,
        do_log: args.do_log,
        annotations: Annotations {
            header_left: args.header,
            header_right: args.lumi_header,
            corner_note: args.extra_info,
        },
        image_format: args.format,
        style_overrides: BTreeMap::new(),
    };
    run(&config)
}
