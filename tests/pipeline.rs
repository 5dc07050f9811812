use std::collections::BTreeMap;
use std::path::Path;

use hdf5::types::VarLenArray;

use hcplot::io::Bounds;
use hcplot::pipeline::{run, CategoryMode, PipelineConfig};
use hcplot::plot::Annotations;
use hcplot::Error;

type BoxErr<T> = Result<T, Box<dyn std::error::Error>>;

/// A small ntuple: four events with 2 + 0 + 1 + 2 candidates.
fn write_ntuple(path: &Path) -> hdf5::Result<()> {
    let file = hdf5::File::create(path)?;
    let mass: Vec<VarLenArray<f32>> = vec![
        VarLenArray::from_slice(&[1.85, 2.05]),
        VarLenArray::from_slice(&[]),
        VarLenArray::from_slice(&[1.97]),
        VarLenArray::from_slice(&[1.91, 2.11]),
    ];
    file.new_dataset_builder().with_data(&mass).create("DsMeson_mass")?;
    let matched: Vec<VarLenArray<bool>> = vec![
        VarLenArray::from_slice(&[true, false]),
        VarLenArray::from_slice(&[]),
        VarLenArray::from_slice(&[true]),
        VarLenArray::from_slice(&[false, false]),
    ];
    file.new_dataset_builder()
        .with_data(&matched)
        .create("DsMeson_hasFastGenmatch")?;
    let q1: Vec<VarLenArray<i32>> = vec![
        VarLenArray::from_slice(&[1, -1]),
        VarLenArray::from_slice(&[]),
        VarLenArray::from_slice(&[1]),
        VarLenArray::from_slice(&[-1, 1]),
    ];
    file.new_dataset_builder().with_data(&q1).create("KPlus_charge")?;
    let q2: Vec<VarLenArray<i32>> = vec![
        VarLenArray::from_slice(&[-1, -1]),
        VarLenArray::from_slice(&[]),
        VarLenArray::from_slice(&[1]),
        VarLenArray::from_slice(&[1, 1]),
    ];
    file.new_dataset_builder().with_data(&q2).create("KMinus_charge")?;
    Ok(())
}

fn write_variables(path: &Path) -> std::io::Result<()> {
    std::fs::write(path, r#"
        [[variables]]
        name = "mass"
        field = "DsMeson_mass"
        bins = [1.8, 1.9, 2.0, 2.1, 2.2]
        axis_title = "Candidate mass"
        unit = "GeV"
    "#)
}

fn base_config(dir: &Path, mode: CategoryMode) -> PipelineConfig {
    PipelineConfig {
        samplelist: dir.join("samples.json"),
        variables: dir.join("variables.toml"),
        outputdir: dir.join("plots"),
        mode,
        merge: None,
        weight_branch: None,
        bounds: Bounds::none(),
        do_normalized: false,
        do_log: false,
        annotations: Annotations {
            header_left: Some("CMS Simulation".into()),
            header_right: Some("2022 (13.6 TeV)".into()),
            corner_note: None,
        },
        image_format: "svg".into(),
        style_overrides: BTreeMap::new(),
    }
}

fn setup(dir: &Path) -> BoxErr<()> {
    let ntuple = dir.join("ntuple.h5");
    write_ntuple(&ntuple)?;
    write_variables(&dir.join("variables.toml"))?;
    std::fs::write(
        dir.join("samples.json"),
        format!(r#"{{"sim": ["{}"]}}"#, ntuple.display()),
    )?;
    Ok(())
}

#[test]
fn genmatch_pipeline_renders_all_variants() -> BoxErr<()> {
    let dir = tempfile::tempdir()?;
    setup(dir.path())?;
    let mut config = base_config(
        dir.path(),
        CategoryMode::GenMatch { branch: "DsMeson_hasFastGenmatch".into() },
    );
    config.do_normalized = true;
    config.do_log = true;
    run(&config)?;
    for name in ["mass.svg", "mass_norm.svg", "mass_log.svg", "mass_norm_log.svg"] {
        assert!(dir.path().join("plots").join(name).exists(), "missing {name}");
    }
    Ok(())
}

#[test]
fn signbkg_pipeline_renders() -> BoxErr<()> {
    let dir = tempfile::tempdir()?;
    setup(dir.path())?;
    let config = base_config(
        dir.path(),
        CategoryMode::SignBkg {
            genmatch_branch: "DsMeson_hasFastGenmatch".into(),
            charge_branch1: "KPlus_charge".into(),
            charge_branch2: "KMinus_charge".into(),
        },
    );
    run(&config)?;
    assert!(dir.path().join("plots").join("mass.svg").exists());
    Ok(())
}

#[test]
fn sample_mode_with_entry_bounds() -> BoxErr<()> {
    let dir = tempfile::tempdir()?;
    setup(dir.path())?;
    let mut config = base_config(dir.path(), CategoryMode::All);
    // Only events [0, 2): two candidates survive.
    config.bounds = Bounds::new(Some(0), Some(2));
    run(&config)?;
    assert!(dir.path().join("plots").join("mass.svg").exists());
    Ok(())
}

#[test]
fn unresolved_sample_fails_with_not_found() -> BoxErr<()> {
    let dir = tempfile::tempdir()?;
    setup(dir.path())?;
    std::fs::write(
        dir.path().join("samples.json"),
        format!(r#"{{"ghost": ["{}/missing_*.h5"]}}"#, dir.path().display()),
    )?;
    let config = base_config(dir.path(), CategoryMode::All);
    match run(&config) {
        Err(Error::NotFound(msg)) => assert!(msg.contains("ghost")),
        other => panic!("expected NotFound, got {other:?}"),
    }
    Ok(())
}
