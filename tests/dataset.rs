mod common;

use assert_matches::assert_matches;

use kira_nmr_quant::dataset::{LoadOptions, TargetedDataset};
use kira_nmr_quant::domain::FileType;
use kira_nmr_quant::error::NmrError;
use kira_nmr_quant::output::DatasetSummary;

use common::{RACK, crea_value, feature_name};

fn loaded(features: usize) -> (common::ReportTree, TargetedDataset) {
    let tree = common::urine_tree(features);
    let options = LoadOptions::new(FileType::BrukerQuantification, tree.root.clone())
        .sop("BrukerQuant-UR");
    let dataset = TargetedDataset::load_with(options).unwrap().dataset;
    (tree, dataset)
}

#[test]
fn loading_twice_gives_equal_datasets() {
    let tree = common::urine_tree(4);
    let load = || {
        let options = LoadOptions::new(FileType::BrukerQuantification, tree.root.clone())
            .sop("BrukerQuant-UR");
        TargetedDataset::load_with(options).unwrap().dataset
    };
    let first = load();
    let mut second = load();
    assert_eq!(first, second);

    second.exclude_samples(&[0], "rerun").unwrap();
    assert_ne!(first, second);
}

#[test]
fn excluding_samples_keeps_shapes_aligned() {
    let (_tree, mut dataset) = loaded(4);
    dataset.exclude_samples(&[0, 4], "failed shimming").unwrap();

    assert_eq!(dataset.shape(), (7, 4));
    assert!(dataset.study().is_consistent());
    assert_eq!(dataset.samples()[0].sample_file_name, format!("{RACK}/20"));
    assert_eq!(dataset.values().get(0, 0), Some(&crea_value(20, 0)));

    let excluded = dataset.excluded();
    assert_eq!(excluded.len(), 2);
    assert_eq!(excluded[1].label(), format!("{RACK}/50"));
    assert_eq!(excluded[0].reason(), "failed shimming");
}

#[test]
fn excluding_features_updates_both_partitions() {
    let (_tree, mut dataset) = loaded(4);
    let name = feature_name(2);
    dataset.exclude_features(&[name.as_str()], "below LOD").unwrap();

    assert_eq!(dataset.shape(), (9, 3));
    assert!(!dataset.feature_names().contains(&name.as_str()));
    assert_eq!(dataset.calibration().feature_names(), dataset.feature_names());
    assert_eq!(dataset.values().get(0, 2), Some(&crea_value(10, 3)));

    assert_matches!(
        dataset.exclude_features(&["Unknown"], "x"),
        Err(NmrError::UnknownFeature(_))
    );
}

#[test]
fn reordering_mirrors_matrices() {
    let (_tree, mut dataset) = loaded(2);
    let order: Vec<usize> = (0..9).rev().collect();
    dataset.reorder_samples(&order).unwrap();
    assert_eq!(dataset.samples()[0].sample_file_name, format!("{RACK}/90"));
    assert_eq!(dataset.values().get(0, 1), Some(&crea_value(90, 1)));
    // Run order belongs to the acquisition and moves with it.
    assert_eq!(dataset.samples()[0].run_order, 8);

    dataset.sort_samples_by_base_name().unwrap();
    assert_eq!(dataset.samples()[0].sample_file_name, format!("{RACK}/10"));
    assert_eq!(dataset.values().get(0, 1), Some(&crea_value(10, 1)));

    assert_matches!(
        dataset.reorder_samples(&[0, 1]),
        Err(NmrError::InvalidOrder(_))
    );
}

#[test]
fn summary_drops_not_exported_columns() {
    let tree = common::urine_tree(2);
    let options = LoadOptions::new(FileType::BrukerQuantification, tree.root.clone())
        .sop("BrukerQuant-UR");
    let outcome = TargetedDataset::load_with(options).unwrap();
    let summary = DatasetSummary::from_outcome(&outcome).unwrap();

    assert_eq!(summary.method, "Bruker Quant-UR Data");
    assert_eq!(summary.samples, 9);
    assert_eq!(summary.features, 2);
    assert_eq!(summary.state, "ready");
    assert!(summary.feature_metadata.iter().all(|row| !row.contains_key("comment")));
    assert_eq!(summary.sample_metadata[0]["Run Order"], 0);
}
