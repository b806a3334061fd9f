mod common;

use assert_matches::assert_matches;
use serde_json::json;

use kira_nmr_quant::dataset::{DatasetState, LoadOptions, LoadParams, Notice, TargetedDataset};
use kira_nmr_quant::domain::{FileType, QuantificationType};
use kira_nmr_quant::error::NmrError;

use common::{Acquisition, CREA, MMOL, RACK, ReportTree, crea_value, feature_name, lisa_report};

fn quant_ur(tree: &ReportTree) -> LoadOptions {
    LoadOptions::new(FileType::BrukerQuantification, tree.root.clone()).sop("BrukerQuant-UR")
}

#[test]
fn urine_reports_load_into_rectangular_dataset() {
    let tree = common::urine_tree(49);
    let outcome = TargetedDataset::load_with(quant_ur(&tree)).unwrap();
    let dataset = outcome.dataset;

    assert!(outcome.notices.is_empty());
    assert_eq!(dataset.state(), DatasetState::Ready);
    assert_eq!(dataset.shape(), (9, 49));
    assert_eq!(dataset.values().shape(), (9, 49));
    assert_eq!(dataset.expected().shape(), (9, 49));
    assert!(dataset.expected().get(0, 0).unwrap().is_none());

    let run_order: Vec<usize> = dataset.samples().iter().map(|s| s.run_order).collect();
    assert_eq!(run_order, (0..9).collect::<Vec<_>>());
    assert_eq!(dataset.samples()[0].sample_file_name, format!("{RACK}/10"));
    assert_eq!(dataset.samples()[8].expno, Some(90));

    assert!(dataset.features().iter().all(|f| f.unit == CREA));
    assert_eq!(dataset.features()[3].name, feature_name(3));
    assert_eq!(dataset.values().get(2, 5), Some(&crea_value(30, 5)));
    assert_eq!(
        dataset.features()[0].quantification_type,
        QuantificationType::QuantifiedOther
    );
    assert_eq!(dataset.features()[0].upper_reference_value, Some(150.0));

    assert_eq!(dataset.calibration().nsamples(), 0);
    assert_eq!(dataset.calibration().feature_names(), dataset.feature_names());
    assert!(dataset.calibration().is_consistent());
}

#[test]
fn explicit_unit_overrides_sop_default() {
    let tree = common::urine_tree(4);
    let outcome = TargetedDataset::load_with(quant_ur(&tree).unit(MMOL)).unwrap();
    let dataset = outcome.dataset;
    assert_eq!(dataset.shape(), (9, 4));
    assert!(dataset.features().iter().all(|f| f.unit == MMOL));
    assert_eq!(dataset.values().get(0, 1), Some(&(crea_value(10, 1) / 10.0)));
}

#[test]
fn unknown_unit_lists_available_units() {
    let tree = common::urine_tree(3);
    let err = TargetedDataset::load_with(quant_ur(&tree).unit("notAnExistingUnit")).unwrap_err();
    assert_matches!(&err, NmrError::UnitNotFound { requested, available }
        if requested == "notAnExistingUnit" && available.len() == 2);
    let message = err.to_string();
    assert!(message.contains(CREA));
    assert!(message.contains(MMOL));
}

#[test]
fn generic_sop_keeps_every_unit() {
    let tree = common::urine_tree(2);
    let options = LoadOptions::new(FileType::BrukerQuantification, tree.root.clone())
        .file_name_pattern(r"urine_quant_report_b\.xml$");
    let outcome = TargetedDataset::load_with(options).unwrap();
    // Both unit variants share a name, so the later one is folded away.
    assert_eq!(outcome.dataset.shape(), (9, 2));
    assert_eq!(
        outcome.notices,
        vec![Notice::DuplicateFeatures {
            names: vec![feature_name(0), feature_name(1)]
        }]
    );
    assert!(outcome.dataset.features().iter().all(|f| f.unit == CREA));
}

#[test]
fn duplicated_feature_collapses_to_first_occurrence() {
    let tree = ReportTree::new();
    let mut names: Vec<String> = (0..112).map(|idx| format!("LP{idx:03}")).collect();
    names.push("LP007".to_string());
    for n in 1..=10u32 {
        tree.write(
            &format!("Plasma/{}/pdata/1/results.xml", n * 10),
            &lisa_report(n * 10, &names),
        );
    }

    let options = LoadOptions::new(FileType::BrukerQuantification, tree.root.clone())
        .sop("BrukerBI-LISA");
    let outcome = TargetedDataset::load_with(options).unwrap();
    let dataset = &outcome.dataset;

    assert_eq!(
        outcome.notices,
        vec![Notice::DuplicateFeatures {
            names: vec!["LP007".to_string()]
        }]
    );
    assert_eq!(dataset.shape(), (10, 112));
    let names = dataset.feature_names();
    assert_eq!(names.iter().filter(|name| **name == "LP007").count(), 1);
    // First occurrence holds index 7, the repeat holds index 112.
    assert_eq!(dataset.values().get(0, 7), Some(&10_007.0));
    assert_eq!(dataset.excluded().len(), 1);
    assert_eq!(dataset.excluded()[0].reason(), "duplicate feature");
}

#[test]
fn parameter_types_are_checked_before_reading() {
    let missing = "/definitely/not/a/directory";
    let base = json!({"source": missing, "file_type": "Bruker Quantification"});

    for (key, value) in [
        ("file_name_pattern", json!(5)),
        ("pdata", json!("1")),
        ("pdata", json!(1.5)),
        ("unit", json!(true)),
    ] {
        let mut raw = base.clone();
        raw[key] = value;
        let params: LoadParams = serde_json::from_value(raw).unwrap();
        assert_matches!(
            TargetedDataset::load(&params),
            Err(NmrError::InvalidParameterType { parameter, .. }) if parameter == key
        );
    }

    let params: LoadParams = serde_json::from_value(base).unwrap();
    assert_matches!(TargetedDataset::load(&params), Err(NmrError::Filesystem(_)));
}

#[test]
fn format_selector_is_required() {
    let params = LoadParams::from_json(r#"{"source": "/tmp"}"#).unwrap();
    assert_matches!(TargetedDataset::load(&params), Err(NmrError::NotImplemented(_)));

    let params =
        LoadParams::from_json(r#"{"source": "/tmp", "file_type": "Bruker Raw"}"#).unwrap();
    assert_matches!(TargetedDataset::load(&params), Err(NmrError::NotImplemented(_)));

    let params = LoadParams::from_json(r#"{"file_type": "empty"}"#).unwrap();
    let outcome = TargetedDataset::load(&params).unwrap();
    assert_eq!(outcome.dataset.shape(), (0, 0));
    assert_eq!(outcome.dataset.file_type(), FileType::Empty);
}

#[test]
fn calibration_reports_are_split_off() {
    let tree = common::urine_tree(5);
    let calibrant = Acquisition {
        expno: 99,
        position: "H12",
        kind: "Calibration",
    };
    tree.write(
        &format!("{RACK}/99/pdata/1/urine_quant_report_b.xml"),
        &common::urine_report(&calibrant, 5),
    );

    let dataset = TargetedDataset::load_with(quant_ur(&tree)).unwrap().dataset;
    assert_eq!(dataset.shape(), (9, 5));
    assert_eq!(dataset.calibration().nsamples(), 1);
    assert_eq!(dataset.calibration().samples[0].run_order, 0);
    assert_eq!(dataset.calibration().feature_names(), dataset.feature_names());
    assert_eq!(dataset.calibration().values.get(0, 0), Some(&crea_value(99, 0)));
}

#[test]
fn unreadable_report_becomes_a_notice() {
    let tree = common::urine_tree(3);
    let broken = tree.write(
        &format!("{RACK}/95/pdata/1/urine_quant_report_b.xml"),
        "<QUANTIFICATION><SAMPLE",
    );

    let outcome = TargetedDataset::load_with(quant_ur(&tree)).unwrap();
    assert_eq!(outcome.dataset.shape(), (9, 3));
    assert_matches!(
        outcome.notices.as_slice(),
        [Notice::SkippedFile { path, .. }] if *path == broken
    );
}

#[test]
fn processing_state_selects_directories() {
    let tree = common::urine_tree(2);
    let options = quant_ur(&tree).pdata(2);
    let outcome = TargetedDataset::load_with(options).unwrap();
    assert_eq!(outcome.dataset.shape(), (0, 0));
    assert!(outcome.notices.is_empty());
}

#[test]
fn limits_of_quantification_censor_values() {
    let tree = ReportTree::new();
    for (expno, value) in [(10, "0.1"), (20, "5"), (30, "90")] {
        tree.write(
            &format!("Rack/{expno}/pdata/1/results.xml"),
            &format!(
                "<QUANTIFICATION><SAMPLE name=\"S\"/><PARAMETER name=\"Glucose\"><VALUE value=\"{value}\" unit=\"mg/dL\" lloq=\"1\" uloq=\"50\"/></PARAMETER></QUANTIFICATION>"
            ),
        );
    }
    let options =
        LoadOptions::new(FileType::BrukerQuantification, tree.root.clone()).sop("BrukerBI-LISA");
    let dataset = TargetedDataset::load_with(options).unwrap().dataset;
    assert_eq!(dataset.values().column(0), vec![f64::NEG_INFINITY, 5.0, f64::INFINITY]);
}

#[test]
fn run_order_follows_path_order_when_timestamps_disagree() {
    let tree = ReportTree::new();
    for (expno, time) in [(10, "13:00:00"), (20, "12:00:00")] {
        tree.write(
            &format!("Rack/{expno}/pdata/1/results.xml"),
            &format!(
                "<QUANTIFICATION><SAMPLE name=\"S\" date=\"2017-05-02 {time}\"/><PARAMETER name=\"Glucose\"><VALUE value=\"1\" unit=\"mg/dL\"/></PARAMETER></QUANTIFICATION>"
            ),
        );
    }
    let options =
        LoadOptions::new(FileType::BrukerQuantification, tree.root.clone()).sop("BrukerBI-LISA");
    let dataset = TargetedDataset::load_with(options).unwrap().dataset;
    let rows: Vec<(&str, usize)> = dataset
        .samples()
        .iter()
        .map(|s| (s.sample_file_name.as_str(), s.run_order))
        .collect();
    assert_eq!(rows, vec![("Rack/10", 0), ("Rack/20", 1)]);
    assert!(dataset.samples()[0].acquired_time > dataset.samples()[1].acquired_time);
}
