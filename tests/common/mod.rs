#![allow(dead_code)]

use std::fs;

use camino::Utf8PathBuf;
use tempfile::TempDir;

pub const RACK: &str = "UnitTest1_Urine_Rack1_SLL_270814";
pub const CREA: &str = "mmol/mol Crea";
pub const MMOL: &str = "mmol/L";

/// Temporary directory holding generated report files.
pub struct ReportTree {
    _temp: TempDir,
    pub root: Utf8PathBuf,
}

impl ReportTree {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        Self { _temp: temp, root }
    }

    pub fn write(&self, relative: &str, content: &str) -> Utf8PathBuf {
        let path = self.root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }
}

pub struct Acquisition<'a> {
    pub expno: u32,
    pub position: &'a str,
    pub kind: &'a str,
}

pub fn feature_name(idx: usize) -> String {
    format!("Compound{idx:02}")
}

/// Value of feature `idx` in `mmol/mol Crea` for the acquisition with `expno`.
pub fn crea_value(expno: u32, idx: usize) -> f64 {
    expno as f64 + idx as f64 / 100.0
}

/// Urine report listing `features` compounds, each in two units.
pub fn urine_report(acquisition: &Acquisition<'_>, features: usize) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<QUANTIFICATION>\n");
    xml.push_str(&format!(
        "  <SAMPLE name=\"{RACK}_{expno}\" date=\"2014-08-27T{hour:02}:15:00\" position=\"{position}\" type=\"{kind}\"/>\n",
        expno = acquisition.expno,
        hour = acquisition.expno / 10,
        position = acquisition.position,
        kind = acquisition.kind,
    ));
    for idx in 0..features {
        let value = crea_value(acquisition.expno, idx);
        let lod = if idx % 2 == 0 { " lod=\"0.5\"" } else { "" };
        xml.push_str(&format!(
            "  <PARAMETER name=\"{name}\" comment=\"generated\">\n    <VALUE value=\"{value}\" unit=\"{CREA}\"{lod}/>\n    <VALUE value=\"{mmol}\" unit=\"{MMOL}\"/>\n    <REFERENCE unit=\"{CREA}\" vmin=\"2.5\" vmax=\"97.5\" min=\"0\" max=\"150\"/>\n  </PARAMETER>\n",
            name = feature_name(idx),
            mmol = value / 10.0,
        ));
    }
    xml.push_str("</QUANTIFICATION>\n");
    xml
}

/// Nine study acquisitions, expno 10..=90, under `pdata/1`, plus decoys that
/// must not be discovered.
pub fn urine_tree(features: usize) -> ReportTree {
    let tree = ReportTree::new();
    for n in 1..=9u32 {
        let position = format!("A{n}");
        let acquisition = Acquisition {
            expno: n * 10,
            position: &position,
            kind: "sample",
        };
        let xml = urine_report(&acquisition, features);
        tree.write(
            &format!("{RACK}/{}/pdata/1/urine_quant_report_b.xml", n * 10),
            &xml,
        );
        tree.write(
            &format!("{RACK}/{}/pdata/1/urine_quant_report_e.xml", n * 10),
            &xml,
        );
    }
    tree
}

/// Lipoprotein report with one unit per feature. `features` are written in order,
/// so a repeated name yields a repeated parameter.
pub fn lisa_report(expno: u32, features: &[String]) -> String {
    let mut xml = String::from("<QUANTIFICATION>\n");
    xml.push_str(&format!(
        "  <SAMPLE name=\"Plasma_{expno}\" date=\"2017-05-02 12:{minute:02}:00\" type=\"sample\"/>\n",
        minute = expno / 10,
    ));
    for (idx, name) in features.iter().enumerate() {
        xml.push_str(&format!(
            "  <PARAMETER name=\"{name}\" type=\"quantified-other\" calibration=\"other\">\n    <VALUE value=\"{value}\" unit=\"mg/dL\"/>\n  </PARAMETER>\n",
            value = expno as f64 * 1000.0 + idx as f64,
        ));
    }
    xml.push_str("</QUANTIFICATION>\n");
    xml
}

pub fn write_worklist(tree: &ReportTree, content: &str) -> Utf8PathBuf {
    tree.write("worklist.csv", content)
}
