use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::{AssayRole, CalibrationMethod, QuantificationType, SampleType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRecord {
    #[serde(rename = "Sample File Name")]
    pub sample_file_name: String,
    #[serde(rename = "Sample Base Name")]
    pub sample_base_name: String,
    #[serde(rename = "expno")]
    pub expno: Option<u32>,
    #[serde(rename = "Path")]
    pub path: Utf8PathBuf,
    #[serde(rename = "Acquired Time")]
    pub acquired_time: Option<NaiveDateTime>,
    #[serde(rename = "Run Order")]
    pub run_order: usize,
    #[serde(rename = "Dilution")]
    pub dilution: f64,
    #[serde(rename = "Batch")]
    pub batch: u32,
    #[serde(rename = "Correction Batch")]
    pub correction_batch: Option<u32>,
    #[serde(rename = "AssayRole")]
    pub assay_role: Option<AssayRole>,
    #[serde(rename = "SampleType")]
    pub sample_type: Option<SampleType>,
    #[serde(rename = "Sample ID")]
    pub sample_id: Option<String>,
    #[serde(rename = "Sample position")]
    pub sample_position: Option<String>,
    #[serde(rename = "Exclusion Details")]
    pub exclusion_details: Option<String>,
    #[serde(rename = "Metadata Available")]
    pub metadata_available: bool,
    #[serde(rename = "Sample Kind")]
    pub report_kind: Option<String>,
    #[serde(skip)]
    pub report_position: Option<String>,
    #[serde(flatten)]
    pub worklist: BTreeMap<String, String>,
}

impl SampleRecord {
    // Serialized names of the fixed fields; flattened worklist keys must not shadow them.
    pub const COLUMNS: &'static [&'static str] = &[
        "Sample File Name",
        "Sample Base Name",
        "expno",
        "Path",
        "Acquired Time",
        "Run Order",
        "Dilution",
        "Batch",
        "Correction Batch",
        "AssayRole",
        "SampleType",
        "Sample ID",
        "Sample position",
        "Exclusion Details",
        "Metadata Available",
        "Sample Kind",
    ];

    pub fn new(sample_file_name: String, path: Utf8PathBuf) -> Self {
        Self {
            sample_base_name: sample_file_name.clone(),
            sample_file_name,
            expno: None,
            path,
            acquired_time: None,
            run_order: 0,
            dilution: 100.0,
            batch: 1,
            correction_batch: None,
            assay_role: None,
            sample_type: None,
            sample_id: None,
            sample_position: None,
            exclusion_details: None,
            metadata_available: false,
            report_kind: None,
            report_position: None,
            worklist: BTreeMap::new(),
        }
    }

    pub(crate) fn clear_worklist_fields(&mut self) {
        self.assay_role = None;
        self.sample_type = None;
        self.sample_id = None;
        self.sample_position = None;
        self.metadata_available = false;
        self.worklist.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    #[serde(rename = "Feature Name")]
    pub name: String,
    #[serde(rename = "Unit")]
    pub unit: String,
    #[serde(rename = "Lower Reference Percentile")]
    pub lower_reference_percentile: Option<f64>,
    #[serde(rename = "Lower Reference Value")]
    pub lower_reference_value: Option<f64>,
    #[serde(rename = "Upper Reference Percentile")]
    pub upper_reference_percentile: Option<f64>,
    #[serde(rename = "Upper Reference Value")]
    pub upper_reference_value: Option<f64>,
    #[serde(rename = "LOD")]
    pub lod: Option<f64>,
    #[serde(rename = "LLOQ")]
    pub lloq: Option<f64>,
    #[serde(rename = "ULOQ")]
    pub uloq: Option<f64>,
    #[serde(rename = "quantificationType")]
    pub quantification_type: QuantificationType,
    #[serde(rename = "calibrationMethod")]
    pub calibration_method: CalibrationMethod,
    #[serde(rename = "comment")]
    pub comment: Option<String>,
}

impl FeatureRecord {
    pub fn has_limits(&self) -> bool {
        self.lloq.is_some() || self.uloq.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExclusionRecord {
    Sample {
        record: SampleRecord,
        values: Vec<f64>,
        expected: Vec<Option<f64>>,
        reason: String,
    },
    Feature {
        record: FeatureRecord,
        values: Vec<f64>,
        expected: Vec<Option<f64>>,
        reason: String,
    },
}

impl ExclusionRecord {
    pub fn reason(&self) -> &str {
        match self {
            ExclusionRecord::Sample { reason, .. } | ExclusionRecord::Feature { reason, .. } => {
                reason
            }
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ExclusionRecord::Sample { record, .. } => &record.sample_file_name,
            ExclusionRecord::Feature { record, .. } => &record.name,
        }
    }
}
