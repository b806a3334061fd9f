use std::collections::BTreeMap;
use std::fs;

use camino::Utf8Path;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{AssayRole, SampleType};
use crate::error::NmrError;

pub const GENERIC_SOP: &str = "Generic";

const BUILTIN_SOPS: &[(&str, &str)] = &[
    (GENERIC_SOP, include_str!("../sop/Generic.json")),
    ("BrukerQuant-UR", include_str!("../sop/BrukerQuant-UR.json")),
    ("BrukerBI-LISA", include_str!("../sop/BrukerBI-LISA.json")),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSet {
    #[serde(skip)]
    pub sop: String,
    pub method_name: String,
    pub dpi: u32,
    pub rsd_threshold: f64,
    pub figure_format: String,
    pub figure_size: [f64; 2],
    pub hist_bins: u32,
    pub no_files: u32,
    pub quantiles: [f64; 2],
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub file_name_pattern: Option<String>,
    pub pdata: u32,
    pub dilution: f64,
    #[serde(rename = "externalID", default)]
    pub external_id: Vec<String>,
    #[serde(default)]
    pub sample_metadata_not_exported: Vec<String>,
    #[serde(default)]
    pub feature_metadata_not_exported: Vec<String>,
    #[serde(default)]
    pub analytical_measurements: BTreeMap<String, String>,
    #[serde(default)]
    pub exclude_from_plotting: Vec<String>,
    #[serde(default)]
    pub additional_quant_param_columns: Vec<String>,
    #[serde(default)]
    pub sample_type_colours: BTreeMap<String, String>,
    pub calibration: CalibrationRule,
    pub lims: LimsLabels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRule {
    #[serde(default)]
    pub path_pattern: Option<String>,
    #[serde(default)]
    pub report_markers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimsLabels {
    #[serde(default)]
    pub reference_labels: Vec<ReferenceLabel>,
    pub unmatched_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceLabel {
    pub pattern: String,
    pub label: String,
    pub sample_type: SampleType,
    pub assay_role: AssayRole,
}

impl AttributeSet {
    pub fn generic() -> Result<Self, NmrError> {
        Self::for_sop(GENERIC_SOP)
    }

    pub fn for_sop(name: &str) -> Result<Self, NmrError> {
        Self::for_sop_in(name, None)
    }

    pub fn for_sop_in(name: &str, sop_dir: Option<&Utf8Path>) -> Result<Self, NmrError> {
        let base = parse_profile(GENERIC_SOP, builtin_profile(GENERIC_SOP).unwrap_or("{}"))?;
        let overlay = match load_custom_profile(name, sop_dir)? {
            Some(content) => parse_profile(name, &content)?,
            None => {
                let content =
                    builtin_profile(name).ok_or_else(|| NmrError::UnknownSop(name.to_string()))?;
                parse_profile(name, content)?
            }
        };

        let merged = layer(base, overlay);
        let mut attributes: AttributeSet =
            serde_json::from_value(merged).map_err(|err| NmrError::SopParse {
                name: name.to_string(),
                message: err.to_string(),
            })?;
        attributes.sop = name.to_string();
        attributes.validate()?;
        Ok(attributes)
    }

    pub fn builtin_names() -> Vec<&'static str> {
        BUILTIN_SOPS.iter().map(|(name, _)| *name).collect()
    }

    pub fn calibration_path_regex(&self) -> Result<Option<Regex>, NmrError> {
        self.calibration
            .path_pattern
            .as_deref()
            .map(compile_pattern)
            .transpose()
    }

    fn validate(&self) -> Result<(), NmrError> {
        if let Some(pattern) = &self.file_name_pattern {
            compile_pattern(pattern)?;
        }
        self.calibration_path_regex()?;
        for reference in &self.lims.reference_labels {
            compile_pattern(&reference.pattern)?;
        }
        Ok(())
    }
}

pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex, NmrError> {
    Regex::new(pattern).map_err(|err| NmrError::InvalidPattern {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })
}

fn builtin_profile(name: &str) -> Option<&'static str> {
    BUILTIN_SOPS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, content)| *content)
}

fn load_custom_profile(name: &str, sop_dir: Option<&Utf8Path>) -> Result<Option<String>, NmrError> {
    let Some(dir) = sop_dir else {
        return Ok(None);
    };
    let path = dir.join(format!("{name}.json"));
    if !path.as_std_path().is_file() {
        return Ok(None);
    }
    fs::read_to_string(path.as_std_path())
        .map(Some)
        .map_err(|err| NmrError::Filesystem(format!("read SOP {path}: {err}")))
}

fn parse_profile(name: &str, content: &str) -> Result<Value, NmrError> {
    let value: Value = serde_json::from_str(content).map_err(|err| NmrError::SopParse {
        name: name.to_string(),
        message: err.to_string(),
    })?;
    if !value.is_object() {
        return Err(NmrError::SopParse {
            name: name.to_string(),
            message: "profile must be a JSON object".to_string(),
        });
    }
    Ok(value)
}

// Top-level keys of the overlay replace those of the base.
fn layer(mut base: Value, overlay: Value) -> Value {
    if let (Some(base_map), Value::Object(overlay_map)) = (base.as_object_mut(), overlay) {
        for (key, value) in overlay_map {
            base_map.insert(key, value);
        }
    }
    base
}
