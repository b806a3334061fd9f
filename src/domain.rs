use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NmrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    BrukerQuantification,
    Empty,
}

impl FileType {
    pub fn from_selector(selector: Option<&str>) -> Result<Self, NmrError> {
        match selector {
            Some(value) => value.parse(),
            None => Err(NmrError::NotImplemented(
                "file type selector is required".to_string(),
            )),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::BrukerQuantification => write!(f, "Bruker Quantification"),
            FileType::Empty => write!(f, "empty"),
        }
    }
}

impl FromStr for FileType {
    type Err = NmrError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Bruker Quantification" => Ok(FileType::BrukerQuantification),
            "empty" => Ok(FileType::Empty),
            other => Err(NmrError::NotImplemented(format!(
                "file type {other:?} is not supported"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantificationType {
    QuantifiedWithinLimits,
    QuantifiedOther,
    Monitored,
}

impl fmt::Display for QuantificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantificationType::QuantifiedWithinLimits => write!(f, "quantified-within-limits"),
            QuantificationType::QuantifiedOther => write!(f, "quantified-other"),
            QuantificationType::Monitored => write!(f, "monitored"),
        }
    }
}

impl FromStr for QuantificationType {
    type Err = NmrError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "quantified-within-limits" | "quantified" | "quantification" => {
                Ok(QuantificationType::QuantifiedWithinLimits)
            }
            "quantified-other" | "semi-quantified" | "other" => {
                Ok(QuantificationType::QuantifiedOther)
            }
            "monitored" | "monitoring" => Ok(QuantificationType::Monitored),
            _ => Err(NmrError::InvalidParameters(format!(
                "unknown quantification type: {value}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationMethod {
    NoCalibration,
    OtherCalibration,
    InternalCalibration,
    BackcalculatedIs,
}

impl fmt::Display for CalibrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationMethod::NoCalibration => write!(f, "no-calibration"),
            CalibrationMethod::OtherCalibration => write!(f, "other-calibration"),
            CalibrationMethod::InternalCalibration => write!(f, "internal-calibration"),
            CalibrationMethod::BackcalculatedIs => write!(f, "backcalculated-is"),
        }
    }
}

impl FromStr for CalibrationMethod {
    type Err = NmrError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "no-calibration" | "none" => Ok(CalibrationMethod::NoCalibration),
            "other-calibration" | "other" | "external" => Ok(CalibrationMethod::OtherCalibration),
            "internal-calibration" | "internal" => Ok(CalibrationMethod::InternalCalibration),
            "backcalculated-is" | "backcalculated" => Ok(CalibrationMethod::BackcalculatedIs),
            _ => Err(NmrError::InvalidParameters(format!(
                "unknown calibration method: {value}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssayRole {
    Assay,
    PrecisionReference,
    LinearityReference,
    Blank,
}

impl fmt::Display for AssayRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssayRole::Assay => write!(f, "Assay"),
            AssayRole::PrecisionReference => write!(f, "Precision Reference"),
            AssayRole::LinearityReference => write!(f, "Linearity Reference"),
            AssayRole::Blank => write!(f, "Blank"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    StudySample,
    StudyPool,
    ExternalReference,
    MethodReference,
    ProceduralBlank,
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleType::StudySample => write!(f, "Study Sample"),
            SampleType::StudyPool => write!(f, "Study Pool"),
            SampleType::ExternalReference => write!(f, "External Reference"),
            SampleType::MethodReference => write!(f, "Method Reference"),
            SampleType::ProceduralBlank => write!(f, "Procedural Blank"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimsFormat {
    NpcLims,
}

impl fmt::Display for LimsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimsFormat::NpcLims => write!(f, "NPC LIMS"),
        }
    }
}

impl FromStr for LimsFormat {
    type Err = NmrError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "NPC LIMS" => Ok(LimsFormat::NpcLims),
            other => Err(NmrError::NotImplemented(format!(
                "worklist format {other:?} is not supported"
            ))),
        }
    }
}

fn normalize_token(value: &str) -> String {
    value
        .trim()
        .to_ascii_lowercase()
        .replace([' ', '_'], "-")
}
