use std::fs::File;
use std::io::BufReader;

use camino::Utf8Path;
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

use crate::config::AttributeSet;
use crate::domain::{CalibrationMethod, QuantificationType};
use crate::error::NmrError;
use crate::record::{FeatureRecord, SampleRecord};

#[derive(Debug, Clone)]
pub struct ParsedReport {
    pub sample: SampleRecord,
    pub rows: Vec<FeatureRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub feature: FeatureRecord,
    pub value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ReportXml {
    #[serde(rename = "SAMPLE")]
    sample: Option<SampleXml>,
    #[serde(rename = "PROCESSING", default)]
    processing: Vec<ProcessingXml>,
    #[serde(rename = "PARAMETER", default)]
    parameters: Vec<ParameterXml>,
}

#[derive(Debug, Deserialize)]
struct SampleXml {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@date")]
    date: Option<String>,
    #[serde(rename = "@expno")]
    expno: Option<String>,
    #[serde(rename = "@position")]
    position: Option<String>,
    #[serde(rename = "@type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProcessingXml {
    #[serde(rename = "@pdata")]
    pdata: Option<String>,
    #[serde(rename = "PARAMETER", default)]
    parameters: Vec<ParameterXml>,
}

#[derive(Debug, Deserialize)]
struct ParameterXml {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@comment")]
    comment: Option<String>,
    #[serde(rename = "@type")]
    kind: Option<String>,
    #[serde(rename = "@calibration")]
    calibration: Option<String>,
    #[serde(rename = "VALUE", default)]
    values: Vec<ValueXml>,
    #[serde(rename = "REFERENCE", default)]
    references: Vec<ReferenceXml>,
}

#[derive(Debug, Deserialize)]
struct ValueXml {
    #[serde(rename = "@value")]
    value: Option<String>,
    #[serde(rename = "@unit")]
    unit: Option<String>,
    #[serde(rename = "@lod")]
    lod: Option<String>,
    #[serde(rename = "@lloq")]
    lloq: Option<String>,
    #[serde(rename = "@uloq")]
    uloq: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReferenceXml {
    #[serde(rename = "@unit")]
    unit: Option<String>,
    #[serde(rename = "@vmin")]
    lower_percentile: Option<String>,
    #[serde(rename = "@vmax")]
    upper_percentile: Option<String>,
    #[serde(rename = "@min")]
    lower_value: Option<String>,
    #[serde(rename = "@max")]
    upper_value: Option<String>,
}

pub fn parse_report(
    path: &Utf8Path,
    pdata: u32,
    attributes: &AttributeSet,
) -> Result<ParsedReport, NmrError> {
    let file = File::open(path.as_std_path())
        .map_err(|err| NmrError::report_parse(path, err.to_string()))?;
    let report: ReportXml = quick_xml::de::from_reader(BufReader::new(file))
        .map_err(|err| NmrError::report_parse(path, err.to_string()))?;

    let parameters = select_state(&report, pdata)
        .ok_or_else(|| {
            NmrError::report_parse(
                path,
                format!("processing state {pdata} not found in report"),
            )
        })?;

    let sample = build_sample(path, report.sample.as_ref(), attributes)?;
    let mut rows = Vec::new();
    for parameter in parameters {
        rows.extend(parameter_rows(path, parameter)?);
    }
    debug!(%path, sample = %sample.sample_file_name, rows = rows.len(), "parsed report");
    Ok(ParsedReport { sample, rows })
}

// A report without PROCESSING blocks holds a single state that answers any selector.
fn select_state(report: &ReportXml, pdata: u32) -> Option<&[ParameterXml]> {
    if report.processing.is_empty() {
        return Some(&report.parameters);
    }
    report
        .processing
        .iter()
        .find(|state| {
            state
                .pdata
                .as_deref()
                .and_then(|value| value.trim().parse::<u32>().ok())
                == Some(pdata)
        })
        .map(|state| state.parameters.as_slice())
}

fn build_sample(
    path: &Utf8Path,
    sample: Option<&SampleXml>,
    attributes: &AttributeSet,
) -> Result<SampleRecord, NmrError> {
    let declared_expno = sample
        .and_then(|s| s.expno.as_deref())
        .and_then(|value| value.trim().parse::<u32>().ok());

    let (file_name, expno) = match identity_from_path(path) {
        Some((name, expno)) => (name, Some(expno)),
        None => {
            let name = sample
                .and_then(|s| nonempty(s.name.as_deref()))
                .or_else(|| path.file_stem().map(str::to_string))
                .ok_or_else(|| {
                    NmrError::report_parse(path, "report has no sample identity")
                })?;
            (name, declared_expno)
        }
    };

    let mut record = SampleRecord::new(file_name, path.to_path_buf());
    record.expno = expno;
    record.dilution = attributes.dilution;
    if let Some(sample) = sample {
        record.acquired_time = match nonempty(sample.date.as_deref()) {
            Some(date) => Some(parse_timestamp(&date).ok_or_else(|| {
                NmrError::report_parse(
                    path,
                    format!("unrecognised acquisition date {date:?}"),
                )
            })?),
            None => None,
        };
        record.report_kind = nonempty(sample.kind.as_deref());
        record.report_position = nonempty(sample.position.as_deref());
    }
    Ok(record)
}

fn parameter_rows(path: &Utf8Path, parameter: &ParameterXml) -> Result<Vec<FeatureRow>, NmrError> {
    let name = nonempty(parameter.name.as_deref()).ok_or_else(|| {
        NmrError::report_parse(path, "PARAMETER without a name attribute")
    })?;
    let comment = nonempty(parameter.comment.as_deref());

    let rows = parameter
        .values
        .iter()
        .map(|value| {
            let unit = value.unit.as_deref().unwrap_or_default().trim().to_string();
            let reference = parameter
                .references
                .iter()
                .find(|reference| reference.unit.as_deref().map(str::trim) == Some(unit.as_str()))
                .or_else(|| parameter.references.iter().find(|r| r.unit.is_none()));
            let lod = parse_number(value.lod.as_deref());
            let (quantification_type, calibration_method) =
                classify(parameter.kind.as_deref(), parameter.calibration.as_deref(), lod);

            FeatureRow {
                feature: FeatureRecord {
                    name: name.clone(),
                    unit,
                    lower_reference_percentile: reference
                        .and_then(|r| parse_number(r.lower_percentile.as_deref())),
                    lower_reference_value: reference
                        .and_then(|r| parse_number(r.lower_value.as_deref())),
                    upper_reference_percentile: reference
                        .and_then(|r| parse_number(r.upper_percentile.as_deref())),
                    upper_reference_value: reference
                        .and_then(|r| parse_number(r.upper_value.as_deref())),
                    lod,
                    lloq: parse_number(value.lloq.as_deref()),
                    uloq: parse_number(value.uloq.as_deref()),
                    quantification_type,
                    calibration_method,
                    comment: comment.clone(),
                },
                value: parse_number(value.value.as_deref()),
            }
        })
        .collect();
    Ok(rows)
}

fn classify(
    kind: Option<&str>,
    calibration: Option<&str>,
    lod: Option<f64>,
) -> (QuantificationType, CalibrationMethod) {
    let inferred = if lod.is_some() {
        (
            QuantificationType::QuantifiedOther,
            CalibrationMethod::OtherCalibration,
        )
    } else {
        (
            QuantificationType::Monitored,
            CalibrationMethod::NoCalibration,
        )
    };
    let quantification_type = kind
        .and_then(|value| value.parse().ok())
        .unwrap_or(inferred.0);
    let calibration_method = calibration
        .and_then(|value| value.parse().ok())
        .unwrap_or(inferred.1);
    (quantification_type, calibration_method)
}

pub fn identity_from_path(path: &Utf8Path) -> Option<(String, u32)> {
    let components: Vec<&str> = path.components().map(|c| c.as_str()).collect();
    let expno_idx = match components.iter().rposition(|c| *c == "pdata") {
        Some(pdata_idx) => pdata_idx.checked_sub(1)?,
        None => components.len().checked_sub(2)?,
    };
    let expno: u32 = components.get(expno_idx)?.parse().ok()?;
    let experiment = components.get(expno_idx.checked_sub(1)?)?;
    if experiment.is_empty() || *experiment == "/" {
        return None;
    }
    Some((format!("{experiment}/{expno}"), expno))
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%d-%b-%Y %H:%M:%S",
        "%d.%m.%Y %H:%M:%S",
    ];
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

pub fn parse_number(value: Option<&str>) -> Option<f64> {
    let value = value?.trim();
    if value.is_empty() || value == "-" || value.eq_ignore_ascii_case("n/a") {
        return None;
    }
    value.parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn nonempty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
