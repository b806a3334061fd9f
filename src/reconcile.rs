use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::AttributeSet;
use crate::error::NmrError;
use crate::matrix::Matrix;
use crate::record::{ExclusionRecord, FeatureRecord, SampleRecord};
use crate::report::ParsedReport;

pub const DUPLICATE_FEATURE_REASON: &str = "duplicate feature";

#[derive(Debug, Clone)]
pub struct MergedTable {
    pub samples: Vec<SampleRecord>,
    pub features: Vec<FeatureRecord>,
    pub values: Matrix<f64>,
}

impl MergedTable {
    pub fn from_reports(reports: Vec<ParsedReport>) -> Self {
        let mut features: Vec<FeatureRecord> = Vec::new();
        let mut columns: HashMap<(String, String, usize), usize> = HashMap::new();
        let mut samples = Vec::with_capacity(reports.len());
        let mut cells: Vec<Vec<(usize, f64)>> = Vec::with_capacity(reports.len());

        for report in reports {
            let mut seen: HashMap<(String, String), usize> = HashMap::new();
            let mut row = Vec::with_capacity(report.rows.len());
            for feature_row in report.rows {
                let pair = (
                    feature_row.feature.name.clone(),
                    feature_row.feature.unit.clone(),
                );
                let occurrence = seen.entry(pair.clone()).or_insert(0);
                let key = (pair.0, pair.1, *occurrence);
                *occurrence += 1;

                let col = *columns.entry(key).or_insert_with(|| {
                    features.push(feature_row.feature.clone());
                    features.len() - 1
                });
                row.push((col, feature_row.value.unwrap_or(f64::NAN)));
            }
            samples.push(report.sample);
            cells.push(row);
        }

        let mut values = Matrix::filled(samples.len(), features.len(), f64::NAN);
        for (sample_idx, row) in cells.into_iter().enumerate() {
            for (col, value) in row {
                values.set(sample_idx, col, value);
            }
        }
        Self {
            samples,
            features,
            values,
        }
    }

    pub fn units(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.features
            .iter()
            .filter(|feature| seen.insert(feature.unit.as_str()))
            .map(|feature| feature.unit.clone())
            .collect()
    }

    fn retain_columns(self, keep: &[usize]) -> Self {
        let features = keep.iter().map(|&col| self.features[col].clone()).collect();
        Self {
            values: self.values.select_columns(keep),
            features,
            samples: self.samples,
        }
    }
}

pub fn working_unit(requested: Option<&str>, attributes: &AttributeSet) -> Option<String> {
    requested
        .map(str::to_string)
        .or_else(|| attributes.unit.clone())
}

pub fn filter_by_unit(table: MergedTable, unit: Option<&str>) -> Result<MergedTable, NmrError> {
    let Some(unit) = unit else {
        return Ok(table);
    };
    if table.features.is_empty() {
        return Ok(table);
    }

    let keep: Vec<usize> = table
        .features
        .iter()
        .enumerate()
        .filter(|(_, feature)| feature.unit == unit)
        .map(|(col, _)| col)
        .collect();
    if keep.is_empty() {
        return Err(NmrError::UnitNotFound {
            requested: unit.to_string(),
            available: table.units(),
        });
    }
    debug!(
        unit,
        kept = keep.len(),
        dropped = table.features.len() - keep.len(),
        "filtered features by unit"
    );
    Ok(table.retain_columns(&keep))
}

#[derive(Debug, Clone)]
pub struct DuplicateResolution {
    pub table: MergedTable,
    pub duplicates: Vec<String>,
    pub excluded: Vec<ExclusionRecord>,
}

pub fn resolve_duplicates(table: MergedTable) -> DuplicateResolution {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut reported: HashSet<&str> = HashSet::new();
    let mut keep = Vec::with_capacity(table.features.len());
    let mut dropped = Vec::new();
    let mut duplicates = Vec::new();

    for (col, feature) in table.features.iter().enumerate() {
        if seen.insert(feature.name.as_str()) {
            keep.push(col);
            continue;
        }
        dropped.push(col);
        if reported.insert(feature.name.as_str()) {
            duplicates.push(feature.name.clone());
        }
    }

    let excluded = dropped
        .iter()
        .map(|&col| ExclusionRecord::Feature {
            record: table.features[col].clone(),
            values: table.values.column(col),
            expected: vec![None; table.values.nrows()],
            reason: DUPLICATE_FEATURE_REASON.to_string(),
        })
        .collect();

    DuplicateResolution {
        table: table.retain_columns(&keep),
        duplicates,
        excluded,
    }
}
