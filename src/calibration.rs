use regex::Regex;
use tracing::debug;

use crate::config::{CalibrationRule, compile_pattern};
use crate::domain::{AssayRole, SampleType};
use crate::error::NmrError;
use crate::matrix::Matrix;
use crate::reconcile::MergedTable;
use crate::record::{ExclusionRecord, FeatureRecord, SampleRecord};

#[derive(Debug, Clone)]
pub struct Partition {
    pub samples: Vec<SampleRecord>,
    pub features: Vec<FeatureRecord>,
    pub values: Matrix<f64>,
    pub expected: Matrix<Option<f64>>,
}

impl Partition {
    pub fn empty(features: Vec<FeatureRecord>) -> Self {
        let cols = features.len();
        Self {
            samples: Vec::new(),
            features,
            values: Matrix::with_columns(cols),
            expected: Matrix::with_columns(cols),
        }
    }

    fn from_rows(table: &MergedTable, rows: &[usize]) -> Self {
        Self {
            samples: rows.iter().map(|&row| table.samples[row].clone()).collect(),
            features: table.features.clone(),
            values: table.values.select_rows(rows),
            expected: Matrix::filled(rows.len(), table.features.len(), None),
        }
    }

    pub fn nsamples(&self) -> usize {
        self.samples.len()
    }

    pub fn nfeatures(&self) -> usize {
        self.features.len()
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn is_consistent(&self) -> bool {
        let shape = (self.samples.len(), self.features.len());
        self.values.shape() == shape && self.expected.shape() == shape
    }

    // Rows arrive in path-sorted discovery order; acquisition time is metadata only.
    pub fn assign_run_order(&mut self) {
        for (idx, sample) in self.samples.iter_mut().enumerate() {
            sample.run_order = idx;
        }
    }

    pub fn reorder_samples(&mut self, order: &[usize]) -> Result<(), NmrError> {
        let len = self.samples.len();
        if order.len() != len {
            return Err(NmrError::InvalidOrder(format!(
                "expected {len} indices, got {}",
                order.len()
            )));
        }
        let mut seen = vec![false; len];
        for &idx in order {
            if idx >= len {
                return Err(NmrError::SampleIndex { index: idx, len });
            }
            if std::mem::replace(&mut seen[idx], true) {
                return Err(NmrError::InvalidOrder(format!("index {idx} repeated")));
            }
        }
        self.samples = order.iter().map(|&idx| self.samples[idx].clone()).collect();
        self.values = self.values.select_rows(order);
        self.expected = self.expected.select_rows(order);
        Ok(())
    }

    pub fn exclude_samples(
        &mut self,
        indices: &[usize],
        reason: &str,
    ) -> Result<Vec<ExclusionRecord>, NmrError> {
        let len = self.samples.len();
        if let Some(&index) = indices.iter().find(|&&idx| idx >= len) {
            return Err(NmrError::SampleIndex { index, len });
        }
        let keep: Vec<usize> = (0..len).filter(|idx| !indices.contains(idx)).collect();
        let excluded = (0..len)
            .filter(|idx| indices.contains(idx))
            .map(|idx| {
                let mut record = self.samples[idx].clone();
                record.exclusion_details = Some(reason.to_string());
                ExclusionRecord::Sample {
                    record,
                    values: self.values.row(idx).to_vec(),
                    expected: self.expected.row(idx).to_vec(),
                    reason: reason.to_string(),
                }
            })
            .collect();

        self.samples = keep.iter().map(|&idx| self.samples[idx].clone()).collect();
        self.values = self.values.select_rows(&keep);
        self.expected = self.expected.select_rows(&keep);
        Ok(excluded)
    }

    pub fn exclude_features(
        &mut self,
        names: &[&str],
        reason: &str,
    ) -> Result<Vec<ExclusionRecord>, NmrError> {
        if let Some(missing) = names
            .iter()
            .find(|name| !self.features.iter().any(|f| f.name == **name))
        {
            return Err(NmrError::UnknownFeature((*missing).to_string()));
        }
        let (removed, keep): (Vec<usize>, Vec<usize>) = (0..self.features.len())
            .partition(|&col| names.contains(&self.features[col].name.as_str()));

        let excluded = removed
            .iter()
            .map(|&col| ExclusionRecord::Feature {
                record: self.features[col].clone(),
                values: self.values.column(col),
                expected: self.expected.column(col),
                reason: reason.to_string(),
            })
            .collect();
        self.drop_features(&keep);
        Ok(excluded)
    }

    pub(crate) fn drop_features(&mut self, keep: &[usize]) {
        self.features = keep.iter().map(|&col| self.features[col].clone()).collect();
        self.values = self.values.select_columns(keep);
        self.expected = self.expected.select_columns(keep);
    }

    pub fn apply_limits_of_quantification(&mut self) -> usize {
        let mut censored = 0;
        for (col, feature) in self.features.iter().enumerate() {
            if !feature.has_limits() {
                continue;
            }
            for row in 0..self.samples.len() {
                let Some(&value) = self.values.get(row, col) else {
                    continue;
                };
                if value.is_nan() || value.is_infinite() {
                    continue;
                }
                if feature.lloq.is_some_and(|lloq| value < lloq) {
                    self.values.set(row, col, f64::NEG_INFINITY);
                    censored += 1;
                } else if feature.uloq.is_some_and(|uloq| value > uloq) {
                    self.values.set(row, col, f64::INFINITY);
                    censored += 1;
                }
            }
        }
        censored
    }
}

impl PartialEq for Partition {
    fn eq(&self, other: &Self) -> bool {
        self.samples == other.samples
            && self.features == other.features
            && self.values.same_values(&other.values)
            && self.expected == other.expected
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationSplitter {
    path_pattern: Option<Regex>,
    markers: Vec<String>,
}

impl CalibrationSplitter {
    pub fn from_rule(rule: &CalibrationRule) -> Result<Self, NmrError> {
        let path_pattern = rule
            .path_pattern
            .as_deref()
            .map(compile_pattern)
            .transpose()?;
        let markers = rule
            .report_markers
            .iter()
            .map(|marker| marker.trim().to_lowercase())
            .filter(|marker| !marker.is_empty())
            .collect();
        Ok(Self {
            path_pattern,
            markers,
        })
    }

    pub fn is_calibration(&self, sample: &SampleRecord) -> bool {
        if self
            .path_pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(sample.path.as_str()))
        {
            return true;
        }
        sample
            .report_kind
            .as_deref()
            .map(|kind| kind.trim().to_lowercase())
            .is_some_and(|kind| self.markers.iter().any(|marker| *marker == kind))
    }

    pub fn split(&self, table: MergedTable) -> (Partition, Partition) {
        let (calibration_rows, study_rows): (Vec<usize>, Vec<usize>) =
            (0..table.samples.len()).partition(|&row| self.is_calibration(&table.samples[row]));

        let mut study = Partition::from_rows(&table, &study_rows);
        let mut calibration = if calibration_rows.is_empty() {
            Partition::empty(table.features.clone())
        } else {
            Partition::from_rows(&table, &calibration_rows)
        };
        for sample in &mut calibration.samples {
            sample.assay_role = Some(AssayRole::LinearityReference);
            sample.sample_type = Some(SampleType::MethodReference);
        }
        study.assign_run_order();
        calibration.assign_run_order();
        debug!(
            study = study.nsamples(),
            calibration = calibration.nsamples(),
            "split calibration acquisitions"
        );
        (study, calibration)
    }
}
