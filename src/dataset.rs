use std::collections::HashSet;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::calibration::{CalibrationSplitter, Partition};
use crate::config::{AttributeSet, GENERIC_SOP};
use crate::discovery::{DEFAULT_FILE_NAME_PATTERN, FileDiscovery};
use crate::domain::{FileType, LimsFormat};
use crate::error::NmrError;
use crate::lims::{LimsMerger, MergeSummary, Worklist};
use crate::matrix::Matrix;
use crate::reconcile::{MergedTable, filter_by_unit, resolve_duplicates, working_unit};
use crate::record::{ExclusionRecord, FeatureRecord, SampleRecord};
use crate::report::parse_report;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoadParams {
    pub source: Value,
    pub file_type: Value,
    pub sop: Value,
    pub file_name_pattern: Value,
    pub pdata: Value,
    pub unit: Value,
    pub sop_dir: Value,
}

impl LoadParams {
    pub fn from_json(text: &str) -> Result<Self, NmrError> {
        serde_json::from_str(text).map_err(|err| NmrError::InvalidParameters(err.to_string()))
    }

    pub fn validate(&self) -> Result<LoadOptions, NmrError> {
        let file_type = FileType::from_selector(optional_string("file_type", &self.file_type)?)?;
        let file_name_pattern =
            optional_string("file_name_pattern", &self.file_name_pattern)?.map(str::to_string);
        let pdata = match &self.pdata {
            Value::Null => None,
            Value::Number(number) => Some(
                number
                    .as_u64()
                    .and_then(|value| u32::try_from(value).ok())
                    .ok_or_else(|| type_error("pdata", "a non-negative integer", &self.pdata))?,
            ),
            other => return Err(type_error("pdata", "an integer", other)),
        };
        let unit = optional_string("unit", &self.unit)?.map(str::to_string);
        let sop = optional_string("sop", &self.sop)?.unwrap_or(GENERIC_SOP).to_string();
        let source = optional_string("source", &self.source)?.map(Utf8PathBuf::from);
        let sop_dir = optional_string("sop_dir", &self.sop_dir)?.map(Utf8PathBuf::from);

        Ok(LoadOptions {
            source,
            file_type,
            sop,
            file_name_pattern,
            pdata,
            unit,
            sop_dir,
        })
    }
}

fn optional_string<'a>(parameter: &'static str, value: &'a Value) -> Result<Option<&'a str>, NmrError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text.as_str())),
        other => Err(type_error(parameter, "a string", other)),
    }
}

fn type_error(parameter: &'static str, expected: &'static str, found: &Value) -> NmrError {
    let found = match found {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(number) => format!("number {number}"),
        Value::String(text) => format!("string {text:?}"),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    };
    NmrError::InvalidParameterType {
        parameter,
        expected,
        found,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    pub source: Option<Utf8PathBuf>,
    pub file_type: FileType,
    pub sop: String,
    pub file_name_pattern: Option<String>,
    pub pdata: Option<u32>,
    pub unit: Option<String>,
    pub sop_dir: Option<Utf8PathBuf>,
}

impl LoadOptions {
    pub fn new(file_type: FileType, source: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source: Some(source.into()),
            file_type,
            sop: GENERIC_SOP.to_string(),
            file_name_pattern: None,
            pdata: None,
            unit: None,
            sop_dir: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            source: None,
            ..Self::new(FileType::Empty, "")
        }
    }

    pub fn sop(mut self, sop: impl Into<String>) -> Self {
        self.sop = sop.into();
        self
    }

    pub fn file_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_name_pattern = Some(pattern.into());
        self
    }

    pub fn pdata(mut self, pdata: u32) -> Self {
        self.pdata = Some(pdata);
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn sop_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.sop_dir = Some(dir.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatasetState {
    Uninitialized,
    FilesDiscovered,
    Parsed,
    UnitFiltered,
    DuplicatesResolved,
    Ready,
}

impl fmt::Display for DatasetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DatasetState::Uninitialized => "uninitialized",
            DatasetState::FilesDiscovered => "files discovered",
            DatasetState::Parsed => "parsed",
            DatasetState::UnitFiltered => "unit filtered",
            DatasetState::DuplicatesResolved => "duplicates resolved",
            DatasetState::Ready => "ready",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    DuplicateFeatures { names: Vec<String> },
    SkippedFile { path: Utf8PathBuf, reason: String },
    DuplicateSample { path: Utf8PathBuf, sample: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::DuplicateFeatures { names } => write!(
                f,
                "The following features are present more than once, only the first occurrence will be kept: {}",
                names.join(", ")
            ),
            Notice::SkippedFile { path, reason } => write!(f, "skipped {path}: {reason}"),
            Notice::DuplicateSample { path, sample } => {
                write!(f, "skipped {path}: sample {sample} was already loaded")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub at: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OperationLog {
    entries: Vec<LogEntry>,
}

impl OperationLog {
    pub fn push(&mut self, message: impl Into<String>) {
        self.entries.push(LogEntry {
            at: chrono::Utc::now().to_rfc3339(),
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub dataset: TargetedDataset,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone)]
pub struct TargetedDataset {
    attributes: AttributeSet,
    file_type: FileType,
    source: Option<Utf8PathBuf>,
    study: Partition,
    calibration: Partition,
    excluded: Vec<ExclusionRecord>,
    log: OperationLog,
    state: DatasetState,
}

impl TargetedDataset {
    pub fn load(params: &LoadParams) -> Result<LoadOutcome, NmrError> {
        Self::load_with(params.validate()?)
    }

    pub fn load_with(options: LoadOptions) -> Result<LoadOutcome, NmrError> {
        let attributes = AttributeSet::for_sop_in(&options.sop, options.sop_dir.as_deref())?;
        options.file_type.load(&options, attributes)
    }

    fn empty(attributes: AttributeSet, file_type: FileType) -> Self {
        Self {
            attributes,
            file_type,
            source: None,
            study: Partition::empty(Vec::new()),
            calibration: Partition::empty(Vec::new()),
            excluded: Vec::new(),
            log: OperationLog::default(),
            state: DatasetState::Uninitialized,
        }
    }

    fn transition(&mut self, next: DatasetState) {
        debug!(from = %self.state, to = %next, "dataset state");
        self.state = next;
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn source(&self) -> Option<&Utf8Path> {
        self.source.as_deref()
    }

    pub fn state(&self) -> DatasetState {
        self.state
    }

    pub fn study(&self) -> &Partition {
        &self.study
    }

    pub fn samples(&self) -> &[SampleRecord] {
        &self.study.samples
    }

    pub fn features(&self) -> &[FeatureRecord] {
        &self.study.features
    }

    pub fn values(&self) -> &Matrix<f64> {
        &self.study.values
    }

    pub fn expected(&self) -> &Matrix<Option<f64>> {
        &self.study.expected
    }

    pub fn calibration(&self) -> &Partition {
        &self.calibration
    }

    pub fn excluded(&self) -> &[ExclusionRecord] {
        &self.excluded
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.study.nsamples(), self.study.nfeatures())
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.study.feature_names()
    }

    fn ensure_ready(&self) -> Result<(), NmrError> {
        if self.state == DatasetState::Ready {
            Ok(())
        } else {
            Err(NmrError::NotReady(self.state.to_string()))
        }
    }

    pub fn merge_lims(
        &mut self,
        path: &Utf8Path,
        format: LimsFormat,
    ) -> Result<MergeSummary, NmrError> {
        self.ensure_ready()?;
        let worklist = Worklist::read(path, format)?;
        let merger = LimsMerger::new(&self.attributes.lims)?;
        let summary = merger.merge(&mut self.study.samples, &worklist);
        info!(
            %path,
            matched = summary.matched,
            unmatched = summary.unmatched,
            "merged LIMS worklist"
        );
        self.log.push(format!(
            "{format} worklist {path} merged: {} matched, {} not in worklist",
            summary.matched, summary.unmatched
        ));
        Ok(summary)
    }

    pub fn exclude_samples(&mut self, indices: &[usize], reason: &str) -> Result<(), NmrError> {
        self.ensure_ready()?;
        let removed = self.study.exclude_samples(indices, reason)?;
        self.log
            .push(format!("{} samples excluded: {reason}", removed.len()));
        self.excluded.extend(removed);
        Ok(())
    }

    pub fn exclude_features(&mut self, names: &[&str], reason: &str) -> Result<(), NmrError> {
        self.ensure_ready()?;
        let removed = self.study.exclude_features(names, reason)?;
        let calibration_removed = self.calibration.exclude_features(names, reason)?;
        self.log.push(format!(
            "features excluded ({reason}): {}",
            names.join(", ")
        ));
        self.excluded.extend(removed);
        self.excluded.extend(calibration_removed);
        Ok(())
    }

    pub fn reorder_samples(&mut self, order: &[usize]) -> Result<(), NmrError> {
        self.ensure_ready()?;
        self.study.reorder_samples(order)?;
        self.log.push("samples reordered");
        Ok(())
    }

    pub fn sort_samples_by_base_name(&mut self) -> Result<(), NmrError> {
        let mut order: Vec<usize> = (0..self.study.nsamples()).collect();
        order.sort_by(|&a, &b| {
            self.study.samples[a]
                .sample_base_name
                .cmp(&self.study.samples[b].sample_base_name)
        });
        self.reorder_samples(&order)
    }
}

impl PartialEq for TargetedDataset {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes
            && self.file_type == other.file_type
            && self.source == other.source
            && self.state == other.state
            && self.study == other.study
            && self.calibration == other.calibration
            && same_exclusions(&self.excluded, &other.excluded)
    }
}

fn same_exclusions(left: &[ExclusionRecord], right: &[ExclusionRecord]) -> bool {
    fn slices(record: &ExclusionRecord) -> (&[f64], &[Option<f64>]) {
        match record {
            ExclusionRecord::Sample {
                values, expected, ..
            }
            | ExclusionRecord::Feature {
                values, expected, ..
            } => (values, expected),
        }
    }
    left.len() == right.len()
        && left.iter().zip(right).all(|(a, b)| {
            let (a_values, a_expected) = slices(a);
            let (b_values, b_expected) = slices(b);
            a.reason() == b.reason()
                && a.label() == b.label()
                && a_expected == b_expected
                && a_values.len() == b_values.len()
                && a_values
                    .iter()
                    .zip(b_values)
                    .all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
        })
}

impl FileType {
    pub fn load(
        self,
        options: &LoadOptions,
        attributes: AttributeSet,
    ) -> Result<LoadOutcome, NmrError> {
        match self {
            FileType::Empty => {
                let mut dataset = TargetedDataset::empty(attributes, self);
                dataset.transition(DatasetState::Ready);
                dataset.log.push("empty dataset created");
                Ok(LoadOutcome {
                    dataset,
                    notices: Vec::new(),
                })
            }
            FileType::BrukerQuantification => load_bruker_quantification(options, attributes),
        }
    }
}

fn load_bruker_quantification(
    options: &LoadOptions,
    attributes: AttributeSet,
) -> Result<LoadOutcome, NmrError> {
    let source = options
        .source
        .clone()
        .ok_or_else(|| NmrError::InvalidParameters("source path is required".to_string()))?;
    let pattern = options
        .file_name_pattern
        .as_deref()
        .or(attributes.file_name_pattern.as_deref())
        .unwrap_or(DEFAULT_FILE_NAME_PATTERN)
        .to_string();
    let pdata = options.pdata.unwrap_or(attributes.pdata);
    let splitter = CalibrationSplitter::from_rule(&attributes.calibration)?;

    let mut dataset = TargetedDataset::empty(attributes, FileType::BrukerQuantification);
    dataset.source = Some(source.clone());
    let mut notices = Vec::new();

    let files = FileDiscovery::new(&source, &pattern, Some(pdata))?.discover()?;
    info!(%source, %pattern, files = files.len(), "discovered report files");
    dataset.transition(DatasetState::FilesDiscovered);

    let mut reports = Vec::with_capacity(files.len());
    let mut identities = HashSet::new();
    for path in &files {
        match parse_report(path, pdata, &dataset.attributes) {
            Ok(report) => {
                if identities.insert(report.sample.sample_file_name.clone()) {
                    reports.push(report);
                } else {
                    warn!(%path, sample = %report.sample.sample_file_name, "duplicate sample skipped");
                    notices.push(Notice::DuplicateSample {
                        path: path.clone(),
                        sample: report.sample.sample_file_name,
                    });
                }
            }
            Err(err) => {
                warn!(%path, error = %err, "report skipped");
                notices.push(Notice::SkippedFile {
                    path: path.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    dataset.transition(DatasetState::Parsed);

    let table = MergedTable::from_reports(reports);
    let unit = working_unit(options.unit.as_deref(), &dataset.attributes);
    let table = filter_by_unit(table, unit.as_deref())?;
    dataset.transition(DatasetState::UnitFiltered);

    let resolution = resolve_duplicates(table);
    if !resolution.duplicates.is_empty() {
        let notice = Notice::DuplicateFeatures {
            names: resolution.duplicates,
        };
        warn!("{notice}");
        notices.push(notice);
    }
    dataset.excluded.extend(resolution.excluded);
    dataset.transition(DatasetState::DuplicatesResolved);

    let (mut study, mut calibration) = splitter.split(resolution.table);
    let censored =
        study.apply_limits_of_quantification() + calibration.apply_limits_of_quantification();
    if censored > 0 {
        debug!(censored, "values outside limits of quantification replaced by infinities");
    }
    dataset.study = study;
    dataset.calibration = calibration;
    dataset.transition(DatasetState::Ready);

    let (samples, features) = dataset.shape();
    let method = dataset.attributes.method_name.clone();
    info!(
        %source,
        samples,
        features,
        calibration = dataset.calibration.nsamples(),
        notices = notices.len(),
        "{method} loaded"
    );
    dataset.log.push(format!(
        "{method} loaded from {source}: {samples} samples, {features} features, {} calibration samples",
        dataset.calibration.nsamples()
    ));
    Ok(LoadOutcome { dataset, notices })
}
