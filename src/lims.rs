use std::collections::{BTreeMap, HashMap};

use camino::Utf8Path;
use csv::{ReaderBuilder, StringRecord, Trim};
use regex::Regex;
use tracing::debug;

use crate::config::{LimsLabels, ReferenceLabel, compile_pattern};
use crate::domain::{AssayRole, LimsFormat, SampleType};
use crate::error::NmrError;
use crate::record::SampleRecord;

pub const SAMPLE_ID: &str = "Sample ID";
pub const SAMPLE_POSITION: &str = "Sample position";
pub const SAMPLE_BASE_NAME: &str = "Sample Base Name";
pub const ASSAY_DATA_NAME: &str = "Assay data name";
pub const ASSAY_DATA_LOCATION: &str = "Assay data location";

#[derive(Debug, Clone, PartialEq)]
pub struct WorklistRow {
    pub base_name: Option<String>,
    pub sample_id: Option<String>,
    pub position: Option<String>,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Worklist {
    pub rows: Vec<WorklistRow>,
}

impl Worklist {
    pub fn read(path: &Utf8Path, format: LimsFormat) -> Result<Self, NmrError> {
        let read_error = |err: csv::Error| NmrError::WorklistRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .flexible(true)
            .from_path(path.as_std_path())
            .map_err(read_error)?;
        let headers = reader.headers().map_err(read_error)?.clone();

        match format {
            LimsFormat::NpcLims => {
                let missing_column = |column: &str| NmrError::WorklistColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                };
                for required in [SAMPLE_ID, SAMPLE_POSITION] {
                    if column_index(&headers, required).is_none() {
                        return Err(missing_column(required));
                    }
                }
                if column_index(&headers, SAMPLE_BASE_NAME).is_none()
                    && column_index(&headers, ASSAY_DATA_NAME).is_none()
                {
                    return Err(missing_column(SAMPLE_BASE_NAME));
                }
            }
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_error)?;
            rows.push(npc_row(&headers, &record));
        }
        debug!(%path, rows = rows.len(), "read worklist");
        Ok(Self { rows })
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header == name)
}

fn npc_row(headers: &StringRecord, record: &StringRecord) -> WorklistRow {
    let fields: BTreeMap<String, String> = headers
        .iter()
        .zip(record.iter())
        .filter(|(header, _)| !header.is_empty())
        .map(|(header, value)| (header.to_string(), value.to_string()))
        .collect();
    let get = |name: &str| {
        fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let base_name = get(SAMPLE_BASE_NAME).or_else(|| {
        let name = get(ASSAY_DATA_NAME)?;
        Some(match get(ASSAY_DATA_LOCATION) {
            Some(location) => format!("{name}/{location}"),
            None => name,
        })
    });
    WorklistRow {
        base_name,
        sample_id: get(SAMPLE_ID),
        position: get(SAMPLE_POSITION),
        fields,
    }
}

pub fn normalize_key(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeSummary {
    pub matched: usize,
    pub unmatched: usize,
}

#[derive(Debug, Clone)]
pub struct LimsMerger<'a> {
    labels: &'a LimsLabels,
    references: Vec<(Regex, &'a ReferenceLabel)>,
}

impl<'a> LimsMerger<'a> {
    pub fn new(labels: &'a LimsLabels) -> Result<Self, NmrError> {
        let references = labels
            .reference_labels
            .iter()
            .map(|reference| Ok((compile_pattern(&reference.pattern)?, reference)))
            .collect::<Result<Vec<_>, NmrError>>()?;
        Ok(Self { labels, references })
    }

    pub fn merge(&self, samples: &mut [SampleRecord], worklist: &Worklist) -> MergeSummary {
        let mut by_name: HashMap<String, &WorklistRow> = HashMap::new();
        let mut by_position: HashMap<String, &WorklistRow> = HashMap::new();
        for row in &worklist.rows {
            if let Some(name) = &row.base_name {
                by_name.entry(normalize_key(name)).or_insert(row);
            }
            if let Some(position) = &row.position {
                by_position.entry(normalize_key(position)).or_insert(row);
            }
        }

        let mut summary = MergeSummary::default();
        for sample in samples.iter_mut() {
            sample.clear_worklist_fields();
            let row = by_name
                .get(&normalize_key(&sample.sample_base_name))
                .or_else(|| {
                    sample
                        .report_position
                        .as_deref()
                        .and_then(|position| by_position.get(&normalize_key(position)))
                });
            match row {
                Some(row) => {
                    self.apply(sample, row);
                    summary.matched += 1;
                }
                None => {
                    sample.sample_id = Some(self.labels.unmatched_label.clone());
                    summary.unmatched += 1;
                }
            }
        }
        summary
    }

    fn apply(&self, sample: &mut SampleRecord, row: &WorklistRow) {
        sample.worklist = row
            .fields
            .iter()
            .filter(|(header, _)| !SampleRecord::COLUMNS.contains(&header.as_str()))
            .map(|(header, value)| (header.clone(), value.clone()))
            .collect();
        sample.sample_position = row.position.clone();
        sample.metadata_available = true;

        let reference = row.sample_id.as_deref().and_then(|id| {
            self.references
                .iter()
                .find(|(pattern, _)| pattern.is_match(id))
                .map(|(_, reference)| *reference)
        });
        match reference {
            Some(reference) => {
                sample.sample_id = Some(reference.label.clone());
                sample.sample_type = Some(reference.sample_type);
                sample.assay_role = Some(reference.assay_role);
            }
            None => {
                sample.sample_id = row.sample_id.clone();
                sample.sample_type = Some(SampleType::StudySample);
                sample.assay_role = Some(AssayRole::Assay);
            }
        }
    }
}
