use std::io::{self, Write};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::dataset::{LoadOutcome, LogEntry};
use crate::error::NmrError;

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub method: String,
    pub sop: String,
    pub file_type: String,
    pub state: String,
    pub samples: usize,
    pub features: usize,
    pub calibration_samples: usize,
    pub excluded: usize,
    pub notices: Vec<String>,
    pub sample_metadata: Vec<Map<String, Value>>,
    pub feature_metadata: Vec<Map<String, Value>>,
    pub log: Vec<LogEntry>,
}

impl DatasetSummary {
    pub fn from_outcome(outcome: &LoadOutcome) -> Result<Self, NmrError> {
        let dataset = &outcome.dataset;
        let attributes = dataset.attributes();
        let (samples, features) = dataset.shape();

        Ok(Self {
            method: attributes.method_name.clone(),
            sop: attributes.sop.clone(),
            file_type: dataset.file_type().to_string(),
            state: dataset.state().to_string(),
            samples,
            features,
            calibration_samples: dataset.calibration().nsamples(),
            excluded: dataset.excluded().len(),
            notices: outcome.notices.iter().map(ToString::to_string).collect(),
            sample_metadata: export_rows(dataset.samples(), &attributes.sample_metadata_not_exported)?,
            feature_metadata: export_rows(
                dataset.features(),
                &attributes.feature_metadata_not_exported,
            )?,
            log: dataset.log().entries().to_vec(),
        })
    }
}

fn export_rows<T: Serialize>(
    rows: &[T],
    not_exported: &[String],
) -> Result<Vec<Map<String, Value>>, NmrError> {
    rows.iter()
        .map(|row| {
            let value = serde_json::to_value(row)
                .map_err(|err| NmrError::Serialization(err.to_string()))?;
            let Value::Object(mut map) = value else {
                return Err(NmrError::Serialization(
                    "metadata row is not an object".to_string(),
                ));
            };
            for column in not_exported {
                map.remove(column);
            }
            Ok(map)
        })
        .collect()
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &DatasetSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
