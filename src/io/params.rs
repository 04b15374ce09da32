//! Read/write run manifest JSON files.
//!
//! The manifest is the portable record of a run: configuration plus the fitted
//! parameters (or ratios) and convergence flags of every area, per group and metric.
//! Forecast tables themselves go to CSV (`export`).

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::app::pipeline::RunOutput;
use crate::domain::{ForecastConfig, Metric, RatioConfig};
use crate::error::AppError;
use crate::forecast::ParamTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub group: String,
    pub metric: Metric,
    pub params: ParamTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub tool: String,
    pub version: String,
    pub cutoff: NaiveDate,
    pub forecast: ForecastConfig,
    pub ratio: RatioConfig,
    pub models: Vec<ModelParams>,
}

impl RunManifest {
    pub fn from_run(run: &RunOutput) -> Self {
        let models = run
            .groups
            .iter()
            .flat_map(|g| {
                [
                    ModelParams {
                        group: g.group.clone(),
                        metric: g.cases.metric,
                        params: g.cases.tables.params.clone(),
                    },
                    ModelParams {
                        group: g.group.clone(),
                        metric: g.deaths.metric,
                        params: g.deaths.tables.params.clone(),
                    },
                ]
            })
            .collect();

        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            cutoff: run.config.cutoff,
            forecast: run.config.clone(),
            ratio: run.ratio.clone(),
            models,
        }
    }
}

/// Write a run manifest JSON file.
pub fn write_params_json(path: &Path, run: &RunOutput) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::input(format!("Failed to create manifest JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, &RunManifest::from_run(run))
        .map_err(|e| AppError::input(format!("Failed to write manifest JSON: {e}")))?;
    Ok(())
}

/// Read a run manifest JSON file.
pub fn read_params_json(path: &Path) -> Result<RunManifest, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::input(format!("Failed to open manifest JSON '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::input(format!("Invalid manifest JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::ParamRow;
    use crate::domain::{FitOutcome, ParameterSet};

    #[test]
    fn manifest_survives_json() {
        let cutoff = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        let mut params = ParamTable::new();
        params.insert(
            "A".to_string(),
            ParamRow::Logistic {
                fit: Some(FitOutcome {
                    params: ParameterSet {
                        l: 1200.5,
                        x0: 3.0,
                        k: 0.12,
                        v: 0.7,
                        s: 4.0,
                    },
                    converged: false,
                    iterations: 200,
                    cost: 12.25,
                }),
            },
        );
        params.insert("B".to_string(), ParamRow::Logistic { fit: None });
        let manifest = RunManifest {
            tool: "epicast".to_string(),
            version: "0".to_string(),
            cutoff,
            forecast: ForecastConfig::new(cutoff),
            ratio: RatioConfig::default(),
            models: vec![ModelParams {
                group: "world".to_string(),
                metric: Metric::Cases,
                params,
            }],
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let file = File::create(&path).unwrap();
        serde_json::to_writer_pretty(file, &manifest).unwrap();

        let back = read_params_json(&path).unwrap();
        assert_eq!(back, manifest);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"kind\": \"logistic\""));
        assert!(text.contains("\"metric\": \"cases\""));
    }

    #[test]
    fn invalid_json_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(read_params_json(&path).unwrap_err().exit_code(), 2);
    }
}
