//! CSV exports of output tables.
//!
//! Tables are written in the same wide layout `ingest` reads: a `date` column
//! followed by one column per area, so exported actual+forecast tables can be fed
//! back in.

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::domain::DateTable;
use crate::error::AppError;
use crate::forecast::{ModelTables, ParamRow, ParamTable};

fn csv_error(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::input(format!("Failed to write CSV '{}': {e}", path.display()))
}

fn create(path: &Path) -> Result<Writer<File>, AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create CSV '{}': {e}", path.display())))?;
    Ok(Writer::from_writer(file))
}

/// Write one `DateTable` as wide CSV.
pub fn write_table_csv(path: &Path, table: &DateTable) -> Result<(), AppError> {
    let mut w = create(path)?;

    let mut header = vec!["date".to_string()];
    header.extend(table.areas().map(str::to_string));
    w.write_record(&header).map_err(|e| csv_error(path, e))?;

    for (i, date) in table.dates().enumerate() {
        let mut row = Vec::with_capacity(table.columns.len() + 1);
        row.push(date.format("%Y-%m-%d").to_string());
        for values in table.columns.values() {
            row.push(values[i].to_string());
        }
        w.write_record(&row).map_err(|e| csv_error(path, e))?;
    }

    w.flush().map_err(|e| csv_error(path, e))?;
    Ok(())
}

/// Write the parameter table, one row per area.
///
/// Logistic rows carry `l,x0,k,v,s` plus convergence; ratio rows carry the ratio and
/// the two window totals. Unused cells are left empty.
pub fn write_params_csv(path: &Path, params: &ParamTable) -> Result<(), AppError> {
    let mut w = create(path)?;
    w.write_record([
        "area",
        "kind",
        "l",
        "x0",
        "k",
        "v",
        "s",
        "converged",
        "iterations",
        "ratio",
        "derived_total",
        "driver_total",
        "fallback_used",
    ])
    .map_err(|e| csv_error(path, e))?;

    for (area, row) in params {
        let mut record = vec![area.clone()];
        match row {
            ParamRow::Logistic { fit: Some(fit) } => {
                let p = fit.params;
                record.push("logistic".to_string());
                record.extend([p.l, p.x0, p.k, p.v, p.s].map(|v| v.to_string()));
                record.push(fit.converged.to_string());
                record.push(fit.iterations.to_string());
                record.extend(std::iter::repeat_n(String::new(), 4));
            }
            ParamRow::Logistic { fit: None } => {
                record.push("skipped".to_string());
                record.extend(std::iter::repeat_n(String::new(), 11));
            }
            ParamRow::Ratio { estimate } => {
                record.push("ratio".to_string());
                record.extend(std::iter::repeat_n(String::new(), 7));
                record.push(estimate.ratio.to_string());
                record.push(estimate.derived_total.to_string());
                record.push(estimate.driver_total.to_string());
                record.push(estimate.fallback_used.to_string());
            }
        }
        w.write_record(&record).map_err(|e| csv_error(path, e))?;
    }

    w.flush().map_err(|e| csv_error(path, e))?;
    Ok(())
}

/// Write every table of one model run into `dir`, file names prefixed with `prefix`
/// (e.g. `world_cases`).
pub fn write_model_tables(dir: &Path, prefix: &str, tables: &ModelTables) -> Result<(), AppError> {
    let outputs: [(&str, &DateTable); 7] = [
        ("smoothed", &tables.smoothed),
        ("daily", &tables.daily),
        ("cumulative", &tables.cumulative),
        ("combined_daily", &tables.combined_daily),
        ("combined_cumulative", &tables.combined_cumulative),
        ("combined_daily_smoothed", &tables.combined_daily_smoothed),
        ("combined_cumulative_smoothed", &tables.combined_cumulative_smoothed),
    ];
    for (name, table) in outputs {
        write_table_csv(&dir.join(format!("{prefix}_{name}.csv")), table)?;
    }
    write_params_csv(&dir.join(format!("{prefix}_params.csv")), &tables.params)
}
