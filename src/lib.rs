use anyhow::Context;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use validate_lib::reader::read_table;
use validate_lib::{
    FileInfo, InputRegistration, OutputRegistration, RowInput, StepHost, ValidateStatus, Validator,
};

pub use validate_lib::ERRORS_LOG_FILE;

/// File name of the job meta written next to the outputs
pub const JOB_META_FILE: &str = "job_meta.json";

/// Step host for local runs: registrations are logged and kept, meta lives in memory.
#[derive(Debug, Default)]
pub struct LocalHost {
    pub outputs: Vec<OutputRegistration>,
    pub inputs: Vec<InputRegistration>,
    pub meta: Map<String, Value>,
}

impl StepHost for LocalHost {
    fn create_output(&mut self, output: OutputRegistration) -> anyhow::Result<()> {
        tracing::info!(
            name = %output.name,
            key = %output.details.storage.key,
            bucket = %output.details.storage.bucket,
            "dynamic output registered"
        );
        self.outputs.push(output);
        Ok(())
    }

    fn create_input(&mut self, input: InputRegistration) -> anyhow::Result<()> {
        tracing::info!(name = %input.name, step = %input.step, "dynamic input registered");
        self.inputs.push(input);
        Ok(())
    }

    fn meta_value(&self, key: &str) -> Option<Value> {
        self.meta.get(key).cloned()
    }

    fn set_meta_value(&mut self, key: &str, value: Value) -> anyhow::Result<()> {
        self.meta.insert(key.to_string(), value);
        Ok(())
    }
}

/// Outcome of feeding one input file through the validator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileRun {
    pub name: String,
    pub rows: usize,
    pub invalid_rows: usize,
    /// CSV files written, one per output name
    pub written: Vec<PathBuf>,
    /// Row number to info text of every invalid row
    pub invalid_report: BTreeMap<usize, String>,
}

/// Feed the header row and every data row of `input` to the validator and write
/// each named output to `<output_dir>/<output name>.csv`.
pub fn run_file(
    validator: &mut Validator,
    host: &mut LocalHost,
    input: &Path,
    name: &str,
    sheet_name: Option<&str>,
    output_dir: &Path,
) -> anyhow::Result<FileRun> {
    let table = read_table(input, sheet_name)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let file_info = FileInfo {
        key: Some(input.to_string_lossy().to_string()),
        bucket: None,
    };

    let mut writers: BTreeMap<String, csv::Writer<File>> = BTreeMap::new();
    let mut run = FileRun {
        name: name.to_string(),
        ..Default::default()
    };

    let header = RowInput::header(name, table.headers.clone()).with_file_info(file_info.clone());
    let output = validator.validate(&header, host)?;
    write_outputs(&mut writers, &mut run, output_dir, output.outputs)?;

    for (index, cells) in table.rows {
        let row = RowInput::record(index, name, &table.headers, cells)
            .with_file_info(file_info.clone());
        let output = validator.validate(&row, host)?;
        run.rows += 1;
        if output.error {
            run.invalid_rows += 1;
        }
        write_outputs(&mut writers, &mut run, output_dir, output.outputs)?;
    }

    for writer in writers.values_mut() {
        writer.flush()?;
    }

    if let Some(session) = validator.session(name) {
        run.invalid_report = session.metrics.record_identifier.critical.clone();
    }
    tracing::info!(file = name, rows = run.rows, invalid = run.invalid_rows, "file validated");

    Ok(run)
}

fn write_outputs(
    writers: &mut BTreeMap<String, csv::Writer<File>>,
    run: &mut FileRun,
    output_dir: &Path,
    outputs: BTreeMap<String, Vec<String>>,
) -> anyhow::Result<()> {
    for (output_name, record) in outputs {
        if !writers.contains_key(&output_name) {
            let path = output_dir.join(format!("{}.csv", output_name));
            let writer = csv::Writer::from_path(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            run.written.push(path);
            writers.insert(output_name.clone(), writer);
        }
        if let Some(writer) = writers.get_mut(&output_name) {
            writer.write_record(&record)?;
        }
    }
    Ok(())
}

/// Errors log entry listing every invalid row of a file.
pub fn format_invalid_report(run: &FileRun) -> String {
    run.invalid_report
        .iter()
        .map(|(row, info)| format!("Row {}: {}", row, info))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn is_invalid(validator: &Validator) -> bool {
    validator.worst_status() == ValidateStatus::Invalid
}
