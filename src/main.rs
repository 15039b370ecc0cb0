// reset; cargo run -- --config ./data/users.json --input ./data/users.csv --output-dir ./out
// reset; cargo run -- --config ./data/sections.json --input ./data/Sections.xlsx --sheet-name Sections -v

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use row_validator::{
    ERRORS_LOG_FILE, JOB_META_FILE, LocalHost, format_invalid_report, is_invalid, run_file,
};
use validate_lib::utils::write_error_to_log;
use validate_lib::{JobContext, Validator};

#[derive(Parser)]
#[command(name = "row-validator")]
#[command(about = "A tool to validate CSV and Excel files against column rules")]
#[command(version)]
struct Args {
    /// Path to the JSON file holding the validate step parameters
    #[arg(short, long)]
    config: PathBuf,

    /// CSV or Excel files to validate
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Optional sheet name to validate (if not specified, validates the first sheet)
    #[arg(long)]
    sheet_name: Option<String>,

    /// Input names, by position. Defaults to the file stem of each input.
    #[arg(long, num_args = 1..)]
    name: Vec<String>,

    /// Comma separated step names of the job
    #[arg(long, value_delimiter = ',', default_value = "validate")]
    flow: Vec<String>,

    /// The step of the flow this run performs
    #[arg(long, default_value = "validate")]
    step: String,

    /// Directory the data and log outputs are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Increase logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbose {
        0 => EnvFilter::new("row_validator=warn,validate_lib=warn"),
        1 => EnvFilter::new("row_validator=info,validate_lib=info"),
        _ => EnvFilter::new("row_validator=debug,validate_lib=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn input_name(path: &Path, names: &[String], position: usize) -> String {
    names.get(position).cloned().unwrap_or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default()
    })
}

fn main() -> Result<()> {
    let arguments = Args::parse();
    init_logging(arguments.verbose);

    let config_text = std::fs::read_to_string(&arguments.config)
        .with_context(|| format!("Failed to read {}", arguments.config.display()))?;
    let parameters: serde_json::Value = serde_json::from_str(&config_text)?;
    let job = JobContext::new(arguments.flow.clone(), &arguments.step);

    let mut validator = match Validator::before_validate(&parameters, &job) {
        Ok(validator) => validator,
        Err(e) => {
            write_error_to_log(ERRORS_LOG_FILE, "Validation Configuration Error", &e.to_string());
            eprintln!("❌ Invalid configuration: {e}");
            eprintln!("❌ Check {} for details.", ERRORS_LOG_FILE);
            std::process::exit(1);
        }
    };

    std::fs::create_dir_all(&arguments.output_dir)?;
    let mut host = LocalHost::default();

    for (position, input) in arguments.input.iter().enumerate() {
        let name = input_name(input, &arguments.name, position);
        match run_file(
            &mut validator,
            &mut host,
            input,
            &name,
            arguments.sheet_name.as_deref(),
            &arguments.output_dir,
        ) {
            Ok(run) => {
                if run.invalid_rows > 0 {
                    write_error_to_log(
                        ERRORS_LOG_FILE,
                        &format!("Invalid rows in {}", input.display()),
                        &format_invalid_report(&run),
                    );
                    println!("❌ {name}: {} of {} rows invalid", run.invalid_rows, run.rows);
                } else {
                    println!("✅ {name}: {} rows validated", run.rows);
                }
                for path in &run.written {
                    println!("   {}", path.display());
                }
            }
            Err(e) => {
                write_error_to_log(ERRORS_LOG_FILE, "Validation Error", &format!("{e:#}"));
                eprintln!("❌ Validation failed with error: {e:#}");
                eprintln!("❌ Check {} for details.", ERRORS_LOG_FILE);
                std::process::exit(1);
            }
        }
    }

    let status = validator.after_validate(&mut host)?;
    let meta_path = arguments.output_dir.join(JOB_META_FILE);
    std::fs::write(&meta_path, serde_json::to_string_pretty(&host.meta)?)?;
    println!("Completion status: {status}");

    if is_invalid(&validator) {
        eprintln!("❌ Check {} for details.", ERRORS_LOG_FILE);
        std::process::exit(1);
    }
    println!("✅ Validation completed!");

    Ok(())
}
