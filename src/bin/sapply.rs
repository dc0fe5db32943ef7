//! sapply - Structured Apply CLI tool
//!
//! A command line tool for merging, comparing and normalizing Kubernetes
//! objects stored in YAML/JSON files.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use structured_apply::apply::{
    detect_merge_key, merge, merge_with_last_applied, strip_null_fields,
};
use structured_apply::compare::is_equal_with_diff;
use structured_apply::fieldpath::Path as FieldPath;
use structured_apply::object::{read_objects, sort_by_kind};
use structured_apply::value::{expect_map, from_yaml, to_yaml, Map, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Client-side three-way merge and drift checks for Kubernetes objects
#[derive(Parser, Debug)]
#[command(name = "sapply")]
#[command(version)]
struct Cli {
    /// Log filter, e.g. `structured_apply=debug`
    #[arg(long, global = true, default_value = "structured_apply=info", env = "SAPPLY_LOG")]
    log: String,

    /// Output location. Use '-' for stdout
    #[arg(short, long, global = true, default_value = "-")]
    output: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge a desired object into an observed one
    Merge {
        #[arg(long)]
        observed: PathBuf,
        #[arg(long)]
        desired: PathBuf,
        /// Last applied state; defaults to the desired object itself
        #[arg(long, conflicts_with = "annotate")]
        last_applied: Option<PathBuf>,
        /// Use and record the last applied state kept in the observed object's annotations
        #[arg(long)]
        annotate: bool,
    },
    /// Report whether applying the desired object would change the observed one
    Compare {
        #[arg(long)]
        observed: PathBuf,
        #[arg(long)]
        desired: PathBuf,
        /// Print the differences
        #[arg(long)]
        diff: bool,
        /// Dotted path whose differences are ignored, e.g. `metadata.annotations`. May be repeated
        #[arg(long = "ignore")]
        ignore: Vec<String>,
    },
    /// Remove null and empty-string fields
    Strip { file: PathBuf },
    /// Report the merge key of a list field
    DetectKey {
        file: PathBuf,
        /// Dotted path to the list, e.g. `spec.template.spec.containers`
        #[arg(long)]
        field: String,
    },
    /// Order the objects of a multi-document manifest for apply
    Sort { file: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match EnvFilter::builder().parse(&cli.log) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Error: invalid log filter {:?}: {}", cli.log, e);
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<ExitCode> {
    let mut output: Box<dyn Write> = if cli.output == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(
            fs::File::create(&cli.output)
                .map_err(|e| format!("Failed to create output file {:?}: {}", cli.output, e))?,
        )
    };

    match cli.command {
        Command::Merge {
            observed,
            desired,
            last_applied,
            annotate,
        } => merge_files(&observed, &desired, last_applied.as_deref(), annotate, &mut output)?,
        Command::Compare {
            observed,
            desired,
            diff,
            ignore,
        } => return compare(&observed, &desired, diff, &ignore, &mut output),
        Command::Strip { file } => {
            let stripped = strip_null_fields(&read_map(&file)?);
            write!(output, "{}", to_yaml(&Value::Map(stripped))?)?;
        }
        Command::DetectKey { file, field } => detect_key(&file, &field, &mut output)?,
        Command::Sort { file } => sort(&file, &mut output)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn read_map(file: &Path) -> CliResult<Map> {
    let content =
        fs::read_to_string(file).map_err(|e| format!("Failed to read file {:?}: {}", file, e))?;
    let value = from_yaml(&content).map_err(|e| format!("Failed to parse {:?}: {}", file, e))?;
    Ok(expect_map(value).map_err(|e| format!("{:?} is not an object: {}", file, e))?)
}

fn merge_files(
    observed: &Path,
    desired: &Path,
    last_applied: Option<&Path>,
    annotate: bool,
    output: &mut dyn Write,
) -> CliResult<()> {
    let observed = read_map(observed)?;
    let desired = read_map(desired)?;

    let merged = if annotate {
        merge_with_last_applied(&observed, &desired)
    } else {
        let last_applied = match last_applied {
            Some(file) => read_map(file)?,
            None => desired.clone(),
        };
        merge(&observed, &last_applied, &desired)
    }
    .map_err(|e| format!("Merge failed: {}", e))?;

    write!(output, "{}", to_yaml(&Value::Map(merged))?)?;
    Ok(())
}

fn compare(
    observed: &Path,
    desired: &Path,
    show_diff: bool,
    ignore: &[String],
    output: &mut dyn Write,
) -> CliResult<ExitCode> {
    let observed = read_map(observed)?;
    let desired = read_map(desired)?;

    let (_, mut comparison) =
        is_equal_with_diff(&observed, &desired).map_err(|e| format!("Compare failed: {}", e))?;
    let ignored: Vec<FieldPath> = ignore.iter().map(|p| FieldPath::from_fields(&dotted(p))).collect();
    comparison.exclude_paths(&ignored);
    if comparison.is_same() {
        writeln!(output, "Objects are identical")?;
        return Ok(ExitCode::SUCCESS);
    }

    writeln!(output, "Objects differ")?;
    if show_diff {
        writeln!(output, "{}", comparison)?;
    }
    Ok(ExitCode::from(1))
}

fn detect_key(file: &Path, field: &str, output: &mut dyn Write) -> CliResult<()> {
    let doc = read_map(file)?;
    let items = match doc.nested_field(&dotted(field)) {
        Some(Value::List(items)) => items,
        Some(other) => return Err(format!("{} is a {}, not a list", field, other.kind_name()).into()),
        None => return Err(format!("{} not found", field).into()),
    };

    debug!(field, items = items.len(), "detecting merge key");
    match detect_merge_key(&[items.as_slice()]) {
        Some(key) => writeln!(output, "{}", key)?,
        None => writeln!(output, "none (list is replaced wholesale)")?,
    }
    Ok(())
}

fn dotted(path: &str) -> Vec<&str> {
    path.split('.').filter(|f| !f.is_empty()).collect()
}

fn sort(file: &Path, output: &mut dyn Write) -> CliResult<()> {
    let content =
        fs::read_to_string(file).map_err(|e| format!("Failed to read file {:?}: {}", file, e))?;
    let mut objects = read_objects(&content)?;
    sort_by_kind(&mut objects);

    for obj in objects {
        write!(output, "---\n{}", to_yaml(&Value::Map(obj))?)?;
    }
    Ok(())
}
