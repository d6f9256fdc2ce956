//! Schema Form CLI
//!
//! Command-line interface for normalizing schemas, building control
//! templates and checking form data.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use schema_form::{
    compile, format_form_data, load_document, load_schema, normalize, pointer, validate_normalized,
    BuildOptions, FormatOptions, LoadError, ValidateError,
};

#[derive(Parser)]
#[command(name = "schema-form")]
#[command(about = "Build form models from JSON Schemas")]
#[command(version)]
struct Cli {
    /// Log debug diagnostics to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a draft 1-4 schema as draft 06
    Normalize {
        /// Schema file (`-` for stdin)
        schema: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Build the control template for a schema
    Template {
        /// Schema file (`-` for stdin)
        schema: PathBuf,

        /// Data to shape the template (lists, recursion, values)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Use schema defaults where data is missing
        #[arg(long)]
        defaults: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Coerce form data to the schema's types
    Format {
        /// Schema file
        schema: PathBuf,

        /// Form data file (`-` for stdin)
        data: PathBuf,

        /// Keep empty values and containers
        #[arg(long)]
        empty_fields: bool,

        /// Repair values that do not match their type
        #[arg(long)]
        fix_errors: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a data document against a schema
    Validate {
        /// Schema file
        schema: PathBuf,

        /// Data file (`-` for stdin)
        data: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Print the value a JSON Pointer addresses
    Pointer {
        /// JSON file (`-` for stdin)
        file: PathBuf,

        /// JSON Pointer, e.g. /properties/name or #/definitions/node
        pointer: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Normalize {
            schema,
            output,
            pretty,
        } => run_normalize(&schema, output, pretty),

        Commands::Template {
            schema,
            data,
            defaults,
            output,
            pretty,
        } => run_template(&schema, data.as_deref(), defaults, output, pretty),

        Commands::Format {
            schema,
            data,
            empty_fields,
            fix_errors,
            pretty,
        } => run_format(
            &schema,
            &data,
            FormatOptions {
                return_empty_fields: empty_fields,
                fix_errors,
            },
            pretty,
        ),

        Commands::Validate { schema, data, json } => run_validate(&schema, &data, json),

        Commands::Pointer {
            file,
            pointer,
            pretty,
        } => run_pointer(&file, &pointer, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load(path: &Path, what: &str, schema: bool) -> Result<Value, u8> {
    let loaded = if schema { load_schema(path) } else { load_document(path) };
    loaded.map_err(|e: LoadError| {
        eprintln!("Error loading {}: {}", what, e);
        e.exit_code() as u8
    })
}

fn emit(value: &Value, pretty: bool, output: Option<PathBuf>) -> Result<(), u8> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &text).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", text);
        }
    }
    Ok(())
}

fn run_normalize(schema_path: &Path, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let schema = load(schema_path, "schema", true)?;
    emit(&normalize(&schema), pretty, output)
}

fn run_template(
    schema_path: &Path,
    data_path: Option<&Path>,
    defaults: bool,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let schema = normalize(&load(schema_path, "schema", true)?);
    let data = match data_path {
        Some(path) => load(path, "data", false)?,
        None => Value::Null,
    };

    let options = BuildOptions::new().with_schema_defaults(defaults);
    let compiled = compile(&schema, &data, options);
    let report = json!({
        "template": compiled.template,
        "options": compiled.context.options,
        "references": compiled.context.templates,
    });
    emit(&report, pretty, output)
}

fn run_format(schema_path: &Path, data_path: &Path, options: FormatOptions, pretty: bool) -> Result<(), u8> {
    let schema = normalize(&load(schema_path, "schema", true)?);
    let data = load(data_path, "data", false)?;

    let compiled = compile(&schema, &data, BuildOptions::default());
    emit(&format_form_data(&data, &compiled.context, options), pretty, None)
}

fn run_validate(schema_path: &Path, data_path: &Path, json_output: bool) -> Result<(), u8> {
    let schema = load(schema_path, "schema", true).map_err(|code| {
        report_error(json_output, "schema could not be loaded");
        code
    })?;
    let data = load(data_path, "data", false).map_err(|code| {
        report_error(json_output, "data could not be loaded");
        code
    })?;

    match validate_normalized(&normalize(&schema), &data) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", json!({"valid": false, "error": msg}));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_pointer(file: &Path, target: &str, pretty: bool) -> Result<(), u8> {
    let document = load(file, "document", false)?;
    let tokens = pointer::try_parse(target).map_err(|e| {
        eprintln!("Error: {}", e);
        2u8
    })?;

    match pointer::get(&document, &tokens) {
        Some(value) => emit(value, pretty, None),
        None => {
            eprintln!("Error: nothing at {}", target);
            Err(1)
        }
    }
}
