mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use actionspec_core::ValidationMode;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Validation mode for the validate subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Default,
    QueryString,
    JsonInput,
    JsonOutput,
}

impl From<ModeArg> for ValidationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Default => ValidationMode::Default,
            ModeArg::QueryString => ValidationMode::QueryString,
            ModeArg::JsonInput => ValidationMode::JsonInput,
            ModeArg::JsonOutput => ValidationMode::JsonOutput,
        }
    }
}

/// Action spec language toolchain.
#[derive(Parser)]
#[command(
    name = "actionspec",
    version,
    about = "Action spec language toolchain"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile spec files into one registry and report diagnostics
    Check {
        /// Spec source files, compiled in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Validate a value against a named type
    Validate {
        /// Spec source file declaring the type
        spec: PathBuf,
        /// Type name to validate against
        type_name: String,
        /// Validation mode; query-string reads the input as a query string,
        /// json-output parses date/datetime/uuid strings before rendering
        #[arg(long, default_value = "json-input", value_enum)]
        mode: ModeArg,
        /// Input file (reads stdin when omitted)
        input: Option<PathBuf>,
    },

    /// Encode or decode query strings
    Query {
        #[command(subcommand)]
        command: QueryCommands,
    },
}

#[derive(Subcommand)]
enum QueryCommands {
    /// Encode a JSON value as a query string
    Encode {
        /// JSON text
        json: String,
    },
    /// Decode a query string to JSON
    Decode {
        /// Query string, without the leading '?'
        query: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { files } => {
            commands::check::cmd_check(&files, cli.output, cli.quiet);
        }
        Commands::Validate {
            spec,
            type_name,
            mode,
            input,
        } => {
            commands::validate::cmd_validate(
                &spec,
                &type_name,
                mode.into(),
                input.as_deref(),
                cli.output,
                cli.quiet,
            );
        }
        Commands::Query { command } => match command {
            QueryCommands::Encode { json } => {
                commands::query::cmd_encode(&json, cli.output, cli.quiet);
            }
            QueryCommands::Decode { query } => {
                commands::query::cmd_decode(&query, cli.output, cli.quiet);
            }
        },
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
