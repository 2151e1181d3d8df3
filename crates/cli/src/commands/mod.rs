pub(crate) mod check;
pub(crate) mod query;
pub(crate) mod validate;

use std::path::Path;
use std::process;

use actionspec_core::{CompilerError, SpecParser, TypeGraph};

use crate::{report_error, OutputFormat};

/// Read a source file or exit with a report.
pub(crate) fn read_source(path: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Parse every file into one parser and finalize.
pub(crate) fn compile_files(
    files: &[&Path],
    output: OutputFormat,
    quiet: bool,
) -> Result<TypeGraph, CompilerError> {
    let mut parser = SpecParser::new();
    for file in files {
        let text = read_source(file, output, quiet);
        parser.parse(&text, &file.display().to_string(), 1);
    }
    parser.finalize()
}

/// Print compiler diagnostics in the selected format.
pub(crate) fn print_diagnostics(err: &CompilerError, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&err.errors)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            if !quiet {
                for line in err.messages() {
                    eprintln!("{}", line);
                }
            }
        }
    }
}
