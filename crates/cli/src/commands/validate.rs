use std::io::Read;
use std::path::Path;
use std::process;

use actionspec_core::{
    parse_json, query_string, render_output, TypeGraph, TypeId, ValidationError, ValidationMode,
    Value,
};

use super::{compile_files, print_diagnostics, read_source};
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_validate(
    spec: &Path,
    type_name: &str,
    mode: ValidationMode,
    input: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let graph = match compile_files(&[spec], output, quiet) {
        Ok(g) => g,
        Err(e) => {
            print_diagnostics(&e, output, quiet);
            process::exit(1);
        }
    };

    let Some(type_id) = graph.type_id(type_name) else {
        report_error(&format!("unknown type '{}'", type_name), output, quiet);
        process::exit(1);
    };

    let text = match input {
        Some(path) => read_source(path, output, quiet),
        None => {
            let mut buf = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
                report_error(&format!("error reading stdin: {}", e), output, quiet);
                process::exit(1);
            }
            buf
        }
    };

    let value = if mode == ValidationMode::QueryString {
        query_string::decode(text.trim()).map_err(|e| e.to_string())
    } else {
        parse_json(&text).map_err(|e| format!("error parsing JSON: {}", e))
    };
    let value = match value {
        Ok(v) => v,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let normalized = match validate(&graph, type_id, value, mode) {
        Ok(v) => v,
        Err(e) => {
            report_invalid(&e, output, quiet);
            process::exit(1);
        }
    };

    match serde_json::to_string(&normalized) {
        Ok(json) => {
            if !quiet {
                println!("{}", json);
            }
        }
        Err(e) => {
            report_error(&format!("error writing JSON: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

/// JSON text carries dates and uuids as strings, so `json-output` first
/// parses them as `json-input` would, renders, then checks the result.
fn validate(
    graph: &TypeGraph,
    type_id: TypeId,
    value: Value,
    mode: ValidationMode,
) -> Result<Value, ValidationError> {
    let value = if mode == ValidationMode::JsonOutput {
        let native = graph
            .validate_type(type_id, &value, ValidationMode::JsonInput)?
            .into_owned();
        render_output(native)
    } else {
        value
    };
    let normalized = graph.validate_type(type_id, &value, mode)?.into_owned();
    Ok(render_output(normalized))
}

fn report_invalid(e: &ValidationError, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "valid": false,
                "message": e.message,
                "member": e.member,
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("{}", e);
            }
        }
    }
}
