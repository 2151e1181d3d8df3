use std::process;

use actionspec_core::{parse_json, query_string};

use crate::{report_error, OutputFormat};

pub(crate) fn cmd_encode(json: &str, output: OutputFormat, quiet: bool) {
    match parse_json(json) {
        Ok(value) => println!("{}", query_string::encode(&value)),
        Err(e) => {
            report_error(&format!("error parsing JSON: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn cmd_decode(query: &str, output: OutputFormat, quiet: bool) {
    let json = query_string::decode(query.trim_start_matches('?'))
        .map_err(|e| e.to_string())
        .and_then(|value| {
            serde_json::to_string(&value).map_err(|e| format!("error writing JSON: {}", e))
        });
    match json {
        Ok(json) => println!("{}", json),
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}
