use std::path::{Path, PathBuf};
use std::process;

use super::{compile_files, print_diagnostics};
use crate::OutputFormat;

pub(crate) fn cmd_check(files: &[PathBuf], output: OutputFormat, quiet: bool) {
    let paths: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
    let graph = match compile_files(&paths, output, quiet) {
        Ok(g) => g,
        Err(e) => {
            tracing::debug!(errors = e.errors.len(), "check failed");
            print_diagnostics(&e, output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => println!("[]"),
        OutputFormat::Text => {
            if !quiet {
                println!(
                    "ok: {} types, {} actions",
                    graph.type_count(),
                    graph.actions().count()
                );
            }
        }
    }
}
