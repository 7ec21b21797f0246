pub mod assemble;
pub mod compile;
pub mod vmtrans;

use std::path::{Path, PathBuf};
use std::process;

/// Resolve a compile input to a list of `.jack` files, exiting on error.
/// A directory contributes its top-level `.jack` files in sorted order.
pub fn resolve_jack_files(input: &Path) -> Vec<PathBuf> {
    if input.is_dir() {
        let entries = match std::fs::read_dir(input) {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!("error: cannot read '{}': {}", input.display(), e);
                process::exit(1);
            }
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|e| e == "jack"))
            .collect();
        files.sort();
        if files.is_empty() {
            eprintln!("error: no .jack files in '{}'", input.display());
            process::exit(1);
        }
        files
    } else if input.extension().is_some_and(|e| e == "jack") {
        vec![input.to_path_buf()]
    } else {
        eprintln!("error: input must be a .jack file or directory");
        process::exit(1);
    }
}

/// Read a source file, exiting on error.
pub fn read_source(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

/// Write an output file, exiting on error.
pub fn write_output(path: &Path, text: &str) {
    if let Err(e) = std::fs::write(path, text) {
        eprintln!("error: cannot write '{}': {}", path.display(), e);
        process::exit(1);
    }
}
