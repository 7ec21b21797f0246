//! Second pass of the toolchain: lowering stack-machine `.vm` code to flat
//! Hack assembly, including the function call/return convention and the
//! bootstrap preamble for multi-file programs.

pub mod codegen;
pub mod parse;

use std::io;
use std::path::{Path, PathBuf};

use crate::diagnostic::Diagnostic;

pub use codegen::AsmWriter;

/// One `.vm` file ready for translation.
#[derive(Debug)]
pub struct VmUnit {
    /// Display name for diagnostics (usually the path).
    pub filename: String,
    /// File stem, used to prefix static symbols and file-scope labels.
    pub stem: String,
    pub source: String,
}

/// Parse failure in one unit, with enough context to render diagnostics.
#[derive(Debug)]
pub struct TranslateError {
    pub filename: String,
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Translate a set of `.vm` units into a single assembly program.
/// Translation stops at the first unit with parse errors.
pub fn translate_units(units: &[VmUnit], bootstrap: bool) -> Result<String, TranslateError> {
    let mut writer = AsmWriter::new();
    if bootstrap {
        writer.write_bootstrap();
    }
    for unit in units {
        let commands = parse::parse_source(&unit.source).map_err(|diagnostics| TranslateError {
            filename: unit.filename.clone(),
            source: unit.source.clone(),
            diagnostics,
        })?;
        writer.set_file(&unit.stem);
        for cmd in &commands {
            writer.write(cmd);
        }
    }
    Ok(writer.into_asm())
}

/// Resolved translation input: the units to translate, where the assembly
/// goes, and whether to emit the bootstrap preamble.
#[derive(Debug)]
pub struct TranslationInput {
    pub units: Vec<VmUnit>,
    pub out_path: PathBuf,
    pub bootstrap: bool,
}

/// Resolve a `.vm` file or a directory of `.vm` files.
///
/// A directory translates to `<dir>/<dirname>.asm` with the bootstrap
/// preamble; a single file to `<stem>.asm` beside it, bootstrapping only
/// when forced.
pub fn resolve_input(input: &Path, force_bootstrap: bool) -> io::Result<TranslationInput> {
    if input.is_dir() {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(input)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|e| e == "vm"))
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no .vm files in '{}'", input.display()),
            ));
        }

        let dirname = input
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("out")
            .to_string();
        Ok(TranslationInput {
            units: load_units(&paths)?,
            out_path: input.join(format!("{}.asm", dirname)),
            bootstrap: true,
        })
    } else {
        if !input.extension().is_some_and(|e| e == "vm") {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' is not a .vm file or directory", input.display()),
            ));
        }
        Ok(TranslationInput {
            units: load_units(std::slice::from_ref(&input.to_path_buf()))?,
            out_path: input.with_extension("asm"),
            bootstrap: force_bootstrap,
        })
    }
}

fn load_units(paths: &[PathBuf]) -> io::Result<Vec<VmUnit>> {
    paths
        .iter()
        .map(|path| {
            let source = std::fs::read_to_string(path)?;
            Ok(VmUnit {
                filename: path.display().to_string(),
                stem: path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("out")
                    .to_string(),
                source,
            })
        })
        .collect()
}
