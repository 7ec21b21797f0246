use std::path::PathBuf;
use std::process;

use clap::Args;

use hackc::diagnostic::render_diagnostics;
use hackc::translator;

use super::write_output;

#[derive(Args)]
pub struct VmtransArgs {
    /// Input .vm file or directory of .vm files
    pub input: PathBuf,
    /// Output .asm file (default: <stem>.asm or <dir>/<dirname>.asm)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Emit the bootstrap preamble even for a single file
    #[arg(long)]
    pub bootstrap: bool,
}

pub fn cmd_vmtrans(args: VmtransArgs) {
    let input = match translator::resolve_input(&args.input, args.bootstrap) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let asm = match translator::translate_units(&input.units, input.bootstrap) {
        Ok(asm) => asm,
        Err(failure) => {
            render_diagnostics(&failure.diagnostics, &failure.filename, &failure.source);
            process::exit(1);
        }
    };

    let out_path = args.output.unwrap_or(input.out_path);
    write_output(&out_path, &asm);
    eprintln!("Translated -> {}", out_path.display());
}
