use std::path::PathBuf;
use std::process;

use clap::Args;

use hackc::assembler::assemble_source;
use hackc::diagnostic::render_diagnostics;

use super::{read_source, write_output};

#[derive(Args)]
pub struct AssembleArgs {
    /// Input .asm file
    pub input: PathBuf,
    /// Output .hack file (default: <stem>.hack)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn cmd_assemble(args: AssembleArgs) {
    if !args.input.extension().is_some_and(|e| e == "asm") {
        eprintln!("error: input must be a .asm file");
        process::exit(1);
    }

    let source = read_source(&args.input);
    let hack = match assemble_source(&source) {
        Ok(hack) => hack,
        Err(diagnostics) => {
            render_diagnostics(&diagnostics, &args.input.display().to_string(), &source);
            process::exit(1);
        }
    };

    let out_path = args.output.unwrap_or_else(|| args.input.with_extension("hack"));
    write_output(&out_path, &hack);
    eprintln!("Assembled -> {}", out_path.display());
}
