use std::path::PathBuf;
use std::process;

use clap::Args;

use super::{read_source, resolve_jack_files, write_output};

#[derive(Args)]
pub struct CompileArgs {
    /// Input .jack file or directory of .jack files
    pub input: PathBuf,
    /// Also dump each file's parse tree as XML (debugging aid)
    #[arg(long)]
    pub xml: bool,
}

pub fn cmd_compile(args: CompileArgs) {
    for path in resolve_jack_files(&args.input) {
        let source = read_source(&path);
        let filename = path.display().to_string();

        let vm = match hackc::compile_source(&source, &filename) {
            Ok(vm) => vm,
            Err(_) => process::exit(1),
        };
        let out_path = path.with_extension("vm");
        write_output(&out_path, &vm);
        eprintln!("Compiled -> {}", out_path.display());

        if args.xml {
            let xml = match hackc::analyze_source(&source, &filename) {
                Ok(xml) => xml,
                Err(_) => process::exit(1),
            };
            let xml_path = path.with_extension("xml");
            write_output(&xml_path, &xml);
            eprintln!("Parse tree -> {}", xml_path.display());
        }
    }
}
