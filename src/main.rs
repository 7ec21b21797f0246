mod cli;

use clap::{Parser, Subcommand};

use cli::assemble::AssembleArgs;
use cli::compile::CompileArgs;
use cli::vmtrans::VmtransArgs;

#[derive(Parser)]
#[command(
    name = "hackc",
    version,
    about = "Hack platform toolchain — Jack compiler, VM translator, assembler"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile .jack sources to .vm stack code
    Compile(CompileArgs),
    /// Translate .vm files to Hack assembly
    Vmtrans(VmtransArgs),
    /// Assemble a .asm file into .hack machine code
    Assemble(AssembleArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Compile(args) => cli::compile::cmd_compile(args),
        Command::Vmtrans(args) => cli::vmtrans::cmd_vmtrans(args),
        Command::Assemble(args) => cli::assemble::cmd_assemble(args),
    }
}
