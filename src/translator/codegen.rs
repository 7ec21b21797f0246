use crate::labels::LabelAllocator;
use crate::vm::{Segment, VmCommand, VmOp};

/// The symbol holding the base address of a pointer-backed segment.
fn base_register(segment: Segment) -> &'static str {
    match segment {
        Segment::Local => "LCL",
        Segment::Argument => "ARG",
        Segment::This => "THIS",
        Segment::That => "THAT",
        _ => unreachable!("base_register is only called for Local/Argument/This/That"),
    }
}

/// Emits Hack assembly for a stream of VM commands.
///
/// `SP` lives at RAM[0] and grows upward; `LCL`, `ARG`, `THIS`, `THAT`
/// occupy 1..=4. `D` is the scratch register; `R13` holds computed pop
/// addresses and the saved frame pointer, `R14` the saved return address.
/// Comparison and call-site labels come from monotonic allocators that
/// live for the whole translation unit, so emitted labels never collide
/// across files.
pub struct AsmWriter {
    out: Vec<String>,
    cmp_labels: LabelAllocator,
    ret_labels: LabelAllocator,
    /// Enclosing VM function, used to namespace labels as `f$X`. Outside
    /// any function this is the current file stem.
    function: String,
    /// Current file stem, used to prefix static symbols.
    stem: String,
}

impl Default for AsmWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl AsmWriter {
    pub fn new() -> Self {
        Self {
            out: Vec::new(),
            cmp_labels: LabelAllocator::new(),
            ret_labels: LabelAllocator::new(),
            function: "Bootstrap".to_string(),
            stem: String::new(),
        }
    }

    /// Start translating a new `.vm` file. The stem prefixes this file's
    /// static symbols so `static 0` in two files lands in two cells.
    pub fn set_file(&mut self, stem: &str) {
        self.stem = stem.to_string();
        self.function = stem.to_string();
    }

    /// `SP = 256; call Sys.init 0` — prepended when translating a whole
    /// directory.
    pub fn write_bootstrap(&mut self) {
        self.comment("bootstrap");
        self.a("256");
        self.c("D=A");
        self.a("SP");
        self.c("M=D");
        self.write(&VmCommand::Call("Sys.init".to_string(), 0));
    }

    pub fn write(&mut self, cmd: &VmCommand) {
        self.comment(&cmd.to_string());
        match cmd {
            VmCommand::Push(segment, index) => self.push(*segment, *index),
            VmCommand::Pop(segment, index) => self.pop(*segment, *index),
            VmCommand::Arith(op) => self.arithmetic(*op),
            VmCommand::Label(name) => {
                let label = self.scoped(name);
                self.label(&label);
            }
            VmCommand::Goto(name) => {
                let label = self.scoped(name);
                self.a(&label);
                self.c("0;JMP");
            }
            VmCommand::IfGoto(name) => {
                let label = self.scoped(name);
                self.pop_to_d();
                self.a(&label);
                self.c("D;JNE");
            }
            VmCommand::Function(name, n_locals) => self.function_entry(name, *n_locals),
            VmCommand::Call(name, n_args) => self.call(name, *n_args),
            VmCommand::Return => self.ret(),
        }
    }

    /// Render the accumulated assembly with a trailing newline.
    pub fn into_asm(self) -> String {
        let mut text = self.out.join("\n");
        text.push('\n');
        text
    }

    fn push(&mut self, segment: Segment, index: u16) {
        match segment {
            Segment::Constant => {
                self.a(&index.to_string());
                self.c("D=A");
            }
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                self.a(base_register(segment));
                self.c("D=M");
                self.a(&index.to_string());
                self.c("A=D+A");
                self.c("D=M");
            }
            Segment::Pointer => {
                self.a(&(3 + index).to_string());
                self.c("D=M");
            }
            Segment::Temp => {
                self.a(&(5 + index).to_string());
                self.c("D=M");
            }
            Segment::Static => {
                let symbol = self.static_symbol(index);
                self.a(&symbol);
                self.c("D=M");
            }
        }
        self.push_d();
    }

    fn pop(&mut self, segment: Segment, index: u16) {
        match segment {
            Segment::Constant => unreachable!("pop constant is rejected by the parser"),
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                // Address into R13 first; the popped value needs D.
                self.a(base_register(segment));
                self.c("D=M");
                self.a(&index.to_string());
                self.c("D=D+A");
                self.a("R13");
                self.c("M=D");
                self.pop_to_d();
                self.a("R13");
                self.c("A=M");
                self.c("M=D");
            }
            Segment::Pointer => {
                self.pop_to_d();
                self.a(&(3 + index).to_string());
                self.c("M=D");
            }
            Segment::Temp => {
                self.pop_to_d();
                self.a(&(5 + index).to_string());
                self.c("M=D");
            }
            Segment::Static => {
                self.pop_to_d();
                let symbol = self.static_symbol(index);
                self.a(&symbol);
                self.c("M=D");
            }
        }
    }

    fn arithmetic(&mut self, op: VmOp) {
        match op {
            VmOp::Add => self.binary("M=D+M"),
            VmOp::Sub => self.binary("M=M-D"),
            VmOp::And => self.binary("M=D&M"),
            VmOp::Or => self.binary("M=D|M"),
            VmOp::Neg => self.unary("M=-M"),
            VmOp::Not => self.unary("M=!M"),
            VmOp::Eq => self.comparison("EQ", "D;JEQ"),
            VmOp::Gt => self.comparison("GT", "D;JGT"),
            VmOp::Lt => self.comparison("LT", "D;JLT"),
        }
    }

    /// Pop y into D, then combine into x in place.
    fn binary(&mut self, combine: &str) {
        self.a("SP");
        self.c("AM=M-1");
        self.c("D=M");
        self.c("A=A-1");
        self.c(combine);
    }

    fn unary(&mut self, apply: &str) {
        self.a("SP");
        self.c("A=M-1");
        self.c(apply);
    }

    /// Comparisons leave VM true (-1) or false (0). Each one takes two
    /// fresh labels from a counter keyed on the mnemonic.
    fn comparison(&mut self, mnemonic: &str, jump: &str) {
        let index = self.cmp_labels.next_index(mnemonic);
        let true_label = format!("{}_TRUE_{}", mnemonic, index);
        let end_label = format!("{}_END_{}", mnemonic, index);

        self.a("SP");
        self.c("AM=M-1");
        self.c("D=M");
        self.c("A=A-1");
        self.c("D=M-D");
        self.a(&true_label);
        self.c(jump);
        self.a("SP");
        self.c("A=M-1");
        self.c("M=0");
        self.a(&end_label);
        self.c("0;JMP");
        self.label(&true_label);
        self.a("SP");
        self.c("A=M-1");
        self.c("M=-1");
        self.label(&end_label);
    }

    fn function_entry(&mut self, name: &str, n_locals: u16) {
        self.label(name);
        self.function = name.to_string();
        for _ in 0..n_locals {
            self.a("SP");
            self.c("A=M");
            self.c("M=0");
            self.a("SP");
            self.c("M=M+1");
        }
    }

    /// Save the caller's frame, repoint ARG and LCL, jump.
    fn call(&mut self, name: &str, n_args: u16) {
        let index = self.ret_labels.next_index(&self.function);
        let ret = format!("{}$ret.{}", self.function, index);

        self.a(&ret);
        self.c("D=A");
        self.push_d();
        for register in ["LCL", "ARG", "THIS", "THAT"] {
            self.a(register);
            self.c("D=M");
            self.push_d();
        }
        self.a("SP");
        self.c("D=M");
        self.a(&(n_args + 5).to_string());
        self.c("D=D-A");
        self.a("ARG");
        self.c("M=D");
        self.a("SP");
        self.c("D=M");
        self.a("LCL");
        self.c("M=D");
        self.a(name);
        self.c("0;JMP");
        self.label(&ret);
    }

    /// Copy the return value into the caller's stack slot, restore the
    /// caller's frame from the saved pointers, jump to the return address.
    fn ret(&mut self) {
        self.a("LCL");
        self.c("D=M");
        self.a("R13");
        self.c("M=D"); // R13 = frame
        self.a("5");
        self.c("A=D-A");
        self.c("D=M");
        self.a("R14");
        self.c("M=D"); // R14 = *(frame - 5), the return address
        self.pop_to_d();
        self.a("ARG");
        self.c("A=M");
        self.c("M=D"); // *ARG = return value
        self.a("ARG");
        self.c("D=M+1");
        self.a("SP");
        self.c("M=D"); // SP = ARG + 1
        for register in ["THAT", "THIS", "ARG", "LCL"] {
            self.a("R13");
            self.c("AM=M-1");
            self.c("D=M");
            self.a(register);
            self.c("M=D");
        }
        self.a("R14");
        self.c("A=M");
        self.c("0;JMP");
    }

    // --- Line helpers ---

    fn push_d(&mut self) {
        self.a("SP");
        self.c("A=M");
        self.c("M=D");
        self.a("SP");
        self.c("M=M+1");
    }

    fn pop_to_d(&mut self) {
        self.a("SP");
        self.c("AM=M-1");
        self.c("D=M");
    }

    fn scoped(&self, name: &str) -> String {
        format!("{}${}", self.function, name)
    }

    fn static_symbol(&self, index: u16) -> String {
        format!("{}.{}", self.stem, index)
    }

    fn a(&mut self, symbol: &str) {
        self.out.push(format!("@{}", symbol));
    }

    fn c(&mut self, line: &str) {
        self.out.push(line.to_string());
    }

    fn label(&mut self, name: &str) {
        self.out.push(format!("({})", name));
    }

    fn comment(&mut self, text: &str) {
        self.out.push(format!("// {}", text));
    }
}
