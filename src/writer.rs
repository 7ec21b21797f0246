use crate::vm::{Segment, VmCommand, VmOp};

/// Buffers VM commands for one class and renders them as `.vm` text.
#[derive(Default)]
pub struct VmWriter {
    output: Vec<VmCommand>,
}

impl VmWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_push(&mut self, segment: Segment, index: u16) {
        self.output.push(VmCommand::Push(segment, index));
    }

    pub fn write_pop(&mut self, segment: Segment, index: u16) {
        debug_assert!(segment != Segment::Constant, "pop constant is meaningless");
        self.output.push(VmCommand::Pop(segment, index));
    }

    pub fn write_arithmetic(&mut self, op: VmOp) {
        self.output.push(VmCommand::Arith(op));
    }

    pub fn write_label(&mut self, label: &str) {
        self.output.push(VmCommand::Label(label.to_string()));
    }

    pub fn write_goto(&mut self, label: &str) {
        self.output.push(VmCommand::Goto(label.to_string()));
    }

    pub fn write_if(&mut self, label: &str) {
        self.output.push(VmCommand::IfGoto(label.to_string()));
    }

    pub fn write_call(&mut self, name: &str, n_args: u16) {
        self.output.push(VmCommand::Call(name.to_string(), n_args));
    }

    pub fn write_function(&mut self, name: &str, n_locals: u16) {
        self.output
            .push(VmCommand::Function(name.to_string(), n_locals));
    }

    pub fn write_return(&mut self) {
        self.output.push(VmCommand::Return);
    }

    /// Render the buffered commands, one per line, with a trailing newline.
    pub fn into_vm(self) -> String {
        let mut text = self
            .output
            .iter()
            .map(|cmd| cmd.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        text.push('\n');
        text
    }
}
