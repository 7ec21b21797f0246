use std::fmt;
use std::str::FromStr;

/// The eight memory segments of the VM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Segment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "constant" => Ok(Segment::Constant),
            "argument" => Ok(Segment::Argument),
            "local" => Ok(Segment::Local),
            "static" => Ok(Segment::Static),
            "this" => Ok(Segment::This),
            "that" => Ok(Segment::That),
            "pointer" => Ok(Segment::Pointer),
            "temp" => Ok(Segment::Temp),
            _ => Err(()),
        }
    }
}

/// The nine arithmetic-logical VM commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VmOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl VmOp {
    pub fn as_str(self) -> &'static str {
        match self {
            VmOp::Add => "add",
            VmOp::Sub => "sub",
            VmOp::Neg => "neg",
            VmOp::Eq => "eq",
            VmOp::Gt => "gt",
            VmOp::Lt => "lt",
            VmOp::And => "and",
            VmOp::Or => "or",
            VmOp::Not => "not",
        }
    }
}

impl fmt::Display for VmOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VmOp {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "add" => Ok(VmOp::Add),
            "sub" => Ok(VmOp::Sub),
            "neg" => Ok(VmOp::Neg),
            "eq" => Ok(VmOp::Eq),
            "gt" => Ok(VmOp::Gt),
            "lt" => Ok(VmOp::Lt),
            "and" => Ok(VmOp::And),
            "or" => Ok(VmOp::Or),
            "not" => Ok(VmOp::Not),
            _ => Err(()),
        }
    }
}

/// One VM command, as written to and read from `.vm` files.
#[derive(Clone, Debug, PartialEq)]
pub enum VmCommand {
    Push(Segment, u16),
    Pop(Segment, u16),
    Arith(VmOp),
    Label(String),
    Goto(String),
    IfGoto(String),
    Call(String, u16),
    Function(String, u16),
    Return,
}

impl fmt::Display for VmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmCommand::Push(seg, i) => write!(f, "push {} {}", seg, i),
            VmCommand::Pop(seg, i) => write!(f, "pop {} {}", seg, i),
            VmCommand::Arith(op) => write!(f, "{}", op),
            VmCommand::Label(name) => write!(f, "label {}", name),
            VmCommand::Goto(name) => write!(f, "goto {}", name),
            VmCommand::IfGoto(name) => write!(f, "if-goto {}", name),
            VmCommand::Call(name, n) => write!(f, "call {} {}", name, n),
            VmCommand::Function(name, n) => write!(f, "function {} {}", name, n),
            VmCommand::Return => write!(f, "return"),
        }
    }
}
