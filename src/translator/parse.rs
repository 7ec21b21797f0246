use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::vm::{Segment, VmCommand, VmOp};

/// Parse one `.vm` file into commands. Comments (`// ...`) and blank lines
/// are skipped. Every malformed line produces a diagnostic; the file fails
/// as a whole if any line was bad.
pub fn parse_source(source: &str) -> Result<Vec<VmCommand>, Vec<Diagnostic>> {
    let mut commands = Vec::new();
    let mut diagnostics = Vec::new();
    let mut offset = 0u32;

    for line in source.split('\n') {
        let span = Span::new(offset, offset + line.trim_end().len() as u32);
        offset += line.len() as u32 + 1;

        let code = match line.find("//") {
            Some(pos) => &line[..pos],
            None => line,
        };
        let code = code.trim();
        if code.is_empty() {
            continue;
        }

        match parse_line(code, span) {
            Ok(cmd) => commands.push(cmd),
            Err(diag) => diagnostics.push(diag),
        }
    }

    if diagnostics.is_empty() {
        Ok(commands)
    } else {
        Err(diagnostics)
    }
}

fn parse_line(code: &str, span: Span) -> Result<VmCommand, Diagnostic> {
    let parts: Vec<&str> = code.split_whitespace().collect();
    match parts.as_slice() {
        [op] => {
            if *op == "return" {
                Ok(VmCommand::Return)
            } else if let Ok(arith) = op.parse::<VmOp>() {
                Ok(VmCommand::Arith(arith))
            } else {
                Err(Diagnostic::error(
                    format!("unknown command '{}'", op),
                    span,
                ))
            }
        }
        ["push", segment, index] => {
            let segment = parse_segment(segment, span)?;
            let index = parse_index(index, span)?;
            check_segment_index(segment, index, span)?;
            Ok(VmCommand::Push(segment, index))
        }
        ["pop", segment, index] => {
            let segment = parse_segment(segment, span)?;
            if segment == Segment::Constant {
                return Err(Diagnostic::error(
                    "cannot pop to the constant segment",
                    span,
                ));
            }
            let index = parse_index(index, span)?;
            check_segment_index(segment, index, span)?;
            Ok(VmCommand::Pop(segment, index))
        }
        ["label", name] => Ok(VmCommand::Label(parse_label(name, span)?)),
        ["goto", name] => Ok(VmCommand::Goto(parse_label(name, span)?)),
        ["if-goto", name] => Ok(VmCommand::IfGoto(parse_label(name, span)?)),
        ["call", name, n] => Ok(VmCommand::Call(name.to_string(), parse_index(n, span)?)),
        ["function", name, n] => {
            Ok(VmCommand::Function(name.to_string(), parse_index(n, span)?))
        }
        _ => Err(Diagnostic::error(
            format!("malformed command '{}'", code),
            span,
        )
        .with_help("expected e.g. `push <segment> <index>`, `label <name>`, or an arithmetic mnemonic")),
    }
}

fn parse_segment(text: &str, span: Span) -> Result<Segment, Diagnostic> {
    text.parse::<Segment>().map_err(|_| {
        Diagnostic::error(format!("unknown segment '{}'", text), span).with_help(
            "segments are constant, argument, local, static, this, that, pointer, temp",
        )
    })
}

fn parse_index(text: &str, span: Span) -> Result<u16, Diagnostic> {
    match text.parse::<u16>() {
        Ok(n) if n <= 32767 => Ok(n),
        _ => Err(Diagnostic::error(
            format!("'{}' is not a valid index", text),
            span,
        )),
    }
}

fn check_segment_index(segment: Segment, index: u16, span: Span) -> Result<(), Diagnostic> {
    let limit = match segment {
        Segment::Pointer => 1,
        Segment::Temp => 7,
        _ => return Ok(()),
    };
    if index > limit {
        return Err(Diagnostic::error(
            format!(
                "index {} is out of range for the {} segment (0..={})",
                index, segment, limit
            ),
            span,
        ));
    }
    Ok(())
}

fn parse_label(text: &str, span: Span) -> Result<String, Diagnostic> {
    let mut chars = text.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '_' | '.' | ':' | '$'));
    let tail_ok = text
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '$'));
    if head_ok && tail_ok {
        Ok(text.to_string())
    } else {
        Err(Diagnostic::error(
            format!("'{}' is not a valid label", text),
            span,
        )
        .with_help("labels are ASCII letters, digits, '_', '.', ':', '$' and may not start with a digit"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<VmCommand> {
        parse_source(source).expect("parse")
    }

    #[test]
    fn test_arithmetic_and_stack_commands() {
        let cmds = parse("push constant 7\npush local 0\nadd\npop temp 3\n");
        assert_eq!(
            cmds,
            vec![
                VmCommand::Push(Segment::Constant, 7),
                VmCommand::Push(Segment::Local, 0),
                VmCommand::Arith(VmOp::Add),
                VmCommand::Pop(Segment::Temp, 3),
            ]
        );
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let cmds = parse("// header\n\npush constant 1 // trailing\n   \nneg\n");
        assert_eq!(
            cmds,
            vec![
                VmCommand::Push(Segment::Constant, 1),
                VmCommand::Arith(VmOp::Neg),
            ]
        );
    }

    #[test]
    fn test_function_flow_commands() {
        let cmds = parse(
            "function Main.fib 2\nlabel LOOP\npush argument 0\nif-goto LOOP\ngoto END\nlabel END\ncall Main.fib 1\nreturn\n",
        );
        assert_eq!(cmds[0], VmCommand::Function("Main.fib".into(), 2));
        assert_eq!(cmds[1], VmCommand::Label("LOOP".into()));
        assert_eq!(cmds[3], VmCommand::IfGoto("LOOP".into()));
        assert_eq!(cmds[4], VmCommand::Goto("END".into()));
        assert_eq!(cmds[6], VmCommand::Call("Main.fib".into(), 1));
        assert_eq!(cmds[7], VmCommand::Return);
    }

    #[test]
    fn test_indentation_is_tolerated() {
        let cmds = parse("    push constant 2\n\teq\n");
        assert_eq!(cmds.len(), 2);
    }

    fn parse_err(source: &str) -> Vec<Diagnostic> {
        parse_source(source).expect_err("should fail")
    }

    #[test]
    fn test_error_unknown_command() {
        let diags = parse_err("frobnicate\n");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("unknown command 'frobnicate'"));
    }

    #[test]
    fn test_error_unknown_segment() {
        let diags = parse_err("push heap 0\n");
        assert!(diags[0].message.contains("unknown segment 'heap'"));
        assert!(diags[0].help.is_some());
    }

    #[test]
    fn test_error_pop_constant() {
        let diags = parse_err("pop constant 5\n");
        assert!(diags[0].message.contains("cannot pop"));
    }

    #[test]
    fn test_error_pointer_index_out_of_range() {
        let diags = parse_err("push pointer 2\n");
        assert!(diags[0].message.contains("out of range"));
    }

    #[test]
    fn test_error_bad_index() {
        let diags = parse_err("push constant abc\n");
        assert!(diags[0].message.contains("not a valid index"));
    }

    #[test]
    fn test_error_digit_initial_label() {
        let diags = parse_err("label 1LOOP\n");
        assert!(diags[0].message.contains("not a valid label"));
    }

    #[test]
    fn test_all_errors_are_collected() {
        let diags = parse_err("nope\npush constant 1\nalso_nope\n");
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_error_span_covers_the_line() {
        let diags = parse_err("push constant 1\nbad line here\n");
        let span = diags[0].span;
        assert_eq!(span.start, 16);
        assert_eq!(span.end, 16 + "bad line here".len() as u32);
    }
}
