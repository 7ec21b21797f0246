use crate::diagnostic::Diagnostic;
use crate::labels::LabelAllocator;
use crate::span::Span;
use crate::symbols::{SymbolKind, SymbolTable};
use crate::token::{Keyword, Token};
use crate::tokenizer::TokenStream;
use crate::vm::{Segment, VmOp};
use crate::writer::VmWriter;

type CompileResult<T> = Result<T, Diagnostic>;

/// Recursive-descent compiler for one Jack class.
///
/// Parsing and code generation are fused: each `compile_*` method consumes
/// its construct from the token stream and emits VM commands for it on the
/// spot. No syntax tree is built; memory stays proportional to nesting
/// depth. Compilation stops at the first malformed construct.
pub struct CompilationEngine {
    stream: TokenStream,
    symbols: SymbolTable,
    writer: VmWriter,
    labels: LabelAllocator,
    class_name: String,
}

impl CompilationEngine {
    pub fn new(stream: TokenStream) -> Self {
        Self {
            stream,
            symbols: SymbolTable::new(),
            writer: VmWriter::new(),
            labels: LabelAllocator::new(),
            class_name: String::new(),
        }
    }

    /// Compile `class className { classVarDec* subroutineDec* }` and render
    /// the emitted VM commands.
    pub fn compile_class(mut self) -> Result<String, Diagnostic> {
        self.stream.advance();
        self.expect_keyword(Keyword::Class)?;
        self.class_name = self.expect_identifier()?;
        self.expect_symbol('{')?;

        while self.at_keyword(Keyword::Static) || self.at_keyword(Keyword::Field) {
            self.compile_class_var_dec()?;
        }
        while self.at_keyword(Keyword::Constructor)
            || self.at_keyword(Keyword::Function)
            || self.at_keyword(Keyword::Method)
        {
            self.compile_subroutine()?;
        }

        self.expect_symbol('}')?;
        if self.current().is_some() {
            return Err(self.error(format!(
                "expected end of file after class body, found {}",
                self.found_description()
            )));
        }
        Ok(self.writer.into_vm())
    }

    /// `('static'|'field') type varName (',' varName)* ';'`
    fn compile_class_var_dec(&mut self) -> CompileResult<()> {
        let kind = if self.at_keyword(Keyword::Static) {
            SymbolKind::Static
        } else {
            SymbolKind::Field
        };
        self.stream.advance();
        let ty = self.parse_type()?;
        loop {
            let name = self.expect_identifier()?;
            self.symbols.define(&name, &ty, kind);
            if !self.eat_symbol(',') {
                break;
            }
        }
        self.expect_symbol(';')
    }

    /// `('constructor'|'function'|'method') ('void'|type) subroutineName
    /// '(' parameterList ')' subroutineBody`
    fn compile_subroutine(&mut self) -> CompileResult<()> {
        let kind = self.stream.keyword();
        self.stream.advance();

        self.symbols.start_subroutine();
        self.labels.reset();

        // The receiver is argument 0 of every method, defined before the
        // declared parameters so they number from 1.
        if kind == Keyword::Method {
            let class_name = self.class_name.clone();
            self.symbols.define("this", &class_name, SymbolKind::Argument);
        }

        if self.at_keyword(Keyword::Void) {
            self.stream.advance();
        } else {
            self.parse_type()?;
        }
        let name = self.expect_identifier()?;

        self.expect_symbol('(')?;
        self.compile_parameter_list()?;
        self.expect_symbol(')')?;

        self.expect_symbol('{')?;
        while self.at_keyword(Keyword::Var) {
            self.compile_var_dec()?;
        }

        // All locals are declared up front, so their count is known before
        // the first statement.
        let n_locals = self.symbols.var_count(SymbolKind::Local);
        let full_name = format!("{}.{}", self.class_name, name);
        self.writer.write_function(&full_name, n_locals);

        match kind {
            Keyword::Constructor => {
                let n_fields = self.symbols.var_count(SymbolKind::Field);
                self.writer.write_push(Segment::Constant, n_fields);
                self.writer.write_call("Memory.alloc", 1);
                self.writer.write_pop(Segment::Pointer, 0);
            }
            Keyword::Method => {
                self.writer.write_push(Segment::Argument, 0);
                self.writer.write_pop(Segment::Pointer, 0);
            }
            _ => {}
        }

        self.compile_statements()?;
        self.expect_symbol('}')
    }

    /// `( type varName (',' type varName)* )?`
    fn compile_parameter_list(&mut self) -> CompileResult<()> {
        if self.at_symbol(')') {
            return Ok(());
        }
        loop {
            let ty = self.parse_type()?;
            let name = self.expect_identifier()?;
            self.symbols.define(&name, &ty, SymbolKind::Argument);
            if !self.eat_symbol(',') {
                break;
            }
        }
        Ok(())
    }

    /// `'var' type varName (',' varName)* ';'`
    fn compile_var_dec(&mut self) -> CompileResult<()> {
        self.expect_keyword(Keyword::Var)?;
        let ty = self.parse_type()?;
        loop {
            let name = self.expect_identifier()?;
            self.symbols.define(&name, &ty, SymbolKind::Local);
            if !self.eat_symbol(',') {
                break;
            }
        }
        self.expect_symbol(';')
    }

    fn compile_statements(&mut self) -> CompileResult<()> {
        loop {
            match self.current() {
                Some(Token::Keyword(Keyword::Let)) => self.compile_let()?,
                Some(Token::Keyword(Keyword::If)) => self.compile_if()?,
                Some(Token::Keyword(Keyword::While)) => self.compile_while()?,
                Some(Token::Keyword(Keyword::Do)) => self.compile_do()?,
                Some(Token::Keyword(Keyword::Return)) => self.compile_return()?,
                _ => return Ok(()),
            }
        }
    }

    /// `'let' varName ('[' expression ']')? '=' expression ';'`
    fn compile_let(&mut self) -> CompileResult<()> {
        self.stream.advance();
        let name_span = self.stream.current_span();
        let name = self.expect_identifier()?;
        let (segment, index) = self.resolve_variable(&name, name_span)?;

        if self.eat_symbol('[') {
            // Target address is the base plus the subscript.
            self.writer.write_push(segment, index);
            self.compile_expression()?;
            self.expect_symbol(']')?;
            self.writer.write_arithmetic(VmOp::Add);

            self.expect_symbol('=')?;
            self.compile_expression()?;
            self.expect_symbol(';')?;

            // The right-hand side may itself subscript an array and clobber
            // THAT, so park the value in temp 0 before anchoring pointer 1.
            self.writer.write_pop(Segment::Temp, 0);
            self.writer.write_pop(Segment::Pointer, 1);
            self.writer.write_push(Segment::Temp, 0);
            self.writer.write_pop(Segment::That, 0);
        } else {
            self.expect_symbol('=')?;
            self.compile_expression()?;
            self.expect_symbol(';')?;
            self.writer.write_pop(segment, index);
        }
        Ok(())
    }

    /// `'if' '(' expression ')' '{' statements '}' ('else' '{' statements '}')?`
    fn compile_if(&mut self) -> CompileResult<()> {
        self.stream.advance();
        let index = self.labels.next_index("if");
        let else_label = format!("IF_FALSE{}", index);
        let end_label = format!("IF_END{}", index);

        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;
        self.writer.write_arithmetic(VmOp::Not);
        self.writer.write_if(&else_label);

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.writer.write_goto(&end_label);
        self.writer.write_label(&else_label);

        if self.at_keyword(Keyword::Else) {
            self.stream.advance();
            self.expect_symbol('{')?;
            self.compile_statements()?;
            self.expect_symbol('}')?;
        }
        self.writer.write_label(&end_label);
        Ok(())
    }

    /// `'while' '(' expression ')' '{' statements '}'`
    fn compile_while(&mut self) -> CompileResult<()> {
        self.stream.advance();
        let index = self.labels.next_index("while");
        let exp_label = format!("WHILE_EXP{}", index);
        let end_label = format!("WHILE_END{}", index);

        self.writer.write_label(&exp_label);
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;
        self.writer.write_arithmetic(VmOp::Not);
        self.writer.write_if(&end_label);

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.writer.write_goto(&exp_label);
        self.writer.write_label(&end_label);
        Ok(())
    }

    /// `'do' subroutineCall ';'` — the call's result is discarded.
    fn compile_do(&mut self) -> CompileResult<()> {
        self.stream.advance();
        self.compile_subroutine_call()?;
        self.expect_symbol(';')?;
        self.writer.write_pop(Segment::Temp, 0);
        Ok(())
    }

    /// `'return' expression? ';'` — a void return still pushes a value;
    /// every subroutine leaves exactly one word for its caller.
    fn compile_return(&mut self) -> CompileResult<()> {
        self.stream.advance();
        if self.at_symbol(';') {
            self.writer.write_push(Segment::Constant, 0);
        } else {
            self.compile_expression()?;
        }
        self.expect_symbol(';')?;
        self.writer.write_return();
        Ok(())
    }

    /// `term (op term)*` — no precedence, strictly left to right.
    fn compile_expression(&mut self) -> CompileResult<()> {
        self.compile_term()?;
        while let Some(Token::Symbol(op)) = self.current() {
            let op = *op;
            if !is_binary_op(op) {
                break;
            }
            self.stream.advance();
            self.compile_term()?;
            match op {
                '+' => self.writer.write_arithmetic(VmOp::Add),
                '-' => self.writer.write_arithmetic(VmOp::Sub),
                '&' => self.writer.write_arithmetic(VmOp::And),
                '|' => self.writer.write_arithmetic(VmOp::Or),
                '<' => self.writer.write_arithmetic(VmOp::Lt),
                '>' => self.writer.write_arithmetic(VmOp::Gt),
                '=' => self.writer.write_arithmetic(VmOp::Eq),
                '*' => self.writer.write_call("Math.multiply", 2),
                '/' => self.writer.write_call("Math.divide", 2),
                _ => unreachable!(),
            }
        }
        Ok(())
    }

    fn compile_term(&mut self) -> CompileResult<()> {
        match self.current().cloned() {
            Some(Token::IntConst(n)) => {
                self.writer.write_push(Segment::Constant, n);
                self.stream.advance();
                Ok(())
            }
            Some(Token::StringConst(s)) => {
                self.stream.advance();
                self.compile_string_literal(&s);
                Ok(())
            }
            Some(Token::Keyword(kw)) => self.compile_keyword_constant(kw),
            Some(Token::Symbol('(')) => {
                self.stream.advance();
                self.compile_expression()?;
                self.expect_symbol(')')
            }
            Some(Token::Symbol('-')) => {
                self.stream.advance();
                self.compile_term()?;
                self.writer.write_arithmetic(VmOp::Neg);
                Ok(())
            }
            Some(Token::Symbol('~')) => {
                self.stream.advance();
                self.compile_term()?;
                self.writer.write_arithmetic(VmOp::Not);
                Ok(())
            }
            Some(Token::Identifier(name)) => self.compile_identifier_term(&name),
            _ => Err(self.error(format!("expected term, found {}", self.found_description()))),
        }
    }

    /// A new String object built up one character at a time; each
    /// `appendChar` returns the string, feeding the next append.
    fn compile_string_literal(&mut self, s: &str) {
        self.writer.write_push(Segment::Constant, s.len() as u16);
        self.writer.write_call("String.new", 1);
        for ch in s.chars() {
            self.writer.write_push(Segment::Constant, ch as u16);
            self.writer.write_call("String.appendChar", 2);
        }
    }

    fn compile_keyword_constant(&mut self, kw: Keyword) -> CompileResult<()> {
        match kw {
            Keyword::True => {
                self.writer.write_push(Segment::Constant, 0);
                self.writer.write_arithmetic(VmOp::Not);
            }
            Keyword::False | Keyword::Null => {
                self.writer.write_push(Segment::Constant, 0);
            }
            Keyword::This => {
                self.writer.write_push(Segment::Pointer, 0);
            }
            _ => {
                return Err(self.error(format!(
                    "expected term, found {}",
                    self.found_description()
                )))
            }
        }
        self.stream.advance();
        Ok(())
    }

    /// A term opening with an identifier is a variable, an array entry, or
    /// a subroutine call; one token of lookahead decides.
    fn compile_identifier_term(&mut self, name: &str) -> CompileResult<()> {
        match self.stream.peek() {
            Some(Token::Symbol('[')) => {
                let name_span = self.stream.current_span();
                let (segment, index) = self.resolve_variable(name, name_span)?;
                self.stream.advance();
                self.stream.advance(); // '['
                self.writer.write_push(segment, index);
                self.compile_expression()?;
                self.expect_symbol(']')?;
                self.writer.write_arithmetic(VmOp::Add);
                self.writer.write_pop(Segment::Pointer, 1);
                self.writer.write_push(Segment::That, 0);
                Ok(())
            }
            Some(Token::Symbol('(')) | Some(Token::Symbol('.')) => self.compile_subroutine_call(),
            _ => {
                let name_span = self.stream.current_span();
                let (segment, index) = self.resolve_variable(name, name_span)?;
                self.writer.write_push(segment, index);
                self.stream.advance();
                Ok(())
            }
        }
    }

    /// `subroutineName '(' expressionList ')'` or
    /// `(className|varName) '.' subroutineName '(' expressionList ')'`.
    ///
    /// Dispatch is static. A qualifier naming a declared variable makes a
    /// method call with that variable as the receiver; any other qualifier
    /// is a class name and the call is a plain function call. A bare name
    /// is a method of the current class on `this`.
    fn compile_subroutine_call(&mut self) -> CompileResult<()> {
        let first = self.expect_identifier()?;

        let (callee, implicit_args) = if self.eat_symbol('.') {
            let method = self.expect_identifier()?;
            match self.symbols.get(&first) {
                Some(symbol) => {
                    let receiver = (symbol.kind.segment(), symbol.index);
                    let callee = format!("{}.{}", symbol.ty, method);
                    self.writer.write_push(receiver.0, receiver.1);
                    (callee, 1)
                }
                None => (format!("{}.{}", first, method), 0),
            }
        } else {
            self.writer.write_push(Segment::Pointer, 0);
            (format!("{}.{}", self.class_name, first), 1)
        };

        self.expect_symbol('(')?;
        let n_args = self.compile_expression_list()?;
        self.expect_symbol(')')?;
        self.writer.write_call(&callee, n_args + implicit_args);
        Ok(())
    }

    /// `( expression (',' expression)* )?` — returns the argument count.
    fn compile_expression_list(&mut self) -> CompileResult<u16> {
        if self.at_symbol(')') {
            return Ok(0);
        }
        let mut count = 1;
        self.compile_expression()?;
        while self.eat_symbol(',') {
            self.compile_expression()?;
            count += 1;
        }
        Ok(count)
    }

    /// `'int' | 'char' | 'boolean' | className`
    fn parse_type(&mut self) -> CompileResult<String> {
        match self.current() {
            Some(Token::Keyword(kw)) if kw.is_primitive_type() => {
                let ty = kw.as_str().to_string();
                self.stream.advance();
                Ok(ty)
            }
            Some(Token::Identifier(name)) => {
                let ty = name.clone();
                self.stream.advance();
                Ok(ty)
            }
            _ => Err(self
                .error(format!("expected type, found {}", self.found_description()))
                .with_help("a type is int, char, boolean, or a class name")),
        }
    }

    fn resolve_variable(&self, name: &str, span: Span) -> CompileResult<(Segment, u16)> {
        match self.symbols.get(name) {
            Some(symbol) => Ok((symbol.kind.segment(), symbol.index)),
            None => Err(Diagnostic::error(
                format!("undefined identifier `{}`", name),
                span,
            )
            .with_help("declare it with `var`, a parameter, or a static/field declaration")),
        }
    }

    // --- Token helpers ---

    fn current(&self) -> Option<&Token> {
        self.stream.current().map(|t| &t.node)
    }

    fn at_symbol(&self, c: char) -> bool {
        matches!(self.current(), Some(Token::Symbol(s)) if *s == c)
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        matches!(self.current(), Some(Token::Keyword(k)) if *k == kw)
    }

    fn eat_symbol(&mut self, c: char) -> bool {
        if self.at_symbol(c) {
            self.stream.advance();
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, c: char) -> CompileResult<()> {
        if self.at_symbol(c) {
            self.stream.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{}', found {}",
                c,
                self.found_description()
            )))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> CompileResult<()> {
        if self.at_keyword(kw) {
            self.stream.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{}', found {}",
                kw.as_str(),
                self.found_description()
            )))
        }
    }

    fn expect_identifier(&mut self) -> CompileResult<String> {
        match self.current() {
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.stream.advance();
                Ok(name)
            }
            _ => Err(self.error(format!(
                "expected identifier, found {}",
                self.found_description()
            ))),
        }
    }

    fn found_description(&self) -> String {
        match self.current() {
            Some(token) => token.description(),
            None => "end of file".to_string(),
        }
    }

    fn error(&self, message: String) -> Diagnostic {
        Diagnostic::error(message, self.stream.current_span())
    }
}

fn is_binary_op(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '&' | '|' | '<' | '>' | '=')
}
