use crate::diagnostic::Diagnostic;
use crate::token::{Keyword, Token};
use crate::tokenizer::TokenStream;

type ParseResult<T> = Result<T, Diagnostic>;

/// Recursive-descent parser that renders the parse tree as XML.
///
/// This is the debugging companion to the compilation engine: same grammar,
/// same one-token lookahead, but the output is the course-format XML dump
/// instead of VM code. Keeping it separate keeps the code-generating engine
/// free of any tree bookkeeping.
pub struct XmlAnalyzer {
    stream: TokenStream,
    out: Vec<String>,
    depth: usize,
}

impl XmlAnalyzer {
    pub fn new(stream: TokenStream) -> Self {
        Self {
            stream,
            out: Vec::new(),
            depth: 0,
        }
    }

    pub fn analyze_class(mut self) -> Result<String, Diagnostic> {
        self.stream.advance();
        self.open("class");
        self.expect_keyword(Keyword::Class)?;
        self.expect_identifier()?;
        self.expect_symbol('{')?;

        while self.at_keyword(Keyword::Static) || self.at_keyword(Keyword::Field) {
            self.class_var_dec()?;
        }
        while self.at_keyword(Keyword::Constructor)
            || self.at_keyword(Keyword::Function)
            || self.at_keyword(Keyword::Method)
        {
            self.subroutine_dec()?;
        }

        self.expect_symbol('}')?;
        self.close("class");
        let mut text = self.out.join("\n");
        text.push('\n');
        Ok(text)
    }

    fn class_var_dec(&mut self) -> ParseResult<()> {
        self.open("classVarDec");
        self.terminal()?; // static | field
        self.type_name()?;
        self.expect_identifier()?;
        while self.at_symbol(',') {
            self.terminal()?;
            self.expect_identifier()?;
        }
        self.expect_symbol(';')?;
        self.close("classVarDec");
        Ok(())
    }

    fn subroutine_dec(&mut self) -> ParseResult<()> {
        self.open("subroutineDec");
        self.terminal()?; // constructor | function | method
        if self.at_keyword(Keyword::Void) {
            self.terminal()?;
        } else {
            self.type_name()?;
        }
        self.expect_identifier()?;
        self.expect_symbol('(')?;

        self.open("parameterList");
        if !self.at_symbol(')') {
            loop {
                self.type_name()?;
                self.expect_identifier()?;
                if !self.at_symbol(',') {
                    break;
                }
                self.terminal()?;
            }
        }
        self.close("parameterList");

        self.expect_symbol(')')?;

        self.open("subroutineBody");
        self.expect_symbol('{')?;
        while self.at_keyword(Keyword::Var) {
            self.var_dec()?;
        }
        self.statements()?;
        self.expect_symbol('}')?;
        self.close("subroutineBody");
        self.close("subroutineDec");
        Ok(())
    }

    fn var_dec(&mut self) -> ParseResult<()> {
        self.open("varDec");
        self.terminal()?; // var
        self.type_name()?;
        self.expect_identifier()?;
        while self.at_symbol(',') {
            self.terminal()?;
            self.expect_identifier()?;
        }
        self.expect_symbol(';')?;
        self.close("varDec");
        Ok(())
    }

    fn statements(&mut self) -> ParseResult<()> {
        self.open("statements");
        loop {
            match self.current() {
                Some(Token::Keyword(Keyword::Let)) => self.let_statement()?,
                Some(Token::Keyword(Keyword::If)) => self.if_statement()?,
                Some(Token::Keyword(Keyword::While)) => self.while_statement()?,
                Some(Token::Keyword(Keyword::Do)) => self.do_statement()?,
                Some(Token::Keyword(Keyword::Return)) => self.return_statement()?,
                _ => break,
            }
        }
        self.close("statements");
        Ok(())
    }

    fn let_statement(&mut self) -> ParseResult<()> {
        self.open("letStatement");
        self.terminal()?; // let
        self.expect_identifier()?;
        if self.at_symbol('[') {
            self.terminal()?;
            self.expression()?;
            self.expect_symbol(']')?;
        }
        self.expect_symbol('=')?;
        self.expression()?;
        self.expect_symbol(';')?;
        self.close("letStatement");
        Ok(())
    }

    fn if_statement(&mut self) -> ParseResult<()> {
        self.open("ifStatement");
        self.terminal()?; // if
        self.expect_symbol('(')?;
        self.expression()?;
        self.expect_symbol(')')?;
        self.expect_symbol('{')?;
        self.statements()?;
        self.expect_symbol('}')?;
        if self.at_keyword(Keyword::Else) {
            self.terminal()?;
            self.expect_symbol('{')?;
            self.statements()?;
            self.expect_symbol('}')?;
        }
        self.close("ifStatement");
        Ok(())
    }

    fn while_statement(&mut self) -> ParseResult<()> {
        self.open("whileStatement");
        self.terminal()?; // while
        self.expect_symbol('(')?;
        self.expression()?;
        self.expect_symbol(')')?;
        self.expect_symbol('{')?;
        self.statements()?;
        self.expect_symbol('}')?;
        self.close("whileStatement");
        Ok(())
    }

    fn do_statement(&mut self) -> ParseResult<()> {
        self.open("doStatement");
        self.terminal()?; // do
        self.subroutine_call()?;
        self.expect_symbol(';')?;
        self.close("doStatement");
        Ok(())
    }

    fn return_statement(&mut self) -> ParseResult<()> {
        self.open("returnStatement");
        self.terminal()?; // return
        if !self.at_symbol(';') {
            self.expression()?;
        }
        self.expect_symbol(';')?;
        self.close("returnStatement");
        Ok(())
    }

    fn expression(&mut self) -> ParseResult<()> {
        self.open("expression");
        self.term()?;
        while matches!(self.current(), Some(Token::Symbol(c)) if is_binary_op(*c)) {
            self.terminal()?;
            self.term()?;
        }
        self.close("expression");
        Ok(())
    }

    fn term(&mut self) -> ParseResult<()> {
        self.open("term");
        match self.current() {
            Some(Token::IntConst(_)) | Some(Token::StringConst(_)) => self.terminal()?,
            Some(Token::Keyword(
                Keyword::True | Keyword::False | Keyword::Null | Keyword::This,
            )) => self.terminal()?,
            Some(Token::Symbol('(')) => {
                self.terminal()?;
                self.expression()?;
                self.expect_symbol(')')?;
            }
            Some(Token::Symbol('-')) | Some(Token::Symbol('~')) => {
                self.terminal()?;
                self.term()?;
            }
            Some(Token::Identifier(_)) => match self.stream.peek() {
                Some(Token::Symbol('[')) => {
                    self.terminal()?; // varName
                    self.terminal()?; // [
                    self.expression()?;
                    self.expect_symbol(']')?;
                }
                Some(Token::Symbol('(')) | Some(Token::Symbol('.')) => self.subroutine_call()?,
                _ => self.terminal()?,
            },
            _ => {
                return Err(self.error(format!(
                    "expected term, found {}",
                    self.found_description()
                )))
            }
        }
        self.close("term");
        Ok(())
    }

    /// Subroutine calls have no wrapping element; their terminals land in
    /// the enclosing term or do statement.
    fn subroutine_call(&mut self) -> ParseResult<()> {
        self.expect_identifier()?;
        if self.at_symbol('.') {
            self.terminal()?;
            self.expect_identifier()?;
        }
        self.expect_symbol('(')?;
        self.open("expressionList");
        if !self.at_symbol(')') {
            self.expression()?;
            while self.at_symbol(',') {
                self.terminal()?;
                self.expression()?;
            }
        }
        self.close("expressionList");
        self.expect_symbol(')')
    }

    fn type_name(&mut self) -> ParseResult<()> {
        match self.current() {
            Some(Token::Keyword(kw)) if kw.is_primitive_type() => self.terminal(),
            Some(Token::Identifier(_)) => self.terminal(),
            _ => Err(self.error(format!("expected type, found {}", self.found_description()))),
        }
    }

    // --- Output helpers ---

    fn open(&mut self, tag: &str) {
        self.line(&format!("<{}>", tag));
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth -= 1;
        self.line(&format!("</{}>", tag));
    }

    /// Write the current token as a terminal element and advance.
    fn terminal(&mut self) -> ParseResult<()> {
        let (tag, value) = match self.current() {
            Some(Token::Keyword(k)) => ("keyword", k.as_str().to_string()),
            Some(Token::Symbol(c)) => ("symbol", xml_escape(&c.to_string())),
            Some(Token::IntConst(n)) => ("integerConstant", n.to_string()),
            Some(Token::StringConst(s)) => ("stringConstant", xml_escape(s)),
            Some(Token::Identifier(name)) => ("identifier", xml_escape(name)),
            None => return Err(self.error("unexpected end of file".to_string())),
        };
        self.line(&format!("<{tag}> {value} </{tag}>"));
        self.stream.advance();
        Ok(())
    }

    fn line(&mut self, text: &str) {
        self.out.push(format!("{}{}", "  ".repeat(self.depth), text));
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

    fn expect_symbol(&mut self, c: char) -> ParseResult<()> {
        if self.at_symbol(c) {
            self.terminal()
        } else {
            Err(self.error(format!(
                "expected '{}', found {}",
                c,
                self.found_description()
            )))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> ParseResult<()> {
        if self.at_keyword(kw) {
            self.terminal()
        } else {
            Err(self.error(format!(
                "expected '{}', found {}",
                kw.as_str(),
                self.found_description()
            )))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<()> {
        if matches!(self.current(), Some(Token::Identifier(_))) {
            self.terminal()
        } else {
            Err(self.error(format!(
                "expected identifier, found {}",
                self.found_description()
            )))
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

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
