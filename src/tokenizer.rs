use crate::diagnostic::Diagnostic;
use crate::span::{Span, Spanned};
use crate::token::{Keyword, Token, SYMBOLS};

/// Highest value an integer literal may take (15-bit, non-negative).
pub const MAX_INT: u32 = 32767;

pub struct Tokenizer<'src> {
    source: &'src [u8],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Tokenizer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the whole source. Lexing keeps going past errors so one run
    /// reports every bad character; the caller fails the file if any
    /// diagnostics came back.
    pub fn tokenize(mut self) -> (Vec<Spanned<Token>>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            if self.pos >= self.source.len() {
                break;
            }

            let ch = self.source[self.pos];
            if ch.is_ascii_digit() {
                tokens.push(self.scan_number());
            } else if ch == b'"' {
                if let Some(tok) = self.scan_string() {
                    tokens.push(tok);
                }
            } else if is_ident_start(ch) {
                tokens.push(self.scan_ident_or_keyword());
            } else if SYMBOLS.contains(&(ch as char)) {
                let start = self.pos;
                self.pos += 1;
                tokens.push(self.make_token(Token::Symbol(ch as char), start));
            } else {
                self.diagnostics.push(Diagnostic::error(
                    format!("unexpected character '{}' (U+{:04X})", ch as char, ch),
                    Span::new(self.pos as u32, self.pos as u32 + 1),
                ));
                self.pos += 1;
            }
        }
        (tokens, self.diagnostics)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            // Line comment: `// ...` to end of line.
            if self.starts_with(b"//") {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            // Block comment: `/* ... */` (doc form `/** ... */` included).
            // Comments do not nest; the first `*/` closes.
            if self.starts_with(b"/*") {
                let start = self.pos;
                self.pos += 2;
                loop {
                    if self.pos + 1 >= self.source.len() {
                        self.diagnostics.push(Diagnostic::error(
                            "unterminated block comment",
                            Span::new(start as u32, self.source.len() as u32),
                        ));
                        self.pos = self.source.len();
                        break;
                    }
                    if self.source[self.pos] == b'*' && self.source[self.pos + 1] == b'/' {
                        self.pos += 2;
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }

            break;
        }
    }

    fn starts_with(&self, prefix: &[u8]) -> bool {
        self.source[self.pos..].starts_with(prefix)
    }

    fn scan_number(&mut self) -> Spanned<Token> {
        let start = self.pos;
        while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        let value = match text.parse::<u32>() {
            Ok(n) if n <= MAX_INT => n as u16,
            _ => {
                self.diagnostics.push(
                    Diagnostic::error(
                        format!("integer literal '{}' is out of range", text),
                        Span::new(start as u32, self.pos as u32),
                    )
                    .with_help(format!("integer literals go up to {}", MAX_INT)),
                );
                0
            }
        };
        self.make_token(Token::IntConst(value), start)
    }

    /// Scan a string literal. The body may not contain a double quote or a
    /// newline; the enclosing quotes are stripped.
    fn scan_string(&mut self) -> Option<Spanned<Token>> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let body_start = self.pos;
        while self.pos < self.source.len()
            && self.source[self.pos] != b'"'
            && self.source[self.pos] != b'\n'
        {
            self.pos += 1;
        }

        if self.pos >= self.source.len() || self.source[self.pos] == b'\n' {
            self.diagnostics.push(
                Diagnostic::error(
                    "unterminated string literal",
                    Span::new(start as u32, self.pos as u32),
                )
                .with_help("string literals may not span lines"),
            );
            return None;
        }

        let body = std::str::from_utf8(&self.source[body_start..self.pos])
            .unwrap()
            .to_string();
        self.pos += 1; // closing quote
        Some(self.make_token(Token::StringConst(body), start))
    }

    fn scan_ident_or_keyword(&mut self) -> Spanned<Token> {
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        let token = match Keyword::from_ident(text) {
            Some(kw) => Token::Keyword(kw),
            None => Token::Identifier(text.to_string()),
        };
        self.make_token(token, start)
    }

    fn make_token(&self, token: Token, start: usize) -> Spanned<Token> {
        Spanned::new(token, Span::new(start as u32, self.pos as u32))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

/// Cursor over a tokenized file.
///
/// `advance` must be called once before the first accessor; `peek` looks at
/// the token after the current one, which is what term parsing needs to
/// tell a variable from an array entry from a subroutine call.
pub struct TokenStream {
    tokens: Vec<Spanned<Token>>,
    /// Index of the next token to deliver; current is `next - 1`.
    next: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Spanned<Token>>) -> Self {
        Self { tokens, next: 0 }
    }

    pub fn has_more(&self) -> bool {
        self.next < self.tokens.len()
    }

    /// Make the next token current. Advancing past the end leaves the
    /// cursor one past the last token; `current` then reports end of file.
    pub fn advance(&mut self) {
        if self.next <= self.tokens.len() {
            self.next += 1;
        }
    }

    /// The current token, or `None` once the cursor has moved past the end.
    pub fn current(&self) -> Option<&Spanned<Token>> {
        assert!(self.next > 0, "advance() must be called before current()");
        self.tokens.get(self.next - 1)
    }

    /// The token after the current one, without advancing.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.next).map(|t| &t.node)
    }

    /// Span of the current token, or a point at end-of-file.
    pub fn current_span(&self) -> Span {
        match self.current() {
            Some(tok) => tok.span,
            None => self
                .tokens
                .last()
                .map(|t| Span::point(t.span.end))
                .unwrap_or_else(Span::dummy),
        }
    }

    pub fn keyword(&self) -> Keyword {
        match self.current().map(|t| &t.node) {
            Some(Token::Keyword(k)) => *k,
            other => panic!("keyword() called on {:?}", other),
        }
    }

    pub fn symbol(&self) -> char {
        match self.current().map(|t| &t.node) {
            Some(Token::Symbol(c)) => *c,
            other => panic!("symbol() called on {:?}", other),
        }
    }

    pub fn identifier(&self) -> &str {
        match self.current().map(|t| &t.node) {
            Some(Token::Identifier(name)) => name,
            other => panic!("identifier() called on {:?}", other),
        }
    }

    pub fn int_val(&self) -> u16 {
        match self.current().map(|t| &t.node) {
            Some(Token::IntConst(n)) => *n,
            other => panic!("int_val() called on {:?}", other),
        }
    }

    pub fn string_val(&self) -> &str {
        match self.current().map(|t| &t.node) {
            Some(Token::StringConst(s)) => s,
            other => panic!("string_val() called on {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        let (tokens, diags) = Tokenizer::new(source).tokenize();
        assert!(diags.is_empty(), "unexpected errors: {:?}", diags);
        tokens.into_iter().map(|t| t.node).collect()
    }

    #[test]
    fn test_keywords() {
        let tokens = lex("class constructor function method field static var");
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Class),
                Token::Keyword(Keyword::Constructor),
                Token::Keyword(Keyword::Function),
                Token::Keyword(Keyword::Method),
                Token::Keyword(Keyword::Field),
                Token::Keyword(Keyword::Static),
                Token::Keyword(Keyword::Var),
            ]
        );
    }

    #[test]
    fn test_symbols() {
        let tokens = lex("{ } ( ) [ ] . , ; + - * / & | < > = ~");
        let expected: Vec<Token> = SYMBOLS.iter().map(|c| Token::Symbol(*c)).collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_symbols_without_whitespace() {
        let tokens = lex("x[i]=-1;");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("x".into()),
                Token::Symbol('['),
                Token::Identifier("i".into()),
                Token::Symbol(']'),
                Token::Symbol('='),
                Token::Symbol('-'),
                Token::IntConst(1),
                Token::Symbol(';'),
            ]
        );
    }

    #[test]
    fn test_integers() {
        let tokens = lex("0 1 42 32767");
        assert_eq!(
            tokens,
            vec![
                Token::IntConst(0),
                Token::IntConst(1),
                Token::IntConst(42),
                Token::IntConst(32767),
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        let tokens = lex("foo bar_baz x1 _leading Main");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("foo".into()),
                Token::Identifier("bar_baz".into()),
                Token::Identifier("x1".into()),
                Token::Identifier("_leading".into()),
                Token::Identifier("Main".into()),
            ]
        );
    }

    #[test]
    fn test_string_literal_strips_quotes() {
        let tokens = lex("\"hello world\"");
        assert_eq!(tokens, vec![Token::StringConst("hello world".into())]);
    }

    #[test]
    fn test_string_literal_is_not_comment_stripped() {
        // A `//` inside a string literal is part of the string.
        let tokens = lex("\"a // b\"");
        assert_eq!(tokens, vec![Token::StringConst("a // b".into())]);
    }

    #[test]
    fn test_line_comment() {
        let tokens = lex("foo // a comment\nbar");
        assert_eq!(
            tokens,
            vec![Token::Identifier("foo".into()), Token::Identifier("bar".into())]
        );
    }

    #[test]
    fn test_block_and_doc_comments() {
        let tokens = lex("a /* one */ b /** two\n   spanning lines */ c");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("a".into()),
                Token::Identifier("b".into()),
                Token::Identifier("c".into()),
            ]
        );
    }

    #[test]
    fn test_comments_do_not_nest() {
        // The first `*/` closes the comment; the rest is tokenized.
        let tokens = lex("/* /* inner */ x");
        assert_eq!(tokens, vec![Token::Identifier("x".into())]);
    }

    #[test]
    fn test_retokenize_round_trip() {
        // Joining token texts with a space and lexing again yields the same
        // sequence (string literals get their quotes restored by Display).
        let source = "class Main { function void main() { do Output.printString(\"ok\"); return; } }";
        let first = lex(source);
        let joined = first
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(lex(&joined), first);
    }

    // --- Error paths ---

    fn lex_with_errors(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let (tokens, diags) = Tokenizer::new(source).tokenize();
        (tokens.into_iter().map(|t| t.node).collect(), diags)
    }

    #[test]
    fn test_error_unexpected_character() {
        let (_tokens, diags) = lex_with_errors("let x = 1 # 2;");
        assert_eq!(diags.len(), 1);
        assert!(
            diags[0].message.contains("unexpected character '#'"),
            "got: {}",
            diags[0].message
        );
    }

    #[test]
    fn test_error_integer_out_of_range() {
        let (tokens, diags) = lex_with_errors("32768");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("out of range"), "got: {}", diags[0].message);
        // Lexing continues with a placeholder value.
        assert_eq!(tokens, vec![Token::IntConst(0)]);
    }

    #[test]
    fn test_error_unterminated_string() {
        let (_tokens, diags) = lex_with_errors("\"no closing quote");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("unterminated string"));
    }

    #[test]
    fn test_error_string_with_newline() {
        let (_tokens, diags) = lex_with_errors("\"broken\nstring\"");
        assert!(!diags.is_empty());
        assert!(diags[0].message.contains("unterminated string"));
    }

    #[test]
    fn test_error_unterminated_block_comment() {
        let (_tokens, diags) = lex_with_errors("class /* never closed");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("unterminated block comment"));
    }

    // --- TokenStream cursor ---

    fn stream(source: &str) -> TokenStream {
        let (tokens, diags) = Tokenizer::new(source).tokenize();
        assert!(diags.is_empty());
        TokenStream::new(tokens)
    }

    #[test]
    fn test_stream_advance_and_accessors() {
        let mut s = stream("let x 5 \"hi\" ;");
        assert!(s.has_more());
        s.advance();
        assert_eq!(s.keyword(), Keyword::Let);
        s.advance();
        assert_eq!(s.identifier(), "x");
        s.advance();
        assert_eq!(s.int_val(), 5);
        s.advance();
        assert_eq!(s.string_val(), "hi");
        s.advance();
        assert_eq!(s.symbol(), ';');
        assert!(!s.has_more());
    }

    #[test]
    fn test_stream_peek_does_not_advance() {
        let mut s = stream("a [ 1 ]");
        s.advance();
        assert_eq!(s.identifier(), "a");
        assert_eq!(s.peek(), Some(&Token::Symbol('[')));
        assert_eq!(s.peek(), Some(&Token::Symbol('[')));
        assert_eq!(s.identifier(), "a");
    }

    #[test]
    fn test_stream_past_end() {
        let mut s = stream("x");
        s.advance();
        s.advance();
        assert!(s.current().is_none());
        assert!(!s.has_more());
    }

    #[test]
    #[should_panic(expected = "advance() must be called")]
    fn test_stream_accessor_before_advance_panics() {
        let s = stream("x");
        let _ = s.current();
    }
}
