pub mod analyzer;
pub mod assembler;
pub mod diagnostic;
pub mod engine;
pub mod labels;
pub mod span;
pub mod symbols;
pub mod token;
pub mod tokenizer;
pub mod translator;
pub mod vm;
pub mod writer;

use analyzer::XmlAnalyzer;
use diagnostic::{render_diagnostics, Diagnostic};
use engine::CompilationEngine;
use tokenizer::{TokenStream, Tokenizer};

fn tokenize(source: &str) -> Result<TokenStream, Vec<Diagnostic>> {
    let (tokens, lex_errors) = Tokenizer::new(source).tokenize();
    if lex_errors.is_empty() {
        Ok(TokenStream::new(tokens))
    } else {
        Err(lex_errors)
    }
}

/// Compile one Jack class to VM code, rendering diagnostics to stderr.
pub fn compile_source(source: &str, filename: &str) -> Result<String, Vec<Diagnostic>> {
    compile_source_silent(source).map_err(|errors| {
        render_diagnostics(&errors, filename, source);
        errors
    })
}

/// Compile one Jack class to VM code without rendering anything.
pub fn compile_source_silent(source: &str) -> Result<String, Vec<Diagnostic>> {
    let stream = tokenize(source)?;
    CompilationEngine::new(stream)
        .compile_class()
        .map_err(|error| vec![error])
}

/// Parse one Jack class and dump its parse tree as XML, rendering
/// diagnostics to stderr. Debugging aid; the XML plays no part in
/// compilation.
pub fn analyze_source(source: &str, filename: &str) -> Result<String, Vec<Diagnostic>> {
    let result = match tokenize(source) {
        Ok(stream) => XmlAnalyzer::new(stream)
            .analyze_class()
            .map_err(|error| vec![error]),
        Err(errors) => Err(errors),
    };
    result.map_err(|errors| {
        render_diagnostics(&errors, filename, source);
        errors
    })
}
