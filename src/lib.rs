pub mod ast_uc;
pub mod lexer;
pub mod parser;

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O: {path}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error(transparent)]
    Lexer(#[from] lexer::LexerError),

    #[error(transparent)]
    Parser(#[from] parser::ParserError),
}

pub fn read_input(input_filename: &Path) -> Result<String, Error> {
    // read the input file as a string into memory
    log::info!("Reading input file: {}", input_filename.display());
    let input = fs::read_to_string(input_filename).map_err(|e| Error::Io {
        source: e,
        path: input_filename.to_path_buf(),
    })?;
    Ok(input)
}

/// Runs the full syntactic pipeline: lex, then parse. `source_name` only
/// labels the input in end-of-input diagnostics.
pub fn parse_program(input: &str, source_name: &str) -> Result<ast_uc::Program, Error> {
    log::info!("Lexing input: {source_name}");
    let tokens = lexer::lex(input)?;

    log::debug!("Tokens: {tokens:#?}");

    log::info!("Parsing input: {source_name}");
    let ast = parser::parse(&tokens, source_name)?;

    log::debug!("AST: {ast:#?}");

    Ok(ast)
}

#[cfg(test)]
fn lex_and_parse(input: &str) -> Result<ast_uc::Program, Error> {
    parse_program(input, "test.uc")
}
