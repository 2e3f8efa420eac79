//! Lexer for the uC language
//!
//! Produces a flat token stream with 1-based line/column positions. Lexing
//! is a pure function of the source text; any malformed input is fatal and
//! reported as a [`LexerError`].

use derive_more::Display;
use line_numbers::LinePositions;
use std::fmt;
use thiserror::Error;
use winnow::ascii::digit1;
use winnow::combinator::{alt, delimited, opt, peek, preceded, repeat};
use winnow::prelude::*;
use winnow::stream::{AsChar, LocatingSlice, Location, Stream};
use winnow::token::{any, none_of, take_till, take_until, take_while};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("LexerError: {message} at {line}:{column}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl LexerError {
    fn at(positions: &LinePositions, message: String, offset: usize) -> Self {
        let (line, column) = line_column(positions, offset);
        LexerError {
            message,
            line,
            column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based line of the token's first character.
    pub line: usize,
    /// 1-based column of the token's first character.
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier(String),
    IntConstant(i64),
    CharConstant(char),
    StringLiteral(String),
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Semicolon,
    Comma,
    Assign,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    And,
    Or,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Not,
}

impl fmt::Display for TokenKind {
    /// Renders the token as it appeared in the source, for diagnostics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(keyword) => write!(f, "{keyword}"),
            TokenKind::Identifier(name) => f.write_str(name),
            TokenKind::IntConstant(value) => write!(f, "{value}"),
            TokenKind::CharConstant(c) => write!(f, "'{c}'"),
            TokenKind::StringLiteral(s) => write!(f, "\"{s}\""),
            TokenKind::OpenParen => f.write_str("("),
            TokenKind::CloseParen => f.write_str(")"),
            TokenKind::OpenBracket => f.write_str("["),
            TokenKind::CloseBracket => f.write_str("]"),
            TokenKind::OpenBrace => f.write_str("{"),
            TokenKind::CloseBrace => f.write_str("}"),
            TokenKind::Semicolon => f.write_str(";"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Assign => f.write_str("="),
            TokenKind::Equal => f.write_str("=="),
            TokenKind::NotEqual => f.write_str("!="),
            TokenKind::LessThan => f.write_str("<"),
            TokenKind::LessEqual => f.write_str("<="),
            TokenKind::GreaterThan => f.write_str(">"),
            TokenKind::GreaterEqual => f.write_str(">="),
            TokenKind::And => f.write_str("&&"),
            TokenKind::Or => f.write_str("||"),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::Not => f.write_str("!"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Keyword {
    #[display("void")]
    Void,
    #[display("char")]
    Char,
    #[display("int")]
    Int,
    #[display("if")]
    If,
    #[display("else")]
    Else,
    #[display("while")]
    While,
    #[display("for")]
    For,
    #[display("break")]
    Break,
    #[display("return")]
    Return,
    #[display("assert")]
    Assert,
    #[display("print")]
    Print,
    #[display("read")]
    Read,
}

type Input<'s> = LocatingSlice<&'s str>;

pub fn lex(source: &str) -> Result<Vec<Token>, LexerError> {
    let positions = LinePositions::from(source);
    let mut input = LocatingSlice::new(source);
    let mut tokens = Vec::new();

    loop {
        skip_trivia(&mut input).map_err(|offset| {
            LexerError::at(&positions, "Unterminated comment".to_string(), offset)
        })?;
        if input.eof_offset() == 0 {
            break;
        }
        let start = input.current_token_start();
        let kind = scan_token(&mut input)
            .map_err(|message| LexerError::at(&positions, message, start))?;
        let (line, column) = line_column(&positions, start);
        tokens.push(Token { kind, line, column });
    }

    Ok(tokens)
}

fn line_column(positions: &LinePositions, offset: usize) -> (usize, usize) {
    let (line, column) = positions.from_offset(offset);
    (line.as_usize() + 1, column + 1)
}

/// Skips whitespace and comments. An unterminated block comment is an
/// error, reported at the offset of its opening `/*`.
fn skip_trivia(input: &mut Input<'_>) -> Result<(), usize> {
    loop {
        let _: winnow::Result<&str> = take_while(0.., char::is_whitespace).parse_next(input);
        let start = input.current_token_start();
        let block_open: winnow::Result<Option<&str>> = opt("/*").parse_next(input);
        if let Ok(Some(_)) = block_open {
            let closed: winnow::Result<(&str, &str)> =
                (take_until(0.., "*/"), "*/").parse_next(input);
            if closed.is_err() {
                return Err(start);
            }
            continue;
        }
        let line_open: winnow::Result<Option<&str>> = opt("//").parse_next(input);
        if let Ok(Some(_)) = line_open {
            let _: winnow::Result<&str> = take_till(0.., '\n').parse_next(input);
            continue;
        }
        return Ok(());
    }
}

fn scan_token(input: &mut Input<'_>) -> Result<TokenKind, String> {
    let next: winnow::Result<char> = peek(any).parse_next(input);
    let Ok(c) = next else {
        return Err("Unexpected end of input".to_string());
    };
    match c {
        '0'..='9' => int_constant(input).map_err(|_| "Invalid integer constant".to_string()),
        '\'' => char_constant(input).map_err(|_| "Unterminated character constant".to_string()),
        '"' => string_literal(input).map_err(|_| "Unterminated string literal".to_string()),
        c if c.is_alpha() || c == '_' => word(input).map_err(|_| format!("Illegal character {c:?}")),
        c => operator(input).map_err(|_| format!("Illegal character {c:?}")),
    }
}

fn int_constant(input: &mut Input<'_>) -> winnow::Result<TokenKind> {
    digit1
        .parse_to::<i64>()
        .map(TokenKind::IntConstant)
        .parse_next(input)
}

fn word(input: &mut Input<'_>) -> winnow::Result<TokenKind> {
    let ident = (
        take_while(1, |c: char| c.is_alpha() || c == '_'),
        take_while(0.., |c: char| c.is_alphanum() || c == '_'),
    )
        .take()
        .parse_next(input)?;
    Ok(match ident {
        "void" => TokenKind::Keyword(Keyword::Void),
        "char" => TokenKind::Keyword(Keyword::Char),
        "int" => TokenKind::Keyword(Keyword::Int),
        "if" => TokenKind::Keyword(Keyword::If),
        "else" => TokenKind::Keyword(Keyword::Else),
        "while" => TokenKind::Keyword(Keyword::While),
        "for" => TokenKind::Keyword(Keyword::For),
        "break" => TokenKind::Keyword(Keyword::Break),
        "return" => TokenKind::Keyword(Keyword::Return),
        "assert" => TokenKind::Keyword(Keyword::Assert),
        "print" => TokenKind::Keyword(Keyword::Print),
        "read" => TokenKind::Keyword(Keyword::Read),
        _ => TokenKind::Identifier(ident.to_string()),
    })
}

fn char_constant(input: &mut Input<'_>) -> winnow::Result<TokenKind> {
    delimited(
        '\'',
        alt((preceded('\\', escape), none_of(['\'', '\\', '\n']))),
        '\'',
    )
    .map(TokenKind::CharConstant)
    .parse_next(input)
}

fn string_literal(input: &mut Input<'_>) -> winnow::Result<TokenKind> {
    delimited(
        '"',
        repeat(0.., string_char).fold(String::new, |mut string, c| {
            string.push(c);
            string
        }),
        '"',
    )
    .map(TokenKind::StringLiteral)
    .parse_next(input)
}

fn string_char(input: &mut Input<'_>) -> winnow::Result<char> {
    alt((preceded('\\', escape), none_of(['"', '\\', '\n']))).parse_next(input)
}

fn escape(input: &mut Input<'_>) -> winnow::Result<char> {
    any.verify_map(|c: char| match c {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '0' => Some('\0'),
        '\\' => Some('\\'),
        '\'' => Some('\''),
        '"' => Some('"'),
        _ => None,
    })
    .parse_next(input)
}

fn operator(input: &mut Input<'_>) -> winnow::Result<TokenKind> {
    alt((
        alt((
            "==".value(TokenKind::Equal),
            "!=".value(TokenKind::NotEqual),
            "<=".value(TokenKind::LessEqual),
            ">=".value(TokenKind::GreaterEqual),
            "&&".value(TokenKind::And),
            "||".value(TokenKind::Or),
        )),
        alt((
            '='.value(TokenKind::Assign),
            '<'.value(TokenKind::LessThan),
            '>'.value(TokenKind::GreaterThan),
            '+'.value(TokenKind::Plus),
            '-'.value(TokenKind::Minus),
            '*'.value(TokenKind::Star),
            '/'.value(TokenKind::Slash),
            '%'.value(TokenKind::Percent),
            '!'.value(TokenKind::Not),
            ';'.value(TokenKind::Semicolon),
            ','.value(TokenKind::Comma),
            '('.value(TokenKind::OpenParen),
            ')'.value(TokenKind::CloseParen),
            '['.value(TokenKind::OpenBracket),
            ']'.value(TokenKind::CloseBracket),
            '{'.value(TokenKind::OpenBrace),
            '}'.value(TokenKind::CloseBrace),
        )),
    ))
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("int foo void _bar charlie"),
            vec![
                TokenKind::Keyword(Keyword::Int),
                TokenKind::Identifier("foo".into()),
                TokenKind::Keyword(Keyword::Void),
                TokenKind::Identifier("_bar".into()),
                TokenKind::Identifier("charlie".into()),
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("== != <= >= && || = < > + - * / % !"),
            vec![
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Assign,
                TokenKind::LessThan,
                TokenKind::GreaterThan,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::Not,
            ]
        );
    }

    #[test]
    fn test_constants() {
        assert_eq!(
            kinds(r#"42 'a' '\n' "hi\tthere""#),
            vec![
                TokenKind::IntConstant(42),
                TokenKind::CharConstant('a'),
                TokenKind::CharConstant('\n'),
                TokenKind::StringLiteral("hi\tthere".into()),
            ]
        );
    }

    #[test]
    fn test_number_identifier_boundary() {
        // PLY-style: `123abc` is a constant followed by an identifier.
        assert_eq!(
            kinds("123abc"),
            vec![
                TokenKind::IntConstant(123),
                TokenKind::Identifier("abc".into()),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("a /* skip\nme */ b // and this\nc"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Identifier("b".into()),
                TokenKind::Identifier("c".into()),
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = lex("int a;\nchar b;\n").unwrap();
        let positions: Vec<(usize, usize)> = tokens.iter().map(|t| (t.line, t.column)).collect();
        assert_eq!(
            positions,
            vec![(1, 1), (1, 5), (1, 6), (2, 1), (2, 6), (2, 7)]
        );
    }

    #[test]
    fn test_illegal_character() {
        let err = lex("int a = $;").unwrap_err();
        assert_eq!(
            err,
            LexerError {
                message: "Illegal character '$'".into(),
                line: 1,
                column: 9,
            }
        );
        assert_eq!(err.to_string(), "LexerError: Illegal character '$' at 1:9");
    }

    #[test]
    fn test_unterminated_comment() {
        assert_matches!(
            lex("int a; /* foo").unwrap_err(),
            LexerError { message, line: 1, column: 8 } if message == "Unterminated comment"
        );
    }

    #[test]
    fn test_invalid_integer_constant() {
        // more digits than an i64 can hold
        let err = lex("int x = 99999999999999999999;").unwrap_err();
        assert_eq!(
            err,
            LexerError {
                message: "Invalid integer constant".into(),
                line: 1,
                column: 9,
            }
        );
        assert_eq!(
            err.to_string(),
            "LexerError: Invalid integer constant at 1:9"
        );
    }

    #[test]
    fn test_unterminated_char_constant() {
        assert_matches!(
            lex("char c = 'a;").unwrap_err(),
            LexerError { message, line: 1, column: 10 } if message == "Unterminated character constant"
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert_matches!(
            lex("\"abc\nint a;").unwrap_err(),
            LexerError { message, line: 1, column: 1 } if message == "Unterminated string literal"
        );
    }
}
