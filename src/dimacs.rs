//! Byte-level scanning shared by the DIMACS-family parsers.
//!
//! Both input grammars (DQDIMACS instances and annotated candidate
//! models) are whitespace-separated integer streams with `c` comments
//! and a `p cnf` header; the [`Scanner`] provides the common machinery
//! with byte-accurate error spans.

use miette::{Diagnostic, SourceSpan};
use std::{
    io::{Bytes, Read},
    iter::Peekable,
};
use thiserror::Error;

/// Wraps a [`ParseError`] together with the input it occurred in, so
/// the rendered diagnostic can point into the source text.
#[derive(Debug, Error, Diagnostic)]
#[error("Cannot parse {what}")]
#[diagnostic()]
pub struct ExtendedParseError {
    pub what: &'static str,

    #[source_code]
    pub source_code: Vec<u8>,

    #[related]
    pub related: Vec<ParseError>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("The underlying IO has failed")]
    IO(#[from] std::io::Error),

    #[error("Invalid header: {}", reason)]
    #[diagnostic()]
    InvalidHeader {
        reason: HeaderError,

        #[label]
        err_span: SourceSpan,
    },

    #[error("Missing DIMACS header, i.e., `p cnf ...`")]
    MissingHeader,

    #[error("Unexpected end of file")]
    UnexpectedEndOfFile {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Unexpected character")]
    #[diagnostic()]
    UnexpectedChar {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Invalid integer")]
    InvalidInt {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Variable {val} is out of bound")]
    VariableOutOfBound {
        val: i64,

        #[label]
        err_span: SourceSpan,
    },

    #[error("Literal {val} is out of bound")]
    LiteralOutOfBound {
        val: i64,

        #[label]
        err_span: SourceSpan,
    },

    #[error("Variable {val} exceeds the declared bound of {bound}")]
    ExceedsDeclaredBound {
        val: i64,
        bound: u32,

        #[label]
        err_span: SourceSpan,
    },

    #[error(
        "Number of clauses does not match header: expected {}, but found {} clauses",
        expected,
        found
    )]
    NumClausesMismatch { expected: u32, found: u32 },
}

#[derive(Debug, Error, Diagnostic)]
pub enum HeaderError {
    #[error("`p cnf` prefix missing or invalid")]
    InvalidPrefix,

    #[error("Invalid variable count")]
    InvalidVariableCount,

    #[error("Invalid clause count")]
    InvalidClauseCount,
}

impl ParseError {
    pub(crate) fn err_span(&self) -> Option<SourceSpan> {
        match self {
            ParseError::InvalidInt { err_span }
            | ParseError::LiteralOutOfBound { err_span, .. } => Some(*err_span),
            _ => None,
        }
    }
}

/// Incremental byte reader with offset tracking for error spans.
#[derive(Debug)]
pub(crate) struct Scanner<R: Read> {
    bytes: Peekable<Bytes<R>>,
    offset: usize,
}

impl<R: Read> Scanner<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self { bytes: reader.bytes().peekable(), offset: 0 }
    }

    /// Consumes the next byte in the input.
    /// Returns the byte or `None` in the case of EOF.
    pub(crate) fn next_byte(&mut self) -> Result<Option<u8>, ParseError> {
        let byte = self.bytes.next().transpose()?;
        if byte.is_some() {
            self.offset += 1;
        }
        Ok(byte)
    }

    /// Returns the next byte value without consuming.
    pub(crate) fn peek_byte(&mut self) -> Option<u8> {
        match self.bytes.peek() {
            Some(Ok(b)) => Some(*b),
            _ => None,
        }
    }

    /// Consumes the remainder of the current line, including the
    /// terminating newline, and returns it. EOF ends the line as well.
    pub(crate) fn rest_of_line(&mut self) -> Result<String, ParseError> {
        let mut line = Vec::new();
        while let Some(b) = self.next_byte()? {
            if b == b'\n' {
                break;
            }
            line.push(b);
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Skips input bytes until a non-ASCII whitespace character is found.
    /// Returns the first non-ASCII whitespace character (if not EOF).
    pub(crate) fn skip_whitespace_and_peek(&mut self) -> Result<Option<u8>, ParseError> {
        while let Some(b) = self.peek_byte() {
            if !b.is_ascii_whitespace() {
                return Ok(Some(b));
            }
            self.next_byte()?;
        }
        Ok(None)
    }

    pub(crate) fn expect(&mut self, value: &[u8]) -> Result<(), ParseError> {
        for (&expected, found) in value.iter().zip(&mut self.bytes) {
            let found = found?;
            self.offset += 1;
            if found != expected {
                return Err(ParseError::UnexpectedChar { err_span: self.err_offset().into() });
            }
        }
        Ok(())
    }

    /// Parses the `cnf [NUM_VARIABLES] [NUM_CLAUSES]` part of the
    /// header, with the leading `p` already consumed.
    pub(crate) fn parse_header(&mut self) -> Result<(u32, u32), ParseError> {
        self.expect(&b" cnf"[..]).map_err(|_| ParseError::InvalidHeader {
            reason: HeaderError::InvalidPrefix,
            err_span: self.err_span(),
        })?;

        self.skip_whitespace_and_peek()?
            .ok_or_else(|| ParseError::UnexpectedEndOfFile { err_span: self.err_span() })?;
        let num_variables: u32 = self.parse_int().map_err(|err| ParseError::InvalidHeader {
            reason: HeaderError::InvalidVariableCount,
            err_span: err.err_span().unwrap_or_else(|| self.err_span()),
        })?;

        self.skip_whitespace_and_peek()?
            .ok_or_else(|| ParseError::UnexpectedEndOfFile { err_span: self.err_span() })?;
        let num_clauses: u32 = self.parse_int().map_err(|err| ParseError::InvalidHeader {
            reason: HeaderError::InvalidClauseCount,
            err_span: err.err_span().unwrap_or_else(|| self.err_span()),
        })?;

        Ok((num_variables, num_clauses))
    }

    pub(crate) fn parse_int<I>(&mut self) -> Result<I, ParseError>
    where
        I: TryFrom<i64>,
    {
        let start_span = self.err_offset();
        let mut parsed: i64 = 0;
        let mut is_negated = false;
        while let Some(b) = self.next_byte()? {
            match b {
                b'-' => {
                    if is_negated {
                        return Err(ParseError::InvalidInt { err_span: self.err_span() });
                    }
                    is_negated = true;
                }
                b @ b'0'..=b'9' => {
                    let val = i64::from(b - b'0');
                    parsed = if let Some(parsed) =
                        parsed.checked_mul(10).and_then(|res| res.checked_add(val))
                    {
                        parsed
                    } else {
                        // overflow while parsing integer
                        return Err(ParseError::InvalidInt {
                            err_span: (start_span..self.err_offset()).into(),
                        });
                    }
                }
                b => {
                    if !b.is_ascii_whitespace() {
                        return Err(ParseError::InvalidInt {
                            err_span: (start_span..self.err_offset()).into(),
                        });
                    }
                    break;
                }
            }
        }
        if is_negated {
            parsed = -parsed;
        }
        I::try_from(parsed).map_err(|_| {
            ParseError::LiteralOutOfBound {
                val: parsed,
                // reduce end offset by one, as last byte was a whitespace
                err_span: (start_span..self.err_offset().saturating_sub(1)).into(),
            }
        })
    }

    pub(crate) fn err_offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn err_span(&self) -> SourceSpan {
        self.offset.saturating_sub(1).into()
    }
}
