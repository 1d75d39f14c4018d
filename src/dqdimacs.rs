//! Parser for the DQDIMACS input file format.
//!
//! DQDIMACS extends QDIMACS (<https://www.qbflib.org/qdimacs.html>)
//! with `d` lines that give an existential variable an explicit
//! dependency set, overriding the one inferred from the quantifier
//! prefix.

use crate::{
    dimacs::{ParseError, Scanner},
    literal::{Lit, Var},
};
use std::{fmt::Display, io::Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantTy {
    Exists,
    Forall,
}

impl Display for QuantTy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuantTy::Exists => write!(f, "e"),
            QuantTy::Forall => write!(f, "a"),
        }
    }
}

/// An instance of an implementor can be derived from a textual
/// representation of a DQBF in the DQDIMACS format.
pub trait FromDqdimacs: Default {
    fn set_num_variables(&mut self, variables: u32);
    fn set_num_clauses(&mut self, clauses: u32);
    fn quantify(&mut self, quant: QuantTy, vars: &[Var]);
    fn depend(&mut self, var: Var, on: &[Var]);
    fn add_clause(&mut self, lits: &[Lit]);
}

#[derive(Debug)]
pub struct DqdimacsParser<R: Read> {
    scanner: Scanner<R>,
    num_variables: u32,
    num_clauses: u32,
    num_clauses_read: u32,
}

impl<R: Read> DqdimacsParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            scanner: Scanner::new(reader),
            num_variables: 0,
            num_clauses: 0,
            num_clauses_read: 0,
        }
    }

    /// Parses a DQDIMACS file and returns the representation `Q`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the read content is not
    /// valid DQDIMACS. The function propagates underlying IO failures.
    pub fn parse<Q: FromDqdimacs>(&mut self) -> Result<Q, ParseError> {
        let mut result = Q::default();
        self.parse_comment_or_header(&mut result)?;
        self.parse_prefix(&mut result)?;
        self.parse_matrix(&mut result)?;

        // check that number of clauses match the header
        if self.num_clauses_read != self.num_clauses {
            return Err(ParseError::NumClausesMismatch {
                expected: self.num_clauses,
                found: self.num_clauses_read,
            });
        }

        Ok(result)
    }

    /// Either `c ...` or `p cnf ...`
    fn parse_comment_or_header<Q: FromDqdimacs>(
        &mut self,
        result: &mut Q,
    ) -> Result<(), ParseError> {
        while let Some(b) = self.scanner.next_byte()? {
            match b {
                b'c' => {
                    // start of a comment line, ignore remaining line
                    self.scanner.rest_of_line()?;
                }
                b'p' => {
                    let (num_variables, num_clauses) = self.scanner.parse_header()?;
                    self.num_variables = num_variables;
                    self.num_clauses = num_clauses;
                    result.set_num_variables(num_variables);
                    result.set_num_clauses(num_clauses);
                    return Ok(());
                }
                b if b.is_ascii_whitespace() => {
                    // ignore whitespace at the beginning of the file
                }
                _ => {
                    return Err(ParseError::UnexpectedChar {
                        err_span: self.scanner.err_offset().into(),
                    })
                }
            }
        }
        Err(ParseError::MissingHeader)
    }

    /// Quantifier lines `a ...`, `e ...` and dependency lines `d ...`;
    /// stops before the matrix begins.
    fn parse_prefix<Q: FromDqdimacs>(&mut self, result: &mut Q) -> Result<(), ParseError> {
        while let Some(b) = self.scanner.skip_whitespace_and_peek()? {
            match b {
                b'a' | b'e' => {
                    self.parse_prefix_line(result)?;
                }
                b'd' => {
                    self.parse_dependency_line(result)?;
                }
                b'-' | (b'0'..=b'9') => {
                    // end of quantifier prefix
                    return Ok(());
                }
                _ => {
                    return Err(ParseError::UnexpectedChar {
                        err_span: self.scanner.err_offset().into(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Either `e ...` or `a ...`
    fn parse_prefix_line<Q: FromDqdimacs>(&mut self, result: &mut Q) -> Result<(), ParseError> {
        let quant = match self.scanner.next_byte()?.ok_or_else(|| {
            ParseError::UnexpectedEndOfFile { err_span: self.scanner.err_span() }
        })? {
            b'e' => QuantTy::Exists,
            b'a' => QuantTy::Forall,
            _ => unreachable!(),
        };
        let vars = self.parse_var_list()?;
        result.quantify(quant, &vars);
        Ok(())
    }

    /// `d <existential> <universal> ... 0`
    fn parse_dependency_line<Q: FromDqdimacs>(&mut self, result: &mut Q) -> Result<(), ParseError> {
        self.scanner.next_byte()?; // consume the `d`
        self.scanner
            .skip_whitespace_and_peek()?
            .ok_or_else(|| ParseError::UnexpectedEndOfFile { err_span: self.scanner.err_span() })?;
        let start_offset = self.scanner.err_offset();
        let var: i32 = self.scanner.parse_int()?;
        let Some(var) = self.checked_var(var, start_offset)? else {
            // a bare `d 0` line names no variable
            return Err(ParseError::VariableOutOfBound {
                val: 0,
                err_span: (start_offset..self.scanner.err_offset().saturating_sub(1)).into(),
            });
        };
        let on = self.parse_var_list()?;
        result.depend(var, &on);
        Ok(())
    }

    /// Parses variables up to the terminating `0`.
    fn parse_var_list(&mut self) -> Result<Vec<Var>, ParseError> {
        let mut vars = Vec::new();
        loop {
            self.scanner.skip_whitespace_and_peek()?.ok_or_else(|| {
                ParseError::UnexpectedEndOfFile { err_span: self.scanner.err_span() }
            })?;
            let start_offset = self.scanner.err_offset();
            let var: i32 = self.scanner.parse_int()?;
            let Some(var) = self.checked_var(var, start_offset)? else {
                break;
            };
            vars.push(var);
        }
        Ok(vars)
    }

    /// Bound-checks a parsed variable; `0` maps to `None`.
    fn checked_var(&self, var: i32, start_offset: usize) -> Result<Option<Var>, ParseError> {
        if var == 0 {
            return Ok(None);
        }
        // reduce end offset by one, as last byte was a whitespace
        let err_span = (start_offset..self.scanner.err_offset().saturating_sub(1)).into();
        if !(1..=Var::MAX_VAR.to_dimacs()).contains(&var) {
            return Err(ParseError::VariableOutOfBound { val: var.into(), err_span });
        }
        if u32::try_from(var).unwrap() > self.num_variables {
            return Err(ParseError::ExceedsDeclaredBound {
                val: var.into(),
                bound: self.num_variables,
                err_span,
            });
        }
        Ok(Some(Var::from_dimacs(var)))
    }

    /// Parses clauses until EOF
    fn parse_matrix<Q: FromDqdimacs>(&mut self, result: &mut Q) -> Result<(), ParseError> {
        let mut clause = Vec::new();
        while (self.scanner.skip_whitespace_and_peek()?).is_some() {
            clause.clear();
            loop {
                self.scanner.skip_whitespace_and_peek()?.ok_or_else(|| {
                    ParseError::UnexpectedEndOfFile { err_span: self.scanner.err_span() }
                })?;
                let start_offset = self.scanner.err_offset();
                let lit: i32 = self.scanner.parse_int()?;
                if lit == 0 {
                    break;
                }
                if !(Lit::MIN_LIT.to_dimacs()..=Lit::MAX_LIT.to_dimacs()).contains(&lit) {
                    return Err(ParseError::LiteralOutOfBound {
                        val: lit.into(),
                        err_span: (start_offset..self.scanner.err_offset()).into(),
                    });
                }
                if lit.unsigned_abs() > self.num_variables {
                    return Err(ParseError::ExceedsDeclaredBound {
                        val: lit.into(),
                        bound: self.num_variables,
                        err_span: (start_offset..self.scanner.err_offset().saturating_sub(1))
                            .into(),
                    });
                }
                clause.push(Lit::from_dimacs(lit));
            }
            result.add_clause(&clause);
            self.num_clauses_read += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dimacs::HeaderError;
    use crate::dqbf::Dqbf;
    use proptest::prelude::*;
    use std::io::Cursor;

    proptest! {
        #[test]
        fn doesnt_crash(s in ".*") {
            let reader = Cursor::new(s);
            let _dqbf: Option<Dqbf> = DqdimacsParser::new(reader).parse().ok();
        }

        #[test]
        fn roundtrip_from_dqbf(input in crate::dqbf::strategy::dqbf(1..5usize, 1..5usize, 0..10usize, 0..4usize)) {
            let dqdimacs = format!("{input}");
            let reader = Cursor::new(dqdimacs);
            let parsed: Dqbf = DqdimacsParser::new(reader).parse()?;
            prop_assert_eq!(parsed, input);
        }
    }

    macro_rules! expect_error {
        ( $input:expr, $pat:pat ) => {
            let reader = std::io::Cursor::new(&$input);
            match DqdimacsParser::new(reader).parse::<Dqbf>() {
                Ok(parsed) => panic!("Expected error but got {:?}", parsed),
                Err(err) => match err {
                    $pat => (),
                    _ => panic!("Unexpected error {:?}", err),
                },
            }
        };
    }

    fn parse(input: &str) -> Result<Dqbf, ParseError> {
        DqdimacsParser::new(Cursor::new(input)).parse()
    }

    #[test]
    fn minimal() -> Result<(), ParseError> {
        let dqbf = parse("p cnf 0 0")?;
        println!("{dqbf}");
        Ok(())
    }

    #[test]
    fn prefix_semantics() -> Result<(), ParseError> {
        // an `e` block depends on the union of all preceding `a` blocks
        let dqbf = parse("p cnf 4 1\na 1 0\ne 3 0\na 2 0\ne 4 0\n3 4 0\n")?;
        assert_eq!(dqbf.dependencies_of(Var::from_dimacs(3)).unwrap().len(), 1);
        assert_eq!(dqbf.dependencies_of(Var::from_dimacs(4)).unwrap().len(), 2);
        Ok(())
    }

    #[test]
    fn dependency_override() -> Result<(), ParseError> {
        let dqbf = parse("p cnf 4 1\na 1 2 0\ne 3 4 0\nd 4 2 0\n3 4 0\n")?;
        assert_eq!(dqbf.dependencies_of(Var::from_dimacs(3)).unwrap().len(), 2);
        let deps: Vec<_> = dqbf.dependencies_of(Var::from_dimacs(4)).unwrap().iter().collect();
        assert_eq!(deps, [&Var::from_dimacs(2)]);
        Ok(())
    }

    #[test]
    fn empty_dependency_line() -> Result<(), ParseError> {
        let dqbf = parse("p cnf 2 1\na 1 0\ne 2 0\nd 2 0\n2 0\n")?;
        assert!(dqbf.dependencies_of(Var::from_dimacs(2)).unwrap().is_empty());
        Ok(())
    }

    #[test]
    fn missing_header() {
        expect_error!(b"", ParseError::MissingHeader);
        expect_error!(b"c comment\nc comments\n\n", ParseError::MissingHeader);
    }

    #[test]
    fn out_of_bound() {
        // i32::MAX = 2147483647 is the largest representable literal
        // i32::MIN = -2147483648 is not a valid literal
        expect_error!(b"p cnf 3 1\n1 2147483648 3 0", ParseError::LiteralOutOfBound { .. });
        expect_error!(b"p cnf 3 1\n1 -2147483648 3 0", ParseError::LiteralOutOfBound { .. });
    }

    #[test]
    fn exceeds_declared_bound() {
        expect_error!(b"p cnf 2 1\na 1 0\ne 2 0\n1 3 0\n", ParseError::ExceedsDeclaredBound { .. });
        expect_error!(b"p cnf 2 0\na 5 0\n", ParseError::ExceedsDeclaredBound { .. });
        expect_error!(b"p cnf 2 0\na 1 0\ne 2 0\nd 2 7 0\n", ParseError::ExceedsDeclaredBound { .. });
    }

    #[test]
    fn end_of_file() {
        expect_error!(b"p cnf 3 2\n1 2 3 0\n-1 2 3", ParseError::UnexpectedEndOfFile { .. });
        expect_error!(b"p cnf 3 0\na 1 2", ParseError::UnexpectedEndOfFile { .. });
    }

    #[test]
    fn header() -> Result<(), ParseError> {
        parse("p cnf     10      0")?;

        expect_error!(
            b"p dnf 2 2",
            ParseError::InvalidHeader { reason: HeaderError::InvalidPrefix, .. }
        );
        expect_error!(
            b"pcnf 2 2",
            ParseError::InvalidHeader { reason: HeaderError::InvalidPrefix, .. }
        );
        expect_error!(
            b"p cnf -2 2",
            ParseError::InvalidHeader { reason: HeaderError::InvalidVariableCount, .. }
        );
        expect_error!(
            b"p cnf 2 -2",
            ParseError::InvalidHeader { reason: HeaderError::InvalidClauseCount, .. }
        );
        Ok(())
    }

    #[test]
    fn num_clauses() {
        expect_error!(
            b"p cnf 3 2\n1 -2 0\n2 -3 0\n3 -1 0\n",
            ParseError::NumClausesMismatch { expected: 2, found: 3 }
        );
    }
}
