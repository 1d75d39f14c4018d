//! The candidate model: one CNF-encoded Boolean function per
//! existential variable, parsed from a DIMACS file whose
//! `c Model for variable V` comments partition the clauses.

use crate::{
    clause::Clause,
    dimacs::{ParseError, Scanner},
    literal::{Lit, Var},
};
use std::{
    collections::BTreeMap,
    io::Read,
};

/// An immutable candidate model.
///
/// `per_var` holds the clausal definition of each existential the
/// model file declared a section for; `union` is the concatenation of
/// all sections in file order. A model produced by AIG lowering has an
/// empty partition and only carries `union`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateModel {
    per_var: BTreeMap<Var, Vec<Clause>>,
    union: Vec<Clause>,
}

impl CandidateModel {
    /// A model without a per-variable partition (the AIG path).
    #[must_use]
    pub fn from_clauses(union: Vec<Clause>) -> Self {
        Self { per_var: BTreeMap::new(), union }
    }

    /// The clausal definition of `var`, if the model has a section
    /// for it.
    pub fn function(&self, var: Var) -> Option<&[Clause]> {
        self.per_var.get(&var).map(Vec::as_slice)
    }

    /// All model clauses, in file order.
    pub fn clauses(&self) -> &[Clause] {
        &self.union
    }

    /// Whether the model carries a per-variable partition. Scope and
    /// definability checks only apply when it does.
    #[must_use]
    pub fn has_partition(&self) -> bool {
        !self.per_var.is_empty()
    }
}

#[derive(Debug)]
pub struct ModelParser<R: Read> {
    scanner: Scanner<R>,
    num_variables: Option<u32>,
}

impl<R: Read> ModelParser<R> {
    pub fn new(reader: R) -> Self {
        Self { scanner: Scanner::new(reader), num_variables: None }
    }

    /// Parses an annotated DIMACS model file.
    ///
    /// Clauses before the first `c Model for variable V` comment
    /// belong to no variable and are ignored; all other comments are
    /// skipped.
    ///
    /// # Errors
    ///
    /// This function will return an error if the read content is not
    /// valid DIMACS or lacks the `p cnf` header. The function
    /// propagates underlying IO failures.
    pub fn parse(&mut self) -> Result<CandidateModel, ParseError> {
        let mut model = CandidateModel::default();
        let mut section: Option<Var> = None;
        let mut clause = Vec::new();
        while let Some(b) = self.scanner.skip_whitespace_and_peek()? {
            match b {
                b'c' => {
                    self.scanner.next_byte()?;
                    let line = self.scanner.rest_of_line()?;
                    if let Some(var) = section_variable(&line) {
                        section = Some(var);
                        model.per_var.entry(var).or_default();
                    }
                }
                b'p' => {
                    if self.num_variables.is_some() {
                        // a second header line
                        return Err(ParseError::UnexpectedChar {
                            err_span: self.scanner.err_offset().into(),
                        });
                    }
                    self.scanner.next_byte()?;
                    let (num_variables, _num_clauses) = self.scanner.parse_header()?;
                    self.num_variables = Some(num_variables);
                }
                b'-' | (b'0'..=b'9') => {
                    self.parse_clause(&mut clause)?;
                    if let Some(var) = section {
                        model.per_var.get_mut(&var).unwrap().push(Clause::new(&clause));
                        model.union.push(Clause::new(&clause));
                    }
                }
                _ => {
                    return Err(ParseError::UnexpectedChar {
                        err_span: self.scanner.err_offset().into(),
                    })
                }
            }
        }
        if self.num_variables.is_none() {
            return Err(ParseError::MissingHeader);
        }
        Ok(model)
    }

    fn parse_clause(&mut self, clause: &mut Vec<Lit>) -> Result<(), ParseError> {
        let bound = self.num_variables.ok_or(ParseError::MissingHeader)?;
        clause.clear();
        loop {
            self.scanner.skip_whitespace_and_peek()?.ok_or_else(|| {
                ParseError::UnexpectedEndOfFile { err_span: self.scanner.err_span() }
            })?;
            let start_offset = self.scanner.err_offset();
            let lit: i32 = self.scanner.parse_int()?;
            if lit == 0 {
                return Ok(());
            }
            if !(Lit::MIN_LIT.to_dimacs()..=Lit::MAX_LIT.to_dimacs()).contains(&lit) {
                return Err(ParseError::LiteralOutOfBound {
                    val: lit.into(),
                    err_span: (start_offset..self.scanner.err_offset()).into(),
                });
            }
            if lit.unsigned_abs() > bound {
                return Err(ParseError::ExceedsDeclaredBound {
                    val: lit.into(),
                    bound,
                    err_span: (start_offset..self.scanner.err_offset().saturating_sub(1)).into(),
                });
            }
            clause.push(Lit::from_dimacs(lit));
        }
    }
}

/// Extracts the variable from a `Model for variable V` comment body.
/// Any other comment yields `None`.
fn section_variable(line: &str) -> Option<Var> {
    let rest = line.trim_start().strip_prefix("Model for variable ")?;
    let digits: &str = &rest[..rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len())];
    let var: i32 = digits.parse().ok()?;
    (var > 0).then(|| Var::from_dimacs(var))
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn parse(input: &str) -> Result<CandidateModel, ParseError> {
        ModelParser::new(Cursor::new(input)).parse()
    }

    proptest! {
        #[test]
        fn doesnt_crash(s in ".*") {
            let _model = parse(&s);
        }
    }

    #[test]
    fn sections() -> Result<(), ParseError> {
        let model = parse(
            "p cnf 4 4\n\
             c Model for variable 3\n\
             3 1 0\n\
             -3 -1 0\n\
             c Model for variable 4\n\
             4 2 0\n\
             -4 -2 0\n",
        )?;
        assert!(model.has_partition());
        assert_eq!(model.function(Var::from_dimacs(3)).unwrap().len(), 2);
        assert_eq!(model.function(Var::from_dimacs(4)).unwrap().len(), 2);
        assert_eq!(model.clauses().len(), 4);
        Ok(())
    }

    #[test]
    fn clauses_outside_sections_are_ignored() -> Result<(), ParseError> {
        let model = parse(
            "p cnf 2 3\n\
             1 2 0\n\
             c Model for variable 2\n\
             2 0\n\
             c trailing comment\n\
             -2 1 0\n",
        )?;
        assert_eq!(model.clauses().len(), 2);
        assert_eq!(model.function(Var::from_dimacs(2)).unwrap().len(), 2);
        Ok(())
    }

    #[test]
    fn empty_section() -> Result<(), ParseError> {
        let model = parse("p cnf 2 0\nc Model for variable 2\n")?;
        assert!(model.has_partition());
        assert_eq!(model.function(Var::from_dimacs(2)).unwrap().len(), 0);
        assert!(model.clauses().is_empty());
        Ok(())
    }

    #[test]
    fn repeated_section_appends() -> Result<(), ParseError> {
        let model = parse(
            "p cnf 2 2\n\
             c Model for variable 2\n\
             2 0\n\
             c Model for variable 2\n\
             -2 1 0\n",
        )?;
        assert_eq!(model.function(Var::from_dimacs(2)).unwrap().len(), 2);
        Ok(())
    }

    #[test]
    fn missing_header() {
        assert!(matches!(
            parse("c Model for variable 1\n"),
            Err(ParseError::MissingHeader)
        ));
        assert!(matches!(
            parse("c Model for variable 1\n1 0\n"),
            Err(ParseError::MissingHeader)
        ));
    }

    #[test]
    fn exceeds_declared_bound() {
        assert!(matches!(
            parse("p cnf 2 1\nc Model for variable 2\n2 -5 0\n"),
            Err(ParseError::ExceedsDeclaredBound { .. })
        ));
    }

    #[test]
    fn unterminated_clause() {
        assert!(matches!(
            parse("p cnf 2 1\nc Model for variable 2\n2 1"),
            Err(ParseError::UnexpectedEndOfFile { .. })
        ));
    }
}
