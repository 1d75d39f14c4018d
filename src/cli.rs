use clap::Parser;
use miette::Diagnostic;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Certifies that a candidate model witnesses the truth of a DQBF.
#[derive(Debug, Parser)]
#[command(name = "dqcert")]
pub struct Args {
    /// DQDIMACS file containing the DQBF of interest
    #[arg(value_name = "FORMULA")]
    pub formula: PathBuf,

    /// Candidate model: annotated DIMACS, or AIGER (ASCII or binary)
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,

    /// Check that the model uniquely defines every existential
    #[arg(long = "check-def")]
    pub check_def: bool,

    /// Check that every universal assignment admits a satisfying
    /// extension of the model
    #[arg(long = "check-cons")]
    pub check_cons: bool,

    /// Restrict models to the declared dependencies instead of the
    /// extended ones
    #[arg(long = "std-dep")]
    pub std_dep: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Dimacs,
    AigAscii,
    AigBinary,
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Cannot read file {}: {err}", path.display())]
    CannotReadFile {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("The candidate model {} has an unrecognized format", path.display())]
    UnknownModelFormat { path: PathBuf },
}

/// Determines the model format from the file extension, falling back
/// to sniffing the first line (`p cnf`, `aag`, or `aig`).
///
/// # Errors
///
/// Returns an error if the file cannot be read or matches neither
/// format.
pub fn model_format(path: &Path) -> Result<ModelFormat, CliError> {
    match path.extension().and_then(std::ffi::OsStr::to_str) {
        Some("dimacs") => return Ok(ModelFormat::Dimacs),
        Some("aag") => return Ok(ModelFormat::AigAscii),
        Some("aig") => return Ok(ModelFormat::AigBinary),
        _ => {}
    }
    let cannot_read =
        |err: std::io::Error| CliError::CannotReadFile { path: path.to_path_buf(), err };
    let file = File::open(path).map_err(cannot_read)?;
    let mut first_line = String::new();
    BufReader::new(file).read_line(&mut first_line).map_err(cannot_read)?;
    if first_line.starts_with("p cnf") {
        Ok(ModelFormat::Dimacs)
    } else if first_line.starts_with("aag") {
        Ok(ModelFormat::AigAscii)
    } else if first_line.starts_with("aig") {
        Ok(ModelFormat::AigBinary)
    } else {
        Err(CliError::UnknownModelFormat { path: path.to_path_buf() })
    }
}

/// Reads a file into memory with a diagnostic-friendly error.
///
/// # Errors
///
/// Wraps the underlying IO failure together with the path.
pub fn read_file(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|err| CliError::CannotReadFile { path: path.to_path_buf(), err })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn format_by_extension() {
        assert_eq!(model_format(Path::new("model.dimacs")).unwrap(), ModelFormat::Dimacs);
        assert_eq!(model_format(Path::new("model.aag")).unwrap(), ModelFormat::AigAscii);
        assert_eq!(model_format(Path::new("model.aig")).unwrap(), ModelFormat::AigBinary);
    }

    #[test]
    fn format_by_sniffing() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, contents: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, contents).unwrap();
            path
        };
        let dimacs = write("model", "p cnf 2 1\n1 2 0\n");
        assert_eq!(model_format(&dimacs).unwrap(), ModelFormat::Dimacs);
        let ascii = write("ascii", "aag 1 1 0 1 0\n");
        assert_eq!(model_format(&ascii).unwrap(), ModelFormat::AigAscii);
        let binary = write("binary", "aig 1 1 0 1 0\n");
        assert_eq!(model_format(&binary).unwrap(), ModelFormat::AigBinary);
        let garbage = write("garbage", "something else\n");
        assert!(matches!(
            model_format(&garbage),
            Err(CliError::UnknownModelFormat { .. })
        ));
    }

    #[test]
    fn unreadable_file() {
        assert!(matches!(
            model_format(Path::new("/nonexistent/model")),
            Err(CliError::CannotReadFile { .. })
        ));
    }
}
