#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_panics_doc, clippy::module_name_repetitions)]

use std::{
    fmt::Display,
    process::{ExitCode, Termination},
};

#[macro_use]
pub mod dqbf;
pub mod aig;
pub mod certify;
pub mod clause;
pub mod cli;
mod datastructure;
mod definability;
mod deps;
pub mod dimacs;
pub mod dqdimacs;
mod literal;
pub mod model;
pub mod qbf2;
mod sat;

// Re-export
pub use dqdimacs::QuantTy;

/// The certifier's answer: does the candidate model witness the truth
/// of the DQBF?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Verdict {
    Validated = 0,
    Invalid = 1,
}

impl Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Validated => write!(f, "Model validated!"),
            Verdict::Invalid => write!(f, "Model invalid!"),
        }
    }
}

impl Termination for Verdict {
    fn report(self) -> ExitCode {
        ExitCode::from(self as u8)
    }
}
