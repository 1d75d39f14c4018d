use clap::Parser;
use dqcert::{
    aig::{AigToCnf, AigerPipeline},
    certify::{Certifier, Options},
    cli::{self, Args, ModelFormat},
    dimacs::ExtendedParseError,
    dqbf::Dqbf,
    dqdimacs::DqdimacsParser,
    model::{CandidateModel, ModelParser},
    qbf2::Cadet,
    Verdict,
};
use miette::Result;
use std::{
    io::Cursor,
    process::{ExitCode, Termination},
};

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run() {
        Ok(verdict) => {
            println!("{verdict}");
            verdict.report()
        }
        Err(report) => {
            eprintln!("{report:?}");
            // distinct from the verdict exit codes 0 and 1
            ExitCode::from(255)
        }
    }
}

fn run() -> Result<Verdict> {
    let args = Args::parse();

    let contents = cli::read_file(&args.formula)?;
    let dqbf: Dqbf = match DqdimacsParser::new(Cursor::new(&contents)).parse() {
        Ok(dqbf) => dqbf,
        Err(err) => Err(ExtendedParseError {
            what: "DQDIMACS",
            source_code: contents,
            related: vec![err],
        })?,
    };
    dqbf.validate()?;

    let mut options = Options {
        check_scope: true,
        check_consistency: args.check_cons,
        check_defined: args.check_def,
        extended_dependencies: !args.std_dep,
    };

    let model = match cli::model_format(&args.model)? {
        ModelFormat::Dimacs => {
            let contents = cli::read_file(&args.model)?;
            match ModelParser::new(Cursor::new(&contents)).parse() {
                Ok(model) => model,
                Err(err) => Err(ExtendedParseError {
                    what: "candidate model",
                    source_code: contents,
                    related: vec![err],
                })?,
            }
        }
        format @ (ModelFormat::AigAscii | ModelFormat::AigBinary) => {
            // lowering discards the per-variable structure, so none of
            // the partition-based checks can run
            options.check_scope = false;
            options.check_defined = false;
            options.check_consistency = false;
            let clauses =
                AigerPipeline::default().lower(&args.model, format == ModelFormat::AigBinary)?;
            CandidateModel::from_clauses(clauses)
        }
    };

    let certifier = Certifier::new(&dqbf, &model, Cadet::default(), options);
    match certifier.run()? {
        None => Ok(Verdict::Validated),
        Some(refutation) => {
            println!("{refutation}");
            Ok(Verdict::Invalid)
        }
    }
}
