//! An elaborating checker for the lumo language.
//!
//! `elcheck [-v] FILE` parses and elaborates one file, prints the normal
//! form of every top-level expression statement, and exits nonzero if any
//! diagnostic fired.

mod error;
mod opt;

use elabori::{lower, Elab, Show};
use error::Error;
use log::LevelFilter;
use opt::Opt;
use structopt::StructOpt;

fn run(opt: &Opt) -> Result<bool, Error> {
    let src = std::fs::read_to_string(&opt.file)?;
    let decls = lumo_parse::program(&src)?;

    let elab = Elab::new();
    let hir = lower(&decls, &elab.graph)?;
    let mut out = elab.run(&hir);

    for output in out.outputs.clone() {
        let value = out.elab.evaluate(&output);
        println!("{}", Show(&out.elab.graph, &value))
    }
    for diagnostic in &out.diagnostics {
        println!("{}", diagnostic)
    }
    Ok(out.diagnostics.is_empty())
}

fn position(src: &str, at: usize) -> (usize, usize) {
    let prefix = &src[..at.min(src.len())];
    let line = prefix.matches('\n').count() + 1;
    let column = prefix.rsplit('\n').next().map_or(0, str::len) + 1;
    (line, column)
}

fn report(err: &Error, file: &std::path::Path) {
    let src = std::fs::read_to_string(file).unwrap_or_default();
    match err {
        Error::Io(err) => println!("{}: {}", file.display(), err),
        Error::Parse(err) => {
            let (line, column) = err
                .span()
                .map_or((0, 0), |span| position(&src, span.start));
            println!("{}:{}:{}: {}", file.display(), line, column, err)
        }
        Error::Lower(errs) => {
            for err in errs {
                let (line, column) = position(&src, err.span().start);
                println!("{}:{}:{}: {}", file.display(), line, column, err)
            }
        }
    }
}

fn main() {
    let opt = Opt::from_args();

    // log to stdout; `-v` enables the constraint and reduction trace
    let level = if opt.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .target(env_logger::Target::Stdout)
        .init();

    match run(&opt) {
        Ok(true) => (),
        Ok(false) => std::process::exit(1),
        Err(err) => {
            report(&err, &opt.file);
            std::process::exit(1)
        }
    }
}
