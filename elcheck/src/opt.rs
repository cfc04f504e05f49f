use std::path::PathBuf;
use structopt::StructOpt;

/// An elaborating checker for the lumo language
#[derive(Clone, Debug, StructOpt)]
pub struct Opt {
    /// Trace constraint additions and resolutions
    #[structopt(long, short = "v")]
    pub verbose: bool,

    /// File to process
    #[structopt(name = "FILE")]
    pub file: PathBuf,
}
