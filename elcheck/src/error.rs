use std::io;

/// Central error type.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Parse(lumo_parse::Error),
    Lower(Vec<elabori::LowerError>),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<lumo_parse::Error> for Error {
    fn from(err: lumo_parse::Error) -> Self {
        Self::Parse(err)
    }
}

impl From<Vec<elabori::LowerError>> for Error {
    fn from(errs: Vec<elabori::LowerError>) -> Self {
        Self::Lower(errs)
    }
}
