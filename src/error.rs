use std::error;
use std::fmt;
use std::io;




#[derive(Debug)]

/**
 * Error to represent invalid solver configuration, cache and output failures,
 * broken component contracts, and transport failures.
 */
pub enum Error {
    MissingComponent(&'static str),
    MissingGrid,
    InvalidGrid(String),
    MalformedTimes(String),
    MalformedDumpTimes(String),
    Decomposition(String),
    Configuration(String),
    CacheMismatch(String),
    CacheIo(io::Error),
    CacheFormat(String),
    Contract(String),
    DumpIo(io::Error),
    DumpFormat(String),
    Communication(String),
}




// ============================================================================
impl Error {

    /// Whether this error is a configuration error (the run never started or
    /// was set up inconsistently).
    pub fn is_configuration(&self) -> bool {
        use Error::*;

        matches!(
            self,
            MissingComponent(_)
                | MissingGrid
                | InvalidGrid(_)
                | MalformedTimes(_)
                | MalformedDumpTimes(_)
                | Decomposition(_)
                | Configuration(_)
                | CacheMismatch(_)
        )
    }
}




// ============================================================================
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        use Error::*;

        match self {
            MissingComponent(name) => write!(fmt, "required component not configured: {}", name),
            MissingGrid => write!(fmt, "no grid installed: call load_cache or build_cache before run"),
            InvalidGrid(msg) => write!(fmt, "invalid grid: {}", msg),
            MalformedTimes(msg) => write!(fmt, "malformed time grid: {}", msg),
            MalformedDumpTimes(msg) => write!(fmt, "malformed dump schedule: {}", msg),
            Decomposition(msg) => write!(fmt, "invalid domain decomposition: {}", msg),
            Configuration(msg) => write!(fmt, "configuration error: {}", msg),
            CacheMismatch(msg) => write!(fmt, "cache does not match the requested setup: {}", msg),
            CacheIo(e) => write!(fmt, "cache i/o error: {}", e),
            CacheFormat(msg) => write!(fmt, "malformed cache file: {}", msg),
            Contract(msg) => write!(fmt, "component contract violated: {}", msg),
            DumpIo(e) => write!(fmt, "dump i/o error: {}", e),
            DumpFormat(msg) => write!(fmt, "malformed output: {}", msg),
            Communication(msg) => write!(fmt, "communication failure: {}", msg),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::CacheIo(e) | Error::DumpIo(e) => Some(e),
            _ => None,
        }
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::Error;

    #[test]
    fn configuration_errors_are_classified() {
        assert!(Error::MissingComponent("flux").is_configuration());
        assert!(Error::MissingGrid.is_configuration());
        assert!(!Error::Contract("bad".into()).is_configuration());
        assert!(!Error::Communication("gone".into()).is_configuration());
    }

    #[test]
    fn display_names_the_missing_component() {
        let message = Error::MissingComponent("evolver").to_string();
        assert!(message.contains("evolver"));
    }
}
