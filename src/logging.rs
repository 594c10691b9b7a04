//! Diagnostic logging to the error sink
use crate::error::Error;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG` when set, otherwise from `level`
fn build_filter(level: &str) -> Result<EnvFilter, Error> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| Error::LoggingError(format!("Invalid log filter '{}': {}", level, e))),
    }
}

/// Install the global subscriber
///
/// Logs go to a freshly truncated `error_path` when given, otherwise stderr.
pub fn init(error_path: Option<&Path>, level: &str) -> Result<(), Error> {
    let filter = build_filter(level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match error_path {
        Some(path) => {
            let file = File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(io::stderr).try_init(),
    };

    result.map_err(|e| Error::LoggingError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_level_names_and_directives() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        for level in ["debug", "info", "warn", "cecd=trace,cec=info"] {
            assert!(build_filter(level).is_ok(), "{}", level);
        }
    }

    #[test]
    fn rejects_malformed_filter() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(matches!(
            build_filter("cecd=verbose"),
            Err(Error::LoggingError(_))
        ));
    }
}
