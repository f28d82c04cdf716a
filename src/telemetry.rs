use crate::config::DEFAULT_LOG_FILTER;
use anyhow::Context;
use tracing_error::ErrorLayer;
use tracing_subscriber::{filter::ParseError, fmt, prelude::*, EnvFilter};

/// Parses `filter`, falling back to the default directive when it is
/// malformed. The parse error is handed back so it can be logged once the
/// subscriber is up.
fn filter_or_default(filter: &str) -> (EnvFilter, Option<ParseError>) {
    match EnvFilter::try_new(filter) {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new(DEFAULT_LOG_FILTER), Some(err)),
    }
}

fn install(filter: EnvFilter) -> anyhow::Result<()> {
    // Output goes to stderr because stdout carries the CGI response.
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(ErrorLayer::default())
        .try_init()
        .context("failed to install tracing subscriber")
}

/// Strict setup for `serve`: a bad filter is a start-up error.
pub fn init(filter: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(filter).with_context(|| format!("invalid log filter {:?}", filter))?;
    install(filter)
}

/// Setup for a CGI request, which must be answered no matter what. A bad
/// filter falls back to the default and is reported as a warning.
pub fn init_lenient(filter: &str) {
    let (env_filter, err) = filter_or_default(filter);
    if let Err(install_err) = install(env_filter) {
        eprintln!("{:#}", install_err);
        return;
    }
    if let Some(err) = err {
        tracing::warn!("invalid log filter {:?}, using {:?}: {}", filter, DEFAULT_LOG_FILTER, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_filter_is_kept() {
        let (_, err) = filter_or_default("timecgi=debug,warn");
        assert!(err.is_none());
    }

    #[test]
    fn malformed_filter_falls_back() {
        let (filter, err) = filter_or_default("[[");
        assert!(err.is_some());
        assert_eq!(filter.to_string(), EnvFilter::new(DEFAULT_LOG_FILTER).to_string());
    }
}
