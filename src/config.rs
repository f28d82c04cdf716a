use anyhow::Context;
use std::{env, net::SocketAddr};

pub const DEFAULT_LOG_FILTER: &str = "warn";
pub const DEFAULT_ADDR: &str = "127.0.0.1:9000";
pub const DEFAULT_SCRIPT_NAME: &str = "/cgi/time_cgi";
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Settings shared by both modes. Loading never fails, so a CGI request is
/// always answered whatever the environment holds.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            log_filter: lookup("TIMECGI_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.into()),
        }
    }
}

/// Settings only `serve` reads.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub addr: SocketAddr,
    pub script_name: String,
    pub max_body_bytes: usize,
}

impl ServeConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = lookup("TIMECGI_ADDR").unwrap_or_else(|| DEFAULT_ADDR.into());
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid TIMECGI_ADDR {:?}", addr))?;

        let script_name =
            lookup("TIMECGI_SCRIPT_NAME").unwrap_or_else(|| DEFAULT_SCRIPT_NAME.into());
        let script_name = normalize_script_name(&script_name);

        let max_body_bytes = match lookup("TIMECGI_MAX_BODY_BYTES") {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| format!("invalid TIMECGI_MAX_BODY_BYTES {:?}", value))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Self {
            addr,
            script_name,
            max_body_bytes,
        })
    }
}

/// Mount points always start with a slash and never end with one, so that
/// `/` mounts the script at the root.
fn normalize_script_name(name: &str) -> String {
    let trimmed = name.trim().trim_end_matches('/');
    if trimmed.starts_with('/') || trimmed.is_empty() {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn serve_config(pairs: &[(&str, &str)]) -> anyhow::Result<ServeConfig> {
        let vars = vars(pairs);
        ServeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        assert_eq!(Config::from_lookup(|_| None).log_filter, "warn");

        let config = serve_config(&[]).unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.script_name, "/cgi/time_cgi");
        assert_eq!(config.max_body_bytes, 64 * 1024);
    }

    #[test]
    fn overrides() {
        let config = serve_config(&[
            ("TIMECGI_ADDR", "0.0.0.0:8080"),
            ("TIMECGI_SCRIPT_NAME", "time/"),
            ("TIMECGI_MAX_BODY_BYTES", "1024"),
        ])
        .unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.script_name, "/time");
        assert_eq!(config.max_body_bytes, 1024);
    }

    #[test]
    fn root_mount_is_empty() {
        let config = serve_config(&[("TIMECGI_SCRIPT_NAME", "/")]).unwrap();
        assert_eq!(config.script_name, "");
    }

    #[test]
    fn bad_serve_settings_are_reported() {
        let err = serve_config(&[("TIMECGI_ADDR", "localhost")]).unwrap_err();
        assert!(err.to_string().contains("TIMECGI_ADDR"));

        let err = serve_config(&[("TIMECGI_MAX_BODY_BYTES", "lots")]).unwrap_err();
        assert!(err.to_string().contains("TIMECGI_MAX_BODY_BYTES"));
    }

    #[test]
    fn cgi_settings_ignore_serve_variables() {
        let vars = vars(&[
            ("TIMECGI_ADDR", "localhost"),
            ("TIMECGI_MAX_BODY_BYTES", "lots"),
            ("TIMECGI_LOG", "timecgi=debug"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).cloned());
        assert_eq!(config.log_filter, "timecgi=debug");
    }
}
