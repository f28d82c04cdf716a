use crate::{clock::Clock, dispatch::Dispatcher};
use anyhow::Context;
use axum::http::{
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    request::Parts,
    HeaderName, Version,
};
use std::{
    collections::HashMap,
    env,
    io::{self, Read, Write},
};

pub const SERVER_SOFTWARE: &str = "timecgi";

/// Everything a handler may know about the request, decoded once from the
/// CGI variables and body.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    method: String,
    path_info: String,
    form_fields: HashMap<String, String>,
    raw_body: Vec<u8>,
}

impl RequestContext {
    pub fn decode(vars: &[(String, String)], raw_body: Vec<u8>) -> Self {
        let method = lookup(vars, "REQUEST_METHOD").unwrap_or_default().to_string();
        let path_info = lookup(vars, "PATH_INFO").unwrap_or_default().to_string();

        let form_fields = if method == "POST" && is_form_encoded(lookup(vars, "CONTENT_TYPE")) {
            parse_form(&raw_body)
        } else {
            HashMap::new()
        };

        Self {
            method,
            path_info,
            form_fields,
            raw_body,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.form_fields.get(name).map(String::as_str)
    }

    pub fn form_fields(&self) -> &HashMap<String, String> {
        &self.form_fields
    }

    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }
}

fn lookup<'a>(vars: &'a [(String, String)], key: &str) -> Option<&'a str> {
    vars.iter()
        .rev()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

fn is_form_encoded(content_type: Option<&str>) -> bool {
    let content_type = match content_type.map(str::trim) {
        None | Some("") => return true,
        Some(value) => value,
    };

    match content_type.parse::<mime::Mime>() {
        Ok(mime) => mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str(),
        Err(_) => false,
    }
}

fn parse_form(body: &[u8]) -> HashMap<String, String> {
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(body) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(err) => {
            tracing::debug!("ignoring malformed form body: {}", err);
            HashMap::new()
        }
    }
}

/// Handles the single request this process was started for: reads the CGI
/// environment and body, dispatches, and writes the envelope to stdout.
pub fn run<C: Clock>(dispatcher: &Dispatcher<C>) -> anyhow::Result<()> {
    let vars: Vec<(String, String)> = env::vars_os()
        .map(|(key, value)| {
            (
                key.to_string_lossy().into_owned(),
                value.to_string_lossy().into_owned(),
            )
        })
        .collect();

    run_with(dispatcher, &vars, io::stdin().lock(), io::stdout().lock())
}

/// Reads at most `CONTENT_LENGTH` bytes of `input` as the body and writes
/// the response envelope to `output`.
pub fn run_with<C, R, W>(
    dispatcher: &Dispatcher<C>,
    vars: &[(String, String)],
    input: R,
    output: W,
) -> anyhow::Result<()>
where
    C: Clock,
    R: Read,
    W: Write,
{
    let length: u64 = lookup(vars, "CONTENT_LENGTH")
        .and_then(|var| var.trim().parse().ok())
        .unwrap_or(0);

    let mut body = Vec::new();
    input
        .take(length)
        .read_to_end(&mut body)
        .context("failed to read request body from stdin")?;

    if (body.len() as u64) < length {
        tracing::warn!(
            "request body shorter than CONTENT_LENGTH: {} < {}",
            body.len(),
            length
        );
    }

    let request = RequestContext::decode(vars, body);
    let response = dispatcher.dispatch(&request);

    response
        .write_to(output)
        .context("failed to write response to stdout")
}

fn server_protocol(version: Version) -> Option<&'static str> {
    match version {
        Version::HTTP_09 => Some("HTTP/0.9"),
        Version::HTTP_10 => Some("HTTP/1.0"),
        Version::HTTP_11 => Some("HTTP/1.1"),
        Version::HTTP_2 => Some("HTTP/2.0"),
        Version::HTTP_3 => Some("HTTP/3.0"),
        _ => None,
    }
}

fn to_cgi_http_header(header: &HeaderName) -> String {
    "HTTP_".to_string() + &header.as_str().to_ascii_uppercase().replace('-', "_")
}

/// Builds the CGI/1.1 meta-variables a web server would hand to this script
/// for an HTTP request.
pub fn request_vars(
    parts: &Parts,
    script_name: &str,
    path_info: &str,
    body_len: usize,
) -> Vec<(String, String)> {
    let mut vars = vec![
        ("GATEWAY_INTERFACE".into(), "CGI/1.1".into()),
        ("SERVER_SOFTWARE".into(), SERVER_SOFTWARE.into()),
        (
            "SERVER_PROTOCOL".into(),
            server_protocol(parts.version).unwrap_or("HTTP/1.1").into(),
        ),
        ("REQUEST_METHOD".into(), parts.method.to_string()),
        (
            "QUERY_STRING".into(),
            parts.uri.query().unwrap_or("").into(),
        ),
        ("SCRIPT_NAME".into(), script_name.into()),
        ("PATH_INFO".into(), path_info.into()),
    ];

    if body_len > 0 && !parts.headers.contains_key(CONTENT_LENGTH) {
        vars.push(("CONTENT_LENGTH".into(), body_len.to_string()));
    }

    vars.extend(parts.headers.iter().filter_map(|(header, value)| {
        let value = value.to_str().ok()?;

        // CGI handles two HTTP headers specially. The CGI RFC also suggests we should not
        // duplicate them with the HTTP_ prefix.
        Some(match header {
            &CONTENT_TYPE => ("CONTENT_TYPE".into(), value.into()),
            &CONTENT_LENGTH => ("CONTENT_LENGTH".into(), value.into()),
            header => (to_cgi_http_header(header), value.into()),
        })
    }));

    vars
}
