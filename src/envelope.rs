use axum::{
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, HeaderName, HeaderValue, StatusCode,
    },
    response::IntoResponse,
};
use std::io::{self, Write};

/// A complete CGI response: status line, ordered headers and body.
///
/// `Content-Length` is derived from the body when the envelope is built, so
/// it always matches the number of bytes written after the blank line.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: String,
}

impl ResponseEnvelope {
    pub fn html(status: StatusCode, body: String) -> Self {
        let headers = vec![
            (CONTENT_TYPE, HeaderValue::from_static("text/html")),
            (CONTENT_LENGTH, HeaderValue::from(body.len())),
        ];

        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter().map(|(name, value)| (name, value))
    }

    pub fn header(&self, name: HeaderName) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    fn status_line(&self) -> String {
        match self.status.canonical_reason() {
            Some(reason) => format!("Status: {} {}", self.status.as_u16(), reason),
            None => format!("Status: {}", self.status.as_u16()),
        }
    }

    /// Writes the envelope in CGI form. Header lines end in CRLF and one
    /// empty line separates them from the body.
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        write!(out, "{}\r\n", self.status_line())?;
        for (name, value) in &self.headers {
            write!(out, "{}: ", canonical_name(name))?;
            out.write_all(value.as_bytes())?;
            out.write_all(b"\r\n")?;
        }
        out.write_all(b"\r\n")?;
        out.write_all(self.body.as_bytes())?;
        out.flush()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.body.len() + 96);
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        buf
    }
}

/// `http` stores header names lowercased; CGI output conventionally uses
/// the title-cased form.
fn canonical_name(name: &HeaderName) -> String {
    name.as_str()
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> axum::response::Response {
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            headers.insert(name, value);
        }
        (self.status, headers, self.body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn serializes_status_headers_and_body() {
        let envelope = ResponseEnvelope::html(StatusCode::OK, "<p>hi</p>".into());
        assert_eq!(
            String::from_utf8(envelope.to_bytes()).unwrap(),
            "Status: 200 OK\r\nContent-Type: text/html\r\nContent-Length: 9\r\n\r\n<p>hi</p>"
        );
    }

    #[test]
    fn content_length_counts_bytes() {
        let body = "Zürich ⏰".to_string();
        let envelope = ResponseEnvelope::html(StatusCode::OK, body.clone());
        assert_eq!(
            envelope.header(CONTENT_LENGTH).unwrap(),
            &body.len().to_string()
        );
        assert_ne!(body.len(), body.chars().count());
    }

    #[test]
    fn headers_keep_insertion_order() {
        let envelope = ResponseEnvelope::html(StatusCode::METHOD_NOT_ALLOWED, String::new());
        let names: Vec<_> = envelope.headers().map(|(name, _)| name.clone()).collect();
        assert_eq!(names, vec![CONTENT_TYPE, CONTENT_LENGTH]);
        assert_eq!(envelope.header(CONTENT_LENGTH).unwrap(), "0");
    }

    #[test]
    fn single_blank_line_before_body() {
        let envelope = ResponseEnvelope::html(StatusCode::BAD_REQUEST, "\r\nx".into());
        let raw = String::from_utf8(envelope.to_bytes()).unwrap();
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("Status: 400 Bad Request\r\n"));
        assert!(!head.contains("\r\n\r\n"));
        assert_eq!(body, "\r\nx");
    }
}
