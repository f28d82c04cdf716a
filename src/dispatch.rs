use crate::{
    cgi::RequestContext,
    clock::Clock,
    envelope::ResponseEnvelope,
    html::escape,
    tz::{self, TimezoneCatalog, DEFAULT_TIMEZONE},
};
use axum::http::StatusCode;
use std::fmt::Write;

const TITLE: &str = "CGI: Current Time";

const TIME_STYLE: &str = "<style>
    .time-display {
        font-size: 1.5em;
        color: #FF5733;
        font-weight: bold;
    }
</style>";

/// Conditions that end a request with something other than 200.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("method {0} is not allowed")]
    UnsupportedMethod(String),
    #[error("unknown timezone {0}")]
    InvalidTimezone(String),
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            HandlerError::InvalidTimezone(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn page(&self) -> String {
        let status = self.status();
        let message = match self {
            HandlerError::UnsupportedMethod(method) => {
                format!("Method {} is not allowed", escape(method))
            }
            HandlerError::InvalidTimezone(name) => {
                format!("Unknown timezone &#039;{}&#039;", escape(name))
            }
        };

        format!(
            "<html><body><h1>{}</h1><h2>{} {}</h2></body></html>",
            TITLE,
            status.as_u16(),
            message
        )
    }
}

/// Maps a decoded request to exactly one handler and wraps the result in a
/// response envelope. Holds only read-only state, so one instance may serve
/// any number of independent requests.
#[derive(Debug, Clone)]
pub struct Dispatcher<C> {
    catalog: TimezoneCatalog,
    clock: C,
}

impl<C: Clock> Dispatcher<C> {
    pub fn new(catalog: TimezoneCatalog, clock: C) -> Self {
        Self { catalog, clock }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(method = %request.method()))]
    pub fn dispatch(&self, request: &RequestContext) -> ResponseEnvelope {
        let result = match request.method() {
            "GET" => Ok(self.options_form(request)),
            "POST" => self.current_time(request),
            method => Err(HandlerError::UnsupportedMethod(method.to_string())),
        };

        match result {
            Ok(body) => ResponseEnvelope::html(StatusCode::OK, body),
            Err(err) => {
                tracing::info!("rejecting request: {}", err);
                ResponseEnvelope::html(err.status(), err.page())
            }
        }
    }

    fn options_form(&self, request: &RequestContext) -> String {
        tracing::debug!(zones = self.catalog.len(), "rendering timezone form");

        let mut body = format!(
            "<html><body><h1>{}</h1><form method='POST' action='{}'>\
             <label for='timezone'>Choose a timezone: </label>\
             <select name='timezone' id='timezone'>",
            TITLE,
            escape(request.path_info())
        );

        for name in self.catalog.iter() {
            let name = escape(name);
            let _ = write!(body, "<option value='{}'>{}</option>", name, name);
        }

        body.push_str("</select><input type='submit' value='Show Time'></form></body></html>");
        body
    }

    fn current_time(&self, request: &RequestContext) -> Result<String, HandlerError> {
        let name = match request.field("timezone") {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_TIMEZONE,
        };
        let display = escape(name);

        let zone =
            tz::resolve(name).ok_or_else(|| HandlerError::InvalidTimezone(name.to_string()))?;
        let now = tz::format_in(self.clock.now(), zone);
        tracing::debug!(timezone = name, %now, "computed current time");

        Ok(format!(
            "<html><head>{}</head><body>\n<h1>{}</h1>\
             <p><span class='time-display'>The current server time in {} is: \
             <span id='time'>{}</span></span></p></body></html>",
            TIME_STYLE,
            TITLE,
            display,
            escape(&now)
        ))
    }
}
