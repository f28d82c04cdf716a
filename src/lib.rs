//! A CGI endpoint that reports the current time in a chosen timezone.
//!
//! `GET` renders a form listing every known timezone, `POST` renders the
//! current time in the submitted one. Any other method is answered with 405.
//! The binary normally runs once per request under a web server; `serve`
//! hosts the same handler over HTTP for local use.

pub mod cgi;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod html;
pub mod server;
pub mod telemetry;
pub mod tz;
