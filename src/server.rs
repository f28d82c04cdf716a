use crate::{
    cgi::{self, RequestContext},
    clock::Clock,
    config::ServeConfig,
    dispatch::Dispatcher,
};
use anyhow::Context;
use axum::{
    body::{Body, Bytes, HttpBody},
    http::{header::CONTENT_LENGTH, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

struct Host<C> {
    dispatcher: Dispatcher<C>,
    script_name: String,
    max_body_bytes: usize,
}

/// Returns the path-info part of `path` when it addresses the script mounted
/// at `script_name`.
fn split_script_path<'a>(path: &'a str, script_name: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(script_name)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Collects the request body, refusing anything larger than `limit` bytes
/// whether it is announced up front or only discovered while streaming.
async fn read_body(
    headers: &HeaderMap,
    mut body: Body,
    limit: usize,
) -> Result<Bytes, StatusCode> {
    let announced = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    if announced.map_or(false, |length| length > limit as u64) {
        tracing::info!("rejecting body of {:?} bytes, limit is {}", announced, limit);
        return Err(StatusCode::PAYLOAD_TOO_LARGE);
    }

    let mut buf = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(|err| {
            tracing::warn!("failed to read request body: {}", err);
            StatusCode::BAD_REQUEST
        })?;
        if buf.len() + chunk.len() > limit {
            tracing::info!("request body exceeds limit of {} bytes", limit);
            return Err(StatusCode::PAYLOAD_TOO_LARGE);
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buf))
}

async fn handler<C>(host: Arc<Host<C>>, request: Request<Body>) -> Response
where
    C: Clock + Send + Sync + 'static,
{
    let path_info = match split_script_path(request.uri().path(), &host.script_name) {
        Some(rest) => percent_decode_str(rest).decode_utf8_lossy().into_owned(),
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    let (parts, body) = request.into_parts();
    let body = match read_body(&parts.headers, body, host.max_body_bytes).await {
        Ok(body) => body,
        Err(status) => return status.into_response(),
    };

    let vars = cgi::request_vars(&parts, &host.script_name, &path_info, body.len());
    let request = RequestContext::decode(&vars, body.to_vec());

    host.dispatcher.dispatch(&request).into_response()
}

/// Every path reaches the handler, which matches it against the script mount
/// itself, so the router needs no routes of its own.
pub fn router<C>(dispatcher: Dispatcher<C>, config: &ServeConfig) -> Router
where
    C: Clock + Send + Sync + 'static,
{
    let host = Arc::new(Host {
        dispatcher,
        script_name: config.script_name.clone(),
        max_body_bytes: config.max_body_bytes,
    });

    Router::new()
        .fallback(any(move |request: Request<Body>| handler(host.clone(), request)))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

pub async fn serve<C>(config: &ServeConfig, dispatcher: Dispatcher<C>) -> anyhow::Result<()>
where
    C: Clock + Send + Sync + 'static,
{
    let app = router(dispatcher, config);

    let server = axum::Server::try_bind(&config.addr)
        .with_context(|| format!("failed to bind {}", config.addr))?;

    tracing::info!("serving http://{}{}", config.addr, config.script_name);
    server
        .serve(app.into_make_service())
        .await
        .context("server terminated")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_path_info_after_script_name() {
        assert_eq!(split_script_path("/cgi/time_cgi", "/cgi/time_cgi"), Some(""));
        assert_eq!(
            split_script_path("/cgi/time_cgi/time", "/cgi/time_cgi"),
            Some("/time")
        );
        assert_eq!(split_script_path("/cgi/time_cgi2", "/cgi/time_cgi"), None);
        assert_eq!(split_script_path("/other", "/cgi/time_cgi"), None);
    }

    #[test]
    fn root_mount_passes_whole_path() {
        assert_eq!(split_script_path("/", ""), Some("/"));
        assert_eq!(split_script_path("/time", ""), Some("/time"));
    }
}
