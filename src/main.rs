use anyhow::Context;
use std::env;
use timecgi::{
    cgi,
    clock::SystemClock,
    config::{Config, ServeConfig},
    dispatch::Dispatcher,
    server, telemetry,
    tz::TimezoneCatalog,
};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    let dispatcher = Dispatcher::new(TimezoneCatalog::load(), SystemClock);

    // Web servers may pass search terms as arguments, so anything other than
    // `serve` still means a CGI invocation.
    match env::args().nth(1).as_deref() {
        Some("serve") => {
            telemetry::init(&config.log_filter)?;
            let serve_config = ServeConfig::from_env()?;
            tokio::runtime::Runtime::new()
                .context("failed to start tokio runtime")?
                .block_on(server::serve(&serve_config, dispatcher))
        }
        _ => {
            telemetry::init_lenient(&config.log_filter);
            cgi::run(&dispatcher)
        }
    }
}
