use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Installs the global subscriber on stderr.
///
/// Warnings from this crate always show; `verbose` lowers the floor to debug.
/// `RUST_LOG` overrides the level for every target.
pub fn init_logging(verbose: bool) {
    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time().with_writer(std::io::stderr))
        .with(log_filter(verbose, std::env::var("RUST_LOG").ok().as_deref()))
        .init();
}

fn log_filter(verbose: bool, env: Option<&str>) -> EnvFilter {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    match env.map(EnvFilter::try_new) {
        Some(Ok(filter)) => filter,
        _ => EnvFilter::default().add_directive(
            format!("cambio={level}")
                .parse()
                .unwrap_or_else(|_| LevelFilter::WARN.into()),
        ),
    }
}
