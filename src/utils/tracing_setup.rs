use tracing_subscriber::{filter::Directive, fmt, EnvFilter};

/// Default directives layered on top of `RUST_LOG`.
pub const DEFAULT_LOG_DIRECTIVES: &str = "pandl_core=info,pandl_engine=info";

/// Installs the global fmt subscriber. `RUST_LOG` is honoured and the
/// comma-separated `directives` are added on top. If none of them parse the
/// defaults are used instead.
pub(crate) fn install(directives: &str) {
    let mut parsed = parse_directives(directives);
    if parsed.is_empty() {
        parsed = parse_directives(DEFAULT_LOG_DIRECTIVES);
    }
    let filter = parsed
        .into_iter()
        .fold(EnvFilter::from_default_env(), EnvFilter::add_directive);
    // A subscriber installed by the host application takes precedence.
    let _ = fmt().with_env_filter(filter).try_init();
}

fn parse_directives(raw: &str) -> Vec<Directive> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect()
}
