// src/logging.rs

use tracing_subscriber::{fmt, EnvFilter};

/// Install a fmt subscriber filtered by `RUST_LOG`, or by `default_directives`
/// when the variable is unset. Returns false if a subscriber was already set.
pub fn init(default_directives: &str) -> bool {
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .try_init()
        .is_ok()
}

/// Route logs into the captured test output.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,census_batch=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Mask every `key=` query parameter so request URLs can be logged.
pub fn redact_key(url: &str) -> String {
    const KEY: &str = "key=";
    let mut out = String::with_capacity(url.len());
    let mut rest = url;
    let mut prev: Option<char> = None;
    while let Some(pos) = rest.find(KEY) {
        let before = rest[..pos].chars().next_back().or(prev);
        let start = pos + KEY.len();
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        prev = Some('=');
        if matches!(before, Some('?' | '&')) {
            let end = rest.find('&').unwrap_or(rest.len());
            out.push_str("***");
            rest = &rest[end..];
        }
    }
    out.push_str(rest);
    out
}
