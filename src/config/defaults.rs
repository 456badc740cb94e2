//! Named defaults shared across modules.

/// `WWW-Authenticate` realm used when a mapping's `basic_auth` or the
/// management API's own credential check is unconfigured with an explicit
/// realm.
pub const DEFAULT_REALM: &str = "Authorization Required";

/// Listen set written by `-i` when the config file does not yet exist.
pub const DEFAULT_INIT_LISTEN: &str = ":80";

/// Interval between OCSP stapler ticks.
pub const OCSP_REFRESH_INTERVAL_SECS: u64 = 60;

/// Staples within this window of `NextUpdate` are treated as stale and
/// refreshed proactively.
pub const OCSP_STALE_WINDOW_SECS: i64 = 10 * 60;

/// Per-request OCSP responder timeout.
pub const OCSP_REQUEST_TIMEOUT_SECS: u64 = 3;

/// Max in-flight OCSP refresh requests per tick.
pub const OCSP_MAX_CONCURRENCY: usize = 10;

/// Upstream connection pool tuning, shared by the HTTP/1.1+h2 and HTTP/3
/// reverse-proxy clients.
pub const UPSTREAM_DIAL_TIMEOUT_SECS: u64 = 5;
pub const UPSTREAM_KEEPALIVE_SECS: u64 = 30;
pub const UPSTREAM_IDLE_TIMEOUT_SECS: u64 = 90;
pub const UPSTREAM_TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 10;
pub const UPSTREAM_EXPECT_CONTINUE_TIMEOUT_SECS: u64 = 1;
