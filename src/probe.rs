use std::time::Duration;

use crate::cmd;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Single HTTP reachability check run from the operator machine.
pub trait HealthProbe {
    /// `true` when `url` answers with a success status within
    /// `timeout`.
    fn probe(&self, url: &str, timeout: Duration) -> bool;
}

/// [`HealthProbe`] backed by `curl`.
pub struct CurlProbe;

impl HealthProbe for CurlProbe {
    fn probe(&self, url: &str, timeout: Duration) -> bool {
        let secs = timeout.as_secs().max(1).to_string();
        match cmd::run(
            "curl",
            &["-fsS", "-o", "/dev/null", "--max-time", &secs, url],
        ) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(%url, "probe failed: {e}");
                false
            }
        }
    }
}
