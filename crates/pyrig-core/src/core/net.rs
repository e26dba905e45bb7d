use anyhow::{Context, Result};
use reqwest::blocking::Client;

use crate::config::{EnvSnapshot, NetworkConfig};

const PROXY_KEYS: &[&str] = &[
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
    "NO_PROXY",
    "no_proxy",
];

pub(crate) const USER_AGENT: &str = concat!("pyrig/", env!("CARGO_PKG_VERSION"));

/// Decide whether downloads should honor standard proxy environment variables.
///
/// Behavior:
/// - `PYRIG_KEEP_PROXIES=1/true/yes/on` forces proxies on.
/// - `PYRIG_KEEP_PROXIES=0/false/no/off/""` forces proxies off.
/// - If unset, proxies are enabled only when at least one proxy env var is set.
pub(crate) fn keep_proxies(snapshot: &EnvSnapshot) -> bool {
    match snapshot.var("PYRIG_KEEP_PROXIES") {
        Some(raw) => {
            let value = raw.trim().to_ascii_lowercase();
            !matches!(value.as_str(), "" | "0" | "false" | "no" | "off")
        }
        None => PROXY_KEYS.iter().any(|key| {
            snapshot
                .var(key)
                .is_some_and(|value| !value.trim().is_empty())
        }),
    }
}

/// Blocking client used for every artifact download.
///
/// # Errors
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_http_client(network: &NetworkConfig) -> Result<Client> {
    // reqwest's blocking client defaults to a 30s total timeout; large
    // toolchain archives need the transfer to run unbounded unless asked.
    let builder = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(network.timeout);
    let builder = if network.keep_proxies {
        builder
    } else {
        builder.no_proxy()
    };
    builder.build().context("failed to build HTTP client")
}
