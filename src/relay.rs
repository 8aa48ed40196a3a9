//! Endpoint candidates and the URL conventions of the public CORS relays.
//!
//! A candidate is either the service itself (`direct`) or a relay that
//! forwards to it. Relays disagree on how the target URL is passed:
//! - `encoded-query`: `base + "?url=" + percent-encoded target`
//! - `concatenate`: `base + target`, verbatim

use serde::{Deserialize, Serialize};

/// Reserved candidate name for calling the service without a relay.
pub const DIRECT: &str = "direct";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelayConvention {
    Direct,
    EncodedQuery,
    Concatenate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCandidate {
    pub name: String,
    pub convention: RelayConvention,
    pub base_url: String,
}

impl EndpointCandidate {
    pub fn direct() -> Self {
        Self {
            name: DIRECT.to_string(),
            convention: RelayConvention::Direct,
            base_url: String::new(),
        }
    }

    pub fn relay(name: &str, base_url: &str, convention: RelayConvention) -> Self {
        Self {
            name: name.to_string(),
            convention,
            base_url: base_url.to_string(),
        }
    }

    pub fn requires_proxy_encoding(&self) -> bool {
        self.convention != RelayConvention::Direct
    }

    /// The URL actually requested when this candidate carries `target_url`.
    pub fn resolve(&self, target_url: &str) -> String {
        match self.convention {
            RelayConvention::Direct => target_url.to_string(),
            RelayConvention::EncodedQuery => {
                format!("{}?url={}", self.base_url, urlencoding::encode(target_url))
            }
            RelayConvention::Concatenate => format!("{}{}", self.base_url, target_url),
        }
    }
}
