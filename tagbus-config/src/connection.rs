//! Connection and transport parameters.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Parameters for reaching a peer and moving frames.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ConnectionConfig {
    /// Peer address as `host:port`.
    #[serde(default = "default_endpoint")]
    #[validate(custom(function = validation::validate_endpoint))]
    pub endpoint: String,

    /// Upper bound on connection establishment.
    #[serde(default = "default_connect_timeout_ms")]
    #[validate(range(min = 1, max = 60000))]
    pub connect_timeout_ms: u64,

    /// Largest message accepted or produced, in bytes.
    #[serde(default = "default_max_frame_size")]
    #[validate(range(min = 64, max = 16777216))]
    pub max_frame_size: usize,

    /// Bytes read from the socket per non-blocking read attempt.
    #[serde(default = "default_read_chunk_size")]
    #[validate(range(min = 512, max = 1048576))]
    pub read_chunk_size: usize,
}

fn default_endpoint() -> String {
    "127.0.0.1:47758".into()
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_max_frame_size() -> usize {
    1024 * 1024
}

fn default_read_chunk_size() -> usize {
    8192
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_frame_size: default_max_frame_size(),
            read_chunk_size: default_read_chunk_size(),
        }
    }
}
