use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The port the controller serves its local API on.
pub const DEFAULT_PORT: u16 = 8444;

/// Connection settings for a controller.
///
/// Deserializable so that front-ends can keep it in a file:
///
/// ```yaml
/// controller_ip: 192.168.0.10
/// client_cert: /etc/bshlocal/client-cert.pem
/// client_key: /etc/bshlocal/client-key.pem
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientConfig {
    pub controller_ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// PEM encoded client certificate registered with the controller.
    pub client_cert: PathBuf,
    /// PEM encoded private key belonging to `client_cert`.
    pub client_key: PathBuf,
    /**
    Skip verification of the controller's server certificate.

    The controller presents a self-signed certificate, so this is on by default. The client
    still authenticates itself with its own certificate; only the server side is not verified.
     */
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
    /// Overall request timeout. Must be longer than the long-poll wait, or polls time out.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_accept_invalid_certs() -> bool {
    true
}

impl ClientConfig {
    pub fn new(
        controller_ip: impl Into<String>,
        client_cert: impl Into<PathBuf>,
        client_key: impl Into<PathBuf>,
    ) -> Self {
        ClientConfig {
            controller_ip: controller_ip.into(),
            port: DEFAULT_PORT,
            client_cert: client_cert.into(),
            client_key: client_key.into(),
            accept_invalid_certs: default_accept_invalid_certs(),
            timeout_secs: None,
        }
    }

    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.controller_ip, self.port)
    }
}
