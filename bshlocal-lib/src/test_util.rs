use reqwest::Client;

use crate::api::BshLocalApi;
use crate::transport::Transport;

/// A client talking plain HTTP to a mock server.
pub(crate) fn api(server: &mockito::ServerGuard) -> BshLocalApi {
    BshLocalApi::from_transport(Transport::from_client(server.url(), Client::new()))
}

/// A client pointing at nothing, for tests that never touch the network.
pub(crate) fn offline_api() -> BshLocalApi {
    BshLocalApi::from_transport(Transport::from_client("http://127.0.0.1:9", Client::new()))
}
