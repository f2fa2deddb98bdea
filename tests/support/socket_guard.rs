//! Guard for tests that need a local listening socket.
//!
//! Sandboxed environments sometimes forbid binding sockets entirely. Tests
//! that rely on a mock HTTP server call [`start_mock_server_or_skip`] and
//! bail out quietly when the environment cannot support one, instead of
//! failing the whole suite.

use wiremock::MockServer;

/// Starts a wiremock server, or returns `None` when sockets are unavailable.
///
/// Callers should early-return on `None`:
///
/// ```ignore
/// let Some(mock_server) = start_mock_server_or_skip().await else {
///     return;
/// };
/// ```
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    match std::net::TcpListener::bind(("127.0.0.1", 0)) {
        Ok(probe) => {
            drop(probe);
            Some(MockServer::start().await)
        }
        Err(error) => {
            eprintln!("skipping test: cannot bind local sockets here ({error})");
            None
        }
    }
}
