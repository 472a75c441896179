use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use tokio::net::TcpStream;
use tokio::time;
use tracing::{info, trace, warn};

use crate::codec::HttpParser;
use crate::protocol::{CloseReason, SessionError, SessionInitError};
use crate::server::Server;
use crate::session::{Phase, Session, Step};
use crate::transport::TokioTransport;

/// One accepted TCP connection, served by a [`Session`] until it closes.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use aio_http::connection::HttpConnection;
/// use aio_http::server::{Server, SessionConfig};
/// use tokio::net::TcpListener;
///
/// # async fn run() -> std::io::Result<()> {
/// let server = Arc::new(Server::new(SessionConfig::default()));
/// let listener = TcpListener::bind("127.0.0.1:8080").await?;
/// let (stream, peer) = listener.accept().await?;
///
/// tokio::spawn(HttpConnection::new(stream, peer).serve(server));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpConnection {
    transport: TokioTransport,
    peer: SocketAddr,
}

impl HttpConnection {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { transport: TokioTransport::new(stream), peer }
    }

    /// Wraps a socket accepted outside of tokio, switching it to non-blocking mode.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_std(stream: std::net::TcpStream) -> Result<Self, SessionInitError> {
        let peer = stream.peer_addr().map_err(SessionInitError::allocation)?;
        let transport = TokioTransport::from_std(stream).map_err(SessionInitError::allocation)?;
        Ok(Self { transport, peer })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Serves the connection until its session closes and returns why.
    ///
    /// Only the session keeps a reference to `server`, so dropping every other
    /// `Arc<Server>` makes this connection close at its next request.
    pub async fn serve(self, server: Arc<Server>) -> Result<CloseReason, SessionInitError> {
        let config = server.config().clone();
        let parser = HttpParser::new(config.buffer_capacity(), config.max_body_bytes());
        let mut session = Session::create(&server, self.transport, parser, self.peer)?;
        drop(server);

        let idle_timeout = config.keep_alive_timeout();
        let reason = loop {
            if session.is_awaiting_response() {
                warn!(peer = %self.peer, "request left deferred, answering with 500");
                match session.exchange() {
                    Ok(exchange) => {
                        if exchange.send(StatusCode::INTERNAL_SERVER_ERROR, Bytes::new()).is_failed() {
                            warn!(peer = %self.peer, "500 for deferred request could not be issued");
                        }
                    }
                    Err(e) => {
                        warn!(peer = %self.peer, cause = %e, "deferred request cannot be answered");
                        break session.teardown(SessionError::Stalled { state: Phase::Dispatching.as_str() }.into());
                    }
                }
                session = match session.settle() {
                    Step::Continue(session) => session,
                    Step::Closed(reason) => break reason,
                };
                continue;
            }

            let phase = session.phase();
            let completion = if phase == Phase::Receiving {
                match time::timeout(idle_timeout, session.transport_mut().next_completion()).await {
                    Ok(completion) => completion,
                    Err(_) => break session.teardown(CloseReason::IdleTimeout),
                }
            } else {
                session.transport_mut().next_completion().await
            };

            let Some(completion) = completion else {
                break session.teardown(SessionError::Stalled { state: phase.as_str() }.into());
            };
            trace!(peer = %self.peer, phase = phase.as_str(), "completion ready");

            session = match session.on_completion(completion) {
                Step::Continue(session) => session,
                Step::Closed(reason) => break reason,
            };
        };

        info!(peer = %self.peer, %reason, "connection shutdown");
        Ok(reason)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::handler::make_handler;
    use crate::server::SessionConfig;

    async fn connect(server: &Arc<Server>) -> (TcpStream, JoinHandle<Result<CloseReason, SessionInitError>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (stream, peer) = listener.accept().await.unwrap();
        (client, tokio::spawn(HttpConnection::new(stream, peer).serve(Arc::clone(server))))
    }

    async fn read_response(client: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = client.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before the response was complete");
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8(buf.clone()).unwrap();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .find_map(|line| line.strip_prefix("Content-Length: "))
                    .map(|value| value.parse::<usize>().unwrap())
                    .unwrap();
                if text.len() >= head_end + 4 + length {
                    return text;
                }
            }
        }
    }

    fn echo_server(config: SessionConfig) -> Arc<Server> {
        let handler = make_handler(|_method, uri, exchange| exchange.send(StatusCode::OK, uri.path().to_string()));
        Arc::new(Server::with_handler(config, handler))
    }

    #[tokio::test]
    async fn serves_keep_alive_requests() {
        let server = echo_server(SessionConfig::default());
        let (mut client, handle) = connect(&server).await;

        client.write_all(b"GET /first HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
        let response = read_response(&mut client).await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Connection: keep-alive\r\n"));
        assert!(response.ends_with("\r\n\r\n/first"));

        client.write_all(b"GET /second HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
        assert!(read_response(&mut client).await.ends_with("\r\n\r\n/second"));

        client.shutdown().await.unwrap();
        assert!(matches!(handle.await.unwrap(), Ok(CloseReason::PeerClosed)));
    }

    #[tokio::test]
    async fn serves_connection_from_std_socket() {
        let server = echo_server(SessionConfig::default());
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (stream, peer) = listener.accept().unwrap();

        let connection = HttpConnection::from_std(stream).unwrap();
        assert_eq!(connection.peer_addr(), peer);
        let handle = tokio::spawn(connection.serve(Arc::clone(&server)));

        client.write_all(b"GET /std HTTP/1.1\r\nConnection: close\r\n\r\n").await.unwrap();
        let response = read_response(&mut client).await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("\r\n\r\n/std"));
        assert!(matches!(handle.await.unwrap(), Ok(CloseReason::Completed)));
    }

    #[tokio::test]
    async fn closes_after_connection_close() {
        let server = echo_server(SessionConfig::default());
        let (mut client, handle) = connect(&server).await;

        client.write_all(b"GET /bye HTTP/1.1\r\nConnection: close\r\n\r\n").await.unwrap();
        let response = read_response(&mut client).await;
        assert!(response.contains("Connection: close\r\n"));

        assert!(matches!(handle.await.unwrap(), Ok(CloseReason::Completed)));
        let mut rest = Vec::new();
        assert_eq!(client.read_to_end(&mut rest).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn idle_connection_times_out() {
        let config = SessionConfig::default().with_keep_alive_timeout(Duration::from_millis(50));
        let server = echo_server(config);
        let (mut client, handle) = connect(&server).await;

        assert!(matches!(handle.await.unwrap(), Ok(CloseReason::IdleTimeout)));
        let mut rest = Vec::new();
        assert_eq!(client.read_to_end(&mut rest).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deferred_request_gets_server_error() {
        let handler = make_handler(|_method, _uri, exchange| exchange.defer());
        let server = Arc::new(Server::with_handler(SessionConfig::default(), handler));
        let (mut client, _handle) = connect(&server).await;

        client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
        let response = read_response(&mut client).await;
        assert!(response.starts_with("HTTP/1.1 500 OK\r\n"));
        assert!(response.ends_with("Content-Length: 0\r\n\r\n"));
    }

    #[tokio::test]
    async fn dropped_server_closes_connection() {
        let server = echo_server(SessionConfig::default());
        let (mut client, handle) = connect(&server).await;
        drop(server);

        client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
        assert!(matches!(handle.await.unwrap(), Ok(CloseReason::ServerGone)));
    }
}
