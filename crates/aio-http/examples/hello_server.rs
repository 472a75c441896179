use std::env;
use std::sync::Arc;

use aio_http::connection::HttpConnection;
use aio_http::handler::make_handler;
use aio_http::server::{Server, SessionConfig};
use http::{Method, StatusCode};
use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let addr = env::var("LISTEN").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let handler = make_handler(|method, uri, mut exchange| {
        if exchange.set_content_type(mime::TEXT_PLAIN_UTF_8).is_err() {
            return exchange.send(StatusCode::INTERNAL_SERVER_ERROR, "");
        }
        match uri.path() {
            "/" if *method == Method::GET || *method == Method::HEAD => exchange.send(StatusCode::OK, "Hello World!\r\n"),
            "/echo" if *method == Method::POST => {
                let body = exchange.content().to_vec();
                exchange.send(StatusCode::OK, body)
            }
            _ => exchange.send(StatusCode::NOT_FOUND, ""),
        }
    });
    let server = Arc::new(Server::with_handler(SessionConfig::default().with_server_name("hello-server"), handler));

    info!(%addr, "start listening");
    let tcp_listener = match TcpListener::bind(&addr).await {
        Ok(tcp_listener) => tcp_listener,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    loop {
        let (tcp_stream, peer) = match tcp_listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(e) = HttpConnection::new(tcp_stream, peer).serve(server).await {
                error!(%peer, cause = %e, "session could not start");
            }
        });
    }
}
