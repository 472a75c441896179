use std::hint::black_box;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use aio_http::codec::{ConnectionMode, HttpParser, RequestParser, ResponseHeadEncoder};
use aio_http::handler::make_handler;
use aio_http::server::{Server, SessionConfig};
use aio_http::session::{Session, Step};
use aio_http::transport::{Completion, Transport};
use bytes::{Bytes, BytesMut};
use criterion::{Criterion, criterion_group, criterion_main};
use http::StatusCode;

// Mock transport completing every operation immediately
#[derive(Debug, Default)]
struct MockTransport {
    receive: Option<(BytesMut, usize)>,
    sent: usize,
}

impl Transport for MockTransport {
    fn async_receive(&mut self, buf: BytesMut, limit: usize) -> io::Result<()> {
        self.receive = Some((buf, limit));
        Ok(())
    }

    fn async_send_vectored(&mut self, bufs: [Bytes; 2]) -> io::Result<()> {
        self.sent = bufs.iter().map(Bytes::len).sum();
        Ok(())
    }
}

const REQUEST: &[u8] = b"GET / HTTP/1.1\r\nHost: localhost\r\nUser-Agent: bench\r\n\r\n";

fn bench_request_parser(c: &mut Criterion) {
    c.bench_function("parse_simple_request", |b| {
        let mut parser = HttpParser::default();
        b.iter(|| {
            parser.reset();
            let mut bytes = BytesMut::from(REQUEST);
            black_box(parser.feed(&mut bytes).unwrap());
        });
    });
}

fn bench_head_encoder(c: &mut Criterion) {
    let encoder = ResponseHeadEncoder::new("aio-http", ConnectionMode::KeepAlive { timeout: Duration::from_secs(5), max: 100 });

    c.bench_function("encode_response_head", |b| {
        b.iter(|| {
            let mut bytes = BytesMut::new();
            encoder.encode(StatusCode::OK, b"Content-Type: text/plain\r\n", 12, &mut bytes);
            black_box(bytes);
        });
    });
}

fn bench_session_cycle(c: &mut Criterion) {
    let handler = make_handler(|_method, _uri, mut exchange| {
        if exchange.set_content_type("text/plain").is_err() {
            return exchange.send(StatusCode::INTERNAL_SERVER_ERROR, "");
        }
        exchange.send(StatusCode::OK, "Hello World!")
    });
    let server = Arc::new(Server::with_handler(SessionConfig::default().with_max_requests(usize::MAX), handler));
    let peer: SocketAddr = "127.0.0.1:8080".parse().unwrap();

    c.bench_function("keep_alive_cycle", |b| {
        let mut session = Some(Session::create(&server, MockTransport::default(), HttpParser::default(), peer).unwrap());
        b.iter(|| {
            let mut current = session.take().unwrap();
            let (mut buf, _) = current.transport_mut().receive.take().unwrap();
            buf.extend_from_slice(REQUEST);

            let Step::Continue(next) = current.on_completion(Completion::Received { buf, result: Ok(REQUEST.len()) }) else {
                panic!("session closed while receiving");
            };
            let sent = next.transport().sent;
            let Step::Continue(next) = next.on_completion(Completion::Sent { result: Ok(sent) }) else {
                panic!("session closed after sending");
            };
            session = Some(black_box(next));
        });
    });
}

criterion_group!(benches, bench_request_parser, bench_head_encoder, bench_session_cycle);
criterion_main!(benches);
