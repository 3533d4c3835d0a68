//! Minimal `/metrics` endpoint exposing the process-wide Prometheus
//! registry, built directly on `hyper` since the teacher's own metrics
//! exposition (`actix-web` + `prometheus::TextEncoder`) isn't in this
//! crate's dependency stack.

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use owo_colors::OwoColorize;
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub async fn run(addr: SocketAddr, shutdown: CancellationToken) {
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("{}", format!("metrics server: failed to bind {addr}: {e}").red());
            return;
        }
    };
    println!("{}", format!("metrics server listening on {addr}").green());

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            accepted = listener.accept() => {
                let Ok((stream, _)) = accepted else { continue };
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(handle);
                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        eprintln!("metrics server: connection error: {e}");
                    }
                });
            }
        }
    }
}

async fn handle(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, std::convert::Infallible> {
    if req.uri().path() != "/metrics" {
        return Ok(Response::builder().status(404).body(Full::new(Bytes::new())).unwrap());
    }
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer).expect("encode metrics");
    Ok(Response::new(Full::new(Bytes::from(buffer))))
}
