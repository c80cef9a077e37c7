use futures::future;
use hyper::{Body, Request, Response};
use prometheus_client::registry::Registry;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::watch;
use tracing::{info, instrument};

const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

#[instrument(skip(ready, prom, drain))]
pub async fn serve(
    addr: SocketAddr,
    ready: watch::Receiver<bool>,
    prom: Arc<Registry>,
    drain: drain::Watch,
) -> Result<(), hyper::Error> {
    let server =
        hyper::server::Server::try_bind(&addr)?.serve(hyper::service::make_service_fn(move |_conn| {
            let ready = ready.clone();
            let prom = prom.clone();
            future::ok::<_, hyper::Error>(hyper::service::service_fn(
                move |req: Request<Body>| future::ok::<_, hyper::Error>(handle(&ready, &prom, req)),
            ))
        }));
    let addr = server.local_addr();
    info!(%addr, "HTTP admin server listening");
    server
        .with_graceful_shutdown(async move {
            drop(drain.signaled().await);
        })
        .await
}

fn handle(ready: &watch::Receiver<bool>, prom: &Registry, req: Request<Body>) -> Response<Body> {
    if !matches!(*req.method(), hyper::Method::GET | hyper::Method::HEAD) {
        return Response::builder()
            .status(hyper::StatusCode::METHOD_NOT_ALLOWED)
            .body(Body::default())
            .unwrap();
    }

    match req.uri().path() {
        "/live" => text(hyper::StatusCode::OK, "live\n"),
        "/ready" => {
            if *ready.borrow() {
                text(hyper::StatusCode::OK, "ready\n")
            } else {
                text(hyper::StatusCode::INTERNAL_SERVER_ERROR, "not ready\n")
            }
        }
        "/metrics" => handle_metrics(prom),
        _ => Response::builder()
            .status(hyper::StatusCode::NOT_FOUND)
            .body(Body::default())
            .unwrap(),
    }
}

fn handle_metrics(prom: &Registry) -> Response<Body> {
    let mut buf = String::new();
    if let Err(error) = prometheus_client::encoding::text::encode(&mut buf, prom) {
        tracing::warn!(%error, "Failed to encode metrics");
        return Response::builder()
            .status(hyper::StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::default())
            .unwrap();
    }
    Response::builder()
        .status(hyper::StatusCode::OK)
        .header(hyper::header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)
        .body(buf.into())
        .unwrap()
}

fn text(status: hyper::StatusCode, body: &'static str) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(hyper::header::CONTENT_TYPE, "text/plain")
        .body(body.into())
        .unwrap()
}
