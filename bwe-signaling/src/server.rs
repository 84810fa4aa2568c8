use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use log::{error, info};
use shared::error::{Error, Result};
use tokio::task::JoinHandle;

use crate::description::{IceCandidate, SessionDescription};
use crate::endpoint::SignalingEndpoint;

/// Binds the signaling listener and serves it on a background task.
///
/// Returns the bound address (useful when binding port 0) and the task
/// handle; abort the handle to stop serving.
pub fn serve(
    endpoint: Arc<SignalingEndpoint>,
    addr: SocketAddr,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let builder = Server::try_bind(&addr).map_err(|e| Error::ErrSetup(e.to_string()))?;
    let make_svc = make_service_fn(move |_| {
        let endpoint = Arc::clone(&endpoint);
        async move {
            Ok::<_, hyper::Error>(service_fn(move |req| {
                remote_handler(req, Arc::clone(&endpoint))
            }))
        }
    });
    let server = builder.serve(make_svc);
    let local_addr = server.local_addr();
    info!("signaling listening on http://{local_addr}");

    let handle = tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("signaling server error: {e}");
        }
    });
    Ok((local_addr, handle))
}

// HTTP Listener to get the session description and ICE candidates from the remote peer
async fn remote_handler(
    req: Request<Body>,
    endpoint: Arc<SignalingEndpoint>,
) -> std::result::Result<Response<Body>, hyper::Error> {
    match (req.method(), req.uri().path()) {
        (&Method::POST, "/candidate") => {
            let body = hyper::body::to_bytes(req.into_body()).await?;
            let result = match IceCandidate::from_body(&body) {
                Ok(candidate) => endpoint.handle_remote_candidate(candidate).await,
                Err(e) => Err(e),
            };
            Ok(respond(&endpoint, result))
        }

        (&Method::POST, "/sdp") => {
            let body = hyper::body::to_bytes(req.into_body()).await?;
            let result = match SessionDescription::from_json(&body) {
                Ok(desc) => endpoint.handle_remote_description(desc).await,
                Err(e) => Err(e),
            };
            Ok(respond(&endpoint, result))
        }

        _ => {
            let mut not_found = Response::default();
            *not_found.status_mut() = StatusCode::NOT_FOUND;
            Ok(not_found)
        }
    }
}

fn respond(endpoint: &SignalingEndpoint, result: Result<()>) -> Response<Body> {
    let err = match result {
        Ok(()) => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::OK;
            return response;
        }
        Err(err) => err,
    };

    let status = match err {
        Error::ErrMalformedDescription(_)
        | Error::ErrMalformedCandidate(_)
        | Error::ErrUnexpectedDescription(_) => StatusCode::BAD_REQUEST,
        Error::ErrEndpointClosed => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!("signaling request failed: {err}");

    let mut response = Response::new(Body::from(err.to_string()));
    *response.status_mut() = status;
    endpoint.report_fatal(err);
    response
}
