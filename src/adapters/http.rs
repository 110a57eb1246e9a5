//! HTTP adapter: ESP-IDF httpd front end for the request bridge.
//!
//! Handlers run in the httpd task.  They only route the request and wait on
//! the [`RequestBridge`]; the control loop does the actual work.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use esp_idf_svc::http::Method;
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::io::Write;
use log::{info, warn};

use crate::api::bridge::RequestBridge;
use crate::api::{parse_request, ApiResponse, ROUTES};

const HTTP_PORT: u16 = 80;
const HTTPD_STACK_SIZE: usize = 10 * 1024;

/// Start the server and register one GET handler per route.  The returned
/// server must be kept alive for the handlers to stay registered.
pub fn start_server(
    bridge: Arc<RequestBridge>,
    reply_timeout: Duration,
) -> Result<EspHttpServer<'static>> {
    let mut server = EspHttpServer::new(&Configuration {
        http_port: HTTP_PORT,
        stack_size: HTTPD_STACK_SIZE,
        ..Default::default()
    })?;

    for path in ROUTES {
        let bridge = Arc::clone(&bridge);
        server.fn_handler::<anyhow::Error, _>(path, Method::Get, move |req| {
            let response = match parse_request(req.uri()) {
                Ok(request) => bridge.submit(request, reply_timeout),
                Err(e) => {
                    warn!("{}: {e}", req.uri());
                    ApiResponse::from_error(e)
                }
            };
            let headers = [("Content-Type", response.content_type)];
            let mut resp = req.into_response(response.status, None, &headers)?;
            resp.write_all(response.body.as_bytes())?;
            Ok(())
        })?;
    }

    info!("HTTP server listening on port {HTTP_PORT} ({} routes)", ROUTES.len());
    Ok(server)
}
