//! HTTP front end for the upload handler
//!
//! A single `tiny_http::Server` shared by a fixed pool of worker threads.
//! Each worker blocks in `recv`, handles one request to completion and goes
//! back for the next.

use std::io::Read;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server};

use super::handler::{UploadHandler, UploadOutcome};
use super::UploadError;
use crate::config::ServerConfig;

/// Errors that prevent the listener from starting
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to listen on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Failed to start listener worker: {0}")]
    Spawn(#[from] std::io::Error),
}

struct Routes {
    upload_path: String,
    handler: UploadHandler,
}

/// Running upload listener
pub struct Listener {
    server: Arc<Server>,
    workers: Vec<JoinHandle<()>>,
    stopping: Arc<AtomicBool>,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind the configured address and start the worker pool
    pub fn bind(config: &ServerConfig, handler: UploadHandler) -> Result<Self, ServerError> {
        let addr = format!("{}:{}", config.bind_address, config.port);
        let server = Server::http(addr.as_str()).map_err(|e| ServerError::Bind {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;
        let local_addr = server.server_addr().to_ip().ok_or_else(|| ServerError::Bind {
            addr: addr.clone(),
            reason: "not an IP socket".to_string(),
        })?;

        let server = Arc::new(server);
        let stopping = Arc::new(AtomicBool::new(false));
        let routes = Arc::new(Routes {
            upload_path: config.upload_path.clone(),
            handler,
        });

        let mut listener = Self {
            server,
            workers: Vec::new(),
            stopping,
            local_addr,
        };
        for id in 0..config.workers.max(1) {
            let server = Arc::clone(&listener.server);
            let stopping = Arc::clone(&listener.stopping);
            let routes = Arc::clone(&routes);
            let worker = thread::Builder::new()
                .name(format!("upload-worker-{}", id))
                .spawn(move || worker_loop(&server, &stopping, &routes))?;
            listener.workers.push(worker);
        }

        log::info!(
            "Listening on {} ({} worker(s)), uploads go to POST {}",
            local_addr,
            listener.workers.len(),
            config.upload_path
        );
        Ok(listener)
    }

    /// Address actually bound, useful when the configured port is 0
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting requests and wait for the workers to finish
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        // Each unblock releases exactly one thread waiting in recv.
        for _ in &self.workers {
            self.server.unblock();
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("Upload worker panicked");
            }
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop();
        }
    }
}

fn worker_loop(server: &Server, stopping: &AtomicBool, routes: &Routes) {
    loop {
        match server.recv() {
            Ok(request) => handle_request(routes, request),
            Err(_) if stopping.load(Ordering::SeqCst) => break,
            Err(e) => log::warn!("Failed to accept connection: {}", e),
        }
    }
}

fn handle_request(routes: &Routes, mut request: Request) {
    let method = request.method().clone();
    let path = request.url().split('?').next().unwrap_or_default().to_string();
    log::debug!("{} {} from {:?}", method, path, request.remote_addr());

    let outcome = if path != routes.upload_path {
        UploadOutcome::not_found(&path)
    } else if method != Method::Post {
        UploadOutcome::method_not_allowed(&method.to_string())
    } else {
        let mut body = Vec::new();
        match request.as_reader().read_to_end(&mut body) {
            Ok(_) => routes.handler.receive(&body),
            Err(e) => routes.handler.reject(UploadError::Body(e)),
        }
    };

    if let Err(e) = request.respond(json_response(&outcome)) {
        log::warn!("Failed to send response for {} {}: {}", method, path, e);
    }
}

fn json_response(outcome: &UploadOutcome) -> Response<std::io::Cursor<Vec<u8>>> {
    let body = serde_json::to_string(&outcome.response)
        .unwrap_or_else(|_| r#"{"status":"error","msg":"response encoding failed"}"#.to_string());
    let mut response = Response::from_data(body.into_bytes()).with_status_code(outcome.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        response.add_header(header);
    }
    response
}
