//! Process-wide server state
//!
//! Owns the notifier bridge and the running listener. Built once in `main`
//! and kept alive until the window closes.

use std::net::SocketAddr;

use crate::bridge::NotifierBridge;
use crate::config::ServerConfig;
use crate::listener::{BatchStore, Listener, ServerError, UploadHandler};

pub struct ServerContext {
    bridge: NotifierBridge,
    listener: Listener,
}

impl ServerContext {
    /// Create the output directory and start listening.
    ///
    /// Lines about uploads are pushed into `bridge`; the caller keeps a
    /// clone to drain them.
    pub fn start(config: &ServerConfig, bridge: NotifierBridge) -> Result<Self, ServerError> {
        let store = BatchStore::open(&config.output_dir).map_err(|source| ServerError::OutputDir {
            path: config.output_dir.clone(),
            source,
        })?;
        log::info!("Saving uploads to {}", store.dir().display());

        let handler = UploadHandler::new(store, bridge.clone());
        let listener = Listener::bind(config, handler)?;
        Ok(Self { bridge, listener })
    }

    #[cfg(test)]
    pub(crate) fn bridge(&self) -> &NotifierBridge {
        &self.bridge
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn shutdown(self) {
        self.listener.shutdown();
    }
}
