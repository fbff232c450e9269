// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server lifecycle.
//!
//! `Server::start` binds and spawns the HTTP server, or returns a handle to
//! the instance that is already running. The server shuts down gracefully
//! when `ServerHandle::stop` is called or the last handle is dropped.

use crate::routes::create_router;
use crate::AppState;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Owns the configuration needed to (re)start the HTTP server.
pub struct Server {
    state: Arc<AppState>,
    addr: SocketAddr,
    running: Mutex<Weak<Running>>,
}

struct Running {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<io::Result<()>>>>,
}

impl Running {
    fn is_stopping(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        if !self.is_stopping() {
            tracing::info!(address = %self.local_addr, "Last server handle dropped, shutting down");
            self.shutdown.send_replace(true);
        }
    }
}

/// Handle to a running server. Clones share the same instance.
#[derive(Clone)]
pub struct ServerHandle {
    inner: Arc<Running>,
}

impl Server {
    pub fn new(state: Arc<AppState>, addr: SocketAddr) -> Self {
        Self {
            state,
            addr,
            running: Mutex::new(Weak::new()),
        }
    }

    /// Start serving. Calling this while the server runs returns a handle to
    /// the existing instance instead of binding again.
    pub async fn start(&self) -> io::Result<ServerHandle> {
        let mut running = self.running.lock().await;

        if let Some(inner) = running.upgrade() {
            if !inner.is_stopping() {
                tracing::debug!(address = %inner.local_addr, "Server already running");
                return Ok(ServerHandle { inner });
            }
        }

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let app = create_router(self.state.clone());

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.wait_for(|stop| *stop).await;
                })
                .await
        });

        tracing::info!(address = %local_addr, "Server listening");

        let inner = Arc::new(Running {
            local_addr,
            shutdown,
            task: Mutex::new(Some(task)),
        });
        *running = Arc::downgrade(&inner);

        Ok(ServerHandle { inner })
    }
}

impl ServerHandle {
    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    pub fn is_running(&self) -> bool {
        !self.inner.is_stopping()
    }

    /// Stop accepting connections, drain in-flight requests and release the
    /// listener. Safe to call more than once.
    pub async fn stop(&self) -> io::Result<()> {
        self.inner.shutdown.send_replace(true);
        self.wait().await
    }

    /// Wait for the server task to finish.
    pub async fn wait(&self) -> io::Result<()> {
        let Some(task) = self.inner.task.lock().await.take() else {
            return Ok(());
        };

        let result = task.await.map_err(io::Error::other)?;
        tracing::info!(address = %self.inner.local_addr, "Server stopped");
        result
    }
}
