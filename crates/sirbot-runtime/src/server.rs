//! HTTP listener for the bot's router.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{RuntimeError, RuntimeResult};

/// A running listener. Dropping it cancels the listener without waiting.
#[derive(Debug)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// The address actually bound (useful with port `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits for in-flight requests.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            error!(error = %e, "HTTP listener task failed");
        }
        info!(addr = %self.local_addr, "HTTP listener stopped");
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Binds `addr` and serves `router` in a background task.
pub async fn serve(addr: &str, router: Router) -> RuntimeResult<ListenerHandle> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| RuntimeError::Bind {
            addr: addr.to_owned(),
            source,
        })?;
    let local_addr = listener.local_addr()?;
    let shutdown = CancellationToken::new();

    info!(addr = %local_addr, "HTTP listener started");

    let token = shutdown.clone();
    let task = tokio::spawn(async move {
        let server = axum::serve(listener, router).with_graceful_shutdown(token.cancelled_owned());
        if let Err(e) = server.await {
            error!(error = %e, "HTTP server error");
        }
    });

    Ok(ListenerHandle {
        local_addr,
        shutdown,
        task: Some(task),
    })
}

#[cfg(test)]
mod tests {
    use axum::routing::get;

    use super::*;

    #[tokio::test]
    async fn test_serve_on_ephemeral_port() {
        let router = Router::new().route("/", get(|| async { "ok" }));
        let handle = serve("127.0.0.1:0", router).await.unwrap();
        assert_ne!(handle.local_addr().port(), 0);

        let stream = tokio::net::TcpStream::connect(handle.local_addr()).await;
        assert!(stream.is_ok());
        drop(stream);

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_bind_error() {
        let first = serve("127.0.0.1:0", Router::new()).await.unwrap();
        let addr = first.local_addr().to_string();
        let second = serve(&addr, Router::new()).await;
        assert!(matches!(second, Err(RuntimeError::Bind { .. })));
        first.stop().await;
    }
}
