//! ---
//! ens_section: "11-testing"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Line-protocol server double."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// TCP server greeting every connection with fixed bytes, like a Telnet daemon
/// printing its shell prompt.
#[derive(Debug)]
pub struct PromptServer {
    port: u16,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl PromptServer {
    /// Listen on `127.0.0.1` and send `greeting` to each client.
    pub async fn spawn(greeting: impl Into<Vec<u8>>) -> io::Result<Self> {
        let greeting: Vec<u8> = greeting.into();
        let greeting: Arc<[u8]> = greeting.into();
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();
        let task = tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let greeting = greeting.clone();
                tokio::spawn(async move {
                    if socket.write_all(&greeting).await.is_err() {
                        return;
                    }
                    let mut sink = [0u8; 256];
                    while matches!(socket.read(&mut sink).await, Ok(read) if read > 0) {}
                });
            }
        });
        Ok(Self {
            port,
            connections,
            task,
        })
    }

    /// Port the server listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of accepted connections.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for PromptServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
