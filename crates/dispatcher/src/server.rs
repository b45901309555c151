//! BroadcastServer - accepts websocket clients and registers each one

use std::net::SocketAddr;

use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, instrument, warn};

use crate::distributor::Distributor;
use crate::error::DispatcherError;
use crate::subscribers::WebSocketSubscriber;

/// Default listen address
pub const DEFAULT_BROADCAST_ADDR: &str = "127.0.0.1:5678";

/// Running broadcast server
#[derive(Debug)]
pub struct BroadcastServer {
    name: String,
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl BroadcastServer {
    /// Bind and start accepting clients
    ///
    /// Each client becomes a subscriber of `distributor` with a queue of
    /// `queue_capacity`, and is unregistered when it disconnects.
    #[instrument(name = "broadcast_server_bind", skip(distributor))]
    pub async fn bind(
        name: &str,
        addr: &str,
        distributor: Distributor,
        queue_capacity: usize,
    ) -> Result<Self, DispatcherError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| DispatcherError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!(server = %name, %local_addr, "Broadcast server listening");

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(accept_loop(
            name.to_string(),
            listener,
            distributor,
            queue_capacity,
            shutdown_rx,
        ));

        Ok(Self {
            name: name.to_string(),
            local_addr,
            shutdown,
            task,
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting clients and disconnect the connected ones
    ///
    /// Returns once every client task has unregistered its subscriber.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        if let Err(e) = self.task.await {
            error!(server = %self.name, error = ?e, "Accept task panicked");
        }
        debug!(server = %self.name, "Broadcast server stopped");
    }
}

async fn accept_loop(
    name: String,
    listener: TcpListener,
    distributor: Distributor,
    queue_capacity: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut client_seq: u64 = 0;
    let mut clients = JoinSet::new();
    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            Some(joined) = clients.join_next(), if !clients.is_empty() => {
                if let Err(e) = joined {
                    error!(server = %name, error = ?e, "Client task panicked");
                }
                continue;
            }
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                client_seq += 1;
                let client_name = format!("{name}#{client_seq}");
                clients.spawn(serve_client(
                    client_name,
                    stream,
                    peer,
                    distributor.clone(),
                    queue_capacity,
                    shutdown.clone(),
                ));
            }
            Err(e) => warn!(server = %name, error = %e, "Accept failed"),
        }
    }

    debug!(server = %name, clients = clients.len(), "Disconnecting clients");
    while let Some(joined) = clients.join_next().await {
        if let Err(e) = joined {
            error!(server = %name, error = ?e, "Client task panicked");
        }
    }
}

async fn serve_client(
    name: String,
    stream: TcpStream,
    peer: SocketAddr,
    distributor: Distributor,
    queue_capacity: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let handshake = tokio::select! {
        biased;
        _ = shutdown.changed() => return,
        handshake = tokio_tungstenite::accept_async(stream) => handshake,
    };
    let ws = match handshake {
        Ok(ws) => ws,
        Err(e) => {
            warn!(client = %name, %peer, error = %e, "Websocket handshake failed");
            return;
        }
    };

    let (sink, mut incoming) = ws.split();
    let id = distributor.register_with_capacity(WebSocketSubscriber::new(&name, sink), queue_capacity);
    info!(client = %name, %peer, %id, "Broadcast client connected");

    loop {
        let message = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            message = incoming.next() => match message {
                Some(message) => message,
                None => break,
            },
        };
        match message {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(client = %name, error = %e, "Client read failed");
                break;
            }
        }
    }

    if distributor.unregister(id) {
        info!(client = %name, %peer, "Broadcast client disconnected");
    }
}
