//! WebSocket bridge to the in-page client.
//!
//! The page side (`browser/bridge-client.user.js`) connects, says hello, and
//! then evaluates whatever code the server sends, replying with the result.
//! Console output and exceptions from the page are forwarded into `tracing`.

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use uuid::Uuid;

use crate::config::PollPolicy;
use crate::errors::FillError;
use crate::poll::poll_until;

type BridgeResult = Result<serde_json::Value, String>;
/// Eval id → the client it was sent to and the waiting caller.
type PendingMap = HashMap<String, (Uuid, oneshot::Sender<BridgeResult>)>;
type Pending = Arc<Mutex<PendingMap>>;
type Clients = Arc<Mutex<Vec<Client>>>;

#[derive(Debug, Serialize, Deserialize)]
struct EvalRequest {
    id: String,
    action: String,
    code: String,
    #[serde(default)]
    await_promise: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum BridgeIncoming {
    EvalResult {
        id: String,
        ok: bool,
        result: Option<serde_json::Value>,
        error: Option<String>,
    },
    Typed(TypedIncoming),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum TypedIncoming {
    #[serde(rename = "hello")]
    Hello {
        from: Option<String>,
        url: Option<String>,
    },
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "console_event")]
    ConsoleEvent {
        level: Option<String>,
        args: Option<serde_json::Value>,
    },
    #[serde(rename = "exception_event")]
    ExceptionEvent { details: Option<serde_json::Value> },
}

struct Client {
    id: Uuid,
    /// Page URL from the client's hello; `None` until it has said hello.
    url: Option<String>,
    sender: mpsc::UnboundedSender<Message>,
}

impl Client {
    fn serves(&self, page_filter: &str) -> bool {
        page_filter.is_empty()
            || self
                .url
                .as_deref()
                .is_some_and(|url| url.contains(page_filter))
    }
}

pub struct ExtensionBridge {
    server_task: JoinHandle<()>,
    local_addr: SocketAddr,
    clients: Clients,
    pending: Pending,
    /// Substring a client's page URL must contain to receive evals.
    page_filter: String,
}

impl Drop for ExtensionBridge {
    fn drop(&mut self) {
        self.server_task.abort();
    }
}

impl ExtensionBridge {
    /// Binds the WebSocket listener and starts accepting page clients.
    /// Evals go to the most recently connected page, whatever its URL.
    pub async fn start(addr: &str) -> Result<Arc<ExtensionBridge>, FillError> {
        Self::start_for_page(addr, "").await
    }

    /// Like [`start`](Self::start), but only pages whose URL contains
    /// `page_filter` receive evals. An empty filter accepts any page.
    pub async fn start_for_page(
        addr: &str,
        page_filter: &str,
    ) -> Result<Arc<ExtensionBridge>, FillError> {
        let listener = match TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::warn!(%addr, ?e, "Port in use, waiting 2 seconds and retrying once...");
                tokio::time::sleep(Duration::from_secs(2)).await;
                TcpListener::bind(addr)
                    .await
                    .map_err(|e| FillError::Bridge(format!("failed to bind {addr}: {e}")))?
            }
            Err(e) => return Err(FillError::Bridge(format!("failed to bind {addr}: {e}"))),
        };
        let local_addr = listener
            .local_addr()
            .map_err(|e| FillError::Bridge(format!("listener address: {e}")))?;
        tracing::info!(page_filter, "Extension bridge listening on {}", local_addr);

        let clients: Clients = Arc::new(Mutex::new(Vec::new()));
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let server_task = tokio::spawn(accept_loop(listener, clients.clone(), pending.clone()));

        Ok(Arc::new(ExtensionBridge {
            server_task,
            local_addr,
            clients,
            pending,
            page_filter: page_filter.to_string(),
        }))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether a page that may receive evals is connected.
    pub async fn is_client_connected(&self) -> bool {
        self.clients
            .lock()
            .await
            .iter()
            .any(|c| c.serves(&self.page_filter))
    }

    /// URLs of every connected page, in connection order. `None` for
    /// clients that have not said hello yet.
    pub async fn connected_pages(&self) -> Vec<Option<String>> {
        self.clients
            .lock()
            .await
            .iter()
            .map(|c| c.url.clone())
            .collect()
    }

    fn no_page(&self) -> String {
        if self.page_filter.is_empty() {
            "no page connected to the bridge".into()
        } else {
            format!("no page matching {:?} connected to the bridge", self.page_filter)
        }
    }

    /// Waits until a page that may receive evals is connected.
    pub async fn wait_for_client(&self, policy: &PollPolicy) -> Result<(), FillError> {
        if self.is_client_connected().await {
            return Ok(());
        }
        tracing::info!("Waiting for the page to connect to ws://{}...", self.local_addr);
        poll_until(policy, "extension client", || async {
            Ok(self.is_client_connected().await.then_some(()))
        })
        .await?
        .or_timeout("extension client")
        .map_err(|e| FillError::Bridge(format!("{}: {e}", self.no_page())))
    }

    /// Evaluates `code` in the most recently connected matching page and
    /// returns the result as a string (JSON text for non-string values).
    ///
    /// Fails with [`FillError::Bridge`] as soon as that page disconnects
    /// before replying.
    pub async fn eval(&self, code: &str, timeout: Duration) -> Result<String, FillError> {
        let id = Uuid::new_v4().to_string();
        let req = EvalRequest {
            id: id.clone(),
            action: "eval".into(),
            code: code.to_string(),
            await_promise: true,
        };
        let payload = serde_json::to_string(&req)
            .map_err(|e| FillError::Bridge(format!("bridge serialize: {e}")))?;

        let (tx, rx) = oneshot::channel::<BridgeResult>();

        // The clients lock is held until the request is queued, so a client
        // that disconnects meanwhile also drops this pending entry.
        {
            let clients = self.clients.lock().await;
            let Some(client) = clients.iter().rev().find(|c| c.serves(&self.page_filter)) else {
                return Err(FillError::Bridge(self.no_page()));
            };
            tracing::trace!(clients = clients.len(), client = %client.id, preview = %payload.chars().take(120).collect::<String>(), "Sending eval to page");
            self.pending
                .lock()
                .await
                .insert(id.clone(), (client.id, tx));
            if client.sender.send(Message::Text(payload)).is_err() {
                self.pending.lock().await.remove(&id);
                return Err(FillError::Bridge("failed to send eval to page".into()));
            }
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(val))) => Ok(match val {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
            Ok(Ok(Err(err))) => Err(FillError::Script(err)),
            Ok(Err(_canceled)) => Err(FillError::Bridge(
                "page disconnected before replying".into(),
            )),
            Err(_elapsed) => {
                self.pending.lock().await.remove(&id);
                tracing::warn!("ExtensionBridge: timed out waiting for EvalResult (id={})", id);
                Err(FillError::Timeout(format!(
                    "page did not answer eval within {timeout:?}"
                )))
            }
        }
    }
}

async fn accept_loop(listener: TcpListener, clients: Clients, pending: Pending) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("ws accept error: {}", e);
                continue;
            }
        };
        tokio::spawn(serve_client(stream, peer, clients.clone(), pending.clone()));
    }
}

async fn serve_client(
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    clients: Clients,
    pending: Pending,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("ws handshake error: {}", e);
            return;
        }
    };
    let (mut sink, mut stream) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // writer task
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sink.send(msg).await {
                tracing::warn!("ws send error: {}", e);
                break;
            }
        }
    });

    let client_id = Uuid::new_v4();
    clients.lock().await.push(Client {
        id: client_id,
        url: None,
        sender: tx,
    });
    tracing::debug!(%peer, %client_id, "Page client registered");

    while let Some(Ok(msg)) = stream.next().await {
        if !msg.is_text() {
            continue;
        }
        let txt = msg.into_text().unwrap_or_default();
        handle_incoming(&txt, client_id, &clients, &pending).await;
    }

    clients.lock().await.retain(|c| c.id != client_id);
    // Dropping the senders wakes every eval still waiting on this page.
    let mut pending = pending.lock().await;
    let before = pending.len();
    pending.retain(|_, (owner, _)| *owner != client_id);
    let abandoned = before - pending.len();
    drop(pending);
    tracing::info!(%peer, abandoned, "Page client disconnected");
    writer.abort();
}

async fn handle_incoming(txt: &str, client_id: Uuid, clients: &Clients, pending: &Pending) {
    match serde_json::from_str::<BridgeIncoming>(txt) {
        Ok(BridgeIncoming::EvalResult {
            id,
            ok,
            result,
            error,
        }) => {
            if ok {
                let size = result.as_ref().map(|r| r.to_string().len()).unwrap_or(0);
                tracing::trace!(id = %id, result_size = size, "Bridge received EvalResult");
            } else {
                let head: String = error
                    .as_deref()
                    .unwrap_or("unknown error")
                    .chars()
                    .take(400)
                    .collect();
                tracing::error!(id = %id, error = %head, "Bridge received EvalResult error");
            }
            if let Some((_, tx)) = pending.lock().await.remove(&id) {
                let _ = tx.send(if ok {
                    Ok(result.unwrap_or(serde_json::Value::Null))
                } else {
                    Err(error.unwrap_or_else(|| "unknown error".into()))
                });
            }
        }
        Ok(BridgeIncoming::Typed(TypedIncoming::ConsoleEvent { level, args })) => {
            let args_str = args.map(|v| v.to_string()).unwrap_or_else(|| "[]".into());
            match level.as_deref().unwrap_or("log") {
                "error" => tracing::error!(args = %args_str, "Console error event"),
                "warning" | "warn" => tracing::warn!(args = %args_str, "Console warn event"),
                "debug" => tracing::debug!(args = %args_str, "Console debug event"),
                _ => tracing::info!(args = %args_str, "Console log event"),
            }
        }
        Ok(BridgeIncoming::Typed(TypedIncoming::ExceptionEvent { details })) => {
            let details_val = details.unwrap_or(serde_json::Value::Null);
            tracing::error!(details = %details_val, "Page exception event");
        }
        Ok(BridgeIncoming::Typed(TypedIncoming::Hello { from, url })) => {
            tracing::info!(from = ?from, url = ?url, "Page connected");
            if let Some(client) = clients.lock().await.iter_mut().find(|c| c.id == client_id) {
                client.url = url;
            }
        }
        Ok(BridgeIncoming::Typed(TypedIncoming::Pong)) => {}
        Err(e) => tracing::warn!("Invalid incoming JSON: {}", e),
    }
}
