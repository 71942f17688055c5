use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use maze_chase::board::Board;
use maze_chase::config::GameConfig;
use maze_chase::layout::{BoardLayout, DEFAULT_LAYOUT};
use maze_chase::logging::{emit_event, emit_log};
use maze_chase::protocol::{parse_client_message, ClientMessage};
use maze_chase::types::RuntimeEvent;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    config: GameConfig,
    layout: BoardLayout,
    seed: u64,
    board: Board,
}

impl ServerState {
    fn new(config: GameConfig, layout: BoardLayout, seed: u64) -> Result<Self> {
        let board = Board::new(&config, layout.clone(), seed).context("failed to build board")?;
        Ok(Self {
            clients: HashMap::new(),
            config,
            layout,
            seed,
            board,
        })
    }

    fn restart(&mut self) {
        let seed = self.seed.wrapping_add(1);
        match Board::new(&self.config, self.layout.clone(), seed) {
            Ok(board) => {
                self.board = board;
                self.seed = seed;
                emit_log("info", "board_restarted", None, json!({ "seed": seed }));
            }
            Err(error) => {
                emit_log(
                    "error",
                    "board_restart_failed",
                    None,
                    json!({ "seed": seed, "error": error.to_string() }),
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let config = match std::env::var("MAZE_CONFIG") {
        Ok(path) => GameConfig::load(&PathBuf::from(path))?,
        Err(_) => GameConfig::default(),
    };
    let layout_text = match std::env::var("MAZE_LAYOUT") {
        Ok(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read layout {path}"))?,
        Err(_) => DEFAULT_LAYOUT.to_string(),
    };
    let layout = BoardLayout::parse(&layout_text, config.cell_size).context("failed to parse layout")?;
    let seed = Utc::now().timestamp_millis().unsigned_abs();
    let tick_ms = config.tick_ms;

    let state = Arc::new(Mutex::new(ServerState::new(config, layout, seed)?));
    start_tick_loop(state.clone(), tick_ms);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        emit_log(
            "info",
            "static_root",
            None,
            json!({ "path": static_dir.to_string_lossy() }),
        );
        app.fallback_service(ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)))
    } else {
        emit_log("warn", "static_root_missing", None, json!({}));
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    emit_log("info", "listening", None, json!({ "port": port, "seed": seed }));
    axum::serve(listener, app).await.context("server runtime failed")?;
    Ok(())
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("static"), PathBuf::from("dist/client")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<String>(256);

    {
        let mut guard = state.lock().await;
        guard
            .clients
            .insert(client_id.clone(), ClientContext { tx: tx.clone() });
        let welcome = json!({
            "type": "welcome",
            "clientId": client_id,
            "seed": guard.seed,
        });
        send_to_client(&mut guard, &client_id, &welcome, QueuePolicy::DisconnectOnFull);
    }
    emit_log("info", "client_connected", None, json!({ "clientId": client_id }));

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(&state, &client_id, raw.as_str()).await;
            }
            Message::Binary(raw) => match std::str::from_utf8(&raw) {
                Ok(text) => handle_client_message(&state, &client_id, text).await,
                Err(_) => send_error_to_client(&state, &client_id, "invalid utf8 message").await,
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut guard = state.lock().await;
        guard.clients.remove(&client_id);
    }
    emit_log("info", "client_disconnected", None, json!({ "clientId": client_id }));
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: &SharedState, client_id: &str, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        send_error_to_client(state, client_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    match message {
        ClientMessage::Input { dir } => guard.board.input(dir),
        ClientMessage::Restart => {
            guard.restart();
        }
        ClientMessage::Ping { t } => {
            send_to_client(
                &mut guard,
                client_id,
                &json!({ "type": "pong", "t": t }),
                QueuePolicy::DropOnFull,
            );
        }
    }
}

fn start_tick_loop(state: SharedState, tick_ms: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_board(&mut guard, tick_ms);
        }
    });
}

fn tick_board(state: &mut ServerState, tick_ms: u64) {
    state.board.step(tick_ms);
    let snapshot = state.board.build_snapshot(true);
    for event in &snapshot.events {
        if matches!(
            event,
            RuntimeEvent::ModeChanged { .. } | RuntimeEvent::GhostReset { .. } | RuntimeEvent::GameOver { .. }
        ) {
            emit_event(snapshot.tick, event);
        }
    }

    broadcast(
        state,
        &json!({
            "type": "state",
            "snapshot": snapshot,
        }),
        QueuePolicy::DropOnFull,
    );

    if !state.board.is_ended() {
        return;
    }

    let summary = state.board.build_summary();
    broadcast(
        state,
        &json!({
            "type": "game_over",
            "summary": summary,
        }),
        QueuePolicy::DisconnectOnFull,
    );
    state.restart();
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = match state.clients.get(client_id) {
        Some(client) => client.tx.try_send(message.to_string()).is_err(),
        None => false,
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        state.clients.remove(client_id);
    }
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    let payload = message.to_string();
    let mut failed_clients = Vec::new();
    for (client_id, client) in &state.clients {
        if client.tx.try_send(payload.clone()).is_err() && policy == QueuePolicy::DisconnectOnFull {
            failed_clients.push(client_id.clone());
        }
    }
    for client_id in failed_clients {
        state.clients.remove(&client_id);
        emit_log("warn", "client_dropped", None, json!({ "clientId": client_id }));
    }
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_to_client(
        &mut guard,
        client_id,
        &json!({
            "type": "error",
            "message": message,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}
