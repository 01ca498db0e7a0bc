//! HTTP boundary: join/intent commands in, server-sent events out.
//!
//! The engine lives behind a mutex shared by the tick task and the
//! request handlers; commands are applied between ticks by whoever
//! holds the lock, so a handler never observes a half-finished tick.

use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{error, info};

use crate::{
    config::Tuning,
    engine::{Command, CommandError, Engine, EngineBuilder, EngineSettings},
    events::WorldView,
    spatial::Vec3,
    stage::WeaponKind,
};

pub struct WebServerConfig {
    pub host: String,
    pub port: u16,
    pub settings: EngineSettings,
    pub tuning: Tuning,
}

#[derive(Clone)]
struct AppState {
    engine: Arc<Mutex<Engine>>,
    broadcaster: broadcast::Sender<String>,
}

#[derive(Deserialize)]
struct JoinRequest {
    id: String,
}

#[derive(Serialize)]
struct JoinReply {
    id: String,
    view: WorldView,
}

/// Wire shape of a client command.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IntentRequest {
    SetDirection {
        id: String,
        direction: Vec3,
        #[serde(default)]
        sprint: bool,
    },
    Fire {
        id: String,
        target: Option<Vec3>,
    },
    Evolve {
        id: String,
    },
    ChooseWeapon {
        id: String,
        weapon: WeaponKind,
    },
    Respawn {
        id: String,
    },
    Leave {
        id: String,
    },
}

impl From<IntentRequest> for Command {
    fn from(request: IntentRequest) -> Self {
        match request {
            IntentRequest::SetDirection {
                id,
                direction,
                sprint,
            } => Command::SetDirection {
                id,
                direction,
                sprint,
            },
            IntentRequest::Fire { id, target } => Command::Fire { id, target },
            IntentRequest::Evolve { id } => Command::Evolve { id },
            IntentRequest::ChooseWeapon { id, weapon } => Command::ChooseWeapon { id, weapon },
            IntentRequest::Respawn { id } => Command::Respawn { id },
            IntentRequest::Leave { id } => Command::Leave { id },
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn command_error_response(err: CommandError) -> Response {
    let status = match err {
        CommandError::DuplicateId(_) | CommandError::NotDead(_) => StatusCode::CONFLICT,
        CommandError::ReservedId(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CommandError::UnknownId(_) => StatusCode::NOT_FOUND,
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        host,
        port,
        settings,
        tuning,
    } = config;

    let tick_rate_hz = settings.tick_rate_hz.max(1);
    let engine = EngineBuilder::new(settings, tuning)
        .with_default_systems()
        .build();
    let engine = Arc::new(Mutex::new(engine));

    let (tx, _) = broadcast::channel::<String>(1024);

    let engine_for_sim = engine.clone();
    let tx_for_sim = tx.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(tick_rate_hz)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let events = {
                let mut engine = engine_for_sim.lock().expect("engine lock poisoned");
                match engine.tick() {
                    Ok(events) => events,
                    Err(err) => {
                        error!(?err, "tick failed, stopping simulation");
                        break;
                    }
                }
            };
            for event in &events {
                if let Ok(payload) = serde_json::to_string(event) {
                    let _ = tx_for_sim.send(payload);
                }
            }
        }
    });

    let state = AppState {
        engine,
        broadcaster: tx,
    };

    let router = Router::new()
        .route("/api/join", post(join))
        .route("/api/intent", post(intent))
        .route("/api/state", get(current_state))
        .route("/api/events", get(stream_events))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!(%addr, tick_rate_hz, "server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}

async fn join(State(state): State<AppState>, Json(request): Json<JoinRequest>) -> Response {
    let mut engine = state.engine.lock().expect("engine lock poisoned");
    match engine.join(&request.id) {
        Ok(event) => {
            if let Ok(payload) = serde_json::to_string(&event) {
                let _ = state.broadcaster.send(payload);
            }
            Json(JoinReply {
                id: request.id,
                view: engine.view(),
            })
            .into_response()
        }
        Err(err) => command_error_response(err),
    }
}

async fn intent(State(state): State<AppState>, Json(request): Json<IntentRequest>) -> Response {
    let mut engine = state.engine.lock().expect("engine lock poisoned");
    match engine.apply(request.into()) {
        Ok(Some(event)) => {
            if let Ok(payload) = serde_json::to_string(&event) {
                let _ = state.broadcaster.send(payload);
            }
            StatusCode::ACCEPTED.into_response()
        }
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(err) => command_error_response(err),
    }
}

async fn current_state(State(state): State<AppState>) -> Json<WorldView> {
    let engine = state.engine.lock().expect("engine lock poisoned");
    Json(engine.view())
}

async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}
