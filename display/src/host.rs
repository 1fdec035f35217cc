use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use ambience_common::{
    types::IndexPayload, ClientError, DisplaySession, RuntimeConfig, TlsTransport,
};

use crate::{
    output::LoggedOutput,
    tls::{load_server_config, TlsListener},
};

struct Station {
    session: DisplaySession<TlsTransport>,
    output: LoggedOutput,
}

#[derive(Clone)]
struct AppState {
    station: Arc<Mutex<Station>>,
    index: Arc<AtomicUsize>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct VolumeView {
    volume: u8,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = RuntimeConfig::load_from_env_path()
        .await
        .unwrap_or_else(|err| {
            warn!("failed to load runtime config: {err}");
            RuntimeConfig::defaults_from_env()
        });

    let mut output =
        LoggedOutput::open(&config.display).context("failed to start audio and led output")?;
    let transport = TlsTransport::new(&config.api).context("failed to set up api transport")?;
    let mut session = DisplaySession::new(transport, config.display.initial_volume);

    if let Err(err) = session.start(&mut output).await {
        warn!("initial refresh failed: {err}");
    }

    let app_state = AppState {
        index: Arc::new(AtomicUsize::new(session.index())),
        station: Arc::new(Mutex::new(Station { session, output })),
    };

    spawn_poll_loop(
        app_state.clone(),
        Duration::from_millis(config.display.poll_interval_ms),
    );

    let app = Router::new()
        .route("/index", get(handle_get_index))
        .route("/api/status", get(handle_get_status))
        .route("/api/next", post(handle_next))
        .route("/api/previous", post(handle_previous))
        .route("/api/volume/up", post(handle_volume_up))
        .route("/api/volume/down", post(handle_volume_down))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.display.status_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind status server at {addr}"))?;

    match config.display.tls_paths() {
        Some((cert, key)) => {
            let tls = load_server_config(cert, key)?;
            info!("display status listening on https://{addr}");
            let listener = TlsListener::new(listener, tls).context("failed to start tls listener")?;
            axum::serve(listener, app).await?;
        }
        None => {
            info!("display status listening on http://{addr}");
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}

fn spawn_poll_loop(app_state: AppState, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick fires immediately and start() has just refreshed.
        interval.tick().await;

        loop {
            interval.tick().await;

            let mut station = app_state.station.lock().await;
            let Station { session, output } = &mut *station;
            if let Err(err) = session.refresh(output).await {
                warn!("display refresh failed: {err}");
            }
            app_state.index.store(session.index(), Ordering::Relaxed);
        }
    });
}

async fn handle_get_index(State(state): State<AppState>) -> impl IntoResponse {
    Json(IndexPayload {
        index: state.index.load(Ordering::Relaxed),
    })
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    let station = state.station.lock().await;
    Json(station.session.status())
}

async fn handle_next(State(state): State<AppState>) -> axum::response::Response {
    step(&state, Step::Next).await
}

async fn handle_previous(State(state): State<AppState>) -> axum::response::Response {
    step(&state, Step::Previous).await
}

async fn handle_volume_up(State(state): State<AppState>) -> impl IntoResponse {
    let mut station = state.station.lock().await;
    let Station { session, output } = &mut *station;
    Json(VolumeView {
        volume: session.volume_up(output),
    })
}

async fn handle_volume_down(State(state): State<AppState>) -> impl IntoResponse {
    let mut station = state.station.lock().await;
    let Station { session, output } = &mut *station;
    Json(VolumeView {
        volume: session.volume_down(output),
    })
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Next,
    Previous,
}

async fn step(state: &AppState, direction: Step) -> axum::response::Response {
    let mut station = state.station.lock().await;
    let Station { session, output } = &mut *station;

    let result = match direction {
        Step::Next => session.next(output).await,
        Step::Previous => session.previous(output).await,
    };
    state.index.store(session.index(), Ordering::Relaxed);

    match result {
        Ok(()) => Json(session.status()).into_response(),
        Err(err) => {
            warn!("{direction:?} failed: {err}");
            error_response(status_for(&err), &err.to_string())
        }
    }
}

fn status_for(err: &ClientError) -> StatusCode {
    match err {
        ClientError::DeviceUnset => StatusCode::CONFLICT,
        ClientError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
