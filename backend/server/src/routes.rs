use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::{
    error::AppError,
    identity::{Identity, resolve_identity},
    state::AppState,
    tally::TallySnapshot,
    utils::{ClientOrigin, get_option_from_body},
};

pub async fn results_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let identity = match identify(&state, &headers) {
        Ok(identity) => identity,
        Err(e) => return e.into_response(),
    };

    let snapshot = state.ledger.view(&identity.voter).await;

    with_identity(identity, Json(snapshot))
}

pub async fn vote_handler(
    State(state): State<Arc<AppState>>,
    ClientOrigin(origin): ClientOrigin,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let identity = match identify(&state, &headers) {
        Ok(identity) => identity,
        Err(e) => return e.into_response(),
    };

    let result = submit_vote(&state, &identity.voter, &origin, &body).await;

    with_identity(identity, result.map(Json))
}

async fn submit_vote(
    state: &AppState,
    voter: &str,
    origin: &str,
    body: &Bytes,
) -> Result<TallySnapshot, AppError> {
    if !state.limiter.allow(origin) {
        return Err(AppError::RateLimited);
    }

    let option = get_option_from_body(body);
    let snapshot = state.ledger.submit(voter, &option).await?;

    #[cfg(feature = "verbose")]
    info!("Vote from {origin}: {option}");

    Ok(snapshot)
}

fn identify(state: &AppState, headers: &HeaderMap) -> Result<Identity, AppError> {
    let identity = resolve_identity(headers, state.config.secure_cookies)
        .map_err(|e| AppError::InternalError(e.into()))?;

    if identity.set_cookie.is_some() {
        info!("Issued new voter id");
    }

    Ok(identity)
}

fn with_identity(identity: Identity, body: impl IntoResponse) -> Response {
    let mut response = body.into_response();

    if let Some(cookie) = identity.set_cookie {
        response.headers_mut().append(SET_COOKIE, cookie);
    }

    response
}
