//! JSON surface consumed by the table and lobby UI.

use std::sync::Arc;

use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

use crate::{
    AppState,
    ack::Ack,
    actions::UiAction,
    bootstrap::BootstrapState,
    cards::fallback_count,
    client::{ClientError, NewTable, SeatRequest},
    session::{Admin, Claims, SessionError, Viewer, authorize, whoami},
    tournament::TournamentForm,
    view::{TableView, TournamentSummary},
    wire::{TableId, TournamentId},
};

impl IntoResponse for ClientError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            ClientError::TableNotFound(_) | ClientError::TournamentNotFound(_) => StatusCode::NOT_FOUND,
            ClientError::Rejected { .. } => StatusCode::BAD_REQUEST,
            ClientError::Bootstrap(_) => StatusCode::SERVICE_UNAVAILABLE,
            ClientError::Transport(_) => StatusCode::BAD_GATEWAY,
            ClientError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(err = %self, "request to poker service failed");
        }
        let body = Json(json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Everything a handler can fail with.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("it is not your turn to act")]
    NotYourTurn,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Client(err) => err.into_response(),
            ApiError::Session(err) => err.into_response(),
            ApiError::NotYourTurn => {
                let body = Json(json!({
                    "error": ApiError::NotYourTurn.to_string(),
                }));
                (StatusCode::CONFLICT, body).into_response()
            }
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", get(whoami).post(authorize))
        .route("/summary", get(summary))
        .route("/tables", get(list_tables).post(create_table))
        .route("/tables/{table_id}", get(table))
        .route("/tables/{table_id}/action", post(table_action))
        .route("/tables/{table_id}/seat", post(seat_player))
        .route("/tables/{table_id}/unseat", post(unseat_player))
        .route("/tables/{table_id}/stack", post(adjust_stack))
        .route("/tables/{table_id}/start", post(start_hand))
        .route("/tables/{table_id}/tick", post(tick_table))
        .route("/tournaments", get(list_tournaments).post(create_tournament))
        .route("/tournaments/{tournament_id}", get(tournament))
        .route("/tournaments/{tournament_id}/tables", get(tournament_tables))
        .route("/tournaments/{tournament_id}/register", post(register_player))
        .route("/tournaments/{tournament_id}/unregister", post(unregister_player))
        .route("/tournaments/{tournament_id}/start", post(start_tournament))
        .route("/tournaments/{tournament_id}/advance", post(advance_level))
        .route("/tournaments/{tournament_id}/close", post(close_tournament))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub bootstrap: String,
    pub card_fallbacks: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub action: UiAction,
    /// Raw amount as typed by the player; only bet and raise read it
    #[serde(default)]
    pub amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
    pub player_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackAdjustment {
    pub player_id: u64,
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    pub delta_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub player_id: u64,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTournament {
    pub tournament_id: TournamentId,
    pub form: TournamentForm,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    let bootstrap = match state.client.connection().state() {
        BootstrapState::Uninitialized => "uninitialized",
        BootstrapState::Initializing => "initializing",
        BootstrapState::Ready => "ready",
    };
    Json(Health {
        bootstrap: bootstrap.to_string(),
        card_fallbacks: fallback_count(),
    })
}

async fn summary(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ClientError> {
    Ok(Json(state.client.summary().await?))
}

async fn list_tables(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TableView>>, ClientError> {
    Ok(Json(state.client.tables(&viewer.player_id).await?))
}

async fn table(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
) -> Result<Json<TableView>, ClientError> {
    let view = state
        .client
        .table(&TableId::from(table_id), &viewer.player_id)
        .await?;
    Ok(Json(view))
}

/// Act for the session's player. The table is read first so the action is
/// translated against the live bet and refused out of turn.
#[debug_handler(state = Arc<AppState>)]
async fn table_action(
    claims: Claims,
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<TableView>, ApiError> {
    let table_id = TableId::from(table_id);
    let current = state.client.table(&table_id, &claims.player_id).await?;
    if current.game_state.current_player_id != claims.player_id {
        return Err(ApiError::NotYourTurn);
    }
    let view = state
        .client
        .act(
            &table_id,
            request.action,
            current.game_state.current_bet,
            &request.amount,
            &claims.player_id,
        )
        .await?;
    Ok(Json(view))
}

async fn create_table(
    _admin: Admin,
    State(state): State<Arc<AppState>>,
    Json(table): Json<NewTable>,
) -> Result<Json<Ack>, ApiError> {
    Ok(Json(state.client.create_table(&table).await?))
}

async fn seat_player(
    claims: Claims,
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
    Json(seat): Json<SeatRequest>,
) -> Result<Json<Ack>, ApiError> {
    claims.ensure_player(seat.player_id)?;
    Ok(Json(
        state.client.seat_player(&TableId::from(table_id), &seat).await?,
    ))
}

async fn unseat_player(
    claims: Claims,
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
    Json(player): Json<PlayerRef>,
) -> Result<Json<Ack>, ApiError> {
    claims.ensure_player(player.player_id)?;
    Ok(Json(
        state
            .client
            .unseat_player(&TableId::from(table_id), player.player_id)
            .await?,
    ))
}

async fn adjust_stack(
    _admin: Admin,
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
    Json(adjustment): Json<StackAdjustment>,
) -> Result<Json<Ack>, ApiError> {
    Ok(Json(
        state
            .client
            .adjust_stack(&TableId::from(table_id), adjustment.player_id, adjustment.delta)
            .await?,
    ))
}

async fn start_hand(
    _admin: Admin,
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    Ok(Json(state.client.start_hand(&TableId::from(table_id)).await?))
}

async fn tick_table(
    _admin: Admin,
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
    Json(tick): Json<Tick>,
) -> Result<Json<Ack>, ApiError> {
    Ok(Json(
        state
            .client
            .tick_table(&TableId::from(table_id), tick.delta_secs)
            .await?,
    ))
}

async fn list_tournaments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TournamentSummary>>, ClientError> {
    Ok(Json(state.client.tournaments().await?))
}

async fn create_tournament(
    _admin: Admin,
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewTournament>,
) -> Result<Json<Ack>, ApiError> {
    let config = request.form.to_wire();
    Ok(Json(
        state
            .client
            .create_tournament(&request.tournament_id, &config)
            .await?,
    ))
}

async fn tournament(
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<String>,
) -> Result<Json<TournamentSummary>, ClientError> {
    Ok(Json(
        state
            .client
            .tournament_by_id(&TournamentId::from(tournament_id))
            .await?,
    ))
}

async fn tournament_tables(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Vec<TableView>>, ClientError> {
    Ok(Json(
        state
            .client
            .tournament_tables(&TournamentId::from(tournament_id), &viewer.player_id)
            .await?,
    ))
}

async fn register_player(
    claims: Claims,
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<String>,
    Json(registration): Json<Registration>,
) -> Result<Json<Ack>, ApiError> {
    claims.ensure_player(registration.player_id)?;
    Ok(Json(
        state
            .client
            .register_player_to_tournament(
                &TournamentId::from(tournament_id),
                registration.player_id,
                &registration.display_name,
            )
            .await?,
    ))
}

async fn unregister_player(
    claims: Claims,
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<String>,
    Json(player): Json<PlayerRef>,
) -> Result<Json<Ack>, ApiError> {
    claims.ensure_player(player.player_id)?;
    Ok(Json(
        state
            .client
            .unregister_player_from_tournament(&TournamentId::from(tournament_id), player.player_id)
            .await?,
    ))
}

async fn start_tournament(
    _admin: Admin,
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    Ok(Json(
        state
            .client
            .start_tournament(&TournamentId::from(tournament_id))
            .await?,
    ))
}

async fn advance_level(
    _admin: Admin,
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    Ok(Json(
        state
            .client
            .advance_tournament_level(&TournamentId::from(tournament_id))
            .await?,
    ))
}

async fn close_tournament(
    _admin: Admin,
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    Ok(Json(
        state
            .client
            .close_tournament(&TournamentId::from(tournament_id))
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use alloy::{
        primitives::Address,
        signers::{SignerSync as _, local::PrivateKeySigner},
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use chrono::Utc;
    use tower::ServiceExt as _;

    use super::*;
    use crate::{
        client::tests::{client_over, wire_table},
        session::{AuthBody, Keys, player_id_for, session_message},
        transport::tests::ScriptedHandle,
    };

    fn app_with_admins(responses: Vec<Value>, admins: &[Address]) -> (Router, Arc<ScriptedHandle>) {
        let handle = Arc::new(ScriptedHandle::new(responses));
        let state = Arc::new(AppState {
            client: client_over(handle.clone()),
            keys: Keys::new(b"test-secret"),
            admins: admins.iter().copied().collect::<HashSet<_>>(),
        });
        (router(state), handle)
    }

    fn app(responses: Vec<Value>) -> (Router, Arc<ScriptedHandle>) {
        app_with_admins(responses, &[])
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        request
    }

    fn session_body(signer: &PrivateKeySigner, wallet: Address, issued_at: i64) -> Value {
        let signature = signer
            .sign_message_sync(session_message(wallet, issued_at).as_bytes())
            .unwrap();
        json!({"wallet": wallet, "issuedAt": issued_at, "signature": signature})
    }

    async fn open_session(app: &Router, signer: &PrivateKeySigner) -> String {
        let body = session_body(signer, signer.address(), Utc::now().timestamp());
        let (status, body) = call(app.clone(), post("/session", &body)).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_value::<AuthBody>(body).unwrap().access_token
    }

    /// `wire_table` with the player in `seat` (0 or 1) owned by `signer`.
    fn table_with(signer: &PrivateKeySigner, seat: usize, current_bet: u64) -> Value {
        let mut table = wire_table(current_bet);
        table["players"][seat]["playerId"] = json!(player_id_for(&signer.address()));
        table
    }

    #[tokio::test]
    async fn anonymous_table_view() {
        let (app, _) = app(vec![json!({"data": {"table": wire_table(10)}})]);
        let (status, body) = call(app, get("/tables/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gameState"]["currentBet"], 10);
        assert_eq!(body["gameState"]["minRaise"], 20);
        let card = &body["players"][0]["cards"][0];
        assert_eq!(card["hidden"], true);
        assert!(card.get("rank").is_none());
        assert!(card.get("suit").is_none());
    }

    #[tokio::test]
    async fn unknown_table_is_404() {
        let (app, _) = app(vec![json!({"data": {"table": null}})]);
        let (status, body) = call(app, get("/tables/404")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "table not found: 404");
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let (app, handle) = app(vec![]);
        let (status, _) = call(app, bearer(get("/tables/1"), "nope")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(handle.sent().is_empty());
    }

    #[tokio::test]
    async fn signed_session_reveals_own_cards() {
        let signer = PrivateKeySigner::random();
        let (app, _) = app(vec![json!({"data": {"table": table_with(&signer, 0, 0)}})]);
        let token = open_session(&app, &signer).await;

        let (status, body) = call(app.clone(), bearer(get("/session"), &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["playerId"], player_id_for(&signer.address()).to_string());
        assert_eq!(body["admin"], false);

        let (status, body) = call(app, bearer(get("/tables/1"), &token)).await;
        assert_eq!(status, StatusCode::OK);
        let own = &body["players"][0]["cards"][0];
        assert_eq!(own["hidden"], false);
        assert_eq!(own["rank"], "A");
        assert_eq!(own["suit"], "hearts");
    }

    #[tokio::test]
    async fn session_for_another_wallet_is_rejected() {
        let (app, _) = app(vec![]);
        let signer = PrivateKeySigner::random();
        let victim = PrivateKeySigner::random().address();
        let body = session_body(&signer, victim, Utc::now().timestamp());
        let (status, body) = call(app, post("/session", &body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "could not verify signature");
    }

    #[tokio::test]
    async fn stale_session_signature_is_rejected() {
        let (app, _) = app(vec![]);
        let signer = PrivateKeySigner::random();
        let body = session_body(&signer, signer.address(), Utc::now().timestamp() - 3600);
        let (status, _) = call(app, post("/session", &body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn action_needs_a_session() {
        let (app, handle) = app(vec![]);
        let (status, _) = call(app, post("/tables/1/action", &json!({"action": "fold"}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(handle.sent().is_empty());
    }

    #[tokio::test]
    async fn action_out_of_turn_is_refused() {
        let signer = PrivateKeySigner::random();
        let (app, handle) = app(vec![json!({"data": {"table": table_with(&signer, 1, 10)}})]);
        let token = open_session(&app, &signer).await;

        let request = bearer(post("/tables/1/action", &json!({"action": "fold"})), &token);
        let (status, _) = call(app, request).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let sent = handle.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["operationName"], "Table");
    }

    #[tokio::test]
    async fn action_then_refetch() {
        let signer = PrivateKeySigner::random();
        let (app, handle) = app(vec![
            json!({"data": {"table": table_with(&signer, 0, 10)}}),
            json!({"data": {"playerAction": "0xfeed"}}),
            json!({"data": {"table": table_with(&signer, 0, 60)}}),
        ]);
        let token = open_session(&app, &signer).await;

        let request = bearer(
            post("/tables/1/action", &json!({"action": "raise", "amount": "60"})),
            &token,
        );
        let (status, body) = call(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gameState"]["currentBet"], 60);
        let sent = handle.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1]["variables"]["action"], "Raise");
        assert_eq!(sent[1]["variables"]["amount"], 60);
    }

    #[tokio::test]
    async fn check_or_call_follows_the_live_bet() {
        let signer = PrivateKeySigner::random();
        let (app, handle) = app(vec![
            json!({"data": {"table": table_with(&signer, 0, 10)}}),
            json!({"data": {"playerAction": {"ok": true}}}),
            json!({"data": {"table": table_with(&signer, 0, 10)}}),
        ]);
        let token = open_session(&app, &signer).await;

        let request = bearer(post("/tables/1/action", &json!({"action": "check_or_call"})), &token);
        let (status, _) = call(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(handle.sent()[1]["variables"]["action"], "Call");
    }

    #[tokio::test]
    async fn players_only_manage_their_own_seat() {
        let signer = PrivateKeySigner::random();
        let own_id = player_id_for(&signer.address());
        let (app, handle) = app(vec![json!({"data": {"seatPlayer": {"ok": true}}})]);
        let token = open_session(&app, &signer).await;

        let seat = |player_id: u64| {
            json!({"playerId": player_id, "displayName": "me", "seatIndex": 2, "initialStack": 1000})
        };
        let (status, _) = call(
            app.clone(),
            bearer(post("/tables/1/seat", &seat(own_id.wrapping_add(1))), &token),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(handle.sent().is_empty());

        let (status, _) = call(app.clone(), post("/tables/1/seat", &seat(own_id))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(app, bearer(post("/tables/1/seat", &seat(own_id)), &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(handle.sent()[0]["variables"]["playerId"], own_id);
    }

    #[tokio::test]
    async fn administration_needs_an_admin_wallet() {
        let admin = PrivateKeySigner::random();
        let player = PrivateKeySigner::random();
        let (app, handle) = app_with_admins(
            vec![json!({"data": {"adjustStack": {"ok": true}}})],
            &[admin.address()],
        );
        let adjustment = json!({"playerId": 1, "delta": 500});

        let (status, _) = call(app.clone(), post("/tables/1/stack", &adjustment)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = open_session(&app, &player).await;
        let (status, body) =
            call(app.clone(), bearer(post("/tables/1/stack", &adjustment), &token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "not allowed for this session");
        assert!(handle.sent().is_empty());

        let token = open_session(&app, &admin).await;
        let (status, body) = call(app, bearer(post("/tables/1/stack", &adjustment), &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(handle.sent()[0]["variables"]["delta"], 500);
    }

    #[tokio::test]
    async fn rejected_mutation_is_400() {
        let admin = PrivateKeySigner::random();
        let (app, _) = app_with_admins(
            vec![json!({"data": {"startTournament": {"ok": false}}})],
            &[admin.address()],
        );
        let token = open_session(&app, &admin).await;
        let (status, body) =
            call(app, bearer(post("/tournaments/3/start", &json!({})), &token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "StartTournament failed");
    }

    #[tokio::test]
    async fn health_reports_bootstrap_state() {
        let (app, _) = app(vec![]);
        let (status, body) = call(app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bootstrap"], "uninitialized");
        assert!(body["cardFallbacks"].is_u64());
    }
}
