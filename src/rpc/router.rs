//! HTTP routing: one JSON POST endpoint per RPC method.

use crate::rpc::dispatcher::Dispatcher;
use crate::rpc::error::RpcError;
use crate::rpc::messages::{
    Empty, FailTaskRequest, FindFreeTaskRequest, FinishTaskRequest, NotifyRequest, QuitTaskRequest,
    StorageClaimListReply, StorageClaimReply, StorageClaimRequest, TaskReply,
};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    /// RPC method handlers.
    pub dispatcher: Arc<Dispatcher>,
}

/// Builds the RPC router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/rpc/dealer.Dealer/FindFreeTask", post(find_free_task))
        .route("/rpc/dealer.Dealer/Notify", post(notify))
        .route("/rpc/dealer.Dealer/FinishTask", post(finish_task))
        .route("/rpc/dealer.Dealer/QuitTask", post(quit_task))
        .route("/rpc/dealer.Dealer/FailTask", post(fail_task))
        .route(
            "/rpc/dealer.Dealer/GetInputStorageClaim",
            post(get_input_storage_claim),
        )
        .route(
            "/rpc/dealer.Dealer/GetAllInputStorageClaims",
            post(get_all_input_storage_claims),
        )
        .route(
            "/rpc/dealer.Dealer/AllocateOutputStorageClaim",
            post(allocate_output_storage_claim),
        )
        .with_state(state)
}

async fn find_free_task(
    State(state): State<AppState>,
    Json(req): Json<FindFreeTaskRequest>,
) -> Result<Json<TaskReply>, RpcError> {
    state.dispatcher.find_free_task(req).await.map(Json)
}

async fn notify(
    State(state): State<AppState>,
    Json(req): Json<NotifyRequest>,
) -> Result<Json<Empty>, RpcError> {
    state.dispatcher.notify(req).await.map(Json)
}

async fn finish_task(
    State(state): State<AppState>,
    Json(req): Json<FinishTaskRequest>,
) -> Result<Json<Empty>, RpcError> {
    state.dispatcher.finish_task(req).await.map(Json)
}

async fn quit_task(
    State(state): State<AppState>,
    Json(req): Json<QuitTaskRequest>,
) -> Result<Json<Empty>, RpcError> {
    state.dispatcher.quit_task(req).await.map(Json)
}

async fn fail_task(
    State(state): State<AppState>,
    Json(req): Json<FailTaskRequest>,
) -> Result<Json<Empty>, RpcError> {
    state.dispatcher.fail_task(req).await.map(Json)
}

async fn get_input_storage_claim(
    State(state): State<AppState>,
    Json(req): Json<StorageClaimRequest>,
) -> Result<Json<StorageClaimReply>, RpcError> {
    state.dispatcher.get_input_storage_claim(req).await.map(Json)
}

async fn get_all_input_storage_claims(
    State(state): State<AppState>,
    Json(req): Json<StorageClaimRequest>,
) -> Result<Json<StorageClaimListReply>, RpcError> {
    state
        .dispatcher
        .get_all_input_storage_claims(req)
        .await
        .map(Json)
}

async fn allocate_output_storage_claim(
    State(state): State<AppState>,
    Json(req): Json<StorageClaimRequest>,
) -> Result<Json<StorageClaimReply>, RpcError> {
    state
        .dispatcher
        .allocate_output_storage_claim(req)
        .await
        .map(Json)
}
