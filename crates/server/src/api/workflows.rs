//! Direct JSON routes for the four sealed workflows.
//!
//! Each route answers with the workflow envelope. Failures keep the
//! envelope body and pick the HTTP status from the error kind.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chrono::Utc;
use harbor_core::{
    Caller, DownloadTicket, ErrorKind, HarborError, ResourceType, WorkflowOutcome,
};
use harbor_intent::default_collection_name;
use harbor_intent::params::DEFAULT_MAX_SUPPLY;
use harbor_pipeline::{CollectionSpec, MintGatedStore};
use serde::Serialize;

use super::AppState;
use super::schemas::{MintRetrieveRequest, MintStoreRequest, RetrieveRequest, StoreRequest};
use crate::error::ServerError;

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Encryption
        | ErrorKind::Decryption
        | ErrorKind::Storage
        | ErrorKind::Ledger => StatusCode::BAD_GATEWAY,
    }
}

fn outcome_response<T: Serialize>(outcome: &WorkflowOutcome<T>) -> Response {
    let status = match outcome {
        WorkflowOutcome::Success(_) => StatusCode::OK,
        WorkflowOutcome::Failure(e) => status_for(e.kind()),
    };
    (status, Json(outcome)).into_response()
}

async fn pending(state: &AppState, file_id: &str) -> Result<(String, Bytes), ServerError> {
    let (upload, data) = state.uploads.read(file_id).await?;
    Ok((upload.file_name, data))
}

/// `POST /v1/workflows/store`
pub async fn store(
    State(state): State<AppState>,
    Json(body): Json<StoreRequest>,
) -> Result<Response, ServerError> {
    let (_, data) = pending(&state, &body.file_id).await?;
    let retention = body.retention.or(state.default_retention);
    let outcome = state
        .pipeline
        .store_with_allowlist(data, &body.policy_id, retention)
        .await;
    if outcome.is_success() {
        state.uploads.remove(&body.file_id).await;
    }
    Ok(outcome_response(&outcome))
}

/// `POST /v1/workflows/retrieve` -- decrypt and stage a download link.
pub async fn retrieve(
    State(state): State<AppState>,
    Json(body): Json<RetrieveRequest>,
) -> Response {
    let outcome: WorkflowOutcome<DownloadTicket> = match state
        .pipeline
        .retrieve_with_allowlist(&body.blob_id, &body.policy_id)
        .await
    {
        WorkflowOutcome::Success(plaintext) => {
            let name = body
                .file_name
                .unwrap_or_else(|| format!("{}.bin", body.blob_id));
            state
                .downloads
                .stage(&name, plaintext)
                .await
                .map_err(|e| HarborError::Storage(e.to_string()))
                .into()
        }
        WorkflowOutcome::Failure(e) => WorkflowOutcome::Failure(e),
    };
    outcome_response(&outcome)
}

/// `POST /v1/workflows/mint-store` -- seal a pending upload behind a new
/// collection.
pub async fn mint_store(
    State(state): State<AppState>,
    Json(body): Json<MintStoreRequest>,
) -> Result<Response, ServerError> {
    let (file_name, data) = pending(&state, &body.file_id).await?;
    let request = MintGatedStore {
        collection: CollectionSpec {
            name: body
                .name
                .unwrap_or_else(|| default_collection_name(ResourceType::File, Utc::now())),
            max_supply: body.max_supply.unwrap_or(DEFAULT_MAX_SUPPLY),
            mint_price: body.mint_price.unwrap_or(0),
        },
        file_name,
        resource_type: ResourceType::File,
        retention: body.retention.or(state.default_retention),
    };
    let outcome = state.pipeline.mint_gated_store(data, request).await;
    if outcome.is_success() {
        state.uploads.remove(&body.file_id).await;
    }
    Ok(outcome_response(&outcome))
}

/// `POST /v1/workflows/mint-retrieve`
pub async fn mint_retrieve(
    State(state): State<AppState>,
    Json(body): Json<MintRetrieveRequest>,
) -> Response {
    let mut caller = Caller::new(body.agent_id, body.entity_id);
    caller.room_id = body.room_id;
    let outcome = state.pipeline.mint_gated_retrieve(&body.nft_id, &caller).await;
    outcome_response(&outcome)
}
