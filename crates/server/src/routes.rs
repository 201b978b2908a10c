use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use larder_core::domain::changeset::ChangeSet;
use larder_core::domain::item::{Category, Item, ItemId};
use larder_core::domain::notification::NotificationKind;
use larder_core::errors::{ApplicationError, InterfaceError};
use larder_core::forecast::{days_until_needed, is_overdue, is_running_low};
use larder_core::reconcile::{apply_change_set, ChangeAction, ReconcileOutcome, SequentialIdSource};
use larder_db::{ItemPatch, ItemRepository, NewItemRecord, RepositoryError};

use crate::bootstrap::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/items", get(list_items).post(create_item))
        .route("/api/items/{id}", axum::routing::put(update_item).delete(delete_item))
        .route("/api/reconcile", post(reconcile))
        .route("/api/remind", post(remind))
        .with_state(state)
}

struct ApiError(InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let correlation_id = match &self.0 {
            InterfaceError::BadRequest { correlation_id, .. }
            | InterfaceError::NotFound { correlation_id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id, .. }
            | InterfaceError::Internal { correlation_id, .. } => correlation_id.clone(),
        };
        let body = serde_json::json!({
            "error": self.0.user_message(),
            "correlationId": correlation_id,
        });
        (status, Json(body)).into_response()
    }
}

fn repository_failure(error: RepositoryError, correlation_id: &str) -> ApiError {
    let application = match error {
        RepositoryError::Invalid(domain) => ApplicationError::Domain(domain),
        other => ApplicationError::Persistence(other.to_string()),
    };
    ApiError(application.into_interface(correlation_id))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemDto {
    id: i64,
    name: String,
    category: String,
    last_purchased: Option<NaiveDate>,
    duration_days: i64,
    status: String,
    days_until_needed: Option<i64>,
    running_low: bool,
    overdue: bool,
}

impl ItemDto {
    fn from_item(item: &Item, reference: NaiveDate) -> Self {
        Self {
            id: item.id.0,
            name: item.name.clone(),
            category: item.category.as_str().to_string(),
            last_purchased: item.last_purchased,
            duration_days: item.duration_days,
            status: item.status.as_str().to_string(),
            days_until_needed: days_until_needed(item, reference),
            running_low: is_running_low(item, reference),
            overdue: is_overdue(item, reference),
        }
    }
}

async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<ItemDto>>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let items = state
        .items
        .list_active()
        .await
        .map_err(|error| repository_failure(error, &correlation_id))?;

    let reference = today();
    Ok(Json(items.iter().map(|item| ItemDto::from_item(item, reference)).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateItemRequest {
    name: String,
    category: Option<String>,
    last_purchased: Option<NaiveDate>,
    duration_days: i64,
}

async fn create_item(
    State(state): State<AppState>,
    Json(request): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemDto>), ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let record = NewItemRecord {
        name: request.name,
        category: request.category.as_deref().map(Category::parse).unwrap_or(Category::House),
        last_purchased: request.last_purchased,
        duration_days: request.duration_days,
    };

    let item = state
        .items
        .insert(record)
        .await
        .map_err(|error| repository_failure(error, &correlation_id))?;

    info!(
        event_name = "server.items.created",
        correlation_id = %correlation_id,
        item_id = %item.id,
        "item created"
    );
    Ok((StatusCode::CREATED, Json(ItemDto::from_item(&item, today()))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateItemRequest {
    name: Option<String>,
    category: Option<String>,
    last_purchased: Option<NaiveDate>,
    duration_days: Option<i64>,
}

async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<ItemDto>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let patch = ItemPatch {
        name: request.name,
        category: request.category.as_deref().map(Category::parse),
        last_purchased: request.last_purchased,
        duration_days: request.duration_days,
    };

    let updated = state
        .items
        .update_fields(ItemId(id), patch)
        .await
        .map_err(|error| repository_failure(error, &correlation_id))?;

    match updated {
        Some(item) => Ok(Json(ItemDto::from_item(&item, today()))),
        None => Err(ApiError(InterfaceError::NotFound {
            message: format!("no active item with id {id}"),
            correlation_id,
        })),
    }
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let deleted = state
        .items
        .soft_delete(ItemId(id))
        .await
        .map_err(|error| repository_failure(error, &correlation_id))?;

    if !deleted {
        return Err(ApiError(InterfaceError::NotFound {
            message: format!("no active item with id {id}"),
            correlation_id,
        }));
    }
    info!(
        event_name = "server.items.deleted",
        correlation_id = %correlation_id,
        item_id = id,
        "item soft-deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ReconcileRequest {
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppliedChangeDto {
    action: &'static str,
    item_id: Option<i64>,
    applied: bool,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReconcileResponse {
    applied: Vec<AppliedChangeDto>,
    log: Vec<String>,
}

/// Interprets a free-text reply and applies the result. Always answers with
/// a best-effort summary: unresolved entries appear as not applied, and a
/// failed interpretation is just an empty summary. Only persistence failures
/// become error responses.
async fn reconcile(
    State(state): State<AppState>,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let reference = today();

    // Serializes the read-modify-write window; without it two concurrent
    // reconciliations could issue colliding ids or lose each other's writes.
    let _guard = state.reconcile_lock.lock().await;

    let items = state
        .items
        .list_active()
        .await
        .map_err(|error| repository_failure(error, &correlation_id))?;

    let change_set = state.interpreter.interpret(&request.message, &items, reference).await;
    let outcome = apply_interpreted(&state, &items, &change_set, reference, &correlation_id).await?;

    info!(
        event_name = "server.reconcile.finished",
        correlation_id = %correlation_id,
        entries = outcome.applied.len(),
        applied = outcome.applied.iter().filter(|change| change.applied).count(),
        "reconciliation finished"
    );

    let applied = outcome
        .applied
        .iter()
        .map(|change| AppliedChangeDto {
            action: match change.action {
                ChangeAction::Update => "update",
                ChangeAction::Insert => "insert",
                ChangeAction::Remove => "remove",
            },
            item_id: change.item_id.map(|id| id.0),
            applied: change.applied,
            message: change.message.clone(),
        })
        .collect();

    Ok(Json(ReconcileResponse { applied, log: outcome.applied_log() }))
}

async fn apply_interpreted(
    state: &AppState,
    items: &[Item],
    change_set: &ChangeSet,
    reference: NaiveDate,
    correlation_id: &str,
) -> Result<ReconcileOutcome, ApiError> {
    let max_id = state
        .items
        .max_id()
        .await
        .map_err(|error| repository_failure(error, correlation_id))?;
    let mut ids = SequentialIdSource::starting_at(max_id + 1);

    let outcome = apply_change_set(items, change_set, reference, &mut ids);

    // Entries persist independently; an earlier commit stays even if a later
    // one fails.
    for change in &outcome.applied {
        if !change.applied {
            continue;
        }
        let Some(id) = change.item_id else { continue };
        let stored = outcome.items.iter().find(|item| item.id == id);
        match change.action {
            ChangeAction::Insert => {
                if let Some(item) = stored {
                    state
                        .items
                        .insert_with_id(item)
                        .await
                        .map_err(|error| repository_failure(error, correlation_id))?;
                }
            }
            ChangeAction::Update => {
                if let Some(item) = stored {
                    let patch = ItemPatch {
                        last_purchased: item.last_purchased,
                        duration_days: Some(item.duration_days),
                        ..ItemPatch::default()
                    };
                    state
                        .items
                        .update_fields(id, patch)
                        .await
                        .map_err(|error| repository_failure(error, correlation_id))?;
                }
            }
            ChangeAction::Remove => {
                // May be a same-batch insert already stored as deleted.
                state
                    .items
                    .soft_delete(id)
                    .await
                    .map_err(|error| repository_failure(error, correlation_id))?;
            }
        }
    }

    Ok(outcome)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RemindResponse {
    low_items: Vec<String>,
    email_sent: bool,
    sms_sent: bool,
    skipped: Option<String>,
}

async fn remind(State(state): State<AppState>) -> Result<Json<RemindResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();

    let outcome = state
        .reminders
        .run(NotificationKind::Manual, today())
        .await
        .map_err(|error| ApiError(error.into_interface(correlation_id)))?;

    Ok(Json(RemindResponse {
        low_items: outcome.low_items.iter().map(|item| item.name.clone()).collect(),
        email_sent: outcome.email_sent,
        sms_sent: outcome.sms_sent,
        skipped: outcome.skipped.map(|reason| format!("{reason:?}")),
    }))
}
