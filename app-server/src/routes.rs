//! HTTP handlers.
//!
//! ## Endpoints
//! - `GET /api/health` - Liveness and version
//! - `GET /api/diagnostic` - The configured diagnostic document
//! - `GET|POST /api/collections/{collection}` - List or create
//! - `GET|PUT|DELETE /api/collections/{collection}/{id}` - Read, update, delete
//! - `GET /api/collections/{collection}/{id}/mentions` - Incoming references
//! - `PUT /api/collections/{collection}/{id}/references` - Replace outgoing references
//!
//! Reads need an authenticated session, writes need an admin.

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use warbook_mentions::{Mentions, ReferenceCounts};
use warbook_store::document::field;
use warbook_store::{
    CollectionState, Document, Fields, Filter, NEW_DOCUMENT_ID, ReferenceMap, Sort, SortDirection,
    collections,
};

use crate::AppState;
use crate::auth::Session;
use crate::error::{ApiError, Result};
use crate::registry::EntityKind;
use crate::selection::{Row, Selection, SelectionAction};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/diagnostic", get(diagnostic))
        .route(
            "/api/collections/{collection}",
            get(list_documents).post(create_document),
        )
        .route(
            "/api/collections/{collection}/{id}",
            get(get_document)
                .put(update_document)
                .delete(delete_document),
        )
        .route("/api/collections/{collection}/{id}/mentions", get(mentions))
        .route(
            "/api/collections/{collection}/{id}/references",
            put(update_references),
        )
        .with_state(state)
}

fn kind<'a>(state: &'a AppState, collection: &str) -> Result<&'a EntityKind> {
    state
        .registry
        .get(collection)
        .ok_or_else(|| ApiError::UnknownCollection(collection.to_string()))
}

async fn load_existing(state: &AppState, collection: &str, id: &str) -> Result<Document> {
    state
        .store
        .get_by_id(collection, id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Fetch the configured diagnostic document, `null` when it does not exist.
async fn diagnostic(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Option<Document>>> {
    session.require_auth()?;
    let target = &state.config.diagnostic;
    let doc = state.store.get_by_id(&target.collection, &target.id).await?;
    Ok(Json(doc))
}

/// Query parameters for listing a collection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub system_id: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<SortDirection>,
    pub selected: Option<String>,
}

impl ListParams {
    fn query(&self) -> warbook_store::Query {
        let mut query = warbook_store::Query::new().order_by(Sort {
            field: self.sort.clone().unwrap_or_else(|| field::NAME.to_string()),
            direction: self.direction.unwrap_or_default(),
        });
        if let Some(system_id) = &self.system_id {
            query = query.filter(Filter::eq(field::SYSTEM_ID, system_id.as_str()));
        }
        query
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub collection: String,
    pub items: Vec<Row>,
    pub selected: Option<String>,

    /// Set when loading failed; `items` is then empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn list_documents(
    State(state): State<AppState>,
    session: Session,
    Path(collection): Path<String>,
    Query(mut params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    session.require_auth()?;
    let kind = kind(&state, &collection)?;

    if params.system_id.is_some() && !collections::is_playable(&collection) {
        debug!("Ignoring systemId filter on {collection}");
        params.system_id = None;
    }
    let query = params.query();

    let mut list =
        CollectionState::new(state.store.clone(), collection.as_str()).with_query(query);
    list.refresh().await;

    let selection = Selection::new().reduce(match params.selected {
        Some(id) => SelectionAction::Select(id),
        None => SelectionAction::Clear,
    });

    Ok(Json(ListResponse {
        items: selection.mark(list.items(), |doc| kind.view(doc)),
        selected: selection.selected().map(str::to_string),
        error: list.error().map(str::to_string),
        collection,
    }))
}

async fn get_document(
    State(state): State<AppState>,
    session: Session,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    session.require_auth()?;
    let kind = kind(&state, &collection)?;
    let doc = load_existing(&state, &collection, &id).await?;
    Ok(Json(kind.view(&doc)))
}

async fn create_document(
    State(state): State<AppState>,
    session: Session,
    Path(collection): Path<String>,
    Json(input): Json<Fields>,
) -> Result<(StatusCode, Json<Value>)> {
    session.require_admin()?;
    let kind = kind(&state, &collection)?;

    let mut doc = kind.edit(input)?;
    doc.id = Some(NEW_DOCUMENT_ID.to_string());
    // References change only through the reference editor.
    doc.references = None;

    let mut list = CollectionState::new(state.store.clone(), collection.as_str());
    match list.save(doc, session.author()).await {
        Some(saved) => Ok((StatusCode::CREATED, Json(kind.view(&saved)))),
        None => Err(failed(&mut list)),
    }
}

async fn update_document(
    State(state): State<AppState>,
    session: Session,
    Path((collection, id)): Path<(String, String)>,
    Json(input): Json<Fields>,
) -> Result<Json<Value>> {
    session.require_admin()?;
    let kind = kind(&state, &collection)?;
    load_existing(&state, &collection, &id).await?;

    let mut doc = kind.edit(input)?;
    doc.id = Some(id);
    doc.references = None;

    let mut list = CollectionState::new(state.store.clone(), collection.as_str());
    match list.save(doc, session.author()).await {
        Some(saved) => Ok(Json(kind.view(&saved))),
        None => Err(failed(&mut list)),
    }
}

async fn delete_document(
    State(state): State<AppState>,
    session: Session,
    Path((collection, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    session.require_admin()?;
    kind(&state, &collection)?;

    let mut list = CollectionState::new(state.store.clone(), collection.as_str());
    if list.remove(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(failed(&mut list))
    }
}

fn failed(list: &mut CollectionState) -> ApiError {
    ApiError::Failed(
        list.take_notice()
            .map(|notice| notice.message)
            .unwrap_or_else(|| format!("write to {} failed", list.collection())),
    )
}

#[derive(Debug, Serialize)]
pub struct MentionsResponse {
    pub mentions: Mentions,
    pub counts: ReferenceCounts,
}

async fn mentions(
    State(state): State<AppState>,
    session: Session,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<MentionsResponse>> {
    session.require_auth()?;
    kind(&state, &collection)?;
    let doc = load_existing(&state, &collection, &id).await?;

    let mentions = state.scanner.scan(&doc, &collection).await?;
    let counts = state.counter.counts(&doc, &collection, &mentions).await;
    Ok(Json(MentionsResponse { mentions, counts }))
}

#[derive(Debug, Deserialize)]
pub struct ReferencesBody {
    pub references: ReferenceMap,
}

async fn update_references(
    State(state): State<AppState>,
    session: Session,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<ReferencesBody>,
) -> Result<Json<Value>> {
    session.require_admin()?;
    let kind = kind(&state, &collection)?;
    let doc = load_existing(&state, &collection, &id).await?;

    let saved = state
        .editor
        .commit(&collection, doc, body.references, session.author())
        .await?;
    Ok(Json(kind.view(&saved)))
}
