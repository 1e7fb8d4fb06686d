use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    models::{AssetIdentity, AssetType, Candidate, Preferences},
    services::{
        identity::ResolveRequest,
        ranking::{rank_candidates, RankError, RankedCandidates},
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/Identity", post(resolve_identity))
        .route("/Candidates", post(get_candidates))
        .route("/Rank", post(rank))
}

#[derive(Debug, Deserialize)]
pub struct ReplaceRequest {
    pub path: String,
    /// "poster", "background", "season", "titlecard" (aliases accepted)
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub type_hint: Option<String>,
}

impl ReplaceRequest {
    fn to_resolve_request(&self) -> ResolveRequest {
        ResolveRequest {
            path: self.path.clone(),
            asset_type: self.asset_type.as_deref().and_then(AssetType::from_hint),
            type_hint: self.type_hint.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub session_id: String,
    pub identity: AssetIdentity,
    /// Name of the record source that matched, if any
    pub matched_source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CandidatesResponse {
    pub session_id: String,
    pub identity: AssetIdentity,
    pub active_group: String,
    pub groups: BTreeMap<String, Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub candidates: BTreeMap<String, Vec<Candidate>>,
    /// Explicit preferences; when absent the stored ones for `asset_type` apply
    #[serde(default)]
    pub preferences: Option<Preferences>,
    #[serde(default)]
    pub asset_type: Option<AssetType>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
            languages: None,
        }),
    )
}

impl From<RankError> for ApiError {
    fn from(err: RankError) -> Self {
        let languages = match &err {
            RankError::AllCandidatesFilteredByLanguage { languages } => Some(languages.clone()),
            RankError::NoCandidatesFound => None,
        };

        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: err.code().to_string(),
                message: err.to_string(),
                languages,
            }),
        )
    }
}

fn validate(req: &ReplaceRequest) -> Result<(), ApiError> {
    if req.path.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "path must not be empty",
        ));
    }
    Ok(())
}

/// POST /Replace/Identity - resolve what an artwork path belongs to
async fn resolve_identity(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReplaceRequest>,
) -> Result<Json<IdentityResponse>, ApiError> {
    validate(&req)?;

    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::info!("[{}] Resolving identity for {}", session_id, req.path);

    let resolution = state.identity.resolve(&req.to_resolve_request()).await;
    let matched_source = resolution.matched.map(|m| m.source);

    tracing::debug!(
        "[{}] Resolved {:?} '{}' ({:?}), source: {}",
        session_id,
        resolution.identity.asset_type,
        resolution.identity.title.as_deref().unwrap_or("?"),
        resolution.identity.year,
        matched_source.as_deref().unwrap_or("path only")
    );

    Ok(Json(IdentityResponse {
        session_id,
        identity: resolution.identity,
        matched_source,
    }))
}

/// POST /Replace/Candidates - resolve, search the providers and rank the results
async fn get_candidates(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReplaceRequest>,
) -> Result<Json<CandidatesResponse>, ApiError> {
    validate(&req)?;

    let Some(search) = state.search.as_ref() else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "provider_search_disabled",
            "No provider search endpoint configured",
        ));
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::info!("[{}] Fetching candidates for {}", session_id, req.path);

    let resolution = state.identity.resolve(&req.to_resolve_request()).await;
    let identity = resolution.identity;

    let results = search.search(&identity).await.map_err(|e| {
        tracing::error!("[{}] Provider search failed: {:#}", session_id, e);
        api_error(
            StatusCode::BAD_GATEWAY,
            "provider_search_failed",
            format!("Provider search failed: {}", e),
        )
    })?;

    let preferences = state
        .preferences
        .load()
        .await
        .resolve(identity.asset_type);

    let RankedCandidates {
        active_group,
        groups,
    } = rank_candidates(results, &preferences).map_err(|e| {
        tracing::info!("[{}] {}", session_id, e);
        e
    })?;

    tracing::debug!(
        "[{}] Active group {} ({} providers)",
        session_id,
        active_group,
        groups.len()
    );

    Ok(Json(CandidatesResponse {
        session_id,
        identity,
        active_group,
        groups,
    }))
}

/// POST /Replace/Rank - rank an already fetched candidate set
async fn rank(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RankRequest>,
) -> Result<Json<RankedCandidates>, ApiError> {
    let preferences = match req.preferences {
        Some(prefs) => prefs,
        None => state
            .preferences
            .load()
            .await
            .resolve(req.asset_type.unwrap_or_default()),
    };

    let ranked = rank_candidates(req.candidates, &preferences)?;
    Ok(Json(ranked))
}
