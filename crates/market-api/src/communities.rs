use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use market_db::models::CommunityRow;
use market_types::api::JoinCommunityRequest;
use market_types::models::Community;

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiResult, written};
use crate::extract::{JsonBody, PathId, QueryParams};

#[derive(Debug, Deserialize)]
pub struct MembershipQuery {
    pub joined: Option<String>,
}

impl MembershipQuery {
    /// Only the literal `false` selects the communities the user has not joined.
    pub fn joined(&self) -> bool {
        self.joined.as_deref() != Some("false")
    }
}

fn community_response(row: CommunityRow) -> Community {
    Community {
        id: row.id,
        name: row.name,
    }
}

/// GET /communities
pub async fn list_communities(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let rows = blocking(&state, |state| Ok(state.db.list_communities()?)).await?;

    let communities: Vec<Community> = rows.into_iter().map(community_response).collect();
    Ok(Json(communities))
}

/// GET /users/{id}/communities?joined=
pub async fn list_user_communities(
    State(state): State<AppState>,
    PathId(user_id): PathId,
    QueryParams(query): QueryParams<MembershipQuery>,
) -> ApiResult<impl IntoResponse> {
    let joined = query.joined();
    let rows = blocking(&state, move |state| {
        Ok(state.db.list_user_communities(user_id, joined)?)
    })
    .await?;

    let communities: Vec<Community> = rows.into_iter().map(community_response).collect();
    Ok(Json(communities))
}

/// POST /users/{id}/communities
pub async fn join_community(
    State(state): State<AppState>,
    PathId(user_id): PathId,
    JsonBody(req): JsonBody<JoinCommunityRequest>,
) -> ApiResult<impl IntoResponse> {
    let community_id = req.community_id;
    blocking(&state, move |state| {
        written(
            state.db.join_community(user_id, community_id)?,
            "User or community",
            "Already a member of this community",
        )
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "user_id": user_id, "community_id": community_id })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(joined: Option<&str>) -> MembershipQuery {
        MembershipQuery {
            joined: joined.map(str::to_string),
        }
    }

    #[test]
    fn only_literal_false_negates() {
        assert!(query(None).joined());
        assert!(query(Some("true")).joined());
        assert!(query(Some("no")).joined());
        assert!(query(Some("FALSE")).joined());
        assert!(!query(Some("false")).joined());
    }
}
