use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::category::Category;
use crate::engine::NewsEngine;
use crate::model::{ArticleId, PageRequest, RankedPage, TrendingKeyword, UserId};

const MAX_PAGE_SIZE: usize = 100;
const MAX_PAGE_INDEX: usize = 10_000;
const MAX_TRENDING_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<NewsEngine>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/news/{id}/view", post(record_view))
        .route("/news/{id}/views", get(view_counts))
        .route("/trending/keywords", get(trending))
        .route("/trending/keywords/category/{name}", get(trending_by_category))
        .route("/recommend/{user_id}", get(recommended))
        .route("/recommend/{user_id}/personalized", get(personalized))
        .route("/popular", get(popular))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct ViewResp {
    article_id: ArticleId,
    views: u64,
}

#[derive(Serialize)]
struct ViewCountsResp {
    article_id: ArticleId,
    views: u64,
    daily_views: u64,
}

async fn record_view(State(state): State<AppState>, Path(id): Path<ArticleId>) -> Json<ViewResp> {
    let views = state.engine.record_view(id).await;
    Json(ViewResp {
        article_id: id,
        views,
    })
}

async fn view_counts(State(state): State<AppState>, Path(id): Path<ArticleId>) -> Json<ViewCountsResp> {
    let views = state.engine.view_count(id).await;
    let daily_views = state.engine.daily_view_count(id).await;
    Json(ViewCountsResp {
        article_id: id,
        views,
        daily_views,
    })
}

#[derive(Deserialize)]
struct TrendingQuery {
    #[serde(default = "default_hours")]
    hours: u32,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_hours() -> u32 {
    24
}

fn default_limit() -> usize {
    10
}

#[derive(Deserialize)]
struct LimitQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

async fn trending(
    State(state): State<AppState>,
    Query(q): Query<TrendingQuery>,
) -> Json<Vec<TrendingKeyword>> {
    let limit = q.limit.min(MAX_TRENDING_LIMIT);
    Json(state.engine.trending_keywords(q.hours, limit).await)
}

#[derive(Serialize)]
struct ErrorResp {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'static str>,
}

async fn trending_by_category(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Vec<TrendingKeyword>>, (StatusCode, Json<ErrorResp>)> {
    let category = Category::parse(&name).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResp {
                error: e.to_string(),
                suggestion: e.suggestion,
            }),
        )
    })?;
    let limit = q.limit.min(MAX_TRENDING_LIMIT);
    Ok(Json(
        state
            .engine
            .trending_keywords_by_category(category, limit)
            .await,
    ))
}

#[derive(Deserialize)]
struct PageQuery {
    #[serde(default)]
    page: usize,
    #[serde(default = "default_limit")]
    size: usize,
}

impl PageQuery {
    fn request(&self) -> PageRequest {
        PageRequest::new(self.page.min(MAX_PAGE_INDEX), self.size.clamp(1, MAX_PAGE_SIZE))
    }
}

async fn recommended(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(q): Query<PageQuery>,
) -> Json<RankedPage> {
    Json(state.engine.recommended_news(user_id, q.request()).await)
}

async fn personalized(State(state): State<AppState>, Path(user_id): Path<UserId>) -> Json<RankedPage> {
    Json(state.engine.personalized_news(user_id).await)
}

async fn popular(State(state): State<AppState>, Query(q): Query<PageQuery>) -> Json<RankedPage> {
    Json(state.engine.popular_news(q.request()).await)
}
