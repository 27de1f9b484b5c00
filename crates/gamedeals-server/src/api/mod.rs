mod games;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use gamedeals_scraper::{CrawlError, Crawler};
use gamedeals_store::{GameStore, StoreError};

use crate::middleware::{request_id, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GameStore>,
    pub crawler: Arc<Crawler>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    store: &'static str,
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            request_id: request_id.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "bad_request" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_store_error(request_id: String, error: &StoreError) -> ApiError {
    tracing::error!(error = %error, "store operation failed");
    ApiError::new(request_id, "internal_error", "store operation failed")
}

pub(super) fn map_crawl_error(request_id: String, error: &CrawlError) -> ApiError {
    tracing::error!(error = %error, "crawl failed");
    ApiError::new(request_id, "internal_error", "crawl failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/games",
            get(games::list_games).post(games::trigger_crawl),
        )
        .route("/api/games/refresh-expired", post(games::refresh_expired))
        .route("/api/games/{id}", get(games::get_game))
        .route(
            "/api/games/{id}/discount-records",
            get(games::list_discount_records),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthData {
                status: "ok",
                store: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!(request_id = %req_id.0, error = %e, "health check: store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthData {
                    status: "degraded",
                    store: "unavailable",
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use tower::ServiceExt;
    use uuid::Uuid;

    use gamedeals_core::{DiscountRecord, GameRecord, SelectorConfig};
    use gamedeals_scraper::{ClientConfig, CrawlConfig, ListingSelectors, SourceClient};
    use gamedeals_store::MemoryStore;

    /// App state over a fresh `MemoryStore`; the crawler points at an
    /// unroutable address and is never exercised by read tests.
    fn test_state(store: Arc<MemoryStore>) -> AppState {
        let client = SourceClient::new(ClientConfig {
            price_info_url: "http://127.0.0.1:9/price-info".to_owned(),
            price_info_param: "ids".to_owned(),
            timeout_secs: 1,
            user_agent: "gamedeals-test/0.1".to_owned(),
            max_retries: 0,
            backoff_base_secs: 0,
        })
        .expect("test SourceClient");
        let selectors = ListingSelectors::compile(&SelectorConfig::default())
            .expect("default selectors compile");
        let crawler = Crawler::new(
            client,
            selectors,
            CrawlConfig {
                listing_url: "http://127.0.0.1:9/games".to_owned(),
                page_size: 24,
                time_budget: std::time::Duration::from_secs(1),
                inter_page_delay: std::time::Duration::from_millis(0),
                refresh_chunk_size: 20,
            },
        );
        AppState {
            store,
            crawler: Arc::new(crawler),
        }
    }

    fn game(id: &str, name: &str, current: i64, start_day: u32) -> GameRecord {
        GameRecord {
            id: id.to_owned(),
            name: name.to_owned(),
            image: None,
            link: None,
            current_price: Some(current),
            regular_price: Some(current),
            discount_rate: None,
            discount_start_at: Some(Utc.with_ymd_and_hms(2024, 1, start_day, 0, 0, 0).unwrap()),
            discount_end_at: None,
            cheapest_price: Some(current),
            cheapest_price_end_at: None,
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&body).expect("json parse"))
    }

    #[tokio::test]
    async fn health_returns_ok_against_memory_store() {
        let app = build_app(test_state(Arc::new(MemoryStore::new())));
        let (status, json) = get_json(app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["store"], "ok");
    }

    #[tokio::test]
    async fn list_games_sorts_descending_by_default_and_pages() {
        let store = Arc::new(MemoryStore::new());
        store.put_game(&game("70000001", "Old", 100, 1)).await.unwrap();
        store.put_game(&game("70000002", "New", 200, 20)).await.unwrap();
        store.put_game(&game("70000003", "Mid", 300, 10)).await.unwrap();

        let app = build_app(test_state(Arc::clone(&store)));
        let (status, json) = get_json(app, "/api/games").await;
        assert_eq!(status, StatusCode::OK);
        let items = json.as_array().expect("array body");
        assert_eq!(items.len(), 3);
        // Default sort is newest discountStartAt first.
        assert_eq!(items[0]["id"], "70000002");
        assert_eq!(items[1]["id"], "70000003");
        assert_eq!(items[2]["id"], "70000001");

        let app = build_app(test_state(store));
        let (_, json) = get_json(app, "/api/games?pageNo=2&pageSize=2").await;
        let items = json.as_array().expect("array body");
        assert_eq!(items.len(), 1, "second page holds the remainder");
        assert_eq!(items[0]["id"], "70000001");
    }

    #[tokio::test]
    async fn list_games_sorts_ascending_on_bare_field() {
        let store = Arc::new(MemoryStore::new());
        store.put_game(&game("70000001", "Banjo", 100, 1)).await.unwrap();
        store.put_game(&game("70000002", "Axiom", 200, 2)).await.unwrap();

        let app = build_app(test_state(store));
        let (_, json) = get_json(app, "/api/games?sortBy=name").await;
        let items = json.as_array().expect("array body");
        assert_eq!(items[0]["name"], "Axiom");
        assert_eq!(items[1]["name"], "Banjo");
    }

    #[tokio::test]
    async fn get_game_returns_null_for_unknown_id() {
        let app = build_app(test_state(Arc::new(MemoryStore::new())));
        let (status, json) = get_json(app, "/api/games/79999999").await;
        assert_eq!(status, StatusCode::OK, "missing records are not errors");
        assert!(json.is_null());
    }

    #[tokio::test]
    async fn get_game_returns_camel_case_record() {
        let store = Arc::new(MemoryStore::new());
        store.put_game(&game("70000001", "Game A", 150, 1)).await.unwrap();

        let app = build_app(test_state(store));
        let (status, json) = get_json(app, "/api/games/70000001").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["currentPrice"], 150);
        assert_eq!(json["cheapestPrice"], 150);
    }

    #[tokio::test]
    async fn discount_records_default_to_newest_first() {
        let store = Arc::new(MemoryStore::new());
        for (price, day) in [(150, 1), (120, 15)] {
            store
                .insert_discount_record(&DiscountRecord {
                    id: Uuid::new_v4(),
                    game_id: "70000001".to_owned(),
                    regular_price: Some(200),
                    discount_price: price,
                    discount_rate: None,
                    discount_start_at: None,
                    discount_end_at: None,
                    created_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
                })
                .await
                .unwrap();
        }

        let app = build_app(test_state(store));
        let (status, json) = get_json(app, "/api/games/70000001/discount-records").await;
        assert_eq!(status, StatusCode::OK);
        let items = json.as_array().expect("array body");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["discountPrice"], 120, "newest createdAt first");
        assert_eq!(items[1]["discountPrice"], 150);
    }

    #[tokio::test]
    async fn discount_records_empty_for_unknown_game() {
        let app = build_app(test_state(Arc::new(MemoryStore::new())));
        let (status, json) = get_json(app, "/api/games/79999999/discount-records").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn trigger_crawl_rejects_malformed_body() {
        let app = build_app(test_state(Arc::new(MemoryStore::new())));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/games")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
