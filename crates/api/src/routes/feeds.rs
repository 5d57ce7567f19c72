//! Feed Routes

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use storage::Feed;

use crate::auth::SIGNATURE_HEADER;
use crate::error::ApiError;
use crate::query::parse_bound;
use crate::AppState;

/// Query parameters for range and latest endpoints.
///
/// Kept as strings so malformed bounds surface as `QueryError`.
#[derive(Debug, Deserialize)]
pub struct BoundsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Accept one signed reading
pub async fn post_feed(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Feed>), ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    state.verifier.verify(signature, &body)?;

    let feed = state.ingest.submit_json(&body).await?;
    Ok((StatusCode::CREATED, Json(feed)))
}

/// Decimated feeds strictly between `from` and `to`
pub async fn get_range(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BoundsQuery>,
) -> Result<Json<Vec<Feed>>, ApiError> {
    let from = parse_bound("from", params.from.as_deref())?;
    let to = parse_bound("to", params.to.as_deref())?;

    Ok(Json(state.query.range(from, to).await?))
}

/// Decimated feeds newer than `from`
pub async fn get_latest(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BoundsQuery>,
) -> Result<Json<Vec<Feed>>, ApiError> {
    let from = parse_bound("from", params.from.as_deref())?;

    Ok(Json(state.query.latest_since(from).await?))
}

#[cfg(test)]
mod tests {
    use crate::settings::Settings;
    use crate::{create_router, AppState};
    use axum::{
        body::{to_bytes, Body},
        extract::ConnectInfo,
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use storage::{Feed, MemoryStore, ReadingStore};
    use tower::ServiceExt;

    const KEY: &str = "station-shared-key";

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.auth.signing_key = Some(KEY.to_string());
        settings.rate_limit.burst_size = 100;
        settings
    }

    fn app_with(settings: &Settings) -> (Arc<AppState>, Router) {
        let store: Arc<dyn ReadingStore> = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState::new(store, settings));
        let router = create_router(state.clone(), settings).unwrap();
        (state, router)
    }

    fn post(state: &AppState, body: &str, signed: bool) -> Request<Body> {
        let mut builder = Request::post("/api/v1/feeds").header("content-type", "application/json");
        if signed {
            let signature = state.verifier.sign(body.as_bytes()).unwrap();
            builder = builder.header("x-signature", signature);
        }
        let mut request = builder.body(Body::from(body.to_string())).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 40000))));
        request
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_signed_post_is_stored() {
        let (state, router) = app_with(&settings());

        let body = r#"{"stationId":"north","temperature":21.5,"humidity":44}"#;
        let (status, json) = send(&router, post(&state, body, true)).await;

        assert_eq!(status, StatusCode::CREATED);
        let feed: Feed = serde_json::from_value(json).unwrap();
        assert_eq!(feed.id, 1);
        assert_eq!(feed.station_id, "north");
        assert_eq!(feed.temperature, 21.5);
        assert_eq!(state.store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unsigned_post_rejected() {
        let (state, router) = app_with(&settings());

        let body = r#"{"stationId":"north","temperature":21.5,"humidity":44}"#;
        let (status, json) = send(&router, post(&state, body, false)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "missing x-signature header");
        assert_eq!(state.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bad_signature_rejected() {
        let (state, router) = app_with(&settings());

        let mut request = post(&state, r#"{"stationId":"n","temperature":1,"humidity":1}"#, false);
        request
            .headers_mut()
            .insert("x-signature", "00".repeat(32).parse().unwrap());
        let (status, _) = send(&router, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_reading_is_bad_request() {
        let (state, router) = app_with(&settings());

        let body = r#"{"stationId":"","temperature":21.5,"humidity":44}"#;
        let (status, json) = send(&router, post(&state, body, true)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Field must not be blank: stationId");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let (state, router) = app_with(&settings());

        let padding = "x".repeat(2048);
        let body = format!(
            r#"{{"stationId":"north","temperature":1,"humidity":1,"note":"{}"}}"#,
            padding
        );
        let (status, _) = send(&router, post(&state, &body, true)).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(state.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unsigned_accepted_without_key() {
        let mut settings = settings();
        settings.auth.signing_key = None;
        let (state, router) = app_with(&settings);

        let body = r#"{"stationId":"north","temperature":1,"humidity":2}"#;
        let (status, _) = send(&router, post(&state, body, false)).await;

        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let mut settings = settings();
        settings.rate_limit.burst_size = 2;
        settings.rate_limit.per_second = 60;
        let (state, router) = app_with(&settings);

        let body = r#"{"stationId":"north","temperature":1,"humidity":2}"#;
        let mut statuses = Vec::new();
        for _ in 0..3 {
            statuses.push(send(&router, post(&state, body, true)).await.0);
        }

        assert_eq!(
            statuses,
            [StatusCode::CREATED, StatusCode::CREATED, StatusCode::TOO_MANY_REQUESTS]
        );
    }

    #[tokio::test]
    async fn test_range_query() {
        let (state, router) = app_with(&settings());

        let body = r#"{"stationId":"north","temperature":10,"humidity":40}"#;
        let (_, json) = send(&router, post(&state, body, true)).await;
        let stored: Feed = serde_json::from_value(json).unwrap();
        let t = stored.tstamp;

        let uri = format!("/api/v1/feeds?from={}&to={}", t - 1, t + 1);
        let (status, json) = send(&router, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        let feeds: Vec<Feed> = serde_json::from_value(json).unwrap();
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].station_id, "north");
        assert_eq!(feeds[0].temperature, 10.0);
        assert_eq!(feeds[0].tstamp % 600_000, 0);

        let uri = format!("/api/v1/feeds?from={}&to={}", t, t);
        let (status, json) = send(&router, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_latest_query() {
        let (state, router) = app_with(&settings());

        let body = r#"{"stationId":"south","temperature":3,"humidity":97}"#;
        send(&router, post(&state, body, true)).await;

        let (status, json) = send(&router, get("/api/v1/feeds/latest?from=0")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["stationId"], "south");
        assert_eq!(json[0]["humidity"], 97.0);
    }

    #[tokio::test]
    async fn test_malformed_bounds() {
        let (_state, router) = app_with(&settings());

        for uri in [
            "/api/v1/feeds?from=abc&to=10",
            "/api/v1/feeds?from=-1&to=10",
            "/api/v1/feeds?from=0",
            "/api/v1/feeds/latest",
            "/api/v1/feeds/latest?from=1e3",
        ] {
            let (status, json) = send(&router, get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(json["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_health() {
        let (state, router) = app_with(&settings());
        send(
            &router,
            post(&state, r#"{"stationId":"a","temperature":1,"humidity":1}"#, true),
        )
        .await;

        let (status, json) = send(&router, get("/api/v1/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["feed_count"], 1);
        assert_eq!(json["signing_enabled"], true);
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let (_state, router) = app_with(&settings());
        let response = router.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
