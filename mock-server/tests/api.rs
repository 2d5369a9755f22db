use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use mock_server::{app, app_with, Backend, Draw, Grid, NewGrid, GRIDS_PER_GENERATION};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// --- index ---

#[tokio::test]
async fn index_reports_running() {
    let resp = app().oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, "Euromillions Bot API is running");
}

// --- history ---

#[tokio::test]
async fn history_reports_processed_draws() {
    let draws = (1..=3)
        .map(|id| Draw {
            id,
            date: date(2024, 1, 2),
            numbers: vec![1, 2, 3, 4, 5],
            stars: vec![1, 2],
        })
        .collect();
    let resp = app_with(Backend::default().with_draws(draws))
        .oneshot(get("/history"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(body_bytes(resp).await, "History fetched. Processed 3 draws.");
}

// --- generate ---

#[tokio::test]
async fn generate_returns_grids_without_identity() {
    let resp = app().oneshot(get("/generate")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let raw: serde_json::Value = body_json(resp).await;
    let items = raw.as_array().unwrap();
    assert_eq!(items.len(), GRIDS_PER_GENERATION);
    for item in items {
        assert!(item.get("id").is_none());
        assert!(item.get("created_at").is_none());
        let grid: NewGrid = serde_json::from_value(item.clone()).unwrap();
        assert_eq!(grid.numbers.len(), 5);
        assert_eq!(grid.stars.len(), 2);
    }
}

// --- grids ---

#[tokio::test]
async fn grids_empty() {
    let resp = app().oneshot(get("/grids")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let grids: Vec<Grid> = body_json(resp).await;
    assert!(grids.is_empty());
}

#[tokio::test]
async fn grids_serialize_missing_created_at_as_null() {
    let backend = Backend::default().with_grids(vec![Grid {
        id: 2,
        draw_date: date(2024, 2, 1),
        numbers: vec![1, 2, 3, 4, 5],
        stars: vec![1, 2],
        created_at: None,
    }]);
    let resp = app_with(backend).oneshot(get("/grids")).await.unwrap();
    let raw: serde_json::Value = body_json(resp).await;
    assert_eq!(raw[0]["draw_date"], "2024-02-01");
    assert!(raw[0]["created_at"].is_null());
}

// --- outage ---

#[tokio::test]
async fn outage_fails_every_endpoint() {
    for uri in ["/history", "/generate", "/grids"] {
        let resp = app_with(Backend::default().with_outage("database unavailable"))
            .oneshot(get(uri))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(body_bytes(resp).await, "database unavailable", "{uri}");
    }
}

#[tokio::test]
async fn unknown_route_is_404() {
    let resp = app().oneshot(get("/draws")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- generate then list ---

#[tokio::test]
async fn generated_grids_are_listed() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/generate"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let generated: Vec<NewGrid> = body_json(resp).await;

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/grids"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let listed: Vec<Grid> = body_json(resp).await;

    assert_eq!(listed.len(), generated.len());
    assert!(listed.iter().all(|g| g.created_at.is_some()));
    // Newest first: the last generated grid is listed first.
    assert_eq!(listed[0].numbers, generated[generated.len() - 1].numbers);
    assert_eq!(listed[0].id, generated.len() as i64);
}
