use super::*;
use axum::{http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

#[derive(Debug, Deserialize, PartialEq)]
struct Named {
    id: i64,
    name: String,
}

async fn users() -> Json<Value> {
    Json(json!([{ "id": 1, "name": "Leanne" }, { "id": 2, "name": "Ervin" }]))
}

async fn products() -> Json<Value> {
    Json(json!({ "products": [{ "id": 7, "name": "Phone" }], "total": 1 }))
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(500)).await;
    Json(json!([]))
}

async fn spawn_api_server() -> Url {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = Router::new()
        .route("/users", get(users))
        .route("/products", get(products))
        .route("/broken", get(broken))
        .route("/slow", get(slow));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Url::parse(&format!("http://{addr}")).expect("server url")
}

#[tokio::test]
async fn reads_a_bare_array_body() {
    let base = spawn_api_server().await;
    let source = HttpSource::default();

    let rows: Vec<Named> = source
        .get_list(&endpoint(&base, "users", None).expect("url"), None)
        .await
        .expect("users");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].name, "Ervin");
}

#[tokio::test]
async fn reads_an_array_under_a_named_field() {
    let base = spawn_api_server().await;
    let source = HttpSource::default();

    let rows: Vec<Named> = source
        .get_list(
            &endpoint(&base, "products", Some(50)).expect("url"),
            Some("products"),
        )
        .await
        .expect("products");

    assert_eq!(
        rows,
        vec![Named {
            id: 7,
            name: "Phone".into()
        }]
    );
}

#[tokio::test]
async fn non_success_status_is_a_status_error() {
    let base = spawn_api_server().await;
    let url = endpoint(&base, "broken", None).expect("url");

    let err = HttpSource::default()
        .get_json(&url)
        .await
        .expect_err("500");

    assert_eq!(
        err,
        LoadError::Status {
            url: url.to_string(),
            status: 500
        }
    );
}

#[tokio::test]
async fn slow_response_is_a_timeout() {
    let base = spawn_api_server().await;
    let source = HttpSource::new(Duration::from_millis(50));

    let err = source
        .get_json(&endpoint(&base, "slow", None).expect("url"))
        .await
        .expect_err("timeout");

    assert!(
        matches!(err, LoadError::Timeout { timeout_ms: 50, .. }),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn wrong_shape_is_a_decode_error() {
    let base = spawn_api_server().await;
    let url = endpoint(&base, "products", None).expect("url");

    let err = HttpSource::default()
        .get_list::<Named>(&url, Some("carts"))
        .await
        .expect_err("missing field");

    assert!(matches!(err, LoadError::Decode { .. }));
}

#[test]
fn endpoint_joins_paths_with_or_without_trailing_slash() {
    let plain = Url::parse("https://dummyjson.com").expect("url");
    let nested = Url::parse("https://example.test/api/").expect("url");

    assert_eq!(
        endpoint(&plain, "carts", Some(20)).expect("url").as_str(),
        "https://dummyjson.com/carts?limit=20"
    );
    assert_eq!(
        endpoint(&nested, "users", None).expect("url").as_str(),
        "https://example.test/api/users"
    );
}

#[test]
fn extract_array_rejects_scalars() {
    assert!(extract_array(json!(3), Some("users")).is_err());
    assert!(extract_array(json!({ "users": {} }), Some("users")).is_err());
    assert_eq!(
        extract_array(json!({ "users": [1] }), Some("users")),
        Ok(json!([1]))
    );
}
