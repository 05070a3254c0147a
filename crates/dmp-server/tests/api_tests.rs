//! HTTP surface tests driven through the router with `oneshot`

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use dmp_server::{build_router, AppState, AuthConfig, Environment, ServerConfig};
use dmp_store::{CatalogStore, MemoryBackend};
use dmp_test_utils::init_test_logging;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    memory: MemoryBackend,
}

fn app_with(config: ServerConfig) -> TestApp {
    init_test_logging();
    let memory = MemoryBackend::new();
    let store = CatalogStore::with_backend(Box::new(memory.clone()));
    let state = AppState::new(store, config.auth.clone());
    TestApp {
        router: build_router(state, &config),
        memory,
    }
}

fn app() -> TestApp {
    app_with(ServerConfig::default())
}

fn admin_only() -> TestApp {
    app_with(ServerConfig {
        auth: AuthConfig {
            require_admin_for_writes: true,
            admin_users: vec!["steward@example.com".to_string()],
            admin_groups: Vec::new(),
        },
        ..ServerConfig::default()
    })
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn write(method: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri("/api/data-products")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_put_then_get_round_trip() {
    let app = app();
    let (status, body) = send(
        &app.router,
        write(
            "PUT",
            &json!([
                {"name": "Sales Analytics", "tags": [" sales ", "", "sales"]},
                {"id": "DP0009", "name": "Inventory", "description": null}
            ]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "message": "Updated 2 products"}));

    let (status, body) = send(&app.router, get("/api/data-products")).await;
    assert_eq!(status, StatusCode::OK);
    let products = body.as_array().unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["id"], "DP0010");
    assert_eq!(products[0]["tags"], json!(["sales"]));
    assert_eq!(products[0]["qlik_url"], "");
    assert_eq!(products[1]["id"], "DP0009");
    assert_eq!(products[1]["description"], "");
}

#[tokio::test]
async fn test_put_rejects_non_array() {
    let app = app();
    let (status, body) = send(&app.router, write("PUT", &json!({"name": "A"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "expected array of products");
}

#[tokio::test]
async fn test_put_rejects_missing_name_without_mutation() {
    let app = app();
    send(&app.router, write("PUT", &json!([{"name": "Keep"}]))).await;

    let batch = json!([{"name": "A"}, {"owner": "x"}]);
    let (status, body) = send(&app.router, write("PUT", &batch)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("index 1"));

    let (_, body) = send(&app.router, get("/api/data-products")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Keep");
}

#[tokio::test]
async fn test_put_rejects_non_object_element_and_bad_json() {
    let app = app();
    let (status, body) = send(&app.router, write("PUT", &json!([{"name": "A"}, 7]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("index 1"));

    let request = Request::builder()
        .method("PUT")
        .uri("/api/data-products")
        .body(Body::from("[{"))
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_ids_conflict() {
    let app = app();
    let (status, body) = send(
        &app.router,
        write("PUT", &json!([{"id": "DP0001", "name": "A"}, {"id": "DP0001", "name": "B"}])),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_post_adds_one_product() {
    let app = app();
    send(&app.router, write("PUT", &json!([{"name": "First"}]))).await;

    let product = json!({"name": "Second", "tags": "x"});
    let (status, body) = send(&app.router, write("POST", &product)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "DP0002");
    assert_eq!(body["tags"], json!([]));

    let (_, body) = send(&app.router, get("/api/data-products")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unavailable_storage_is_503_not_empty() {
    let app = app();
    let (status, body) = send(&app.router, get("/api/data-products")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    app.memory.set_available(false);
    let (status, body) = send(&app.router, get("/api/data-products")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");

    let (status, body) = send(&app.router, get("/api/database-status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reachable"], false);
    assert_eq!(body["backend"], "in_memory");
}

#[tokio::test]
async fn test_database_status_counts_products() {
    let app = app();
    send(&app.router, write("PUT", &json!([{"name": "A"}, {"name": "B"}]))).await;
    let (status, body) = send(&app.router, get("/api/database-status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reachable"], true);
    assert_eq!(body["product_count"], 2);
}

#[tokio::test]
async fn test_user_info_from_forwarded_headers() {
    let app = admin_only();
    let request = Request::builder()
        .uri("/api/user-info")
        .header("X-Forwarded-Email", "steward@example.com")
        .header("X-Forwarded-Preferred-Username", "steward")
        .header("X-Forwarded-Groups", "stewards,readers")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "username": "steward",
            "email": "steward@example.com",
            "is_admin": true,
            "groups": ["stewards", "readers"]
        })
    );
}

#[tokio::test]
async fn test_writes_require_admin_when_configured() {
    let app = admin_only();
    let (status, body) = send(&app.router, write("PUT", &json!([{"name": "A"}]))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let request = Request::builder()
        .method("POST")
        .uri("/api/data-products")
        .header("X-Forwarded-Email", "Steward@Example.com")
        .body(Body::from(json!({"name": "A"}).to_string()))
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_unknown_api_path_is_json_404() {
    let app = app();
    let (status, body) = send(&app.router, get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_static_front_end_with_spa_fallback() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>catalog</html>").unwrap();
    std::fs::create_dir(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets").join("app.js"), "console.log(1)").unwrap();

    let app = app_with(ServerConfig {
        static_dir: Some(dir.path().to_path_buf()),
        ..ServerConfig::default()
    });

    let (status, body) = send(&app.router, get("/assets/app.js")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("console.log(1)".to_string()));

    let (status, body) = send(&app.router, get("/products/DP0001")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("<html>catalog</html>".to_string()));

    let (status, _) = send(&app.router, get("/api/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_production_cors_only_allows_platform_origins() {
    let app = app_with(ServerConfig {
        environment: Environment::Production,
        ..ServerConfig::default()
    });

    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/api/data-products")
            .header("Origin", origin)
            .header("Access-Control-Request-Method", "PUT")
            .body(Body::empty())
            .unwrap()
    };

    let response = app
        .router
        .clone()
        .oneshot(preflight("https://adb-1.azuredatabricks.net"))
        .await
        .unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://adb-1.azuredatabricks.net"
    );

    let response = app
        .router
        .clone()
        .oneshot(preflight("https://elsewhere.example.com"))
        .await
        .unwrap();
    assert!(response.headers().get("access-control-allow-origin").is_none());
}
