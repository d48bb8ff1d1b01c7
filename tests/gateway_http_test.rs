use axum::{Json, Router, routing::post};
use serde_json::json;
use tokio::time::{Duration, sleep};
use waifu_chat::config::WaifuConfig;

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral")
        .local_addr()
        .expect("local addr")
        .port()
}

async fn start_mock_ollama() -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route(
        "/api/chat",
        post(|| async {
            Json(json!({
                "message": {"role": "assistant", "content": "Hello! Nice to meet you!"},
                "prompt_eval_count": 20,
                "eval_count": 6,
            }))
        }),
    );
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), handle)
}

fn ollama_config(port: u16, ollama_url: String) -> WaifuConfig {
    let mut config = WaifuConfig::default();
    config.gateway.bind = "127.0.0.1".to_string();
    config.gateway.port = port;
    config.ai.provider = "ollama".to_string();
    config.ai.ollama_url = ollama_url;
    config
}

async fn wait_for_health(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{port}/health");

    for _ in 0..80 {
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        sleep(Duration::from_millis(50)).await;
    }

    panic!("gateway did not become healthy at {url}");
}

#[tokio::test]
async fn run_rejects_non_loopback_without_token() {
    let mut config = WaifuConfig::default();
    config.gateway.bind = "0.0.0.0".to_string();
    config.gateway.port = free_port();

    let err = waifu_chat::gateway::run(config, None)
        .await
        .expect_err("non-loopback run without token must fail");
    assert!(err.to_string().contains("Auth token required"));
}

#[tokio::test]
async fn run_rejects_gemini_without_key() {
    let mut config = WaifuConfig::default();
    config.gateway.port = free_port();
    config.ai.api_key = None;

    let err = waifu_chat::gateway::run(config, None)
        .await
        .expect_err("gemini without a key must fail");
    assert!(err.to_string().contains("GEMINI_API_KEY"));
}

#[tokio::test]
async fn chat_round_trip_through_ollama() {
    let (ollama_url, ollama) = start_mock_ollama().await;
    let port = free_port();
    let config = ollama_config(port, ollama_url);
    let gateway = tokio::spawn(async move {
        let _ = waifu_chat::gateway::run(config, None).await;
    });

    wait_for_health(port).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://127.0.0.1:{port}/api/chat/message"))
        .json(&json!({"message": "hi!", "session_id": "web-1"}))
        .send()
        .await
        .expect("chat response");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["session_id"], "web-1");
    assert_eq!(body["response"], "Hello! Nice to meet you!");
    assert_eq!(body["emotion"], "Greeting");
    assert_eq!(body["tokens"], 26);
    assert_eq!(body["cached"], false);

    let stats: serde_json::Value = client
        .get(format!("http://127.0.0.1:{port}/api/chat/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["provider"], "ollama");

    gateway.abort();
    let _ = gateway.await;
    ollama.abort();
}

#[tokio::test]
async fn cors_preflight_allows_frontend_origin() {
    let (ollama_url, ollama) = start_mock_ollama().await;
    let port = free_port();
    let config = ollama_config(port, ollama_url);
    let gateway = tokio::spawn(async move {
        let _ = waifu_chat::gateway::run(config, None).await;
    });

    wait_for_health(port).await;

    let resp = reqwest::Client::new()
        .request(
            reqwest::Method::OPTIONS,
            format!("http://127.0.0.1:{port}/api/chat/message"),
        )
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .expect("preflight response");

    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:5173")
    );

    gateway.abort();
    let _ = gateway.await;
    ollama.abort();
}
