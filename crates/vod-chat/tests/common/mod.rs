#![allow(dead_code)]

use std::sync::Arc;

use mockito::{Matcher, Mock, Server};
use serde_json::{Value, json};
use vod_chat::{ApiConfig, ChatlogClient, TwitchApiClient};

pub const CLIENT_ID: &str = "integration-client";
pub const VOD_ID: &str = "79240813";

/// 2016-07-09T16:00:00Z
pub const RECORDED_AT: &str = "2016-07-09T16:00:00Z";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Plain HTTP client for the local mock server.
pub fn plain_http_client() -> reqwest::Client {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let tls_config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(rustls::RootCertStore::empty())
        .with_no_client_auth();
    reqwest::Client::builder()
        .use_preconfigured_tls(tls_config)
        .build()
        .unwrap()
}

pub fn chatlog_client(server: &Server) -> ChatlogClient {
    let config = ApiConfig::default()
        .with_base_url(server.url())
        .with_client_id(CLIENT_ID);
    let api = Arc::new(TwitchApiClient::with_client(plain_http_client(), config));
    ChatlogClient::with_fetchers(api.clone(), api)
}

/// Comment posted `offset_secs` seconds into the recording.
pub fn comment(offset_secs: u64, source: &str, body: &str) -> Value {
    let created_at = chrono::DateTime::parse_from_rfc3339(RECORDED_AT).unwrap()
        + chrono::Duration::seconds(offset_secs as i64);
    json!({
        "_id": format!("{source}-{offset_secs}"),
        "created_at": created_at.to_rfc3339(),
        "content_offset_seconds": offset_secs,
        "source": source,
        "commenter": {"display_name": "viewer"},
        "message": {"body": body},
    })
}

pub async fn mock_video(server: &mut Server, length_secs: u64) -> Mock {
    server
        .mock("GET", format!("/kraken/videos/{VOD_ID}").as_str())
        .match_header("client-id", CLIENT_ID)
        .match_header("accept", "application/vnd.twitchtv.v5+json")
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "_id": format!("v{VOD_ID}"),
                "recorded_at": RECORDED_AT,
                "length": length_secs,
            })
            .to_string(),
        )
        .create_async()
        .await
}

pub async fn mock_page(
    server: &mut Server,
    query: (&str, &str),
    comments: Vec<Value>,
    next: Option<&str>,
) -> Mock {
    server
        .mock("GET", format!("/kraken/videos/{VOD_ID}/comments").as_str())
        .match_header("client-id", CLIENT_ID)
        .match_query(Matcher::UrlEncoded(query.0.into(), query.1.into()))
        .with_header("content-type", "application/json")
        .with_body(json!({"comments": comments, "_next": next}).to_string())
        .create_async()
        .await
}

pub fn bodies(comments: &[vod_chat::CommentRecord]) -> Vec<String> {
    comments
        .iter()
        .filter_map(|c| c.get("message")?.get("body")?.as_str().map(str::to_owned))
        .collect()
}
