use recwell_sync::components::google_calendar::token::{StoredToken, TokenManager, DEFAULT_TOKEN_URI};
use recwell_sync::config::{Config, DEFAULT_TOKEN_PATH};
use recwell_sync::error::{auth_error, env_error, SyncResult};
use std::env;
use url::Url;

const REDIRECT_URI: &str = "http://localhost:8080";
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<()> {
    run().await?;
    Ok(())
}

async fn run() -> SyncResult<()> {
    dotenvy::dotenv().ok();

    let client_id = env::var("GOOGLE_CLIENT_ID").map_err(|_| env_error("GOOGLE_CLIENT_ID"))?;
    let client_secret =
        env::var("GOOGLE_CLIENT_SECRET").map_err(|_| env_error("GOOGLE_CLIENT_SECRET"))?;
    let token_path = env::var("GOOGLE_TOKEN_PATH").unwrap_or_else(|_| DEFAULT_TOKEN_PATH.to_string());

    let config = Config {
        google_client_id: client_id.clone(),
        google_client_secret: client_secret.clone(),
        token_path,
        ..Config::default()
    };
    let token_manager = TokenManager::new(&config)?;

    // Generate random state for security
    let state = uuid::Uuid::new_v4().to_string();

    let mut auth_url = Url::parse("https://accounts.google.com/o/oauth2/v2/auth")
        .map_err(|e| auth_error(&format!("Failed to parse URL: {}", e)))?;
    auth_url
        .query_pairs_mut()
        .append_pair("client_id", &client_id)
        .append_pair("redirect_uri", REDIRECT_URI)
        .append_pair("response_type", "code")
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent")
        .append_pair("scope", CALENDAR_SCOPE)
        .append_pair("state", &state);

    println!("Opening browser for Google Calendar authorization...");
    if webbrowser::open(auth_url.as_str()).is_err() {
        println!("Open this URL to continue:\n{}", auth_url);
    }

    let server = tiny_http::Server::http("127.0.0.1:8080")
        .map_err(|e| auth_error(&format!("Failed to start callback server: {}", e)))?;
    println!("Waiting for authorization callback...");

    let request = server
        .recv()
        .map_err(|e| auth_error(&format!("Failed to receive callback: {}", e)))?;
    let callback = Url::parse(REDIRECT_URI)
        .and_then(|base| base.join(request.url()))
        .map_err(|e| auth_error(&format!("Failed to parse callback: {}", e)))?;

    let param = |name: &str| {
        callback
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };
    if param("state").as_deref() != Some(state.as_str()) {
        return Err(auth_error("Callback state does not match the request"));
    }
    let code = param("code").ok_or_else(|| auth_error("No authorization code found in callback"))?;

    // Exchange code for tokens
    let client = reqwest::Client::new();
    let response = client
        .post(DEFAULT_TOKEN_URI)
        .form(&[
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("code", code.as_str()),
            ("redirect_uri", REDIRECT_URI),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| auth_error(&format!("Failed to get token: {}", e)))?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(auth_error(&format!("Failed to get token: {}", error_text)));
    }

    let token_data: serde_json::Value = response
        .json()
        .await
        .map_err(|e| auth_error(&format!("Failed to parse token response: {}", e)))?;

    let access_token = token_data
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| auth_error("Token response has no access_token"))?;
    let expires_in = token_data
        .get("expires_in")
        .and_then(|v| v.as_i64())
        .unwrap_or(3600);

    let token = StoredToken {
        access_token: Some(access_token.to_string()),
        refresh_token: token_data
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        expires_at: Some(chrono::Utc::now().timestamp() + expires_in),
        token_uri: Some(DEFAULT_TOKEN_URI.to_string()),
        client_id: Some(client_id),
        client_secret: Some(client_secret),
        ..Default::default()
    };
    token_manager.set_token(&token)?;

    let response =
        tiny_http::Response::from_string("Authorization successful! You can close this window.");
    request
        .respond(response)
        .map_err(|e| auth_error(&format!("Failed to answer callback: {}", e)))?;

    println!("Token successfully saved to {}", token_manager.path().display());

    Ok(())
}
