//! HTTP Remote
//!
//! `reqwest` bindings for the ingredient REST endpoints.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::traits::IngredientRemote;
use crate::config::ClientConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::models::{ExportFormat, Ingredient, IngredientAnalysis, IngredientPatch, NewIngredient, OrderEntry};

/// Characters left unescaped in a path segment
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

// ========================
// Argument Structs
// ========================

#[derive(Serialize)]
struct ReorderArgs<'a> {
    items: &'a [OrderEntry],
}

#[derive(Serialize)]
struct AnalyzeArgs<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

// ========================
// Client
// ========================

pub struct HttpRemote {
    client: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl HttpRemote {
    pub fn new(config: &ClientConfig) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to build HTTP client: {}", e)))?;

        let root = config.base_url.trim().trim_end_matches('/');
        let base = match &config.product_id {
            Some(product) => format!("{}/products/{}/ingredients", root, encode(product)),
            None => format!("{}/ingredients", root),
        };

        Ok(Self {
            client,
            base,
            token: config.api_token.clone(),
        })
    }

    /// Collection URL every endpoint hangs off
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        if path.is_empty() {
            self.base.clone()
        } else {
            format!("{}/{}", self.base, path)
        }
    }

    fn item_url(&self, id: &str) -> String {
        self.url(&encode(id))
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and turn any non-2xx status into `RemoteError::Status`.
    async fn send(&self, builder: RequestBuilder) -> RemoteResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        log::debug!("Remote call failed with {}: {}", status, message);
        Err(RemoteError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// `message` or `error` from a JSON body, else the raw body, else the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message.or(parsed.error) {
            return message;
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status.canonical_reason().unwrap_or("request failed").to_string()
}

#[async_trait]
impl IngredientRemote for HttpRemote {
    async fn list(&self) -> RemoteResult<Vec<Ingredient>> {
        let response = self.send(self.request(Method::GET, self.url(""))).await?;
        Ok(response.json().await?)
    }

    async fn create(&self, draft: &NewIngredient) -> RemoteResult<Ingredient> {
        let response = self
            .send(self.request(Method::POST, self.url("")).json(draft))
            .await?;
        Ok(response.json().await?)
    }

    async fn update(&self, id: &str, patch: &IngredientPatch) -> RemoteResult<Ingredient> {
        let response = self
            .send(self.request(Method::PATCH, self.item_url(id)).json(patch))
            .await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, id: &str) -> RemoteResult<()> {
        self.send(self.request(Method::DELETE, self.item_url(id))).await?;
        Ok(())
    }

    async fn reorder(&self, entries: &[OrderEntry]) -> RemoteResult<()> {
        self.send(
            self.request(Method::PUT, self.url("reorder"))
                .json(&ReorderArgs { items: entries }),
        )
        .await?;
        Ok(())
    }

    async fn analyze(&self, name: &str) -> RemoteResult<IngredientAnalysis> {
        let response = self
            .send(self.request(Method::POST, self.url("analyze")).json(&AnalyzeArgs { name }))
            .await?;
        Ok(response.json().await?)
    }

    async fn export(&self, format: ExportFormat) -> RemoteResult<String> {
        let response = self
            .send(
                self.request(Method::GET, self.url("export"))
                    .query(&[("format", format.as_str())]),
            )
            .await?;
        Ok(response.text().await?)
    }

    async fn search(&self, query: &str) -> RemoteResult<Vec<Ingredient>> {
        let response = self
            .send(self.request(Method::GET, self.url("search")).query(&[("q", query)]))
            .await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Unit;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const INGREDIENT_JSON: &str = r#"{"id":"srv-1","name":"wheat flour","quantity":200,"unit":"g","tags":[],"allergens":["gluten"],"order":0,"createdAt":"2024-05-01T10:00:00Z","updatedAt":"2024-05-01T10:00:00Z"}"#;

    /// Answer exactly one request with `status` and `body`; yields the raw request text.
    async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if request_complete(&raw) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });

        (format!("http://{}/api", addr), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    fn remote_for(base_url: &str) -> HttpRemote {
        let mut config = ClientConfig::new(base_url).with_product("p-1");
        config.api_token = Some("tok".to_string());
        config.timeout_secs = 5;
        HttpRemote::new(&config).unwrap()
    }

    #[test]
    fn test_base_url_scoping() {
        let scoped = HttpRemote::new(&ClientConfig::new("http://h/api/").with_product("a b")).unwrap();
        assert_eq!(scoped.base_url(), "http://h/api/products/a%20b/ingredients");

        let unscoped = HttpRemote::new(&ClientConfig::new("http://h/api")).unwrap();
        assert_eq!(unscoped.base_url(), "http://h/api/ingredients");
    }

    #[test]
    fn test_error_message_sources() {
        assert_eq!(error_message(StatusCode::BAD_REQUEST, r#"{"message":"bad unit"}"#), "bad unit");
        assert_eq!(error_message(StatusCode::BAD_REQUEST, r#"{"error":"nope"}"#), "nope");
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "upstream died"), "upstream died");
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
    }

    #[tokio::test]
    async fn test_list_sends_auth_and_parses() {
        let (base, server) = serve_once("200 OK", format!("[{}]", INGREDIENT_JSON)).await;
        let remote = remote_for(&base);

        let items = remote.list().await.unwrap();
        let request = server.await.unwrap().to_lowercase();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "srv-1");
        assert!(items[0].allergens.contains("gluten"));
        assert!(request.starts_with("get /api/products/p-1/ingredients http/1.1"));
        assert!(request.contains("authorization: bearer tok"));
    }

    #[tokio::test]
    async fn test_create_posts_camel_case_body() {
        let (base, server) = serve_once("201 Created", INGREDIENT_JSON.to_string()).await;
        let remote = remote_for(&base);

        let draft = NewIngredient::new("wheat flour", 200.0, Unit::G).with_notes("sifted");
        let created = remote.create(&draft).await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(created.name, "wheat flour");
        assert!(request.starts_with("POST /api/products/p-1/ingredients "));
        assert!(request.contains(r#""notes":"sifted""#));
        assert!(request.contains(r#""unit":"g""#));
    }

    #[tokio::test]
    async fn test_reorder_puts_items_payload() {
        let (base, server) = serve_once("200 OK", String::new()).await;
        let remote = remote_for(&base);

        remote
            .reorder(&[OrderEntry { id: "x".to_string(), order: 0 }])
            .await
            .unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("PUT /api/products/p-1/ingredients/reorder "));
        assert!(request.contains(r#"{"items":[{"id":"x","order":0}]}"#));
    }

    #[tokio::test]
    async fn test_search_encodes_query() {
        let (base, server) = serve_once("200 OK", "[]".to_string()).await;
        let remote = remote_for(&base);

        let found = remote.search("olive oil").await.unwrap();
        let request = server.await.unwrap();

        assert!(found.is_empty());
        assert!(request.starts_with("GET /api/products/p-1/ingredients/search?q=olive+oil "));
    }

    #[tokio::test]
    async fn test_non_success_status_maps_to_status_error() {
        let (base, server) = serve_once(
            "422 Unprocessable Entity",
            r#"{"message":"quantity must be positive"}"#.to_string(),
        )
        .await;
        let remote = remote_for(&base);

        let err = remote.delete("srv-1").await.unwrap_err();
        let request = server.await.unwrap();

        assert_eq!(
            err,
            RemoteError::Status {
                status: 422,
                message: "quantity must be positive".to_string()
            }
        );
        assert!(request.starts_with("DELETE /api/products/p-1/ingredients/srv-1 "));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let (base, server) = serve_once("200 OK", r#"{"tags": "oops"}"#.to_string()).await;
        let remote = remote_for(&base);

        let err = remote.analyze("salt").await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, RemoteError::Decode(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let remote = remote_for(&format!("http://{}/api", addr));
        let err = remote.list().await.unwrap_err();

        assert!(matches!(err, RemoteError::Transport(_)), "got {:?}", err);
    }
}
