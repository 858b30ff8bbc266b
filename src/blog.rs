use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use reqwest::blocking::{multipart, Client as HttpClient};
use reqwest::header::USER_AGENT;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::cookies::TokenProvider;

/// Marks the request as programmatic so the server answers with JSON
/// instead of a rendered page.
pub const XHR_HEADER: &str = "X-Requested-With";
pub const XHR_VALUE: &str = "XMLHttpRequest";
/// Carries the anti-forgery token echoed from the cookie.
pub const TOKEN_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub http_client: Option<HttpClient>,
}

/// Request body for a mutating call.
#[derive(Debug, Clone)]
pub enum Body {
    /// URL-encoded key/value pairs.
    Form(Vec<(String, String)>),
    /// Multipart form fields.
    Multipart(Vec<(String, String)>),
}

/// Uniform outcome of a mutating call. Transport failures are folded into
/// a synthetic failure (status 0 plus an `error` field) so callers never
/// see a raw transport error.
#[derive(Debug, Clone)]
pub struct Submission {
    pub status: u16,
    pub data: Value,
}

impl Submission {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Server-supplied error message, surfaced verbatim when present.
    pub fn error_message(&self) -> Option<&str> {
        self.data.get("error").and_then(Value::as_str)
    }

    fn failure(message: &str) -> Self {
        Submission {
            status: 0,
            data: serde_json::json!({ "error": message }),
        }
    }
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    tokens: Arc<dyn TokenProvider>,
}

impl Client {
    pub fn new(tokens: Arc<dyn TokenProvider>, config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("blog client user agent required");
        }
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(Duration::from_secs(20))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            tokens,
        })
    }

    /// POSTs `body` to `url` with the AJAX and token headers attached.
    ///
    /// Fire-once: no retries. Network errors and non-JSON bodies come back
    /// as a synthetic failure Submission; non-2xx responses with a JSON
    /// body keep that body so the caller can surface the server's `error`
    /// field.
    pub fn submit(&self, url: &str, body: Body) -> Submission {
        // Read the token per call, it can rotate between requests.
        let token = self.tokens.token();
        let mut req = self
            .http
            .post(url)
            .header(USER_AGENT, self.user_agent.clone())
            .header(XHR_HEADER, XHR_VALUE)
            .header(TOKEN_HEADER, token);

        req = match body {
            Body::Form(fields) => req.form(&fields),
            Body::Multipart(fields) => {
                let mut form = multipart::Form::new();
                for (key, value) in fields {
                    form = form.text(key, value);
                }
                req.multipart(form)
            }
        };

        let resp = match req.send() {
            Ok(resp) => resp,
            Err(_) => return Submission::failure("network error, please try again"),
        };
        let status = resp.status().as_u16();
        match resp.json::<Value>() {
            Ok(data) => Submission { status, data },
            Err(_) => Submission::failure("unexpected response from server"),
        }
    }

    // The typed wrappers post multipart bodies, matching what the blog's
    // own HTML forms submit.

    pub fn toggle_like(&self, url: &str) -> Result<LikeStatus> {
        decode(
            self.submit(url, Body::Multipart(Vec::new())),
            "could not update like",
        )
    }

    pub fn create_comment(&self, url: &str, content: &str) -> Result<CommentCreated> {
        if content.trim().is_empty() {
            bail!("comment text is required");
        }
        let fields = vec![("content".to_string(), content.to_string())];
        decode(
            self.submit(url, Body::Multipart(fields)),
            "could not post comment",
        )
    }

    pub fn delete_comment(&self, url: &str) -> Result<CommentDeleted> {
        decode(
            self.submit(url, Body::Multipart(Vec::new())),
            "could not delete comment",
        )
    }

    pub fn edit_comment(&self, url: &str, content: &str) -> Result<CommentEdited> {
        if content.trim().is_empty() {
            bail!("comment text is required");
        }
        let fields = vec![("content".to_string(), content.to_string())];
        decode(
            self.submit(url, Body::Multipart(fields)),
            "could not save comment",
        )
    }
}

fn decode<T>(submission: Submission, fallback: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    if !submission.is_success() {
        match submission.error_message() {
            Some(message) => bail!("{}", message),
            None => bail!("{}", fallback),
        }
    }
    serde_json::from_value(submission.data).map_err(|_| anyhow!("{}", fallback))
}

/// Like state as reported by the server. Some endpoints use `liked`, others
/// `is_liked`; both decode here.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LikeStatus {
    #[serde(alias = "liked")]
    pub is_liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentCreated {
    pub id: i64,
    pub user: String,
    pub content: String,
    #[serde(default)]
    pub created_at: String,
    pub comment_count: i64,
    #[serde(default)]
    pub can_modify: Option<bool>,
    #[serde(default)]
    pub edit_url: Option<String>,
    #[serde(default)]
    pub delete_url: Option<String>,
}

impl CommentCreated {
    /// Servers signal modify rights either with an explicit flag or by
    /// including the edit/delete URLs.
    pub fn modifiable(&self) -> bool {
        self.can_modify
            .unwrap_or_else(|| self.edit_url.is_some() || self.delete_url.is_some())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentDeleted {
    pub deleted: bool,
    pub comment_id: i64,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentEdited {
    pub content: String,
    #[serde(default)]
    pub comment_id: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::StaticToken;
    use std::thread;
    use tiny_http::{Header, Response, Server};

    fn client() -> Client {
        Client::new(
            Arc::new(StaticToken("tok-456".to_string())),
            ClientConfig {
                user_agent: "blog-tui-test/0.1".to_string(),
                http_client: None,
            },
        )
        .unwrap()
    }

    /// One-shot JSON server; returns its URL and a handle that yields the
    /// request headers it saw.
    fn serve_once(status: u16, body: &'static str) -> (String, thread::JoinHandle<Vec<(String, String)>>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", server.server_addr());
        let handle = thread::spawn(move || {
            let request = server.recv().unwrap();
            let headers = request
                .headers()
                .iter()
                .map(|h| (h.field.as_str().as_str().to_ascii_lowercase(), h.value.as_str().to_string()))
                .collect();
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap(),
                );
            let _ = request.respond(response);
            headers
        });
        (url, handle)
    }

    #[test]
    fn submit_attaches_ajax_and_token_headers() {
        let (url, handle) = serve_once(200, r#"{"ok": true}"#);
        let submission = client().submit(&url, Body::Form(Vec::new()));
        assert!(submission.is_success());

        let headers = handle.join().unwrap();
        let lookup = |name: &str| {
            headers
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value.clone())
        };
        assert_eq!(lookup("x-requested-with").as_deref(), Some("XMLHttpRequest"));
        assert_eq!(lookup("x-csrftoken").as_deref(), Some("tok-456"));
    }

    #[test]
    fn like_status_accepts_both_key_variants() {
        let (url, handle) = serve_once(200, r#"{"liked": true, "like_count": 5}"#);
        let status = client().toggle_like(&url).unwrap();
        assert!(status.is_liked);
        assert_eq!(status.like_count, 5);
        handle.join().unwrap();

        let (url, handle) = serve_once(200, r#"{"is_liked": false, "like_count": 4}"#);
        let status = client().toggle_like(&url).unwrap();
        assert!(!status.is_liked);
        assert_eq!(status.like_count, 4);
        handle.join().unwrap();
    }

    #[test]
    fn server_error_field_is_surfaced_verbatim() {
        let (url, handle) = serve_once(403, r#"{"error": "login required"}"#);
        let err = client().toggle_like(&url).unwrap_err();
        assert_eq!(err.to_string(), "login required");
        handle.join().unwrap();
    }

    #[test]
    fn non_json_body_becomes_synthetic_failure() {
        let (url, handle) = serve_once(200, "<html>oops</html>");
        let submission = client().submit(&url, Body::Form(Vec::new()));
        assert_eq!(submission.status, 0);
        assert!(submission.error_message().is_some());
        handle.join().unwrap();
    }

    #[test]
    fn network_error_becomes_synthetic_failure() {
        // Port 1 is reserved and unbound.
        let submission = client().submit("http://127.0.0.1:1/", Body::Form(Vec::new()));
        assert_eq!(submission.status, 0);
        assert!(!submission.is_success());
        assert!(submission.error_message().is_some());
    }

    #[test]
    fn empty_comment_is_rejected_before_any_request() {
        // Unroutable URL: a request would fail loudly with the generic
        // message instead of the validation message asserted here.
        let err = client()
            .create_comment("http://127.0.0.1:1/", "   ")
            .unwrap_err();
        assert_eq!(err.to_string(), "comment text is required");
    }

    #[test]
    fn created_comment_decodes_capability_variants() {
        let with_flag: CommentCreated = serde_json::from_str(
            r#"{"id": 42, "user": "alice", "content": "Nice post!",
                "created_at": "2026-08-29 10:00", "comment_count": 3,
                "can_modify": true}"#,
        )
        .unwrap();
        assert!(with_flag.modifiable());

        let with_urls: CommentCreated = serde_json::from_str(
            r#"{"id": 43, "user": "bob", "content": "Agreed.",
                "comment_count": 4, "edit_url": "/comment/43/edit/",
                "delete_url": "/comment/43/delete/"}"#,
        )
        .unwrap();
        assert!(with_urls.modifiable());

        let without: CommentCreated = serde_json::from_str(
            r#"{"id": 44, "user": "carol", "content": "Hm.", "comment_count": 5}"#,
        )
        .unwrap();
        assert!(!without.modifiable());
    }

    #[test]
    fn delete_payload_decodes() {
        let (url, handle) = serve_once(
            200,
            r#"{"deleted": true, "comment_id": 42, "comment_count": 2}"#,
        );
        let payload = client().delete_comment(&url).unwrap();
        assert!(payload.deleted);
        assert_eq!(payload.comment_id, 42);
        assert_eq!(payload.comment_count, 2);
        handle.join().unwrap();
    }
}
