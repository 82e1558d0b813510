use anyhow::{Context, Result};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Characters that must not appear raw in a query-string keyword.
const QUERY_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`');

/// A single page response, split by the server's declared content type.
/// HTML bodies are kept raw for the scraping adapters; everything else is
/// parsed as JSON up front.
#[derive(Debug, Clone)]
pub enum PageResponse {
    Json(Value),
    Html(String),
}

impl PageResponse {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            PageResponse::Json(value) => Some(value),
            PageResponse::Html(_) => None,
        }
    }

    pub fn as_html(&self) -> Option<&str> {
        match self {
            PageResponse::Html(text) => Some(text),
            PageResponse::Json(_) => None,
        }
    }
}

pub struct HttpClient {
    inner: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(secs: u64) -> Result<Self> {
        let inner = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { inner })
    }

    /// GET a search page. `Ok(None)` means the server answered with an
    /// empty body; pagination treats that as a soft stop.
    pub fn get(&self, url: &str, extra_headers: Option<&Value>) -> Result<Option<PageResponse>> {
        let req = apply_headers(self.inner.get(url), extra_headers);
        let resp = req
            .send()
            .with_context(|| format!("GET {url} failed"))?;
        debug!("GET {} -> {}", url, resp.status());
        sniff(resp)
    }

    /// POST a JSON search body.
    pub fn post_json(
        &self,
        url: &str,
        body: &Value,
        extra_headers: Option<&Value>,
    ) -> Result<Option<PageResponse>> {
        let req = apply_headers(self.inner.post(url).json(body), extra_headers);
        let resp = req
            .send()
            .with_context(|| format!("POST {url} failed"))?;
        debug!("POST {} -> {}", url, resp.status());
        sniff(resp)
    }
}

fn apply_headers(
    mut req: reqwest::blocking::RequestBuilder,
    extra_headers: Option<&Value>,
) -> reqwest::blocking::RequestBuilder {
    if let Some(headers) = extra_headers.and_then(Value::as_object) {
        for (name, value) in headers {
            if let Some(value) = value.as_str() {
                req = req.header(name, value);
            }
        }
    }
    req
}

fn sniff(resp: reqwest::blocking::Response) -> Result<Option<PageResponse>> {
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let text = resp.text().context("Failed to read response body")?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    if content_type.contains("text/html") {
        Ok(Some(PageResponse::Html(text)))
    } else {
        let value: Value =
            serde_json::from_str(&text).context("Search response was not valid JSON")?;
        Ok(Some(PageResponse::Json(value)))
    }
}

/// Substitute the keyword into a GET URL template's `{}` placeholder,
/// percent-encoded.
pub fn keyword_url(template: &str, keyword: &str) -> String {
    let encoded = utf8_percent_encode(keyword, QUERY_ENCODE).to_string();
    template.replace("{}", &encoded)
}

/// POST vendor families name the keyword field differently.
pub fn body_keyword_field(portal: &str) -> &'static str {
    match portal {
        "Algolia" => "params.query",
        _ => "searchText",
    }
}

/// Workday-style bodies want a lowercased plus-joined keyword; query-object
/// bodies take it verbatim.
pub fn body_keyword_value(portal: &str, keyword: &str) -> String {
    match portal {
        "Algolia" => keyword.to_string(),
        _ => keyword.replace(' ', "+").to_lowercase(),
    }
}

/// Build a fresh POST body from the configured template with the keyword
/// written into the portal's field. Never mutates the template.
pub fn body_with_keyword(template: Option<&Value>, portal: &str, keyword: &str) -> Value {
    let mut body = template.cloned().unwrap_or_else(|| Value::Object(Map::new()));
    set_json_path(
        &mut body,
        body_keyword_field(portal),
        Value::String(body_keyword_value(portal, keyword)),
    );
    body
}

/// Set a dotted path inside a JSON object, creating intermediate objects
/// as needed.
pub fn set_json_path(root: &mut Value, path: &str, value: Value) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let last = match parts.pop() {
        Some(last) => last,
        None => return,
    };
    let mut cur = root;
    for part in parts {
        if !cur.is_object() {
            *cur = Value::Object(Map::new());
        }
        let Some(map) = cur.as_object_mut() else {
            return;
        };
        cur = map
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !cur.is_object() {
        *cur = Value::Object(Map::new());
    }
    if let Some(map) = cur.as_object_mut() {
        map.insert(last.to_string(), value);
    }
}
