//! Network-backed probe and module host
//!
//! Replays what a browser would do against a deployment: HEAD the candidate,
//! fetch the script, and for initialization fetch the binary artifact the glue
//! code points at and check that it really is WebAssembly.

use crate::errors::{BootError, Result};
use crate::loader::{LoadedModule, ModuleHost};
use crate::probe::{ProbeResponse, ResourceClient};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// First four bytes of every WebAssembly binary
pub const WASM_MAGIC: &[u8; 4] = b"\0asm";

/// MIME type browsers require for streaming instantiation
pub const WASM_CONTENT_TYPE: &str = "application/wasm";

// Module statements may sit anywhere in minified output
static MODULE_SYNTAX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:^|[;{}\s])(?:export\s*[{*]|export\s+(?:default|const|let|var|function|class|async)\b|import\s*[{*"']|import\s+[\w$])"#,
    )
    .expect("valid module syntax regex")
});
static DEFAULT_EXPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"export\s+default\b|\bas\s+default\b").expect("valid default export regex")
});
static START_EXPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"export\s+(?:async\s+)?function\s+start\b|export\s*\{[^}]*\bstart\b[^}]*\}")
        .expect("valid start export regex")
});
static BINARY_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"['"]([^'"\s]*_bg\.wasm)['"]"#).expect("valid binary reference regex")
});

/// What a fetched script exports, as far as static inspection can tell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleExports {
    pub default_initializer: bool,
    pub start: bool,
    /// Binary artifact the glue loads when its initializer gets no argument
    pub binary_ref: Option<String>,
}

impl ModuleExports {
    /// Inspect module source; `None` when it does not look like an ES module
    pub fn scan(source: &str) -> Option<Self> {
        if source.trim().is_empty() || !MODULE_SYNTAX_RE.is_match(source) {
            return None;
        }

        Some(Self {
            default_initializer: DEFAULT_EXPORT_RE.is_match(source),
            start: START_EXPORT_RE.is_match(source),
            binary_ref: BINARY_REF_RE
                .captures(source)
                .map(|caps| caps[1].to_string()),
        })
    }
}

/// HTTP client rooted at the page being bootstrapped
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    page: Url,
}

impl HttpClient {
    pub fn new(page_url: &str, timeout: Duration) -> Result<Self> {
        let page = parse_url(page_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self { client, page })
    }

    pub fn page_url(&self) -> &Url {
        &self.page
    }

    /// Resolve a location against the page
    pub fn resolve(&self, location: &str) -> Result<Url> {
        self.page.join(location).map_err(|e| BootError::InvalidUrl {
            url: location.to_string(),
            reason: e.to_string(),
        })
    }

    /// Fetch the page HTML itself
    pub async fn fetch_page(&self) -> Result<String> {
        let response = self.client.get(self.page.clone()).send().await?;
        if !response.status().is_success() {
            return Err(BootError::Generic(format!(
                "page {} returned status {}",
                self.page,
                response.status()
            )));
        }
        Ok(response.text().await?)
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| BootError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl ResourceClient for HttpClient {
    async fn head(&self, location: &str) -> Result<ProbeResponse> {
        let url = self.resolve(location)?;
        let response = self.client.head(url).send().await?;

        Ok(ProbeResponse {
            status: response.status().as_u16(),
            content_type: content_type(&response),
        })
    }
}

#[async_trait]
impl ModuleHost for HttpClient {
    async fn import(&self, location: &str) -> Result<Box<dyn LoadedModule>> {
        let url = self.resolve(location)?;
        let import_error = |reason: String| BootError::ModuleImport {
            location: location.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| import_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(import_error(format!("status {}", response.status())));
        }

        let source = response.text().await.map_err(|e| import_error(e.to_string()))?;
        let exports = ModuleExports::scan(&source)
            .ok_or_else(|| import_error("not an ES module".to_string()))?;

        log::debug!("imported {} ({:?})", url, exports);
        Ok(Box::new(HttpModule {
            client: self.client.clone(),
            page: self.page.clone(),
            url,
            exports,
            initialized: AtomicBool::new(false),
        }))
    }
}

/// A module script fetched over HTTP
#[derive(Debug)]
pub struct HttpModule {
    client: Client,
    page: Url,
    url: Url,
    exports: ModuleExports,
    initialized: AtomicBool,
}

impl HttpModule {
    /// Where the initializer would fetch the binary from
    fn binary_url(&self, binary_path: Option<&str>) -> Result<Url> {
        let (base, path) = match binary_path {
            Some(path) => (&self.page, path.to_string()),
            None => {
                let path = self.exports.binary_ref.clone().ok_or_else(|| {
                    BootError::Initialization(format!(
                        "{} does not reference a binary artifact",
                        self.url
                    ))
                })?;
                (&self.url, path)
            }
        };

        base.join(&path).map_err(|e| BootError::InvalidUrl {
            url: path,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl LoadedModule for HttpModule {
    fn has_default_initializer(&self) -> bool {
        self.exports.default_initializer
    }

    async fn call_default(&self, binary_path: Option<&str>) -> Result<()> {
        let url = self.binary_url(binary_path)?;
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(BootError::Initialization(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        let declared = content_type(&response).unwrap_or_default();
        let bytes = response.bytes().await?;
        if !bytes.starts_with(WASM_MAGIC) {
            return Err(BootError::Initialization(format!(
                "{} is not a WebAssembly binary",
                url
            )));
        }

        // Glue code falls back to non-streaming instantiation on a wrong type
        if !declared.contains(WASM_CONTENT_TYPE) {
            log::warn!(
                "{} served as '{}', expected {}",
                url,
                declared,
                WASM_CONTENT_TYPE
            );
        }

        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn has_start(&self) -> bool {
        self.exports.start
    }

    async fn call_start(&self) -> Result<()> {
        if self.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BootError::Initialization(format!(
                "{} started before its binary was instantiated",
                self.url
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct Route {
        status: u16,
        content_type: &'static str,
        body: Vec<u8>,
    }

    fn route(status: u16, content_type: &'static str, body: &[u8]) -> Route {
        Route {
            status,
            content_type,
            body: body.to_vec(),
        }
    }

    /// Serve fixed routes over HTTP/1.1 and return the page URL
    async fn serve(routes: Vec<(&'static str, Route)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Arc<HashMap<&'static str, Route>> = Arc::new(routes.into_iter().collect());

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }

                    let head = String::from_utf8_lossy(&request).to_string();
                    let mut parts = head.split_whitespace();
                    let method = parts.next().unwrap_or_default();
                    let path = parts.next().unwrap_or_default();

                    let (status, content_type, body) = match routes.get(path) {
                        Some(r) => (r.status, r.content_type, r.body.as_slice()),
                        None => (404, "text/html", b"<h1>Not Found</h1>".as_slice()),
                    };
                    let mut response = format!(
                        "HTTP/1.1 {} Test\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        content_type,
                        body.len()
                    )
                    .into_bytes();
                    if method != "HEAD" {
                        response.extend_from_slice(body);
                    }
                    let _ = socket.write_all(&response).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}/index.html", addr)
    }

    fn wasm_bytes() -> Vec<u8> {
        let mut bytes = WASM_MAGIC.to_vec();
        bytes.extend_from_slice(&[1, 0, 0, 0]);
        bytes
    }

    async fn client_for(routes: Vec<(&'static str, Route)>) -> HttpClient {
        let page = serve(routes).await;
        HttpClient::new(&page, Duration::from_secs(5)).unwrap()
    }

    const WASM_BINDGEN_GLUE: &str = r#"let wasm;
export function start() {
    wasm.start();
}
async function __wbg_init(module_or_path) {
    if (typeof module_or_path === 'undefined') {
        module_or_path = new URL('ybc_catalog_bg.wasm', import.meta.url);
    }
}
export { initSync };
export default __wbg_init;
"#;

    #[test]
    fn test_scan_wasm_bindgen_glue() {
        let exports = ModuleExports::scan(WASM_BINDGEN_GLUE).expect("module");
        assert!(exports.default_initializer);
        assert!(exports.start);
        assert_eq!(exports.binary_ref.as_deref(), Some("ybc_catalog_bg.wasm"));
    }

    #[test]
    fn test_scan_rejects_html() {
        assert_eq!(ModuleExports::scan("<!doctype html><html></html>"), None);
        assert_eq!(ModuleExports::scan("   "), None);
    }

    #[test]
    fn test_scan_reexported_default() {
        let exports = ModuleExports::scan("export { init as default, run };").expect("module");
        assert!(exports.default_initializer);
        assert!(!exports.start);
        assert_eq!(exports.binary_ref, None);
    }

    #[test]
    fn test_scan_minified_module() {
        let exports = ModuleExports::scan(
            "let w;function i(t){return fetch(new URL(\"app_bg.wasm\",import.meta.url))}export{i as default};",
        )
        .expect("module");
        assert!(exports.default_initializer);
        assert!(!exports.start);
        assert_eq!(exports.binary_ref.as_deref(), Some("app_bg.wasm"));

        assert!(ModuleExports::scan("import{a as b}from\"./x.js\";b();").is_some());
    }

    #[test]
    fn test_scan_rejects_classic_script() {
        assert_eq!(ModuleExports::scan("var exported = 1; function importer() {}"), None);
    }

    #[test]
    fn test_prefixed_start_is_not_start() {
        let exports = ModuleExports::scan("export { __wbg_start };").expect("module");
        assert!(!exports.start);
    }

    #[test]
    fn test_resolve_against_page() {
        let client = HttpClient::new("https://example.com/app/index.html", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.resolve("pkg/app.js").unwrap().as_str(),
            "https://example.com/app/pkg/app.js"
        );
        assert_eq!(
            client.resolve("/assets/app.js").unwrap().as_str(),
            "https://example.com/assets/app.js"
        );
    }

    #[test]
    fn test_invalid_page_url() {
        assert!(matches!(
            HttpClient::new("not a url", Duration::from_secs(1)),
            Err(BootError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_binary_url_rules() {
        let module = HttpModule {
            client: Client::new(),
            page: Url::parse("https://example.com/app/").unwrap(),
            url: Url::parse("https://example.com/app/pkg/app.js").unwrap(),
            exports: ModuleExports {
                default_initializer: true,
                start: false,
                binary_ref: Some("app_bg.wasm".to_string()),
            },
            initialized: AtomicBool::new(false),
        };

        assert_eq!(
            module.binary_url(None).unwrap().as_str(),
            "https://example.com/app/pkg/app_bg.wasm"
        );
        assert_eq!(
            module.binary_url(Some("pkg/app_bg.wasm")).unwrap().as_str(),
            "https://example.com/app/pkg/app_bg.wasm"
        );
    }

    #[tokio::test]
    async fn test_start_requires_initialization() {
        let module = HttpModule {
            client: Client::new(),
            page: Url::parse("https://example.com/").unwrap(),
            url: Url::parse("https://example.com/pkg/app.js").unwrap(),
            exports: ModuleExports::default(),
            initialized: AtomicBool::new(false),
        };
        assert!(module.call_start().await.is_err());
        module.initialized.store(true, Ordering::SeqCst);
        assert!(module.call_start().await.is_ok());
    }

    #[tokio::test]
    async fn test_head_reports_status_and_type() {
        let client = client_for(vec![(
            "/pkg/app.js",
            route(200, "text/javascript; charset=utf-8", WASM_BINDGEN_GLUE.as_bytes()),
        )])
        .await;

        let found = client.head("pkg/app.js").await.unwrap();
        assert_eq!(found.status, 200);
        assert_eq!(found.content_type.as_deref(), Some("text/javascript; charset=utf-8"));

        let missing = client.head("pkg/other.js").await.unwrap();
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn test_import_rejects_missing_script() {
        let client = client_for(Vec::new()).await;
        match client.import("pkg/app.js").await {
            Err(BootError::ModuleImport { location, reason }) => {
                assert_eq!(location, "pkg/app.js");
                assert!(reason.contains("404"));
            }
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("missing script imported"),
        }
    }

    #[tokio::test]
    async fn test_import_rejects_non_module_body() {
        let client = client_for(vec![(
            "/pkg/app.js",
            route(200, "text/plain", b"<!doctype html><html><body>SPA shell</body></html>"),
        )])
        .await;
        assert!(matches!(
            client.import("pkg/app.js").await,
            Err(BootError::ModuleImport { .. })
        ));
    }

    #[tokio::test]
    async fn test_default_init_then_start() {
        let client = client_for(vec![
            ("/pkg/app.js", route(200, "application/javascript", WASM_BINDGEN_GLUE.as_bytes())),
            ("/pkg/ybc_catalog_bg.wasm", route(200, WASM_CONTENT_TYPE, &wasm_bytes())),
        ])
        .await;

        let module = client.import("pkg/app.js").await.unwrap();
        assert!(module.has_default_initializer());
        assert!(module.has_start());
        assert!(module.call_start().await.is_err());

        module.call_default(None).await.unwrap();
        assert!(module.call_start().await.is_ok());
    }

    #[tokio::test]
    async fn test_default_init_with_explicit_binary_path() {
        let client = client_for(vec![
            ("/pkg/app.js", route(200, "application/javascript", b"export default function init() {}")),
            ("/pkg/app_bg.wasm", route(200, WASM_CONTENT_TYPE, &wasm_bytes())),
        ])
        .await;

        let module = client.import("pkg/app.js").await.unwrap();
        // No binary reference in the glue, so only the explicit path works
        assert!(module.call_default(None).await.is_err());
        assert!(module.call_default(Some("pkg/app_bg.wasm")).await.is_ok());
    }

    #[tokio::test]
    async fn test_default_init_rejects_missing_binary() {
        let client = client_for(vec![(
            "/pkg/app.js",
            route(200, "application/javascript", WASM_BINDGEN_GLUE.as_bytes()),
        )])
        .await;

        let module = client.import("pkg/app.js").await.unwrap();
        match module.call_default(None).await {
            Err(BootError::Initialization(reason)) => assert!(reason.contains("404")),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(module.call_start().await.is_err());
    }

    #[tokio::test]
    async fn test_default_init_rejects_non_wasm_body() {
        let client = client_for(vec![
            ("/pkg/app.js", route(200, "application/javascript", WASM_BINDGEN_GLUE.as_bytes())),
            ("/pkg/ybc_catalog_bg.wasm", route(200, "text/html", b"<!doctype html>")),
        ])
        .await;

        let module = client.import("pkg/app.js").await.unwrap();
        match module.call_default(None).await {
            Err(BootError::Initialization(reason)) => {
                assert!(reason.contains("not a WebAssembly binary"))
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_default_init_tolerates_wrong_wasm_type() {
        let client = client_for(vec![
            ("/pkg/app.js", route(200, "application/javascript", WASM_BINDGEN_GLUE.as_bytes())),
            ("/pkg/ybc_catalog_bg.wasm", route(200, "application/octet-stream", &wasm_bytes())),
        ])
        .await;

        let module = client.import("pkg/app.js").await.unwrap();
        assert!(module.call_default(None).await.is_ok());
        assert!(module.call_start().await.is_ok());
    }
}
