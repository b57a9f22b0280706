//! Native environment: a deployed page reached over HTTP
//!
//! Lets the bootstrap sequence run headlessly against a real deployment and
//! report what a browser visiting the page would get.

pub mod document;
pub mod http;

pub use document::HtmlDocument;
pub use http::{HttpClient, HttpModule, ModuleExports, WASM_CONTENT_TYPE, WASM_MAGIC};

use crate::context::{Environment, NoGlobals};
use crate::errors::Result;
use std::sync::Arc;
use std::time::Duration;

/// Fetch `page_url` and build an environment around it.
///
/// The global namespace is empty: no enhancement library exists outside a
/// browser.
pub async fn connect(page_url: &str, timeout: Duration) -> Result<Environment> {
    let client = Arc::new(HttpClient::new(page_url, timeout)?);
    let html = client.fetch_page().await?;
    let document = HtmlDocument::parse(client.page_url().as_str(), &html);

    Ok(Environment::new(
        Arc::new(document),
        Arc::new(NoGlobals),
        client.clone(),
        client,
    ))
}
