/// HTTP asset source backed by `window.fetch`
use js_sys::Uint8Array;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use mv3d_core::{AssetSource, FetchCallback, FetchError};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSource;

impl HttpSource {
    pub fn new() -> Self {
        Self
    }
}

impl AssetSource for HttpSource {
    /// Completes from the browser event loop once the response body arrives
    fn fetch(&self, url: &str, on_done: FetchCallback) {
        let url = url.to_string();
        wasm_bindgen_futures::spawn_local(async move {
            let result = fetch_bytes(&url).await;
            debug!("fetch {} finished (ok: {})", url, result.is_ok());
            on_done(result);
        });
    }
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, FetchError> {
    let failed = |e: JsValue| FetchError::Failed {
        url: url.to_string(),
        reason: describe(&e),
    };

    let window = web_sys::window().ok_or_else(|| failed(JsValue::from_str("no window")))?;
    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(failed)?
        .dyn_into()
        .map_err(failed)?;

    if !response.ok() {
        return Err(status_error(url, response.status()));
    }

    let body = JsFuture::from(response.array_buffer().map_err(failed)?)
        .await
        .map_err(failed)?;
    Ok(Uint8Array::new(&body).to_vec())
}

fn status_error(url: &str, status: u16) -> FetchError {
    match status {
        404 | 410 => FetchError::NotFound { url: url.to_string() },
        _ => FetchError::Failed {
            url: url.to_string(),
            reason: format!("HTTP {}", status),
        },
    }
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_errors() {
        assert_eq!(status_error("a.mtl", 404).to_string(), "a.mtl not found");
        assert!(status_error("a.obj", 500).to_string().contains("HTTP 500"));
    }
}
