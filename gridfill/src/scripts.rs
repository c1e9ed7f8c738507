//! JavaScript sent to the page through the bridge.
//!
//! The helper bundle lives in `scripts/page_helpers.js` so editors highlight it;
//! it is embedded at compile time and prepended to every call. Arguments are
//! passed as a JSON literal, never spliced into code as raw text.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::FillError;

pub const PAGE_HELPERS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/scripts/page_helpers.js"
));

/// Builds an expression that installs the helpers (once per page), calls
/// `window.__gridfill[op](args)` and evaluates to a JSON envelope string.
pub fn page_call(op: &str, args: &Value) -> String {
    let op_literal = Value::String(op.to_string());
    format!(
        r#"(() => {{
{PAGE_HELPERS}
try {{
  const value = window.__gridfill[{op_literal}]({args});
  return JSON.stringify({{ success: true, value: value === undefined ? null : value }});
}} catch (e) {{
  return JSON.stringify({{ success: false, message: String(e && e.message || e) }});
}}
}})()"#
    )
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    value: Value,
    message: Option<String>,
}

/// Unwraps the envelope produced by [`page_call`].
pub fn parse_envelope<T: DeserializeOwned>(op: &str, raw: &str) -> Result<T, FillError> {
    let envelope: Envelope = serde_json::from_str(raw.trim()).map_err(|e| {
        let head: String = raw.chars().take(200).collect();
        FillError::Script(format!("{op}: unreadable page reply ({e}): {head}"))
    })?;
    if !envelope.success {
        let message = envelope
            .message
            .unwrap_or_else(|| "page helper returned failure status".into());
        return Err(FillError::Script(format!("{op}: {message}")));
    }
    serde_json::from_value(envelope.value)
        .map_err(|e| FillError::Script(format!("{op}: unexpected reply shape: {e}")))
}
