//! Request counters for KVDB Web.
//!
//! A single [`RequestMetrics`] registry is built at startup and shared
//! through [`crate::state::AppState`]; handlers increment it concurrently.
//! Counters are monotonic and never reset.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Name of the request counter in the exposition output.
pub const REQUESTS_METRIC: &str = "kvdbw_http_endpoint_requests_count";

/// Label set of one request counter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RequestLabels {
    endpoint: String,
    method: String,
    action: String,
}

/// Per-`{endpoint, method, action}` request counters.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    requests: Mutex<BTreeMap<RequestLabels, u64>>,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request. `action` is empty for non-mutating requests.
    pub fn increment(&self, endpoint: &str, method: &str, action: &str) {
        let labels = RequestLabels {
            endpoint: endpoint.to_owned(),
            method: method.to_owned(),
            action: action.to_owned(),
        };
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let count = requests.entry(labels).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Current value of one counter.
    pub fn get(&self, endpoint: &str, method: &str, action: &str) -> u64 {
        let labels = RequestLabels {
            endpoint: endpoint.to_owned(),
            method: method.to_owned(),
            action: action.to_owned(),
        };
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&labels)
            .copied()
            .unwrap_or(0)
    }

    /// Render all counters in Prometheus text format.
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(8);

        lines.push(format!(
            "# HELP {REQUESTS_METRIC} The amount of requests to an endpoint."
        ));
        lines.push(format!("# TYPE {REQUESTS_METRIC} counter"));
        {
            let requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
            for (labels, count) in requests.iter() {
                lines.push(format!(
                    "{REQUESTS_METRIC}{{endpoint=\"{}\",method=\"{}\",type=\"{}\"}} {count}",
                    escape_label(&labels.endpoint),
                    escape_label(&labels.method),
                    escape_label(&labels.action),
                ));
            }
        }

        lines.push("# HELP kvdbw_info KVDB Web build information.".to_owned());
        lines.push("# TYPE kvdbw_info gauge".to_owned());
        lines.push(format!(
            "kvdbw_info{{version=\"{}\"}} 1",
            env!("CARGO_PKG_VERSION")
        ));

        lines.join("\n") + "\n"
    }
}

/// Escape a label value: backslash, double quote and newline.
fn escape_label(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}
