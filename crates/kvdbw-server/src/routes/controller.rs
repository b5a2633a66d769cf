//! Root controller: `/{apiVersion}/{namespace}`
//!
//! Serves every path not claimed by another router. Resolves the API
//! version and namespace from the path, applies an optional form-posted
//! mutation, then renders the namespace or key index.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::Method;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::{Instrument, debug, info, info_span, warn};

use super::pages::{self, KeyRow, NamespaceRow};
use crate::error::AppError;
use crate::request::{DEFAULT_API_PATH, RoutingParameters};
use crate::state::AppState;

/// Namespace whose [`PROTECTED_KEY`] is never editable from the UI.
pub const RESERVED_NAMESPACE: &str = "kvdb";

/// Backend-maintained key inside [`RESERVED_NAMESPACE`].
pub const PROTECTED_KEY: &str = "counter";

/// Maximum accepted form body size.
const MAX_FORM_BYTES: usize = 1024 * 1024;

/// Form fields posted by the UI.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MutationForm {
    pub input: String,
    pub key: String,
    pub value: String,
}

/// Mutation selected by the form's `input` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Generate,
    Roll,
    Delete,
    Unknown,
}

impl Action {
    pub fn parse(input: &str) -> Self {
        match input {
            "Create" => Self::Create,
            "Update" => Self::Update,
            "Generate" => Self::Generate,
            "Roll" => Self::Roll,
            "Delete" => Self::Delete,
            _ => Self::Unknown,
        }
    }
}

/// Fallback handler for all UI paths.
pub async fn root_controller(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let params = RoutingParameters::resolve(request.method(), request.uri().path(), remote_addr);

    let span = info_span!(
        "request",
        id = params.request_id,
        method = %params.method,
        path = %params.path,
        remote_addr = ?params.remote_addr,
    );

    async move {
        match dispatch(&state, &params, request).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        }
    }
    .instrument(span)
    .await
}

async fn dispatch(
    state: &AppState,
    params: &RoutingParameters,
    request: Request,
) -> Result<Response, AppError> {
    if params.api_version.is_empty() {
        return Ok(Redirect::to(DEFAULT_API_PATH).into_response());
    }
    if !params.is_known_version() {
        return Err(AppError::NotFound);
    }

    let form = if params.method == Method::POST {
        let body = axum::body::to_bytes(request.into_body(), MAX_FORM_BYTES)
            .await
            .map_err(|e| AppError::BadRequest(format!("unreadable body: {e}")))?;
        Some(parse_form(&body, state.debug)?)
    } else {
        None
    };

    let input = form.as_ref().map_or("", |f| f.input.as_str());
    state
        .metrics
        .increment(&params.endpoint(), params.method.as_str(), input);

    let html = if params.namespace.is_empty() {
        namespace_flow(state, params, form.as_ref()).await?
    } else {
        key_flow(state, params, form.as_ref()).await?
    };
    Ok(Html(html).into_response())
}

/// Decode the posted form. A field given more than once is rejected rather
/// than resolved to its first value.
fn parse_form(body: &Bytes, debug_enabled: bool) -> Result<MutationForm, AppError> {
    serde_urlencoded::from_bytes::<MutationForm>(body).map_err(|e| {
        if debug_enabled {
            debug!(form = %String::from_utf8_lossy(body), "form rejected");
        }
        AppError::BadRequest(format!("invalid form: {e}"))
    })
}

/// Apply a key mutation to `params.namespace`, then list its keys.
async fn key_flow(
    state: &AppState,
    params: &RoutingParameters,
    form: Option<&MutationForm>,
) -> Result<String, AppError> {
    let namespace = params.namespace.as_str();
    let client = &state.client;

    if let Some(form) = form {
        let key = form.key.as_str();
        match Action::parse(&form.input) {
            Action::Create | Action::Update => {
                client.set_key(namespace, key, &form.value).await?;
                info!(namespace, key, action = %form.input, "key written");
            }
            Action::Generate => {
                client.generate(namespace, key).await?;
                info!(namespace, key, "key generated");
            }
            Action::Roll => {
                client.roll(namespace, key).await?;
                info!(namespace, key, "key rolled");
            }
            Action::Delete => {
                client.delete_key(namespace, key).await?;
                info!(namespace, key, "key deleted");
            }
            Action::Unknown => warn!(input = %form.input, "unknown key action ignored"),
        }
    }

    let records = client.list_keys(namespace).await?;
    let rows: Vec<KeyRow> = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| KeyRow {
            id: i + 1,
            read_only: is_read_only(namespace, &record.key),
            lines: line_count(&record.value),
            key: record.key,
            value: record.value,
        })
        .collect();

    Ok(pages::key_index(&params.api_version, namespace, &rows))
}

/// Apply a namespace mutation named by the form's `key`, then list
/// namespaces.
async fn namespace_flow(
    state: &AppState,
    params: &RoutingParameters,
    form: Option<&MutationForm>,
) -> Result<String, AppError> {
    let client = &state.client;

    if let Some(form) = form {
        let name = form.key.as_str();
        match Action::parse(&form.input) {
            Action::Create | Action::Update => {
                client.create_namespace(name).await?;
                info!(namespace = name, "namespace created");
            }
            Action::Generate => {
                client.generate(name, "").await?;
                info!(namespace = name, "namespace generated");
            }
            Action::Roll => {
                client.roll(name, "").await?;
                info!(namespace = name, "namespace rolled");
            }
            Action::Delete => {
                client.delete_namespace(name).await?;
                info!(namespace = name, "namespace deleted");
            }
            Action::Unknown => warn!(input = %form.input, "unknown namespace action ignored"),
        }
    }

    let namespaces = client.list_namespaces().await?;
    let rows: Vec<NamespaceRow> = namespaces
        .into_iter()
        .enumerate()
        .map(|(i, ns)| NamespaceRow {
            id: i + 1,
            name: ns.name,
            size: ns.size,
            access: ns.access,
        })
        .collect();

    Ok(pages::namespace_index(&params.api_version, &rows))
}

/// Whether a key is shown without edit controls.
pub fn is_read_only(namespace: &str, key: &str) -> bool {
    namespace == RESERVED_NAMESPACE && key == PROTECTED_KEY
}

/// Textarea height for a value: newline count plus one.
pub fn line_count(value: &str) -> usize {
    value.matches('\n').count() + 1
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_actions() {
        assert_eq!(Action::parse("Create"), Action::Create);
        assert_eq!(Action::parse("Update"), Action::Update);
        assert_eq!(Action::parse("Generate"), Action::Generate);
        assert_eq!(Action::parse("Roll"), Action::Roll);
        assert_eq!(Action::parse("Delete"), Action::Delete);
        assert_eq!(Action::parse("delete"), Action::Unknown);
        assert_eq!(Action::parse(""), Action::Unknown);
    }

    #[test]
    fn counts_value_lines() {
        assert_eq!(line_count(""), 1);
        assert_eq!(line_count("one"), 1);
        assert_eq!(line_count("a\nb"), 2);
        assert_eq!(line_count("a\nb\n"), 3);
        assert_eq!(line_count("a\nb\nc\n"), 4);
    }

    #[test]
    fn only_reserved_counter_is_read_only() {
        assert!(is_read_only("kvdb", "counter"));
        assert!(!is_read_only("kvdb", "other"));
        assert!(!is_read_only("ns1", "counter"));
    }

    #[test]
    fn form_fields_default_to_empty() {
        let form = parse_form(&Bytes::from_static(b"input=Delete&key=foo"), false).unwrap();
        assert_eq!(form.input, "Delete");
        assert_eq!(form.key, "foo");
        assert_eq!(form.value, "");

        let form = parse_form(&Bytes::from_static(b"value=a%0Ab&key=k+1"), false).unwrap();
        assert_eq!(form.input, "");
        assert_eq!(form.key, "k 1");
        assert_eq!(form.value, "a\nb");
    }

    #[test]
    fn duplicate_form_field_is_rejected() {
        let err = parse_form(&Bytes::from_static(b"input=Create&input=Delete"), true).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
