use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use hyper::body::to_bytes;
use hyper::client::HttpConnector;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use hyper::{Body, Client, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use tokio::time::timeout;
use tracing::debug;
use webpki_roots::TLS_SERVER_ROOTS;

use crate::traits::{AdapterError, AdapterResult};

pub(crate) type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

pub(crate) fn build_https_client() -> HyperClient {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);

    let connector = HttpsConnector::from((http, Arc::new(config)));

    Client::builder().build::<_, Body>(connector)
}

/// POSTs a JSON body with bearer auth and returns the successful response body.
pub(crate) async fn post_json(
    client: &HyperClient,
    endpoint: &Uri,
    api_key: &str,
    body: Vec<u8>,
    limit: Duration,
) -> AdapterResult<Bytes> {
    let request = Request::post(endpoint.clone())
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {api_key}"))
        .body(Body::from(body))
        .map_err(|err| AdapterError::transport(format!("failed to build request: {err}")))?;

    let response = timeout(limit, client.request(request))
        .await
        .map_err(|_| AdapterError::transport(format!("request to {endpoint} timed out")))?
        .map_err(|err| AdapterError::transport(format!("request to {endpoint} failed: {err}")))?;

    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs);

    let bytes = to_bytes(response.into_body())
        .await
        .map_err(|err| AdapterError::transport(format!("failed to read response: {err}")))?;

    debug!(%status, len = bytes.len(), "received provider response");

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(AdapterError::RateLimited { retry_after });
    }

    if !status.is_success() {
        let reason = String::from_utf8_lossy(&bytes);
        return Err(AdapterError::response(format!(
            "provider returned {status}: {reason}"
        )));
    }

    Ok(bytes)
}
