//! Helpers for tests that talk to a mock API server

use kube::Client;
use serde_json::{Value, json};
use wiremock::{MockServer, ResponseTemplate};

/// Client pointed at a wiremock server
pub fn mock_client(server: &MockServer) -> Client {
    let config = kube::Config::new(server.uri().parse().unwrap());
    Client::try_from(config).unwrap()
}

/// A Kubernetes `Status` error body with the given code
pub fn status_response(code: u16, reason: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(code).set_body_json(json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    }))
}

/// 404 for a named object
pub fn not_found(resource: &str, name: &str) -> ResponseTemplate {
    status_response(
        404,
        "NotFound",
        &format!("{} \"{}\" not found", resource, name),
    )
}

/// Successful delete response
pub fn deleted() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Success"
    }))
}

/// Minimal object body for the given apiVersion/kind
pub fn object(api_version: &str, kind: &str, name: &str, namespace: &str) -> Value {
    json!({
        "apiVersion": api_version,
        "kind": kind,
        "metadata": {
            "name": name,
            "namespace": namespace,
            "resourceVersion": "42"
        }
    })
}
