//! Outbound request construction.
//!
//! Turns an `InboundRequest` plus its resolved route into the exact request
//! sent to the backend: target URL, allow-listed headers, encoded body.

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use url::Url;

use crate::http::error::ProxyError;
use crate::http::request::{InboundBody, InboundRequest};
use crate::routing::ResolvedRoute;

/// A request ready for the backend transport.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: Url,
    pub method: Method,
    /// Only allow-listed headers.
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Build the outbound request for a resolved inbound request.
pub fn build_outbound(
    origin: &Url,
    inbound: &InboundRequest,
    resolved: &ResolvedRoute<'_>,
) -> Result<OutboundRequest, ProxyError> {
    let url = target_url(origin, &resolved.target_path(), inbound.query.as_deref())?;

    let mut headers = HeaderMap::new();
    for name in &resolved.route.forward_headers {
        if let Some(value) = inbound.headers.get(name) {
            headers.insert(name.clone(), value.clone());
        }
    }

    Ok(OutboundRequest {
        url,
        method: inbound.method.clone(),
        headers,
        body: encode_body(inbound)?,
    })
}

/// `{origin}/{path}` plus the inbound query string.
pub fn target_url(origin: &Url, path: &str, query: Option<&str>) -> Result<Url, ProxyError> {
    let base = origin.as_str().trim_end_matches('/');
    let mut raw = format!("{base}/{path}");
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        raw.push('?');
        raw.push_str(query);
    }
    Url::parse(&raw).map_err(|e| ProxyError::InvalidTarget(format!("{raw}: {e}")))
}

/// Body sent upstream. GET and HEAD never carry one.
///
/// Raw bodies (multipart included) go out byte-for-byte; structured bodies
/// are re-serialized as JSON text.
fn encode_body(inbound: &InboundRequest) -> Result<Option<Bytes>, ProxyError> {
    if inbound.method == Method::GET || inbound.method == Method::HEAD {
        return Ok(None);
    }

    match &inbound.body {
        None => Ok(None),
        Some(InboundBody::Raw(bytes)) => Ok(Some(bytes.clone())),
        Some(InboundBody::Structured(value)) => Ok(Some(Bytes::from(serde_json::to_vec(value)?))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::default_routes;
    use crate::http::request::decode_body;
    use crate::routing::{split_segments, Router};
    use axum::http::{header, HeaderValue};
    use serde_json::{json, Value};

    fn origin() -> Url {
        Url::parse("https://backend.example.com").unwrap()
    }

    fn inbound(method: Method, path: &str, headers: &[(&'static str, &'static str)], body: &'static [u8]) -> InboundRequest {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        let body = decode_body(map.get(header::CONTENT_TYPE), Bytes::from_static(body));
        InboundRequest {
            method,
            segments: split_segments(path),
            headers: map,
            query: None,
            body,
        }
    }

    fn forward(request: &InboundRequest) -> OutboundRequest {
        let router = Router::from_config(&default_routes()).unwrap();
        let resolved = router.resolve(&request.method, &request.segments).unwrap();
        build_outbound(&origin(), request, &resolved).unwrap()
    }

    #[test]
    fn test_create_project_scenario() {
        let request = inbound(
            Method::POST,
            "projects",
            &[("content-type", "application/json")],
            br#"{"name":"X","show_code":"MYS","episode_number":"E045"}"#,
        );
        let outbound = forward(&request);

        assert_eq!(outbound.url.as_str(), "https://backend.example.com/projects/");
        assert_eq!(outbound.method, Method::POST);
        let sent: Value = serde_json::from_slice(&outbound.body.unwrap()).unwrap();
        assert_eq!(sent, json!({"name": "X", "show_code": "MYS", "episode_number": "E045"}));
    }

    #[test]
    fn test_structured_body_keeps_key_order() {
        let request = inbound(
            Method::PUT,
            "projects/1",
            &[("content-type", "application/json")],
            br#"{ "z": 1, "a": [true, null] }"#,
        );
        let outbound = forward(&request);
        assert_eq!(outbound.body.unwrap(), Bytes::from_static(br#"{"z":1,"a":[true,null]}"#));
    }

    #[test]
    fn test_only_allow_listed_headers_cross() {
        let request = inbound(
            Method::GET,
            "scripts/123/lines",
            &[
                ("host", "proxy.example.com"),
                ("connection", "keep-alive"),
                ("cookie", "session=1"),
                ("authorization", "Bearer t"),
                ("x-request-id", "abc"),
                ("accept", "application/json"),
            ],
            b"",
        );
        let outbound = forward(&request);

        assert_eq!(outbound.url.as_str(), "https://backend.example.com/scripts/123/lines");
        assert_eq!(outbound.headers.len(), 1);
        assert_eq!(outbound.headers[header::ACCEPT], "application/json");
    }

    #[test]
    fn test_get_and_head_never_carry_a_body() {
        for method in [Method::GET, Method::HEAD] {
            let request = inbound(
                method,
                "scripts/1",
                &[("content-type", "application/json")],
                br#"{"sneaky":true}"#,
            );
            assert!(forward(&request).body.is_none());
        }
    }

    #[test]
    fn test_multipart_forwarded_byte_identical() {
        let payload: &'static [u8] =
            b"--XyZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"s.docx\"\r\n\
              Content-Type: application/octet-stream\r\n\r\n\x00\xff\x10PK\r\n--XyZ--\r\n";
        let request = inbound(
            Method::POST,
            "scripts/123/upload",
            &[("content-type", "multipart/form-data; boundary=XyZ")],
            payload,
        );
        let outbound = forward(&request);

        assert_eq!(outbound.url.as_str(), "https://backend.example.com/scripts/123/upload");
        assert_eq!(outbound.body.unwrap(), Bytes::from_static(payload));
        assert_eq!(
            outbound.headers[header::CONTENT_TYPE],
            "multipart/form-data; boundary=XyZ"
        );
    }

    #[test]
    fn test_raw_body_forwarded_unchanged() {
        let request = inbound(
            Method::PATCH,
            "settings/asr",
            &[("content-type", "text/plain")],
            b"  not json  ",
        );
        assert_eq!(forward(&request).body.unwrap(), Bytes::from_static(b"  not json  "));
    }

    #[test]
    fn test_target_url_with_query_and_origin_path() {
        let origin = Url::parse("http://backend:8000/").unwrap();
        let url = target_url(&origin, "scripts/1/lines", Some("page=2")).unwrap();
        assert_eq!(url.as_str(), "http://backend:8000/scripts/1/lines?page=2");

        let url = target_url(&origin, "scripts/1/lines", Some("")).unwrap();
        assert_eq!(url.as_str(), "http://backend:8000/scripts/1/lines");
    }
}
