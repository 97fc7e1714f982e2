// Copyright 2022-2025 The Vaultdav Authors.

// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

//! The host-provided single-shot HTTP request primitive, as an injectable
//! trait.
//!
//! The WebDAV client is constructed with one of these rather than reaching
//! into any shared library state, so embedders and tests can substitute
//! their own network stack.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, ErrorKind, Result};

/// One outgoing HTTP request.
///
/// Header names are free-form here; the shim lower-cases them before the
/// request goes out.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
}

/// The raw response handed back by the host primitive.
#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    /// Lower-cased by the shim before the client sees them.
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single-shot HTTP request function.
///
/// Implementations perform exactly one request per call; any retry policy
/// lives in the layers above.
#[async_trait]
pub trait HttpSend: Send + Sync {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse>;
}

/// Default implementation over a shared reqwest client.
pub struct ReqwestSend {
    client: reqwest::Client,
}

impl ReqwestSend {
    pub fn new() -> Result<ReqwestSend> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| Error {
                kind: ErrorKind::Connect,
                path: None,
                message: Some("failed to construct HTTP client".to_owned()),
                source: Some(Box::new(err)),
            })?;
        Ok(ReqwestSend { client })
    }
}

#[async_trait]
impl HttpSend for ReqwestSend {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(req.method.as_bytes()).map_err(|err| Error {
            kind: ErrorKind::Other,
            path: None,
            message: Some(format!("invalid HTTP method {:?}", req.method)),
            source: Some(Box::new(err)),
        })?;
        let mut builder = self.client.request(method, &req.url);
        for (name, value) in &req.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = req.body {
            builder = builder.body(body);
        }
        let response = builder.send().await.map_err(|err| Error {
            kind: ErrorKind::Connect,
            path: Some(req.url.clone()),
            message: None,
            source: Some(Box::new(err)),
        })?;

        let status = response.status();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            headers.insert(
                name.as_str().to_owned(),
                decode_header_bytes(value.as_bytes()),
            );
        }
        let body = response.bytes().await.map_err(|err| Error {
            kind: ErrorKind::Connect,
            path: Some(req.url.clone()),
            message: Some("failed to read response body".to_owned()),
            source: Some(Box::new(err)),
        })?;
        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            headers,
            body,
        })
    }
}

/// Header bytes are usually UTF-8; anything else is recovered as Latin-1 so
/// the shim can decide how to re-encode it.
fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
