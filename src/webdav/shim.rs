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

//! Normalizing shim between the WebDAV client and the host HTTP primitive.
//!
//! The client expects tidy lower-case headers, reason phrases, and bodies
//! that respect null-body statuses; real servers and host network stacks
//! provide none of that reliably. All the papering-over lives here so the
//! client itself can stay honest.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use tracing::debug;

use crate::config::Platform;
use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse, HttpSend};

/// Statuses that must not carry a body.
const NULL_BODY_STATUSES: [u16; 5] = [101, 103, 204, 205, 304];

/// Wraps the host primitive and normalizes both directions of each request.
pub(crate) struct RequestShim {
    inner: Arc<dyn HttpSend>,
    platform: Platform,
}

impl RequestShim {
    pub fn new(inner: Arc<dyn HttpSend>, platform: Platform) -> RequestShim {
        RequestShim { inner, platform }
    }
}

#[async_trait]
impl HttpSend for RequestShim {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse> {
        let mut headers: HashMap<String, String> = req
            .headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();
        // The host primitive computes these two itself.
        headers.remove("host");
        headers.remove("content-length");
        if !headers.contains_key("content-type") {
            if let Some(accept) = headers.get("accept").cloned() {
                headers.insert("content-type".to_owned(), accept);
            }
        }
        debug!(
            url = %req.url,
            method = %req.method,
            headers = ?redacted(&headers),
            "sending request"
        );

        let prepared = HttpRequest {
            method: req.method.clone(),
            url: req.url.clone(),
            headers,
            body: req.body,
        };
        let mut response = self.inner.send(prepared.clone()).await?;

        if response.status == 401
            && self.platform.retries_collection_probe()
            && !prepared.url.ends_with('/')
            && !prepared.url.ends_with(".md")
            && prepared.method.eq_ignore_ascii_case("PROPFIND")
        {
            // Some servers answer 401 rather than 404 when a collection is
            // probed without a trailing slash; retry once with the slash.
            // This is the only retry the shim ever performs.
            debug!(url = %prepared.url, "got 401 on PROPFIND, retrying with trailing slash");
            response = self
                .inner
                .send(HttpRequest {
                    url: format!("{}/", prepared.url),
                    ..prepared
                })
                .await?;
        }

        let mut rsp_headers = HashMap::with_capacity(response.headers.len());
        for (name, value) in response.headers {
            let name = name.to_ascii_lowercase();
            // The response-construction side can't represent header values
            // outside Latin-1; percent-encode anything beyond it.
            let value = if only_latin1(&value) {
                value
            } else {
                debug!(header = %name, "response header value needs percent-encoding");
                urlencoding::encode(&value).into_owned()
            };
            rsp_headers.insert(name, value);
        }

        let status_text = reason_phrase(response.status);
        let body = if NULL_BODY_STATUSES.contains(&response.status) {
            Bytes::new()
        } else {
            response.body
        };
        debug!(status = response.status, %status_text, "got response");
        Ok(HttpResponse {
            status: response.status,
            status_text,
            headers: rsp_headers,
            body,
        })
    }
}

fn only_latin1(s: &str) -> bool {
    s.chars().all(|c| (c as u32) <= 0xFF)
}

fn reason_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or_default()
        .to_owned()
}

/// Copy of the headers safe to log.
fn redacted(headers: &HashMap<String, String>) -> HashMap<String, String> {
    let mut copy = headers.clone();
    if let Some(value) = copy.get_mut("authorization") {
        *value = "<redacted>".to_owned();
    }
    copy
}
