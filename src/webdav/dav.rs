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

//! Generic WebDAV client over an injected HTTP transport.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tracing::trace;
use url::Url;

use super::auth::{self, DigestChallenge};
use super::xml::{self, DavStat};
use crate::config::AuthScheme;
use crate::error::{Error, ErrorKind, Result};
use crate::http::{HttpRequest, HttpResponse, HttpSend};

/// Listing scope for PROPFIND.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Depth {
    Zero,
    One,
    Infinity,
}

impl Depth {
    fn header_value(self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        }
    }
}

pub(crate) struct Credentials {
    pub username: String,
    pub password: String,
    pub scheme: AuthScheme,
}

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:propfind xmlns:D="DAV:">
  <D:prop>
    <D:resourcetype/>
    <D:getcontentlength/>
    <D:getlastmodified/>
  </D:prop>
</D:propfind>"#;

/// A WebDAV endpoint bound to one server address.
///
/// Paths given to the methods are endpoint-relative and start with `/`;
/// the address's own path component is prepended on the wire and stripped
/// from returned filenames.
pub(crate) struct DavClient {
    send: Arc<dyn HttpSend>,
    address: Url,
    /// Path component of the address, without a trailing slash.
    endpoint_path: String,
    credentials: Option<Credentials>,
    /// Last Digest challenge the server issued, reused preemptively.
    digest: Mutex<Option<DigestChallenge>>,
    nonce_count: AtomicU32,
}

impl DavClient {
    pub fn new(send: Arc<dyn HttpSend>, address: Url, credentials: Option<Credentials>) -> DavClient {
        let endpoint_path = address.path().trim_end_matches('/').to_owned();
        DavClient {
            send,
            address,
            endpoint_path,
            credentials,
            digest: Mutex::new(None),
            nonce_count: AtomicU32::new(0),
        }
    }

    fn url_for(&self, path: &str) -> Url {
        debug_assert!(path.starts_with('/'), "path must start with /: {path:?}");
        let mut url = self.address.clone();
        url.set_path(&format!("{}{}", self.endpoint_path, path));
        url
    }

    fn digest_header(&self, method: &str, uri: &str, challenge: &DigestChallenge) -> String {
        let credentials = self.credentials.as_ref().expect("digest requires credentials");
        let nc = self.nonce_count.fetch_add(1, Ordering::Relaxed) + 1;
        let cnonce = hex::encode(rand::random::<[u8; 8]>());
        challenge.authorization(
            &credentials.username,
            &credentials.password,
            method,
            uri,
            &cnonce,
            nc,
        )
    }

    /// Issue one request with authentication, answering at most one Digest
    /// challenge.
    async fn request(
        &self,
        method: &str,
        path: &str,
        extra_headers: &[(&str, &str)],
        body: Option<Bytes>,
    ) -> Result<HttpResponse> {
        let url = self.url_for(path);
        let uri = url.path().to_owned();
        let mut headers: HashMap<String, String> = HashMap::new();
        // Stale listings are worse than slow ones.
        headers.insert("cache-control".to_owned(), "no-cache".to_owned());
        for (name, value) in extra_headers {
            headers.insert((*name).to_owned(), (*value).to_owned());
        }
        match &self.credentials {
            None => (),
            Some(c) if c.scheme == AuthScheme::Basic => {
                headers.insert(
                    "authorization".to_owned(),
                    auth::basic_header(&c.username, &c.password),
                );
            }
            Some(_) => {
                let cached = self.digest.lock().unwrap().clone();
                if let Some(challenge) = cached {
                    headers.insert(
                        "authorization".to_owned(),
                        self.digest_header(method, &uri, &challenge),
                    );
                }
            }
        }

        let prepared = HttpRequest {
            method: method.to_owned(),
            url: url.to_string(),
            headers,
            body,
        };
        let response = self.send.send(prepared.clone()).await?;

        if response.status != 401 {
            return Ok(response);
        }
        let digest_wanted = matches!(
            &self.credentials,
            Some(c) if c.scheme == AuthScheme::Digest
        );
        if !digest_wanted {
            return Ok(response);
        }
        let challenge = match response
            .header("www-authenticate")
            .and_then(DigestChallenge::parse)
        {
            Some(challenge) => challenge,
            None => return Ok(response),
        };
        trace!(realm = %challenge.realm, "answering digest challenge");
        let mut retry = prepared;
        retry.headers.insert(
            "authorization".to_owned(),
            self.digest_header(method, &uri, &challenge),
        );
        *self.digest.lock().unwrap() = Some(challenge);
        self.send.send(retry).await
    }

    fn status_error(&self, response: &HttpResponse, path: &str) -> Error {
        let kind = match response.status {
            404 => ErrorKind::NotFound,
            401 | 403 => ErrorKind::PermissionDenied,
            405 => ErrorKind::AlreadyExists,
            _ => ErrorKind::Other,
        };
        Error {
            kind,
            path: Some(path.to_owned()),
            message: Some(format!(
                "server returned {} {}",
                response.status, response.status_text
            )),
            source: None,
        }
    }

    pub async fn propfind(
        &self,
        path: &str,
        depth: Depth,
        exclude_self: bool,
    ) -> Result<Vec<DavStat>> {
        trace!(%path, depth = depth.header_value(), "propfind");
        let response = self
            .request(
                "PROPFIND",
                path,
                &[
                    ("depth", depth.header_value()),
                    ("content-type", "application/xml; charset=\"utf-8\""),
                ],
                Some(Bytes::from_static(PROPFIND_BODY.as_bytes())),
            )
            .await?;
        if response.status != 207 {
            return Err(self.status_error(&response, path));
        }
        let body = String::from_utf8_lossy(&response.body);
        let stats = xml::parse_multistatus(&body, &self.endpoint_path, path, exclude_self)?;
        trace!(n_stats = stats.len(), "propfind complete");
        Ok(stats)
    }

    pub async fn stat(&self, path: &str) -> Result<DavStat> {
        self.propfind(path, Depth::Zero, false)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error {
                kind: ErrorKind::Other,
                path: Some(path.to_owned()),
                message: Some("multistatus response contained no entries".to_owned()),
                source: None,
            })
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Immediate children of a collection.
    pub async fn list_dir(&self, path: &str) -> Result<Vec<DavStat>> {
        self.propfind(path, Depth::One, true).await
    }

    /// Whole subtree in one request, for servers that support it.
    pub async fn list_tree(&self, path: &str) -> Result<Vec<DavStat>> {
        self.propfind(path, Depth::Infinity, true).await
    }

    /// MKCOL each missing segment, parents first.
    ///
    /// Servers answer an existing collection with 405 (or occasionally a
    /// plain 200); both mean "nothing to do" here.
    pub async fn create_dir_all(&self, path: &str) -> Result<()> {
        trace!(%path, "create_dir_all");
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            let response = self.request("MKCOL", &current, &[], None).await?;
            match response.status {
                200 | 201 | 405 => (),
                _ => return Err(self.status_error(&response, &current)),
            }
        }
        Ok(())
    }

    /// Upload a complete file, overwriting any existing content.
    pub async fn put(&self, path: &str, content: &[u8]) -> Result<()> {
        trace!(%path, "put");
        let response = self
            .request(
                "PUT",
                path,
                &[("content-type", "application/octet-stream")],
                Some(Bytes::copy_from_slice(content)),
            )
            .await?;
        match response.status {
            200 | 201 | 204 => {
                trace!(bytes = content.len(), "uploaded");
                Ok(())
            }
            _ => Err(self.status_error(&response, path)),
        }
    }

    /// Download a complete file.
    pub async fn get(&self, path: &str) -> Result<Bytes> {
        trace!(%path, "get");
        let response = self.request("GET", path, &[], None).await?;
        if !response.is_success() {
            return Err(self.status_error(&response, path));
        }
        // A multistatus payload here means the server answered the download
        // like a listing; don't hand XML back as file content.
        let content_type = response.header("content-type").unwrap_or_default();
        if response.status == 207
            || (content_type.contains("xml") && looks_like_multistatus(&response.body))
        {
            return Err(Error {
                kind: ErrorKind::UnexpectedContentType,
                path: Some(path.to_owned()),
                message: Some(format!(
                    "expected file content but got {content_type:?}"
                )),
                source: None,
            });
        }
        trace!(bytes = response.body.len(), "downloaded");
        Ok(response.body)
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        trace!(%path, "delete");
        let response = self.request("DELETE", path, &[], None).await?;
        match response.status {
            200 | 204 => Ok(()),
            _ => Err(self.status_error(&response, path)),
        }
    }
}

fn looks_like_multistatus(body: &Bytes) -> bool {
    let head = &body[..body.len().min(512)];
    String::from_utf8_lossy(head).contains("multistatus")
}
