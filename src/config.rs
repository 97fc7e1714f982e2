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

//! Configuration for the WebDAV backend.
//!
//! The caller owns persistence: the adapter hands back an updated copy
//! through the save callback when initialization rewrites the depth mode,
//! so the serde names here are the on-disk names.

use serde::{Deserialize, Serialize};

/// Connection settings for one WebDAV server.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct WebdavConfig {
    /// Server address, e.g. `https://dav.example.com/remote.php/dav`.
    pub address: String,
    pub username: String,
    pub password: String,
    pub auth_type: AuthScheme,

    /// Server-side folder all vault content lives under. When empty, the
    /// vault's own name is used.
    pub remote_base_dir: String,

    /// Crawl the tree one level at a time instead of trusting the server
    /// with a recursive listing.
    pub manual_recursive: bool,

    pub depth: DepthMode,
}

impl Default for WebdavConfig {
    fn default() -> Self {
        WebdavConfig {
            address: String::new(),
            username: String::new(),
            password: String::new(),
            auth_type: AuthScheme::Basic,
            remote_base_dir: String::new(),
            manual_recursive: true,
            depth: DepthMode::ManualOne,
        }
    }
}

/// HTTP authentication scheme to offer the server.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    Basic,
    Digest,
}

/// How far one PROPFIND is allowed to reach.
///
/// The `auto_*` values record a capability guess that was never confirmed;
/// they are all treated as "shallow only" and rewritten to `manual_1` on the
/// first successful connection.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum DepthMode {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "auto_1")]
    AutoOne,
    #[serde(rename = "auto_infinity")]
    AutoInfinity,
    #[serde(rename = "auto_unknown")]
    AutoUnknown,
    #[serde(rename = "manual_1")]
    ManualOne,
    #[serde(rename = "manual_infinity")]
    ManualInfinity,
}

impl DepthMode {
    pub fn is_auto(self) -> bool {
        matches!(
            self,
            DepthMode::Auto | DepthMode::AutoOne | DepthMode::AutoInfinity | DepthMode::AutoUnknown
        )
    }

    /// Whether the server is trusted to answer a single depth-infinity
    /// listing for the whole tree.
    pub fn trusts_deep_listing(self) -> bool {
        matches!(self, DepthMode::ManualInfinity)
    }
}

/// The host platform the adapter runs on.
///
/// iOS is special twice over: its network stack refuses cleartext HTTP, and
/// it needs the 401-on-PROPFIND trailing-slash workaround.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Platform {
    Desktop,
    Ios,
    Android,
}

impl Platform {
    pub fn requires_secure_transport(self) -> bool {
        matches!(self, Platform::Ios)
    }

    pub(crate) fn retries_collection_probe(self) -> bool {
        matches!(self, Platform::Ios)
    }
}
