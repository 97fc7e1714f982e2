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

//! WebDAV remote-filesystem adapter for vault synchronization.
//!
//! Exposes a small set of filesystem-like operations — list all entries,
//! read a file, write a file, create a directory, stat an entry, delete an
//! entry, verify connectivity — against WebDAV servers whose actual
//! protocol behavior is inconsistent across implementations: partial
//! PROPFIND depth support, 401 answers on directory probes, non-Latin-1
//! response headers, null-body status codes.
//!
//! The sync engine consumes this through the [`RemoteFs`] trait and the
//! canonical [`Entity`] record; everything protocol-specific stays inside
//! the [`WebdavFs`] backend.

mod config;
mod entity;
mod error;
mod http;
mod kind;
mod remotefs;
mod webdav;

pub use crate::config::{AuthScheme, DepthMode, Platform, WebdavConfig};
pub use crate::entity::Entity;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::http::{HttpRequest, HttpResponse, HttpSend, ReqwestSend};
pub use crate::kind::Kind;
pub use crate::remotefs::{ConnectCallback, RemoteFs};
pub use crate::webdav::{SaveConfig, WebdavFs};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}
