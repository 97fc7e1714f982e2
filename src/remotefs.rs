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

//! The abstract remote filesystem consumed by the sync engine.
//!
//! Each backend (WebDAV, S3, ...) implements this narrow trait on its own;
//! there is no shared base state between backends.

use async_trait::async_trait;
use bytes::Bytes;

use crate::entity::Entity;
use crate::error::Result;

/// Callback receiving a human-readable diagnostic from [`RemoteFs::check_connect`].
pub type ConnectCallback<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Filesystem-like operations against one remote backend.
///
/// Keys are vault-relative paths: no leading slash, trailing slash for
/// directories. Operations are issued one at a time from the adapter's
/// perspective; callers that need ordering between concurrent operations
/// must serialize themselves.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Short tag naming the backend protocol, e.g. `"webdav"`.
    fn kind(&self) -> &'static str;

    /// List every file and directory under the remote base directory.
    ///
    /// No ordering is guaranteed.
    async fn walk(&self) -> Result<Vec<Entity>>;

    /// Stat one entry.
    async fn stat(&self, key: &str) -> Result<Entity>;

    /// Create a directory, and any missing parents, then return its fresh
    /// stat. `key` must end in `/`.
    ///
    /// Times are accepted for symmetry with backends that can store them;
    /// WebDAV has no settable-mtime channel, so they are not transmitted.
    async fn mkdir(&self, key: &str, mtime: Option<i64>, ctime: Option<i64>) -> Result<Entity>;

    /// Upload a file with overwrite semantics, then return its fresh stat
    /// (server-authoritative size and mtime). `key` must not end in `/`.
    async fn write_file(&self, key: &str, content: &[u8], mtime: i64, ctime: i64)
        -> Result<Entity>;

    /// Download one complete file. `key` must not end in `/`.
    ///
    /// Vault files are of bounded size, so it's OK to always read them
    /// entirely into memory.
    async fn read_file(&self, key: &str) -> Result<Bytes>;

    /// Best-effort delete: failures are logged and swallowed, and the root
    /// path is a no-op.
    async fn rm(&self, key: &str) -> Result<()>;

    /// Probe connectivity. Never fails: errors are reported through the
    /// optional callback and turned into `false`.
    async fn check_connect(&self, callback: Option<ConnectCallback<'_>>) -> bool;

    /// The display name of the authenticated user, for backends that have
    /// a user-identity concept.
    async fn user_display_name(&self) -> Result<String>;

    /// Revoke stored credentials, for backends with revocable auth.
    async fn revoke_auth(&self) -> Result<()>;
}
