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

//! The canonical record for a remote file or directory, independent of the
//! backend protocol.
//!
//! Entities are constructed transiently from server responses on every
//! operation; persisting them is the sync engine's database's business, not
//! ours.

use serde::{Deserialize, Serialize};

/// One file or directory as the sync engine sees it.
///
/// `key` is the vault-relative path: no leading slash, and a trailing slash
/// if and only if the entry is a directory.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub key: String,
    pub key_raw: String,

    /// Server-reported last-modified time, in epoch milliseconds.
    pub mtime_svr: i64,

    /// Mirrors `mtime_svr`: WebDAV exposes no channel for a client-set
    /// modification time.
    pub mtime_cli: i64,

    /// Byte length as reported by the server; 0 for directories.
    pub size: u64,
    pub size_raw: u64,
}

impl Entity {
    pub fn is_dir(&self) -> bool {
        self.key.ends_with('/')
    }
}
