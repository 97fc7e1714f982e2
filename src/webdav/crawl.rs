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

//! Traversal of the remote tree when the server can't be trusted to list
//! recursively.
//!
//! The walk is level-ordered: each round drains every directory discovered
//! so far, lists them in groups of [`CHUNK_SIZE`] concurrent requests
//! (sequential across groups), and feeds newly found collections into the
//! next round. Bounding the in-flight requests keeps constrained servers
//! and mobile network stacks alive; per-round batching keeps memory
//! bounded by one tree level rather than the whole tree.

use futures::future::try_join_all;
use tracing::trace;

use super::dav::DavClient;
use super::xml::DavStat;
use crate::error::Result;

/// Upper bound on concurrent listing requests within one group.
pub(crate) const CHUNK_SIZE: usize = 10;

/// Collect every file and directory under `root`.
///
/// `shallow_only` reflects the configured depth mode: servers not
/// explicitly trusted with depth-infinity get the level-by-level crawl.
/// The result contains everything below `root` but not `root` itself, in
/// no particular order, with no duplicate suppression — a server that
/// reports a path twice within one tree is on its own.
pub(crate) async fn crawl(
    client: &DavClient,
    root: &str,
    shallow_only: bool,
) -> Result<Vec<DavStat>> {
    if !shallow_only {
        return client.list_tree(root).await;
    }
    let mut found = Vec::new();
    let mut pending = vec![root.to_owned()];
    while !pending.is_empty() {
        let batch = std::mem::take(&mut pending);
        trace!(width = batch.len(), "crawl round");
        for group in batch.chunks(CHUNK_SIZE) {
            let listings = try_join_all(group.iter().map(|path| client.list_dir(path))).await?;
            for stat in listings.into_iter().flatten() {
                if stat.kind.is_dir() {
                    pending.push(stat.filename.clone());
                }
                found.push(stat);
            }
        }
    }
    Ok(found)
}
