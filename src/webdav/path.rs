// Copyright 2022-2025 The Vaultdav Authors.

//! Translation between vault-relative keys and server-absolute paths.

use tracing::warn;

use crate::error::{Error, ErrorKind, Result};

/// Map a vault-relative key to the server-absolute path under `base`.
///
/// The empty key and `"/"` both address the base directory itself.
pub(crate) fn remote_path(key: &str, base: &str) -> String {
    if key.is_empty() || key == "/" {
        format!("/{base}/")
    } else if key.starts_with('/') {
        // Keys are relative by contract; tolerate the anomaly but flag it.
        warn!(%key, "vault key unexpectedly starts with '/'");
        format!("/{base}{key}")
    } else {
        format!("/{base}/{key}")
    }
}

/// Strip the `/{base}/` prefix from a server path, returning the vault key.
///
/// The bare `/{base}` (the directory itself) maps to the empty key.
/// Directory keys get their trailing slash from the entity mapper, not here.
pub(crate) fn vault_key(server_path: &str, base: &str) -> Result<String> {
    let bare = format!("/{base}");
    let prefixed = format!("/{base}/");
    if server_path != bare && !server_path.starts_with(&prefixed) {
        return Err(Error {
            kind: ErrorKind::PathMismatch,
            path: Some(server_path.to_owned()),
            message: Some(format!("expected a path under {prefixed:?}")),
            source: None,
        });
    }
    Ok(server_path.get(prefixed.len()..).unwrap_or("").to_owned())
}
