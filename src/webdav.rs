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

//! WebDAV backend for the remote filesystem interface.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{OnceCell, RwLock};
use tracing::{error, info};
use url::Url;

use crate::config::{DepthMode, Platform, WebdavConfig};
use crate::entity::Entity;
use crate::error::{Error, ErrorKind, Result};
use crate::http::{HttpSend, ReqwestSend};
use crate::remotefs::{ConnectCallback, RemoteFs};

mod auth;
mod crawl;
mod dav;
mod path;
mod shim;
mod xml;

use dav::{Credentials, DavClient};
use xml::DavStat;

/// Callback invoked when initialization rewrites the stored configuration
/// (the `auto_*` depth downgrade). The caller owns persistence.
pub type SaveConfig = Box<dyn Fn(&WebdavConfig) + Send + Sync>;

/// Remote filesystem over one WebDAV server.
///
/// The underlying client is constructed lazily on first use; the adapter
/// owns it exclusively and keeps a private copy of the configuration, so
/// later mutation of the caller's config cannot reach a live connection.
pub struct WebdavFs {
    config: RwLock<WebdavConfig>,
    remote_base_dir: String,
    platform: Platform,
    send: Arc<dyn HttpSend>,
    save_config: Option<SaveConfig>,
    client: OnceCell<DavClient>,
    last_delete_error: Mutex<Option<Error>>,
}

impl WebdavFs {
    /// Create an adapter using the built-in reqwest transport.
    pub fn new(
        config: &WebdavConfig,
        vault_name: &str,
        platform: Platform,
        save_config: Option<SaveConfig>,
    ) -> Result<WebdavFs> {
        let send: Arc<dyn HttpSend> = Arc::new(ReqwestSend::new()?);
        Ok(WebdavFs::with_transport(
            config,
            vault_name,
            platform,
            save_config,
            send,
        ))
    }

    /// Create an adapter over a caller-supplied HTTP primitive.
    ///
    /// The primitive is wrapped in the normalizing shim, so substitutes see
    /// the same request shape the built-in transport does.
    pub fn with_transport(
        config: &WebdavConfig,
        vault_name: &str,
        platform: Platform,
        save_config: Option<SaveConfig>,
        send: Arc<dyn HttpSend>,
    ) -> WebdavFs {
        let config = config.clone();
        let remote_base_dir = if config.remote_base_dir.is_empty() {
            vault_name.to_owned()
        } else {
            config.remote_base_dir.clone()
        };
        WebdavFs {
            config: RwLock::new(config),
            remote_base_dir,
            platform,
            send: Arc::new(shim::RequestShim::new(send, platform)),
            save_config,
            client: OnceCell::new(),
            last_delete_error: Mutex::new(None),
        }
    }

    /// The most recently swallowed delete error, if any.
    ///
    /// `rm` is best-effort by contract and never fails; this side channel
    /// lets diagnostics and tests still observe what went wrong.
    pub fn take_last_delete_error(&self) -> Option<Error> {
        self.last_delete_error.lock().unwrap().take()
    }

    /// Get the live client, connecting on first use.
    ///
    /// Safe under concurrent first calls: the cell runs one initializer and
    /// everyone else waits for it.
    async fn client(&self) -> Result<&DavClient> {
        self.client.get_or_try_init(|| self.init()).await
    }

    async fn init(&self) -> Result<DavClient> {
        let mut config = self.config.write().await;
        if self.platform.requires_secure_transport() && !config.address.starts_with("https") {
            return Err(Error {
                kind: ErrorKind::Config,
                path: None,
                message: Some(
                    "the WebDAV address must be https, not http, on this platform".to_owned(),
                ),
                source: None,
            });
        }
        let address = Url::parse(&config.address).map_err(|err| Error {
            kind: ErrorKind::Config,
            path: Some(config.address.clone()),
            message: Some("unparseable server address".to_owned()),
            source: Some(Box::new(err)),
        })?;
        let credentials = if !config.username.is_empty() && !config.password.is_empty() {
            Some(Credentials {
                username: config.username.clone(),
                password: config.password.clone(),
                scheme: config.auth_type,
            })
        } else {
            info!("no credentials configured, connecting anonymously");
            None
        };
        let client = DavClient::new(Arc::clone(&self.send), address, credentials);

        // Make sure the base directory exists. Once this succeeds it is
        // never rechecked for the lifetime of the adapter.
        let base = format!("/{}/", self.remote_base_dir);
        if !client.exists(&base).await? {
            info!(dir = %base, "remote base directory missing, creating");
            client.create_dir_all(&base).await?;
        }

        // Never trust an `auto_*` capability guess after the first
        // successful connection.
        if config.depth.is_auto() {
            config.depth = DepthMode::ManualOne;
            config.manual_recursive = true;
            info!(depth = ?config.depth, "downgraded automatic depth detection");
            if let Some(save) = &self.save_config {
                save(&config);
            }
        }
        Ok(client)
    }

    fn remote_path(&self, key: &str) -> String {
        path::remote_path(key, &self.remote_base_dir)
    }

    /// Map a raw stat record onto the canonical entity shape.
    fn entity_from_stat(&self, stat: &DavStat) -> Result<Entity> {
        let mut key = path::vault_key(&stat.filename, &self.remote_base_dir)?;
        if stat.kind.is_dir() && !key.ends_with('/') {
            key.push('/');
        }
        let last_modified = stat.last_modified.as_deref().ok_or_else(|| Error {
            kind: ErrorKind::TimeParse,
            path: Some(stat.filename.clone()),
            message: Some("server sent no modification time".to_owned()),
            source: None,
        })?;
        let mtime_svr = xml::parse_http_date(last_modified).map_err(|mut err| {
            err.path = Some(stat.filename.clone());
            err
        })?;
        Ok(Entity {
            key: key.clone(),
            key_raw: key,
            mtime_svr,
            // WebDAV has no channel for a client-set modification time.
            mtime_cli: mtime_svr,
            size: stat.size,
            size_raw: stat.size,
        })
    }
}

#[async_trait]
impl RemoteFs for WebdavFs {
    fn kind(&self) -> &'static str {
        "webdav"
    }

    async fn walk(&self) -> Result<Vec<Entity>> {
        let client = self.client().await?;
        // All auto_* guesses are untrusted; only manual_infinity earns a
        // single recursive listing.
        let shallow = !self.config.read().await.depth.trusts_deep_listing();
        let root = format!("/{}", self.remote_base_dir);
        let stats = crawl::crawl(client, &root, shallow).await?;
        stats.iter().map(|stat| self.entity_from_stat(stat)).collect()
    }

    async fn stat(&self, key: &str) -> Result<Entity> {
        let client = self.client().await?;
        let stat = client.stat(&self.remote_path(key)).await?;
        self.entity_from_stat(&stat)
    }

    async fn mkdir(&self, key: &str, _mtime: Option<i64>, _ctime: Option<i64>) -> Result<Entity> {
        if !key.ends_with('/') {
            return Err(Error::precondition(
                key,
                "mkdir requires a directory key ending in '/'",
            ));
        }
        let client = self.client().await?;
        let dir = self.remote_path(key);
        client.create_dir_all(&dir).await?;
        let stat = client.stat(&dir).await?;
        self.entity_from_stat(&stat)
    }

    async fn write_file(
        &self,
        key: &str,
        content: &[u8],
        _mtime: i64,
        _ctime: i64,
    ) -> Result<Entity> {
        if key.ends_with('/') {
            return Err(Error::precondition(
                key,
                "write_file requires a file key without a trailing '/'",
            ));
        }
        let client = self.client().await?;
        let file = self.remote_path(key);
        client.put(&file, content).await?;
        // The server's stat is authoritative for size and mtime, not the
        // caller's hint.
        let stat = client.stat(&file).await?;
        self.entity_from_stat(&stat)
    }

    async fn read_file(&self, key: &str) -> Result<Bytes> {
        if key.ends_with('/') {
            return Err(Error::precondition(
                key,
                "read_file requires a file key without a trailing '/'",
            ));
        }
        let client = self.client().await?;
        client.get(&self.remote_path(key)).await
    }

    async fn rm(&self, key: &str) -> Result<()> {
        // Both forms of the root key resolve to the base directory itself;
        // deleting the whole vault through a degenerate key is never right.
        if key.is_empty() || key == "/" {
            return Ok(());
        }
        let client = self.client().await?;
        let target = self.remote_path(key);
        if let Err(err) = client.delete(&target).await {
            error!(path = %target, %err, "error deleting remote entry");
            *self.last_delete_error.lock().unwrap() = Some(err);
        }
        Ok(())
    }

    async fn check_connect(&self, callback: Option<ConnectCallback<'_>>) -> bool {
        let address = self.config.read().await.address.clone();
        if !(address.starts_with("http://") || address.starts_with("https://")) {
            let message = "the server address should start with http(s):// but it does not";
            error!(%address, "{message}");
            if let Some(callback) = callback {
                callback(message);
            }
            return false;
        }
        let probe = async {
            let client = self.client().await?;
            client.stat(&format!("/{}/", self.remote_base_dir)).await
        };
        match probe.await {
            Ok(_) => true,
            Err(err) => {
                error!(%err, "connectivity check failed");
                if let Some(callback) = callback {
                    callback(&err.to_string());
                }
                false
            }
        }
    }

    async fn user_display_name(&self) -> Result<String> {
        Err(Error::not_implemented("user_display_name"))
    }

    async fn revoke_auth(&self) -> Result<()> {
        Err(Error::not_implemented("revoke_auth"))
    }
}
