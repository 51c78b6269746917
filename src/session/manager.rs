use std::sync::{Arc, RwLock};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::alexa::{AlexaClient, AlexaError};
use crate::config::Config;

use super::SessionStore;

/// Fresh credential pair emitted by the client after a successful connect
#[derive(Debug)]
pub struct CredentialUpdate {
    pub cookie: Value,
    pub mac_dms: Option<Value>,
}

/// Owns the single live client behind one mutation point.
///
/// Handlers take an `Arc` snapshot of the current client, so requests in
/// flight during a `/reconnect` observe either the old or the new instance,
/// never a half-replaced one. Credential updates travel over one channel
/// registered here at construction; a background task persists them.
pub struct SessionManager {
    config: Config,
    store: Arc<SessionStore>,
    client: RwLock<Option<Arc<AlexaClient>>>,
    connected_at: RwLock<Option<DateTime<Utc>>>,
    credential_tx: mpsc::UnboundedSender<CredentialUpdate>,
}

impl SessionManager {
    pub fn new(config: Config, store: SessionStore) -> Arc<Self> {
        let store = Arc::new(store);
        let (credential_tx, credential_rx) = mpsc::unbounded_channel();
        tokio::spawn(persist_credentials(credential_rx, Arc::clone(&store)));

        Arc::new(Self {
            config,
            store,
            client: RwLock::new(None),
            connected_at: RwLock::new(None),
            credential_tx,
        })
    }

    /// Build a fresh client from the stored credentials and swap it in.
    /// On failure the previous client, if any, stays in place.
    pub async fn connect(&self) -> Result<(), AlexaError> {
        let cookie = self.store.load_cookie();
        let mac_dms = self.store.load_mac_dms();
        let client =
            AlexaClient::connect(&self.config, cookie, mac_dms, self.credential_tx.clone()).await?;

        *self.client.write().unwrap() = Some(Arc::new(client));
        *self.connected_at.write().unwrap() = Some(Utc::now());
        info!("Alexa connection established");
        Ok(())
    }

    /// Snapshot of the current client
    pub fn client(&self) -> Result<Arc<AlexaClient>, AlexaError> {
        self.client
            .read()
            .unwrap()
            .clone()
            .ok_or(AlexaError::NotConnected)
    }

    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        *self.connected_at.read().unwrap()
    }

    /// Whether a cookie blob is stored, regardless of its validity
    pub fn has_stored_cookie(&self) -> bool {
        self.store.has_cookie()
    }

    /// Delete the persisted session files. A live client keeps running;
    /// only the on-disk state goes.
    pub fn clear_session_files(&self) -> Result<()> {
        self.store.clear()
    }
}

/// Persist every credential update the client emits. Write failures are
/// logged and swallowed; the state is re-derivable through the login helper.
async fn persist_credentials(
    mut rx: mpsc::UnboundedReceiver<CredentialUpdate>,
    store: Arc<SessionStore>,
) {
    while let Some(update) = rx.recv().await {
        if let Err(e) = store.save_cookie(&update.cookie) {
            warn!(error = %e, "Failed to persist session cookie");
        }
        if let Some(ref mac_dms) = update.mac_dms {
            if let Err(e) = store.save_mac_dms(mac_dms) {
                warn!(error = %e, "Failed to persist device-management token");
            }
        }
    }
}
