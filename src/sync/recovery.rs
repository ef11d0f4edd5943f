use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::collections::HashSet;

use crate::constants::{ERROR_NO_ACCESS_TOKEN, ERROR_OFFLINE};
use crate::sync::SyncService;
use crate::utils::datetime;

impl SyncService {
    /// Whether the server holds any task for the signed-in user.
    ///
    /// Guests, missing tokens, being offline and fetch errors all read as
    /// `false`.
    pub async fn has_server_data(&self) -> Result<bool> {
        let session = self.require_session().await?;
        let Some(token) = session.token().filter(|_| !session.is_guest) else {
            return Ok(false);
        };
        if !self.network.is_online() {
            return Ok(false);
        }

        match self.api.fetch_tasks(token).await {
            Ok(tasks) => Ok(!tasks.is_empty()),
            Err(e) => {
                warn!("⚠️ Could not check server data: {e}");
                Ok(false)
            }
        }
    }

    /// Restores the server's tasks into local storage, typically after a wipe.
    ///
    /// Server tasks already present locally are left as they are; the rest
    /// are stored as synced rows under fresh local ids.
    ///
    /// # Returns
    /// The number of tasks recovered
    ///
    /// # Errors
    /// Returns an error for guests, without a token, offline, or when the
    /// fetch or the store write fails
    pub async fn recover_from_server(&self) -> Result<usize> {
        let session = self.require_session().await?;
        let Some(token) = session.token().filter(|_| !session.is_guest) else {
            bail!(ERROR_NO_ACCESS_TOKEN);
        };
        if !self.network.is_online() {
            bail!(ERROR_OFFLINE);
        }

        let server_tasks = self
            .api
            .fetch_tasks(token)
            .await
            .context("Failed to fetch tasks for recovery")?;

        let mut known: HashSet<String> = self
            .tasks
            .get_all_rows_for_owner(&session.id)
            .await?
            .iter()
            .map(|t| t.external_id().to_string())
            .collect();

        let missing: Vec<_> = server_tasks
            .iter()
            .filter(|remote| known.insert(remote.id.clone()))
            .map(|remote| remote.to_local_model(&datetime::generate_local_id(), &session.id))
            .collect();

        let recovered = self.tasks.bulk_insert_tasks(missing, &session.id).await?;
        info!("♻️ Recovered {} of {} server tasks", recovered, server_tasks.len());
        Ok(recovered)
    }
}
