//! Favorite jobs of the signed-in user

use jobboard_protocol::api::favorites::{AddFavoriteRequest, Favorite};
use std::sync::Arc;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::{ClientError, Result};
use crate::scoped::SessionScoped;

pub const FAVORITES_PATH: &str = "/api/jobs/favorites/";

fn favorite_path(favorite_id: u64) -> String {
    format!("{}{}/", FAVORITES_PATH, favorite_id)
}

/// Cached favorites, emptied whenever the session ends
#[derive(Debug)]
pub struct FavoriteJobs {
    client: Arc<ApiClient>,
    entries: SessionScoped<Vec<Favorite>>,
}

impl FavoriteJobs {
    pub fn new(client: Arc<ApiClient>) -> Self {
        let entries = SessionScoped::new(client.store().clone());
        Self { client, entries }
    }

    /// Reload from the API. Does nothing while logged out.
    pub async fn refresh(&self) -> Result<Vec<Favorite>> {
        if !self.client.is_authenticated() {
            self.entries.reset();
            return Ok(Vec::new());
        }
        let owner = self.entries.owner();
        let favorites: Vec<Favorite> = self.client.get(FAVORITES_PATH).await?;
        if !self.entries.set_for(owner.as_deref(), favorites.clone()) {
            debug!("session changed while loading favorites, discarding them");
            return Ok(self.entries.get());
        }
        debug!(count = favorites.len(), "favorites loaded");
        Ok(favorites)
    }

    pub fn entries(&self) -> Vec<Favorite> {
        self.entries.get()
    }

    pub fn is_favorited(&self, job_id: u64) -> bool {
        self.entries.get().iter().any(|f| f.job.id == job_id)
    }

    /// Add or remove `job_id`; returns whether the job is now a favorite
    pub async fn toggle(&self, job_id: u64) -> Result<bool> {
        if !self.client.is_authenticated() {
            return Err(ClientError::not_authenticated());
        }

        let owner = self.entries.owner();
        let existing = self
            .entries
            .get()
            .into_iter()
            .find(|f| f.job.id == job_id);

        match existing {
            Some(favorite) => {
                self.client.delete::<()>(&favorite_path(favorite.id)).await?;
                self.entries
                    .update_for(owner.as_deref(), |entries| entries.retain(|f| f.id != favorite.id));
                debug!(job_id, favorite_id = favorite.id, "favorite removed");
                Ok(false)
            }
            None => {
                let created: Favorite = self
                    .client
                    .post_json(FAVORITES_PATH, &AddFavoriteRequest { job_id })
                    .await?;
                debug!(job_id, favorite_id = created.id, "favorite added");
                self.entries.update_for(owner.as_deref(), |entries| {
                    entries.retain(|f| f.id != created.id);
                    entries.push(created);
                });
                Ok(true)
            }
        }
    }
}
