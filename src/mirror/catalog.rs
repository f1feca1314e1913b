//! Collection catalog sync and lookups.

use std::path::Path;

use crate::db::{Collection, NewCollection};
use crate::error::{Error, Result};
use crate::remote::CatalogEntry;
use crate::types::CollectionId;

use super::CollectionMirror;

impl CollectionMirror {
    /// Fetch the remote catalog and insert collections not yet known
    ///
    /// Existing collections are left untouched, even if the catalog now
    /// advertises a different address or size for them. Returns the
    /// collections that were added, in catalog order.
    pub async fn sync_catalog(&self) -> Result<Vec<Collection>> {
        let catalog = self.remote.fetch_catalog().await?;
        let mut added = Vec::new();

        for entry in &catalog {
            if self.db.collection_exists_by_name(&entry.title).await? {
                continue;
            }

            match self.db.create_collection(&entry.to_new_collection()).await {
                Ok(id) => added.push(self.db.get_collection(id).await?),
                // Inserted concurrently between the check and the insert
                Err(Error::DuplicateCollection(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            advertised = catalog.len(),
            added = added.len(),
            "Catalog synchronized"
        );

        Ok(added)
    }

    /// Fetch the remote catalog and write it to `path` as pretty-printed JSON
    ///
    /// The file holds the catalog exactly as advertised, in the same
    /// `{title, size, url, dt}` shape the service returns, and is replaced
    /// if it already exists. The store is not touched.
    pub async fn export_catalog(&self, path: &Path) -> Result<Vec<CatalogEntry>> {
        let catalog = self.remote.fetch_catalog().await?;

        let json = serde_json::to_vec_pretty(&catalog)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;

        tracing::info!(
            entries = catalog.len(),
            path = %path.display(),
            "Catalog exported"
        );

        Ok(catalog)
    }

    /// Register a collection by hand
    ///
    /// # Errors
    /// [`Error::DuplicateCollection`] if the name is already taken.
    pub async fn add_collection(&self, collection: &NewCollection) -> Result<CollectionId> {
        let id = self.db.create_collection(collection).await?;
        tracing::info!(collection_id = id.0, name = %collection.name, "Collection added");
        Ok(id)
    }

    /// All known collections, newest publication first
    pub async fn list_collections(&self) -> Result<Vec<Collection>> {
        self.db.list_collections().await
    }

    /// Look up a collection by id
    pub async fn get_collection(&self, id: CollectionId) -> Result<Collection> {
        self.db.get_collection(id).await
    }

    /// Look up a collection by its unique name
    pub async fn find_collection(&self, name: &str) -> Result<Collection> {
        self.db
            .get_collection_by_name(name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("collection '{}'", name)))
    }
}
