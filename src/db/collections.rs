//! Collection catalog operations.

use crate::error::DatabaseError;
use crate::types::CollectionId;
use crate::{Error, Result};

use super::{Collection, Database, NewCollection};

impl Database {
    /// Insert a new collection
    ///
    /// Fails with [`Error::DuplicateCollection`] if the name is taken; an
    /// existing row is never overwritten.
    pub async fn create_collection(&self, collection: &NewCollection) -> Result<CollectionId> {
        let result = sqlx::query("INSERT INTO collections (name, url, size, ts) VALUES (?, ?, ?, ?)")
            .bind(&collection.name)
            .bind(&collection.url)
            .bind(collection.size)
            .bind(collection.timestamp.timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let unique = e
                    .as_database_error()
                    .is_some_and(|db_err| db_err.is_unique_violation());
                if unique {
                    Error::DuplicateCollection(collection.name.clone())
                } else {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to insert collection: {}",
                        e
                    )))
                }
            })?;

        Ok(CollectionId(result.last_insert_rowid()))
    }

    /// Check whether a collection with this ID exists
    pub async fn collection_exists(&self, id: CollectionId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM collections WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to check collection: {}",
                    e
                )))
            })?;

        Ok(exists)
    }

    /// Check whether a collection with this name exists
    pub async fn collection_exists_by_name(&self, name: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM collections WHERE name = ?)")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to check collection name: {}",
                        e
                    )))
                })?;

        Ok(exists)
    }

    /// List all collections, newest publication first
    pub async fn list_collections(&self) -> Result<Vec<Collection>> {
        let rows = sqlx::query_as::<_, Collection>(
            "SELECT id, name, url, size, ts FROM collections ORDER BY ts DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list collections: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Get a collection by ID
    pub async fn get_collection(&self, id: CollectionId) -> Result<Collection> {
        sqlx::query_as::<_, Collection>("SELECT id, name, url, size, ts FROM collections WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get collection: {}",
                    e
                )))
            })?
            .ok_or_else(|| Error::NotFound(format!("collection {}", id)))
    }

    /// Get a collection by its unique name
    pub async fn get_collection_by_name(&self, name: &str) -> Result<Option<Collection>> {
        let row = sqlx::query_as::<_, Collection>(
            "SELECT id, name, url, size, ts FROM collections WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get collection by name: {}",
                e
            )))
        })?;

        Ok(row)
    }
}
