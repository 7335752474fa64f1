use serde::{de::DeserializeOwned, Serialize};

use super::backend::{BackendError, Order, RemoteService, RowQuery};

/// Typed query builder over [`RemoteService`] row operations.
///
/// ```ignore
/// let customers: Vec<Customer> = Rows::from(backend, "customers")
///     .eq("created_by_company_id", company_id)
///     .order("created_at", false)
///     .fetch()
///     .await?;
/// ```
pub struct Rows<'a> {
    backend: &'a dyn RemoteService,
    query: RowQuery,
}

impl<'a> Rows<'a> {
    pub fn from(backend: &'a dyn RemoteService, table: &str) -> Self {
        Self {
            backend,
            query: RowQuery::new(table),
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.query.columns = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.query
            .filters
            .push((column.to_string(), value.to_string()));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.query.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, BackendError> {
        self.backend
            .select(&self.query)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(BackendError::from))
            .collect()
    }

    /// Exactly one matching row; zero or several is `NotFound`.
    pub async fn single<T: DeserializeOwned>(self) -> Result<T, BackendError> {
        self.maybe_single().await?.ok_or(BackendError::NotFound)
    }

    pub async fn maybe_single<T: DeserializeOwned>(self) -> Result<Option<T>, BackendError> {
        let mut rows = self.backend.select(&self.query).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(Some(serde_json::from_value(rows.remove(0))?)),
            n => {
                tracing::warn!(table = %self.query.table, rows = n, "Expected a single row");
                Err(BackendError::NotFound)
            }
        }
    }

    pub async fn count(self) -> Result<u64, BackendError> {
        self.backend.count(&self.query).await
    }

    pub async fn update<P: Serialize, T: DeserializeOwned>(
        self,
        patch: &P,
    ) -> Result<Vec<T>, BackendError> {
        let patch = serde_json::to_value(patch)?;
        self.backend
            .update(&self.query, patch)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(BackendError::from))
            .collect()
    }

    pub async fn delete(self) -> Result<u64, BackendError> {
        self.backend.delete(&self.query).await
    }
}

pub async fn insert<R: Serialize, T: DeserializeOwned>(
    backend: &dyn RemoteService,
    table: &str,
    row: &R,
) -> Result<T, BackendError> {
    let row = serde_json::to_value(row)?;
    let stored = backend.insert(table, row).await?;
    Ok(serde_json::from_value(stored)?)
}
