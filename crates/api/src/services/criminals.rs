//! Criminal record service.

use thiserror::Error;

use crime_track_core::CriminalId;

use crate::db::{CriminalStore, RepositoryError};
use crate::error::AppError;
use crate::models::{Criminal, CriminalSearch, CriminalUpdate};
use crate::services::images::{ImageHost, ImageHostError};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum CriminalError {
    #[error("Criminal not found!")]
    NotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    ImageHost(#[from] ImageHostError),
}

impl From<CriminalError> for AppError {
    fn from(err: CriminalError) -> Self {
        match err {
            CriminalError::NotFound => Self::NotFound(err.to_string()),
            CriminalError::Repository(RepositoryError::NotFound) => {
                Self::NotFound(CriminalError::NotFound.to_string())
            }
            CriminalError::Repository(e) => Self::Database(e),
            CriminalError::ImageHost(e) => Self::ImageHost(e),
        }
    }
}

/// Case record operations.
pub struct CriminalService<'a> {
    criminals: &'a dyn CriminalStore,
    images: &'a dyn ImageHost,
}

impl<'a> CriminalService<'a> {
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            criminals: state.criminals(),
            images: state.images(),
        }
    }

    /// List records, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `CriminalError::Repository` if the query fails.
    pub async fn list(
        &self,
        search: Option<&CriminalSearch>,
    ) -> Result<Vec<Criminal>, CriminalError> {
        Ok(self.criminals.list(search).await?)
    }

    /// Create a record with only a name.
    ///
    /// # Errors
    ///
    /// Returns `CriminalError::Repository` if the insert fails.
    pub async fn create(&self, name: &str) -> Result<Criminal, CriminalError> {
        let criminal = self.criminals.create(name).await?;
        tracing::info!(criminal_id = %criminal.id, "Criminal record created");
        Ok(criminal)
    }

    /// Fetch a record.
    ///
    /// # Errors
    ///
    /// Returns `CriminalError::NotFound` if no record has this id.
    pub async fn get(&self, id: CriminalId) -> Result<Criminal, CriminalError> {
        self.criminals
            .find_by_id(id)
            .await?
            .ok_or(CriminalError::NotFound)
    }

    /// Merge `update` into the stored record.
    ///
    /// # Errors
    ///
    /// Returns `CriminalError::NotFound` if no record has this id.
    pub async fn update(
        &self,
        id: CriminalId,
        update: CriminalUpdate,
    ) -> Result<Criminal, CriminalError> {
        let mut criminal = self.get(id).await?;
        update.apply_to(&mut criminal);
        Ok(self.criminals.save(&criminal).await?)
    }

    /// Delete a record and its hosted image.
    ///
    /// # Errors
    ///
    /// Returns `CriminalError::NotFound` if no record has this id, or
    /// `CriminalError::ImageHost` if the image could not be destroyed (the
    /// record is kept in that case).
    pub async fn delete(&self, id: CriminalId) -> Result<(), CriminalError> {
        let criminal = self.get(id).await?;

        if let Some(image_id) = criminal.image_id.as_deref() {
            self.images.destroy(image_id).await?;
        }

        if !self.criminals.delete(id).await? {
            return Err(CriminalError::NotFound);
        }

        tracing::info!(criminal_id = %id, "Criminal record deleted");
        Ok(())
    }

    /// Replace the record's image, destroying the previous asset first.
    ///
    /// # Errors
    ///
    /// Returns `CriminalError::NotFound` if no record has this id, or
    /// `CriminalError::ImageHost` if the destroy or upload fails.
    pub async fn replace_image(
        &self,
        id: CriminalId,
        source: &str,
    ) -> Result<Criminal, CriminalError> {
        let mut criminal = self.get(id).await?;

        if let Some(previous) = criminal.image_id.as_deref() {
            self.images.destroy(previous).await?;
        }

        let uploaded = self.images.upload(source).await?;
        criminal.image = Some(uploaded.url);
        criminal.image_id = Some(uploaded.public_id);

        Ok(self.criminals.save(&criminal).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;

    #[tokio::test]
    async fn test_delete_removes_hosted_image() {
        let (state, deps) = test_state();
        let service = CriminalService::new(&state);

        let created = service.create("Ned Kelly").await.unwrap();
        let with_image = service
            .replace_image(created.id, "https://example.org/mugshot.jpg")
            .await
            .unwrap();
        let image_id = with_image.image_id.clone().unwrap();

        service.delete(created.id).await.unwrap();

        assert_eq!(*deps.images.destroyed.lock().unwrap(), vec![image_id]);
        assert!(matches!(
            service.get(created.id).await,
            Err(CriminalError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_without_image_skips_host() {
        let (state, deps) = test_state();
        let service = CriminalService::new(&state);

        let created = service.create("John Dillinger").await.unwrap();
        service.delete(created.id).await.unwrap();

        assert!(deps.images.destroyed.lock().unwrap().is_empty());
        assert!(matches!(
            service.delete(created.id).await,
            Err(CriminalError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_orders_by_most_recent_update() {
        let (state, _) = test_state();
        let service = CriminalService::new(&state);

        let first = service.create("First").await.unwrap();
        let second = service.create("Second").await.unwrap();
        service
            .update(
                first.id,
                CriminalUpdate {
                    status: Some("Released".to_string()),
                    ..CriminalUpdate::default()
                },
            )
            .await
            .unwrap();

        let names: Vec<String> = service
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["First", "Second"]);
        assert_ne!(first.id, second.id);
    }
}
