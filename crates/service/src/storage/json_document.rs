use std::{
    marker::PhantomData,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;

use crate::errors::ServiceError;

/// Generic JSON file-backed document.
///
/// The whole value is read and written at once. Writes go to a temporary
/// sibling first and are renamed into place, so readers never see a torn file.
#[derive(Clone, Debug)]
pub struct JsonDocument<T> {
    file_path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { file_path: path.into(), _marker: PhantomData }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Read and decode the document. `Ok(None)` when the file does not exist.
    pub async fn read(&self) -> Result<Option<T>, ServiceError> {
        let bytes = match fs::read(&self.file_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ServiceError::storage(e)),
        };
        let value = serde_json::from_slice(&bytes).map_err(ServiceError::storage)?;
        Ok(Some(value))
    }

    /// Encode `value` pretty-printed and replace the file.
    pub async fn write(&self, value: &T) -> Result<(), ServiceError> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(ServiceError::storage)?;
            }
        }
        let data = serde_json::to_vec_pretty(value).map_err(ServiceError::storage)?;

        let mut tmp = self.file_path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", uuid::Uuid::new_v4()));
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, data).await.map_err(ServiceError::storage)?;
        if let Err(e) = fs::rename(&tmp, &self.file_path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(ServiceError::storage(e));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn json_document_persists_and_reloads() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir()
            .join(format!("json_document_{}", uuid::Uuid::new_v4()))
            .join("nested")
            .join("doc.json");
        let doc = JsonDocument::<HashMap<String, String>>::new(&tmp);

        // missing file reads as None
        assert!(doc.read().await?.is_none());

        let mut map = HashMap::new();
        map.insert("a".to_string(), "1".to_string());
        doc.write(&map).await?;

        let reloaded = JsonDocument::<HashMap<String, String>>::new(&tmp);
        assert_eq!(reloaded.read().await?, Some(map));

        let _ = tokio::fs::remove_dir_all(tmp.parent().unwrap().parent().unwrap()).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_document_is_a_storage_error() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("json_document_{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, b"{not json").await?;

        let doc = JsonDocument::<HashMap<String, String>>::new(&tmp);
        assert!(matches!(doc.read().await, Err(ServiceError::Storage(_))));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
