use async_trait::async_trait;
use scaler_app::AppBlueprint;
use scaler_core::Result;
use std::path::PathBuf;

/// Key/value-by-binding-id contract for blueprint persistence. The key
/// space is `binding.id`; callers are responsible for validating
/// blueprints before `save`.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<AppBlueprint>>;
    async fn save(&self, blueprint: &AppBlueprint) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// One JSON file per binding id under `root_dir`. Simplest durable
/// implementation of the store contract; swapping in a database-backed
/// store only requires a new `PersistentStore` impl.
pub struct JsonFileStore {
    root_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.root_dir.join(format!("{}.json", id))
    }
}

#[async_trait]
impl PersistentStore for JsonFileStore {
    async fn find_all(&self) -> Result<Vec<AppBlueprint>> {
        tokio::fs::create_dir_all(&self.root_dir).await?;

        let mut blueprints = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<AppBlueprint>(&content) {
                Ok(blueprint) => blueprints.push(blueprint),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unparseable blueprint file");
                }
            }
        }
        Ok(blueprints)
    }

    async fn save(&self, blueprint: &AppBlueprint) -> Result<()> {
        tokio::fs::create_dir_all(&self.root_dir).await?;
        let content = serde_json::to_string_pretty(blueprint)?;
        tokio::fs::write(self.path_for(&blueprint.binding.id), content).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
