use scaler_app::{AppBlueprint, ScalableApp};
use scaler_bus::{publish_json, topics, MessageBus};
use scaler_core::{Binding, BindingAction, BindingEvent, Result};
use scaler_store::PersistentStore;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Registry mapping binding id -> ScalableApp, coordinating creation and
/// removal with the persistent store and the bus. The app list itself is
/// guarded by a reader-writer lock so that iteration during add/remove is
/// safe; each app's own state is guarded independently by its own mutex
/// (see `ScalableApp::acquire`).
pub struct ScalableAppManager {
    apps: RwLock<Vec<Arc<ScalableApp>>>,
    store: Arc<dyn PersistentStore>,
    bus: Arc<dyn MessageBus>,
    max_metric_list_size: usize,
}

impl ScalableAppManager {
    pub fn new(
        store: Arc<dyn PersistentStore>,
        bus: Arc<dyn MessageBus>,
        max_metric_list_size: usize,
    ) -> Self {
        Self {
            apps: RwLock::new(Vec::new()),
            store,
            bus,
            max_metric_list_size,
        }
    }

    /// Succeeds iff no existing entry shares `app.id()`. On success,
    /// persists and publishes a CREATING event unless `loaded_from_store`,
    /// in which case it publishes LOADING and skips the store write (the
    /// blueprint already came from there).
    pub async fn add(&self, app: Arc<ScalableApp>, loaded_from_store: bool) -> Result<bool> {
        {
            let mut apps = self.apps.write().await;
            if apps.iter().any(|existing| existing.id() == app.id()) {
                return Ok(false);
            }
            apps.push(app.clone());
        }

        let binding = app.acquire().await.binding.clone();
        let resource_id = binding.resource_id.clone();

        if loaded_from_store {
            scaler_core::log_binding_loaded(&binding.id, &resource_id);
        } else {
            self.store.save(&blueprint_of(&app).await).await?;
            scaler_core::log_binding_created(&binding.id, &resource_id);
        }

        let event = BindingEvent {
            binding_id: binding.id.clone(),
            resource_id,
            action: if loaded_from_store {
                BindingAction::Loading
            } else {
                BindingAction::Creating
            },
            timestamp: binding.creation_time,
        };
        publish_json(self.bus.as_ref(), topics::BINDING_EVENTS, &event).await?;

        Ok(true)
    }

    /// Succeeds iff an entry with `id` is present. Removes in-memory,
    /// deletes from the store, and publishes a DELETING event.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let removed = {
            let mut apps = self.apps.write().await;
            let position = apps.iter().position(|app| app.id() == id);
            match position {
                Some(index) => Some(apps.remove(index)),
                None => None,
            }
        };

        let Some(app) = removed else {
            return Ok(false);
        };

        self.store.delete(id).await?;

        let resource_id = app.resource_id().to_string();
        let event = BindingEvent {
            binding_id: id.to_string(),
            resource_id: resource_id.clone(),
            action: BindingAction::Deleting,
            timestamp: scaler_core::now_unix(),
        };
        publish_json(self.bus.as_ref(), topics::BINDING_EVENTS, &event).await?;
        scaler_core::log_binding_removed(id, &resource_id);

        Ok(true)
    }

    pub async fn get(&self, id: &str) -> Option<Arc<ScalableApp>> {
        self.apps
            .read()
            .await
            .iter()
            .find(|app| app.id() == id)
            .cloned()
    }

    pub async fn get_by_resource_id(&self, resource_id: &str) -> Option<Arc<ScalableApp>> {
        self.apps
            .read()
            .await
            .iter()
            .find(|app| app.resource_id() == resource_id)
            .cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.get(id).await.is_some()
    }

    pub async fn contains_resource_id(&self, resource_id: &str) -> bool {
        self.get_by_resource_id(resource_id).await.is_some()
    }

    /// Snapshot of the app list, not of per-app state. Callers must
    /// acquire each app before inspecting it.
    pub async fn get_flat_copy_of_apps(&self) -> Vec<Arc<ScalableApp>> {
        self.apps.read().await.clone()
    }

    pub async fn get_list_of_bindings(&self) -> Vec<Binding> {
        let apps = self.get_flat_copy_of_apps().await;
        let mut bindings = Vec::with_capacity(apps.len());
        for app in apps {
            let guard = app.acquire().await;
            bindings.push(guard.binding.clone());
        }
        bindings
    }

    pub async fn get_list_of_identifier_strings(&self) -> Vec<String> {
        self.get_flat_copy_of_apps()
            .await
            .iter()
            .map(|app| app.id().to_string())
            .collect()
    }

    /// Persists the app's current blueprint, overwriting whatever was
    /// stored before.
    pub async fn update_in_store(&self, app: &Arc<ScalableApp>) -> Result<()> {
        self.store.save(&blueprint_of(app).await).await
    }

    /// Reads all blueprints from the store, validates each, and adds the
    /// ones that pass. An invalid blueprint is logged and skipped; it
    /// never aborts startup.
    pub async fn load_from_store(&self) -> Result<()> {
        for blueprint in self.store.find_all().await? {
            if let Err(e) = blueprint.validate() {
                scaler_core::log_blueprint_rejected(&blueprint.binding.id, &e.to_string());
                continue;
            }
            match blueprint.build(self.max_metric_list_size) {
                Ok(app) => {
                    self.add(Arc::new(app), true).await?;
                }
                Err(e) => {
                    scaler_core::log_blueprint_rejected(&blueprint.binding.id, &e.to_string());
                }
            }
        }
        Ok(())
    }
}

async fn blueprint_of(app: &Arc<ScalableApp>) -> AppBlueprint {
    let guard = app.acquire().await;
    AppBlueprint::from_app_state(&guard)
}
