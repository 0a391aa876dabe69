//! Descriptor-keyed binding registry
//!
//! All bindings live behind one async `RwLock`:
//!
//! ```text
//! HashMap<GestureDescriptor, Vec<ShortcutBinding>>   (dispatch lookup)
//! HashMap<BindingId, GestureDescriptor>              (edit/remove lookup)
//! ```
//!
//! Every mutation and every fan-out takes the write lock exactly once, so
//! readers never observe a half-applied change and a binding never sees two
//! gestures at the same time.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::binding::{BindingConfig, BindingId, ShortcutBinding, TriggeredAction};
use super::RegistryError;
use crate::gesture::{Gesture, GestureDescriptor};
use crate::shortcut::ShortcutSettings;

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    by_descriptor: HashMap<GestureDescriptor, Vec<ShortcutBinding>>,
    index: HashMap<BindingId, GestureDescriptor>,
}

impl RegistryInner {
    fn binding_mut(&mut self, id: BindingId) -> Result<&mut ShortcutBinding, RegistryError> {
        let descriptor = self.index.get(&id).ok_or(RegistryError::UnknownBinding(id))?;
        self.by_descriptor
            .get_mut(descriptor)
            .and_then(|bindings| bindings.iter_mut().find(|b| b.id() == id))
            .ok_or(RegistryError::UnknownBinding(id))
    }
}

/// Shared handle to the binding set. Clones refer to the same registry.
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, config: BindingConfig) -> Result<BindingId, RegistryError> {
        check_compatible(&config.descriptor, &config.shortcut)?;

        let mut inner = self.inner.write().await;
        let id = BindingId(inner.next_id);
        let binding = ShortcutBinding::new(id, &config)?;
        inner.next_id += 1;

        inner.index.insert(id, config.descriptor.clone());
        inner
            .by_descriptor
            .entry(config.descriptor.clone())
            .or_default()
            .push(binding);

        info!(
            "Added {} binding {} on {} -> '{}'",
            config.shortcut.kind(),
            id,
            config.descriptor,
            config.action
        );
        Ok(id)
    }

    /// Removes a binding, returning its last configuration.
    pub async fn remove(&self, id: BindingId) -> Option<BindingConfig> {
        let mut inner = self.inner.write().await;
        let descriptor = inner.index.remove(&id)?;

        let bindings = inner.by_descriptor.get_mut(&descriptor)?;
        let position = bindings.iter().position(|b| b.id() == id)?;
        let removed = bindings.remove(position);
        if bindings.is_empty() {
            inner.by_descriptor.remove(&descriptor);
        }

        info!("Removed binding {} from {}", id, descriptor);
        Some(removed.config())
    }

    /// Replaces the shortcut parameters of a binding and resets its state.
    pub async fn update(
        &self,
        id: BindingId,
        settings: ShortcutSettings,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        let binding = inner.binding_mut(id)?;
        check_compatible(binding.descriptor(), &settings)?;
        binding.update(settings)?;
        debug!("Updated binding {} to {:?}", id, settings);
        Ok(())
    }

    pub async fn set_enabled(&self, id: BindingId, enabled: bool) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        inner.binding_mut(id)?.set_enabled(enabled);
        debug!("Binding {} enabled: {}", id, enabled);
        Ok(())
    }

    pub async fn get(&self, id: BindingId) -> Option<BindingConfig> {
        let inner = self.inner.read().await;
        let descriptor = inner.index.get(&id)?;
        inner
            .by_descriptor
            .get(descriptor)?
            .iter()
            .find(|b| b.id() == id)
            .map(ShortcutBinding::config)
    }

    /// Snapshot of all bindings, ordered by id.
    pub async fn bindings(&self) -> Vec<(BindingId, BindingConfig)> {
        let inner = self.inner.read().await;
        let mut all: Vec<(BindingId, BindingConfig)> = inner
            .by_descriptor
            .values()
            .flatten()
            .map(|b| (b.id(), b.config()))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.index.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.by_descriptor.clear();
        inner.index.clear();
        info!("Cleared all bindings");
    }

    /// Runs `gesture` through every enabled binding on its descriptor.
    ///
    /// A binding that fails or panics is logged and skipped; the remaining
    /// bindings still see the gesture.
    pub async fn dispatch(&self, gesture: &Gesture, now: Instant) -> Vec<TriggeredAction> {
        let mut inner = self.inner.write().await;
        let Some(bindings) = inner.by_descriptor.get_mut(gesture.descriptor()) else {
            return Vec::new();
        };

        let mut actions = Vec::new();
        for binding in bindings.iter_mut().filter(|b| b.is_enabled()) {
            let result = panic::catch_unwind(AssertUnwindSafe(|| binding.evaluate(gesture, now)));
            match result {
                Ok(Ok(Some(action))) => {
                    debug!("Binding {} triggered '{}'", binding.id(), action.action);
                    actions.push(action);
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => warn!("Binding {} failed to evaluate gesture: {}", binding.id(), e),
                Err(_) => {
                    error!(
                        "Binding {} panicked while evaluating gesture, resetting its state",
                        binding.id()
                    );
                    binding.reset();
                }
            }
        }

        actions
    }
}

#[cfg(test)]
impl BindingRegistry {
    async fn panic_on_next_gesture(&self, id: BindingId) -> Result<(), RegistryError> {
        self.inner.write().await.binding_mut(id)?.panic_on_next_gesture();
        Ok(())
    }
}

fn check_compatible(
    descriptor: &GestureDescriptor,
    settings: &ShortcutSettings,
) -> Result<(), RegistryError> {
    if settings.accepts(descriptor) {
        Ok(())
    } else {
        Err(RegistryError::IncompatibleDescriptor {
            shortcut: settings.kind(),
            descriptor: descriptor.clone(),
        })
    }
}
