//! Ordered, togglable set of translation providers.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::traits::TranslationProvider;

/// Public view of a registered provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderDescriptor {
    pub name: String,
    pub enabled: bool,
    /// Lower numbers are tried first
    pub priority: i32,
}

struct RegisteredProvider {
    descriptor: ProviderDescriptor,
    provider: Arc<dyn TranslationProvider>,
}

/// Providers kept in registration order.
///
/// Dispatch order is derived on demand with a stable sort on priority, so
/// providers sharing a priority keep their registration order.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<RegisteredProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. A provider registered under an existing name
    /// replaces it in place.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        priority: i32,
        provider: Arc<dyn TranslationProvider>,
    ) {
        let descriptor = ProviderDescriptor {
            name: name.into(),
            enabled: provider.is_available(),
            priority,
        };

        info!(
            "Registered provider '{}' ({}, priority {}{})",
            descriptor.name,
            provider.info().kind,
            priority,
            if descriptor.enabled { "" } else { ", unavailable" }
        );

        let entry = RegisteredProvider { descriptor, provider };
        match self
            .providers
            .iter_mut()
            .find(|p| p.descriptor.name == entry.descriptor.name)
        {
            Some(existing) => *existing = entry,
            None => self.providers.push(entry),
        }
    }

    /// Enable or disable a provider by name. Returns `false` if unknown.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.providers.iter_mut().find(|p| p.descriptor.name == name) {
            Some(entry) => {
                entry.descriptor.enabled = enabled;
                info!(
                    "Provider '{}' {}",
                    name,
                    if enabled { "enabled" } else { "disabled" }
                );
                true
            }
            None => false,
        }
    }

    /// Enabled providers in dispatch order
    pub fn active(&self) -> Vec<(String, Arc<dyn TranslationProvider>)> {
        let mut active: Vec<_> = self
            .providers
            .iter()
            .filter(|p| p.descriptor.enabled)
            .collect();
        active.sort_by_key(|p| p.descriptor.priority);
        active
            .into_iter()
            .map(|p| (p.descriptor.name.clone(), Arc::clone(&p.provider)))
            .collect()
    }

    /// Every registered provider, enabled or not
    pub fn all(&self) -> Vec<(String, Arc<dyn TranslationProvider>)> {
        self.providers
            .iter()
            .map(|p| (p.descriptor.name.clone(), Arc::clone(&p.provider)))
            .collect()
    }

    /// Descriptors in dispatch order (disabled ones included)
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        let mut descriptors: Vec<_> = self.providers.iter().map(|p| p.descriptor.clone()).collect();
        descriptors.sort_by_key(|d| d.priority);
        descriptors
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
