//! Resource registration and the shared rule table.
//!
//! [`Mocks`] collects registrations while a server is being set up and hands
//! out mutable rules so hooks can be attached. Once serving starts it is
//! frozen into a [`Registry`], where each rule sits behind its own lock so a
//! request runs its operation to completion before the next one touches the
//! same rule.

use crate::path::{PathError, PathMatch, PathPattern};
use mockrest_engine::{ResourceRule, RuleOptions};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Registration-time misuse. These abort setup rather than fail requests.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Engine(#[from] mockrest_engine::Error),
}

/// A rule bound to its path template.
#[derive(Debug)]
pub struct Resource {
    pattern: PathPattern,
    rule: ResourceRule,
}

impl Resource {
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn rule(&self) -> &ResourceRule {
        &self.rule
    }
}

/// Builder for the set of mocked resources.
#[derive(Debug, Default)]
pub struct Mocks {
    resources: Vec<Resource>,
}

impl Mocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection at a path and return its rule for customization.
    ///
    /// The path may declare named parameters (`/users/:userId/posts`) but not
    /// `:id`, which is appended automatically.
    pub fn add_resource(
        &mut self,
        path: &str,
        collection: Vec<Value>,
        options: RuleOptions,
    ) -> Result<&mut ResourceRule, RegistrationError> {
        let pattern = PathPattern::compile(path)?;
        let rule = ResourceRule::new(collection, options);
        Ok(self.push(pattern, rule))
    }

    /// Like [`Mocks::add_resource`], for a collection that has not been
    /// checked to be an array yet.
    pub fn add_resource_value(
        &mut self,
        path: &str,
        collection: Value,
        options: RuleOptions,
    ) -> Result<&mut ResourceRule, RegistrationError> {
        let pattern = PathPattern::compile(path)?;
        let rule = ResourceRule::from_value(collection, options)?;
        Ok(self.push(pattern, rule))
    }

    fn push(&mut self, pattern: PathPattern, rule: ResourceRule) -> &mut ResourceRule {
        let rule = rule.with_path_params(pattern.param_names());
        tracing::info!(path = %pattern.template(), "Added rule");
        tracing::debug!(?rule);

        self.resources.push(Resource { pattern, rule });
        let index = self.resources.len() - 1;
        &mut self.resources[index].rule
    }

    /// Registered resources, in registration order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Freeze the registrations for serving.
    pub fn into_registry(self) -> Registry {
        let entries = self
            .resources
            .into_iter()
            .map(|resource| Entry {
                pattern: resource.pattern,
                rule: Mutex::new(resource.rule),
            })
            .collect();
        Registry { entries }
    }
}

/// A served rule.
#[derive(Debug)]
pub struct Entry {
    pattern: PathPattern,
    rule: Mutex<ResourceRule>,
}

impl Entry {
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Exclusive access to the rule.
    ///
    /// A panic inside a user hook poisons the lock; the rule state is still
    /// usable, so the guard is recovered rather than propagated.
    pub fn lock(&self) -> MutexGuard<'_, ResourceRule> {
        self.rule.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The frozen rule table shared by request handlers.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    /// First entry, in registration order, whose pattern matches the path.
    pub fn find(&self, path: &str) -> Option<(&Entry, PathMatch)> {
        self.entries
            .iter()
            .find_map(|entry| entry.pattern.matches(path).map(|matched| (entry, matched)))
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reset every rule to its registered collection.
    pub fn reset_all(&self) {
        tracing::info!(rules = self.entries.len(), "Resetting rules");
        for entry in &self.entries {
            entry.lock().reset();
        }
    }
}
