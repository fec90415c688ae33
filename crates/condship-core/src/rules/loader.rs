use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{Catalog, IdentityCatalog};
use crate::config::EngineConfig;
use crate::package::Package;

use super::evaluator::{Evaluator, RulesetOutcome};
use super::types::{Action, Ruleset, RulesetError, RulesetRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ruleset not found: {0}")]
    NotFound(String),
    #[error("ruleset storage unavailable: {0}")]
    Unavailable(String),
}

/// Where rulesets come from. Implementations return enabled rulesets in
/// admin priority order.
#[async_trait]
pub trait RulesetSource: Send + Sync {
    async fn load_enabled_rulesets(&self) -> Result<Vec<RulesetRecord>, StoreError>;

    async fn load_ruleset(&self, id: &str) -> Result<RulesetRecord, StoreError>;
}

/// Process-local ruleset store, ordered by `priority` then insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRulesetStore {
    records: Arc<RwLock<Vec<RulesetRecord>>>,
}

impl InMemoryRulesetStore {
    pub fn new(records: Vec<RulesetRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Insert or replace a ruleset, filling in missing guids.
    pub async fn save(&self, mut record: RulesetRecord) -> RulesetRecord {
        record.assign_missing_guids();
        let mut records = self.records.write().await;
        match records.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        record
    }

    pub async fn duplicate(&self, id: &str) -> Result<RulesetRecord, StoreError> {
        let mut records = self.records.write().await;
        let original = records
            .iter()
            .find(|record| record.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let copy = original.duplicate(Uuid::new_v4().to_string());
        records.push(copy.clone());
        Ok(copy)
    }

    /// Flip a ruleset's enabled flag and return the new state.
    pub async fn toggle_enabled(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.enabled = !record.enabled;
        Ok(record.enabled)
    }

    pub async fn all(&self) -> Vec<RulesetRecord> {
        let mut records = self.records.read().await.clone();
        records.sort_by_key(|record| record.priority);
        records
    }
}

#[async_trait]
impl RulesetSource for InMemoryRulesetStore {
    async fn load_enabled_rulesets(&self) -> Result<Vec<RulesetRecord>, StoreError> {
        let mut records: Vec<RulesetRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|record| record.enabled)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.priority);
        Ok(records)
    }

    async fn load_ruleset(&self, id: &str) -> Result<RulesetRecord, StoreError> {
        self.records
            .read()
            .await
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl<S: RulesetSource + ?Sized> RulesetSource for Arc<S> {
    async fn load_enabled_rulesets(&self) -> Result<Vec<RulesetRecord>, StoreError> {
        (**self).load_enabled_rulesets().await
    }

    async fn load_ruleset(&self, id: &str) -> Result<RulesetRecord, StoreError> {
        (**self).load_ruleset(id).await
    }
}

#[derive(Debug, Error)]
pub enum RulesetLoaderError {
    #[error("failed to load rulesets: {0}")]
    Store(#[from] StoreError),
    #[error("invalid ruleset: {0}")]
    Ruleset(#[from] RulesetError),
}

#[derive(Clone)]
pub struct RulesetLoader<S> {
    source: S,
}

impl<S: RulesetSource> RulesetLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Enabled, valid rulesets in priority order. Rulesets that fail
    /// validation are logged and left out so the others still apply.
    pub async fn load_enabled(&self) -> Result<Vec<Ruleset>, RulesetLoaderError> {
        let records = self.source.load_enabled_rulesets().await?;
        let mut rulesets = Vec::with_capacity(records.len());

        for record in records.iter().filter(|record| record.enabled) {
            match Ruleset::from_record(record) {
                Ok(ruleset) => rulesets.push(ruleset),
                Err(err) => warn!(ruleset_id = %record.id, error = %err, "skipping invalid ruleset"),
            }
        }

        Ok(rulesets)
    }

    pub async fn load(&self, id: &str) -> Result<Ruleset, RulesetLoaderError> {
        let record = self.source.load_ruleset(id).await?;
        Ok(Ruleset::from_record(&record)?)
    }
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("ruleset loading failed: {0}")]
    Loader(#[from] RulesetLoaderError),
}

/// Loads the enabled rulesets and collects the actions of those that match.
#[derive(Clone)]
pub struct RuleExecutor<S, C = IdentityCatalog> {
    loader: RulesetLoader<S>,
    evaluator: Evaluator<C>,
    settings: EngineConfig,
}

impl<S: RulesetSource> RuleExecutor<S, IdentityCatalog> {
    pub fn new(source: S, settings: EngineConfig) -> Self {
        Self::with_catalog(source, IdentityCatalog, settings)
    }
}

impl<S: RulesetSource, C: Catalog> RuleExecutor<S, C> {
    pub fn with_catalog(source: S, catalog: C, settings: EngineConfig) -> Self {
        Self {
            loader: RulesetLoader::new(source),
            evaluator: Evaluator::new(catalog),
            settings,
        }
    }

    pub async fn matched_actions(&self, package: &Package) -> Result<Vec<Action>, ExecutorError> {
        if self.settings.disable_all {
            debug!("all rulesets disabled by configuration");
            return Ok(Vec::new());
        }

        let rulesets = self.loader.load_enabled().await?;
        let mut actions = Vec::new();

        for ruleset in &rulesets {
            let outcome = self.evaluator.evaluate_with_trace(ruleset, package);
            self.log_outcome(&outcome);
            if outcome.matched {
                actions.extend(ruleset.actions.iter().cloned());
            }
        }

        Ok(actions)
    }

    /// Evaluate one stored ruleset by id, whether or not it is enabled.
    pub async fn evaluate_ruleset(
        &self,
        id: &str,
        package: &Package,
    ) -> Result<RulesetOutcome, ExecutorError> {
        let ruleset = self.loader.load(id).await?;
        let outcome = self.evaluator.evaluate_with_trace(&ruleset, package);
        self.log_outcome(&outcome);
        Ok(outcome)
    }

    fn log_outcome(&self, outcome: &RulesetOutcome) {
        let conditions = serde_json::to_string(&outcome.conditions).unwrap_or_default();
        if self.settings.debug_mode {
            info!(
                ruleset_id = %outcome.ruleset_id,
                matched = outcome.matched,
                conditions = %conditions,
                "ruleset evaluated"
            );
        } else {
            debug!(
                ruleset_id = %outcome.ruleset_id,
                matched = outcome.matched,
                conditions = %conditions,
                "ruleset evaluated"
            );
        }
    }
}
