//! # Template Cache
//!
//! Read-through cache over the three template repositories, keyed
//! independently by workflow-template, stage-template, and activity-template
//! id, plus a derived index from a workflow template to its ordered stage
//! template sequence.
//!
//! Every entry carries an expiration stamp (`now + TTL`, default five
//! minutes); expired entries are treated as misses and replaced on the next
//! fetch, never proactively evicted. One readers-writer lock protects all
//! maps: lookups take the shared lock only for the map probe, release it
//! before the repository await, and take the exclusive lock for the insert.
//! A thundering herd on a simultaneously-missing hot key may fetch
//! redundantly, which is acceptable — templates are small and idempotent.
//!
//! The cache is the engine's only long-lived mutable state and is explicitly
//! not a correctness source of truth; invalidation plus TTL give eventual
//! consistency with the authoring paths.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::models::{ActivityTemplate, StageTemplate, WorkflowTemplate};
use crate::repository::{
    ActivityTemplateRepository, StageTemplateRepository, WorkflowTemplateRepository,
};

/// Default entry lifetime.
pub const DEFAULT_TEMPLATE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Entry<T> {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Default)]
struct CacheMaps {
    workflows: HashMap<Uuid, Entry<WorkflowTemplate>>,
    stages: HashMap<Uuid, Entry<StageTemplate>>,
    activities: HashMap<Uuid, Entry<ActivityTemplate>>,
    /// Workflow template id → its stage templates, sorted by order_index.
    stage_lists: HashMap<Uuid, Entry<Vec<StageTemplate>>>,
}

/// Live/expired entry counts for one cache map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapStats {
    pub live: usize,
    pub expired: usize,
}

/// Observability snapshot across all cache maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub workflow_templates: MapStats,
    pub stage_templates: MapStats,
    pub activity_templates: MapStats,
    pub stage_lists: MapStats,
}

/// Outcome of an eager [`TemplateCache::preload`].
#[derive(Debug, Default)]
pub struct PreloadSummary {
    pub workflow_templates: usize,
    pub stage_templates: usize,
    pub activity_templates: usize,
    /// Per-template failures; preload continues past them.
    pub errors: Vec<(Uuid, EngineError)>,
}

/// Thread-safe read-through cache for workflow, stage, and activity
/// templates.
pub struct TemplateCache {
    workflow_templates: Arc<dyn WorkflowTemplateRepository>,
    stage_templates: Arc<dyn StageTemplateRepository>,
    activity_templates: Arc<dyn ActivityTemplateRepository>,
    ttl: Duration,
    maps: RwLock<CacheMaps>,
}

impl TemplateCache {
    pub fn new(
        workflow_templates: Arc<dyn WorkflowTemplateRepository>,
        stage_templates: Arc<dyn StageTemplateRepository>,
        activity_templates: Arc<dyn ActivityTemplateRepository>,
        ttl: Duration,
    ) -> Self {
        Self {
            workflow_templates,
            stage_templates,
            activity_templates,
            ttl,
            maps: RwLock::new(CacheMaps::default()),
        }
    }

    /// Fetch a workflow template, reading through to the repository on a
    /// miss or expired entry.
    pub async fn get_workflow_template(&self, id: Uuid) -> Result<WorkflowTemplate> {
        if let Some(entry) = self.read().workflows.get(&id).filter(|e| e.is_fresh()) {
            return Ok(entry.value.clone());
        }
        let template = self
            .workflow_templates
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("workflow template", id))?;
        debug!(template_id = %id, "workflow template cache miss");
        self.write()
            .workflows
            .insert(id, self.entry(template.clone()));
        Ok(template)
    }

    /// The complete stage template sequence of a workflow template, sorted
    /// by `order_index` ascending with unordered templates last. Populates
    /// the per-id stage map as a side effect.
    pub async fn get_stage_templates(&self, workflow_template_id: Uuid) -> Result<Vec<StageTemplate>> {
        if let Some(entry) = self
            .read()
            .stage_lists
            .get(&workflow_template_id)
            .filter(|e| e.is_fresh())
        {
            return Ok(entry.value.clone());
        }

        let mut templates = self
            .stage_templates
            .list_for_workflow_template(workflow_template_id)
            .await?;
        templates.sort_by_key(|t| (t.order_index.is_none(), t.order_index));

        let mut maps = self.write();
        for template in &templates {
            maps.stages
                .insert(template.id, self.entry(template.clone()));
        }
        maps.stage_lists
            .insert(workflow_template_id, self.entry(templates.clone()));
        Ok(templates)
    }

    pub async fn get_stage_template(&self, id: Uuid) -> Result<StageTemplate> {
        if let Some(entry) = self.read().stages.get(&id).filter(|e| e.is_fresh()) {
            return Ok(entry.value.clone());
        }
        let template = self
            .stage_templates
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("stage template", id))?;
        self.write().stages.insert(id, self.entry(template.clone()));
        Ok(template)
    }

    pub async fn get_activity_template(&self, id: Uuid) -> Result<ActivityTemplate> {
        if let Some(entry) = self.read().activities.get(&id).filter(|e| e.is_fresh()) {
            return Ok(entry.value.clone());
        }
        let template = self
            .activity_templates
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("activity template", id))?;
        self.write()
            .activities
            .insert(id, self.entry(template.clone()));
        Ok(template)
    }

    /// All activity templates under a stage template, unsorted. Each result
    /// is inserted into the per-id map for later id lookups.
    pub async fn get_activity_templates_for_stage(
        &self,
        stage_template_id: Uuid,
    ) -> Result<Vec<ActivityTemplate>> {
        let templates = self
            .activity_templates
            .list_for_stage_template(stage_template_id)
            .await?;
        let mut maps = self.write();
        for template in &templates {
            maps.activities
                .insert(template.id, self.entry(template.clone()));
        }
        Ok(templates)
    }

    /// Eagerly materialize all four layers for a known set of workflow
    /// templates, typically at startup. Failures are collected per template
    /// id; the loop continues past them.
    pub async fn preload(&self, workflow_template_ids: &[Uuid]) -> PreloadSummary {
        let mut summary = PreloadSummary::default();
        for &id in workflow_template_ids {
            match self.get_workflow_template(id).await {
                Ok(_) => summary.workflow_templates += 1,
                Err(e) => {
                    warn!(template_id = %id, error = %e, "preload: workflow template failed");
                    summary.errors.push((id, e));
                    continue;
                }
            }
            let stages = match self.get_stage_templates(id).await {
                Ok(stages) => stages,
                Err(e) => {
                    warn!(template_id = %id, error = %e, "preload: stage templates failed");
                    summary.errors.push((id, e));
                    continue;
                }
            };
            summary.stage_templates += stages.len();
            for stage in stages {
                match self.get_activity_templates_for_stage(stage.id).await {
                    Ok(activities) => summary.activity_templates += activities.len(),
                    Err(e) => {
                        warn!(stage_template_id = %stage.id, error = %e, "preload: activity templates failed");
                        summary.errors.push((stage.id, e));
                    }
                }
            }
        }
        summary
    }

    /// Drop a single id from every per-id map.
    pub fn invalidate(&self, id: Uuid) {
        let mut maps = self.write();
        maps.workflows.remove(&id);
        maps.stages.remove(&id);
        maps.activities.remove(&id);
    }

    /// Drop a workflow template and its derived stage list.
    pub fn invalidate_workflow_template(&self, id: Uuid) {
        let mut maps = self.write();
        maps.workflows.remove(&id);
        maps.stages.remove(&id);
        maps.activities.remove(&id);
        maps.stage_lists.remove(&id);
    }

    /// Clear everything.
    pub fn invalidate_all(&self) {
        let mut maps = self.write();
        maps.workflows.clear();
        maps.stages.clear();
        maps.activities.clear();
        maps.stage_lists.clear();
    }

    /// Live and expired counts per map.
    pub fn stats(&self) -> CacheStats {
        fn count<T>(map: &HashMap<Uuid, Entry<T>>) -> MapStats {
            let live = map.values().filter(|e| e.is_fresh()).count();
            MapStats {
                live,
                expired: map.len() - live,
            }
        }
        let maps = self.read();
        CacheStats {
            workflow_templates: count(&maps.workflows),
            stage_templates: count(&maps.stages),
            activity_templates: count(&maps.activities),
            stage_lists: count(&maps.stage_lists),
        }
    }

    fn entry<T>(&self, value: T) -> Entry<T> {
        Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        }
    }

    // A poisoned lock means a panic mid-insert; the maps are still
    // structurally sound, so recover the guard rather than propagate.
    fn read(&self) -> RwLockReadGuard<'_, CacheMaps> {
        self.maps.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheMaps> {
        self.maps.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use crate::testing::mocks::{
        InMemoryActivityTemplateRepository, InMemoryStageTemplateRepository,
        InMemoryWorkflowTemplateRepository,
    };

    fn cache_with(
        ttl: Duration,
    ) -> (
        Arc<InMemoryWorkflowTemplateRepository>,
        Arc<InMemoryStageTemplateRepository>,
        Arc<InMemoryActivityTemplateRepository>,
        TemplateCache,
    ) {
        let workflows = Arc::new(InMemoryWorkflowTemplateRepository::default());
        let stages = Arc::new(InMemoryStageTemplateRepository::default());
        let activities = Arc::new(InMemoryActivityTemplateRepository::default());
        let cache = TemplateCache::new(
            workflows.clone(),
            stages.clone(),
            activities.clone(),
            ttl,
        );
        (workflows, stages, activities, cache)
    }

    #[tokio::test]
    async fn read_through_fetches_once_within_ttl() {
        let (workflows, _, _, cache) = cache_with(DEFAULT_TEMPLATE_TTL);
        let template = fixtures::workflow_template("billing");
        workflows.insert(template.clone());

        cache.get_workflow_template(template.id).await.unwrap();
        cache.get_workflow_template(template.id).await.unwrap();
        cache.get_workflow_template(template.id).await.unwrap();
        assert_eq!(workflows.fetch_count(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_exactly_one_refetch() {
        let (workflows, _, _, cache) = cache_with(DEFAULT_TEMPLATE_TTL);
        let template = fixtures::workflow_template("billing");
        workflows.insert(template.clone());

        cache.get_workflow_template(template.id).await.unwrap();
        cache.invalidate(template.id);
        cache.get_workflow_template(template.id).await.unwrap();
        cache.get_workflow_template(template.id).await.unwrap();
        assert_eq!(workflows.fetch_count(), 2);
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let (workflows, _, _, cache) = cache_with(Duration::from_millis(10));
        let template = fixtures::workflow_template("billing");
        workflows.insert(template.clone());

        cache.get_workflow_template(template.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        cache.get_workflow_template(template.id).await.unwrap();
        assert_eq!(workflows.fetch_count(), 2);
    }

    #[tokio::test]
    async fn stale_reads_until_invalidated() {
        let (workflows, _, _, cache) = cache_with(DEFAULT_TEMPLATE_TTL);
        let mut template = fixtures::workflow_template("billing");
        workflows.insert(template.clone());

        let first = cache.get_workflow_template(template.id).await.unwrap();
        assert_eq!(first.name, "billing");

        // Mutate the backing store; the cache keeps serving the old value.
        template.name = "billing_v2".to_string();
        workflows.insert(template.clone());
        let stale = cache.get_workflow_template(template.id).await.unwrap();
        assert_eq!(stale.name, "billing");

        cache.invalidate(template.id);
        let fresh = cache.get_workflow_template(template.id).await.unwrap();
        assert_eq!(fresh.name, "billing_v2");
    }

    #[tokio::test]
    async fn missing_template_is_not_found_and_not_cached() {
        let (workflows, _, _, cache) = cache_with(DEFAULT_TEMPLATE_TTL);
        let id = Uuid::new_v4();
        let err = cache.get_workflow_template(id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
        // No negative caching: the next read hits the repository again.
        let _ = cache.get_workflow_template(id).await.unwrap_err();
        assert_eq!(workflows.fetch_count(), 2);
    }

    #[tokio::test]
    async fn stage_templates_sorted_with_unordered_last() {
        let (workflows, stages, _, cache) = cache_with(DEFAULT_TEMPLATE_TTL);
        let template = fixtures::workflow_template("onboarding");
        workflows.insert(template.clone());
        let mut unordered = fixtures::stage_template(&template, 99, "cleanup");
        unordered.order_index = None;
        stages.insert(fixtures::stage_template(&template, 2, "kyc"));
        stages.insert(unordered);
        stages.insert(fixtures::stage_template(&template, 1, "signup"));

        let sorted = cache.get_stage_templates(template.id).await.unwrap();
        let orders: Vec<Option<u32>> = sorted.iter().map(|s| s.order_index).collect();
        assert_eq!(orders, vec![Some(1), Some(2), None]);

        // The per-id stage map was populated along the way.
        let by_id = cache.get_stage_template(sorted[0].id).await.unwrap();
        assert_eq!(by_id.name, "signup");
        assert_eq!(stages.fetch_count(), 1);
    }

    #[tokio::test]
    async fn activity_list_populates_per_id_map() {
        let (workflows, stages, activities, cache) = cache_with(DEFAULT_TEMPLATE_TTL);
        let template = fixtures::workflow_template("onboarding");
        workflows.insert(template.clone());
        let stage = fixtures::stage_template(&template, 1, "signup");
        stages.insert(stage.clone());
        let activity = fixtures::activity_template(&stage, 0, "send_welcome", "email");
        activities.insert(activity.clone());

        let listed = cache
            .get_activity_templates_for_stage(stage.id)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let by_id = cache.get_activity_template(activity.id).await.unwrap();
        assert_eq!(by_id.name, "send_welcome");
        // One list call, zero additional per-id fetches.
        assert_eq!(activities.fetch_count(), 1);
    }

    #[tokio::test]
    async fn preload_aggregates_errors_and_continues() {
        let (workflows, stages, activities, cache) = cache_with(DEFAULT_TEMPLATE_TTL);
        let good = fixtures::workflow_template("good");
        workflows.insert(good.clone());
        let stage = fixtures::stage_template(&good, 1, "only");
        stages.insert(stage.clone());
        activities.insert(fixtures::activity_template(&stage, 0, "step", "echo"));
        let missing = Uuid::new_v4();

        let summary = cache.preload(&[missing, good.id]).await;
        assert_eq!(summary.workflow_templates, 1);
        assert_eq!(summary.stage_templates, 1);
        assert_eq!(summary.activity_templates, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].0, missing);
    }

    #[tokio::test]
    async fn stats_report_live_and_expired() {
        let (workflows, _, _, cache) = cache_with(Duration::from_millis(10));
        let template = fixtures::workflow_template("billing");
        workflows.insert(template.clone());
        cache.get_workflow_template(template.id).await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.workflow_templates.live, 1);
        tokio::time::sleep(Duration::from_millis(25)).await;
        let stats = cache.stats();
        assert_eq!(stats.workflow_templates.live, 0);
        assert_eq!(stats.workflow_templates.expired, 1);

        cache.invalidate_all();
        assert_eq!(cache.stats().workflow_templates, MapStats::default());
    }
}
