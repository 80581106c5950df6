//! Run Store: persists `Run`, `Keyword`, `Cluster`, and `RoadmapItem` state
//! across the lifetime of a pipeline execution and makes progress snapshots
//! visible to pollers. The trait is the seam; the durable backend (Postgres,
//! sqlite, whatever) is an out-of-scope deployment choice, matching the
//! "database persistence choice" non-goal — `InMemoryRunStore` is the
//! reference implementation and is sufficient for a single-process service.

use async_trait::async_trait;
use dashmap::DashMap;
use kwr_core::ids::{ClusterId, RunId};
use kwr_core::models::{Cluster, Keyword, RoadmapItem, Run};
use kwr_core::Result;
use std::sync::Arc;

/// Persistence seam for one run's full lifecycle: creation, stage updates,
/// keyword/cluster/roadmap accumulation, and progress snapshots for pollers.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn create_run(&self, run: Run) -> Result<()>;

    async fn get_run(&self, id: RunId) -> Result<Run>;

    /// Replaces the stored Run wholesale; callers read-modify-write via
    /// `get_run` + mutate + `update_run`.
    async fn update_run(&self, run: Run) -> Result<()>;

    async fn append_keywords(&self, run_id: RunId, keywords: Vec<Keyword>) -> Result<()>;

    /// Replaces the stored keyword list wholesale, mirroring `update_run`'s
    /// read-modify-write contract. Used by stages that enrich already
    /// persisted keywords in place (attaching `cluster_id`, `blended_score`,
    /// `quick_win`) rather than appending new ones.
    async fn replace_keywords(&self, run_id: RunId, keywords: Vec<Keyword>) -> Result<()>;

    async fn list_keywords(&self, run_id: RunId) -> Result<Vec<Keyword>>;

    async fn set_cluster(&self, run_id: RunId, cluster: Cluster) -> Result<()>;

    async fn list_clusters(&self, run_id: RunId) -> Result<Vec<Cluster>>;

    async fn append_roadmap_item(&self, run_id: RunId, item: RoadmapItem) -> Result<()>;

    async fn list_roadmap_items(&self, run_id: RunId) -> Result<Vec<RoadmapItem>>;

    /// Latest aggregated progress percentage recorded for the run, if any
    /// has been published yet.
    async fn record_progress(&self, run_id: RunId, progress_pct: u8) -> Result<()>;

    async fn get_progress(&self, run_id: RunId) -> Result<Option<u8>>;

    async fn list_runs(&self, owner_id: Option<&str>) -> Result<Vec<Run>>;
}

#[derive(Debug)]
struct RunRecord {
    run: Run,
    keywords: Vec<Keyword>,
    clusters: DashMap<ClusterId, Cluster>,
    roadmap_items: Vec<RoadmapItem>,
    progress_pct: Option<u8>,
}

impl RunRecord {
    fn new(run: Run) -> Self {
        Self {
            run,
            keywords: Vec::new(),
            clusters: DashMap::new(),
            roadmap_items: Vec::new(),
            progress_pct: None,
        }
    }
}

/// In-process, lock-free-reads Run Store backed by `DashMap`. Suitable for a
/// single replica of `kwr-service`; a multi-replica deployment needs a
/// durable backend behind the same trait.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRunStore {
    runs: Arc<DashMap<RunId, RunRecord>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn create_run(&self, run: Run) -> Result<()> {
        let id = run.id;
        self.runs.insert(id, RunRecord::new(run));
        Ok(())
    }

    async fn get_run(&self, id: RunId) -> Result<Run> {
        self.runs
            .get(&id)
            .map(|entry| entry.run.clone())
            .ok_or_else(|| kwr_core::KwrError::not_found(format!("run {id}")))
    }

    async fn update_run(&self, run: Run) -> Result<()> {
        let mut entry = self
            .runs
            .get_mut(&run.id)
            .ok_or_else(|| kwr_core::KwrError::not_found(format!("run {}", run.id)))?;
        entry.run = run;
        Ok(())
    }

    async fn append_keywords(&self, run_id: RunId, keywords: Vec<Keyword>) -> Result<()> {
        let mut entry = self
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| kwr_core::KwrError::not_found(format!("run {run_id}")))?;
        entry.keywords.extend(keywords);
        Ok(())
    }

    async fn replace_keywords(&self, run_id: RunId, keywords: Vec<Keyword>) -> Result<()> {
        let mut entry = self
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| kwr_core::KwrError::not_found(format!("run {run_id}")))?;
        entry.keywords = keywords;
        Ok(())
    }

    async fn list_keywords(&self, run_id: RunId) -> Result<Vec<Keyword>> {
        self.runs
            .get(&run_id)
            .map(|entry| entry.keywords.clone())
            .ok_or_else(|| kwr_core::KwrError::not_found(format!("run {run_id}")))
    }

    async fn set_cluster(&self, run_id: RunId, cluster: Cluster) -> Result<()> {
        let entry = self
            .runs
            .get(&run_id)
            .ok_or_else(|| kwr_core::KwrError::not_found(format!("run {run_id}")))?;
        entry.clusters.insert(cluster.id, cluster);
        Ok(())
    }

    async fn list_clusters(&self, run_id: RunId) -> Result<Vec<Cluster>> {
        self.runs
            .get(&run_id)
            .map(|entry| entry.clusters.iter().map(|c| c.value().clone()).collect())
            .ok_or_else(|| kwr_core::KwrError::not_found(format!("run {run_id}")))
    }

    async fn append_roadmap_item(&self, run_id: RunId, item: RoadmapItem) -> Result<()> {
        let mut entry = self
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| kwr_core::KwrError::not_found(format!("run {run_id}")))?;
        entry.roadmap_items.push(item);
        Ok(())
    }

    async fn list_roadmap_items(&self, run_id: RunId) -> Result<Vec<RoadmapItem>> {
        self.runs
            .get(&run_id)
            .map(|entry| entry.roadmap_items.clone())
            .ok_or_else(|| kwr_core::KwrError::not_found(format!("run {run_id}")))
    }

    async fn record_progress(&self, run_id: RunId, progress_pct: u8) -> Result<()> {
        let mut entry = self
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| kwr_core::KwrError::not_found(format!("run {run_id}")))?;
        entry.progress_pct = Some(progress_pct);
        Ok(())
    }

    async fn get_progress(&self, run_id: RunId) -> Result<Option<u8>> {
        self.runs
            .get(&run_id)
            .map(|entry| entry.progress_pct)
            .ok_or_else(|| kwr_core::KwrError::not_found(format!("run {run_id}")))
    }

    async fn list_runs(&self, owner_id: Option<&str>) -> Result<Vec<Run>> {
        Ok(self
            .runs
            .iter()
            .map(|entry| entry.run.clone())
            .filter(|run| owner_id.map(|o| o == run.owner_id).unwrap_or(true))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwr_core::models::{RoadmapStage, Tier};
    use kwr_core::values::{Phrase, Score};

    fn sample_run(owner: &str) -> Run {
        Run::new(
            owner,
            vec![Phrase::new("social selling").unwrap()],
            "US",
            "en",
            serde_json::json!({}),
            100.0,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn get_run_round_trips_what_was_created() {
        let store = InMemoryRunStore::new();
        let run = sample_run("alice");
        let id = run.id;
        store.create_run(run).await.unwrap();
        let fetched = store.get_run(id).await.unwrap();
        assert_eq!(fetched.owner_id, "alice");
    }

    #[tokio::test]
    async fn get_run_for_unknown_id_is_not_found() {
        let store = InMemoryRunStore::new();
        let err = store.get_run(RunId::new()).await.unwrap_err();
        assert!(matches!(err, kwr_core::KwrError::NotFound { .. }));
    }

    #[tokio::test]
    async fn keywords_accumulate_across_appends() {
        let store = InMemoryRunStore::new();
        let run = sample_run("alice");
        let id = run.id;
        store.create_run(run).await.unwrap();

        let kw = |p: &str| Keyword::new(id, Phrase::new(p).unwrap(), Tier::Dream100, None);
        store.append_keywords(id, vec![kw("first")]).await.unwrap();
        store.append_keywords(id, vec![kw("second")]).await.unwrap();

        let all = store.list_keywords(id).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn replace_keywords_overwrites_the_stored_list() {
        let store = InMemoryRunStore::new();
        let run = sample_run("alice");
        let id = run.id;
        store.create_run(run).await.unwrap();

        let kw = |p: &str| Keyword::new(id, Phrase::new(p).unwrap(), Tier::Dream100, None);
        store.append_keywords(id, vec![kw("first"), kw("second")]).await.unwrap();

        let mut keywords = store.list_keywords(id).await.unwrap();
        keywords.retain(|k| k.phrase.as_str() == "first");
        store.replace_keywords(id, keywords).await.unwrap();

        let all = store.list_keywords(id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].phrase.as_str(), "first");
    }

    #[tokio::test]
    async fn list_runs_filters_by_owner() {
        let store = InMemoryRunStore::new();
        store.create_run(sample_run("alice")).await.unwrap();
        store.create_run(sample_run("bob")).await.unwrap();

        let alices = store.list_runs(Some("alice")).await.unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(store.list_runs(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn progress_defaults_to_none_until_recorded() {
        let store = InMemoryRunStore::new();
        let run = sample_run("alice");
        let id = run.id;
        store.create_run(run).await.unwrap();
        assert_eq!(store.get_progress(id).await.unwrap(), None);
        store.record_progress(id, 42).await.unwrap();
        assert_eq!(store.get_progress(id).await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn roadmap_items_persist_in_append_order() {
        let store = InMemoryRunStore::new();
        let run = sample_run("alice");
        let id = run.id;
        store.create_run(run).await.unwrap();

        let item = RoadmapItem {
            id: kwr_core::ids::RoadmapItemId::new(),
            run_id: id,
            cluster_id: None,
            primary_keyword: Phrase::new("social selling tips").unwrap(),
            secondary_keywords: vec![],
            stage: RoadmapStage::Pillar,
            cluster_label: "social selling".to_string(),
            volume: 100,
            difficulty: 20,
            blended_score: Score::new(0.8),
            quick_win: true,
            suggested_title: "Social Selling Tips".to_string(),
            dri: None,
            due_date: chrono::Utc::now().date_naive(),
            notes: String::new(),
            source_urls: vec![],
        };
        store.append_roadmap_item(id, item).await.unwrap();
        assert_eq!(store.list_roadmap_items(id).await.unwrap().len(), 1);
    }
}
