//! In-process incident store backed by ordered maps.
//!
//! The default backend for local development and tests: no persistence
//! across restarts, no external services. Behavior matches the
//! `PostgreSQL` backend down to list ordering and error variants, so the
//! service layer and its tests run identically against either.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use groundwatch_types::{
    CrowdReport, CrowdReportId, CrowdReportPatch, ReportStatus, SosRequest, SosRequestId,
    SosRequestPatch, SosStatus,
};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::{CrowdReportQuery, IncidentStore, PurgeCounts, SosRequestQuery};

/// In-memory incident store. Cheap to construct, one per process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    crowd_reports: BTreeMap<CrowdReportId, CrowdReport>,
    sos_requests: BTreeMap<SosRequestId, SosRequest>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Apply offset/limit pagination to an already-ordered list.
fn apply_page<T>(records: Vec<T>, limit: Option<u64>, offset: u64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let limit = limit.map_or(usize::MAX, |cap| usize::try_from(cap).unwrap_or(usize::MAX));
    records.into_iter().skip(offset).take(limit).collect()
}

#[async_trait]
impl IncidentStore for MemoryStore {
    async fn insert_crowd_report(&self, report: &CrowdReport) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.crowd_reports.contains_key(&report.id) {
            return Err(StoreError::Conflict(format!(
                "crowd report {} already exists",
                report.id
            )));
        }
        inner.crowd_reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn get_crowd_report(&self, id: CrowdReportId) -> Result<CrowdReport, StoreError> {
        let inner = self.inner.read().await;
        inner.crowd_reports.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list_crowd_reports(
        &self,
        query: &CrowdReportQuery,
    ) -> Result<Vec<CrowdReport>, StoreError> {
        let inner = self.inner.read().await;
        let mut matches: Vec<CrowdReport> = inner
            .crowd_reports
            .values()
            .filter(|report| query.matches(report))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(apply_page(matches, query.limit, query.offset))
    }

    async fn update_crowd_report(
        &self,
        id: CrowdReportId,
        patch: &CrowdReportPatch,
        now: DateTime<Utc>,
    ) -> Result<CrowdReport, StoreError> {
        let mut inner = self.inner.write().await;
        let report = inner.crowd_reports.get_mut(&id).ok_or(StoreError::NotFound)?;
        report.apply_patch(patch, now);
        Ok(report.clone())
    }

    async fn upvote_crowd_report(
        &self,
        id: CrowdReportId,
        now: DateTime<Utc>,
    ) -> Result<CrowdReport, StoreError> {
        let mut inner = self.inner.write().await;
        let report = inner.crowd_reports.get_mut(&id).ok_or(StoreError::NotFound)?;
        report.upvotes = report.upvotes.saturating_add(1);
        report.updated_at = now;
        Ok(report.clone())
    }

    async fn delete_crowd_report(&self, id: CrowdReportId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .crowd_reports
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn insert_sos_request(&self, request: &SosRequest) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.sos_requests.contains_key(&request.id) {
            return Err(StoreError::Conflict(format!(
                "SOS request {} already exists",
                request.id
            )));
        }
        inner.sos_requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get_sos_request(&self, id: SosRequestId) -> Result<SosRequest, StoreError> {
        let inner = self.inner.read().await;
        inner.sos_requests.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list_sos_requests(
        &self,
        query: &SosRequestQuery,
    ) -> Result<Vec<SosRequest>, StoreError> {
        let inner = self.inner.read().await;
        let mut matches: Vec<SosRequest> = inner
            .sos_requests
            .values()
            .filter(|request| query.matches(request))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(apply_page(matches, query.limit, query.offset))
    }

    async fn update_sos_request(
        &self,
        id: SosRequestId,
        patch: &SosRequestPatch,
        now: DateTime<Utc>,
    ) -> Result<SosRequest, StoreError> {
        let mut inner = self.inner.write().await;
        let request = inner.sos_requests.get_mut(&id).ok_or(StoreError::NotFound)?;
        request.apply_patch(patch, now);
        Ok(request.clone())
    }

    async fn delete_sos_request(&self, id: SosRequestId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .sos_requests
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn purge_resolved_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<PurgeCounts, StoreError> {
        let mut inner = self.inner.write().await;

        let crowd_before = inner.crowd_reports.len();
        inner.crowd_reports.retain(|_, report| {
            report.status != ReportStatus::Resolved || report.updated_at >= cutoff
        });
        let crowd_removed = crowd_before.saturating_sub(inner.crowd_reports.len());

        let sos_before = inner.sos_requests.len();
        inner.sos_requests.retain(|_, request| {
            request.status != SosStatus::Resolved || request.updated_at >= cutoff
        });
        let sos_removed = sos_before.saturating_sub(inner.sos_requests.len());

        Ok(PurgeCounts {
            crowd_reports: u64::try_from(crowd_removed).unwrap_or(u64::MAX),
            sos_requests: u64::try_from(sos_removed).unwrap_or(u64::MAX),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use groundwatch_types::{EmergencyType, NewCrowdReport, NewSosRequest, ReportType, Severity};

    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 12, minute, 0).unwrap()
    }

    fn report(minute: u32, severity: Severity) -> CrowdReport {
        CrowdReport::create(
            NewCrowdReport {
                report_type: ReportType::Mud,
                description: None,
                latitude: 30.0,
                longitude: -97.0,
                severity,
            },
            at(minute),
        )
    }

    fn sos(minute: u32) -> SosRequest {
        SosRequest::create(
            NewSosRequest {
                emergency_type: EmergencyType::Lost,
                description: None,
                latitude: 30.0,
                longitude: -97.0,
                contact_phone: None,
            },
            at(minute),
        )
    }

    #[tokio::test]
    async fn insert_then_get_roundtrips() {
        let store = MemoryStore::new();
        let original = report(0, Severity::Medium);

        store.insert_crowd_report(&original).await.unwrap();
        let fetched = store.get_crowd_report(original.id).await.unwrap();

        assert_eq!(fetched, original);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = MemoryStore::new();
        let result = store.get_crowd_report(CrowdReportId::new()).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn duplicate_insert_conflicts() {
        let store = MemoryStore::new();
        let original = report(0, Severity::Medium);

        store.insert_crowd_report(&original).await.unwrap();
        let second = store.insert_crowd_report(&original).await;

        assert!(matches!(second, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn list_orders_newest_first() {
        let store = MemoryStore::new();
        let oldest = report(0, Severity::Low);
        let middle = report(5, Severity::Medium);
        let newest = report(9, Severity::High);
        for record in [&middle, &oldest, &newest] {
            store.insert_crowd_report(record).await.unwrap();
        }

        let listed = store
            .list_crowd_reports(&CrowdReportQuery::default())
            .await
            .unwrap();

        let ids: Vec<CrowdReportId> = listed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);
    }

    #[tokio::test]
    async fn list_applies_filters() {
        let store = MemoryStore::new();
        let mut resolved = report(0, Severity::High);
        resolved.status = ReportStatus::Resolved;
        let active = report(1, Severity::Low);
        store.insert_crowd_report(&resolved).await.unwrap();
        store.insert_crowd_report(&active).await.unwrap();

        let only_active = store
            .list_crowd_reports(&CrowdReportQuery {
                statuses: vec![ReportStatus::Active],
                ..CrowdReportQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(only_active.len(), 1);
        assert_eq!(only_active.first().map(|r| r.id), Some(active.id));

        let only_high = store
            .list_crowd_reports(&CrowdReportQuery {
                severity: Some(Severity::High),
                ..CrowdReportQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(only_high.len(), 1);
        assert_eq!(only_high.first().map(|r| r.id), Some(resolved.id));
    }

    #[tokio::test]
    async fn list_paginates() {
        let store = MemoryStore::new();
        for minute in 0..5 {
            store
                .insert_crowd_report(&report(minute, Severity::Medium))
                .await
                .unwrap();
        }

        let page = store
            .list_crowd_reports(&CrowdReportQuery {
                limit: Some(2),
                offset: 1,
                ..CrowdReportQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(page.len(), 2);
        // Newest first, so offset 1 skips minute 4 and yields minutes 3, 2.
        assert_eq!(page.first().map(|r| r.created_at), Some(at(3)));
        assert_eq!(page.get(1).map(|r| r.created_at), Some(at(2)));
    }

    #[tokio::test]
    async fn update_patches_and_bumps_updated_at() {
        let store = MemoryStore::new();
        let original = report(0, Severity::Medium);
        store.insert_crowd_report(&original).await.unwrap();

        let updated = store
            .update_crowd_report(
                original.id,
                &CrowdReportPatch {
                    severity: Some(Severity::High),
                    ..CrowdReportPatch::default()
                },
                at(7),
            )
            .await
            .unwrap();

        assert_eq!(updated.severity, Severity::High);
        assert_eq!(updated.status, original.status);
        assert_eq!(updated.updated_at, at(7));
        assert_eq!(updated.created_at, original.created_at);
    }

    #[tokio::test]
    async fn concurrent_upvotes_all_land() {
        let store = Arc::new(MemoryStore::new());
        let original = report(0, Severity::Medium);
        store.insert_crowd_report(&original).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..25 {
            let store = Arc::clone(&store);
            let id = original.id;
            handles.push(tokio::spawn(async move {
                store.upvote_crowd_report(id, Utc::now()).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let fetched = store.get_crowd_report(original.id).await.unwrap();
        assert_eq!(fetched.upvotes, 25);
    }

    #[tokio::test]
    async fn delete_removes_and_second_delete_is_not_found() {
        let store = MemoryStore::new();
        let original = sos(0);
        store.insert_sos_request(&original).await.unwrap();

        store.delete_sos_request(original.id).await.unwrap();
        assert!(matches!(
            store.get_sos_request(original.id).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.delete_sos_request(original.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn purge_removes_only_stale_resolved_records() {
        let store = MemoryStore::new();

        let mut stale_resolved = report(0, Severity::Low);
        stale_resolved.status = ReportStatus::Resolved;
        let mut fresh_resolved = report(30, Severity::Low);
        fresh_resolved.status = ReportStatus::Resolved;
        let stale_active = report(1, Severity::Low);
        let mut stale_sos = sos(0);
        stale_sos.status = SosStatus::Resolved;

        for record in [&stale_resolved, &fresh_resolved, &stale_active] {
            store.insert_crowd_report(record).await.unwrap();
        }
        store.insert_sos_request(&stale_sos).await.unwrap();

        let counts = store.purge_resolved_before(at(10)).await.unwrap();

        assert_eq!(counts.crowd_reports, 1);
        assert_eq!(counts.sos_requests, 1);
        assert_eq!(counts.total(), 2);
        assert!(store.get_crowd_report(stale_resolved.id).await.is_err());
        assert!(store.get_crowd_report(fresh_resolved.id).await.is_ok());
        assert!(store.get_crowd_report(stale_active.id).await.is_ok());
    }
}
