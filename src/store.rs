use anyhow::Result;

use crate::api::Backend;
use crate::models::{ApplicationRecord, Status, Summary};

/// In-memory mirror of the backend's application list.
///
/// There is exactly one writer (the mutation paths in main) and the list is
/// only ever replaced wholesale by a successful fetch; a failed fetch leaves
/// the previous list displayed.
#[derive(Default)]
pub struct ApplicationStore {
    applications: Vec<ApplicationRecord>,
    refresh_serial: u64,
}

impl ApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applications(&self) -> &[ApplicationRecord] {
        &self.applications
    }

    pub fn get(&self, id: i64) -> Option<&ApplicationRecord> {
        self.applications.iter().find(|app| app.id == id)
    }

    /// Replace the whole list from the backend. No merging.
    pub fn refresh(&mut self, api: &dyn Backend) -> Result<()> {
        self.applications = api.list_applications()?;
        Ok(())
    }

    /// Record that a mutation succeeded somewhere. Every successful create,
    /// update, or delete bumps the same serial so the list view and the
    /// summary panel refresh in lockstep.
    pub fn mark_mutated(&mut self) {
        self.refresh_serial += 1;
    }

    pub fn refresh_serial(&self) -> u64 {
        self.refresh_serial
    }
}

/// Passthrough display of the server-computed summary. Refetches when the
/// observed serial changes; never derives counts from the local list.
#[derive(Default)]
pub struct SummaryPanel {
    summary: Option<Summary>,
    seen_serial: Option<u64>,
}

impl SummaryPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    /// Fetch the summary if the serial moved since the last observation (or
    /// nothing has been fetched yet). Returns whether a fetch happened. A
    /// failed fetch keeps the previous summary and the previous serial, so
    /// the next observation retries.
    pub fn observe(&mut self, api: &dyn Backend, serial: u64) -> Result<bool> {
        if self.seen_serial == Some(serial) && self.summary.is_some() {
            return Ok(false);
        }
        self.summary = Some(api.fetch_summary()?);
        self.seen_serial = Some(serial);
        Ok(true)
    }
}

/// The filter/search view-model: pure, no network access.
///
/// A non-empty query matches company name or position case-insensitively and
/// bypasses the status filter entirely. Query and status filter never
/// combine; with an empty query the status filter applies (None means all).
pub fn filter_applications<'a>(
    applications: &'a [ApplicationRecord],
    status: Option<Status>,
    query: &str,
) -> Vec<&'a ApplicationRecord> {
    let query = query.trim().to_lowercase();
    applications
        .iter()
        .filter(|app| {
            if !query.is_empty() {
                return app.company_name.to_lowercase().contains(&query)
                    || app.position.to_lowercase().contains(&query);
            }
            match status {
                Some(wanted) => app.status == wanted,
                None => true,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use crate::testing::{Call, FakeBackend};

    fn record(id: i64, company: &str, position: &str, status: Status) -> ApplicationRecord {
        ApplicationRecord {
            id,
            company_name: company.to_string(),
            position: position.to_string(),
            application_date: "2026-01-01".to_string(),
            status,
            resume: None,
            cover_letter: None,
            notes: String::new(),
        }
    }

    fn sample() -> Vec<ApplicationRecord> {
        vec![
            record(1, "Acme", "Eng", Status::Applied),
            record(2, "Globex", "Mgr", Status::Offer),
        ]
    }

    #[test]
    fn test_status_filter_without_query() {
        let apps = sample();
        let visible = filter_applications(&apps, Some(Status::Offer), "");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].company_name, "Globex");
    }

    #[test]
    fn test_query_bypasses_status_filter() {
        let apps = sample();
        // Acme is APPLIED, the filter wants OFFER; the query still wins.
        let visible = filter_applications(&apps, Some(Status::Offer), "acme");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].company_name, "Acme");
    }

    #[test]
    fn test_query_matches_position_too() {
        let apps = sample();
        let visible = filter_applications(&apps, None, "mgr");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].company_name, "Globex");
    }

    #[test]
    fn test_no_filter_returns_everything() {
        let apps = sample();
        assert_eq!(filter_applications(&apps, None, "").len(), 2);
        assert_eq!(filter_applications(&apps, None, "   ").len(), 2);
    }

    #[test]
    fn test_serial_increases_by_one_per_mutation() {
        let mut store = ApplicationStore::new();
        assert_eq!(store.refresh_serial(), 0);
        store.mark_mutated();
        assert_eq!(store.refresh_serial(), 1);
        store.mark_mutated();
        assert_eq!(store.refresh_serial(), 2);
    }

    #[test]
    fn test_refresh_replaces_list_wholesale() {
        let api = FakeBackend::new();
        api.applications.borrow_mut().extend(sample());

        let mut store = ApplicationStore::new();
        store.refresh(&api).unwrap();
        assert_eq!(store.applications().len(), 2);
        assert!(store.get(1).is_some());

        api.applications.borrow_mut().clear();
        store.refresh(&api).unwrap();
        assert!(store.applications().is_empty());
    }

    #[test]
    fn test_failed_refresh_keeps_prior_list() {
        let api = FakeBackend::new();
        api.applications.borrow_mut().extend(sample());

        let mut store = ApplicationStore::new();
        store.refresh(&api).unwrap();

        api.fail_list.set(true);
        assert!(store.refresh(&api).is_err());
        // Stale-but-present: the old list is still displayed.
        assert_eq!(store.applications().len(), 2);
    }

    #[test]
    fn test_summary_panel_fetches_only_when_serial_moves() {
        let api = FakeBackend::new();
        api.applications.borrow_mut().extend(sample());
        let mut panel = SummaryPanel::new();

        assert!(panel.observe(&api, 0).unwrap()); // first look always fetches
        assert!(!panel.observe(&api, 0).unwrap()); // serial unchanged
        assert!(!panel.observe(&api, 0).unwrap());
        assert!(panel.observe(&api, 1).unwrap()); // mutation happened

        let fetches = api
            .calls()
            .iter()
            .filter(|c| **c == Call::FetchSummary)
            .count();
        assert_eq!(fetches, 2);
        assert_eq!(panel.summary().unwrap().total, 2);
    }

    #[test]
    fn test_summary_panel_keeps_stale_value_on_fetch_failure() {
        let api = FakeBackend::new();
        api.applications.borrow_mut().extend(sample());
        let mut panel = SummaryPanel::new();

        panel.observe(&api, 0).unwrap();
        api.fail_summary.set(true);
        assert!(panel.observe(&api, 1).is_err());
        // Prior summary still displayed, and the next observation retries.
        assert_eq!(panel.summary().unwrap().total, 2);

        api.fail_summary.set(false);
        assert!(panel.observe(&api, 1).unwrap());
    }
}
