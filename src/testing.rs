//! Recording fake of the backend trait for unit tests.

use anyhow::{anyhow, Result};
use std::cell::{Cell, RefCell};
use std::path::Path;

use crate::api::{Backend, DocumentKind};
use crate::models::{
    ApplicationFields, ApplicationRecord, AuthTokens, InterviewRecord, RoundFields, Status,
    Summary, UserProfile,
};

/// One observed backend call, recorded in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListApplications,
    CreateApplication,
    UpdateApplication(i64),
    DeleteApplication(i64),
    ListInterviews(i64),
    /// (application id, interview date) so order assertions can see which
    /// round the write carried.
    CreateInterview(i64, String),
    UpdateInterview(i64, i64, String),
    DeleteInterview(i64, i64),
    FetchSummary,
}

#[derive(Default)]
pub struct FakeBackend {
    pub calls: RefCell<Vec<Call>>,
    pub applications: RefCell<Vec<ApplicationRecord>>,
    pub interviews: RefCell<Vec<InterviewRecord>>,
    /// Fail the parent create/update write.
    pub fail_parent_write: Cell<bool>,
    /// Fail the Nth round write of this submission, 1-indexed, counting
    /// create and update interview calls together.
    pub fail_round_write_at: Cell<Option<usize>>,
    pub fail_interview_delete: Cell<bool>,
    pub fail_summary: Cell<bool>,
    pub fail_list: Cell<bool>,
    round_writes: Cell<usize>,
    next_id: Cell<i64>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.next_id.set(100);
        fake
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn round_write_calls(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::CreateInterview(..) | Call::UpdateInterview(..)))
            .cloned()
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn next_round_write(&self) -> Result<()> {
        let ordinal = self.round_writes.get() + 1;
        self.round_writes.set(ordinal);
        if self.fail_round_write_at.get() == Some(ordinal) {
            return Err(anyhow!("round write {} rejected", ordinal));
        }
        Ok(())
    }

    fn made_record(&self, fields: &ApplicationFields, id: i64) -> ApplicationRecord {
        ApplicationRecord {
            id,
            company_name: fields.company_name.clone(),
            position: fields.position.clone(),
            application_date: fields.application_date.clone(),
            status: fields.status,
            resume: None,
            cover_letter: None,
            notes: fields.notes.clone(),
        }
    }
}

impl Backend for FakeBackend {
    fn login(&self, _username: &str, _password: &str) -> Result<AuthTokens> {
        Ok(AuthTokens {
            access: "fake-access".to_string(),
            refresh: "fake-refresh".to_string(),
        })
    }

    fn register(&self, _email: &str, _password: &str) -> Result<String> {
        Ok("Registered successfully".to_string())
    }

    fn google_login(&self, _id_token: &str) -> Result<AuthTokens> {
        Ok(AuthTokens {
            access: "fake-access".to_string(),
            refresh: "fake-refresh".to_string(),
        })
    }

    fn logout(&self) -> Result<()> {
        Ok(())
    }

    fn fetch_profile(&self) -> Result<UserProfile> {
        Ok(UserProfile {
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: "test@example.com".to_string(),
        })
    }

    fn list_applications(&self) -> Result<Vec<ApplicationRecord>> {
        self.record(Call::ListApplications);
        if self.fail_list.get() {
            return Err(anyhow!("list unavailable"));
        }
        Ok(self.applications.borrow().clone())
    }

    fn create_application(
        &self,
        fields: &ApplicationFields,
        _resume: Option<&Path>,
        _cover_letter: Option<&Path>,
    ) -> Result<ApplicationRecord> {
        self.record(Call::CreateApplication);
        if self.fail_parent_write.get() {
            return Err(anyhow!("create rejected"));
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let record = self.made_record(fields, id);
        self.applications.borrow_mut().push(record.clone());
        Ok(record)
    }

    fn update_application(
        &self,
        id: i64,
        fields: &ApplicationFields,
        _resume: Option<&Path>,
        _cover_letter: Option<&Path>,
    ) -> Result<ApplicationRecord> {
        self.record(Call::UpdateApplication(id));
        if self.fail_parent_write.get() {
            return Err(anyhow!("update rejected"));
        }
        Ok(self.made_record(fields, id))
    }

    fn delete_application(&self, id: i64) -> Result<()> {
        self.record(Call::DeleteApplication(id));
        self.applications.borrow_mut().retain(|a| a.id != id);
        Ok(())
    }

    fn fetch_summary(&self) -> Result<Summary> {
        self.record(Call::FetchSummary);
        if self.fail_summary.get() {
            return Err(anyhow!("summary unavailable"));
        }
        let applications = self.applications.borrow();
        Ok(Summary {
            total: applications.len() as i64,
            active: applications
                .iter()
                .filter(|a| !matches!(a.status, Status::Rejected | Status::Withdrawn))
                .count() as i64,
            offers: applications
                .iter()
                .filter(|a| a.status == Status::Offer)
                .count() as i64,
            rejected: applications
                .iter()
                .filter(|a| a.status == Status::Rejected)
                .count() as i64,
            statuses: Default::default(),
        })
    }

    fn list_interviews(&self, app_id: i64) -> Result<Vec<InterviewRecord>> {
        self.record(Call::ListInterviews(app_id));
        if self.fail_list.get() {
            return Err(anyhow!("interview list unavailable"));
        }
        Ok(self.interviews.borrow().clone())
    }

    fn create_interview(&self, app_id: i64, round: &RoundFields) -> Result<()> {
        self.record(Call::CreateInterview(app_id, round.interview_date.clone()));
        self.next_round_write()
    }

    fn update_interview(&self, app_id: i64, round_id: i64, round: &RoundFields) -> Result<()> {
        self.record(Call::UpdateInterview(
            app_id,
            round_id,
            round.interview_date.clone(),
        ));
        self.next_round_write()
    }

    fn delete_interview(&self, app_id: i64, round_id: i64) -> Result<()> {
        self.record(Call::DeleteInterview(app_id, round_id));
        if self.fail_interview_delete.get() {
            return Err(anyhow!("delete rejected"));
        }
        Ok(())
    }

    fn download_document(&self, _app_id: i64, kind: DocumentKind) -> Result<(String, Vec<u8>)> {
        Ok((kind.default_filename().to_string(), b"%PDF-fake".to_vec()))
    }
}
