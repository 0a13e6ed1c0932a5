use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::path::PathBuf;

use crate::api::Backend;
use crate::models::{ApplicationFields, ApplicationRecord, RoundFields, RoundId};

/// Field-keyed validation failures. Submission is blocked client-side, with
/// zero network activity, while any of these are present.
#[derive(Debug)]
pub struct FieldErrors {
    errors: Vec<(String, String)>,
}

impl FieldErrors {
    fn new() -> Self {
        Self { errors: Vec::new() }
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push((field.to_string(), message.into()));
    }

    fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[allow(dead_code)]
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|(field, _)| field.as_str())
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Please fill in all required fields:")?;
        for (field, message) in &self.errors {
            writeln!(f, "  {}: {}", field, message)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(i64),
}

/// One interview round inside an editing session. The `RoundId` variant
/// decides whether save issues an update or a create, and whether removal
/// needs a network call at all.
#[derive(Debug, Clone)]
pub struct RoundEntry {
    pub id: RoundId,
    pub fields: RoundFields,
}

/// One application editing session: the draft fields, optional local files
/// to upload, and the round list.
pub struct ApplicationForm {
    mode: FormMode,
    pub fields: ApplicationFields,
    pub resume: Option<PathBuf>,
    pub cover_letter: Option<PathBuf>,
    rounds: Vec<RoundEntry>,
}

impl ApplicationForm {
    pub fn new_create() -> Self {
        Self {
            mode: FormMode::Create,
            fields: ApplicationFields::default(),
            resume: None,
            cover_letter: None,
            rounds: Vec::new(),
        }
    }

    /// Start an edit session pre-populated from an existing record. Rounds
    /// already persisted on the backend come back tagged `Persisted`; a
    /// failed round fetch is reported on stderr and leaves the round list
    /// empty rather than blocking the edit.
    pub fn for_edit(api: &dyn Backend, record: &ApplicationRecord) -> Self {
        let rounds = match api.list_interviews(record.id) {
            Ok(records) => records
                .into_iter()
                .map(|r| RoundEntry {
                    id: RoundId::Persisted(r.id),
                    fields: RoundFields {
                        interview_type: r.interview_type,
                        interview_date: r.interview_date,
                        notes: r.notes,
                    },
                })
                .collect(),
            Err(e) => {
                eprintln!("Warning: failed to fetch interview rounds: {}", e);
                Vec::new()
            }
        };

        Self {
            mode: FormMode::Edit(record.id),
            fields: ApplicationFields {
                company_name: record.company_name.clone(),
                position: record.position.clone(),
                application_date: record.application_date.clone(),
                status: record.status,
                notes: record.notes.clone(),
            },
            resume: None,
            cover_letter: None,
            rounds,
        }
    }

    #[allow(dead_code)]
    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn rounds(&self) -> &[RoundEntry] {
        &self.rounds
    }

    /// Append a round added in this session, under a locally minted temp id.
    pub fn add_round(&mut self, fields: RoundFields) -> RoundId {
        let id = RoundId::pending_now();
        self.rounds.push(RoundEntry { id, fields });
        id
    }

    /// Remove a round. A persisted round issues exactly one delete against
    /// the nested resource and is spliced out only if that succeeds; a
    /// pending round is a pure local splice with no network call.
    pub fn remove_round(&mut self, api: &dyn Backend, id: RoundId) -> Result<()> {
        let position = self
            .rounds
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| anyhow!("No such interview round in this session"))?;

        if let RoundId::Persisted(round_id) = id {
            let FormMode::Edit(app_id) = self.mode else {
                return Err(anyhow!(
                    "Persisted round in a create session; this should not happen"
                ));
            };
            api.delete_interview(app_id, round_id)
                .context("Failed to delete interview round")?;
        }
        self.rounds.remove(position);
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.fields.company_name.trim().is_empty() {
            errors.push("company_name", "Company name is required");
        }
        if self.fields.position.trim().is_empty() {
            errors.push("position", "Position is required");
        }
        let date = self.fields.application_date.trim();
        if date.is_empty() {
            errors.push("application_date", "Application date is required");
        } else if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            errors.push("application_date", "Expected a YYYY-MM-DD date");
        }

        for (index, round) in self.rounds.iter().enumerate() {
            let when = round.fields.interview_date.trim();
            let field = format!("round {}", index + 1);
            if when.is_empty() {
                errors.push(&field, "Interview date is required");
            } else if parse_round_datetime(when).is_err() {
                errors.push(&field, "Expected a YYYY-MM-DDTHH:MM date-time");
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The two-phase submission: one parent write, then each round in list
    /// order, sequentially. The parent must succeed before any round write
    /// is issued, because round paths need the parent id. A failure at
    /// round K aborts the rest; rounds 1..K-1 stay persisted (no rollback)
    /// and the error names the failing round so the user can reconcile.
    ///
    /// On full success the form clears itself and the application id is
    /// returned.
    pub fn submit(&mut self, api: &dyn Backend) -> Result<i64> {
        self.validate().map_err(anyhow::Error::new)?;

        let app_id = match self.mode {
            FormMode::Create => {
                let created = api
                    .create_application(
                        &self.fields,
                        self.resume.as_deref(),
                        self.cover_letter.as_deref(),
                    )
                    .context("Failed to create application")?;
                created.id
            }
            FormMode::Edit(id) => {
                api.update_application(
                    id,
                    &self.fields,
                    self.resume.as_deref(),
                    self.cover_letter.as_deref(),
                )
                .context("Failed to update application")?;
                id
            }
        };

        let total = self.rounds.len();
        for (index, round) in self.rounds.iter().enumerate() {
            let result = match round.id {
                RoundId::Persisted(round_id) => {
                    api.update_interview(app_id, round_id, &round.fields)
                }
                RoundId::Pending(_) => api.create_interview(app_id, &round.fields),
            };
            result.with_context(|| {
                format!(
                    "Interview round {} of {} failed; earlier rounds were saved, later rounds were not",
                    index + 1,
                    total
                )
            })?;
        }

        *self = Self::new_create();
        Ok(app_id)
    }
}

pub fn parse_round_datetime(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| anyhow!("Invalid date-time '{}'", s))
}
