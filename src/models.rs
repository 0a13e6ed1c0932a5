use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "APPLIED")]
    Applied,
    #[serde(rename = "INTERVIEW_SCHEDULED")]
    InterviewScheduled,
    #[serde(rename = "INTERVIEWING")]
    Interviewing,
    #[serde(rename = "OFFER")]
    Offer,
    #[serde(rename = "REJECTED")]
    Rejected,
    #[serde(rename = "WITHDRAWN")]
    Withdrawn,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Applied => "APPLIED",
            Status::InterviewScheduled => "INTERVIEW_SCHEDULED",
            Status::Interviewing => "INTERVIEWING",
            Status::Offer => "OFFER",
            Status::Rejected => "REJECTED",
            Status::Withdrawn => "WITHDRAWN",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "APPLIED" => Ok(Status::Applied),
            "INTERVIEW_SCHEDULED" => Ok(Status::InterviewScheduled),
            "INTERVIEWING" => Ok(Status::Interviewing),
            "OFFER" => Ok(Status::Offer),
            "REJECTED" => Ok(Status::Rejected),
            "WITHDRAWN" => Ok(Status::Withdrawn),
            _ => Err(anyhow!(
                "Unknown status '{}'. Available: applied, interview_scheduled, interviewing, offer, rejected, withdrawn",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterviewType {
    #[serde(rename = "TECHNICAL")]
    Technical,
    #[serde(rename = "BEHAVIORAL")]
    Behavioral,
    #[serde(rename = "HR")]
    Hr,
    #[serde(rename = "ONSITE")]
    Onsite,
    #[serde(rename = "PHONE")]
    Phone,
}

impl InterviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewType::Technical => "TECHNICAL",
            InterviewType::Behavioral => "BEHAVIORAL",
            InterviewType::Hr => "HR",
            InterviewType::Onsite => "ONSITE",
            InterviewType::Phone => "PHONE",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TECHNICAL" => Ok(InterviewType::Technical),
            "BEHAVIORAL" => Ok(InterviewType::Behavioral),
            "HR" => Ok(InterviewType::Hr),
            "ONSITE" => Ok(InterviewType::Onsite),
            "PHONE" => Ok(InterviewType::Phone),
            _ => Err(anyhow!(
                "Unknown interview type '{}'. Available: technical, behavioral, hr, onsite, phone",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: i64,
    pub company_name: String,
    pub position: String,
    pub application_date: String, // YYYY-MM-DD
    pub status: Status,
    pub resume: Option<String>,       // server-side file reference
    pub cover_letter: Option<String>, // server-side file reference
    #[serde(default)]
    pub notes: String,
}

/// The mutable fields of an application, as sent in create/update writes.
#[derive(Debug, Clone)]
pub struct ApplicationFields {
    pub company_name: String,
    pub position: String,
    pub application_date: String,
    pub status: Status,
    pub notes: String,
}

impl Default for ApplicationFields {
    fn default() -> Self {
        Self {
            company_name: String::new(),
            position: String::new(),
            application_date: String::new(),
            status: Status::Applied,
            notes: String::new(),
        }
    }
}

/// An interview round as the backend stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewRecord {
    pub id: i64,
    pub interview_type: InterviewType,
    pub interview_date: String, // YYYY-MM-DDTHH:MM
    #[serde(default)]
    pub notes: String,
}

/// Round identifier. Server-assigned ids and client-minted temp ids live in
/// separate variants so the two id spaces can never be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundId {
    /// Already persisted on the backend under this id.
    Persisted(i64),
    /// Added in the current editing session; id is a local millisecond stamp.
    Pending(i64),
}

impl RoundId {
    pub fn pending_now() -> Self {
        RoundId::Pending(chrono::Utc::now().timestamp_millis())
    }

    #[allow(dead_code)]
    pub fn is_persisted(&self) -> bool {
        matches!(self, RoundId::Persisted(_))
    }

    #[allow(dead_code)]
    pub fn raw(&self) -> i64 {
        match self {
            RoundId::Persisted(id) | RoundId::Pending(id) => *id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoundFields {
    pub interview_type: InterviewType,
    pub interview_date: String,
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Summary {
    pub total: i64,
    pub active: i64,
    pub offers: i64,
    pub rejected: i64,
    #[serde(default)]
    pub statuses: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}
