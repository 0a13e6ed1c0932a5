use anyhow::{anyhow, Context, Result};
use reqwest::blocking::multipart::Form;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde_json::json;
use std::path::Path;

use crate::models::{
    ApplicationFields, ApplicationRecord, AuthTokens, InterviewRecord, RoundFields, Summary,
    UserProfile,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/";

pub fn base_url_from_env() -> String {
    std::env::var("APPTRACK_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Resume,
    CoverLetter,
}

impl DocumentKind {
    pub fn path_segment(&self) -> &'static str {
        match self {
            DocumentKind::Resume => "resume",
            DocumentKind::CoverLetter => "cover-letter",
        }
    }

    pub fn default_filename(&self) -> &'static str {
        match self {
            DocumentKind::Resume => "resume.pdf",
            DocumentKind::CoverLetter => "cover-letter.pdf",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "resume" | "cv" => Ok(DocumentKind::Resume),
            "cover-letter" | "cover_letter" | "coverletter" => Ok(DocumentKind::CoverLetter),
            _ => Err(anyhow!(
                "Unknown document '{}'. Available: resume, cover-letter",
                s
            )),
        }
    }
}

/// The backend REST surface the client depends on. Protocol logic (store,
/// form submission) talks to this trait, never to the transport directly.
pub trait Backend {
    fn login(&self, username: &str, password: &str) -> Result<AuthTokens>;
    fn register(&self, email: &str, password: &str) -> Result<String>;
    fn google_login(&self, id_token: &str) -> Result<AuthTokens>;
    fn logout(&self) -> Result<()>;
    fn fetch_profile(&self) -> Result<UserProfile>;

    fn list_applications(&self) -> Result<Vec<ApplicationRecord>>;
    fn create_application(
        &self,
        fields: &ApplicationFields,
        resume: Option<&Path>,
        cover_letter: Option<&Path>,
    ) -> Result<ApplicationRecord>;
    fn update_application(
        &self,
        id: i64,
        fields: &ApplicationFields,
        resume: Option<&Path>,
        cover_letter: Option<&Path>,
    ) -> Result<ApplicationRecord>;
    fn delete_application(&self, id: i64) -> Result<()>;
    fn fetch_summary(&self) -> Result<Summary>;

    fn list_interviews(&self, app_id: i64) -> Result<Vec<InterviewRecord>>;
    fn create_interview(&self, app_id: i64, round: &RoundFields) -> Result<()>;
    fn update_interview(&self, app_id: i64, round_id: i64, round: &RoundFields) -> Result<()>;
    fn delete_interview(&self, app_id: i64, round_id: i64) -> Result<()>;

    /// Returns (filename, bytes). Filename comes from the content-disposition
    /// header when present, else the kind's fixed default.
    fn download_document(&self, app_id: i64, kind: DocumentKind) -> Result<(String, Vec<u8>)>;
}

pub struct HttpBackend {
    base_url: String,
    access_token: Option<String>,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            access_token,
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, self.url(path));
        if let Some(token) = &self.access_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder
    }

    fn check(response: Response, what: &str) -> Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("{} failed with status {}: {}", what, status, body));
        }
        Ok(response)
    }

    fn application_form(
        fields: &ApplicationFields,
        resume: Option<&Path>,
        cover_letter: Option<&Path>,
    ) -> Result<Form> {
        let mut form = Form::new()
            .text("company_name", fields.company_name.clone())
            .text("position", fields.position.clone())
            .text("application_date", fields.application_date.clone())
            .text("status", fields.status.as_str())
            .text("notes", fields.notes.clone());

        // Files ride in the same multipart request as the metadata. A file
        // left unset on update means "keep whatever the server already has".
        if let Some(path) = resume {
            form = form
                .file("resume", path)
                .with_context(|| format!("Failed to read resume file: {:?}", path))?;
        }
        if let Some(path) = cover_letter {
            form = form
                .file("cover_letter", path)
                .with_context(|| format!("Failed to read cover letter file: {:?}", path))?;
        }
        Ok(form)
    }

    fn round_body(round: &RoundFields) -> serde_json::Value {
        json!({
            "interview_type": round.interview_type.as_str(),
            "interview_date": round.interview_date,
            "notes": round.notes,
        })
    }
}

impl Backend for HttpBackend {
    fn login(&self, username: &str, password: &str) -> Result<AuthTokens> {
        let response = self
            .request(Method::POST, "auth/login/")
            .json(&json!({ "username": username, "password": password }))
            .send()
            .context("Failed to send login request")?;
        let response = Self::check(response, "Login")?;
        response.json().context("Failed to parse login response")
    }

    fn register(&self, email: &str, password: &str) -> Result<String> {
        let response = self
            .request(Method::POST, "auth/register/")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .context("Failed to send register request")?;
        let response = Self::check(response, "Registration")?;
        let body: serde_json::Value = response
            .json()
            .context("Failed to parse register response")?;
        Ok(body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Registered successfully")
            .to_string())
    }

    fn google_login(&self, id_token: &str) -> Result<AuthTokens> {
        let response = self
            .request(Method::POST, "auth/google/")
            .json(&json!({ "token": id_token }))
            .send()
            .context("Failed to send Google login request")?;
        let response = Self::check(response, "Google login")?;
        response
            .json()
            .context("Failed to parse Google login response")
    }

    fn logout(&self) -> Result<()> {
        let response = self
            .request(Method::POST, "auth/logout/")
            .send()
            .context("Failed to send logout request")?;
        Self::check(response, "Logout")?;
        Ok(())
    }

    fn fetch_profile(&self) -> Result<UserProfile> {
        let response = self
            .request(Method::GET, "users/me/")
            .send()
            .context("Failed to fetch user profile")?;
        let response = Self::check(response, "Profile fetch")?;
        response.json().context("Failed to parse user profile")
    }

    fn list_applications(&self) -> Result<Vec<ApplicationRecord>> {
        let response = self
            .request(Method::GET, "applications/")
            .send()
            .context("Failed to fetch applications")?;
        let response = Self::check(response, "Application list")?;
        response.json().context("Failed to parse application list")
    }

    fn create_application(
        &self,
        fields: &ApplicationFields,
        resume: Option<&Path>,
        cover_letter: Option<&Path>,
    ) -> Result<ApplicationRecord> {
        let form = Self::application_form(fields, resume, cover_letter)?;
        let response = self
            .request(Method::POST, "applications/")
            .multipart(form)
            .send()
            .context("Failed to send application create request")?;
        let response = Self::check(response, "Application create")?;
        response
            .json()
            .context("Failed to parse created application")
    }

    fn update_application(
        &self,
        id: i64,
        fields: &ApplicationFields,
        resume: Option<&Path>,
        cover_letter: Option<&Path>,
    ) -> Result<ApplicationRecord> {
        let form = Self::application_form(fields, resume, cover_letter)?;
        let response = self
            .request(Method::PUT, &format!("applications/{}/", id))
            .multipart(form)
            .send()
            .context("Failed to send application update request")?;
        let response = Self::check(response, "Application update")?;
        response
            .json()
            .context("Failed to parse updated application")
    }

    fn delete_application(&self, id: i64) -> Result<()> {
        let response = self
            .request(Method::DELETE, &format!("applications/{}/", id))
            .send()
            .context("Failed to send application delete request")?;
        Self::check(response, "Application delete")?;
        Ok(())
    }

    fn fetch_summary(&self) -> Result<Summary> {
        let response = self
            .request(Method::GET, "applications/summary/")
            .send()
            .context("Failed to fetch summary")?;
        let response = Self::check(response, "Summary fetch")?;
        response.json().context("Failed to parse summary")
    }

    fn list_interviews(&self, app_id: i64) -> Result<Vec<InterviewRecord>> {
        let response = self
            .request(Method::GET, &format!("applications/{}/interviews/", app_id))
            .send()
            .context("Failed to fetch interview rounds")?;
        let response = Self::check(response, "Interview list")?;
        response.json().context("Failed to parse interview rounds")
    }

    fn create_interview(&self, app_id: i64, round: &RoundFields) -> Result<()> {
        let response = self
            .request(Method::POST, &format!("applications/{}/interviews/", app_id))
            .json(&Self::round_body(round))
            .send()
            .context("Failed to send interview create request")?;
        Self::check(response, "Interview create")?;
        Ok(())
    }

    fn update_interview(&self, app_id: i64, round_id: i64, round: &RoundFields) -> Result<()> {
        let response = self
            .request(
                Method::PUT,
                &format!("applications/{}/interviews/{}/", app_id, round_id),
            )
            .json(&Self::round_body(round))
            .send()
            .context("Failed to send interview update request")?;
        Self::check(response, "Interview update")?;
        Ok(())
    }

    fn delete_interview(&self, app_id: i64, round_id: i64) -> Result<()> {
        let response = self
            .request(
                Method::DELETE,
                &format!("applications/{}/interviews/{}/", app_id, round_id),
            )
            .send()
            .context("Failed to send interview delete request")?;
        Self::check(response, "Interview delete")?;
        Ok(())
    }

    fn download_document(&self, app_id: i64, kind: DocumentKind) -> Result<(String, Vec<u8>)> {
        let response = self
            .request(
                Method::GET,
                &format!("applications/{}/{}/", app_id, kind.path_segment()),
            )
            .send()
            .with_context(|| format!("Failed to download {}", kind.path_segment()))?;
        let response = Self::check(response, "Document download")?;

        let disposition = response
            .headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let filename = filename_from_disposition(disposition.as_deref(), kind);

        let bytes = response
            .bytes()
            .context("Failed to read document body")?
            .to_vec();
        Ok((filename, bytes))
    }
}

/// Derive a download filename from a content-disposition header, falling
/// back to the document kind's fixed default.
pub fn filename_from_disposition(header: Option<&str>, kind: DocumentKind) -> String {
    if let Some(header) = header {
        // filename="report.pdf" or filename=report.pdf
        if let Ok(re) = regex::Regex::new(r#"filename="?([^";]+)"?"#) {
            if let Some(captures) = re.captures(header) {
                let name = captures[1].trim();
                if !name.is_empty() {
                    return name.to_string();
                }
            }
        }
    }
    kind.default_filename().to_string()
}
