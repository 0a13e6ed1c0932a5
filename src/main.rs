mod api;
mod form;
mod models;
mod session;
mod store;
#[cfg(test)]
mod testing;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use api::{base_url_from_env, Backend, DocumentKind, HttpBackend};
use form::ApplicationForm;
use models::{InterviewType, RoundFields, RoundId, Status};
use session::Session;
use store::{filter_applications, ApplicationStore, SummaryPanel};

#[derive(Parser)]
#[command(name = "apptrack")]
#[command(about = "Track job applications against an apptrack backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with username and password
    Login {
        /// Account email / username
        username: String,

        /// Password (prefer --password-file)
        #[arg(short, long)]
        password: Option<String>,

        /// Path to a file holding the password
        #[arg(long)]
        password_file: Option<String>,
    },

    /// Register a new account
    Register {
        /// Account email
        email: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },

    /// Log in with a Google ID token
    GoogleLogin {
        /// ID token obtained from Google
        token: String,
    },

    /// Log out and clear the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// List applications
    List {
        /// Filter by status (applied, interview_scheduled, interviewing, offer, rejected, withdrawn)
        #[arg(short, long)]
        status: Option<String>,

        /// Search company name or position (bypasses --status)
        #[arg(short = 'q', long)]
        search: Option<String>,
    },

    /// Show one application with its interview rounds
    Show {
        /// Application ID
        id: i64,
    },

    /// Add an application
    Add {
        /// Company name
        company: String,

        /// Position title
        position: String,

        /// Application date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Status (default: applied)
        #[arg(short, long, default_value = "applied")]
        status: String,

        /// Free-text notes
        #[arg(short, long, default_value = "")]
        notes: String,

        /// Resume file to upload
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Cover letter file to upload
        #[arg(long)]
        cover_letter: Option<PathBuf>,

        /// Interview round as TYPE@DATETIME[@NOTES], repeatable
        #[arg(short = 'r', long = "round")]
        rounds: Vec<String>,
    },

    /// Edit an application
    Edit {
        /// Application ID
        id: i64,

        /// New company name
        #[arg(long)]
        company: Option<String>,

        /// New position title
        #[arg(long)]
        position: Option<String>,

        /// New application date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        /// New status
        #[arg(short, long)]
        status: Option<String>,

        /// New notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Replacement resume file (omit to keep the current one)
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Replacement cover letter file (omit to keep the current one)
        #[arg(long)]
        cover_letter: Option<PathBuf>,

        /// Add an interview round as TYPE@DATETIME[@NOTES], repeatable
        #[arg(long = "add-round")]
        add_rounds: Vec<String>,

        /// Delete a persisted interview round by its ID, repeatable
        #[arg(long = "remove-round")]
        remove_rounds: Vec<i64>,
    },

    /// Delete an application
    Delete {
        /// Application ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the server-computed summary counts
    Summary,

    /// Download an uploaded document
    Download {
        /// Application ID
        id: i64,

        /// Which document (resume, cover-letter)
        document: String,

        /// Output path (default: the server-provided filename)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Login {
            username,
            password,
            password_file,
        } => {
            let password = resolve_password(password, password_file)?;
            let api = HttpBackend::new(base_url_from_env(), None);
            let tokens = api.login(&username, &password)?;
            Session::new(tokens).save()?;
            println!("Logged in as {}", username);
        }

        Commands::Register { email, password } => {
            let api = HttpBackend::new(base_url_from_env(), None);
            let message = api.register(&email, &password)?;
            println!("{}", message);
            println!("You can now log in with 'apptrack login {}'", email);
        }

        Commands::GoogleLogin { token } => {
            let api = HttpBackend::new(base_url_from_env(), None);
            let tokens = api.google_login(&token)?;
            Session::new(tokens).save()?;
            println!("Logged in via Google");
        }

        Commands::Logout => {
            // Best effort server-side; the local session is cleared either way.
            if let Ok(api) = authenticated_backend() {
                if let Err(e) = api.logout() {
                    eprintln!("Logout request failed: {}", e);
                }
            }
            Session::clear()?;
            println!("Logged out.");
        }

        Commands::Whoami => {
            let api = authenticated_backend()?;
            let profile = api.fetch_profile()?;
            if profile.first_name.is_empty() && profile.last_name.is_empty() {
                println!("{}", profile.email);
            } else {
                println!(
                    "{} {} <{}>",
                    profile.first_name, profile.last_name, profile.email
                );
            }
        }

        Commands::List { status, search } => {
            let api = authenticated_backend()?;
            let status = status.as_deref().map(Status::parse).transpose()?;
            let query = search.unwrap_or_default();

            let mut store = ApplicationStore::new();
            store.refresh(&api)?;

            let visible = filter_applications(store.applications(), status, &query);
            if visible.is_empty() {
                if store.applications().is_empty() {
                    println!("No applications yet. Start by adding one.");
                } else {
                    println!("No applications match your current filter.");
                }
            } else {
                print_application_table(&visible);
            }
        }

        Commands::Show { id } => {
            let api = authenticated_backend()?;
            let mut store = ApplicationStore::new();
            store.refresh(&api)?;

            let app = store
                .get(id)
                .ok_or_else(|| anyhow!("Application #{} not found", id))?;
            println!("Application #{}", app.id);
            println!("Company: {}", app.company_name);
            println!("Position: {}", app.position);
            println!("Applied: {}", app.application_date);
            println!("Status: {}", app.status.as_str());
            if let Some(resume) = &app.resume {
                println!("Resume: {}", resume);
            }
            if let Some(cover_letter) = &app.cover_letter {
                println!("Cover letter: {}", cover_letter);
            }
            if !app.notes.is_empty() {
                println!("\nNotes:\n{}", app.notes);
            }

            match api.list_interviews(id) {
                Ok(rounds) if !rounds.is_empty() => {
                    println!("\nInterview rounds:");
                    for round in rounds {
                        let notes = if round.notes.is_empty() {
                            String::new()
                        } else {
                            format!(" - {}", round.notes)
                        };
                        println!(
                            "  #{} {} {}{}",
                            round.id,
                            round.interview_type.as_str(),
                            round.interview_date,
                            notes
                        );
                    }
                }
                Ok(_) => {}
                Err(e) => eprintln!("Warning: failed to fetch interview rounds: {}", e),
            }
        }

        Commands::Add {
            company,
            position,
            date,
            status,
            notes,
            resume,
            cover_letter,
            rounds,
        } => {
            let api = authenticated_backend()?;
            let mut form = ApplicationForm::new_create();
            form.fields.company_name = company;
            form.fields.position = position;
            form.fields.application_date = date;
            form.fields.status = Status::parse(&status)?;
            form.fields.notes = notes;
            form.resume = resume;
            form.cover_letter = cover_letter;
            for spec in &rounds {
                form.add_round(parse_round_spec(spec)?);
            }

            let app_id = form.submit(&api)?;
            println!("Added application #{}", app_id);
            refresh_after_mutation(&api);
        }

        Commands::Edit {
            id,
            company,
            position,
            date,
            status,
            notes,
            resume,
            cover_letter,
            add_rounds,
            remove_rounds,
        } => {
            let api = authenticated_backend()?;
            let mut store = ApplicationStore::new();
            store.refresh(&api)?;
            let record = store
                .get(id)
                .ok_or_else(|| anyhow!("Application #{} not found", id))?;

            let mut form = ApplicationForm::for_edit(&api, record);
            if let Some(company) = company {
                form.fields.company_name = company;
            }
            if let Some(position) = position {
                form.fields.position = position;
            }
            if let Some(date) = date {
                form.fields.application_date = date;
            }
            if let Some(status) = status {
                form.fields.status = Status::parse(&status)?;
            }
            if let Some(notes) = notes {
                form.fields.notes = notes;
            }
            form.resume = resume;
            form.cover_letter = cover_letter;

            for round_id in remove_rounds {
                form.remove_round(&api, RoundId::Persisted(round_id))?;
            }
            for spec in &add_rounds {
                form.add_round(parse_round_spec(spec)?);
            }

            form.submit(&api)?;
            println!("Updated application #{}", id);
            refresh_after_mutation(&api);
        }

        Commands::Delete { id, yes } => {
            let api = authenticated_backend()?;
            if !yes && !confirm(&format!("Delete application #{}? [y/N] ", id))? {
                println!("Aborted.");
                return Ok(());
            }
            api.delete_application(id)
                .context("Failed to delete application")?;
            println!("Deleted application #{}", id);
            refresh_after_mutation(&api);
        }

        Commands::Summary => {
            let api = authenticated_backend()?;
            let mut panel = SummaryPanel::new();
            panel.observe(&api, 0)?;

            let summary = panel
                .summary()
                .ok_or_else(|| anyhow!("No summary available"))?;
            println!("Total:    {}", summary.total);
            println!("Active:   {}", summary.active);
            println!("Offers:   {}", summary.offers);
            println!("Rejected: {}", summary.rejected);
            if !summary.statuses.is_empty() {
                println!("\nBy status:");
                for (status, count) in &summary.statuses {
                    println!("  {:<20} {}", status, count);
                }
            }
        }

        Commands::Download {
            id,
            document,
            output,
        } => {
            let api = authenticated_backend()?;
            let kind = DocumentKind::parse(&document)?;
            let (filename, bytes) = api.download_document(id, kind)?;
            let path = output.unwrap_or_else(|| PathBuf::from(&filename));
            std::fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved {} ({} bytes)", path.display(), bytes.len());
        }
    }

    Ok(())
}

/// Build a backend carrying the stored session's access token. Errors if no
/// one is logged in.
fn authenticated_backend() -> Result<HttpBackend> {
    let session =
        Session::load()?.ok_or_else(|| anyhow!("Not logged in. Run 'apptrack login' first."))?;
    Ok(HttpBackend::new(
        base_url_from_env(),
        Some(session.access_token().to_string()),
    ))
}

fn resolve_password(password: Option<String>, password_file: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    if let Some(file) = password_file {
        // Expand ~ in path
        let path = if let Some(rest) = file.strip_prefix("~/") {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(format!("{}/{}", home, rest))
        } else {
            PathBuf::from(&file)
        };
        let password = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read password file: {:?}", path))?;
        return Ok(password.trim().to_string());
    }
    Err(anyhow!("Provide --password or --password-file"))
}

/// Re-fetch the list and let the summary panel observe the bumped serial.
/// Read failures here are warnings; the mutation itself already succeeded.
fn refresh_after_mutation(api: &dyn Backend) {
    let mut store = ApplicationStore::new();
    store.mark_mutated();
    if let Err(e) = store.refresh(api) {
        eprintln!("Warning: failed to refresh applications: {}", e);
    }
    let mut panel = SummaryPanel::new();
    if let Err(e) = panel.observe(api, store.refresh_serial()) {
        eprintln!("Warning: failed to refresh summary: {}", e);
    }
}

/// Parse a round spec of the form TYPE@DATETIME[@NOTES], e.g.
/// "technical@2026-03-01T10:00@bring laptop".
fn parse_round_spec(spec: &str) -> Result<RoundFields> {
    let mut parts = spec.splitn(3, '@');
    let kind = parts
        .next()
        .ok_or_else(|| anyhow!("Empty round spec"))?
        .trim();
    let date = parts
        .next()
        .ok_or_else(|| anyhow!("Round spec '{}' is missing a date-time (TYPE@DATETIME)", spec))?
        .trim();
    let notes = parts.next().unwrap_or("").trim();

    Ok(RoundFields {
        interview_type: InterviewType::parse(kind)?,
        interview_date: date.to_string(),
        notes: notes.to_string(),
    })
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn print_application_table(applications: &[&models::ApplicationRecord]) {
    println!(
        "{:<6} {:<20} {:<25} {:<25} {:<12} {:<9}",
        "ID", "STATUS", "COMPANY", "POSITION", "APPLIED", "DOCS"
    );
    println!("{}", "-".repeat(100));
    for app in applications {
        let mut docs = String::new();
        if app.resume.is_some() {
            docs.push_str("cv ");
        }
        if app.cover_letter.is_some() {
            docs.push_str("cover");
        }
        println!(
            "{:<6} {:<20} {:<25} {:<25} {:<12} {:<9}",
            app.id,
            app.status.as_str(),
            truncate(&app.company_name, 23),
            truncate(&app.position, 23),
            app.application_date,
            docs
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
