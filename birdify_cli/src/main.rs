mod session_file;

use anyhow::{bail, Context, Result};
use birdify_core::auth::GoTrueProvider;
use birdify_core::config::BirdifyConfig;
use birdify_core::mapper::PhotoResolver;
use birdify_core::models::{CapturedPhoto, NewAccount, Session, SightingDraft};
use birdify_core::repository::SightingRepository;
use birdify_core::session::SessionGate;
use birdify_core::species::SpeciesDirectory;
use birdify_core::store::SupabaseStore;
use birdify_core::telemetry;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about = "Birdify sighting log")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in by username or email
    Login {
        identifier: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long = "full-name")]
        full_name: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out and forget the persisted session
    Logout,
    /// Show the signed-in user's profile
    Profile,
    /// List recent sightings, newest first
    List,
    /// Report a new sighting
    Report {
        /// Path to the captured photo
        #[arg(long)]
        photo: PathBuf,
        #[arg(long)]
        location: String,
        #[arg(long)]
        species: Option<String>,
        #[arg(long)]
        count: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Comment on a sighting
    Comment {
        sighting_id: String,
        text: String,
        /// Optional display name stored with the comment
        #[arg(long)]
        author: Option<String>,
    },
    /// Delete one of your own comments
    Uncomment { comment_id: String },
    /// Delete one of your own sightings
    Delete { sighting_id: String },
    /// Browse the species dictionary
    Dictionary,
}

struct App {
    gate: SessionGate,
    repository: Arc<SightingRepository>,
    species: SpeciesDirectory,
    session_path: PathBuf,
}

impl App {
    fn build(config: &BirdifyConfig) -> Result<Self> {
        let store = Arc::new(SupabaseStore::new(&config.supabase, &config.http)?);
        let identity = Arc::new(GoTrueProvider::new(&config.supabase, &config.http)?);
        let gate = SessionGate::new(identity, store.clone());
        let repository = Arc::new(SightingRepository::new(
            store,
            PhotoResolver::new(config.supabase.base_url.clone()),
        ));
        gate.bind_sightings(repository.clone());
        let species = SpeciesDirectory::new(config.species.clone(), &config.http)?;
        Ok(Self {
            gate,
            repository,
            species,
            session_path: session_file::default_path()?,
        })
    }

    async fn restore_session(&self) {
        match session_file::load(&self.session_path) {
            Ok(Some(session)) => self.gate.restore(session).await,
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "ignoring unreadable session file"),
        }
    }

    /// Every screen except auth is gated on an established session.
    fn require_session(&self) -> Result<Session> {
        match self.gate.session() {
            Some(session) => Ok(session),
            None => bail!("not signed in; run `birdify_cli login` first"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();
    let args = Args::parse();
    let config = BirdifyConfig::from_env()?;
    let app = App::build(&config)?;
    app.restore_session().await;

    match args.command {
        Command::Login {
            identifier,
            password,
        } => {
            let session = app.gate.sign_in(&identifier, &password).await?;
            session_file::save(&app.session_path, &session)?;
            println!("signed in as {}", session.email);
        }
        Command::Signup {
            email,
            username,
            full_name,
            password,
        } => {
            let account = NewAccount {
                email,
                password,
                username: username.clone(),
                full_name,
            };
            match app.gate.sign_up(account).await? {
                Some(session) => {
                    session_file::save(&app.session_path, &session)?;
                    println!("welcome, @{username}: you are signed in");
                }
                None => println!("account created; confirm your email, then log in"),
            }
        }
        Command::Logout => {
            // the gate wipes the bound sighting list along with the profile
            app.gate.sign_out().await?;
            session_file::clear(&app.session_path)?;
            println!("signed out");
        }
        Command::Profile => {
            let session = app.require_session()?;
            match app.gate.profile().await {
                Some(profile) => {
                    println!("@{}", profile.username);
                    if let Some(full_name) = profile.full_name {
                        println!("  {full_name}");
                    }
                    println!("  {}", session.email);
                }
                None => println!("{} (no profile on record)", session.email),
            }
        }
        Command::List => {
            app.require_session()?;
            if let Err(err) = app.repository.refresh().await {
                tracing::warn!(error = %err, "refresh failed; showing last known list");
            }
            print_sightings(&app.repository.snapshot().await);
        }
        Command::Report {
            photo,
            location,
            species,
            count,
            notes,
        } => {
            let session = app.require_session()?;
            let bytes = std::fs::read(&photo)
                .with_context(|| format!("failed to read photo {}", photo.display()))?;
            let draft = SightingDraft {
                species: species.unwrap_or_default(),
                location,
                count,
                notes: notes.unwrap_or_default(),
                photo: Some(CapturedPhoto {
                    bytes,
                    content_type: content_type_for(&photo).to_string(),
                }),
            };
            app.repository.create(&session, draft).await?;
            println!("sighting reported");
        }
        Command::Comment {
            sighting_id,
            text,
            author,
        } => {
            let session = app.require_session()?;
            app.repository.refresh().await.ok();
            app.repository
                .add_comment(&session, &sighting_id, author, &text)
                .await?;
            println!("comment added");
        }
        Command::Uncomment { comment_id } => {
            let session = app.require_session()?;
            app.repository.refresh().await.ok();
            app.repository.delete_comment(&session, &comment_id).await?;
            println!("comment deleted");
        }
        Command::Delete { sighting_id } => {
            let session = app.require_session()?;
            app.repository.refresh().await.ok();
            app.repository.delete(&session, &sighting_id).await?;
            println!("sighting deleted");
        }
        Command::Dictionary => {
            let entries = app.species.list().await?;
            for entry in entries {
                println!("{} ({})", entry.name, entry.sci_name);
                if let Some(habitat) = entry.habitat {
                    println!("  habitat: {habitat}");
                }
                if let Some(image) = entry.image {
                    println!("  image: {image}");
                }
            }
        }
    }

    Ok(())
}

fn print_sightings(sightings: &[birdify_core::models::Sighting]) {
    if sightings.is_empty() {
        println!("no sightings reported yet");
        return;
    }
    for sighting in sightings {
        let owner = sighting
            .owner
            .as_ref()
            .map(|profile| format!("@{}", profile.username))
            .or_else(|| sighting.owner_id.clone())
            .unwrap_or_else(|| "anonymous".to_string());
        println!(
            "[{}] {} at {} ({} {}) x{} by {}",
            sighting.id,
            sighting.species,
            sighting.location,
            sighting.date,
            sighting.time,
            sighting.count,
            owner,
        );
        if let Some(url) = &sighting.photo_url {
            println!("    photo: {url}");
        }
        if let Some(notes) = &sighting.notes {
            println!("    notes: {notes}");
        }
        for comment in &sighting.comments {
            println!("    [{}] {}: {}", comment.id, comment.author, comment.text);
        }
    }
}

fn content_type_for(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        // the capture device produces jpegs; treat unknowns the same way
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::content_type_for;
    use std::path::Path;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a")), "image/jpeg");
    }
}
