//! Seodang CLI - terminal client for the Seodang study companion API.
//!
//! Sessions persist in the OS keychain, so `seodang login` once and every
//! later invocation picks the token back up.

mod auth;

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use seodang_core::models::{
    CalendarEvent, Doc, Friend, NewEvent, NewNote, NewPost, Note, Post, PostFilters, UploadFile,
};
use seodang_core::{config, SeodangClient, TokenStore};
use thiserror::Error;

use crate::auth::KeyringTokenStore;

#[derive(Parser)]
#[command(name = "seodang")]
#[command(about = "Study companion from the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL (defaults to $SEODANG_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token in the keychain
    Login {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Clear the stored session token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Personal study notes
    Notes {
        #[command(subcommand)]
        command: NotesCommands,
    },
    /// Community board posts
    Posts {
        #[command(subcommand)]
        command: PostsCommands,
    },
    /// Calendar events
    Events {
        #[command(subcommand)]
        command: EventsCommands,
    },
    /// Uploaded documents
    Docs {
        #[command(subcommand)]
        command: DocsCommands,
    },
    /// Friend list
    Friends {
        #[command(subcommand)]
        command: FriendsCommands,
    },
}

#[derive(Subcommand)]
enum NotesCommands {
    /// List notes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a note
    New {
        /// Note title
        #[arg(long, value_name = "TITLE")]
        title: String,
        /// Note body
        #[arg(long, value_name = "TEXT")]
        content: String,
    },
    /// Delete a note
    Rm {
        /// Note ID
        id: String,
    },
}

#[derive(Subcommand)]
enum PostsCommands {
    /// List posts, optionally filtered
    List {
        /// Free-text search query
        #[arg(short, long, value_name = "TEXT")]
        query: Option<String>,
        /// Category label (전체 lists everything)
        #[arg(short, long, value_name = "NAME")]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Publish a post
    New {
        /// Post title
        #[arg(long, value_name = "TITLE")]
        title: String,
        /// Post body
        #[arg(long, value_name = "TEXT")]
        content: String,
        /// Category label
        #[arg(long, value_name = "NAME")]
        category: String,
    },
}

#[derive(Subcommand)]
enum EventsCommands {
    /// List events
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an event
    New {
        /// Event title
        #[arg(long, value_name = "TITLE")]
        title: String,
        /// Start timestamp (ISO 8601)
        #[arg(long, value_name = "WHEN")]
        start: String,
        /// End timestamp (ISO 8601)
        #[arg(long, value_name = "WHEN")]
        end: String,
        /// Optional description
        #[arg(long, value_name = "TEXT")]
        description: Option<String>,
        /// Optional meeting place
        #[arg(long, value_name = "TEXT")]
        place: Option<String>,
    },
    /// Delete an event
    Rm {
        /// Event ID
        id: String,
    },
}

#[derive(Subcommand)]
enum DocsCommands {
    /// List documents
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload a file
    Upload {
        /// Path to the file
        path: PathBuf,
        /// Display title (defaults to the file name)
        #[arg(long, value_name = "TITLE")]
        title: Option<String>,
        /// MIME type override
        #[arg(long, value_name = "TYPE")]
        mime: Option<String>,
    },
    /// Delete a document
    Rm {
        /// Document ID
        id: String,
    },
}

#[derive(Subcommand)]
enum FriendsCommands {
    /// List friends
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a friend by account email
    Add {
        /// Friend's account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
    },
    /// Remove a friend
    Rm {
        /// Friend ID
        id: String,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] seodang_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Not signed in. Run `seodang login` first.")]
    NotSignedIn,
    #[error("{0}")]
    Refresh(String),
    #[error("Could not detect the file type of {0}; pass --mime")]
    UnknownMime(String),
    #[error("File name could not be determined from path: {0}")]
    InvalidFileName(String),
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("seodang=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let client = build_client(cli.api_url)?;

    match cli.command {
        Commands::Login { email, password } => run_login(&client, &email, &password).await,
        Commands::Logout => run_logout(&client),
        command => {
            client.bootstrap().await;
            match command {
                Commands::Login { .. } | Commands::Logout => unreachable!(),
                Commands::Whoami => run_whoami(&client),
                Commands::Notes { command } => run_notes(&client, command).await,
                Commands::Posts { command } => run_posts(&client, command).await,
                Commands::Events { command } => run_events(&client, command).await,
                Commands::Docs { command } => run_docs(&client, command).await,
                Commands::Friends { command } => run_friends(&client, command).await,
            }
        }
    }
}

fn build_client(api_url: Option<String>) -> Result<SeodangClient, CliError> {
    let base_url = config::resolve_base_url(api_url, env::var(config::API_URL_ENV).ok());
    tracing::debug!(%base_url, "resolved API base URL");
    let tokens: Arc<dyn TokenStore> = Arc::new(KeyringTokenStore::new());
    Ok(SeodangClient::connect(&base_url, tokens)?)
}

fn require_sign_in(client: &SeodangClient) -> Result<(), CliError> {
    if client.session.token().is_none() {
        return Err(CliError::NotSignedIn);
    }
    Ok(())
}

fn check_refresh(error: Option<String>) -> Result<(), CliError> {
    error.map_or(Ok(()), |message| Err(CliError::Refresh(message)))
}

async fn run_login(client: &SeodangClient, email: &str, password: &str) -> Result<(), CliError> {
    let user = client.session.sign_in(email, password).await?;
    println!("Signed in as {} <{}>", user.name, user.email);
    Ok(())
}

fn run_logout(client: &SeodangClient) -> Result<(), CliError> {
    client.session.sign_out()?;
    println!("Signed out");
    Ok(())
}

fn run_whoami(client: &SeodangClient) -> Result<(), CliError> {
    match client.session.user() {
        Some(user) => println!("{} <{}>", user.name, user.email),
        None => println!("Not signed in"),
    }
    Ok(())
}

async fn run_notes(client: &SeodangClient, command: NotesCommands) -> Result<(), CliError> {
    match command {
        NotesCommands::List { json } => {
            require_sign_in(client)?;
            client.notes.refresh().await;
            check_refresh(client.notes.error())?;
            print_listing(&client.notes.notes(), json, format_note_lines)
        }
        NotesCommands::New { title, content } => {
            let note = client.notes.create(NewNote { title, content }).await?;
            println!("{}", note.id);
            Ok(())
        }
        NotesCommands::Rm { id } => {
            client.notes.remove(&id).await?;
            println!("{id}");
            Ok(())
        }
    }
}

async fn run_posts(client: &SeodangClient, command: PostsCommands) -> Result<(), CliError> {
    match command {
        PostsCommands::List {
            query,
            category,
            json,
        } => {
            client
                .board
                .refresh(Some(PostFilters { q: query, category }))
                .await;
            check_refresh(client.board.error())?;
            print_listing(&client.board.posts(), json, format_post_lines)
        }
        PostsCommands::New {
            title,
            content,
            category,
        } => {
            let post = client
                .board
                .add(NewPost {
                    title,
                    content,
                    category,
                    author_name: None,
                })
                .await?;
            println!("{}", post.id);
            Ok(())
        }
    }
}

async fn run_events(client: &SeodangClient, command: EventsCommands) -> Result<(), CliError> {
    match command {
        EventsCommands::List { json } => {
            require_sign_in(client)?;
            client.calendar.refresh().await;
            check_refresh(client.calendar.error())?;
            print_listing(&client.calendar.events(), json, format_event_lines)
        }
        EventsCommands::New {
            title,
            start,
            end,
            description,
            place,
        } => {
            let event = client
                .calendar
                .add(NewEvent {
                    title,
                    description,
                    participants: None,
                    place,
                    supplies: None,
                    remarks: None,
                    start,
                    end,
                })
                .await?;
            println!("{}", event.id);
            Ok(())
        }
        EventsCommands::Rm { id } => {
            client.calendar.remove(&id).await?;
            println!("{id}");
            Ok(())
        }
    }
}

async fn run_docs(client: &SeodangClient, command: DocsCommands) -> Result<(), CliError> {
    match command {
        DocsCommands::List { json } => {
            require_sign_in(client)?;
            client.docs.refresh().await;
            check_refresh(client.docs.error())?;
            print_listing(&client.docs.docs(), json, format_doc_lines)
        }
        DocsCommands::Upload { path, title, mime } => run_upload(client, &path, title, mime).await,
        DocsCommands::Rm { id } => {
            client.docs.remove(&id).await?;
            println!("{id}");
            Ok(())
        }
    }
}

async fn run_upload(
    client: &SeodangClient,
    path: &Path,
    title: Option<String>,
    mime: Option<String>,
) -> Result<(), CliError> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToString::to_string)
        .ok_or_else(|| CliError::InvalidFileName(path.display().to_string()))?;
    let mime = match mime {
        Some(mime) => mime,
        None => guess_mime(&name)
            .ok_or_else(|| CliError::UnknownMime(name.clone()))?
            .to_string(),
    };

    let doc = client
        .docs
        .upload(UploadFile { name, mime, bytes }, title)
        .await?;
    println!("{}", doc.id);
    Ok(())
}

async fn run_friends(client: &SeodangClient, command: FriendsCommands) -> Result<(), CliError> {
    match command {
        FriendsCommands::List { json } => {
            require_sign_in(client)?;
            client.friends.refresh().await;
            check_refresh(client.friends.error())?;
            print_listing(&client.friends.friends(), json, format_friend_lines)
        }
        FriendsCommands::Add { email } => {
            let friend = client.friends.add_friend(&email).await?;
            println!("{} <{}>", friend.name, friend.email);
            Ok(())
        }
        FriendsCommands::Rm { id } => {
            client.friends.remove_friend(&id).await?;
            println!("{id}");
            Ok(())
        }
    }
}

fn print_listing<T: serde::Serialize>(
    items: &[T],
    as_json: bool,
    format: fn(&[T]) -> Vec<String>,
) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(items)?);
    } else {
        for line in format(items) {
            println!("{line}");
        }
    }
    Ok(())
}

fn format_note_lines(notes: &[Note]) -> Vec<String> {
    notes
        .iter()
        .map(|note| {
            format!(
                "{:<12}  {:<24}  {}",
                note.id,
                preview(&note.title, 24),
                preview(&note.content, 40)
            )
        })
        .collect()
}

fn format_post_lines(posts: &[Post]) -> Vec<String> {
    posts
        .iter()
        .map(|post| {
            let author = post.author_name.as_deref().unwrap_or("-");
            format!(
                "{:<12}  [{}]  {:<40}  {author}",
                post.id,
                post.category,
                preview(&post.title, 40)
            )
        })
        .collect()
}

fn format_event_lines(events: &[CalendarEvent]) -> Vec<String> {
    events
        .iter()
        .map(|event| {
            format!(
                "{:<12}  {} ~ {}  {}",
                event.id,
                event.start,
                event.end,
                preview(&event.title, 40)
            )
        })
        .collect()
}

fn format_doc_lines(docs: &[Doc]) -> Vec<String> {
    docs.iter()
        .map(|doc| {
            format!(
                "{:<12}  {:>9}  {:<32}  {}",
                doc.id,
                format_size(doc.size),
                preview(&doc.title, 32),
                doc.original_name
            )
        })
        .collect()
}

fn format_friend_lines(friends: &[Friend]) -> Vec<String> {
    friends
        .iter()
        .map(|friend| format!("{:<12}  {:<16}  {}", friend.id, friend.name, friend.email))
        .collect()
}

/// First line of `text`, whitespace collapsed, truncated to `max_chars`.
fn preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;

    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    }
}

fn guess_mime(file_name: &str) -> Option<&'static str> {
    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "txt" => Some("text/plain"),
        "md" => Some("text/markdown"),
        "zip" => Some("application/zip"),
        "hwp" => Some("application/x-hwp"),
        "doc" => Some("application/msword"),
        "docx" => {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        "ppt" => Some("application/vnd.ms-powerpoint"),
        "pptx" => {
            Some("application/vnd.openxmlformats-officedocument.presentationml.presentation")
        }
        "xls" => Some("application/vnd.ms-excel"),
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        _ => None,
    }
}
