use clap::Parser;
use notenet::app::NotesApp;
use notenet::config::KEYS;
use notenet::error::{NotesError, Result};
use notenet::init::{initialize, resolve_data_dir, NotenetContext, HOME_ENV};
use notenet::logging::init_logging;
use notenet::model::{DocId, Seed};
use notenet::network::fs::FileNetwork;
use notenet::provision::provision;
use notenet::state::{AuthState, DraftStatus, Navigation, NoteLoadingStatus, NoteSavingStatus, State};
use std::path::PathBuf;

mod cli;
use cli::print::{print_message, print_note, print_notes, MessageLevel};
use cli::setup::{Cli, Commands, Identity};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = resolve_data_dir(std::env::var_os(HOME_ENV).map(PathBuf::from))?;
    let ctx = initialize(&data_dir)?;
    init_logging(cli.verbose, &ctx.config.log_filter);

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Seed => handle_seed(),
        Commands::Provision { seed, out } => runtime.block_on(handle_provision(&ctx, seed, out)),
        Commands::List { identity } => runtime.block_on(handle_list(&ctx, &identity)),
        Commands::New {
            title,
            text,
            identity,
        } => runtime.block_on(handle_new(&ctx, &identity, title, text.join(" "))),
        Commands::View { note, identity } => runtime.block_on(handle_view(&ctx, &identity, &note)),
        Commands::Edit {
            note,
            text,
            identity,
        } => runtime.block_on(handle_edit(&ctx, &identity, &note, text.join(" "))),
        Commands::Config { key, value } => handle_config(ctx, key, value),
    }
}

/// Authenticate and wait for the index to arrive.
async fn signed_in(ctx: &NotenetContext, identity: &Identity) -> Result<NotesApp<FileNetwork>> {
    let seed = identity.seed()?;
    let mut app = ctx.app()?;
    app.authenticate(seed);
    app.settle().await;

    match app.state().auth {
        AuthState::Authenticated(_) => Ok(app),
        _ => Err(NotesError::Network(
            "Authentication failed (run with -v for details)".to_string(),
        )),
    }
}

/// A list position (1-based, as printed by `list`) or a document id.
fn resolve_note(state: &State, note: &str) -> Result<DocId> {
    if let Ok(n) = note.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| state.notes.iter().nth(i))
            .map(|(id, _)| id.clone())
            .ok_or_else(|| NotesError::DocumentNotFound(format!("no note at position {}", n)));
    }
    note.parse()
}

fn handle_seed() -> Result<()> {
    println!("{}", Seed::random().to_hex());
    Ok(())
}

async fn handle_provision(
    ctx: &NotenetContext,
    seed: Option<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    let seed: Seed = seed
        .as_deref()
        .ok_or_else(|| NotesError::InvalidSeed("no seed given (use --seed or SEED)".to_string()))?
        .parse()?;

    let aliases = provision(&ctx.network, &seed).await?;
    let path = out.unwrap_or_else(|| ctx.paths.model_file());
    aliases.save(&path)?;

    println!("{}", serde_json::to_string_pretty(&aliases)?);
    print_message(
        MessageLevel::Success,
        &format!("Model aliases written to {}", path.display()),
    );
    Ok(())
}

async fn handle_list(ctx: &NotenetContext, identity: &Identity) -> Result<()> {
    let app = signed_in(ctx, identity).await?;
    print_notes(&app.state().notes);
    Ok(())
}

async fn handle_new(ctx: &NotenetContext, identity: &Identity, title: String, text: String) -> Result<()> {
    let mut app = signed_in(ctx, identity).await?;
    app.open_draft();
    app.save_draft(&title, &text)?;
    app.settle().await;

    match (&app.state().nav, app.state().draft_status) {
        (Navigation::Note(id), DraftStatus::Unsaved) => {
            print_message(MessageLevel::Success, &format!("Created note: {}", title));
            print_message(MessageLevel::Info, id.as_str());
            Ok(())
        }
        _ => Err(NotesError::Network(
            "Could not save the note (run with -v for details)".to_string(),
        )),
    }
}

async fn handle_view(ctx: &NotenetContext, identity: &Identity, note: &str) -> Result<()> {
    let mut app = signed_in(ctx, identity).await?;
    let id = resolve_note(app.state(), note)?;
    app.open_note(id.clone())?;
    app.settle().await;

    let state = app.state();
    match state.notes.get(&id) {
        Some(entry) if entry.doc().is_some() => {
            print_note(&id, entry, &state.placeholder_text);
            Ok(())
        }
        Some(entry) if entry.loading_status() == Some(NoteLoadingStatus::LoadingFailed) => Err(
            NotesError::Network(format!("Could not load note {}", id)),
        ),
        _ => Err(NotesError::DocumentNotFound(id.to_string())),
    }
}

async fn handle_edit(ctx: &NotenetContext, identity: &Identity, note: &str, text: String) -> Result<()> {
    let mut app = signed_in(ctx, identity).await?;
    let id = resolve_note(app.state(), note)?;
    app.open_note(id.clone())?;
    app.settle().await;

    let entry = app
        .state()
        .notes
        .get(&id)
        .ok_or_else(|| NotesError::DocumentNotFound(id.to_string()))?;
    let doc = entry
        .doc()
        .cloned()
        .ok_or_else(|| NotesError::Network(format!("Could not load note {}", id)))?;
    if entry.text().as_deref() == Some(text.as_str()) {
        print_message(MessageLevel::Warning, "Text unchanged, nothing to save.");
        return Ok(());
    }

    app.save_note(doc, &text)?;
    app.settle().await;

    let entry = app.state().notes.get(&id);
    match entry.and_then(|e| e.saving_status()) {
        Some(NoteSavingStatus::Saved) => {
            let title = entry.map(|e| e.title()).unwrap_or_default();
            print_message(MessageLevel::Success, &format!("Saved note: {}", title));
            Ok(())
        }
        _ => Err(NotesError::Network(
            "Could not save the note (run with -v for details)".to_string(),
        )),
    }
}

fn handle_config(ctx: NotenetContext, key: Option<String>, value: Option<String>) -> Result<()> {
    let mut config = ctx.config;
    match (key, value) {
        (None, _) => {
            for key in KEYS {
                if let Some(value) = config.get(key) {
                    println!("{} = {}", key, value);
                }
            }
        }
        (Some(key), None) => match config.get(&key) {
            Some(value) => println!("{} = {}", key, value),
            None => return Err(NotesError::Config(format!("Unknown config key: {}", key))),
        },
        (Some(key), Some(value)) => {
            config.set(&key, &value).map_err(NotesError::Config)?;
            config.save(&ctx.paths.data_dir)?;
            print_message(MessageLevel::Success, &format!("{} = {}", key, value));
        }
    }
    Ok(())
}
