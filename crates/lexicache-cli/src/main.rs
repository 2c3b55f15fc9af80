//! lexicache - terminal front-end for the dictionary.
//!
//! Loads categories, words and texts through the offline-first tiers of
//! `lexicache-core` and prints them. Admin commands mutate the backend with
//! the token obtained by `lexicache login`.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lexicache_core::utils::truncate;
use lexicache_core::{AppMode, Config, DataSource, Lexicache, MediaFile, SettingsPatch};

// ============================================================================
// Constants
// ============================================================================

/// Directory for a daily rolling log file, in addition to stderr
const ENV_LOG_DIR: &str = "LEXICACHE_LOG_DIR";

const LOG_FILE_PREFIX: &str = "lexicache.log";

/// Characters of text content shown in listings
const PREVIEW_LENGTH: usize = 60;

const USAGE: &str = "\
Usage: lexicache <command> [args]

Commands:
  sync                      Load dictionary and texts, report where they came from
  words [filter]            List words by category, or those matching a filter
  texts                     List reading texts
  settings [--dark on|off] [--font 1-5]
                            Show or change settings
  login [email]             Sign in (password may be kept in the OS keychain)
  register <name> <email>   Create an account and sign in
  logout                    Forget the session token and stored password
  mode [user|admin|reset]   Show or change the app mode
  refresh-categories        Fetch only the category list
  add-category <name>       Create a category (admin)
  delete-word <id>          Delete a word (admin)
  attach <word-id> <file>...
                            Upload media files to a word (admin)
  delete-text <id>          Delete a text (admin)";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(ENV_LOG_DIR).ok().filter(|d| !d.trim().is_empty()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    let mut config = Config::load()?;
    let app = Lexicache::open(config.clone())?;
    info!(command = %command, "lexicache starting");

    match command.as_str() {
        "sync" => sync(&app).await,
        "words" => words(&app, rest.first().map(String::as_str)).await,
        "texts" => texts(&app).await,
        "settings" => settings(&app, rest),
        "login" => login(&app, &mut config, rest.first().cloned()).await,
        "register" => register(&app, &mut config, rest).await,
        "logout" => {
            app.auth().logout()?;
            if let Some(ref email) = config.last_email {
                app.auth().forget_password(email)?;
            }
            println!("Signed out.");
            Ok(())
        }
        "mode" => mode(&app, rest.first().map(String::as_str)),
        "refresh-categories" => {
            let categories = app.dictionary().refresh_categories().await?;
            println!("{} categories.", categories.len());
            Ok(())
        }
        "add-category" => {
            let name = required(rest, 0, "category name")?;
            let categories = app.dictionary().create_category(name).await?;
            println!("Created. {} categories.", categories.len());
            Ok(())
        }
        "delete-word" => {
            let id = parse_id(required(rest, 0, "word id")?)?;
            app.dictionary().delete_word(id).await?;
            println!("Deleted word {}.", id);
            Ok(())
        }
        "attach" => {
            let id = parse_id(required(rest, 0, "word id")?)?;
            let files = rest[1..]
                .iter()
                .map(|path| MediaFile::from_path(Path::new(path)))
                .collect::<Result<Vec<_>>>()?;
            if files.is_empty() {
                bail!("Missing files to attach\n\n{}", USAGE);
            }
            app.dictionary().add_attachments(id, &files).await?;
            println!("Attached {} file(s) to word {}.", files.len(), id);
            Ok(())
        }
        "delete-text" => {
            let id = parse_id(required(rest, 0, "text id")?)?;
            app.texts().delete_text(id).await?;
            println!("Deleted text {}.", id);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn sync(app: &Lexicache) -> Result<()> {
    let (dictionary, texts) = tokio::join!(app.dictionary().load(), app.texts().load());

    let state = app.dictionary().snapshot();
    println!(
        "Dictionary: {} categories, {} words ({})",
        state.categories.len(),
        state.words.len(),
        describe_source(dictionary, state.fetched_at)
    );
    let state = app.texts().snapshot();
    println!(
        "Texts: {} ({})",
        state.texts.len(),
        describe_source(texts, state.fetched_at)
    );

    let ages = app.cache_ages();
    println!("Last fetch: dictionary {}, texts {}", ages.dictionary_age(), ages.texts_age());
    Ok(())
}

async fn words(app: &Lexicache, filter: Option<&str>) -> Result<()> {
    let source = app.dictionary().load().await;
    if source != DataSource::Remote {
        eprintln!("(showing {} data)", source.label());
    }

    if let Some(query) = filter {
        for word in app.dictionary().filter_words(query) {
            println!("{:>6}  {}  {}", word.id, word.word, word.meaning);
        }
        return Ok(());
    }

    let state = app.dictionary().snapshot();
    let dictionary = state.dictionary();
    for category in dictionary.sorted_categories() {
        let words = state.words_in(category.id);
        println!("{} ({})", category.name, words.len());
        for word in words {
            match word.translation {
                Some(ref translation) => println!("  {:>6}  {} - {}", word.id, word.word, translation),
                None => println!("  {:>6}  {}", word.id, word.word),
            }
        }
    }
    Ok(())
}

async fn texts(app: &Lexicache) -> Result<()> {
    let source = app.texts().load().await;
    if source != DataSource::Remote {
        eprintln!("(showing {} data)", source.label());
    }

    for text in app.texts().snapshot().texts {
        let cover = if text.has_cover() { "  [cover]" } else { "" };
        println!("{:>4}  {}{}", text.id, text.title, cover);
        if !text.subtitle.is_empty() {
            println!("      {}", text.subtitle);
        }
        println!("      {}", truncate(&text.content, PREVIEW_LENGTH));
    }
    Ok(())
}

fn settings(app: &Lexicache, args: &[String]) -> Result<()> {
    let mut patch = SettingsPatch::default();
    let mut args = args.iter();
    while let Some(flag) = args.next() {
        let value = args
            .next()
            .ok_or_else(|| anyhow!("Missing value for {}", flag))?;
        match flag.as_str() {
            "--dark" => {
                patch.dark_mode = Some(match value.as_str() {
                    "on" | "true" => true,
                    "off" | "false" => false,
                    other => bail!("Expected on or off for --dark, got {}", other),
                })
            }
            "--font" => {
                patch.font_size = Some(value.parse().with_context(|| format!("Invalid font size: {}", value))?)
            }
            other => bail!("Unknown settings flag: {}", other),
        }
    }

    let current = if patch == SettingsPatch::default() {
        app.settings().settings()
    } else {
        app.settings().update(patch)
    };
    println!(
        "Dark mode: {}\nFont size: {} (x{:.1})",
        if current.dark_mode { "on" } else { "off" },
        current.font_size.level(),
        current.font_size.scale_factor()
    );
    Ok(())
}

async fn login(app: &Lexicache, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };

    let password = match app.auth().remembered_password(&email) {
        Some(stored) if prompt("Use stored password? [Y/n]: ")?.to_lowercase() != "n" => stored,
        _ => rpassword::prompt_password("Password: ")?,
    };

    println!("Authenticating...");
    app.auth().login(&email, &password).await?;
    remember(app, config, &email, &password)?;
    println!("Login successful.");
    Ok(())
}

async fn register(app: &Lexicache, config: &mut Config, args: &[String]) -> Result<()> {
    let name = required(args, 0, "name")?;
    let email = required(args, 1, "email")?;
    let password = rpassword::prompt_password("Password: ")?;

    app.auth().register(name, email, &password).await?;
    remember(app, config, email, &password)?;
    println!("Registered and signed in.");
    Ok(())
}

fn mode(app: &Lexicache, arg: Option<&str>) -> Result<()> {
    match arg {
        None => {}
        Some("reset") => app.auth().reset_mode()?,
        Some(value) => {
            let mode = AppMode::parse(value).ok_or_else(|| anyhow!("Unknown mode: {}", value))?;
            app.auth().set_mode(mode)?;
        }
    }

    let auth = app.auth();
    println!(
        "Mode: {}{}",
        auth.mode().as_str(),
        if auth.is_privileged() { " (privileged)" } else { "" }
    );
    if auth.mode() == AppMode::Admin && !auth.is_authenticated() {
        eprintln!("Admin mode needs a login before it takes effect.");
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn remember(app: &Lexicache, config: &mut Config, email: &str, password: &str) -> Result<()> {
    if let Err(e) = app.auth().remember_password(email, password) {
        eprintln!("Could not save password to keychain: {:#}", e);
    }
    config.last_email = Some(email.to_string());
    config.save()
}

fn describe_source(source: DataSource, fetched_at: Option<DateTime<Utc>>) -> String {
    match fetched_at {
        Some(at) => format!(
            "{}, fetched {}",
            source.label(),
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ),
        None => source.label().to_string(),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn required<'a>(args: &'a [String], index: usize, what: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing {}\n\n{}", what, USAGE))
}

fn parse_id(value: &str) -> Result<i64> {
    value
        .parse()
        .with_context(|| format!("Invalid id: {}", value))
}
