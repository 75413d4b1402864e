//! CLI interface for sparck

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::rngs::ThreadRng;
use std::path::PathBuf;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::progress::{self, ProgressSummary};
use crate::session::ChatSession;
use crate::state::{FileSlot, StateDocument, StateStore};
use crate::tutor::CorrectionEngine;
use crate::types::Role;

type CliSession = ChatSession<FileSlot, SystemClock, ThreadRng>;

#[derive(Parser)]
#[command(name = "sparck")]
#[command(about = "Local French practice companion with streaks and instant corrections", long_about = None)]
#[command(version)]
struct Cli {
    /// Use this state file instead of the configured one
    #[arg(long, global = true, env = "SPARCK_STATE")]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Practice with the tutor (default when no command given)
    Chat,
    /// Send a single message and print the reply
    Say {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Mark today's lesson as completed
    Lesson,
    /// Show profile, streak and the latest corrections
    Dashboard,
    /// Show the full correction log
    Progress,
    /// Reset progress (streak, sessions, chat and corrections)
    Reset {
        /// Only clear the chat transcript
        #[arg(long)]
        chat_only: bool,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Export all state as JSON
    Export {
        /// Output file
        #[arg(default_value = progress::EXPORT_FILE_NAME)]
        path: PathBuf,
    },
    /// Create a local account
    Signup {
        /// Display name
        #[arg(short, long, default_value = "")]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "SPARCK_PASSWORD")]
        password: String,
    },
    /// Log in to a local account
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "SPARCK_PASSWORD")]
        password: String,
    },
    /// Log out
    Logout,
    /// Show or edit the learner profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        /// Level label, e.g. A2
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        goal: Option<String>,
        /// Daily practice target in minutes
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    let state_path = match cli.state {
        Some(path) => path,
        None => config.state_path()?,
    };
    let store = StateStore::at_path(&state_path);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            require_login(&config, &store)?;
            let session = build_session(&config, state_path)?;
            run_chat(session).await?;
        }
        Commands::Say { text } => {
            require_login(&config, &store)?;
            let mut session = build_session(&config, state_path)?;
            match session.submit_user_message(&text.join(" ")).await? {
                Some(exchange) => {
                    println!("{}", exchange.assistant_entry.content);
                    if !exchange.logged.is_empty() {
                        println!("\n(logged {} correction(s))", exchange.logged.len());
                    }
                }
                None => println!("Nothing to send."),
            }
        }
        Commands::Lesson => {
            require_login(&config, &store)?;
            let session = build_session(&config, state_path)?;
            session.complete_lesson()?;
            let doc = session.store().load();
            println!("Lesson completed ✅ Progress updated");
            println!("  streak:   {} days", doc.streak());
            println!("  sessions: {}", doc.sessions_completed);
        }
        Commands::Dashboard => {
            require_login(&config, &store)?;
            show_dashboard(&store.load(), config.tutor.recent_mistakes);
        }
        Commands::Progress => {
            require_login(&config, &store)?;
            show_progress(&store.load());
        }
        Commands::Reset { chat_only, yes } => {
            require_login(&config, &store)?;
            let session = build_session(&config, state_path)?;
            if chat_only {
                session.reset_chat()?;
                println!("Chat reset ✅");
            } else {
                if !yes && !confirm("This clears your streak, sessions, chat and corrections. Type 'yes' to confirm:")? {
                    println!("Cancelled.");
                    return Ok(());
                }
                session.reset_progress()?;
                println!("Progress reset ✅");
            }
        }
        Commands::Export { path } => {
            progress::write_export(&store, &path)?;
            println!("Exported state to {}", path.display());
        }
        Commands::Signup { name, email, password } => {
            crate::auth::sign_up_in(&store, &name, &email, &password)?;
            println!("Account created ✅ Welcome, {}!", store.load().profile.name);
        }
        Commands::Login { email, password } => {
            crate::auth::log_in_to(&store, &email, &password)?;
            println!("Logged in ✅ Bonjour, {}!", store.load().profile.name);
        }
        Commands::Logout => {
            crate::auth::log_out_of(&store)?;
            println!("Logged out ✅");
        }
        Commands::Profile { name, level, goal, minutes } => {
            let doc = store.update(|doc| {
                if let Some(name) = name {
                    doc.profile.name = name;
                }
                if let Some(level) = level {
                    doc.profile.level = level;
                }
                if let Some(goal) = goal {
                    doc.profile.goal = goal;
                }
                if let Some(minutes) = minutes {
                    doc.profile.daily_minutes = minutes;
                }
                doc.clone()
            })?;
            print_profile(&doc);
        }
        Commands::Config { show } => {
            if show {
                crate::config::show_config()?;
            } else {
                println!("Configuration file: {}", crate::config::config_path()?.display());
                println!("Use 'sparck config --show' to display current values.");
                println!();
                println!("Defaults:");
                println!("{}", crate::config::default_config_toml());
            }
        }
    }

    Ok(())
}

fn build_session(config: &Config, state_path: PathBuf) -> Result<CliSession> {
    let engine = CorrectionEngine::from_config(&config.tutor)?;
    Ok(ChatSession::new(StateStore::at_path(state_path), SystemClock, engine, rand::rng())
        .with_reply_delay(config.tutor.reply_delay()))
}

fn require_login(config: &Config, store: &StateStore) -> Result<()> {
    if config.auth.require_login && !crate::auth::is_logged_in(&store.load()) {
        bail!("Not logged in. Run 'sparck signup' or 'sparck login' first.");
    }
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    println!("{}", question);
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("yes"))
}

/// Interactive practice loop
async fn run_chat(mut session: CliSession) -> Result<()> {
    let doc = session.open()?;
    println!("Practice: type your message, '/reset' to clear the chat, Ctrl-D to leave.");
    println!();
    let shown = doc.chat_log.len().saturating_sub(10);
    for entry in &doc.chat_log[shown..] {
        println!("{}: {}", entry.role, entry.content);
        println!();
    }

    let mut rl = rustyline::DefaultEditor::new()?;

    loop {
        match rl.readline("\x1b[32m❯\x1b[0m ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);

                match input {
                    "/quit" | "/exit" => break,
                    "/reset" => {
                        session.reset_chat()?;
                        let doc = session.open()?;
                        println!("Chat reset ✅");
                        if let Some(greeting) = doc.chat_log.first() {
                            println!("{}: {}", Role::Assistant, greeting.content);
                        }
                        println!();
                        continue;
                    }
                    _ => {}
                }

                println!("…");
                match session.submit_user_message(input).await {
                    Ok(Some(exchange)) => {
                        println!("{}: {}", Role::Assistant, exchange.assistant_entry.content);
                        if !exchange.logged.is_empty() {
                            println!("(logged {} correction(s) ✅)", exchange.logged.len());
                        }
                        println!();
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("✗ Error: {:#}", e),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("À bientôt !");
                break;
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    Ok(())
}

fn print_profile(doc: &StateDocument) {
    println!("{}", doc.profile.name);
    println!("  level: {}", doc.profile.level);
    println!("  goal:  {}", doc.profile.goal);
    println!("  daily: {} min", doc.profile.daily_minutes);
}

fn show_dashboard(doc: &StateDocument, recent_limit: usize) {
    let summary = ProgressSummary::from_doc(doc, recent_limit);
    let now = Utc::now();

    print_profile(doc);
    println!();
    println!("Streak:      {} days", summary.streak);
    println!("Corrections: {}", summary.corrections);
    println!("Sessions:    {}", summary.sessions_completed);
    println!();
    println!("Recent corrections");
    if summary.recent.is_empty() {
        println!("  No mistakes yet. Start practicing to generate corrections.");
    }
    for m in &summary.recent {
        println!("  {} · {}", m.category, progress::time_ago(m.timestamp, now));
        println!("    {} → {}", m.original, m.corrected);
    }
}

fn show_progress(doc: &StateDocument) {
    let summary = ProgressSummary::from_doc(doc, 0);
    let now = Utc::now();

    println!("Streak:      {} days", summary.streak);
    println!("Corrections: {}", summary.corrections);
    println!("Sessions:    {}", summary.sessions_completed);
    println!();

    let log = progress::mistakes_newest_first(doc);
    if log.is_empty() {
        println!("No mistakes logged yet. Run 'sparck chat' and send a message.");
        return;
    }
    for m in log {
        println!("{} · {}", m.category, progress::time_ago(m.timestamp, now));
        println!("  {} → {}", m.original, m.corrected);
        if !m.explanation.is_empty() {
            println!("  {}", m.explanation);
        }
        println!();
    }
}
