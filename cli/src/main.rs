use std::fmt::Display;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use todo_core::{
    format_display_date, AccountClient, AccountSession, Category, ClientConfig, DeleteOutcome,
    Fallback, FileStorage, OpStatus, PasswordChange, Priority, ProfileImageStore, StaticToken,
    SyncError, TodoItem, TodoSession, TokenFile, TokenSource, UreqTransport,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "todo", version, about = "Manage your todo list on the remote todo API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API root. Defaults to TODO_API_BASE_URL, then the public server.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token. Defaults to the variable named by TODO_API_TOKEN_VAR,
    /// then to the token saved by `todo login`.
    #[arg(long, global = true)]
    token: Option<String>,

    /// Where `todo login` keeps the token.
    #[arg(long, global = true, default_value = ".todo/token.json")]
    token_file: PathBuf,

    /// Where the profile image reference is kept.
    #[arg(long, global = true, default_value = ".todo/profile.json")]
    profile_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show todos, optionally only those whose name contains SEARCH
    List {
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Add a new todo
    Add {
        name: String,
        #[arg(long, default_value_t = Category::Work)]
        category: Category,
        #[arg(long, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Due date as YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Change fields of an existing todo
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        #[arg(long)]
        clear_due: bool,
    },
    /// Flip a todo between done and not done
    Toggle { id: i64 },
    /// Delete a todo after confirmation
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Show or set the profile image
    ProfileImage {
        /// New image URL or path
        set: Option<String>,
    },
    /// Create an account
    Register {
        username: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Log in and remember the token for later commands
    Login {
        username: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the remembered token
    Logout,
    /// Show the logged-in profile
    Whoami,
    /// Change the display name
    Rename { full_name: String },
    /// Change the password; all three values are prompted for
    Passwd,
}

fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

type Session<'a> = TodoSession<UreqTransport, &'a dyn TokenSource>;
type Account<'a> = AccountSession<UreqTransport, &'a dyn TokenSource>;

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ClientConfig::from_env();
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    debug!(base_url = %config.base_url, "using API");

    let env_token = config.token_source();
    let static_token = cli.token.map(StaticToken::new);
    let explicit: &dyn TokenSource = match &static_token {
        Some(token) => {
            debug!("token from --token");
            token
        }
        None => {
            debug!(var = env_token.var(), "token from environment");
            &env_token
        }
    };
    let token_file = TokenFile::new(&cli.token_file);
    let chain = Fallback(explicit, &token_file);
    let tokens: &dyn TokenSource = &chain;

    match cli.command {
        Commands::List { search } => {
            let session = open_session(&config, tokens)?;
            let query = search.unwrap_or_default();
            print_table(session.filtered(&query));
        }
        Commands::Add {
            name,
            category,
            priority,
            due,
        } => {
            let mut session = open_session(&config, tokens)?;
            let draft = session.draft_mut();
            draft.name = name;
            draft.category = category;
            draft.priority = priority;
            draft.due_date = due;
            let result = session.add();
            settle(session.error(), result)?;
            println!("added; {} todos", session.list().len());
        }
        Commands::Edit {
            id,
            name,
            category,
            priority,
            due,
            clear_due,
        } => {
            let mut session = open_session(&config, tokens)?;
            let result = session.begin_edit(id);
            settle(session.error(), result)?;
            if let Some(item) = session.edit_mut() {
                if let Some(name) = name {
                    item.name = name;
                }
                if category.is_some() {
                    item.category = category;
                }
                if priority.is_some() {
                    item.priority = priority;
                }
                if due.is_some() || clear_due {
                    item.due_date = due;
                }
            }
            let result = session.save_edit();
            settle(session.error(), result)?;
            println!("updated #{id}");
        }
        Commands::Toggle { id } => {
            let mut session = open_session(&config, tokens)?;
            let result = session.toggle_complete(id);
            settle(session.error(), result)?;
            let done = session.list().get(id).is_some_and(|t| t.is_complete);
            println!("#{id} is now {}", if done { "done" } else { "open" });
        }
        Commands::Delete { id, yes } => {
            let mut session = open_session(&config, tokens)?;
            let result = session.delete(id, |item| yes || confirm(item));
            match settle(session.error(), result)? {
                DeleteOutcome::Deleted => println!("deleted #{id}"),
                DeleteOutcome::Declined => println!("kept #{id}"),
            }
        }
        Commands::ProfileImage { set } => profile_image(cli.profile_file, set)?,
        Commands::Register { username, password } => {
            let password = secret(password, "Password")?;
            let mut account = open_account(&config, tokens);
            let result = account.register(&username, &password);
            settle(account.error(), result)?;
            println!("registered {}; log in with `todo login {}`", username.trim(), username.trim());
        }
        Commands::Login { username, password } => {
            let password = secret(password, "Password")?;
            let mut account = open_account(&config, tokens);
            let result = account.login(&username, &password);
            let token = settle(account.error(), result)?;
            token_file
                .store(&token, Utc::now())
                .with_context(|| format!("saving token to {}", token_file.path().display()))?;
            println!("logged in as {}", username.trim());
        }
        Commands::Logout => {
            let removed = token_file
                .clear()
                .with_context(|| format!("removing {}", token_file.path().display()))?;
            println!("{}", if removed { "logged out" } else { "not logged in" });
        }
        Commands::Whoami => {
            let mut account = open_account(&config, tokens);
            let result = account.fetch_profile().cloned();
            let profile = settle(account.error(), result)?;
            println!("username:  {}", or_dash(profile.username.as_deref()));
            println!("full name: {}", or_dash(profile.full_name.as_deref().filter(|n| !n.is_empty())));
            if let Some(image) = profile.profile_image {
                let mut store = ProfileImageStore::open(FileStorage::new(&cli.profile_file));
                store
                    .set_image(image)
                    .with_context(|| format!("saving profile image to {}", cli.profile_file.display()))?;
            }
        }
        Commands::Rename { full_name } => {
            let mut account = open_account(&config, tokens);
            let result = account.update_full_name(&full_name);
            settle(account.error(), result)?;
            println!("name updated");
        }
        Commands::Passwd => {
            let change = PasswordChange {
                current_password: secret(None, "Current password")?,
                new_password: secret(None, "New password")?,
                confirm_password: secret(None, "Confirm new password")?,
            };
            let mut account = open_account(&config, tokens);
            let result = account.change_password(&change);
            settle(account.error(), result)?;
            println!("password changed");
        }
    }
    Ok(())
}

/// A session with the current server list already loaded.
fn open_session<'a>(config: &ClientConfig, tokens: &'a dyn TokenSource) -> anyhow::Result<Session<'a>> {
    let interactive = io::stderr().is_terminal();
    let mut session = TodoSession::new(config.client(), UreqTransport::new(), tokens)
        .with_status_observer(move |status| {
            if interactive {
                show_progress(status);
            }
        });
    let result = session.load();
    settle(session.error(), result)?;
    Ok(session)
}

fn open_account<'a>(config: &ClientConfig, tokens: &'a dyn TokenSource) -> Account<'a> {
    AccountSession::new(AccountClient::new(&config.base_url), UreqTransport::new(), tokens)
}

/// A one-line loading indicator on stderr, erased once the operation settles.
fn show_progress(status: OpStatus) {
    let mut err = io::stderr();
    let _ = match status {
        OpStatus::InFlight(op) => write!(err, "{op}\u{2026}"),
        _ => write!(err, "\r\x1b[K"),
    };
    let _ = err.flush();
}

/// Turn an operation result into the message the session recorded for it.
fn settle<R>(recorded: Option<&str>, result: Result<R, SyncError>) -> anyhow::Result<R> {
    match result {
        Ok(value) => Ok(value),
        Err(SyncError::Validation(skip)) => bail!("nothing sent: {skip}"),
        Err(err) => match recorded {
            Some(message) => bail!("{message}"),
            None => Err(err.into()),
        },
    }
}

/// `given`, or one line read from stdin after printing `label`.
fn secret(given: Option<String>, label: &str) -> anyhow::Result<String> {
    if let Some(value) = given {
        return Ok(value);
    }
    eprint!("{label}: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).context("reading from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn or_dash<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Blocking yes/no prompt on stdin. Anything but `y`/`yes` declines.
fn confirm(item: &TodoItem) -> bool {
    print!("Delete \"{}\"? [y/N] ", item.name);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn print_table<'a>(items: impl Iterator<Item = &'a TodoItem>) {
    println!(
        "{:>5}  {:<32} {:<9} {:<8} {:<10}  {:<10}  {}",
        "ID", "Task", "Category", "Priority", "Due Date", "Created At", "Done"
    );
    let mut shown = 0;
    for item in items {
        shown += 1;
        println!(
            "{:>5}  {:<32} {:<9} {:<8} {:<10}  {:<10}  {}",
            item.id,
            truncate(&item.name, 32),
            or_dash(item.category),
            or_dash(item.priority),
            format_display_date(item.due_date),
            format_display_date(item.created_at.map(|ts| ts.date_naive())),
            if item.is_complete { "x" } else { " " },
        );
    }
    if shown == 0 {
        println!("(no todos)");
    }
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut out: String = name.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn profile_image(path: PathBuf, set: Option<String>) -> anyhow::Result<()> {
    let mut store = ProfileImageStore::open(FileStorage::new(&path));
    if let Some(image) = set {
        store
            .set_image(image)
            .with_context(|| format!("saving profile image to {}", path.display()))?;
    }
    println!("{}", store.image().unwrap_or_default());
    Ok(())
}
