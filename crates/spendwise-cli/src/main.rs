//! spendwise - a command-line client for the expense tracker.
//!
//! Log in once and the session token is kept between runs. Expenses are
//! added as free text ("Spent 250 on groceries"); the server works out the
//! amount and category.

mod output;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spendwise_core::dashboard::LoadFailure;
use spendwise_core::{
    ApiClient, AuthState, Config, Dashboard, ExpenseFilter, SessionEvent, SessionManager,
    SignupOutcome,
};

#[derive(Parser, Debug)]
#[command(name = "spendwise", about = "Track expenses from the command line", version)]
struct Cli {
    /// API base URL (overrides config and SPENDWISE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and remember the session
    Login {
        /// Defaults to the last username used
        username: Option<String>,
        #[arg(long, env = "SPENDWISE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account
    Signup {
        username: String,
        email: String,
        #[arg(long, env = "SPENDWISE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show whether a session is stored
    Status,
    /// Add an expense from a free-text description
    Add {
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
    /// List expenses
    List(ListArgs),
    /// Totals per category
    Categories,
    /// Totals per month
    Summary {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Delete an expense by id
    Delete { id: String },
    /// Expenses, categories and monthly totals in one view
    Dashboard {
        /// Defaults to the current year
        #[arg(long)]
        year: Option<i32>,
    },
}

impl Command {
    fn is_sign_in(&self) -> bool {
        matches!(self, Command::Login { .. } | Command::Signup { .. })
    }
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long)]
    category: Option<String>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,
    #[arg(long)]
    year: Option<i32>,
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// End date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    limit: Option<u32>,
}

impl ListArgs {
    fn to_filter(&self) -> ExpenseFilter {
        ExpenseFilter {
            category: self.category.clone(),
            month: self.month,
            year: self.year,
            start_date: self.from,
            end_date: self.to,
            limit: self.limit,
        }
    }
}

/// Everything a command needs
struct AppContext {
    client: ApiClient,
    session: SessionManager,
    config: Config,
    json: bool,
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr))
            .with(filter)
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().context("Log file path has no file name")?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref())?;

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }

    let store = config.open_token_store()?;
    let session = SessionManager::start(store.clone());
    let client = ApiClient::new(&config, store)?;

    // Track server-side invalidation instead of relying on a reload
    let mut events = client.subscribe();
    let _listener = session.listen(client.subscribe());

    let mut ctx = AppContext {
        client,
        session,
        config,
        json: cli.json,
    };
    // A rejected login is reported by its own error, not as an expired session
    let signing_in = cli.command.is_sign_in();
    let result = run(cli.command, &mut ctx).await;

    let invalidated = matches!(
        events.try_recv(),
        Ok(SessionEvent::Invalidated) | Err(TryRecvError::Lagged(_))
    );
    if invalidated && !signing_in {
        eprintln!("Your session has expired. Run `spendwise login` to sign in again.");
    }
    result
}

fn require_login(ctx: &AppContext) -> Result<()> {
    if ctx.session.state() != AuthState::Authenticated {
        bail!("Not logged in. Run `spendwise login <username>` first.");
    }
    Ok(())
}

fn read_password(password: Option<String>) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => rpassword::prompt_password("Password: ").context("Failed to read password"),
    }
}

/// Remember the username for the next login; failure only costs a default
fn remember_username(config: &mut Config, username: &str) {
    config.last_username = Some(username.trim().to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
}

async fn run(command: Command, ctx: &mut AppContext) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            let username = username
                .or_else(|| ctx.config.last_username.clone())
                .context("No username given and none remembered")?;
            let password = read_password(password)?;

            ctx.client.login(&username, &password).await?;
            ctx.session.login();
            remember_username(&mut ctx.config, &username);
            println!("Logged in as {}.", username.trim());
        }
        Command::Signup { username, email, password } => {
            let password = read_password(password)?;
            match ctx.client.signup(&username, &email, &password).await? {
                SignupOutcome::LoggedIn(_) => {
                    ctx.session.login();
                    remember_username(&mut ctx.config, &username);
                    println!("Welcome aboard, {}!", username.trim());
                }
                SignupOutcome::Created { message } => {
                    remember_username(&mut ctx.config, &username);
                    if let Some(message) = message {
                        println!("{}.", message.trim_end_matches('.'));
                    }
                    println!("Please log in with your new account: spendwise login {}", username.trim());
                }
            }
        }
        Command::Logout => {
            ctx.session.logout()?;
            println!("Logged out successfully.");
        }
        Command::Status => {
            let state = ctx.session.state();
            let username = ctx.session.username();
            if ctx.json {
                output::print_json(&serde_json::json!({
                    "state": state.to_string(),
                    "logged_in": state.is_logged_in(),
                    "username": username,
                    "api_base_url": ctx.client.base_url(),
                }))?;
            } else {
                println!("{}", state);
                if let Some(username) = username {
                    println!("User: {}", username);
                }
                println!("API:  {}", ctx.client.base_url());
            }
        }
        Command::Add { prompt } => {
            require_login(ctx)?;
            let expense = ctx.client.create_expense(&prompt.join(" ")).await?;
            info!(id = %expense.id, "Expense added");
            if ctx.json {
                output::print_json(&expense)?;
            } else {
                print!("Expense added: ");
                output::print_expense(&expense);
            }
        }
        Command::List(args) => {
            require_login(ctx)?;
            let expenses = ctx.client.fetch_expenses(&args.to_filter()).await?;
            if ctx.json {
                output::print_json(&expenses)?;
            } else {
                output::print_expenses(&expenses);
            }
        }
        Command::Categories => {
            require_login(ctx)?;
            let categories = ctx.client.fetch_categories().await?;
            if ctx.json {
                output::print_json(&categories)?;
            } else {
                output::print_categories(&categories);
            }
        }
        Command::Summary { year } => {
            require_login(ctx)?;
            let summary = ctx.client.fetch_monthly_summary(year).await?;
            if ctx.json {
                output::print_json(&summary)?;
            } else {
                output::print_monthly_summary(&summary);
            }
        }
        Command::Delete { id } => {
            require_login(ctx)?;
            ctx.client.delete_expense(&id).await?;
            println!("Expense deleted successfully.");
        }
        Command::Dashboard { year } => {
            require_login(ctx)?;
            let year = year.unwrap_or_else(|| Local::now().year());
            let mut dashboard = Dashboard::new(ctx.client.clone(), Some(year));
            let failures = dashboard.load().await;
            print_dashboard(&dashboard, year, &failures, ctx.json)?;
        }
    }
    Ok(())
}

fn print_dashboard(dashboard: &Dashboard, year: i32, failures: &[LoadFailure], json: bool) -> Result<()> {
    if json {
        return output::print_json(&serde_json::json!({
            "user": dashboard.display_name(),
            "year": year,
            "total_spent": dashboard.total_spent(),
            "expenses": dashboard.expenses,
            "categories": dashboard.categories,
            "monthly_summary": dashboard.monthly_summary,
            "errors": failures.iter().map(|f| f.error().to_string()).collect::<Vec<_>>(),
        }));
    }

    println!("Welcome back, {}!  ({})", dashboard.display_name(), year);
    println!(
        "Total spent: {}\n",
        spendwise_core::utils::format_amount(dashboard.total_spent())
    );
    output::print_monthly_summary(&dashboard.monthly_summary);
    println!();
    output::print_categories(&dashboard.categories);
    println!();
    output::print_expenses(&dashboard.expenses);

    for failure in failures {
        let what = match failure {
            LoadFailure::Expenses(_) => "expenses",
            LoadFailure::Categories(_) => "categories",
            LoadFailure::MonthlySummary(_) => "monthly summary",
        };
        eprintln!("Failed to load {}: {}", what, failure.error());
    }
    Ok(())
}
