use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand, ValueEnum};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{AccountStatus, Decision, Engine, NewUser, ReconcileReport, Role, Session};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

/// Identity recorded for changes made from this tool without an `--actor`.
const OPERATOR: &str = "paydesk_admin";

#[derive(Parser, Debug)]
#[command(name = "paydesk_admin")]
#[command(about = "Operator utilities for Paydesk (users, reference data, ledger)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./paydesk.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    /// Installs the default currencies and payment methods.
    Seed,
    Tx(Tx),
    /// Compares stored balances with the approved ledger.
    Reconcile(ReconcileArgs),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
    /// Grants the admin role.
    Promote(UsernameArgs),
    Suspend(UsernameArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    User,
    Admin,
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    display_name: Option<String>,
    #[arg(long, value_enum, default_value = "user")]
    role: RoleArg,
}

#[derive(Args, Debug)]
struct UsernameArgs {
    #[arg(long)]
    username: String,
}

#[derive(Args, Debug)]
struct Tx {
    #[command(subcommand)]
    command: TxCommand,
}

#[derive(Subcommand, Debug)]
enum TxCommand {
    Approve(DecisionArgs),
    Reject(DecisionArgs),
}

#[derive(Args, Debug)]
struct DecisionArgs {
    #[arg(long)]
    id: Uuid,
    /// Admin recorded as the decider.
    #[arg(long)]
    actor: String,
}

#[derive(Args, Debug)]
struct ReconcileArgs {
    #[arg(long)]
    user: String,
    /// Rewrite mismatched balances from the ledger.
    #[arg(long)]
    repair: bool,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let first = prompt_password("Password: ")?;
        if first.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let second = prompt_password("Confirm password: ")?;
        if first == second {
            return Ok(first);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Checks that `actor` is an existing admin before acting on their behalf.
async fn actor_session(
    engine: &Engine,
    actor: &str,
) -> Result<Session, Box<dyn Error + Send + Sync>> {
    let user = engine
        .user(&Session::new(OPERATOR, Role::Admin), actor)
        .await?;
    if user.role != Role::Admin {
        return Err(format!("{actor} is not an admin").into());
    }
    if user.status != AccountStatus::Active {
        return Err(format!("{actor} is suspended").into());
    }
    Ok(Session::new(user.username, Role::Admin))
}

fn print_report(report: &ReconcileReport) {
    if report.entries.is_empty() {
        println!("{}: no balances", report.user_id);
        return;
    }
    for entry in &report.entries {
        let mark = if entry.is_consistent() { "ok" } else { "MISMATCH" };
        println!(
            "{} {:<5} ledger={} stored={} {mark}",
            report.user_id,
            entry.currency,
            entry.ledger.minor(),
            entry.stored.minor(),
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;
    let operator = Session::new(OPERATOR, Role::Admin);

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;
            let role = match args.role {
                RoleArg::User => Role::User,
                RoleArg::Admin => Role::Admin,
            };
            let user = engine
                .create_user(NewUser {
                    username: args.username,
                    password,
                    email: args.email,
                    display_name: args.display_name,
                    role,
                })
                .await?;
            println!("created user: {} ({})", user.username, user.role.as_str());
        }
        Command::User(User {
            command: UserCommand::Promote(args),
        }) => {
            let user = engine
                .set_user_role(&operator, &args.username, Role::Admin)
                .await?;
            println!("promoted user: {}", user.username);
        }
        Command::User(User {
            command: UserCommand::Suspend(args),
        }) => {
            let user = engine
                .set_user_status(&operator, &args.username, AccountStatus::Suspended)
                .await?;
            println!("suspended user: {}", user.username);
        }
        Command::Seed => {
            let report = engine.seed_defaults().await?;
            println!(
                "currencies added: {} | payment methods added: {}",
                report.currencies_added.len(),
                report.payment_methods_added.len()
            );
        }
        Command::Tx(Tx { command }) => {
            let (args, decision) = match command {
                TxCommand::Approve(args) => (args, Decision::Approve),
                TxCommand::Reject(args) => (args, Decision::Reject),
            };
            let session = actor_session(&engine, &args.actor).await?;
            let outcome = engine
                .decide_transaction(&session, args.id, decision)
                .await?;
            if outcome.applied {
                println!(
                    "transaction {} is now {}",
                    outcome.transaction.id,
                    outcome.transaction.status.as_str()
                );
            } else {
                println!(
                    "transaction {} was already {}",
                    outcome.transaction.id,
                    outcome.transaction.status.as_str()
                );
            }
            if let Some(balance) = outcome.balance {
                println!("balance {}: {}", balance.currency, balance.balance.minor());
            }
        }
        Command::Reconcile(args) => {
            let report = if args.repair {
                engine.recompute_balances(&operator, &args.user).await?
            } else {
                engine.reconcile_user(&operator, &args.user).await?
            };
            print_report(&report);
            if !report.is_consistent() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
