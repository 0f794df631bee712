// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TaskEarn terminal client
//!
//! Signs in against the hosted backend, lists active offers and records
//! completions. Everything runs on one thread: session changes, backend
//! responses and typed commands are handled by a single event loop.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;
use taskearn::{
    config::{Config, LogFormat},
    dashboard::{command, view, Command, DashboardController},
    db::OfferRepository,
    error::AppError,
    services::{AuthProvider, SessionStore, SignUpOutcome},
    AppContext,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "taskearn", version, about = "TaskEarn - browse and complete offers")]
struct Cli {
    /// Backend URL
    #[arg(long, env = "SUPABASE_URL")]
    url: Option<String>,

    /// Public API key of the backend
    #[arg(long, env = "SUPABASE_ANON_KEY")]
    anon_key: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TASKEARN_PASSWORD")]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TASKEARN_PASSWORD")]
        password: String,
    },
    /// Forget the current session
    Logout,
    /// Print the dashboard once and exit
    Offers,
    /// Interactive dashboard (default)
    Dashboard,
}

enum Flow {
    Continue,
    Quit,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?.with_endpoint(cli.url, cli.anon_key)?;
    init_logging(config.log_format);
    tracing::debug!(url = %config.supabase_url, "Starting TaskEarn client");

    let ctx = AppContext::new(config)?;

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Login { email, password } => {
            let session = ctx.auth.sign_in_with_password(&email, &password).await?;
            println!(
                "Signed in as {}",
                session.user.email.as_deref().unwrap_or(&session.user.id)
            );
        }
        Commands::Signup { email, password } => {
            report_sign_up(ctx.auth.sign_up(&email, &password).await?);
        }
        Commands::Logout => {
            ctx.auth.sign_out().await?;
            println!("Signed out");
        }
        Commands::Offers => print_offers(&ctx).await?,
        Commands::Dashboard => run_dashboard(&ctx).await?,
    }

    Ok(())
}

/// One-shot: resolve the session, load once, print.
async fn print_offers(ctx: &AppContext) -> anyhow::Result<()> {
    let store = SessionStore::start(Arc::clone(&ctx.auth));
    let mut sessions = store.subscribe();
    let snapshot = (*sessions.wait_for(|s| !s.loading).await?).clone();

    let mut controller = DashboardController::new(Arc::clone(&ctx.repository));
    controller.on_session(&snapshot);
    controller.settle_all().await;
    print!("{}", view::render(&controller));

    store.teardown();
    Ok(())
}

/// Interactive dashboard loop.
async fn run_dashboard(ctx: &AppContext) -> anyhow::Result<()> {
    let store = SessionStore::start(Arc::clone(&ctx.auth));
    let mut sessions = store.subscribe();
    let mut controller = DashboardController::new(Arc::clone(&ctx.repository));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    redraw(&controller);
    loop {
        tokio::select! {
            changed = sessions.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = sessions.borrow_and_update().clone();
                controller.on_session(&snapshot);
            }
            Some(outcome) = controller.next_outcome(), if controller.has_pending() => {
                controller.apply(outcome);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if let Flow::Quit = handle_line(ctx, &mut controller, &line).await {
                    break;
                }
            }
        }
        redraw(&controller);
    }

    store.teardown();
    Ok(())
}

async fn handle_line(
    ctx: &AppContext,
    controller: &mut DashboardController<OfferRepository>,
    line: &str,
) -> Flow {
    let command = match command::parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Flow::Continue,
        Err(e) => {
            eprintln!("{e}");
            return Flow::Continue;
        }
    };

    let result = match command {
        Command::Quit => return Flow::Quit,
        Command::Help => {
            print!("{}", command::HELP);
            Ok(())
        }
        Command::Login { email, password } => ctx
            .auth
            .sign_in_with_password(&email, &password)
            .await
            .map(|_| ()),
        Command::Signup { email, password } => {
            ctx.auth.sign_up(&email, &password).await.map(report_sign_up)
        }
        Command::Logout => ctx.auth.sign_out().await,
        Command::Open(target) => {
            match command::resolve_offer(controller.offers(), &target).map(str::to_string) {
                Some(offer_id) => controller.select_offer(&offer_id).map(|_| ()),
                None => Err(AppError::NotFound(format!("Offer {target}"))),
            }
        }
        Command::Close => controller.close_dialog().map(|_| ()),
        // Navigation happens right away; the completion is recorded in the
        // background and cannot hold it up.
        Command::Complete => controller
            .complete_selected()
            .map(|link| println!("Opening {link}")),
        Command::Refresh => controller.reload(),
    };

    if let Err(e) = result {
        eprintln!("{e}");
    }
    Flow::Continue
}

fn report_sign_up(outcome: SignUpOutcome) {
    match outcome {
        SignUpOutcome::SignedIn(session) => println!(
            "Account created, signed in as {}",
            session.user.email.as_deref().unwrap_or(&session.user.id)
        ),
        SignUpOutcome::ConfirmationRequired { email } => {
            println!("Check {email} to confirm your account, then log in.")
        }
    }
}

fn redraw(controller: &DashboardController<OfferRepository>) {
    println!("\n{}", view::render(controller));
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Initialize logging on stderr so it does not interleave with the screen.
fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("taskearn=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
