//! `voting-portal` is the command-line client for the voting backend. It logs
//! voters and administrators in, keeps their session token in a local file,
//! and makes authenticated requests on their behalf. It also renders the
//! build descriptor used by the smart-contract toolchain.

#![warn(
    clippy::all,
    clippy::todo,
    clippy::enum_glob_use,
    clippy::unused_self,
    clippy::needless_borrow,
    clippy::match_wildcard_for_single_variants,
    clippy::await_holding_lock,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::exit,
    clippy::inefficient_to_string,
    clippy::macro_use_imports,
    clippy::option_option,
    clippy::verbose_file_reads,
    clippy::str_to_string,
    rust_2018_idioms,
    future_incompatible,
    nonstandard_style,
    missing_debug_implementations
)]
#![forbid(unsafe_code)]

use std::{process::ExitCode, sync::Arc};

use build_config::BuildConfig;
use clap::Parser;
use color_eyre::eyre::eyre;
use tokio::sync::Mutex;
use voting_portal_client::{
    types::{Candidate, VotingDates},
    Client, Credentials, DynTokenStore, FileTokenStore, LoginForm, RequestOptions,
    SessionContext,
};

use crate::config::{BuildConfigCommand, Command, Config, RequestOpts};
use crate::terminal::TerminalView;

mod config;
mod log;
mod terminal;

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
    let config = Config::parse();
    log::setup(&config)?;

    let store: DynTokenStore = Arc::new(FileTokenStore::new(&config.session_file));
    let client = Client::new(config.api_url.clone());

    match config.command.clone() {
        Command::Login(opts) => {
            return login(
                &config,
                client,
                store,
                Credentials::new(opts.voter_id, opts.password),
            )
            .await
        }
        Command::Logout => SessionContext::new(store).logout()?,
        Command::Whoami => whoami(store)?,
        Command::Profile => {
            let profile = authenticated(&store, client.profile(store.as_ref()).await)?;
            println!("{}", profile.message);
        }
        Command::AddCandidate(opts) => {
            let candidate = Candidate {
                name: opts.name,
                party: opts.party,
            };
            let response =
                authenticated(&store, client.add_candidate(store.as_ref(), &candidate).await)?;
            println!("{}: {:?}", response.message, response.data);
        }
        Command::SetDates(opts) => {
            let dates = VotingDates {
                start_date: opts.start_date,
                end_date: opts.end_date,
            };
            let response =
                authenticated(&store, client.set_voting_dates(store.as_ref(), &dates).await)?;
            println!("{}: {:?}", response.message, response.data);
        }
        Command::Request(opts) => request(&client, &store, opts).await?,
        Command::BuildConfig(command) => build_config(command)?,
    }

    Ok(ExitCode::SUCCESS)
}

async fn login(
    config: &Config,
    client: Client,
    store: DynTokenStore,
    credentials: Credentials,
) -> color_eyre::Result<ExitCode> {
    let context = Mutex::new(SessionContext::new(store));
    let form = LoginForm::new(
        client,
        TerminalView::new(credentials, config.frontend_url.clone()),
    );

    // the view has already shown the error
    if form.submit(&context).await.is_err() {
        return Ok(ExitCode::FAILURE);
    }

    if let Some(url) = form.view().redirected_to() {
        println!("{url}");
    }
    Ok(ExitCode::SUCCESS)
}

fn whoami(store: DynTokenStore) -> color_eyre::Result<()> {
    let context = SessionContext::restore(store)?;
    let Some(session) = context.session() else {
        println!("not logged in");
        return Ok(());
    };

    println!("role: {}", session.role());
    if let Some(voter_id) = session.voter_id() {
        println!("voter_id: {voter_id}");
    }
    match session.expires_at() {
        Some(expires_at) if session.is_expired() => println!("expired: {expires_at}"),
        Some(expires_at) => println!("expires: {expires_at}"),
        None => {}
    }
    Ok(())
}

async fn request(
    client: &Client,
    store: &DynTokenStore,
    opts: RequestOpts,
) -> color_eyre::Result<()> {
    let mut options = RequestOptions::new(opts.method);
    for (name, value) in opts.headers {
        options = options.header(name, value);
    }
    if let Some(json) = opts.json {
        options = options.json(json);
    } else if let Some(data) = opts.data {
        options = options.text(data);
    }

    let body = authenticated(
        store,
        client.auth_fetch(store.as_ref(), &opts.url, options).await,
    )?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Converts a client result into a report, clearing stored tokens once the
/// session they belong to has expired.
fn authenticated<T>(
    store: &DynTokenStore,
    result: voting_portal_client::Result<T>,
) -> color_eyre::Result<T> {
    match result {
        Err(voting_portal_client::Error::SessionExpired(expires_at)) => {
            SessionContext::new(Arc::clone(store)).logout()?;
            Err(eyre!("session expired at {expires_at}; log in again"))
        }
        result => Ok(result?),
    }
}

fn build_config(command: BuildConfigCommand) -> color_eyre::Result<()> {
    match command {
        BuildConfigCommand::Print { config, output } => {
            let build_config = match config {
                Some(path) => BuildConfig::load(path)?,
                None => BuildConfig::default(),
            };
            build_config.validate()?;
            let module = build_config.to_module_string()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, module)?;
                    tracing::info!("wrote build config to {}", path.display());
                }
                None => print!("{module}"),
            }
        }
        BuildConfigCommand::Check { path } => {
            BuildConfig::load(&path)?.validate()?;
            println!("{}: ok", path.display());
        }
    }
    Ok(())
}
