//! Application configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::{
    header::{HeaderName, HeaderValue},
    Method,
};

#[derive(Debug, Clone, Parser)]
#[command(author, version, about)]
pub(crate) struct Config {
    /// URL of the voting backend, e.g. `http://127.0.0.1:8000`.
    #[arg(long, env = "VOTING_API_URL", default_value = "http://127.0.0.1:8000")]
    pub(crate) api_url: reqwest::Url,

    /// URL the login page redirects into, e.g. `http://127.0.0.1:8080/`.
    #[arg(
        long,
        env = "VOTING_FRONTEND_URL",
        default_value = "http://127.0.0.1:8080/"
    )]
    pub(crate) frontend_url: reqwest::Url,

    /// File holding the stored session tokens. A relative path is resolved
    /// against the working directory, so every command sharing a session must
    /// run from the same directory or set `VOTING_SESSION_FILE` to an
    /// absolute path.
    #[arg(
        long,
        env = "VOTING_SESSION_FILE",
        default_value = ".voting-portal/session.json"
    )]
    pub(crate) session_file: PathBuf,

    /// Log level.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub(crate) log_level: tracing::Level,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Command {
    /// Log in and store the session token.
    Login(LoginOpts),

    /// Forget every stored session token.
    Logout,

    /// Show the stored session.
    Whoami,

    /// Fetch the profile greeting for the logged-in user.
    Profile,

    /// Add a candidate to the ballot (administrators only).
    AddCandidate(AddCandidateOpts),

    /// Set the voting window (administrators only).
    SetDates(SetDatesOpts),

    /// Send an arbitrary request with the stored bearer token.
    Request(RequestOpts),

    /// Work with the smart-contract build descriptor.
    #[command(subcommand)]
    BuildConfig(BuildConfigCommand),
}

#[derive(Debug, Clone, Parser)]
pub(crate) struct LoginOpts {
    #[arg(long, env = "VOTER_ID")]
    pub(crate) voter_id: String,

    #[arg(long, env = "VOTER_PASSWORD", hide_env_values = true)]
    pub(crate) password: String,
}

#[derive(Debug, Clone, Parser)]
pub(crate) struct AddCandidateOpts {
    #[arg(long)]
    pub(crate) name: String,

    #[arg(long)]
    pub(crate) party: String,
}

#[derive(Debug, Clone, Parser)]
pub(crate) struct SetDatesOpts {
    #[arg(long)]
    pub(crate) start_date: String,

    #[arg(long)]
    pub(crate) end_date: String,
}

#[derive(Debug, Clone, Parser)]
pub(crate) struct RequestOpts {
    /// Absolute URL, or a path relative to the API URL.
    pub(crate) url: String,

    #[arg(short = 'X', long, default_value = "GET")]
    pub(crate) method: Method,

    /// Extra header as `Name: value`. May be repeated.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub(crate) headers: Vec<(HeaderName, HeaderValue)>,

    /// JSON request body.
    #[arg(long, value_parser = parse_json, conflicts_with = "data")]
    pub(crate) json: Option<serde_json::Value>,

    /// Plain request body.
    #[arg(long)]
    pub(crate) data: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum BuildConfigCommand {
    /// Render the descriptor as the toolchain's JavaScript module.
    Print {
        /// JSON descriptor to render instead of the defaults.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Check a JSON descriptor against the toolchain's expected shape.
    Check { path: PathBuf },
}

fn parse_header(s: &str) -> Result<(HeaderName, HeaderValue), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got {s:?}"))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| e.to_string())?;
    let value = HeaderValue::from_str(value.trim()).map_err(|e| e.to_string())?;
    Ok((name, value))
}

fn parse_json(s: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_point_at_local_services() {
        let config = Config::try_parse_from(["voting-portal", "whoami"]).unwrap();
        assert_eq!(config.api_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(config.frontend_url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(config.log_level, tracing::Level::INFO);
        assert_eq!(
            config.session_file,
            PathBuf::from(".voting-portal/session.json")
        );
        assert!(matches!(config.command, Command::Whoami));
    }

    #[test]
    fn parses_request_options() {
        let config = Config::try_parse_from([
            "voting-portal",
            "request",
            "/add-candidate",
            "-X",
            "POST",
            "-H",
            "X-Trace: abc",
            "--json",
            r#"{"name":"Ada","party":"Independent"}"#,
        ])
        .unwrap();

        let Command::Request(opts) = config.command else {
            panic!("expected a request command");
        };
        assert_eq!(opts.url, "/add-candidate");
        assert_eq!(opts.method, Method::POST);
        assert_eq!(
            opts.headers,
            vec![(
                HeaderName::from_static("x-trace"),
                HeaderValue::from_static("abc")
            )]
        );
        assert_eq!(
            opts.json,
            Some(serde_json::json!({ "name": "Ada", "party": "Independent" }))
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        assert!(parse_header("no colon here").is_err());
        assert!(parse_header("bad name: value").is_err());
    }

    #[test]
    fn json_and_data_conflict() {
        let result = Config::try_parse_from([
            "voting-portal",
            "request",
            "/profile",
            "--json",
            "{}",
            "--data",
            "x",
        ]);
        assert!(result.is_err());
    }
}
