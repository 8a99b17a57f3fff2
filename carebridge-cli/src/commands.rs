//! Command implementations.
//!
//! Output goes to the supplied writer so the commands can be driven from
//! tests; the binary passes stdout.

use std::io::Write;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::debug;

use carebridge_client::{ApiClient, ApiError, ApiRequest, AuthSession, LoginRequest};
use carebridge_core::ClientConfig;

use crate::cli::{Cli, Commands};

/// Resolve configuration: file, then environment, then command-line flags.
pub fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = ClientConfig::load_from_path(path)?;
            config.apply_env();
            config
        }
        None => ClientConfig::load()?,
    };

    if let Some(url) = &cli.api_url {
        config.base_url = url.clone();
    }
    if cli.debug {
        config.debug = true;
    }

    config.validate()?;
    Ok(config)
}

/// Run a parsed command line against the configured API.
pub async fn run<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    let config = resolve_config(&cli)?;
    let client = ApiClient::from_config(config).context("failed to create API client")?;
    execute(&client, cli.command, out).await
}

/// Execute one command with an existing client.
pub async fn execute<W: Write>(client: &ApiClient, command: Commands, out: &mut W) -> Result<()> {
    match command {
        Commands::Get { path } => call(client, ApiRequest::get(path), out).await,
        Commands::Delete { path } => call(client, ApiRequest::delete(path), out).await,
        Commands::Post { path, data } => {
            let request = with_data(ApiRequest::post(path), data.as_deref())?;
            call(client, request, out).await
        }
        Commands::Put { path, data } => {
            let request = with_data(ApiRequest::put(path), data.as_deref())?;
            call(client, request, out).await
        }
        Commands::Patch { path, data } => {
            let request = with_data(ApiRequest::patch(path), data.as_deref())?;
            call(client, request, out).await
        }
        Commands::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            let session = AuthSession::new(client.clone());
            let user = session.login(&LoginRequest::new(email, password)).await?;
            print_json(out, &user)
        }
        Commands::Logout => {
            AuthSession::new(client.clone()).logout().await?;
            writeln!(out, "Logged out")?;
            Ok(())
        }
        Commands::Whoami => match AuthSession::new(client.clone()).restore().await? {
            Some(user) => print_json(out, &user),
            None => bail!("not logged in"),
        },
        Commands::Config => {
            let rendered =
                toml::to_string_pretty(client.config()).context("failed to render config")?;
            write!(out, "{}", rendered)?;
            Ok(())
        }
    }
}

/// Render an error for stderr.
///
/// API failures carry their status; everything else prints the context
/// chain.
pub fn render_error(error: &anyhow::Error) -> String {
    match error.downcast_ref::<ApiError>() {
        Some(api) => {
            let mut rendered = format!("error (status {}): {}", api.status, api.message);
            if let Some(secs) = api.retry_after_secs() {
                rendered.push_str(&format!("\n  retry after {}s", secs));
            }
            if let Some(errors) = api.field_errors() {
                for message in errors.messages() {
                    rendered.push_str(&format!("\n  {}", message));
                }
            }
            rendered
        }
        None => format!("error: {:#}", error),
    }
}

async fn call<W: Write>(client: &ApiClient, request: ApiRequest, out: &mut W) -> Result<()> {
    debug!("{} {}", request.method(), request.path());
    let envelope = client.send(request).await?;
    print_json(out, &envelope)
}

fn with_data(request: ApiRequest, data: Option<&str>) -> Result<ApiRequest> {
    match data {
        Some(raw) => {
            let body: Value = serde_json::from_str(raw).context("--data is not valid JSON")?;
            Ok(request.with_body(body))
        }
        None => Ok(request),
    }
}

fn print_json<W: Write, T: serde::Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("no password given");
    }
    Ok(password)
}
