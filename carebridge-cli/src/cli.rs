//! Command-line definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "carebridge")]
#[command(about = "Talk to the Carebridge EHR API from the terminal")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// API base URL (overrides config file and CAREBRIDGE_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Log request and response details
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to client.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// GET a path and print the response
    Get {
        /// Path relative to the base URL (e.g., /v1/patients/1)
        path: String,
    },

    /// DELETE a path
    Delete {
        /// Path relative to the base URL
        path: String,
    },

    /// POST a JSON body
    Post {
        /// Path relative to the base URL
        path: String,

        /// Request body as JSON
        #[arg(short, long)]
        data: Option<String>,
    },

    /// PUT a JSON body
    Put {
        /// Path relative to the base URL
        path: String,

        /// Request body as JSON
        #[arg(short, long)]
        data: Option<String>,
    },

    /// PATCH a JSON body
    Patch {
        /// Path relative to the base URL
        path: String,

        /// Request body as JSON
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Log in and store the session
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password (read from stdin when omitted)
        #[arg(short, long, env = "CAREBRIDGE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// End the session and forget the stored credential
    Logout,

    /// Show the user the stored session belongs to
    Whoami,

    /// Print the resolved configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verb_with_global_flags() {
        let cli = Cli::try_parse_from([
            "carebridge",
            "post",
            "/v1/patients",
            "--data",
            r#"{"name":"A"}"#,
            "--api-url",
            "http://ehr.test/api",
            "--debug",
        ])
        .unwrap();

        assert!(cli.debug);
        assert_eq!(cli.api_url.as_deref(), Some("http://ehr.test/api"));
        match cli.command {
            Commands::Post { path, data } => {
                assert_eq!(path, "/v1/patients");
                assert_eq!(data.as_deref(), Some(r#"{"name":"A"}"#));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_login_requires_email() {
        assert!(Cli::try_parse_from(["carebridge", "login"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
