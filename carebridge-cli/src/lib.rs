//! Carebridge CLI
//!
//! Command-line front end for the Carebridge EHR API.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password from CAREBRIDGE_PASSWORD or stdin)
//! carebridge login --email doc@example.org
//!
//! # Fetch a patient
//! carebridge get /v1/patients/1
//!
//! # Update a setting
//! carebridge patch /v1/settings/profile --data '{"theme":"dark"}'
//!
//! # Who am I logged in as?
//! carebridge whoami
//! ```

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{execute, render_error, resolve_config, run};
