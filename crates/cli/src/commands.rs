//! CLI commands

use anyhow::{Result, bail};
use clap::Subcommand;
use navaja_core::ClientConfig;
use serde_json::{Value, json};
use std::path::PathBuf;
use tracing::info;

use crate::app::App;
use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Session(SessionCommands),

    /// Configuration file operations
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Commands that run against the persisted session
#[derive(Subcommand)]
pub enum SessionCommands {
    /// Log in with an employee ID and password
    Login {
        /// Employee ID (e.g. EMP001)
        #[arg(long)]
        empleado_id: String,

        /// Password
        #[arg(long, env = "NAVAJA_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// End the current session
    Logout,

    /// Show who is logged in and with what privileges
    Status,

    /// Check where a navigation to a route would land
    Navigate {
        /// Route path (`/reports`) or name (`Reports`)
        target: String,
    },

    /// Show the logged-in user's profile from the server
    Me,

    /// Send an authenticated GET request and print the JSON response
    Get {
        /// Path relative to the API base URL (e.g. `/reports/`)
        path: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate a configuration file with default values
    Init {
        /// Output file path (defaults to the data directory's navaja.json)
        output: Option<PathBuf>,
    },
}

impl Commands {
    pub async fn execute(self, config: &ClientConfig) -> Result<()> {
        match self {
            Self::Config { command } => command.execute(),
            Self::Session(command) => {
                let mut app = App::from_config(config)?;
                let result = command.run(&app).await;

                for navigation in app.apply_session_events() {
                    println!(
                        "Session expired, please log in again ({})",
                        navigation.route.path
                    );
                }
                result
            }
        }
    }
}

impl SessionCommands {
    async fn run(self, app: &App) -> Result<()> {
        match self {
            Self::Login {
                empleado_id,
                password,
            } => match app.session.login(&empleado_id, &password).await {
                Ok(()) => {
                    let state = app.session.snapshot();
                    let role = state.user_role().map_or("unknown", |role| role.as_str());
                    println!("Logged in as {} ({role})", state.user_name());
                    Ok(())
                }
                Err(failure) => bail!(failure.message),
            },
            Self::Logout => {
                app.session.logout();
                let navigation = app.router.force_login()?;
                println!("Logged out ({})", navigation.route.path);
                Ok(())
            }
            Self::Status => {
                let state = app.session.snapshot();
                let status = json!({
                    "authenticated": state.is_authenticated(),
                    "user_name": state.user_name(),
                    "role": state.user_role(),
                    "is_super_admin": state.is_super_admin(),
                    "is_admin_user": state.is_admin_user(),
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
                Ok(())
            }
            Self::Navigate { target } => {
                let navigation = app.router.push(&target)?;
                if navigation.redirected {
                    println!(
                        "{target} -> redirected to {} ({})",
                        navigation.route.path, navigation.route.view
                    );
                } else {
                    println!(
                        "{target} -> {} ({})",
                        navigation.route.path, navigation.route.view
                    );
                }
                Ok(())
            }
            Self::Me => {
                let user = app.client.me().await?;
                println!("{}", serde_json::to_string_pretty(&user)?);
                Ok(())
            }
            Self::Get { path } => {
                let body: Value = app.client.get(&path).await?;
                println!("{}", serde_json::to_string_pretty(&body)?);
                Ok(())
            }
        }
    }
}

impl ConfigCommands {
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Init { output } => {
                let config_path = output.unwrap_or_else(|| {
                    navaja_core::config::default_data_dir().join("navaja.json")
                });

                // Create parent directory if it doesn't exist
                if let Some(parent) = config_path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }

                config::generate_default_config(&config_path)?;
                info!(path = %config_path.display(), "Generated configuration");
                println!("Generated configuration at: {}", config_path.display());
                Ok(())
            }
        }
    }
}
