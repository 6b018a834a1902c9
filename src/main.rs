//! Command-line entrypoint.
//!
//! Tracing is JSON when `LOG_JSON` is set, pretty otherwise. A `.env` file
//! in the working directory is loaded first.

use clap::{Parser, Subcommand};
use reqwest::Method;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt};

use bounce_session::config::Config;
use bounce_session::contacts::{ConfirmationStatus, ContactQuery, ContactsClient};
use chrono::Utc;
use bounce_session::error::ClientError;
use bounce_session::gateway::RequestOptions;

#[derive(Parser)]
#[command(name = "bounce-session")]
#[command(about = "Admin client for the bounce-house rental API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Sign in and store the session tokens")]
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "BOUNCE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    #[command(about = "Sign out and clear stored tokens")]
    Logout,

    #[command(about = "Show the signed-in user")]
    Whoami,

    #[command(about = "Exchange the stored refresh token for new tokens")]
    Refresh,

    #[command(about = "Send an authenticated request and print the response")]
    Request {
        endpoint: String,
        #[arg(long, short = 'X', default_value = "GET")]
        method: String,
        #[arg(long, short = 'd', help = "JSON request body")]
        data: Option<String>,
    },

    #[command(about = "Contact inquiries")]
    Contacts {
        #[command(subcommand)]
        cmd: ContactsCommands,
    },
}

#[derive(Subcommand)]
enum ContactsCommands {
    #[command(about = "List contacts, one page at a time")]
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
        #[arg(long)]
        delivery_day: Option<String>,
        #[arg(long)]
        confirmed: Option<String>,
    },

    #[command(about = "Pending and confirmed counts plus parties in the next week")]
    Summary {
        #[arg(long)]
        limit: Option<u32>,
    },

    #[command(about = "Show one contact")]
    Show { id: String },

    #[command(about = "Set a contact's confirmation status")]
    Status {
        id: String,
        #[arg(value_parser = parse_status)]
        status: ConfirmationStatus,
    },
}

fn parse_status(s: &str) -> Result<ConfirmationStatus, String> {
    s.parse()
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if json {
        fmt().json().with_env_filter(filter).with_writer(std::io::stderr).init();
    } else {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => tracing::error!("Failed to render output: {}", e),
    }
}

async fn run(cli: Cli, config: Config) -> Result<(), ClientError> {
    let session = bounce_session::connect(&config).await?;

    match cli.command {
        Commands::Login { email, password } => {
            let user = session.login(&email, &password).await?;
            print_json(&user);
        }
        Commands::Logout => {
            session.logout().await;
            println!("Logged out");
        }
        Commands::Whoami => match session.current_user() {
            Some(user) => print_json(&user),
            None => return Err(ClientError::Auth("Not logged in".into())),
        },
        Commands::Refresh => {
            if !session.refresh_token().await {
                return Err(ClientError::SessionExpired);
            }
            println!("Tokens refreshed");
        }
        Commands::Request {
            endpoint,
            method,
            data,
        } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|e| ClientError::Transport(format!("invalid method: {e}")))?;
            let options = RequestOptions {
                method,
                body: data,
                ..RequestOptions::default()
            };
            let resp = session.api_request(&endpoint, options).await?;
            eprintln!("HTTP {}", resp.status());
            println!("{}", resp.text().await?);
        }
        Commands::Contacts { cmd } => {
            let client = ContactsClient::new(session.clone());
            match cmd {
                ContactsCommands::List {
                    page,
                    limit,
                    start_date,
                    end_date,
                    delivery_day,
                    confirmed,
                } => {
                    let query = ContactQuery {
                        page,
                        limit,
                        start_date,
                        end_date,
                        delivery_day,
                        confirmed,
                    };
                    print_json(&client.fetch_contacts(&query).await?);
                }
                ContactsCommands::Summary { limit } => {
                    let query = ContactQuery {
                        limit,
                        ..ContactQuery::default()
                    };
                    print_json(&client.dashboard(&query, Utc::now()).await?);
                }
                ContactsCommands::Show { id } => {
                    print_json(&client.get_contact(&id).await?);
                }
                ContactsCommands::Status { id, status } => {
                    print_json(&client.update_contact_status(&id, status).await?);
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::from(1);
        }
    };
    init_tracing(config.log_json);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if e.requires_login() {
                eprintln!("Run `bounce-session login` to sign in again.");
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
