mod config;
mod logging;

use anyhow::{Context, Result};
use base64::Engine as _;
use clap::{Parser, Subcommand};
use pathshala::domain::bootstrap::NO_TENANT_MESSAGE;
use pathshala::{
    BootstrapState, ContactInfoUpdate, Credentials, GeneralInfoUpdate, LeadershipUpdate,
    LogoUpload, PathshalaClient, PathshalaError, TenantSlug, TenantState, dashboard,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;

/// Pathshala - multi-tenant school client
#[derive(Parser)]
#[command(name = "pathshala")]
#[command(about = "Pathshala - multi-tenant school client")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Client state file (overrides config)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Print effective configuration (JSON) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve tenant and session for a host and print the dashboard
    Bootstrap {
        /// Host the client is reached on, e.g. vk-learnings.vk-services.shop
        #[arg(long)]
        host: String,
    },
    /// Log in to the tenant of a host
    Login {
        #[arg(long)]
        host: String,
        #[arg(long)]
        user: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Log out and drop stored tokens
    Logout,
    /// Save a settings section of the tenant
    Settings {
        #[arg(long)]
        host: String,
        #[command(subcommand)]
        section: Section,
    },
}

#[derive(Subcommand)]
enum Section {
    General {
        #[arg(long)]
        name: String,
        #[arg(long)]
        code: String,
        /// school, college or coaching
        #[arg(long = "type")]
        kind: String,
        #[arg(long)]
        subdomain: String,
    },
    Contact {
        #[arg(long)]
        primary_phone: String,
        #[arg(long)]
        secondary_phone: Option<String>,
        #[arg(long)]
        fax: Option<String>,
        #[arg(long)]
        email: String,
        #[arg(long)]
        alternate_email: Option<String>,
    },
    Leadership {
        #[arg(long)]
        principal_name: String,
        #[arg(long)]
        principal_phone: String,
        #[arg(long)]
        principal_email: String,
        #[arg(long)]
        admin_name: Option<String>,
        #[arg(long)]
        admin_phone: Option<String>,
    },
    Logo {
        /// Image file to upload
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_verbosity(cli.verbose);
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    if let Some(state) = cli.state {
        config.storage.path = Some(state);
    }

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init(&config.logging)?;

    let Some(command) = cli.command else {
        anyhow::bail!("no command given; see `pathshala --help`");
    };

    let client = PathshalaClient::from_config(&config.client_config())
        .context("failed to initialize client")?;

    match command {
        Commands::Bootstrap { host } => bootstrap(&client, &host).await,
        Commands::Login {
            host,
            user,
            password,
        } => login(&client, &host, user, password).await,
        Commands::Logout => logout(&client).await,
        Commands::Settings { host, section } => settings(&client, &host, section).await,
    }
}

fn slug_for(client: &PathshalaClient, host: &str) -> Result<TenantSlug> {
    client
        .resolve(host)
        .ok_or_else(|| anyhow::anyhow!("{NO_TENANT_MESSAGE} (host: {host})"))
}

async fn bootstrap(client: &PathshalaClient, host: &str) -> Result<()> {
    let mut gate = client.bootstrap(host);
    gate.mount();

    match gate.run().await {
        BootstrapState::Ready(ctx) => {
            let view = dashboard(&ctx.tenant, &ctx.user);
            println!("{}", serde_json::to_string_pretty(&view)?);
            Ok(())
        }
        BootstrapState::Unauthenticated => {
            println!("Not logged in. Run `pathshala login --host {host} --user <name>`.");
            Ok(())
        }
        BootstrapState::NoTenant => anyhow::bail!("{NO_TENANT_MESSAGE}"),
        BootstrapState::TenantError { message } => {
            anyhow::bail!("failed to load pathshala: {message}")
        }
        BootstrapState::SessionError { message } => {
            anyhow::bail!("failed to load session: {message}")
        }
        BootstrapState::Unmounted
        | BootstrapState::ResolvingTenant
        | BootstrapState::ResolvingSession => {
            anyhow::bail!("bootstrap did not settle; another fetch is still in flight")
        }
    }
}

async fn login(
    client: &PathshalaClient,
    host: &str,
    user: String,
    password: Option<String>,
) -> Result<()> {
    let slug = slug_for(client, host)?;
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    let user_name = client
        .sessions()
        .login(&slug, &Credentials::new(user, password))
        .await
        .map_err(describe)?;
    println!("Logged in to {slug} as {user_name}");
    Ok(())
}

fn read_password() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

async fn logout(client: &PathshalaClient) -> Result<()> {
    let result = client.sessions().logout().await;
    if let Err(e) = result {
        // Local tokens are gone either way
        tracing::warn!(error = %e, "server logout failed");
        println!("Logged out locally; the server reported: {}", e.message());
    } else {
        println!("Logged out");
    }
    Ok(())
}

async fn settings(client: &PathshalaClient, host: &str, section: Section) -> Result<()> {
    let slug = slug_for(client, host)?;
    if let TenantState::Failed { message } = client.tenants().fetch(&slug).await {
        anyhow::bail!("failed to load pathshala: {message}");
    }

    let service = client.settings();
    let saved = match section {
        Section::General {
            name,
            code,
            kind,
            subdomain,
        } => {
            service
                .update_general(&GeneralInfoUpdate {
                    pathshala_name: name,
                    pathshala_code: code,
                    pathshala_type: kind,
                    subdomain,
                })
                .await
        }
        Section::Contact {
            primary_phone,
            secondary_phone,
            fax,
            email,
            alternate_email,
        } => {
            service
                .update_contact(&ContactInfoUpdate {
                    primary_phone,
                    secondary_phone,
                    fax_number: fax,
                    email,
                    alternate_email,
                })
                .await
        }
        Section::Leadership {
            principal_name,
            principal_phone,
            principal_email,
            admin_name,
            admin_phone,
        } => {
            service
                .update_leadership(&LeadershipUpdate {
                    principal_name,
                    principal_phone,
                    principal_email,
                    admin_contact_name: admin_name,
                    admin_contact_phone: admin_phone,
                })
                .await
        }
        Section::Logo { file } => service.update_logo(&logo_upload(&file)?).await,
    }
    .map_err(describe)?;

    println!("{}", serde_json::to_string_pretty(&saved)?);
    Ok(())
}

fn logo_upload(path: &Path) -> Result<LogoUpload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let file_type = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(LogoUpload {
        file_name,
        file_type: file_type.to_owned(),
        file_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        file_extension: extension,
    })
}

/// Flatten field errors into one readable error.
fn describe(err: PathshalaError) -> anyhow::Error {
    match err {
        PathshalaError::Validation(errors) => {
            let lines: Vec<String> = errors.iter().map(|e| format!("  {e}")).collect();
            anyhow::anyhow!("invalid input:\n{}", lines.join("\n"))
        }
        other => anyhow::Error::new(other),
    }
}
