use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use bang_core::{
    ClientConfig, ConfigCatalog, ConfigDraftBuilder, HttpApiClient, IncidentEntry, IncidentFeed,
    RevertOutcome, SessionError, SessionStore, VersionHistory,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod forms;
mod prompt;
mod viewer;

#[derive(Debug, Parser)]
#[command(name = "bangctl")]
#[command(about = "Operator console for the bangarang alerting server")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, env = "BANGARANG_URL", default_value = "http://localhost:8081")]
    url: String,

    #[arg(long, env = "BANGARANG_SESSION_FILE", default_value = "./.bangctl/session.json")]
    session_file: PathBuf,

    #[arg(long, default_value_t = 5000)]
    interval_ms: u64,

    #[arg(long, default_value_t = 10000)]
    timeout_ms: u64,
}

#[derive(Debug, Subcommand)]
enum Command {
    Login {
        #[arg(long)]
        user: String,
        #[arg(long, env = "BANGARANG_PASSWORD", hide_env_values = true)]
        pass: String,
    },
    Logout,
    Status,
    Incidents {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    Watch {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    Resolve {
        key: String,
    },
    Escalations {
        #[command(subcommand)]
        command: EscalationCommand,
    },
    Policies {
        #[command(subcommand)]
        command: PolicyCommand,
    },
    Versions {
        #[command(subcommand)]
        command: VersionCommand,
    },
    View,
}

#[derive(Debug, Subcommand)]
enum EscalationCommand {
    List,
    Delete {
        name: String,
    },
    /// Steps look like `email:recipients=a@x.com,b@x.com;port=587` or `console`.
    Create {
        name: String,
        #[arg(long = "step", required = true)]
        steps: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
enum PolicyCommand {
    List,
    Delete { name: String },
    Create(PolicyArgs),
}

#[derive(Debug, Args)]
struct PolicyArgs {
    name: String,
    #[arg(long = "match", value_parser = forms::parse_chip)]
    matches: Vec<(String, String)>,
    #[arg(long = "not-match", value_parser = forms::parse_chip)]
    not_matches: Vec<(String, String)>,
    #[arg(long, default_value_t = 1)]
    not_match_occurrences: u32,
    #[arg(long = "crit", value_parser = forms::parse_chip)]
    crit: Vec<(String, String)>,
    #[arg(long, default_value_t = 1)]
    crit_occurrences: u32,
    #[arg(long)]
    crit_escalation: Option<String>,
    #[arg(long = "warn", value_parser = forms::parse_chip)]
    warn: Vec<(String, String)>,
    #[arg(long, default_value_t = 1)]
    warn_occurrences: u32,
    #[arg(long)]
    warn_escalation: Option<String>,
}

#[derive(Debug, Subcommand)]
enum VersionCommand {
    List,
    Revert {
        hash: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
    Ndjson,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let config = ClientConfig {
        base_url: cli.url.clone(),
        poll_interval: Duration::from_millis(cli.interval_ms),
        request_timeout: Duration::from_millis(cli.timeout_ms),
        session_file: Some(cli.session_file.clone()),
    };

    let session = Arc::new(match &config.session_file {
        Some(path) => SessionStore::open(path),
        None => SessionStore::in_memory(),
    });
    let client = Arc::new(HttpApiClient::new(&config, Arc::clone(&session))?);

    match cli.command {
        Command::Login { user, pass } => match session.login(client.as_ref(), &user, &pass).await {
            Ok(()) => println!("logged in as {user}"),
            Err(SessionError::Api(err)) if err.is_auth_failure() => {
                bail!("Invalid username/password")
            }
            Err(err) => return Err(err.into()),
        },
        Command::Logout => {
            session.logout()?;
            println!("logged out");
        }
        Command::Status => {
            let current = session.session();
            println!(
                "server={} logged_in={} token={}",
                config.base_url,
                current.logged_in,
                if current.token.is_some() { "present" } else { "absent" }
            );
        }
        Command::Incidents { format } => {
            let feed = IncidentFeed::new(client, config.poll_interval);
            feed.refresh().await?;
            print_incidents(&feed.incidents(), format)?;
        }
        Command::Watch { format } => {
            watch_loop(client, &session, config.poll_interval, format).await?;
        }
        Command::Resolve { key } => {
            let feed = IncidentFeed::new(client, config.poll_interval);
            feed.resolve(&key).await?;
            println!("resolved {key}; {} incident(s) remain", feed.incidents().len());
        }
        Command::Escalations { command } => run_escalations(client, command).await?,
        Command::Policies { command } => run_policies(client, command).await?,
        Command::Versions { command } => run_versions(client, command).await?,
        Command::View => {
            let mut feed = IncidentFeed::new(client, config.poll_interval);
            viewer::run_viewer(&mut feed, &session).await?;
        }
    }

    Ok(())
}

async fn watch_loop(
    client: Arc<HttpApiClient>,
    session: &SessionStore,
    interval: Duration,
    format: OutputFormat,
) -> Result<()> {
    let mut feed = IncidentFeed::new(client, interval);
    let mut updates = feed.subscribe();
    let mut reload = session.subscribe();
    feed.start().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("received ctrl-c, stopping");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let incidents = updates.borrow_and_update().clone();
                print_incidents(&incidents, format)?;
                info!(count = incidents.len(), "tick");
            }
            // Published when a request sees the session file change.
            changed = reload.changed() => {
                if changed.is_err() {
                    break;
                }
                info!("session changed, restarting incident feed");
                feed.stop();
                feed.start().await;
            }
        }
    }

    feed.stop();
    Ok(())
}

async fn run_escalations(client: Arc<HttpApiClient>, command: EscalationCommand) -> Result<()> {
    match command {
        EscalationCommand::List => {
            let escalations = ConfigCatalog::new(client).escalations().await?;
            if escalations.is_empty() {
                println!("no escalations configured");
            }
            for (name, steps) in escalations {
                println!("{name}");
                for (idx, step) in steps.iter().enumerate() {
                    println!("  {}. {} {}", idx + 1, step.kind.title(), serde_json::to_string(&step.options)?);
                }
            }
        }
        EscalationCommand::Delete { name } => {
            ConfigCatalog::new(client).delete_escalation(&name).await?;
            println!("deleted escalation {name}");
        }
        EscalationCommand::Create { name, steps } => {
            let mut builder = ConfigDraftBuilder::escalation(client);
            let draft = builder.escalation_mut()?;
            draft.set_name(name);
            for spec in &steps {
                forms::apply_step_spec(draft, spec)?;
            }
            let name = builder.submit().await?;
            println!("saved escalation {name} ({} step(s))", steps.len());
        }
    }
    Ok(())
}

async fn run_policies(client: Arc<HttpApiClient>, command: PolicyCommand) -> Result<()> {
    match command {
        PolicyCommand::List => {
            let policies = ConfigCatalog::new(client).policies().await?;
            if policies.is_empty() {
                println!("no policies configured");
            }
            for (name, policy) in policies {
                let marker = if policy.is_inert() { " (inert)" } else { "" };
                println!("{name}{marker}");
                println!("  {}", serde_json::to_string(&policy)?);
            }
        }
        PolicyCommand::Delete { name } => {
            ConfigCatalog::new(client).delete_policy(&name).await?;
            println!("deleted policy {name}");
        }
        PolicyCommand::Create(args) => {
            let catalog = ConfigCatalog::new(Arc::clone(&client));
            let mut builder = ConfigDraftBuilder::policy(client);
            let draft = builder.policy_mut()?;
            draft.set_name(args.name);
            for (key, value) in args.matches {
                draft.add_match(key, value)?;
            }
            for (key, value) in args.not_matches {
                draft.add_not_match(key, value)?;
            }
            draft.set_not_match_occurrences(args.not_match_occurrences);
            for (key, value) in args.crit {
                draft.crit_mut().add_chip(key, value)?;
            }
            draft.crit_mut().set_occurrences(args.crit_occurrences);
            draft.crit_mut().set_escalation(args.crit_escalation);
            for (key, value) in args.warn {
                draft.warn_mut().add_chip(key, value)?;
            }
            draft.warn_mut().set_occurrences(args.warn_occurrences);
            draft.warn_mut().set_escalation(args.warn_escalation);

            let targets = [draft.crit().escalation(), draft.warn().escalation()];
            if targets.iter().any(Option::is_some) {
                match catalog.escalation_names().await {
                    Ok(known) => {
                        for target in targets.into_iter().flatten() {
                            if !known.iter().any(|name| name == target) {
                                warn!(escalation = target, "escalation is not configured on the server");
                            }
                        }
                    }
                    Err(err) => warn!(%err, "could not list escalations"),
                }
            }
            for (section, condition) in [("crit", draft.crit()), ("warn", draft.warn())] {
                if !condition.chips().is_empty() && condition.escalation().is_none() {
                    warn!(section, "conditions without an escalation target are left out");
                }
            }

            let name = builder.submit().await?;
            println!("saved policy {name}");
        }
    }
    Ok(())
}

async fn run_versions(client: Arc<HttpApiClient>, command: VersionCommand) -> Result<()> {
    let mut history = VersionHistory::new(client);
    match command {
        VersionCommand::List => {
            history.fetch_snapshots().await?;
            for snapshot in history.snapshots() {
                println!("{}  {}", snapshot.hash, snapshot.display_date());
            }
        }
        VersionCommand::Revert { hash, yes } => {
            history.fetch_snapshots().await?;
            if history.snapshot(&hash).is_none() {
                warn!(hash = %hash, "hash not in the fetched history");
            }
            let confirm = prompt::TerminalConfirm { assume_yes: yes };
            match history.request_revert(&hash, &confirm).await? {
                RevertOutcome::Reverted => println!("config reverted to {hash}"),
                RevertOutcome::Cancelled => println!("revert cancelled"),
            }
        }
    }
    Ok(())
}

fn print_incidents(incidents: &[IncidentEntry], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(incidents)?);
        }
        OutputFormat::Ndjson => {
            println!("{}", serde_json::to_string(incidents)?);
        }
        OutputFormat::Human => {
            println!("=== Incidents ({}) ===", incidents.len());
            for entry in incidents {
                println!(
                    "{:<9} {}  [{}]",
                    entry.incident.status.label(),
                    entry.incident.describe(),
                    entry.key
                );
            }
        }
    }
    Ok(())
}
