use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use event_wizard::config::Config;
use event_wizard::logging;
use event_wizard::wizard::{
    CurrentStep, FileStorage, GuardPolicy, Navigation, ProgressStorage, StepKey, WizardError,
    WizardStore,
};
use event_wizard::{ApiError, HttpActivityApi, Organization};

type Store = WizardStore<HttpActivityApi, FileStorage>;

#[derive(Parser)]
#[command(name = "event-wizard")]
#[command(about = "Track and drive event-creation wizard progress")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the effective config to .event-wizard/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Show wizard progress
    Status,

    /// Select the organization new events are created under
    Org {
        /// Organization id
        id: i64,
        /// Organization display name
        name: String,
    },

    /// Resume the wizard for an existing event
    Event {
        /// Event (activity) id
        id: i64,
    },

    /// Create the event; completes the place-type step
    Create {
        /// Online event (livestream) rather than a physical venue
        #[arg(long)]
        online: bool,

        /// Livestream URL for online events
        #[arg(long)]
        livestream_url: Option<String>,
    },

    /// Mark a step complete after it was saved remotely
    Complete {
        /// Step key or slug (e.g. basicInfo, basic-info)
        step: StepKey,
    },

    /// Mark a step incomplete
    Undo {
        /// Step key or slug
        step: StepKey,
    },

    /// Check whether a step page may be opened
    Check {
        /// Step key, slug or page identifier
        step: String,
    },

    /// Fetch the event from the activity API
    Load {
        /// Fetch even if already cached
        #[arg(short, long)]
        force: bool,
    },

    /// Publish the event and clear wizard progress
    Publish,

    /// Clear progress if it belongs to the given event
    Reset {
        /// Event id the progress must belong to
        id: i64,
    },

    /// Clear all wizard progress
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let _logging_handle = logging::init_logging(&config, cli.debug)?;

    match cli.command {
        Commands::Init { force } => {
            let path = Config::local_config_path();
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            let path = config.save()?;
            println!("Wrote {}", path.display());
        }
        Commands::Status => {
            let store = open_store(&config)?;
            print_status(&store);
        }
        Commands::Org { id, name } => {
            let mut store = open_store(&config)?;
            store.set_organization(Organization {
                id,
                name: name.clone(),
            })?;
            println!("Organization set to {name} (#{id})");
        }
        Commands::Event { id } => {
            let mut store = open_store(&config)?;
            store.set_event_id(id)?;
            println!("Now editing event {id}");
            print_status(&store);
        }
        Commands::Create {
            online,
            livestream_url,
        } => {
            let mut store = open_store(&config)?;
            let cancel = cancel_on_ctrl_c();
            let id = store
                .create_event(online, livestream_url, &cancel)
                .await
                .map_err(|e| remote_failure(e, &config, "Failed to create event"))?;
            println!("Created event {id}");
            print_next(&store);
        }
        Commands::Complete { step } => {
            let mut store = open_store(&config)?;
            store.mark_step_complete(step, true)?;
            println!("{} complete", step.label());
            print_next(&store);
        }
        Commands::Undo { step } => {
            let mut store = open_store(&config)?;
            store.mark_step_complete(step, false)?;
            println!("{} marked incomplete", step.label());
        }
        Commands::Check { step } => {
            let store = open_store(&config)?;
            cmd_check(&store, &step);
        }
        Commands::Load { force } => {
            let mut store = open_store(&config)?;
            let cancel = cancel_on_ctrl_c();
            let snapshot = if force {
                store.load_remote_snapshot(&cancel).await
            } else {
                store.ensure_snapshot(&cancel).await
            }
            .map_err(|e| remote_failure(e, &config, "Failed to load event"))?;

            println!("Event {}: {}", snapshot.id, snapshot.display_title());
            if let Some(start) = snapshot.start_time {
                println!("  Starts:  {}", start.to_rfc3339());
            }
            if let Some(location) = &snapshot.location {
                println!("  Where:   {location}");
            } else if snapshot.is_online {
                println!("  Where:   online");
            }
            if !snapshot.tags.is_empty() {
                println!("  Tags:    {}", snapshot.tags.join(", "));
            }
            println!("  Tickets: {} type(s)", snapshot.ticket_types.len());
        }
        Commands::Publish => {
            let mut store = open_store(&config)?;
            let cancel = cancel_on_ctrl_c();
            let id = store
                .publish_event(&cancel)
                .await
                .map_err(|e| remote_failure(e, &config, "Failed to publish event"))?;
            println!("Published event {id}");
            println!("Manage it at {}", event_wizard::wizard::management_path(id));
        }
        Commands::Reset { id } => {
            let mut store = open_store(&config)?;
            if store.reset(id)? {
                println!("Cleared progress for event {id}");
            } else {
                println!("Progress belongs to another event; nothing cleared");
            }
        }
        Commands::Clear => {
            // Bypass the store so a corrupt record can still be removed
            FileStorage::from_config(&config)
                .clear()
                .context("Failed to clear wizard progress")?;
            println!("Wizard progress cleared");
        }
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<Store> {
    let api = HttpActivityApi::from_config(&config.api)
        .context("Failed to configure activity API client")?;
    let storage = FileStorage::from_config(config);
    let path = storage.path().display().to_string();

    let policy = if config.wizard.strict_step_keys {
        GuardPolicy::Strict
    } else {
        GuardPolicy::Lenient
    };

    let store = WizardStore::open(api, storage)
        .with_context(|| format!("Failed to load wizard progress from {path}"))?;
    Ok(store.with_policy(policy))
}

/// Wrap a store error with what the user can do about it
fn remote_failure(err: WizardError, config: &Config, action: &str) -> anyhow::Error {
    let message = match err.api_error().and_then(|api| hint(api, &config.api.token_env)) {
        Some(hint) => format!("{action} ({hint})"),
        None => action.to_string(),
    };
    anyhow::Error::new(err).context(message)
}

fn hint(err: &ApiError, token_env: &str) -> Option<String> {
    let operation = err.operation().unwrap_or("request");
    if err.is_auth_error() {
        Some(format!("{operation} was refused; check the token in ${token_env}"))
    } else if err.is_rate_limited() {
        Some(match err.retry_after() {
            Some(secs) => format!("{operation} was rate limited; retry in {secs}s"),
            None => format!("{operation} was rate limited; retry later"),
        })
    } else {
        None
    }
}

/// Token cancelled on Ctrl-C so an in-flight request never lands afterwards
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling request");
            trigger.cancel();
        }
    });
    token
}

fn print_status(store: &Store) {
    match store.organization() {
        Some(org) => println!("Organization: {} (#{})", org.name, org.id),
        None => println!("Organization: (none)"),
    }
    match store.event_id() {
        Some(id) => println!("Event:        {id}"),
        None => println!("Event:        (not created)"),
    }

    let percent = store.overall_progress_percent();
    let filled = usize::from(percent) / 10;
    println!(
        "Progress:     {:>3}% [{}{}]",
        percent,
        "#".repeat(filled),
        "-".repeat(10 - filled)
    );

    let current = store.guard().current_step_key();
    for (step, done) in store.completion().iter() {
        let mark = if done { "x" } else { " " };
        let marker = if current == CurrentStep::Step(step) {
            "  <- current"
        } else {
            ""
        };
        println!("  [{mark}] {}{marker}", step.label());
    }

    print_next(store);
}

fn print_next(store: &Store) {
    if let Some(id) = store.event_id() {
        println!("Next:         {}", store.guard().next_incomplete_step_path(id));
    }
}

fn cmd_check(store: &Store, step: &str) {
    let guard = store.guard();
    match store.event_id() {
        Some(id) => match guard.check(step, id) {
            Navigation::Allow => println!("allow"),
            Navigation::Redirect(path) => println!("redirect {path}"),
        },
        None if guard.can_access(step) => println!("allow"),
        None => println!("deny (no event created)"),
    }
}
