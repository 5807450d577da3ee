mod config;
mod error;
mod output;

use std::path::PathBuf;

use chrono::{Days, Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use zeolite_core::{DateRange, Half, Query, SchemaVersion, execute_query};
use zeolite_store::{AvailabilityStore, FjallStore, OwnerProfile};

use crate::config::{build_interpreter, load_config, resolve_owner, resolve_store_path};
use crate::error::ZeoError;
use crate::output::{print_query, print_results};

#[derive(Parser)]
#[command(name = "zeo")]
#[command(about = "Zeolite availability tools", long_about = None)]
struct Cli {
    /// Path to the availability store
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Calendar owner
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Interpret requests locally without calling the remote model
    ///
    /// `ask` and `interpret` need an OpenRouter API key unless this is set.
    /// The key is checked when one of those commands starts, before the store
    /// is opened; other commands never look for it.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Block half of a day, or the whole day when no half is given
    Block {
        date: NaiveDate,
        /// am or pm
        half: Option<Half>,
        #[arg(long)]
        label: Option<String>,
    },
    /// Unblock half of a day, or the whole day when no half is given
    Unblock {
        date: NaiveDate,
        /// am or pm
        half: Option<Half>,
    },
    /// Show day states
    Status {
        /// First date shown (defaults to today)
        from: Option<NaiveDate>,
        #[arg(short, long, default_value_t = 7)]
        days: u64,
    },
    /// Interpret a free-text request and run it
    Ask { text: Vec<String> },
    /// Show the structured query for a free-text request
    Interpret { text: Vec<String> },
    /// Run a structured query given as JSON
    Query { json: String },
    /// Print the availability document
    Export {
        #[arg(long, default_value_t = 2)]
        schema_version: u8,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge an exported document into the store
    Import { path: PathBuf },
    /// Show or update the owner profile
    Profile {
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        timezone: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
}

impl Command {
    fn interprets(&self) -> bool {
        matches!(self, Command::Ask { .. } | Command::Interpret { .. })
    }
}

fn halves(half: Option<Half>) -> Vec<Half> {
    match half {
        Some(half) => vec![half],
        None => vec![Half::Am, Half::Pm],
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ZEOLITE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config();

    // Fail before touching the store when the credential is missing.
    let interpreter = if cli.command.interprets() {
        Some(build_interpreter(&config, cli.offline)?)
    } else {
        None
    };

    let path = resolve_store_path(cli.store, &config);
    std::fs::create_dir_all(&path).map_err(ZeoError::from)?;
    let store = AvailabilityStore::new(
        FjallStore::open(&path).map_err(ZeoError::from)?,
        resolve_owner(cli.owner, &config),
    );
    let today = Local::now().date_naive();

    match cli.command {
        Command::Block { date, half, label } => {
            let mut data = store.load_or_default()?;
            let state = store.batch(&mut data, |data| {
                halves(half)
                    .into_iter()
                    .map(|half| data.block(date, half, label.clone()))
                    .last()
            })?;
            if let Some(state) = state {
                println!("{date}  {state}");
            }
        }
        Command::Unblock { date, half } => {
            let mut data = store.load_or_default()?;
            let state = store.batch(&mut data, |data| {
                halves(half)
                    .into_iter()
                    .map(|half| data.unblock(date, half))
                    .last()
            })?;
            if let Some(state) = state {
                println!("{date}  {state}");
            }
        }
        Command::Status { from, days } => {
            let data = store.load_or_default()?;
            let start = from.unwrap_or(today);
            let end = start
                .checked_add_days(Days::new(days.saturating_sub(1)))
                .unwrap_or(start);
            for date in DateRange::new(start, end).dates() {
                match data.day(date).and_then(|record| record.event_label()) {
                    Some(label) => println!("{date}  {} ({label})", data.state_on(date)),
                    None => println!("{date}  {}", data.state_on(date)),
                }
            }
        }
        Command::Ask { text } => {
            let Some(interpreter) = interpreter else {
                return Ok(());
            };
            let interpretation = interpreter.interpret(&text.join(" "), today).await?;
            let data = store.load_or_default()?;
            print_results(&execute_query(&data, &interpretation.query)?);
        }
        Command::Interpret { text } => {
            let Some(interpreter) = interpreter else {
                return Ok(());
            };
            let interpretation = interpreter.interpret(&text.join(" "), today).await?;
            print_query(&interpretation.query);
            println!("{}", serde_json::to_string_pretty(&interpretation.query)?);
            eprintln!("interpreted by {:?}", interpretation.source);
        }
        Command::Query { json } => {
            let value: serde_json::Value = serde_json::from_str(&json)?;
            let query = Query::from_json(value).map_err(ZeoError::from)?;
            let data = store.load_or_default()?;
            print_results(&execute_query(&data, &query)?);
        }
        Command::Export {
            schema_version,
            output,
        } => {
            let version = SchemaVersion::try_from(schema_version)
                .map_err(|_| ZeoError::SchemaVersion(schema_version))?;
            let document = store.export_as(version)?;
            match output {
                Some(path) => std::fs::write(path, document)?,
                None => println!("{document}"),
            }
        }
        Command::Import { path } => {
            let payload = std::fs::read_to_string(&path)?;
            let data = store.import(&payload)?;
            println!("{} days stored", data.days().len());
        }
        Command::Profile {
            display_name,
            timezone,
            email,
        } => {
            let mut profile = store
                .load_profile()?
                .unwrap_or_else(|| OwnerProfile::new(store.owner_id()));
            let changed = display_name.is_some() || timezone.is_some() || email.is_some();
            profile.display_name = display_name.or(profile.display_name);
            profile.timezone = timezone.or(profile.timezone);
            profile.email = email.or(profile.email);
            if changed {
                store.save_profile(&profile)?;
            }
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }

    Ok(())
}
