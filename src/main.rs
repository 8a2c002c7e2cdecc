//! # lambdactl CLI Entry Point
//!
//! Launch, reach and terminate cloud GPU instances by picking from an inline
//! terminal menu.
//!
//! ## Usage
//!
//! ```bash
//! # Print running instances
//! lambdactl list
//!
//! # Pick an offer and an SSH key, then launch
//! lambdactl launch --name trainer
//!
//! # Pick a running instance and open a shell on it
//! lambdactl ssh
//!
//! # Pick a running instance and terminate it
//! lambdactl terminate
//! ```
//!
//! ## Menu Keys
//!
//! - `Ctrl+n` / `Ctrl+j` / `Alt+n` / `Alt+j` - Move selection down
//! - `Ctrl+p` / `Ctrl+k` / `Alt+p` / `Alt+k` - Move selection up
//! - `Ctrl+g` / `Alt+g` - Jump to the first row
//! - `Alt+G` - Jump to the last row
//! - `Enter` - Choose the selected row, or the typed text if the list is empty
//! - `Alt+Enter` - Choose the typed text
//! - `Esc` / `Ctrl+d` - Cancel
//!
//! The menu is drawn on stderr, so stdout stays clean for the result.

use lambdactl::cloud::{Client, Instance, InstanceApi, LaunchRequest, SshKeyCatalog};
use lambdactl::config::Config;
use lambdactl::logging;
use lambdactl::menu::{layout, CrosstermTerminal, Menu, Session};
use lambdactl::rows::{self, Choice};
use lambdactl::ssh::{self, Target};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::terminal::disable_raw_mode;
use lambdactl::menu::Row;
use std::collections::HashMap;
use std::future::Future;
use std::io::{self, Write};
use std::panic;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Width used for tables when stdout is not a terminal.
const FALLBACK_WIDTH: u16 = 80;

/// lambdactl - manage cloud GPU instances from the terminal
#[derive(Parser, Debug)]
#[command(name = "lambdactl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Launch, reach and terminate cloud GPU instances", long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of rows shown at once in menus
    #[arg(
        long,
        global = true,
        value_name = "N",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    lines: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print instances as a table
    List,

    /// Pick an offer and SSH key, then launch an instance
    Launch {
        /// Instance name; prompted for when omitted
        #[arg(long)]
        name: Option<String>,

        /// File system to attach (repeatable)
        #[arg(long = "filesystem", value_name = "NAME")]
        filesystems: Vec<String>,

        /// Cloud-init user data file
        #[arg(long, value_name = "FILE")]
        user_data: Option<PathBuf>,
    },

    /// Pick an instance and open a shell on it
    Ssh {
        /// Remote user; defaults to `ssh_user` from the config file
        #[arg(long)]
        user: Option<String>,
    },

    /// Pick an instance and terminate it
    Terminate,

    /// Print cloud SSH keys and the matching local key files
    Keys,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Restore the terminal before the default hook prints the panic
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        original_hook(panic_info);
    }));

    let result = run_application(args).await;

    let _ = panic::take_hook();

    result
}

async fn run_application(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    logging::init_logging(&config);

    let menu = Menu::new(args.lines.map_or(config.menu_lines, usize::from));
    let client = Client::new(&config.base_url, &config.resolve_api_key()?)?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let command = async {
        match args.command {
            Commands::List => list(&client).await,
            Commands::Keys => keys(&client).await,
            Commands::Launch {
                name,
                filesystems,
                user_data,
            } => {
                let options = LaunchOptions {
                    name,
                    filesystems,
                    user_data,
                };
                launch(&client, menu, options, &cancel).await
            }
            Commands::Ssh { user } => {
                let user = user.unwrap_or_else(|| config.ssh_user.clone());
                remote_shell(&client, menu, &user, config.poll_interval(), &cancel).await
            }
            Commands::Terminate => terminate(&client, menu, config.poll_interval(), &cancel).await,
        }
    };
    interruptible(command, &cancel).await
}

/// Drive `command` unless `cancel` fires first.
///
/// Ctrl-C cancels the token instead of killing the process, so requests
/// and menus in flight are dropped here and the terminal gets restored.
async fn interruptible<F>(command: F, cancel: &CancellationToken) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => anyhow::bail!("Interrupted"),
        result = command => result,
    }
}

fn table_width() -> usize {
    let (width, _) = crossterm::terminal::size().unwrap_or((FALLBACK_WIDTH, 0));
    usize::from(width)
}

fn print_table(rows: &[Choice]) {
    let fields: Vec<Vec<String>> = rows.iter().filter_map(Row::fields).collect();
    for line in layout::stretch(&fields, table_width()) {
        println!("{}", line.trim_end());
    }
}

async fn list(api: &dyn InstanceApi) -> Result<()> {
    let instances = api.instances().await?;
    if instances.is_empty() {
        eprintln!("No instances");
        return Ok(());
    }
    let rows: Vec<Choice> = instances.iter().map(Choice::instance).collect();
    print_table(&rows);
    Ok(())
}

/// Fingerprints of the keys in `~/.ssh`.
fn local_keys() -> HashMap<String, String> {
    let home = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    match ssh::default_ssh_dir() {
        Some(dir) => ssh::local_public_keys(&dir, home.as_deref()),
        None => HashMap::new(),
    }
}

async fn keys(catalog: &dyn SshKeyCatalog) -> Result<()> {
    let catalog = catalog.ssh_keys().await?;
    for error in &catalog.errors {
        eprintln!("{error}");
    }
    print_table(&rows::ssh_key_rows(&catalog, &local_keys()));
    Ok(())
}

struct LaunchOptions {
    name: Option<String>,
    filesystems: Vec<String>,
    user_data: Option<PathBuf>,
}

async fn launch(
    client: &Client,
    menu: Menu,
    options: LaunchOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    let user_data = match &options.user_data {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read user data: {}", path.display()))?,
        ),
        None => None,
    };

    let (offers, catalog) = tokio::try_join!(client.availability(), client.ssh_keys())?;
    if offers.is_empty() {
        anyhow::bail!("No instance type has capacity right now");
    }
    if catalog.keys.is_empty() {
        anyhow::bail!("No SSH keys are registered with the account");
    }

    let (title, key, name) = {
        let mut session = Session::open(CrosstermTerminal)?;

        let Some(picked) = menu
            .pick(&mut session, rows::feed(rows::offer_rows(&offers)), io::stderr(), cancel)
            .await?
        else {
            return Ok(());
        };
        let Some(title) = rows::chosen_offer(&picked, &offers) else {
            session.close()?;
            eprintln!("'{picked}' is not an offer with capacity");
            return Ok(());
        };

        let Some(key) = menu
            .pick(
                &mut session,
                rows::feed(rows::ssh_key_rows(&catalog, &local_keys())),
                io::stderr(),
                cancel,
            )
            .await?
        else {
            return Ok(());
        };
        if !catalog.has_name(&key) {
            session.close()?;
            eprintln!("'{key}' is not a registered SSH key");
            return Ok(());
        }

        let name = match options.name {
            Some(name) => name,
            None => {
                let mut err = io::stderr();
                write!(err, "Instance name (Enter to skip):\r\n")?;
                err.flush()?;
                let Some(name) = menu
                    .pick(&mut session, rows::feed(Vec::<Choice>::new()), io::stderr(), cancel)
                    .await?
                else {
                    return Ok(());
                };
                name
            }
        };

        session.close()?;
        (title, key, name)
    };

    let mut request = LaunchRequest::new(&title, vec![key]);
    request.file_system_names = options.filesystems;
    request.name = Some(name).filter(|n| !n.is_empty());
    request.user_data = user_data;

    info!(%title, "launching");
    let ids = client.launch(&request).await?;
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

/// Show a live instance menu and return the chosen instance.
///
/// A typed id is only accepted if a fresh listing still has it.
async fn pick_instance(
    api: &dyn InstanceApi,
    menu: Menu,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<Option<Instance>> {
    let mut session = Session::open(CrosstermTerminal)?;
    let (tx, rx) = mpsc::channel(64);
    let polling = cancel.child_token();

    let picker = async {
        let picked = menu.pick(&mut session, rx, io::stderr(), cancel).await;
        polling.cancel();
        picked
    };
    let poller = async {
        let polled = rows::poll_instances(api, &tx, interval, &polling).await;
        if let Err(e) = &polled {
            warn!("instance polling stopped: {:#}", e);
        }
        polled
    };
    let (picked, polled) = tokio::join!(picker, poller);
    session.close()?;

    let Some(id) = picked? else {
        return polled.map(|()| None);
    };
    let instances = api.instances().await?;
    match rows::chosen_instance(&id, &instances) {
        Some(instance) => Ok(Some(instance.clone())),
        None => {
            eprintln!("No instance with id '{id}'");
            Ok(None)
        }
    }
}

async fn remote_shell(
    api: &dyn InstanceApi,
    menu: Menu,
    user: &str,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    let Some(instance) = pick_instance(api, menu, interval, cancel).await? else {
        return Ok(());
    };

    let target = Target::new(user, instance.ip.clone().unwrap_or_default())?;
    let code = ssh::connect(&target)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

async fn terminate(
    api: &dyn InstanceApi,
    menu: Menu,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    let Some(instance) = pick_instance(api, menu, interval, cancel).await? else {
        return Ok(());
    };

    info!(id = %instance.id, "terminating");
    api.terminate(std::slice::from_ref(&instance.id)).await?;
    println!("{}", instance.id);
    Ok(())
}
