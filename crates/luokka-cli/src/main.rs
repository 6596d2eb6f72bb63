//! luokka CLI - FreeIPA class and student administration
//!
//! Without a subcommand, starts the interactive menu. `luokka class`,
//! `luokka student` and `luokka add` run the same operations from scripts.

mod commands;
mod menu;
mod output;
mod session;

use clap::{Parser, Subcommand};
use std::io;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::class::ClassCommands;
use commands::student::StudentCommands;
use menu::Menu;
use session::GlobalArgs;

#[derive(Parser)]
#[command(name = "luokka")]
#[command(about = "luokka - FreeIPA class and student administration")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive menu (the default)
    Menu,
    /// Manage classes
    Class {
        #[command(subcommand)]
        action: ClassCommands,
    },
    /// Manage students
    Student {
        #[command(subcommand)]
        action: StudentCommands,
    },
    /// Add students to a class
    Add {
        /// Class name
        class: String,
        /// Student ids (231054 or o231054), commas allowed
        #[arg(required = true)]
        students: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.global.log_level);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        if let Some(hint) = e
            .downcast_ref::<luokka_core::Error>()
            .and_then(luokka_core::Error::remediation)
        {
            eprintln!("{hint}");
        }
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let admin = session::open(&cli.global)?;

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => {
            let stdin = io::stdin();
            Menu::new(&admin, stdin.lock(), io::stdout()).run()?;
        }
        Commands::Class { action } => commands::class::execute(action, &admin)?,
        Commands::Student { action } => commands::student::execute(action, &admin)?,
        Commands::Add {
            class,
            students,
            json,
        } => commands::add(&admin, &class, &students, json)?,
    }
    Ok(())
}
