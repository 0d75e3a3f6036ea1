use clap::Parser;
use color_eyre::Result;
use std::path::Path;
use countdo::{
    Config, Profile, SqliteStorage, TimestampIdGenerator, TodoStore,
    cli::{self, Cli, Commands},
};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    // An explicit --config path wins over the profile's default location
    let config = match &cli.config {
        Some(path) => Config::load_from_path(Path::new(path))?,
        None => Config::load_with_profile(profile)?,
    };

    countdo::logging::init(&config.get_log_path(), &config.log_level)?;
    tracing::debug!(?profile, storage = %config.get_storage_path().display(), "starting");

    let storage_path = config.get_storage_path();
    let storage = SqliteStorage::new(
        storage_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Storage path contains invalid UTF-8"))?,
    )?;

    // The key has to be set before the first load
    let mut store = TodoStore::new(storage, TimestampIdGenerator).with_key(config.storage_key.clone());
    store.load();
    if let Some(e) = store.take_last_error() {
        eprintln!("Warning: saved todos could not be read ({}), starting with an empty list", e);
    }

    // Dispatch to appropriate command handler
    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let app = countdo::tui::App::new(config, store)?;
            countdo::tui::run_event_loop(app)?;
        }
        Commands::Add { text, due, category } => cli::handle_add(text, due, category, &mut store)?,
        Commands::List { search, pending } => cli::handle_list(search, pending, &store)?,
        Commands::Toggle { id } => cli::handle_toggle(id, &mut store)?,
        Commands::Delete { id } => cli::handle_delete(id, &mut store)?,
        Commands::Edit {
            id,
            text,
            due,
            clear_due,
            category,
            clear_category,
        } => cli::handle_edit(id, text, due, clear_due, category, clear_category, &mut store)?,
        Commands::Move { from, to } => cli::handle_move(from, to, &mut store)?,
        Commands::Stats => cli::handle_stats(&store)?,
    }

    Ok(())
}
