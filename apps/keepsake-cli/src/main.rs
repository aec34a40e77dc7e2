use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use keepsake_common::{PlayerId, PlayerRecord, Skill};
use keepsake_persist::{
    CURRENT_VERSION, LoadStatus, PersistConfig, PlayerStore, SAVE_MAGIC, codec,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keepsake-cli", about = "CLI tool for player save files")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON persistence config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Save directory (overrides the config file)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print tool version and save format info
    Info,
    /// Decode a save file and print the record
    Inspect {
        file: PathBuf,
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a save file's header, checksum and body
    Validate { file: PathBuf },
    /// Rewrite a player's save at the current format version
    Upgrade {
        id: PlayerId,
        /// Rewrite even if varps, inventories or afk zones would be dropped
        #[arg(short, long)]
        force: bool,
    },
    /// Write a new-player save
    Create {
        id: PlayerId,
        /// Overwrite an existing save
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("keepsake-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", keepsake_common::crate_info());
            println!("persist: {}", keepsake_persist::crate_info());
            println!("format: magic={SAVE_MAGIC:#06x}, version={CURRENT_VERSION}");
        }
        Commands::Inspect { file, json } => {
            let record = read_record(&file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print_record(&record);
            }
        }
        Commands::Validate { file } => {
            println!("{}", validate(&file)?);
        }
        Commands::Upgrade { id, force } => {
            let store = open_store(cli.config.as_deref(), cli.root)?;
            upgrade(&store, &id, force)?;
            println!("{id}: rewritten at version {CURRENT_VERSION}");
        }
        Commands::Create { id, force } => {
            let store = open_store(cli.config.as_deref(), cli.root)?;
            create(&store, &id, force)?;
            println!("{id}: created {}", store.files().path_for(&id).display());
        }
    }

    Ok(())
}

fn open_store(config: Option<&Path>, root: Option<PathBuf>) -> anyhow::Result<PlayerStore> {
    let mut config = match config {
        Some(path) => PersistConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PersistConfig::default(),
    };
    if let Some(root) = root {
        config.root = root;
    }
    Ok(PlayerStore::open(config)?)
}

fn read_record(file: &Path) -> anyhow::Result<PlayerRecord> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    codec::decode(&bytes).with_context(|| format!("decoding {}", file.display()))
}

/// One-line verdict for a save file; errors when the file would be rejected.
fn validate(file: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let header = codec::read_header(&bytes)
        .with_context(|| format!("{}: header check failed", file.display()))?;
    let record = codec::decode(&bytes)
        .with_context(|| format!("{}: body decode failed", file.display()))?;

    let mut verdict = format!(
        "{}: ok, version {}, {} bytes, checksum {:#010x}",
        file.display(),
        header.version,
        header.len,
        header.stored
    );
    if header.version < CURRENT_VERSION {
        verdict.push_str(&format!(" (upgradable to {CURRENT_VERSION})"));
    }
    if record.has_decode_only_data() {
        verdict.push_str(&format!(", {} not kept on re-save", dropped_summary(&record)));
    }
    Ok(verdict)
}

/// What a re-save would leave out of `record`.
fn dropped_summary(record: &PlayerRecord) -> String {
    let slots: usize = record.inventories.iter().map(|inv| inv.occupied()).sum();
    format!(
        "{} varps / {} inventories ({} occupied slots) / {} afk zones (last {})",
        record.varps.len(),
        record.inventories.len(),
        slots,
        record.afk_zones.len(),
        record.last_afk_zone
    )
}

/// Re-save `id` at the current version. Refuses, unless `force`, when the
/// stored record carries data the current format does not write.
fn upgrade(store: &PlayerStore, id: &PlayerId, force: bool) -> anyhow::Result<()> {
    let outcome = store.load(id)?;
    if let LoadStatus::Fresh(reason) = &outcome.status {
        bail!("{id}: no usable save to upgrade ({reason:?})");
    }
    if outcome.record.has_decode_only_data() && !force {
        bail!(
            "{id}: upgrading would drop {} (use --force to rewrite anyway)",
            dropped_summary(&outcome.record)
        );
    }
    store.save(id, &outcome.record)?;
    info!(%id, "save upgraded");
    Ok(())
}

fn create(store: &PlayerStore, id: &PlayerId, force: bool) -> anyhow::Result<()> {
    if store.files().exists(id) && !force {
        bail!("{id}: save already exists (use --force to overwrite)");
    }
    store.save(id, &PlayerRecord::new_player())?;
    Ok(())
}

fn print_record(record: &PlayerRecord) {
    println!(
        "position: x={} z={} level={}",
        record.x, record.z, record.level
    );
    println!(
        "appearance: body={:?} colors={:?} gender={} designed={}",
        record.body, record.colors, record.gender, record.design_complete
    );
    println!(
        "run energy: {} playtime: {} last login: {}",
        record.run_energy, record.playtime, record.last_login
    );
    println!(
        "chat: public={} private={} trade={}",
        record.chat.public, record.chat.private, record.chat.trade
    );
    println!("total level: {}", record.total_level());
    for skill in Skill::ALL {
        let state = record.skill(skill);
        println!("  {:<12} {:>3} {:>10}", skill.name(), state.level, state.experience);
    }
    if record.has_decode_only_data() {
        println!(
            "decode-only: {} varps, {} inventories, {} afk zones (last {})",
            record.varps.len(),
            record.inventories.len(),
            record.afk_zones.len(),
            record.last_afk_zone
        );
    }
}
