//! MXL_CLI - Median XL character save file inspector and editor.
//!
//! A thin driver over `mxl_save`: load a character, run one mutation (or
//! none, for a plain inspect/round-trip), and write the result back out.

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use mxl_save::{CatalogPaths, Character, CharacterCodec, DataCatalog, Item};
use mxl_save::constants::{DifficultyTier, EquippedLocation, Location, Rarity, Storage};

use error::{CliError, Result};

#[derive(Parser, Debug)]
#[command(name = "mxl_cli")]
#[command(author = "Median XL Save Tools")]
#[command(version = "0.1.0")]
#[command(about = "Inspect and mutate Median XL character save files", long_about = None)]
struct Args {
    /// Path to the character save file (.d2s)
    #[arg(value_name = "SAVE_FILE")]
    save_path: PathBuf,

    /// Directory containing the five packed data tables
    /// (base_items.dat, item_types.dat, item_mods.dat, item_stats.dat, skills.dat)
    #[arg(short = 't', long, value_name = "DIR")]
    tables: PathBuf,

    /// Packed-table symmetric key, base64url. Falls back to MXL_SAVE_DATA_KEY.
    #[arg(short = 'k', long)]
    key: Option<String>,

    /// Write the result to a different path instead of overwriting SAVE_FILE
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Copy SAVE_FILE here before writing, if SAVE_FILE is being overwritten
    #[arg(short, long, value_name = "PATH")]
    backup: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of the character and its items; writes nothing back.
    Inspect,
    /// Decode then re-encode unmodified, to smoke-test the codec.
    Resave,
    /// Reposition an item within a storage grid or equip slot.
    ChangePosition {
        item: usize,
        #[arg(value_enum)]
        location: LocationArg,
        #[arg(long)]
        equipped_location: Option<EquippedLocationArg>,
        #[arg(long)]
        storage: Option<StorageArg>,
        #[arg(long, default_value_t = 0)]
        x: u64,
        #[arg(long, default_value_t = 0)]
        y: u64,
    },
    /// Overwrite an item's unique id.
    UpdateId { item: usize, new_id: u64 },
    /// Add sockets up to the item's base maximum.
    MaximizeSockets { item: usize },
    /// Overwrite an item's level.
    ChangeLevel { item: usize, level: u64 },
    /// Overwrite an item's 4-character base code.
    ChangeCode { item: usize, code: String },
    /// Overwrite an item's maximum durability.
    ChangeMaxDurability { item: usize, value: i64 },
    /// Set or clear an item's ethereal bit.
    SetEthereal { item: usize, ethereal: bool },
    /// Change an item's rarity, replacing its rarity-detail block.
    ChangeRarity {
        item: usize,
        #[arg(value_enum)]
        rarity: RarityArg,
    },
    /// Add (or overwrite) a modifier by base mod id.
    AddMod {
        item: usize,
        base_id: u64,
        /// Comma-separated `code=value` pairs, e.g. `value=20`.
        #[arg(default_value = "")]
        values: String,
    },
    /// Re-encode an existing modifier (looked up by logical id) with new values.
    EditMod {
        item: usize,
        logical_id: String,
        #[arg(default_value = "")]
        values: String,
    },
    /// Remove a modifier by logical id.
    DeleteMod { item: usize, logical_id: String },
    /// Remove all mods except protected families.
    ClearMods {
        item: usize,
        #[arg(long)]
        include_affixes: bool,
    },
    /// Set both affix-count mods ("is_prefix"/"is_suffix") to 3.
    MaximizeAffixes { item: usize },
    /// Apply a named shrine's mod bundle; "Eerie" scales up for body armor/2H weapons.
    ShrineBless { item: usize, name: String },
    /// Apply a named cube upgrade formula.
    Upgrade { item: usize, formula: String },
    /// Apply a named corruption outcome (additive merge).
    Corrupt { item: usize, outcome: String },
    /// Deep-copy an item under a new unique id (current wall-clock seconds).
    Clone { item: usize },
    /// Make one difficulty the sole active one, at the given act.
    SetDifficulty {
        #[arg(value_enum)]
        difficulty: DifficultyArg,
        act: u8,
    },
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum DifficultyArg {
    Normal,
    Nightmare,
    Hell,
}

impl From<DifficultyArg> for DifficultyTier {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Normal => DifficultyTier::Normal,
            DifficultyArg::Nightmare => DifficultyTier::Nightmare,
            DifficultyArg::Hell => DifficultyTier::Hell,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum LocationArg {
    Stored,
    Equipped,
    Belt,
    Ground,
    Cursor,
    Socketed,
}

impl From<LocationArg> for Location {
    fn from(arg: LocationArg) -> Self {
        match arg {
            LocationArg::Stored => Location::Stored,
            LocationArg::Equipped => Location::Equipped,
            LocationArg::Belt => Location::Belt,
            LocationArg::Ground => Location::Ground,
            LocationArg::Cursor => Location::Cursor,
            LocationArg::Socketed => Location::Socketed,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum EquippedLocationArg {
    Head,
    Neck,
    Torso,
    RightHand,
    LeftHand,
    RightRing,
    LeftRing,
    Belt,
}

impl From<EquippedLocationArg> for EquippedLocation {
    fn from(arg: EquippedLocationArg) -> Self {
        match arg {
            EquippedLocationArg::Head => EquippedLocation::Head,
            EquippedLocationArg::Neck => EquippedLocation::Neck,
            EquippedLocationArg::Torso => EquippedLocation::Torso,
            EquippedLocationArg::RightHand => EquippedLocation::RightHand,
            EquippedLocationArg::LeftHand => EquippedLocation::LeftHand,
            EquippedLocationArg::RightRing => EquippedLocation::RightRing,
            EquippedLocationArg::LeftRing => EquippedLocation::LeftRing,
            EquippedLocationArg::Belt => EquippedLocation::Belt,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum StorageArg {
    Inventory,
    HoradricCube,
    Stash,
}

impl From<StorageArg> for Storage {
    fn from(arg: StorageArg) -> Self {
        match arg {
            StorageArg::Inventory => Storage::Inventory,
            StorageArg::HoradricCube => Storage::HoradricCube,
            StorageArg::Stash => Storage::Stash,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum RarityArg {
    Low,
    Normal,
    Superior,
    Magic,
    Set,
    Rare,
    Unique,
    Crafted,
    Tempered,
}

impl From<RarityArg> for Rarity {
    fn from(arg: RarityArg) -> Self {
        match arg {
            RarityArg::Low => Rarity::Low,
            RarityArg::Normal => Rarity::Normal,
            RarityArg::Superior => Rarity::Superior,
            RarityArg::Magic => Rarity::Magic,
            RarityArg::Set => Rarity::Set,
            RarityArg::Rare => Rarity::Rare,
            RarityArg::Unique => Rarity::Unique,
            RarityArg::Crafted => Rarity::Crafted,
            RarityArg::Tempered => Rarity::Tempered,
        }
    }
}

/// Parse `"code=value,code2=value2"` into pairs; an empty string is no pairs.
fn parse_values(raw: &str) -> Result<Vec<(String, i64)>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|pair| {
            let (code, value) = pair
                .split_once('=')
                .ok_or_else(|| CliError::MalformedValues(raw.to_string()))?;
            let value: i64 = value
                .trim()
                .parse()
                .map_err(|_| CliError::MalformedValues(raw.to_string()))?;
            Ok((code.trim().to_string(), value))
        })
        .collect()
}

fn resolve_key(cli_key: Option<String>) -> Result<String> {
    cli_key
        .or_else(|| std::env::var("MXL_SAVE_DATA_KEY").ok())
        .ok_or_else(|| CliError::MissingEnvVar("MXL_SAVE_DATA_KEY".to_string()))
}

fn catalog_paths(tables: &Path) -> CatalogPaths {
    CatalogPaths {
        base_items: tables.join("base_items.dat"),
        item_types: tables.join("item_types.dat"),
        item_mods: tables.join("item_mods.dat"),
        item_stats: tables.join("item_stats.dat"),
        skills: tables.join("skills.dat"),
    }
}

fn item_mut<'a>(character: &'a mut Character, index: usize) -> Result<&'a mut Item> {
    character
        .items_mut()
        .get_mut(index)
        .ok_or(CliError::ItemIndexOutOfRange(index))
}

fn print_inspect(character: &Character) {
    println!("version: {}", character.version());
    let difficulty = character.difficulty();
    println!(
        "difficulty: normal(active={}, act={}) nightmare(active={}, act={}) hell(active={}, act={})",
        difficulty.normal.is_active(),
        difficulty.normal.act(),
        difficulty.nightmare.is_active(),
        difficulty.nightmare.act(),
        difficulty.hell.is_active(),
        difficulty.hell.act(),
    );
    println!("map_id: {}", character.map_id());
    println!("merc_name_id: {}", character.merc_name_id());
    println!("items: {}", character.items().len());
    for (i, item) in character.items().iter().enumerate() {
        let code = item.code().unwrap_or_else(|_| "????".to_string());
        let rarity = item.rarity().map(|r| format!("{r:?}")).unwrap_or_else(|_| "-".to_string());
        println!(
            "  [{i}] {code} rarity={rarity} socketed={} ethereal={} location={:?}",
            item.is_socketed(),
            item.is_ethereal(),
            item.location()
        );
    }
    if !character.merc_items().is_empty() {
        println!("merc_items: {}", character.merc_items().len());
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    if !args.tables.exists() {
        return Err(CliError::MissingTableDir(args.tables.clone()));
    }
    let key = resolve_key(args.key.clone())?;
    let catalog = Arc::new(DataCatalog::load(&key, &catalog_paths(&args.tables))?);
    let codec = CharacterCodec::new(catalog.clone());

    let mut character = codec.load(&args.save_path)?;

    match &args.command {
        Command::Inspect => {
            print_inspect(&character);
            return Ok(());
        }
        Command::Resave => {}
        Command::ChangePosition { item, location, equipped_location, storage, x, y } => {
            item_mut(&mut character, *item)?.change_position(
                (*location).into(),
                equipped_location.map(|e| e.into()),
                storage.map(|s| s.into()),
                *x,
                *y,
            )?;
        }
        Command::UpdateId { item, new_id } => {
            item_mut(&mut character, *item)?.update_id(*new_id)?;
        }
        Command::MaximizeSockets { item } => {
            item_mut(&mut character, *item)?.maximize_sockets()?;
        }
        Command::ChangeLevel { item, level } => {
            item_mut(&mut character, *item)?.change_level(*level)?;
        }
        Command::ChangeCode { item, code } => {
            item_mut(&mut character, *item)?.change_code(code)?;
        }
        Command::ChangeMaxDurability { item, value } => {
            item_mut(&mut character, *item)?.change_max_durability(*value)?;
        }
        Command::SetEthereal { item, ethereal } => {
            item_mut(&mut character, *item)?.set_ethereal(*ethereal)?;
        }
        Command::ChangeRarity { item, rarity } => {
            item_mut(&mut character, *item)?.change_rarity((*rarity).into())?;
        }
        Command::AddMod { item, base_id, values } => {
            let values = parse_values(values)?;
            item_mut(&mut character, *item)?.add_mod(*base_id, &values)?;
        }
        Command::EditMod { item, logical_id, values } => {
            let values = parse_values(values)?;
            item_mut(&mut character, *item)?.edit_mod(logical_id, &values)?;
        }
        Command::DeleteMod { item, logical_id } => {
            item_mut(&mut character, *item)?.delete_mod(logical_id)?;
        }
        Command::ClearMods { item, include_affixes } => {
            item_mut(&mut character, *item)?.clear_mods(*include_affixes)?;
        }
        Command::MaximizeAffixes { item } => {
            item_mut(&mut character, *item)?.maximize_affixes()?;
        }
        Command::ShrineBless { item, name } => {
            let target = item_mut(&mut character, *item)?;
            let heavy = {
                let code = target.code()?;
                catalog.is_body_armor(&code) || catalog.is_2h_weapon(&code)
            };
            let recipe = mxl_save::rules::shrine_recipe(name, heavy)?;
            target.shrine_bless(&recipe)?;
        }
        Command::Upgrade { item, formula } => {
            let recipe = mxl_save::rules::upgrade_recipe(formula)?;
            item_mut(&mut character, *item)?.upgrade(&recipe)?;
        }
        Command::Corrupt { item, outcome } => {
            let recipe = mxl_save::rules::corrupt_recipe(outcome)?;
            item_mut(&mut character, *item)?.corrupt(&recipe.entries)?;
        }
        Command::Clone { item } => {
            let source = character
                .items()
                .get(*item)
                .ok_or(CliError::ItemIndexOutOfRange(*item))?;
            let seconds = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let clone = source.clone_with_new_id(seconds)?;
            character.items_mut().push(clone);
        }
        Command::SetDifficulty { difficulty, act } => {
            character.set_active_difficulty((*difficulty).into(), *act)?;
        }
    }

    let output_path = args.output.as_deref().unwrap_or(&args.save_path);
    codec.save(&character, output_path, args.backup.as_deref())?;
    println!("wrote {}", output_path.display());
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
