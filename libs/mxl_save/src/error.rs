//! Error types for the save file codec.

use thiserror::Error;

/// Result type alias for save codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding, mutating, or encoding a save file.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The save file is missing a required sentinel, header, or is structurally malformed.
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// A rarity code read from a file does not name a known rarity tier.
    #[error("Invalid rarity: {0}")]
    InvalidRarity(String),

    /// `change_rarity`/`shrine_bless`/`corrupt` target rarity is not reachable
    /// from the item's current state via that operation.
    #[error("Unsupported rarity: {0}")]
    UnsupportedRarity(String),

    /// An item's base type does not support the requested operation.
    #[error("Invalid item type: {0}")]
    InvalidItemType(String),

    /// Caller-supplied parameters are out of range or missing required keys.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// The requested action is not supported on this kind of item (ear, simple, runeword, ...).
    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    /// Storage code does not name one of the known containers.
    #[error("Unsupported storage: {0}")]
    UnsupportedStorage(String),

    /// Location code does not name one of the known item locations.
    #[error("Unsupported location: {0}")]
    UnsupportedLocation(String),

    /// Modifier code is not present in the loaded `item_mods` table.
    #[error("Unsupported mod code: {0}")]
    UnsupportedModCode(String),

    /// Shrine name is not one of the known shrine recipes.
    #[error("Unsupported shrine: {0}")]
    UnsupportedShrine(String),

    /// Upgrade formula name is not one of the known upgrade recipes.
    #[error("Unsupported formula: {0}")]
    UnsupportedFormular(String),

    /// `edit_mod`/`delete_mod` referenced a logical mod id the item does not carry.
    #[error("Mod not found in item: {0}")]
    ModNotFoundInItem(String),

    /// Internal invariant violation: two mods would share one logical id.
    #[error("Duplicate mod: {0}")]
    DuplicateMod(String),

    /// `shrine_bless` called on an item that already carries `blessings_counter`.
    #[error("Item is already blessed")]
    AlreadyBlessed,

    /// `upgrade` called on an item that already carries `item_upgraded`.
    #[error("Item is already upgraded")]
    AlreadyUpgraded,

    /// `corrupt` called on an item that already carries `item_corrupted`.
    #[error("Item is already corrupted")]
    AlreadyCorrupted,

    /// A `ModFactorValues`-style lookup referenced a property code the modifier does not carry.
    #[error("Prop code not found: {0}")]
    PropCodeNotFound(String),

    /// A packed data table's envelope failed authentication or decompression.
    #[error("Packed table error: {0}")]
    PackedTableError(String),

    /// JSON decoding of a packed table's cleartext failed.
    #[error("Table JSON error: {0}")]
    TableJson(#[from] serde_json::Error),
}
