//! Fixed bit layout, code tables, and magic byte patterns for the save format.
//!
//! These mirror the upstream tool's `BASE_STRUCTURE`/`NON_EAR_STRUCTURE`
//! tables: every `(offset, width)` pair here is a bit offset/width within one
//! item record, not a byte offset. Fields whose offset depends on earlier
//! decoded values (everything from `rarity` onward) are not listed as fixed
//! offsets; `ItemCodec`'s layout walker computes those per item.

/// Two-byte item record header, `"JM"`.
pub const ITEM_HEADER: [u8; 2] = [0x4A, 0x4D];

/// Nine-bit sentinel terminating a modifier list: nine set bits, LSB-first.
pub const MOD_ID_LENGTH: usize = 9;

/// The bit pattern written at the end of every modifier list (and reused as
/// the "unknown mod id" sentinel value during decode).
pub const END_OF_MOD_SECTION: u64 = 0x1FF;

/// Item-list start-of-section sentinel (two bytes), chosen distinct from
/// `ITEM_HEADER` and the merc/footer sentinels so container scanning never
/// misidentifies a boundary as an item record.
pub const ITEM_LIST_HEADER: [u8; 2] = [0x4A, 0x46];
/// Item-list end-of-section sentinel.
pub const ITEM_LIST_FOOTER: [u8; 2] = [0x4B, 0x46];
/// Mercenary item-list start-of-section sentinel.
pub const MERC_ITEM_LIST_HEADER: [u8; 2] = [0x6A, 0x66];
/// Trailing character-record footer, written verbatim after the (optional)
/// mercenary item list.
pub const FOOTER: [u8; 2] = [0x4A, 0x45];

/// Bias applied to the raw `defense_value` field: stored = actual + 500.
pub const START_DEFENSE_VALUE: i64 = -500;
/// Bias applied to `max_durability`: stored = actual + 90.
pub const START_MAX_DURABILITY_VALUE: i64 = -90;
/// Bias applied to `current_durability`: stored = actual + 150.
pub const START_CURRENT_DURABILITY_VALUE: i64 = -150;

/// Standard inventory grid size, in cells (width, height).
pub const INVENTORY_SIZE: (u8, u8) = (10, 4);
/// Stash grid size.
pub const STASH_SIZE: (u8, u8) = (8, 6);
/// Horadric Cube grid size.
pub const HORADRIC_CUBE_SIZE: (u8, u8) = (14, 9);

/// Maximum number of sockets any item can carry, regardless of its cell area.
pub const MAX_TOTAL_SOCKETS: u64 = 6;

/// Highest `act` value a difficulty's progress byte can hold (acts 0..=4).
pub const MAX_ACT: u8 = 4;

/// One of the character's three difficulty tiers, indexing the save file's
/// three-byte difficulty block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifficultyTier {
    Normal,
    Nightmare,
    Hell,
}

/// Where in an item an item can currently be: equipped, sitting in a
/// container, on the ground, on the cursor, or nested in a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Stored,
    Equipped,
    Belt,
    Ground,
    Cursor,
    Socketed,
}

impl Location {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Location::Stored),
            1 => Some(Location::Equipped),
            2 => Some(Location::Belt),
            3 => Some(Location::Ground),
            4 => Some(Location::Cursor),
            6 => Some(Location::Socketed),
            _ => None,
        }
    }

    pub fn to_code(self) -> u64 {
        match self {
            Location::Stored => 0,
            Location::Equipped => 1,
            Location::Belt => 2,
            Location::Ground => 3,
            Location::Cursor => 4,
            Location::Socketed => 6,
        }
    }
}

/// Equip slot an item sits in when `location == Equipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquippedLocation {
    Head,
    Neck,
    Torso,
    RightHand,
    LeftHand,
    RightRing,
    LeftRing,
    Belt,
}

impl EquippedLocation {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(EquippedLocation::Head),
            2 => Some(EquippedLocation::Neck),
            3 => Some(EquippedLocation::Torso),
            4 => Some(EquippedLocation::RightHand),
            5 => Some(EquippedLocation::LeftHand),
            6 => Some(EquippedLocation::RightRing),
            7 => Some(EquippedLocation::LeftRing),
            8 => Some(EquippedLocation::Belt),
            _ => None,
        }
    }

    pub fn to_code(self) -> u64 {
        match self {
            EquippedLocation::Head => 1,
            EquippedLocation::Neck => 2,
            EquippedLocation::Torso => 3,
            EquippedLocation::RightHand => 4,
            EquippedLocation::LeftHand => 5,
            EquippedLocation::RightRing => 6,
            EquippedLocation::LeftRing => 7,
            EquippedLocation::Belt => 8,
        }
    }
}

/// Which grid-based container an item sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Inventory,
    HoradricCube,
    Stash,
}

impl Storage {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Storage::Inventory),
            4 => Some(Storage::HoradricCube),
            5 => Some(Storage::Stash),
            _ => None,
        }
    }

    pub fn to_code(self) -> u64 {
        match self {
            Storage::Inventory => 1,
            Storage::HoradricCube => 4,
            Storage::Stash => 5,
        }
    }

    /// Grid dimensions for this container, in cells.
    pub fn size(self) -> (u8, u8) {
        match self {
            Storage::Inventory => INVENTORY_SIZE,
            Storage::HoradricCube => HORADRIC_CUBE_SIZE,
            Storage::Stash => STASH_SIZE,
        }
    }
}

/// Quality tier of a non-ear, non-simple item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rarity {
    Invalid,
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

impl Rarity {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Rarity::Invalid),
            1 => Some(Rarity::Low),
            2 => Some(Rarity::Normal),
            3 => Some(Rarity::Superior),
            4 => Some(Rarity::Magic),
            5 => Some(Rarity::Set),
            6 => Some(Rarity::Rare),
            7 => Some(Rarity::Unique),
            8 => Some(Rarity::Crafted),
            9 => Some(Rarity::Tempered),
            _ => None,
        }
    }

    pub fn to_code(self) -> u64 {
        match self {
            Rarity::Invalid => 0,
            Rarity::Low => 1,
            Rarity::Normal => 2,
            Rarity::Superior => 3,
            Rarity::Magic => 4,
            Rarity::Set => 5,
            Rarity::Rare => 6,
            Rarity::Unique => 7,
            Rarity::Crafted => 8,
            Rarity::Tempered => 9,
        }
    }
}

/// Modifier codes that add a primary damage value and have a linked `max_dmg`
/// (or `min_dmg`, for `item_maxdamage_percent`) modifier at `base.id + 1`.
pub const ADDING_DMG_MOD_CODES: &[&str] = &[
    "item_maxdamage_percent",
    "firemindam",
    "lightmindam",
    "magicmindam",
    "coldmindam",
    "poisonmindam",
];

/// Subset of `ADDING_DMG_MOD_CODES` that also carries a `duration` modifier
/// at `base.id + 2`.
pub const ADDING_DMG_WITH_DURATION_MOD_CODES: &[&str] = &["coldmindam", "poisonmindam"];

/// Modifier codes with the `{skill_level, skill_id, chance}` layout.
pub const SKILL_ON_EVENT_MOD_CODES: &[&str] = &[
    "item_skillonpkill",
    "item_skillonanykill",
    "item_skillongetmissilehit",
    "item_skillongetmeleed",
    "item_skillondamaged",
    "item_warpskillonattack",
    "item_skillonanydeath",
    "item_skillongethit",
    "item_skillonlevelup",
    "item_skillonhit",
    "item_skillondeath",
    "item_skillonkill",
    "item_skillonattack",
];

/// Rare/crafted affix-count markers that `maximize_affixes` targets.
pub const AFFIX_MOD_CODES: &[&str] = &["is_suffix", "is_prefix"];

/// Description-text modifiers whose single property is a raw text id sized
/// to `base.length` bits.
pub const DESC_TEXT_MOD_CODES: &[&str] = &[
    "desc_orange",
    "desc_less_top",
    "desc_top",
    "desc_bottom",
    "ied_display",
];

/// Mystic-orb counter modifier code (`{mys_orb_id:8, unknown:10}` layout).
pub const MO_COUNT_MOD_CODE: &str = "item_mocount";

/// Cube-upgrade flag family, protected by default in `clear_mods`.
pub const CUBE_UPGRADE_MOD_CODES: &[&str] = &[
    "cube_upgrade_1",
    "cube_upgrade_2",
    "cube_upgrade_3",
    "cube_upgrade_4",
    "cube_upgrade_5",
    "cube_upgrade_6",
    "cube_upgrade_7",
    "cube_upgrade_8",
    "cube_upgrade_9",
    "cube_upgrade_10",
    "cube_upgrade_11",
    "cube_upgrade_12",
];

/// `{class_id:3, value:4}` layout.
pub const ADDING_CLASS_SKILL_LEVEL_MOD_CODE: &str = "item_addclassskills";
/// `{skill_id:12, skill_level:7}` layout, min skill_level -1.
pub const ADDING_OSKILL_MOD_CODE: &str = "item_nonclassskill";
/// `{monster_id:12, chance:7}` layout.
pub const REANIMATE_MOD_CODE: &str = "item_reanimate";

/// Counter mod protected by default in `clear_mods`.
pub const TROPHY_COUNTER_MOD_CODE: &str = "trophy_counter";

/// Marker mod stamped by `shrine_bless`; also guards re-blessing.
pub const SHRINE_BLESSED_MOD_CODE: &str = "blessings_counter";
/// Marker mod stamped by `upgrade`; also guards re-upgrading.
pub const ITEM_UPGRADED_MOD_CODE: &str = "item_upgraded";
/// Marker mod stamped by `corrupt`; also guards re-corrupting.
pub const ITEM_CORRUPTED_MOD_CODE: &str = "item_corrupted";
