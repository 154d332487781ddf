//! Shared fixtures for integration tests: a small synthesized catalog and
//! raw item/character byte builders exercised purely through the public API.

use std::sync::Arc;

use mxl_save::{
    BaseItem, BaseModifier, BaseModifierFactor, BitCursor, CatalogPaths, DataCatalog, ItemType,
};

#[allow(dead_code)]
pub const CUSTOM_GRAPHIC_FLAG: usize = 0;

/// Bit offsets mirrored from the item record layout (`item.rs::offsets`),
/// stable because they're part of the wire format, not an implementation
/// detail: every non-ear item starts with the same 76-bit common header.
pub mod item_offsets {
    pub const IS_IDENTIFIED: usize = 20;
    pub const IS_SOCKETED: usize = 27;
    pub const IS_PICKED_UP_SINCE_LAST_SAVE: usize = 29;
    pub const IS_EAR: usize = 32;
    pub const IS_STARTER_GEAR: usize = 33;
    pub const IS_SIMPLE: usize = 37;
    pub const IS_ETHEREAL: usize = 38;
    pub const IS_PERSONALIZED: usize = 40;
    pub const IS_RUNEWORD: usize = 42;
    pub const COMMON_HEADER_BITS: usize = 76;
}

pub fn sample_catalog() -> Arc<DataCatalog> {
    let item_types = vec![
        ItemType { code: "swor".into(), name: "Sword".into(), equiv_codes: vec!["weap".into()] },
        ItemType { code: "weap".into(), name: "Weapon".into(), equiv_codes: vec![] },
        ItemType { code: "ring".into(), name: "Ring".into(), equiv_codes: vec![] },
    ];
    let base_items = vec![
        BaseItem {
            code: "9wd".into(),
            name: "Long Sword".into(),
            item_type: "swor".into(),
            item_type_2: None,
            max_sockets: 4,
            is_stackable: false,
            is_quest: false,
            has_defense: false,
            has_durability: true,
            is_tome: false,
            inv_width: 2,
            inv_height: 4,
        },
        BaseItem {
            code: "rin".into(),
            name: "Ring".into(),
            item_type: "ring".into(),
            item_type_2: None,
            max_sockets: 0,
            is_stackable: false,
            is_quest: false,
            has_defense: false,
            has_durability: false,
            is_tome: false,
            inv_width: 1,
            inv_height: 1,
        },
    ];
    let base_mods = vec![
        BaseModifier {
            id: 5,
            code: "strength".into(),
            length: 0,
            factors: vec![BaseModifierFactor { code: "value".into(), bits: 10, add: 0, conv: 1 }],
        },
        BaseModifier {
            id: 100,
            code: "blessings_counter".into(),
            length: 0,
            factors: vec![BaseModifierFactor { code: "value".into(), bits: 4, add: 0, conv: 1 }],
        },
        BaseModifier {
            id: 101,
            code: "enr_factor".into(),
            length: 0,
            factors: vec![BaseModifierFactor { code: "value".into(), bits: 8, add: 0, conv: 1 }],
        },
        BaseModifier {
            id: 102,
            code: "energy".into(),
            length: 0,
            factors: vec![BaseModifierFactor { code: "value".into(), bits: 8, add: 0, conv: 1 }],
        },
        BaseModifier {
            id: 103,
            code: "item_energy_percent".into(),
            length: 0,
            factors: vec![BaseModifierFactor { code: "value".into(), bits: 8, add: 0, conv: 1 }],
        },
        BaseModifier {
            id: 104,
            code: "item_upgraded".into(),
            length: 0,
            factors: vec![BaseModifierFactor { code: "value".into(), bits: 4, add: 0, conv: 1 }],
        },
        BaseModifier {
            id: 105,
            code: "item_corrupted".into(),
            length: 0,
            factors: vec![BaseModifierFactor { code: "value".into(), bits: 4, add: 0, conv: 1 }],
        },
        BaseModifier {
            id: 106,
            code: "is_prefix".into(),
            length: 0,
            factors: vec![BaseModifierFactor { code: "value".into(), bits: 2, add: 0, conv: 1 }],
        },
        BaseModifier {
            id: 107,
            code: "is_suffix".into(),
            length: 0,
            factors: vec![BaseModifierFactor { code: "value".into(), bits: 2, add: 0, conv: 1 }],
        },
        // The adding-damage family (§4.3) carries no static factor list of
        // its own: `firemindam`'s primary `value` is sized from `length`,
        // and its linked `max_dmg` companion is looked up at `id + 1`.
        BaseModifier {
            id: 108,
            code: "firemindam".into(),
            length: 10,
            factors: vec![],
        },
        BaseModifier {
            id: 109,
            code: "firemaxdam".into(),
            length: 10,
            factors: vec![],
        },
        BaseModifier {
            id: 110,
            code: "item_strength_percent".into(),
            length: 0,
            factors: vec![BaseModifierFactor { code: "value".into(), bits: 8, add: 0, conv: 1 }],
        },
    ];
    Arc::new(DataCatalog::from_tables(base_items, item_types, base_mods, vec![], vec![]))
}

#[allow(dead_code)]
pub fn test_catalog_paths() -> CatalogPaths {
    CatalogPaths {
        base_items: "base_items.dat".into(),
        item_types: "item_types.dat".into(),
        item_mods: "item_mods.dat".into(),
        item_stats: "item_stats.dat".into(),
        skills: "skills.dat".into(),
    }
}

/// A minimal ring, normal rarity, non-socketed, no mods: `(level, unique_id)`.
pub fn build_ring_bytes(level: u64, unique_id: u64) -> Vec<u8> {
    build_item_bytes("rin", level, unique_id, mxl_save::constants::Rarity::Normal, false)
}

/// A minimal sword, `has_durability=true` so it carries max/current durability.
pub fn build_sword_bytes(level: u64, unique_id: u64) -> Vec<u8> {
    let mut cursor = header_cursor("9wd", level, unique_id, mxl_save::constants::Rarity::Normal);
    cursor.push_uint(1, 0); // unknown_11
    cursor.push_uint(9, (10i64 - mxl_save::constants::START_MAX_DURABILITY_VALUE) as u64);
    cursor.push_uint(9, (10i64 - mxl_save::constants::START_CURRENT_DURABILITY_VALUE) as u64);
    cursor.push_uint(9, mxl_save::constants::END_OF_MOD_SECTION);
    cursor.to_bytes()
}

fn build_item_bytes(
    code: &str,
    level: u64,
    unique_id: u64,
    rarity: mxl_save::constants::Rarity,
    _socketed: bool,
) -> Vec<u8> {
    let mut cursor = header_cursor(code, level, unique_id, rarity);
    cursor.push_uint(1, 0); // unknown_11, no durability/quantity/socket branch for a ring
    cursor.push_uint(9, mxl_save::constants::END_OF_MOD_SECTION);
    cursor.to_bytes()
}

fn header_cursor(
    code: &str,
    level: u64,
    unique_id: u64,
    rarity: mxl_save::constants::Rarity,
) -> BitCursor {
    let mut cursor = common_header_cursor(false, false);
    let mut code_bytes = [0u8; 4];
    let bytes = code.as_bytes();
    code_bytes[..bytes.len().min(4)].copy_from_slice(&bytes[..bytes.len().min(4)]);
    cursor.push_uint(32, u32::from_le_bytes(code_bytes) as u64);
    cursor.push_uint(3, 0); // sockets flag
    cursor.push_uint(32, unique_id);
    cursor.push_uint(7, level);
    cursor.push_uint(4, rarity.to_code());
    cursor.push_uint(1, 0); // has_custom_graphic
    cursor.push_uint(1, 0); // has_class_spec
    cursor
}

/// The 76-bit common header shared by every non-ear item record, with
/// `is_ear`/`is_simple` set as requested and every other flag cleared.
fn common_header_cursor(is_ear: bool, is_simple: bool) -> BitCursor {
    use mxl_save::constants::ITEM_HEADER;
    let mut cursor = BitCursor::default();
    cursor.push_uint(16, u16::from_le_bytes(ITEM_HEADER) as u64);
    cursor.push_uint(4, 0); // unknown_1
    cursor.push_bit_pad_to(item_offsets::IS_IDENTIFIED, true);
    cursor.push_bit_pad_to(item_offsets::IS_SOCKETED, false);
    cursor.push_bit_pad_to(item_offsets::IS_PICKED_UP_SINCE_LAST_SAVE, false);
    cursor.push_bit_pad_to(item_offsets::IS_EAR, is_ear);
    cursor.push_bit_pad_to(item_offsets::IS_STARTER_GEAR, false);
    cursor.push_bit_pad_to(item_offsets::IS_SIMPLE, is_simple);
    cursor.push_bit_pad_to(item_offsets::IS_ETHEREAL, false);
    cursor.push_bit_pad_to(item_offsets::IS_PERSONALIZED, false);
    cursor.push_bit_pad_to(item_offsets::IS_RUNEWORD, false);
    cursor.pad_to(item_offsets::COMMON_HEADER_BITS);
    cursor
}

/// A simple item record: common header (`is_simple=true`) followed only by
/// the 4-char code, no unique id/level/rarity/mod-list fields at all.
pub fn build_simple_item_bytes(code: &str, _level: u64, _unique_id: u64) -> Vec<u8> {
    let mut cursor = common_header_cursor(false, true);
    let mut code_bytes = [0u8; 4];
    let bytes = code.as_bytes();
    code_bytes[..bytes.len().min(4)].copy_from_slice(&bytes[..bytes.len().min(4)]);
    cursor.push_uint(32, u32::from_le_bytes(code_bytes) as u64);
    cursor.to_bytes()
}

/// An ear item record: common header (`is_ear=true`) followed by the
/// owning class/level and a nul-terminated 7-bit-per-char owner name.
pub fn build_ear_item_bytes(owner_name: &str, owner_level: u64, owner_class: u64) -> Vec<u8> {
    let mut cursor = common_header_cursor(true, false);
    cursor.push_uint(3, owner_class);
    cursor.push_uint(7, owner_level);
    for b in owner_name.as_bytes() {
        cursor.push_uint(7, *b as u64);
    }
    cursor.push_uint(7, 0); // nul terminator
    cursor.to_bytes()
}

/// Wraps a set of already-encoded item byte blobs into a full character save
/// buffer: a fixed-size header prefix, the item-list section, an optional
/// mercenary-item-list section, and the character footer.
pub fn build_character_bytes(items: &[Vec<u8>], merc_items: &[Vec<u8>]) -> Vec<u8> {
    use byteorder::{LittleEndian, WriteBytesExt};
    use mxl_save::constants::{FOOTER, ITEM_LIST_FOOTER, ITEM_LIST_HEADER, MERC_ITEM_LIST_HEADER};

    let mut out = vec![0u8; 25];
    out[4..8].copy_from_slice(&0u32.to_le_bytes()); // version, patched on save
    out[16] = 1; // normal difficulty active, act 0
    out[19..23].copy_from_slice(&7u32.to_le_bytes()); // map_id
    out[23..25].copy_from_slice(&3u16.to_le_bytes()); // merc_name_id

    out.extend_from_slice(&ITEM_LIST_HEADER);
    let non_socketed = items.len() as u16; // fixtures here never socket items
    out.write_u16::<LittleEndian>(non_socketed).unwrap();
    for item in items {
        out.extend_from_slice(item);
    }
    out.extend_from_slice(&ITEM_LIST_FOOTER);

    if !merc_items.is_empty() {
        out.extend_from_slice(&MERC_ITEM_LIST_HEADER);
        out.write_u16::<LittleEndian>(merc_items.len() as u16).unwrap();
        for item in merc_items {
            out.extend_from_slice(item);
        }
    }

    out.extend_from_slice(&FOOTER);
    out
}
