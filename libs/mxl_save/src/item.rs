//! Decodes, mutates, and re-encodes a single item record.
//!
//! An `Item` wraps the record's raw bits in a [`BitCursor`] and a shared
//! [`DataCatalog`]. Every accessor walks the record from its start on each
//! call rather than caching offsets: once a mutation inserts or deletes a
//! bit run (a resized rarity detail block, an added modifier, ...) any
//! offset computed before the mutation is stale, so there is no cache to
//! invalidate in the first place. See `layout` for the walker.

use std::sync::Arc;

use crate::bitcursor::BitCursor;
use crate::catalog::DataCatalog;
use crate::constants::*;
use crate::error::{Error, Result};
use crate::modifier::{self, Modifier};

mod offsets {
    pub const HEADER: (usize, usize) = (0, 16);
    pub const IS_IDENTIFIED: usize = 20;
    pub const IS_SOCKETED: usize = 27;
    pub const IS_PICKED_UP_SINCE_LAST_SAVE: usize = 29;
    pub const IS_EAR: usize = 32;
    pub const IS_STARTER_GEAR: usize = 33;
    pub const IS_SIMPLE: usize = 37;
    pub const IS_ETHEREAL: usize = 38;
    pub const IS_PERSONALIZED: usize = 40;
    pub const IS_RUNEWORD: usize = 42;
    pub const LOCATION: (usize, usize) = (58, 3);
    pub const EQUIPPED_LOCATION: (usize, usize) = (61, 4);
    pub const STORAGE_X: (usize, usize) = (65, 4);
    pub const STORAGE_Y: (usize, usize) = (69, 4);
    pub const STORAGE: (usize, usize) = (73, 3);
    pub const COMMON_HEADER_BITS: usize = 76;

    pub const OWNER_CLASS: (usize, usize) = (76, 3);
    pub const OWNER_LEVEL: (usize, usize) = (79, 7);
    pub const OWNER_NAME_START: usize = 86;
    pub const OWNER_NAME_CHAR_BITS: usize = 7;

    pub const CODE: (usize, usize) = (76, 32);
    pub const SOCKETS_FLAG: (usize, usize) = (108, 3);
    pub const UNIQUE_ID: (usize, usize) = (111, 32);
    pub const LEVEL: (usize, usize) = (143, 7);
    pub const RARITY: (usize, usize) = (150, 4);
    pub const HAS_CUSTOM_GRAPHIC: usize = 154;
    pub const NON_SIMPLE_HEADER_BITS: usize = 155;

    pub const CUSTOM_GRAPHIC_BITS: usize = 3;
    pub const HAS_CLASS_SPEC_BITS: usize = 1;
    pub const CLASS_SPEC_BITS: usize = 11;
    pub const RUNEWORD_BITS: usize = 16;
    pub const PERSONALIZED_CHAR_BITS: usize = 7;
    pub const TOME_BITS: usize = 5;
    pub const UNKNOWN_11_BITS: usize = 1;
    pub const DEFENSE_BITS: usize = 16;
    pub const DURABILITY_BITS: usize = 9;
    pub const QUANTITY_BITS: usize = 9;
    pub const TOTAL_SOCKETS_BITS: usize = 4;
    pub const SET_MOD_BIT_FIELD_BITS: usize = 5;
}

/// Bit-width of the rarity detail block for each rarity, ignoring the
/// affix-count subtlety of rare/crafted items (modeled as a fixed six-affix
/// block, unused slots zeroed).
fn rarity_detail_bits(rarity: Rarity) -> usize {
    match rarity {
        Rarity::Invalid | Rarity::Normal => 0,
        Rarity::Low => 3,
        Rarity::Superior => 3,
        Rarity::Magic => 11 + 11,
        Rarity::Set => 15,
        Rarity::Unique => 15,
        Rarity::Rare | Rarity::Crafted | Rarity::Tempered => 8 + 8 + 6 * (1 + 11),
    }
}

/// All offsets computed by walking one item record from its start. Fields
/// that depend on the record not being an ear/simple item, or on a
/// particular rarity, are `None` when not applicable.
#[derive(Debug, Clone)]
struct ItemLayout {
    is_ear: bool,
    is_simple: bool,
    is_runeword: bool,
    is_socketed: bool,
    code: Option<String>,
    code_offset: Option<usize>,
    unique_id_offset: Option<usize>,
    level_offset: Option<usize>,
    rarity_offset: Option<usize>,
    rarity: Option<Rarity>,
    rarity_detail_start: Option<usize>,
    rarity_detail_end: Option<usize>,
    runeword_offset: Option<usize>,
    personalized_start: Option<usize>,
    personalized_end: Option<usize>,
    defense_offset: Option<usize>,
    max_durability_offset: Option<usize>,
    current_durability_offset: Option<usize>,
    quantity_offset: Option<usize>,
    total_sockets_offset: Option<usize>,
    set_mod_bit_field_offset: Option<usize>,
    start_mod_index: usize,
    mods_end: usize,
    runeword_mods_start: Option<usize>,
    runeword_mods_end: Option<usize>,
    total_len: usize,
}

/// One modifier plus the bit range in the cursor it occupies, `[start, end)`.
#[derive(Debug, Clone)]
pub struct ModEntry {
    pub modifier: Modifier,
    pub in_runeword_list: bool,
    start: usize,
    end: usize,
}

impl ModEntry {
    pub fn logical_id(&self) -> String {
        self.modifier.logical_id(self.in_runeword_list)
    }
}

/// A single decoded item record, backed by its raw bits.
#[derive(Debug, Clone)]
pub struct Item {
    cursor: BitCursor,
    catalog: Arc<DataCatalog>,
}

impl Item {
    pub fn from_bytes(data: &[u8], catalog: Arc<DataCatalog>) -> Result<Self> {
        let cursor = BitCursor::from_bytes(data);
        let header = cursor.read_uint(offsets::HEADER.0, offsets::HEADER.1);
        if header.to_le_bytes()[..2] != ITEM_HEADER {
            return Err(Error::InvalidItem("missing item record header".to_string()));
        }
        Ok(Self { cursor, catalog })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.cursor.to_bytes()
    }

    /// Number of whole bytes this record occupies, rounding its bit length
    /// up to the nearest byte. Used by the character container to find
    /// where the next item record starts.
    pub fn byte_len(&self) -> Result<usize> {
        Ok(self.layout()?.total_len.div_ceil(8))
    }

    fn read_nul_terminated_chars(&self, start: usize, char_bits: usize) -> (String, usize) {
        let mut pos = start;
        let mut out = String::new();
        loop {
            let code = self.cursor.read_uint(pos, char_bits);
            pos += char_bits;
            if code == 0 {
                break;
            }
            out.push((code as u8) as char);
        }
        (out, pos)
    }

    fn layout(&self) -> Result<ItemLayout> {
        let is_socketed = self.cursor.read_bit(offsets::IS_SOCKETED);
        let is_ear = self.cursor.read_bit(offsets::IS_EAR);
        let is_simple = self.cursor.read_bit(offsets::IS_SIMPLE);
        let is_personalized = self.cursor.read_bit(offsets::IS_PERSONALIZED);
        let is_runeword = self.cursor.read_bit(offsets::IS_RUNEWORD);

        if is_ear {
            let (_, name_end) =
                self.read_nul_terminated_chars(offsets::OWNER_NAME_START, offsets::OWNER_NAME_CHAR_BITS);
            return Ok(ItemLayout {
                is_ear: true,
                is_simple,
                is_runeword: false,
                is_socketed: false,
                code: None,
                code_offset: None,
                unique_id_offset: None,
                level_offset: None,
                rarity_offset: None,
                rarity: None,
                rarity_detail_start: None,
                rarity_detail_end: None,
                runeword_offset: None,
                personalized_start: None,
                personalized_end: None,
                defense_offset: None,
                max_durability_offset: None,
                current_durability_offset: None,
                quantity_offset: None,
                total_sockets_offset: None,
                set_mod_bit_field_offset: None,
                start_mod_index: name_end,
                mods_end: name_end,
                runeword_mods_start: None,
                runeword_mods_end: None,
                total_len: name_end,
            });
        }

        let code_offset = offsets::CODE.0;
        let code_raw = self.cursor.read_uint(code_offset, offsets::CODE.1);
        let code_bytes = code_raw.to_le_bytes();
        let code: String = code_bytes[..4]
            .iter()
            .filter(|b| **b != 0)
            .map(|b| *b as char)
            .collect();
        let base = self.catalog.base_item(&code)?;

        if is_simple {
            let mut pos = offsets::COMMON_HEADER_BITS + offsets::CODE.1;
            let quantity_offset = if base.is_stackable {
                let off = pos;
                pos += offsets::QUANTITY_BITS;
                Some(off)
            } else {
                None
            };
            return Ok(ItemLayout {
                is_ear: false,
                is_simple: true,
                is_runeword: false,
                is_socketed,
                code: Some(code),
                code_offset: Some(code_offset),
                unique_id_offset: None,
                level_offset: None,
                rarity_offset: None,
                rarity: None,
                rarity_detail_start: None,
                rarity_detail_end: None,
                runeword_offset: None,
                personalized_start: None,
                personalized_end: None,
                defense_offset: None,
                max_durability_offset: None,
                current_durability_offset: None,
                quantity_offset,
                total_sockets_offset: None,
                set_mod_bit_field_offset: None,
                start_mod_index: pos,
                mods_end: pos,
                runeword_mods_start: None,
                runeword_mods_end: None,
                total_len: pos,
            });
        }

        let unique_id_offset = offsets::UNIQUE_ID.0;
        let level_offset = offsets::LEVEL.0;
        let rarity_offset = offsets::RARITY.0;
        let rarity_code = self.cursor.read_uint(rarity_offset, offsets::RARITY.1);
        let rarity = Rarity::from_code(rarity_code)
            .ok_or_else(|| Error::InvalidRarity(format!("unknown rarity code {rarity_code}")))?;

        let mut pos = offsets::NON_SIMPLE_HEADER_BITS;
        let has_custom_graphic = self.cursor.read_bit(offsets::HAS_CUSTOM_GRAPHIC);
        if has_custom_graphic {
            pos += offsets::CUSTOM_GRAPHIC_BITS;
        }
        let has_class_spec = self.cursor.read_bit(pos);
        pos += offsets::HAS_CLASS_SPEC_BITS;
        if has_class_spec {
            pos += offsets::CLASS_SPEC_BITS;
        }

        let rarity_detail_start = pos;
        pos += rarity_detail_bits(rarity);
        let rarity_detail_end = pos;

        let runeword_offset = if is_runeword {
            let off = pos;
            pos += offsets::RUNEWORD_BITS;
            Some(off)
        } else {
            None
        };

        let (personalized_start, personalized_end) = if is_personalized {
            let start = pos;
            let (_, end) = self.read_nul_terminated_chars(start, offsets::PERSONALIZED_CHAR_BITS);
            pos = end;
            (Some(start), Some(end))
        } else {
            (None, None)
        };

        if base.is_tome {
            pos += offsets::TOME_BITS;
        }
        pos += offsets::UNKNOWN_11_BITS;

        let defense_offset = if base.has_defense {
            let off = pos;
            pos += offsets::DEFENSE_BITS;
            Some(off)
        } else {
            None
        };

        let (max_durability_offset, current_durability_offset) = if base.has_durability {
            let max_off = pos;
            pos += offsets::DURABILITY_BITS;
            let cur_off = pos;
            pos += offsets::DURABILITY_BITS;
            (Some(max_off), Some(cur_off))
        } else {
            (None, None)
        };

        let quantity_offset = if base.is_stackable {
            let off = pos;
            pos += offsets::QUANTITY_BITS;
            Some(off)
        } else {
            None
        };

        let total_sockets_offset = if is_socketed {
            let off = pos;
            pos += offsets::TOTAL_SOCKETS_BITS;
            Some(off)
        } else {
            None
        };

        let set_mod_bit_field_offset = if rarity == Rarity::Set {
            let off = pos;
            pos += offsets::SET_MOD_BIT_FIELD_BITS;
            Some(off)
        } else {
            None
        };

        let start_mod_index = pos;
        let mods_end = self.scan_mod_list_end(start_mod_index)?;

        let (runeword_mods_start, runeword_mods_end) = if is_runeword {
            let start = mods_end;
            let end = self.scan_mod_list_end(start)?;
            (Some(start), Some(end))
        } else {
            (None, None)
        };

        let total_len = runeword_mods_end.unwrap_or(mods_end);

        Ok(ItemLayout {
            is_ear: false,
            is_simple: false,
            is_runeword,
            is_socketed,
            code: Some(code),
            code_offset: Some(code_offset),
            unique_id_offset: Some(unique_id_offset),
            level_offset: Some(level_offset),
            rarity_offset: Some(rarity_offset),
            rarity: Some(rarity),
            rarity_detail_start: Some(rarity_detail_start),
            rarity_detail_end: Some(rarity_detail_end),
            runeword_offset,
            personalized_start,
            personalized_end,
            defense_offset,
            max_durability_offset,
            current_durability_offset,
            quantity_offset,
            total_sockets_offset,
            set_mod_bit_field_offset,
            start_mod_index,
            mods_end,
            runeword_mods_start,
            runeword_mods_end,
            total_len,
        })
    }

    /// Scan forward from `start`, decoding modifiers until the terminator,
    /// returning the offset immediately after it. If a mod id can't be
    /// placed (no base mod, no stat fallback), the walk halts at that offset
    /// instead of failing the whole decode (§7: data-driven tolerance).
    fn scan_mod_list_end(&self, start: usize) -> Result<usize> {
        let mut pos = start;
        loop {
            let id = self.cursor.read_uint(pos, MOD_ID_LENGTH);
            if modifier::is_end_of_mods(id) {
                pos += MOD_ID_LENGTH;
                return Ok(pos);
            }
            match modifier::decode(&self.cursor, pos, &self.catalog)? {
                Some((_modifier, end)) => pos = end,
                None => return Ok(pos),
            }
        }
    }

    fn mod_entries_in(&self, start: usize, end: usize, in_runeword_list: bool) -> Result<Vec<ModEntry>> {
        let mut pos = start;
        let mut out = Vec::new();
        while pos < end {
            let id = self.cursor.read_uint(pos, MOD_ID_LENGTH);
            if modifier::is_end_of_mods(id) {
                break;
            }
            match modifier::decode(&self.cursor, pos, &self.catalog)? {
                Some((modifier, next)) => {
                    out.push(ModEntry {
                        modifier,
                        in_runeword_list,
                        start: pos,
                        end: next,
                    });
                    pos = next;
                }
                None => break,
            }
        }
        Ok(out)
    }

    /// All modifiers on the item: the main list, then the runeword list if present.
    pub fn mod_entries(&self) -> Result<Vec<ModEntry>> {
        let layout = self.layout()?;
        let mut out = self.mod_entries_in(layout.start_mod_index, layout.mods_end, false)?;
        if let (Some(start), Some(end)) = (layout.runeword_mods_start, layout.runeword_mods_end) {
            out.extend(self.mod_entries_in(start, end, true)?);
        }
        Ok(out)
    }

    pub fn mods(&self) -> Result<Vec<Modifier>> {
        Ok(self.mod_entries()?.into_iter().map(|e| e.modifier).collect())
    }

    pub fn code(&self) -> Result<String> {
        self.layout()?.code.ok_or_else(|| Error::UnsupportedAction("ear items have no code".to_string()))
    }

    pub fn rarity(&self) -> Result<Rarity> {
        self.layout()?
            .rarity
            .ok_or_else(|| Error::UnsupportedAction("item has no rarity field".to_string()))
    }

    pub fn location(&self) -> Location {
        let code = self.cursor.read_uint(offsets::LOCATION.0, offsets::LOCATION.1);
        Location::from_code(code).unwrap_or(Location::Stored)
    }

    pub fn storage(&self) -> Option<Storage> {
        let code = self.cursor.read_uint(offsets::STORAGE.0, offsets::STORAGE.1);
        Storage::from_code(code)
    }

    pub fn storage_x(&self) -> u64 {
        self.cursor.read_uint(offsets::STORAGE_X.0, offsets::STORAGE_X.1)
    }

    pub fn storage_y(&self) -> u64 {
        self.cursor.read_uint(offsets::STORAGE_Y.0, offsets::STORAGE_Y.1)
    }

    pub fn is_identified(&self) -> bool {
        self.cursor.read_bit(offsets::IS_IDENTIFIED)
    }

    pub fn is_ethereal(&self) -> bool {
        self.cursor.read_bit(offsets::IS_ETHEREAL)
    }

    pub fn is_socketed(&self) -> bool {
        self.cursor.read_bit(offsets::IS_SOCKETED)
    }

    /// Current socket count, or `0` if the item carries no socket-count field.
    pub fn total_sockets(&self) -> Result<u64> {
        let layout = self.layout()?;
        Ok(match layout.total_sockets_offset {
            Some(off) => self.cursor.read_uint(off, offsets::TOTAL_SOCKETS_BITS),
            None => 0,
        })
    }

    pub fn is_starter_gear(&self) -> bool {
        self.cursor.read_bit(offsets::IS_STARTER_GEAR)
    }

    pub fn is_picked_up_since_last_save(&self) -> bool {
        self.cursor.read_bit(offsets::IS_PICKED_UP_SINCE_LAST_SAVE)
    }

    pub fn unique_id(&self) -> Result<u64> {
        let layout = self.layout()?;
        let off = layout
            .unique_id_offset
            .ok_or_else(|| Error::UnsupportedAction("item has no unique id field".to_string()))?;
        Ok(self.cursor.read_uint(off, offsets::UNIQUE_ID.1))
    }

    pub fn level(&self) -> Result<u64> {
        let layout = self.layout()?;
        let off = layout
            .level_offset
            .ok_or_else(|| Error::UnsupportedAction("item has no level field".to_string()))?;
        Ok(self.cursor.read_uint(off, offsets::LEVEL.1))
    }

    // --- mutations -----------------------------------------------------

    /// Move the item to a new location/storage/cell, rewriting the fixed
    /// position fields in place. Never resizes the record.
    pub fn change_position(
        &mut self,
        location: Location,
        equipped_location: Option<EquippedLocation>,
        storage: Option<Storage>,
        storage_x: u64,
        storage_y: u64,
    ) -> Result<()> {
        self.cursor
            .write_uint(offsets::LOCATION.0, offsets::LOCATION.1, location.to_code());
        self.cursor.write_uint(
            offsets::EQUIPPED_LOCATION.0,
            offsets::EQUIPPED_LOCATION.1,
            equipped_location.map(|e| e.to_code()).unwrap_or(0),
        );
        self.cursor.write_uint(
            offsets::STORAGE.0,
            offsets::STORAGE.1,
            storage.map(|s| s.to_code()).unwrap_or(0),
        );
        self.cursor
            .write_uint(offsets::STORAGE_X.0, offsets::STORAGE_X.1, storage_x);
        self.cursor
            .write_uint(offsets::STORAGE_Y.0, offsets::STORAGE_Y.1, storage_y);
        Ok(())
    }

    /// Overwrite the item's unique id. Fixed width: never resizes. A no-op
    /// on ear/simple items, which carry no unique id field at all (§4.4.2).
    pub fn update_id(&mut self, new_id: u64) -> Result<()> {
        let layout = self.layout()?;
        if let Some(off) = layout.unique_id_offset {
            self.cursor.write_uint(off, offsets::UNIQUE_ID.1, new_id);
        }
        Ok(())
    }

    fn require_non_ear_non_simple(layout: &ItemLayout, action: &str) -> Result<()> {
        if layout.is_ear || layout.is_simple {
            return Err(Error::UnsupportedAction(format!(
                "cannot {action} on an ear or simple item"
            )));
        }
        Ok(())
    }

    /// Set the item's socket count to `min(width * height, 6)` (§4.4.2),
    /// inserting the socket-count field and flipping `is_socketed` if it
    /// wasn't set already.
    pub fn maximize_sockets(&mut self) -> Result<()> {
        let layout = self.layout()?;
        Self::require_non_ear_non_simple(&layout, "maximize sockets")?;
        let code = layout.code.clone().expect("non-ear item always has a code");
        let base = self.catalog.base_item(&code)?;
        let sockets = (base.inv_width as u64 * base.inv_height as u64).min(MAX_TOTAL_SOCKETS);
        if let Some(off) = layout.total_sockets_offset {
            self.cursor
                .write_uint(off, offsets::TOTAL_SOCKETS_BITS, sockets);
            return Ok(());
        }
        self.cursor.write_bit(offsets::IS_SOCKETED, true);
        let insert_at = layout.start_mod_index;
        self.cursor
            .insert_uint(insert_at, offsets::TOTAL_SOCKETS_BITS, sockets);
        Ok(())
    }

    /// Overwrite the item's level. Fixed width: never resizes.
    pub fn change_level(&mut self, new_level: u64) -> Result<()> {
        let layout = self.layout()?;
        let off = layout
            .level_offset
            .ok_or_else(|| Error::UnsupportedAction("item has no level field".to_string()))?;
        self.cursor.write_uint(off, offsets::LEVEL.1, new_level);
        Ok(())
    }

    /// Retarget the item at a different base item code. Only supported
    /// between codes with an identical structural shape (same stackable,
    /// defense, durability, and tome flags): the record's fixed-width fields
    /// are overwritten in place, but no fields are inserted or removed.
    pub fn change_code(&mut self, new_code: &str) -> Result<()> {
        let layout = self.layout()?;
        let old_code = layout
            .code
            .clone()
            .ok_or_else(|| Error::UnsupportedAction("ear items have no code".to_string()))?;
        let old_base = self.catalog.base_item(&old_code)?;
        let new_base = self.catalog.base_item(new_code)?;
        if (old_base.is_stackable, old_base.has_defense, old_base.has_durability, old_base.is_tome)
            != (new_base.is_stackable, new_base.has_defense, new_base.has_durability, new_base.is_tome)
        {
            return Err(Error::InvalidItemType(format!(
                "{new_code} has a different record shape than {old_code}"
            )));
        }
        let mut bytes = [0u8; 4];
        for (i, b) in new_code.bytes().take(4).enumerate() {
            bytes[i] = b;
        }
        let code_offset = layout.code_offset.expect("non-ear item always has a code offset");
        self.cursor
            .write_uint(code_offset, offsets::CODE.1, u32::from_le_bytes(bytes) as u64);
        Ok(())
    }

    /// Overwrite max durability. Current durability is left untouched.
    pub fn change_max_durability(&mut self, new_max: i64) -> Result<()> {
        let layout = self.layout()?;
        let off = layout.max_durability_offset.ok_or_else(|| {
            Error::UnsupportedAction("item has no durability fields".to_string())
        })?;
        let raw = (new_max - START_MAX_DURABILITY_VALUE) as u64;
        self.cursor.write_uint(off, offsets::DURABILITY_BITS, raw);
        Ok(())
    }

    pub fn set_ethereal(&mut self, value: bool) -> Result<()> {
        self.cursor.write_bit(offsets::IS_ETHEREAL, value);
        Ok(())
    }

    /// Change the item's rarity, resizing the rarity detail block to the
    /// new rarity's shape (all new detail bits zeroed).
    pub fn change_rarity(&mut self, target: Rarity) -> Result<()> {
        if !matches!(
            target,
            Rarity::Magic | Rarity::Set | Rarity::Unique | Rarity::Rare | Rarity::Crafted
        ) {
            return Err(Error::UnsupportedRarity(format!(
                "{target:?} is not a synthesizable change_rarity target"
            )));
        }
        let layout = self.layout()?;
        let rarity_offset = layout
            .rarity_offset
            .ok_or_else(|| Error::UnsupportedAction("item has no rarity field".to_string()))?;
        let detail_start = layout.rarity_detail_start.expect("non-ear items always have a detail start");
        let detail_end = layout.rarity_detail_end.expect("non-ear items always have a detail end");
        let old_rarity = layout.rarity.expect("non-ear items always have a rarity");

        self.cursor
            .delete_bits(detail_start, detail_end - detail_start);
        let new_bits = rarity_detail_bits(target);
        self.cursor.insert_bits(detail_start, &vec![false; new_bits]);
        // Every offset downstream of the detail block (sockets, the set-mod
        // bitfield, the mod list itself) shifts by this much once it's resized.
        let delta = new_bits as isize - (detail_end - detail_start) as isize;

        self.cursor
            .write_uint(rarity_offset, offsets::RARITY.1, target.to_code());

        let was_set = old_rarity == Rarity::Set;
        let becomes_set = target == Rarity::Set;
        if was_set && !becomes_set {
            if let Some(off) = layout.set_mod_bit_field_offset {
                let shifted = (off as isize + delta) as usize;
                self.cursor.delete_bits(shifted, offsets::SET_MOD_BIT_FIELD_BITS);
            }
        } else if !was_set && becomes_set {
            let shifted = (layout.start_mod_index as isize + delta) as usize;
            self.cursor.insert_uint(shifted, offsets::SET_MOD_BIT_FIELD_BITS, 0);
        }
        Ok(())
    }

    fn sentinel_offset(&self) -> Result<usize> {
        let layout = self.layout()?;
        Ok(layout.mods_end - MOD_ID_LENGTH)
    }

    /// Append a new modifier built from `base_id` and its property values.
    /// Rejects a mod whose logical id already exists on the item.
    pub fn add_mod(&mut self, base_id: u64, values: &[(String, i64)]) -> Result<()> {
        Self::require_non_ear_non_simple(&self.layout()?, "add a modifier")?;
        let new_mod = Modifier::new_generic(&self.catalog, base_id, values)?;
        let logical_id = new_mod.logical_id(false);
        if self.mods()?.iter().any(|m| m.logical_id(false) == logical_id) {
            return Err(Error::DuplicateMod(logical_id));
        }
        let insert_at = self.sentinel_offset()?;
        self.cursor.insert_cursor_bits(insert_at, &new_mod.encode());
        Ok(())
    }

    /// Replace an existing modifier's property values in place, keeping its
    /// position in the list. Fails if the logical id is not present.
    pub fn edit_mod(&mut self, logical_id: &str, values: &[(String, i64)]) -> Result<()> {
        Self::require_non_ear_non_simple(&self.layout()?, "edit a modifier")?;
        let entry = self
            .mod_entries()?
            .into_iter()
            .find(|e| e.logical_id() == logical_id)
            .ok_or_else(|| Error::ModNotFoundInItem(logical_id.to_string()))?;
        let replacement = Modifier::new_generic(&self.catalog, entry.modifier.base_id, values)?;
        self.cursor.delete_bits(entry.start, entry.end - entry.start);
        self.cursor.insert_cursor_bits(entry.start, &replacement.encode());
        Ok(())
    }

    /// Remove a modifier by logical id. The adding-damage family's linked
    /// `max_dmg`/`duration` companions (see `Modifier::companion_base_ids`)
    /// live as properties within this same record, so deleting it removes
    /// them too; nothing else needs to be located separately.
    pub fn delete_mod(&mut self, logical_id: &str) -> Result<()> {
        Self::require_non_ear_non_simple(&self.layout()?, "delete a modifier")?;
        let entries = self.mod_entries()?;
        let target = entries
            .iter()
            .find(|e| e.logical_id() == logical_id)
            .ok_or_else(|| Error::ModNotFoundInItem(logical_id.to_string()))?;
        self.cursor.delete_bits(target.start, target.end - target.start);
        Ok(())
    }

    /// Remove every modifier except the protected counters (`cube_upgrade_*`,
    /// `trophy_counter`, `blessings_counter`, `item_upgraded`,
    /// `item_corrupted`) and, unless `include_affixes`, the rare/crafted
    /// affix markers.
    pub fn clear_mods(&mut self, include_affixes: bool) -> Result<()> {
        let layout = self.layout()?;
        Self::require_non_ear_non_simple(&layout, "clear modifiers")?;
        if layout.is_runeword {
            return Err(Error::UnsupportedAction(
                "cannot clear modifiers on a runeword item".to_string(),
            ));
        }
        let protected: Vec<&str> = {
            let mut p: Vec<&str> = CUBE_UPGRADE_MOD_CODES.to_vec();
            p.push(TROPHY_COUNTER_MOD_CODE);
            p.push(SHRINE_BLESSED_MOD_CODE);
            p.push(ITEM_UPGRADED_MOD_CODE);
            p.push(ITEM_CORRUPTED_MOD_CODE);
            if !include_affixes {
                p.extend(AFFIX_MOD_CODES);
            }
            p
        };
        let mut entries = self.mod_entries()?;
        entries.retain(|e| !protected.contains(&e.modifier.code.as_str()));
        entries.sort_by(|a, b| b.start.cmp(&a.start));
        for entry in entries {
            self.cursor.delete_bits(entry.start, entry.end - entry.start);
        }
        Ok(())
    }

    /// Maximize both rare/crafted affix markers to their documented value of
    /// 3, adding whichever of `is_prefix`/`is_suffix` isn't already present.
    pub fn maximize_affixes(&mut self) -> Result<()> {
        for &code in AFFIX_MOD_CODES {
            let present = self.mods()?.iter().any(|m| m.code == code);
            if present {
                self.edit_mod(code, &[("value".to_string(), 3)])?;
            } else {
                let base_mod = self.catalog.base_mod_by_code(code)?;
                self.add_mod(base_mod.id, &[("value".to_string(), 3)])?;
            }
        }
        Ok(())
    }

    fn has_marker(&self, code: &str) -> Result<bool> {
        Ok(self.mods()?.iter().any(|m| m.code == code))
    }

    /// Apply a named shrine recipe's mods, then stamp `blessings_counter`.
    /// Only rare/crafted items can be blessed (§4.4.2).
    pub fn shrine_bless(&mut self, recipe: &crate::rules::Recipe) -> Result<()> {
        let layout = self.layout()?;
        Self::require_non_ear_non_simple(&layout, "bless an item")?;
        if !matches!(layout.rarity, Some(Rarity::Rare) | Some(Rarity::Crafted)) {
            return Err(Error::InvalidRarity(
                "shrine_bless requires a rare or crafted item".to_string(),
            ));
        }
        if self.has_marker(SHRINE_BLESSED_MOD_CODE)? {
            return Err(Error::AlreadyBlessed);
        }
        self.apply_recipe(&recipe.entries, false)?;
        let marker_id = self.catalog.base_mod_by_code(SHRINE_BLESSED_MOD_CODE)?.id;
        self.add_mod(marker_id, &[("value".to_string(), 1)])
    }

    /// Apply a named upgrade formula's mods, then stamp `item_upgraded`.
    pub fn upgrade(&mut self, recipe: &crate::rules::Recipe) -> Result<()> {
        Self::require_non_ear_non_simple(&self.layout()?, "upgrade an item")?;
        if self.has_marker(ITEM_UPGRADED_MOD_CODE)? {
            return Err(Error::AlreadyUpgraded);
        }
        self.apply_recipe(&recipe.entries, false)?;
        let marker_id = self.catalog.base_mod_by_code(ITEM_UPGRADED_MOD_CODE)?.id;
        self.add_mod(marker_id, &[("value".to_string(), 1)])
    }

    /// Apply a caller-supplied list of `{mod_code, values}` entries (§4.4.2),
    /// merging additively into any existing mod sharing a logical id, then
    /// stamp `item_corrupted`. Corruption is not a named-recipe lookup at
    /// this layer: callers (e.g. the CLI) may source the list from
    /// `crate::rules::corrupt_recipe` or build it themselves.
    pub fn corrupt(&mut self, entries: &[crate::rules::RecipeEntry]) -> Result<()> {
        let layout = self.layout()?;
        Self::require_non_ear_non_simple(&layout, "corrupt an item")?;
        if layout.rarity == Some(Rarity::Normal) {
            return Err(Error::InvalidRarity(
                "corrupt cannot target a normal-rarity item".to_string(),
            ));
        }
        if self.has_marker(ITEM_CORRUPTED_MOD_CODE)? {
            return Err(Error::AlreadyCorrupted);
        }
        self.apply_recipe(entries, true)?;
        let marker_id = self.catalog.base_mod_by_code(ITEM_CORRUPTED_MOD_CODE)?.id;
        self.add_mod(marker_id, &[("value".to_string(), 1)])
    }

    fn apply_recipe(&mut self, entries: &[crate::rules::RecipeEntry], additive_merge: bool) -> Result<()> {
        for entry in entries {
            let base_id = self.catalog.base_mod_by_code(&entry.mod_code)?.id;
            let candidate = Modifier::new_generic(&self.catalog, base_id, &entry.values)?;
            let logical_id = candidate.logical_id(false);
            if additive_merge {
                if let Some(existing) = self.mod_entries()?.into_iter().find(|e| e.logical_id() == logical_id) {
                    let mut merged = existing.modifier.clone();
                    for prop in &mut merged.properties {
                        if let Some((_, delta)) = entry.values.iter().find(|(code, _)| code == &prop.code) {
                            prop.value += delta;
                        }
                    }
                    self.cursor.delete_bits(existing.start, existing.end - existing.start);
                    self.cursor.insert_cursor_bits(existing.start, &merged.encode());
                    continue;
                }
            }
            self.add_mod(base_id, &entry.values)?;
        }
        Ok(())
    }

    /// Deep-copy this item and assign it a fresh unique id.
    pub fn clone_with_new_id(&self, new_id: u64) -> Result<Item> {
        let mut copy = self.clone();
        copy.update_id(new_id)?;
        Ok(copy)
    }
}
