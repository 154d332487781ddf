//! Reads and writes a character save file: the header block, the item list,
//! the optional mercenary item list, and the trailing footer.
//!
//! The header's internal layout (name, stats, quest and waypoint state, the
//! fields modeled here) is not pinned down by any table in this crate's
//! retrieved reference material, so `Character` keeps the whole header as an
//! opaque byte blob (`prefix`) and only reads/writes the handful of fixed
//! offsets it needs directly — the same "raw bytes are the source of truth"
//! approach `Item` takes with its bit cursor. See `DESIGN.md` for the exact
//! offsets assumed.

use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::catalog::DataCatalog;
use crate::constants::{
    DifficultyTier, FOOTER, ITEM_LIST_FOOTER, ITEM_LIST_HEADER, MAX_ACT, MERC_ITEM_LIST_HEADER,
    Location, Storage,
};
use crate::error::{Error, Result};
use crate::item::Item;
use std::sync::Arc;

mod offsets {
    pub const VERSION: usize = 4;
    pub const FILE_SIZE: usize = 8;
    pub const CHECKSUM: usize = 12;
    pub const DIFFICULTY: usize = 16;
    pub const MAP_ID: usize = 19;
    pub const MERC_NAME_ID: usize = 23;
    pub const MIN_PREFIX_LEN: usize = 25;
}

/// One difficulty tier's progress byte: `{active:1, act:3, padding:4}`,
/// least-significant-bit first (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DifficultyProgress(u8);

impl DifficultyProgress {
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    pub fn to_byte(self) -> u8 {
        self.0
    }

    pub fn is_active(self) -> bool {
        self.0 & 0b1 != 0
    }

    pub fn act(self) -> u8 {
        (self.0 >> 1) & 0b111
    }

    pub fn set_active(&mut self, active: bool) {
        if active {
            self.0 |= 0b1;
        } else {
            self.0 &= !0b1;
        }
    }

    /// Errors if `act` exceeds `MAX_ACT`, leaving the byte unchanged.
    pub fn set_act(&mut self, act: u8) -> Result<()> {
        if act > MAX_ACT {
            return Err(Error::InvalidParams(format!("act {act} exceeds MAX_ACT ({MAX_ACT})")));
        }
        self.0 = (self.0 & !(0b111 << 1)) | ((act & 0b111) << 1);
        Ok(())
    }
}

/// Per-difficulty progress byte, one each for Normal, Nightmare, and Hell.
/// Invariant (enforced by `Character::set_active_difficulty`, not by this
/// type alone): at most one of the three is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharacterDifficulty {
    pub normal: DifficultyProgress,
    pub nightmare: DifficultyProgress,
    pub hell: DifficultyProgress,
}

impl CharacterDifficulty {
    fn get_mut(&mut self, tier: DifficultyTier) -> &mut DifficultyProgress {
        match tier {
            DifficultyTier::Normal => &mut self.normal,
            DifficultyTier::Nightmare => &mut self.nightmare,
            DifficultyTier::Hell => &mut self.hell,
        }
    }

    pub fn get(&self, tier: DifficultyTier) -> DifficultyProgress {
        match tier {
            DifficultyTier::Normal => self.normal,
            DifficultyTier::Nightmare => self.nightmare,
            DifficultyTier::Hell => self.hell,
        }
    }
}

/// A decoded character save file.
#[derive(Debug, Clone)]
pub struct Character {
    prefix: Vec<u8>,
    items: Vec<Item>,
    merc_items: Vec<Item>,
    trailing: Vec<u8>,
    catalog: Arc<DataCatalog>,
}

impl Character {
    fn require_prefix_len(prefix: &[u8]) -> Result<()> {
        if prefix.len() < offsets::MIN_PREFIX_LEN {
            return Err(Error::InvalidItem(
                "character header is shorter than the fixed field block".to_string(),
            ));
        }
        Ok(())
    }

    pub fn version(&self) -> u32 {
        (&self.prefix[offsets::VERSION..]).read_u32::<LittleEndian>().unwrap_or(0)
    }

    pub fn set_version(&mut self, version: u32) {
        (&mut self.prefix[offsets::VERSION..offsets::VERSION + 4])
            .write_u32::<LittleEndian>(version)
            .expect("slice is exactly 4 bytes");
    }

    pub fn difficulty(&self) -> CharacterDifficulty {
        CharacterDifficulty {
            normal: DifficultyProgress::from_byte(self.prefix[offsets::DIFFICULTY]),
            nightmare: DifficultyProgress::from_byte(self.prefix[offsets::DIFFICULTY + 1]),
            hell: DifficultyProgress::from_byte(self.prefix[offsets::DIFFICULTY + 2]),
        }
    }

    pub fn set_difficulty(&mut self, difficulty: CharacterDifficulty) {
        self.prefix[offsets::DIFFICULTY] = difficulty.normal.to_byte();
        self.prefix[offsets::DIFFICULTY + 1] = difficulty.nightmare.to_byte();
        self.prefix[offsets::DIFFICULTY + 2] = difficulty.hell.to_byte();
    }

    /// Make `tier` the character's sole active difficulty at the given act,
    /// clearing the active bit on the other two (§3: "at most one difficulty
    /// is active").
    pub fn set_active_difficulty(&mut self, tier: DifficultyTier, act: u8) -> Result<()> {
        let mut difficulty = self.difficulty();
        for t in [DifficultyTier::Normal, DifficultyTier::Nightmare, DifficultyTier::Hell] {
            difficulty.get_mut(t).set_active(t == tier);
        }
        difficulty.get_mut(tier).set_act(act)?;
        self.set_difficulty(difficulty);
        Ok(())
    }

    pub fn map_id(&self) -> u32 {
        (&self.prefix[offsets::MAP_ID..]).read_u32::<LittleEndian>().unwrap_or(0)
    }

    pub fn merc_name_id(&self) -> u16 {
        (&self.prefix[offsets::MERC_NAME_ID..]).read_u16::<LittleEndian>().unwrap_or(0)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Vec<Item> {
        &mut self.items
    }

    pub fn merc_items(&self) -> &[Item] {
        &self.merc_items
    }

    pub fn merc_items_mut(&mut self) -> &mut Vec<Item> {
        &mut self.merc_items
    }

    /// Items whose stored-rectangle overlaps `(x, y)` in the given storage.
    pub fn scan_items_by_position(&self, storage: Storage, x: u64, y: u64) -> Result<Vec<&Item>> {
        let mut hits = Vec::new();
        for item in &self.items {
            if item.location() != Location::Stored || item.storage() != Some(storage) {
                continue;
            }
            let code = item.code()?;
            let base = self.catalog.base_item(&code)?;
            let (ix, iy) = (item.storage_x(), item.storage_y());
            let (w, h) = (base.inv_width as u64, base.inv_height as u64);
            if x >= ix && x < ix + w && y >= iy && y < iy + h {
                hits.push(item);
            }
        }
        Ok(hits)
    }

    /// Place `new_items` into the first free cells of `storage`, scanning
    /// left to right then top to bottom, wrapping rows the way a player
    /// dragging items into a grid would. Items that don't fit are reported
    /// back rather than silently dropped.
    pub fn add_items(&mut self, storage: Storage, mut new_items: Vec<Item>) -> Result<Vec<Item>> {
        let (max_x, max_y) = storage.size();
        let mut occupied = vec![vec![false; max_y as usize]; max_x as usize];
        for item in &self.items {
            if item.location() != Location::Stored || item.storage() != Some(storage) {
                continue;
            }
            let code = item.code()?;
            let base = self.catalog.base_item(&code)?;
            mark_occupied(&mut occupied, item.storage_x(), item.storage_y(), base.inv_width, base.inv_height);
        }

        let mut rejected = Vec::new();
        'each_item: while let Some(mut item) = new_items.pop() {
            let code = item.code()?;
            let base = self.catalog.base_item(&code)?;
            let (w, h) = (base.inv_width, base.inv_height);
            let mut y = 0u8;
            while y + h <= max_y {
                let mut x = 0u8;
                while x + w <= max_x {
                    if fits(&occupied, x, y, w, h) {
                        mark_occupied(&mut occupied, x as u64, y as u64, w, h);
                        item.change_position(Location::Stored, None, Some(storage), x as u64, y as u64)?;
                        self.items.push(item);
                        continue 'each_item;
                    }
                    x += 1;
                }
                y += 1;
            }
            rejected.push(item);
        }
        rejected.reverse();
        Ok(rejected)
    }

    /// Clone every item matching `logical_ids` (by unique id) and place the
    /// copies into `storage` via `add_items`.
    pub fn duplicate_items(&mut self, unique_ids: &[u64], storage: Storage, next_id: &mut u64) -> Result<()> {
        let mut copies = Vec::new();
        for item in &self.items {
            if unique_ids.contains(&item.unique_id().unwrap_or(u64::MAX)) {
                copies.push(item.clone_with_new_id(*next_id)?);
                *next_id += 1;
            }
        }
        let rejected = self.add_items(storage, copies)?;
        if !rejected.is_empty() {
            return Err(Error::InvalidParams(format!(
                "{} duplicated item(s) did not fit in the target storage",
                rejected.len()
            )));
        }
        Ok(())
    }
}

fn mark_occupied(occupied: &mut [Vec<bool>], x: u64, y: u64, w: u8, h: u8) {
    for dx in 0..w as u64 {
        for dy in 0..h as u64 {
            if let Some(col) = occupied.get_mut((x + dx) as usize) {
                if let Some(cell) = col.get_mut((y + dy) as usize) {
                    *cell = true;
                }
            }
        }
    }
}

fn fits(occupied: &[Vec<bool>], x: u8, y: u8, w: u8, h: u8) -> bool {
    for dx in 0..w {
        for dy in 0..h {
            if occupied[(x + dx) as usize][(y + dy) as usize] {
                return false;
            }
        }
    }
    true
}

fn find_pattern(data: &[u8], pattern: &[u8], from: usize) -> Option<usize> {
    if pattern.is_empty() || from > data.len() {
        return None;
    }
    data[from..]
        .windows(pattern.len())
        .position(|w| w == pattern)
        .map(|i| i + from)
}

/// The declared item count in a section header counts non-socketed items
/// only; items carrying sockets are still serialized but excluded from the
/// tally (§4.5). A mismatch against the actual non-socketed count found
/// while scanning is not a corrupt file, just worth a note.
fn warn_on_count_mismatch(section: &str, declared: usize, items: &[Item]) {
    let actual = items.iter().filter(|item| !item.is_socketed()).count();
    if actual != declared {
        eprintln!(
            "mxl_save: {section} declared {declared} non-socketed item(s) but found {actual}"
        );
    }
}

/// Computes the save file's custom checksum: a 32-bit signed accumulator
/// folded bit by bit over every byte, with the checksum field itself
/// zeroed during the scan.
pub fn calculate_checksum(data: &[u8], checksum_offset: usize) -> u32 {
    let mut scratch = data.to_vec();
    scratch[checksum_offset..checksum_offset + 4].fill(0);
    let mut result: i32 = 0;
    for &byte in &scratch {
        let carry = if result < 0 { 1 } else { 0 };
        result = result.wrapping_shl(1).wrapping_add(byte as i32).wrapping_add(carry);
    }
    result as u32
}

/// Loads and saves character files. Holds no state of its own beyond the
/// catalog items are decoded against.
pub struct CharacterCodec {
    catalog: Arc<DataCatalog>,
}

impl CharacterCodec {
    pub fn new(catalog: Arc<DataCatalog>) -> Self {
        Self { catalog }
    }

    pub fn load(&self, path: &Path) -> Result<Character> {
        let data = std::fs::read(path)?;
        self.load_bytes(&data)
    }

    pub fn load_bytes(&self, data: &[u8]) -> Result<Character> {
        let header_index = find_pattern(data, &ITEM_LIST_HEADER, 0)
            .ok_or_else(|| Error::InvalidItem("missing item list header".to_string()))?;
        let prefix = data[..header_index].to_vec();
        Character::require_prefix_len(&prefix)?;

        let mut pos = header_index + ITEM_LIST_HEADER.len();
        let declared_count = (&data[pos..]).read_u16::<LittleEndian>()? as usize;
        pos += 2;
        let items = self.decode_items_until(data, &mut pos, &ITEM_LIST_FOOTER)?;
        warn_on_count_mismatch("item list", declared_count, &items);
        pos += ITEM_LIST_FOOTER.len();

        let mut merc_items = Vec::new();
        if data[pos..].starts_with(&MERC_ITEM_LIST_HEADER[..]) {
            pos += MERC_ITEM_LIST_HEADER.len();
            let declared_merc_count = (&data[pos..]).read_u16::<LittleEndian>()? as usize;
            pos += 2;
            // The mercenary list carries no end-of-section sentinel of its
            // own (§4.5): it runs until the character footer.
            merc_items = self.decode_items_until(data, &mut pos, &FOOTER)?;
            warn_on_count_mismatch("mercenary item list", declared_merc_count, &merc_items);
        }

        if data[pos..pos + FOOTER.len()] != FOOTER[..] {
            return Err(Error::InvalidItem("missing character footer".to_string()));
        }
        pos += FOOTER.len();
        let trailing = data[pos..].to_vec();

        Ok(Character {
            prefix,
            items,
            merc_items,
            trailing,
            catalog: self.catalog.clone(),
        })
    }

    /// Decode item records starting at `*pos` until the next bytes match
    /// `footer`. The declared item count in the section header is not a
    /// reliable loop bound: it counts only non-socketed items, while
    /// socketed items are still serialized inline (§4.5), so the only
    /// trustworthy end-of-section marker is the sentinel itself.
    fn decode_items_until(&self, data: &[u8], pos: &mut usize, footer: &[u8]) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        while !data[*pos..].starts_with(footer) {
            let item = Item::from_bytes(&data[*pos..], self.catalog.clone())?;
            *pos += item.byte_len()?;
            items.push(item);
        }
        Ok(items)
    }

    /// Re-serialize `character` and write it to `path`, patching the file
    /// size and checksum header fields. If `backup_path` is given and
    /// `path` already exists, the existing file is copied there first.
    pub fn save(&self, character: &Character, path: &Path, backup_path: Option<&Path>) -> Result<()> {
        let bytes = self.encode(character)?;
        if let Some(backup) = backup_path {
            if path.exists() {
                std::fs::copy(path, backup)?;
            }
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn encode(&self, character: &Character) -> Result<Vec<u8>> {
        let mut out = character.prefix.clone();
        out.extend_from_slice(&ITEM_LIST_HEADER);
        let non_socketed = character.items.iter().filter(|item| !item.is_socketed()).count();
        out.write_u16::<LittleEndian>(non_socketed as u16)?;
        for item in &character.items {
            out.extend_from_slice(&item.to_bytes());
        }
        out.extend_from_slice(&ITEM_LIST_FOOTER);

        if !character.merc_items.is_empty() {
            out.extend_from_slice(&MERC_ITEM_LIST_HEADER);
            let merc_non_socketed = character.merc_items.iter().filter(|item| !item.is_socketed()).count();
            out.write_u16::<LittleEndian>(merc_non_socketed as u16)?;
            for item in &character.merc_items {
                out.extend_from_slice(&item.to_bytes());
            }
        }

        out.extend_from_slice(&FOOTER);
        out.extend_from_slice(&character.trailing);

        let total_len = out.len() as u32;
        (&mut out[offsets::FILE_SIZE..offsets::FILE_SIZE + 4]).write_u32::<LittleEndian>(total_len)?;

        let checksum = calculate_checksum(&out, offsets::CHECKSUM);
        (&mut out[offsets::CHECKSUM..offsets::CHECKSUM + 4]).write_u32::<LittleEndian>(checksum)?;

        Ok(out)
    }
}
