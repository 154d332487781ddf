//! Decodes and re-encodes a single item modifier: the 9-bit base id plus a
//! property layout that depends on the mod's code.
//!
//! Most mods are a flat list of `{code, bits}` factors taken straight from
//! the `item_mods` table row (`DataCatalog::base_mod_by_id`), decoded
//! generically. A handful of families carry a layout the table doesn't
//! describe and are special-cased by code: class-skill grants, off-class
//! skill grants, reanimate-on-kill, the skill-on-event family, the mystic
//! orb counter, and description-text mods. See `decode_properties`.

use crate::bitcursor::BitCursor;
use crate::catalog::DataCatalog;
use crate::constants::*;
use crate::error::{Error, Result};

/// One decoded `{code, value}` pair within a modifier, remembering the bit
/// width, bias, and conversion rate it was decoded with so
/// `Modifier::encode` can write it back without re-deriving the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModProperty {
    pub code: String,
    pub bits: u64,
    pub add: i64,
    pub conv: i64,
    pub value: i64,
}

impl ModProperty {
    fn decode(cursor: &BitCursor, offset: &mut usize, code: &str, bits: u64, add: i64) -> Self {
        Self::decode_with_conv(cursor, offset, code, bits, add, 1)
    }

    /// Decode a property whose raw bits carry a conversion rate: the stored
    /// value is `(raw + add) * conv` (§4.3's decode formula).
    fn decode_with_conv(cursor: &BitCursor, offset: &mut usize, code: &str, bits: u64, add: i64, conv: i64) -> Self {
        let width = bits as usize;
        let raw = cursor.read_uint(*offset, width);
        *offset += width;
        ModProperty {
            code: code.to_string(),
            bits,
            add,
            conv,
            value: (raw as i64 + add) * conv.max(1),
        }
    }

    /// Inverse of the decode formula: `raw = ceil(value / conv) - add`,
    /// clamped to the field's bit width.
    fn push_encoded(&self, cursor: &mut BitCursor) {
        let conv = self.conv.max(1);
        let desired = self.value.div_euclid(conv) + if self.value.rem_euclid(conv) != 0 { 1 } else { 0 };
        let max_raw = if self.bits >= 64 { u64::MAX } else { (1u64 << self.bits) - 1 };
        let raw = (desired - self.add).clamp(0, max_raw as i64) as u64;
        cursor.push_uint(self.bits as usize, raw);
    }
}

/// A single decoded modifier: its base id, code, and property values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
    pub base_id: u64,
    pub code: String,
    pub properties: Vec<ModProperty>,
}

impl Modifier {
    /// Total bit width this modifier occupies, including its 9-bit id.
    pub fn bit_len(&self) -> usize {
        MOD_ID_LENGTH + self.properties.iter().map(|p| p.bits as usize).sum::<usize>()
    }

    pub fn property(&self, code: &str) -> Option<i64> {
        self.properties.iter().find(|p| p.code == code).map(|p| p.value)
    }

    pub fn set_property(&mut self, code: &str, value: i64) -> Result<()> {
        let prop = self
            .properties
            .iter_mut()
            .find(|p| p.code == code)
            .ok_or_else(|| Error::PropCodeNotFound(code.to_string()))?;
        prop.value = value;
        Ok(())
    }

    /// The discriminating property, if any, used to tell apart two instances
    /// of the same mod code that legitimately coexist on one item (two
    /// different granted skills, two different reanimate monsters, ...).
    fn discriminator(&self) -> Option<i64> {
        let key = match self.code.as_str() {
            ADDING_CLASS_SKILL_LEVEL_MOD_CODE => "class_id",
            ADDING_OSKILL_MOD_CODE => "skill_id",
            REANIMATE_MOD_CODE => "monster_id",
            MO_COUNT_MOD_CODE => "mys_orb_id",
            code if SKILL_ON_EVENT_MOD_CODES.contains(&code) => "skill_id",
            _ => return None,
        };
        self.property(key)
    }

    /// A stable identity for this modifier within one item, used to key it
    /// in add/edit/delete operations. Deliberately not a hash of the raw
    /// decoded bits (see crate docs): code plus a discriminating property
    /// where the code alone is ambiguous, plus `|rw` when the modifier lives
    /// in an item's runeword list rather than its main list.
    pub fn logical_id(&self, in_runeword_list: bool) -> String {
        let base = match self.discriminator() {
            Some(value) => format!("{}:{value}", self.code),
            None => self.code.clone(),
        };
        if in_runeword_list {
            format!("{base}|rw")
        } else {
            base
        }
    }

    /// Base mod ids of companion modifiers that must travel with this one
    /// (the linked max-damage and/or duration halves of a damage-adding
    /// mod). Empty for every other family.
    pub fn companion_base_ids(&self) -> Vec<u64> {
        if !ADDING_DMG_MOD_CODES.contains(&self.code.as_str()) {
            return Vec::new();
        }
        let mut ids = vec![self.base_id + 1];
        if ADDING_DMG_WITH_DURATION_MOD_CODES.contains(&self.code.as_str()) {
            ids.push(self.base_id + 2);
        }
        ids
    }

    /// Re-encode this modifier's id and properties, in decode order.
    pub fn encode(&self) -> BitCursor {
        let mut cursor = BitCursor::default();
        cursor.push_uint(MOD_ID_LENGTH, self.base_id);
        for prop in &self.properties {
            prop.push_encoded(&mut cursor);
        }
        cursor
    }

    /// Build a modifier from a base mod id and a plain list of
    /// `(code, value)` pairs, looking up each property's layout through the
    /// same per-code family dispatch `decode` uses (`property_layout`) so a
    /// freshly constructed modifier re-encodes with the exact widths a
    /// decode of that family would expect. Used by `add_mod`.
    pub fn new_generic(catalog: &DataCatalog, base_id: u64, values: &[(String, i64)]) -> Result<Self> {
        let base_mod = catalog
            .base_mod_by_id(base_id)
            .ok_or_else(|| Error::UnsupportedModCode(format!("base mod id {base_id}")))?;
        let code = base_mod.code.clone();
        let layout = property_layout(catalog, &code, base_mod)?;
        let properties = layout
            .into_iter()
            .map(|spec| {
                let value = values
                    .iter()
                    .find(|(c, _)| c == &spec.code)
                    .map(|(_, v)| *v)
                    .unwrap_or(0);
                ModProperty {
                    code: spec.code,
                    bits: spec.bits,
                    add: spec.add,
                    conv: spec.conv,
                    value,
                }
            })
            .collect();
        Ok(Modifier {
            base_id,
            code,
            properties,
        })
    }
}

/// One property's bit layout, independent of whether it is being read from a
/// cursor (`decode_properties`) or constructed fresh from caller-supplied
/// values (`Modifier::new_generic`).
struct PropertySpec {
    code: String,
    bits: u64,
    add: i64,
    conv: i64,
}

impl PropertySpec {
    fn new(code: &str, bits: u64, add: i64) -> Self {
        Self::with_conv(code, bits, add, 1)
    }

    fn with_conv(code: &str, bits: u64, add: i64, conv: i64) -> Self {
        PropertySpec { code: code.to_string(), bits, add, conv }
    }
}

/// The property layout §4.3 assigns to `code`, shared by `decode_properties`
/// (which reads each spec's bits off a cursor) and `Modifier::new_generic`
/// (which fills each spec's value from caller-supplied overrides). Mirrors
/// `decode_properties`'s family dispatch exactly; keep the two in sync.
fn property_layout(catalog: &DataCatalog, code: &str, base_mod: &crate::catalog::BaseModifier) -> Result<Vec<PropertySpec>> {
    if code == ADDING_CLASS_SKILL_LEVEL_MOD_CODE {
        return Ok(vec![PropertySpec::new("class_id", 3, 0), PropertySpec::new("value", 4, 0)]);
    }
    if code == ADDING_OSKILL_MOD_CODE {
        return Ok(vec![PropertySpec::new("skill_id", 12, 0), PropertySpec::new("skill_level", 7, -1)]);
    }
    if code == REANIMATE_MOD_CODE {
        return Ok(vec![PropertySpec::new("monster_id", 12, 0), PropertySpec::new("chance", 7, 0)]);
    }
    if SKILL_ON_EVENT_MOD_CODES.contains(&code) {
        let wide = base_mod.length >= 25;
        let skill_id_bits = if wide { 12 } else { 11 };
        let chance_conv = if wide { 2 } else { 1 };
        return Ok(vec![
            PropertySpec::new("skill_level", 6, 0),
            PropertySpec::new("skill_id", skill_id_bits, 0),
            PropertySpec::with_conv("chance", 7, 0, chance_conv),
        ]);
    }
    if code == MO_COUNT_MOD_CODE {
        return Ok(vec![PropertySpec::new("mys_orb_id", 8, 0), PropertySpec::new("unknown", 10, 0)]);
    }
    if DESC_TEXT_MOD_CODES.contains(&code) {
        return Ok(vec![PropertySpec::new("text_id", base_mod.length, 0)]);
    }
    if ADDING_DMG_MOD_CODES.contains(&code) {
        return adding_damage_layout(catalog, code, base_mod);
    }

    Ok(base_mod
        .factors
        .iter()
        .map(|factor| PropertySpec::with_conv(&factor.code, factor.bits, factor.add, factor.conv))
        .collect())
}

/// The adding-damage family's layout: `value` sized from `base_mod.length`
/// (falling back to its own `factors` table if `length` is unset), plus the
/// linked companion(s) at `id + 1` (and `id + 2` for the duration variants),
/// whose widths come from those base mods' own `length` field.
fn adding_damage_layout(catalog: &DataCatalog, code: &str, base_mod: &crate::catalog::BaseModifier) -> Result<Vec<PropertySpec>> {
    let companion_name = if code == "item_maxdamage_percent" { "min_dmg" } else { "max_dmg" };
    let primary_width = if base_mod.length > 0 {
        base_mod.length
    } else {
        base_mod
            .factors
            .first()
            .map(|f| f.bits)
            .ok_or_else(|| Error::InvalidItem(format!("adding-damage mod {code} has no width")))?
    };
    let mut specs = vec![PropertySpec::new("value", primary_width, 0)];

    let companion = catalog
        .base_mod_by_id(base_mod.id + 1)
        .ok_or_else(|| Error::InvalidItem(format!("adding-damage mod {code} missing companion id+1")))?;
    specs.push(PropertySpec::new(companion_name, companion.length, 0));

    if ADDING_DMG_WITH_DURATION_MOD_CODES.contains(&code) {
        let duration = catalog
            .base_mod_by_id(base_mod.id + 2)
            .ok_or_else(|| Error::InvalidItem(format!("adding-damage mod {code} missing companion id+2")))?;
        specs.push(PropertySpec::new("duration", duration.length, 0));
    }

    Ok(specs)
}

/// True if `id`, read where a modifier id is expected, is the list
/// terminator rather than a real base mod id.
pub fn is_end_of_mods(id: u64) -> bool {
    id == END_OF_MOD_SECTION
}

/// Decode one modifier starting at `offset`. Returns the modifier and the
/// bit offset immediately after it, or `None` if `id` is neither a known
/// base mod nor a known stat: the table data can't place where this mod
/// ends, so the mod list walk has to stop here rather than guess. Callers
/// must check `is_end_of_mods` on the raw id before calling this, since the
/// terminator itself is not a valid mod to decode.
pub fn decode(cursor: &BitCursor, offset: usize, catalog: &DataCatalog) -> Result<Option<(Modifier, usize)>> {
    let mut pos = offset;
    let id = cursor.read_uint(pos, MOD_ID_LENGTH);
    pos += MOD_ID_LENGTH;

    let Some(base_mod) = catalog.base_mod_by_id(id) else {
        // Unknown mod id: the table row is missing (a stat the live data
        // files dropped). Fall back to the matching stat's bit width so the
        // rest of the mod list still decodes; the value itself is kept as
        // an opaque pass-through property rather than interpreted.
        let Some(stat) = catalog.base_stat_by_id(id) else {
            return Ok(None);
        };
        let properties = vec![ModProperty::decode(cursor, &mut pos, "raw", stat.save_bits, 0)];
        return Ok(Some((
            Modifier {
                base_id: id,
                code: format!("unknown_{id}"),
                properties,
            },
            pos,
        )));
    };

    let code = base_mod.code.clone();
    let properties = decode_properties(cursor, &mut pos, catalog, &code, base_mod)?;
    Ok(Some((
        Modifier {
            base_id: id,
            code,
            properties,
        },
        pos,
    )))
}

/// Read each property the §4.3 family dispatch (`property_layout`) assigns
/// to `code` off the cursor, in order, advancing `*pos` past all of them.
fn decode_properties(
    cursor: &BitCursor,
    pos: &mut usize,
    catalog: &DataCatalog,
    code: &str,
    base_mod: &crate::catalog::BaseModifier,
) -> Result<Vec<ModProperty>> {
    let layout = property_layout(catalog, code, base_mod)?;
    Ok(layout
        .into_iter()
        .map(|spec| ModProperty::decode_with_conv(cursor, pos, &spec.code, spec.bits, spec.add, spec.conv))
        .collect())
}
