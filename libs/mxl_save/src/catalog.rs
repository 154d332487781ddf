//! In-memory lookup tables for the static game data a save file references:
//! base item definitions, item type equivalence, modifier definitions, base
//! stats, and skills.
//!
//! All tables are loaded once from packed data blobs (see [`crate::packed_table`])
//! and are read-only afterward, so `DataCatalog` is cheap to share behind an
//! `Arc` across items being decoded concurrently.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An item type code and the other type codes it is equivalent to for the
/// purposes of mod-applicability checks (`is_weapon`, `is_armor`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemType {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub equiv_codes: Vec<String>,
}

/// A base item definition: the immutable template a concrete item instance
/// is stamped from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseItem {
    pub code: String,
    pub name: String,
    pub item_type: String,
    #[serde(default)]
    pub item_type_2: Option<String>,
    #[serde(default)]
    pub max_sockets: u64,
    #[serde(default)]
    pub is_stackable: bool,
    #[serde(default)]
    pub is_quest: bool,
    /// Whether this base item carries a defense value field.
    #[serde(default)]
    pub has_defense: bool,
    /// Whether this base item carries max/current durability fields.
    #[serde(default)]
    pub has_durability: bool,
    /// Whether this base item carries the tome charge-count field.
    #[serde(default)]
    pub is_tome: bool,
    /// Width in inventory cells.
    #[serde(default = "default_cell_dim")]
    pub inv_width: u8,
    /// Height in inventory cells.
    #[serde(default = "default_cell_dim")]
    pub inv_height: u8,
}

fn default_cell_dim() -> u8 {
    1
}

/// A base stat definition (strength, vitality, a skill's synergy stat, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseStat {
    pub id: u64,
    pub code: String,
    #[serde(default)]
    pub save_bits: u64,
    #[serde(default)]
    pub save_add: i64,
}

/// One `{code, bits}` factor within a modifier's property layout, e.g. the
/// `min` and `max` halves of a damage roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseModifierFactor {
    pub code: String,
    pub bits: u64,
    #[serde(default)]
    pub add: i64,
    /// Multiplier applied between the raw stored integer and the logical
    /// value: `value = (raw + add) * conv`. Most factors store the value
    /// directly (`conv = 1`); a few (chance percentages in the
    /// skill-on-event family) store a coarser unit.
    #[serde(default = "default_conv")]
    pub conv: i64,
}

fn default_conv() -> i64 {
    1
}

/// A base modifier definition: the property layout a `Modifier` instance's
/// raw bits are interpreted against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseModifier {
    pub id: u64,
    pub code: String,
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub factors: Vec<BaseModifierFactor>,
}

/// A skill definition, looked up by id when rendering skill-granting mods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub class: Option<String>,
}

/// All static game data a save file's items and characters are decoded
/// against. Built once via [`DataCatalog::load`] and shared thereafter.
#[derive(Debug, Clone, Default)]
pub struct DataCatalog {
    base_items_by_code: HashMap<String, BaseItem>,
    item_types_by_code: HashMap<String, ItemType>,
    base_mods_by_id: HashMap<u64, BaseModifier>,
    base_mods_by_code: HashMap<String, BaseModifier>,
    base_stats_by_id: HashMap<u64, BaseStat>,
    base_stats_by_code: HashMap<String, BaseStat>,
    skills_by_id: HashMap<u64, Skill>,
}

impl DataCatalog {
    /// Build a catalog from already-decoded JSON table rows. Used by
    /// `load` once the packed blobs have been decrypted and inflated, and
    /// directly by tests that want to stand up a catalog without the crypto
    /// envelope.
    pub fn from_tables(
        base_items: Vec<BaseItem>,
        item_types: Vec<ItemType>,
        base_mods: Vec<BaseModifier>,
        base_stats: Vec<BaseStat>,
        skills: Vec<Skill>,
    ) -> Self {
        let mut catalog = Self::default();
        for item in base_items {
            catalog.base_items_by_code.insert(item.code.clone(), item);
        }
        for item_type in item_types {
            catalog
                .item_types_by_code
                .insert(item_type.code.clone(), item_type);
        }
        for base_mod in base_mods {
            catalog.base_mods_by_id.insert(base_mod.id, base_mod.clone());
            catalog
                .base_mods_by_code
                .insert(base_mod.code.clone(), base_mod);
        }
        for stat in base_stats {
            catalog.base_stats_by_id.insert(stat.id, stat.clone());
            catalog.base_stats_by_code.insert(stat.code.clone(), stat);
        }
        for skill in skills {
            catalog.skills_by_id.insert(skill.id, skill);
        }
        catalog
    }

    /// Decrypt and load the five packed data tables from the encryption key
    /// and table file paths, in the order `base_items, item_types,
    /// item_mods, item_stats, skills`.
    pub fn load(key: &str, paths: &CatalogPaths) -> Result<Self> {
        let base_items = crate::packed_table::load_table(key, &paths.base_items)?;
        let item_types = crate::packed_table::load_table(key, &paths.item_types)?;
        let base_mods = crate::packed_table::load_table(key, &paths.item_mods)?;
        let base_stats = crate::packed_table::load_table(key, &paths.item_stats)?;
        let skills = crate::packed_table::load_table(key, &paths.skills)?;
        Ok(Self::from_tables(
            base_items, item_types, base_mods, base_stats, skills,
        ))
    }

    pub fn base_item(&self, code: &str) -> Result<&BaseItem> {
        self.base_items_by_code
            .get(code)
            .ok_or_else(|| Error::InvalidItemType(code.to_string()))
    }

    pub fn item_type(&self, code: &str) -> Result<&ItemType> {
        self.item_types_by_code
            .get(code)
            .ok_or_else(|| Error::InvalidItemType(code.to_string()))
    }

    pub fn base_mod_by_id(&self, id: u64) -> Option<&BaseModifier> {
        self.base_mods_by_id.get(&id)
    }

    pub fn base_mod_by_code(&self, code: &str) -> Result<&BaseModifier> {
        self.base_mods_by_code
            .get(code)
            .ok_or_else(|| Error::UnsupportedModCode(code.to_string()))
    }

    pub fn base_stat_by_id(&self, id: u64) -> Option<&BaseStat> {
        self.base_stats_by_id.get(&id)
    }

    pub fn base_stat_by_code(&self, code: &str) -> Option<&BaseStat> {
        self.base_stats_by_code.get(code)
    }

    pub fn skill(&self, id: u64) -> Option<&Skill> {
        self.skills_by_id.get(&id)
    }

    /// True if `code`'s item type, or any type reachable through
    /// `equiv_codes`, equals `target_type_code`. Equivalence is closed under
    /// a depth-first walk since `equiv_codes` edges are not guaranteed
    /// symmetric or transitive in the source table.
    pub fn item_type_contains(&self, code: &str, target_type_code: &str) -> bool {
        let Ok(base) = self.base_item(code) else {
            return false;
        };
        let mut roots = vec![base.item_type.clone()];
        if let Some(t2) = &base.item_type_2 {
            roots.push(t2.clone());
        }
        let mut visited = HashSet::new();
        for root in roots {
            if self.type_reaches(&root, target_type_code, &mut visited) {
                return true;
            }
        }
        false
    }

    fn type_reaches(&self, from: &str, target: &str, visited: &mut HashSet<String>) -> bool {
        if from == target {
            return true;
        }
        if !visited.insert(from.to_string()) {
            return false;
        }
        let Some(item_type) = self.item_types_by_code.get(from) else {
            return false;
        };
        item_type
            .equiv_codes
            .iter()
            .any(|next| self.type_reaches(next, target, visited))
    }

    pub fn is_weapon(&self, code: &str) -> bool {
        self.item_type_contains(code, "weap")
    }

    pub fn is_armor(&self, code: &str) -> bool {
        self.item_type_contains(code, "armo")
    }

    pub fn is_2h_weapon(&self, code: &str) -> bool {
        self.item_type_contains(code, "h2h") || self.item_type_contains(code, "2hnd")
    }

    pub fn is_body_armor(&self, code: &str) -> bool {
        self.item_type_contains(code, "tors")
    }
}

/// Paths to the five encrypted table blobs `DataCatalog::load` reads.
#[derive(Debug, Clone)]
pub struct CatalogPaths {
    pub base_items: std::path::PathBuf,
    pub item_types: std::path::PathBuf,
    pub item_mods: std::path::PathBuf,
    pub item_stats: std::path::PathBuf,
    pub skills: std::path::PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> DataCatalog {
        let item_types = vec![
            ItemType {
                code: "weap".into(),
                name: "Weapon".into(),
                equiv_codes: vec![],
            },
            ItemType {
                code: "swor".into(),
                name: "Sword".into(),
                equiv_codes: vec!["weap".into()],
            },
            ItemType {
                code: "tors".into(),
                name: "Body Armor".into(),
                equiv_codes: vec![],
            },
        ];
        let base_items = vec![BaseItem {
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
            inv_width: 1,
            inv_height: 3,
        }];
        DataCatalog::from_tables(base_items, item_types, vec![], vec![], vec![])
    }

    #[test]
    fn resolves_item_type_equivalence_through_dfs() {
        let catalog = sample_catalog();
        assert!(catalog.is_weapon("9wd"));
        assert!(!catalog.is_armor("9wd"));
    }

    #[test]
    fn unknown_code_is_not_an_error_for_equivalence_checks() {
        let catalog = sample_catalog();
        assert!(!catalog.item_type_contains("zzz", "weap"));
    }

    #[test]
    fn missing_base_item_is_an_error() {
        let catalog = sample_catalog();
        assert!(catalog.base_item("zzz").is_err());
    }
}
