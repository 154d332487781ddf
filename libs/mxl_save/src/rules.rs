//! Declarative recipe tables for shrine blessings, cube upgrade formulas,
//! and corruption outcomes.
//!
//! A [`Recipe`] names the mods a rule grants by code rather than by numeric
//! base mod id, since ids are an artifact of one loaded `item_mods` table
//! and the same recipe should apply unchanged across data versions. Ids are
//! resolved against a [`crate::catalog::DataCatalog`] only when a recipe is
//! applied to an item (see `Item::shrine_bless`/`upgrade`/`corrupt`).

use crate::error::{Error, Result};

/// One mod a recipe grants: its code and the property values to stamp it
/// with.
#[derive(Debug, Clone)]
pub struct RecipeEntry {
    pub mod_code: String,
    pub values: Vec<(String, i64)>,
}

/// A named set of mods applied together by one shrine/upgrade/corruption rule.
#[derive(Debug, Clone, Default)]
pub struct Recipe {
    pub entries: Vec<RecipeEntry>,
}

impl Recipe {
    fn new(entries: Vec<(&str, Vec<(&str, i64)>)>) -> Self {
        Recipe {
            entries: entries
                .into_iter()
                .map(|(code, values)| RecipeEntry {
                    mod_code: code.to_string(),
                    values: values.into_iter().map(|(c, v)| (c.to_string(), v)).collect(),
                })
                .collect(),
        }
    }
}

/// Look up a shrine recipe by name. `heavy` selects the stronger tier a
/// shrine grants to body armor and 2H weapons over everything else; callers
/// resolve it from the target item via `DataCatalog::is_body_armor` /
/// `is_2h_weapon` before calling this.
pub fn shrine_recipe(name: &str, heavy: bool) -> Result<Recipe> {
    let recipe = match (name, heavy) {
        ("lesser", _) => Recipe::new(vec![("strength", vec![("value", 5)])]),
        ("greater", _) => Recipe::new(vec![
            ("strength", vec![("value", 10)]),
            ("vitality", vec![("value", 10)]),
        ]),
        ("divine", _) => Recipe::new(vec![
            ("strength", vec![("value", 20)]),
            ("vitality", vec![("value", 20)]),
            ("energy", vec![("value", 20)]),
            ("dexterity", vec![("value", 20)]),
        ]),
        ("Eerie", false) => Recipe::new(vec![
            ("enr_factor", vec![("value", 30)]),
            ("energy", vec![("value", 20)]),
            ("item_energy_percent", vec![("value", 5)]),
        ]),
        ("Eerie", true) => Recipe::new(vec![
            ("enr_factor", vec![("value", 60)]),
            ("energy", vec![("value", 40)]),
            ("item_energy_percent", vec![("value", 10)]),
        ]),
        _ => return Err(Error::UnsupportedShrine(name.to_string())),
    };
    Ok(recipe)
}

/// Look up a cube upgrade formula by name.
pub fn upgrade_recipe(name: &str) -> Result<Recipe> {
    let recipe = match name {
        "normal_to_superior" => Recipe::new(vec![("item_strength_percent", vec![("value", 15)])]),
        "exceptional_to_elite" => Recipe::new(vec![
            ("item_strength_percent", vec![("value", 15)]),
            ("enr_factor", vec![("value", 10)]),
        ]),
        _ => return Err(Error::UnsupportedFormular(name.to_string())),
    };
    Ok(recipe)
}

/// Look up a corruption outcome by name. This is a convenience for callers
/// (the CLI) that want a named preset; `Item::corrupt` itself takes a raw
/// `&[RecipeEntry]` list and has no notion of corruption names. Corruption's
/// defining trait is additive merge: applying the same outcome twice
/// accumulates rather than overwriting (see `Item::corrupt`).
pub fn corrupt_recipe(name: &str) -> Result<Recipe> {
    let recipe = match name {
        "minor" => Recipe::new(vec![("firemindam", vec![("value", 5)])]),
        "major" => Recipe::new(vec![
            ("firemindam", vec![("value", 15)]),
            ("coldmindam", vec![("value", 15)]),
        ]),
        _ => return Err(Error::InvalidParams(format!("unknown corruption outcome: {name}"))),
    };
    Ok(recipe)
}
