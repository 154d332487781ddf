//! Exercises the §4.4.2 mutation surface end-to-end through the public API:
//! each mutation should be visible after a decode/encode/decode round trip.

mod common;

use mxl_save::constants::{Location, Rarity, Storage};
use mxl_save::rules;
use mxl_save::Item;

fn load_ring() -> (std::sync::Arc<mxl_save::DataCatalog>, Item) {
    let catalog = common::sample_catalog();
    let bytes = common::build_ring_bytes(10, 777);
    let item = Item::from_bytes(&bytes, catalog.clone()).unwrap();
    (catalog, item)
}

#[test]
fn change_position_moves_item_into_a_container() {
    let (_catalog, mut item) = load_ring();
    item.change_position(Location::Stored, None, Some(Storage::Stash), 3, 2).unwrap();
    assert_eq!(item.location(), Location::Stored);
    assert_eq!(item.storage(), Some(Storage::Stash));
    assert_eq!(item.storage_x(), 3);
    assert_eq!(item.storage_y(), 2);
}

#[test]
fn update_id_overwrites_without_resizing() {
    let (_catalog, mut item) = load_ring();
    let len_before = item.to_bytes().len();
    item.update_id(999).unwrap();
    assert_eq!(item.unique_id().unwrap(), 999);
    assert_eq!(item.to_bytes().len(), len_before);
}

#[test]
fn maximize_sockets_caps_at_six() {
    let catalog = common::sample_catalog();
    let bytes = common::build_sword_bytes(10, 1); // 2x4 base, would be 8 uncapped
    let mut item = Item::from_bytes(&bytes, catalog).unwrap();
    item.maximize_sockets().unwrap();
    assert!(item.is_socketed());
    assert_eq!(item.total_sockets().unwrap(), 6);

    let encoded = item.to_bytes();
    let reloaded = Item::from_bytes(&encoded, common::sample_catalog()).unwrap();
    assert!(reloaded.is_socketed());
    assert_eq!(reloaded.total_sockets().unwrap(), 6);
}

#[test]
fn mod_mutations_reject_simple_items() {
    let catalog = common::sample_catalog();
    let bytes = common::build_simple_item_bytes("rin", 1, 1);
    let mut item = Item::from_bytes(&bytes, catalog).unwrap();

    assert!(item.add_mod(5, &[("value".to_string(), 1)]).is_err());
    assert!(item.edit_mod("strength", &[("value".to_string(), 1)]).is_err());
    assert!(item.delete_mod("strength").is_err());
    assert!(item.clear_mods(false).is_err());
    assert!(item.maximize_sockets().is_err());
}

#[test]
fn mod_mutations_reject_ear_items() {
    let catalog = common::sample_catalog();
    let bytes = common::build_ear_item_bytes("Hero", 50, 1);
    let mut item = Item::from_bytes(&bytes, catalog).unwrap();

    assert!(item.add_mod(5, &[("value".to_string(), 1)]).is_err());
    assert!(item.edit_mod("strength", &[("value".to_string(), 1)]).is_err());
    assert!(item.delete_mod("strength").is_err());
    assert!(item.clear_mods(false).is_err());
    assert!(item.maximize_sockets().is_err());
    // `update_id` silently no-ops on an ear item instead of erroring.
    item.update_id(999).unwrap();
}

#[test]
fn change_level_overwrites_the_seven_bit_field() {
    let (_catalog, mut item) = load_ring();
    item.change_level(63).unwrap();
    assert_eq!(item.level().unwrap(), 63);
}

#[test]
fn change_code_rewrites_the_four_char_code() {
    let (_catalog, mut item) = load_ring();
    item.change_code("xyz").unwrap();
    assert_eq!(item.code().unwrap(), "xyz");
    assert!(item.change_code("toolong").is_err());
}

#[test]
fn change_max_durability_requires_durability_branch() {
    let catalog = common::sample_catalog();
    let sword_bytes = common::build_sword_bytes(10, 2);
    let mut sword = Item::from_bytes(&sword_bytes, catalog.clone()).unwrap();
    sword.change_max_durability(40).unwrap();

    let ring_bytes = common::build_ring_bytes(10, 3);
    let mut ring = Item::from_bytes(&ring_bytes, catalog).unwrap();
    assert!(ring.change_max_durability(40).is_err());
}

#[test]
fn set_ethereal_flips_the_single_bit() {
    let (_catalog, mut item) = load_ring();
    assert!(!item.is_ethereal());
    item.set_ethereal(true).unwrap();
    assert!(item.is_ethereal());
}

#[test]
fn change_rarity_resizes_the_detail_block_and_keeps_other_fields() {
    let (_catalog, mut item) = load_ring();
    item.change_rarity(Rarity::Magic).unwrap();
    assert_eq!(item.rarity().unwrap(), Rarity::Magic);
    assert_eq!(item.unique_id().unwrap(), 777);
    assert_eq!(item.level().unwrap(), 10);
}

#[test]
fn add_edit_delete_mod_cycle() {
    let (_catalog, mut item) = load_ring();
    item.add_mod(5, &[("value".to_string(), 10)]).unwrap();
    assert_eq!(item.mods().unwrap()[0].property("value"), Some(10));

    item.edit_mod("strength", &[("value".to_string(), 20)]).unwrap();
    assert_eq!(item.mods().unwrap()[0].property("value"), Some(20));

    item.delete_mod("strength").unwrap();
    assert!(item.mods().unwrap().is_empty());
    assert!(item.delete_mod("strength").is_err());
}

#[test]
fn add_mod_rejects_duplicate_logical_id() {
    let (_catalog, mut item) = load_ring();
    item.add_mod(5, &[("value".to_string(), 1)]).unwrap();
    assert!(item.add_mod(5, &[("value".to_string(), 2)]).is_err());
}

#[test]
fn maximize_affixes_adds_missing_markers_at_value_three() {
    let (_catalog, mut item) = load_ring();
    assert!(item.mods().unwrap().is_empty());

    item.maximize_affixes().unwrap();
    let mods = item.mods().unwrap();
    let prefix = mods.iter().find(|m| m.code == "is_prefix").unwrap();
    let suffix = mods.iter().find(|m| m.code == "is_suffix").unwrap();
    assert_eq!(prefix.property("value"), Some(3));
    assert_eq!(suffix.property("value"), Some(3));
}

#[test]
fn maximize_affixes_overwrites_an_existing_marker_to_three() {
    let (catalog, mut item) = load_ring();
    let prefix_id = catalog.base_mod_by_code("is_prefix").unwrap().id;
    item.add_mod(prefix_id, &[("value".to_string(), 1)]).unwrap();

    item.maximize_affixes().unwrap();
    let mods = item.mods().unwrap();
    let prefix = mods.iter().find(|m| m.code == "is_prefix").unwrap();
    let suffix = mods.iter().find(|m| m.code == "is_suffix").unwrap();
    assert_eq!(prefix.property("value"), Some(3));
    assert_eq!(suffix.property("value"), Some(3));
}

#[test]
fn shrine_bless_eerie_minor_grants_documented_values_and_blocks_reapplication() {
    let (catalog, mut item) = load_ring();
    item.change_rarity(Rarity::Crafted).unwrap();
    let recipe = rules::shrine_recipe("Eerie", catalog.is_body_armor("rin") || catalog.is_2h_weapon("rin")).unwrap();
    item.shrine_bless(&recipe).unwrap();

    let mods = item.mods().unwrap();
    assert_eq!(mods.iter().find(|m| m.code == "enr_factor").unwrap().property("value"), Some(30));
    assert_eq!(mods.iter().find(|m| m.code == "energy").unwrap().property("value"), Some(20));
    assert_eq!(mods.iter().find(|m| m.code == "item_energy_percent").unwrap().property("value"), Some(5));
    assert!(mods.iter().any(|m| m.code == "blessings_counter"));

    assert!(item.shrine_bless(&recipe).is_err());
}

#[test]
fn upgrade_stamps_marker_and_blocks_reapplication() {
    let (_catalog, mut item) = load_ring();
    let recipe = rules::upgrade_recipe("normal_to_superior").unwrap();
    item.upgrade(&recipe).unwrap();
    assert!(item.mods().unwrap().iter().any(|m| m.code == "item_upgraded"));
    assert!(item.upgrade(&recipe).is_err());
}

#[test]
fn corrupt_additively_merges_onto_an_existing_mod() {
    let (_catalog, mut item) = load_ring();
    item.change_rarity(Rarity::Magic).unwrap();
    item.add_mod(108, &[("value".to_string(), 5)]).unwrap(); // firemindam
    let recipe = rules::corrupt_recipe("minor").unwrap();
    item.corrupt(&recipe.entries).unwrap();

    let merged = item.mods().unwrap().into_iter().find(|m| m.code == "firemindam").unwrap();
    assert_eq!(merged.property("value"), Some(10)); // 5 existing + 5 from "minor"
    assert!(item.mods().unwrap().iter().any(|m| m.code == "item_corrupted"));
    assert!(item.corrupt(&recipe.entries).is_err());
}

#[test]
fn corrupt_rejects_normal_rarity_items() {
    let (_catalog, mut item) = load_ring();
    let recipe = rules::corrupt_recipe("minor").unwrap();
    assert!(item.corrupt(&recipe.entries).is_err());
}

#[test]
fn shrine_bless_rejects_non_rare_non_crafted_items() {
    let (catalog, mut item) = load_ring();
    let recipe = rules::shrine_recipe("Eerie", catalog.is_body_armor("rin") || catalog.is_2h_weapon("rin")).unwrap();
    assert!(item.shrine_bless(&recipe).is_err());
}

#[test]
fn clone_with_new_id_deep_copies_and_rekeys() {
    let (_catalog, mut item) = load_ring();
    item.add_mod(5, &[("value".to_string(), 7)]).unwrap();
    let clone = item.clone_with_new_id(123456).unwrap();

    assert_eq!(clone.unique_id().unwrap(), 123456);
    assert_eq!(item.unique_id().unwrap(), 777);
    assert_eq!(clone.mods().unwrap().len(), 1);
    assert_eq!(clone.to_bytes(), {
        let mut c = item.clone();
        c.update_id(123456).unwrap();
        c.to_bytes()
    });
}
