//! Byte-exact round trips: decode then re-encode should reproduce the
//! original buffer for both items and whole character files.

mod common;

use mxl_save::constants::{DifficultyTier, Storage};
use mxl_save::{CharacterCodec, Item};

#[test]
fn ring_item_round_trips_byte_exact() {
    let catalog = common::sample_catalog();
    let bytes = common::build_ring_bytes(12, 555);
    let item = Item::from_bytes(&bytes, catalog).unwrap();
    assert_eq!(item.to_bytes(), bytes);
}

#[test]
fn sword_item_round_trips_byte_exact() {
    let catalog = common::sample_catalog();
    let bytes = common::build_sword_bytes(30, 42);
    let item = Item::from_bytes(&bytes, catalog).unwrap();
    assert_eq!(item.to_bytes(), bytes);
}

#[test]
fn item_with_added_mod_round_trips_after_decode() {
    let catalog = common::sample_catalog();
    let bytes = common::build_ring_bytes(1, 1);
    let mut item = Item::from_bytes(&bytes, catalog.clone()).unwrap();
    item.add_mod(5, &[("value".to_string(), 25)]).unwrap();
    let encoded = item.to_bytes();

    let reloaded = Item::from_bytes(&encoded, catalog).unwrap();
    assert_eq!(reloaded.mods().unwrap().len(), 1);
    assert_eq!(reloaded.mods().unwrap()[0].property("value"), Some(25));
    assert_eq!(reloaded.to_bytes(), encoded);
}

#[test]
fn character_with_items_round_trips_through_save_and_load() {
    let catalog = common::sample_catalog();
    let codec = CharacterCodec::new(catalog.clone());
    let ring_bytes = common::build_ring_bytes(5, 10);
    let sword_bytes = common::build_sword_bytes(20, 11);
    let raw = common::build_character_bytes(&[ring_bytes, sword_bytes], &[]);

    let character = codec.load_bytes(&raw).unwrap();
    assert_eq!(character.items().len(), 2);

    let encoded = codec.encode(&character).unwrap();
    let reloaded = codec.load_bytes(&encoded).unwrap();
    assert_eq!(reloaded.items().len(), 2);
    assert_eq!(reloaded.map_id(), character.map_id());
    assert_eq!(reloaded.merc_name_id(), character.merc_name_id());
}

#[test]
fn cube_placement_round_trips_and_is_found_by_position_scan() {
    let catalog = common::sample_catalog();
    let codec = CharacterCodec::new(catalog.clone());
    let raw = common::build_character_bytes(&[], &[]);
    let mut character = codec.load_bytes(&raw).unwrap();

    let sword = Item::from_bytes(&common::build_sword_bytes(30, 1), catalog.clone()).unwrap();
    let ring = Item::from_bytes(&common::build_ring_bytes(10, 2), catalog.clone()).unwrap();
    let rejected = character.add_items(Storage::HoradricCube, vec![sword, ring]).unwrap();
    assert!(rejected.is_empty());
    assert_eq!(character.items().len(), 2);

    let hits = character.scan_items_by_position(Storage::HoradricCube, 0, 0).unwrap();
    assert_eq!(hits.len(), 1);

    let encoded = codec.encode(&character).unwrap();
    let reloaded = codec.load_bytes(&encoded).unwrap();
    assert_eq!(reloaded.items().len(), 2);
    let hits = reloaded.scan_items_by_position(Storage::HoradricCube, 0, 0).unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn active_difficulty_set_to_hell_act_four_survives_save_and_reload() {
    let catalog = common::sample_catalog();
    let codec = CharacterCodec::new(catalog);
    let raw = common::build_character_bytes(&[common::build_ring_bytes(1, 1)], &[]);
    let mut character = codec.load_bytes(&raw).unwrap();

    character.set_active_difficulty(DifficultyTier::Hell, 4).unwrap();
    let encoded = codec.encode(&character).unwrap();

    let reloaded = codec.load_bytes(&encoded).unwrap();
    let difficulty = reloaded.difficulty();
    assert!(difficulty.get(DifficultyTier::Hell).is_active());
    assert_eq!(difficulty.get(DifficultyTier::Hell).act(), 4);
    assert!(!difficulty.get(DifficultyTier::Normal).is_active());

    let stored_checksum = u32::from_le_bytes(encoded[12..16].try_into().unwrap());
    let recomputed = mxl_save::character::calculate_checksum(&encoded, 12);
    assert_eq!(stored_checksum, recomputed);
}

#[test]
fn character_round_trips_through_save_and_load_on_disk() {
    let catalog = common::sample_catalog();
    let codec = CharacterCodec::new(catalog.clone());
    let raw = common::build_character_bytes(&[common::build_ring_bytes(7, 20)], &[]);
    let character = codec.load_bytes(&raw).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let save_path = dir.path().join("Hero.d2s");
    let backup_path = dir.path().join("Hero.d2s.bak");

    codec.save(&character, &save_path, None).unwrap();
    assert!(save_path.exists());
    assert!(!backup_path.exists());

    let reloaded = codec.load(&save_path).unwrap();
    assert_eq!(reloaded.items().len(), 1);
    assert_eq!(reloaded.map_id(), character.map_id());

    // A second save with a backup path copies the existing file first.
    codec.save(&reloaded, &save_path, Some(&backup_path)).unwrap();
    assert!(backup_path.exists());
    assert_eq!(std::fs::read(&backup_path).unwrap(), std::fs::read(&save_path).unwrap());
}

#[test]
fn character_checksum_validates_after_save() {
    let catalog = common::sample_catalog();
    let codec = CharacterCodec::new(catalog);
    let raw = common::build_character_bytes(&[common::build_ring_bytes(1, 1)], &[]);
    let character = codec.load_bytes(&raw).unwrap();
    let encoded = codec.encode(&character).unwrap();

    let file_size = u32::from_le_bytes(encoded[8..12].try_into().unwrap());
    assert_eq!(file_size as usize, encoded.len());

    let stored_checksum = u32::from_le_bytes(encoded[12..16].try_into().unwrap());
    let recomputed = mxl_save::character::calculate_checksum(&encoded, 12);
    assert_eq!(stored_checksum, recomputed);
}
