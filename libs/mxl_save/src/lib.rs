//! # mxl_save
//!
//! A Rust library for reading, mutating, and writing Median XL character
//! save files: the item record codec, the character container, the static
//! data catalog, and the encrypted table envelope the catalog is shipped in.
//!
//! ## Example
//!
//! ```no_run
//! use mxl_save::{CatalogPaths, CharacterCodec, DataCatalog};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(DataCatalog::load(
//!     "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY",
//!     &CatalogPaths {
//!         base_items: Path::new("data/base_items.bin").to_path_buf(),
//!         item_types: Path::new("data/item_types.bin").to_path_buf(),
//!         item_mods: Path::new("data/item_mods.bin").to_path_buf(),
//!         item_stats: Path::new("data/item_stats.bin").to_path_buf(),
//!         skills: Path::new("data/skills.bin").to_path_buf(),
//!     },
//! ).unwrap());
//!
//! let codec = CharacterCodec::new(catalog);
//! let character = codec.load(Path::new("MyHero.d2s")).unwrap();
//! println!("items: {}", character.items().len());
//! ```

// Allow range loops for bit-cursor reads - clippy's suggestion reads worse here.
#![allow(clippy::needless_range_loop)]
// Allow many arguments for data-heavy functions.
#![allow(clippy::too_many_arguments)]

pub mod bitcursor;
pub mod catalog;
pub mod character;
pub mod constants;
pub mod error;
pub mod item;
pub mod modifier;
pub mod packed_table;
pub mod rules;

pub use bitcursor::BitCursor;
pub use catalog::{BaseItem, BaseModifier, BaseModifierFactor, BaseStat, CatalogPaths, DataCatalog, ItemType, Skill};
pub use character::{Character, CharacterCodec, CharacterDifficulty, DifficultyProgress};
pub use error::{Error, Result};
pub use item::{Item, ModEntry};
pub use modifier::{ModProperty, Modifier};
