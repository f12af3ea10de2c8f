//! Unit tests for resource_table.rs

use slotmap::Key;

use crate::error::Error;
use crate::resource_table::{invalid_id, ResourceTable, SurfaceId, TextureId};

fn table() -> ResourceTable<TextureId, &'static str> {
    ResourceTable::new("texture")
}

// ============================================================================
// BASIC OPERATIONS
// ============================================================================

#[test]
fn test_new_table_is_empty() {
    let t = table();
    assert!(t.is_empty());
    assert_eq!(t.len(), 0);
    assert_eq!(t.kind(), "texture");
}

#[test]
fn test_insert_and_get() {
    let mut t = table();
    let a = t.insert("albedo");
    let b = t.insert("normal");

    assert_ne!(a, b);
    assert_eq!(t.len(), 2);
    assert_eq!(*t.get(a).unwrap(), "albedo");
    assert_eq!(*t.get(b).unwrap(), "normal");
    assert!(t.contains(a));
}

#[test]
fn test_get_mut_modifies_entry() {
    let mut t = table();
    let a = t.insert("albedo");
    *t.get_mut(a).unwrap() = "roughness";
    assert_eq!(*t.get(a).unwrap(), "roughness");
}

#[test]
fn test_remove_returns_value() {
    let mut t = table();
    let a = t.insert("albedo");
    assert_eq!(t.remove(a).unwrap(), "albedo");
    assert!(t.is_empty());
    assert!(!t.contains(a));
}

// ============================================================================
// STALE AND INVALID IDS
// ============================================================================

#[test]
fn test_removed_id_is_lookup_failure() {
    let mut t = table();
    let a = t.insert("albedo");
    t.remove(a).unwrap();

    assert!(matches!(t.get(a), Err(Error::LookupFailure(_))));
    assert!(matches!(t.get_mut(a), Err(Error::LookupFailure(_))));
    assert!(matches!(t.remove(a), Err(Error::LookupFailure(_))));
}

#[test]
fn test_invalid_id_never_resolves() {
    let mut t = table();
    t.insert("albedo");

    let invalid: TextureId = invalid_id();
    assert!(invalid.is_null());
    assert!(!t.contains(invalid));
    assert!(matches!(t.get(invalid), Err(Error::LookupFailure(_))));
}

#[test]
fn test_default_key_is_invalid() {
    let id = SurfaceId::default();
    assert!(id.is_null());
    assert_eq!(id, invalid_id::<SurfaceId>());
}

#[test]
fn test_reused_slot_does_not_alias_old_id() {
    let mut t = table();
    let old = t.insert("first");
    t.remove(old).unwrap();
    let new = t.insert("second");

    assert_ne!(old, new);
    assert!(matches!(t.get(old), Err(Error::LookupFailure(_))));
    assert_eq!(*t.get(new).unwrap(), "second");
}

#[test]
fn test_remove_n_insert_n_keeps_ids_unique() {
    let mut t = ResourceTable::<TextureId, usize>::new("texture");
    let first: Vec<TextureId> = (0..16).map(|i| t.insert(i)).collect();
    for id in &first[..8] {
        t.remove(*id).unwrap();
    }
    let second: Vec<TextureId> = (100..108).map(|i| t.insert(i)).collect();

    let mut live = t.ids();
    live.sort();
    live.dedup();
    assert_eq!(live.len(), 16);

    for id in &first[..8] {
        assert!(!second.contains(id));
        assert!(!t.contains(*id));
    }
    for id in &second {
        assert!(*t.get(*id).unwrap() >= 100);
    }
}

// ============================================================================
// ITERATION AND DRAIN
// ============================================================================

#[test]
fn test_iter_finds_by_value() {
    let mut t = table();
    t.insert("albedo");
    let normal = t.insert("normal");

    let found = t.iter().find(|(_, v)| **v == "normal").map(|(id, _)| id);
    assert_eq!(found, Some(normal));
}

#[test]
fn test_drain_empties_table() {
    let mut t = table();
    let a = t.insert("albedo");
    t.insert("normal");

    let drained = t.drain();
    assert_eq!(drained.len(), 2);
    assert!(t.is_empty());
    assert!(!t.contains(a));
}
