//! Tests for the storage engine contract
//!
//! These tests verify:
//! - Basic set/get/del operations and overwrite semantics
//! - TTL behavior at write time and read time (lazy expiry)
//! - EXPIRE re-timing, clearing, and rejection rules
//! - Input validation and capacity enforcement
//! - Concurrent access patterns

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mapkv::store::{FILE_SIZE, HEADER_SIZE};
use mapkv::{Engine, KvError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn open_temp_engine() -> (TempDir, Engine) {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(&dir.path().join("store.db")).unwrap();
    (dir, engine)
}

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_set_get() {
    let (_dir, engine) = open_temp_engine();

    engine.set("foo", "bar", 0).unwrap();
    assert_eq!(engine.get("foo").unwrap(), Some("bar".to_string()));
}

#[test]
fn test_multiple_keys() {
    let (_dir, engine) = open_temp_engine();

    engine.set("a", "1", 0).unwrap();
    engine.set("b", "2", 0).unwrap();
    engine.set("c", "3", 0).unwrap();

    assert_eq!(engine.get("a").unwrap(), Some("1".to_string()));
    assert_eq!(engine.get("b").unwrap(), Some("2".to_string()));
    assert_eq!(engine.get("c").unwrap(), Some("3".to_string()));
}

#[test]
fn test_overwrite_last_write_wins() {
    let (_dir, engine) = open_temp_engine();

    engine.set("key", "value1", 0).unwrap();
    engine.set("key", "value2", 0).unwrap();

    assert_eq!(engine.get("key").unwrap(), Some("value2".to_string()));
}

#[test]
fn test_get_missing_key() {
    let (_dir, engine) = open_temp_engine();

    assert_eq!(engine.get("nope").unwrap(), None);
}

#[test]
fn test_empty_value_is_valid() {
    let (_dir, engine) = open_temp_engine();

    engine.set("k", "", 0).unwrap();
    assert_eq!(engine.get("k").unwrap(), Some(String::new()));
}

#[test]
fn test_delete() {
    let (_dir, engine) = open_temp_engine();

    engine.set("delkey", "value", 0).unwrap();
    assert!(engine.del("delkey").unwrap());
    assert_eq!(engine.get("delkey").unwrap(), None);
    assert!(!engine.del("delkey").unwrap());
}

#[test]
fn test_delete_missing_key() {
    let (_dir, engine) = open_temp_engine();

    assert!(!engine.del("nope").unwrap());
}

#[test]
fn test_set_after_delete() {
    let (_dir, engine) = open_temp_engine();

    engine.set("k", "old", 0).unwrap();
    engine.del("k").unwrap();
    engine.set("k", "new", 0).unwrap();

    assert_eq!(engine.get("k").unwrap(), Some("new".to_string()));
}

#[test]
fn test_large_key_and_value() {
    let (_dir, engine) = open_temp_engine();

    let big_key = "k".repeat(1024);
    let big_val = "v".repeat(1024 * 10);
    engine.set(&big_key, &big_val, 0).unwrap();

    assert_eq!(engine.get(&big_key).unwrap(), Some(big_val));
}

#[test]
fn test_unicode_key_and_value() {
    let (_dir, engine) = open_temp_engine();

    engine.set("ключ", "значение", 0).unwrap();
    assert_eq!(engine.get("ключ").unwrap(), Some("значение".to_string()));

    engine.set("日本語", "🦀", 0).unwrap();
    assert_eq!(engine.get("日本語").unwrap(), Some("🦀".to_string()));
}

// =============================================================================
// TTL Semantics
// =============================================================================

#[test]
fn test_lazy_expiry() {
    let (_dir, engine) = open_temp_engine();

    engine.set("e", "x", 100).unwrap();
    assert_eq!(engine.get("e").unwrap(), Some("x".to_string()));

    thread::sleep(Duration::from_millis(150));
    assert_eq!(engine.get("e").unwrap(), None);
    // Evicted, not merely hidden
    assert!(!engine.del("e").unwrap());
}

#[test]
fn test_zero_ttl_never_expires() {
    let (_dir, engine) = open_temp_engine();

    engine.set("k", "v", 0).unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(engine.get("k").unwrap(), Some("v".to_string()));
}

#[test]
fn test_negative_ttl_on_set_means_no_expiry() {
    let (_dir, engine) = open_temp_engine();

    engine.set("negttl", "val", -1000).unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(engine.get("negttl").unwrap(), Some("val".to_string()));
}

#[test]
fn test_overwrite_replaces_ttl() {
    let (_dir, engine) = open_temp_engine();

    engine.set("k", "short-lived", 50).unwrap();
    engine.set("k", "permanent", 0).unwrap();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(engine.get("k").unwrap(), Some("permanent".to_string()));
}

// =============================================================================
// EXPIRE
// =============================================================================

#[test]
fn test_expire_sets_ttl() {
    let (_dir, engine) = open_temp_engine();

    engine.set("k", "v", 0).unwrap();
    assert!(engine.expire("k", 100).unwrap());

    thread::sleep(Duration::from_millis(150));
    assert_eq!(engine.get("k").unwrap(), None);
}

#[test]
fn test_expire_clears_ttl() {
    let (_dir, engine) = open_temp_engine();

    engine.set("k", "v", 50).unwrap();
    assert!(engine.expire("k", 0).unwrap());

    thread::sleep(Duration::from_millis(100));
    assert_eq!(engine.get("k").unwrap(), Some("v".to_string()));
}

#[test]
fn test_expire_keeps_value() {
    let (_dir, engine) = open_temp_engine();

    engine.set("k", "original", 0).unwrap();
    assert!(engine.expire("k", 60_000).unwrap());

    assert_eq!(engine.get("k").unwrap(), Some("original".to_string()));
}

#[test]
fn test_expire_missing_key_returns_false() {
    let (_dir, engine) = open_temp_engine();

    assert!(!engine.expire("ghost", 100).unwrap());
    assert!(!engine.expire("ghost", 0).unwrap());
}

#[test]
fn test_expire_negative_ttl_rejected() {
    let (_dir, engine) = open_temp_engine();

    engine.set("k", "v", 0).unwrap();
    assert!(matches!(engine.expire("k", -1), Err(KvError::NegativeTtl(-1))));
    // Rejected regardless of key state
    assert!(matches!(engine.expire("ghost", -5), Err(KvError::NegativeTtl(-5))));
}

// =============================================================================
// Input Validation
// =============================================================================

#[test]
fn test_blank_keys_rejected_everywhere() {
    let (_dir, engine) = open_temp_engine();

    for key in ["", " ", "   ", "\t", "\n", " \t\n "] {
        assert!(matches!(engine.set(key, "v", 0), Err(KvError::BlankKey)));
        assert!(matches!(engine.get(key), Err(KvError::BlankKey)));
        assert!(matches!(engine.del(key), Err(KvError::BlankKey)));
        assert!(matches!(engine.expire(key, 100), Err(KvError::BlankKey)));
    }
}

#[test]
fn test_key_with_inner_whitespace_is_valid() {
    let (_dir, engine) = open_temp_engine();

    engine.set("a key", "v", 0).unwrap();
    assert_eq!(engine.get("a key").unwrap(), Some("v".to_string()));
}

// =============================================================================
// Capacity
// =============================================================================

#[test]
fn test_oversized_set_fails_and_leaves_engine_usable() {
    let (_dir, engine) = open_temp_engine();

    let big = "x".repeat(FILE_SIZE);
    assert!(matches!(
        engine.set("big", &big, 0),
        Err(KvError::StoreFull { .. })
    ));

    // The failed write changed nothing
    assert_eq!(engine.get("big").unwrap(), None);
    engine.set("small", "v", 0).unwrap();
    assert_eq!(engine.get("small").unwrap(), Some("v".to_string()));
}

#[test]
fn test_exact_fit_then_full() {
    let (_dir, engine) = open_temp_engine();

    // One record filling the region exactly
    let value = "x".repeat(FILE_SIZE - HEADER_SIZE - 3);
    engine.set("big", &value, 0).unwrap();
    assert_eq!(engine.get("big").unwrap(), Some(value));

    // Nothing else fits, not even the smallest record
    assert!(matches!(
        engine.set("a", "", 0),
        Err(KvError::StoreFull { .. })
    ));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_disjoint_keys_no_lost_updates() {
    let (_dir, engine) = open_temp_engine();
    let engine = Arc::new(engine);

    let threads: Vec<_> = (0..10)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..100 {
                    let key = format!("t{}-k{}", t, i);
                    let value = format!("t{}-v{}", t, i);
                    engine.set(&key, &value, 0).unwrap();
                }
            })
        })
        .collect();
    for handle in threads {
        handle.join().unwrap();
    }

    for t in 0..10 {
        for i in 0..100 {
            let key = format!("t{}-k{}", t, i);
            let expected = format!("t{}-v{}", t, i);
            assert_eq!(engine.get(&key).unwrap(), Some(expected));
        }
    }
}

#[test]
fn test_per_thread_serial_consistency() {
    let (_dir, engine) = open_temp_engine();
    let engine = Arc::new(engine);

    let threads: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let key = format!("own-{}", t);
                for i in 0..200 {
                    let value = format!("{}", i);
                    engine.set(&key, &value, 0).unwrap();
                    assert_eq!(engine.get(&key).unwrap(), Some(value));
                }
            })
        })
        .collect();
    for handle in threads {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_expire_distinct_keys() {
    let (_dir, engine) = open_temp_engine();
    let engine = Arc::new(engine);

    for i in 0..8 {
        engine.set(&format!("exp-{}", i), "v", 0).unwrap();
    }

    let threads: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.expire(&format!("exp-{}", i), 150).unwrap())
        })
        .collect();
    for handle in threads {
        assert!(handle.join().unwrap());
    }

    thread::sleep(Duration::from_millis(250));
    for i in 0..8 {
        assert_eq!(engine.get(&format!("exp-{}", i)).unwrap(), None);
    }
}
