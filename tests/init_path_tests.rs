//! Store initialization with relative paths.
//!
//! Changes the working directory, so it lives in its own test binary.

use hashsoak::store;
use std::env;
use std::path::Path;
use tempfile::tempdir;

#[test]
fn test_uri_like_relative_name_is_a_plain_file() {
    let dir = tempdir().unwrap();
    let previous = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();

    let first = store::initialize("file:soak.sqlite").map(|handle| {
        handle.save("k", "k.temp").unwrap();
    });
    let second = store::initialize("file:soak.sqlite").map(|handle| handle.count().unwrap());
    let literal_exists = Path::new("file:soak.sqlite").exists();
    let stripped_exists = Path::new("soak.sqlite").exists();

    env::set_current_dir(previous).unwrap();

    assert!(first.is_ok(), "first init failed: {:?}", first.err());
    assert_eq!(second.unwrap(), 1);
    assert!(literal_exists);
    assert!(!stripped_exists);
}
