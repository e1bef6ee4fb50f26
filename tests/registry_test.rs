mod common;

use std::io::Write;
use std::path::PathBuf;

use common::REGISTRY_JSON;
use ecr_core::config::registry::ReferenceRegistry;
use ecr_core::ports::{BankCredentials, ReferenceData};

fn write_registry(file: &mut tempfile::NamedTempFile, contents: &str) {
    let handle = file.as_file_mut();
    handle.set_len(0).unwrap();
    std::io::Seek::rewind(handle).unwrap();
    handle.write_all(contents.as_bytes()).unwrap();
    handle.flush().unwrap();
}

#[test]
fn test_shipped_annexures_load() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/annexures.json");
    let registry = ReferenceRegistry::load(&path).unwrap();

    assert_eq!(registry.banks().len(), 4);
    assert!(!registry.default_lin().is_empty());

    let suhani = registry.establishment("APHYD1234567001").unwrap();
    assert_eq!(suhani.establishment_name, "Suhani Pvt. Ltd.");
    assert!(registry.establishment("NOPE0000000000").is_none());

    let sbi = registry.bank("State Bank of India").unwrap();
    assert!(sbi.accepts(&BankCredentials {
        username: sbi.user_id.clone(),
        password: sbi.password.clone(),
    }));
}

#[test]
fn test_reload_picks_up_edits() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write_registry(&mut file, REGISTRY_JSON);
    let registry = ReferenceRegistry::load(file.path()).unwrap();
    assert!(registry.bank("Canara Bank").is_none());

    let edited = REGISTRY_JSON.replace("State Bank of India", "Canara Bank");
    write_registry(&mut file, &edited);
    registry.reload().unwrap();

    assert!(registry.bank("Canara Bank").is_some());
    assert!(registry.bank("State Bank of India").is_none());
}

#[test]
fn test_failed_reload_keeps_previous_data() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write_registry(&mut file, REGISTRY_JSON);
    let registry = ReferenceRegistry::load(file.path()).unwrap();

    write_registry(&mut file, "{ not json");
    assert!(registry.reload().is_err());
    assert!(registry.bank("Axis Bank").is_some());
    assert_eq!(registry.default_lin(), "1234567890");

    // Duplicate bank names are refused as well.
    let duplicated = REGISTRY_JSON.replace("State Bank of India", "Axis Bank");
    write_registry(&mut file, &duplicated);
    assert!(registry.reload().is_err());
    assert_eq!(registry.banks().len(), 2);
}

#[test]
fn test_missing_registry_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ReferenceRegistry::load(dir.path().join("absent.json")).is_err());
}
