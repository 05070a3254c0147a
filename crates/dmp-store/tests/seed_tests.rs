//! Seeding from legacy and current seed files

use dmp_model::ProductInput;
use dmp_store::{load_seed_file, seed, SeedMode, SeedReport};
use dmp_test_utils::{all_backends, init_test_logging, legacy_seed_json};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write_seed(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("seed.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&legacy_seed_json()).unwrap()).unwrap();
    path
}

#[test]
fn test_seed_file_normalizes_legacy_fields() {
    let dir = TempDir::new().unwrap();
    let inputs = load_seed_file(write_seed(&dir)).unwrap();

    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[0].attributes.sub_domain, "Marketing");
    assert_eq!(inputs[0].tags, vec!["customer".to_string(), "crm".to_string()]);
    assert_eq!(inputs[1].tags, vec!["finance".to_string(), "ledger".to_string()]);
}

#[test]
fn test_seed_if_empty_only_seeds_once() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let inputs = load_seed_file(write_seed(&dir)).unwrap();

    for fixture in all_backends() {
        let report = seed(&fixture.store, inputs.clone(), SeedMode::IfEmpty).unwrap();
        assert_eq!(
            report,
            SeedReport {
                inserted: 2,
                skipped_existing: 0
            }
        );
        let ids: Vec<_> = fixture
            .store
            .list_products()
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["DP0001".to_string(), "DP0002".to_string()]);

        let report = seed(&fixture.store, inputs.clone(), SeedMode::IfEmpty).unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.skipped_existing, 2);
    }
}

#[test]
fn test_seed_replace_overwrites() {
    for fixture in all_backends() {
        fixture
            .store
            .replace_all(vec![ProductInput::named("Old")])
            .unwrap();
        let report = seed(
            &fixture.store,
            vec![ProductInput::named("New A"), ProductInput::named("New B")],
            SeedMode::Replace,
        )
        .unwrap();
        assert_eq!(report.inserted, 2);

        let names: Vec<_> = fixture
            .store
            .list_products()
            .unwrap()
            .into_iter()
            .map(|p| p.attributes.name)
            .collect();
        assert_eq!(names, vec!["New A".to_string(), "New B".to_string()]);
    }
}

#[test]
fn test_missing_seed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = load_seed_file(dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("absent.json"));
}
