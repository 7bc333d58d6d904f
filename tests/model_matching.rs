//! Integration tests for tiered model matching

mod common;

use common::descriptor;
use csl_multiplayer::{MatchTier, ModelRegistry, TypeGroups};

fn registry() -> ModelRegistry {
    let mut groups = TypeGroups::new();
    groups.add_group(&["B737", "B738", "B739"]);
    groups.add_group(&["A319", "A320", "A321"]);

    let mut registry = ModelRegistry::with_groups(groups);
    let pkg = registry.add_package("Test", "CSL/Test");
    registry.add_plane(pkg, descriptor("b738_swa_heart", "B738", "SWA", "HEART"));
    registry.add_plane(pkg, descriptor("b738_swa", "B738", "SWA", ""));
    registry.add_plane(pkg, descriptor("b737_dal", "B737", "DAL", ""));
    registry.add_plane(pkg, descriptor("a320", "A320", "", ""));
    registry
}

#[test]
fn test_exact_match_is_best() {
    let registry = registry();
    let result = registry.match_plane("B738", "SWA", "HEART", None);
    assert_eq!(result.quality, MatchTier::IcaoAirlineLivery.quality());
    let model = registry.model(result.model.unwrap()).unwrap();
    assert_eq!(model.object_name, "b738_swa_heart");
}

#[test]
fn test_unknown_livery_falls_to_airline() {
    let registry = registry();
    let result = registry.match_plane("B738", "SWA", "GOLD", None);
    assert_eq!(result.quality, MatchTier::IcaoAirline.quality());
}

#[test]
fn test_group_airline_beats_plain_icao() {
    let registry = registry();
    // No B739 at all, but a B737 in the same group flies for DAL
    let result = registry.match_plane("B739", "DAL", "", None);
    assert_eq!(result.quality, MatchTier::GroupAirline.quality());
    let model = registry.model(result.model.unwrap()).unwrap();
    assert_eq!(model.icao, "B737");
}

#[test]
fn test_icao_only() {
    let registry = registry();
    let result = registry.match_plane("A320", "BAW", "", None);
    assert_eq!(result.quality, MatchTier::Icao.quality());
}

#[test]
fn test_group_only() {
    let registry = registry();
    let result = registry.match_plane("A321", "BAW", "", None);
    assert_eq!(result.quality, MatchTier::Group.quality());
}

#[test]
fn test_no_match_and_default_fallback() {
    let registry = registry();
    let miss = registry.match_plane("C172", "", "", None);
    assert_eq!(miss.quality, -1);
    assert!(miss.model.is_none());

    let fallback = registry.match_plane("C172", "", "", Some("A320"));
    assert_eq!(fallback.quality, -1);
    let model = registry.model(fallback.model.unwrap()).unwrap();
    assert_eq!(model.icao, "A320");
}

#[test]
fn test_advisory_queries() {
    let registry = registry();
    assert!(registry.is_icao_valid("B739"));
    assert!(!registry.is_icao_valid("C172"));
    assert_eq!(
        registry.model_match_quality("B738", "SWA", ""),
        MatchTier::IcaoAirline.quality()
    );
    assert_eq!(registry.model_count(), 4);
}

#[test]
fn test_lookup_by_name_ignores_case() {
    let registry = registry();
    let found = registry.model_by_name("TEST B737_DAL").unwrap();
    assert_eq!(registry.model(found).unwrap().airline, "DAL");
    assert!(registry.model_by_name("nothing").is_none());
}

#[test]
fn test_earlier_package_wins_a_tie() {
    let mut registry = ModelRegistry::new();
    let first = registry.add_package("First", "CSL/First");
    let second = registry.add_package("Second", "CSL/Second");
    registry.add_plane(second, descriptor("late", "C172", "", ""));
    registry.add_plane(first, descriptor("early", "C172", "", ""));

    let result = registry.match_plane("C172", "", "", None);
    assert_eq!(result.model.unwrap().package, first);
}
