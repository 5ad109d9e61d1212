//! End-to-end transfer scenarios
//!
//! Covers the classic food ledger examples:
//! - Multiply fan-out (meat → beef/pork/chicken)
//! - Ratio split (fish → tuna/bonito/saury/sardine)
//! - Zero-weight ratio split (veg)
//! - Aggregate roll-up and hat flipping

use ledger_core::{Base, BaseValues, Polarity};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::str::FromStr;
use transfer_rules::{
    AttributeKind, BasePattern, Config, Error, RuleEngine, TransferAttribute, TransferRules,
};

fn p(text: &str) -> BasePattern {
    text.parse().unwrap()
}

fn b(text: &str) -> Base {
    text.parse().unwrap()
}

fn dec(text: &str) -> Decimal {
    Decimal::from_str(text).unwrap()
}

fn values(entries: &[(&str, i64)]) -> BaseValues {
    entries
        .iter()
        .map(|(base, value)| (b(base), Decimal::from(*value)))
        .collect()
}

fn meat_rules(indexed: bool) -> TransferRules {
    let mut rules = TransferRules::new(indexed);
    for (to, factor) in [("beef", "2"), ("pork", "1"), ("chicken", "1")] {
        rules
            .put(p("meat*"), p(to), TransferAttribute::multiply(dec(factor)))
            .unwrap();
    }
    rules
}

fn fish_rules(indexed: bool) -> TransferRules {
    let mut rules = TransferRules::new(indexed);
    for (to, weight) in [("tuna", "0.5"), ("bonito", "0.3"), ("saury", "0.1"), ("sardine", "0.1")] {
        rules
            .put(p("fish*"), p(to), TransferAttribute::ratio(dec(weight)).unwrap())
            .unwrap();
    }
    rules
}

#[test]
fn test_multiply_fan_out() {
    for indexed in [true, false] {
        let rules = meat_rules(indexed);
        let out = rules
            .transfer_value(&b("meatAll"), Decimal::from(20))
            .unwrap()
            .unwrap();

        assert_eq!(out, values(&[("beef", 40), ("pork", 20), ("chicken", 20)]));
    }
}

#[test]
fn test_ratio_split() {
    for indexed in [true, false] {
        let rules = fish_rules(indexed);
        let out = rules
            .transfer_value(&b("fishAll"), Decimal::from(100))
            .unwrap()
            .unwrap();

        assert_eq!(
            out,
            values(&[("tuna", 50), ("bonito", 30), ("saury", 10), ("sardine", 10)])
        );
        assert_eq!(rules.total_value(&p("fish*")).unwrap(), Some(Decimal::ONE));
    }
}

#[test]
fn test_ratio_split_normalizes_partial_weights() {
    let mut rules = TransferRules::default();
    rules
        .put(p("fish"), p("tuna"), TransferAttribute::ratio(dec("0.2")).unwrap())
        .unwrap();
    rules
        .put(p("fish"), p("bonito"), TransferAttribute::ratio(dec("0.2")).unwrap())
        .unwrap();

    let out = rules.transfer_value(&b("fish"), Decimal::from(10)).unwrap().unwrap();
    assert_eq!(out, values(&[("tuna", 5), ("bonito", 5)]));
}

#[test]
fn test_zero_weights_divide_by_zero() {
    let mut rules = TransferRules::default();
    for to in ["carrot", "onion", "potato"] {
        rules
            .put(p("veg*"), p(to), TransferAttribute::ratio(Decimal::ZERO).unwrap())
            .unwrap();
    }

    let result = rules.transfer_value(&b("vegAll"), Decimal::from(5));
    assert!(matches!(result, Err(Error::DivisionByZero(_))));

    let result = rules.transfer(&values(&[("vegAll", 5), ("salt", 1)]));
    assert!(matches!(result, Err(Error::DivisionByZero(_))));
}

#[test]
fn test_transform_is_identity_without_match() {
    let rules = meat_rules(true);
    let base = b("fish-HAT-kg");
    assert_eq!(rules.transform(&base).unwrap(), BTreeSet::from([base]));
}

#[test]
fn test_transform_targets() {
    let rules = meat_rules(true);
    let targets = rules.transform(&b("meatAll-HAT-kg-2024")).unwrap();
    assert_eq!(
        targets,
        BTreeSet::from([
            b("beef-HAT-kg-2024"),
            b("pork-HAT-kg-2024"),
            b("chicken-HAT-kg-2024"),
        ])
    );
}

#[test]
fn test_hat_aggregate_flips_polarity() {
    let mut rules = TransferRules::default();
    rules.put(p("rice"), p("grain"), TransferAttribute::HatAggregate).unwrap();
    rules.put(p("wheat"), p("grain"), TransferAttribute::HatAggregate).unwrap();
    rules.put(p("corn"), p("feed"), TransferAttribute::Aggregate).unwrap();

    let input = values(&[("rice", 3), ("wheat-HAT", 2), ("corn-HAT", 4)]);
    let out = rules.transfer(&input).unwrap();

    assert_eq!(out.get(&b("grain-HAT")), Some(Decimal::from(3)));
    assert_eq!(out.get(&b("grain-NO_HAT")), Some(Decimal::from(2)));
    assert_eq!(out.get(&b("feed-HAT")), Some(Decimal::from(4)));
    assert_eq!(out.total(), input.total());
}

#[test]
fn test_collection_transfer_merges_and_preserves_input() {
    let mut rules = meat_rules(true);
    rules.put_all(&fish_rules(false)).unwrap();

    let input = values(&[("meatAll", 20), ("fishAll", 100), ("beef", 1), ("salt", 3)]);
    let snapshot = input.clone();

    let out = rules.transfer(&input).unwrap();
    assert_eq!(input, snapshot);

    assert_eq!(out.get(&b("beef")), Some(Decimal::from(41)));
    assert_eq!(out.get(&b("tuna")), Some(Decimal::from(50)));
    assert_eq!(out.get(&b("salt")), Some(Decimal::from(3)));
    assert!(!out.contains(&b("meatAll")));
    assert!(!out.contains(&b("fishAll")));
}

#[test]
fn test_set_replaces_aggregate_edge() {
    let mut rules = TransferRules::default();
    rules.put(p("beef"), p("meat"), TransferAttribute::Aggregate).unwrap();
    rules.set(p("beef"), p("protein"), TransferAttribute::Aggregate).unwrap();

    assert_eq!(rules.len(), 1);
    assert!(rules.contains(&p("beef"), &p("protein")));
    assert!(!rules.contains(&p("beef"), &p("meat")));
    assert_eq!(rules.from_kind(&p("beef")), Some(AttributeKind::Aggregate));
}

#[test]
fn test_literal_target_polarity_wins() {
    let mut rules = TransferRules::default();
    rules.put(p("rice"), p("grain-HAT"), TransferAttribute::Aggregate).unwrap();

    let targets = rules.transform(&b("rice-NO_HAT")).unwrap();
    assert_eq!(targets, BTreeSet::from([b("grain-HAT")]));
    assert!(targets.iter().all(|base| base.polarity() == Polarity::Hat));
}

#[test]
fn test_hat_aggregate_literal_target_polarity_wins_over_flip() {
    let mut rules = TransferRules::default();
    rules.put(p("rice"), p("grain-HAT"), TransferAttribute::HatAggregate).unwrap();
    rules.put(p("corn"), p("feed"), TransferAttribute::HatAggregate).unwrap();

    // literal target polarity: both source polarities land on HAT
    assert_eq!(
        rules.transform(&b("rice-NO_HAT-kg")).unwrap(),
        BTreeSet::from([b("grain-HAT-kg")])
    );
    assert_eq!(
        rules.transform(&b("rice-HAT-kg")).unwrap(),
        BTreeSet::from([b("grain-HAT-kg")])
    );

    // wildcard target polarity: the source polarity is flipped
    assert_eq!(
        rules.transform(&b("corn-HAT-kg")).unwrap(),
        BTreeSet::from([b("feed-NO_HAT-kg")])
    );

    let input = values(&[("rice", 3), ("rice-HAT", 2)]);
    let out = rules.transfer(&input).unwrap();
    assert_eq!(out, values(&[("grain-HAT", 5)]));
}

#[test]
fn test_engine_round_trip() {
    let engine = RuleEngine::with_rules(Config::default(), Some(&meat_rules(false))).unwrap();
    let out = engine.transfer(&values(&[("meatAll", 20)])).unwrap();
    assert_eq!(out.total(), Decimal::from(80));
    assert!(engine.snapshot().is_indexed());
}
