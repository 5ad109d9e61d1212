//! Property-based tests for rule table invariants
//!
//! These tests use proptest to verify:
//! - Kind consistency: edges sharing a source or target share a kind
//! - Aggregate sources have exactly one edge
//! - Index transparency: indexed and scanning tables behave identically
//! - Conservation: aggregate and ratio rules preserve the total value
//! - Literal patterns translate to themselves

use ledger_core::{Base, BaseValues, Polarity};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use transfer_rules::{AttributeKind, BasePattern, TransferAttribute, TransferRules};

const PATTERNS: &[&str] = &[
    "meat",
    "meat*",
    "*at",
    "fish",
    "fish-HAT",
    "*",
    "beef",
    "b*f",
    "tuna-*-kg",
    "pork-NO_HAT",
];

const NAMES: &[&str] = &["meat", "meatAll", "fish", "beef", "boaf", "cat", "tuna", "pork"];

const UNITS: &[&str] = &["#", "kg", "g"];

#[derive(Debug, Clone)]
enum Op {
    Put(usize, usize, TransferAttribute),
    Set(usize, usize, TransferAttribute),
    Remove(usize, usize),
    RemoveFrom(usize),
    RemoveTo(usize),
    Clear,
}

fn pattern(i: usize) -> BasePattern {
    PATTERNS[i].parse().unwrap()
}

/// Strategy for generating attributes
fn attribute_strategy() -> impl Strategy<Value = TransferAttribute> {
    prop_oneof![
        Just(TransferAttribute::Aggregate),
        Just(TransferAttribute::HatAggregate),
        (0i64..=100).prop_map(|w| TransferAttribute::Ratio(Decimal::new(w, 2))),
        (-500i64..=500).prop_map(|f| TransferAttribute::Multiply(Decimal::new(f, 2))),
    ]
}

/// Strategy for generating table mutations
fn op_strategy() -> impl Strategy<Value = Op> {
    let idx = 0..PATTERNS.len();
    prop_oneof![
        4 => (idx.clone(), idx.clone(), attribute_strategy()).prop_map(|(f, t, a)| Op::Put(f, t, a)),
        4 => (idx.clone(), idx.clone(), attribute_strategy()).prop_map(|(f, t, a)| Op::Set(f, t, a)),
        2 => (idx.clone(), idx.clone()).prop_map(|(f, t)| Op::Remove(f, t)),
        1 => idx.clone().prop_map(Op::RemoveFrom),
        1 => idx.prop_map(Op::RemoveTo),
        1 => Just(Op::Clear),
    ]
}

/// Strategy for generating probe bases
fn base_strategy() -> impl Strategy<Value = Base> {
    (
        prop::sample::select(NAMES),
        prop_oneof![Just(Polarity::NoHat), Just(Polarity::Hat)],
        prop::sample::select(UNITS),
    )
        .prop_map(|(name, polarity, unit)| Base::with_keys(name, polarity, unit, "", "").unwrap())
}

/// Apply an op; returns a comparable summary of the outcome
fn apply(rules: &mut TransferRules, op: &Op) -> String {
    match op {
        Op::Put(f, t, a) => format!("{:?}", rules.put(pattern(*f), pattern(*t), *a).is_ok()),
        Op::Set(f, t, a) => match rules.set(pattern(*f), pattern(*t), *a) {
            Ok(previous) => format!("{:?}", previous),
            Err(_) => "err".to_string(),
        },
        Op::Remove(f, t) => format!("{}", rules.remove(&pattern(*f), &pattern(*t))),
        Op::RemoveFrom(f) => format!("{}", rules.remove_from(&pattern(*f))),
        Op::RemoveTo(t) => format!("{}", rules.remove_to(&pattern(*t))),
        Op::Clear => {
            rules.clear();
            "clear".to_string()
        }
    }
}

fn check_invariants(rules: &TransferRules) -> Result<(), TestCaseError> {
    for from in rules.from_patterns() {
        let edges = rules.edges_from(from).unwrap();
        prop_assert!(!edges.is_empty());

        let kinds: BTreeSet<AttributeKind> = edges.values().map(|a| a.kind()).collect();
        prop_assert_eq!(kinds.len(), 1, "mixed kinds leaving {}", from);

        if rules.from_kind(from).unwrap().is_aggregate() {
            prop_assert_eq!(edges.len(), 1, "aggregate fan-out from {}", from);
        }
    }

    let mut backward_edges = 0;
    for to in rules.to_patterns() {
        let sources = rules.inverse_lookup(to);
        backward_edges += sources.len();

        let kinds: BTreeSet<AttributeKind> = sources
            .iter()
            .map(|from| rules.get(from, to).unwrap().kind())
            .collect();
        prop_assert_eq!(kinds.len(), 1, "mixed kinds entering {}", to);
    }
    prop_assert_eq!(backward_edges, rules.len());

    for (from, to, _) in rules.iter() {
        prop_assert!(rules.inverse_lookup(to).contains(from));
        prop_assert!(rules.lookup(from).contains(to));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: Invariants hold after any sequence of mutations, and the
    /// index never changes an outcome
    #[test]
    fn prop_mutations_keep_invariants(
        ops in prop::collection::vec(op_strategy(), 1..40),
        probes in prop::collection::vec(base_strategy(), 1..10),
    ) {
        let mut indexed = TransferRules::new(true);
        let mut scanning = TransferRules::new(false);

        for op in &ops {
            let a = apply(&mut indexed, op);
            let b = apply(&mut scanning, op);
            prop_assert_eq!(a, b, "diverged on {:?}", op);
            check_invariants(&indexed)?;
        }

        prop_assert_eq!(&indexed, &scanning);
        for probe in &probes {
            prop_assert_eq!(indexed.matches_all_from(probe), scanning.matches_all_from(probe));
            prop_assert_eq!(indexed.matches_from(probe), scanning.matches_from(probe));
            prop_assert_eq!(
                indexed.transform(probe).unwrap(),
                scanning.transform(probe).unwrap()
            );
        }
    }

    /// Property: matches_from only returns patterns that match, and finds
    /// one whenever a registered pattern matches
    #[test]
    fn prop_matches_from_is_sound(
        sources in prop::collection::btree_set(0..PATTERNS.len(), 0..PATTERNS.len()),
        probe in base_strategy(),
    ) {
        let mut rules = TransferRules::default();
        for (i, from) in sources.iter().enumerate() {
            let to: BasePattern = format!("target{}", i).parse().unwrap();
            rules.put(pattern(*from), to, TransferAttribute::Aggregate).unwrap();
        }

        let expected: Vec<BasePattern> = sources
            .iter()
            .map(|i| pattern(*i))
            .filter(|p| p.matches(&probe))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let found: Vec<BasePattern> = rules.matches_all_from(&probe).into_iter().cloned().collect();
        prop_assert_eq!(&found, &expected);
        prop_assert_eq!(rules.matches_from(&probe), expected.first());
    }

    /// Property: Aggregate and positive-weight ratio rules conserve value
    #[test]
    fn prop_transfer_conserves_total(
        shapes in prop::collection::vec(
            prop_oneof![
                (0usize..3).prop_map(|target| (true, vec![target as i64])),
                prop::collection::vec(1i64..=100, 1..5).prop_map(|w| (false, w)),
            ],
            1..8,
        ),
        amounts in prop::collection::vec(-1_000_000i64..1_000_000, 1..10),
    ) {
        let mut rules = TransferRules::default();
        for (i, (aggregate, weights)) in shapes.iter().enumerate() {
            let from: BasePattern = format!("src{}", i).parse().unwrap();
            if *aggregate {
                let to: BasePattern = format!("agg{}", weights[0]).parse().unwrap();
                rules.put(from, to, TransferAttribute::Aggregate).unwrap();
            } else {
                for (k, w) in weights.iter().enumerate() {
                    let to: BasePattern = format!("split{}x{}", i, k).parse().unwrap();
                    let attr = TransferAttribute::ratio(Decimal::new(*w, 2)).unwrap();
                    rules.put(from.clone(), to, attr).unwrap();
                }
            }
        }

        let input: BaseValues = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| {
                let name = if i % 4 == 3 { "other".to_string() } else { format!("src{}", i) };
                (Base::new(name).unwrap(), Decimal::new(*amount, 2))
            })
            .collect();

        let output = rules.transfer(&input).unwrap();
        let drift = (output.total() - input.total()).abs();
        prop_assert!(drift < Decimal::new(1, 15), "drift {}", drift);
    }

    /// Property: Multiply scales the total by the sum of factors
    #[test]
    fn prop_multiply_scales_total(
        factors in prop::collection::vec(-300i64..=300, 1..6),
        amount in -1_000_000i64..1_000_000,
    ) {
        let mut rules = TransferRules::default();
        for (k, f) in factors.iter().enumerate() {
            let to: BasePattern = format!("part{}", k).parse().unwrap();
            rules.put("whole".parse().unwrap(), to, TransferAttribute::multiply(Decimal::new(*f, 2))).unwrap();
        }

        let value = Decimal::new(amount, 2);
        let out = rules.transfer_value(&Base::new("whole").unwrap(), value).unwrap().unwrap();
        let factor_sum: Decimal = factors.iter().map(|f| Decimal::new(*f, 2)).sum();
        prop_assert_eq!(out.total(), value * factor_sum);
    }

    /// Property: A wildcard-free pattern translates to itself
    #[test]
    fn prop_literal_pattern_translates_to_itself(
        name in "[a-z]{1,6}",
        unit in "[a-z]{1,3}",
        hat in any::<bool>(),
        probe in base_strategy(),
    ) {
        let polarity = if hat { "HAT" } else { "NO_HAT" };
        let literal = BasePattern::new(&name, polarity, &unit, "2024", "tokyo").unwrap();
        prop_assert!(literal.is_literal());

        let as_base = literal.to_base().unwrap().unwrap();
        prop_assert_eq!(literal.translate(&probe).unwrap(), as_base);
    }

    /// Property: transform is the identity for unmatched bases
    #[test]
    fn prop_unmatched_transform_is_identity(probe in base_strategy()) {
        let mut rules = TransferRules::default();
        rules.put("zzz*".parse().unwrap(), "sink".parse().unwrap(), TransferAttribute::Aggregate).unwrap();

        prop_assert_eq!(rules.transform(&probe).unwrap(), BTreeSet::from([probe.clone()]));
        prop_assert!(rules.transfer_value(&probe, Decimal::ONE).unwrap().is_none());
    }
}
