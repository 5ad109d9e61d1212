//! Rule engine demo binary
//!
//! Registers a small food classification table, transfers a sample ledger
//! and prints the result plus the collected metrics.
//!
//! Configuration is read from the file named by `TRANSFER_RULES_CONFIG`,
//! or from `TRANSFER_RULES_*` environment variables.

use anyhow::Context;
use ledger_core::{Base, BaseValues};
use prometheus::{Encoder, TextEncoder};
use rust_decimal::Decimal;
use transfer_rules::{Config, RuleEngine, TransferAttribute};

fn load_config() -> anyhow::Result<Config> {
    match std::env::var("TRANSFER_RULES_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path)),
        Err(_) => Ok(Config::from_env()?),
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = load_config()?;
    let engine = RuleEngine::new(config)?;

    // meat* is scaled, fish is split by weight, beef/pork roll up
    for (to, factor) in [("beef", 2), ("pork", 1), ("chicken", 1)] {
        engine.put(
            "meat*".parse()?,
            to.parse()?,
            TransferAttribute::multiply(Decimal::from(factor)),
        )?;
    }
    for (to, weight) in [("tuna", "0.5"), ("bonito", "0.3"), ("saury", "0.1"), ("sardine", "0.1")] {
        engine.put(
            "fish".parse()?,
            to.parse()?,
            TransferAttribute::ratio(weight.parse()?)?,
        )?;
    }
    engine.put("rice".parse()?, "grain".parse()?, TransferAttribute::HatAggregate)?;

    let ledger: BaseValues = vec![
        (Base::new("meatAll")?, Decimal::from(20)),
        (Base::new("fish")?, Decimal::from(100)),
        (Base::new("rice")?, Decimal::from(7)),
        (Base::new("salt")?, Decimal::from(3)),
    ]
    .into_iter()
    .collect();

    let result = engine.transfer(&ledger)?;
    for (base, value) in result.iter() {
        println!("{:<32} {}", base, value);
    }

    if let Some(metrics) = engine.metrics() {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metrics.registry().gather(), &mut buffer)
            .context("encoding metrics")?;
        println!("\n{}", String::from_utf8(buffer)?);
    }

    tracing::info!("Demo finished");
    Ok(())
}
