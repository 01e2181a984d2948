use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use gearins::config::InsuranceConfig;
use gearins::dispatcher::{DispatchReport, InsuranceDispatcher, RaidExit};
use gearins::mail::{Mail, Outbox};
use gearins::premium::{PremiumCalculator, PriceTable};
use gearins::profile::PlayerProfile;
use gearins::scheduler::{Clock, FixedClock, SystemClock};
use gearins::types::{Timestamp, TraderId};

/// One raid exit to replay through the insurance pipeline.
#[derive(Deserialize)]
struct Scenario {
    profile: PlayerProfile,
    exit: RaidExit,
    #[serde(default)]
    prices: PriceTable,
    /// Traders that recovered none of the player's gear.
    #[serde(default)]
    lost_traders: Vec<TraderId>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut scenario_path: Option<String> = None;
    let mut config_path: Option<String> = None;
    let mut seed: u64 = 42;
    let mut now_override: Option<u64> = None;
    let mut output_path = "mail.ndjson".to_string();
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => scenario_path = Some(arg_value(&args, &mut i)?),
            "--config" => config_path = Some(arg_value(&args, &mut i)?),
            "--seed" => seed = arg_value(&args, &mut i)?.parse().context("--seed requires a u64")?,
            "--now" => {
                let secs = arg_value(&args, &mut i)?;
                now_override = Some(secs.parse().context("--now requires unix seconds")?);
            }
            "--output" => output_path = arg_value(&args, &mut i)?,
            "--quiet" => quiet = true,
            other => tracing::warn!("ignoring unknown argument {other}"),
        }
        i += 1;
    }

    let Some(scenario_path) = scenario_path else {
        bail!("usage: gearins --scenario <file.json> [--config <file.json>] [--seed N] [--now SECS] [--output mail.ndjson] [--quiet]");
    };

    let config = match config_path {
        Some(path) => InsuranceConfig::load(&path)?,
        None => InsuranceConfig::canonical(),
    };
    let scenario = load_scenario(Path::new(&scenario_path))?;
    let mut profile = scenario.profile;

    if !quiet && !scenario.prices.0.is_empty() {
        print_quote(&config, &scenario.prices, &profile);
    }

    let now = now_override.map(Timestamp).unwrap_or_else(|| SystemClock.now());
    let mut dispatcher = InsuranceDispatcher::new(config, Outbox::new(), FixedClock(now), seed);
    let report =
        replay(&mut dispatcher, &mut profile, &scenario.exit, &scenario.lost_traders);

    write_mail(&dispatcher.mail().sent, &output_path)?;

    if !quiet {
        println!("Mail sent: {} → {output_path}", dispatcher.mail().sent.len());
        println!("\n=== Scheduled returns ===");
        println!("{:>12} | {:>12} | {:>5}", "Trader", "Deliver at", "Items");
        println!("{}", "-".repeat(36));
        for s in &report.scheduled {
            println!("{:>12} | {:>12} | {:>5}", s.trader_id, s.scheduled_time.0, s.item_count);
        }
        if !report.issues.is_empty() {
            println!("\n  {} issue(s):", report.issues.len());
            for issue in &report.issues {
                println!("    {issue}");
            }
        }
        println!("\n=== Pending returns ===");
        println!("{}", serde_json::to_string_pretty(&profile.insurance_pending)?);
    }

    Ok(())
}

/// Run the raid exit, then tell the player about traders that recovered
/// nothing. Lost-message failures join the raid exit's issues.
fn replay<C: Clock>(
    dispatcher: &mut InsuranceDispatcher<Outbox, C>,
    profile: &mut PlayerProfile,
    exit: &RaidExit,
    lost_traders: &[TraderId],
) -> DispatchReport {
    let mut report = dispatcher.on_raid_exit(profile, exit);
    for trader in lost_traders {
        if let Err(gap) =
            dispatcher.send_lost_insurance_message(&profile.id, trader, &exit.location_name)
        {
            report.issues.push(gap.into());
        }
    }
    report
}

fn arg_value(args: &[String], i: &mut usize) -> anyhow::Result<String> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i).cloned().with_context(|| format!("{flag} requires a value"))
}

fn load_scenario(path: &Path) -> anyhow::Result<Scenario> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse scenario {}", path.display()))
}

fn write_mail(mail: &[Mail], path: &str) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {path}"))?;
    let mut writer = BufWriter::new(file);
    for m in mail {
        serde_json::to_writer(&mut writer, m)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

fn print_quote(config: &InsuranceConfig, prices: &PriceTable, profile: &PlayerProfile) {
    let mut traders: Vec<TraderId> = config.traders.keys().cloned().collect();
    traders.sort();
    let gear = profile.inventory.carried_gear();
    let quote = PremiumCalculator::new(config, prices).quote(profile, &gear, &traders);

    println!("=== Insurance quote (carried gear) ===");
    for (trader, per_item) in &quote {
        let total: u64 = per_item.values().sum();
        println!("  {trader:>12}: {total:>10} for {} item(s)", per_item.len());
    }
    println!();
}
