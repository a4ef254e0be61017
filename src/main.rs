//! Benchmark harness for the matching engine.
//!
//! `generate` writes a synthetic order-flow CSV, `run` replays one through
//! a fully configured book and reports throughput and per-order latency.
//! With no subcommand, a 50,000-order file is generated and replayed.

use clap::{Parser, Subcommand};
use matchbook_rs::market_data::{MarketDataGenerator, OrderRecord, CSV_HEADER};
use matchbook_rs::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "matchbook")]
#[command(version)]
#[command(about = "Single-instrument matching engine benchmark harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a synthetic order-flow CSV.
    Generate {
        /// Output file path.
        file: PathBuf,
        /// Number of orders to generate.
        count: u64,
    },
    /// Replay an order-flow CSV through the engine and report latency.
    Run {
        /// Input file path.
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Generate { file, count }) => {
            generate_test_data(&file, count)?;
            info!("market data generated");
        }
        Some(Command::Run { file }) => {
            run_benchmark(&file)?;
        }
        None => {
            let demo_file = PathBuf::from("market_orders.csv");
            generate_test_data(&demo_file, 50_000)?;
            run_benchmark(&demo_file)?;
        }
    }
    Ok(())
}

/// Demo limits comparable to an institutional desk, applied to the 100
/// synthetic traders the generator draws from.
fn setup_demo_risk_limits(book: &mut OrderBook) -> Result<(), InvalidRiskLimits> {
    let default_limits = RiskLimits {
        max_position: 100_000,
        max_order_value: 50_000_000,
        max_order_qty: 10_000,
        daily_loss_limit: 1_000_000,
        max_price_deviation: 0.10,
        max_orders_per_sec: 1_000,
        max_daily_volume: 1_000_000,
    };
    for trader_id in 1..=100 {
        book.risk_mut().set_trader_limits(trader_id, default_limits)?;
    }
    book.risk_mut().circuit_breaker_mut().set_limits(100_000, 0.20);
    // Seed a reference price so early orders clear the fat-finger check.
    book.risk_mut().mark_to_market(100_000);
    Ok(())
}

fn generate_test_data(path: &Path, count: u64) -> std::io::Result<()> {
    let mut generator = MarketDataGenerator::new();
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{CSV_HEADER}")?;

    for order_id in 1..=count {
        // Refresh the simulated market every 50 orders.
        if order_id % 50 == 0 {
            generator.update_market_dynamics();
        }
        let record = generator.generate_order(order_id, count);
        writeln!(writer, "{}", record.to_csv_row())?;
    }
    writer.flush()?;

    let market = generator.market_state();
    info!(
        last_price = market.last_price,
        bid = market.bid_price,
        ask = market.ask_price,
        volatility = market.volatility,
        "final simulated market state"
    );
    Ok(())
}

fn run_benchmark(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut book = OrderBook::new("BENCH");
    setup_demo_risk_limits(&mut book)?;

    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();
    // Skip the header row.
    lines.next();

    let mut latencies: Vec<u64> = Vec::with_capacity(1 << 20);
    let mut order_count: u64 = 0;
    let mut trade_count: u64 = 0;
    let mut rejected_count: u64 = 0;

    let start_time = Instant::now();

    for line in lines {
        let line = line?;
        let Some(record) = OrderRecord::parse_csv_row(&line) else {
            warn!(%line, "skipping malformed row");
            continue;
        };

        let order_start = Instant::now();
        let result = book.add_order(NewOrder {
            id: record.order_id,
            side: record.side,
            price: record.price,
            quantity: record.quantity,
            kind: record.kind,
            display_size: record.display_size,
            stop_price: record.stop_price,
            owner_id: record.owner,
            session_id: record.session_id,
            ..NewOrder::default()
        });
        latencies.push(order_start.elapsed().as_nanos() as u64);

        order_count += 1;
        match result {
            Ok(trades) => trade_count += trades.len() as u64,
            Err(_) => rejected_count += 1,
        }

        // Periodic mark-to-market at the mid keeps unrealized PnL and the
        // fat-finger reference in step with the book.
        if order_count % 1_000 == 0 {
            if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
                book.risk_mut().mark_to_market((bid + ask) / 2);
            }
        }
    }

    let total_time = start_time.elapsed();
    print_report(&book, &mut latencies, order_count, trade_count, rejected_count, total_time);
    Ok(())
}

fn print_report(
    book: &OrderBook,
    latencies: &mut [u64],
    order_count: u64,
    trade_count: u64,
    rejected_count: u64,
    total_time: std::time::Duration,
) {
    println!("=== PERFORMANCE REPORT ===");
    println!("orders processed:  {order_count}");
    println!("trades executed:   {trade_count}");
    println!("orders rejected:   {rejected_count}");
    let total_ms = total_time.as_millis().max(1) as u64;
    println!("total time:        {total_ms} ms");
    println!("throughput:        {} orders/sec", order_count * 1_000 / total_ms);

    if !latencies.is_empty() {
        latencies.sort_unstable();
        let micros = |nanos: u64| nanos as f64 / 1_000.0;
        let percentile = |p: f64| latencies[(latencies.len() as f64 * p) as usize];
        let mean = latencies.iter().sum::<u64>() as f64 / latencies.len() as f64;
        println!("--- latency per order ---");
        println!("mean: {:.1} us", mean / 1_000.0);
        println!("p50:  {:.1} us", micros(percentile(0.50)));
        println!("p95:  {:.1} us", micros(percentile(0.95)));
        println!("p99:  {:.1} us", micros(percentile(0.99)));
        println!("min:  {:.1} us", micros(latencies[0]));
        println!("max:  {:.1} us", micros(latencies[latencies.len() - 1]));
    }

    println!("--- pool ---");
    println!(
        "available: {} / allocated: {} / capacity: {}",
        book.pool_available(),
        book.pool_allocated(),
        book.pool_capacity()
    );

    let stats = book.stats();
    match serde_json::to_string_pretty(&stats) {
        Ok(json) => println!("--- book stats ---\n{json}"),
        Err(err) => warn!(%err, "stats serialization failed"),
    }
    match serde_json::to_string_pretty(&book.snapshot(5)) {
        Ok(json) => println!("--- top of book ---\n{json}"),
        Err(err) => warn!(%err, "snapshot serialization failed"),
    }
}
