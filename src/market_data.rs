//! Synthetic market-data generation for benchmarks and load tests.
//!
//! The generator models a single instrument around a $1000 reference price:
//! a bounded random walk with momentum decay and volatility clustering
//! drives the quote, and a population of trader profiles (market makers,
//! institutions, HFT shops and retail) decides order type, size and
//! placement. Output rows use the CSV layout consumed by the `run` command.

use crate::orders::{OrderId, OrderType, Price, Quantity, Side, TraderId};
use crate::ticks::TickSizeTable;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Header of the generated CSV files.
pub const CSV_HEADER: &str =
    "order_id,side,price,quantity,type,disp,display_size,owner,stop_price,session_id,ip_address";

/// One row of generated order flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    /// Sequential order id.
    pub order_id: OrderId,
    /// Buy or sell.
    pub side: Side,
    /// Limit price; 0 for market orders.
    pub price: Price,
    /// Total quantity.
    pub quantity: Quantity,
    /// Order type.
    pub kind: OrderType,
    /// Initially displayed quantity (iceberg slice or full size).
    pub disp: Quantity,
    /// Maximum iceberg slice.
    pub display_size: Quantity,
    /// Trader id.
    pub owner: TraderId,
    /// Trigger price for stops; 0 otherwise.
    pub stop_price: Price,
    /// Synthetic session key.
    pub session_id: u32,
    /// Synthetic source address, consumed by session management only.
    pub ip_address: String,
}

impl OrderRecord {
    /// Formats the record as one CSV row (no trailing newline).
    #[must_use]
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            self.order_id,
            self.side,
            self.price,
            self.quantity,
            self.kind,
            self.disp,
            self.display_size,
            self.owner,
            self.stop_price,
            self.session_id,
            self.ip_address
        )
    }

    /// Parses one CSV row. Unknown order types default to GTC, matching
    /// the tolerant ingestion of the benchmark harness.
    #[must_use]
    pub fn parse_csv_row(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 11 {
            return None;
        }
        let kind = match fields[4] {
            "IOC" => OrderType::Ioc,
            "FOK" => OrderType::Fok,
            "MARKET" => OrderType::Market,
            "STOP_LOSS" => OrderType::StopLoss,
            "ICEBERG" => OrderType::Iceberg,
            _ => OrderType::Gtc,
        };
        Some(OrderRecord {
            order_id: fields[0].parse().ok()?,
            side: if fields[1] == "BUY" {
                Side::Buy
            } else {
                Side::Sell
            },
            price: fields[2].parse().ok()?,
            quantity: fields[3].parse().ok()?,
            kind,
            disp: fields[5].parse().ok()?,
            display_size: fields[6].parse().ok()?,
            owner: fields[7].parse().ok()?,
            stop_price: fields[8].parse().ok()?,
            session_id: fields[9].parse().ok()?,
            ip_address: fields[10].to_string(),
        })
    }
}

/// Quote and regime state of the simulated market.
#[derive(Debug, Clone, Copy)]
pub struct MarketState {
    /// Last simulated trade price.
    pub last_price: Price,
    /// Simulated best bid.
    pub bid_price: Price,
    /// Simulated best ask.
    pub ask_price: Price,
    /// Daily volatility fraction, clamped to `[0.005, 0.05]`.
    pub volatility: f64,
    /// Directional drift, decays toward zero.
    pub momentum: f64,
    /// Minutes since the open of a 390-minute session.
    pub time_of_day: u32,
    /// Open, close and lunch-spike windows trade heavier.
    pub is_high_volume_period: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TraderClass {
    MarketMaker,
    Institutional,
    Hft,
    Retail,
}

#[derive(Debug, Clone, Copy)]
struct TraderProfile {
    class: TraderClass,
    /// Probability mass pushed toward aggressive (market) orders.
    aggressiveness: f64,
    min_size: Quantity,
    max_size: Quantity,
    iceberg_probability: f64,
    stop_loss_probability: f64,
}

/// Seeded order-flow generator.
pub struct MarketDataGenerator {
    rng: StdRng,
    market: MarketState,
    profiles: Vec<TraderProfile>,
    ticks: TickSizeTable,
}

impl MarketDataGenerator {
    /// Creates a generator with the default seed used by the benchmark
    /// harness.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(42)
    }

    /// Creates a generator with an explicit seed; identical seeds produce
    /// identical order flow.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        let ticks = TickSizeTable::default();
        let market = MarketState {
            last_price: 100_000,
            bid_price: ticks.round_to_tick(99_999),
            ask_price: ticks.round_to_tick(100_001),
            volatility: 0.02,
            momentum: 0.0,
            time_of_day: 0,
            is_high_volume_period: true,
        };
        MarketDataGenerator {
            rng: StdRng::seed_from_u64(seed),
            market,
            profiles: build_trader_profiles(),
            ticks,
        }
    }

    /// Current simulated quote and regime.
    #[must_use]
    pub fn market_state(&self) -> MarketState {
        self.market
    }

    /// Advances the simulated market one step: volatility shock, momentum
    /// decay, time-of-day volume regime and a mean-reverting price move.
    pub fn update_market_dynamics(&mut self) {
        self.market.volatility += self.rng.gen_range(-0.001..0.001);
        self.market.volatility = self.market.volatility.clamp(0.005, 0.05);

        self.market.momentum += self.rng.gen_range(-0.1..0.1);
        self.market.momentum *= 0.95;

        self.market.time_of_day = (self.market.time_of_day + 1) % 390;
        let minute = self.market.time_of_day;
        self.market.is_high_volume_period = minute < 30 || minute > 360 || (90..=120).contains(&minute);

        let noise = self.rng.gen_range(-1.0..1.0);
        let change = self.market.momentum * 0.1 + noise * self.market.volatility * 0.01;
        let base_increment = 50.0;
        let price_increment = (change * base_increment * self.market.volatility * 100.0) as Price;

        // Mean reversion toward the $1000 anchor keeps the walk bounded.
        let target_price: Price = 100_000;
        let mean_reversion = (target_price - self.market.last_price) / 1000;

        let new_price = (self.market.last_price + price_increment + mean_reversion).clamp(50_000, 150_000);
        let new_price = self.ticks.round_to_tick(new_price);
        if new_price <= 0 {
            return;
        }
        self.market.last_price = new_price;

        let tick = self.ticks.tick_size(new_price);
        let volatility_spread = (self.market.volatility * new_price as f64 * 0.05) as Price;
        let spread = self.ticks.round_to_tick(tick.max(volatility_spread)).max(tick);

        self.market.bid_price = self.ticks.round_to_tick(new_price - spread / 2);
        self.market.ask_price = self.ticks.round_to_tick(new_price + spread / 2);
        if self.market.ask_price - self.market.bid_price < tick {
            self.market.ask_price = self.market.bid_price + tick;
        }
    }

    /// Generates the next order. `order_id` should be sequential;
    /// `total_count` controls the book-building phase (the first tenth of
    /// the run avoids aggressive orders so the book has depth to hit).
    pub fn generate_order(&mut self, order_id: u64, total_count: u64) -> OrderRecord {
        let owner: TraderId = self.rng.gen_range(0..100) + 1;
        let profile = self.profiles[(owner - 1) as usize];

        let build_book_phase = order_id <= total_count / 10;
        let type_roll: f64 = self.rng.gen();
        let kind = if build_book_phase {
            if type_roll < 0.8 {
                OrderType::Gtc
            } else {
                OrderType::Iceberg
            }
        } else {
            let aggression_scale = if self.market.is_high_volume_period {
                1.5
            } else {
                1.0
            };
            if type_roll < profile.aggressiveness * aggression_scale {
                OrderType::Market
            } else if type_roll < profile.aggressiveness + profile.iceberg_probability {
                OrderType::Iceberg
            } else if type_roll
                < profile.aggressiveness
                    + profile.iceberg_probability
                    + profile.stop_loss_probability
            {
                OrderType::StopLoss
            } else if type_roll < 0.95 {
                OrderType::Gtc
            } else if self.rng.gen_bool(0.5) {
                OrderType::Ioc
            } else {
                OrderType::Fok
            }
        };

        let mut quantity = self.rng.gen_range(profile.min_size..=profile.max_size);
        if self.market.is_high_volume_period {
            quantity = (quantity as f64 * (1.0 + self.rng.gen::<f64>() * 0.5)) as Quantity;
        }

        let side = self.pick_side();
        let (price, stop_price) = self.pick_prices(kind, side, profile);

        let (disp, display_size) = if kind == OrderType::Iceberg {
            let lower = (quantity / 10).max(1);
            let upper = (quantity / 3).max(lower);
            let slice = self.rng.gen_range(lower..=upper).min(quantity);
            (slice, slice)
        } else {
            (quantity, quantity)
        };

        let session_id = (order_id % 500 + 1) as u32;
        let ip_address = format!("192.168.{}.{}", (order_id % 200) / 50, order_id % 50 + 1);

        OrderRecord {
            order_id,
            side,
            price,
            quantity,
            kind,
            disp,
            display_size,
            owner,
            stop_price,
            session_id,
            ip_address,
        }
    }

    fn pick_side(&mut self) -> Side {
        // Momentum biases flow toward its own direction.
        let buy_probability = if self.market.momentum.abs() > 0.01 {
            if self.market.momentum > 0.0 {
                0.6
            } else {
                0.4
            }
        } else {
            0.5
        };
        if self.rng.gen_bool(buy_probability) {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    fn pick_prices(
        &mut self,
        kind: OrderType,
        side: Side,
        profile: TraderProfile,
    ) -> (Price, Price) {
        match kind {
            OrderType::Market => (0, 0),
            OrderType::StopLoss => {
                // Stops park 2-5% away from the last price.
                let offset = self.rng.gen_range(0.02..0.05);
                let last = self.market.last_price as f64;
                match side {
                    Side::Buy => (
                        self.ticks.round_to_tick(self.market.ask_price),
                        self.ticks.round_to_tick((last * (1.0 + offset)) as Price),
                    ),
                    Side::Sell => (
                        self.ticks.round_to_tick(self.market.bid_price),
                        self.ticks.round_to_tick((last * (1.0 - offset)) as Price),
                    ),
                }
            }
            _ => {
                let price = if profile.class == TraderClass::MarketMaker {
                    self.market_maker_quote(side)
                } else {
                    // Interpolate between the passive and aggressive side of
                    // the spread by the trader's aggressiveness.
                    let (aggressive, passive) = match side {
                        Side::Buy => (self.market.ask_price, self.market.bid_price),
                        Side::Sell => (self.market.bid_price, self.market.ask_price),
                    };
                    let interpolated = passive as f64
                        + profile.aggressiveness * (aggressive as f64 - passive as f64);
                    interpolated as Price
                };
                (self.ticks.round_to_tick(price.max(1)), 0)
            }
        }
    }

    fn market_maker_quote(&mut self, side: Side) -> Price {
        let tick = self.ticks.tick_size(self.market.last_price).max(1);
        let cross_roll: f64 = self.rng.gen();
        match side {
            Side::Buy => {
                if cross_roll < 0.2 {
                    self.market.ask_price
                } else if cross_roll < 0.7 {
                    self.market.bid_price
                } else {
                    self.market.bid_price + tick
                }
            }
            Side::Sell => {
                if cross_roll < 0.2 {
                    self.market.bid_price
                } else if cross_roll < 0.7 {
                    self.market.ask_price
                } else {
                    self.market.ask_price - tick
                }
            }
        }
    }
}

impl Default for MarketDataGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn build_trader_profiles() -> Vec<TraderProfile> {
    let mut profiles = Vec::with_capacity(100);
    // 10% market makers: steady two-sided liquidity.
    profiles.resize(
        10,
        TraderProfile {
            class: TraderClass::MarketMaker,
            aggressiveness: 0.4,
            min_size: 100,
            max_size: 500,
            iceberg_probability: 0.3,
            stop_loss_probability: 0.05,
        },
    );
    // 20% institutional: large sliced orders.
    profiles.resize(
        30,
        TraderProfile {
            class: TraderClass::Institutional,
            aggressiveness: 0.7,
            min_size: 500,
            max_size: 2_000,
            iceberg_probability: 0.7,
            stop_loss_probability: 0.2,
        },
    );
    // 15% HFT: small and fast.
    profiles.resize(
        45,
        TraderProfile {
            class: TraderClass::Hft,
            aggressiveness: 0.9,
            min_size: 50,
            max_size: 300,
            iceberg_probability: 0.1,
            stop_loss_probability: 0.15,
        },
    );
    // 55% retail: small orders, frequent stops.
    profiles.resize(
        100,
        TraderProfile {
            class: TraderClass::Retail,
            aggressiveness: 0.8,
            min_size: 10,
            max_size: 200,
            iceberg_probability: 0.05,
            stop_loss_probability: 0.25,
        },
    );
    profiles
}
