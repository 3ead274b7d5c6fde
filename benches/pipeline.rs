//! Throughput benchmarks for the allocation pipeline.
//!
//! Measures one full evaluation cycle at increasing market counts:
//! - Allocation across markets
//! - Tier sizing and pricing
//! - Profile comparison against an unchanged baseline

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use lpbot::{
    AllocationProfile, Balances, MarketConfig, MarketOverride, PricingPolicy, Quote,
    ReserveConfig, Tier, Tolerances, allocate_orders, compare_profiles, compute_allocations,
    price_orders,
};
use rust_decimal::Decimal;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Build N markets, each with a five-rung ladder on both sides.
fn build_markets(n: usize) -> (Vec<MarketConfig>, Balances, Vec<Quote>) {
    let ladder: Vec<Tier> = (1..=5)
        .map(|i| Tier::new(Decimal::new(i, 2), d("0.2")))
        .collect();
    let pct = Decimal::ONE / Decimal::from(n as u64);

    let mut balances = Balances::default();
    balances.insert("BTC".to_string(), d("10"));

    let mut markets = Vec::with_capacity(n);
    let mut quotes = Vec::with_capacity(n);
    for i in 0..n {
        let coin = format!("C{i}");
        balances.insert(coin.clone(), d("100000"));
        let entry = MarketOverride {
            allocation: [("BTC".to_string(), pct), (coin.clone(), d("1"))]
                .into_iter()
                .collect(),
            buy_limit: Some(ladder.clone()),
            sell_limit: Some(ladder.clone()),
            ..Default::default()
        };
        markets.push(MarketConfig::resolve(&format!("{coin}_BTC"), None, &entry).unwrap());
        quotes.push(Quote::new(d("0.0000032"), d("0.0000033")));
    }
    (markets, balances, quotes)
}

fn build_profile(
    markets: &[MarketConfig],
    balances: &Balances,
    quotes: &[Quote],
) -> AllocationProfile {
    let allocs = compute_allocations(balances, &ReserveConfig::default(), markets);
    markets
        .iter()
        .zip(quotes)
        .map(|(m, q)| {
            let market = m.market();
            let a = allocs[&market];
            let tiers = allocate_orders(a.market_amount, a.base_amount, m);
            (market, price_orders(&tiers, q, PricingPolicy::Touch))
        })
        .collect()
}

/// Benchmark: allocations → tiers → prices for every market
fn bench_build_profile(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_profile");

    for n in [1, 10, 100] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let (markets, balances, quotes) = build_markets(n);
            b.iter(|| black_box(build_profile(&markets, &balances, &quotes)));
        });
    }

    group.finish();
}

/// Benchmark: compare a profile against an identical baseline (worst case, no early exit)
fn bench_compare_profiles(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare_profiles");
    let tolerances = Tolerances {
        price: d("0.02"),
        amount: d("0.02"),
    };

    for n in [1, 10, 100] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let (markets, balances, quotes) = build_markets(n);
            let profile = build_profile(&markets, &balances, &quotes);
            b.iter(|| black_box(compare_profiles(&profile, &profile, &tolerances)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_profile, bench_compare_profiles);
criterion_main!(benches);
