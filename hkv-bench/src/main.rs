//! # Pooled Client Benchmark Harness
//!
//! Purpose: Drive a running HybridKV (or any RESP2) server through the pooled
//! client so the cost of the proxy's freshness checks can be compared against
//! a direct connection.
//!
//! ## Design Principles
//! 1. **Deterministic Workload**: Use a fixed PRNG seed for stable comparisons.
//! 2. **Allocation Control**: Pre-build keys/values to keep setup costs off the hot path.
//! 3. **Same Interface**: Both runs go through `KvCommands`, so only the
//!    connection handling differs.
//!
//! Usage: `hkv-bench [addr] [ops] [key_count] [recheck_ms]`

use std::env;
use std::hint::black_box;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use hkv_client::{ClientConfig, ConnectionPool, KvCommands};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:6379";
const DEFAULT_OP_COUNT: usize = 100_000;
const DEFAULT_KEY_COUNT: usize = 1 << 10;
const DEFAULT_RECHECK_MS: u64 = 5_000;
const VALUE_SIZE: usize = 64;

struct BenchConfig {
    addr: String,
    op_count: usize,
    key_count: usize,
    recheck: Duration,
}

impl BenchConfig {
    fn from_args() -> Self {
        let mut args = env::args().skip(1);
        let addr = args.next().unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let op_count = parse_or(args.next(), DEFAULT_OP_COUNT);
        let key_count = parse_or(args.next(), DEFAULT_KEY_COUNT).max(1);
        let recheck = Duration::from_millis(parse_or(args.next(), DEFAULT_RECHECK_MS));

        BenchConfig {
            addr,
            op_count,
            key_count,
            recheck,
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, fallback: T) -> T {
    value.and_then(|raw| raw.parse().ok()).unwrap_or(fallback)
}

/// Tiny deterministic PRNG; XorShift keeps the workload reproducible.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_index(&mut self, bound: usize) -> usize {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x % bound as u64) as usize
    }
}

fn build_keys(count: usize) -> Vec<Vec<u8>> {
    (0..count).map(|i| format!("bench:{i:08}").into_bytes()).collect()
}

fn report(label: &str, ops: usize, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    let ops_per_sec = (ops as f64) / secs;
    let micros_per_op = (secs * 1e6) / (ops as f64);
    println!("{label}: {ops} ops in {secs:.3}s ({ops_per_sec:.0} ops/s, {micros_per_op:.1} us/op)");
}

fn run_workload<C: KvCommands>(
    label: &str,
    client: &C,
    keys: &[Vec<u8>],
    ops: usize,
) -> Result<()> {
    let value = vec![b'x'; VALUE_SIZE];
    for key in keys {
        client.set(key, &value).with_context(|| format!("{label}: seeding keys"))?;
    }

    let mut rng = XorShift64::new(0x1234_5678_9ABC_DEF0);
    let start = Instant::now();
    for _ in 0..ops {
        let key = &keys[rng.next_index(keys.len())];
        black_box(client.get(key).with_context(|| format!("{label}: GET"))?);
    }
    report(&format!("{label} GET"), ops, start.elapsed());
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = run() {
        eprintln!("hkv-bench failed: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = BenchConfig::from_args();
    let keys = build_keys(config.key_count);

    let client = hkv_client::open(ClientConfig {
        addr: config.addr.clone(),
        recheck_interval: config.recheck,
        ..ClientConfig::default()
    })
    .context("creating pooled client")?;

    info!(
        addr = %config.addr,
        ops = config.op_count,
        keys = config.key_count,
        recheck_ms = config.recheck.as_millis() as u64,
        "starting benchmark"
    );

    client.ping(None).context("initial PING")?;
    run_workload("pooled", &client, &keys, config.op_count)?;
    info!(stats = ?client.stats(), "pooled client stats");

    // A direct connection from the same pool gives the no-proxy baseline.
    let conn = client.pool().borrow().context("borrowing direct connection")?;
    run_workload("direct", &*conn, &keys, config.op_count)?;
    client
        .pool()
        .release(conn)
        .context("returning direct connection")?;

    Ok(())
}
