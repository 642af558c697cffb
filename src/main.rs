//! Liquidity Protection Simulation.
//!
//! Walks one base/network pool through the protection lifecycle: single sided
//! deposits, removal before and after the protection ramp, impermanent loss
//! compensation after a price move, locked balance claims and unprotecting.

use liquidity_protection::sandbox::{self, Sandbox, BASE_TOKEN, NETWORK_TOKEN, POOL_TOKEN, SEED_PROVIDER};
use liquidity_protection::*;
use std::env;

const ALICE: AccountId = AccountId(7);
const BOB: AccountId = AccountId(8);
const TRADER: AccountId = AccountId(9);

fn main() -> Result<(), EngineError> {
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("Liquidity Protection Simulation");
    println!("One base/network pool, development schedule (60s to 600s ramp, 60s lock)\n");

    scenario_1_base_deposit()?;
    scenario_2_network_deposit()?;
    scenario_3_protection_ramp()?;
    scenario_4_price_move_and_compensation()?;
    scenario_5_unprotect()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn amount(x: u64) -> Amount {
    U256::from(x)
}

// the simulated clock starts at wall time and only moves when a scenario advances it
fn new_engine() -> Result<Engine, EngineError> {
    Sandbox::development(1_000_000, 500_000)
        .start_time(Timestamp::now())
        .build()
}

/// Base token deposit with protocol co-investment.
fn scenario_1_base_deposit() -> Result<(), EngineError> {
    println!("Scenario 1: Base Token Deposit\n");

    let mut engine = new_engine()?;
    sandbox::fund(&mut engine, ALICE, BASE_TOKEN, 10_000)?;
    let id = engine.add_liquidity(ALICE, POOL_TOKEN, BASE_TOKEN, amount(10_000))?;

    if let Some(position) = engine.position(id) {
        println!("  Alice deposits 10,000 base at {}", position.timestamp);
        println!("  {}: {} pool tokens backing {} base", id, position.pool_amount, position.reserve_amount);
    }
    println!("  Network tokens minted for the pool: {}", engine.network_tokens_minted(POOL_TOKEN));
    println!("  Protocol owned pool tokens: {}\n", engine.system_balance(POOL_TOKEN));
    Ok(())
}

/// Network token deposit drawing on the protocol's pool tokens.
fn scenario_2_network_deposit() -> Result<(), EngineError> {
    println!("Scenario 2: Network Token Deposit\n");

    let mut engine = new_engine()?;
    sandbox::fund(&mut engine, ALICE, BASE_TOKEN, 10_000)?;
    engine.add_liquidity(ALICE, POOL_TOKEN, BASE_TOKEN, amount(10_000))?;

    let (base_space, network_space) = engine.pool_available_space(POOL_TOKEN)?;
    println!("  Space left: {base_space} base, {network_space} network");

    sandbox::fund(&mut engine, BOB, NETWORK_TOKEN, 2_000)?;
    let id = engine.add_liquidity(BOB, POOL_TOKEN, NETWORK_TOKEN, amount(2_000))?;
    if let Some(position) = engine.position(id) {
        println!("  Bob deposits 2,000 network");
        println!("  {}: {} pool tokens backing {} network", id, position.pool_amount, position.reserve_amount);
    }
    println!("  Governance tokens held by Bob: {}", engine.ledger().balance_of(engine.config().gov_token, BOB));
    println!("  Protocol owned pool tokens: {}\n", engine.system_balance(POOL_TOKEN));
    Ok(())
}

/// Previews of the same position across the protection ramp.
fn scenario_3_protection_ramp() -> Result<(), EngineError> {
    println!("Scenario 3: Protection Ramp\n");

    let mut engine = new_engine()?;
    sandbox::fund(&mut engine, ALICE, BASE_TOKEN, 10_000)?;
    let id = engine.add_liquidity(ALICE, POOL_TOKEN, BASE_TOKEN, amount(10_000))?;
    let added = engine.time();

    for elapsed in [30u64, 60, 300, 600] {
        let preview = engine.remove_liquidity_return(id, Ppm::FULL, added.plus(elapsed))?;
        println!(
            "  after {:>3}s: target {} (base {}, network {})",
            elapsed, preview.target_amount, preview.base_amount, preview.network_amount
        );
    }

    engine.advance_time(30);
    let outcome = engine.remove_liquidity(ALICE, id, Ppm::new(500_000))?;
    println!(
        "  Alice removes half after 30s: paid {} base, {} network locked\n",
        outcome.paid_amount, outcome.locked_amount
    );
    Ok(())
}

/// Price move, full protection, compensation in network tokens and the claim.
fn scenario_4_price_move_and_compensation() -> Result<(), EngineError> {
    println!("Scenario 4: Impermanent Loss Compensation\n");

    let mut engine = new_engine()?;
    sandbox::fund(&mut engine, ALICE, BASE_TOKEN, 10_000)?;
    let id = engine.add_liquidity(ALICE, POOL_TOKEN, BASE_TOKEN, amount(10_000))?;

    // a large trade doubles the price of base, then the average catches up
    sandbox::fund(&mut engine, TRADER, NETWORK_TOKEN, 200_000)?;
    let bought = engine.with_pool(POOL_TOKEN, |converter, ledger| {
        converter.convert(ledger, TRADER, NETWORK_TOKEN, amount(200_000))
    })?;
    engine.with_pool(POOL_TOKEN, |converter, _| converter.sync_average_rate())?;
    println!("  Trader sells 200,000 network for {bought} base");

    engine.advance_time(600);
    let outcome = engine.remove_liquidity(ALICE, id, Ppm::FULL)?;
    println!("  Alice removes after 600s (full protection)");
    println!("  Target: {} base", outcome.target_amount);
    println!("  Paid: {} base", outcome.paid_amount);
    println!("  Locked: {} network", outcome.locked_amount);

    let early = engine.claim_balance(ALICE, 0, usize::MAX)?;
    println!("  Claim right away: {early}");

    engine.advance_time(60);
    let claimed = engine.claim_balance(ALICE, 0, usize::MAX)?;
    println!("  Claim after the lock: {claimed}");
    println!(
        "  Alice now holds {} base and {} network\n",
        engine.ledger().balance_of(BASE_TOKEN, ALICE),
        engine.ledger().balance_of(NETWORK_TOKEN, ALICE)
    );
    Ok(())
}

/// Protecting existing pool tokens and walking away without compensation.
fn scenario_5_unprotect() -> Result<(), EngineError> {
    println!("Scenario 5: Protect and Unprotect Pool Tokens\n");

    let mut engine = new_engine()?;
    let (first, second) = engine.protect_liquidity(SEED_PROVIDER, POOL_TOKEN, amount(10_000))?;
    println!("  Seed provider protects 10,000 pool tokens as {first} and {second}");

    engine.advance_time(1);
    engine.unprotect_liquidity(SEED_PROVIDER, first, second)?;
    println!(
        "  Unprotected. Seed provider holds {} pool tokens again",
        engine.ledger().balance_of(POOL_TOKEN, SEED_PROVIDER)
    );

    for event in engine.recent_events(3) {
        match serde_json::to_string(&event.payload) {
            Ok(json) => println!("  event {}: {}", event.id.0, json),
            Err(e) => println!("  event {}: <{}>", event.id.0, e),
        }
    }
    Ok(())
}
