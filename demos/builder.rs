use loyalty_store::{LoyaltyStore, RecordTemplate, Reward};
use std::thread;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let dir = std::env::temp_dir().join("loyalty_store_example_builder");
    let _ = std::fs::remove_dir_all(&dir);

    // compact JSON, a stingier starting balance, catalog kept elsewhere
    let store = LoyaltyStore::builder(&dir)
        .rewards_path(dir.join("admin").join("rewards.json"))
        .template(RecordTemplate {
            points: 1000,
            tier: "Silver".into(),
            next_tier: "Gold".into(),
            points_to_next_tier: 500,
            tier_goal: 1500,
            ..RecordTemplate::default()
        })
        .pretty(false)
        .build()?;
    store.catalog().upsert(Reward::new(7, 100))?;

    // eight handlers hammering the same user: the queue lines them up
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || store.redeem_reward(Some(1), Some(7)))
        })
        .collect();
    for h in handles {
        match h.join().expect("handler panicked") {
            Ok(receipt) => println!("redeemed, {} left", receipt.new_points),
            Err(err) => println!("failed: {err}"),
        }
    }

    let record = store.ledger().record(1)?.expect("record exists");
    println!("final balance {} after {} redemptions", record.points, record.redeemed.len());
    println!("\nDebug output: {store:?}");

    let _ = std::fs::remove_dir_all(&dir);
    Ok(())
}
