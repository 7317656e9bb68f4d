use loyalty_store::{LoyaltyError, LoyaltyStore, Reward};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let dir = std::env::temp_dir().join("loyalty_store_example_basic");
    let _ = std::fs::remove_dir_all(&dir);
    let store = LoyaltyStore::open(&dir)?;

    // an admin fills the catalog
    store
        .catalog()
        .upsert(Reward::new(1, 500).with_detail("title", "Free coffee"))?;
    store
        .catalog()
        .upsert(Reward::new(2, 1500).with_detail("title", "Spa day"))?;

    // first visit creates the record
    let dash = store.dashboard(Some(42))?;
    println!("{} ({}) has {} points", dash.customer_name, dash.member_id, dash.points);

    // spend some
    let receipt = store.redeem_reward(Some(42), Some(1))?;
    println!("{}: {} points left", receipt.message, receipt.new_points);

    // can't afford this one
    match store.redeem_reward(Some(42), Some(2)) {
        Err(LoyaltyError::InsufficientPoints { available, required, .. }) => {
            println!("spa day costs {required}, only {available} left")
        }
        other => println!("unexpected: {other:?}"),
    }

    println!("\nOn-disk ledger:\n{}", std::fs::read_to_string(store.ledger().path())?);

    let _ = std::fs::remove_dir_all(&dir);
    Ok(())
}
