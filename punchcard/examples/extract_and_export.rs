//! Pull everything off a terminal, sync it into an in-memory store,
//! and export the artifacts
//!
//! ```sh
//! cargo run --example extract_and_export -- 192.168.1.201 123456
//! ```

use anyhow::Context;
use punchcard::{
    export_extraction, extract_all, sync_attendance, sync_users, Device, DeviceEndpoint,
    MemoryStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "punchcard=info".into()),
        )
        .init();

    let host = std::env::args()
        .nth(1)
        .context("usage: extract_and_export <host> [password]")?;
    let password: u32 = std::env::args()
        .nth(2)
        .map(|p| p.parse())
        .transpose()
        .context("password must be numeric")?
        .unwrap_or(0);

    let endpoint = DeviceEndpoint::new(host).with_password(password);
    let mut device = Device::connect(&endpoint).await?;

    let result = extract_all(&mut device).await;
    device.disconnect().await?;

    println!("{}", result.summary());

    // Keyed upserts: running this example twice against the same store
    // would not duplicate anything
    let store = MemoryStore::new();
    let users = sync_users(&store, &result.users).await;
    let attendance = sync_attendance(&store, &result.attendance).await;
    println!("users: {users}");
    println!("attendance: {attendance}");

    for path in export_extraction("./extracted_data", &result)? {
        println!("wrote {}", path.display());
    }

    Ok(())
}
