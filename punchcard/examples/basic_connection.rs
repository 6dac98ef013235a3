//! Connect to a terminal and print its info block
//!
//! ```sh
//! cargo run --example basic_connection -- 192.168.1.201
//! ```

use anyhow::Context;
use punchcard::{Device, DeviceEndpoint};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "punchcard=debug".into()),
        )
        .init();

    let host = std::env::args()
        .nth(1)
        .context("usage: basic_connection <host> [password]")?;
    let password: u32 = std::env::args()
        .nth(2)
        .map(|p| p.parse())
        .transpose()
        .context("password must be numeric")?
        .unwrap_or(0);

    let endpoint = DeviceEndpoint::new(host).with_password(password);
    let mut device = Device::connect(&endpoint).await?;

    let info = device.get_device_info().await?;
    println!("{info}");

    device.disconnect().await?;
    Ok(())
}
