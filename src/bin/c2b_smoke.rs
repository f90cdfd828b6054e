use anyhow::Result;
use mpesa_mz::{Config, MpesaClient};
use uuid::Uuid;

// Drives a sandbox C2B payment from MPESA_* env credentials.
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::from_env()?;
    let client = MpesaClient::new(config)?;

    let reference = format!("T{}", Uuid::new_v4().simple());
    match client
        .c2b("TX123456", "258840000000", 10.0, &reference, None)
        .await
    {
        Ok(res) => println!("c2b ok ({}): {}", res.status, res.response),
        Err(e) => println!("c2b failed: {}", e),
    }
    Ok(())
}
