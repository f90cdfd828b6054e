use anyhow::Result;
use mpesa_mz::{Config, MpesaClient};
use uuid::Uuid;

// Queries the status of a sandbox transaction from MPESA_* env credentials.
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::from_env()?;
    let client = MpesaClient::new(config)?;

    let query = format!("Q{}", Uuid::new_v4().simple());
    match client.query_status("REF123", &query, None).await {
        Ok(res) => println!("status ok ({}): {}", res.status, res.response),
        Err(e) => println!("status failed: {}", e),
    }
    Ok(())
}
