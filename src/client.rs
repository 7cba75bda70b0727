//! Command-line client for the rates service.
//!
//! ```bash
//! cargo run --bin client                                  # GetRates on localhost:50051
//! cargo run --bin client -- --health                      # HealthCheck only
//! cargo run --bin client -- http://server:50051           # custom address
//! ```

use clap::Parser;
use tonic::Request;

use usdt_rates::server::proto::{self, rate_service_client::RateServiceClient};

#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(about = "Calls the rates service once and prints the result")]
struct Args {
    /// Server address
    #[arg(default_value = "http://localhost:50051")]
    addr: String,

    /// Only run the health check
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut client = RateServiceClient::connect(args.addr).await?;

    let health = client
        .health_check(Request::new(proto::Empty {}))
        .await?
        .into_inner();
    println!("health: {}", health.status);
    if args.health {
        return Ok(());
    }

    let rate = client
        .get_rates(Request::new(proto::Empty {}))
        .await?
        .into_inner();
    println!("ask:    {:.4}", rate.ask);
    println!("bid:    {:.4}", rate.bid);
    println!("spread: {:.4}", rate.ask - rate.bid);
    println!("time:   {}", rate.timestamp);

    Ok(())
}
