use std::collections::BTreeMap;

use restobaza_rs::ApiClient;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let client = ApiClient::from_env().expect("Failed to create API client");

    let mut params = BTreeMap::new();
    params.insert("limit".to_string(), "10".to_string());

    println!("Fetching news...");
    match client.call_traced("news/getmany", &params).await {
        Ok(outcome) => {
            println!("Request URL: {}", outcome.trace.query_url);
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome.data).expect("result is valid JSON")
            );
        }
        Err(e) => {
            eprintln!("Error fetching news: {e}");
        }
    }
}
