use std::collections::BTreeMap;

use restobaza_rs::{ApiClient, ClientConfig};
use secrecy::Secret;

#[tokio::main]
async fn main() {
    // The test modes never touch the network, so placeholder credentials are
    // fine here.
    let base = ClientConfig::new("1", "1", Secret::new("placeholder".to_string()))
        .expect("Failed to build config");

    // Forced-error mode: every call fails with the synthetic test error.
    let erroring = ApiClient::new(base.clone().with_test_errors(true));
    match erroring.call("news/getmany", &BTreeMap::new()).await {
        Ok(_) => unreachable!("forced-error mode always fails"),
        Err(e) => println!("forced-error mode: {e}"),
    }

    // Forced-empty-data mode: every call succeeds with an empty object.
    let empty = ApiClient::new(base.with_test_empty_data(true));
    match empty.call("news/getmany", &BTreeMap::new()).await {
        Ok(data) => println!("forced-empty-data mode: {data}"),
        Err(e) => eprintln!("unexpected error: {e}"),
    }
}
