#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone binary for the site profitability API server.
//!
//! Configured entirely through environment variables (`BIND_ADDR`, `PORT`,
//! `RESULTS_DB_PATH`, `CALIBRATION_PATH`, `STATIC_DIR`, and the vision
//! provider keys). Pass `--interactive` to be prompted instead.

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    if std::env::args().skip(1).any(|arg| arg == "--interactive") {
        return site_profit_server::interactive::run().await;
    }

    site_profit_server::run_server().await
}
