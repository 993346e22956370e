//! Interactive mode for the server.
//!
//! Prompts for the bind address, port, and results database before
//! starting the server.

use dialoguer::{Confirm, Input};

/// Runs the server in interactive mode, prompting for configuration.
///
/// Sets `BIND_ADDR`, `PORT`, and `RESULTS_DB_PATH` from the answers and
/// delegates to [`super::run_server`].
///
/// # Errors
///
/// Returns an `std::io::Result` error if a prompt fails or the server
/// fails to start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("Site Profitability Server");
    println!();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default("127.0.0.1".to_string())
        .interact_text()
        .map_err(std::io::Error::other)?;

    let port: u16 = Input::new()
        .with_prompt("Port")
        .default(8080)
        .interact_text()
        .map_err(std::io::Error::other)?;

    let db_path: String = Input::new()
        .with_prompt("Results database")
        .default(
            site_profit_database::db_path_from_env()
                .display()
                .to_string(),
        )
        .interact_text()
        .map_err(std::io::Error::other)?;

    // SAFETY: nothing else reads or writes the environment while the
    // prompts run; the server reads these once at startup.
    unsafe {
        std::env::set_var("BIND_ADDR", &bind_addr);
        std::env::set_var("PORT", port.to_string());
        std::env::set_var(site_profit_database::DB_PATH_ENV, &db_path);
    }

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port}?"))
        .default(true)
        .interact()
        .map_err(std::io::Error::other)?
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server().await
}
