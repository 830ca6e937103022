//! Query Quest entry point
//!
//! On the web the page script drives `platform::web::WasmEngine`. Natively
//! this runs levels headless with a scripted autopilot standing in for the
//! player and a naive overlap check standing in for the host's collision
//! resolver.

#[cfg(not(target_arch = "wasm32"))]
use query_quest::autopilot::{DEFAULT_SEED, run_level};
#[cfg(not(target_arch = "wasm32"))]
use query_quest::consts::TICK_RATE_HZ;
#[cfg(not(target_arch = "wasm32"))]
use query_quest::levels::LEVEL_IDS;

/// Run the named level (or all of them); true if every run completed
#[cfg(not(target_arch = "wasm32"))]
fn run(args: &[String]) -> bool {
    let seed = args
        .get(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_SEED);
    let levels: Vec<&str> = match args.first().map(String::as_str) {
        None | Some("all") => LEVEL_IDS.to_vec(),
        Some(id) => vec![id],
    };

    let mut all_ok = true;
    for id in levels {
        match run_level(id, seed) {
            Ok(report) => {
                let status = if report.completed { "complete" } else { "INCOMPLETE" };
                println!(
                    "{id:<16} {status:<10} {:>6.1}s  resets: {}",
                    report.ticks as f64 / TICK_RATE_HZ as f64,
                    report.resets
                );
                all_ok &= report.completed;
            }
            Err(err) => {
                log::error!("{err}");
                all_ok = false;
            }
        }
    }
    all_ok
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Query Quest (native) starting...");

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !run(&args) {
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::web::wasm_start, this is just to satisfy the compiler
}
