#![allow(dead_code)]

use std::sync::{Arc, Once};

use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::{fmt, EnvFilter};

use dagrun::dag::Node;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing**
///   tests (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.: `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Collect the names of all nodes delivered so far on a done channel.
pub fn drain_done(rx: &mut UnboundedReceiver<Arc<Node>>) -> Vec<String> {
    let mut names = Vec::new();
    while let Ok(node) = rx.try_recv() {
        names.push(node.name().to_string());
    }
    names
}
