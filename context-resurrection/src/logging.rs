//! Structured logging using tracing.
//!
//! Logs go to stderr so stdout stays clean for `--json` output. The level
//! can be controlled via the `RUST_LOG` env var.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "rn_cr=info,rn_cr_lib=info";

pub fn init(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("rn_cr=debug,rn_cr_lib=debug")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    // try_init: a subscriber may already be installed (tests, embedding apps)
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
