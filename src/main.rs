//! # frame-motion CLI
//!
//! Compares two still frames and exits with 0 (no motion), 1 (motion) or
//! 2 (error).
//!
//! ## Usage
//! ```bash
//! frame-motion compare prev.jpg curr.jpg -t 30 -m 0.5
//! frame-motion compare prev.jpg curr.jpg -d --verbose --benchmark
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    ExitCode::from(cli::run())
}
