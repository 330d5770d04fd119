//! # Events Module
//!
//! Progress reporting decoupled from presentation.
//!
//! ## Design
//! The core emits events through a crossbeam channel. The CLI drains them
//! on a separate thread to drive progress bars; tests collect them to check
//! stage ordering.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Batch(BatchEvent::Progress(p)) = event {
//!             println!("{}/{} pairs", p.completed, p.total);
//!         }
//!     }
//! });
//!
//! runner.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
