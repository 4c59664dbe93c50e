//! Background analysis collaborators
//!
//! Both collaborators follow the same shape: a driver on the main thread
//! decides when to send a request, a worker thread answers whenever it
//! gets to it, and a [`mailbox::KeyedMailbox`] turns those answers back
//! into main-thread state without ever blocking.

pub mod eval;
pub mod mailbox;
pub mod opening;

pub use eval::{EvalDriver, Evaluation};
pub use mailbox::{DrainReport, KeyedMailbox, Retention};
pub use opening::{OpeningDriver, OpeningStatus, OpeningUpdate};
