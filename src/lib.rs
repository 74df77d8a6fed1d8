// SPDX-License-Identifier: MIT

pub mod checklist;
pub mod condition;
pub mod config;
pub mod error;
pub mod server;

pub use condition::{Condition, Gate, Values};
pub use config::AppConfig;
pub use error::GateError;
