//! # Discovery Orchestrators
//!
//! One orchestrator per scanner kind. Each drives its probes, reconciles
//! what it finds into the inventory, emits findings and reports progress
//! through the run handle it is given. Neither owns the run: status and
//! timestamps belong to the [`controller`](crate::controller).

pub mod range;
pub mod switch;
