//! Per-address network probes used by the range sweep.
//!
//! Both probes sit behind traits so the sweep can run against fakes. Neither
//! ever fails: an unanswered ping is "not alive" and an unanswered reverse
//! lookup is "no name".

pub mod prober;
pub mod resolver;
