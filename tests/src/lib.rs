//! Cross-crate scenarios: full runs through the controller against fake
//! network collaborators and the in-memory stores.

#[cfg(test)]
mod support;

mod discovery;
