//! Cross-crate scenarios for the discovery engine, driven through test doubles.

#[cfg(test)]
mod discovery;
#[cfg(test)]
mod utils;
