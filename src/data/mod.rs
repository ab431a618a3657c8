//! Data generation: the seeded storefront history simulator.

pub mod sim;
