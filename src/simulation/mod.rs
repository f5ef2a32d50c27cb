//! # Demo Network Simulation
//!
//! Generates a deterministic LT network for local runs and demos: a grid of
//! distribution transformers, each with a radial feeder, customer meters and
//! a random subset of switchable devices.
//!
//! ## Usage
//!
//! ```rust
//! use ltgrid::simulation::{NetworkSeedConfig, NetworkSeeder};
//!
//! let network = NetworkSeeder::new(NetworkSeedConfig {
//!     rows: 2,
//!     cols: 2,
//!     seed: 7,
//!     ..Default::default()
//! })
//! .generate()
//! .unwrap();
//!
//! assert_eq!(network.topology.transformers().count(), 4);
//! ```

pub mod network;

pub use network::{demo_network, NetworkSeedConfig, NetworkSeeder, SeededNetwork};
