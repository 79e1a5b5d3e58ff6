pub mod stats;

pub use stats::{mean, population_std_dev, z_score};
