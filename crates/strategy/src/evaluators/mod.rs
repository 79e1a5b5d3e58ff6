pub mod dca;
pub mod grid;
pub mod mean_reversion;
pub mod momentum;

pub use dca::DcaParams;
pub use grid::GridParams;
pub use mean_reversion::MeanReversionParams;
pub use momentum::MomentumParams;
