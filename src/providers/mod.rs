pub mod hgbrasil;
pub mod timeout;

pub use hgbrasil::HgBrasilProvider;
pub use timeout::TimeoutProvider;
