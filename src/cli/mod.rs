pub mod estimate;
pub mod quotes;
pub mod setup;
pub mod ui;
