pub mod calculate;
pub mod prompt;
pub mod report;
pub mod setup;
pub mod ui;
