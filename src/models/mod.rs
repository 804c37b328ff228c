pub mod action;
pub mod change;
pub mod report;
