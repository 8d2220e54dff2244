pub mod assessments;
pub mod calc;
pub mod core;
pub mod promotion;
pub mod records;
pub mod reports;
pub mod scores;
pub mod settings;
pub mod years;
