pub mod intents;
pub mod photos;
pub mod records;
