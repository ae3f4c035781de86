pub mod scenes;
pub mod search;
