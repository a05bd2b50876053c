pub mod bucket;
pub mod directory;
pub mod manager;
