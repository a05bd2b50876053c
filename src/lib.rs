pub mod catalog;
pub mod db_types;
pub mod errors;
pub mod index;
pub mod iterators;
pub mod storage;

mod tests;
