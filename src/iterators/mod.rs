pub mod index_scan;
pub mod record_scan;
