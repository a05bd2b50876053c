pub mod disk;
pub mod page;
pub mod page_directory;
pub mod record_file;
pub mod tuple;
