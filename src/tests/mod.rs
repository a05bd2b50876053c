pub mod free_space_test;
pub mod paged_file_test;
pub mod slotted_page_test;
pub mod tuple_test;
