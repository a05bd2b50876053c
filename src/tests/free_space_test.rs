#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::errors::RecordError;
    use crate::storage::disk::manager::{FileHandle, FileManager};
    use crate::storage::page::page::page_constants::{
        PAGE_FOOTER_SIZE, PAGE_SIZE, SLOT_ENTRY_SIZE,
    };
    use crate::storage::page_directory::{self, directory_constants::HEADER_CAPACITY};

    fn open_fresh(manager: &mut FileManager, dir: &TempDir) -> FileHandle {
        let path = dir.path().join("space.db");
        manager.create_file(&path).unwrap();
        let mut handle = FileHandle::new();
        manager.open_file(&path, &mut handle).unwrap();
        page_directory::init_first_header(&mut handle).unwrap();
        handle
    }

    #[test]
    fn first_request_allocates_a_data_page() {
        let dir = TempDir::new().unwrap();
        let mut manager = FileManager::new();
        let mut handle = open_fresh(&mut manager, &dir);

        let page_id = page_directory::get_data_page(&mut handle, 100).unwrap();
        assert_eq!(page_id, 1);
        assert_eq!(handle.page_count(), 2);

        // The reservation covers the record plus its slot entry.
        let reserve = (100 + SLOT_ENTRY_SIZE) as u32;
        assert_eq!(
            page_directory::page_free_bytes(&mut handle, 1).unwrap(),
            (PAGE_SIZE - PAGE_FOOTER_SIZE) as u32 - reserve
        );
        manager.close_file(&mut handle).unwrap();
    }

    #[test]
    fn requests_reuse_a_page_until_it_is_full() {
        let dir = TempDir::new().unwrap();
        let mut manager = FileManager::new();
        let mut handle = open_fresh(&mut manager, &dir);

        // 503 + 8 = 511 reserved per record; 4088 / 511 = exactly 8.
        for _ in 0..8 {
            assert_eq!(page_directory::get_data_page(&mut handle, 503).unwrap(), 1);
        }
        assert_eq!(page_directory::page_free_bytes(&mut handle, 1).unwrap(), 0);
        assert_eq!(page_directory::get_data_page(&mut handle, 503).unwrap(), 2);
        manager.close_file(&mut handle).unwrap();
    }

    #[test]
    fn exact_fit_is_selected() {
        let dir = TempDir::new().unwrap();
        let mut manager = FileManager::new();
        let mut handle = open_fresh(&mut manager, &dir);

        page_directory::get_data_page(&mut handle, 88).unwrap();
        let free = page_directory::page_free_bytes(&mut handle, 1).unwrap();
        let fits_exactly = (free as usize) - SLOT_ENTRY_SIZE;
        assert_eq!(
            page_directory::get_data_page(&mut handle, fits_exactly).unwrap(),
            1
        );
        assert_eq!(page_directory::page_free_bytes(&mut handle, 1).unwrap(), 0);
        manager.close_file(&mut handle).unwrap();
    }

    #[test]
    fn freed_space_makes_a_page_eligible_again() {
        let dir = TempDir::new().unwrap();
        let mut manager = FileManager::new();
        let mut handle = open_fresh(&mut manager, &dir);

        page_directory::get_data_page(&mut handle, 4000).unwrap();
        // 80 bytes left; a 100-byte record must go to a new page.
        assert_eq!(page_directory::get_data_page(&mut handle, 100).unwrap(), 2);
        page_directory::add_page_free_bytes(&mut handle, 1, 2000).unwrap();
        assert_eq!(page_directory::get_data_page(&mut handle, 100).unwrap(), 1);
        manager.close_file(&mut handle).unwrap();
    }

    #[test]
    fn untracked_page_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut manager = FileManager::new();
        let mut handle = open_fresh(&mut manager, &dir);
        assert!(matches!(
            page_directory::page_free_bytes(&mut handle, 9),
            Err(RecordError::PageNotTracked(9))
        ));
        manager.close_file(&mut handle).unwrap();
    }

    #[test]
    fn full_header_links_a_new_one() {
        let dir = TempDir::new().unwrap();
        let mut manager = FileManager::new();
        let mut handle = open_fresh(&mut manager, &dir);

        // Big records so every request allocates its own data page.
        for _ in 0..HEADER_CAPACITY + 1 {
            page_directory::get_data_page(&mut handle, 4000).unwrap();
        }

        let headers = page_directory::header_page_ids(&mut handle).unwrap();
        assert_eq!(headers, vec![0, HEADER_CAPACITY as u32 + 1]);

        let data = page_directory::data_page_ids(&mut handle).unwrap();
        assert_eq!(data.len(), HEADER_CAPACITY + 1);
        assert!(!data.contains(&0));
        assert!(!data.contains(&(HEADER_CAPACITY as u32 + 1)));
        // The overflowing data page lands after the header that tracks it.
        assert_eq!(data[HEADER_CAPACITY], HEADER_CAPACITY as u32 + 2);
        manager.close_file(&mut handle).unwrap();
    }
}
