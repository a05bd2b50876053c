#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::errors::PagedFileError;
    use crate::storage::disk::manager::{FileHandle, FileManager};
    use crate::storage::page::page::{page_constants::PAGE_SIZE, Page};

    fn patterned_page(byte: u8) -> Page {
        let mut page = Page::new();
        page.write_bytes(0, &[byte; PAGE_SIZE]);
        page
    }

    #[test]
    fn create_open_close_destroy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.db");
        let mut manager = FileManager::new();

        manager.create_file(&path).unwrap();
        assert!(path.exists());

        let mut handle = FileHandle::new();
        manager.open_file(&path, &mut handle).unwrap();
        assert!(handle.is_bound());
        assert_eq!(handle.page_count(), 0);

        manager.close_file(&mut handle).unwrap();
        assert!(!handle.is_bound());

        manager.destroy_file(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn create_existing_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.db");
        let mut manager = FileManager::new();

        manager.create_file(&path).unwrap();
        assert!(matches!(
            manager.create_file(&path),
            Err(PagedFileError::FileExists(_))
        ));
    }

    #[test]
    fn destroy_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let mut manager = FileManager::new();
        assert!(matches!(
            manager.destroy_file(&dir.path().join("gone.db")),
            Err(PagedFileError::FileNotFound(_))
        ));
    }

    #[test]
    fn pages_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.db");
        let mut manager = FileManager::new();
        manager.create_file(&path).unwrap();

        let mut handle = FileHandle::new();
        manager.open_file(&path, &mut handle).unwrap();
        for byte in 0..4u8 {
            let page_id = handle.append_page(&patterned_page(byte)).unwrap();
            assert_eq!(page_id, byte as u32);
        }
        handle.write_page(2, &patterned_page(0xAA)).unwrap();
        manager.close_file(&mut handle).unwrap();

        manager.open_file(&path, &mut handle).unwrap();
        assert_eq!(handle.page_count(), 4);
        let mut page = Page::new();
        handle.read_page(2, &mut page).unwrap();
        assert_eq!(page.bytes(0, PAGE_SIZE), &[0xAA; PAGE_SIZE]);
        handle.read_page(3, &mut page).unwrap();
        assert_eq!(page.bytes(0, PAGE_SIZE), &[3u8; PAGE_SIZE]);
        manager.close_file(&mut handle).unwrap();
    }

    #[test]
    fn page_out_of_range() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.db");
        let mut manager = FileManager::new();
        manager.create_file(&path).unwrap();

        let mut handle = FileHandle::new();
        manager.open_file(&path, &mut handle).unwrap();
        let mut page = Page::new();
        assert!(matches!(
            handle.read_page(0, &mut page),
            Err(PagedFileError::PageOutOfRange { page: 0, .. })
        ));
        handle.append_page(&Page::new()).unwrap();
        handle.read_page(0, &mut page).unwrap();
        assert!(matches!(
            handle.write_page(1, &page),
            Err(PagedFileError::PageOutOfRange { page: 1, .. })
        ));
        manager.close_file(&mut handle).unwrap();
    }

    #[test]
    fn bound_handle_cannot_be_reopened() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.db");
        let mut manager = FileManager::new();
        manager.create_file(&path).unwrap();

        let mut handle = FileHandle::new();
        manager.open_file(&path, &mut handle).unwrap();
        assert!(matches!(
            manager.open_file(&path, &mut handle),
            Err(PagedFileError::HandleInUse(_))
        ));
        manager.close_file(&mut handle).unwrap();
        assert!(matches!(
            manager.close_file(&mut handle),
            Err(PagedFileError::HandleUnbound)
        ));
    }

    #[test]
    fn one_file_many_handles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.db");
        let mut manager = FileManager::new();
        manager.create_file(&path).unwrap();

        let mut first = FileHandle::new();
        let mut second = FileHandle::new();
        manager.open_file(&path, &mut first).unwrap();
        manager.open_file(&path, &mut second).unwrap();
        assert_eq!(manager.open_count(&path), 2);

        first.append_page(&patterned_page(7)).unwrap();
        // The second handle was bound before the append and keeps its own
        // page count until reopened.
        assert_eq!(second.page_count(), 0);

        manager.close_file(&mut first).unwrap();
        manager.close_file(&mut second).unwrap();
        assert_eq!(manager.open_count(&path), 0);
    }

    #[test]
    fn destroy_open_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.db");
        let mut manager = FileManager::new();
        manager.create_file(&path).unwrap();

        let mut handle = FileHandle::new();
        manager.open_file(&path, &mut handle).unwrap();
        assert!(matches!(
            manager.destroy_file(&path),
            Err(PagedFileError::FileInUse(_))
        ));
        manager.close_file(&mut handle).unwrap();
        manager.destroy_file(&path).unwrap();
    }

    #[test]
    fn io_counters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.db");
        let mut manager = FileManager::new();
        manager.create_file(&path).unwrap();

        let mut handle = FileHandle::new();
        manager.open_file(&path, &mut handle).unwrap();
        let mut page = Page::new();
        handle.append_page(&page).unwrap();
        handle.append_page(&page).unwrap();
        handle.write_page(0, &page).unwrap();
        handle.read_page(1, &mut page).unwrap();
        handle.read_page(1, &mut page).unwrap();
        handle.read_page(1, &mut page).unwrap();
        assert_eq!(handle.collect_counters(), (3, 1, 2));
        manager.close_file(&mut handle).unwrap();
    }
}
