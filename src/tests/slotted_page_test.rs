#[cfg(test)]
mod tests {
    use crate::errors::RecordError;
    use crate::storage::page::page::{
        page_constants::{PAGE_FOOTER_SIZE, PAGE_SIZE, SLOT_ENTRY_SIZE, TOMBSTONE_MARK},
        Page,
    };
    use crate::storage::page::slotted::SlottedPage;

    #[test]
    fn new_page_invariant() {
        let page = Page::new();
        assert_eq!(page.slot_count(), 0);
        assert_eq!(page.free_space_offset(), 0);
        assert_eq!(page.free_bytes(), (PAGE_SIZE - PAGE_FOOTER_SIZE) as u32);
    }

    #[test]
    fn insert_packs_bodies_from_the_front() {
        let mut page = Page::new();
        let first = page.find_record_slot(1, 100).unwrap();
        let second = page.find_record_slot(1, 50).unwrap();
        assert_eq!((first, second), (0, 1));

        let a = page.slot(1, 0).unwrap();
        let b = page.slot(1, 1).unwrap();
        assert_eq!((a.offset, a.size), (0, 100));
        assert_eq!((b.offset, b.size), (100, 50));
        assert_eq!(page.free_space_offset(), 150);
        assert_eq!(
            page.free_bytes(),
            (PAGE_SIZE - PAGE_FOOTER_SIZE - 150 - 2 * SLOT_ENTRY_SIZE) as u32
        );

        page.write_record(a, &[7u8; 100]);
        page.write_record(b, &[9u8; 50]);
        assert_eq!(page.record_bytes(1, 0).unwrap(), &[7u8; 100][..]);
        assert_eq!(page.record_bytes(1, 1).unwrap(), &[9u8; 50][..]);
    }

    #[test]
    fn slot_out_of_range() {
        let page = Page::new();
        assert!(matches!(
            page.slot(3, 0),
            Err(RecordError::SlotOutOfRange {
                page: 3,
                slot: 0,
                ..
            })
        ));
    }

    #[test]
    fn deleted_slot_is_reused() {
        let mut page = Page::new();
        page.find_record_slot(1, 60).unwrap();
        page.find_record_slot(1, 60).unwrap();
        page.delete_slot(0);
        assert!(page.slot(1, 0).unwrap().is_free());
        assert!(matches!(
            page.record_bytes(1, 0),
            Err(RecordError::RecordDeleted { .. })
        ));

        // Reuse keeps the directory size; the body goes to fresh space.
        let reused = page.find_record_slot(1, 30).unwrap();
        assert_eq!(reused, 0);
        assert_eq!(page.slot_count(), 2);
        assert_eq!(page.slot(1, 0).unwrap().offset, 120);
    }

    #[test]
    fn insert_too_large_for_free_space() {
        let mut page = Page::new();
        page.find_record_slot(1, 4000).unwrap();
        let err = page.find_record_slot(1, 200).unwrap_err();
        assert!(matches!(
            err,
            RecordError::FreeSpaceMismatch {
                page: 1,
                needed: 208,
                ..
            }
        ));
    }

    #[test]
    fn tombstone_slot_is_neither_free_nor_plain() {
        let mut page = Page::new();
        page.find_record_slot(1, 8).unwrap();
        let mut slot = page.slot(1, 0).unwrap();
        slot.size = TOMBSTONE_MARK;
        page.set_slot(0, slot);

        let read_back = page.slot(1, 0).unwrap();
        assert!(read_back.is_tombstone());
        assert!(!read_back.is_free());
        assert_eq!(read_back.body_len(), 8);
    }

    #[test]
    fn reorganize_compacts_and_keeps_slot_numbers() {
        let mut page = Page::new();
        for (size, byte) in [(100usize, 1u8), (200, 2), (300, 3)] {
            let slot_num = page.find_record_slot(1, size).unwrap();
            let slot = page.slot(1, slot_num).unwrap();
            page.write_record(slot, &vec![byte; size]);
        }
        page.delete_slot(1);
        page.reorganize();

        // 200 bytes of dead body reclaimed, slot numbers untouched.
        assert_eq!(page.free_space_offset(), 400);
        assert_eq!(page.slot_count(), 3);
        assert!(page.slot(1, 1).unwrap().is_free());
        assert_eq!(page.record_bytes(1, 0).unwrap(), &[1u8; 100][..]);
        assert_eq!(page.record_bytes(1, 2).unwrap(), &[3u8; 300][..]);
    }

    #[test]
    fn reorganize_of_full_page_is_identity() {
        let mut page = Page::new();
        for (size, byte) in [(64usize, 4u8), (32, 5)] {
            let slot_num = page.find_record_slot(1, size).unwrap();
            let slot = page.slot(1, slot_num).unwrap();
            page.write_record(slot, &vec![byte; size]);
        }
        let before = page.free_bytes();
        page.reorganize();
        page.reorganize();
        assert_eq!(page.free_bytes(), before);
        assert_eq!(page.record_bytes(1, 0).unwrap(), &[4u8; 64][..]);
        assert_eq!(page.record_bytes(1, 1).unwrap(), &[5u8; 32][..]);
    }
}
