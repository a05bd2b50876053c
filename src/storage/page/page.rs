use bytes::Buf;

use page_constants::PAGE_SIZE;

pub mod page_constants {
    // Constants for the slotted page structure

    // Size
    pub const PAGE_SIZE: usize = 1024 * 4;

    // The footer holds two u32 words at the very end of the page:
    // [slot_count][free_space_offset]
    pub const PAGE_FOOTER_SIZE: usize = 8;
    pub const FREE_SPACE_OFFSET_OFFSET: usize = PAGE_SIZE - 4;
    pub const SLOT_COUNT_OFFSET: usize = PAGE_SIZE - 8;

    // Slot directory entries are (offset:u32, size:u32) pairs growing
    // backward from the footer.
    pub const SLOT_ENTRY_SIZE: usize = 8;
    pub const SLOT_DIRECTORY_END: usize = PAGE_SIZE - PAGE_FOOTER_SIZE;

    // A slot whose size holds this sentinel stores an 8-byte forwarding
    // (page, slot) pair instead of a payload.
    pub const TOMBSTONE_MARK: u32 = u32::MAX;
    pub const TOMBSTONE_SIZE: usize = 8;

    pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - PAGE_FOOTER_SIZE - SLOT_ENTRY_SIZE;
}

/// Fixed-size page buffer, the unit of all disk I/O. Typed accessors keep
/// every layout read and write bounds-checked and little-endian.
pub struct Page {
    pub data: [u8; PAGE_SIZE],
}

impl Page {
    pub fn new() -> Page {
        Page {
            data: [0; PAGE_SIZE],
        }
    }

    pub fn read_u32(&self, offset: usize) -> u32 {
        let mut slice = &self.data[offset..offset + 4];
        slice.get_u32_le()
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn bytes(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }

    pub fn write_bytes(&mut self, offset: usize, src: &[u8]) {
        self.data[offset..offset + src.len()].copy_from_slice(src);
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Page {
    fn clone(&self) -> Self {
        Page { data: self.data }
    }
}
