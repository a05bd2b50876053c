use log::debug;

use crate::errors::RecordError;
use crate::storage::disk::manager::FileHandle;
use crate::storage::page::page::{
    page_constants::{PAGE_FOOTER_SIZE, PAGE_SIZE, SLOT_ENTRY_SIZE},
    Page,
};

pub mod directory_constants {
    use super::PAGE_SIZE;

    // Header page layout:
    // [next_header:u32][entry_count:u32][(page_id:u32, free_bytes:u32) ...]
    pub const NEXT_HEADER_OFFSET: usize = 0;
    pub const ENTRY_COUNT_OFFSET: usize = 4;
    pub const ENTRIES_OFFSET: usize = 8;
    pub const HEADER_ENTRY_SIZE: usize = 8;
    pub const HEADER_CAPACITY: usize = (PAGE_SIZE - ENTRIES_OFFSET) / HEADER_ENTRY_SIZE;

    // Page 0 is always the first header, so 0 doubles as "no next header".
    pub const NO_NEXT_HEADER: u32 = 0;
}

use directory_constants::{
    ENTRIES_OFFSET, ENTRY_COUNT_OFFSET, HEADER_CAPACITY, HEADER_ENTRY_SIZE, NEXT_HEADER_OFFSET,
    NO_NEXT_HEADER,
};

fn entry_offset(index: usize) -> usize {
    ENTRIES_OFFSET + index * HEADER_ENTRY_SIZE
}

/// Appends the initial, empty header page (page 0) of a fresh record file.
pub fn init_first_header(handle: &mut FileHandle) -> Result<(), RecordError> {
    let page = Page::new();
    handle.append_page(&page)?;
    Ok(())
}

/// Walks the header chain for the first data page whose recorded free bytes
/// fit `record_size` plus one slot directory entry; allocates and registers
/// a new data page when none qualifies. The chosen entry is decremented and
/// its header written back before the data page is touched.
pub fn get_data_page(handle: &mut FileHandle, record_size: usize) -> Result<u32, RecordError> {
    let reserve = (record_size + SLOT_ENTRY_SIZE) as u32;
    let mut header_id: u32 = 0;

    loop {
        let mut header = Page::new();
        handle.read_page(header_id, &mut header)?;
        let entry_count = header.read_u32(ENTRY_COUNT_OFFSET) as usize;

        for index in 0..entry_count {
            let at = entry_offset(index);
            let page_id = header.read_u32(at);
            let free = header.read_u32(at + 4);
            // >= so that an exact fit is still selected.
            if free >= reserve {
                header.write_u32(at + 4, free - reserve);
                handle.write_page(header_id, &header)?;
                return Ok(page_id);
            }
        }

        let next = header.read_u32(NEXT_HEADER_OFFSET);
        if next != NO_NEXT_HEADER {
            header_id = next;
            continue;
        }

        // End of the chain with nothing suitable. Link a fresh header first
        // if this one is full, then append and register a new data page.
        if entry_count == HEADER_CAPACITY {
            let new_header_id = handle.append_page(&Page::new())?;
            header.write_u32(NEXT_HEADER_OFFSET, new_header_id);
            handle.write_page(header_id, &header)?;
            debug!("linked header page {} after {}", new_header_id, header_id);
            header_id = new_header_id;
            header = Page::new();
        }

        let data_page_id = handle.page_count();
        let free = (PAGE_SIZE - PAGE_FOOTER_SIZE) as u32 - reserve;
        let entry_count = header.read_u32(ENTRY_COUNT_OFFSET) as usize;
        let at = entry_offset(entry_count);
        header.write_u32(at, data_page_id);
        header.write_u32(at + 4, free);
        header.write_u32(ENTRY_COUNT_OFFSET, entry_count as u32 + 1);
        handle.write_page(header_id, &header)?;

        // A zeroed page is a valid empty slotted page.
        handle.append_page(&Page::new())?;
        debug!("allocated data page {} under header {}", data_page_id, header_id);
        return Ok(data_page_id);
    }
}

/// Maps a data page back to `(header_page_id, entry_index)`.
pub fn find_header_entry(
    handle: &mut FileHandle,
    page_id: u32,
) -> Result<(u32, usize), RecordError> {
    let mut header_id: u32 = 0;
    loop {
        let mut header = Page::new();
        handle.read_page(header_id, &mut header)?;
        let entry_count = header.read_u32(ENTRY_COUNT_OFFSET) as usize;
        for index in 0..entry_count {
            if header.read_u32(entry_offset(index)) == page_id {
                return Ok((header_id, index));
            }
        }
        let next = header.read_u32(NEXT_HEADER_OFFSET);
        if next == NO_NEXT_HEADER {
            return Err(RecordError::PageNotTracked(page_id));
        }
        header_id = next;
    }
}

pub fn page_free_bytes(handle: &mut FileHandle, page_id: u32) -> Result<u32, RecordError> {
    let (header_id, index) = find_header_entry(handle, page_id)?;
    let mut header = Page::new();
    handle.read_page(header_id, &mut header)?;
    Ok(header.read_u32(entry_offset(index) + 4))
}

pub fn set_page_free_bytes(
    handle: &mut FileHandle,
    page_id: u32,
    free: u32,
) -> Result<(), RecordError> {
    let (header_id, index) = find_header_entry(handle, page_id)?;
    let mut header = Page::new();
    handle.read_page(header_id, &mut header)?;
    header.write_u32(entry_offset(index) + 4, free);
    handle.write_page(header_id, &header)?;
    Ok(())
}

pub fn add_page_free_bytes(
    handle: &mut FileHandle,
    page_id: u32,
    delta: u32,
) -> Result<(), RecordError> {
    let (header_id, index) = find_header_entry(handle, page_id)?;
    let mut header = Page::new();
    handle.read_page(header_id, &mut header)?;
    let at = entry_offset(index) + 4;
    let free = header.read_u32(at);
    header.write_u32(at, free + delta);
    handle.write_page(header_id, &header)?;
    Ok(())
}

/// Page ids of every header page in the chain, in chain order.
pub fn header_page_ids(handle: &mut FileHandle) -> Result<Vec<u32>, RecordError> {
    let mut ids = Vec::new();
    let mut header_id: u32 = 0;
    loop {
        ids.push(header_id);
        let mut header = Page::new();
        handle.read_page(header_id, &mut header)?;
        let next = header.read_u32(NEXT_HEADER_OFFSET);
        if next == NO_NEXT_HEADER {
            return Ok(ids);
        }
        header_id = next;
    }
}

/// Page ids of every registered data page, in registration order.
pub fn data_page_ids(handle: &mut FileHandle) -> Result<Vec<u32>, RecordError> {
    let mut ids = Vec::new();
    let mut header_id: u32 = 0;
    loop {
        let mut header = Page::new();
        handle.read_page(header_id, &mut header)?;
        let entry_count = header.read_u32(ENTRY_COUNT_OFFSET) as usize;
        for index in 0..entry_count {
            ids.push(header.read_u32(entry_offset(index)));
        }
        let next = header.read_u32(NEXT_HEADER_OFFSET);
        if next == NO_NEXT_HEADER {
            return Ok(ids);
        }
        header_id = next;
    }
}
