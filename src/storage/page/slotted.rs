use crate::errors::RecordError;

use super::page::{
    page_constants::{
        FREE_SPACE_OFFSET_OFFSET, PAGE_FOOTER_SIZE, PAGE_SIZE, SLOT_COUNT_OFFSET,
        SLOT_DIRECTORY_END, SLOT_ENTRY_SIZE, TOMBSTONE_MARK, TOMBSTONE_SIZE,
    },
    Page,
};

/// One slot directory entry. `(0, 0)` marks a freed slot; a size equal to
/// `TOMBSTONE_MARK` means the body at `offset` is a forwarding (page, slot)
/// pair rather than a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub offset: u32,
    pub size: u32,
}

impl Slot {
    pub fn is_free(&self) -> bool {
        self.offset == 0 && self.size == 0
    }

    pub fn is_tombstone(&self) -> bool {
        self.size == TOMBSTONE_MARK
    }

    /// Byte length of the body stored for this slot.
    pub fn body_len(&self) -> usize {
        if self.is_tombstone() {
            TOMBSTONE_SIZE
        } else {
            self.size as usize
        }
    }
}

/// Slotted layout over a raw [`Page`]: record bodies packed from offset 0,
/// the slot directory growing backward from the footer, free space between.
pub trait SlottedPage {
    fn slot_count(&self) -> u32;
    fn free_space_offset(&self) -> u32;
    fn free_bytes(&self) -> u32;

    fn slot(&self, page_num: u32, slot_num: u32) -> Result<Slot, RecordError>;
    fn set_slot(&mut self, slot_num: u32, slot: Slot);

    /// Reuses a freed directory entry or grows the directory by one, assigns
    /// the body region at the current free-space offset, and returns the
    /// slot number. Fails when the page does not actually have the room its
    /// caller was promised.
    fn find_record_slot(&mut self, page_num: u32, record_size: usize) -> Result<u32, RecordError>;

    fn record_bytes(&self, page_num: u32, slot_num: u32) -> Result<&[u8], RecordError>;
    fn write_record(&mut self, slot: Slot, data: &[u8]);
    fn delete_slot(&mut self, slot_num: u32);

    /// Repacks live bodies contiguously from offset 0 while keeping slot
    /// numbers fixed. Idempotent.
    fn reorganize(&mut self);
}

fn slot_entry_offset(slot_num: u32) -> usize {
    SLOT_DIRECTORY_END - (slot_num as usize + 1) * SLOT_ENTRY_SIZE
}

impl SlottedPage for Page {
    fn slot_count(&self) -> u32 {
        self.read_u32(SLOT_COUNT_OFFSET)
    }

    fn free_space_offset(&self) -> u32 {
        self.read_u32(FREE_SPACE_OFFSET_OFFSET)
    }

    fn free_bytes(&self) -> u32 {
        let used = self.free_space_offset() as usize
            + self.slot_count() as usize * SLOT_ENTRY_SIZE
            + PAGE_FOOTER_SIZE;
        (PAGE_SIZE - used) as u32
    }

    fn slot(&self, page_num: u32, slot_num: u32) -> Result<Slot, RecordError> {
        let slot_count = self.slot_count();
        if slot_num >= slot_count {
            return Err(RecordError::SlotOutOfRange {
                page: page_num,
                slot: slot_num,
                slot_count,
            });
        }
        let at = slot_entry_offset(slot_num);
        Ok(Slot {
            offset: self.read_u32(at),
            size: self.read_u32(at + 4),
        })
    }

    fn set_slot(&mut self, slot_num: u32, slot: Slot) {
        let at = slot_entry_offset(slot_num);
        self.write_u32(at, slot.offset);
        self.write_u32(at + 4, slot.size);
    }

    fn find_record_slot(&mut self, page_num: u32, record_size: usize) -> Result<u32, RecordError> {
        let slot_count = self.slot_count();
        let mut chosen: Option<u32> = None;
        for slot_num in 0..slot_count {
            if self.slot(page_num, slot_num)?.is_free() {
                chosen = Some(slot_num);
                break;
            }
        }

        let grows_directory = chosen.is_none();
        let needed = record_size + if grows_directory { SLOT_ENTRY_SIZE } else { 0 };
        let actual = self.free_bytes();
        if (actual as usize) < needed {
            return Err(RecordError::FreeSpaceMismatch {
                page: page_num,
                needed: needed as u32,
                actual,
            });
        }

        let slot_num = match chosen {
            Some(n) => n,
            None => {
                self.write_u32(SLOT_COUNT_OFFSET, slot_count + 1);
                slot_count
            }
        };

        let offset = self.free_space_offset();
        self.set_slot(
            slot_num,
            Slot {
                offset,
                size: record_size as u32,
            },
        );
        self.write_u32(FREE_SPACE_OFFSET_OFFSET, offset + record_size as u32);
        Ok(slot_num)
    }

    fn record_bytes(&self, page_num: u32, slot_num: u32) -> Result<&[u8], RecordError> {
        let slot = self.slot(page_num, slot_num)?;
        if slot.is_free() {
            return Err(RecordError::RecordDeleted {
                page: page_num,
                slot: slot_num,
            });
        }
        Ok(self.bytes(slot.offset as usize, slot.body_len()))
    }

    fn write_record(&mut self, slot: Slot, data: &[u8]) {
        self.write_bytes(slot.offset as usize, data);
    }

    fn delete_slot(&mut self, slot_num: u32) {
        self.set_slot(slot_num, Slot { offset: 0, size: 0 });
    }

    fn reorganize(&mut self) {
        let slot_count = self.slot_count();
        let mut packed = [0u8; PAGE_SIZE];
        let mut pack_offset: usize = 0;

        // Walk from the last slot to the first; directory entries are
        // rewritten in place so slot numbers stay stable.
        for slot_num in (0..slot_count).rev() {
            let at = slot_entry_offset(slot_num);
            let slot = Slot {
                offset: self.read_u32(at),
                size: self.read_u32(at + 4),
            };
            if slot.is_free() {
                continue;
            }
            let len = slot.body_len();
            packed[pack_offset..pack_offset + len]
                .copy_from_slice(self.bytes(slot.offset as usize, len));
            self.write_u32(at, pack_offset as u32);
            pack_offset += len;
        }

        self.data[..pack_offset].copy_from_slice(&packed[..pack_offset]);
        // Everything between the packed bodies and the directory is free.
        let directory_start = SLOT_DIRECTORY_END - slot_count as usize * SLOT_ENTRY_SIZE;
        for byte in &mut self.data[pack_offset..directory_start] {
            *byte = 0;
        }
        self.write_u32(FREE_SPACE_OFFSET_OFFSET, pack_offset as u32);
    }
}
