use std::path::{Path, PathBuf};

use log::debug;

use crate::catalog::schema::Schema;
use crate::db_types::value::Value;
use crate::errors::RecordError;
use crate::iterators::record_scan::{RecordScan, ScanPredicate};
use crate::storage::disk::manager::{FileHandle, FileManager};
use crate::storage::page::page::{
    page_constants::{
        MAX_RECORD_SIZE, PAGE_FOOTER_SIZE, PAGE_SIZE, SLOT_ENTRY_SIZE, TOMBSTONE_MARK,
        TOMBSTONE_SIZE,
    },
    Page,
};
use crate::storage::page::slotted::{Slot, SlottedPage};
use crate::storage::page_directory;
use crate::storage::tuple;

/// Record identifier, stable across in-place updates. An update that moves
/// the payload leaves a tombstone behind; readers follow it transparently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    pub page: u32,
    pub slot: u32,
}

impl Rid {
    pub(crate) fn from_body(body: &[u8]) -> Rid {
        let page = u32::from_le_bytes([body[0], body[1], body[2], body[3]]);
        let slot = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
        Rid { page, slot }
    }

    pub(crate) fn to_body(self) -> [u8; TOMBSTONE_SIZE] {
        let mut body = [0u8; TOMBSTONE_SIZE];
        body[..4].copy_from_slice(&self.page.to_le_bytes());
        body[4..].copy_from_slice(&self.slot.to_le_bytes());
        body
    }
}

/// Creation and open/close of record files. Owns the paged-file manager it
/// was constructed with; tests build their own instance.
pub struct RecordFileManager {
    disk: FileManager,
}

impl RecordFileManager {
    pub fn new(disk: FileManager) -> Self {
        RecordFileManager { disk }
    }

    pub fn create_file(&mut self, path: &Path) -> Result<(), RecordError> {
        self.disk.create_file(path)?;
        let mut handle = FileHandle::new();
        self.disk.open_file(path, &mut handle)?;
        let result = page_directory::init_first_header(&mut handle);
        self.disk.close_file(&mut handle)?;
        result
    }

    pub fn destroy_file(&mut self, path: &Path) -> Result<(), RecordError> {
        self.disk.destroy_file(path)?;
        Ok(())
    }

    pub fn open_file(
        &mut self,
        path: &Path,
        handle: &mut RecordFileHandle,
    ) -> Result<(), RecordError> {
        self.disk.open_file(path, &mut handle.file)?;
        Ok(())
    }

    pub fn close_file(&mut self, handle: &mut RecordFileHandle) -> Result<(), RecordError> {
        self.disk.close_file(&mut handle.file)?;
        Ok(())
    }

    /// Full-file compaction: copies every live record (forwarded records
    /// once) into a scratch file, resets this file's pages, and reinserts.
    /// Unlike `reorganize_page` this is allowed to move records across
    /// pages, so rids are not preserved.
    pub fn reorganize_file(
        &mut self,
        handle: &mut RecordFileHandle,
        schema: &Schema,
    ) -> Result<(), RecordError> {
        let path = handle
            .file
            .path()
            .ok_or(crate::errors::PagedFileError::HandleUnbound)?
            .to_path_buf();
        let mut scratch_path = PathBuf::from(&path);
        scratch_path.set_extension("reorg");

        self.create_file(&scratch_path)?;
        let mut scratch = RecordFileHandle::new();
        self.open_file(&scratch_path, &mut scratch)?;

        let result = copy_live_records(handle, &mut scratch, schema);

        // Scratch cleanup happens on every path.
        let copy_back = result.and_then(|_| {
            handle.delete_records()?;
            let mut scan = scratch.scan(schema, None)?;
            while let Some((_, data)) = scan.next_record()? {
                handle.insert_record(schema, &data)?;
            }
            Ok(())
        });
        self.close_file(&mut scratch)?;
        self.destroy_file(&scratch_path)?;
        copy_back
    }
}

fn copy_live_records(
    handle: &mut RecordFileHandle,
    scratch: &mut RecordFileHandle,
    schema: &Schema,
) -> Result<(), RecordError> {
    // A forwarded record is visited twice: through its tombstone and at its
    // physical slot. Tracking physical locations migrates it exactly once.
    let mut migrated = std::collections::HashSet::new();
    let mut scan = handle.scan(schema, None)?;
    let mut records = Vec::new();
    while let Some((rid, data)) = scan.next_record()? {
        let physical = scan.actual_rid();
        let physical = if physical == (Rid { page: 0, slot: 0 }) {
            rid
        } else {
            physical
        };
        if migrated.insert(physical) {
            records.push(data);
        }
    }
    drop(scan);
    for data in records {
        scratch.insert_record(schema, &data)?;
    }
    Ok(())
}

/// Handle over one open record file; every operation is a sequential
/// read-modify-write of whole pages.
pub struct RecordFileHandle {
    file: FileHandle,
}

impl RecordFileHandle {
    pub fn new() -> Self {
        RecordFileHandle {
            file: FileHandle::new(),
        }
    }

    pub(crate) fn file(&mut self) -> &mut FileHandle {
        &mut self.file
    }

    pub fn page_count(&self) -> u32 {
        self.file.page_count()
    }

    pub fn insert_record(&mut self, schema: &Schema, data: &[u8]) -> Result<Rid, RecordError> {
        let size = tuple::wire_size(schema, data)?;
        if size > MAX_RECORD_SIZE {
            return Err(RecordError::RecordTooLarge {
                size,
                max: MAX_RECORD_SIZE,
            });
        }
        let page_id = page_directory::get_data_page(&mut self.file, size)?;
        let mut page = Page::new();
        self.file.read_page(page_id, &mut page)?;
        let slot_num = page.find_record_slot(page_id, size)?;
        let slot = page.slot(page_id, slot_num)?;
        page.write_record(slot, data);
        self.file.write_page(page_id, &page)?;
        Ok(Rid {
            page: page_id,
            slot: slot_num,
        })
    }

    pub fn read_record(&mut self, rid: Rid) -> Result<Vec<u8>, RecordError> {
        self.read_record_at(rid).map(|(data, _)| data)
    }

    /// Reads the record and reports the physical location of its payload,
    /// which differs from `rid` exactly when a tombstone was followed.
    pub(crate) fn read_record_at(&mut self, rid: Rid) -> Result<(Vec<u8>, Rid), RecordError> {
        let mut page = Page::new();
        self.file.read_page(rid.page, &mut page)?;
        let slot = page.slot(rid.page, rid.slot)?;
        if slot.is_free() {
            return Err(RecordError::RecordDeleted {
                page: rid.page,
                slot: rid.slot,
            });
        }
        if !slot.is_tombstone() {
            let data = page.record_bytes(rid.page, rid.slot)?.to_vec();
            return Ok((data, rid));
        }

        let target = Rid::from_body(page.bytes(slot.offset as usize, TOMBSTONE_SIZE));
        let mut target_page = Page::new();
        self.file.read_page(target.page, &mut target_page)?;
        let target_slot = target_page.slot(target.page, target.slot)?;
        if target_slot.is_free() {
            return Err(RecordError::RecordDeleted {
                page: target.page,
                slot: target.slot,
            });
        }
        if target_slot.is_tombstone() {
            return Err(RecordError::TombstoneChain {
                page: target.page,
                slot: target.slot,
            });
        }
        let data = target_page.record_bytes(target.page, target.slot)?.to_vec();
        Ok((data, target))
    }

    pub fn update_record(
        &mut self,
        schema: &Schema,
        rid: Rid,
        data: &[u8],
    ) -> Result<(), RecordError> {
        let size = tuple::wire_size(schema, data)?;
        if size > MAX_RECORD_SIZE {
            return Err(RecordError::RecordTooLarge {
                size,
                max: MAX_RECORD_SIZE,
            });
        }

        let mut page = Page::new();
        self.file.read_page(rid.page, &mut page)?;
        let slot = page.slot(rid.page, rid.slot)?;
        if slot.is_free() {
            return Err(RecordError::RecordDeleted {
                page: rid.page,
                slot: rid.slot,
            });
        }

        if slot.is_tombstone() {
            // The update replaces the relocated payload, never the
            // tombstone itself, so indirection chains stay at length one.
            let target = Rid::from_body(page.bytes(slot.offset as usize, TOMBSTONE_SIZE));
            let mut target_page = Page::new();
            self.file.read_page(target.page, &mut target_page)?;
            let target_slot = target_page.slot(target.page, target.slot)?;
            if target_slot.is_free() {
                return Err(RecordError::RecordDeleted {
                    page: target.page,
                    slot: target.slot,
                });
            }
            if target_slot.is_tombstone() {
                return Err(RecordError::TombstoneChain {
                    page: target.page,
                    slot: target.slot,
                });
            }
            if size == target_slot.size as usize {
                target_page.write_record(target_slot, data);
                self.file.write_page(target.page, &target_page)?;
                return Ok(());
            }
            self.delete_physical(target)?;
            let new_rid = self.insert_record(schema, data)?;
            let mut page = Page::new();
            self.file.read_page(rid.page, &mut page)?;
            let slot = page.slot(rid.page, rid.slot)?;
            page.write_bytes(slot.offset as usize, &new_rid.to_body());
            self.file.write_page(rid.page, &page)?;
            debug!("re-forwarded ({}, {}) to {:?}", rid.page, rid.slot, new_rid);
            return Ok(());
        }

        if size == slot.size as usize {
            page.write_record(slot, data);
            self.file.write_page(rid.page, &page)?;
            return Ok(());
        }

        // The slot must be able to host an 8-byte forwarding pair; the
        // layer refuses to relocate a record under its caller-visible rid.
        if (slot.size as usize) < TOMBSTONE_SIZE {
            return Err(RecordError::CannotRelocate {
                page: rid.page,
                slot: rid.slot,
            });
        }

        // Shrink the body to tombstone size and compact, reclaiming the
        // difference, before the new payload is placed anywhere.
        page.set_slot(
            rid.slot,
            Slot {
                offset: slot.offset,
                size: TOMBSTONE_SIZE as u32,
            },
        );
        page.reorganize();
        self.file.write_page(rid.page, &page)?;
        page_directory::set_page_free_bytes(&mut self.file, rid.page, page.free_bytes())?;

        let new_rid = self.insert_record(schema, data)?;

        let mut page = Page::new();
        self.file.read_page(rid.page, &mut page)?;
        let slot = page.slot(rid.page, rid.slot)?;
        page.write_bytes(slot.offset as usize, &new_rid.to_body());
        page.set_slot(
            rid.slot,
            Slot {
                offset: slot.offset,
                size: TOMBSTONE_MARK,
            },
        );
        self.file.write_page(rid.page, &page)?;
        debug!("forwarded ({}, {}) to {:?}", rid.page, rid.slot, new_rid);
        Ok(())
    }

    pub fn delete_record(&mut self, rid: Rid) -> Result<(), RecordError> {
        let mut page = Page::new();
        self.file.read_page(rid.page, &mut page)?;
        let slot = page.slot(rid.page, rid.slot)?;
        if slot.is_free() {
            return Err(RecordError::RecordDeleted {
                page: rid.page,
                slot: rid.slot,
            });
        }
        if slot.is_tombstone() {
            let target = Rid::from_body(page.bytes(slot.offset as usize, TOMBSTONE_SIZE));
            self.delete_physical(target)?;
        }
        self.delete_physical(rid)
    }

    /// Zeroes one slot. Only the directory entry's bytes are credited back
    /// to the header; the body is reclaimed by a later reorganize.
    fn delete_physical(&mut self, rid: Rid) -> Result<(), RecordError> {
        let mut page = Page::new();
        self.file.read_page(rid.page, &mut page)?;
        let slot = page.slot(rid.page, rid.slot)?;
        if slot.is_free() {
            return Err(RecordError::RecordDeleted {
                page: rid.page,
                slot: rid.slot,
            });
        }
        page.delete_slot(rid.slot);
        self.file.write_page(rid.page, &page)?;
        page_directory::add_page_free_bytes(&mut self.file, rid.page, SLOT_ENTRY_SIZE as u32)
    }

    /// Clears every record: resets each data page to an empty slotted page
    /// and restores its header entry to the full free-byte count.
    pub fn delete_records(&mut self) -> Result<(), RecordError> {
        let data_pages = page_directory::data_page_ids(&mut self.file)?;
        let empty = Page::new();
        for page_id in data_pages {
            self.file.write_page(page_id, &empty)?;
            page_directory::set_page_free_bytes(
                &mut self.file,
                page_id,
                (PAGE_SIZE - PAGE_FOOTER_SIZE) as u32,
            )?;
        }
        Ok(())
    }

    pub fn read_attribute(
        &mut self,
        schema: &Schema,
        rid: Rid,
        attribute_name: &str,
    ) -> Result<Value, RecordError> {
        let (index, _) = schema
            .attribute(attribute_name)
            .ok_or_else(|| RecordError::UnknownAttribute(attribute_name.to_string()))?;
        let data = self.read_record(rid)?;
        tuple::read_field(schema, &data, index)
    }

    /// In-page compaction; slot numbers (and therefore rids) are unchanged.
    pub fn reorganize_page(&mut self, page_id: u32) -> Result<(), RecordError> {
        let mut page = Page::new();
        self.file.read_page(page_id, &mut page)?;
        page.reorganize();
        self.file.write_page(page_id, &page)?;
        let actual = page.free_bytes();
        if page_directory::page_free_bytes(&mut self.file, page_id)? != actual {
            page_directory::set_page_free_bytes(&mut self.file, page_id, actual)?;
        }
        Ok(())
    }

    pub fn scan<'a>(
        &'a mut self,
        schema: &'a Schema,
        predicate: Option<ScanPredicate>,
    ) -> Result<RecordScan<'a>, RecordError> {
        RecordScan::new(self, schema, predicate)
    }
}

impl Default for RecordFileHandle {
    fn default() -> Self {
        Self::new()
    }
}
