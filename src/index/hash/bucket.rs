use std::cmp::Ordering;
use std::io::Cursor;

use log::trace;

use crate::catalog::schema::Attribute;
use crate::db_types::value::{DataType, Value};
use crate::errors::IndexError;
use crate::storage::disk::manager::FileHandle;
use crate::storage::page::page::{page_constants::PAGE_SIZE, Page};
use crate::storage::record_file::Rid;

pub mod bucket_constants {
    // Bucket page: [entry_count:u32][reserved:u32][entries ...]
    pub const ENTRY_COUNT_OFFSET: usize = 0;
    pub const ENTRIES_OFFSET: usize = 8;
}

use bucket_constants::{ENTRIES_OFFSET, ENTRY_COUNT_OFFSET};

/// Fixed-size wire codec for one `(key, rid)` index entry. The key field is
/// 4 bytes for Int/Real; for Varchar it is a 4-byte length prefix plus the
/// declared maximum, zero padded, so every entry of a bucket has the same
/// size and entries are addressable by slot.
#[derive(Debug, Clone, Copy)]
pub struct EntryCodec {
    key_type: DataType,
    key_field: usize,
}

impl EntryCodec {
    pub fn for_attribute(attribute: &Attribute) -> Result<EntryCodec, IndexError> {
        let key_field = match attribute.data_type {
            DataType::Int | DataType::Real => 4,
            DataType::Varchar => 4 + attribute.length as usize,
        };
        let codec = EntryCodec {
            key_type: attribute.data_type,
            key_field,
        };
        if codec.max_entries() == 0 {
            return Err(IndexError::KeyTooLarge(key_field));
        }
        Ok(codec)
    }

    pub fn entry_size(&self) -> usize {
        self.key_field + 8
    }

    /// Entries one bucket page can hold after its own metadata.
    pub fn max_entries(&self) -> usize {
        (PAGE_SIZE - ENTRIES_OFFSET) / self.entry_size()
    }

    fn entry_offset(&self, slot: usize) -> usize {
        ENTRIES_OFFSET + slot * self.entry_size()
    }

    pub fn encode_at(&self, page: &mut Page, slot: usize, key: &Value, rid: Rid) {
        let at = self.entry_offset(slot);
        let mut field = vec![0u8; self.key_field];
        match key {
            Value::Int(v) => field[..4].copy_from_slice(&v.to_le_bytes()),
            Value::Real(v) => field[..4].copy_from_slice(&v.to_le_bytes()),
            Value::Varchar(s) => {
                field[..4].copy_from_slice(&(s.len() as u32).to_le_bytes());
                field[4..4 + s.len()].copy_from_slice(s.as_bytes());
            }
        }
        page.write_bytes(at, &field);
        page.write_bytes(at + self.key_field, &rid.to_body());
    }

    pub fn decode_at(&self, page: &Page, slot: usize) -> Result<(Value, Rid), IndexError> {
        let at = self.entry_offset(slot);
        let field = page.bytes(at, self.key_field);
        let mut cursor = Cursor::new(field);
        let key = Value::decode(self.key_type, &mut cursor).map_err(|_| {
            IndexError::DirectoryCorrupt(format!("undecodable entry at slot {}", slot))
        })?;
        let rid = Rid::from_body(page.bytes(at + self.key_field, 8));
        Ok((key, rid))
    }

    fn key_at(&self, page: &Page, slot: usize) -> Result<Value, IndexError> {
        self.decode_at(page, slot).map(|(key, _)| key)
    }

    /// Shifts entries `[from, upto)` one slot toward the end of the page.
    fn shift_right(&self, page: &mut Page, from: usize, upto: usize) {
        if from < upto {
            let start = self.entry_offset(from);
            let end = self.entry_offset(upto);
            page.data
                .copy_within(start..end, start + self.entry_size());
        }
    }

    /// Shifts entries `[from, upto)` one slot toward the start of the page.
    fn shift_left(&self, page: &mut Page, from: usize, upto: usize) {
        if from < upto {
            let start = self.entry_offset(from);
            let end = self.entry_offset(upto);
            page.data
                .copy_within(start..end, start - self.entry_size());
        }
    }
}

fn entry_count(page: &Page) -> usize {
    page.read_u32(ENTRY_COUNT_OFFSET) as usize
}

fn set_entry_count(page: &mut Page, count: usize) {
    page.write_u32(ENTRY_COUNT_OFFSET, count as u32);
}

fn compare_keys(a: &Value, b: &Value) -> Result<Ordering, IndexError> {
    a.compare(b)
        .ok_or_else(|| IndexError::KeyTypeMismatch(b.data_type().name()))
}

/// What a removal did to the bucket, beyond removing the entry.
pub struct RemoveOutcome {
    pub bucket_empty: bool,
    pub dropped_overflow: Option<u32>,
}

/// One bucket viewed as a virtual array of pages: index 0 is the primary
/// page (physical page `bucket + 1` of the primary file), indices >= 1 are
/// overflow pages resolved through the directory's chain.
pub struct Bucket<'a> {
    prim: &'a mut FileHandle,
    over: &'a mut FileHandle,
    bucket: u32,
    overflow: Vec<u32>,
    codec: EntryCodec,
}

impl<'a> Bucket<'a> {
    pub fn new(
        prim: &'a mut FileHandle,
        over: &'a mut FileHandle,
        bucket: u32,
        overflow: Vec<u32>,
        codec: EntryCodec,
    ) -> Self {
        Bucket {
            prim,
            over,
            bucket,
            overflow,
            codec,
        }
    }

    /// Chain after the operation, for writing back into the directory.
    pub fn overflow(&self) -> &[u32] {
        &self.overflow
    }

    pub fn page_count(&self) -> usize {
        1 + self.overflow.len()
    }

    fn load(&mut self, virtual_index: usize) -> Result<Page, IndexError> {
        let mut page = Page::new();
        if virtual_index == 0 {
            self.prim.read_page(self.bucket + 1, &mut page)?;
        } else if virtual_index <= self.overflow.len() {
            self.over
                .read_page(self.overflow[virtual_index - 1], &mut page)?;
        } else {
            return Err(IndexError::PageBeyondBucket {
                bucket: self.bucket,
                index: virtual_index,
                pages: self.page_count(),
            });
        }
        Ok(page)
    }

    fn store(&mut self, virtual_index: usize, page: &Page) -> Result<(), IndexError> {
        if virtual_index == 0 {
            self.prim.write_page(self.bucket + 1, page)?;
        } else if virtual_index <= self.overflow.len() {
            self.over.write_page(self.overflow[virtual_index - 1], page)?;
        } else {
            return Err(IndexError::PageBeyondBucket {
                bucket: self.bucket,
                index: virtual_index,
                pages: self.page_count(),
            });
        }
        Ok(())
    }

    /// All entries of the bucket in virtual-page, then slot order, which is
    /// non-decreasing key order by the insertion invariant.
    pub fn entries(&mut self) -> Result<Vec<(Value, Rid)>, IndexError> {
        let mut all = Vec::new();
        for virtual_index in 0..self.page_count() {
            let page = self.load(virtual_index)?;
            for slot in 0..entry_count(&page) {
                all.push(self.codec.decode_at(&page, slot)?);
            }
        }
        Ok(all)
    }

    pub fn total_entries(&mut self) -> Result<usize, IndexError> {
        let mut total = 0;
        for virtual_index in 0..self.page_count() {
            let page = self.load(virtual_index)?;
            total += entry_count(&page);
        }
        Ok(total)
    }

    /// Global insertion point keeping entries sorted with same-key FIFO
    /// order: binary search across the page array for the last page whose
    /// first key is <= the new key, then an in-page upper bound.
    fn find_insert_slot(&mut self, key: &Value) -> Result<(usize, usize), IndexError> {
        let pages = self.page_count();
        let mut lo: i64 = 0;
        let mut hi: i64 = pages as i64 - 1;
        let mut target: usize = 0;
        while lo <= hi {
            let mid = ((lo + hi) / 2) as usize;
            let page = self.load(mid)?;
            let count = entry_count(&page);
            let qualifies = count > 0
                && compare_keys(&self.codec.key_at(&page, 0)?, key)? != Ordering::Greater;
            if qualifies {
                target = mid;
                lo = mid as i64 + 1;
            } else {
                hi = mid as i64 - 1;
            }
        }

        let page = self.load(target)?;
        let count = entry_count(&page);
        let mut lo = 0usize;
        let mut hi = count;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if compare_keys(&self.codec.key_at(&page, mid)?, key)? == Ordering::Greater {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Ok((target, lo))
    }

    /// Sorted insertion with cascading carry: every full page evicts its
    /// last entry into the next page's first slot, and a carry past the end
    /// of the chain allocates a fresh overflow page. Returns whether a new
    /// overflow page was allocated.
    pub fn insert(&mut self, key: &Value, rid: Rid) -> Result<bool, IndexError> {
        let capacity = self.codec.max_entries();
        let (mut virtual_index, mut at) = self.find_insert_slot(key)?;
        if at == capacity {
            virtual_index += 1;
            at = 0;
        }

        let mut incoming = (key.clone(), rid);
        let mut allocated = false;
        loop {
            if virtual_index == self.page_count() {
                let page_id = self.over.append_page(&Page::new())?;
                self.overflow.push(page_id);
                allocated = true;
                trace!(
                    "bucket {}: allocated overflow page {} (order {})",
                    self.bucket,
                    page_id,
                    self.overflow.len() - 1
                );
            }
            let mut page = self.load(virtual_index)?;
            let count = entry_count(&page);
            if count < capacity {
                self.codec.shift_right(&mut page, at, count);
                self.codec.encode_at(&mut page, at, &incoming.0, incoming.1);
                set_entry_count(&mut page, count + 1);
                self.store(virtual_index, &page)?;
                return Ok(allocated);
            }
            let evicted = self.codec.decode_at(&page, count - 1)?;
            self.codec.shift_right(&mut page, at, count - 1);
            self.codec.encode_at(&mut page, at, &incoming.0, incoming.1);
            self.store(virtual_index, &page)?;
            trace!(
                "bucket {}: carry from virtual page {} to {}",
                self.bucket,
                virtual_index,
                virtual_index + 1
            );
            incoming = evicted;
            virtual_index += 1;
            at = 0;
        }
    }

    /// Position of the first entry with the given key, if any.
    fn find_first_of_key(&mut self, key: &Value) -> Result<Option<(usize, usize)>, IndexError> {
        let pages = self.page_count();
        let mut lo: i64 = 0;
        let mut hi: i64 = pages as i64 - 1;
        let mut target: Option<usize> = None;
        while lo <= hi {
            let mid = ((lo + hi) / 2) as usize;
            let page = self.load(mid)?;
            let count = entry_count(&page);
            let qualifies = count > 0
                && compare_keys(&self.codec.key_at(&page, count - 1)?, key)? != Ordering::Less;
            if qualifies {
                target = Some(mid);
                hi = mid as i64 - 1;
            } else {
                lo = mid as i64 + 1;
            }
        }
        let target = match target {
            Some(t) => t,
            None => return Ok(None),
        };

        let page = self.load(target)?;
        let count = entry_count(&page);
        let mut lo = 0usize;
        let mut hi = count;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if compare_keys(&self.codec.key_at(&page, mid)?, key)? == Ordering::Less {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo == count {
            return Ok(None);
        }
        if compare_keys(&self.codec.key_at(&page, lo)?, key)? != Ordering::Equal {
            return Ok(None);
        }
        Ok(Some((target, lo)))
    }

    /// Removes the entry matching both key and rid, closing the gap with a
    /// backward shift that pulls each following page's first entry up.
    pub fn remove(&mut self, key: &Value, rid: Rid) -> Result<RemoveOutcome, IndexError> {
        let (mut virtual_index, mut slot) = match self.find_first_of_key(key)? {
            Some(position) => position,
            None => return Err(IndexError::EntryNotFound),
        };

        // Walk forward over duplicates until the rid matches.
        loop {
            let page = self.load(virtual_index)?;
            let count = entry_count(&page);
            if slot == count {
                if virtual_index + 1 == self.page_count() {
                    return Err(IndexError::EntryNotFound);
                }
                virtual_index += 1;
                slot = 0;
                continue;
            }
            let (entry_key, entry_rid) = self.codec.decode_at(&page, slot)?;
            match compare_keys(&entry_key, key)? {
                Ordering::Equal => {
                    if entry_rid == rid {
                        break;
                    }
                    slot += 1;
                }
                _ => return Err(IndexError::EntryNotFound),
            }
        }

        let last = self.page_count() - 1;
        let mut dropped_overflow = None;
        let mut page_index = virtual_index;
        let mut remove_at = slot;
        loop {
            let mut page = self.load(page_index)?;
            let count = entry_count(&page);
            self.codec.shift_left(&mut page, remove_at + 1, count);
            if page_index < last {
                let next = self.load(page_index + 1)?;
                if entry_count(&next) > 0 {
                    let (pulled_key, pulled_rid) = self.codec.decode_at(&next, 0)?;
                    self.codec
                        .encode_at(&mut page, count - 1, &pulled_key, pulled_rid);
                    self.store(page_index, &page)?;
                    page_index += 1;
                    remove_at = 0;
                    continue;
                }
            }
            set_entry_count(&mut page, count - 1);
            self.store(page_index, &page)?;
            if count - 1 == 0 && page_index == last && page_index > 0 {
                dropped_overflow = self.overflow.pop();
                trace!(
                    "bucket {}: overflow page {:?} emptied, dropping chain entry",
                    self.bucket,
                    dropped_overflow
                );
            }
            break;
        }

        let bucket_empty = self.total_entries()? == 0;
        Ok(RemoveOutcome {
            bucket_empty,
            dropped_overflow,
        })
    }

    /// Rewrites the whole bucket from a sorted entry list, reusing the
    /// existing chain and growing it only if the list demands it. Chain
    /// pages beyond the rewritten prefix are forgotten, not reclaimed.
    pub fn rewrite(&mut self, entries: &[(Value, Rid)]) -> Result<(), IndexError> {
        let capacity = self.codec.max_entries();
        let needed = entries.len().div_ceil(capacity).max(1);
        while self.page_count() < needed {
            let page_id = self.over.append_page(&Page::new())?;
            self.overflow.push(page_id);
        }
        if entries.is_empty() {
            self.store(0, &Page::new())?;
        }
        for (virtual_index, chunk) in entries.chunks(capacity).enumerate() {
            let mut page = Page::new();
            set_entry_count(&mut page, chunk.len());
            for (slot, (key, rid)) in chunk.iter().enumerate() {
                self.codec.encode_at(&mut page, slot, key, *rid);
            }
            self.store(virtual_index, &page)?;
        }
        self.overflow.truncate(needed - 1);
        Ok(())
    }
}
