use std::cmp::Ordering;

use crate::db_types::value::Value;
use crate::errors::IndexError;
use crate::index::hash::bucket::EntryCodec;
use crate::index::hash::manager::IndexHandle;
use crate::storage::record_file::Rid;

/// Range scan over a hash index. Buckets are visited in bucket order and
/// each bucket's entries come back in key order, so results are sorted
/// within a bucket but not globally. An equality scan visits only the
/// bucket the key hashes to.
pub struct IndexScan<'a> {
    handle: &'a mut IndexHandle,
    codec: EntryCodec,
    buckets: Vec<u32>,
    bucket_index: usize,
    current: Vec<(Value, Rid)>,
    position: usize,
    low: Option<Value>,
    high: Option<Value>,
    low_inclusive: bool,
    high_inclusive: bool,
}

impl<'a> IndexScan<'a> {
    pub(crate) fn new(
        handle: &'a mut IndexHandle,
        codec: EntryCodec,
        buckets: Vec<u32>,
        low: Option<Value>,
        high: Option<Value>,
        low_inclusive: bool,
        high_inclusive: bool,
    ) -> Self {
        IndexScan {
            handle,
            codec,
            buckets,
            bucket_index: 0,
            current: Vec::new(),
            position: 0,
            low,
            high,
            low_inclusive,
            high_inclusive,
        }
    }

    fn in_range(&self, key: &Value) -> bool {
        if let Some(low) = &self.low {
            match key.compare(low) {
                Some(Ordering::Less) => return false,
                Some(Ordering::Equal) if !self.low_inclusive => return false,
                _ => {}
            }
        }
        if let Some(high) = &self.high {
            match key.compare(high) {
                Some(Ordering::Greater) => return false,
                Some(Ordering::Equal) if !self.high_inclusive => return false,
                _ => {}
            }
        }
        true
    }

    pub fn next_entry(&mut self) -> Result<Option<(Value, Rid)>, IndexError> {
        loop {
            if self.position < self.current.len() {
                let (key, rid) = self.current[self.position].clone();
                self.position += 1;
                // Entries are sorted, so once past the high bound the rest
                // of this bucket cannot match either.
                if let Some(high) = &self.high {
                    if key.compare(high) == Some(Ordering::Greater) {
                        self.position = self.current.len();
                        continue;
                    }
                }
                if self.in_range(&key) {
                    return Ok(Some((key, rid)));
                }
                continue;
            }
            let Some(&bucket) = self.buckets.get(self.bucket_index) else {
                return Ok(None);
            };
            self.bucket_index += 1;
            self.current = self.handle.bucket_entries(bucket, self.codec)?;
            self.position = 0;
        }
    }
}
