use std::path::PathBuf;

use hashlink::LinkedHashMap;
use log::debug;

use crate::catalog::schema::Attribute;
use crate::db_types::value::Value;
use crate::errors::{IndexError, PagedFileError};
use crate::index::hash::bucket::{Bucket, EntryCodec};
use crate::index::hash::directory::IndexDirectory;
use crate::iterators::index_scan::IndexScan;
use crate::storage::disk::manager::{FileHandle, FileManager};
use crate::storage::page::page::Page;
use crate::storage::record_file::Rid;

fn triple_paths(name: &str) -> (PathBuf, PathBuf, PathBuf) {
    (
        PathBuf::from(format!("{}_meta", name)),
        PathBuf::from(format!("{}_prim", name)),
        PathBuf::from(format!("{}_over", name)),
    )
}

/// Creation and open/close of disk-resident hash indexes. Each index is a
/// file triple: metadata, primary buckets, overflow pages. The manager keeps
/// a per-name cache of the reconstructed directory so reopening an index it
/// has already seen skips the meta-page replay.
pub struct IndexManager {
    disk: FileManager,
    directories: LinkedHashMap<String, IndexDirectory>,
}

impl IndexManager {
    pub fn new(disk: FileManager) -> Self {
        IndexManager {
            disk,
            directories: LinkedHashMap::new(),
        }
    }

    pub fn create_file(&mut self, name: &str, buckets: u32) -> Result<(), IndexError> {
        if buckets == 0 {
            return Err(IndexError::DirectoryCorrupt(
                "an index needs at least one primary bucket".to_string(),
            ));
        }
        let (meta_path, prim_path, over_path) = triple_paths(name);
        for path in [&meta_path, &prim_path, &over_path] {
            if path.exists() {
                return Err(PagedFileError::FileExists(path.clone()).into());
            }
        }
        self.disk.create_file(&meta_path)?;
        self.disk.create_file(&prim_path)?;
        self.disk.create_file(&over_path)?;

        let directory = IndexDirectory::new(buckets);

        let mut meta = FileHandle::new();
        self.disk.open_file(&meta_path, &mut meta)?;
        meta.append_page(&Page::new())?; // reserved page 0
        meta.append_page(&Page::new())?; // state page
        directory.write_meta(&mut meta)?;
        self.disk.close_file(&mut meta)?;

        let mut prim = FileHandle::new();
        self.disk.open_file(&prim_path, &mut prim)?;
        prim.append_page(&Page::new())?; // reserved page 0
        for _ in 0..buckets {
            prim.append_page(&Page::new())?;
        }
        self.disk.close_file(&mut prim)?;

        let mut over = FileHandle::new();
        self.disk.open_file(&over_path, &mut over)?;
        over.append_page(&Page::new())?; // reserved page 0
        self.disk.close_file(&mut over)?;

        debug!("created index {:?} with {} primary buckets", name, buckets);
        Ok(())
    }

    pub fn destroy_file(&mut self, name: &str) -> Result<(), IndexError> {
        let (meta_path, prim_path, over_path) = triple_paths(name);
        self.disk.destroy_file(&meta_path)?;
        self.disk.destroy_file(&prim_path)?;
        self.disk.destroy_file(&over_path)?;
        self.directories.remove(name);
        Ok(())
    }

    pub fn open_file(&mut self, name: &str, handle: &mut IndexHandle) -> Result<(), IndexError> {
        let (meta_path, prim_path, over_path) = triple_paths(name);
        self.disk.open_file(&meta_path, &mut handle.meta)?;
        self.disk.open_file(&prim_path, &mut handle.prim)?;
        self.disk.open_file(&over_path, &mut handle.over)?;
        let directory = match self.directories.get(name) {
            Some(cached) => cached.clone(),
            None => {
                let replayed = IndexDirectory::read_meta(&mut handle.meta)?;
                self.directories.insert(name.to_string(), replayed.clone());
                replayed
            }
        };
        handle.name = name.to_string();
        handle.directory = Some(directory);
        Ok(())
    }

    pub fn close_file(&mut self, handle: &mut IndexHandle) -> Result<(), IndexError> {
        let directory = handle
            .directory
            .take()
            .ok_or(PagedFileError::HandleUnbound)?;
        directory.write_meta(&mut handle.meta)?;
        self.directories.insert(handle.name.clone(), directory);
        self.disk.close_file(&mut handle.meta)?;
        self.disk.close_file(&mut handle.prim)?;
        self.disk.close_file(&mut handle.over)?;
        Ok(())
    }
}

/// One open hash index. Entry operations hash the key, resolve the bucket
/// through the directory, and operate on the bucket's virtual page array.
pub struct IndexHandle {
    name: String,
    meta: FileHandle,
    prim: FileHandle,
    over: FileHandle,
    directory: Option<IndexDirectory>,
}

impl IndexHandle {
    pub fn new() -> Self {
        IndexHandle {
            name: String::new(),
            meta: FileHandle::new(),
            prim: FileHandle::new(),
            over: FileHandle::new(),
            directory: None,
        }
    }

    fn directory(&self) -> Result<&IndexDirectory, IndexError> {
        self.directory
            .as_ref()
            .ok_or_else(|| PagedFileError::HandleUnbound.into())
    }

    fn check_key(attribute: &Attribute, key: &Value) -> Result<(), IndexError> {
        if key.data_type() != attribute.data_type {
            return Err(IndexError::KeyTypeMismatch(attribute.data_type.name()));
        }
        if let Value::Varchar(s) = key {
            if s.len() > attribute.length as usize {
                return Err(IndexError::KeyTooLarge(4 + s.len()));
            }
        }
        Ok(())
    }

    /// Type-dispatched hash of a key: crc32 over its wire bytes.
    pub fn hash(attribute: &Attribute, key: &Value) -> Result<u32, IndexError> {
        Self::check_key(attribute, key)?;
        Ok(key.hash_key())
    }

    pub fn primary_page_count(&self) -> Result<u32, IndexError> {
        Ok(self.directory()?.bucket_count())
    }

    pub fn all_page_count(&self) -> u32 {
        self.meta.page_count() + self.prim.page_count() + self.over.page_count()
    }

    pub fn insert_entry(
        &mut self,
        attribute: &Attribute,
        key: &Value,
        rid: Rid,
    ) -> Result<(), IndexError> {
        Self::check_key(attribute, key)?;
        let codec = EntryCodec::for_attribute(attribute)?;
        let directory = self
            .directory
            .as_mut()
            .ok_or(PagedFileError::HandleUnbound)?;
        let bucket_num = directory.bucket_for_hash(key.hash_key());
        let chain = directory.overflow_pages(bucket_num).to_vec();
        let mut bucket = Bucket::new(&mut self.prim, &mut self.over, bucket_num, chain, codec);
        let allocated_overflow = bucket.insert(key, rid)?;
        let chain = bucket.overflow().to_vec();
        directory.set_overflow_pages(bucket_num, chain);
        if allocated_overflow {
            self.split(codec)?;
        }
        Ok(())
    }

    /// Splits the bucket `Next` points to: entries are rehashed one level
    /// up and partitioned between it and a fresh image bucket appended to
    /// the primary file.
    fn split(&mut self, codec: EntryCodec) -> Result<(), IndexError> {
        let directory = self
            .directory
            .as_mut()
            .ok_or(PagedFileError::HandleUnbound)?;
        let target = directory.next;
        let image = directory.bucket_count();

        // A stale page can linger in the primary file after a merge.
        if self.prim.page_count() <= image + 1 {
            self.prim.append_page(&Page::new())?;
        } else {
            self.prim.write_page(image + 1, &Page::new())?;
        }

        let next_modulus = directory.n << (directory.level + 1);
        let chain = directory.overflow_pages(target).to_vec();
        let mut bucket = Bucket::new(&mut self.prim, &mut self.over, target, chain, codec);
        let all = bucket.entries()?;
        let mut stays = Vec::new();
        let mut moves = Vec::new();
        for (key, rid) in all {
            if key.hash_key() % next_modulus == target {
                stays.push((key, rid));
            } else {
                moves.push((key, rid));
            }
        }
        bucket.rewrite(&stays)?;
        let stay_chain = bucket.overflow().to_vec();

        let mut image_bucket = Bucket::new(&mut self.prim, &mut self.over, image, Vec::new(), codec);
        image_bucket.rewrite(&moves)?;
        let image_chain = image_bucket.overflow().to_vec();

        directory.set_overflow_pages(target, stay_chain);
        directory.set_overflow_pages(image, image_chain);
        directory.next += 1;
        if directory.next == directory.n << directory.level {
            directory.next = 0;
            directory.level += 1;
        }
        debug!(
            "split bucket {} into image {}; level {} next {}",
            target, image, directory.level, directory.next
        );
        Ok(())
    }

    pub fn delete_entry(
        &mut self,
        attribute: &Attribute,
        key: &Value,
        rid: Rid,
    ) -> Result<(), IndexError> {
        Self::check_key(attribute, key)?;
        let codec = EntryCodec::for_attribute(attribute)?;
        let directory = self
            .directory
            .as_mut()
            .ok_or(PagedFileError::HandleUnbound)?;
        let bucket_num = directory.bucket_for_hash(key.hash_key());
        let chain = directory.overflow_pages(bucket_num).to_vec();
        let mut bucket = Bucket::new(&mut self.prim, &mut self.over, bucket_num, chain, codec);
        let outcome = bucket.remove(key, rid)?;
        let chain = bucket.overflow().to_vec();
        directory.set_overflow_pages(bucket_num, chain);

        // Merging mirrors splitting: emptying the round's last bucket steps
        // Next back; the image is empty so no data moves.
        if outcome.bucket_empty {
            let last = directory.bucket_count() - 1;
            if bucket_num == last && directory.bucket_count() > directory.n {
                if directory.next > 0 {
                    directory.next -= 1;
                } else {
                    directory.level -= 1;
                    directory.next = (directory.n << directory.level) - 1;
                }
                directory.set_overflow_pages(last, Vec::new());
                debug!(
                    "merged bucket {} away; level {} next {}",
                    last, directory.level, directory.next
                );
            }
        }
        Ok(())
    }

    pub fn scan(
        &mut self,
        attribute: &Attribute,
        low: Option<Value>,
        high: Option<Value>,
        low_inclusive: bool,
        high_inclusive: bool,
    ) -> Result<IndexScan<'_>, IndexError> {
        if let Some(v) = &low {
            Self::check_key(attribute, v)?;
        }
        if let Some(v) = &high {
            Self::check_key(attribute, v)?;
        }
        let codec = EntryCodec::for_attribute(attribute)?;
        let directory = self.directory()?;

        // An equality probe only ever touches the hashed bucket.
        let buckets: Vec<u32> = match (&low, &high) {
            (Some(l), Some(h))
                if low_inclusive
                    && high_inclusive
                    && l.compare(h) == Some(std::cmp::Ordering::Equal) =>
            {
                vec![directory.bucket_for_hash(l.hash_key())]
            }
            _ => (0..directory.bucket_count()).collect(),
        };
        Ok(IndexScan::new(
            self,
            codec,
            buckets,
            low,
            high,
            low_inclusive,
            high_inclusive,
        ))
    }

    pub(crate) fn bucket_entries(
        &mut self,
        bucket_num: u32,
        codec: EntryCodec,
    ) -> Result<Vec<(Value, Rid)>, IndexError> {
        let directory = self
            .directory
            .as_ref()
            .ok_or(PagedFileError::HandleUnbound)?;
        let buckets = directory.bucket_count();
        if bucket_num >= buckets {
            return Err(IndexError::BucketOutOfRange {
                bucket: bucket_num,
                buckets,
            });
        }
        let chain = directory.overflow_pages(bucket_num).to_vec();
        Bucket::new(&mut self.prim, &mut self.over, bucket_num, chain, codec).entries()
    }

    /// The raw `(N, Level, Next)` state, read back from the live directory.
    pub fn hashing_state(&self) -> Result<(u32, u32, u32), IndexError> {
        let directory = self.directory()?;
        Ok((directory.n, directory.level, directory.next))
    }
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new()
    }
}
