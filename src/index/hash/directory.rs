use std::collections::BTreeMap;

use crate::errors::IndexError;
use crate::storage::disk::manager::FileHandle;
use crate::storage::page::page::{page_constants::PAGE_SIZE, Page};

pub mod meta_constants {
    use super::PAGE_SIZE;

    // Meta file layout: page 0 reserved, page 1 the hashing state, pages >= 2
    // the overflow-directory triples.
    pub const STATE_PAGE: u32 = 1;
    pub const FIRST_DIRECTORY_PAGE: u32 = 2;

    pub const N_OFFSET: usize = 0;
    pub const LEVEL_OFFSET: usize = 4;
    pub const NEXT_OFFSET: usize = 8;

    // Directory page: [triple_count:u32][(bucket, order, page_id) ...]
    pub const TRIPLE_COUNT_OFFSET: usize = 0;
    pub const TRIPLES_OFFSET: usize = 4;
    pub const TRIPLE_SIZE: usize = 12;
    pub const TRIPLES_PER_PAGE: usize = (PAGE_SIZE - TRIPLES_OFFSET) / TRIPLE_SIZE;
}

use meta_constants::{
    FIRST_DIRECTORY_PAGE, LEVEL_OFFSET, NEXT_OFFSET, N_OFFSET, STATE_PAGE, TRIPLES_OFFSET,
    TRIPLES_PER_PAGE, TRIPLE_COUNT_OFFSET, TRIPLE_SIZE,
};

/// In-memory hashing state of one index: the initial bucket count `N`, the
/// linear-hashing `Level`/`Next` pair, and the ordered overflow-page chain of
/// every bucket. Persisted to the meta file on close, replayed on open.
#[derive(Debug, Clone)]
pub struct IndexDirectory {
    pub n: u32,
    pub level: u32,
    pub next: u32,
    overflow: BTreeMap<u32, Vec<u32>>,
}

impl IndexDirectory {
    pub fn new(n: u32) -> Self {
        IndexDirectory {
            n,
            level: 0,
            next: 0,
            overflow: BTreeMap::new(),
        }
    }

    /// Buckets currently addressed: the round's base count plus the splits
    /// already performed this round.
    pub fn bucket_count(&self) -> u32 {
        (self.n << self.level) + self.next
    }

    /// Linear-hashing address computation: `h mod N*2^Level`, re-hashed at
    /// the next level when the bucket has already been split this round.
    pub fn bucket_for_hash(&self, hash: u32) -> u32 {
        let modulus = self.n << self.level;
        let bucket = hash % modulus;
        if bucket < self.next {
            hash % (modulus << 1)
        } else {
            bucket
        }
    }

    pub fn overflow_pages(&self, bucket: u32) -> &[u32] {
        self.overflow.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_overflow_pages(&mut self, bucket: u32, pages: Vec<u32>) {
        if pages.is_empty() {
            self.overflow.remove(&bucket);
        } else {
            self.overflow.insert(bucket, pages);
        }
    }

    /// Serializes the state page and repacks every `(bucket, order, page_id)`
    /// triple into directory pages, zeroing any leftover pages from a
    /// previously larger directory.
    pub fn write_meta(&self, meta: &mut FileHandle) -> Result<(), IndexError> {
        let mut state = Page::new();
        state.write_u32(N_OFFSET, self.n);
        state.write_u32(LEVEL_OFFSET, self.level);
        state.write_u32(NEXT_OFFSET, self.next);
        meta.write_page(STATE_PAGE, &state)?;

        let mut triples: Vec<(u32, u32, u32)> = Vec::new();
        for (bucket, pages) in &self.overflow {
            for (order, page_id) in pages.iter().enumerate() {
                triples.push((*bucket, order as u32, *page_id));
            }
        }

        let needed_pages = triples.len().div_ceil(TRIPLES_PER_PAGE);
        for (index, chunk) in triples.chunks(TRIPLES_PER_PAGE).enumerate() {
            let mut page = Page::new();
            page.write_u32(TRIPLE_COUNT_OFFSET, chunk.len() as u32);
            for (slot, (bucket, order, page_id)) in chunk.iter().enumerate() {
                let at = TRIPLES_OFFSET + slot * TRIPLE_SIZE;
                page.write_u32(at, *bucket);
                page.write_u32(at + 4, *order);
                page.write_u32(at + 8, *page_id);
            }
            let page_num = FIRST_DIRECTORY_PAGE + index as u32;
            if page_num < meta.page_count() {
                meta.write_page(page_num, &page)?;
            } else {
                meta.append_page(&page)?;
            }
        }

        // Stale directory pages from an earlier, larger map.
        let empty = Page::new();
        let mut page_num = FIRST_DIRECTORY_PAGE + needed_pages as u32;
        while page_num < meta.page_count() {
            meta.write_page(page_num, &empty)?;
            page_num += 1;
        }
        Ok(())
    }

    pub fn read_meta(meta: &mut FileHandle) -> Result<IndexDirectory, IndexError> {
        let mut state = Page::new();
        meta.read_page(STATE_PAGE, &mut state)?;
        let n = state.read_u32(N_OFFSET);
        if n == 0 {
            return Err(IndexError::DirectoryCorrupt(
                "initial bucket count is zero".to_string(),
            ));
        }
        let mut directory = IndexDirectory::new(n);
        directory.level = state.read_u32(LEVEL_OFFSET);
        directory.next = state.read_u32(NEXT_OFFSET);

        let mut chains: BTreeMap<u32, Vec<(u32, u32)>> = BTreeMap::new();
        for page_num in FIRST_DIRECTORY_PAGE..meta.page_count() {
            let mut page = Page::new();
            meta.read_page(page_num, &mut page)?;
            let count = page.read_u32(TRIPLE_COUNT_OFFSET) as usize;
            if count > TRIPLES_PER_PAGE {
                return Err(IndexError::DirectoryCorrupt(format!(
                    "directory page {} claims {} triples",
                    page_num, count
                )));
            }
            for slot in 0..count {
                let at = TRIPLES_OFFSET + slot * TRIPLE_SIZE;
                let bucket = page.read_u32(at);
                let order = page.read_u32(at + 4);
                let page_id = page.read_u32(at + 8);
                chains.entry(bucket).or_default().push((order, page_id));
            }
        }

        for (bucket, mut chain) in chains {
            chain.sort_by_key(|(order, _)| *order);
            for (expected, (order, _)) in chain.iter().enumerate() {
                if *order != expected as u32 {
                    return Err(IndexError::DirectoryCorrupt(format!(
                        "bucket {} overflow chain is not contiguous",
                        bucket
                    )));
                }
            }
            directory
                .overflow
                .insert(bucket, chain.into_iter().map(|(_, id)| id).collect());
        }
        Ok(directory)
    }
}
