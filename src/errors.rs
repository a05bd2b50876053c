use std::path::PathBuf;

use thiserror::Error;

/// Failures of the paged-file layer. One variant per cause; callers match on
/// the variant instead of inspecting numeric codes.
#[derive(Error, Debug)]
pub enum PagedFileError {
    #[error("file {0:?} already exists")]
    FileExists(PathBuf),
    #[error("file {0:?} not found")]
    FileNotFound(PathBuf),
    #[error("file {0:?} is still open")]
    FileInUse(PathBuf),
    #[error("handle is already bound to {0:?}")]
    HandleInUse(PathBuf),
    #[error("handle is not bound to a file")]
    HandleUnbound,
    #[error("page {page} out of range, file holds {page_count} pages")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("short read at page {page}: {got} bytes")]
    ShortRead { page: u32, got: usize },
    #[error("short write at page {page}: {got} bytes")]
    ShortWrite { page: u32, got: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("record of {size} bytes exceeds the {max}-byte page capacity")]
    RecordTooLarge { size: usize, max: usize },
    #[error("slot {slot} out of range, page {page} holds {slot_count} slots")]
    SlotOutOfRange { page: u32, slot: u32, slot_count: u32 },
    #[error("record at ({page}, {slot}) was deleted")]
    RecordDeleted { page: u32, slot: u32 },
    #[error("tombstone at ({page}, {slot}) points to another tombstone")]
    TombstoneChain { page: u32, slot: u32 },
    #[error("free-space bookkeeping mismatch on page {page}: need {needed} bytes, page holds {actual}")]
    FreeSpaceMismatch { page: u32, needed: u32, actual: u32 },
    #[error("page {0} is not tracked by any header entry")]
    PageNotTracked(u32),
    #[error("record at ({page}, {slot}) cannot be relocated without changing its rid")]
    CannotRelocate { page: u32, slot: u32 },
    #[error("no attribute named {0:?} in the schema")]
    UnknownAttribute(String),
    #[error("value does not match the {0} attribute type")]
    TypeMismatch(&'static str),
    #[error("tuple bytes are truncated or malformed")]
    MalformedTuple,
    #[error(transparent)]
    PagedFile(#[from] PagedFileError),
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("bucket {bucket} out of range, index addresses {buckets} buckets")]
    BucketOutOfRange { bucket: u32, buckets: u32 },
    #[error("virtual page {index} is beyond bucket {bucket}'s data ({pages} pages)")]
    PageBeyondBucket { bucket: u32, index: usize, pages: usize },
    #[error("entry not found in the index")]
    EntryNotFound,
    #[error("key of {0} bytes does not fit a bucket page")]
    KeyTooLarge(usize),
    #[error("index directory is corrupt: {0}")]
    DirectoryCorrupt(String),
    #[error("key does not match the {0} attribute type")]
    KeyTypeMismatch(&'static str),
    #[error(transparent)]
    PagedFile(#[from] PagedFileError),
}
