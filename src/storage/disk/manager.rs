use std::{
    fs::{File, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use hashlink::LinkedHashMap;
use log::debug;

use crate::errors::PagedFileError;
use crate::storage::page::page::{page_constants::PAGE_SIZE, Page};

/// Handle bound to one open paged file. All I/O is whole pages; the handle
/// tracks how many pages the file holds and counts every read, write and
/// append for instrumentation.
pub struct FileHandle {
    file: Option<File>,
    path: Option<PathBuf>,
    page_count: u32,
    read_count: u32,
    write_count: u32,
    append_count: u32,
}

impl FileHandle {
    pub fn new() -> Self {
        FileHandle {
            file: None,
            path: None,
            page_count: 0,
            read_count: 0,
            write_count: 0,
            append_count: 0,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// (reads, writes, appends) since the handle was bound.
    pub fn collect_counters(&self) -> (u32, u32, u32) {
        (self.read_count, self.write_count, self.append_count)
    }

    fn bound_file(&mut self) -> Result<&mut File, PagedFileError> {
        self.file.as_mut().ok_or(PagedFileError::HandleUnbound)
    }

    fn check_range(&self, page: u32) -> Result<(), PagedFileError> {
        if page >= self.page_count {
            return Err(PagedFileError::PageOutOfRange {
                page,
                page_count: self.page_count,
            });
        }
        Ok(())
    }

    pub fn read_page(&mut self, page: u32, buf: &mut Page) -> Result<(), PagedFileError> {
        if !self.is_bound() {
            return Err(PagedFileError::HandleUnbound);
        }
        self.check_range(page)?;
        let file = self.bound_file()?;
        file.seek(SeekFrom::Start(page as u64 * PAGE_SIZE as u64))?;
        let got = file.read(&mut buf.data)?;
        if got != PAGE_SIZE {
            return Err(PagedFileError::ShortRead { page, got });
        }
        self.read_count += 1;
        Ok(())
    }

    pub fn write_page(&mut self, page: u32, buf: &Page) -> Result<(), PagedFileError> {
        if !self.is_bound() {
            return Err(PagedFileError::HandleUnbound);
        }
        self.check_range(page)?;
        let file = self.bound_file()?;
        file.seek(SeekFrom::Start(page as u64 * PAGE_SIZE as u64))?;
        let got = file.write(&buf.data)?;
        if got != PAGE_SIZE {
            return Err(PagedFileError::ShortWrite { page, got });
        }
        self.write_count += 1;
        Ok(())
    }

    /// Appends a page at the end of the file and returns its page number.
    pub fn append_page(&mut self, buf: &Page) -> Result<u32, PagedFileError> {
        if !self.is_bound() {
            return Err(PagedFileError::HandleUnbound);
        }
        let page = self.page_count;
        let file = self.bound_file()?;
        file.seek(SeekFrom::Start(page as u64 * PAGE_SIZE as u64))?;
        let got = file.write(&buf.data)?;
        if got != PAGE_SIZE {
            return Err(PagedFileError::ShortWrite { page, got });
        }
        self.page_count += 1;
        self.append_count += 1;
        Ok(page)
    }
}

impl Default for FileHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Creation, deletion, opening and closing of paged files. Explicitly
/// constructed and passed around; keeps a per-name open count so a file
/// cannot be destroyed while any handle is bound to it.
pub struct FileManager {
    open_files: LinkedHashMap<PathBuf, u32>,
}

impl FileManager {
    pub fn new() -> Self {
        FileManager {
            open_files: LinkedHashMap::new(),
        }
    }

    pub fn create_file(&mut self, path: &Path) -> Result<(), PagedFileError> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => {
                debug!("created paged file {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(PagedFileError::FileExists(path.to_path_buf()))
            }
            Err(e) => Err(PagedFileError::Io(e)),
        }
    }

    pub fn destroy_file(&mut self, path: &Path) -> Result<(), PagedFileError> {
        if self.open_count(path) > 0 {
            return Err(PagedFileError::FileInUse(path.to_path_buf()));
        }
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!("destroyed paged file {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(PagedFileError::FileNotFound(path.to_path_buf()))
            }
            Err(e) => Err(PagedFileError::Io(e)),
        }
    }

    pub fn open_file(&mut self, path: &Path, handle: &mut FileHandle) -> Result<(), PagedFileError> {
        if let Some(bound) = &handle.path {
            return Err(PagedFileError::HandleInUse(bound.clone()));
        }
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PagedFileError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(PagedFileError::Io(e)),
        };
        let len = file.metadata()?.len();
        handle.page_count = (len / PAGE_SIZE as u64) as u32;
        handle.file = Some(file);
        handle.path = Some(path.to_path_buf());
        handle.read_count = 0;
        handle.write_count = 0;
        handle.append_count = 0;

        let count = self.open_files.entry(path.to_path_buf()).or_insert(0);
        *count += 1;
        debug!("opened {:?}, {} pages", path, handle.page_count);
        Ok(())
    }

    pub fn close_file(&mut self, handle: &mut FileHandle) -> Result<(), PagedFileError> {
        let path = handle.path.take().ok_or(PagedFileError::HandleUnbound)?;
        handle.file = None;
        let (reads, writes, appends) = handle.collect_counters();
        debug!(
            "closed {:?}: {} reads, {} writes, {} appends",
            path, reads, writes, appends
        );
        if let Some(count) = self.open_files.get_mut(&path) {
            *count -= 1;
            if *count == 0 {
                self.open_files.remove(&path);
            }
        }
        Ok(())
    }

    pub fn open_count(&self, path: &Path) -> u32 {
        self.open_files.get(path).copied().unwrap_or(0)
    }
}

impl Default for FileManager {
    fn default() -> Self {
        Self::new()
    }
}
