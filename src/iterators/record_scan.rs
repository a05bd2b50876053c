use crate::catalog::schema::Schema;
use crate::db_types::value::{CompOp, Value};
use crate::errors::{PagedFileError, RecordError};
use crate::storage::page_directory;
use crate::storage::record_file::{RecordFileHandle, Rid};
use crate::storage::tuple;

/// Optional filter applied by the record scan, evaluated field-by-field
/// against the schema.
#[derive(Debug, Clone)]
pub struct ScanPredicate {
    pub attribute: String,
    pub op: CompOp,
    pub value: Value,
}

/// Single-pass forward cursor over every `(page, slot)` of a record file.
/// Slot exhaustion advances to the next page; page exhaustion freezes the
/// cursor at end-of-scan. Restart by creating a new scan.
pub struct RecordScan<'a> {
    handle: &'a mut RecordFileHandle,
    schema: &'a Schema,
    predicate: Option<ScanPredicate>,
    predicate_index: usize,
    // Later header pages land between data pages in the page-number space;
    // their ids are collected up front so the cursor can step over them.
    header_pages: Vec<u32>,
    page: u32,
    slot: u32,
    done: bool,
    actual: Option<Rid>,
}

impl<'a> RecordScan<'a> {
    pub(crate) fn new(
        handle: &'a mut RecordFileHandle,
        schema: &'a Schema,
        predicate: Option<ScanPredicate>,
    ) -> Result<Self, RecordError> {
        let predicate_index = match &predicate {
            Some(p) => {
                let (index, attribute) = schema
                    .attribute(&p.attribute)
                    .ok_or_else(|| RecordError::UnknownAttribute(p.attribute.clone()))?;
                if p.op != CompOp::NoOp && p.value.data_type() != attribute.data_type {
                    return Err(RecordError::TypeMismatch(attribute.data_type.name()));
                }
                index
            }
            None => 0,
        };
        let header_pages = page_directory::header_page_ids(handle.file())?;
        Ok(RecordScan {
            handle,
            schema,
            predicate,
            predicate_index,
            header_pages,
            page: 1,
            slot: 0,
            done: false,
            actual: None,
        })
    }

    /// Physical location of the most recently returned record: the
    /// forwarding target when it was reached through a tombstone, otherwise
    /// its own rid. `(0, 0)` when nothing has been returned.
    pub fn actual_rid(&self) -> Rid {
        self.actual.unwrap_or(Rid { page: 0, slot: 0 })
    }

    pub fn next_record(&mut self) -> Result<Option<(Rid, Vec<u8>)>, RecordError> {
        if self.done {
            return Ok(None);
        }
        loop {
            if self.header_pages.contains(&self.page) {
                self.page += 1;
                self.slot = 0;
                continue;
            }
            let rid = Rid {
                page: self.page,
                slot: self.slot,
            };
            match self.handle.read_record_at(rid) {
                Ok((data, actual)) => {
                    self.slot += 1;
                    if self.matches(&data)? {
                        self.actual = Some(actual);
                        return Ok(Some((rid, data)));
                    }
                }
                Err(RecordError::RecordDeleted { .. }) => {
                    self.slot += 1;
                }
                Err(RecordError::SlotOutOfRange { .. }) => {
                    self.page += 1;
                    self.slot = 0;
                }
                Err(RecordError::PagedFile(PagedFileError::PageOutOfRange { .. })) => {
                    self.done = true;
                    self.actual = None;
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn matches(&self, data: &[u8]) -> Result<bool, RecordError> {
        let predicate = match &self.predicate {
            None => return Ok(true),
            Some(p) => p,
        };
        if predicate.op == CompOp::NoOp {
            return Ok(true);
        }
        let field = tuple::read_field(self.schema, data, self.predicate_index)?;
        let ordering = match field.compare(&predicate.value) {
            Some(o) => o,
            None => {
                return Err(RecordError::TypeMismatch(
                    predicate.value.data_type().name(),
                ))
            }
        };
        Ok(predicate.op.matches(ordering))
    }
}
