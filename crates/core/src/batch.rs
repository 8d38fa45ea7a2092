use crate::error::IngestError;
use crate::models::Record;
use crate::traits::FullTextCollection;

/// Buffers records and commits them in fixed-size, all-or-nothing batches.
pub struct BatchWriter<'a, S: FullTextCollection> {
    store: &'a mut S,
    batch_size: usize,
    buffer: Vec<Record>,
    inserted: usize,
    batches: usize,
}

impl<'a, S: FullTextCollection> BatchWriter<'a, S> {
    pub fn new(store: &'a mut S, batch_size: usize) -> Result<Self, IngestError> {
        if batch_size == 0 {
            return Err(IngestError::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            store,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            inserted: 0,
            batches: 0,
        })
    }

    /// Returns the size of the batch committed by this push, if any.
    pub fn push(&mut self, record: Record) -> Result<Option<usize>, IngestError> {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            return self.flush().map(Some);
        }
        Ok(None)
    }

    /// Commits whatever is left below the batch size.
    pub fn finish(&mut self) -> Result<Option<usize>, IngestError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        self.flush().map(Some)
    }

    pub fn inserted(&self) -> usize {
        self.inserted
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn flush(&mut self) -> Result<usize, IngestError> {
        let result = self.store.insert_batch(&self.buffer);
        let size = self.buffer.len();
        self.buffer.clear();
        result.map_err(IngestError::WriteFailed)?;

        self.inserted += size;
        self.batches += 1;
        Ok(size)
    }
}
