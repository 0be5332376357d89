use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("batch not found: {id}")]
    BatchNotFound { id: String },

    #[error("unit {unit_id} not found in batch {batch_id}")]
    UnitNotFound { batch_id: String, unit_id: String },

    #[error("storage backend error: {message}")]
    Backend { message: String },
}
