//! Chunked payload upload.
//!
//! [`UploadSession`] coordinates the protocol; [`BlockTransport`] moves bytes
//! to blob storage. Both waits on server state share
//! [`wait_for_upload_state`].

mod block;
mod poll;
mod session;
mod state;
mod transport;

pub use block::{Block, MAX_BLOCKS, block_count, block_id, split_blocks};
pub use poll::{PollSettings, wait_for_upload_state};
pub use session::{UploadOutcome, UploadReport, UploadSession};
pub use state::{FILE_COMMITTED_TAG, STORAGE_READY_TAG, StateClass, StateTarget, UploadPhase};
pub use transport::{
    AzureBlobTransport, BLOB_TYPE_HEADER, BlockTransport, block_list_url, block_list_xml,
    block_url,
};
