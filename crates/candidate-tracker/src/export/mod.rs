//! Bulk export of tabular data to CSV, Excel workbooks and PDF documents.
//!
//! Rows reach the encoders through a [`RowSource`], either a materialized list
//! or a paged query. The [`ExportOrchestrator`] checks the configured
//! [`FormatLimits`], encodes in fixed-size chunks and parks the finished
//! [`ExportArtifact`] in the [`ResultStore`] until it expires.

pub mod clock;
pub mod encoders;
pub mod error;
pub mod format;
pub mod orchestrator;
pub mod source;
pub mod store;
pub mod value;

pub use clock::{Clock, ManualClock, SystemClock};
pub use encoders::{EncodedOutput, Encoder, FormatEncoder};
pub use error::{ExportError, SourceError};
pub use format::{ExportFormat, FormatLimits};
pub use orchestrator::{ExportOrchestrator, ExportScope, ExportStatus, ExportTicket, SweepReport};
pub use source::{window_fetch, Columns, ListRowSource, Page, PageRequest, PagedRowSource, RowSource};
pub use store::{ExportArtifact, ExportId, ResultStore, StoredExport};
pub use value::ExportValue;
