//! # canlog-service
//!
//! The operations an outer transport exposes for ingesting CAN measurement logs:
//!
//! - [`CanlogService::begin_or_continue_upload`] and [`CanlogService::commit_session`]
//!   drive the chunked upload in `canlog-blob`
//! - [`CanlogService::process_session`] decodes the committed recording's header, moves
//!   it to `<folder>/<timestamp>/can.log`, stores `summary.json` next to it and publishes
//!   the summary
//! - [`CanlogService::list_summaries`] and [`CanlogService::retrieve_summary`] read the
//!   stored summaries back

mod config;
mod error;
mod listing;
mod publish;
mod service;
mod summary;
mod summary_store;

pub use config::ServiceConfig;
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use listing::SummaryEntry;
pub use publish::{MemoryPublisher, NotificationPublisher};
pub use service::CanlogService;
pub use summary::{ProcessingStatus, Summary, SummaryAssembler};
pub use summary_store::{BlockSummaryStore, SummaryStore};
