//! JetStream job log for distributed cell processing.
//!
//! Job entries of every kind share one stream and one consumer group:
//!
//! - [`EventPublisher`] appends typed entries to the stream.
//! - [`EventSubscriber`] joins a durable pull consumer group and fetches
//!   acknowledged batches of [`TypedMessage`].
//! - [`Settle`] acknowledges, redelivers or terminates a claimed entry.

mod consumer_group;
mod event_pub;
mod event_stream;
mod event_sub;
mod job_entry;

pub use consumer_group::{ConsumerGroupConfig, StartPosition};
pub use event_pub::{EventPublisher, JobPublisher};
pub use event_stream::{EventStream, JobStream};
pub use event_sub::{EventSubscriber, JobSubscriber, Settle, TypedMessage};
pub use job_entry::{JobEntry, JobKind};
