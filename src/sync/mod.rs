//! Local-state synchronization: snapshot seeding, incremental reconciliation
//! and processed-id tracking.
//!
//! The composition is always the same shape: a [`SnapshotLoader`] seeds a
//! [`LiveCollection`], a feed [`Subscription`](crate::Subscription) delivers
//! incremental events, and the collection applies them under
//! insert-if-absent / replace-if-present / remove-if-present rules.
//! [`LiveView`] packages that loop; [`DedupGuard`] serves consumers whose
//! per-row work is not idempotent.

pub mod dedup;
pub mod reconciler;
pub mod snapshot;
pub mod view;

pub use dedup::DedupGuard;
pub use reconciler::{Applied, Keyed, LiveCollection, OrderPolicy, RowChange};
pub use snapshot::SnapshotLoader;
pub use view::{LiveView, ViewEvent};
