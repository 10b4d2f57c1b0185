//! Inbound Ports (Driving Ports / API)

use async_trait::async_trait;
use shared_types::Timestamp;

use crate::domain::{CausalOrderError, ComparisonResult};

/// Primary Causal Order API
///
/// Every operation compares locally first and reaches the temporal-order
/// service at most once per call.
#[async_trait]
pub trait CausalOrderApi: Send + Sync {
    /// Index of the causally earliest timestamp in `timestamps`.
    ///
    /// Locally incomparable candidates are escalated in one soft-fail batch.
    async fn compare_vts(&self, timestamps: &[Timestamp]) -> Result<usize, CausalOrderError>;

    /// Order two timestamps, escalating only if they are locally incomparable.
    ///
    /// Returns `Identical` for equal clocks and never `Incomparable`.
    async fn compare_two_vts(
        &self,
        a: &Timestamp,
        b: &Timestamp,
    ) -> Result<ComparisonResult, CausalOrderError>;

    /// True iff every clock in `before` is ordered before `after`.
    ///
    /// `false` means the caller should retry with a later timestamp.
    async fn assign_vt_order(
        &self,
        before: &[Timestamp],
        after: &Timestamp,
    ) -> Result<bool, CausalOrderError>;

    /// True iff `creat` happens before `req` and `req` happens before `del`
    /// (when `del` is set).
    async fn clock_creat_before_del_after(
        &self,
        req: &Timestamp,
        creat: &Timestamp,
        del: Option<&Timestamp>,
    ) -> Result<bool, CausalOrderError>;
}
