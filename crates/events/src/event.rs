use chrono::NaiveDate;

/// A fact produced by an aggregate.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - dated by **business day**, not wall-clock time: a payment recorded today
///   may be dated last week.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "ledger.loan.payment_recorded").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// Business date the event refers to.
    fn occurred_on(&self) -> NaiveDate;
}
