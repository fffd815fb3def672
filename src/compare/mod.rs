mod changeset;
mod comparator;

pub use changeset::{
    ChangeSet, ChangeSummary, ExecutionChanges, SystemChanges, UptimeChange, ValueChange,
};
pub use comparator::SnapshotComparator;
