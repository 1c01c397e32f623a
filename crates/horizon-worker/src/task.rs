//! Task types shared between submitters and the worker pool.

/// A unit of background work.
///
/// Jobs are opaque to the pool; submitters capture whatever state they need.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Queue lane a job is submitted to.
///
/// Workers drain urgent lanes first whenever more than one lane has queued
/// work. Bulk restructuring work runs at [`Low`](TaskPriority::Low) so it
/// never starves interactive tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskPriority {
    High,
    Normal,
    Low,
}

impl TaskPriority {
    /// Lane index, most urgent first.
    pub(crate) fn lane(self) -> usize {
        match self {
            TaskPriority::High => 0,
            TaskPriority::Normal => 1,
            TaskPriority::Low => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_order_is_most_urgent_first() {
        assert!(TaskPriority::High.lane() < TaskPriority::Normal.lane());
        assert!(TaskPriority::Normal.lane() < TaskPriority::Low.lane());
    }
}
