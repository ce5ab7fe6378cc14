/// Where a screen's data fetch stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Initial,
    InProgress,
    Success,
    /// Succeeded with an empty collection (list screen only).
    NoTasks,
    Failure,
}

impl RequestStatus {
    pub fn begin(&mut self) {
        *self = RequestStatus::InProgress;
    }

    pub fn succeed(&mut self) {
        *self = RequestStatus::Success;
    }

    /// Success for a collection fetch; an empty one lands in `NoTasks`.
    pub fn succeed_with(&mut self, len: usize) {
        *self = if len == 0 {
            RequestStatus::NoTasks
        } else {
            RequestStatus::Success
        };
    }

    pub fn fail(&mut self) {
        *self = RequestStatus::Failure;
    }

    pub fn is_loading(self) -> bool {
        self == RequestStatus::InProgress
    }
}
