/// Progress and outcome messages shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    WaitingForHost,
    LoadingTables,
    LoadingTable { table: String },
    Ready,
    ReadingRecords,
    Loaded { points: usize, records: usize },
    /// A previous request is still in flight; the new one was dropped.
    Busy,
    Failed(String),
    Standalone(String),
}

impl Status {
    pub fn is_error(&self) -> bool {
        matches!(self, Status::Failed(_))
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::WaitingForHost => write!(f, "Waiting for the base to be ready..."),
            Status::LoadingTables => write!(f, "Loading tables..."),
            Status::LoadingTable { table } => {
                write!(f, "Loading views and fields of {table}...")
            }
            Status::Ready => write!(f, "Pick a view and fields, then press Load."),
            Status::ReadingRecords => write!(f, "Reading records..."),
            Status::Loaded { points, records } => {
                write!(f, "Loaded {points} points from {records} records.")
            }
            Status::Busy => write!(f, "Still working on the previous request."),
            Status::Failed(msg) => write!(f, "Error: {msg}"),
            Status::Standalone(label) => write!(f, "Standalone map: {label}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Status;

    #[test]
    fn zero_points_is_informational() {
        let s = Status::Loaded {
            points: 0,
            records: 1,
        };
        assert!(!s.is_error());
        assert_eq!(s.to_string(), "Loaded 0 points from 1 records.");
    }

    #[test]
    fn failures_carry_the_message() {
        let s = Status::Failed("quota exceeded".to_string());
        assert!(s.is_error());
        assert_eq!(s.to_string(), "Error: quota exceeded");
    }
}
