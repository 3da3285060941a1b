use crate::error::DbError;

/// Outcome of an exec-style call.
///
/// `TimedOut` is the sentinel handed back when the call's timeout fires
/// before the statement finishes; every accessor then reports
/// [`DbError::Timeout`] instead of a value, so callers keep a single return
/// shape for both cases.
#[derive(Debug, Clone)]
pub enum ExecResult {
    Done { rows_affected: u64, last_insert_id: u64 },
    TimedOut,
    Failed(DbError),
}

impl ExecResult {
    pub fn new(rows_affected: u64, last_insert_id: u64) -> Self {
        ExecResult::Done {
            rows_affected,
            last_insert_id,
        }
    }

    pub fn rows_affected(&self) -> Result<u64, DbError> {
        match self {
            ExecResult::Done { rows_affected, .. } => Ok(*rows_affected),
            _ => Err(self.error()),
        }
    }

    pub fn last_insert_id(&self) -> Result<u64, DbError> {
        match self {
            ExecResult::Done { last_insert_id, .. } => Ok(*last_insert_id),
            _ => Err(self.error()),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecResult::TimedOut)
    }

    /// Returns the stored error, if any.
    pub fn err(&self) -> Option<DbError> {
        match self {
            ExecResult::Done { .. } => None,
            _ => Some(self.error()),
        }
    }

    fn error(&self) -> DbError {
        match self {
            ExecResult::Failed(e) => e.clone(),
            _ => DbError::Timeout,
        }
    }
}

impl From<Result<ExecResult, DbError>> for ExecResult {
    fn from(r: Result<ExecResult, DbError>) -> Self {
        r.unwrap_or_else(ExecResult::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_reports_timeout() {
        let r = ExecResult::TimedOut;
        assert!(r.is_timeout());
        assert!(r.rows_affected().unwrap_err().is_timeout());
        assert!(r.last_insert_id().unwrap_err().is_timeout());
        assert!(r.err().is_some());
    }

    #[test]
    fn test_done_reports_values() {
        let r = ExecResult::new(3, 17);
        assert_eq!(r.rows_affected().unwrap(), 3);
        assert_eq!(r.last_insert_id().unwrap(), 17);
        assert!(!r.is_timeout());
        assert!(r.err().is_none());
    }

    #[test]
    fn test_failed_keeps_driver_error() {
        let r: ExecResult = Err(DbError::Query("duplicate key".into())).into();
        assert!(!r.is_timeout());
        assert!(matches!(r.rows_affected(), Err(DbError::Query(m)) if m == "duplicate key"));
    }
}
