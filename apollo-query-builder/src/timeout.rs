use std::future::Future;
use std::time::Duration;

use crate::error::QueryBuilderError;

/// Run `future` with a time budget. Running out of time is reported as
/// [`QueryBuilderError::Timeout`], never as a failure of the remote side.
pub(crate) async fn with_timeout<T>(
    operation: &'static str,
    timeout: Duration,
    future: impl Future<Output = Result<T, QueryBuilderError>>,
) -> Result<T, QueryBuilderError> {
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| QueryBuilderError::Timeout { operation, timeout })?
}
