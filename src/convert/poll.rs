use std::time::Instant;

use super::cancel::CancelToken;
use super::types::{ConvertError, ConvertResult, PollOptions};
use crate::assistants::{AssistantsApi, Run};

/// Check a run's status on a fixed interval until it reaches a terminal state.
///
/// Returns the terminal run, whatever its status. Stops early with
/// `DeadlineExceeded` when the next check would land past the deadline, or
/// with `Cancelled` as soon as the token fires. API errors end the wait.
pub async fn wait_for_run<A>(
    api: &A,
    thread_id: &str,
    run_id: &str,
    options: &PollOptions,
    cancel: &CancelToken,
) -> ConvertResult<Run>
where
    A: AssistantsApi + ?Sized,
{
    let started = Instant::now();

    loop {
        if cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }

        let run = api.get_run(thread_id, run_id).await?;
        tracing::info!(run_id, "Run status: {}", run.status);

        if run.status.is_terminal() {
            return Ok(run);
        }

        if let Some(deadline) = options.deadline {
            if started.elapsed() + options.interval > deadline {
                return Err(ConvertError::DeadlineExceeded(deadline));
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(options.interval) => {}
            _ = cancel.cancelled() => return Err(ConvertError::Cancelled),
        }
    }
}
