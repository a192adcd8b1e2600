//! Waiting on server-reported upload states.

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use super::state::{StateClass, StateTarget};
use crate::error::{ApiError, UploadError};
use crate::graph::ContentFile;

/// Interval and overall limit for one state wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between refreshes
    pub interval: Duration,
    /// Wall-clock limit for the whole wait
    pub timeout: Duration,
}

/// Refresh the content file until it reaches `target`.
///
/// The first refresh happens immediately. Terminal states (`*Failed`,
/// `*TimedOut`, or a `*Success` other than the target) end the wait with a
/// state error. Transient refresh failures are retried on the next tick;
/// any other refresh failure ends the wait.
pub async fn wait_for_upload_state<F, Fut>(
    settings: PollSettings,
    target: StateTarget,
    mut refresh: F,
) -> Result<ContentFile, UploadError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ContentFile, ApiError>>,
{
    let polling = async {
        let mut ticker = time::interval(settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let file = match refresh().await {
                Ok(file) => file,
                Err(e) if e.is_transient() => {
                    log::warn!("Refresh while waiting for {} failed, retrying: {e}", target.name);
                    continue;
                }
                Err(source) => return Err(UploadError::Refresh { source }),
            };

            if target.is_satisfied(&file) {
                return Ok(file);
            }

            let state = file.upload_state;
            match StateClass::of(&state) {
                StateClass::Success => {
                    return Err(UploadError::UnexpectedSuccessState {
                        state,
                        awaiting: target.name,
                    });
                }
                StateClass::Failed => return Err(UploadError::UploadFailedState { state }),
                StateClass::TimedOut => return Err(UploadError::UploadTimedOutState { state }),
                StateClass::Pending => {
                    log::debug!("Waiting for {}: upload state is '{state}'", target.name)
                }
            }
        }
    };

    match time::timeout(settings.timeout, polling).await {
        Ok(result) => result,
        Err(_) => Err(timeout_error(target, settings.timeout)),
    }
}

fn timeout_error(target: StateTarget, waited: Duration) -> UploadError {
    if target == StateTarget::STORAGE_READY {
        UploadError::StorageReadyTimeout { waited }
    } else {
        UploadError::FileCommittedTimeout { waited }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::state::{FILE_COMMITTED_TAG, STORAGE_READY_TAG};
    use std::collections::VecDeque;
    use tokio::time::Instant;

    const SETTINGS: PollSettings = PollSettings {
        interval: Duration::from_secs(5),
        timeout: Duration::from_secs(60),
    };

    fn file(state: &str) -> ContentFile {
        ContentFile {
            id: "f".to_string(),
            upload_state: state.to_string(),
            azure_storage_uri: Some("https://blob.example/c/f?sig=1".to_string()),
            ..Default::default()
        }
    }

    fn scripted(
        states: &[&str],
    ) -> impl FnMut() -> std::future::Ready<Result<ContentFile, ApiError>> {
        let mut queue: VecDeque<String> = states.iter().map(|s| s.to_string()).collect();
        move || {
            let state = if queue.len() > 1 {
                queue.pop_front().unwrap_or_default()
            } else {
                queue.front().cloned().unwrap_or_default()
            };
            std::future::ready(Ok(file(&state)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_satisfied_state_returns_without_waiting() {
        let started = Instant::now();
        let file = wait_for_upload_state(SETTINGS, StateTarget::STORAGE_READY, scripted(&[STORAGE_READY_TAG]))
            .await
            .unwrap();
        assert_eq!(file.upload_state, STORAGE_READY_TAG);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_states_poll_on_interval() {
        let started = Instant::now();
        let refresh = scripted(&[
            "azureStorageUriRequestPending",
            "azureStorageUriRequestPending",
            STORAGE_READY_TAG,
        ]);
        wait_for_upload_state(SETTINGS, StateTarget::STORAGE_READY, refresh)
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_state_returns_before_timeout() {
        let started = Instant::now();
        let err = wait_for_upload_state(
            SETTINGS,
            StateTarget::FILE_COMMITTED,
            scripted(&["commitFilePending", "commitFileFailed"]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UploadError::UploadFailedState { ref state } if state == "commitFileFailed"));
        assert!(started.elapsed() < SETTINGS.timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_state_is_reported() {
        let err = wait_for_upload_state(
            SETTINGS,
            StateTarget::STORAGE_READY,
            scripted(&["azureStorageUriRequestTimedOut"]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UploadError::UploadTimedOutState { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_success_state_is_unexpected() {
        let err = wait_for_upload_state(
            SETTINGS,
            StateTarget::FILE_COMMITTED,
            scripted(&[STORAGE_READY_TAG]),
        )
        .await
        .unwrap_err();
        match err {
            UploadError::UnexpectedSuccessState { state, awaiting } => {
                assert_eq!(state, STORAGE_READY_TAG);
                assert_eq!(awaiting, "file committed");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_forever_times_out() {
        let started = Instant::now();
        let err = wait_for_upload_state(
            SETTINGS,
            StateTarget::FILE_COMMITTED,
            scripted(&["commitFilePending"]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UploadError::FileCommittedTimeout { waited } if waited == SETTINGS.timeout));
        assert_eq!(started.elapsed(), SETTINGS.timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_refresh_errors_are_retried() {
        let mut calls = 0;
        let refresh = || {
            calls += 1;
            let result = if calls == 1 {
                Err(ApiError::Status {
                    method: "GET",
                    resource: "/files/f".to_string(),
                    status: 503,
                    body: String::new(),
                })
            } else {
                Ok(file(FILE_COMMITTED_TAG))
            };
            std::future::ready(result)
        };
        wait_for_upload_state(SETTINGS, StateTarget::FILE_COMMITTED, refresh)
            .await
            .unwrap();
        assert_eq!(calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_refresh_error_aborts() {
        let refresh = || {
            std::future::ready(Err(ApiError::Status {
                method: "GET",
                resource: "/files/f".to_string(),
                status: 404,
                body: "gone".to_string(),
            }))
        };
        let err = wait_for_upload_state(SETTINGS, StateTarget::STORAGE_READY, refresh)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Refresh { .. }));
    }
}
