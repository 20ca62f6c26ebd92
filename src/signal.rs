//! Interrupt handling

use std::future::Future;

/// Run `work` to completion unless `interrupt` resolves first
pub async fn until_interrupted<F, I>(work: F, interrupt: I) -> Option<F::Output>
where
    F: Future,
    I: Future,
{
    tokio::select! {
        output = work => Some(output),
        _ = interrupt => None,
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
pub async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_work_finishes_first() {
        let out = until_interrupted(async { 7 }, std::future::pending::<()>()).await;
        assert_eq!(out, Some(7));
    }

    #[tokio::test]
    async fn test_interrupt_wins_over_pending_work() {
        let out = until_interrupted(std::future::pending::<u8>(), async {}).await;
        assert_eq!(out, None);
    }

    #[tokio::test]
    async fn test_interrupt_during_blocking_prompt() {
        // A prompt sitting on the blocking pool must not delay the interrupt
        let work = async {
            tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(2)))
                .await
                .unwrap();
        };
        let interrupt = tokio::time::sleep(Duration::from_millis(50));

        let out = tokio::time::timeout(Duration::from_secs(1), until_interrupted(work, interrupt))
            .await
            .unwrap();
        assert!(out.is_none());
    }
}
