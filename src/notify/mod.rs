//! Outbound notification capability.
//!
//! The auth service only needs one call: deliver a verification link to a
//! freshly registered address. Real wire transport (SMTP, provider API)
//! slots in behind the same trait; the shipped implementation logs the
//! link, which is what development environments want anyway.

use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_verification_email(&self, to: &str, link: &str) -> anyhow::Result<()>;
}

/// Logs verification links instead of delivering them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_verification_email(&self, to: &str, link: &str) -> anyhow::Result<()> {
        info!(to = %to, link = %link, "verification email");
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every send for assertions.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_verification_email(&self, to: &str, link: &str) -> anyhow::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), link.to_string()));
            Ok(())
        }
    }

    /// Always fails, for exercising the best-effort path.
    pub struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send_verification_email(&self, _to: &str, _link: &str) -> anyhow::Result<()> {
            anyhow::bail!("smtp connection refused")
        }
    }
}
