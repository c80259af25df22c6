//! Holder for a deferred install prompt.
//!
//! The platform offers the prompt once; it is kept until the user acts on
//! it or the app reports itself installed.
//!
//! This is a library-only seam. The stdio server has no install surface of
//! its own, so embedders that do receive a platform prompt wire a
//! [`DeferredPrompt`] implementation in here themselves.

/// Outcome of showing the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    Accepted,
    Dismissed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstallError {
    #[error("already installed or installation unavailable")]
    Unavailable,
}

/// A platform prompt that can be shown once.
pub trait DeferredPrompt {
    fn show(self) -> PromptChoice;
}

#[derive(Debug)]
pub struct InstallPrompt<P> {
    deferred: Option<P>,
}

impl<P> Default for InstallPrompt<P> {
    fn default() -> Self {
        Self { deferred: None }
    }
}

impl<P: DeferredPrompt> InstallPrompt<P> {
    /// Keep `prompt` for later. Returns false if one is already held.
    pub fn capture(&mut self, prompt: P) -> bool {
        if self.deferred.is_some() {
            tracing::debug!("install prompt already captured; ignoring");
            return false;
        }
        self.deferred = Some(prompt);
        true
    }

    pub fn is_available(&self) -> bool {
        self.deferred.is_some()
    }

    /// Show the held prompt on user action. It is discarded either way.
    pub fn replay(&mut self) -> Result<PromptChoice, InstallError> {
        let prompt = self.deferred.take().ok_or(InstallError::Unavailable)?;
        let choice = prompt.show();
        tracing::info!(?choice, "install prompt answered");
        Ok(choice)
    }

    /// The app was installed by other means; the prompt is no longer useful.
    pub fn mark_installed(&mut self) {
        if self.deferred.take().is_some() {
            tracing::debug!("install prompt discarded after install");
        }
    }
}
