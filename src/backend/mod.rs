pub mod profile;
pub mod social;
pub mod storage;
pub mod uploader;
pub mod wallet;

use profile::{Profile, ProfileForm};
use social::SocialClient;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use uploader::{FundedUploader, UploaderConfig};
use wallet::WalletSession;

const WALLET_KEY_PATH: &str = "wallet.key";

#[derive(Debug)]
pub enum AppCmd {
    FetchActiveProfile,
    UpdateProfile { form: ProfileForm },
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    WalletReady(String),
    ProfileFetched(Option<Profile>),
    ProfileUpdated { content_url: String },
    UpdateFailed(String),
}

pub struct Backend {
    social: SocialClient,
    uploader: Arc<FundedUploader>,
    active_profile: Option<Profile>,
    cmd_rx: mpsc::UnboundedReceiver<AppCmd>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl Backend {
    pub fn new(
        session: WalletSession,
        config: UploaderConfig,
        social: SocialClient,
        cmd_rx: mpsc::UnboundedReceiver<AppCmd>,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            social,
            uploader: Arc::new(FundedUploader::new(config, session)),
            active_profile: None,
            cmd_rx,
            event_tx,
        }
    }

    pub async fn run(&mut self) {
        while let Some(cmd) = self.cmd_rx.recv().await {
            self.handle_command(cmd).await;
        }
    }

    async fn handle_command(&mut self, cmd: AppCmd) {
        match cmd {
            AppCmd::FetchActiveProfile => {
                let Some(address) = self.uploader.address() else {
                    tracing::warn!("no wallet connected, nothing to fetch");
                    let _ = self.event_tx.send(AppEvent::ProfileFetched(None));
                    return;
                };
                match self.social.active_profile(&address).await {
                    Ok(profile) => {
                        self.active_profile = profile.clone();
                        let _ = self.event_tx.send(AppEvent::ProfileFetched(profile));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to fetch active profile");
                        let _ = self.event_tx.send(AppEvent::ProfileFetched(None));
                    }
                }
            }
            AppCmd::UpdateProfile { form } => {
                let Some(current) = self.active_profile.clone() else {
                    let _ = self
                        .event_tx
                        .send(AppEvent::UpdateFailed("no active profile loaded".to_string()));
                    return;
                };
                let request = profile::build_update_request(&form, &current);
                let operation = self
                    .social
                    .update_profile_details(&current, self.uploader.upload_fn());
                match operation.execute(request).await {
                    Ok(receipt) => {
                        tracing::info!(content_url = %receipt.content_url, "profile update submitted");
                        let _ = self.event_tx.send(AppEvent::ProfileUpdated {
                            content_url: receipt.content_url,
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "profile update failed");
                        let _ = self.event_tx.send(AppEvent::UpdateFailed(e.to_string()));
                    }
                }
            }
        }
    }
}

pub async fn init(
    cmd_rx: mpsc::UnboundedReceiver<AppCmd>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
) {
    let session = match WalletSession::open(Path::new(WALLET_KEY_PATH)) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "failed to open wallet, continuing disconnected");
            WalletSession::disconnected()
        }
    };
    if let Some(address) = session.address() {
        let _ = event_tx.send(AppEvent::WalletReady(address));
    }

    let social = SocialClient::new(social::DEFAULT_API_URL.to_string());
    let mut backend = Backend::new(
        session,
        UploaderConfig::default(),
        social,
        cmd_rx,
        event_tx,
    );
    backend.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (
        mpsc::UnboundedSender<AppCmd>,
        mpsc::UnboundedReceiver<AppEvent>,
        Backend,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let backend = Backend::new(
            WalletSession::disconnected(),
            UploaderConfig::default(),
            SocialClient::new("http://127.0.0.1:9".to_string()),
            cmd_rx,
            event_tx,
        );
        (cmd_tx, event_rx, backend)
    }

    #[tokio::test]
    async fn test_fetch_without_wallet_reports_no_profile() {
        let (_cmd_tx, mut event_rx, mut backend) = backend();
        backend.handle_command(AppCmd::FetchActiveProfile).await;

        match event_rx.recv().await {
            Some(AppEvent::ProfileFetched(None)) => {}
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_without_loaded_profile_fails() {
        let (_cmd_tx, mut event_rx, mut backend) = backend();
        backend
            .handle_command(AppCmd::UpdateProfile {
                form: ProfileForm::default(),
            })
            .await;

        match event_rx.recv().await {
            Some(AppEvent::UpdateFailed(reason)) => {
                assert!(reason.contains("no active profile"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
