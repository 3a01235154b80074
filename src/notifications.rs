//! Notifications for the signed-in user, with background polling

use jobboard_protocol::api::notifications::{Notification, UpdateNotificationRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::error::{ClientError, Result};
use crate::scoped::SessionScoped;
use crate::session::SessionState;

pub const NOTIFICATIONS_PATH: &str = "/api/notifications/";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

fn notification_path(id: u64) -> String {
    format!("{}{}/", NOTIFICATIONS_PATH, id)
}

#[derive(Debug)]
pub struct NotificationCenter {
    client: Arc<ApiClient>,
    entries: SessionScoped<Vec<Notification>>,
}

impl NotificationCenter {
    pub fn new(client: Arc<ApiClient>) -> Self {
        let entries = SessionScoped::new(client.store().clone());
        Self { client, entries }
    }

    /// Reload from the API. Does nothing while logged out.
    pub async fn refresh(&self) -> Result<Vec<Notification>> {
        if !self.client.is_authenticated() {
            self.entries.reset();
            return Ok(Vec::new());
        }
        let owner = self.entries.owner();
        let notifications: Vec<Notification> = self.client.get(NOTIFICATIONS_PATH).await?;
        if !self.entries.set_for(owner.as_deref(), notifications.clone()) {
            debug!("session changed while loading notifications, discarding them");
            return Ok(self.entries.get());
        }
        Ok(notifications)
    }

    pub fn entries(&self) -> Vec<Notification> {
        self.entries.get()
    }

    pub fn unread_count(&self) -> usize {
        self.entries.get().iter().filter(|n| !n.is_read).count()
    }

    pub async fn mark_read(&self, id: u64) -> Result<()> {
        self.require_session()?;
        let owner = self.entries.owner();
        let _: serde_json::Value = self
            .client
            .patch_json(&notification_path(id), &UpdateNotificationRequest { is_read: true })
            .await?;
        self.entries.update_for(owner.as_deref(), |entries| {
            if let Some(n) = entries.iter_mut().find(|n| n.id == id) {
                n.is_read = true;
            }
        });
        Ok(())
    }

    /// Mark every unread notification read; stops at the first failure
    pub async fn mark_all_read(&self) -> Result<usize> {
        self.require_session()?;
        let unread: Vec<u64> = self
            .entries
            .get()
            .iter()
            .filter(|n| !n.is_read)
            .map(|n| n.id)
            .collect();
        for id in &unread {
            self.mark_read(*id).await?;
        }
        Ok(unread.len())
    }

    pub async fn remove(&self, id: u64) -> Result<()> {
        self.require_session()?;
        let owner = self.entries.owner();
        self.client.delete::<()>(&notification_path(id)).await?;
        self.entries
            .update_for(owner.as_deref(), |entries| entries.retain(|n| n.id != id));
        Ok(())
    }

    fn require_session(&self) -> Result<()> {
        if self.client.is_authenticated() {
            Ok(())
        } else {
            Err(ClientError::not_authenticated())
        }
    }

    /// Poll every `period` while signed in. The task ends, and the cached
    /// notifications are dropped, as soon as the store reports `LoggedOut`.
    pub fn spawn_polling(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let center = Arc::clone(self);
        let mut session = self.client.store().subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !center.client.is_authenticated() {
                            break;
                        }
                        match center.refresh().await {
                            Ok(notifications) => debug!(
                                total = notifications.len(),
                                unread = center.unread_count(),
                                "notifications polled"
                            ),
                            Err(e) => warn!(error = %e, "notification poll failed"),
                        }
                    }
                    changed = session.changed() => {
                        if changed.is_err() || *session.borrow_and_update() == SessionState::LoggedOut {
                            break;
                        }
                    }
                }
            }

            center.entries.reset();
            debug!("notification polling stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TokenStore;
    use crate::tests::mocks::{CountingReauth, MockTransport};
    use crate::tests::utils::test_helpers::{
        future_access_token, memory_store, signed_in_store, test_config,
    };
    use crate::transport::RawResponse;
    use jobboard_protocol::{Role, TokenPair};
    use reqwest::{Method, StatusCode};
    use serde_json::json;

    fn center(store: Arc<TokenStore>, transport: Arc<MockTransport>) -> Arc<NotificationCenter> {
        let client = ApiClient::with_transport(
            test_config("http://jobs.test"),
            store,
            transport,
            Arc::new(CountingReauth::default()),
        );
        Arc::new(NotificationCenter::new(Arc::new(client)))
    }

    fn two_notifications() -> serde_json::Value {
        json!([
            {"id": 1, "message": "Application received", "is_read": false},
            {"id": 2, "message": "Interview scheduled", "is_read": true}
        ])
    }

    #[tokio::test]
    async fn test_refresh_mark_read_and_remove() {
        let transport = Arc::new(MockTransport::new());
        transport.on_json(Method::GET, NOTIFICATIONS_PATH, StatusCode::OK, two_notifications());
        transport.on_json(
            Method::PATCH,
            "/api/notifications/1/",
            StatusCode::OK,
            json!({"id": 1, "message": "Application received", "is_read": true}),
        );
        transport.on(
            Method::DELETE,
            "/api/notifications/2/",
            RawResponse::new(StatusCode::NO_CONTENT, ""),
        );

        let center = center(signed_in_store("6", Role::Candidate), transport.clone());
        center.refresh().await.unwrap();
        assert_eq!(center.unread_count(), 1);

        center.mark_read(1).await.unwrap();
        assert_eq!(center.unread_count(), 0);

        center.remove(2).await.unwrap();
        assert_eq!(center.entries().len(), 1);

        let patch = transport
            .requests()
            .into_iter()
            .find(|r| r.method == Method::PATCH)
            .unwrap();
        assert_eq!(patch.json_body(), Some(&json!({"is_read": true})));
    }

    #[tokio::test]
    async fn test_mark_all_read() {
        let transport = Arc::new(MockTransport::new());
        transport.on_json(
            Method::GET,
            NOTIFICATIONS_PATH,
            StatusCode::OK,
            json!([
                {"id": 1, "message": "a", "is_read": false},
                {"id": 3, "message": "b", "is_read": false}
            ]),
        );
        transport.on_json(Method::PATCH, "/api/notifications/1/", StatusCode::OK, json!({}));
        transport.on_json(Method::PATCH, "/api/notifications/3/", StatusCode::OK, json!({}));

        let center = center(signed_in_store("6", Role::Candidate), transport);
        center.refresh().await.unwrap();
        assert_eq!(center.mark_all_read().await.unwrap(), 2);
        assert_eq!(center.unread_count(), 0);
    }

    #[tokio::test]
    async fn test_logged_out_sends_nothing() {
        let transport = Arc::new(MockTransport::new());
        let center = center(memory_store(), transport.clone());

        assert!(center.refresh().await.unwrap().is_empty());
        assert!(center.mark_read(1).await.is_err());
        assert!(center.remove(1).await.is_err());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_polling_stops_on_logout() {
        let store = signed_in_store("6", Role::Candidate);
        let transport = Arc::new(MockTransport::new());
        transport.on_json(Method::GET, NOTIFICATIONS_PATH, StatusCode::OK, two_notifications());

        let center = center(store.clone(), transport.clone());
        let handle = center.spawn_polling(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(transport.count(Method::GET, NOTIFICATIONS_PATH) >= 2);
        assert_eq!(center.unread_count(), 1);

        store.clear();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("polling task did not stop")
            .unwrap();
        assert!(center.entries().is_empty());
    }

    #[tokio::test]
    async fn test_user_switch_during_load_discards_result() {
        let store = signed_in_store("6", Role::Candidate);
        let transport = Arc::new(MockTransport::new());
        let switching = store.clone();
        transport.respond_with(Method::GET, NOTIFICATIONS_PATH, move |_| {
            switching.clear();
            switching
                .set_credentials(TokenPair::new(
                    future_access_token("8", Role::Employer),
                    "refresh-8",
                ))
                .unwrap();
            RawResponse::json_value(StatusCode::OK, &two_notifications())
        });

        let center = center(store.clone(), transport);
        assert!(center.refresh().await.unwrap().is_empty());
        assert_eq!(center.unread_count(), 0);
        assert!(center.entries().is_empty());
    }
}
