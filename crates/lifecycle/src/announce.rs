//! Capabilities announcement (§4.3): POSTs the process's descriptor to an
//! optional registry endpoint at startup, on entering `ready`, on any
//! feature-flag change, and at shutdown. A registry that can't be reached
//! is logged and never changes local state.

use models::CapabilitiesDescriptor;

#[derive(Clone)]
pub struct Announcer {
    http: reqwest::Client,
    registry_url: Option<String>,
}

impl Announcer {
    pub fn new(http: reqwest::Client, registry_url: Option<String>) -> Self {
        Self { http, registry_url }
    }

    pub async fn announce(&self, descriptor: &CapabilitiesDescriptor, event: &str) {
        let Some(url) = &self.registry_url else {
            return;
        };

        let result = self
            .http
            .post(url)
            .json(descriptor)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(event, service = %descriptor.service_name, "announced capabilities");
            }
            Ok(resp) => {
                tracing::warn!(
                    event,
                    status = resp.status().as_u16(),
                    "registry rejected capabilities announcement"
                );
            }
            Err(err) => {
                tracing::warn!(event, error = %err, "failed to reach capabilities registry");
            }
        }
    }
}
