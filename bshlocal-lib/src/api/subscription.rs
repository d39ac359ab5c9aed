use serde_json::Value;

use crate::api::{BshLocalApi, PollId, DEFAULT_POLL_WAIT_SECONDS};
use crate::error::Result;

/**
An open long-polling subscription.

Owns its poll id: polling is only possible while the handle exists, and
[`LongPollSubscription::unsubscribe`] consumes it. Dropping the handle without unsubscribing
leaves the subscription to expire on the controller.

```no_run
use bshlocal_lib::api::BshLocalApi;
use bshlocal_lib::config::ClientConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::new("192.168.0.10", "client-cert.pem", "client-key.pem");
    let api = BshLocalApi::new(&config).await?;

    let subscription = api.subscribe().await?;
    for record in subscription.poll().await? {
        println!("{}", record);
    }
    subscription.unsubscribe().await?;
    Ok(())
}
```
 */
#[derive(Debug)]
pub struct LongPollSubscription {
    api: BshLocalApi,
    poll_id: PollId,
}

impl LongPollSubscription {
    pub(crate) fn new(api: BshLocalApi, poll_id: PollId) -> Self {
        LongPollSubscription { api, poll_id }
    }

    pub fn poll_id(&self) -> &PollId {
        &self.poll_id
    }

    /// Polls with the default wait of [`DEFAULT_POLL_WAIT_SECONDS`].
    pub async fn poll(&self) -> Result<Vec<Value>> {
        self.poll_with_wait(DEFAULT_POLL_WAIT_SECONDS).await
    }

    pub async fn poll_with_wait(&self, wait_seconds: u32) -> Result<Vec<Value>> {
        self.api.long_polling_poll(&self.poll_id, wait_seconds).await
    }

    pub async fn unsubscribe(self) -> Result<()> {
        self.api.long_polling_unsubscribe(&self.poll_id).await
    }
}
