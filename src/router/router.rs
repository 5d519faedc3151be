//! Routes decoded metric messages to the store, tally and backend

use crate::aggregation::AggregationStore;
use crate::dispatcher::Dispatcher;
use crate::metrics::{record_message_accepted, record_message_erroneous, record_message_rejected};
use crate::router::error::RouterResult;
use crate::router::types::{InboundPayload, Routed};
use crate::sink::MessageHandler;
use crate::tally::OutcomeTally;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct MessageRouter {
    store: Arc<AggregationStore>,
    tally: Arc<OutcomeTally>,
    /// Single backend connection; writes from different connections are serialized
    dispatcher: Mutex<Box<dyn Dispatcher>>,
}

impl MessageRouter {
    pub fn new(
        store: Arc<AggregationStore>,
        tally: Arc<OutcomeTally>,
        dispatcher: Box<dyn Dispatcher>,
    ) -> Self {
        Self {
            store,
            tally,
            dispatcher: Mutex::new(dispatcher),
        }
    }

    pub fn store(&self) -> &Arc<AggregationStore> {
        &self.store
    }

    pub fn tally(&self) -> &Arc<OutcomeTally> {
        &self.tally
    }

    /// Decode and apply one payload.
    ///
    /// Validation completes before any state is touched: a rejected payload
    /// leaves the store and tally unchanged and records no vote.
    pub async fn route(&self, payload: &[u8]) -> RouterResult<Routed> {
        let message = match InboundPayload::decode(payload).and_then(InboundPayload::into_message)
        {
            Ok(message) => message,
            Err(e) => {
                record_message_rejected();
                tracing::debug!(error = %e, len = payload.len(), "payload rejected");
                return Err(e);
            }
        };

        if let Some(error) = message.error {
            let votes = self.tally.negative_vote(&message.message_id);
            record_message_erroneous(&message.host);
            tracing::warn!(
                host = %message.host,
                message_id = %message.message_id,
                votes,
                %error,
                "agent reported error"
            );
            return Ok(Routed::Erroneous {
                message_id: message.message_id,
                votes,
                error,
            });
        }

        self.store
            .add_metric(&message.message_id, message.metrics.clone());
        let votes = self.tally.positive_vote(&message.message_id);

        let dispatch = self
            .dispatcher
            .lock()
            .await
            .write_namespaced(&message.host, &message.message_id, &message.metrics)
            .await;

        record_message_accepted(&message.host);
        tracing::debug!(
            host = %message.host,
            message_id = %message.message_id,
            series = message.metrics.len(),
            votes,
            %dispatch,
            "message routed"
        );

        Ok(Routed::Accepted {
            message_id: message.message_id,
            votes,
            dispatch,
        })
    }

    /// Route a payload, reporting only acceptance
    pub async fn handle_message(&self, payload: &[u8]) -> bool {
        self.route(payload).await.is_ok()
    }

    /// Close the backend transport
    pub async fn close(&self) {
        self.dispatcher.lock().await.close().await;
    }
}

#[async_trait]
impl MessageHandler for MessageRouter {
    async fn handle(&self, payload: &[u8]) -> bool {
        self.handle_message(payload).await
    }
}
