//! Processing stage between ingestion and the detectors.

use std::sync::Arc;

use crate::broker::{topics, Broker, Subscriber, Topic};
use crate::error::PulseResult;
use crate::event::Event;

/// Republishes raw records as processed records, then on the legacy
/// `update` feed. Records pass through unchanged.
#[derive(Debug)]
pub struct ProcessingStage {
    broker: Arc<Broker>,
}

impl ProcessingStage {
    /// Creates the stage and subscribes it to `raw_data`.
    pub fn attach(broker: Arc<Broker>) -> Arc<Self> {
        let stage = Arc::new(Self {
            broker: Arc::clone(&broker),
        });
        broker.subscribe(topics::RAW_DATA, Arc::clone(&stage) as Arc<dyn Subscriber>);
        stage
    }
}

impl Subscriber for ProcessingStage {
    fn notify(&self, topic: &Topic, event: &Event) -> PulseResult<()> {
        if *topic == topics::RAW_DATA {
            tracing::trace!(shape = event.shape(), "processing record");
            self.broker.publish(&topics::PROCESSED_DATA, event.clone());
            self.broker.publish(&topics::UPDATE, event.clone());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "processing-stage"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::event::RawRecord;

    #[test]
    fn raw_fans_out_to_processed_then_update() {
        let broker = Arc::new(Broker::detached());
        let _stage = ProcessingStage::attach(Arc::clone(&broker));
        let order = Arc::new(Mutex::new(Vec::new()));
        for topic in [topics::PROCESSED_DATA, topics::UPDATE] {
            let order = Arc::clone(&order);
            let label = topic.to_string();
            broker.subscribe_fn(topic, "order", move |_| order.lock().unwrap().push(label.clone()));
        }

        let record = RawRecord::Pos {
            timestamp: Utc::now(),
            store_id: "store_1".to_string(),
            sales: 12,
        };
        broker.publish(&topics::RAW_DATA, record);
        assert_eq!(*order.lock().unwrap(), vec!["processed_data", "update"]);
    }
}
