use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::ExecutionError;
use crate::models::OrderRequest;

/// Execution collaborator boundary
///
/// `submit` must not block: fills and rejections come back later as
/// `PositionUpdate` events.
pub trait ExecutionSink {
    fn submit(&self, request: OrderRequest) -> Result<(), ExecutionError>;
}

/// Hands order requests to an async execution engine over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<OrderRequest>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<OrderRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ExecutionSink for ChannelSink {
    fn submit(&self, request: OrderRequest) -> Result<(), ExecutionError> {
        self.tx
            .send(request)
            .map_err(|_| ExecutionError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderIntent, OrderParams, PriceMode, Side};
    use uuid::Uuid;

    fn create_test_request() -> OrderRequest {
        OrderRequest {
            position_id: Uuid::new_v4(),
            symbol: "AAPL".to_string(),
            intent: OrderIntent::Open,
            side: Side::Buy,
            quantity: 100,
            price: PriceMode::Market,
            params: OrderParams::default(),
        }
    }

    #[tokio::test]
    async fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelSink::new();
        let request = create_test_request();

        sink.submit(request.clone()).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, request);
    }

    #[test]
    fn test_channel_sink_closed() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);

        let result = sink.submit(create_test_request());
        assert_eq!(result, Err(ExecutionError::ChannelClosed));
    }
}
