//! [`RetryingClient`] wraps a [`BrokerAdapter`] with backoff retry on
//! transient failures. `place_order` is exempted: a retried order placement
//! risks a duplicate submission, so a transient failure there is surfaced
//! immediately to the caller.

use crate::adapter::{BrokerAdapter, BrokerEvent};
use crate::error::ExecutionError;
use crate::order::{
    BrokerOrderId, Margins, ModifyOrderParams, OrderUpdate, PlaceOrderParams, Position, Quote,
    SubscriptionMode,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ixtrade_data::Candle;
use ixtrade_integration::BackoffPolicy;
use ixtrade_markets::{ExchangeId, Instrument, InstrumentToken};
use rust_decimal::Decimal;
use tracing::warn;

pub type RetryPolicy = BackoffPolicy;

pub struct RetryingClient<B: BrokerAdapter> {
    inner: B,
    policy: RetryPolicy,
}

impl<B: BrokerAdapter> RetryingClient<B> {
    pub fn new(inner: B, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn with_retry<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T, ExecutionError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, ExecutionError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < self.policy.max_attempts => {
                    warn!(op = op_name, attempt, error = %err, "retrying broker call");
                    tokio::time::sleep(self.policy.delay(attempt)).await;
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    return Err(ExecutionError::RetriesExhausted {
                        attempts: attempt + 1,
                        last: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl<B: BrokerAdapter> BrokerAdapter for RetryingClient<B> {
    fn events(&self) -> tokio::sync::mpsc::UnboundedReceiver<BrokerEvent> {
        self.inner.events()
    }

    async fn subscribe(&self, tokens: &[InstrumentToken]) -> Result<(), ExecutionError> {
        self.with_retry("subscribe", || self.inner.subscribe(tokens)).await
    }

    async fn unsubscribe(&self, tokens: &[InstrumentToken]) -> Result<(), ExecutionError> {
        self.with_retry("unsubscribe", || self.inner.unsubscribe(tokens)).await
    }

    async fn set_mode(
        &self,
        tokens: &[InstrumentToken],
        mode: SubscriptionMode,
    ) -> Result<(), ExecutionError> {
        self.with_retry("set_mode", || self.inner.set_mode(tokens, mode)).await
    }

    /// Never retried: a duplicate `place_order` call risks a duplicate live
    /// order at the broker.
    async fn place_order(&self, params: PlaceOrderParams) -> Result<BrokerOrderId, ExecutionError> {
        self.inner.place_order(params).await
    }

    async fn modify_order(&self, params: ModifyOrderParams) -> Result<(), ExecutionError> {
        self.with_retry("modify_order", || self.inner.modify_order(params.clone())).await
    }

    async fn cancel_order(&self, id: &BrokerOrderId) -> Result<(), ExecutionError> {
        self.with_retry("cancel_order", || self.inner.cancel_order(id)).await
    }

    async fn get_orders(&self) -> Result<Vec<OrderUpdate>, ExecutionError> {
        self.with_retry("get_orders", || self.inner.get_orders()).await
    }

    async fn get_order_history(
        &self,
        id: &BrokerOrderId,
    ) -> Result<Vec<OrderUpdate>, ExecutionError> {
        self.with_retry("get_order_history", || self.inner.get_order_history(id)).await
    }

    async fn get_positions(&self) -> Result<Vec<Position>, ExecutionError> {
        self.with_retry("get_positions", || self.inner.get_positions()).await
    }

    async fn get_margins(&self) -> Result<Margins, ExecutionError> {
        self.with_retry("get_margins", || self.inner.get_margins()).await
    }

    async fn get_instruments(&self, exchange: ExchangeId) -> Result<Vec<Instrument>, ExecutionError> {
        self.with_retry("get_instruments", || self.inner.get_instruments(exchange)).await
    }

    async fn get_historical_data(
        &self,
        token: InstrumentToken,
        interval_minutes: u32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>, ExecutionError> {
        self.with_retry("get_historical_data", || {
            self.inner.get_historical_data(token, interval_minutes, from, to)
        })
        .await
    }

    async fn get_quote(&self, token: InstrumentToken) -> Result<Quote, ExecutionError> {
        self.with_retry("get_quote", || self.inner.get_quote(token)).await
    }

    async fn get_ltp(&self, token: InstrumentToken) -> Result<Decimal, ExecutionError> {
        self.with_retry("get_ltp", || self.inner.get_ltp(token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct FlakyAdapter {
        failures_before_success: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl BrokerAdapter for FlakyAdapter {
        fn events(&self) -> mpsc::UnboundedReceiver<BrokerEvent> {
            mpsc::unbounded_channel().1
        }
        async fn subscribe(&self, _tokens: &[InstrumentToken]) -> Result<(), ExecutionError> {
            Ok(())
        }
        async fn unsubscribe(&self, _tokens: &[InstrumentToken]) -> Result<(), ExecutionError> {
            Ok(())
        }
        async fn set_mode(
            &self,
            _tokens: &[InstrumentToken],
            _mode: SubscriptionMode,
        ) -> Result<(), ExecutionError> {
            Ok(())
        }
        async fn place_order(
            &self,
            _params: PlaceOrderParams,
        ) -> Result<BrokerOrderId, ExecutionError> {
            unreachable!("not exercised in this test")
        }
        async fn modify_order(&self, _params: ModifyOrderParams) -> Result<(), ExecutionError> {
            Ok(())
        }
        async fn cancel_order(&self, _id: &BrokerOrderId) -> Result<(), ExecutionError> {
            Ok(())
        }
        async fn get_orders(&self) -> Result<Vec<OrderUpdate>, ExecutionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures_before_success {
                Err(ExecutionError::Transient("timeout".into()))
            } else {
                Ok(vec![])
            }
        }
        async fn get_order_history(
            &self,
            _id: &BrokerOrderId,
        ) -> Result<Vec<OrderUpdate>, ExecutionError> {
            Ok(vec![])
        }
        async fn get_positions(&self) -> Result<Vec<Position>, ExecutionError> {
            Ok(vec![])
        }
        async fn get_margins(&self) -> Result<Margins, ExecutionError> {
            Ok(Margins { available: Decimal::ZERO, used: Decimal::ZERO })
        }
        async fn get_instruments(
            &self,
            _exchange: ExchangeId,
        ) -> Result<Vec<Instrument>, ExecutionError> {
            Ok(vec![])
        }
        async fn get_historical_data(
            &self,
            _token: InstrumentToken,
            _interval_minutes: u32,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> Result<Vec<Candle>, ExecutionError> {
            Ok(vec![])
        }
        async fn get_quote(&self, _token: InstrumentToken) -> Result<Quote, ExecutionError> {
            Ok(Quote { bid: Decimal::ZERO, ask: Decimal::ZERO, last_price: Decimal::ZERO })
        }
        async fn get_ltp(&self, _token: InstrumentToken) -> Result<Decimal, ExecutionError> {
            Ok(Decimal::ZERO)
        }
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let client = RetryingClient::new(
            FlakyAdapter { failures_before_success: 2, calls: AtomicU32::new(0) },
            RetryPolicy { max_attempts: 5, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(4) },
        );
        assert!(client.get_orders().await.is_ok());
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let client = RetryingClient::new(
            FlakyAdapter { failures_before_success: 10, calls: AtomicU32::new(0) },
            RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(4) },
        );
        assert!(matches!(
            client.get_orders().await,
            Err(ExecutionError::RetriesExhausted { attempts: 3, .. })
        ));
    }
}
