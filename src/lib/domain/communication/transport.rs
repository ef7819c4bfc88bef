//! Message transport

use async_trait::async_trait;

#[cfg(test)]
use mockall::mock;

use crate::domain::communication::{
    errors::TransportError, message::OutboundMessage, options::ApiKey,
};

/// Delivers composed messages to the email provider
#[async_trait]
pub trait Transport: Clone + Send + Sync + 'static {
    /// Send a message
    ///
    /// # Arguments
    /// * `api_key` - The [`ApiKey`] authorizing the delivery.
    /// * `message` - The fully composed [`OutboundMessage`].
    ///
    /// # Returns
    /// [`Ok`] with `true` if the provider accepted the message and `false` if it
    /// refused it, or a [`TransportError`] if the provider could not be asked.
    async fn send_message(
        &self,
        api_key: &ApiKey,
        message: &OutboundMessage,
    ) -> Result<bool, TransportError>;
}

#[cfg(test)]
mock! {
    pub Transport {}

    impl Clone for Transport {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl Transport for Transport {
        async fn send_message(&self, api_key: &ApiKey, message: &OutboundMessage) -> Result<bool, TransportError>;
    }
}
