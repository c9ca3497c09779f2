use crate::client::{ClientOptions, GraphqlClient};
use sourcing_connector::ConnectorResult;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use url::Url;

/// Hands out one shared client per API URL, for as long as the factory lives.
#[derive(Default)]
pub struct ClientFactory {
    clients: Mutex<HashMap<Url, Arc<GraphqlClient>>>,
}

impl ClientFactory {
    /// An empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The client for `base`. The options only apply when the client is first created.
    pub async fn client(&self, base: &Url, options: &ClientOptions) -> ConnectorResult<Arc<GraphqlClient>> {
        let mut clients = self.clients.lock().await;

        if let Some(client) = clients.get(base) {
            return Ok(client.clone());
        }

        tracing::debug!(api_url = %base, "Creating a GraphQL client");

        let client = Arc::new(GraphqlClient::new(base.clone(), options)?);
        clients.insert(base.clone(), client.clone());

        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_setup::runtime::run_with_tokio;

    #[test]
    fn clients_are_shared_per_api_url() {
        run_with_tokio(async {
            let factory = ClientFactory::new();
            let options = ClientOptions::default();
            let blog = Url::parse("http://localhost:1337").unwrap();
            let shop = Url::parse("http://localhost:1338").unwrap();

            let first = factory.client(&blog, &options).await.unwrap();
            let second = factory.client(&blog, &options).await.unwrap();
            let other = factory.client(&shop, &options).await.unwrap();

            assert!(Arc::ptr_eq(&first, &second));
            assert!(!Arc::ptr_eq(&first, &other));
            assert_eq!(other.base(), &shop);
        })
    }
}
