//! OAuth app registrations, read from `{PROVIDER}_CLIENT_ID` / `_CLIENT_SECRET`.

use crmhub_model::Provider;
use std::collections::HashMap;

/// Client id/secret of one registered OAuth app.
#[derive(Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// OAuth app registrations by provider. Providers without both variables set
/// are absent.
#[derive(Debug, Clone, Default)]
pub struct OAuthClients {
    clients: HashMap<Provider, OAuthClient>,
}

impl OAuthClients {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut clients = HashMap::new();
        for provider in Provider::ALL {
            let (id_var, secret_var) = env_vars(provider);
            let id = lookup(&id_var).filter(|v| !v.is_empty());
            let secret = lookup(&secret_var).filter(|v| !v.is_empty());
            if let (Some(client_id), Some(client_secret)) = (id, secret) {
                clients.insert(
                    provider,
                    OAuthClient {
                        client_id,
                        client_secret,
                    },
                );
            }
        }
        Self { clients }
    }

    pub fn get(&self, provider: Provider) -> Option<&OAuthClient> {
        self.clients.get(&provider)
    }

    pub fn insert(&mut self, provider: Provider, client: OAuthClient) {
        self.clients.insert(provider, client);
    }

    /// Providers that cannot run the OAuth flow.
    pub fn missing(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| !self.clients.contains_key(p))
            .collect()
    }
}

/// The id and secret variable names for a provider.
pub fn env_vars(provider: Provider) -> (String, String) {
    let prefix = provider.env_prefix();
    (
        format!("{}_CLIENT_ID", prefix),
        format!("{}_CLIENT_SECRET", prefix),
    )
}
