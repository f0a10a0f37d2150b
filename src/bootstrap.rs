//! One-time acquisition of the [`ServiceHandle`].
//!
//! Bootstrapping walks three external steps (wallet key, chain claim,
//! application binding), each under its own timeout. [`Connection`] memoizes
//! the result process-wide: concurrent callers share the in-flight attempt
//! and see the same outcome, and a failed attempt is dropped from the slot so
//! the next caller starts over.

use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use async_trait::async_trait;
use derive_more::{Display, From, Into};
use futures::{
    FutureExt as _,
    future::{BoxFuture, Shared},
};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::transport::{GraphQlRequest, HttpServiceHandle, ServiceHandle, Transport, TransportError};

pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BootstrapStep {
    #[display("wallet setup")]
    Wallet,
    #[display("chain claim")]
    ChainClaim,
    #[display("application binding")]
    ApplicationBinding,
}

#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum BootstrapError {
    #[error("{step} timed out after {timeout:?}")]
    Timeout {
        step: BootstrapStep,
        timeout: Duration,
    },

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("faucet did not return a chain id")]
    MissingChainId,

    #[error("{0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Into)]
pub struct ChainId(pub String);

#[derive(Debug, Clone)]
pub struct Wallet {
    pub signer: PrivateKeySigner,
}

impl Wallet {
    #[must_use]
    pub fn owner(&self) -> Address {
        self.signer.address()
    }
}

/// The external steps needed before the service can be queried.
#[async_trait]
pub trait WalletBackend: Send + Sync {
    async fn create_wallet(&self) -> Result<Wallet, BootstrapError>;

    async fn claim_chain(&self, wallet: &Wallet) -> Result<ChainId, BootstrapError>;

    async fn bind_application(
        &self,
        chain: &ChainId,
    ) -> Result<Arc<dyn ServiceHandle>, BootstrapError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Uninitialized,
    Initializing,
    Ready,
}

type Attempt = Shared<BoxFuture<'static, Result<Arc<dyn ServiceHandle>, BootstrapError>>>;

#[derive(Default)]
struct Slot {
    generation: u64,
    attempt: Option<Attempt>,
}

pub struct Connection {
    backend: Arc<dyn WalletBackend>,
    step_timeout: Duration,
    slot: Mutex<Slot>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("step_timeout", &self.step_timeout)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Connection {
    #[must_use]
    pub fn new(backend: Arc<dyn WalletBackend>, step_timeout: Duration) -> Self {
        Self {
            backend,
            step_timeout,
            slot: Mutex::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> BootstrapState {
        let slot = self.slot.lock().expect("bootstrap slot lock should not be poisoned");
        match slot.attempt.as_ref().map(Shared::peek) {
            None | Some(Some(Err(_))) => BootstrapState::Uninitialized,
            Some(None) => BootstrapState::Initializing,
            Some(Some(Ok(_))) => BootstrapState::Ready,
        }
    }

    /// Return the service handle, bootstrapping it first if needed.
    pub async fn handle(&self) -> Result<Arc<dyn ServiceHandle>, BootstrapError> {
        let (generation, attempt) = {
            let mut slot = self.slot.lock().expect("bootstrap slot lock should not be poisoned");
            if let Some(attempt) = &slot.attempt {
                (slot.generation, attempt.clone())
            } else {
                slot.generation += 1;
                debug!(generation = slot.generation, "starting bootstrap");
                let backend = Arc::clone(&self.backend);
                let step_timeout = self.step_timeout;
                let attempt = async move { run(backend.as_ref(), step_timeout).await }
                    .boxed()
                    .shared();
                slot.attempt = Some(attempt.clone());
                (slot.generation, attempt)
            }
        };

        let result = attempt.await;
        if let Err(err) = &result {
            let mut slot = self.slot.lock().expect("bootstrap slot lock should not be poisoned");
            // a later attempt may already occupy the slot
            if slot.generation == generation && slot.attempt.is_some() {
                slot.attempt = None;
                warn!(%err, "bootstrap failed, the next caller will retry");
            }
        }
        result
    }
}

async fn run(
    backend: &dyn WalletBackend,
    step_timeout: Duration,
) -> Result<Arc<dyn ServiceHandle>, BootstrapError> {
    let wallet = with_timeout(BootstrapStep::Wallet, step_timeout, backend.create_wallet()).await?;
    info!(owner = %wallet.owner(), "wallet ready");
    let chain = with_timeout(
        BootstrapStep::ChainClaim,
        step_timeout,
        backend.claim_chain(&wallet),
    )
    .await?;
    info!(%chain, "chain claimed");
    let handle = with_timeout(
        BootstrapStep::ApplicationBinding,
        step_timeout,
        backend.bind_application(&chain),
    )
    .await?;
    info!("application bound");
    Ok(handle)
}

async fn with_timeout<T>(
    step: BootstrapStep,
    timeout: Duration,
    fut: impl Future<Output = Result<T, BootstrapError>>,
) -> Result<T, BootstrapError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| BootstrapError::Timeout { step, timeout })?
}

/// Bootstraps against a chain faucet and a node service.
#[derive(Debug, Clone)]
pub struct FaucetBackend {
    faucet: Transport,
    service_url: String,
    application_id: String,
    private_key: Option<String>,
    request_timeout: Duration,
}

impl FaucetBackend {
    pub fn new(
        faucet_url: &str,
        service_url: impl Into<String>,
        application_id: impl Into<String>,
        private_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, BootstrapError> {
        let faucet = HttpServiceHandle::new(faucet_url, request_timeout)?;
        Ok(Self {
            faucet: Transport::new(Arc::new(faucet)),
            service_url: service_url.into(),
            application_id: application_id.into(),
            private_key,
            request_timeout,
        })
    }

    #[must_use]
    pub fn application_endpoint(&self, chain: &ChainId) -> String {
        format!(
            "{}/chains/{chain}/applications/{}",
            self.service_url.trim_end_matches('/'),
            self.application_id
        )
    }
}

/// The faucet answers `claim` either with the chain id itself or with an
/// object carrying it.
fn chain_id_from_claim(data: &Value) -> Option<ChainId> {
    let claim = data.get("claim")?;
    let id = match claim {
        Value::String(id) => Some(id.as_str()),
        Value::Object(fields) => ["chainId", "chain_id", "id"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str)),
        _ => None,
    }?;
    (!id.is_empty()).then(|| ChainId(id.to_string()))
}

#[async_trait]
impl WalletBackend for FaucetBackend {
    async fn create_wallet(&self) -> Result<Wallet, BootstrapError> {
        let signer = match &self.private_key {
            Some(key) => key
                .parse::<PrivateKeySigner>()
                .map_err(|err| BootstrapError::InvalidKey(err.to_string()))?,
            None => {
                debug!("no private key configured, generating one");
                PrivateKeySigner::random()
            }
        };
        Ok(Wallet { signer })
    }

    async fn claim_chain(&self, wallet: &Wallet) -> Result<ChainId, BootstrapError> {
        let request = GraphQlRequest::new("mutation Claim($owner: AccountOwner!) { claim(owner: $owner) }")
            .variables(json!({ "owner": wallet.owner().to_string() }))
            .operation_name("Claim");
        let data = self.faucet.send(&request).await?;
        chain_id_from_claim(&data).ok_or(BootstrapError::MissingChainId)
    }

    async fn bind_application(
        &self,
        chain: &ChainId,
    ) -> Result<Arc<dyn ServiceHandle>, BootstrapError> {
        let handle = Arc::new(HttpServiceHandle::new(
            self.application_endpoint(chain),
            self.request_timeout,
        )?);
        // make sure the application answers before handing it out
        Transport::new(handle.clone())
            .send(&GraphQlRequest::new("query { __typename }"))
            .await?;
        debug!(endpoint = handle.endpoint(), "application reachable");
        Ok(handle)
    }
}
