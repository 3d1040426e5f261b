pub mod domain;
pub mod event;
pub mod network;
pub mod provider;
#[cfg(feature = "yew")]
pub mod yew;

use std::{cell::RefCell, rc::Rc};

use log::error;
use wasm_bindgen_futures::spawn_local;

use self::{
    domain::{format_wei_hex, Address, QuantityError},
    event::Event,
    network::NetworkDescriptor,
    provider::{EventKind, Provider, ProviderError, ProviderEvent},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(Address),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting)
    }

    pub fn address(&self) -> Option<&Address> {
        match self {
            Self::Connected(address) => Some(address),
            _ => None,
        }
    }
}

/// What to do when the wallet switches chains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChainChangePolicy {
    #[default]
    Noop,
    RefreshBalance,
    Reload,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectorConfig {
    pub track_balance: bool,
    pub on_chain_change: ChainChangePolicy,
    /// When set, the chain is registered with the wallet before accounts are
    /// requested; a rejected registration aborts the connect attempt.
    pub network: Option<NetworkDescriptor>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("No injected wallet provider available")]
    ProviderMissing,

    #[error("Chain registration rejected: {0}")]
    NetworkRegistration(#[source] ProviderError),

    #[error(transparent)]
    Request(#[from] ProviderError),

    #[error("Malformed accounts response: {0}")]
    BadResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("Balance can only be read while connected")]
    NotConnected,

    #[error(transparent)]
    Read(#[from] ProviderError),

    #[error("Malformed balance response: {0}")]
    BadResponse(String),

    #[error(transparent)]
    Quantity(#[from] QuantityError),
}

/// Owns the connection state machine and all traffic to the injected
/// provider. Cheap to clone; clones share state, so UI callbacks can each
/// carry their own handle.
pub struct WalletConnector<P: Provider> {
    provider: Option<P>,
    config: Rc<ConnectorConfig>,
    state: Rc<RefCell<ConnectionState>>,
    balance: Rc<RefCell<Option<String>>>,
    listener: Option<Rc<dyn Fn(Event)>>,
}

impl<P: Provider> Clone for WalletConnector<P>
where
    P: Clone,
{
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            config: self.config.clone(),
            state: self.state.clone(),
            balance: self.balance.clone(),
            listener: self.listener.clone(),
        }
    }
}

impl<P: Provider + Clone + 'static> WalletConnector<P> {
    pub fn new(
        provider: Option<P>,
        config: ConnectorConfig,
        listener: Option<Box<dyn Fn(Event)>>,
    ) -> Self {
        Self {
            provider,
            config: Rc::new(config),
            state: Rc::new(RefCell::new(ConnectionState::Disconnected)),
            balance: Rc::new(RefCell::new(None)),
            listener: listener.map(|l| Rc::from(l) as Rc<dyn Fn(Event)>),
        }
    }

    pub fn detect_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn balance(&self) -> Option<String> {
        self.balance.borrow().clone()
    }

    /// Requests account access. `Ok(None)` means the wallet resolved with an
    /// empty account list; state stays `Disconnected` and no error is
    /// raised. Every failure is terminal for this attempt, retrying is the
    /// user's click.
    pub async fn connect(&self) -> Result<Option<Address>, ConnectError> {
        let provider = self.provider.as_ref().ok_or(ConnectError::ProviderMissing)?;
        self.set_state(ConnectionState::Connecting);

        if let Some(network) = &self.config.network {
            if let Err(err) =
                provider.request("wallet_addEthereumChain", Some(network.add_chain_params())).await
            {
                self.set_state(ConnectionState::Disconnected);
                return Err(ConnectError::NetworkRegistration(err));
            }
        }

        let accounts = match provider
            .request("eth_requestAccounts", None)
            .await
            .map_err(ConnectError::from)
            .and_then(parse_accounts)
        {
            Ok(accounts) => accounts,
            Err(err) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(err);
            }
        };

        match accounts.into_iter().next() {
            Some(address) => {
                self.set_state(ConnectionState::Connected(address.clone()));
                if self.config.track_balance {
                    if let Err(err) = self.refresh_balance().await {
                        error!("balance refresh after connect failed: {err}");
                    }
                }
                Ok(Some(address))
            }
            None => {
                self.set_state(ConnectionState::Disconnected);
                Ok(None)
            }
        }
    }

    /// Reads the current account's balance and stores the formatted ether
    /// string. Callers log failures; they are never surfaced to the user.
    pub async fn refresh_balance(&self) -> Result<String, BalanceError> {
        let provider = self.provider.as_ref().ok_or(BalanceError::NotConnected)?;
        let address =
            self.state.borrow().address().cloned().ok_or(BalanceError::NotConnected)?;
        let value = provider
            .request("eth_getBalance", Some(serde_json::json!([address, "latest"])))
            .await?;
        let quantity: String = serde_json::from_value(value)
            .map_err(|err| BalanceError::BadResponse(err.to_string()))?;
        let formatted = format_wei_hex(&quantity)?;
        self.set_balance(Some(formatted.clone()));
        Ok(formatted)
    }

    /// Clears local state only. The injected provider has no revocation
    /// call, so the wallet-side authorization stays.
    pub fn disconnect(&self) {
        self.set_state(ConnectionState::Disconnected);
    }

    /// Silent `eth_accounts` query, used on mount to pick up an existing
    /// authorization without prompting. Failures are logged only.
    pub async fn restore(&self) {
        let Some(provider) = self.provider.as_ref() else { return };
        match provider
            .request("eth_accounts", None)
            .await
            .map_err(ConnectError::from)
            .and_then(parse_accounts)
        {
            Ok(accounts) => self.apply_accounts(accounts),
            Err(err) => error!("checking existing connection failed: {err}"),
        }
    }

    /// Registers listeners for both provider events. Dropping the returned
    /// handle removes them; events fired afterwards have no effect.
    pub fn subscribe(&self) -> Option<Subscription<P>> {
        let provider = self.provider.clone()?;
        let this = self.clone();
        provider.on(
            EventKind::AccountsChanged,
            Rc::new(move |event| {
                if let ProviderEvent::AccountsChanged(accounts) = event {
                    this.apply_accounts(accounts);
                }
            }),
        );
        let this = self.clone();
        provider.on(
            EventKind::ChainChanged,
            Rc::new(move |event| {
                if let ProviderEvent::ChainChanged(chain_id) = event {
                    this.apply_chain_changed(chain_id);
                }
            }),
        );
        Some(Subscription { provider })
    }

    fn apply_accounts(&self, accounts: Vec<Address>) {
        self.notify(Event::AccountsChanged(accounts.clone()));
        match accounts.into_iter().next() {
            Some(address) => {
                self.set_state(ConnectionState::Connected(address));
                if self.config.track_balance {
                    self.spawn_balance_refresh();
                }
            }
            None => self.set_state(ConnectionState::Disconnected),
        }
    }

    fn apply_chain_changed(&self, chain_id: String) {
        self.notify(Event::ChainChanged(chain_id));
        match self.config.on_chain_change {
            ChainChangePolicy::Noop => {}
            ChainChangePolicy::RefreshBalance => {
                if self.state.borrow().is_connected() {
                    self.spawn_balance_refresh();
                }
            }
            ChainChangePolicy::Reload => self.notify(Event::ReloadRequested),
        }
    }

    fn spawn_balance_refresh(&self) {
        let this = self.clone();
        spawn_local(async move {
            if let Err(err) = this.refresh_balance().await {
                error!("balance refresh failed: {err}");
            }
        });
    }

    fn set_state(&self, new_state: ConnectionState) {
        *self.state.borrow_mut() = new_state.clone();
        match new_state {
            ConnectionState::Connecting => self.notify(Event::Connecting),
            ConnectionState::Connected(address) => self.notify(Event::Connected(address)),
            ConnectionState::Disconnected => {
                self.set_balance(None);
                self.notify(Event::Disconnected);
            }
        }
    }

    fn set_balance(&self, value: Option<String>) {
        if *self.balance.borrow() == value {
            return;
        }
        *self.balance.borrow_mut() = value.clone();
        self.notify(Event::BalanceChanged(value));
    }

    fn notify(&self, event: Event) {
        if let Some(listener) = &self.listener {
            listener(event);
        }
    }
}

/// Scoped listener registration. Exists so an unmounted view cannot keep
/// receiving provider callbacks.
pub struct Subscription<P: Provider> {
    provider: P,
}

impl<P: Provider> Drop for Subscription<P> {
    fn drop(&mut self) {
        self.provider.remove_all_listeners(EventKind::AccountsChanged);
        self.provider.remove_all_listeners(EventKind::ChainChanged);
    }
}

fn parse_accounts(value: serde_json::Value) -> Result<Vec<Address>, ConnectError> {
    serde_json::from_value(value).map_err(|err| ConnectError::BadResponse(err.to_string()))
}
