use crate::domain::Address;

/// Notifications delivered to the listener registered at connector
/// construction. The UI layer reacts to these instead of polling.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connecting,
    Connected(Address),
    Disconnected,
    AccountsChanged(Vec<Address>),
    ChainChanged(String),
    BalanceChanged(Option<String>),
    ReloadRequested,
}
