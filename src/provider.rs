use std::{cell::RefCell, fmt::Display, rc::Rc};

use async_trait::async_trait;
use js_sys::Reflect;
use log::{debug, warn};
use serde::Serialize;
use wasm_bindgen::{closure::Closure, prelude::*, JsCast};
use wasm_bindgen_futures::JsFuture;

use crate::domain::Address;

#[wasm_bindgen]
extern "C" {
    type Ethereum;

    #[wasm_bindgen(method, catch)]
    fn request(this: &Ethereum, args: JsValue) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(method)]
    fn on(this: &Ethereum, event: &str, callback: &js_sys::Function);

    #[wasm_bindgen(method, js_name = removeAllListeners)]
    fn remove_all_listeners(this: &Ethereum, event: &str);

    #[wasm_bindgen(method, getter, js_name = isMetaMask)]
    fn is_meta_mask(this: &Ethereum) -> Option<bool>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Wallet error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Provider call failed: {0}")]
    Js(String),

    #[error("Malformed provider response: {0}")]
    Serialization(String),
}

impl ProviderError {
    fn from_js(value: JsValue) -> Self {
        let code = Reflect::get(&value, &JsValue::from_str("code"))
            .ok()
            .and_then(|c| c.as_f64())
            .map(|c| c as i64);
        let message = Reflect::get(&value, &JsValue::from_str("message"))
            .ok()
            .and_then(|m| m.as_string());
        match (code, message) {
            (Some(code), Some(message)) => Self::Rpc { code, message },
            _ => Self::Js(format!("{value:?}")),
        }
    }
}

/// The two change notifications the injected provider broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AccountsChanged,
    ChainChanged,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(String),
}

impl ProviderEvent {
    fn from_js(kind: EventKind, payload: JsValue) -> Result<Self, ProviderError> {
        match kind {
            EventKind::AccountsChanged => serde_wasm_bindgen::from_value(payload)
                .map(Self::AccountsChanged)
                .map_err(|err| ProviderError::Serialization(err.to_string())),
            EventKind::ChainChanged => serde_wasm_bindgen::from_value(payload)
                .map(Self::ChainChanged)
                .map_err(|err| ProviderError::Serialization(err.to_string())),
        }
    }
}

/// The injected capability the connector talks to. Kept behind a trait so
/// tests can substitute a scripted fake for the browser object.
#[async_trait(?Send)]
pub trait Provider {
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, ProviderError>;

    fn on(&self, kind: EventKind, listener: Rc<dyn Fn(ProviderEvent)>);

    fn remove_all_listeners(&self, kind: EventKind);
}

/// `window.ethereum`, wrapped. Listener closures are owned here so they stay
/// alive until the matching `remove_all_listeners` call.
#[derive(Clone)]
pub struct InjectedProvider {
    inner: Rc<Ethereum>,
    closures: Rc<RefCell<Vec<(EventKind, Closure<dyn Fn(JsValue)>)>>>,
}

impl InjectedProvider {
    /// Looks for the well-known global binding. `None` means no wallet
    /// extension is installed in this browser.
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let object = Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
        if object.is_undefined() || object.is_null() {
            return None;
        }
        let inner: Ethereum = object.unchecked_into();
        debug!("injected provider detected (isMetaMask: {:?})", inner.is_meta_mask());
        Some(Self { inner: Rc::new(inner), closures: Rc::new(RefCell::new(Vec::new())) })
    }

    pub fn is_metamask(&self) -> bool {
        self.inner.is_meta_mask().unwrap_or(false)
    }
}

#[derive(Serialize)]
struct RequestArgs<'a> {
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a serde_json::Value>,
}

#[async_trait(?Send)]
impl Provider for InjectedProvider {
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, ProviderError> {
        let args = RequestArgs { method, params: params.as_ref() }
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|err| ProviderError::Serialization(err.to_string()))?;
        let promise = self.inner.request(args).map_err(ProviderError::from_js)?;
        match JsFuture::from(promise).await {
            Ok(value) => serde_wasm_bindgen::from_value(value)
                .map_err(|err| ProviderError::Serialization(err.to_string())),
            Err(err) => Err(ProviderError::from_js(err)),
        }
    }

    fn on(&self, kind: EventKind, listener: Rc<dyn Fn(ProviderEvent)>) {
        let closure = Closure::<dyn Fn(JsValue)>::new(move |payload: JsValue| {
            match ProviderEvent::from_js(kind, payload) {
                Ok(event) => listener(event),
                Err(err) => warn!("dropping malformed {kind} payload: {err}"),
            }
        });
        self.inner.on(kind.as_str(), closure.as_ref().unchecked_ref());
        self.closures.borrow_mut().push((kind, closure));
    }

    fn remove_all_listeners(&self, kind: EventKind) {
        self.inner.remove_all_listeners(kind.as_str());
        self.closures.borrow_mut().retain(|(k, _)| *k != kind);
    }
}
