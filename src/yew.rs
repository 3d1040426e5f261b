use gloo::dialogs::alert;
use log::error;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::{
    event::Event,
    provider::InjectedProvider,
    ConnectError, ConnectionState, ConnectorConfig, WalletConnector,
};

pub type InjectedConnector = WalletConnector<InjectedProvider>;

pub const WALLET_INSTALL_URL: &str = "https://metamask.io/download/";

#[derive(Properties, PartialEq)]
pub struct NavbarProps {
    #[prop_or_default]
    pub brand: AttrValue,
    #[prop_or_default]
    pub config: ConnectorConfig,
    /// Navigation links rendered between the brand and the wallet controls.
    #[prop_or_default]
    pub children: Children,
}

#[function_component(Navbar)]
pub fn navbar(props: &NavbarProps) -> Html {
    let state = use_state(ConnectionState::default);
    let balance = use_state(|| None::<String>);
    let show_dropdown = use_state(|| false);

    let connector = {
        let state = state.clone();
        let balance = balance.clone();
        use_memo(props.config.clone(), move |config| {
            let listener: Box<dyn Fn(Event)> = Box::new(move |event| match event {
                Event::Connecting => state.set(ConnectionState::Connecting),
                Event::Connected(address) => state.set(ConnectionState::Connected(address)),
                Event::Disconnected => state.set(ConnectionState::Disconnected),
                Event::BalanceChanged(value) => balance.set(value),
                Event::ReloadRequested => reload_page(),
                Event::AccountsChanged(_) | Event::ChainChanged(_) => {}
            });
            WalletConnector::new(InjectedProvider::detect(), config.clone(), Some(listener))
        })
    };

    {
        let connector = connector.clone();
        use_effect_with((), move |_| {
            let subscription = connector.subscribe();
            {
                let connector = connector.clone();
                spawn_local(async move { connector.restore().await });
            }
            move || drop(subscription)
        });
    }

    let on_connect = {
        let connector = connector.clone();
        Callback::from(move |_: MouseEvent| {
            let connector = connector.clone();
            spawn_local(async move {
                match connector.connect().await {
                    Ok(_) => {}
                    Err(ConnectError::ProviderMissing) => {
                        alert("Please install a browser wallet to use this feature");
                    }
                    Err(err) => {
                        error!("wallet connect failed: {err}");
                        alert("Failed to connect to the wallet");
                    }
                }
            });
        })
    };

    let on_toggle = {
        let show_dropdown = show_dropdown.clone();
        Callback::from(move |_: MouseEvent| show_dropdown.set(!*show_dropdown))
    };

    let on_disconnect = {
        let connector = connector.clone();
        let show_dropdown = show_dropdown.clone();
        Callback::from(move |_: MouseEvent| {
            show_dropdown.set(false);
            connector.disconnect();
        })
    };

    let wallet = match &*state {
        ConnectionState::Connected(address) => html! {
            <div class="navbar-wallet">
                <button class="navbar-badge" onclick={on_toggle}>
                    <span class="navbar-badge-dot"></span>
                    <span class="navbar-badge-address">{ address.short() }</span>
                </button>
                if *show_dropdown {
                    <div class="navbar-dropdown">
                        <div class="navbar-dropdown-address">{ address.to_string() }</div>
                        if let Some(balance) = balance.as_ref() {
                            <div class="navbar-dropdown-balance">{ format!("{balance} ETH") }</div>
                        }
                        <button class="navbar-dropdown-disconnect" onclick={on_disconnect}>
                            { "Disconnect" }
                        </button>
                    </div>
                }
            </div>
        },
        _ if !connector.detect_provider() => html! {
            <a
                class="navbar-connect"
                href={WALLET_INSTALL_URL}
                target="_blank"
                rel="noopener noreferrer"
            >
                { "Install MetaMask" }
            </a>
        },
        other => {
            let connecting = other.is_connecting();
            html! {
                <button class="navbar-connect" onclick={on_connect} disabled={connecting}>
                    if connecting {
                        <span class="navbar-spinner"></span>
                        { "Connecting..." }
                    } else {
                        { "Connect Wallet" }
                    }
                </button>
            }
        }
    };

    html! {
        <nav class="navbar">
            <div class="navbar-brand">{ props.brand.clone() }</div>
            <div class="navbar-links">{ for props.children.iter() }</div>
            { wallet }
        </nav>
    }
}

fn reload_page() {
    if let Some(window) = web_sys::window() {
        if let Err(err) = window.location().reload() {
            error!("page reload failed: {err:?}");
        }
    }
}
