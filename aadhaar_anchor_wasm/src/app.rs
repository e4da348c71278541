// File: aadhaar_anchor_wasm/src/app.rs
//! The JS-facing application facade.
//!
//! Owns the flow controller, prover adapter, contract gateway and
//! verification flow; the JS UI calls in with user actions and prover
//! status reports and renders the returned state snapshots. Wallet events
//! are registered at construction and removed in `teardown`.

use std::cell::RefCell;
use std::rc::Rc;

use ethers_core::types::Address;
use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use aadhaar_anchor::types::network_name;
use aadhaar_anchor::{
    ContractGateway, FlowController, Proof, ProverAdapter, ProverStatus, VerificationFlow,
    WalletConnector, WalletSession,
};

use crate::ethereum::{provider_detected, BrowserTransport, EventSubscription};
use crate::storage::BundleStore;

#[wasm_bindgen]
pub struct App {
    contract_address: Address,
    flow: Rc<RefCell<FlowController>>,
    adapter: Rc<RefCell<ProverAdapter>>,
    gateway: Rc<RefCell<ContractGateway<BrowserTransport>>>,
    verifier: Rc<RefCell<VerificationFlow>>,
    store: BundleStore,
    subscriptions: Vec<EventSubscription>,
}

#[wasm_bindgen]
impl App {
    /// Builds the application for the registry contract at
    /// `contract_address` and wires up wallet event listeners when a
    /// provider is present.
    #[wasm_bindgen(constructor)]
    pub fn new(contract_address: &str) -> Result<App, JsValue> {
        let contract_address: Address = contract_address
            .parse()
            .map_err(|e| JsValue::from_str(&format!("bad contract address: {e}")))?;

        let flow = Rc::new(RefCell::new(FlowController::new()));
        let gateway = Rc::new(RefCell::new(ContractGateway::new(
            contract_address,
            BrowserTransport,
        )));

        let detected = provider_detected();
        flow.borrow_mut().provider_detected(detected);

        let mut subscriptions = Vec::new();
        if detected {
            subscriptions.push(Self::watch_accounts(&flow)?);
            subscriptions.push(Self::watch_chain(&flow)?);
        }

        Ok(App {
            contract_address,
            flow,
            adapter: Rc::new(RefCell::new(ProverAdapter::new())),
            gateway,
            verifier: Rc::new(RefCell::new(VerificationFlow::new())),
            store: BundleStore::new()?,
            subscriptions,
        })
    }

    /// Current flow state for rendering.
    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.flow.borrow().snapshot())
    }

    /// Restores a pre-existing connection on page load: a passive account
    /// query that never prompts. When the wallet already exposes accounts,
    /// the flow jumps straight to the QR step.
    pub fn bootstrap(&self) -> Promise {
        let flow = Rc::clone(&self.flow);

        future_to_promise(async move {
            let connector = WalletConnector::new(BrowserTransport);
            if let Ok(accounts) = connector.current_accounts().await {
                if let Some(&address) = accounts.first() {
                    if let Ok(network_name) = connector.network_name().await {
                        flow.borrow_mut()
                            .wallet_connected(WalletSession { address, network_name });
                    }
                }
            }
            to_js(&flow.borrow().snapshot())
        })
    }

    /// Requests wallet access; resolves to the updated state snapshot.
    #[wasm_bindgen(js_name = connectWallet)]
    pub fn connect_wallet(&self) -> Promise {
        let flow = Rc::clone(&self.flow);

        future_to_promise(async move {
            let connector = WalletConnector::new(BrowserTransport);
            match connector.connect().await {
                Ok(session) => flow.borrow_mut().wallet_connected(session),
                Err(err) => flow.borrow_mut().wallet_connect_failed(err.to_string()),
            }
            to_js(&flow.borrow().snapshot())
        })
    }

    /// Feeds a prover-widget status report into the flow. When the report
    /// completes a proof, the hash is anchored on chain before the promise
    /// resolves; a successful anchor is persisted to localStorage.
    #[wasm_bindgen(js_name = proverStatus)]
    pub fn prover_status(
        &self,
        status: String,
        proof_json: Option<String>,
        error_message: Option<String>,
    ) -> Promise {
        let flow = Rc::clone(&self.flow);
        let adapter = Rc::clone(&self.adapter);
        let gateway = Rc::clone(&self.gateway);
        let store = self.store.clone();
        let contract_address = self.contract_address;

        future_to_promise(async move {
            let status = ProverStatus::parse(&status)
                .ok_or_else(|| JsValue::from_str(&format!("unknown prover status: {status}")))?;
            let proof = match proof_json {
                Some(raw) => Some(
                    serde_json::from_str::<Proof>(&raw)
                        .map_err(|e| JsValue::from_str(&format!("bad proof payload: {e}")))?,
                ),
                None => None,
            };

            let event = adapter.borrow_mut().observe(status, proof, error_message);
            if let Some(event) = event {
                let ready = flow.borrow_mut().prover_event(event);
                if ready {
                    let mut flow = flow.borrow_mut();
                    let mut gateway = gateway.borrow_mut();
                    if flow.drive_submission(&mut gateway).await.is_ok() {
                        if let Some(bundle) = flow.export_bundle(contract_address) {
                            store.save_bundle(&bundle)?;
                        }
                    }
                    return to_js(&flow.snapshot());
                }
            }
            to_js(&flow.borrow().snapshot())
        })
    }

    /// Verifies an uploaded proof document; resolves to the verification
    /// status (idle/success/failed).
    #[wasm_bindgen(js_name = verifyFile)]
    pub fn verify_file(&self, contents: Vec<u8>) -> Promise {
        let verifier = Rc::clone(&self.verifier);
        let gateway = Rc::clone(&self.gateway);

        future_to_promise(async move {
            let mut verifier = verifier.borrow_mut();
            let mut gateway = gateway.borrow_mut();
            let status = verifier.run(&contents, &mut gateway).await;
            to_js(status)
        })
    }

    /// The "Download Proof" document, available after a successful anchor.
    #[wasm_bindgen(js_name = downloadBundle)]
    pub fn download_bundle(&self) -> Option<String> {
        self.flow
            .borrow()
            .export_bundle(self.contract_address)
            .map(|bundle| bundle.to_json())
    }

    /// Bundles persisted by earlier sessions.
    #[wasm_bindgen(js_name = savedBundles)]
    pub fn saved_bundles(&self) -> Result<JsValue, JsValue> {
        to_js(&self.store.load_bundles()?)
    }

    /// Every proof record the contract stores for the connected account.
    #[wasm_bindgen(js_name = userProofs)]
    pub fn user_proofs(&self) -> Promise {
        let flow = Rc::clone(&self.flow);
        let gateway = Rc::clone(&self.gateway);

        future_to_promise(async move {
            let address = flow
                .borrow()
                .session()
                .map(|session| session.address)
                .ok_or_else(|| JsValue::from_str("no wallet connected"))?;
            let records = gateway
                .borrow_mut()
                .user_proofs(address)
                .await
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            to_js(&records)
        })
    }

    /// Start-over: clears all transient flow state and the prover
    /// observation, keeping persisted bundles.
    pub fn reset(&self) -> Result<JsValue, JsValue> {
        self.flow.borrow_mut().reset();
        self.adapter.borrow_mut().reset();
        self.state()
    }

    /// Drops persisted bundles from localStorage.
    #[wasm_bindgen(js_name = clearHistory)]
    pub fn clear_history(&self) -> Result<(), JsValue> {
        self.store.clear()
    }

    /// Removes the wallet event listeners. Called when the UI unmounts;
    /// dropping the `App` does the same.
    pub fn teardown(&mut self) {
        self.subscriptions.clear();
    }
}

impl App {
    fn watch_accounts(
        flow: &Rc<RefCell<FlowController>>,
    ) -> Result<EventSubscription, JsValue> {
        let flow = Rc::clone(flow);
        EventSubscription::subscribe("accountsChanged", move |accounts: JsValue| {
            let accounts: Vec<Address> = serde_wasm_bindgen::from_value::<Vec<String>>(accounts)
                .unwrap_or_default()
                .iter()
                .filter_map(|raw| raw.parse().ok())
                .collect();
            flow.borrow_mut().accounts_changed(&accounts);
        })
    }

    fn watch_chain(flow: &Rc<RefCell<FlowController>>) -> Result<EventSubscription, JsValue> {
        let flow = Rc::clone(flow);
        EventSubscription::subscribe("chainChanged", move |chain_id: JsValue| {
            let name = chain_id
                .as_string()
                .and_then(|raw| u64::from_str_radix(raw.trim_start_matches("0x"), 16).ok())
                .map(network_name);
            if let Some(name) = name {
                flow.borrow_mut().network_changed(name);
            }
        })
    }
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}
