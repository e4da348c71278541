// File: aadhaar_anchor_wasm/src/ethereum.rs
//! EIP-1193 access to `window.ethereum`.
//!
//! Implements the core crate's transport seam over the injected provider
//! and owns the `accountsChanged`/`chainChanged` subscriptions, each held
//! as a guard that removes its listener when dropped.

use async_trait::async_trait;
use js_sys::{Function, Object, Promise, Reflect};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use aadhaar_anchor::{Eip1193Transport, TransportError};

/// Returns the injected provider object, if any.
pub fn provider() -> Option<Object> {
    let window = web_sys::window()?;
    let ethereum = Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
    if ethereum.is_undefined() || ethereum.is_null() {
        None
    } else {
        Some(Object::from(ethereum))
    }
}

/// Presence check: absence is the "install wallet" UI state.
pub fn provider_detected() -> bool {
    provider().is_some()
}

/// [`Eip1193Transport`] backed by `window.ethereum.request`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTransport;

#[async_trait(?Send)]
impl Eip1193Transport for BrowserTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let ethereum = provider()
            .ok_or_else(|| TransportError::new(None, "No wallet extension is available"))?;
        let request: Function = Reflect::get(&ethereum, &JsValue::from_str("request"))
            .ok()
            .and_then(|value| value.dyn_into().ok())
            .ok_or_else(|| TransportError::new(None, "provider has no request()"))?;

        let args = Object::new();
        set(&args, "method", &JsValue::from_str(method))?;
        let js_params = serde_wasm_bindgen::to_value(&params)
            .map_err(|e| TransportError::new(None, format!("param conversion: {e}")))?;
        set(&args, "params", &js_params)?;

        let promise: Promise = request
            .call1(&ethereum, &args)
            .map_err(provider_error)?
            .dyn_into()
            .map_err(|_| TransportError::new(None, "request() did not return a promise"))?;
        let result = JsFuture::from(promise).await.map_err(provider_error)?;

        serde_wasm_bindgen::from_value(result)
            .map_err(|e| TransportError::new(None, format!("non-JSON provider response: {e}")))
    }

    async fn sleep_ms(&self, ms: u32) {
        let promise = Promise::new(&mut |resolve, _reject| {
            if let Some(window) = web_sys::window() {
                let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
                    &resolve,
                    ms as i32,
                );
            }
        });
        let _ = JsFuture::from(promise).await;
    }
}

/// Extracts the EIP-1193 `{code, message}` shape from a thrown JS value.
fn provider_error(js: JsValue) -> TransportError {
    let code = Reflect::get(&js, &JsValue::from_str("code"))
        .ok()
        .and_then(|value| value.as_f64())
        .map(|value| value as i64);
    let message = Reflect::get(&js, &JsValue::from_str("message"))
        .ok()
        .and_then(|value| value.as_string())
        .unwrap_or_else(|| format!("{js:?}"));
    TransportError::new(code, message)
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), TransportError> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|_| TransportError::new(None, format!("cannot set {key} on request args")))
}

/// A registered provider-event listener, removed again on drop.
///
/// Handlers leak across UI remounts if they are not unsubscribed; tying
/// removal to drop makes teardown unconditional.
pub struct EventSubscription {
    event: &'static str,
    handler: Closure<dyn FnMut(JsValue)>,
}

impl EventSubscription {
    /// Registers `handler` for a provider event (`"accountsChanged"`,
    /// `"chainChanged"`).
    pub fn subscribe(
        event: &'static str,
        handler: impl FnMut(JsValue) + 'static,
    ) -> Result<Self, JsValue> {
        let ethereum =
            provider().ok_or_else(|| JsValue::from_str("No wallet extension is available"))?;
        let on: Function = Reflect::get(&ethereum, &JsValue::from_str("on"))?
            .dyn_into()
            .map_err(|_| JsValue::from_str("provider has no on()"))?;

        let handler = Closure::wrap(Box::new(handler) as Box<dyn FnMut(JsValue)>);
        on.call2(
            &ethereum,
            &JsValue::from_str(event),
            handler.as_ref().unchecked_ref(),
        )?;
        Ok(Self { event, handler })
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(ethereum) = provider() {
            if let Ok(remove) = Reflect::get(&ethereum, &JsValue::from_str("removeListener")) {
                if let Ok(remove) = remove.dyn_into::<Function>() {
                    let _ = remove.call2(
                        &ethereum,
                        &JsValue::from_str(self.event),
                        self.handler.as_ref().unchecked_ref(),
                    );
                }
            }
        }
    }
}
