// File: aadhaar_anchor_wasm/src/lib.rs

pub mod app;
pub mod ethereum;
pub mod logger;
pub mod storage;

use wasm_bindgen::prelude::*;

#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

macro_rules! console_log {
    ($($t:tt)*) => (log(&format_args!($($t)*).to_string()))
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    logger::init(log::LevelFilter::Info);
    console_log!("Aadhaar Anchor WASM module initialized");
}
