//! Smoke tests that run inside a wasm environment (wasm-pack test).

#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;

#[wasm_bindgen_test]
fn extract_domain_is_exported() {
    assert_eq!(
        tab_shepherd::extract_domain("https://www.example.com/page"),
        "www.example.com"
    );
    assert_eq!(tab_shepherd::extract_domain("not a url"), "");
}
