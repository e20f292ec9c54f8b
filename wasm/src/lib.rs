use nj::{nj as lib_nj, nj_batch as lib_nj_batch, NJConfig};
use serde_wasm_bindgen::from_value;
use wasm_bindgen::prelude::*;

/// Exposed to JavaScript via wasm-bindgen: takes an `NJConfig` object (labels,
/// square distance rows, engine options), builds the neighbor-joining tree and
/// returns it as a Newick string.
/// Returns a `JsValue` error if the config is malformed or the run fails.
#[wasm_bindgen]
pub fn nj(config_json: JsValue) -> Result<String, JsValue> {
    let config: NJConfig = from_value(config_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid NJConfig JSON: {}", e)))?;
    lib_nj(config).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Batch variant: an array of `NJConfig` in, an array of Newick strings out.
/// Fails as a whole if any matrix fails, naming its position.
#[wasm_bindgen]
pub fn nj_batch(configs_json: JsValue) -> Result<Vec<String>, JsValue> {
    let configs: Vec<NJConfig> = from_value(configs_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid NJConfig array: {}", e)))?;
    lib_nj_batch(configs)
        .into_iter()
        .enumerate()
        .map(|(i, r)| r.map_err(|e| JsValue::from_str(&format!("matrix {i}: {e}"))))
        .collect()
}
