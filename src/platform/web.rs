//! wasm-bindgen export of the engine bridge
//!
//! Everything crosses the boundary as plain numbers, strings and JSON so the
//! page script needs no generated types beyond `WasmEngine`.

use wasm_bindgen::prelude::*;

use super::input::{Control, InputState};
use crate::bridge::{ControlFlags, EngineBridge};
use crate::levels::LEVEL_IDS;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
    // A second init (hot reload) is harmless
    let _ = console_log::init_with_level(log::Level::Info);
    log::info!("Query Quest engine loaded");
}

/// Ids of the built-in levels, in campaign order
#[wasm_bindgen(js_name = levelIds)]
pub fn level_ids() -> js_sys::Array {
    LEVEL_IDS.iter().map(|id| JsValue::from_str(id)).collect()
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// One level attempt plus the input state feeding it
#[wasm_bindgen]
pub struct WasmEngine {
    bridge: EngineBridge,
    input: InputState,
}

#[wasm_bindgen]
impl WasmEngine {
    /// Start a built-in level
    #[wasm_bindgen(constructor)]
    pub fn new(level_id: &str, seed: u32) -> Result<WasmEngine, JsValue> {
        let bridge = EngineBridge::from_level_id(level_id, seed as u64).map_err(to_js_error)?;
        Ok(Self {
            bridge,
            input: InputState::new(),
        })
    }

    /// Start a level from a JSON definition
    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(json: &str, seed: u32) -> Result<WasmEngine, JsValue> {
        let bridge = EngineBridge::from_json(json, seed as u64).map_err(to_js_error)?;
        Ok(Self {
            bridge,
            input: InputState::new(),
        })
    }

    /// Set all six flags from JSON (gamepads, scripted hosts). Missing
    /// fields are released. Held keys and touches apply again on their next event.
    #[wasm_bindgen(js_name = setControls)]
    pub fn set_controls(&mut self, json: &str) -> Result<(), JsValue> {
        let controls = ControlFlags::from_json(json).map_err(to_js_error)?;
        self.bridge.set_controls(controls);
        Ok(())
    }

    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, code: &str) -> bool {
        let handled = self.input.key_down(code);
        self.sync_controls();
        handled
    }

    #[wasm_bindgen(js_name = keyUp)]
    pub fn key_up(&mut self, code: &str) -> bool {
        let handled = self.input.key_up(code);
        self.sync_controls();
        handled
    }

    #[wasm_bindgen(js_name = touchDown)]
    pub fn touch_down(&mut self, control: &str) {
        if let Some(control) = Control::from_name(control) {
            self.input.touch_down(control);
            self.sync_controls();
        }
    }

    #[wasm_bindgen(js_name = touchUp)]
    pub fn touch_up(&mut self, control: &str) {
        if let Some(control) = Control::from_name(control) {
            self.input.touch_up(control);
            self.sync_controls();
        }
    }

    /// Call on window blur / visibility change
    #[wasm_bindgen(js_name = releaseAll)]
    pub fn release_all(&mut self) {
        self.input.release_all();
        self.sync_controls();
    }

    #[wasm_bindgen(js_name = reportCollision)]
    pub fn report_collision(&mut self, a: u32, b: u32) {
        self.bridge.report_collision(a, b);
    }

    /// Feed one requestAnimationFrame delta in seconds
    #[wasm_bindgen(js_name = advanceFrame)]
    pub fn advance_frame(&mut self, dt: f32) -> u32 {
        self.bridge.advance_frame(dt)
    }

    /// Returns the `ValidationResult` as JSON
    #[wasm_bindgen(js_name = submitAnswer)]
    pub fn submit_answer(&mut self, text: &str) -> Result<String, JsValue> {
        let result = self.bridge.submit_answer(text);
        serde_json::to_string(&result).map_err(to_js_error)
    }

    /// Current `Snapshot` as JSON
    pub fn snapshot(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.bridge.snapshot()).map_err(to_js_error)
    }

    /// Events since the last call, as a JSON array
    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events(&mut self) -> Result<String, JsValue> {
        serde_json::to_string(&self.bridge.drain_events()).map_err(to_js_error)
    }

    /// Register the completion handler. It runs on a microtask, once this
    /// engine is no longer borrowed, so it may read or free the engine.
    #[wasm_bindgen(js_name = onComplete)]
    pub fn on_complete(&mut self, callback: js_sys::Function) {
        self.bridge.on_complete(move || {
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(err) = callback.call0(&JsValue::NULL) {
                    log::error!("Completion handler threw: {:?}", err);
                }
            });
        });
    }

    /// True once after completion, for hosts that poll each frame instead
    #[wasm_bindgen(js_name = takeCompletion)]
    pub fn take_completion(&mut self) -> bool {
        self.bridge.take_completion()
    }
}

impl WasmEngine {
    fn sync_controls(&mut self) {
        self.bridge.set_controls(self.input.flags());
    }
}
