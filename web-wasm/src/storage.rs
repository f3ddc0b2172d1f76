//! localStorageによる永続化

use crate::js_error::describe;
use civic_report_common::{Error, Persistence, Result};
use gloo::storage::{LocalStorage, Storage};

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStore;

impl Persistence for LocalStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        LocalStorage::raw()
            .get_item(key)
            .map_err(|e| Error::Storage(describe(&e)))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|e| Error::Storage(describe(&e)))
    }
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn wasm_local_store_round_trip() {
        let key = "civic-report-test-round-trip";
        LocalStorage::delete(key);
        assert_eq!(LocalStore.load(key).expect("load"), None);

        LocalStore.save(key, "[]").expect("save");
        assert_eq!(LocalStore.load(key).expect("load").as_deref(), Some("[]"));
        LocalStorage::delete(key);
    }
}
