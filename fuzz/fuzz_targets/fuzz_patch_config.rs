//! Fuzz target: `PatchConfigStore::load`
//!
//! Plants arbitrary bytes as the persisted patch config blob and asserts
//! that loading never panics and never adopts an invalid config.
//!
//! cargo fuzz run fuzz_patch_config

#![no_main]

use insulinloop::adapters::NvsAdapter;
use insulinloop::app::ports::StoragePort;
use insulinloop::patch::PatchConfigStore;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut nvs = NvsAdapter::new();
    if nvs.write("patch", "patchcfg", data).is_err() {
        return;
    }

    let store = PatchConfigStore::load(Box::new(nvs));
    assert!(store.get().validate().is_ok());
});
