#![no_main]

use libfuzzer_sys::fuzz_target;
use polypass_store::PasswordStore;

fuzz_target!(|data: &[u8]| {
    // Loading arbitrary bytes must never panic — always Ok or Err.
    if let Ok(store) = PasswordStore::load(10, 2, data) {
        // A store parsed from hostile bytes must also survive a login probe.
        let _ = store.is_valid_login("admin", b"password");
    }
});
