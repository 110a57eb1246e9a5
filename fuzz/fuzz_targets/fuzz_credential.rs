//! Fuzz target: `RateOverrideCredential::verify`
//!
//! Splits the input into a configured secret and a submitted guess.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - A guess is accepted if and only if it equals the secret byte for byte
//!
//! cargo fuzz run fuzz_credential

#![no_main]

use libfuzzer_sys::fuzz_target;
use ventilator::app::auth::RateOverrideCredential;

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let mid = usize::from(split).min(rest.len());
    let (secret, guess) = rest.split_at(mid);
    let (Ok(secret), Ok(guess)) = (core::str::from_utf8(secret), core::str::from_utf8(guess)) else {
        return;
    };

    let credential = RateOverrideCredential::new(secret);
    assert_eq!(credential.verify(guess), secret == guess);
    assert!(credential.verify(secret));
});
