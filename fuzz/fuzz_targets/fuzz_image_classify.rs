#![no_main]
use libfuzzer_sys::fuzz_target;
use scanpro_vision::HeuristicClassifier;

fuzz_target!(|data: &[u8]| {
    let _ = HeuristicClassifier::new().classify_bytes(data);
});
