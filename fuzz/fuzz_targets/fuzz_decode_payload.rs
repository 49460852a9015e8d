#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes off the wire must decode or error, and decoded statuses
    // must survive the estimator.
    if let Ok(status) = grillmon_core::decode_payload(data)
        && let Some(obs) = status.observation()
    {
        let mut est = grillmon_core::EtaEstimator::default();
        let _ = est.observe(obs);
    }
});
