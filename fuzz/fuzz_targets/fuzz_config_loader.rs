#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation failures are fine; panics are not.
    if let Ok(cfg) = grillmon_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        let _ = grillmon_core::EtaEstimator::builder()
            .with_config((&cfg.estimator).into())
            .with_fallback((&cfg.fallback).into())
            .try_build();
    }
});
