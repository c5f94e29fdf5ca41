#![allow(dead_code)]

use std::sync::Arc;

use rootca::cert::params::CertificateConfig;
use rootca::factory::CertificateFactory;
use rootca::key::KeyAlgorithm;
use rootca::random::SeededRandom;
use rootca::sequencer::Sequencer;
use rootca::validity::FixedClock;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A deterministic factory frozen at `now`.
pub fn fixed_factory(now: OffsetDateTime, key_algorithm: KeyAlgorithm) -> CertificateFactory {
    init_tracing();
    CertificateFactory::builder()
        .sequencer(Arc::new(Sequencer::new()))
        .random(Arc::new(SeededRandom::new(42)))
        .clock(Arc::new(FixedClock(now)))
        .key_algorithm(key_algorithm)
        .build()
}

/// A factory on the system clock, so the certificate is currently valid.
pub fn current_factory(key_algorithm: KeyAlgorithm) -> CertificateFactory {
    init_tracing();
    CertificateFactory::builder()
        .random(Arc::new(SeededRandom::new(7)))
        .key_algorithm(key_algorithm)
        .build()
}

pub fn test_ca_config() -> CertificateConfig {
    CertificateConfig::builder()
        .country("US")
        .common_name("test-ca")
        .organization(vec!["Acme".to_string()])
        .build()
}
