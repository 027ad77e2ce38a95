//! Randomised soak runs of the demonstration protocol.

use rand::{SeedableRng, rngs::StdRng};
use rstest::rstest;
use wirefrag::{
    FragmentationConfig,
    demo::{SoakError, run_soak},
};

#[rstest]
#[case::defaults(FragmentationConfig::default(), 11)]
#[case::small_fragments(
    FragmentationConfig { max_fragment_size: 64, window_size: 16, ..FragmentationConfig::default() },
    12
)]
#[case::tiny_window(
    FragmentationConfig { window_size: 1, max_fragment_size: 512, ..FragmentationConfig::default() },
    13
)]
fn soak_round_trips_every_packet(#[case] config: FragmentationConfig, #[case] seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let report = run_soak(config, 300, &mut rng).expect("soak run succeeds");
    assert_eq!(report.iterations, 300);
    assert_eq!(report.fragmented + report.whole, report.iterations);
    assert!(report.fragmented > 0, "no packet needed fragmenting");
}

#[test]
fn invalid_configuration_aborts_the_run() {
    let mut rng = StdRng::seed_from_u64(1);
    let config = FragmentationConfig {
        window_size: 3,
        ..FragmentationConfig::default()
    };
    assert!(matches!(
        run_soak(config, 1, &mut rng),
        Err(SoakError::Config(_))
    ));
}

#[test]
fn packets_beyond_the_message_limit_fail_to_write() {
    let mut rng = StdRng::seed_from_u64(5);
    // Sixteen fragments of sixteen bytes cannot hold a large item list.
    let config = FragmentationConfig {
        max_fragment_size: 16,
        max_fragments_per_message: 16,
        ..FragmentationConfig::default()
    };
    assert!(matches!(
        run_soak(config, 500, &mut rng),
        Err(SoakError::Write { .. })
    ));
}
