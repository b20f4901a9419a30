use gamalog_core::{RunStatus, classify};
use proptest::prelude::*;
use rstest::rstest;

#[rstest]
#[case(500, 500, RunStatus::Stopped)]
#[case(500, 0, RunStatus::Stopped)]
#[case(500, 620, RunStatus::Running)]
#[case(620, 500, RunStatus::Running)]
#[case(0, 0, RunStatus::Stopped)]
#[case(0, 1, RunStatus::Running)]
fn counter_scenarios(#[case] oldest: i64, #[case] newest: i64, #[case] expected: RunStatus) {
    assert_eq!(classify(oldest, newest), expected);
}

proptest! {
    #[test]
    fn running_iff_changed_and_nonzero(oldest in any::<i64>(), newest in any::<i64>()) {
        let running = classify(oldest, newest) == RunStatus::Running;
        prop_assert_eq!(running, newest != oldest && newest != 0);
    }

    #[test]
    fn zero_counter_is_always_stopped(oldest in any::<i64>()) {
        prop_assert_eq!(classify(oldest, 0), RunStatus::Stopped);
    }
}
