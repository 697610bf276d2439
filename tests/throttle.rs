use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use freshservice_report::ReportError;
use freshservice_report::throttle::{Attempt, Sleeper, Throttle, ThrottlePolicy};

#[derive(Clone, Default)]
struct RecordingSleeper(Rc<RefCell<Vec<Duration>>>);

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.0.borrow_mut().push(duration);
    }
}

fn policy(max_retries: Option<u32>) -> ThrottlePolicy {
    ThrottlePolicy {
        delay: Duration::from_secs(60),
        max_retries,
    }
}

#[test]
fn default_policy_waits_a_minute_without_a_bound() {
    let policy = ThrottlePolicy::default();
    assert_eq!(policy.delay, Duration::from_secs(60));
    assert_eq!(policy.max_retries, None);
}

#[test]
fn success_on_first_attempt_never_sleeps() {
    let sleeper = RecordingSleeper::default();
    let throttle = Throttle::with_sleeper(policy(None), sleeper.clone());

    let value = throttle
        .run(|| Ok(Attempt::Done("payload")))
        .expect("request succeeds");

    assert_eq!(value, "payload");
    assert!(sleeper.0.borrow().is_empty());
}

#[test]
fn rate_limit_then_success_retries_once_after_the_delay() {
    let sleeper = RecordingSleeper::default();
    let throttle = Throttle::with_sleeper(policy(None), sleeper.clone());
    let attempts = Cell::new(0);

    let value = throttle
        .run(|| {
            attempts.set(attempts.get() + 1);
            if attempts.get() == 1 {
                Ok(Attempt::RateLimited)
            } else {
                Ok(Attempt::Done(200))
            }
        })
        .expect("request succeeds");

    assert_eq!(value, 200);
    assert_eq!(attempts.get(), 2);
    assert_eq!(*sleeper.0.borrow(), vec![Duration::from_secs(60)]);
}

#[test]
fn total_pause_is_one_delay_per_rate_limit_response() {
    let sleeper = RecordingSleeper::default();
    let throttle = Throttle::with_sleeper(policy(None), sleeper.clone());
    let remaining_limits = Cell::new(4);

    throttle
        .run(|| {
            if remaining_limits.get() > 0 {
                remaining_limits.set(remaining_limits.get() - 1);
                Ok(Attempt::RateLimited)
            } else {
                Ok(Attempt::Done(()))
            }
        })
        .expect("request succeeds");

    let total: Duration = sleeper.0.borrow().iter().sum();
    assert_eq!(total, Duration::from_secs(4 * 60));
}

#[test]
fn retry_bound_stops_a_persistently_throttled_request() {
    let sleeper = RecordingSleeper::default();
    let throttle = Throttle::with_sleeper(policy(Some(2)), sleeper.clone());
    let attempts = Cell::new(0);

    let error = throttle
        .run(|| {
            attempts.set(attempts.get() + 1);
            Ok::<Attempt<()>, ReportError>(Attempt::RateLimited)
        })
        .expect_err("gives up");

    assert!(matches!(error, ReportError::RateLimited { attempts: 3 }));
    assert_eq!(attempts.get(), 3);
    assert_eq!(sleeper.0.borrow().len(), 2);
}

#[test]
fn errors_from_the_request_are_not_retried() {
    let sleeper = RecordingSleeper::default();
    let throttle = Throttle::with_sleeper(policy(None), sleeper.clone());
    let attempts = Cell::new(0);

    let error = throttle
        .run(|| {
            attempts.set(attempts.get() + 1);
            Err::<Attempt<()>, _>(ReportError::Status {
                status: 500,
                url: "https://example.test/assets/1".into(),
            })
        })
        .expect_err("fails");

    assert!(matches!(error, ReportError::Status { status: 500, .. }));
    assert_eq!(attempts.get(), 1);
    assert!(sleeper.0.borrow().is_empty());
}
