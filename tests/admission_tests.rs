use kitchen_helper::admission::AdmissionController;
use kitchen_helper::error::GenerationError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_three_racing_acquires_with_two_slots() {
    for _ in 0..50 {
        let controller = Arc::new(AdmissionController::new(2));
        let barrier = Arc::new(Barrier::new(3));

        let handles: Vec<_> = (0..3)
            .map(|i| {
                let controller = Arc::clone(&controller);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    controller.acquire(&format!("request-{i}"))
                })
            })
            .collect();

        let granted = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|granted| *granted)
            .count();

        assert_eq!(granted, 2);
        assert_eq!(controller.in_flight(), 2);
    }
}

#[test]
fn test_in_flight_never_exceeds_limit_under_contention() {
    const LIMIT: usize = 3;
    let controller = Arc::new(AdmissionController::new(LIMIT));
    let held = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let controller = Arc::clone(&controller);
            let held = Arc::clone(&held);
            let peak = Arc::clone(&peak);
            thread::spawn(move || {
                for round in 0..500 {
                    let id = format!("{worker}-{round}");
                    if controller.acquire(&id) {
                        let now = held.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        assert!(controller.in_flight() <= LIMIT);
                        held.fetch_sub(1, Ordering::SeqCst);
                        controller.release(&id);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker should not panic");
    }

    assert!(peak.load(Ordering::SeqCst) <= LIMIT);
    assert_eq!(controller.in_flight(), 0);
}

#[test]
fn test_release_any_number_of_times() {
    let controller = AdmissionController::new(2);

    // Zero acquires, many releases
    for _ in 0..5 {
        controller.release("ghost");
    }
    assert_eq!(controller.in_flight(), 0);

    assert!(controller.acquire("a"));
    for _ in 0..5 {
        controller.release("a");
    }
    assert_eq!(controller.in_flight(), 0);

    // Capacity is fully usable afterwards
    assert!(controller.acquire("b"));
    assert!(controller.acquire("c"));
    assert!(!controller.acquire("d"));
}

#[test]
fn test_rejection_reports_capacity() {
    let controller = Arc::new(AdmissionController::new(2));
    let _first = controller.try_admit("first").expect("slot available");
    let _second = controller.try_admit("second").expect("slot available");

    let err = controller
        .try_admit("third")
        .expect_err("gate should be full");
    assert!(matches!(
        err,
        GenerationError::AdmissionRejected { current: 2, max: 2 }
    ));
    assert!(err.is_retryable());
    assert!(err.user_message(false).contains("2/2"));
}

#[test]
fn test_later_caller_can_win_after_release() {
    let controller = Arc::new(AdmissionController::new(1));
    let permit = controller.try_admit("early").expect("slot available");
    assert!(controller.try_admit("rejected").is_err());

    drop(permit);
    let late = controller.try_admit("late").expect("slot freed");
    assert_eq!(late.slot().request_id(), "late");
    assert_eq!(controller.in_flight(), 1);
}
