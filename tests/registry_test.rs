//! Integration tests for the job registry.

use std::collections::HashSet;
use std::sync::Arc;

use jobpool::error::Error;
use jobpool::model::{JobId, JobStatus};
use jobpool::registry::Registry;

#[test]
fn ids_start_at_zero_and_increase() {
    let registry = Registry::new();
    let ids: Vec<JobId> = (0..3).map(|_| registry.allocate()).collect();

    assert_eq!(ids, vec![JobId(0), JobId(1), JobId(2)]);
    assert_eq!(ids[0].to_string(), "job_id_0");
    assert_eq!(registry.get(JobId(2)), Some(JobStatus::Pending));
}

#[test]
fn concurrent_allocations_never_collide() {
    let registry = Arc::new(Registry::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || (0..250).map(|_| registry.allocate()).collect::<Vec<_>>())
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        let ids = handle.join().unwrap();
        // Within one submitter, later submissions get larger ids.
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for id in ids {
            assert!(seen.insert(id), "duplicate id {id}");
        }
    }

    assert_eq!(seen.len(), 2000);
    assert_eq!(registry.len(), 2000);
    assert!((0..2000).all(|n| seen.contains(&JobId(n))));
}

#[test]
fn unknown_ids_are_not_found() {
    let registry = Registry::new();
    assert_eq!(registry.get(JobId(0)), None);
    assert!(registry.lookup("job_id_999999").is_none());
    assert!(registry.lookup("not-a-job").is_none());
}

#[test]
fn lookup_accepts_textual_ids() {
    let registry = Registry::new();
    let id = registry.allocate();
    assert_eq!(registry.lookup("job_id_0"), Some((id, JobStatus::Pending)));
}

#[test]
fn terminal_transition_happens_once() {
    let registry = Registry::new();
    let id = registry.allocate();

    registry.set_terminal(id, JobStatus::Done).unwrap();
    assert_eq!(registry.get(id), Some(JobStatus::Done));

    let err = registry.set_terminal(id, JobStatus::Error).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: JobStatus::Done,
            to: JobStatus::Error,
            ..
        }
    ));
    // Status is untouched by the rejected transition.
    assert_eq!(registry.get(id), Some(JobStatus::Done));
}

#[test]
fn cannot_move_back_to_pending() {
    let registry = Registry::new();
    let id = registry.allocate();
    assert!(registry.set_terminal(id, JobStatus::Pending).is_err());
    assert_eq!(registry.get(id), Some(JobStatus::Pending));
}

#[test]
fn set_terminal_on_unknown_id_fails() {
    let registry = Registry::new();
    let err = registry.set_terminal(JobId(5), JobStatus::Done).unwrap_err();
    assert!(matches!(err, Error::NotFound(ref id) if id == "job_id_5"));
}

#[test]
fn all_returns_snapshot_in_id_order() {
    let registry = Registry::new();
    let a = registry.allocate();
    let b = registry.allocate();
    let c = registry.allocate();
    registry.set_terminal(b, JobStatus::Error).unwrap();

    let snapshot = registry.all();
    let entries: Vec<_> = snapshot.into_iter().collect();
    assert_eq!(
        entries,
        vec![
            (a, JobStatus::Pending),
            (b, JobStatus::Error),
            (c, JobStatus::Pending)
        ]
    );
}

#[test]
fn allocate_with_runs_enqueue_with_the_new_id() {
    let registry = Registry::new();
    registry.allocate();

    let mut handed = None;
    let id = registry.allocate_with(|id| handed = Some(id));
    assert_eq!(handed, Some(id));
    assert_eq!(id, JobId(1));
}

#[test]
fn ids_past_u32_range_do_not_alias_small_ids() {
    let registry = Registry::new();
    registry.allocate();

    assert!(registry.lookup("job_id_4294967296").is_none());
    assert_eq!(registry.get(JobId(u64::MAX)), None);
    assert!(matches!(
        registry.set_terminal(JobId(1 << 32), JobStatus::Done),
        Err(Error::NotFound(_))
    ));
    assert_eq!(registry.get(JobId(0)), Some(JobStatus::Pending));
}
