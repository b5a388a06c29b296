//! Run-length aggregation of clip predictions into events.

use std::collections::BTreeSet;

use bhv_models::{ClipPrediction, CoarseAction, Event, EventKind};

/// A maximal run of consecutive clips sharing the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run<K> {
    key: K,
    start: usize,
    /// Exclusive
    end: usize,
}

impl<K> Run<K> {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Split `items` into maximal runs of equal keys.
fn runs<T, K, F>(items: &[T], key: F) -> Vec<Run<K>>
where
    K: PartialEq + Copy,
    F: Fn(&T) -> K,
{
    let mut out: Vec<Run<K>> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let k = key(item);
        match out.last_mut() {
            Some(run) if run.key == k => run.end = i + 1,
            _ => out.push(Run {
                key: k,
                start: i,
                end: i + 1,
            }),
        }
    }
    out
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Merge each maximal run of identical coarse labels into one action event.
///
/// The event spans the first member's `t_start` to the last member's `t_end`
/// and carries the mean `action_prob`.
pub fn group_action_events(clips: &[ClipPrediction]) -> Vec<Event> {
    runs(clips, |c| c.coarse)
        .into_iter()
        .map(|run| {
            let members = &clips[run.start..run.end];
            Event::new(
                EventKind::Action(run.key),
                members[0].t_start,
                members[members.len() - 1].t_end,
                mean(members.iter().map(|c| c.action_prob)),
            )
        })
        .collect()
}

/// Action events of a target type lasting at least `min_sec`.
pub fn repetition_flags(
    events: &[Event],
    targets: &BTreeSet<CoarseAction>,
    min_sec: f64,
) -> Vec<Event> {
    events
        .iter()
        .filter(|e| {
            e.kind.action().is_some_and(|a| targets.contains(&a))
                && e.t_end - e.t_start >= min_sec
        })
        .cloned()
        .collect()
}

/// Merge runs of flagged clips into abnormal events.
///
/// A run survives only if it holds at least `min_consec` clips. The event
/// carries the mean `abnormal_prob` of the run.
pub fn abnormal_events(clips: &[ClipPrediction], min_consec: usize) -> Vec<Event> {
    runs(clips, |c| c.abnormal_flag)
        .into_iter()
        .filter(|run| run.key && run.len() >= min_consec)
        .map(|run| {
            let members = &clips[run.start..run.end];
            Event::new(
                EventKind::Abnormal,
                members[0].t_start,
                members[members.len() - 1].t_end,
                mean(members.iter().map(|c| c.abnormal_prob)),
            )
        })
        .collect()
}
