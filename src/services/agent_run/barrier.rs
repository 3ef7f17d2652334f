//! Run Barrier Controller
//!
//! Decides whether an incoming event belongs to the session's currently
//! accepted run. Events tagged with a run id that has no barrier yet are
//! buffered and replayed in receipt order once the matching `run_start`
//! arrives; events for a superseded run are dropped as stale. Buffered
//! events expire after a TTL so a lost barrier cannot grow the buffer
//! without bound.
//!
//! All functions take `now` as a parameter so expiry is testable without
//! real sleeps.

use std::time::{Duration, Instant};

use sceneloom_core::{AgentEvent, EventEnvelope};

use crate::models::session::{AgentSession, BufferedEvent};

/// What to do with an incoming event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The event belongs to the accepted run (or the pre-run legacy path)
    Apply,
    /// The event's run has no barrier yet; hold it
    Buffer,
    /// The event belongs to a superseded run; drop it
    Stale,
}

/// Classify an event against the session's run barrier.
///
/// Accepted iff the event's run id equals the active run id, or the session
/// has no active run and the event carries no run id (pre-run/legacy path).
/// A tagged event with no barrier yet is buffered; everything else is stale.
pub fn classify(session: &AgentSession, event: &AgentEvent) -> Disposition {
    match (event.run_id(), session.active_run_id.as_deref()) {
        (Some(run_id), Some(active)) if run_id == active => Disposition::Apply,
        (Some(_), Some(_)) => Disposition::Stale,
        (Some(_), None) => Disposition::Buffer,
        (None, None) => Disposition::Apply,
        (None, Some(_)) => Disposition::Stale,
    }
}

/// Buffer an event ahead of its run-start barrier.
///
/// Appends with the receipt timestamp, prunes expired entries, then enforces
/// the hard cap (oldest evicted first).
pub fn buffer_event(
    session: &mut AgentSession,
    envelope: EventEnvelope,
    now: Instant,
    ttl: Duration,
    cap: usize,
) {
    tracing::debug!(
        conversation_id = %session.conversation_id,
        kind = envelope.event.kind_name(),
        run_id = ?envelope.event.run_id(),
        "buffering pre-barrier event"
    );
    session.pending_run_events.push(BufferedEvent {
        envelope,
        received_at: now,
    });
    prune_expired(session, now, ttl);

    while session.pending_run_events.len() > cap {
        let evicted = session.pending_run_events.remove(0);
        tracing::warn!(
            conversation_id = %session.conversation_id,
            kind = evicted.envelope.event.kind_name(),
            "pending-event buffer over capacity, evicting oldest"
        );
    }
}

/// Drop buffered events older than the TTL; returns how many were evicted.
///
/// Expired entries are evidence of a run-start barrier that never arrived.
pub fn prune_expired(session: &mut AgentSession, now: Instant, ttl: Duration) -> usize {
    let before = session.pending_run_events.len();
    let conversation_id = session.conversation_id.clone();
    session.pending_run_events.retain(|buffered| {
        let expired = now.duration_since(buffered.received_at) > ttl;
        if expired {
            tracing::warn!(
                conversation_id = %conversation_id,
                kind = buffered.envelope.event.kind_name(),
                run_id = ?buffered.envelope.event.run_id(),
                "dropping expired pre-barrier event (no run_start within TTL)"
            );
        }
        !expired
    });
    before - session.pending_run_events.len()
}

/// Drain the buffer on run start: return the still-live events matching
/// `run_id` in receipt order, discarding everything else.
pub fn take_matching(
    session: &mut AgentSession,
    run_id: &str,
    now: Instant,
    ttl: Duration,
) -> Vec<EventEnvelope> {
    prune_expired(session, now, ttl);

    let mut buffered = std::mem::take(&mut session.pending_run_events);
    buffered.sort_by_key(|b| b.received_at);

    let mut matching = Vec::new();
    for entry in buffered {
        if entry.envelope.event.run_id() == Some(run_id) {
            matching.push(entry.envelope);
        } else {
            tracing::debug!(
                conversation_id = %session.conversation_id,
                kind = entry.envelope.event.kind_name(),
                run_id = ?entry.envelope.event.run_id(),
                barrier = %run_id,
                "discarding buffered event for another run"
            );
        }
    }
    matching
}
