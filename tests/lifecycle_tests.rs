// Session lifecycle tests

use loqa_call::session::Lifecycle;
use loqa_call::{SessionErrorKind, SessionState};

const ALL_STATES: [SessionState; 5] = [
    SessionState::Connecting,
    SessionState::Open,
    SessionState::Streaming,
    SessionState::Error(SessionErrorKind::Transport),
    SessionState::Closed,
];

#[test]
fn test_happy_path() {
    let mut lifecycle = Lifecycle::new();
    assert_eq!(lifecycle.current(), SessionState::Connecting);

    lifecycle.advance(SessionState::Open).unwrap();
    lifecycle.advance(SessionState::Streaming).unwrap();
    lifecycle.advance(SessionState::Closed).unwrap();

    assert_eq!(
        lifecycle.history(),
        &[
            SessionState::Connecting,
            SessionState::Open,
            SessionState::Streaming,
            SessionState::Closed,
        ]
    );
}

#[test]
fn test_closed_is_terminal() {
    for next in ALL_STATES {
        assert!(
            !SessionState::Closed.can_transition_to(next),
            "CLOSED -> {} must be rejected",
            next
        );
    }
    assert!(SessionState::Closed.is_terminal());
}

#[test]
fn test_error_and_close_reachable_from_any_live_state() {
    for from in &ALL_STATES[..4] {
        assert!(from.can_transition_to(SessionState::Closed));
        assert!(from.can_transition_to(SessionState::Error(SessionErrorKind::DeviceLost)));
    }
}

#[test]
fn test_no_skipping_or_going_back() {
    assert!(!SessionState::Connecting.can_transition_to(SessionState::Streaming));
    assert!(!SessionState::Streaming.can_transition_to(SessionState::Open));
    assert!(!SessionState::Open.can_transition_to(SessionState::Connecting));
    assert!(!SessionState::Error(SessionErrorKind::Transport).can_transition_to(SessionState::Open));
}

#[test]
fn test_rejected_transition_leaves_state() {
    let mut lifecycle = Lifecycle::new();
    lifecycle.advance(SessionState::Closed).unwrap();

    let err = lifecycle.advance(SessionState::Open).unwrap_err();
    assert_eq!(err.from, SessionState::Closed);
    assert_eq!(err.to, SessionState::Open);
    assert_eq!(lifecycle.current(), SessionState::Closed);
    assert_eq!(lifecycle.history().len(), 2);
}

#[test]
fn test_display_names() {
    assert_eq!(SessionState::Streaming.to_string(), "STREAMING");
    assert_eq!(
        SessionState::Error(SessionErrorKind::CaptureUnavailable).to_string(),
        "ERROR(CaptureUnavailable)"
    );
}
