use super::message::TurnRole;
use super::state::{FocusState, Session};

fn run_turn(session: &mut Session, user: &str, reply: &str) {
    session.try_begin_turn().expect("session should be idle");
    session.complete_turn(user, Some(reply));
}

#[test]
fn test_new_session_is_idle_and_empty() {
    let session = Session::new(4);
    assert_eq!(session.state(), FocusState::Idle);
    assert!(!session.is_busy());
    assert_eq!(session.history_len(), 0);
}

#[test]
fn test_sessions_have_distinct_ids() {
    assert_ne!(Session::new(4).id(), Session::new(4).id());
}

#[test]
fn test_history_is_bounded_fifo() {
    for turns in 1..=7usize {
        let mut session = Session::new(4);
        for n in 0..turns {
            run_turn(&mut session, &format!("q{n}"), &format!("a{n}"));
        }
        assert_eq!(session.history_len(), (2 * turns).min(8), "after {turns} turns");
    }

    let mut session = Session::new(4);
    for n in 0..6 {
        run_turn(&mut session, &format!("q{n}"), &format!("a{n}"));
    }
    let contents: Vec<_> = session.history().map(|turn| turn.content.as_str()).collect();
    assert_eq!(contents, vec!["q2", "a2", "q3", "a3", "q4", "a4", "q5", "a5"]);
}

#[test]
fn test_history_alternates_roles() {
    let mut session = Session::new(2);
    run_turn(&mut session, "hi", "hello");
    run_turn(&mut session, "a sofa?", "sure");
    run_turn(&mut session, "cheaper", "ok");

    let roles: Vec<_> = session.history().map(|turn| turn.role).collect();
    assert_eq!(
        roles,
        vec![TurnRole::User, TurnRole::Model, TurnRole::User, TurnRole::Model]
    );
}

#[test]
fn test_second_turn_rejected_while_busy() {
    let mut session = Session::new(4);
    assert!(session.try_begin_turn().is_some());
    assert!(session.is_busy());
    assert!(session.try_begin_turn().is_none());

    session.complete_turn("q", Some("a"));
    assert!(!session.is_busy());
    assert!(session.try_begin_turn().is_some());
}

#[test]
fn test_failed_turn_records_nothing() {
    let mut session = Session::new(4);
    session.try_begin_turn();
    session.complete_turn("q", None);
    assert_eq!(session.history_len(), 0);
    assert!(!session.is_busy());

    session.try_begin_turn();
    session.complete_turn("q", Some(""));
    assert_eq!(session.history_len(), 0);
}

#[test]
fn test_snapshot_excludes_current_turn() {
    let mut session = Session::new(4);
    run_turn(&mut session, "first", "reply");
    let snapshot = session.try_begin_turn().unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].content, "first");
}

#[test]
fn test_focus_is_orthogonal_to_busy() {
    let mut session = Session::new(4);
    session.focus();
    assert_eq!(session.state(), FocusState::Focused);

    session.try_begin_turn();
    assert!(session.is_focused());
    session.complete_turn("q", Some("a"));
    assert!(session.is_focused());

    session.clear_focus();
    assert_eq!(session.state(), FocusState::Idle);
}
