//! Active-tab delegation and display attachment.

mod common;

use common::{Harness, RecordingDisplay, key};

#[tokio::test]
async fn test_delegation_without_display_is_conservative() {
    let mut h = Harness::new();
    // No tabs at all
    assert!(!h.session.search_active("needle"));
    assert!(!h.session.search_next());
    assert!(!h.session.search_previous());
    h.session.focus_active();
    h.session.clear_active();

    // An active tab with nothing mounted yet
    h.add_tab();
    assert!(!h.session.search_active("needle"));
    h.session.focus_active();
}

#[tokio::test]
async fn test_delegation_follows_active_tab_at_call_time() {
    let mut h = Harness::new();
    let t1 = h.add_tab();
    let t2 = h.add_tab();
    let (d1, log1) = RecordingDisplay::new(true);
    let (d2, log2) = RecordingDisplay::new(false);
    h.session.attach_display(t1, d1);
    h.session.attach_display(t2, d2);

    // t2 is active after creation
    assert!(!h.session.search_active("err"));
    h.session.select_tab(t1);
    assert!(h.session.search_active("err"));
    assert!(h.session.search_next());
    assert!(h.session.search_previous());
    h.session.clear_active();
    h.session.focus_active();

    let log1 = log1.lock();
    assert_eq!(log1.searches, vec!["err".to_string()]);
    assert_eq!(log1.search_steps, vec!["next", "previous"]);
    assert_eq!(log1.clear_count, 1);
    assert_eq!(log1.focus_count, 1);

    let log2 = log2.lock();
    assert_eq!(log2.searches, vec!["err".to_string()]);
    assert_eq!(log2.clear_count, 0);
}

#[tokio::test]
async fn test_window_focus_regain_focuses_active_tab() {
    let mut h = Harness::new();
    let tab = h.add_tab();
    let (display, log) = RecordingDisplay::new(false);
    h.session.attach_display(tab, display);

    h.session.on_window_focus_changed(false);
    assert_eq!(log.lock().focus_count, 0);
    h.session.on_window_focus_changed(true);
    assert_eq!(log.lock().focus_count, 1);
}

#[tokio::test]
async fn test_detached_display_is_not_touched() {
    let mut h = Harness::new();
    let tab = h.add_busy_tab(4242).await;
    let (display, log) = RecordingDisplay::new(true);
    h.session.attach_display(tab, display);
    assert!(h.session.detach_display(tab).is_some());

    h.supervisor.emit_exit(&key(tab), 1);
    h.settle().await;
    h.session.focus_active();

    assert!(!h.session.search_active("x"));
    let log = log.lock();
    assert!(log.written.is_empty());
    assert_eq!(log.focus_count, 0);
}

#[tokio::test]
async fn test_display_cannot_attach_to_missing_tab() {
    let mut h = Harness::new();
    let (display, _log) = RecordingDisplay::new(true);
    assert!(!h.session.attach_display(7, display));
    assert!(!h.session.has_display(7));
}

#[tokio::test]
async fn test_closing_tab_drops_its_display() {
    let mut h = Harness::new();
    let tab = h.add_tab();
    let (display, _log) = RecordingDisplay::new(true);
    h.session.attach_display(tab, display);

    h.session.close_tab(tab);
    assert!(!h.session.has_display(tab));
}

#[tokio::test]
async fn test_output_is_routed_by_key() {
    let mut h = Harness::new();
    let t1 = h.add_tab();
    let t2 = h.add_tab();
    let (display, log) = RecordingDisplay::new(false);
    h.session.attach_display(t1, display);

    assert!(h.session.deliver_output(&key(t1), b"hello"));
    assert!(!h.session.deliver_output(&key(t2), b"no display"));
    assert!(!h.session.deliver_output("elsewhere-terminal-1", b"foreign"));

    assert_eq!(log.lock().text(), "hello");
}
