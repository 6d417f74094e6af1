//! Spawn issue, result application, stale-result discard, and retry.

mod common;

use common::{Harness, key, test_config, touches_process_state};
use shelltabs::session::SPAWN_FAILURE_EXIT_CODE;
use shelltabs::{TabNotification, TabState};
use shelltabs_config::Config;
use shelltabs_supervisor::{SpawnReply, SupervisorError};
use std::path::PathBuf;

#[tokio::test]
async fn test_new_tab_issues_exactly_one_spawn() {
    let mut h = Harness::new();
    let tab = h.add_tab();
    assert_eq!(h.supervisor.spawn_count(), 1);

    // Reconciling again while the spawn is outstanding issues nothing
    assert_eq!(h.session.reconcile(), 0);
    assert_eq!(h.session.reconcile(), 0);
    assert_eq!(h.supervisor.spawn_count(), 1);
    assert!(h.session.is_spawn_pending(tab));

    let request = &h.supervisor.spawns()[0];
    assert_eq!(request.key, key(tab));
    assert_eq!(request.shell, "/bin/zsh");
    assert_eq!(request.cwd, PathBuf::from("/work"));
    assert_eq!(request.shell_args.as_deref(), Some("-l"));
    assert_eq!(request.shell_env, None);
}

#[tokio::test]
async fn test_each_new_tab_gets_its_own_spawn() {
    let mut h = Harness::new();
    let first = h.add_tab();
    let second = h.add_tab();

    let keys: Vec<String> = h.supervisor.spawns().into_iter().map(|r| r.key).collect();
    assert_eq!(keys, vec![key(first), key(second)]);
}

#[tokio::test]
async fn test_spawn_success_marks_tab_busy() {
    let mut h = Harness::new();
    let tab = h.add_tab();
    h.drain();

    h.supervisor.spawn_succeeds(0, 4242);
    h.settle().await;

    let record = h.session.tab(tab).unwrap();
    assert_eq!(record.state(), TabState::Busy { pid: 4242 });
    assert_eq!(record.pid(), 4242);
    assert!(!h.session.is_spawn_pending(tab));
    assert_eq!(
        h.drain(),
        vec![
            TabNotification::TabPidChanged {
                tab_id: tab,
                pid: 4242
            },
            TabNotification::TabStateChanged {
                tab_id: tab,
                state: TabState::Busy { pid: 4242 }
            },
        ]
    );

    // A busy tab is never spawned again
    assert_eq!(h.session.reconcile(), 0);
}

#[tokio::test]
async fn test_late_success_for_closed_tab_is_ignored() {
    let mut h = Harness::new();
    let tab = h.add_tab();
    assert!(h.session.close_tab(tab));
    h.drain();

    h.supervisor.spawn_succeeds(0, 5050);
    h.settle().await;

    assert!(h.session.tab(tab).is_none());
    assert!(h.session.tabs().is_empty());
    assert!(!touches_process_state(&h.drain(), tab));
}

#[tokio::test]
async fn test_late_success_for_closed_tab_reclaims_process() {
    let mut h = Harness::new();
    let tab = h.add_tab();
    h.session.close_tab(tab);
    // Nothing was live at close time, so nothing was killed yet
    assert!(h.supervisor.kills().is_empty());

    h.supervisor.spawn_succeeds(0, 5050);
    h.settle().await;

    assert_eq!(h.supervisor.kills(), vec![key(tab)]);
}

#[tokio::test]
async fn test_late_failure_for_closed_tab_kills_nothing() {
    let mut h = Harness::new();
    let tab = h.add_tab();
    h.session.close_tab(tab);

    h.supervisor
        .resolve_spawn(0, Err(SupervisorError::Spawn("no pty".to_string())));
    h.settle().await;

    assert!(h.supervisor.kills().is_empty());
    assert!(!touches_process_state(&h.drain(), tab));
}

#[tokio::test]
async fn test_exit_before_spawn_resolves_keeps_tab_exited() {
    let mut h = Harness::new();
    let tab = h.add_tab();

    h.supervisor.emit_exit(&key(tab), 0);
    h.settle().await;
    assert_eq!(
        h.session.tab(tab).unwrap().state(),
        TabState::Exited { exit_code: 0 }
    );
    h.drain();

    h.supervisor.spawn_succeeds(0, 777);
    h.settle().await;

    let record = h.session.tab(tab).unwrap();
    assert_eq!(record.state(), TabState::Exited { exit_code: 0 });
    assert_eq!(record.pid(), 0);
    assert!(!touches_process_state(&h.drain(), tab));
    // The tab still exists, so its key is not killed
    assert!(h.supervisor.kills().is_empty());
}

#[tokio::test]
async fn test_reported_failure_marks_tab_exited() {
    let mut h = Harness::new();
    let tab = h.add_tab();
    h.drain();

    h.supervisor.resolve_spawn(0, Ok(SpawnReply::failed()));
    h.settle().await;

    let record = h.session.tab(tab).unwrap();
    assert_eq!(
        record.state(),
        TabState::Exited {
            exit_code: SPAWN_FAILURE_EXIT_CODE
        }
    );
    assert_eq!(record.pid(), 0);

    let notifications = h.drain();
    assert!(notifications.contains(&TabNotification::TabStateChanged {
        tab_id: tab,
        state: TabState::Exited { exit_code: 1 }
    }));
    assert!(notifications.iter().any(|n| matches!(
        n,
        TabNotification::SpawnFailed { tab_id, .. } if *tab_id == tab
    )));
}

#[tokio::test]
async fn test_supervisor_error_marks_tab_exited() {
    let mut h = Harness::new();
    let tab = h.add_tab();

    h.supervisor.resolve_spawn(
        0,
        Err(SupervisorError::Spawn("shell not found".to_string())),
    );
    h.settle().await;

    assert_eq!(h.session.tab(tab).unwrap().exit_code(), Some(1));
}

#[tokio::test]
async fn test_success_without_pid_is_a_failure() {
    let mut h = Harness::new();
    let tab = h.add_tab();

    h.supervisor.resolve_spawn(
        0,
        Ok(SpawnReply {
            success: true,
            pid: 0,
        }),
    );
    h.settle().await;

    assert!(h.session.tab(tab).unwrap().state().is_exited());
}

#[tokio::test]
async fn test_abandoned_spawn_marks_tab_exited() {
    let mut h = Harness::new();
    let tab = h.add_tab();

    h.supervisor.drop_spawn(0);
    h.settle().await;

    assert_eq!(h.session.tab(tab).unwrap().exit_code(), Some(1));
}

#[tokio::test]
async fn test_panicking_spawn_is_reported_as_failure() {
    let mut h = Harness::new();
    let tab = h.add_tab();
    h.drain();

    h.supervisor.panic_spawn(0);
    h.settle().await;

    assert_eq!(
        h.session.tab(tab).unwrap().exit_code(),
        Some(SPAWN_FAILURE_EXIT_CODE)
    );
    assert!(h.drain().iter().any(|n| matches!(
        n,
        TabNotification::SpawnFailed { tab_id, reason }
            if *tab_id == tab && reason.contains("panicked")
    )));
}

#[tokio::test]
async fn test_retry_reissues_identical_request() {
    let mut h = Harness::new();
    let tab = h.add_tab();
    h.supervisor.resolve_spawn(0, Ok(SpawnReply::failed()));
    h.settle().await;

    assert!(h.session.retry_tab(tab));
    assert_eq!(h.supervisor.spawn_count(), 2);
    let spawns = h.supervisor.spawns();
    assert_eq!(spawns[1], spawns[0]);
    assert_eq!(h.session.tab(tab).unwrap().state(), TabState::Idle);

    h.supervisor.spawn_succeeds(1, 31337);
    h.settle().await;
    assert_eq!(
        h.session.tab(tab).unwrap().state(),
        TabState::Busy { pid: 31337 }
    );
}

#[tokio::test]
async fn test_retry_keeps_cwd_of_reopened_tab() {
    let mut h = Harness::new();
    let tab = h
        .session
        .add_tab_with("/bin/bash".to_string(), PathBuf::from("/srv/project"))
        .unwrap();
    h.supervisor.resolve_spawn(0, Ok(SpawnReply::failed()));
    h.settle().await;

    h.session.retry_tab(tab);
    let retried = &h.supervisor.spawns()[1];
    assert_eq!(retried.cwd, PathBuf::from("/srv/project"));
    assert_eq!(retried.shell, "/bin/bash");
}

#[tokio::test]
async fn test_retry_is_refused_unless_exited() {
    let mut h = Harness::new();
    let tab = h.add_tab();
    // Idle with a spawn outstanding
    assert!(!h.session.retry_tab(tab));

    h.supervisor.spawn_succeeds(0, 10);
    h.settle().await;
    // Busy
    assert!(!h.session.retry_tab(tab));
    // Missing
    assert!(!h.session.retry_tab(999));
    assert_eq!(h.supervisor.spawn_count(), 1);
}

#[tokio::test]
async fn test_superseded_spawn_result_is_discarded() {
    let mut h = Harness::new();
    let tab = h.add_tab();

    // First spawn is overtaken by an exit, then the tab is retried
    h.supervisor.emit_exit(&key(tab), 2);
    h.settle().await;
    assert!(h.session.retry_tab(tab));

    // The first spawn finally answers; it must not attach to the retried tab
    h.supervisor.spawn_succeeds(0, 111);
    h.settle().await;
    assert_eq!(h.session.tab(tab).unwrap().state(), TabState::Idle);
    assert!(h.session.is_spawn_pending(tab));
    assert!(h.supervisor.kills().is_empty());

    h.supervisor.spawn_succeeds(1, 222);
    h.settle().await;
    assert_eq!(
        h.session.tab(tab).unwrap().state(),
        TabState::Busy { pid: 222 }
    );
}

#[tokio::test]
async fn test_spawn_request_carries_shell_env() {
    let mut config = test_config();
    config
        .shell_env
        .insert("TERM_PROGRAM".to_string(), "shelltabs".to_string());
    let mut h = Harness::with_config(config);
    h.add_tab();

    let env = h.supervisor.spawns()[0].shell_env.clone().unwrap();
    assert_eq!(env.get("TERM_PROGRAM").map(String::as_str), Some("shelltabs"));
}

#[tokio::test]
async fn test_max_tabs_limits_new_tabs() {
    let config = Config {
        max_tabs: 2,
        ..test_config()
    };
    let mut h = Harness::with_config(config);
    assert!(h.session.add_tab().is_some());
    assert!(h.session.add_tab().is_some());
    assert!(h.session.add_tab().is_none());
    assert_eq!(h.supervisor.spawn_count(), 2);
}

#[tokio::test]
async fn test_config_loaded_from_file_drives_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        "shell: /usr/bin/fish\nworking_directory: /tmp/fishing\n",
    )
    .unwrap();
    let config = Config::load_from(&path).unwrap();

    let mut h = Harness::with_config(config);
    let tab = h.add_tab();

    let request = &h.supervisor.spawns()[0];
    assert_eq!(request.shell, "/usr/bin/fish");
    assert_eq!(request.cwd, PathBuf::from("/tmp/fishing"));
    assert_eq!(
        h.session.tab(tab).unwrap().shell_type,
        shelltabs_config::ShellType::Fish
    );
}
