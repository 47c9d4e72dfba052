use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kameo::actor::{ActorRef, Spawn};
use kameo::error::SendError;
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;

use uplift_api::events::WsEvent;
use uplift_core::*;
use uplift_exec::{AutomationExecutor, ExecutionResult, UpgradeJob};

// Mock implementations

/// Returns a fixed result and counts invocations
struct ScriptedExecutor {
    succeed: bool,
    output: &'static str,
    calls: AtomicUsize,
}

impl ScriptedExecutor {
    fn succeeding(output: &'static str) -> Self {
        Self {
            succeed: true,
            output,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(output: &'static str) -> Self {
        Self {
            succeed: false,
            output,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AutomationExecutor for ScriptedExecutor {
    async fn run(&self, _job: &UpgradeJob, _cancel: &CancellationToken) -> ExecutionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.succeed {
            ExecutionResult::success(self.output, Duration::from_millis(1))
        } else {
            ExecutionResult::failure(
                Some(2),
                self.output,
                "tool exited with status 2",
                Duration::from_millis(1),
            )
        }
    }

    fn executor_type(&self) -> &'static str {
        "scripted"
    }
}

/// Blocks until released or cancelled
struct GatedExecutor {
    started: Semaphore,
    release: Semaphore,
    jobs: std::sync::Mutex<Vec<UpgradeJob>>,
}

impl GatedExecutor {
    fn new() -> Self {
        Self {
            started: Semaphore::new(0),
            release: Semaphore::new(0),
            jobs: std::sync::Mutex::new(Vec::new()),
        }
    }

    async fn wait_started(&self) {
        self.started.acquire().await.unwrap().forget();
    }

    fn release(&self, runs: usize) {
        self.release.add_permits(runs);
    }
}

#[async_trait]
impl AutomationExecutor for GatedExecutor {
    async fn run(&self, job: &UpgradeJob, cancel: &CancellationToken) -> ExecutionResult {
        self.jobs.lock().unwrap().push(job.clone());
        self.started.add_permits(1);
        tokio::select! {
            Ok(permit) = self.release.acquire() => {
                permit.forget();
                ExecutionResult::success("released", Duration::ZERO)
            }
            () = cancel.cancelled() => {
                ExecutionResult::failure(None, "", "upgrade cancelled", Duration::ZERO)
            }
        }
    }

    fn executor_type(&self) -> &'static str {
        "gated"
    }
}

struct BrokenAuditStore;

#[async_trait]
impl AuditStore for BrokenAuditStore {
    async fn append(&self, _entry: AuditEntry) -> Result<AuditRecord, StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    async fn list_for_host(&self, _host_id: &str) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn list_all(&self) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(Vec::new())
    }
}

// Fixtures

fn java() -> Component {
    Component {
        name: "Java".to_string(),
        kind: "Java".to_string(),
        current_version: "1.8.0.211".to_string(),
        target_version: "11.0.12".to_string(),
        vulnerabilities: "2 Critical".to_string(),
        install_path: "/opt/verizon/java".to_string(),
        status: Status::Outdated,
    }
}

fn tomcat() -> Component {
    Component {
        name: "Tomcat".to_string(),
        kind: "Tomcat".to_string(),
        current_version: "8.5.0".to_string(),
        target_version: "9.0.80".to_string(),
        vulnerabilities: "1 High".to_string(),
        install_path: "/opt/tomcat".to_string(),
        status: Status::Outdated,
    }
}

fn host(components: Vec<Component>) -> Host {
    let mut host = Host {
        id: "1".to_string(),
        hostname: "app-01".to_string(),
        ip: "10.0.0.1".to_string(),
        environment: "Prod".to_string(),
        status: Status::Outdated,
        components,
    };
    host.refresh_status();
    host
}

struct Harness {
    engine: ActorRef<UpgradeEngine>,
    inventory: Arc<MemoryInventory>,
    audit: Arc<dyn AuditStore>,
    events: broadcast::Receiver<WsEvent>,
}

fn spawn_engine(
    hosts: Vec<Host>,
    executor: Arc<dyn AutomationExecutor>,
    audit: Arc<dyn AuditStore>,
) -> Harness {
    let (tx, rx) = broadcast::channel(100);
    let inventory = Arc::new(MemoryInventory::with_hosts(hosts));

    let engine = UpgradeEngine::spawn(UpgradeEngineArgs {
        inventory: inventory.clone(),
        audit_store: audit.clone(),
        executor,
        event_tx: tx,
        max_output_bytes: 2000,
    });

    Harness {
        engine,
        inventory,
        audit,
        events: rx,
    }
}

fn dispatch(host_id: &str, component: &str, version: &str) -> Dispatch {
    Dispatch {
        host_id: host_id.to_string(),
        component_name: component.to_string(),
        target_version: version.to_string(),
        actor: "ops".to_string(),
    }
}

async fn rejected(engine: &ActorRef<UpgradeEngine>, msg: Dispatch) -> DispatchError {
    match engine.ask(msg).await {
        Err(SendError::HandlerError(e)) => e,
        Err(other) => panic!("unexpected send error: {other:?}"),
        Ok(ticket) => panic!("dispatch unexpectedly accepted: {ticket:?}"),
    }
}

// Tests

#[tokio::test]
async fn test_successful_upgrade_updates_state_and_audits() {
    let executor = Arc::new(ScriptedExecutor::succeeding("PLAY RECAP ok=5 failed=0"));
    let mut h = spawn_engine(
        vec![host(vec![java()])],
        executor.clone(),
        Arc::new(MemoryAuditStore::new()),
    );

    let ticket = h.engine.ask(dispatch("1", "java", "11.0.12")).await.unwrap();
    assert_eq!(ticket.component_name, "Java");
    assert_eq!(ticket.from_version, "1.8.0.211");

    let report = ticket.handle.wait().await.unwrap();
    assert_eq!(report.outcome, UpgradeOutcome::Succeeded);

    let stored = h.inventory.get_host("1").await.unwrap().unwrap();
    let component = stored.component("Java").unwrap();
    assert_eq!(component.current_version, "11.0.12");
    assert_eq!(component.status, Status::UpToDate);
    assert_eq!(stored.status, Status::UpToDate);

    let records = h.audit.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.outcome, AuditOutcome::Success);
    assert_eq!(record.from_version, "1.8.0.211");
    assert_eq!(record.to_version, "11.0.12");
    assert_eq!(record.hostname, "app-01");
    assert_eq!(record.actor, "ops");
    assert!(record.output.contains("PLAY RECAP ok=5"));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);

    assert!(matches!(h.events.recv().await.unwrap(), WsEvent::UpgradeStarted { .. }));
    match h.events.recv().await.unwrap() {
        WsEvent::UpgradeFinished { status, .. } => assert_eq!(status, "SUCCESS"),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(
        h.events.recv().await.unwrap(),
        WsEvent::HostStatusChanged {
            host: "1".to_string(),
            from: "Outdated".to_string(),
            to: "Up to Date".to_string(),
        }
    );

    h.engine.stop_gracefully().await.unwrap();
}

#[tokio::test]
async fn test_failed_upgrade_leaves_component_unchanged() {
    let h = spawn_engine(
        vec![host(vec![java()])],
        Arc::new(ScriptedExecutor::failing("fatal: [10.0.0.1]: UNREACHABLE!")),
        Arc::new(MemoryAuditStore::new()),
    );

    let ticket = h.engine.ask(dispatch("1", "Java", "11.0.12")).await.unwrap();
    let report = ticket.handle.wait().await.unwrap();
    assert_eq!(report.outcome, UpgradeOutcome::ToolFailed);

    let stored = h.inventory.get_host("1").await.unwrap().unwrap();
    let component = stored.component("Java").unwrap();
    assert_eq!(component.current_version, "1.8.0.211");
    assert_eq!(component.status, Status::Outdated);
    assert_eq!(stored.status, Status::Outdated);

    let records = h.audit.list_for_host("1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, AuditOutcome::Failed);
    assert!(records[0].output.starts_with("Error during automation: tool exited with status 2"));
    assert!(records[0].output.contains("UNREACHABLE"));
}

#[tokio::test]
async fn test_host_up_to_date_only_after_all_components() {
    let h = spawn_engine(
        vec![host(vec![java(), tomcat()])],
        Arc::new(ScriptedExecutor::succeeding("ok")),
        Arc::new(MemoryAuditStore::new()),
    );

    let first = h.engine.ask(dispatch("1", "Java", "11.0.12")).await.unwrap();
    let report = first.handle.wait().await.unwrap();
    assert_eq!(report.host.unwrap().status, Status::Outdated);

    let second = h.engine.ask(dispatch("1", "Tomcat", "9.0.80")).await.unwrap();
    let report = second.handle.wait().await.unwrap();
    assert_eq!(report.host.unwrap().status, Status::UpToDate);

    let stored = h.engine.ask(GetHost { host_id: "1".to_string() }).await.unwrap();
    assert_eq!(stored.status, Status::UpToDate);
}

#[tokio::test]
async fn test_repeat_upgrade_is_idempotent() {
    let h = spawn_engine(
        vec![host(vec![java()])],
        Arc::new(ScriptedExecutor::succeeding("ok")),
        Arc::new(MemoryAuditStore::new()),
    );

    for _ in 0..2 {
        let ticket = h.engine.ask(dispatch("1", "Java", "11.0.12")).await.unwrap();
        ticket.handle.wait().await.unwrap();
    }

    let history = h
        .engine
        .ask(GetHistory {
            host_id: Some("1".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    // most recent first
    assert_eq!(history[0].from_version, "11.0.12");
    assert_eq!(history[0].to_version, "11.0.12");
    assert_eq!(history[1].from_version, "1.8.0.211");

    let stored = h.inventory.get_host("1").await.unwrap().unwrap();
    assert_eq!(stored.component("Java").unwrap().current_version, "11.0.12");
    assert_eq!(stored.status, Status::UpToDate);
}

#[tokio::test]
async fn test_rejected_dispatches_write_nothing() {
    let executor = Arc::new(ScriptedExecutor::succeeding("ok"));
    let h = spawn_engine(
        vec![host(vec![java()])],
        executor.clone(),
        Arc::new(MemoryAuditStore::new()),
    );
    let before = h.inventory.get_host("1").await.unwrap().unwrap();

    let err = rejected(&h.engine, dispatch("99", "Java", "11.0.12")).await;
    assert_eq!(err, DispatchError::UnknownHost("99".to_string()));
    assert_eq!(err.code(), "UNKNOWN_HOST");

    let err = rejected(&h.engine, dispatch("1", "Python", "3.12")).await;
    assert!(matches!(err, DispatchError::UnknownComponent { .. }));

    let err = rejected(&h.engine, dispatch("1", "Java", "  ")).await;
    assert!(matches!(err, DispatchError::InvalidRequest(_)));

    let err = rejected(&h.engine, dispatch("", "Java", "11.0.12")).await;
    assert!(matches!(err, DispatchError::InvalidRequest(_)));

    assert!(h.audit.list_all().await.unwrap().is_empty());
    assert_eq!(h.inventory.get_host("1").await.unwrap().unwrap(), before);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_same_target_rejected_while_in_flight() {
    let executor = Arc::new(GatedExecutor::new());
    let h = spawn_engine(
        vec![host(vec![java()])],
        executor.clone(),
        Arc::new(MemoryAuditStore::new()),
    );

    let ticket = h.engine.ask(dispatch("1", "Java", "11.0.12")).await.unwrap();
    executor.wait_started().await;

    let err = rejected(&h.engine, dispatch("1", "JAVA", "11.0.13")).await;
    assert_eq!(err.code(), "UPGRADE_IN_FLIGHT");

    let active = h.engine.ask(ListActive).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].target_version, "11.0.12");

    executor.release(1);
    ticket.handle.wait().await.unwrap();

    // released once the first attempt finished
    assert!(h.engine.ask(ListActive).await.unwrap().is_empty());
    let again = h.engine.ask(dispatch("1", "Java", "11.0.13")).await.unwrap();
    executor.wait_started().await;
    executor.release(1);
    again.handle.wait().await.unwrap();

    assert_eq!(h.audit.list_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_distinct_targets_run_concurrently() {
    let executor = Arc::new(GatedExecutor::new());
    let h = spawn_engine(
        vec![host(vec![java(), tomcat()])],
        executor.clone(),
        Arc::new(MemoryAuditStore::new()),
    );

    let java_ticket = h.engine.ask(dispatch("1", "Java", "11.0.12")).await.unwrap();
    executor.wait_started().await;
    let tomcat_ticket = h.engine.ask(dispatch("1", "Tomcat", "9.0.80")).await.unwrap();
    executor.wait_started().await;

    let status = h.engine.ask(GetEngineStatus).await.unwrap();
    assert_eq!(status.active_upgrades, 2);
    assert_eq!(status.executor, "gated");

    executor.release(2);
    java_ticket.handle.wait().await.unwrap();
    tomcat_ticket.handle.wait().await.unwrap();

    // neither update lost the other's write
    let stored = h.inventory.get_host("1").await.unwrap().unwrap();
    assert_eq!(stored.component("Java").unwrap().current_version, "11.0.12");
    assert_eq!(stored.component("Tomcat").unwrap().current_version, "9.0.80");
    assert_eq!(stored.status, Status::UpToDate);

    let jobs = executor.jobs.lock().unwrap();
    assert!(jobs.iter().all(|j| j.host_addr == "10.0.0.1"));
}

#[tokio::test]
async fn test_cancel_marks_attempt_failed() {
    let executor = Arc::new(GatedExecutor::new());
    let h = spawn_engine(
        vec![host(vec![java()])],
        executor.clone(),
        Arc::new(MemoryAuditStore::new()),
    );

    let err = h
        .engine
        .ask(CancelUpgrade {
            host_id: "1".to_string(),
            component_name: "Java".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SendError::HandlerError(DispatchError::NotInFlight { .. })
    ));

    let ticket = h.engine.ask(dispatch("1", "Java", "11.0.12")).await.unwrap();
    executor.wait_started().await;

    h.engine
        .ask(CancelUpgrade {
            host_id: "1".to_string(),
            component_name: "java".to_string(),
        })
        .await
        .unwrap();

    let report = ticket.handle.wait().await.unwrap();
    assert_eq!(report.outcome, UpgradeOutcome::ToolFailed);
    let record = report.record.unwrap();
    assert_eq!(record.outcome, AuditOutcome::Failed);
    assert!(record.output.contains("upgrade cancelled"));

    let stored = h.inventory.get_host("1").await.unwrap().unwrap();
    assert_eq!(stored.component("Java").unwrap().current_version, "1.8.0.211");
}

#[tokio::test]
async fn test_audit_failure_reported_without_rolling_back() {
    let h = spawn_engine(
        vec![host(vec![java()])],
        Arc::new(ScriptedExecutor::succeeding("ok")),
        Arc::new(BrokenAuditStore),
    );

    let ticket = h.engine.ask(dispatch("1", "Java", "11.0.12")).await.unwrap();
    let report = ticket.handle.wait().await.unwrap();

    assert_eq!(report.outcome, UpgradeOutcome::Succeeded);
    assert!(report.record.is_none());
    assert!(report.audit_error.unwrap().contains("disk full"));

    let stored = h.inventory.get_host("1").await.unwrap().unwrap();
    assert_eq!(stored.component("Java").unwrap().current_version, "11.0.12");
}

#[tokio::test]
async fn test_host_removed_mid_flight_is_state_failure() {
    let executor = Arc::new(GatedExecutor::new());
    let h = spawn_engine(
        vec![host(vec![java()])],
        executor.clone(),
        Arc::new(MemoryAuditStore::new()),
    );

    let ticket = h.engine.ask(dispatch("1", "Java", "11.0.12")).await.unwrap();
    executor.wait_started().await;
    h.inventory.remove_host("1").await;
    executor.release(1);

    let report = ticket.handle.wait().await.unwrap();
    assert_eq!(report.outcome, UpgradeOutcome::StateFailed);
    assert!(report.host.is_none());

    let records = h.audit.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, AuditOutcome::Failed);
    assert!(records[0].output.contains("could not persist result"));
}

#[tokio::test]
async fn test_queries() {
    let mut second = host(vec![tomcat()]);
    second.id = "2".to_string();
    second.hostname = "app-02".to_string();

    let h = spawn_engine(
        vec![host(vec![java()]), second],
        Arc::new(ScriptedExecutor::succeeding("ok")),
        Arc::new(MemoryAuditStore::new()),
    );

    let hosts = h.engine.ask(ListHosts).await.unwrap();
    assert_eq!(hosts.len(), 2);
    assert_eq!(hosts[0].id, "1");

    let err = h
        .engine
        .ask(GetHost {
            host_id: "nope".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SendError::HandlerError(CoreError::HostNotFound(_))
    ));

    for (id, component, version) in [("1", "Java", "11.0.12"), ("2", "Tomcat", "9.0.80")] {
        let ticket = h.engine.ask(dispatch(id, component, version)).await.unwrap();
        ticket.handle.wait().await.unwrap();
    }

    let all = h.engine.ask(GetHistory::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].host_id, "1");

    let only_two = h
        .engine
        .ask(GetHistory {
            host_id: Some("2".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(only_two.len(), 1);
    assert_eq!(only_two[0].component_name, "Tomcat");
}
