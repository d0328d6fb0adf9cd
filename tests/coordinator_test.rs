//! 受保护动作协调器的端到端测试
//!
//! 覆盖完整流程：已登录直接执行、未登录暂存后登录再执行、
//! 覆盖写入、跨重启恢复、取消以及槽位损坏容错。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tempfile::TempDir;

use mentorgate::{
    AttemptOutcome, CoordinatorState, DrainOutcome, IntentKind, IntentStore, MemoryIntentStore,
    PendingIntent, ProtectedActionCoordinator, ProtectedActionService, ServiceConfig,
    ServiceError, SessionManager, SledIntentStore, UserProfile, UserRole,
};

fn manager_with_student() -> Arc<SessionManager> {
    let manager = SessionManager::new(3600);
    manager.register_account(UserProfile::new(
        "stu-1",
        "stu-1@example.org",
        UserRole::Student,
    ));
    Arc::new(manager)
}

fn memory_coordinator(sessions: Arc<SessionManager>) -> ProtectedActionCoordinator {
    ProtectedActionCoordinator::new(Arc::new(MemoryIntentStore::new()), sessions)
}

#[tokio::test]
async fn test_authenticated_attempt_runs_immediately() {
    let sessions = manager_with_student();
    sessions.sign_in("stu-1").unwrap();

    let store = Arc::new(MemoryIntentStore::new());
    let coordinator = ProtectedActionCoordinator::new(store.clone(), sessions);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let outcome = coordinator
        .attempt(
            IntentKind::ApplyInternship,
            json!({ "internship_id": "int-7" }),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome, AttemptOutcome::Executed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // 已登录路径不得写入存储
    assert!(store.load().await.unwrap().is_none());
    assert_eq!(coordinator.state().await, CoordinatorState::Idle);
}

#[tokio::test]
async fn test_defer_then_drain_delivers_once() {
    let sessions = manager_with_student();
    let coordinator = memory_coordinator(sessions.clone());

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let outcome = coordinator
        .attempt(
            IntentKind::RegisterEvent,
            json!({ "event_id": "evt-42" }),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome, AttemptOutcome::Deferred);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(coordinator.prompt_visible().await);

    sessions.sign_in("stu-1").unwrap();

    let delivered: Arc<Mutex<Option<PendingIntent>>> = Arc::new(Mutex::new(None));
    let sink = delivered.clone();
    let outcome = coordinator
        .drain(move |intent| async move {
            *sink.lock().unwrap() = Some(intent);
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(outcome, DrainOutcome::Delivered(IntentKind::RegisterEvent));
    let intent = delivered.lock().unwrap().take().unwrap();
    assert_eq!(intent.kind, IntentKind::RegisterEvent);
    assert_eq!(intent.payload, json!({ "event_id": "evt-42" }));
    assert_eq!(coordinator.state().await, CoordinatorState::Idle);

    // 第二次 drain 是空操作
    let outcome = coordinator
        .drain(|_intent| async move { panic!("nothing should be delivered") })
        .await
        .unwrap();
    assert_eq!(outcome, DrainOutcome::Empty);
}

#[tokio::test]
async fn test_last_writer_wins() {
    let sessions = manager_with_student();
    let coordinator = memory_coordinator(sessions.clone());

    coordinator
        .attempt(IntentKind::RegisterWorkshop, json!({ "workshop_id": "w-1" }), || async {
            Ok(())
        })
        .await
        .unwrap();
    coordinator
        .attempt(IntentKind::RegisterHackathon, json!({ "hackathon_id": "h-2" }), || async {
            Ok(())
        })
        .await
        .unwrap();

    sessions.sign_in("stu-1").unwrap();

    let delivered: Arc<Mutex<Option<PendingIntent>>> = Arc::new(Mutex::new(None));
    let sink = delivered.clone();
    coordinator
        .drain(move |intent| async move {
            *sink.lock().unwrap() = Some(intent);
            Ok(())
        })
        .await
        .unwrap();

    let intent = delivered.lock().unwrap().take().unwrap();
    assert_eq!(intent.kind, IntentKind::RegisterHackathon);
    assert_eq!(intent.payload, json!({ "hackathon_id": "h-2" }));
}

#[tokio::test]
async fn test_intent_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_str().unwrap().to_string();

    {
        let sessions = manager_with_student();
        let store = Arc::new(SledIntentStore::new(&path).unwrap());
        let coordinator = ProtectedActionCoordinator::new(store, sessions);
        coordinator
            .attempt(IntentKind::ApplyResearch, json!({ "project_id": "res-3" }), || async {
                Ok(())
            })
            .await
            .unwrap();
    }

    // 模拟重定向登录后的进程重启：全新的存储句柄和协调器
    let sessions = manager_with_student();
    sessions.sign_in("stu-1").unwrap();
    let store = Arc::new(SledIntentStore::new(&path).unwrap());
    let coordinator = ProtectedActionCoordinator::new(store, sessions);

    let delivered: Arc<Mutex<Option<PendingIntent>>> = Arc::new(Mutex::new(None));
    let sink = delivered.clone();
    let outcome = coordinator
        .drain(move |intent| async move {
            *sink.lock().unwrap() = Some(intent);
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(outcome, DrainOutcome::Delivered(IntentKind::ApplyResearch));
    let intent = delivered.lock().unwrap().take().unwrap();
    assert_eq!(intent.payload, json!({ "project_id": "res-3" }));
}

#[tokio::test]
async fn test_clear_discards_pending_intent() {
    let sessions = manager_with_student();
    let coordinator = memory_coordinator(sessions.clone());

    coordinator
        .attempt(IntentKind::ApplyMentorship, json!({ "mentor_id": "m-5" }), || async {
            Ok(())
        })
        .await
        .unwrap();
    assert!(coordinator.prompt_visible().await);

    coordinator.dismiss_prompt().await.unwrap();
    assert_eq!(coordinator.state().await, CoordinatorState::Idle);

    sessions.sign_in("stu-1").unwrap();
    let outcome = coordinator
        .drain(|_intent| async move { panic!("cancelled intent must not be delivered") })
        .await
        .unwrap();
    assert_eq!(outcome, DrainOutcome::Empty);
}

#[tokio::test]
async fn test_corrupt_slot_is_silently_dropped() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_str().unwrap().to_string();

    {
        let db = sled::open(&path).unwrap();
        db.insert(mentorgate::intent::PENDING_INTENT_KEY, &b"{ not json"[..])
            .unwrap();
        db.flush().unwrap();
    }

    let sessions = manager_with_student();
    sessions.sign_in("stu-1").unwrap();
    let store = Arc::new(SledIntentStore::new(&path).unwrap());
    let coordinator = ProtectedActionCoordinator::new(store.clone(), sessions);

    let outcome = coordinator
        .drain(|_intent| async move { panic!("corrupt slot must not be delivered") })
        .await
        .unwrap();

    assert_eq!(outcome, DrainOutcome::Empty);
    // 损坏的值已被清除
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_handler_keeps_intent_for_retry() {
    let sessions = manager_with_student();
    let coordinator = memory_coordinator(sessions.clone());

    coordinator
        .attempt(IntentKind::ApplyPlacementSupport, json!({ "request_id": "pl-9" }), || async {
            Ok(())
        })
        .await
        .unwrap();
    sessions.sign_in("stu-1").unwrap();

    let result = coordinator
        .drain(|_intent| async move {
            Err(ServiceError::ActionFailed("backend rejected".to_string()))
        })
        .await;
    assert!(matches!(result, Err(ServiceError::ActionFailed(_))));

    // 投递失败后意图保留，重试成功
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let outcome = coordinator
        .drain(move |_intent| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        DrainOutcome::Delivered(IntentKind::ApplyPlacementSupport)
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_drains_deliver_once() {
    let sessions = manager_with_student();
    let coordinator = Arc::new(memory_coordinator(sessions.clone()));

    coordinator
        .attempt(IntentKind::RegisterEvent, json!({ "event_id": "evt-9" }), || async {
            Ok(())
        })
        .await
        .unwrap();
    sessions.sign_in("stu-1").unwrap();

    // 两个并发 drain，handler 故意停顿放大竞争窗口
    let calls = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for _ in 0..2 {
        let coordinator = coordinator.clone();
        let counter = calls.clone();
        handles.push(tokio::spawn(async move {
            coordinator
                .drain(move |_intent| async move {
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap()
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(outcomes.contains(&DrainOutcome::Delivered(IntentKind::RegisterEvent)));
    assert!(outcomes.contains(&DrainOutcome::Empty));
}

#[tokio::test]
async fn test_authenticated_attempt_lowers_prompt() {
    let sessions = manager_with_student();
    let coordinator = memory_coordinator(sessions.clone());

    coordinator
        .attempt(IntentKind::RegisterWorkshop, json!({ "workshop_id": "w-3" }), || async {
            Ok(())
        })
        .await
        .unwrap();
    assert!(coordinator.prompt_visible().await);

    sessions.sign_in("stu-1").unwrap();

    let outcome = coordinator
        .attempt(IntentKind::RegisterEvent, json!({ "event_id": "evt-5" }), || async {
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(outcome, AttemptOutcome::Executed);
    // 已登录后登录提示收起
    assert!(!coordinator.prompt_visible().await);
    assert_eq!(coordinator.state().await, CoordinatorState::Idle);

    // 先前暂存的意图不受影响，仍可取回
    let delivered: Arc<Mutex<Option<PendingIntent>>> = Arc::new(Mutex::new(None));
    let sink = delivered.clone();
    let outcome = coordinator
        .drain(move |intent| async move {
            *sink.lock().unwrap() = Some(intent);
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(outcome, DrainOutcome::Delivered(IntentKind::RegisterWorkshop));
}

#[tokio::test]
async fn test_service_assembly_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = ServiceConfig {
        intent_store_path: temp_dir.path().to_str().unwrap().to_string(),
        ..ServiceConfig::default()
    };

    let service = ProtectedActionService::from_config(config).unwrap();
    let sessions = service.sessions();
    sessions.register_account(UserProfile::new("adm-1", "adm-1@example.org", UserRole::Admin));
    sessions.sign_in("adm-1").unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let outcome = service
        .coordinator()
        .attempt(IntentKind::RegisterEvent, json!({ "event_id": "evt-1" }), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(outcome, AttemptOutcome::Executed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
