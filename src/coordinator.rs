use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::intent::{IntentKind, IntentStore, PendingIntent};
use crate::session::SessionOracle;

/// 协调器状态
///
/// 显式状态机，只有两个可观测状态：
/// - `Idle`：没有待执行意图，登录提示未显示
/// - `AwaitingAuth`：登录提示可见，持有一个待执行意图
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// 空闲
    Idle,
    /// 等待认证
    AwaitingAuth,
}

/// `attempt` 的执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 已有会话，动作立即执行
    Executed,
    /// 未登录，意图已暂存并等待登录
    Deferred,
}

/// `drain` 的执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// 暂存的意图已成功投递
    Delivered(IntentKind),
    /// 没有待执行意图
    Empty,
}

struct CoordinatorInner {
    state: CoordinatorState,
    /// 同会话内的意图副本，免去无刷新流程的存储往返
    pending: Option<PendingIntent>,
}

/// 受保护动作协调器
///
/// 受保护动作的编排逻辑：已登录立即执行，未登录则把意图写入单槽位
/// 存储并拉起登录提示；登录完成后由调用方触发 `drain` 取回并执行。
/// 意图同时保存在内存和持久化存储中，分别覆盖原地登录和跨重启的
/// 重定向登录两种流程。
///
/// 槽位语义为 last-writer-wins：同一时刻最多一个待执行意图，
/// 新的 `attempt` 覆盖旧值。
pub struct ProtectedActionCoordinator {
    store: Arc<dyn IntentStore>,
    oracle: Arc<dyn SessionOracle>,
    inner: RwLock<CoordinatorInner>,
    /// 投递锁：读槽位、执行 handler、清空槽位必须作为整体串行，
    /// 否则并发 `drain` 会重复投递同一个意图
    delivery: Mutex<()>,
}

impl ProtectedActionCoordinator {
    /// 创建新的协调器
    pub fn new(store: Arc<dyn IntentStore>, oracle: Arc<dyn SessionOracle>) -> Self {
        Self {
            store,
            oracle,
            inner: RwLock::new(CoordinatorInner {
                state: CoordinatorState::Idle,
                pending: None,
            }),
            delivery: Mutex::new(()),
        }
    }

    /// 发起受保护动作
    ///
    /// 会话预言机报告有未过期会话时直接执行 `run_now`，不产生任何
    /// 持久化；否则暂存意图、转入 `AwaitingAuth` 并返回
    /// [`AttemptOutcome::Deferred`]，由表示层打开登录提示。
    pub async fn attempt<F, Fut>(
        &self,
        kind: IntentKind,
        payload: serde_json::Value,
        run_now: F,
    ) -> Result<AttemptOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if self.has_live_session().await {
            {
                // 已观测到会话，登录提示不再有意义；暂存的意图保留，
                // 等待下一次 drain 取回
                let mut inner = self.inner.write().await;
                if inner.state == CoordinatorState::AwaitingAuth {
                    debug!("Live session observed, lowering sign-in prompt");
                    inner.state = CoordinatorState::Idle;
                }
            }

            debug!("Session present, running {} immediately", kind);
            run_now().await?;
            return Ok(AttemptOutcome::Executed);
        }

        let intent = PendingIntent::new(kind, payload);
        self.store.save(&intent).await?;

        let mut inner = self.inner.write().await;
        inner.pending = Some(intent);
        inner.state = CoordinatorState::AwaitingAuth;
        info!("Deferred {} until sign-in completes", kind);

        Ok(AttemptOutcome::Deferred)
    }

    /// 取回并执行暂存的意图
    ///
    /// 优先读持久化槽位（覆盖跨重启的重定向登录），其次读内存副本；
    /// 两者都为空时是无副作用的空操作，可以在每次观测到会话建立后
    /// 投机性地调用。
    ///
    /// 只有 `handler` 成功返回后才清除槽位；`handler` 失败时意图
    /// 原样保留，错误向上传播，后续的 `drain` 会再次投递。
    ///
    /// 并发调用串行执行：同一个意图恰好投递一次，落后的调用读到
    /// 空槽位并返回 [`DrainOutcome::Empty`]。
    pub async fn drain<H, Fut>(&self, handler: H) -> Result<DrainOutcome>
    where
        H: FnOnce(PendingIntent) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let _delivery = self.delivery.lock().await;

        let intent = match self.store.load().await? {
            Some(intent) => Some(intent),
            None => self.inner.read().await.pending.clone(),
        };

        let Some(intent) = intent else {
            return Ok(DrainOutcome::Empty);
        };

        let kind = intent.kind;
        handler(intent).await?;

        self.store.clear().await?;
        let mut inner = self.inner.write().await;
        inner.pending = None;
        inner.state = CoordinatorState::Idle;
        info!("Delivered deferred {}", kind);

        Ok(DrainOutcome::Delivered(kind))
    }

    /// 丢弃暂存的意图并回到空闲状态
    ///
    /// 唯一的取消原语，用于用户放弃登录提示的场景。
    pub async fn clear(&self) -> Result<()> {
        let _delivery = self.delivery.lock().await;

        self.store.clear().await?;

        let mut inner = self.inner.write().await;
        if inner.pending.take().is_some() {
            debug!("Discarded pending intent");
        }
        inner.state = CoordinatorState::Idle;

        Ok(())
    }

    /// 用户关闭登录提示
    pub async fn dismiss_prompt(&self) -> Result<()> {
        info!("Sign-in prompt dismissed");
        self.clear().await
    }

    /// 当前状态
    pub async fn state(&self) -> CoordinatorState {
        self.inner.read().await.state
    }

    /// 登录提示是否应当可见（供表示层绑定）
    pub async fn prompt_visible(&self) -> bool {
        self.state().await == CoordinatorState::AwaitingAuth
    }

    async fn has_live_session(&self) -> bool {
        match self.oracle.current_session().await {
            Ok(Some(session)) if !session.is_expired() => true,
            Ok(_) => false,
            Err(e) => {
                // 预言机不可用按未登录处理，走登录路径
                warn!("Session oracle unavailable, treating as unauthenticated: {}", e);
                false
            }
        }
    }
}
