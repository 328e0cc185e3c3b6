//! 状态切换控制器
//!
//! 一次加载的完整顺序：
//!
//! 1. 已在加载或卸载时拒绝
//! 2. 通知观察者开始加载
//! 3. 卸载当前状态（组件 `on_destroy_async` → `unload_async` → 销毁 → 回收资源 → 通知已卸载）
//! 4. 解析模板路径、加载模板、实例化
//! 5. 标记保留并命名为 `[模板名]`
//! 6. 按挂载顺序调用 `load_async`
//! 7. 调用状态作用域内组件的 `on_create_async`
//! 8. 通知观察者加载完成
//!
//! 解析或实例化失败时不会恢复上一个状态，调用方需要处理 "没有激活状态" 的结果。

use crate::guard::{InProgress, TransitionGuard};
use parking_lot::{Mutex, RwLock};
use scope_abstractions::{
    GameStateAsync, ResourceReclaimer, StateDescriptor, StateObserver, TemplateResolver,
};
use scope_impl::{ActiveStateSlot, Instantiator, SceneObject, TemplateLoader};
use state_common::{LifecycleError, TransitionError, TransitionResult};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 状态切换依赖的外部协作方
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Arc<dyn TemplateResolver>,
    pub loader: Arc<dyn TemplateLoader>,
    pub instantiator: Arc<dyn Instantiator>,
    pub reclaimer: Arc<dyn ResourceReclaimer>,
}

/// 加载结果
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// 新状态已加载并完成全部钩子
    Loaded(Arc<SceneObject>),
    /// 同种类的持久状态已激活，新实例被销毁，没有调用任何钩子
    Deduplicated,
}

impl LoadOutcome {
    pub fn object(&self) -> Option<&Arc<SceneObject>> {
        match self {
            Self::Loaded(object) => Some(object),
            Self::Deduplicated => None,
        }
    }

    pub fn is_deduplicated(&self) -> bool {
        matches!(self, Self::Deduplicated)
    }
}

struct LoadedState {
    object: Arc<SceneObject>,
    descriptor: StateDescriptor,
}

/// 状态切换控制器
pub struct StateTransitionController {
    guard: TransitionGuard,
    collaborators: Collaborators,
    slot: Arc<ActiveStateSlot>,
    observers: RwLock<Vec<Arc<dyn StateObserver>>>,
    current: Mutex<Option<LoadedState>>,
}

impl StateTransitionController {
    pub fn new(collaborators: Collaborators, slot: Arc<ActiveStateSlot>) -> Self {
        Self {
            guard: TransitionGuard::new(),
            collaborators,
            slot,
            observers: RwLock::new(Vec::new()),
            current: Mutex::new(None),
        }
    }

    /// 订阅状态切换通知，按订阅顺序调用
    pub fn subscribe(&self, observer: Arc<dyn StateObserver>) {
        debug!("订阅状态切换通知: {}", observer.name());
        self.observers.write().push(observer);
    }

    /// 加载状态
    pub async fn load_state_async(
        &self,
        descriptor: StateDescriptor,
    ) -> TransitionResult<LoadOutcome> {
        let Some(_loading) = self.guard.try_begin_load() else {
            warn!("状态 {} 加载被拒绝：已有状态正在加载", descriptor.name());
            return Err(TransitionError::LoadInProgress);
        };
        // 卸载标志在通知观察者之前获取，被拒绝的加载不会留下没有下文的开始通知
        let Some(unloading) = self.guard.try_begin_unload() else {
            warn!("状态 {} 加载被拒绝：已有状态正在卸载", descriptor.name());
            return Err(TransitionError::UnloadInProgress);
        };

        info!("开始加载状态: {}", descriptor.name());
        for observer in self.observers() {
            observer.on_begin_load(&descriptor);
        }

        self.unload_current(unloading).await?;

        let path = self
            .collaborators
            .resolver
            .resolve_path(descriptor.template())
            .ok_or_else(|| {
                Self::failed(
                    &descriptor,
                    TransitionError::UnresolvedTemplatePath {
                        template: descriptor.template().to_string(),
                    },
                )
            })?;

        let template = self
            .collaborators
            .loader
            .load_template(&path)
            .await
            .ok_or_else(|| {
                Self::failed(
                    &descriptor,
                    TransitionError::TemplateLoadFailed { path: path.clone() },
                )
            })?;

        let object = self
            .collaborators
            .instantiator
            .instantiate(&template)
            .await
            .ok_or_else(|| {
                Self::failed(
                    &descriptor,
                    TransitionError::InstantiationFailed {
                        template: template.name().to_string(),
                    },
                )
            })?;

        object.set_persistent(true);
        object.set_name(format!("[{}]", template.name()));

        if object.is_destroyed() {
            info!("状态 {} 已由持久实例承载，丢弃新实例", descriptor.name());
            return Ok(LoadOutcome::Deduplicated);
        }

        *self.current.lock() = Some(LoadedState {
            object: object.clone(),
            descriptor: descriptor.clone(),
        });

        for component in object.components() {
            if let Some(hooks) = component.capability::<dyn GameStateAsync>() {
                hooks.load_async().await.map_err(|err| {
                    LifecycleError::hook_failed(component.name(), "load_async", err.as_ref())
                })?;
            }
        }

        if let Some(scope) = object.state_scope() {
            let created = scope.initialize_components().await?;
            debug!("状态 {} 初始化了 {} 个组件", descriptor.name(), created);
        }

        for observer in self.observers() {
            observer
                .on_state_loaded(&descriptor)
                .await
                .map_err(|err| TransitionError::Observer {
                    observer: observer.name().to_string(),
                    message: err.to_string(),
                })?;
        }

        info!("状态加载完成: {}", descriptor.name());
        Ok(LoadOutcome::Loaded(object))
    }

    /// 卸载当前状态
    ///
    /// 加载进行中时拒绝。没有当前状态时只回收资源。卸载钩子失败时对象仍被销毁，
    /// 资源照常回收，但不发送卸载通知。
    pub async fn unload_state_async(&self) -> TransitionResult<()> {
        if self.guard.is_loading() {
            warn!("卸载被拒绝：已有状态正在加载");
            return Err(TransitionError::LoadInProgress);
        }
        let Some(unloading) = self.guard.try_begin_unload() else {
            warn!("卸载被拒绝：已有状态正在卸载");
            return Err(TransitionError::UnloadInProgress);
        };
        self.unload_current(unloading).await
    }

    async fn unload_current(&self, _unloading: InProgress<'_>) -> TransitionResult<()> {
        let previous = self.current.lock().take();
        let mut failure = None;
        let previous = match previous {
            Some(LoadedState { object, descriptor }) if object.is_destroyed() => {
                // 已被宿主直接启动的状态替换，钩子不再调用
                debug!("状态 {} 已被销毁，跳过卸载钩子", descriptor.name());
                Some(descriptor)
            }
            Some(LoadedState { object, descriptor }) => {
                info!("卸载状态: {}", descriptor.name());
                if let Err(err) = Self::run_unload_hooks(&object).await {
                    error!("状态 {} 卸载钩子失败: {}", descriptor.name(), err);
                    failure = Some(err);
                }
                object.destroy();
                Some(descriptor)
            }
            None => None,
        };

        self.collaborators.reclaimer.release_unused().await;

        if let Some(err) = failure {
            return Err(err.into());
        }

        if let Some(previous) = previous {
            for observer in self.observers() {
                observer
                    .on_state_unloaded(&previous)
                    .await
                    .map_err(|err| TransitionError::Observer {
                        observer: observer.name().to_string(),
                        message: err.to_string(),
                    })?;
            }
        }
        Ok(())
    }

    fn failed(descriptor: &StateDescriptor, err: TransitionError) -> TransitionError {
        error!("状态 {} 加载失败: {}", descriptor.name(), err);
        err
    }

    async fn run_unload_hooks(object: &SceneObject) -> Result<(), LifecycleError> {
        if let Some(scope) = object.state_scope() {
            scope.destroy_components().await?;
        }
        for component in object.components() {
            if let Some(hooks) = component.capability::<dyn GameStateAsync>() {
                hooks.unload_async().await.map_err(|err| {
                    LifecycleError::hook_failed(component.name(), "unload_async", err.as_ref())
                })?;
            }
        }
        Ok(())
    }

    /// 销毁当前状态对象，不调用异步钩子
    pub fn shutdown(&self) {
        if let Some(previous) = self.current.lock().take() {
            info!("关闭状态: {}", previous.descriptor.name());
            previous.object.destroy();
        }
    }

    /// 当前状态对象
    pub fn current_state(&self) -> Option<Arc<SceneObject>> {
        self.current
            .lock()
            .as_ref()
            .map(|current| current.object.clone())
    }

    /// 当前状态描述
    pub fn current_descriptor(&self) -> Option<StateDescriptor> {
        self.current
            .lock()
            .as_ref()
            .map(|current| current.descriptor.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.guard.is_loading()
    }

    pub fn is_unloading(&self) -> bool {
        self.guard.is_unloading()
    }

    pub fn active_slot(&self) -> &Arc<ActiveStateSlot> {
        &self.slot
    }

    fn observers(&self) -> Vec<Arc<dyn StateObserver>> {
        self.observers.read().clone()
    }
}

impl fmt::Debug for StateTransitionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTransitionController")
            .field(
                "current",
                &self.current_descriptor().map(|d| d.name().to_string()),
            )
            .field("loading", &self.is_loading())
            .field("unloading", &self.is_unloading())
            .field("observers", &self.observers.read().len())
            .finish()
    }
}
