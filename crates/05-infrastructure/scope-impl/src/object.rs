//! 场景对象与对象世界

use crate::state::StateScope;
use crate::template::ObjectTemplate;
use parking_lot::{Mutex, RwLock};
use state_common::ComponentHandle;
use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

type DestroyListener = Box<dyn FnOnce() + Send>;

/// 场景对象
///
/// 持有按挂载顺序排列的组件，可以承载一个独占状态作用域。
/// 销毁是同步的：承载的状态作用域立即拆除，然后依次通知销毁监听者。
pub struct SceneObject {
    id: Uuid,
    name: RwLock<String>,
    template: Option<Arc<ObjectTemplate>>,
    components: Vec<Arc<ComponentHandle>>,
    persistent: AtomicBool,
    destroyed: AtomicBool,
    hosted_state: RwLock<Option<Arc<StateScope>>>,
    destroy_listeners: Mutex<Vec<DestroyListener>>,
}

impl SceneObject {
    /// 创建对象
    pub fn new(name: impl Into<String>, components: Vec<ComponentHandle>) -> Self {
        Self::build(name.into(), None, components)
    }

    pub(crate) fn from_template(template: &Arc<ObjectTemplate>) -> Self {
        Self::build(
            template.name().to_string(),
            Some(template.clone()),
            template.create_components(),
        )
    }

    fn build(
        name: String,
        template: Option<Arc<ObjectTemplate>>,
        components: Vec<ComponentHandle>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: RwLock::new(name),
            template,
            components: components.into_iter().map(Arc::new).collect(),
            persistent: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            hosted_state: RwLock::new(None),
            destroy_listeners: Mutex::new(Vec::new()),
        }
    }

    /// 对象ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 显示名称
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// 设置显示名称
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write() = name.into();
    }

    /// 创建该对象的模板
    pub fn template(&self) -> Option<&Arc<ObjectTemplate>> {
        self.template.as_ref()
    }

    /// 挂载的组件，按挂载顺序
    pub fn components(&self) -> &[Arc<ComponentHandle>] {
        &self.components
    }

    /// 查找第一个提供指定能力的组件
    pub fn find_component(&self, capability: TypeId) -> Option<Arc<ComponentHandle>> {
        self.components
            .iter()
            .find(|component| component.has_capability(capability))
            .cloned()
    }

    /// 收集所有组件提供的指定能力，按挂载顺序
    pub fn capabilities<T: ?Sized + Send + Sync + 'static>(&self) -> Vec<Arc<T>> {
        self.components
            .iter()
            .filter_map(|component| component.capability::<T>())
            .collect()
    }

    /// 是否在状态切换和场景卸载中保留
    pub fn is_persistent(&self) -> bool {
        self.persistent.load(Ordering::SeqCst)
    }

    /// 标记对象在状态切换和场景卸载中保留
    pub fn set_persistent(&self, persistent: bool) {
        self.persistent.store(persistent, Ordering::SeqCst);
    }

    /// 是否已销毁
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// 承载的状态作用域
    pub fn state_scope(&self) -> Option<Arc<StateScope>> {
        self.hosted_state.read().clone()
    }

    pub(crate) fn host_state(&self, scope: Arc<StateScope>) {
        *self.hosted_state.write() = Some(scope);
    }

    /// 注册销毁监听者
    pub fn on_destroy<F>(&self, listener: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_destroyed() {
            listener();
            return;
        }
        self.destroy_listeners.lock().push(Box::new(listener));
    }

    /// 销毁对象，重复调用无效
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("销毁对象: {}", self.name());

        let hosted = self.hosted_state.write().take();
        if let Some(scope) = hosted {
            scope.teardown();
        }

        let listeners = std::mem::take(&mut *self.destroy_listeners.lock());
        for listener in listeners {
            listener();
        }
    }
}

impl fmt::Debug for SceneObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneObject")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("components", &self.components.len())
            .field("persistent", &self.is_persistent())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// 对象世界
///
/// 记录所有存活对象；卸载场景时销毁所有未标记保留的对象。
#[derive(Default)]
pub struct World {
    objects: RwLock<Vec<Arc<SceneObject>>>,
}

impl World {
    /// 创建空世界
    pub fn new() -> Self {
        Self::default()
    }

    /// 从模板实例化对象
    pub fn spawn(&self, template: &Arc<ObjectTemplate>) -> Arc<SceneObject> {
        self.track(SceneObject::from_template(template))
    }

    /// 创建不带组件的对象
    pub fn spawn_empty(&self, name: impl Into<String>) -> Arc<SceneObject> {
        self.track(SceneObject::new(name, Vec::new()))
    }

    fn track(&self, object: SceneObject) -> Arc<SceneObject> {
        let object = Arc::new(object);
        let mut objects = self.objects.write();
        objects.retain(|existing| !existing.is_destroyed());
        objects.push(object.clone());
        object
    }

    /// 所有存活对象，按创建顺序
    pub fn live_objects(&self) -> Vec<Arc<SceneObject>> {
        let mut objects = self.objects.write();
        objects.retain(|existing| !existing.is_destroyed());
        objects.clone()
    }

    /// 存活对象数量
    pub fn live_count(&self) -> usize {
        self.live_objects().len()
    }

    /// 按显示名称查找存活对象
    pub fn find(&self, name: &str) -> Option<Arc<SceneObject>> {
        self.live_objects()
            .into_iter()
            .find(|object| object.name() == name)
    }

    /// 卸载场景，返回被销毁的对象数量
    pub fn unload_scene(&self) -> usize {
        let doomed: Vec<_> = self
            .live_objects()
            .into_iter()
            .filter(|object| !object.is_persistent())
            .collect();
        for object in &doomed {
            object.destroy();
        }
        debug!("场景卸载，销毁 {} 个对象", doomed.len());
        doomed.len()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("objects", &self.objects.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn destroy_runs_listeners_once() {
        let object = SceneObject::new("sentinel", Vec::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        object.on_destroy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        object.destroy();
        object.destroy();
        assert!(object.is_destroyed());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unload_scene_keeps_persistent_objects() {
        let world = World::new();
        let keeper = world.spawn_empty("keeper");
        keeper.set_persistent(true);
        let transient = world.spawn_empty("transient");

        assert_eq!(world.unload_scene(), 1);
        assert!(transient.is_destroyed());
        assert!(!keeper.is_destroyed());
        assert_eq!(world.live_count(), 1);
        assert!(world.find("keeper").is_some());
    }
}
