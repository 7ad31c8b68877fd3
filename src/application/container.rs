//! Service container - typed bindings resolved by type or by alias

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::application::errors::{BotError, ContainerError};

type Shared = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Container) -> Result<Shared, BotError> + Send + Sync>;

enum Binding {
    Instance(Shared),
    Singleton(Factory),
}

/// Holds the application's shared services.
///
/// Singletons are built lazily on the first `make` and cached afterwards.
/// Factories receive the container so they can resolve their own dependencies.
/// Concurrent first calls for one type wait for a single factory run; a factory
/// that resolves its own type deadlocks.
#[derive(Default)]
pub struct Container {
    bindings: Mutex<HashMap<TypeId, Binding>>,
    aliases: Mutex<HashMap<String, TypeId>>,
    building: Mutex<HashMap<TypeId, Arc<Mutex<()>>>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a lazily constructed singleton
    pub fn singleton<T, F>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> Result<T, BotError> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |c: &Container| factory(c).map(|v| Arc::new(v) as Shared));
        self.lock_bindings()
            .insert(TypeId::of::<T>(), Binding::Singleton(factory));
        tracing::debug!("Bound singleton {}", type_name::<T>());
    }

    /// Bind an already constructed value
    pub fn instance<T: Send + Sync + 'static>(&self, value: Arc<T>) {
        self.lock_bindings()
            .insert(TypeId::of::<T>(), Binding::Instance(value));
        tracing::debug!("Bound instance {}", type_name::<T>());
    }

    /// Make `T` resolvable under `name`
    pub fn alias<T: Send + Sync + 'static>(&self, name: impl Into<String>) {
        self.lock_aliases().insert(name.into(), TypeId::of::<T>());
    }

    pub fn has<T: Send + Sync + 'static>(&self) -> bool {
        self.lock_bindings().contains_key(&TypeId::of::<T>())
    }

    pub fn make<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, BotError> {
        let id = TypeId::of::<T>();
        let factory = {
            let bindings = self.lock_bindings();
            match bindings.get(&id) {
                Some(Binding::Instance(value)) => return downcast::<T>(Arc::clone(value)),
                Some(Binding::Singleton(factory)) => Arc::clone(factory),
                None => return Err(ContainerError::NotBound(type_name::<T>()).into()),
            }
        };

        // The bindings lock is released while building so the factory can resolve
        // other bindings; the per-type gate keeps the factory to a single run.
        let gate = self.gate(id);
        let _building = gate.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(Binding::Instance(existing)) = self.lock_bindings().get(&id) {
            return downcast::<T>(Arc::clone(existing));
        }

        let value = factory(self).map_err(|e| ContainerError::Construction {
            type_name: type_name::<T>(),
            reason: e.to_string(),
        })?;

        self.lock_bindings()
            .insert(id, Binding::Instance(Arc::clone(&value)));
        downcast::<T>(value)
    }

    pub fn make_alias<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, BotError> {
        let id = self
            .lock_aliases()
            .get(name)
            .copied()
            .ok_or_else(|| ContainerError::AliasNotFound(name.to_string()))?;

        if id != TypeId::of::<T>() {
            return Err(ContainerError::AliasMismatch {
                alias: name.to_string(),
                expected: type_name::<T>(),
            }
            .into());
        }

        self.make::<T>()
    }

    fn lock_bindings(&self) -> MutexGuard<'_, HashMap<TypeId, Binding>> {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn gate(&self, id: TypeId) -> Arc<Mutex<()>> {
        let mut building = self.building.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(building.entry(id).or_default())
    }

    fn lock_aliases(&self) -> MutexGuard<'_, HashMap<String, TypeId>> {
        self.aliases.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn downcast<T: Send + Sync + 'static>(value: Shared) -> Result<Arc<T>, BotError> {
    value
        .downcast::<T>()
        .map_err(|_| ContainerError::NotBound(type_name::<T>()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Counter(usize);

    #[derive(Debug)]
    struct Greeter {
        greeting: String,
    }

    #[test]
    fn singleton_is_built_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let container = Container::new();
        let seen = Arc::clone(&builds);
        container.singleton(move |_| {
            Ok(Counter(seen.fetch_add(1, Ordering::SeqCst)))
        });

        let a = container.make::<Counter>().unwrap();
        let b = container.make::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(a.0, 0);
    }

    #[test]
    fn concurrent_first_make_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let container = Container::new();
        let seen = Arc::clone(&builds);
        container.singleton(move |_| {
            std::thread::sleep(std::time::Duration::from_millis(50));
            Ok(Counter(seen.fetch_add(1, Ordering::SeqCst)))
        });

        let made: Vec<Arc<Counter>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| container.make::<Counter>().unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(made.iter().all(|c| Arc::ptr_eq(c, &made[0])));
    }

    #[test]
    fn factory_can_resolve_dependencies() {
        let container = Container::new();
        container.instance(Arc::new(String::from("hello")));
        container.singleton(|c| {
            let word = c.make::<String>()?;
            Ok(Greeter { greeting: format!("{} world", word) })
        });

        assert_eq!(container.make::<Greeter>().unwrap().greeting, "hello world");
    }

    #[test]
    fn alias_resolves_same_instance() {
        let container = Container::new();
        container.singleton(|_| Ok(Counter(7)));
        container.alias::<Counter>("counter");

        let by_type = container.make::<Counter>().unwrap();
        let by_alias = container.make_alias::<Counter>("counter").unwrap();
        assert!(Arc::ptr_eq(&by_type, &by_alias));
    }

    #[test]
    fn resolution_errors() {
        let container = Container::new();
        assert!(matches!(
            container.make::<Counter>(),
            Err(BotError::Container(ContainerError::NotBound(_)))
        ));
        assert!(matches!(
            container.make_alias::<Counter>("nope"),
            Err(BotError::Container(ContainerError::AliasNotFound(_)))
        ));

        container.singleton(|_| Ok(Counter(1)));
        container.alias::<Counter>("counter");
        assert!(matches!(
            container.make_alias::<Greeter>("counter"),
            Err(BotError::Container(ContainerError::AliasMismatch { .. }))
        ));
    }

    #[test]
    fn failing_factory_is_reported() {
        let container = Container::new();
        container.singleton::<Counter, _>(|_| Err(BotError::Internal("boom".to_string())));

        let err = container.make::<Counter>().unwrap_err();
        assert!(err.to_string().contains("boom"));
        // Still unresolved, so a later call retries the factory.
        assert!(container.make::<Counter>().is_err());
    }
}
