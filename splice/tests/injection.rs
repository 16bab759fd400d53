//! End-to-end injection scenarios against a synthetic host.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use splice::{PipelineInjector, TranslationInstaller, WrappingInitializer};
use splice_host::acceptor::{Acceptor, AcceptorRef, ChildInitializer, Initializer, CHILD_INITIALIZER};
use splice_host::channel::{Channel, ChannelHandler};
use splice_host::host::{ConnectionHost, HostError};
use splice_host::list::{ListHandle, VecList};
use splice_host::probe::{get, try_probe, Field, FieldMap, Introspect};

struct Named(&'static str);

impl ChannelHandler for Named {
    fn name(&self) -> &str {
        self.0
    }
}

/// The host's own per-connection setup: adds its codec stages.
struct CodecInitializer;

impl ChildInitializer for CodecInitializer {
    fn init_channel(&self, channel: &mut Channel) {
        channel.pipeline_mut().add_back(Named("decoder"));
        channel.pipeline_mut().add_back(Named("encoder"));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Translation collaborator that counts how many channels it touched.
struct CountingInstaller {
    installs: AtomicUsize,
}

impl CountingInstaller {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            installs: AtomicUsize::new(0),
        })
    }
}

impl TranslationInstaller for CountingInstaller {
    fn install(
        &self,
        channel: &mut Channel,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        channel.pipeline_mut().add_front(Named("translation"));
        Ok(())
    }
}

struct TestHost {
    manager: Arc<dyn Introspect>,
}

impl TestHost {
    /// A host whose connection manager carries a scalar field followed by
    /// the pending-acceptor list, seeded with `acceptors`.
    fn new(acceptors: Vec<AcceptorRef>) -> (Arc<Self>, ListHandle<AcceptorRef>) {
        let list: ListHandle<AcceptorRef> =
            ListHandle::new(Arc::new(VecList::from_vec(acceptors)));
        let manager = FieldMap::new()
            .with_field(Field::new("tick_count", 0u64))
            .with_field(Field::new("pending", list.clone()));
        (
            Arc::new(Self {
                manager: Arc::new(manager),
            }),
            list,
        )
    }

    /// What the host would do on a late-bound listener: read the field and
    /// append through whatever value it currently holds.
    fn host_append(&self, acceptor: AcceptorRef) {
        let current = get::<ListHandle<AcceptorRef>>(self.manager.as_ref(), "pending").unwrap();
        current.append(acceptor);
    }

    fn pending_field(&self) -> ListHandle<AcceptorRef> {
        get::<ListHandle<AcceptorRef>>(self.manager.as_ref(), "pending").unwrap()
    }
}

impl ConnectionHost for TestHost {
    fn connection_manager(&self) -> Option<Arc<dyn Introspect>> {
        Some(Arc::clone(&self.manager))
    }

    fn protocol_version(&self) -> Result<i32, HostError> {
        Ok(340)
    }
}

fn new_acceptor() -> (AcceptorRef, Initializer) {
    let init = Initializer::new(Arc::new(CodecInitializer));
    let acceptor = AcceptorRef::new(Acceptor::with_child_initializer("acceptor", init.clone()));
    (acceptor, init)
}

fn current_initializer(acceptor: &AcceptorRef) -> Initializer {
    let stage = acceptor.stage("acceptor").unwrap();
    try_probe::<Initializer>(stage.as_ref(), CHILD_INITIALIZER).unwrap()
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn end_to_end_late_bound_acceptor() {
    init_logger();
    let (host, original_list) = TestHost::new(Vec::new());
    let installer = CountingInstaller::new();
    let injector = PipelineInjector::new(host.clone(), installer.clone());

    injector.inject().unwrap();

    // host brings up a listener after injection
    let (acceptor, original_init) = new_acceptor();
    host.host_append(acceptor.clone());

    let wrapped = current_initializer(&acceptor);
    assert!(WrappingInitializer::is_ours(&wrapped));
    assert!(WrappingInitializer::peel(&wrapped)
        .unwrap()
        .ptr_eq(&original_init));

    // a connection accepted now gets translation before the host codecs
    let mut channel = Channel::new("10.0.0.7:49152".parse().unwrap());
    wrapped.init_channel(&mut channel);
    assert_eq!(
        channel.pipeline().names(),
        vec!["translation", "decoder", "encoder"]
    );
    assert_eq!(installer.installs.load(Ordering::SeqCst), 1);

    // uninjection restores the very same initializer instance
    assert_eq!(injector.uninject(), 1);
    assert!(current_initializer(&acceptor).ptr_eq(&original_init));
    assert!(host.pending_field().ptr_eq(&original_list));
    assert!(original_list.contains(&acceptor));
}

#[test]
fn inject_wraps_pre_existing_acceptors() {
    init_logger();
    let (acceptor, original_init) = new_acceptor();
    let (host, _list) = TestHost::new(vec![acceptor.clone()]);
    let injector = PipelineInjector::new(host, CountingInstaller::new());

    injector.inject().unwrap();

    let wrapped = current_initializer(&acceptor);
    assert!(WrappingInitializer::is_ours(&wrapped));
    assert!(WrappingInitializer::peel(&wrapped)
        .unwrap()
        .ptr_eq(&original_init));
}

#[test]
fn inject_uninject_is_symmetric() {
    init_logger();
    let (a1, i1) = new_acceptor();
    let (a2, i2) = new_acceptor();
    let (host, original_list) = TestHost::new(vec![a1.clone(), a2.clone()]);
    let injector = PipelineInjector::new(host.clone(), CountingInstaller::new());

    injector.inject().unwrap();
    assert_eq!(injector.uninject(), 2);

    assert!(current_initializer(&a1).ptr_eq(&i1));
    assert!(current_initializer(&a2).ptr_eq(&i2));
    assert!(host.pending_field().ptr_eq(&original_list));
}

#[test]
fn uninject_twice_touches_nothing() {
    init_logger();
    let (acceptor, original_init) = new_acceptor();
    let (host, original_list) = TestHost::new(vec![acceptor.clone()]);
    let injector = PipelineInjector::new(host.clone(), CountingInstaller::new());

    injector.inject().unwrap();
    assert_eq!(injector.uninject(), 1);
    assert_eq!(injector.uninject(), 0);

    assert!(current_initializer(&acceptor).ptr_eq(&original_init));
    assert!(host.pending_field().ptr_eq(&original_list));
}

#[test]
fn at_most_once_wrapping_under_concurrent_appends() {
    init_logger();
    const THREADS: usize = 4;
    const PER_THREAD: usize = 25;

    let preexisting: Vec<(AcceptorRef, Initializer)> = (0..3).map(|_| new_acceptor()).collect();
    let (host, list) = TestHost::new(preexisting.iter().map(|(a, _)| a.clone()).collect());
    let injector = PipelineInjector::new(host.clone(), CountingInstaller::new());

    injector.inject().unwrap();

    let appended: Vec<Vec<(AcceptorRef, Initializer)>> = (0..THREADS)
        .map(|_| (0..PER_THREAD).map(|_| new_acceptor()).collect())
        .collect();
    let handles: Vec<_> = appended
        .iter()
        .map(|batch| {
            let host = host.clone();
            let batch: Vec<AcceptorRef> = batch.iter().map(|(a, _)| a.clone()).collect();
            std::thread::spawn(move || {
                for acceptor in batch {
                    host.host_append(acceptor);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(list.len(), 3 + THREADS * PER_THREAD);

    // every acceptor carries exactly one layer of wrapping
    let all = preexisting.into_iter().chain(appended.into_iter().flatten());
    for (acceptor, original_init) in all {
        let current = current_initializer(&acceptor);
        assert!(WrappingInitializer::is_ours(&current));
        let inner = WrappingInitializer::peel(&current).unwrap();
        assert!(!WrappingInitializer::is_ours(&inner));
        assert!(inner.ptr_eq(&original_init));
    }
}

#[test]
fn appending_same_acceptor_twice_wraps_once() {
    init_logger();
    let (host, _list) = TestHost::new(Vec::new());
    let injector = PipelineInjector::new(host.clone(), CountingInstaller::new());
    injector.inject().unwrap();

    let (acceptor, original_init) = new_acceptor();
    host.host_append(acceptor.clone());
    host.host_append(acceptor.clone());

    let current = current_initializer(&acceptor);
    assert!(WrappingInitializer::peel(&current)
        .unwrap()
        .ptr_eq(&original_init));

    assert_eq!(injector.uninject(), 1);
}

#[test]
fn injecting_twice_does_not_duplicate_wrapping() {
    init_logger();
    let (acceptor, original_init) = new_acceptor();
    let (host, original_list) = TestHost::new(vec![acceptor.clone()]);
    let injector = PipelineInjector::new(host.clone(), CountingInstaller::new());

    injector.inject().unwrap();
    let installed = host.pending_field();
    injector.inject().unwrap();

    // the collection field still holds the first wrapper
    assert!(host.pending_field().ptr_eq(&installed));
    // and the initializer carries a single layer of wrapping
    let current = current_initializer(&acceptor);
    assert!(WrappingInitializer::peel(&current)
        .unwrap()
        .ptr_eq(&original_init));

    assert_eq!(injector.uninject(), 1);
    assert!(host.pending_field().ptr_eq(&original_list));
}

#[test]
fn acceptor_without_initializer_field_fails_injection() {
    init_logger();
    // single stage with no child_initializer; selection falls back to it and
    // the read is a hard error
    let stage: Arc<dyn Introspect> =
        Arc::new(FieldMap::new().with_field(Field::new("unrelated", 0u8)));
    let acceptor = AcceptorRef::new(Acceptor::new(vec![("first".to_string(), stage)]));
    let (host, _list) = TestHost::new(vec![acceptor]);
    let injector = PipelineInjector::new(host, CountingInstaller::new());

    let err = injector.inject().unwrap_err();
    assert!(err.to_string().contains("child_initializer"));
}

#[test]
fn partial_injection_is_reversible() {
    init_logger();
    // a good acceptor followed by a broken one: inject fails, but what was
    // already wrapped can still be uninjected
    let (good, good_init) = new_acceptor();
    let stage: Arc<dyn Introspect> =
        Arc::new(FieldMap::new().with_field(Field::new("unrelated", 0u8)));
    let broken = AcceptorRef::new(Acceptor::new(vec![("first".to_string(), stage)]));
    let (host, original_list) = TestHost::new(vec![good.clone(), broken]);
    let injector = PipelineInjector::new(host.clone(), CountingInstaller::new());

    assert!(injector.inject().is_err());
    assert!(WrappingInitializer::is_ours(&current_initializer(&good)));

    assert_eq!(injector.uninject(), 1);
    assert!(current_initializer(&good).ptr_eq(&good_init));
    assert!(host.pending_field().ptr_eq(&original_list));
}

#[test]
fn uninject_leaves_foreign_initializer_alone() {
    init_logger();
    let (acceptor, original_init) = new_acceptor();
    let (host, _list) = TestHost::new(vec![acceptor.clone()]);
    let injector = PipelineInjector::new(host, CountingInstaller::new());
    injector.inject().unwrap();

    // a third party replaces the initializer after we injected
    let foreign = Initializer::new(Arc::new(CodecInitializer));
    let stage = acceptor.stage("acceptor").unwrap();
    splice_host::probe::set(stage.as_ref(), CHILD_INITIALIZER, foreign.clone()).unwrap();

    assert_eq!(injector.uninject(), 0);
    let current = current_initializer(&acceptor);
    assert!(current.ptr_eq(&foreign));
    assert!(!current.ptr_eq(&original_init));
}

#[test]
fn uninject_leaves_foreign_collection_alone() {
    init_logger();
    let (host, _original_list) = TestHost::new(Vec::new());
    let injector = PipelineInjector::new(host.clone(), CountingInstaller::new());
    injector.inject().unwrap();

    // a third party swaps the collection field after we wrapped it
    let foreign: ListHandle<AcceptorRef> = ListHandle::new(Arc::new(VecList::new()));
    splice_host::probe::set(host.manager.as_ref(), "pending", foreign.clone()).unwrap();

    injector.uninject();
    assert!(host.pending_field().ptr_eq(&foreign));
}

#[test]
fn injector_reports_host_protocol_version() {
    let (host, _list) = TestHost::new(Vec::new());
    let injector = PipelineInjector::new(host, CountingInstaller::new());
    assert_eq!(injector.server_protocol_version().unwrap(), 340);
}
