//! The injection orchestrator.
//!
//! [`PipelineInjector`] composes the locator, the selector, the observed
//! list and the wrapping initializer, and keeps a record of everything it
//! touched so the whole operation can be undone symmetrically.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error};
use splice_host::acceptor::{AcceptorRef, Initializer, CHILD_INITIALIZER};
use splice_host::host::{ConnectionHost, HostError};
use splice_host::list::ListHandle;
use splice_host::probe::{get, set, try_probe, AccessError, Introspect};
use thiserror::Error;

use crate::locate::find_pending_acceptors;
use crate::observed::{AppendFn, BoxError, ObservedList};
use crate::select::{select_initializer_holder, select_wrapped_holder};
use crate::wrap::{TranslationInstaller, WrappingInitializer};

/// Error raised while injecting into a host.
#[derive(Debug, Error)]
pub enum InjectError {
    /// A required host internal structure is absent.
    #[error("core component '{0}' not found")]
    ComponentNotFound(String),

    /// A field exists but has an unexpected shape. Policy-wise this is the
    /// same condition as [`InjectError::ComponentNotFound`].
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Injection could not complete on an acceptor.
    #[error("injection failed: {0}")]
    InjectionFailed(String),
}

/// Result alias for injection operations.
pub type Result<T> = std::result::Result<T, InjectError>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One acceptor the injector has modified, with the value needed to undo it.
struct InjectionRecord {
    acceptor: AcceptorRef,
    original: Initializer,
}

/// One host field that was replaced with an [`ObservedList`] wrapper.
struct CollectionPatchRecord {
    owner: Arc<dyn Introspect>,
    field: String,
    wrapper: Arc<ObservedList<AcceptorRef>>,
    /// Identity of the handle actually written into the field.
    installed: ListHandle<AcceptorRef>,
}

/// State shared between the injector and the append callback it installs.
struct Shared {
    translator: Arc<dyn TranslationInstaller>,
    injected: Mutex<Vec<InjectionRecord>>,
}

impl Shared {
    /// Rewrites one acceptor's `child_initializer` to a wrapping
    /// initializer. Idempotent: an acceptor already recorded, or already
    /// carrying one of our wrappers, is left alone.
    fn inject_acceptor(&self, acceptor: &AcceptorRef) -> Result<()> {
        // Held across select + swap so concurrent injections of the same
        // acceptor cannot both observe it unwrapped.
        let mut records = lock(&self.injected);
        if records.iter().any(|r| r.acceptor == *acceptor) {
            return Ok(());
        }

        let (stage_name, stage) = select_initializer_holder(acceptor)?;
        let current = try_probe::<Initializer>(stage.as_ref(), CHILD_INITIALIZER).ok_or_else(
            || {
                // Silent failure here would mean connections accepted with no
                // translation and no warning, so this surfaces as a hard error.
                InjectError::InjectionFailed(format!(
                    "core component '{}' not found, please check your plugins; stage: {}",
                    CHILD_INITIALIZER, stage_name
                ))
            },
        )?;
        if WrappingInitializer::is_ours(&current) {
            return Ok(());
        }

        let wrapped = Initializer::new(Arc::new(WrappingInitializer::new(
            current.clone(),
            Arc::clone(&self.translator),
        )));
        set(stage.as_ref(), CHILD_INITIALIZER, wrapped)?;
        debug!("wrapped child initializer on stage '{}'", stage_name);

        records.push(InjectionRecord {
            acceptor: acceptor.clone(),
            original: current,
        });
        Ok(())
    }
}

/// Installs and removes the translation wrapping on a live host.
///
/// One injector instance exists per host attachment; it holds its own
/// injection and collection-patch records, constructed on activation and
/// torn down on deactivation. There is no ambient global state.
///
/// # Concurrency
///
/// [`inject`](Self::inject) and [`uninject`](Self::uninject) mutate shared
/// host fields without a lock of their own. This is an assumption, not a
/// guaranteed property: both are meant for the management window (startup,
/// shutdown, reload), not the per-connection hot path, and a host reloading
/// its acceptors concurrently with `uninject` is a known race.
pub struct PipelineInjector {
    host: Arc<dyn ConnectionHost>,
    shared: Arc<Shared>,
    patched: Mutex<Vec<CollectionPatchRecord>>,
}

impl PipelineInjector {
    /// Creates an injector for `host` that will install translation stages
    /// through `translator`.
    pub fn new(host: Arc<dyn ConnectionHost>, translator: Arc<dyn TranslationInstaller>) -> Self {
        Self {
            host,
            shared: Arc::new(Shared {
                translator,
                injected: Mutex::new(Vec::new()),
            }),
            patched: Mutex::new(Vec::new()),
        }
    }

    /// The protocol version the host itself declares.
    pub fn server_protocol_version(&self) -> std::result::Result<i32, HostError> {
        self.host.protocol_version()
    }

    /// Attaches to the host: wraps its pending-acceptor collection and
    /// rewrites every acceptor present now or appended later.
    ///
    /// On failure the error is logged and re-raised; partial state is kept
    /// for a later [`uninject`](Self::uninject) rather than rolled back, so
    /// the caller decides whether to retry or abort activation.
    pub fn inject(&self) -> Result<()> {
        self.try_inject().map_err(|err| {
            error!(
                "unable to inject translation layer, host may be an unsupported version: {}",
                err
            );
            err
        })
    }

    fn try_inject(&self) -> Result<()> {
        let pending = find_pending_acceptors(self.host.as_ref())?;

        let wrapper = {
            let mut patched = lock(&self.patched);
            match patched.iter().find(|p| p.installed.ptr_eq(&pending.list)) {
                // Retrying after a partial failure: the located collection is
                // the wrapper we already installed, so don't wrap it again.
                Some(existing) => Arc::clone(&existing.wrapper),
                None => {
                    let shared = Arc::clone(&self.shared);
                    let on_append: AppendFn<AcceptorRef> = Box::new(move |acceptor| {
                        shared
                            .inject_acceptor(acceptor)
                            .map_err(|err| Box::new(err) as BoxError)
                    });
                    let wrapper = Arc::new(ObservedList::new(pending.list.clone(), on_append));
                    let installed = ListHandle::new(wrapper.clone());

                    set(pending.owner.as_ref(), &pending.field, installed.clone())?;
                    patched.push(CollectionPatchRecord {
                        owner: Arc::clone(&pending.owner),
                        field: pending.field.clone(),
                        wrapper: Arc::clone(&wrapper),
                        installed,
                    });
                    debug!("observing acceptor collection field '{}'", pending.field);
                    wrapper
                }
            }
        };

        // Acceptors that predate the wrapper, handled under its gate so
        // appends arriving through the wrapper meanwhile cannot interleave.
        wrapper.with_gate(|| {
            for acceptor in pending.list.snapshot() {
                self.shared.inject_acceptor(&acceptor)?;
            }
            Ok(())
        })
    }

    /// Detaches from the host, restoring every recorded field to the exact
    /// original value. Returns how many acceptors were restored.
    ///
    /// Best-effort and exhaustive: a failure on one record is logged with an
    /// operator warning and the loop continues, because partial restoration
    /// is strictly better than none on a host that cannot be restarted.
    /// Calling this twice is safe; the second call touches zero records.
    ///
    /// Channels already connected keep any translation stages previously
    /// installed into their pipelines; only future-connection wrapping is
    /// reversed.
    pub fn uninject(&self) -> usize {
        let records = mem::take(&mut *lock(&self.shared.injected));
        let mut restored = 0;

        for record in records {
            let holder =
                select_wrapped_holder(&record.acceptor).or_else(|| record.acceptor.first_stage());
            let Some((stage_name, stage)) = holder else {
                error!("failed to remove injection handler, a restart is required");
                continue;
            };

            match try_probe::<Initializer>(stage.as_ref(), CHILD_INITIALIZER) {
                Some(current) if WrappingInitializer::is_ours(&current) => {
                    match set(stage.as_ref(), CHILD_INITIALIZER, record.original.clone()) {
                        Ok(()) => restored += 1,
                        Err(err) => error!(
                            "failed to remove injection handler from stage '{}', a restart is required: {}",
                            stage_name, err
                        ),
                    }
                }
                // Something else owns the initializer now; leave it alone.
                _ => {}
            }
        }

        let patches = mem::take(&mut *lock(&self.patched));
        for patch in patches {
            match get::<ListHandle<AcceptorRef>>(patch.owner.as_ref(), &patch.field) {
                Ok(current) if current.ptr_eq(&patch.installed) => {
                    if let Err(err) =
                        set(patch.owner.as_ref(), &patch.field, patch.wrapper.original())
                    {
                        error!(
                            "failed to restore collection field '{}', a restart is required: {}",
                            patch.field, err
                        );
                    }
                }
                // The field no longer holds our wrapper; not ours to touch.
                Ok(_) => {}
                Err(err) => error!(
                    "failed to restore collection field '{}', a restart is required: {}",
                    patch.field, err
                ),
            }
        }

        restored
    }
}
