//! Component instances: scope + render phase + full-rebuild re-rendering.

use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use weft_reactive::{Ctx, PhaseArena, Scope};
use weft_scene::{HostAdapter, Thunk};

use crate::error::MountError;
use crate::metrics::inc_metric;
use crate::reconciler::{MountHandle, MountedKind, Reconciler};
use crate::resource::panic_message;

/// One live component. Holds everything a re-render needs: the thunk,
/// the slot arena (persists across renders for positional identity), the
/// mount position, and the scope of the current render (torn down and
/// replaced per render).
struct ComponentInstance<H: HostAdapter> {
    reconciler: Reconciler<H>,
    thunk: Thunk<H>,
    parent: H::Node,
    anchor: H::Node,
    arena: Rc<RefCell<PhaseArena>>,
    current: Rc<RefCell<Option<MountHandle<H>>>>,
    render_scope: Rc<RefCell<Option<Scope>>>,
    owner: Scope,
    rendering: Cell<bool>,
}

impl<H: HostAdapter> ComponentInstance<H> {
    /// Execute the thunk and mount its output at the instance position.
    ///
    /// On re-render the previous render scope closes first (listeners
    /// unsubscribed, tasks cancelled, host nodes detached), then a fresh
    /// render phase runs over the existing arena so `slot` calls at the
    /// same position return the same signals as before.
    fn render(instance: &Rc<Self>) -> Result<(), MountError> {
        if instance.owner.is_closed() {
            return Ok(());
        }
        if instance.rendering.replace(true) {
            // A signal written during this instance's own render; the
            // value is already part of the render reading it.
            log::warn!("component: re-render triggered while rendering, skipped");
            return Ok(());
        }
        // The flag must clear on unwind as well, or one panicking render
        // would leave the instance skipping every future trigger.
        let _rendering = ClearOnDrop(&instance.rendering);
        Self::render_inner(instance)
    }

    fn render_inner(instance: &Rc<Self>) -> Result<(), MountError> {
        inc_metric!(COMPONENT_RENDERS);
        if let Some(previous) = instance.render_scope.borrow_mut().take() {
            previous.close();
        }
        instance.current.borrow_mut().take();

        let scope = Scope::root();
        let mut ctx = Ctx::new(instance.arena.clone(), scope.clone());
        let mounted = match catch_unwind(AssertUnwindSafe(|| (instance.thunk)(&mut ctx))) {
            Ok(description) => match instance.reconciler.mount_node(
                &description,
                &instance.parent,
                Some(&instance.anchor),
                &scope,
            ) {
                Ok(handle) => Some(handle),
                Err(error) => {
                    scope.close();
                    return Err(error);
                }
            },
            Err(payload) => {
                // A panicking thunk renders nothing this round. The reads
                // it recorded before panicking still subscribe below, so
                // a later change retries the render.
                log::error!(
                    "component: render panicked: {}",
                    panic_message(payload.as_ref())
                );
                None
            }
        };
        *instance.current.borrow_mut() = mounted;

        let trigger: Rc<dyn Fn()> = {
            let instance = instance.clone();
            Rc::new(move || {
                if instance.owner.is_closed() {
                    return;
                }
                if let Err(error) = Self::render(&instance) {
                    log::error!("component: re-render failed: {error}");
                }
            })
        };
        for accessed in ctx.finish() {
            let unsubscriber = (accessed.subscribe)(trigger.clone());
            scope.defer(move || unsubscriber.unsubscribe());
        }
        *instance.render_scope.borrow_mut() = Some(scope);
        Ok(())
    }
}

struct ClearOnDrop<'a>(&'a Cell<bool>);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<H: HostAdapter> Reconciler<H> {
    pub(crate) fn mount_component(
        &self,
        thunk: Thunk<H>,
        parent: &H::Node,
        anchor: Option<&H::Node>,
        parent_scope: &Scope,
    ) -> Result<MountHandle<H>, MountError> {
        let scope = parent_scope.child();
        let anchor_node = self.place_anchor(parent, anchor, &scope);

        let instance = Rc::new(ComponentInstance {
            reconciler: self.clone(),
            thunk,
            parent: parent.clone(),
            anchor: anchor_node.clone(),
            arena: Rc::new(RefCell::new(PhaseArena::new())),
            current: Rc::new(RefCell::new(None)),
            render_scope: Rc::new(RefCell::new(None)),
            owner: scope.clone(),
            rendering: Cell::new(false),
        });

        // Unmount tears down the latest render, whichever it is.
        {
            let render_scope = instance.render_scope.clone();
            let current = instance.current.clone();
            scope.defer(move || {
                current.borrow_mut().take();
                if let Some(active) = render_scope.borrow_mut().take() {
                    active.close();
                }
            });
        }

        if let Err(error) = ComponentInstance::render(&instance) {
            scope.close();
            return Err(error);
        }

        Ok(MountHandle {
            scope,
            kind: MountedKind::Slot {
                anchor: anchor_node,
                current: instance.current.clone(),
            },
        })
    }
}
