//! Swap bindings: content follows a signal of descriptions.
//!
//! Each value of the signal gets its own generation scope; a change
//! closes the old generation and mounts the new description before the
//! swap anchor. `on_swap` fires after the new value arrives but before
//! the old subtree is torn down.

use std::cell::RefCell;
use std::rc::Rc;

use weft_reactive::{Scope, Signal};
use weft_scene::{HostAdapter, Node};

use crate::metrics::inc_metric;
use crate::reconciler::{MountHandle, MountedKind, Reconciler};

impl<H: HostAdapter> Reconciler<H> {
    pub(crate) fn mount_swap(
        &self,
        signal: &Signal<Node<H>>,
        on_swap: Option<Rc<dyn Fn()>>,
        parent: &H::Node,
        anchor: Option<&H::Node>,
        parent_scope: &Scope,
    ) -> MountHandle<H> {
        let scope = parent_scope.child();
        let anchor_node = self.place_anchor(parent, anchor, &scope);
        let current: Rc<RefCell<Option<(Scope, MountHandle<H>)>>> = Rc::new(RefCell::new(None));

        {
            let current = current.clone();
            scope.defer(move || {
                if let Some((generation, _)) = current.borrow_mut().take() {
                    generation.close();
                }
            });
        }

        let mount_current: Rc<dyn Fn(&Node<H>)> = {
            let reconciler = self.clone();
            let parent = parent.clone();
            let anchor_node = anchor_node.clone();
            let current = current.clone();
            Rc::new(move |description: &Node<H>| {
                let generation = Scope::root();
                match reconciler.mount_node(description, &parent, Some(&anchor_node), &generation) {
                    Ok(handle) => {
                        *current.borrow_mut() = Some((generation, handle));
                    }
                    Err(error) => {
                        log::error!("swap: mounting {} failed: {error}", description.kind());
                        generation.close();
                    }
                }
            })
        };

        mount_current(&signal.get());

        {
            let mount_current = mount_current.clone();
            let current = current.clone();
            let subscription = signal.subscribe(move |description| {
                inc_metric!(SWAP_REMOUNTS);
                if let Some(callback) = &on_swap {
                    callback();
                }
                if let Some((generation, _)) = current.borrow_mut().take() {
                    generation.close();
                }
                mount_current(description);
            });
            scope.defer(move || subscription.unsubscribe());
        }

        MountHandle {
            scope,
            kind: MountedKind::Swap {
                anchor: anchor_node,
                current,
            },
        }
    }
}
