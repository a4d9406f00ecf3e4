//! Portals: content mounted away from its logical position.
//!
//! A placement anchor stays where the portal sits in the description so
//! siblings keep a stable reference point; the children mount into the
//! resolved target container. Visibility flips are full teardown and
//! rebuild of the content, same as a component re-render.

use std::cell::RefCell;
use std::rc::Rc;

use weft_reactive::Scope;
use weft_scene::node::{PortalTarget, Visibility};
use weft_scene::{HostAdapter, Node};

use crate::error::MountError;
use crate::metrics::inc_metric;
use crate::reconciler::{MountHandle, MountedKind, Reconciler};

impl<H: HostAdapter> Reconciler<H> {
    pub(crate) fn mount_portal(
        &self,
        target: Option<&PortalTarget<H>>,
        children: &[Node<H>],
        visible: Option<&Visibility>,
        parent: &H::Node,
        anchor: Option<&H::Node>,
        parent_scope: &Scope,
    ) -> Result<MountHandle<H>, MountError> {
        let scope = parent_scope.child();
        let anchor_node = self.place_anchor(parent, anchor, &scope);

        let container = match target {
            Some(PortalTarget::Node(node)) => node.clone(),
            Some(PortalTarget::Named(name)) => match self.adapter().resolve_target(name) {
                Some(node) => node,
                None => {
                    scope.close();
                    return Err(MountError::PortalTargetNotFound(name.clone()));
                }
            },
            None => {
                // No target: a dedicated container under the global root,
                // destroyed with the portal.
                let node = self.adapter().create_node("portal");
                self.defer_removal(&scope, &node);
                let root = self.adapter().root();
                self.adapter().insert_before(&root, &node, None);
                node
            }
        };

        let content: Rc<RefCell<Option<Scope>>> = Rc::new(RefCell::new(None));
        {
            let content = content.clone();
            scope.defer(move || {
                if let Some(active) = content.borrow_mut().take() {
                    active.close();
                }
            });
        }

        let mount_content: Rc<dyn Fn() -> Result<(), MountError>> = {
            let reconciler = self.clone();
            let container = container.clone();
            let content = content.clone();
            let description = Node::Fragment(children.to_vec());
            Rc::new(move || {
                if content.borrow().is_some() {
                    return Ok(());
                }
                inc_metric!(PORTAL_MOUNTS);
                let content_scope = Scope::root();
                match reconciler.mount_node(&description, &container, None, &content_scope) {
                    Ok(_handle) => {
                        *content.borrow_mut() = Some(content_scope);
                        Ok(())
                    }
                    Err(error) => {
                        content_scope.close();
                        Err(error)
                    }
                }
            })
        };
        let unmount_content: Rc<dyn Fn()> = {
            let content = content.clone();
            Rc::new(move || {
                if let Some(active) = content.borrow_mut().take() {
                    active.close();
                }
            })
        };

        let initially_visible = match visible {
            None | Some(Visibility::Static(true)) => true,
            Some(Visibility::Static(false)) => false,
            Some(Visibility::Reactive(signal)) => signal.get(),
        };
        if initially_visible {
            if let Err(error) = mount_content() {
                scope.close();
                return Err(error);
            }
        }

        if let Some(Visibility::Reactive(signal)) = visible {
            let subscription = signal.subscribe(move |&visible| {
                if visible {
                    if let Err(error) = mount_content() {
                        log::error!("portal: remount failed: {error}");
                    }
                } else {
                    unmount_content();
                }
            });
            scope.defer(move || subscription.unsubscribe());
        }

        Ok(MountHandle {
            scope,
            kind: MountedKind::Static(vec![anchor_node]),
        })
    }
}
