use crate::{Visit, VisitArgs, Visitor, visit, visit_array};
use less_tree::{Element, LessError, Node, NodeInfo, Selector};

/// Marks every reachable node, selector and element as visible (or invisible).
///
/// Nodes that block visibility, such as content of referenced imports, are left
/// untouched together with everything below them.
#[derive(Clone, Copy, Debug)]
pub struct SetTreeVisibility {
    visible: bool,
}

impl SetTreeVisibility {
    pub const fn new(visible: bool) -> Self {
        Self { visible }
    }

    pub fn run(&mut self, node: &mut Node) -> Result<(), LessError> {
        visit(self, node)?;
        Ok(())
    }

    pub fn run_all(&mut self, nodes: &mut Vec<Node>) -> Result<(), LessError> {
        visit_array(self, nodes)
    }

    /// Returns whether the walk continues below the owner of `info`.
    fn mark(&self, info: &mut NodeInfo) -> bool {
        if info.blocks_visibility() {
            return false;
        }
        if self.visible {
            info.ensure_visibility();
        } else {
            info.ensure_invisibility();
        }
        true
    }
}

impl Visitor for SetTreeVisibility {
    fn visit_node(&mut self, node: &mut Node, args: &mut VisitArgs) -> Result<Visit, LessError> {
        args.visit_deeper = self.mark(node.info_mut());
        Ok(Visit::Keep)
    }

    fn visit_selector(&mut self, selector: &mut Selector, args: &mut VisitArgs) {
        args.visit_deeper = self.mark(&mut selector.info);
    }

    fn visit_element(&mut self, element: &mut Element, args: &mut VisitArgs) {
        args.visit_deeper = self.mark(&mut element.info);
    }
}
