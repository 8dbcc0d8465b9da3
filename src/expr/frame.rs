/// Chained variable scope used during evaluation.
///
/// Frames form a parent-linked chain; lookup walks outward. Blocks and
/// lambda invocations push child frames; lambdas keep the frame alive at
/// creation to implement closures.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

#[derive(Clone)]
pub struct Frame(Rc<FrameData>);

struct FrameData {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Frame>,
}

impl Frame {
    pub fn new() -> Frame {
        Frame(Rc::new(FrameData {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    /// The frame for one `evaluate` call: fresh, with `$$` bound to the
    /// evaluation root.
    pub fn new_evaluation(input: &Value) -> Frame {
        let frame = Frame::new();
        frame.bind("$", input.clone());
        frame
    }

    pub fn child(&self) -> Frame {
        Frame(Rc::new(FrameData {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    /// Bind in this frame, shadowing any outer binding of the same name.
    pub fn bind(&self, name: &str, value: Value) {
        self.0
            .bindings
            .borrow_mut()
            .insert(name.to_string(), value);
    }

    /// Walk the chain outward.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.0.bindings.borrow().get(name) {
            return Some(v.clone());
        }
        self.0.parent.as_ref().and_then(|p| p.lookup(name))
    }
}

impl Default for Frame {
    fn default() -> Frame {
        Frame::new()
    }
}
