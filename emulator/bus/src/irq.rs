/*++

Licensed under the Apache-2.0 license.

File Name:

    irq.rs

Abstract:

    File contains the signal lines used to wire interrupts and configuration
    strobes between devices.

--*/

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Input side of a signal: whatever should happen when the driving line
/// changes level.
///
/// Handlers run synchronously inside the `Irq::set_level` call that drives
/// them. A handler must not borrow the device that owns the driving `Irq`;
/// state that can be reached re-entrantly belongs in a `Cell`.
#[derive(Clone)]
pub struct IrqIn {
    handler: Rc<dyn Fn(bool)>,
}

impl IrqIn {
    pub fn new(handler: impl Fn(bool) + 'static) -> Self {
        Self {
            handler: Rc::new(handler),
        }
    }

    pub fn set_level(&self, level: bool) {
        (self.handler)(level)
    }
}

impl fmt::Debug for IrqIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IrqIn")
    }
}

#[derive(Default)]
struct IrqInner {
    level: Cell<bool>,
    sink: RefCell<Option<IrqIn>>,
}

/// Output side of a signal.
///
/// Clones share the same line, so a device can keep one copy while the
/// composition code connects another. An unconnected line just records its
/// level.
#[derive(Clone, Default)]
pub struct Irq {
    inner: Rc<IrqInner>,
}

impl Irq {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect the line to `sink`. A line drives at most one input; fan-out
    /// goes through a splitter.
    pub fn connect(&self, sink: IrqIn) {
        let mut slot = self.inner.sink.borrow_mut();
        if slot.is_some() {
            panic!("irq line connected twice");
        }
        *slot = Some(sink);
    }

    pub fn is_connected(&self) -> bool {
        self.inner.sink.borrow().is_some()
    }

    /// Drive the line. The connected input is always called, even if the
    /// level did not change.
    pub fn set_level(&self, level: bool) {
        self.inner.level.set(level);
        // Release the borrow before propagating; the sink may be re-entered.
        let sink = self.inner.sink.borrow().clone();
        if let Some(sink) = sink {
            sink.set_level(level);
        }
    }

    pub fn raise(&self) {
        self.set_level(true)
    }

    pub fn lower(&self) {
        self.set_level(false)
    }

    pub fn level(&self) -> bool {
        self.inner.level.get()
    }
}

impl fmt::Debug for Irq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Irq")
            .field("level", &self.level())
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// A bank of signal sinks, such as the interrupt inputs of a CPU.
///
/// Each line remembers its level and counts rising edges.
#[derive(Clone)]
pub struct IrqLines {
    levels: Rc<[Cell<bool>]>,
    rising: Rc<[Cell<u32>]>,
}

impl IrqLines {
    pub fn new(num_lines: usize) -> Self {
        Self {
            levels: (0..num_lines).map(|_| Cell::new(false)).collect(),
            rising: (0..num_lines).map(|_| Cell::new(0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn input(&self, line: usize) -> IrqIn {
        assert!(line < self.len(), "irq line {line} out of range");
        let lines = self.clone();
        IrqIn::new(move |level| lines.set_level(line, level))
    }

    pub fn set_level(&self, line: usize, level: bool) {
        if level && !self.levels[line].get() {
            self.rising[line].set(self.rising[line].get() + 1);
        }
        self.levels[line].set(level);
    }

    pub fn level(&self, line: usize) -> bool {
        self.levels[line].get()
    }

    /// Number of low-to-high transitions seen on `line`.
    pub fn rising_edges(&self, line: usize) -> u32 {
        self.rising[line].get()
    }

    /// Lines currently held high.
    pub fn asserted(&self) -> Vec<usize> {
        (0..self.len()).filter(|&n| self.level(n)).collect()
    }
}

impl fmt::Debug for IrqLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IrqLines")
            .field("asserted", &self.asserted())
            .finish()
    }
}
