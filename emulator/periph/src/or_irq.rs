// Licensed under the Apache-2.0 license

use crate::PeriphError;
use bit_vec::BitVec;
use emulator_bus::{Irq, IrqIn};
use std::cell::RefCell;
use std::rc::Rc;

pub const MAX_OR_LINES: usize = 48;

struct OrIrqInner {
    levels: RefCell<BitVec>,
    output: Irq,
}

/// OR gate with up to 48 inputs. The output is recomputed from all input
/// levels on every input change.
#[derive(Clone)]
pub struct OrIrq {
    inner: Rc<OrIrqInner>,
}

impl OrIrq {
    pub fn new(num_lines: usize) -> Result<Self, PeriphError> {
        if !(1..=MAX_OR_LINES).contains(&num_lines) {
            return Err(PeriphError::InvalidLineCount {
                device: "or-irq",
                lines: num_lines,
                max: MAX_OR_LINES,
            });
        }
        Ok(Self {
            inner: Rc::new(OrIrqInner {
                levels: RefCell::new(BitVec::from_elem(num_lines, false)),
                output: Irq::new(),
            }),
        })
    }

    pub fn num_lines(&self) -> usize {
        self.inner.levels.borrow().len()
    }

    pub fn input(&self, line: usize) -> IrqIn {
        assert!(line < self.num_lines(), "or-irq input {line} out of range");
        let gate = self.clone();
        IrqIn::new(move |level| gate.set_input(line, level))
    }

    pub fn set_input(&self, line: usize, level: bool) {
        let any = {
            let mut levels = self.inner.levels.borrow_mut();
            levels.set(line, level);
            levels.any()
        };
        self.inner.output.set_level(any);
    }

    pub fn output(&self) -> &Irq {
        &self.inner.output
    }
}
