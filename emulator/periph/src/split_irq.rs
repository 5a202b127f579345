/*++

Licensed under the Apache-2.0 license.

File Name:

    split_irq.rs

Abstract:

    File contains the IRQ splitter: one input mirrored onto up to 16 outputs.

--*/

use crate::PeriphError;
use emulator_bus::{Irq, IrqIn};
use std::rc::Rc;

pub const MAX_SPLIT_LINES: usize = 16;

#[derive(Clone)]
pub struct SplitIrq {
    outputs: Rc<[Irq]>,
}

impl SplitIrq {
    pub fn new(num_lines: usize) -> Result<Self, PeriphError> {
        if !(1..=MAX_SPLIT_LINES).contains(&num_lines) {
            return Err(PeriphError::InvalidLineCount {
                device: "split-irq",
                lines: num_lines,
                max: MAX_SPLIT_LINES,
            });
        }
        Ok(Self {
            outputs: (0..num_lines).map(|_| Irq::new()).collect(),
        })
    }

    pub fn num_lines(&self) -> usize {
        self.outputs.len()
    }

    pub fn input(&self) -> IrqIn {
        let outputs = self.outputs.clone();
        IrqIn::new(move |level| {
            for output in outputs.iter() {
                output.set_level(level);
            }
        })
    }

    pub fn set_input(&self, level: bool) {
        self.input().set_level(level)
    }

    pub fn output(&self, line: usize) -> &Irq {
        &self.outputs[line]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emulator_bus::IrqLines;

    #[test]
    fn test_line_count_limits() {
        assert!(SplitIrq::new(0).is_err());
        assert!(SplitIrq::new(17).is_err());
        assert_eq!(SplitIrq::new(16).unwrap().num_lines(), 16);
    }

    #[test]
    fn test_outputs_mirror_input() {
        for n in 1..=MAX_SPLIT_LINES {
            let split = SplitIrq::new(n).unwrap();
            let sinks = IrqLines::new(n);
            for line in 0..n {
                split.output(line).connect(sinks.input(line));
            }
            let driver = Irq::new();
            driver.connect(split.input());
            for level in [true, false] {
                driver.set_level(level);
                assert!((0..n).all(|line| sinks.level(line) == level));
                assert!((0..n).all(|line| split.output(line).level() == level));
            }
        }
    }

    #[test]
    fn test_unconnected_outputs() {
        let split = SplitIrq::new(3).unwrap();
        let sinks = IrqLines::new(1);
        split.output(1).connect(sinks.input(0));
        split.set_input(true);
        assert!(sinks.level(0));
        assert!(split.output(0).level());
    }
}
