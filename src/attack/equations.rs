//! The linearized equation system of one R4 hypothesis.

use crate::gf2::{BitVector, EchelonSystem, Insertion};
use crate::cipher::REGISTERS;

use super::symbolic::{unknown_positions, COLUMNS, NUM_LINEAR, NUM_VARIABLES};

/**
Equations over the linearized variables, kept in echelon form.

system      The reduced equations.
equations   Number of equations added, redundant ones included.
*/
#[derive(Clone, Debug)]
pub struct LinearEquationSystem {
    system: EchelonSystem,
    equations: usize,
}

impl LinearEquationSystem {
    pub fn new() -> LinearEquationSystem {
        LinearEquationSystem {
            system: EchelonSystem::new(NUM_VARIABLES),
            equations: 0,
        }
    }

    /// Adds the equation `<row, x> = rhs`.
    #[inline(always)]
    pub fn add(&mut self, row: BitVector, rhs: bool) -> Insertion {
        self.equations += 1;
        self.system.insert(row, rhs)
    }

    pub fn rank(&self) -> usize {
        self.system.rank()
    }

    pub fn num_equations(&self) -> usize {
        self.equations
    }

    pub fn is_consistent(&self) -> bool {
        self.system.is_consistent()
    }

    /// Returns R1, R2 and R3 if every unknown register bit is determined by the equations. The
    /// force bits are set. Product variables may remain free.
    pub fn registers(&self) -> Option<[u32; 3]> {
        if !self.is_consistent() {
            return None;
        }

        let mut registers = [0u32; 3];

        for (register, value) in registers.iter_mut().enumerate() {
            for position in unknown_positions(register) {
                let column = COLUMNS.linear_column(register, position)?;

                if self.system.variable(column)? {
                    *value |= 1 << position;
                }
            }

            *value |= 1 << REGISTERS[register].force_bit;
        }

        Some(registers)
    }

    /// Returns the number of unknown register bits the equations determine.
    pub fn determined(&self) -> usize {
        (0..NUM_LINEAR).filter(|&c| self.system.variable(c).is_some()).count()
    }
}

impl Default for LinearEquationSystem {
    fn default() -> LinearEquationSystem {
        LinearEquationSystem::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::symbolic::SymbolicState;
    use crate::cipher::initialize;
    use crate::keystream::MIXING_CLOCKS;

    /// Collects the equations of `count` keystream bits of a known state.
    fn system_for(key: u64, frame: u32, count: usize) -> (LinearEquationSystem, [u32; 4]) {
        let state = initialize(key, frame).unwrap();
        let mut concrete = state;
        let mut symbolic = SymbolicState::new(&[0; 4], state.register(3));
        let mut system = LinearEquationSystem::new();

        for _ in 0..MIXING_CLOCKS {
            concrete = concrete.clock_irregular();
            symbolic.clock();
        }

        for _ in 0..count {
            concrete = concrete.clock_irregular();
            symbolic.clock();

            let (row, constant) = symbolic.output_equation(&COLUMNS);
            system.add(row, concrete.output_bit() ^ constant);
        }

        (system, state.registers())
    }

    #[test]
    fn long_keystream_determines_registers() {
        let (system, registers) = system_for(0x0123_4567_89ab_cdef, 0x3039, 720);

        assert!(system.is_consistent());
        assert_eq!(720, system.num_equations());
        assert_eq!(NUM_LINEAR, system.determined());
        assert_eq!(Some([registers[0], registers[1], registers[2]]), system.registers());
    }

    #[test]
    fn short_keystream_is_underdetermined() {
        let (system, _) = system_for(0x0123_4567_89ab_cdef, 0x3039, 200);

        assert!(system.is_consistent());
        assert!(system.rank() <= 200);
        assert_eq!(None, system.registers());
    }
}
