//! Symbolic simulation of R1, R2 and R3 for a fixed clocking sequence.
//!
//! Every cell of a register is tracked as a linear form over the unknown post-setup bits of that
//! register. The output function is quadratic in these bits; each product of two distinct bits
//! of the same register is replaced by a fresh variable.

use std::ops::BitXor;

use crate::cipher::{ClockControl, R4, OUTPUT_TAPS, REGISTERS};
use crate::gf2::BitVector;

/// Number of unknown bits of R1, R2 and R3, force bits excluded.
pub const NUM_LINEAR: usize = 18 + 21 + 22;

/// Number of linearized variables: the unknown bits plus every product of two distinct unknown
/// bits of the same register.
pub const NUM_VARIABLES: usize = NUM_LINEAR + 153 + 210 + 231;

/// Largest register width among R1, R2 and R3.
const MAX_WIDTH: usize = 23;

/// A linearized variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variable {
    /// Bit `position` of register `register`.
    Linear { register: usize, position: usize },
    /// The product of bits `a < b` of register `register`.
    Product { register: usize, a: usize, b: usize },
}

/// Maps register positions and position pairs to columns of the equation system. Columns are
/// ordered as: the unknown bits of R1, R2 and R3 (each ascending by position), followed by the
/// products of R1, R2 and R3 (each in lexicographic order of the pair).
pub struct ColumnLayout {
    linear: [[Option<usize>; MAX_WIDTH]; 3],
    product: [[[Option<usize>; MAX_WIDTH]; MAX_WIDTH]; 3],
    variables: Vec<Variable>,
}

impl ColumnLayout {
    fn new() -> ColumnLayout {
        let mut linear = [[None; MAX_WIDTH]; 3];
        let mut product = [[[None; MAX_WIDTH]; MAX_WIDTH]; 3];
        let mut variables = Vec::with_capacity(NUM_VARIABLES);

        for (register, spec) in REGISTERS.iter().take(3).enumerate() {
            for position in unknown_positions(register) {
                linear[register][position] = Some(variables.len());
                variables.push(Variable::Linear { register, position });
            }

            debug_assert!(spec.width <= MAX_WIDTH);
        }

        for register in 0..3 {
            let positions: Vec<_> = unknown_positions(register).collect();

            for (i, &a) in positions.iter().enumerate() {
                for &b in &positions[i + 1..] {
                    product[register][a][b] = Some(variables.len());
                    product[register][b][a] = Some(variables.len());
                    variables.push(Variable::Product { register, a, b });
                }
            }
        }

        ColumnLayout { linear, product, variables }
    }

    /// Returns the column of bit `position` of `register`, or `None` for the force bit.
    #[inline(always)]
    pub fn linear_column(&self, register: usize, position: usize) -> Option<usize> {
        self.linear[register][position]
    }

    /// Returns the column of the product of two distinct bits of `register`.
    #[inline(always)]
    pub fn product_column(&self, register: usize, a: usize, b: usize) -> Option<usize> {
        self.product[register][a][b]
    }

    /// Returns the variable held by `column`.
    pub fn variable(&self, column: usize) -> Variable {
        self.variables[column]
    }

    pub fn num_columns(&self) -> usize {
        self.variables.len()
    }
}

lazy_static! {
    pub static ref COLUMNS: ColumnLayout = ColumnLayout::new();
}

/// The positions of `register` that are unknown to the attack, i.e. all but the force bit.
pub fn unknown_positions(register: usize) -> impl Iterator<Item = usize> {
    let spec = REGISTERS[register];

    (0..spec.width).filter(move |&p| p != spec.force_bit)
}

/// Iterates over the set bits of `mask`.
#[inline(always)]
fn ones(mut mask: u32) -> impl Iterator<Item = usize> {
    std::iter::from_fn(move || {
        if mask == 0 {
            None
        } else {
            let i = mask.trailing_zeros() as usize;
            mask &= mask - 1;
            Some(i)
        }
    })
}

/*************************************************************************************************/

/// An affine function of the post-setup bits of one register. Bit `i` of `mask` is set when
/// bit `i` of the register is included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinearForm {
    pub mask: u32,
    pub constant: bool,
}

impl LinearForm {
    /// Returns the form plus one.
    #[inline(always)]
    pub fn complement(self) -> LinearForm {
        LinearForm { mask: self.mask, constant: !self.constant }
    }

    /// Evaluates the form for a concrete register value.
    pub fn evaluate(&self, value: u32) -> bool {
        ((value & self.mask).count_ones() & 1 == 1) ^ self.constant
    }
}

impl BitXor for LinearForm {
    type Output = LinearForm;

    #[inline(always)]
    fn bitxor(self, rhs: LinearForm) -> LinearForm {
        LinearForm {
            mask: self.mask ^ rhs.mask,
            constant: self.constant ^ rhs.constant,
        }
    }
}

/// One of R1, R2 or R3 with every cell held as a linear form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymbolicRegister {
    register: usize,
    cells: [LinearForm; MAX_WIDTH],
}

impl SymbolicRegister {
    /**
    Creates the register at the start of the key stream generation.

    register    0, 1 or 2 for R1, R2 or R3.
    difference  Known difference to the register of the reference frame. Cell `i` starts out as
                the unknown bit `i` plus bit `i` of the difference. The force bit is the
                constant 1.
    */
    pub fn new(register: usize, difference: u32) -> SymbolicRegister {
        let spec = REGISTERS[register];
        let mut cells = [LinearForm::default(); MAX_WIDTH];

        for (i, cell) in cells.iter_mut().enumerate().take(spec.width) {
            *cell = if i == spec.force_bit {
                LinearForm { mask: 0, constant: true }
            } else {
                LinearForm { mask: 1 << i, constant: (difference >> i) & 1 == 1 }
            };
        }

        SymbolicRegister { register, cells }
    }

    #[inline(always)]
    pub fn cell(&self, i: usize) -> LinearForm {
        self.cells[i]
    }

    /// Mirrors `RegisterSpec::clock` on linear forms.
    #[inline(always)]
    pub fn clock(&mut self) {
        let spec = REGISTERS[self.register];
        let feedback = spec.feedback
                           .taps
                           .iter()
                           .fold(LinearForm::default(), |acc, &t| acc ^ self.cells[t]);

        for i in (1..spec.width).rev() {
            self.cells[i] = self.cells[i - 1];
        }

        self.cells[0] = feedback;
    }

    /// Evaluates every cell for a concrete post-setup register value.
    pub fn evaluate(&self, value: u32) -> u32 {
        (0..REGISTERS[self.register].width)
            .fold(0, |acc, i| acc | ((self.cells[i].evaluate(value) as u32) << i))
    }
}

/*************************************************************************************************/

/// Accumulates a linearized expression: a row over the columns of `COLUMNS` plus a constant.
pub struct Expression<'a> {
    layout: &'a ColumnLayout,
    row: BitVector,
    constant: bool,
}

impl<'a> Expression<'a> {
    pub fn new(layout: &'a ColumnLayout) -> Expression<'a> {
        Expression {
            layout,
            row: BitVector::zeros(layout.num_columns()),
            constant: false,
        }
    }

    /// Adds a linear form of `register`.
    #[inline(always)]
    pub fn add_linear(&mut self, register: usize, form: LinearForm) {
        self.add_mask(register, form.mask);
        self.constant ^= form.constant;
    }

    #[inline(always)]
    fn add_mask(&mut self, register: usize, mask: u32) {
        for i in ones(mask) {
            if let Some(c) = self.layout.linear_column(register, i) {
                self.row.toggle(c);
            }
        }
    }

    /// Adds the product of two linear forms of `register`. Since x * x = x, squares fold back
    /// into the linear columns.
    pub fn add_product(&mut self, register: usize, a: LinearForm, b: LinearForm) {
        if b.constant {
            self.add_mask(register, a.mask);
        }

        if a.constant {
            self.add_mask(register, b.mask);
        }

        self.constant ^= a.constant & b.constant;

        for i in ones(a.mask) {
            for j in ones(b.mask) {
                let column = if i == j {
                    self.layout.linear_column(register, i)
                } else {
                    self.layout.product_column(register, i, j)
                };

                if let Some(c) = column {
                    self.row.toggle(c);
                }
            }
        }
    }

    /// Adds maj(a, b, c) = ab + bc + ac.
    pub fn add_majority(&mut self, register: usize, a: LinearForm, b: LinearForm, c: LinearForm) {
        self.add_product(register, a, b);
        self.add_product(register, b, c);
        self.add_product(register, a, c);
    }

    /// Returns the row and the constant.
    pub fn finish(self) -> (BitVector, bool) {
        (self.row, self.constant)
    }
}

/**
R1, R2 and R3 held symbolically, driven by a concrete R4.

registers   The symbolic R1, R2 and R3.
r4          The concrete value of R4.
*/
#[derive(Clone, Debug)]
pub struct SymbolicState {
    registers: [SymbolicRegister; 3],
    r4: u32,
}

impl SymbolicState {
    /// Creates the state of a frame whose post-setup registers differ from the reference frame
    /// by `difference`, with R4 known to be `r4`.
    pub fn new(difference: &[u32; 4], r4: u32) -> SymbolicState {
        SymbolicState {
            registers: [SymbolicRegister::new(0, difference[0]),
                        SymbolicRegister::new(1, difference[1]),
                        SymbolicRegister::new(2, difference[2])],
            r4,
        }
    }

    pub fn register(&self, i: usize) -> &SymbolicRegister {
        &self.registers[i]
    }

    pub fn r4(&self) -> u32 {
        self.r4
    }

    /// Mirrors `CipherState::clock_irregular`.
    #[inline(always)]
    pub fn clock(&mut self) {
        let control = ClockControl::from_r4(self.r4);

        for (i, register) in self.registers.iter_mut().enumerate() {
            if control.clocks(i) {
                register.clock();
            }
        }

        self.r4 = R4.clock(self.r4);
    }

    /// Returns the output bit of the current state as a linearized expression.
    pub fn output_equation(&self, layout: &ColumnLayout) -> (BitVector, bool) {
        let mut expression = Expression::new(layout);

        for (i, (register, taps)) in self.registers.iter().zip(OUTPUT_TAPS.iter()).enumerate() {
            let input = |p: usize| {
                let form = register.cell(p);

                if p == taps.complemented { form.complement() } else { form }
            };

            expression.add_linear(i, register.cell(taps.top));
            expression.add_majority(i,
                                    input(taps.majority[0]),
                                    input(taps.majority[1]),
                                    input(taps.majority[2]));
        }

        expression.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{initialize, CipherState};
    use crate::utility::bit;
    use proptest::prelude::*;

    /// Sets the linearized variables to the values implied by concrete registers.
    fn assignment(registers: &[u32; 4]) -> BitVector {
        let mut x = BitVector::zeros(NUM_VARIABLES);

        for c in 0..NUM_VARIABLES {
            let value = match COLUMNS.variable(c) {
                Variable::Linear { register, position } => bit(registers[register], position),
                Variable::Product { register, a, b } => {
                    bit(registers[register], a) & bit(registers[register], b)
                }
            };

            x.set(c, value);
        }

        x
    }

    #[test]
    fn column_layout() {
        assert_eq!(NUM_VARIABLES, COLUMNS.num_columns());
        assert_eq!(655, NUM_VARIABLES);
        assert_eq!(Some(0), COLUMNS.linear_column(0, 0));
        assert_eq!(None, COLUMNS.linear_column(0, 15));
        assert_eq!(Some(15), COLUMNS.linear_column(0, 16));
        assert_eq!(Some(18), COLUMNS.linear_column(1, 0));
        assert_eq!(Some(NUM_LINEAR), COLUMNS.product_column(0, 0, 1));
        assert_eq!(Some(NUM_LINEAR), COLUMNS.product_column(0, 1, 0));
        assert_eq!(None, COLUMNS.product_column(2, 18, 3));
        assert_eq!(Variable::Product { register: 2, a: 21, b: 22 },
                   COLUMNS.variable(NUM_VARIABLES - 1));
    }

    #[test]
    fn forms_track_concrete_clocking() {
        let state = initialize(0x0123_4567_89ab_cdef, 0x3039).unwrap();
        let mut symbolic = SymbolicState::new(&[0; 4], state.register(3));
        let mut concrete = state;

        for _ in 0..150 {
            symbolic.clock();
            concrete = concrete.clock_irregular();

            for i in 0..3 {
                assert_eq!(concrete.register(i), symbolic.register(i).evaluate(state.register(i)));
            }

            assert_eq!(concrete.register(3), symbolic.r4());
        }
    }

    proptest! {
        #[test]
        fn output_equation_matches_output_bit(r1 in 0u32..1 << 19,
                                              r2 in 0u32..1 << 22,
                                              r3 in 0u32..1 << 23,
                                              r4 in 0u32..1 << 17,
                                              steps in 0usize..120) {
            let registers = [r1 | 1 << 15, r2 | 1 << 16, r3 | 1 << 18, r4 | 1 << 10];
            let mut concrete = CipherState::from_registers(registers).unwrap();
            let mut symbolic = SymbolicState::new(&[0; 4], registers[3]);

            for _ in 0..steps {
                concrete = concrete.clock_irregular();
                symbolic.clock();
            }

            let (row, constant) = symbolic.output_equation(&COLUMNS);

            prop_assert_eq!(concrete.output_bit(), row.dot(&assignment(&registers)) ^ constant);
        }

        #[test]
        fn difference_is_carried_in_constants(difference in any::<u32>(), value in any::<u32>()) {
            let difference = difference & REGISTERS[1].mask() & !(1 << 16);
            let value = (value & REGISTERS[1].mask()) | (1 << 16);
            let register = SymbolicRegister::new(1, difference);

            prop_assert_eq!(value ^ difference, register.evaluate(value));
        }
    }
}
