//! Linear algebra over GF(2): bit vectors, bit matrices and an incremental Gaussian
//! elimination solver.
//!
//! Addition is XOR and multiplication is AND. Rows are reduced by their highest set column,
//! so a pivot row for column `c` only has other entries in columns below `c`.

use smallvec::SmallVec;
use std::fmt;
use std::ops::BitXorAssign;

/// Number of 64-bit words kept inline before a vector spills to the heap. Enough for the
/// 655 linearized variables of the attack.
const INLINE_WORDS: usize = 12;

/// A fixed-length vector over GF(2).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitVector {
    len: usize,
    words: SmallVec<[u64; INLINE_WORDS]>,
}

impl BitVector {
    /// Creates the all-zero vector of length `len`.
    pub fn zeros(len: usize) -> BitVector {
        BitVector {
            len,
            words: SmallVec::from_elem(0, (len + 63) / 64),
        }
    }

    /// Creates the unit vector with a single one at position `i`.
    pub fn unit(len: usize, i: usize) -> BitVector {
        let mut v = BitVector::zeros(len);
        v.set(i, true);
        v
    }

    /// Creates a vector from a slice of bits.
    pub fn from_bits(bits: &[bool]) -> BitVector {
        let mut v = BitVector::zeros(bits.len());

        for (i, &b) in bits.iter().enumerate() {
            v.set(i, b);
        }

        v
    }

    /// Returns the length of the vector.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the vector has length zero.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the `i`'th entry.
    #[inline(always)]
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < self.len);
        (self.words[i / 64] >> (i % 64)) & 1 == 1
    }

    /// Sets the `i`'th entry.
    #[inline(always)]
    pub fn set(&mut self, i: usize, value: bool) {
        debug_assert!(i < self.len);

        if value {
            self.words[i / 64] |= 1 << (i % 64);
        } else {
            self.words[i / 64] &= !(1 << (i % 64));
        }
    }

    /// Adds one to the `i`'th entry.
    #[inline(always)]
    pub fn toggle(&mut self, i: usize) {
        debug_assert!(i < self.len);
        self.words[i / 64] ^= 1 << (i % 64);
    }

    /// Returns true if all entries are zero.
    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Returns the position of the highest non-zero entry.
    #[inline(always)]
    pub fn highest_one(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|&(_, &w)| w != 0)
            .map(|(i, &w)| 64 * i + 63 - w.leading_zeros() as usize)
    }

    /// Returns the number of non-zero entries.
    pub fn weight(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Inner product over GF(2).
    pub fn dot(&self, other: &BitVector) -> bool {
        assert_eq!(self.len, other.len, "dot product of vectors of different length");

        self.words
            .iter()
            .zip(other.words.iter())
            .fold(0, |acc, (a, b)| acc ^ (a & b).count_ones())
            & 1 == 1
    }

    /// Returns the entries as a vector of bits.
    pub fn to_bits(&self) -> Vec<bool> {
        (0..self.len).map(|i| self.get(i)).collect()
    }
}

impl<'a> BitXorAssign<&'a BitVector> for BitVector {
    fn bitxor_assign(&mut self, rhs: &'a BitVector) {
        debug_assert_eq!(self.len, rhs.len);

        for (a, b) in self.words.iter_mut().zip(rhs.words.iter()) {
            *a ^= b;
        }
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for i in 0..self.len {
            write!(f, "{}", self.get(i) as u8)?;
        }

        Ok(())
    }
}

/*************************************************************************************************/

/// A matrix over GF(2) stored as a list of rows.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BitMatrix {
    columns: usize,
    rows: Vec<BitVector>,
}

impl BitMatrix {
    /// Creates the all-zero matrix with the given dimensions.
    pub fn zeros(rows: usize, columns: usize) -> BitMatrix {
        BitMatrix {
            columns,
            rows: vec![BitVector::zeros(columns); rows],
        }
    }

    /// Creates a matrix from its rows.
    ///
    /// # Panics
    /// Panics if the rows do not all have length `columns`.
    pub fn from_rows(columns: usize, rows: Vec<BitVector>) -> BitMatrix {
        assert!(rows.iter().all(|r| r.len() == columns), "rows of different length");
        BitMatrix { columns, rows }
    }

    /// Returns the number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns
    }

    /// Returns the `i`'th row.
    pub fn row(&self, i: usize) -> &BitVector {
        &self.rows[i]
    }

    /// Returns the entry at row `i`, column `j`.
    pub fn get(&self, i: usize, j: usize) -> bool {
        self.rows[i].get(j)
    }

    /// Sets the entry at row `i`, column `j`.
    pub fn set(&mut self, i: usize, j: usize, value: bool) {
        self.rows[i].set(j, value)
    }

    /// Computes `self * v`.
    pub fn mul_vec(&self, v: &BitVector) -> BitVector {
        assert_eq!(self.columns, v.len(), "dimension mismatch");

        let mut out = BitVector::zeros(self.rows.len());

        for (i, row) in self.rows.iter().enumerate() {
            out.set(i, row.dot(v));
        }

        out
    }

    /// Computes `self * other`.
    pub fn mul(&self, other: &BitMatrix) -> BitMatrix {
        assert_eq!(self.columns, other.num_rows(), "dimension mismatch");

        let mut out = BitMatrix::zeros(self.rows.len(), other.columns);

        // Row i of the product is the sum of the rows of `other` selected by row i of `self`
        for (i, row) in self.rows.iter().enumerate() {
            for k in 0..self.columns {
                if row.get(k) {
                    out.rows[i] ^= &other.rows[k];
                }
            }
        }

        out
    }

    /// Returns the rank of the matrix.
    pub fn rank(&self) -> usize {
        let mut system = EchelonSystem::new(self.columns);

        for row in &self.rows {
            system.insert(row.clone(), false);
        }

        system.rank()
    }

    /// Solves `self * x = b`.
    pub fn solve(&self, b: &BitVector) -> Solution {
        assert_eq!(self.rows.len(), b.len(), "dimension mismatch");

        let mut system = EchelonSystem::new(self.columns);

        for (i, row) in self.rows.iter().enumerate() {
            if system.insert(row.clone(), b.get(i)) == Insertion::Inconsistent {
                return Solution::Inconsistent;
            }
        }

        system.solve()
    }
}

/*************************************************************************************************/

/// The result of adding an equation to an `EchelonSystem`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Insertion {
    /// The equation was independent and increased the rank.
    Pivot,
    /// The equation was implied by the previous ones.
    Redundant,
    /// The equation reduced to `0 = 1`.
    Inconsistent,
}

/// The solution space of a linear system.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Solution {
    /// Exactly one solution exists.
    Unique(BitVector),
    /// Solutions exist but `columns - rank` variables are free. `particular` is the solution
    /// with all free variables set to zero.
    Underdetermined { rank: usize, particular: BitVector },
    /// No solution exists.
    Inconsistent,
}

/**
A linear system over GF(2) kept in echelon form while equations are added one at a time.

columns     Number of variables.
pivots      For each column, the row (and right hand side) whose highest entry is that column.
rank        Number of pivot rows.
consistent  False once a `0 = 1` row has been seen.
*/
#[derive(Clone, Debug)]
pub struct EchelonSystem {
    columns: usize,
    pivots: Vec<Option<(BitVector, bool)>>,
    rank: usize,
    consistent: bool,
}

impl EchelonSystem {
    /// Creates an empty system in `columns` variables.
    pub fn new(columns: usize) -> EchelonSystem {
        EchelonSystem {
            columns,
            pivots: vec![None; columns],
            rank: 0,
            consistent: true,
        }
    }

    /// Returns the number of variables.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Returns the rank of the equations added so far.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Returns false if an inconsistent equation has been added.
    pub fn is_consistent(&self) -> bool {
        self.consistent
    }

    /// Adds the equation `<row, x> = rhs`.
    pub fn insert(&mut self, mut row: BitVector, mut rhs: bool) -> Insertion {
        debug_assert_eq!(row.len(), self.columns);

        while let Some(lead) = row.highest_one() {
            if let Some((pivot, pivot_rhs)) = &self.pivots[lead] {
                row ^= pivot;
                rhs ^= *pivot_rhs;
                continue;
            }

            self.pivots[lead] = Some((row, rhs));
            self.rank += 1;
            return Insertion::Pivot;
        }

        if rhs {
            self.consistent = false;
            Insertion::Inconsistent
        } else {
            Insertion::Redundant
        }
    }

    /// Returns the value of the linear functional `<functional, x>` if it is the same for every
    /// solution of the system, i.e. if `functional` lies in the row space.
    pub fn evaluate(&self, functional: &BitVector) -> Option<bool> {
        let mut row = functional.clone();
        let mut value = false;

        while let Some(lead) = row.highest_one() {
            match self.pivots[lead] {
                Some((ref pivot, pivot_rhs)) => {
                    row ^= pivot;
                    value ^= pivot_rhs;
                }
                None => return None,
            }
        }

        Some(value)
    }

    /// Returns the value of variable `i` if it is determined by the system.
    pub fn variable(&self, i: usize) -> Option<bool> {
        self.evaluate(&BitVector::unit(self.columns, i))
    }

    /// Solves the system by back substitution. Free variables are set to zero.
    pub fn solve(&self) -> Solution {
        if !self.consistent {
            return Solution::Inconsistent;
        }

        let mut x = BitVector::zeros(self.columns);

        // Pivot rows only reference lower columns, so ascending order resolves every column
        // before it is used.
        for c in 0..self.columns {
            if let Some((ref row, rhs)) = self.pivots[c] {
                let mut value = rhs;

                for j in 0..c {
                    if row.get(j) && x.get(j) {
                        value = !value;
                    }
                }

                x.set(c, value);
            }
        }

        if self.rank == self.columns {
            Solution::Unique(x)
        } else {
            Solution::Underdetermined {
                rank: self.rank,
                particular: x,
            }
        }
    }
}
