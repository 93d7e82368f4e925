//! The hash capability every other component is parameterised over.

use std::sync::Arc;

use halo2curves_axiom::{bn256::Fr, ff::Field};
use poseidon_primitives::poseidon::primitives::{ConstantLength, Hash as PoseidonHash, Spec};
use thiserror::Error;

use crate::FieldElement;

const POSEIDON_T: usize = 6;
const POSEIDON_RATE: usize = 5;
const POSEIDON_FULL_ROUNDS: usize = 8;
const POSEIDON_PARTIAL_ROUNDS: usize = 57;

/// Largest input length [`PoseidonOracle`] accepts in one call.
pub const MAX_POSEIDON_ARITY: usize = POSEIDON_RATE;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    #[error("unsupported hash arity {arity} (supported: 1..={max})")]
    UnsupportedArity { arity: usize, max: usize },

    #[error("hash backend failure: {0}")]
    Backend(String),
}

/// Deterministic map from an ordered sequence of field elements to one field
/// element. Implementations must be pure.
pub trait HashOracle {
    fn hash(&self, inputs: &[FieldElement]) -> Result<FieldElement, HashError>;
}

impl<T: HashOracle + ?Sized> HashOracle for &T {
    fn hash(&self, inputs: &[FieldElement]) -> Result<FieldElement, HashError> {
        (**self).hash(inputs)
    }
}

impl<T: HashOracle + ?Sized> HashOracle for Arc<T> {
    fn hash(&self, inputs: &[FieldElement]) -> Result<FieldElement, HashError> {
        (**self).hash(inputs)
    }
}

/// Poseidon over BN256 with the width-6 parameters used across the workspace.
#[derive(Clone, Copy, Debug, Default)]
pub struct PoseidonOracle;

impl HashOracle for PoseidonOracle {
    fn hash(&self, inputs: &[FieldElement]) -> Result<FieldElement, HashError> {
        let out = match inputs.len() {
            1 => poseidon_hash::<1>(inputs),
            2 => poseidon_hash::<2>(inputs),
            3 => poseidon_hash::<3>(inputs),
            4 => poseidon_hash::<4>(inputs),
            5 => poseidon_hash::<5>(inputs),
            arity => {
                return Err(HashError::UnsupportedArity {
                    arity,
                    max: MAX_POSEIDON_ARITY,
                })
            }
        };
        Ok(FieldElement(out))
    }
}

fn poseidon_hash<const L: usize>(inputs: &[FieldElement]) -> Fr {
    let values: [Fr; L] = std::array::from_fn(|i| inputs[i].0);
    PoseidonHash::<Fr, PoolPoseidonSpec, ConstantLength<L>, POSEIDON_T, POSEIDON_RATE>::init()
        .hash(values)
}

#[derive(Debug)]
struct PoolPoseidonSpec;

impl Spec<Fr, POSEIDON_T, POSEIDON_RATE> for PoolPoseidonSpec {
    fn full_rounds() -> usize {
        POSEIDON_FULL_ROUNDS
    }

    fn partial_rounds() -> usize {
        POSEIDON_PARTIAL_ROUNDS
    }

    fn sbox(val: Fr) -> Fr {
        val.pow_vartime([5])
    }

    fn secure_mds() -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fe(v: u64) -> FieldElement {
        FieldElement::from(v)
    }

    #[test]
    fn poseidon_is_deterministic() {
        let a = PoseidonOracle.hash(&[fe(1), fe(2)]).unwrap();
        let b = PoseidonOracle.hash(&[fe(1), fe(2)]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn poseidon_is_order_sensitive() {
        let a = PoseidonOracle.hash(&[fe(1), fe(2)]).unwrap();
        let b = PoseidonOracle.hash(&[fe(2), fe(1)]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn arity_changes_the_output() {
        let one = PoseidonOracle.hash(&[fe(7)]).unwrap();
        let two = PoseidonOracle.hash(&[fe(7), FieldElement::zero()]).unwrap();
        assert_ne!(one, two);
    }

    #[test]
    fn unsupported_arity_is_an_error() {
        assert_eq!(
            PoseidonOracle.hash(&[]),
            Err(HashError::UnsupportedArity { arity: 0, max: 5 })
        );
        let six = vec![fe(1); 6];
        assert!(PoseidonOracle.hash(&six).is_err());
    }

    #[test]
    fn shared_oracle_delegates() {
        let shared: Arc<dyn HashOracle + Send + Sync> = Arc::new(PoseidonOracle);
        assert_eq!(
            shared.hash(&[fe(3)]).unwrap(),
            PoseidonOracle.hash(&[fe(3)]).unwrap()
        );
    }
}
