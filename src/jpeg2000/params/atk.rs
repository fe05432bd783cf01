//! ATK marker segment: arbitrary transformation kernel.
//!
//! Field shapes ground on the `param_atk`/`lifting_step` union in
//! `ojph_params_local.h`: up to 6 steps, one coefficient per step,
//! `m_init = 0` only, and the irreversible/reversible step-coefficient
//! split (`irv_data::Aatk: f32` vs `rev_data::{Eatk, Batk, Aatk}`).

use crate::error::{Jpeg2000Error, UnsupportedFeature};

pub const MAX_ATK_STEPS: usize = 6;

#[derive(Debug, Clone, Copy)]
pub enum LiftingStep {
    Irreversible { a: f32 },
    Reversible { e: u8, b: i16, a: i16 },
}

#[derive(Debug, Clone)]
pub struct Atk {
    pub index: u8,
    pub reversible: bool,
    /// Only present for irreversible kernels.
    pub k: f32,
    pub steps: Vec<LiftingStep>,
}

impl Atk {
    pub fn check_validity(&self) -> Result<(), Jpeg2000Error> {
        if self.steps.len() > MAX_ATK_STEPS {
            return Err(Jpeg2000Error::UnsupportedFeature(
                UnsupportedFeature::TooManyAtkSteps,
            ));
        }
        Ok(())
    }

    /// Fast-path detection for the 5/3 update step (`A=1`), per §4.5.
    pub fn is_53_update_step(step: &LiftingStep) -> bool {
        matches!(step, LiftingStep::Reversible { e: 2, b: 2, a: 1 })
    }

    /// Fast-path detection for the 5/3 predict step (`A=-1,B=1,E=1`).
    pub fn is_53_predict_step(step: &LiftingStep) -> bool {
        matches!(step, LiftingStep::Reversible { e: 1, b: 0, a: -1 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_more_than_six_steps() {
        let atk = Atk {
            index: 2,
            reversible: true,
            k: 1.0,
            steps: vec![LiftingStep::Reversible { e: 1, b: 0, a: -1 }; 7],
        };
        assert!(atk.check_validity().is_err());
    }

    #[test]
    fn accepts_six_steps() {
        let atk = Atk {
            index: 2,
            reversible: true,
            k: 1.0,
            steps: vec![LiftingStep::Reversible { e: 1, b: 0, a: -1 }; 6],
        };
        assert!(atk.check_validity().is_ok());
    }
}
