// Control / inflow phase handling
// the scanner export stores every control acquisition followed by every inflow (labelled)
// acquisition along axis 3. The perfusion signal is the control - inflow difference and its
// average over the acquisitions.

use crate::error::AslError;
use crate::engine::validate_stack;
use ndarray::{Array3, Array4, ArrayView4, Axis};

/// per-acquisition perfusion difference and its temporal mean
#[derive(Debug, Clone, PartialEq)]
pub struct PerfusionMaps {
    /// control - inflow, same shape as the inputs
    pub difference: Array4<f32>,
    /// mean of `difference` over the acquisition axis
    pub mean: Array3<f32>,
}

/// splits a concatenated stack into its control (first half) and inflow (second half) phases
pub fn split_phases(stack: ArrayView4<f32>) -> Result<(ArrayView4<f32>, ArrayView4<f32>), AslError> {
    let [_, _, _, nq] = validate_stack(&stack)?;
    if nq % 2 != 0 {
        return Err(AslError::OddPhaseCount { acquisitions: nq });
    }
    let n_phases = nq / 2;
    let (control, inflow) = stack.split_at(Axis(3), n_phases);
    Ok((control, inflow))
}

/// subtracts the inflow stack from the control stack and averages the result over acquisitions
pub fn combine(control: ArrayView4<f32>, inflow: ArrayView4<f32>) -> Result<PerfusionMaps, AslError> {
    let control_shape: [usize; 4] = control.dim().into();
    let inflow_shape: [usize; 4] = inflow.dim().into();
    if control_shape != inflow_shape {
        return Err(AslError::ShapeMismatch { control: control_shape, inflow: inflow_shape });
    }
    validate_stack(&control)?;

    let difference = &control - &inflow;
    let mean = difference.mean_axis(Axis(3)).ok_or(AslError::EmptyAcquisitionAxis)?;

    Ok(PerfusionMaps { difference, mean })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ShapeBuilder;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn constant_phases() {
        let control = Array4::from_elem((4, 3, 2, 4), 5f32);
        let inflow = Array4::from_elem((4, 3, 2, 4), 2f32);
        let maps = combine(control.view(), inflow.view()).unwrap();
        assert_eq!(maps.difference, Array4::from_elem((4, 3, 2, 4), 3f32));
        assert_eq!(maps.mean, Array3::from_elem((4, 3, 2), 3f32));
    }

    #[test]
    fn mean_runs_over_acquisitions() {
        // difference of acquisition l is l everywhere
        let control = Array4::from_shape_fn((2, 2, 2, 5).f(), |(_, _, _, l)| 10. + 2. * l as f32);
        let inflow = Array4::from_shape_fn((2, 2, 2, 5).f(), |(_, _, _, l)| 10. + l as f32);
        let maps = combine(control.view(), inflow.view()).unwrap();
        assert_eq!(maps.mean, Array3::from_elem((2, 2, 2), 2f32));
        assert_eq!(maps.difference.index_axis(Axis(3), 3), Array3::from_elem((2, 2, 2), 3f32));
    }

    #[test]
    fn random_phases_match_voxelwise_mean() {
        let mut rng = StdRng::seed_from_u64(7);
        let shape = (3, 4, 2, 6);
        let control = Array4::from_shape_simple_fn(shape, || rng.random::<f32>() * 100.);
        let inflow = Array4::from_shape_simple_fn(shape, || rng.random::<f32>() * 100.);
        let maps = combine(control.view(), inflow.view()).unwrap();

        for ((i, j, k), &m) in maps.mean.indexed_iter() {
            let expected = (0..6).map(|l| control[[i, j, k, l]] - inflow[[i, j, k, l]]).sum::<f32>() / 6.;
            assert!((m - expected).abs() < 1e-3, "voxel ({i},{j},{k}): {m} vs {expected}");
        }
    }

    #[test]
    fn mismatched_shapes_fail() {
        let control = Array4::<f32>::zeros((4, 4, 2, 3));
        let inflow = Array4::<f32>::zeros((4, 4, 2, 4));
        match combine(control.view(), inflow.view()) {
            Err(AslError::ShapeMismatch { control, inflow }) => {
                assert_eq!(control, [4, 4, 2, 3]);
                assert_eq!(inflow, [4, 4, 2, 4]);
            }
            other => panic!("expected shape mismatch, got {other:?}"),
        }
    }

    #[test]
    fn empty_stacks_fail() {
        let control = Array4::<f32>::zeros((2, 2, 2, 0));
        assert!(matches!(combine(control.view(), control.view()), Err(AslError::EmptyAcquisitionAxis)));
    }

    #[test]
    fn splits_concatenated_stack() {
        let stack = Array4::from_shape_fn((2, 2, 1, 6).f(), |(_, _, _, l)| l as f32);
        let (control, inflow) = split_phases(stack.view()).unwrap();
        assert_eq!(control.dim(), (2, 2, 1, 3));
        assert_eq!(inflow.dim(), (2, 2, 1, 3));
        assert_eq!(control[[0, 0, 0, 2]], 2.);
        assert_eq!(inflow[[1, 1, 0, 0]], 3.);
    }

    #[test]
    fn odd_stack_cannot_be_split() {
        let stack = Array4::<f32>::zeros((2, 2, 1, 5));
        assert!(matches!(split_phases(stack.view()), Err(AslError::OddPhaseCount { acquisitions: 5 })));
    }
}
