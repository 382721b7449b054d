mod gradient_descent;

pub use gradient_descent::GradientDescent;

pub trait Optimizer {
    /// Moves `params` one step according to `grad`, both flattened in the same order.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]);
}
