use rand::Rng;

use crate::{
    activation::activation::ActivationFunction,
    error::{NnError, Result},
    loss::mse::MseLoss,
    math::matrix::{Matrix, MatrixView, Shape},
};

/// One fully-connected layer together with everything backprop caches for it.
///
/// Shapes, with `n` inputs and `m` units:
/// - `weights`, `weight_grads`: `n x m`
/// - `biases`, `bias_grads`, `weighted_sums`, `activations`, `errors`: `1 x m`
#[derive(Debug, Clone)]
pub struct Layer {
    pub weights: Matrix,
    pub biases: Matrix,
    pub weighted_sums: Matrix, // z = a_prev * W + b
    pub activations: Matrix,   // a = f(z)
    pub errors: Matrix,        // dE/dz
    pub weight_grads: Matrix,
    pub bias_grads: Matrix,
    pub activator: ActivationFunction,
}

impl Layer {
    /// Allocates a layer with zeroed parameters and caches.
    pub fn new(size: usize, input_size: usize, activation: ActivationFunction) -> Result<Layer> {
        Ok(Layer {
            weights: Matrix::allocate(input_size, size)?,
            biases: Matrix::allocate(1, size)?,
            weighted_sums: Matrix::allocate(1, size)?,
            activations: Matrix::allocate(1, size)?,
            errors: Matrix::allocate(1, size)?,
            weight_grads: Matrix::allocate(input_size, size)?,
            bias_grads: Matrix::allocate(1, size)?,
            activator: activation,
        })
    }

    pub fn size(&self) -> usize {
        self.biases.cols()
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows()
    }

    /// Draws weights and biases from `[min, max]`. Gradients are left alone.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R, min: f64, max: f64) -> Result<()> {
        self.weights.randomize(rng, min, max)?;
        self.biases.randomize(rng, min, max)
    }

    /// Computes `z = input * W + b` and `a = f(z)`, caching both.
    pub fn feed_from(&mut self, input: MatrixView<'_>) -> Result<()> {
        self.weighted_sums.multiply_into(input, &self.weights)?;
        self.weighted_sums.add_in_place(&self.biases)?;
        self.activations.copy_from(&self.weighted_sums)?;
        let f = self.activator;
        self.activations.map_in_place(|z| f.activate(z));
        Ok(())
    }

    /// Adds the output-layer error `(a - y) * f'(z)` into `errors`.
    pub fn add_output_error(&mut self, target: &[f64]) -> Result<()> {
        if target.len() != self.size() {
            return Err(NnError::shape(
                "output error",
                Shape::new(1, target.len()),
                self.errors.shape(),
            ));
        }
        let loss_grad = MseLoss::derivative(self.activations.as_slice(), target);
        let z = self.weighted_sums.as_slice();
        for (j, e) in self.errors.as_mut_slice().iter_mut().enumerate() {
            *e += loss_grad[j] * self.activator.derivative(z[j]);
        }
        Ok(())
    }

    /// Adds `f'(z_j) * sum_i w_ji * e_i` into `errors`, pulling `w` and `e`
    /// from the layer that consumes this one's activations.
    pub fn add_hidden_error(&mut self, next: &Layer) -> Result<()> {
        if next.input_size() != self.size() {
            return Err(NnError::shape("hidden error", self.errors.shape(), next.weights.shape()));
        }
        let z = self.weighted_sums.as_slice();
        let next_errors = next.errors.as_slice();
        for (j, e) in self.errors.as_mut_slice().iter_mut().enumerate() {
            let propagated: f64 = next_errors
                .iter()
                .enumerate()
                .map(|(i, next_e)| next.weights.get(j, i) * next_e)
                .sum();
            *e += self.activator.derivative(z[j]) * propagated;
        }
        Ok(())
    }

    /// `dE/dw_ij += a_i * e_j` and `dE/db_j += e_j`.
    pub fn accumulate_gradients(&mut self, input: MatrixView<'_>) -> Result<()> {
        let expected = Shape::new(1, self.input_size());
        if input.shape() != expected {
            return Err(NnError::shape("gradient accumulation", input.shape(), expected));
        }
        let inputs = input.row(0);
        let errors = self.errors.as_slice();
        for (i, a) in inputs.iter().enumerate() {
            for (j, e) in errors.iter().enumerate() {
                self.weight_grads[(i, j)] += a * e;
            }
        }
        for (g, e) in self.bias_grads.as_mut_slice().iter_mut().zip(errors) {
            *g += e;
        }
        Ok(())
    }

    /// `w -= lr * grad / n` for weights and biases, then resets the gradients.
    /// `n` is the number of samples the gradients cover and must be non-zero.
    pub fn apply_gradients(&mut self, lr: f64, n: usize) -> Result<()> {
        if n == 0 {
            return Err(NnError::config("gradient update needs at least one sample"));
        }
        let step = lr / n as f64;
        for (w, g) in self.weights.as_mut_slice().iter_mut().zip(self.weight_grads.as_slice()) {
            *w -= step * g;
        }
        for (b, g) in self.biases.as_mut_slice().iter_mut().zip(self.bias_grads.as_slice()) {
            *b -= step * g;
        }
        self.zero_gradients();
        Ok(())
    }

    pub fn clear_errors(&mut self) {
        self.errors.fill(0.0);
    }

    pub fn zero_gradients(&mut self) {
        self.weight_grads.fill(0.0);
        self.bias_grads.fill(0.0);
    }
}
