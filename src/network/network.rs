use rand::Rng;

use crate::{
    activation::activation::ActivationFunction,
    error::{NnError, Result},
    layers::dense::Layer,
    math::matrix::{Matrix, MatrixView, Shape},
    network::spec::NetworkParams,
};

/// Fixed-topology, fully-connected feed-forward network.
///
/// Layer 0 is the input and only holds an activation vector; every later
/// layer is a [`Layer`] with its own parameters, caches and gradient
/// accumulators. The topology never changes after construction.
#[derive(Debug, Clone)]
pub struct Network {
    input: Matrix,
    layers: Vec<Layer>,
    hidden_activation: ActivationFunction,
    output_activation: ActivationFunction,
}

impl Network {
    /// Builds a network from layer widths (`dims[0]` is the input width,
    /// the last entry the output width). Parameters start at zero.
    pub fn new(
        dims: &[usize],
        hidden_activation: ActivationFunction,
        output_activation: ActivationFunction,
    ) -> Result<Network> {
        let (&input_size, rest) = dims
            .split_first()
            .ok_or_else(|| NnError::config("a network needs at least one layer"))?;
        if let Some(pos) = dims.iter().position(|&d| d == 0) {
            return Err(NnError::config(format!("layer {pos} has zero width")));
        }

        let mut layers = Vec::with_capacity(rest.len());
        let mut prev = input_size;
        for (i, &size) in rest.iter().enumerate() {
            let activation = if i + 1 == rest.len() {
                output_activation
            } else {
                hidden_activation
            };
            layers.push(Layer::new(size, prev, activation)?);
            prev = size;
        }

        Ok(Network {
            input: Matrix::allocate(1, input_size)?,
            layers,
            hidden_activation,
            output_activation,
        })
    }

    /// Number of layers, counting the input layer.
    pub fn n_layers(&self) -> usize {
        self.layers.len() + 1
    }

    /// Width of every layer, input first.
    pub fn dims(&self) -> Vec<usize> {
        std::iter::once(self.input_size())
            .chain(self.layers.iter().map(Layer::size))
            .collect()
    }

    pub fn input_size(&self) -> usize {
        self.input.cols()
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(self.input_size(), Layer::size)
    }

    pub fn hidden_activation(&self) -> ActivationFunction {
        self.hidden_activation
    }

    pub fn output_activation(&self) -> ActivationFunction {
        self.output_activation
    }

    /// Computing layers (everything after the input).
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    /// Checks that `x` and `y` hold the same, non-zero number of samples and
    /// match the input and output widths.
    pub fn check_dataset(&self, x: MatrixView<'_>, y: MatrixView<'_>) -> Result<()> {
        if x.rows() == 0 {
            return Err(NnError::config("training set has no samples"));
        }
        if x.rows() != y.rows() {
            return Err(NnError::shape("sample count", x.shape(), y.shape()));
        }
        if x.cols() != self.input_size() {
            return Err(NnError::shape(
                "training inputs",
                x.shape(),
                Shape::new(x.rows(), self.input_size()),
            ));
        }
        if y.cols() != self.output_size() {
            return Err(NnError::shape(
                "training targets",
                y.shape(),
                Shape::new(y.rows(), self.output_size()),
            ));
        }
        Ok(())
    }

    /// Randomizes every weight and bias from `[min, max]`.
    /// Gradient accumulators are left untouched.
    pub fn randomize_parameters<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        min: f64,
        max: f64,
    ) -> Result<()> {
        for layer in &mut self.layers {
            layer.randomize(rng, min, max)?;
        }
        Ok(())
    }

    /// Copies one `1 x input_size` sample into the input layer.
    pub fn set_input<'a>(&mut self, x_row: impl Into<MatrixView<'a>>) -> Result<()> {
        let x_row = x_row.into();
        if x_row.shape() != self.input.shape() {
            return Err(NnError::shape("set_input", x_row.shape(), self.input.shape()));
        }
        self.input.copy_from(x_row)
    }

    pub fn input(&self) -> MatrixView<'_> {
        self.input.view()
    }

    /// Activations of layer `l - 1` (the input for `l == 0`).
    fn input_to(&self, l: usize) -> MatrixView<'_> {
        match l.checked_sub(1) {
            Some(prev) => self.layers[prev].activations.view(),
            None => self.input.view(),
        }
    }

    /// Propagates the current input through every layer, caching weighted
    /// sums and activations. Never touches the input layer.
    pub fn forward(&mut self) -> Result<()> {
        for l in 0..self.layers.len() {
            let (before, rest) = self.layers.split_at_mut(l);
            let input = before
                .last()
                .map_or(self.input.view(), |prev| prev.activations.view());
            rest[0].feed_from(input)?;
        }
        Ok(())
    }

    /// Final layer's activations from the last forward pass.
    pub fn output(&self) -> MatrixView<'_> {
        self.input_to(self.layers.len())
    }

    /// Runs inference on one input row and returns the prediction.
    pub fn predict<'a>(&mut self, x_row: impl Into<MatrixView<'a>>) -> Result<Vec<f64>> {
        self.set_input(x_row)?;
        self.forward()?;
        Ok(self.output().row(0).to_vec())
    }

    pub fn clear_errors(&mut self) {
        self.layers.iter_mut().for_each(Layer::clear_errors);
    }

    pub fn zero_gradients(&mut self) {
        self.layers.iter_mut().for_each(Layer::zero_gradients);
    }

    /// Adds the output layer's error for target `y_row` into its error cache.
    pub fn compute_output_error<'a>(&mut self, y_row: impl Into<MatrixView<'a>>) -> Result<()> {
        let y_row = y_row.into();
        let expected = Shape::new(1, self.output_size());
        if y_row.shape() != expected {
            return Err(NnError::shape("output error", y_row.shape(), expected));
        }
        match self.layers.last_mut() {
            Some(last) => last.add_output_error(y_row.row(0)),
            None => Ok(()),
        }
    }

    /// Pushes the output error back through the hidden layers.
    pub fn backpropagate(&mut self) -> Result<()> {
        for l in (0..self.layers.len().saturating_sub(1)).rev() {
            let (head, tail) = self.layers.split_at_mut(l + 1);
            head[l].add_hidden_error(&tail[0])?;
        }
        Ok(())
    }

    /// Adds this sample's contribution to every gradient accumulator.
    pub fn accumulate_gradients(&mut self) -> Result<()> {
        for l in 0..self.layers.len() {
            let (before, rest) = self.layers.split_at_mut(l);
            let input = before
                .last()
                .map_or(self.input.view(), |prev| prev.activations.view());
            rest[0].accumulate_gradients(input)?;
        }
        Ok(())
    }

    /// Clear errors, output error, backpropagation and gradient accumulation
    /// for the sample whose forward pass just ran.
    pub fn backward<'a>(&mut self, y_row: impl Into<MatrixView<'a>>) -> Result<()> {
        self.clear_errors();
        self.compute_output_error(y_row)?;
        self.backpropagate()?;
        self.accumulate_gradients()
    }

    /// Copies out the weights and biases in persisted-model layout.
    pub fn params(&self) -> NetworkParams {
        NetworkParams {
            dims: self.dims(),
            hidden_activation: self.hidden_activation,
            output_activation: self.output_activation,
            biases: self.layers.iter().map(|l| l.biases.as_slice().to_vec()).collect(),
            weights: self.layers.iter().map(|l| l.weights.to_rows()).collect(),
        }
    }

    /// Overwrites weights and biases from a snapshot of the same topology.
    /// Nothing is written unless every tensor has the right shape.
    pub fn load_params(&mut self, params: &NetworkParams) -> Result<()> {
        if params.dims != self.dims() {
            return Err(NnError::config(format!(
                "parameter snapshot is for layers {:?}, network has {:?}",
                params.dims,
                self.dims()
            )));
        }
        if params.biases.len() != self.layers.len() || params.weights.len() != self.layers.len() {
            return Err(NnError::config(format!(
                "parameter snapshot has {} bias and {} weight tensors, expected {}",
                params.biases.len(),
                params.weights.len(),
                self.layers.len()
            )));
        }

        let mut staged = Vec::with_capacity(self.layers.len());
        for (layer, (biases, weights)) in self
            .layers
            .iter()
            .zip(params.biases.iter().zip(&params.weights))
        {
            let biases = Matrix::from_data(vec![biases.clone()])?;
            let weights = Matrix::from_data(weights.clone())?;
            if biases.shape() != layer.biases.shape() {
                return Err(NnError::shape("load biases", biases.shape(), layer.biases.shape()));
            }
            if weights.shape() != layer.weights.shape() {
                return Err(NnError::shape("load weights", weights.shape(), layer.weights.shape()));
            }
            staged.push((weights, biases));
        }

        for (layer, (weights, biases)) in self.layers.iter_mut().zip(staged) {
            layer.weights = weights;
            layer.biases = biases;
        }
        self.hidden_activation = params.hidden_activation;
        self.output_activation = params.output_activation;
        let last = self.layers.len().saturating_sub(1);
        for (l, layer) in self.layers.iter_mut().enumerate() {
            layer.activator = if l == last {
                params.output_activation
            } else {
                params.hidden_activation
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn row(values: &[f64]) -> Matrix {
        Matrix::from_data(vec![values.to_vec()]).unwrap()
    }

    /// 2-2-1 network with hand-picked parameters.
    fn fixed_network() -> Network {
        let mut net = Network::new(&[2, 2, 1], ActivationFunction::Sigmoid, ActivationFunction::Identity)
            .unwrap();
        let layers = net.layers_mut();
        layers[0].weights = Matrix::from_data(vec![vec![0.5, -1.0], vec![0.25, 2.0]]).unwrap();
        layers[0].biases = row(&[0.0, -0.5]);
        layers[1].weights = Matrix::from_data(vec![vec![1.0], vec![-1.0]]).unwrap();
        layers[1].biases = row(&[0.5]);
        net
    }

    #[test]
    fn new_rejects_empty_and_zero_width() {
        let s = ActivationFunction::Sigmoid;
        assert!(matches!(Network::new(&[], s, s), Err(NnError::InvalidConfig(_))));
        assert!(matches!(Network::new(&[2, 0, 1], s, s), Err(NnError::InvalidConfig(_))));
    }

    #[test]
    fn layer_shapes_chain() {
        let net = Network::new(&[2, 5, 3, 1], ActivationFunction::LeakyReLU, ActivationFunction::Sigmoid)
            .unwrap();
        assert_eq!(net.n_layers(), 4);
        assert_eq!(net.dims(), vec![2, 5, 3, 1]);
        let mut prev = net.input_size();
        for layer in net.layers() {
            assert_eq!(layer.weights.rows(), prev);
            assert_eq!(layer.weights.cols(), layer.activations.cols());
            assert_eq!(layer.biases.cols(), layer.activations.cols());
            prev = layer.size();
        }
        assert_eq!(net.layers()[0].activator, ActivationFunction::LeakyReLU);
        assert_eq!(net.layers()[1].activator, ActivationFunction::LeakyReLU);
        assert_eq!(net.layers()[2].activator, ActivationFunction::Sigmoid);
    }

    #[test]
    fn forward_computes_hand_checked_output() {
        let mut net = fixed_network();
        let out = net.predict(&row(&[1.0, 1.0])).unwrap();
        // hidden z = [0.75, 0.5], output = 0.5 + sig(0.75) - sig(0.5)
        let sig = |x: f64| 1.0 / (1.0 + (-x).exp());
        let expected = 0.5 + sig(0.75) - sig(0.5);
        assert!((out[0] - expected).abs() < 1e-12);
        assert_eq!(net.layers()[0].weighted_sums.as_slice(), &[0.75, 0.5]);
    }

    #[test]
    fn forward_is_deterministic() {
        let mut net = Network::new(&[2, 4, 2], ActivationFunction::Sigmoid, ActivationFunction::Sigmoid)
            .unwrap();
        net.randomize_parameters(&mut StdRng::seed_from_u64(3), -1.0, 1.0).unwrap();
        let x = row(&[0.3, -0.7]);
        let first = net.predict(&x).unwrap();
        for _ in 0..5 {
            assert_eq!(net.predict(&x).unwrap(), first);
        }
        assert_eq!(net.input().row(0), &[0.3, -0.7]);
    }

    #[test]
    fn set_input_rejects_wrong_width() {
        let mut net = fixed_network();
        assert!(matches!(
            net.set_input(&row(&[1.0, 2.0, 3.0])),
            Err(NnError::ShapeMismatch { op: "set_input", .. })
        ));
    }

    #[test]
    fn output_error_rejects_wrong_target() {
        let mut net = fixed_network();
        net.predict(&row(&[0.0, 1.0])).unwrap();
        assert!(net.backward(&row(&[1.0, 0.0])).is_err());
    }

    #[test]
    fn input_only_network_echoes_input() {
        let mut net = Network::new(&[3], ActivationFunction::Sigmoid, ActivationFunction::Sigmoid).unwrap();
        assert_eq!(net.predict(&row(&[1.0, 2.0, 3.0])).unwrap(), vec![1.0, 2.0, 3.0]);
        net.backward(&row(&[0.0, 0.0, 0.0])).unwrap();
    }

    #[test]
    fn backward_produces_hidden_errors() {
        let mut net = fixed_network();
        net.predict(&row(&[1.0, 1.0])).unwrap();
        net.backward(&row(&[0.0])).unwrap();

        let out_err = net.layers()[1].errors.get(0, 0);
        assert!((out_err - net.output().get(0, 0)).abs() < 1e-12);

        let sig = |x: f64| 1.0 / (1.0 + (-x).exp());
        let ds = |x: f64| sig(x) * (1.0 - sig(x));
        let hidden = net.layers()[0].errors.as_slice();
        assert!((hidden[0] - ds(0.75) * out_err).abs() < 1e-12);
        assert!((hidden[1] + ds(0.5) * out_err).abs() < 1e-12);

        // Running backward again must not double the errors.
        net.backward(&row(&[0.0])).unwrap();
        assert!((net.layers()[1].errors.get(0, 0) - out_err).abs() < 1e-12);
        assert!((net.layers()[1].bias_grads.get(0, 0) - 2.0 * out_err).abs() < 1e-12);
    }

    #[test]
    fn params_round_trip_through_snapshot() {
        let mut a = Network::new(&[2, 3, 1], ActivationFunction::Sigmoid, ActivationFunction::Sigmoid)
            .unwrap();
        a.randomize_parameters(&mut StdRng::seed_from_u64(11), -1.0, 1.0).unwrap();
        let snapshot = a.params();
        assert_eq!(snapshot.dims, vec![2, 3, 1]);
        assert_eq!(snapshot.weights[0].len(), 2);
        assert_eq!(snapshot.weights[0][0].len(), 3);

        let mut b = Network::new(&[2, 3, 1], ActivationFunction::Sigmoid, ActivationFunction::Sigmoid)
            .unwrap();
        b.load_params(&snapshot).unwrap();
        let x = row(&[0.2, 0.9]);
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn load_params_rejects_other_topology() {
        let a = Network::new(&[2, 3, 1], ActivationFunction::Sigmoid, ActivationFunction::Sigmoid).unwrap();
        let mut b = Network::new(&[2, 2, 1], ActivationFunction::Sigmoid, ActivationFunction::Sigmoid).unwrap();
        assert!(b.load_params(&a.params()).is_err());

        let mut bad = a.params();
        bad.weights[1].pop();
        let mut c = a.clone();
        assert!(c.load_params(&bad).is_err());
    }
}
