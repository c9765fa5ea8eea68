use crate::{
    error::Result,
    grad::finite_diff::Gradients,
    math::matrix::MatrixView,
    network::network::Network,
    optim::sgd::Sgd,
    train::loop_fn::evaluate_mse,
};

/// One full-batch gradient-descent step driven by finite-difference
/// gradients instead of backprop. Returns the mean squared error after the
/// step.
///
/// Every parameter costs a full pass over the data, so this is only
/// practical for the tiny gate networks; it mostly serves to cross-check
/// `train_loop`.
pub fn train_epoch_finite_difference(
    network: &mut Network,
    x: MatrixView<'_>,
    y: MatrixView<'_>,
    optimizer: &Sgd,
    eps: f64,
) -> Result<f64> {
    let grads = Gradients::finite_difference(network, x, y, eps)?;

    for (layer, (w_grad, b_grad)) in network
        .layers_mut()
        .iter_mut()
        .zip(grads.weights.iter().zip(&grads.biases))
    {
        layer.weight_grads.copy_from(w_grad)?;
        layer.bias_grads.copy_from(b_grad)?;
    }
    // The estimate is already a per-sample mean.
    optimizer.step_network(network, 1)?;

    evaluate_mse(network, x, y)
}
