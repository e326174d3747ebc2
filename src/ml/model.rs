use burn::{
    module::Param,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{activation::relu, TensorData},
};
use rand::Rng;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct AutoencoderConfig {
    pub max_frames: usize,
    pub num_coeffs: usize,
    #[config(default = 50)]
    pub hidden_1:   usize,
    #[config(default = 50)]
    pub hidden_2:   usize,
    #[config(default = 75)]
    pub hidden_3:   usize,
}

impl AutoencoderConfig {
    /// Width of the flattened input and of the reconstruction.
    pub fn num_features(&self) -> usize {
        self.max_frames * self.num_coeffs
    }

    /// Build a fully initialised model. Weights are Glorot-uniform draws from
    /// `rng`, biases are zero.
    pub fn init<B: Backend, R: Rng + ?Sized>(
        &self,
        device: &B::Device,
        rng:    &mut R,
    ) -> StackedAutoencoder<B> {
        let features = self.num_features();
        StackedAutoencoder {
            encode_1:   glorot_linear(features, self.hidden_1, device, rng),
            encode_2:   glorot_linear(self.hidden_1, self.hidden_2, device, rng),
            encode_3:   glorot_linear(self.hidden_2, self.hidden_3, device, rng),
            decode:     glorot_linear(self.hidden_3, features, device, rng),
            max_frames: self.max_frames,
            num_coeffs: self.num_coeffs,
        }
    }
}

fn glorot_linear<B: Backend, R: Rng + ?Sized>(
    d_input:  usize,
    d_output: usize,
    device:   &B::Device,
    rng:      &mut R,
) -> Linear<B> {
    let limit = (6.0 / (d_input + d_output) as f64).sqrt() as f32;
    let weights: Vec<f32> = (0..d_input * d_output)
        .map(|_| rng.gen_range(-limit..=limit))
        .collect();

    let mut layer = LinearConfig::new(d_input, d_output).init(device);
    layer.weight = Param::from_tensor(Tensor::from_data(
        TensorData::new(weights, [d_input, d_output]),
        device,
    ));
    layer.bias = Some(Param::from_tensor(Tensor::zeros([d_output], device)));
    layer
}

#[derive(Module, Debug)]
pub struct StackedAutoencoder<B: Backend> {
    pub encode_1:   Linear<B>,
    pub encode_2:   Linear<B>,
    pub encode_3:   Linear<B>,
    pub decode:     Linear<B>,
    pub max_frames: usize,
    pub num_coeffs: usize,
}

impl<B: Backend> StackedAutoencoder<B> {
    /// corrupted: [batch, L_max, D] → reconstruction: [batch, L_max, D]
    pub fn forward(&self, corrupted: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch_size, frames, coeffs] = corrupted.dims();
        let x = corrupted.reshape([batch_size, frames * coeffs]);

        let h1 = relu(self.encode_1.forward(x));
        let h2 = relu(self.encode_2.forward(h1));
        let h3 = relu(self.encode_3.forward(h2));
        let out = relu(self.decode.forward(h3));

        out.reshape([batch_size, frames, coeffs])
    }

    /// Forward pass plus masked MSE against the clean target.
    pub fn forward_loss(
        &self,
        corrupted: Tensor<B, 3>,
        targets:   Tensor<B, 3>,
        weights:   Tensor<B, 3>,
    ) -> (Tensor<B, 1>, Tensor<B, 3>) {
        let reconstruction = self.forward(corrupted);
        let loss = masked_mse(reconstruction.clone(), targets, weights);
        (loss, reconstruction)
    }
}

/// Mean squared error over the positions where `weights` is 1.
///
/// Padding frames carry weight 0, so they neither add error nor count
/// towards the denominator. An all-padding batch yields 0.
pub fn masked_mse<B: Backend>(
    pred:    Tensor<B, 3>,
    target:  Tensor<B, 3>,
    weights: Tensor<B, 3>,
) -> Tensor<B, 1> {
    let squared = (pred - target).powf_scalar(2.0);
    let total = (squared * weights.clone()).sum();
    let count = weights.sum().clamp_min(1.0);
    total / count
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::ElementConversion;
    use rand::{rngs::StdRng, SeedableRng};

    type TestBackend = burn::backend::NdArray;

    fn tensor(values: Vec<f32>, shape: [usize; 3]) -> Tensor<TestBackend, 3> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    #[test]
    fn test_forward_keeps_shape() {
        let cfg = AutoencoderConfig::new(6, 2).with_hidden_1(5).with_hidden_2(4).with_hidden_3(3);
        let model: StackedAutoencoder<TestBackend> =
            cfg.init(&Default::default(), &mut StdRng::seed_from_u64(0));
        let out = model.forward(tensor(vec![0.5; 4 * 12], [4, 6, 2]));
        assert_eq!(out.dims(), [4, 6, 2]);
        // final ReLU
        let values = out.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_biases_start_at_zero() {
        let cfg = AutoencoderConfig::new(3, 2);
        let model: StackedAutoencoder<TestBackend> =
            cfg.init(&Default::default(), &mut StdRng::seed_from_u64(1));
        let bias = model.decode.bias.as_ref().unwrap().val();
        let values = bias.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert_eq!(values.len(), 6);
        assert!(values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_weights_within_glorot_limit() {
        let cfg = AutoencoderConfig::new(4, 2).with_hidden_1(10);
        let model: StackedAutoencoder<TestBackend> =
            cfg.init(&Default::default(), &mut StdRng::seed_from_u64(2));
        let limit = (6.0f32 / 18.0).sqrt();
        let w = model.encode_1.weight.val().into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert_eq!(w.len(), 8 * 10);
        assert!(w.iter().all(|v| v.abs() <= limit));
    }

    #[test]
    fn test_masked_mse_ignores_padding() {
        let pred    = tensor(vec![1.0, 1.0, 9.0, 9.0], [1, 2, 2]);
        let target  = tensor(vec![0.0, 2.0, 0.0, 0.0], [1, 2, 2]);
        let weights = tensor(vec![1.0, 1.0, 0.0, 0.0], [1, 2, 2]);
        let loss: f64 = masked_mse(pred, target, weights).into_scalar().elem();
        assert!((loss - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_masked_mse_all_padding_is_zero() {
        let pred    = tensor(vec![3.0; 4], [1, 2, 2]);
        let target  = tensor(vec![0.0; 4], [1, 2, 2]);
        let weights = tensor(vec![0.0; 4], [1, 2, 2]);
        let loss: f64 = masked_mse(pred, target, weights).into_scalar().elem();
        assert_eq!(loss, 0.0);
    }
}
