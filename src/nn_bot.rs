use std::path::Path;

use anyhow::{Context, anyhow};
use burn::{
    module::{AutodiffModule, Module},
    nn::{
        self, Initializer, Relu,
        loss::{MseLoss, Reduction},
    },
    optim::{AdamConfig, GradientsParams, Optimizer},
    grad_clipping::GradientClippingConfig,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::{
        ElementConversion, Int, Tensor, TensorData,
        backend::{AutodiffBackend, Backend},
    },
};

use crate::value_function::{TrainingSample, ValueFunction};

pub type TrainingBackend = burn::backend::Autodiff<burn::backend::NdArray>;

const ONLINE_FILE: &str = "q_network";
const TARGET_FILE: &str = "target_network";
const OPTIMIZER_FILE: &str = "optimizer";
const GRAD_CLIP_NORM: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkConfig {
    pub state_dim: usize,
    pub hidden_size: usize,
    pub action_count: usize,
    pub learning_rate: f64,
}

/// Two hidden layers, one linear score per action index.
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    input: nn::Linear<B>,
    hidden: nn::Linear<B>,
    output: nn::Linear<B>,
}

impl<B: Backend> QNetwork<B> {
    pub fn new(config: &NetworkConfig, device: &B::Device) -> Self {
        let kaiming = Initializer::KaimingUniform {
            gain: 1.0,
            fan_out_only: false,
        };
        let input = nn::LinearConfig::new(config.state_dim, config.hidden_size)
            .with_initializer(kaiming.clone())
            .init(device);
        let hidden = nn::LinearConfig::new(config.hidden_size, config.hidden_size)
            .with_initializer(kaiming)
            .init(device);
        let output = nn::LinearConfig::new(config.hidden_size, config.action_count)
            .with_initializer(Initializer::XavierNormal { gain: 1.0 })
            .init(device);
        Self {
            input,
            hidden,
            output,
        }
    }

    /// [batch, state_dim] -> [batch, action_count]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let relu = Relu::new();
        let x = relu.forward(self.input.forward(x));
        let x = relu.forward(self.hidden.forward(x));
        self.output.forward(x)
    }
}

/// Rows are zero-padded or truncated to `width`.
fn batch_tensor<B: Backend>(rows: &[Vec<f32>], width: usize, device: &B::Device) -> Tensor<B, 2> {
    let flat: Vec<f32> = rows
        .iter()
        .flat_map(|row| {
            row.iter()
                .copied()
                .chain(std::iter::repeat(0.0))
                .take(width)
        })
        .collect();
    Tensor::from_data(TensorData::new(flat, [rows.len(), width]), device)
}

/// Full precision, so a reloaded network scores exactly like the saved one.
fn checkpoint_recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

pub struct BurnValueFunction<B: AutodiffBackend, O> {
    online: QNetwork<B>,
    target: QNetwork<B::InnerBackend>,
    optimizer: O,
    config: NetworkConfig,
    device: B::Device,
}

pub fn build_value_function<B: AutodiffBackend>(
    config: NetworkConfig,
    device: B::Device,
) -> BurnValueFunction<B, impl Optimizer<QNetwork<B>, B> + Clone> {
    let online = QNetwork::<B>::new(&config, &device);
    let target = online.valid();
    let optimizer = AdamConfig::new()
        .with_grad_clipping(Some(GradientClippingConfig::Norm(GRAD_CLIP_NORM)))
        .init::<B, QNetwork<B>>();
    log::debug!(
        "built q-network {} -> {} -> {}",
        config.state_dim,
        config.hidden_size,
        config.action_count
    );
    BurnValueFunction {
        online,
        target,
        optimizer,
        config,
        device,
    }
}

impl<B, O> BurnValueFunction<B, O>
where
    B: AutodiffBackend,
{
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    fn scores(&self, network: &QNetwork<B::InnerBackend>, rows: &[Vec<f32>]) -> Vec<Vec<f32>> {
        if rows.is_empty() {
            return Vec::new();
        }
        let input = batch_tensor::<B::InnerBackend>(rows, self.config.state_dim, &self.device);
        let flat: Vec<f32> = network.forward(input).into_data().iter::<f32>().collect();
        flat.chunks(self.config.action_count)
            .map(<[f32]>::to_vec)
            .collect()
    }
}

impl<B, O> ValueFunction for BurnValueFunction<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<QNetwork<B>, B> + Clone,
{
    fn action_count(&self) -> usize {
        self.config.action_count
    }

    fn predict(&self, features: &[f32]) -> Vec<f32> {
        self.scores(&self.online.valid(), &[features.to_vec()])
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    fn predict_target(&self, batch: &[Vec<f32>]) -> Vec<Vec<f32>> {
        self.scores(&self.target, batch)
    }

    fn fit(&mut self, batch: &[TrainingSample]) -> f32 {
        if batch.is_empty() {
            return 0.0;
        }
        let rows: Vec<Vec<f32>> = batch.iter().map(|s| s.features.clone()).collect();
        let input = batch_tensor::<B>(&rows, self.config.state_dim, &self.device);
        let actions: Vec<i64> = batch.iter().map(|s| s.action as i64).collect();
        let actions = Tensor::<B, 2, Int>::from_data(
            TensorData::new(actions, [batch.len(), 1]),
            &self.device,
        );
        let targets: Vec<f32> = batch.iter().map(|s| s.target).collect();
        let targets =
            Tensor::<B, 2>::from_data(TensorData::new(targets, [batch.len(), 1]), &self.device);

        let predicted = self.online.forward(input).gather(1, actions);
        let loss = MseLoss::new().forward(predicted, targets, Reduction::Mean);
        let loss_value = loss.clone().into_scalar().elem::<f32>();

        let gradients = GradientsParams::from_grads(loss.backward(), &self.online);
        self.online = self.optimizer.step(
            self.config.learning_rate,
            self.online.clone(),
            gradients,
        );
        loss_value
    }

    fn sync_target(&mut self) {
        self.target = self.online.valid();
    }

    fn save(&self, dir: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating checkpoint directory {}", dir.display()))?;
        let recorder = checkpoint_recorder();
        self.online
            .clone()
            .save_file(dir.join(ONLINE_FILE), &recorder)
            .map_err(|err| anyhow!("saving q-network: {err:?}"))?;
        self.target
            .clone()
            .save_file(dir.join(TARGET_FILE), &recorder)
            .map_err(|err| anyhow!("saving target network: {err:?}"))?;
        Recorder::<B>::record(
            &recorder,
            self.optimizer.to_record(),
            dir.join(OPTIMIZER_FILE),
        )
        .map_err(|err| anyhow!("saving optimizer state: {err:?}"))?;
        Ok(())
    }

    fn load(&mut self, dir: &Path) -> anyhow::Result<()> {
        let recorder = checkpoint_recorder();
        self.online = self
            .online
            .clone()
            .load_file(dir.join(ONLINE_FILE), &recorder, &self.device)
            .map_err(|err| anyhow!("loading q-network from {}: {err:?}", dir.display()))?;
        self.target = self
            .target
            .clone()
            .load_file(dir.join(TARGET_FILE), &recorder, &self.device)
            .map_err(|err| anyhow!("loading target network from {}: {err:?}", dir.display()))?;
        let record = Recorder::<B>::load(&recorder, dir.join(OPTIMIZER_FILE), &self.device)
            .map_err(|err| anyhow!("loading optimizer state from {}: {err:?}", dir.display()))?;
        self.optimizer = self.optimizer.clone().load_record(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NetworkConfig {
        NetworkConfig {
            state_dim: 4,
            hidden_size: 16,
            action_count: 3,
            learning_rate: 1e-2,
        }
    }

    fn sample() -> TrainingSample {
        TrainingSample {
            features: vec![0.5, -0.25, 1.0, 0.0],
            action: 1,
            target: 2.0,
        }
    }

    #[test]
    fn predicts_one_score_per_action() {
        let vf = build_value_function::<TrainingBackend>(config(), Default::default());
        assert_eq!(vf.predict(&[0.0; 4]).len(), 3);
        assert_eq!(vf.predict_target(&[vec![0.0; 4], vec![1.0; 4]]).len(), 2);
    }

    #[test]
    fn fitting_reduces_loss() {
        let mut vf = build_value_function::<TrainingBackend>(config(), Default::default());
        let batch = vec![sample()];
        let first = vf.fit(&batch);
        let mut last = first;
        for _ in 0..50 {
            last = vf.fit(&batch);
        }
        assert!(last < first, "loss did not decrease: {first} -> {last}");
    }

    #[test]
    fn sync_copies_live_parameters() {
        let mut vf = build_value_function::<TrainingBackend>(config(), Default::default());
        for _ in 0..5 {
            vf.fit(&[sample()]);
        }
        vf.sync_target();
        let features = sample().features;
        assert_eq!(vf.predict(&features), vf.predict_target(&[features.clone()])[0]);
    }

    #[test]
    fn checkpoint_round_trip() {
        let dir = std::env::temp_dir().join(format!("q-network-test-{}", std::process::id()));
        let mut trained = build_value_function::<TrainingBackend>(config(), Default::default());
        for _ in 0..5 {
            trained.fit(&[sample()]);
        }
        trained.save(&dir).unwrap();

        let mut restored = build_value_function::<TrainingBackend>(config(), Default::default());
        restored.load(&dir).unwrap();
        let features = sample().features;
        assert_eq!(restored.predict(&features), trained.predict(&features));
        assert_eq!(
            restored.predict_target(&[features.clone()]),
            trained.predict_target(&[features.clone()])
        );

        // restored optimizer state keeps training in lockstep
        trained.fit(&[sample()]);
        restored.fit(&[sample()]);
        assert_eq!(restored.predict(&features), trained.predict(&features));
        std::fs::remove_dir_all(&dir).ok();
    }
}
