use std::path::Path;

/// One regression target for [`ValueFunction::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub features: Vec<f32>,
    pub action: usize,
    pub target: f32,
}

/// A trainable map from a state encoding to one score per action index,
/// together with a lagging copy used to compute bootstrap targets.
pub trait ValueFunction {
    /// Width of every score vector returned.
    fn action_count(&self) -> usize;

    fn predict(&self, features: &[f32]) -> Vec<f32>;

    /// Scores from the lagging copy, one row per input.
    fn predict_target(&self, batch: &[Vec<f32>]) -> Vec<Vec<f32>>;

    /// One gradient step on the squared error between the score at each
    /// sample's action and its target. Returns the mean loss.
    fn fit(&mut self, batch: &[TrainingSample]) -> f32;

    /// Overwrites the lagging copy with the live parameters.
    fn sync_target(&mut self);

    fn save(&self, dir: &Path) -> anyhow::Result<()>;

    fn load(&mut self, dir: &Path) -> anyhow::Result<()>;
}
