//! Adam optimizer with serializable state
//!
//! One instance per network. The built-in `tch::nn::Optimizer` keeps its
//! moment estimates opaque inside libtorch, which makes checkpointed resume
//! impossible; this implementation holds the first/second moment tensors and
//! the step counter itself so the whole state survives a save/restore cycle.

use std::collections::HashMap;
use std::path::Path;

use tch::{nn::VarStore, Tensor};

use crate::error::{Error, Result};

/// Adam optimizer over the trainable variables of a single [`VarStore`].
///
/// Parameters are tracked in name order so gradient lists and persisted
/// state are deterministic across runs.
pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    /// Trainable variables, sorted by store name
    params: Vec<(String, Tensor)>,
    /// First moment estimates, parallel to `params`
    exp_avg: Vec<Tensor>,
    /// Second moment estimates, parallel to `params`
    exp_avg_sq: Vec<Tensor>,
    step_count: i64,
}

impl Adam {
    /// Create an optimizer over `vs` with the given learning rate and
    /// framework-default moment decays (0.9, 0.999) and epsilon (1e-8).
    pub fn new(vs: &VarStore, lr: f64) -> Self {
        Self::with_betas(vs, lr, 0.9, 0.999)
    }

    /// Create an optimizer with explicit moment decay rates
    pub fn with_betas(vs: &VarStore, lr: f64, beta1: f64, beta2: f64) -> Self {
        let mut params: Vec<(String, Tensor)> = vs
            .variables()
            .into_iter()
            .filter(|(_, tensor)| tensor.requires_grad())
            .collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));

        let exp_avg = params.iter().map(|(_, p)| Tensor::zeros_like(p)).collect();
        let exp_avg_sq = params.iter().map(|(_, p)| Tensor::zeros_like(p)).collect();

        Self {
            lr,
            beta1,
            beta2,
            eps: 1e-8,
            params,
            exp_avg,
            exp_avg_sq,
            step_count: 0,
        }
    }

    /// Tracked parameter tensors in name order.
    ///
    /// Pass this list as the `inputs` of `Tensor::run_backward` so the
    /// returned gradients line up with [`Adam::step`].
    pub fn parameters(&self) -> Vec<&Tensor> {
        self.params.iter().map(|(_, p)| p).collect()
    }

    /// Number of updates applied so far
    pub fn step_count(&self) -> i64 {
        self.step_count
    }

    /// Apply one bias-corrected Adam update from explicit gradients.
    ///
    /// `grads` must align with [`Adam::parameters`]. Advances the step
    /// counter by exactly one.
    pub fn step(&mut self, grads: &[Tensor]) -> Result<()> {
        if grads.len() != self.params.len() {
            return Err(Error::Optimizer(format!(
                "expected {} gradients, got {}",
                self.params.len(),
                grads.len()
            )));
        }

        self.step_count += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.step_count as i32);
        let bias_correction2 = 1.0 - self.beta2.powi(self.step_count as i32);

        for (i, grad) in grads.iter().enumerate() {
            let m = &self.exp_avg[i] * self.beta1 + grad * (1.0 - self.beta1);
            let v = &self.exp_avg_sq[i] * self.beta2 + (grad * grad) * (1.0 - self.beta2);

            let m_hat = &m / bias_correction1;
            let v_hat = &v / bias_correction2;
            let delta = m_hat * self.lr / (v_hat.sqrt() + self.eps);

            tch::no_grad(|| {
                let updated = &self.params[i].1 - &delta;
                self.params[i].1.copy_(&updated);
            });

            self.exp_avg[i] = m;
            self.exp_avg_sq[i] = v;
        }

        Ok(())
    }

    /// Full optimizer state as named tensors (moments plus step counter)
    pub fn state_dict(&self) -> Vec<(String, Tensor)> {
        let mut state = vec![("step".to_string(), Tensor::from(self.step_count))];
        for (i, (name, _)) in self.params.iter().enumerate() {
            state.push((format!("exp_avg/{name}"), self.exp_avg[i].copy()));
            state.push((format!("exp_avg_sq/{name}"), self.exp_avg_sq[i].copy()));
        }
        state
    }

    /// Persist moments and step counter
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let state = self.state_dict();
        let named: Vec<(&str, &Tensor)> = state.iter().map(|(n, t)| (n.as_str(), t)).collect();
        Tensor::save_multi(&named, path)?;
        Ok(())
    }

    /// Check a state file against the tracked parameters without applying it
    pub fn validate_state(&self, path: impl AsRef<Path>) -> Result<()> {
        self.stage(path.as_ref()).map(|_| ())
    }

    /// Restore moments and step counter from a file written by [`Adam::save`].
    ///
    /// The whole file is validated against the tracked parameters before any
    /// state is replaced, so a corrupt record leaves the optimizer untouched.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let (step_count, exp_avg, exp_avg_sq) = self.stage(path.as_ref())?;
        self.step_count = step_count;
        self.exp_avg = exp_avg;
        self.exp_avg_sq = exp_avg_sq;
        Ok(())
    }

    fn stage(&self, path: &Path) -> Result<(i64, Vec<Tensor>, Vec<Tensor>)> {
        let loaded = Tensor::load_multi(path)
            .map_err(|e| Error::corrupt(path, format!("unreadable optimizer state: {e}")))?;
        let mut entries: HashMap<String, Tensor> = loaded.into_iter().collect();

        let step = entries
            .remove("step")
            .ok_or_else(|| Error::corrupt(path, "missing step counter"))?;

        let mut exp_avg = Vec::with_capacity(self.params.len());
        let mut exp_avg_sq = Vec::with_capacity(self.params.len());
        for (name, param) in &self.params {
            for (prefix, target) in [("exp_avg", &mut exp_avg), ("exp_avg_sq", &mut exp_avg_sq)] {
                let key = format!("{prefix}/{name}");
                let moment = entries
                    .remove(&key)
                    .ok_or_else(|| Error::corrupt(path, format!("missing {key}")))?;
                if moment.size() != param.size() {
                    return Err(Error::corrupt(
                        path,
                        format!(
                            "{key} has shape {:?}, parameter has {:?}",
                            moment.size(),
                            param.size()
                        ),
                    ));
                }
                target.push(moment.to_device(param.device()));
            }
        }
        if !entries.is_empty() {
            let mut extra: Vec<String> = entries.into_keys().collect();
            extra.sort();
            return Err(Error::corrupt(
                path,
                format!("unknown state entries: {}", extra.join(", ")),
            ));
        }

        Ok((step.int64_value(&[]), exp_avg, exp_avg_sq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn, Device, Kind};

    fn single_param_store(init: f64) -> (VarStore, Tensor) {
        let vs = VarStore::new(Device::Cpu);
        let param = vs.root().var("w", &[1], nn::Init::Const(init));
        (vs, param)
    }

    #[test]
    fn test_step_moves_against_gradient() {
        let (vs, param) = single_param_store(1.0);
        let mut opt = Adam::new(&vs, 0.1);

        let grads = vec![Tensor::from_slice(&[1.0f32])];
        opt.step(&grads).unwrap();

        // First Adam step has magnitude ~lr regardless of gradient scale
        let value = param.double_value(&[0]);
        assert!(value < 1.0);
        assert!((value - 0.9).abs() < 1e-3);
        assert_eq!(opt.step_count(), 1);
    }

    #[test]
    fn test_step_rejects_misaligned_gradients() {
        let (vs, _param) = single_param_store(0.0);
        let mut opt = Adam::new(&vs, 0.1);

        assert!(opt.step(&[]).is_err());
        assert_eq!(opt.step_count(), 0);
    }

    #[test]
    fn test_state_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adam.pt");

        let (vs, _param) = single_param_store(1.0);
        let mut opt = Adam::new(&vs, 0.1);
        let grads = vec![Tensor::from_slice(&[0.5f32])];
        opt.step(&grads).unwrap();
        opt.step(&grads).unwrap();
        opt.save(&path).unwrap();

        let (vs2, _param2) = single_param_store(1.0);
        let mut restored = Adam::new(&vs2, 0.1);
        restored.load(&path).unwrap();

        assert_eq!(restored.step_count(), 2);
        for ((name_a, t_a), (name_b, t_b)) in
            opt.state_dict().iter().zip(restored.state_dict().iter())
        {
            assert_eq!(name_a, name_b);
            assert!(t_a.equal(t_b));
        }
    }

    #[test]
    fn test_load_rejects_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adam.pt");

        let vs = VarStore::new(Device::Cpu);
        let _w = vs.root().var("w", &[3], nn::Init::Const(0.0));
        let opt = Adam::new(&vs, 0.1);
        opt.save(&path).unwrap();

        let (vs2, _param) = single_param_store(0.0);
        let mut other = Adam::new(&vs2, 0.1);
        let before = other.step_count();

        assert!(other.load(&path).is_err());
        assert_eq!(other.step_count(), before);
    }

    #[test]
    fn test_load_missing_file_is_corruption() {
        let (vs, _param) = single_param_store(0.0);
        let mut opt = Adam::new(&vs, 0.1);
        let err = opt.load("no/such/state.pt").unwrap_err();
        assert!(matches!(err, Error::CheckpointCorruption { .. }));
    }

    #[test]
    fn test_descends_simple_quadratic() {
        // Minimize (w - 3)^2 / 2 with exact gradients
        let (vs, param) = single_param_store(0.0);
        let mut opt = Adam::new(&vs, 0.1);

        for _ in 0..200 {
            let grad = (&param - 3.0).detach().to_kind(Kind::Float);
            opt.step(&[grad]).unwrap();
        }

        let value = param.double_value(&[0]);
        assert!((value - 3.0).abs() < 0.1);
    }
}
