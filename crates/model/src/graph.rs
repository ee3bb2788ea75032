//! Stage graph executor
//!
//! A model run is a set of [`Stage`]s, each producing one named raster
//! from named inputs. [`TaskGraph::execute`] checks the wiring, orders the
//! stages into waves (every stage in a wave depends only on seeds and
//! earlier waves) and runs each wave in parallel.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use culexmap_core::Raster;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Named rasters shared between stages
pub type Layers = HashMap<String, Arc<Raster<f64>>>;

type StageFn = dyn Fn(&Inputs<'_>) -> Result<Raster<f64>> + Send + Sync;

/// One node of the graph; its output is stored under its name
pub struct Stage {
    name: String,
    inputs: Vec<String>,
    run: Box<StageFn>,
}

impl Stage {
    pub fn new<F>(name: impl Into<String>, inputs: &[&str], run: F) -> Self
    where
        F: Fn(&Inputs<'_>) -> Result<Raster<f64>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .finish()
    }
}

/// The inputs a stage declared, in declaration order
pub struct Inputs<'a> {
    stage: &'a str,
    names: &'a [String],
    layers: Vec<&'a Raster<f64>>,
}

impl<'a> Inputs<'a> {
    /// Input by declared name
    pub fn get(&self, name: &str) -> Result<&'a Raster<f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.layers[i])
            .ok_or_else(|| Error::MissingInput {
                stage: self.stage.to_string(),
                input: name.to_string(),
            })
    }

    /// All inputs in declaration order
    pub fn all(&self) -> &[&'a Raster<f64>] {
        &self.layers
    }

    /// First input
    pub fn first(&self) -> Result<&'a Raster<f64>> {
        self.layers.first().copied().ok_or_else(|| Error::MissingInput {
            stage: self.stage.to_string(),
            input: "<first>".to_string(),
        })
    }
}

/// Wall time of one stage
#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: String,
    pub wave: usize,
    pub elapsed_ms: f64,
}

/// Result of [`TaskGraph::execute`]
#[derive(Debug, Default)]
pub struct GraphRun {
    pub layers: Layers,
    pub timings: Vec<StageTiming>,
}

#[derive(Debug, Default)]
pub struct TaskGraph {
    stages: Vec<Stage>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, stage: Stage) -> &mut Self {
        self.stages.push(stage);
        self
    }

    pub fn extend(&mut self, stages: impl IntoIterator<Item = Stage>) -> &mut Self {
        self.stages.extend(stages);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names grouped into waves, given the names of the seed layers.
    ///
    /// Fails on an input nothing produces, on a name produced twice and on
    /// cycles, before any stage runs.
    pub fn plan<'s>(&self, seeds: impl IntoIterator<Item = &'s str>) -> Result<Vec<Vec<&str>>> {
        let waves = self.waves(&seeds.into_iter().collect::<HashSet<_>>())?;
        Ok(waves
            .into_iter()
            .map(|wave| wave.into_iter().map(|i| self.stages[i].name.as_str()).collect())
            .collect())
    }

    /// Run every stage. The returned layers hold the seeds and all outputs.
    pub fn execute(&self, seeds: Layers) -> Result<GraphRun> {
        let waves = self.waves(&seeds.keys().map(String::as_str).collect())?;
        info!(stages = self.stages.len(), waves = waves.len(), "executing task graph");

        let mut layers = seeds;
        let mut timings = Vec::with_capacity(self.stages.len());
        for (w, wave) in waves.iter().enumerate() {
            let produced: Vec<(usize, Raster<f64>, f64)> = wave
                .par_iter()
                .map(|&i| {
                    let stage = &self.stages[i];
                    let start = Instant::now();
                    let raster = self.run_stage(stage, &layers)?;
                    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                    info!(stage = %stage.name, wave = w, elapsed_ms, "stage done");
                    Ok((i, raster, elapsed_ms))
                })
                .collect::<Result<_>>()?;

            for (i, raster, elapsed_ms) in produced {
                let name = self.stages[i].name.clone();
                timings.push(StageTiming {
                    stage: name.clone(),
                    wave: w,
                    elapsed_ms,
                });
                layers.insert(name, Arc::new(raster));
            }
        }
        Ok(GraphRun { layers, timings })
    }

    fn run_stage(&self, stage: &Stage, layers: &Layers) -> Result<Raster<f64>> {
        let rasters = stage
            .inputs
            .iter()
            .map(|name| {
                layers.get(name).map(|r| r.as_ref()).ok_or_else(|| Error::MissingInput {
                    stage: stage.name.clone(),
                    input: name.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let inputs = Inputs {
            stage: &stage.name,
            names: &stage.inputs,
            layers: rasters,
        };
        (stage.run)(&inputs).map_err(|e| Error::Stage {
            stage: stage.name.clone(),
            source: Box::new(e),
        })
    }

    /// Kahn ordering by levels
    fn waves(&self, seeds: &HashSet<&str>) -> Result<Vec<Vec<usize>>> {
        let mut producer: HashMap<&str, usize> = HashMap::with_capacity(self.stages.len());
        for (i, stage) in self.stages.iter().enumerate() {
            if seeds.contains(stage.name.as_str()) || producer.insert(&stage.name, i).is_some() {
                return Err(Error::DuplicateOutput(stage.name.clone()));
            }
        }

        let mut pending = vec![0usize; self.stages.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.stages.len()];
        for (i, stage) in self.stages.iter().enumerate() {
            for input in &stage.inputs {
                if seeds.contains(input.as_str()) {
                    continue;
                }
                match producer.get(input.as_str()) {
                    Some(&p) => {
                        pending[i] += 1;
                        dependents[p].push(i);
                    }
                    None => {
                        return Err(Error::MissingInput {
                            stage: stage.name.clone(),
                            input: input.clone(),
                        })
                    }
                }
            }
        }

        let mut waves = Vec::new();
        let mut ready: Vec<usize> = (0..self.stages.len()).filter(|&i| pending[i] == 0).collect();
        let mut scheduled = 0;
        while !ready.is_empty() {
            let mut next = Vec::new();
            for &i in &ready {
                for &d in &dependents[i] {
                    pending[d] -= 1;
                    if pending[d] == 0 {
                        next.push(d);
                    }
                }
            }
            scheduled += ready.len();
            debug!(wave = waves.len(), stages = ready.len(), "wave planned");
            waves.push(ready);
            ready = next;
        }

        if scheduled < self.stages.len() {
            let mut stuck: Vec<String> = self
                .stages
                .iter()
                .zip(&pending)
                .filter(|(_, p)| **p > 0)
                .map(|(s, _)| s.name.clone())
                .collect();
            stuck.sort();
            return Err(Error::GraphCycle(stuck));
        }
        Ok(waves)
    }
}
