//! Demo type: a small numeric pipeline with one timed operation per stage

use anyhow::bail;
use serde_json::{json, Value};
use timed_core::{arg, TypeDefinition};

/// Working set of the pipeline.
#[derive(Debug, Default)]
pub struct Samples {
    pub values: Vec<f64>,
}

pub fn definition() -> TypeDefinition<Samples> {
    TypeDefinition::<Samples>::with_default("Pipeline")
        .attribute("unit", "ms")
        .operation("load", 1, |this, args| {
            let count: usize = arg(args, 0)?;
            this.state_mut().values = (1..=count).map(|i| i as f64).collect();
            Ok(json!(count))
        })
        .operation("transform", 1, |this, args| {
            let factor: f64 = arg(args, 0)?;
            for value in &mut this.state_mut().values {
                *value = (*value * factor).sqrt();
            }
            this.call("_checksum", &[]).map_err(anyhow::Error::from)
        })
        .operation("summarize", 0, |this, _| {
            let values = &this.state().values;
            if values.is_empty() {
                bail!("nothing to summarize");
            }
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            Ok(json!({ "count": values.len(), "mean": mean }))
        })
        .operation("_checksum", 0, |this, _| {
            Ok(Value::from(this.state().values.iter().sum::<f64>()))
        })
}
