// src/tasks/scripts.rs

//! The `js` task: plain scripts, then type-stripped typed scripts, joined
//! into one file.

use anyhow::{Context, Result};

use crate::fs::TreeFile;
use crate::tasks::inputs::{collect_matching, InputPatterns};
use crate::tasks::{AssetTask, BuildContext, TaskKind};
use crate::transform::javascript::JsMinifier;
use crate::transform::typescript::TypeStripper;
use crate::transform::{apply_all, Transform};

const TYPED_EXTENSION: &str = ".ts";

fn output_steps(ctx: &BuildContext) -> Vec<Box<dyn Transform>> {
    if ctx.mode().is_production() {
        vec![Box::new(JsMinifier)]
    } else {
        Vec::new()
    }
}

pub fn plan(ctx: &BuildContext) -> AssetTask {
    let mut steps = vec![
        format!("*.ts: {}", TypeStripper.name()),
        "concat".to_string(),
    ];
    steps.extend(output_steps(ctx).iter().map(|s| s.name().to_string()));

    AssetTask {
        kind: TaskKind::Js,
        inputs: InputPatterns::for_task(TaskKind::Js).describe(),
        steps,
        output: ctx
            .build_dir()
            .join(&ctx.config().scripts.output)
            .display()
            .to_string(),
        reload: true,
    }
}

pub fn run(ctx: &BuildContext) -> Result<Vec<String>> {
    let (typed, plain): (Vec<TreeFile>, Vec<TreeFile>) =
        collect_matching(ctx.fs(), &ctx.src_dir(), &InputPatterns::for_task(TaskKind::Js))?
            .into_iter()
            .partition(|file| file.rel.ends_with(TYPED_EXTENSION));

    let mut parts = Vec::with_capacity(plain.len() + typed.len());
    for file in plain.iter() {
        parts.push(ctx.fs().read_to_string(&file.path)?);
    }
    for file in typed.iter() {
        let source = ctx.fs().read_to_string(&file.path)?;
        let compiled = TypeStripper
            .apply(&source)
            .with_context(|| format!("compiling {}", file.rel))?;
        parts.push(compiled);
    }

    let output = apply_all(&output_steps(ctx), parts.join("\n")).context("minifying scripts")?;

    let out_rel = ctx.config().scripts.output.replace('\\', "/");
    ctx.fs().write(&ctx.build_dir().join(&out_rel), output.as_bytes())?;
    Ok(vec![out_rel])
}
