use anyhow::Context;
use bdlseg::config::EvalConfig;
use bdlseg::dataset::data_loaders::{cityscapes, BatchLoader};
use bdlseg::dataset::DataLoader;
use bdlseg::ensemble::helpers::frame_rendering::FrameArtifacts;
use bdlseg::ensemble::member::{load_members, StochasticSegmenter};
use bdlseg::ensemble::{EnsembleEvaluator, DEVICE};
use bdlseg::video::composer::write_sequence_video;
use rayon::prelude::*;

fn evaluate_sequence<S: StochasticSegmenter>(
    config: &EvalConfig,
    evaluator: &EnsembleEvaluator<S>,
    sequence: &str,
) -> Result<(), anyhow::Error> {
    let out_dir = config.sequence_dir(sequence);
    std::fs::create_dir_all(&out_dir).with_context(|| format!("cannot create {}", out_dir.display()))?;

    let dataset = cityscapes::sequence(&config.data_dir, sequence)?;
    let mut loader = BatchLoader::new(dataset, config.batch_size);
    let mut names: Vec<String> = vec![];
    let mut batches = loader.batches();
    while let Some(batch) = batches.next() {
        let batch = batch?;
        log::info!("step: {}/{}", batches.next_element_index(), batches.max_elem_index());

        let maps = evaluator.evaluate_batch(&batch.images.to_device(*DEVICE))?;
        let mut frames = vec![];
        for (i, name) in batch.names.iter().enumerate() {
            if batch.substituted[i] {
                log::warn!("frame {} of batch {} was substituted, skipping it", i, batches.next_element_index());
                continue;
            }
            let artifacts = FrameArtifacts::render(&batch.images.get(i as i64), &maps, i as i64, config.overlay_alpha)?;
            frames.push((name.clone(), artifacts));
        }
        frames.par_iter().try_for_each(|(name, artifacts)| {
            log::debug!("writing frame {}", name);
            artifacts.save(&out_dir, name)
        })?;
        names.extend(frames.into_iter().map(|(name, _)| name));
    }

    let video = write_sequence_video(&out_dir, sequence, &names, config.fps)?;
    log::info!("Sequence {} done: {}", sequence, video.display());
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = match std::env::args().nth(1) {
        Some(path) => EvalConfig::from_json_file(path)?,
        None => {
            let config = EvalConfig::default();
            config.validate()?;
            config
        }
    };
    log::info!("{:?}", config);

    let members = load_members(&config, *DEVICE)?;
    let evaluator = EnsembleEvaluator::new(members, config.passes, config.num_classes)?;
    log::info!(
        "Evaluating {} members with {} passes each",
        evaluator.num_members(),
        evaluator.passes()
    );
    for sequence in &config.sequences {
        evaluate_sequence(&config, &evaluator, sequence)?;
    }
    Ok(())
}
